//! Parameter key listing command.

#![allow(clippy::print_literal)] // Table headers use literal strings intentionally

use clap::Args;

use xover_config::keys::{ControllerParam, Fanout, KEY_TABLE, KeySpec, ParamTarget, eq_band_property};
use xover_core::NodeRole;

#[derive(Args)]
pub struct KeysArgs {
    /// Show only keys whose name contains this text
    #[arg(value_name = "FILTER")]
    filter: Option<String>,
}

pub fn run(args: KeysArgs) -> anyhow::Result<()> {
    let keys: Vec<&KeySpec> = KEY_TABLE
        .iter()
        .filter(|spec| {
            args.filter
                .as_deref()
                .is_none_or(|f| spec.key.contains(f))
        })
        .collect();

    if keys.is_empty() {
        anyhow::bail!("No parameter key matches '{}'", args.filter.unwrap_or_default());
    }

    println!("Parameter Keys");
    println!("==============");
    println!();
    println!("  {:22}  {:28}  {:22}  {}", "Key", "Target", "Value", "Description");
    println!("  {:22}  {:28}  {:22}  {}", "---", "------", "-----", "-----------");
    for spec in keys {
        println!(
            "  {:22}  {:28}  {:22}  {}",
            spec.key,
            describe_target(spec.target),
            spec.expects.describe(),
            spec.help
        );
    }
    Ok(())
}

fn describe_target(target: ParamTarget) -> String {
    match target {
        ParamTarget::Structural => "rebuild".to_string(),
        ParamTarget::Node {
            role,
            property,
            fanout: Fanout::PerPath,
        } => format!("{}<p>.{property}", role.prefix()),
        ParamTarget::Node {
            role,
            property,
            fanout: Fanout::Single,
        } => format!("{}.{property}", role.node_name(0)),
        ParamTarget::EqBand(band) => format!(
            "{}<p>.{} (max)",
            NodeRole::Equalizer.prefix(),
            eq_band_property(band)
        ),
        ParamTarget::Controller(ControllerParam::LoudnessLow) => "loudness low threshold".to_string(),
        ParamTarget::Controller(ControllerParam::LoudnessHigh) => "loudness high threshold".to_string(),
        ParamTarget::Controller(ControllerParam::ProtectThreshold) => {
            "protection threshold".to_string()
        }
    }
}
