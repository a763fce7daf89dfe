//! Topology planning command.

use clap::Args;
use std::path::PathBuf;

use xover_core::{DeviceLayout, FeatureFlags, OutputMode, plan_with_layout};

use super::load_rig;

#[derive(Args)]
pub struct PlanArgs {
    /// Output mode: left, right, mono, stereo, stereo_40
    #[arg(value_name = "MODE")]
    mode: OutputMode,

    /// Replace the capture input with a test tone
    #[arg(long)]
    test_source: bool,

    /// Add per-path output level meters for woofer protection
    #[arg(long)]
    woofer_protection: bool,

    /// Add the pre-mix loudness level meter
    #[arg(long)]
    loudness: bool,

    /// Sink buffer time in microseconds
    #[arg(long, value_name = "US")]
    buffer_time: Option<u32>,

    /// Take the device layout from this rig file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

pub fn run(args: PlanArgs) -> anyhow::Result<()> {
    let layout = match args.config.as_deref() {
        Some(path) => load_rig(Some(path))?.layout,
        None => DeviceLayout::default(),
    };

    let flags = FeatureFlags {
        test_source: args.test_source,
        woofer_protection: args.woofer_protection,
        loudness_compensation: args.loudness,
        buffer_time_us: args
            .buffer_time
            .unwrap_or(FeatureFlags::default().buffer_time_us),
    };

    let graph = plan_with_layout(args.mode, &flags, &layout);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&graph)?);
    } else {
        print!("{graph}");
    }
    Ok(())
}
