//! Rig file creation command.

use clap::Args;
use std::path::PathBuf;

use xover_config::RigConfig;
use xover_config::paths::{RIG_FILE_NAME, ensure_user_config_dir};

#[derive(Args)]
pub struct InitArgs {
    /// Where to write the rig file (default: the user config directory)
    path: Option<PathBuf>,

    /// Overwrite an existing file
    #[arg(short, long)]
    force: bool,
}

pub fn run(args: InitArgs) -> anyhow::Result<()> {
    let path = match args.path {
        Some(path) => path,
        None => ensure_user_config_dir()?.join(RIG_FILE_NAME),
    };

    if path.exists() && !args.force {
        anyhow::bail!(
            "{} already exists. Use --force to overwrite.",
            path.display()
        );
    }

    RigConfig::default().save(&path)?;

    println!("Wrote default rig to {}", path.display());
    Ok(())
}
