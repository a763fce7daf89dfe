//! Control plane command.

use clap::Args;
use std::path::PathBuf;
use std::process;
use std::thread;
use std::time::Duration;

use xover_control::ControlPlane;
use xover_core::NodeKind;
use xover_io::{SimBackend, SimProbe};
use xover_platform::{EnableLine, Inverted, LogLine};

use super::load_rig;

/// Exit status after an interrupt.
const EXIT_INTERRUPTED: i32 = 1;
/// Exit status after a fatal graph error.
const EXIT_FATAL: i32 = 2;

#[derive(Args)]
pub struct RunArgs {
    /// Rig configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Parameter file (JSON), overriding the rig file's `parameter_file`
    #[arg(short, long)]
    params: Option<PathBuf>,

    /// Feed this peak level (dBFS) to every level meter of the simulated engine
    #[arg(long, value_name = "DB", allow_hyphen_values = true)]
    sim_level: Option<f64>,
}

pub fn run(args: RunArgs) -> anyhow::Result<()> {
    let mut rig = load_rig(args.config.as_deref())?;
    if let Some(params) = args.params {
        rig.parameter_file = params;
    }

    ctrlc::set_handler(|| {
        eprintln!("interrupted");
        process::exit(EXIT_INTERRUPTED);
    })?;

    let backend = SimBackend::new();
    let probe = backend.probe();

    let amp = &rig.amplifier;
    let line: Box<dyn EnableLine + Send> = if amp.active_low {
        Box::new(Inverted(LogLine::new(amp.gpio_pin)))
    } else {
        Box::new(LogLine::new(amp.gpio_pin))
    };

    let plane = match ControlPlane::start(backend, &rig, line) {
        Ok(plane) => plane,
        Err(e) => {
            eprintln!("{e}");
            process::exit(EXIT_FATAL);
        }
    };

    if let Some(level) = args.sim_level {
        spawn_level_feed(probe, level, rig.amplifier.tick())?;
    }

    println!(
        "Watching {} (Ctrl+C to stop)",
        rig.parameter_file.display()
    );

    match plane.wait() {
        Some(err) => {
            eprintln!("{err}");
            process::exit(EXIT_FATAL);
        }
        None => {
            plane.stop();
            Ok(())
        }
    }
}

/// Publish `level_db` from every level meter of the running graph once per
/// `period`.
fn spawn_level_feed(probe: SimProbe, level_db: f64, period: Duration) -> anyhow::Result<()> {
    thread::Builder::new()
        .name("sim-levels".into())
        .spawn(move || {
            loop {
                let meters: Vec<String> = probe
                    .description()
                    .map(|d| {
                        d.nodes
                            .into_iter()
                            .filter(|n| n.kind == NodeKind::LevelMeter)
                            .map(|n| n.name)
                            .collect()
                    })
                    .unwrap_or_default();
                for meter in &meters {
                    probe.emit_level(meter, level_db);
                }
                thread::sleep(period);
            }
        })?;
    Ok(())
}
