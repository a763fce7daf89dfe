//! Parameter file watcher.
//!
//! The watcher polls the parameter file's modification time and reloads the
//! file whenever it changes. A file that fails to read or parse is reported
//! once per modification; the caller decides whether that is fatal (at
//! startup) or just logged (while running).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime};

use xover_core::ParameterSet;

use crate::error::ConfigError;
use crate::params::load_parameters;

/// Polls a parameter file for modifications.
#[derive(Debug)]
pub struct ParameterWatcher {
    path: PathBuf,
    last_modified: Option<SystemTime>,
}

impl ParameterWatcher {
    /// Watch `path`. The first [`poll`](Self::poll) always loads the file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_modified: None,
        }
    }

    /// The watched path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the file if its modification time changed since the last poll.
    ///
    /// Returns `Ok(None)` when nothing changed. The modification time is
    /// recorded before parsing, so a broken file is reported once rather
    /// than on every poll.
    pub fn poll(&mut self) -> Result<Option<ParameterSet>, ConfigError> {
        let modified = std::fs::metadata(&self.path)
            .and_then(|m| m.modified())
            .map_err(|e| ConfigError::read_file(&self.path, e))?;
        if self.last_modified == Some(modified) {
            return Ok(None);
        }
        self.last_modified = Some(modified);
        load_parameters(&self.path).map(Some)
    }
}

/// Run `watcher` on a background thread, calling `on_change` with every newly
/// loaded parameter set until `running` is cleared.
pub fn spawn_watcher<F>(
    mut watcher: ParameterWatcher,
    interval: Duration,
    running: Arc<AtomicBool>,
    mut on_change: F,
) -> std::io::Result<JoinHandle<()>>
where
    F: FnMut(ParameterSet) + Send + 'static,
{
    thread::Builder::new()
        .name("param-watch".into())
        .spawn(move || {
            while running.load(Ordering::Relaxed) {
                match watcher.poll() {
                    Ok(Some(params)) => {
                        tracing::info!(path = %watcher.path().display(), keys = params.len(), "parameter file changed");
                        on_change(params);
                    }
                    Ok(None) => {}
                    Err(e) => tracing::warn!(error = %e, "parameter file not reloaded"),
                }
                thread::sleep(interval);
            }
        })
}
