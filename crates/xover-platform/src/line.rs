//! Hardware enable lines.

use parking_lot::Mutex;
use std::sync::Arc;

/// A write-only hardware output that powers the amplifier.
///
/// Writes are idempotent and nothing is read back. `true` means "amplifier
/// enabled", whatever the physical polarity; wrap active-low wiring in
/// [`Inverted`].
pub trait EnableLine {
    /// Drive the line.
    fn set(&mut self, asserted: bool);
}

impl<L: EnableLine + ?Sized> EnableLine for Box<L> {
    fn set(&mut self, asserted: bool) {
        (**self).set(asserted);
    }
}

/// Line that only logs its transitions.
///
/// Used when no GPIO is available; the amplifier then simply stays powered.
#[derive(Debug, Clone)]
pub struct LogLine {
    pin: u32,
}

impl LogLine {
    /// Create a logging line for the given (informational) pin number.
    pub fn new(pin: u32) -> Self {
        Self { pin }
    }
}

impl EnableLine for LogLine {
    fn set(&mut self, level: bool) {
        tracing::info!(pin = self.pin, level = u8::from(level), "amplifier line");
    }
}

/// Inverts the polarity of another line.
///
/// ```rust
/// use xover_platform::{EnableLine, Inverted, RecordingLine};
///
/// let raw = RecordingLine::new();
/// let mut line = Inverted(raw.clone());
/// line.set(true);
/// assert_eq!(raw.history(), vec![false]);
/// ```
#[derive(Debug, Clone)]
pub struct Inverted<L>(pub L);

impl<L: EnableLine> EnableLine for Inverted<L> {
    fn set(&mut self, asserted: bool) {
        self.0.set(!asserted);
    }
}

/// Line that records every write. Clones share the same history.
#[derive(Debug, Clone, Default)]
pub struct RecordingLine {
    history: Arc<Mutex<Vec<bool>>>,
}

impl RecordingLine {
    /// Create an empty recording line.
    pub fn new() -> Self {
        Self::default()
    }

    /// All writes, oldest first.
    pub fn history(&self) -> Vec<bool> {
        self.history.lock().clone()
    }

    /// Number of `set(true)` writes.
    pub fn asserts(&self) -> usize {
        self.history.lock().iter().filter(|&&v| v).count()
    }

    /// Number of `set(false)` writes.
    pub fn deasserts(&self) -> usize {
        self.history.lock().iter().filter(|&&v| !v).count()
    }

    /// Last written level.
    pub fn level(&self) -> Option<bool> {
        self.history.lock().last().copied()
    }
}

impl EnableLine for RecordingLine {
    fn set(&mut self, asserted: bool) {
        self.history.lock().push(asserted);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_line_counts() {
        let mut line = RecordingLine::new();
        line.set(true);
        line.set(false);
        line.set(false);
        assert_eq!(line.asserts(), 1);
        assert_eq!(line.deasserts(), 2);
        assert_eq!(line.level(), Some(false));
    }

    #[test]
    fn boxed_line_forwards() {
        let raw = RecordingLine::new();
        let mut boxed: Box<dyn EnableLine + Send> = Box::new(Inverted(raw.clone()));
        boxed.set(false);
        assert_eq!(raw.history(), vec![true]);
    }
}
