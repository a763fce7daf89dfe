//! Amplifier idle-timeout state machine.
//!
//! ```text
//!            signal (line ← on)
//!   ┌──────┐ ───────────────────▶ ┌────────┐
//!   │ IDLE │                      │ ACTIVE │ ◀─┐ signal: refresh counter only
//!   └──────┘ ◀─────────────────── └────────┘ ──┘
//!            counter hits 0 (line ← off)
//! ```
//!
//! Every tick decrements the remaining-ticks counter while it is nonzero. The
//! line is written exactly once per transition: asserted on the first signal
//! after entering IDLE, deasserted on the tick that empties the counter.
//! Continuous activity therefore produces a single assert, not one per tick.

use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::line::EnableLine;

/// Amplifier power state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmpState {
    /// Line asserted, amplifier powered.
    Active,
    /// Line deasserted.
    Idle,
}

/// Line write caused by a signal or tick, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// No line write.
    None,
    /// IDLE → ACTIVE, line asserted.
    Asserted,
    /// ACTIVE → IDLE, line deasserted.
    Deasserted,
}

/// Idle-timeout controller driving an [`EnableLine`].
#[derive(Debug)]
pub struct IdleTimeout<L> {
    line: L,
    window: u32,
    remaining: u32,
    state: AmpState,
}

/// An [`IdleTimeout`] shared between the ticker and activity sources.
pub type SharedIdleTimeout<L> = Arc<Mutex<IdleTimeout<L>>>;

impl<L: EnableLine> IdleTimeout<L> {
    /// Create a controller in the IDLE state. The line is not written.
    ///
    /// `window` is the number of ticks the amplifier stays on after the last
    /// activity signal; it is clamped to at least one tick.
    pub fn new(line: L, window: u32) -> Self {
        Self {
            line,
            window: window.max(1),
            remaining: 0,
            state: AmpState::Idle,
        }
    }

    /// Window length in ticks for an idle period and tick period.
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use xover_platform::{IdleTimeout, RecordingLine};
    ///
    /// let ticks = IdleTimeout::<RecordingLine>::window_ticks(
    ///     Duration::from_secs(3),
    ///     Duration::from_millis(100),
    /// );
    /// assert_eq!(ticks, 30);
    /// ```
    pub fn window_ticks(idle: Duration, tick: Duration) -> u32 {
        if tick.is_zero() {
            return 1;
        }
        let ticks = idle.as_micros() / tick.as_micros().max(1);
        u32::try_from(ticks).unwrap_or(u32::MAX).max(1)
    }

    /// Deassert the line once to establish a known IDLE state at startup.
    pub fn park(&mut self) {
        self.remaining = 0;
        self.state = AmpState::Idle;
        self.line.set(false);
    }

    /// Record audible activity.
    ///
    /// Refreshes the counter to the full window and asserts the line only if
    /// the controller was IDLE.
    pub fn signal(&mut self) -> Transition {
        self.remaining = self.window;
        if self.state == AmpState::Idle {
            self.state = AmpState::Active;
            self.line.set(true);
            tracing::info!("amplifier enable");
            Transition::Asserted
        } else {
            Transition::None
        }
    }

    /// Advance one tick.
    pub fn tick(&mut self) -> Transition {
        if self.remaining == 0 {
            return Transition::None;
        }
        self.remaining -= 1;
        if self.remaining == 0 {
            self.state = AmpState::Idle;
            self.line.set(false);
            tracing::info!("amplifier disable");
            Transition::Deasserted
        } else {
            Transition::None
        }
    }

    /// Current state.
    pub fn state(&self) -> AmpState {
        self.state
    }

    /// Ticks left before the amplifier is switched off.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Window length in ticks.
    pub fn window(&self) -> u32 {
        self.window
    }

    /// Access the underlying line.
    pub fn line(&self) -> &L {
        &self.line
    }
}

/// Spawn a thread that ticks `idle` every `period` while `running` is set.
pub fn spawn_ticker<L>(
    idle: SharedIdleTimeout<L>,
    period: Duration,
    running: Arc<AtomicBool>,
) -> std::io::Result<JoinHandle<()>>
where
    L: EnableLine + Send + 'static,
{
    thread::Builder::new()
        .name("amp-idle".into())
        .spawn(move || {
            while running.load(Ordering::Relaxed) {
                thread::sleep(period);
                idle.lock().tick();
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line::RecordingLine;

    const WINDOW: u32 = 30;

    fn amp() -> (IdleTimeout<RecordingLine>, RecordingLine) {
        let line = RecordingLine::new();
        (IdleTimeout::new(line.clone(), WINDOW), line)
    }

    #[test]
    fn starts_idle_without_writing() {
        let (amp, line) = amp();
        assert_eq!(amp.state(), AmpState::Idle);
        assert!(line.history().is_empty());
    }

    #[test]
    fn park_deasserts_once() {
        let (mut amp, line) = amp();
        amp.park();
        assert_eq!(line.history(), vec![false]);
    }

    #[test]
    fn continuous_activity_asserts_exactly_once() {
        let (mut amp, line) = amp();
        for _ in 0..200 {
            amp.signal();
            amp.tick();
        }
        assert_eq!(line.history(), vec![true]);
        assert_eq!(amp.state(), AmpState::Active);
    }

    #[test]
    fn silence_deasserts_exactly_once() {
        let (mut amp, line) = amp();
        assert_eq!(amp.signal(), Transition::Asserted);
        let transitions: Vec<_> = (0..100).map(|_| amp.tick()).collect();
        assert_eq!(
            transitions.iter().filter(|t| **t == Transition::Deasserted).count(),
            1
        );
        assert_eq!(transitions[WINDOW as usize - 1], Transition::Deasserted);
        assert_eq!(line.history(), vec![true, false]);
        assert_eq!(amp.state(), AmpState::Idle);
    }

    #[test]
    fn signal_one_tick_before_expiry_refreshes_without_toggling() {
        let (mut amp, line) = amp();
        amp.signal();
        for _ in 0..WINDOW - 1 {
            assert_eq!(amp.tick(), Transition::None);
        }
        assert_eq!(amp.remaining(), 1);
        assert_eq!(amp.signal(), Transition::None);
        assert_eq!(amp.remaining(), WINDOW);
        assert_eq!(amp.tick(), Transition::None);
        assert_eq!(line.history(), vec![true]);
    }

    #[test]
    fn reenables_after_idle() {
        let (mut amp, line) = amp();
        amp.signal();
        for _ in 0..WINDOW {
            amp.tick();
        }
        assert_eq!(amp.signal(), Transition::Asserted);
        assert_eq!(line.history(), vec![true, false, true]);
    }

    #[test]
    fn idle_ticks_are_free() {
        let (mut amp, line) = amp();
        for _ in 0..10 {
            assert_eq!(amp.tick(), Transition::None);
        }
        assert!(line.history().is_empty());
    }

    #[test]
    fn window_is_at_least_one_tick() {
        let amp = IdleTimeout::new(RecordingLine::new(), 0);
        assert_eq!(amp.window(), 1);
        assert_eq!(
            IdleTimeout::<RecordingLine>::window_ticks(Duration::from_secs(1), Duration::ZERO),
            1
        );
    }

    #[test]
    fn ticker_thread_expires_window() {
        let line = RecordingLine::new();
        let idle = Arc::new(Mutex::new(IdleTimeout::new(line.clone(), 2)));
        let running = Arc::new(AtomicBool::new(true));
        idle.lock().signal();

        let handle =
            spawn_ticker(Arc::clone(&idle), Duration::from_millis(1), Arc::clone(&running)).unwrap();
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while idle.lock().state() == AmpState::Active && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        running.store(false, Ordering::Relaxed);
        handle.join().unwrap();

        assert_eq!(line.history(), vec![true, false]);
    }
}
