//! xover Platform - amplifier power gating
//!
//! This crate abstracts the hardware line that powers the amplifier and
//! implements the idle-timeout state machine that drives it.
//!
//! # Core Abstractions
//!
//! - [`EnableLine`] - a write-only, idempotent hardware output
//! - [`IdleTimeout`] - ACTIVE/IDLE state machine fed by activity signals and a
//!   fixed-period tick
//! - [`spawn_ticker`] - background thread ticking an [`IdleTimeout`]
//!
//! # Stock lines
//!
//! - [`LogLine`] - logs transitions only (no GPIO available)
//! - [`RecordingLine`] - records every write, for tests
//! - [`Inverted`] - adapts any line to active-low wiring
//!
//! # Example
//!
//! ```rust
//! use xover_platform::{AmpState, IdleTimeout, RecordingLine};
//!
//! let line = RecordingLine::new();
//! let mut amp = IdleTimeout::new(line.clone(), 3);
//!
//! amp.signal();
//! assert_eq!(amp.state(), AmpState::Active);
//! for _ in 0..3 {
//!     amp.tick();
//! }
//! assert_eq!(amp.state(), AmpState::Idle);
//! assert_eq!(line.history(), vec![true, false]);
//! ```

mod idle;
mod line;

pub use idle::{AmpState, IdleTimeout, SharedIdleTimeout, Transition, spawn_ticker};
pub use line::{EnableLine, Inverted, LogLine, RecordingLine};
