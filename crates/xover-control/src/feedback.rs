//! Loudness compensation and woofer protection.
//!
//! Two independent loops feed one gain computation:
//!
//! - **Loudness**: the pre-mix input level selects `loud` in `0..=MAX_LOUD`.
//!   Quiet input gets full low-band boost, loud input none.
//! - **Protection**: each path's output level above the protection threshold
//!   becomes an attenuation in tenths of a dB for that path.
//!
//! For band `b` on path `p` the written gain is
//! `max_b * loud / MAX_LOUD - attenuation_p / 10`, never below the gain floor.
//! Gains are only recomputed when a loop's quantized state changes, and only
//! bands whose value differs from what the graph already holds are written.

use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use xover_config::FeedbackConfig;
use xover_config::keys::{ControllerParam, eq_band_property};
use xover_core::planner::DEFAULT_EQ_BANDS_DB;
use xover_core::{GraphDescription, NodeRole, ParamValue};
use xover_io::GraphBackend;

use crate::slot::{GraphSlot, WriteOutcome};

/// Loudness steps.
pub const MAX_LOUD: u8 = 20;

/// Number of low-frequency equalizer bands.
pub const BAND_COUNT: usize = DEFAULT_EQ_BANDS_DB.len();

/// Band gains for one path, in dB.
pub type BandGains = [f64; BAND_COUNT];

/// A [`FeedbackController`] shared between the telemetry consumer and the
/// reconciler.
pub type SharedController = Arc<Mutex<FeedbackController>>;

/// Feedback loop state.
#[derive(Debug, Clone)]
pub struct FeedbackController {
    config: FeedbackConfig,
    loud: u8,
    loudness_enabled: bool,
    last_loudness_db: Option<f64>,
    attenuation: BTreeMap<usize, u32>,
    protected: BTreeSet<usize>,
    band_max: BandGains,
    applied: BTreeMap<usize, BandGains>,
}

impl FeedbackController {
    /// Create a controller with maximum loudness and no attenuation.
    pub fn new(config: FeedbackConfig) -> Self {
        Self {
            config,
            loud: MAX_LOUD,
            loudness_enabled: false,
            last_loudness_db: None,
            attenuation: BTreeMap::new(),
            protected: BTreeSet::new(),
            band_max: DEFAULT_EQ_BANDS_DB,
            applied: BTreeMap::new(),
        }
    }

    /// Wrap the controller for sharing.
    pub fn shared(self) -> SharedController {
        Arc::new(Mutex::new(self))
    }

    /// Current loudness step.
    pub fn loud(&self) -> u8 {
        self.loud
    }

    /// Current attenuation of `path` in tenths of a dB.
    pub fn attenuation(&self, path: usize) -> u32 {
        self.attenuation.get(&path).copied().unwrap_or(0)
    }

    /// Configured maximum gain of each band.
    pub fn band_max(&self) -> BandGains {
        self.band_max
    }

    /// Current thresholds.
    pub fn config(&self) -> &FeedbackConfig {
        &self.config
    }

    /// Loudness step for an input level.
    ///
    /// ```rust
    /// use xover_config::FeedbackConfig;
    /// use xover_control::FeedbackController;
    ///
    /// let ctl = FeedbackController::new(FeedbackConfig::default());
    /// assert_eq!(ctl.loudness_for_level(-60.0), 20);
    /// assert_eq!(ctl.loudness_for_level(-35.0), 10);
    /// assert_eq!(ctl.loudness_for_level(-10.0), 0);
    /// ```
    pub fn loudness_for_level(&self, level_db: f64) -> u8 {
        let low = self.config.loudness_low_db;
        let high = self.config.loudness_high_db;
        if level_db < low {
            return MAX_LOUD;
        }
        if level_db > high || high <= low {
            return 0;
        }
        let steps = (f64::from(MAX_LOUD) * (high - level_db) / (high - low)).round();
        steps.clamp(0.0, f64::from(MAX_LOUD)) as u8
    }

    /// Attenuation, in tenths of a dB, required for an output level.
    pub fn exceed_for_level(&self, level_db: f64) -> u32 {
        let exceed = ((level_db - self.config.protect_threshold_db) * 10.0).round();
        if exceed.is_nan() || exceed <= 0.0 {
            return 0;
        }
        exceed.min(f64::from(u32::MAX)) as u32
    }

    /// Returns true if a peak at `level_db` counts as amplifier activity.
    pub fn is_activity(&self, level_db: f64) -> bool {
        level_db > self.config.activity_threshold_db
    }

    /// Feed a loudness sensor level. Returns true if `loud` changed.
    ///
    /// Ignored unless the current graph has a loudness sensor.
    pub fn on_loudness(&mut self, level_db: f64) -> bool {
        if !self.loudness_enabled {
            tracing::trace!(peak = level_db, "loudness report without sensor dropped");
            return false;
        }
        self.last_loudness_db = Some(level_db);
        self.set_loud(self.loudness_for_level(level_db))
    }

    fn set_loud(&mut self, loud: u8) -> bool {
        if loud == self.loud {
            return false;
        }
        tracing::debug!(from = self.loud, to = loud, "loudness step changed");
        self.loud = loud;
        true
    }

    /// Feed a protection sensor level for `path`. Returns true if that path's
    /// attenuation changed.
    ///
    /// Ignored unless the current graph has a protection sensor on `path`.
    pub fn on_protection(&mut self, path: usize, level_db: f64) -> bool {
        if !self.protected.contains(&path) {
            tracing::trace!(path, peak = level_db, "protection report without sensor dropped");
            return false;
        }
        let exceed = self.exceed_for_level(level_db);
        let previous = self.attenuation.insert(path, exceed).unwrap_or(0);
        if previous == exceed {
            return false;
        }
        tracing::debug!(path, from = previous, to = exceed, "protection attenuation changed");
        true
    }

    /// Set the maximum gain of `band`. Returns true if it changed.
    pub fn set_band_max(&mut self, band: usize, max_db: f64) -> bool {
        match self.band_max.get_mut(band) {
            Some(slot) if (*slot - max_db).abs() > f64::EPSILON => {
                *slot = max_db;
                true
            }
            Some(_) => false,
            None => {
                tracing::warn!(band, "no such equalizer band");
                false
            }
        }
    }

    /// Update a threshold.
    ///
    /// A new loudness threshold re-evaluates the last seen input level. A new
    /// protection threshold takes effect with the next output level. Returns
    /// true if gains must be recomputed.
    pub fn set_param(&mut self, param: ControllerParam, value_db: f64) -> bool {
        match param {
            ControllerParam::LoudnessLow => self.config.loudness_low_db = value_db,
            ControllerParam::LoudnessHigh => self.config.loudness_high_db = value_db,
            ControllerParam::ProtectThreshold => {
                self.config.protect_threshold_db = value_db;
                return false;
            }
        }
        match self.last_loudness_db {
            Some(level) if self.loudness_enabled => self.set_loud(self.loudness_for_level(level)),
            _ => false,
        }
    }

    /// Gain of `band` on `path`, floored.
    pub fn gain(&self, path: usize, band: usize) -> f64 {
        let max = self.band_max.get(band).copied().unwrap_or(0.0);
        let attenuation = f64::from(self.attenuation(path)) / 10.0;
        let gain = max * f64::from(self.loud) / f64::from(MAX_LOUD) - attenuation;
        gain.max(self.config.gain_floor_db)
    }

    /// All band gains for `path`.
    pub fn gains_for(&self, path: usize) -> BandGains {
        std::array::from_fn(|band| self.gain(path, band))
    }

    /// Reset loop state for a freshly built graph.
    ///
    /// The new graph holds the planner's default band gains. Loops whose
    /// sensor is absent from the new topology return to their neutral state:
    /// full loudness, zero attenuation.
    pub fn on_rebuild(&mut self, description: &GraphDescription) {
        self.applied = description
            .path_indices()
            .map(|p| (p, DEFAULT_EQ_BANDS_DB))
            .collect();

        self.loudness_enabled = description.contains(&NodeRole::LoudnessLevel.node_name(0));
        if !self.loudness_enabled {
            self.loud = MAX_LOUD;
            self.last_loudness_db = None;
        }

        self.protected = description
            .path_indices()
            .filter(|p| description.contains(&NodeRole::ProtectLevel.node_name(*p)))
            .collect();
        let protected = &self.protected;
        self.attenuation.retain(|path, _| protected.contains(path));
    }

    /// Write every band gain that differs from what the graph holds.
    ///
    /// Returns the number of properties written.
    pub fn apply<B: GraphBackend>(&mut self, slot: &mut GraphSlot<B>) -> usize {
        let mut written = 0;
        for path in slot.path_indices() {
            let target = self.gains_for(path);
            let node = NodeRole::Equalizer.node_name(path);
            let applied = self.applied.entry(path).or_insert([f64::NAN; BAND_COUNT]);
            for (band, gain) in target.iter().copied().enumerate() {
                if applied[band] == gain {
                    continue;
                }
                let property = eq_band_property(band);
                match slot.write(&node, &property, &ParamValue::Number(gain)) {
                    WriteOutcome::Applied => {
                        applied[band] = gain;
                        written += 1;
                    }
                    WriteOutcome::Absent | WriteOutcome::NoGraph => break,
                    WriteOutcome::Rejected(_) => {}
                }
            }
        }
        if written > 0 {
            tracing::debug!(written, loud = self.loud, "equalizer gains updated");
        }
        written
    }
}
