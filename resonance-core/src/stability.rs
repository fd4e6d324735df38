//! # Stability Tracker
//!
//! Scores how steady the combined low-band energy stays from one window to the
//! next, a proxy for sustained vibration/resonance. The input is the raw
//! sub-bass plus chest zone energy of a window, never its normalized scores.
//!
//! The tracker is the only state that outlives a single analysis call. It is
//! owned by a [`Session`](crate::engine::Session) and driven by exactly one
//! frame-delivery path at a time.
//!
//! ## Cold start
//! The first window of a session is compared against 0, so its score is biased
//! low. This is a known artifact of the first window, not special-cased.

use serde::{Deserialize, Serialize};

use crate::scoring::clamp_score;

/// Sensitivity of the stability score to a change in low-band energy.
pub const DEFAULT_SENSITIVITY: f32 = 8000.0;

/// Tracker tuning, part of an engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StabilityConfig {
    pub sensitivity: f32,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            sensitivity: DEFAULT_SENSITIVITY,
        }
    }
}

/// Two-state tracker: uninitialized (`previous == None`) and tracking.
#[derive(Debug, Clone, PartialEq)]
pub struct StabilityTracker {
    previous: Option<f64>,
    sensitivity: f32,
}

impl StabilityTracker {
    pub fn new(config: StabilityConfig) -> Self {
        Self {
            previous: None,
            sensitivity: config.sensitivity,
        }
    }

    /// Whether a baseline from an earlier window exists.
    pub fn is_tracking(&self) -> bool {
        self.previous.is_some()
    }

    /// The low-band energy of the last window, if any.
    pub fn previous(&self) -> Option<f64> {
        self.previous
    }

    /// Feeds the combined low-band energy of one window and returns its score.
    ///
    /// `score = clamp(100 - |combined_low - previous| * sensitivity, 0, 100)`
    pub fn update(&mut self, combined_low: f64) -> u8 {
        if !combined_low.is_finite() {
            return 0;
        }
        let previous = self.previous.unwrap_or(0.0);
        let delta = (combined_low - previous).abs();
        self.previous = Some(combined_low);
        clamp_score(100.0 - delta * self.sensitivity as f64)
    }

    /// Returns to the uninitialized state for a new session.
    pub fn reset(&mut self) {
        self.previous = None;
    }
}

impl Default for StabilityTracker {
    fn default() -> Self {
        Self::new(StabilityConfig::default())
    }
}
