// resonance-core/src/lib.rs

//! The core logic for deep-voice resonance scoring.
//! This crate turns a mono audio buffer into a handful of 0-100 sub-scores
//! (sub-bass, chest, gravel, belly, optional vibration) and one weighted
//! "alpha" composite. It is completely headless and contains no UI code.

pub mod audio;
pub mod buffer;
pub mod config;
pub mod engine;
pub mod fft;
pub mod guard;
pub mod scoring;
pub mod source;
pub mod stability;
pub mod zones;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use buffer::AudioBuffer;
pub use config::{ConfigError, EngineConfig};
pub use engine::{Engine, Session};
pub use source::{AudioSource, CaptureError};

/// The result of scoring a single recording window.
///
/// Created fresh for every analysis call and never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRecord {
    /// Energy share below ~100 Hz.
    pub sub100: u8,
    /// Chest resonance band.
    pub chest: u8,
    /// Upper "gravel"/clarity band.
    pub gravel: u8,
    /// Diaphragm drive, the lowest band.
    pub belly: u8,
    /// Weighted composite of the sub-scores.
    pub alpha: u8,
    /// Frame-to-frame low-band consistency, only for engines that track it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vibration: Option<u8>,
    /// False when the window was silent or could not be captured.
    pub speech_detected: bool,
}

impl ScoreRecord {
    /// The all-zero record returned for silence and failed captures.
    pub fn silent(with_vibration: bool) -> Self {
        Self {
            sub100: 0,
            chest: 0,
            gravel: 0,
            belly: 0,
            alpha: 0,
            vibration: with_vibration.then_some(0),
            speech_detected: false,
        }
    }

    /// Metric name to value, in a stable order.
    pub fn metrics(&self) -> BTreeMap<&'static str, u8> {
        let mut map = BTreeMap::from([
            ("sub100", self.sub100),
            ("chest", self.chest),
            ("gravel", self.gravel),
            ("belly", self.belly),
            ("alpha", self.alpha),
        ]);
        if let Some(vibration) = self.vibration {
            map.insert("vibration", vibration);
        }
        map
    }

    /// True when speech was detected and every reported metric reaches `threshold`.
    pub fn all_at_least(&self, threshold: u8) -> bool {
        self.speech_detected && self.metrics().values().all(|&v| v >= threshold)
    }
}
