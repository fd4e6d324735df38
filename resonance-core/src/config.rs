//! # Engine Configuration Module
//!
//! One engine instance is driven by one explicit calibration: zone bounds, gain
//! constants, composite weights, silence gate and, optionally, stability
//! tracking. The divergent engines found in the field are kept as named
//! presets instead of being merged into one behavior.
//!
//! ## Presets
//! - `lab`: blocking single-shot recording, RMS gate, peak normalization
//! - `live`: streaming frames, peak gate, harder gains
//! - `resonance`: extended weighting with vibration stability

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::time::Duration;

use crate::guard::{ActivityMeasure, VoiceActivityGuard};
use crate::scoring::CompositeWeights;
use crate::stability::StabilityConfig;
use crate::zones::{FrequencyZone, ZoneKind};

/// Slack allowed on the weight sum for float rounding.
const WEIGHT_SUM_TOLERANCE: f32 = 1e-6;

pub const DEFAULT_PRESET: &str = "lab";

/// A complete calibration for one engine instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Variant identifier, e.g. `lab`.
    pub name: String,
    /// Capture sample rate in Hz.
    pub sample_rate: u32,
    /// Length of one recording window in seconds.
    pub duration_secs: f32,
    pub guard: VoiceActivityGuard,
    /// Scale each window to a peak of 1.0 before the transform.
    #[serde(default)]
    pub normalize_peak: bool,
    /// Exactly one zone per [`ZoneKind`].
    pub zones: Vec<FrequencyZone>,
    pub weights: CompositeWeights,
    /// Present when the engine reports a vibration score.
    #[serde(default)]
    pub stability: Option<StabilityConfig>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("sample rate must be > 0 Hz")]
    ZeroSampleRate,
    #[error("window duration must be a positive number of seconds, got {0}")]
    InvalidDuration(f32),
    #[error("silence threshold must be a non-negative number, got {0}")]
    InvalidThreshold(f32),
    #[error("zone {kind} has invalid bounds {low_hz}..={high_hz} Hz")]
    InvalidZoneBounds {
        kind: ZoneKind,
        low_hz: f32,
        high_hz: f32,
    },
    #[error("zone {kind} must have a positive gain, got {gain}")]
    InvalidGain { kind: ZoneKind, gain: f32 },
    #[error("zone {0} is configured more than once")]
    DuplicateZone(ZoneKind),
    #[error("zone {0} is not configured")]
    MissingZone(ZoneKind),
    #[error("composite weights must be non-negative")]
    NegativeWeight,
    #[error("composite weights sum to {0}, which exceeds 1.0")]
    WeightSumExceeded(f32),
    #[error("stability has a composite weight but stability tracking is disabled")]
    StabilityWeightWithoutTracker,
    #[error("stability sensitivity must be a non-negative number, got {0}")]
    InvalidSensitivity(f32),
}

impl EngineConfig {
    /// Checks every invariant the engine relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == 0 {
            return Err(ConfigError::ZeroSampleRate);
        }
        if !(self.duration_secs.is_finite() && self.duration_secs > 0.0) {
            return Err(ConfigError::InvalidDuration(self.duration_secs));
        }
        let threshold = self.guard.threshold;
        if !(threshold.is_finite() && threshold >= 0.0) {
            return Err(ConfigError::InvalidThreshold(threshold));
        }

        let mut seen = BTreeSet::new();
        for zone in &self.zones {
            let bounds_ok = zone.low_hz.is_finite()
                && zone.high_hz.is_finite()
                && zone.low_hz >= 0.0
                && zone.low_hz <= zone.high_hz;
            if !bounds_ok {
                return Err(ConfigError::InvalidZoneBounds {
                    kind: zone.kind,
                    low_hz: zone.low_hz,
                    high_hz: zone.high_hz,
                });
            }
            if !(zone.gain.is_finite() && zone.gain > 0.0) {
                return Err(ConfigError::InvalidGain {
                    kind: zone.kind,
                    gain: zone.gain,
                });
            }
            if !seen.insert(zone.kind) {
                return Err(ConfigError::DuplicateZone(zone.kind));
            }
        }
        if let Some(missing) = ZoneKind::ALL.into_iter().find(|k| !seen.contains(k)) {
            return Err(ConfigError::MissingZone(missing));
        }

        if !self.weights.is_non_negative() {
            return Err(ConfigError::NegativeWeight);
        }
        let sum = self.weights.sum();
        if sum > 1.0 + WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::WeightSumExceeded(sum));
        }
        match self.stability {
            None if self.weights.stability > 0.0 => {
                return Err(ConfigError::StabilityWeightWithoutTracker);
            }
            Some(s) if !(s.sensitivity.is_finite() && s.sensitivity >= 0.0) => {
                return Err(ConfigError::InvalidSensitivity(s.sensitivity));
            }
            _ => {}
        }
        Ok(())
    }

    /// The configured zone of `kind`, if any.
    pub fn zone(&self, kind: ZoneKind) -> Option<&FrequencyZone> {
        self.zones.iter().find(|z| z.kind == kind)
    }

    /// Length of one recording window.
    pub fn window_duration(&self) -> Duration {
        Duration::from_secs_f32(self.duration_secs.max(0.0))
    }

    /// Number of samples in one recording window.
    pub fn window_len(&self) -> usize {
        (self.sample_rate as f64 * self.duration_secs as f64).round() as usize
    }

    /// Looks up a named calibration preset.
    pub fn preset(name: &str) -> Option<EngineConfig> {
        PRESETS.get(name).cloned()
    }

    /// Names of every built-in preset, sorted.
    pub fn preset_names() -> impl Iterator<Item = &'static str> {
        PRESETS.keys().copied()
    }

    /// Reads and validates a JSON calibration file.
    pub fn load(path: impl AsRef<Path>) -> Result<EngineConfig> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading calibration file {}", path.display()))?;
        let config: EngineConfig = serde_json::from_str(&text)
            .with_context(|| format!("parsing calibration file {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("validating calibration file {}", path.display()))?;
        Ok(config)
    }

    /// Writes this calibration as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)
            .with_context(|| format!("writing calibration file {}", path.display()))
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        lab()
    }
}

/// Built-in presets keyed by variant identifier.
static PRESETS: Lazy<BTreeMap<&'static str, EngineConfig>> = Lazy::new(|| {
    BTreeMap::from([
        ("lab", lab()),
        ("live", live()),
        ("resonance", resonance()),
    ])
});

/// Blocking single-shot analysis at 44.1 kHz.
fn lab() -> EngineConfig {
    EngineConfig {
        name: "lab".to_owned(),
        sample_rate: 44100,
        duration_secs: 3.0,
        guard: VoiceActivityGuard::new(ActivityMeasure::Rms, 0.01),
        normalize_peak: true,
        zones: vec![
            FrequencyZone::new(ZoneKind::SubBass, 50.0, 95.0, 2500.0),
            FrequencyZone::new(ZoneKind::Chest, 150.0, 350.0, 1500.0),
            FrequencyZone::new(ZoneKind::Gravel, 3000.0, 5500.0, 3000.0),
            FrequencyZone::new(ZoneKind::Belly, 20.0, 60.0, 4000.0),
        ],
        weights: CompositeWeights::BASELINE,
        stability: None,
    }
}

/// Streaming frames at 48 kHz with harder gains.
fn live() -> EngineConfig {
    EngineConfig {
        name: "live".to_owned(),
        sample_rate: 48000,
        duration_secs: 1.0,
        guard: VoiceActivityGuard::new(ActivityMeasure::Peak, 0.01),
        normalize_peak: false,
        zones: vec![
            FrequencyZone::new(ZoneKind::SubBass, 50.0, 95.0, 2600.0),
            FrequencyZone::new(ZoneKind::Chest, 150.0, 350.0, 1700.0),
            FrequencyZone::new(ZoneKind::Gravel, 3000.0, 5500.0, 2800.0),
            FrequencyZone::new(ZoneKind::Belly, 20.0, 60.0, 4200.0),
        ],
        weights: CompositeWeights::BASELINE,
        stability: None,
    }
}

/// Extended weighting with vibration stability and the lower chest band.
fn resonance() -> EngineConfig {
    EngineConfig {
        name: "resonance".to_owned(),
        sample_rate: 44100,
        duration_secs: 1.0,
        guard: VoiceActivityGuard::new(ActivityMeasure::Peak, 0.015),
        normalize_peak: false,
        zones: vec![
            FrequencyZone::new(ZoneKind::SubBass, 50.0, 95.0, 2500.0),
            FrequencyZone::new(ZoneKind::Chest, 120.0, 300.0, 1600.0),
            FrequencyZone::new(ZoneKind::Gravel, 2500.0, 5500.0, 3000.0),
            FrequencyZone::new(ZoneKind::Belly, 20.0, 60.0, 4000.0),
        ],
        weights: CompositeWeights::EXTENDED,
        stability: Some(StabilityConfig::default()),
    }
}
