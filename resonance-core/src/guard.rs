//! # Voice-Activity Guard
//!
//! Rejects near-silent windows before any spectral work so the noise floor is
//! never scored as signal. The threshold is a tunable constant, not derived
//! from the data.

use serde::{Deserialize, Serialize};

use crate::buffer::AudioBuffer;

/// How the level of a window is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityMeasure {
    /// Largest absolute sample.
    Peak,
    /// Root-mean-square energy.
    Rms,
}

/// Silence gate run ahead of the spectral analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoiceActivityGuard {
    pub measure: ActivityMeasure,
    /// Windows whose level is strictly below this are silent.
    pub threshold: f32,
}

impl VoiceActivityGuard {
    pub const fn new(measure: ActivityMeasure, threshold: f32) -> Self {
        Self { measure, threshold }
    }

    /// The level of `buffer` under this guard's measure.
    pub fn level(&self, buffer: &AudioBuffer) -> f32 {
        match self.measure {
            ActivityMeasure::Peak => buffer.peak(),
            ActivityMeasure::Rms => buffer.rms(),
        }
    }

    /// Returns `true` when the window carries enough signal to be scored.
    pub fn is_voiced(&self, buffer: &AudioBuffer) -> bool {
        if buffer.is_empty() {
            return false;
        }
        let level = self.level(buffer);
        // NaN samples never pass the gate.
        level.is_finite() && level >= self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(amplitude: f32) -> AudioBuffer {
        let samples = (0..4410)
            .map(|i| amplitude * (2.0 * std::f32::consts::PI * 100.0 * i as f32 / 44100.0).sin())
            .collect();
        AudioBuffer::new(samples, 44100)
    }

    #[test]
    fn zeros_are_silent_under_both_measures() {
        let buffer = AudioBuffer::new(vec![0.0; 44100], 44100);
        assert!(!VoiceActivityGuard::new(ActivityMeasure::Peak, 0.01).is_voiced(&buffer));
        assert!(!VoiceActivityGuard::new(ActivityMeasure::Rms, 0.01).is_voiced(&buffer));
    }

    #[test]
    fn empty_buffer_is_silent() {
        let buffer = AudioBuffer::new(Vec::new(), 44100);
        assert!(!VoiceActivityGuard::new(ActivityMeasure::Peak, 0.0).is_voiced(&buffer));
    }

    #[test]
    fn peak_and_rms_disagree_near_threshold() {
        // Peak 0.012 passes a 0.01 peak gate, RMS ~0.0085 does not pass a 0.01 RMS gate.
        let buffer = tone(0.012);
        assert!(VoiceActivityGuard::new(ActivityMeasure::Peak, 0.01).is_voiced(&buffer));
        assert!(!VoiceActivityGuard::new(ActivityMeasure::Rms, 0.01).is_voiced(&buffer));
    }

    #[test]
    fn loud_tone_is_voiced() {
        let buffer = tone(0.5);
        assert!(VoiceActivityGuard::new(ActivityMeasure::Rms, 0.01).is_voiced(&buffer));
        assert!(VoiceActivityGuard::new(ActivityMeasure::Peak, 0.02).is_voiced(&buffer));
    }
}
