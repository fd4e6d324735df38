//! # Scoring Module
//!
//! Maps zone energy shares onto bounded 0-100 scores and combines them into the
//! composite "alpha" score.
//!
//! Gain constants are calibration values, tuned so a strong deep voice lands
//! around 80-100 and a weak one around 20-50. They are not physically derived.

use serde::{Deserialize, Serialize};

use crate::fft::ENERGY_EPSILON;

/// Maps a zone's share of the total energy onto 0-100.
///
/// `score = clamp(round(energy / (total + ε) * gain), 0, 100)`. Any non-finite
/// intermediate value scores 0.
pub fn normalize(energy: f64, total: f64, gain: f32) -> u8 {
    let ratio = energy / (total + ENERGY_EPSILON);
    clamp_score(ratio * gain as f64)
}

/// Rounds and clamps a raw score into 0-100.
pub fn clamp_score(raw: f64) -> u8 {
    if !raw.is_finite() {
        return 0;
    }
    raw.round().clamp(0.0, 100.0) as u8
}

/// The normalized inputs to the composite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubScores {
    pub sub_bass: u8,
    pub chest: u8,
    pub gravel: u8,
    pub belly: u8,
    /// 0 when the engine does not track stability.
    pub stability: u8,
}

/// A fixed convex combination of sub-scores.
///
/// Belly participation is an explicit weight rather than an implicit choice;
/// both built-in schemes leave it at zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompositeWeights {
    pub sub_bass: f32,
    pub chest: f32,
    pub gravel: f32,
    #[serde(default)]
    pub belly: f32,
    #[serde(default)]
    pub stability: f32,
}

impl CompositeWeights {
    /// `0.5 sub_bass + 0.3 chest + 0.2 gravel`
    pub const BASELINE: Self = Self {
        sub_bass: 0.5,
        chest: 0.3,
        gravel: 0.2,
        belly: 0.0,
        stability: 0.0,
    };

    /// `0.40 sub_bass + 0.30 chest + 0.20 stability + 0.10 gravel`
    pub const EXTENDED: Self = Self {
        sub_bass: 0.40,
        chest: 0.30,
        gravel: 0.10,
        belly: 0.0,
        stability: 0.20,
    };

    pub fn sum(&self) -> f32 {
        self.sub_bass + self.chest + self.gravel + self.belly + self.stability
    }

    fn terms(&self) -> [f32; 5] {
        [self.sub_bass, self.chest, self.gravel, self.belly, self.stability]
    }

    /// True when every weight is finite and non-negative.
    pub fn is_non_negative(&self) -> bool {
        self.terms().iter().all(|w| w.is_finite() && *w >= 0.0)
    }

    /// Computes the alpha score. Deterministic in its inputs.
    pub fn combine(&self, scores: &SubScores) -> u8 {
        let weighted = self.sub_bass as f64 * scores.sub_bass as f64
            + self.chest as f64 * scores.chest as f64
            + self.gravel as f64 * scores.gravel as f64
            + self.belly as f64 * scores.belly as f64
            + self.stability as f64 * scores.stability as f64;
        clamp_score(weighted)
    }
}

impl Default for CompositeWeights {
    fn default() -> Self {
        Self::BASELINE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_clamps_adversarial_ratios() {
        assert_eq!(normalize(1.0, 1.0, 4200.0), 100);
        assert_eq!(normalize(1e30, 1.0, 1500.0), 100);
        assert_eq!(normalize(0.0, 1.0, 2500.0), 0);
        assert_eq!(normalize(1e-30, 1e30, 2500.0), 0);
        assert_eq!(normalize(-5.0, 1.0, 2500.0), 0);
        assert_eq!(normalize(f64::NAN, 1.0, 2500.0), 0);
        assert_eq!(normalize(f64::INFINITY, 1.0, 2500.0), 0);
    }

    #[test]
    fn normalize_scales_by_gain() {
        // 2% share at gain 2500 -> 50
        assert_eq!(normalize(2.0, 100.0, 2500.0), 50);
        // 1% share at gain 1500 -> 15
        assert_eq!(normalize(1.0, 100.0, 1500.0), 15);
    }

    #[test]
    fn empty_spectrum_does_not_divide_by_zero() {
        assert_eq!(normalize(0.0, 0.0, 4000.0), 0);
    }

    #[test]
    fn builtin_weights_are_convex() {
        assert!((CompositeWeights::BASELINE.sum() - 1.0).abs() < 1e-6);
        assert!((CompositeWeights::EXTENDED.sum() - 1.0).abs() < 1e-6);
        assert!(CompositeWeights::EXTENDED.is_non_negative());
    }

    #[test]
    fn baseline_composite() {
        let scores = SubScores {
            sub_bass: 80,
            chest: 60,
            gravel: 40,
            belly: 100,
            stability: 0,
        };
        // 40 + 18 + 8, belly does not participate
        assert_eq!(CompositeWeights::BASELINE.combine(&scores), 66);
        assert_eq!(
            CompositeWeights::BASELINE.combine(&scores),
            CompositeWeights::BASELINE.combine(&scores)
        );
    }

    #[test]
    fn extended_composite_uses_stability() {
        let scores = SubScores {
            sub_bass: 100,
            chest: 100,
            gravel: 0,
            belly: 0,
            stability: 50,
        };
        // 40 + 30 + 10 + 0
        assert_eq!(CompositeWeights::EXTENDED.combine(&scores), 80);
    }

    #[test]
    fn composite_of_maxed_scores_stays_in_range() {
        let scores = SubScores {
            sub_bass: 100,
            chest: 100,
            gravel: 100,
            belly: 100,
            stability: 100,
        };
        assert_eq!(CompositeWeights::BASELINE.combine(&scores), 100);
        assert_eq!(CompositeWeights::EXTENDED.combine(&scores), 100);
    }
}
