//! # Zone Energy Module
//!
//! Sums spectral energy inside named frequency bands. Each band is a proxy for
//! one perceptual quality of the voice. Bands are evaluated independently, so a
//! bin may count toward more than one zone when their ranges overlap.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::fft::Spectrum;

/// The perceptual quality a zone stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneKind {
    /// Sub-100 Hz depth.
    SubBass,
    /// Chest resonance.
    Chest,
    /// Diaphragm drive, the lowest band.
    Belly,
    /// Upper presence: texture and clarity.
    Gravel,
}

impl ZoneKind {
    pub const ALL: [ZoneKind; 4] = [Self::SubBass, Self::Chest, Self::Belly, Self::Gravel];

    /// Key used for this zone in a score record.
    pub fn metric_key(self) -> &'static str {
        match self {
            Self::SubBass => "sub100",
            Self::Chest => "chest",
            Self::Belly => "belly",
            Self::Gravel => "gravel",
        }
    }
}

impl fmt::Display for ZoneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.metric_key())
    }
}

/// A closed Hz range plus the gain that maps its energy share onto 0-100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyZone {
    pub kind: ZoneKind,
    pub low_hz: f32,
    pub high_hz: f32,
    /// Empirical calibration constant, see `scoring::normalize`.
    pub gain: f32,
}

impl FrequencyZone {
    pub const fn new(kind: ZoneKind, low_hz: f32, high_hz: f32, gain: f32) -> Self {
        Self { kind, low_hz, high_hz, gain }
    }

    /// Inclusive on both ends.
    pub fn contains(&self, hz: f32) -> bool {
        hz >= self.low_hz && hz <= self.high_hz
    }

    /// Summed magnitude of every bin inside this zone.
    pub fn energy(&self, spectrum: &Spectrum) -> f64 {
        spectrum
            .bins()
            .filter(|&(hz, _)| self.contains(hz))
            .map(|(_, magnitude)| magnitude as f64)
            .sum()
    }
}

/// Raw per-zone energies of one window, plus the whole-spectrum total.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ZoneEnergies {
    pub sub_bass: f64,
    pub chest: f64,
    pub belly: f64,
    pub gravel: f64,
    /// Sum of every magnitude in the spectrum, without epsilon.
    pub total: f64,
}

impl ZoneEnergies {
    pub fn get(&self, kind: ZoneKind) -> f64 {
        match kind {
            ZoneKind::SubBass => self.sub_bass,
            ZoneKind::Chest => self.chest,
            ZoneKind::Belly => self.belly,
            ZoneKind::Gravel => self.gravel,
        }
    }

    fn slot(&mut self, kind: ZoneKind) -> &mut f64 {
        match kind {
            ZoneKind::SubBass => &mut self.sub_bass,
            ZoneKind::Chest => &mut self.chest,
            ZoneKind::Belly => &mut self.belly,
            ZoneKind::Gravel => &mut self.gravel,
        }
    }
}

/// Extracts the energy of every configured zone from `spectrum`.
///
/// Zones that are not configured report 0.
pub fn extract(spectrum: &Spectrum, zones: &[FrequencyZone]) -> ZoneEnergies {
    let mut energies = ZoneEnergies {
        total: spectrum.total_energy(),
        ..ZoneEnergies::default()
    };
    for zone in zones {
        *energies.slot(zone.kind) += zone.energy(spectrum);
    }
    energies
}
