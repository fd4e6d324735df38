//! # Scoring Engine
//!
//! Runs one window through the pipeline:
//!
//! ```text
//! buffer -> guard -> (peak normalization) -> fft -> zones -> normalize -> composite
//!                                                      \-> stability --/
//! ```
//!
//! The public contract never fails: silence and failed captures both produce a
//! zeroed [`ScoreRecord`] with `speech_detected == false`.

use std::time::Duration;

use crate::ScoreRecord;
use crate::buffer::AudioBuffer;
use crate::config::{ConfigError, EngineConfig};
use crate::fft;
use crate::scoring::{SubScores, normalize};
use crate::source::AudioSource;
use crate::stability::StabilityTracker;
use crate::zones::{self, ZoneEnergies, ZoneKind};

/// State that lives for one training session.
///
/// Owned by the caller and passed into every analysis, so independent sessions
/// never share state.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    stability: Option<StabilityTracker>,
}

impl Session {
    /// A fresh session for an engine using `config`.
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            stability: config.stability.map(StabilityTracker::new),
        }
    }

    /// Forgets the previous window, as at the start of a new session.
    pub fn reset(&mut self) {
        if let Some(tracker) = self.stability.as_mut() {
            tracker.reset();
        }
    }

    pub fn stability(&self) -> Option<&StabilityTracker> {
        self.stability.as_ref()
    }
}

/// A validated, immutable scoring engine.
#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// A session matching this engine's stability settings.
    pub fn session(&self) -> Session {
        Session::new(&self.config)
    }

    fn tracks_stability(&self) -> bool {
        self.config.stability.is_some()
    }

    /// Scores one window.
    ///
    /// Silent windows skip all spectral work and leave the session untouched.
    pub fn analyze(&self, session: &mut Session, buffer: &AudioBuffer) -> ScoreRecord {
        let guard = &self.config.guard;
        if !guard.is_voiced(buffer) {
            tracing::debug!(
                level = guard.level(buffer),
                threshold = guard.threshold,
                "no voice activity"
            );
            return ScoreRecord::silent(self.tracks_stability());
        }

        let energies = if self.config.normalize_peak {
            let mut normalized = buffer.clone();
            normalized.normalize_peak();
            self.zone_energies(&normalized)
        } else {
            self.zone_energies(buffer)
        };

        self.score(session, &energies)
    }

    /// Captures one window of the configured duration from `source` and scores it.
    ///
    /// Capture failures are logged and reported as a zeroed record.
    pub fn analyze_source(&self, session: &mut Session, source: &mut dyn AudioSource) -> ScoreRecord {
        self.analyze_capture(session, source, self.config.window_duration())
    }

    /// Like [`Engine::analyze_source`] with an explicit window length.
    pub fn analyze_capture(
        &self,
        session: &mut Session,
        source: &mut dyn AudioSource,
        duration: Duration,
    ) -> ScoreRecord {
        match source.capture(duration) {
            Ok(buffer) => self.analyze(session, &buffer),
            Err(err) => {
                tracing::warn!(%err, "capture failed, reporting silence");
                ScoreRecord::silent(self.tracks_stability())
            }
        }
    }

    /// Spectrum and zone energies of a window that already passed the guard.
    pub fn zone_energies(&self, buffer: &AudioBuffer) -> ZoneEnergies {
        let spectrum = fft::analyze(&buffer.samples, buffer.sample_rate);
        zones::extract(&spectrum, &self.config.zones)
    }

    fn score(&self, session: &mut Session, energies: &ZoneEnergies) -> ScoreRecord {
        let zone_score = |kind: ZoneKind| {
            self.config
                .zone(kind)
                .map_or(0, |zone| normalize(energies.get(kind), energies.total, zone.gain))
        };

        // Raw zone energies, so a change in loudness counts as instability.
        let vibration = session
            .stability
            .as_mut()
            .map(|tracker| tracker.update(energies.sub_bass + energies.chest));

        let sub_scores = SubScores {
            sub_bass: zone_score(ZoneKind::SubBass),
            chest: zone_score(ZoneKind::Chest),
            gravel: zone_score(ZoneKind::Gravel),
            belly: zone_score(ZoneKind::Belly),
            stability: vibration.unwrap_or(0),
        };
        let alpha = self.config.weights.combine(&sub_scores);

        tracing::debug!(
            sub_bass = energies.sub_bass,
            chest = energies.chest,
            gravel = energies.gravel,
            belly = energies.belly,
            total = energies.total,
            alpha,
            "scored window"
        );

        ScoreRecord {
            sub100: sub_scores.sub_bass,
            chest: sub_scores.chest,
            gravel: sub_scores.gravel,
            belly: sub_scores.belly,
            alpha,
            vibration,
            speech_detected: true,
        }
    }
}
