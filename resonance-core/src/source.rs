//! # Capture Sources
//!
//! Every backend answers one question: "give me one window of `duration`".
//! The scoring engine never learns which backend supplied a buffer.
//!
//! - [`FixtureSource`]: replays a fixed buffer, for tests
//! - [`SimulatedSource`]: seeded synthetic voice, for demos without a microphone
//! - [`WavSource`]: consecutive windows of a WAV file
//! - [`StreamSource`]: assembles windows from a stream of frames
//! - [`DeviceSource`](crate::audio::DeviceSource): the default microphone

use crossbeam_channel::{Receiver, RecvTimeoutError};
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::f32::consts::PI;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::buffer::{AudioBuffer, downmix};

/// Why a window could not be captured.
#[derive(thiserror::Error, Debug)]
pub enum CaptureError {
    #[error("no input device available")]
    NoDevice,
    #[error("no supported f32 input configuration")]
    UnsupportedConfig,
    #[error("audio device error: {0}")]
    Device(String),
    #[error("timed out after {0:?} waiting for audio")]
    Timeout(Duration),
    #[error("failed to decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },
    #[error("audio source is exhausted")]
    Exhausted,
}

/// Produces one mono audio window of a requested duration.
pub trait AudioSource {
    fn capture(&mut self, duration: Duration) -> Result<AudioBuffer, CaptureError>;
}

fn samples_for(duration: Duration, sample_rate: u32) -> usize {
    (duration.as_secs_f64() * sample_rate as f64).round() as usize
}

/// Replays a fixed buffer, looping or truncating it to the requested length.
#[derive(Debug, Clone)]
pub struct FixtureSource {
    fixture: AudioBuffer,
}

impl FixtureSource {
    pub fn new(fixture: AudioBuffer) -> Self {
        Self { fixture }
    }
}

impl AudioSource for FixtureSource {
    fn capture(&mut self, duration: Duration) -> Result<AudioBuffer, CaptureError> {
        let len = samples_for(duration, self.fixture.sample_rate);
        let samples = if self.fixture.is_empty() {
            Vec::new()
        } else {
            self.fixture.samples.iter().copied().cycle().take(len).collect()
        };
        Ok(AudioBuffer::new(samples, self.fixture.sample_rate))
    }
}

/// Synthesizes a voiced low tone with harmonics and a noise floor.
///
/// Each window draws a fresh fundamental and level from a seeded generator, so
/// a given seed always replays the same sequence of windows.
#[derive(Debug, Clone)]
pub struct SimulatedSource {
    rng: StdRng,
    sample_rate: u32,
}

impl SimulatedSource {
    pub fn new(sample_rate: u32, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            sample_rate,
        }
    }
}

impl AudioSource for SimulatedSource {
    fn capture(&mut self, duration: Duration) -> Result<AudioBuffer, CaptureError> {
        let len = samples_for(duration, self.sample_rate);
        let fundamental: f32 = self.rng.random_range(65.0..140.0);
        let level: f32 = self.rng.random_range(0.2..0.6);
        let brightness: f32 = self.rng.random_range(0.2..0.8);
        let rate = self.sample_rate as f32;

        let samples = (0..len)
            .map(|i| {
                let t = i as f32 / rate;
                let voiced: f32 = (1..=6)
                    .map(|h| {
                        let h = h as f32;
                        brightness.powf(h - 1.0) * (2.0 * PI * fundamental * h * t).sin()
                    })
                    .sum();
                let noise: f32 = self.rng.random_range(-0.02..0.02);
                (level * voiced * 0.5 + noise).clamp(-1.0, 1.0)
            })
            .collect();
        Ok(AudioBuffer::new(samples, self.sample_rate))
    }
}

/// Reads consecutive windows from a WAV file.
///
/// The file is decoded on the first capture and downmixed to mono. The final
/// window may be shorter than requested.
#[derive(Debug)]
pub struct WavSource {
    path: PathBuf,
    decoded: Option<AudioBuffer>,
    position: usize,
}

impl WavSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            decoded: None,
            position: 0,
        }
    }

    fn decode(&self) -> Result<AudioBuffer, CaptureError> {
        let decode_err = |source: hound::Error| CaptureError::Decode {
            path: self.path.clone(),
            source,
        };
        let reader = hound::WavReader::open(&self.path).map_err(decode_err)?;
        let spec = reader.spec();
        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Int => {
                let max_val = (1_i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|s| s as f32 / max_val))
                    .collect::<Result<_, _>>()
                    .map_err(decode_err)?
            }
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<Result<_, _>>()
                .map_err(decode_err)?,
        };
        tracing::debug!(
            path = %self.path.display(),
            sample_rate = spec.sample_rate,
            channels = spec.channels,
            samples = interleaved.len(),
            "decoded wav"
        );
        Ok(AudioBuffer::new(
            downmix(&interleaved, spec.channels),
            spec.sample_rate,
        ))
    }
}

impl AudioSource for WavSource {
    fn capture(&mut self, duration: Duration) -> Result<AudioBuffer, CaptureError> {
        if self.decoded.is_none() {
            self.decoded = Some(self.decode()?);
        }
        let Some(decoded) = self.decoded.as_ref() else {
            return Err(CaptureError::Exhausted);
        };
        if self.position >= decoded.len() {
            return Err(CaptureError::Exhausted);
        }
        let len = samples_for(duration, decoded.sample_rate);
        let end = (self.position + len).min(decoded.len());
        let window = decoded.samples[self.position..end].to_vec();
        self.position = end;
        Ok(AudioBuffer::new(window, decoded.sample_rate))
    }
}

/// Assembles fixed-duration windows from a stream of mono frames.
///
/// Frames arrive from a single producer (typically an input stream callback);
/// this source is their only consumer.
#[derive(Debug)]
pub struct StreamSource {
    frames: Receiver<Vec<f32>>,
    sample_rate: u32,
    pending: Vec<f32>,
    /// Longest wait for a single frame before giving up.
    frame_timeout: Duration,
}

impl StreamSource {
    pub fn new(frames: Receiver<Vec<f32>>, sample_rate: u32, frame_timeout: Duration) -> Self {
        Self {
            frames,
            sample_rate,
            pending: Vec::new(),
            frame_timeout,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl AudioSource for StreamSource {
    fn capture(&mut self, duration: Duration) -> Result<AudioBuffer, CaptureError> {
        let len = samples_for(duration, self.sample_rate);
        while self.pending.len() < len {
            match self.frames.recv_timeout(self.frame_timeout) {
                Ok(frame) => self.pending.extend_from_slice(&frame),
                Err(RecvTimeoutError::Timeout) => {
                    return Err(CaptureError::Timeout(self.frame_timeout));
                }
                Err(RecvTimeoutError::Disconnected) => return Err(CaptureError::Exhausted),
            }
        }
        let window: Vec<f32> = self.pending.drain(..len).collect();
        Ok(AudioBuffer::new(window, self.sample_rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn fixture_loops_to_requested_length() {
        let mut source = FixtureSource::new(AudioBuffer::new(vec![0.1, 0.2, 0.3], 10));
        let buffer = source.capture(Duration::from_millis(500)).unwrap();
        assert_eq!(buffer.samples, vec![0.1, 0.2, 0.3, 0.1, 0.2]);
        assert_eq!(buffer.sample_rate, 10);
        // Deterministic across calls.
        assert_eq!(source.capture(Duration::from_millis(500)).unwrap(), buffer);
    }

    #[test]
    fn simulated_source_is_seeded() {
        let window = Duration::from_millis(250);
        let a = SimulatedSource::new(8000, 7).capture(window).unwrap();
        let b = SimulatedSource::new(8000, 7).capture(window).unwrap();
        let c = SimulatedSource::new(8000, 8).capture(window).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 2000);
        assert!(a.peak() <= 1.0);
        assert!(a.rms() > 0.05);
    }

    fn write_wav(path: &Path, samples: &[f32], channels: u16) {
        let spec = hound::WavSpec {
            channels,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample((s * i16::MAX as f32) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn wav_source_yields_consecutive_windows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voice.wav");
        // Stereo, 1.5 s: left 0.5, right 0.0 -> mono 0.25
        let interleaved: Vec<f32> = (0..12000).flat_map(|_| [0.5, 0.0]).collect();
        write_wav(&path, &interleaved, 2);

        let mut source = WavSource::new(&path);
        let first = source.capture(Duration::from_secs(1)).unwrap();
        assert_eq!(first.len(), 8000);
        assert_eq!(first.sample_rate, 8000);
        assert!((first.samples[0] - 0.25).abs() < 1e-3);

        let second = source.capture(Duration::from_secs(1)).unwrap();
        assert_eq!(second.len(), 4000);
        assert!(matches!(
            source.capture(Duration::from_secs(1)),
            Err(CaptureError::Exhausted)
        ));
    }

    #[test]
    fn wav_source_reports_decode_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.wav");
        std::fs::write(&path, b"definitely not RIFF").unwrap();
        let err = WavSource::new(&path).capture(Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, CaptureError::Decode { .. }));
        assert!(err.to_string().contains("garbage.wav"));
    }

    #[test]
    fn float_wav_decodes_without_scaling() {
        let mut bytes = Vec::new();
        {
            let spec = hound::WavSpec {
                channels: 1,
                sample_rate: 8000,
                bits_per_sample: 32,
                sample_format: hound::SampleFormat::Float,
            };
            let mut writer = hound::WavWriter::new(Cursor::new(&mut bytes), spec).unwrap();
            for s in [0.5_f32, -0.25] {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("float.wav");
        std::fs::write(&path, bytes).unwrap();
        let buffer = WavSource::new(&path).capture(Duration::from_secs(1)).unwrap();
        assert_eq!(buffer.samples, vec![0.5, -0.25]);
    }

    #[test]
    fn stream_source_assembles_windows_across_frames() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut source = StreamSource::new(rx, 10, Duration::from_millis(50));
        tx.send(vec![1.0; 4]).unwrap();
        tx.send(vec![2.0; 4]).unwrap();
        tx.send(vec![3.0; 4]).unwrap();

        let window = source.capture(Duration::from_millis(500)).unwrap();
        assert_eq!(window.samples, vec![1.0, 1.0, 1.0, 1.0, 2.0]);
        let window = source.capture(Duration::from_millis(500)).unwrap();
        assert_eq!(window.samples, vec![2.0, 2.0, 2.0, 3.0, 3.0]);

        // Two samples remain; the next window times out waiting for more.
        assert!(matches!(
            source.capture(Duration::from_millis(500)),
            Err(CaptureError::Timeout(_))
        ));
        drop(tx);
        assert!(matches!(
            source.capture(Duration::from_millis(500)),
            Err(CaptureError::Exhausted)
        ));
    }
}
