//! # Audio Buffer Module
//!
//! A single recording window: mono `f32` samples at a fixed sample rate.
//! Buffers are owned by one analysis call and dropped once it has been scored.

use std::time::Duration;

/// Peaks at or below this level are left alone by [`AudioBuffer::normalize_peak`].
const NORMALIZE_FLOOR: f32 = 1e-5;

/// One mono recording window.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Amplitude samples, nominally in [-1, 1].
    pub samples: Vec<f32>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self { samples, sample_rate }
    }

    /// Builds a mono buffer from interleaved multi-channel samples by averaging
    /// each frame. A trailing partial frame is dropped.
    pub fn from_interleaved(interleaved: &[f32], channels: u16, sample_rate: u32) -> Self {
        Self::new(downmix(interleaved, channels), sample_rate)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Length of the window in wall-clock time.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }

    /// Largest absolute sample value, 0 for an empty buffer.
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0_f32, |acc, s| acc.max(s.abs()))
    }

    /// Root-mean-square level, 0 for an empty buffer.
    pub fn rms(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f64 = self.samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
        (sum_sq / self.samples.len() as f64).sqrt() as f32
    }

    /// Scales the buffer so its peak is 1.0. Near-silent buffers are untouched.
    pub fn normalize_peak(&mut self) {
        let peak = self.peak();
        if peak > NORMALIZE_FLOOR {
            for sample in self.samples.iter_mut() {
                *sample /= peak;
            }
        }
    }
}

/// Averages interleaved frames down to a single channel.
pub(crate) fn downmix(interleaved: &[f32], channels: u16) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => interleaved.to_vec(),
        n => {
            let n = n as usize;
            interleaved
                .chunks_exact(n)
                .map(|frame| frame.iter().sum::<f32>() / n as f32)
                .collect()
        }
    }
}
