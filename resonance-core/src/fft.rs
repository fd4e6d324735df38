//! # Fast Fourier Transform (FFT) Module
//!
//! Converts a recording window into a magnitude spectrum for zone analysis.
//!
//! ## Features
//! - Real-input forward transform using RustFFT
//! - One magnitude per non-negative frequency bin (`N/2 + 1` bins)
//! - Matching bin center frequencies (`k * R / N`)
//!
//! The transform is applied to the raw samples: no windowing and no DC
//! removal, so the zone shares follow the plain spectrum of the recording.

use rustfft::{FftPlanner, num_complex::Complex};

/// Added to every total-energy denominator so an empty or all-zero spectrum
/// never divides by zero.
pub const ENERGY_EPSILON: f64 = 1e-10;

/// Magnitude spectrum paired with the center frequency of each bin.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    /// Non-negative magnitudes, one per bin.
    pub magnitudes: Vec<f32>,
    /// Bin center frequencies in Hz, ascending, same length as `magnitudes`.
    pub frequencies: Vec<f32>,
}

impl Spectrum {
    pub fn len(&self) -> usize {
        self.magnitudes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.magnitudes.is_empty()
    }

    /// Sum of all magnitudes, accumulated in `f64`.
    pub fn total_energy(&self) -> f64 {
        self.magnitudes.iter().map(|&m| m as f64).sum()
    }

    /// Iterates `(frequency_hz, magnitude)` pairs.
    pub fn bins(&self) -> impl Iterator<Item = (f32, f32)> + '_ {
        self.frequencies.iter().copied().zip(self.magnitudes.iter().copied())
    }
}

/// Performs a forward FFT on a signal and returns the complex spectrum for
/// the non-negative frequencies.
///
/// # Arguments
/// * `signal` - Input audio signal of any length
///
/// # Returns
/// * `Vec<Complex<f32>>` - The first `N/2 + 1` coefficients, empty for empty input
pub fn perform_fft(signal: &[f32]) -> Vec<Complex<f32>> {
    let n = signal.len();
    if n == 0 {
        return Vec::new();
    }

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(n);

    let mut buffer: Vec<Complex<f32>> = signal
        .iter()
        .map(|&sample| Complex { re: sample, im: 0.0 })
        .collect();

    fft.process(&mut buffer);

    // The upper half mirrors the lower one for real input.
    buffer.truncate(n / 2 + 1);
    buffer
}

/// Calculates the magnitude vector from a complex spectrum.
pub fn spectrum_to_magnitudes(spectrum: &[Complex<f32>]) -> Vec<f32> {
    spectrum
        .iter()
        .map(|c| c.norm()) // .norm() is sqrt(re^2 + im^2)
        .collect()
}

/// Center frequency of every non-negative bin for a transform of `n` samples.
pub fn bin_frequencies(n: usize, sample_rate: u32) -> Vec<f32> {
    if n == 0 {
        return Vec::new();
    }
    let step = sample_rate as f64 / n as f64;
    (0..=n / 2).map(|k| (k as f64 * step) as f32).collect()
}

/// Produces the magnitude spectrum of a window.
///
/// Pure and deterministic: the same samples always give bit-identical output.
pub fn analyze(samples: &[f32], sample_rate: u32) -> Spectrum {
    let magnitudes = spectrum_to_magnitudes(&perform_fft(samples));
    let frequencies = bin_frequencies(samples.len(), sample_rate);
    debug_assert_eq!(magnitudes.len(), frequencies.len());
    Spectrum { magnitudes, frequencies }
}
