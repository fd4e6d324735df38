//! # Audio Capture Module
//!
//! Real-time microphone capture using CPAL (Cross-Platform Audio Library).
//!
//! ## Features
//! - Automatic input device and configuration selection
//! - Downmix of any channel count to mono
//! - Fixed-size frame streaming through a crossbeam channel
//! - Blocking single-window capture with a timeout

use cpal::SupportedStreamConfigRange;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use crate::buffer::{AudioBuffer, downmix};
use crate::source::{AudioSource, CaptureError};

/// Number of mono samples per streamed frame.
///
/// ~46ms at 44.1 kHz; small enough for a responsive live mode.
pub const FRAME_SIZE: usize = 2048;

/// Extra time allowed past the window length before a capture gives up.
const CAPTURE_GRACE: Duration = Duration::from_secs(2);

/// Starts streaming mono frames from the default input device.
///
/// This function:
/// 1. Selects the default audio input device
/// 2. Picks an f32 configuration near `target_rate`
/// 3. Downmixes every callback to mono and sends `frame_len`-sample frames
///
/// Frames are sent with `try_send`: when the consumer lags behind a bounded
/// channel, frames are dropped rather than blocking the audio callback.
///
/// # Returns
/// * `Ok((stream, sample_rate))` - Stream handle (capture stops when dropped) and the actual rate
/// * `Err(e)` - No device, no usable configuration, or the stream failed to start
pub fn start_stream(
    sender: Sender<Vec<f32>>,
    target_rate: u32,
    frame_len: usize,
) -> Result<(cpal::Stream, u32), CaptureError> {
    let host = cpal::default_host();
    let device = host.default_input_device().ok_or(CaptureError::NoDevice)?;

    match device.name() {
        Ok(name) => tracing::info!(device = %name, "using audio input device"),
        Err(err) => tracing::warn!(%err, "input device has no readable name"),
    }

    let configs = device
        .supported_input_configs()
        .map_err(|e| CaptureError::Device(e.to_string()))?
        .collect::<Vec<_>>();
    let supported_config =
        find_supported_config(configs, target_rate).ok_or(CaptureError::UnsupportedConfig)?;

    // Clamp into the supported range; `with_sample_rate` does not accept anything else.
    let rate = target_rate.clamp(
        supported_config.min_sample_rate().0,
        supported_config.max_sample_rate().0,
    );
    let config = supported_config.with_sample_rate(cpal::SampleRate(rate));
    let channels = config.channels();
    let config: cpal::StreamConfig = config.into();

    tracing::info!(sample_rate = rate, channels, "selected input configuration");

    let err_fn = |err: cpal::StreamError| tracing::error!(%err, "an error occurred on the audio stream");

    // This buffer will accumulate mono audio from the callback.
    let frame_len = frame_len.max(1);
    let mut audio_buffer = Vec::with_capacity(frame_len * 2);

    let stream = device
        .build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                audio_buffer.extend(downmix(data, channels));

                // While we have enough data for a full frame, send it.
                while audio_buffer.len() >= frame_len {
                    let frame: Vec<f32> = audio_buffer.drain(..frame_len).collect();
                    // Ignore errors if the channel is full or the consumer is gone.
                    let _ = sender.try_send(frame);
                }
            },
            err_fn,
            None,
        )
        .map_err(|e| CaptureError::Device(e.to_string()))?;

    stream
        .play()
        .map_err(|e| CaptureError::Device(e.to_string()))?;

    Ok((stream, rate))
}

/// Finds the best supported f32 input configuration for the target sample rate.
///
/// Mono configurations win over multi-channel ones; among equals the one whose
/// range lies closest to `target_rate` is chosen.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| {
            let min = c.min_sample_rate().0;
            let max = c.max_sample_rate().0;
            let distance = if target_rate < min {
                min - target_rate
            } else {
                target_rate.saturating_sub(max)
            };
            (c.channels() != 1, distance)
        })
}

/// Blocking capture of one window from the default microphone.
///
/// Each capture opens a fresh stream and closes it once the window is full.
#[derive(Debug, Clone)]
pub struct DeviceSource {
    sample_rate: u32,
}

impl DeviceSource {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }
}

impl AudioSource for DeviceSource {
    fn capture(&mut self, duration: Duration) -> Result<AudioBuffer, CaptureError> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let (stream, rate) = start_stream(tx, self.sample_rate, FRAME_SIZE)?;

        let needed = (duration.as_secs_f64() * rate as f64).round() as usize;
        let limit = duration + CAPTURE_GRACE;
        let deadline = Instant::now() + limit;
        let mut samples = Vec::with_capacity(needed + FRAME_SIZE);

        while samples.len() < needed {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(remaining) {
                Ok(frame) => samples.extend_from_slice(&frame),
                Err(RecvTimeoutError::Timeout) => return Err(CaptureError::Timeout(limit)),
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(CaptureError::Device("input stream closed".to_owned()));
                }
            }
        }
        drop(stream);

        samples.truncate(needed);
        tracing::debug!(samples = samples.len(), sample_rate = rate, "captured window");
        Ok(AudioBuffer::new(samples, rate))
    }
}
