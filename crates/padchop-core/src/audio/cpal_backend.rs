//! CPAL output stream driving the [`Renderer`]
//!
//! Opening is split in two so the engine can be built for the rate the
//! device actually runs at:
//!
//! ```text
//! open_output(config) ──▶ AudioOutput (device + negotiated config)
//!                             │ sample_rate() ──▶ engine_pair(config, rate)
//!                             ▼
//!                  start(renderer) ──▶ AudioHandle (stream alive while held)
//! ```
//!
//! The renderer is moved into the data callback. Nothing in the callback
//! locks or allocates; the callback only calls [`Renderer::render`].

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{BufferSize as CpalBufferSize, SampleFormat, Stream, StreamConfig};

use super::config::AudioConfig;
use super::device::{default_output_device, find_device_by_id};
use super::error::{AudioError, AudioResult};
use crate::engine::Renderer;

/// A device with a negotiated stream config, not yet running
pub struct AudioOutput {
    device: cpal::Device,
    device_name: String,
    stream_config: StreamConfig,
    buffer_size: u32,
}

impl AudioOutput {
    /// Sample rate the device was opened at
    pub fn sample_rate(&self) -> u32 {
        self.stream_config.sample_rate.0
    }

    /// Interleaved channel count of the device stream
    pub fn channels(&self) -> usize {
        self.stream_config.channels as usize
    }

    pub fn buffer_size(&self) -> u32 {
        self.buffer_size
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Build and start the stream, handing `renderer` to the audio thread
    ///
    /// The renderer must have been created for [`sample_rate`](Self::sample_rate).
    pub fn start(self, renderer: Renderer) -> AudioResult<AudioHandle> {
        if renderer.sample_rate() != self.sample_rate() {
            return Err(AudioError::SampleRateMismatch {
                device: self.sample_rate(),
                engine: renderer.sample_rate(),
            });
        }

        let stream = build_output_stream(&self.device, &self.stream_config, renderer)?;
        stream
            .play()
            .map_err(|e| AudioError::StreamPlayError(e.to_string()))?;

        log::info!("Audio stream started on {}", self.device_name);

        Ok(AudioHandle {
            _stream: stream,
            sample_rate: self.sample_rate(),
            buffer_size: self.buffer_size,
        })
    }
}

/// Keeps the output stream alive. Drop this to stop audio.
pub struct AudioHandle {
    _stream: Stream,
    sample_rate: u32,
    buffer_size: u32,
}

impl AudioHandle {
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Requested buffer size in frames
    pub fn buffer_size(&self) -> u32 {
        self.buffer_size
    }

    /// Audio latency in milliseconds (one-way, output only)
    pub fn latency_ms(&self) -> f32 {
        (self.buffer_size as f32 / self.sample_rate as f32) * 1000.0
    }
}

/// Select the device and negotiate its stream config
pub fn open_output(config: &AudioConfig) -> AudioResult<AudioOutput> {
    let device = match &config.device {
        Some(id) => find_device_by_id(id)?,
        None => default_output_device()?,
    };

    let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
    log::info!("Using audio device: {}", device_name);

    let supported = get_output_config(&device, config)?;
    let buffer_size = config.buffer_size.frames();

    let stream_config = StreamConfig {
        channels: supported.channels(),
        sample_rate: supported.sample_rate(),
        buffer_size: CpalBufferSize::Fixed(buffer_size),
    };

    log::info!(
        "Audio config: {} channels, {}Hz, {} frames (~{:.1}ms latency)",
        stream_config.channels,
        stream_config.sample_rate.0,
        buffer_size,
        config.buffer_size.latency_ms(stream_config.sample_rate.0)
    );

    Ok(AudioOutput {
        device,
        device_name,
        stream_config,
        buffer_size,
    })
}

/// Pick the best supported config: f32, stereo or wider, at the target rate
fn get_output_config(
    device: &cpal::Device,
    config: &AudioConfig,
) -> AudioResult<cpal::SupportedStreamConfig> {
    let supported_configs: Vec<_> = device
        .supported_output_configs()
        .map_err(|e| AudioError::ConfigError(e.to_string()))?
        .collect();

    let target = config.target_sample_rate();
    let in_range = |c: &cpal::SupportedStreamConfigRange| {
        target >= c.min_sample_rate().0 && target <= c.max_sample_rate().0
    };

    let best = supported_configs
        .iter()
        .filter(|c| c.sample_format() == SampleFormat::F32)
        .filter(|c| c.channels() >= 2)
        .find(|c| in_range(*c))
        .or_else(|| {
            supported_configs
                .iter()
                .find(|c| c.sample_format() == SampleFormat::F32 && in_range(*c))
        })
        .or_else(|| {
            supported_configs
                .iter()
                .find(|c| c.sample_format() == SampleFormat::F32)
        })
        .ok_or_else(|| AudioError::ConfigError("No f32 output configuration found".to_string()))?;

    let sample_rate = if in_range(best) {
        cpal::SampleRate(target)
    } else {
        let fallback = best.max_sample_rate();
        log::warn!(
            "Audio device doesn't support {}Hz, falling back to {}Hz",
            target,
            fallback.0
        );
        fallback
    };

    Ok(best.clone().with_sample_rate(sample_rate))
}

fn build_output_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    mut renderer: Renderer,
) -> AudioResult<Stream> {
    let channels = config.channels as usize;

    device
        .build_output_stream(
            config,
            move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                renderer.render(data, channels);
            },
            move |err| {
                log::error!("Audio stream error: {}", err);
            },
            None,
        )
        .map_err(|e| AudioError::StreamBuildError(e.to_string()))
}
