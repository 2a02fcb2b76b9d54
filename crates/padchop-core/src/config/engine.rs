//! Render engine tuning

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::timestretch::StretchQuality;
use crate::types::{seconds_to_frames, MAX_CHANNELS};

/// Sizes, ramp lengths and stretch quality of the playback engine
///
/// All fields have defaults, so a config file only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Channels carried through the rings and the stretch engine
    /// Default: 2
    pub channels: usize,

    /// Input ring length in seconds of source audio
    /// Default: 1.5
    pub input_ring_seconds: f64,

    /// Output ring capacity in frames
    /// Default: 8192
    pub output_ring_frames: usize,

    /// Fill level the stretch adapter keeps the output ring at
    /// Must be below `output_ring_frames`.
    /// Default: 4096
    pub output_target_frames: usize,

    /// Frames per stretch engine chunk
    /// Default: 1024
    pub chunk_frames: usize,

    /// Shortest attack ramp applied on trigger, even for a zero attack
    /// Default: 5 ms
    pub min_attack_ms: f64,

    /// Fade length used when a pad is released
    /// Default: 30 ms
    pub stop_fade_ms: f64,

    /// Time constant for global pitch/tempo changes
    /// Default: 30 ms
    pub param_smoothing_ms: f64,

    /// Tolerance for declaring estimated completion
    /// Default: 10 ms
    pub completion_epsilon_ms: f64,

    /// Linear output gain
    /// Default: 1.0
    pub master_gain: f32,

    /// Stretch algorithm
    /// Default: signalsmith default preset
    pub stretch: StretchQuality,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            channels: 2,
            input_ring_seconds: 1.5,
            output_ring_frames: 8192,
            output_target_frames: 4096,
            chunk_frames: 1024,
            min_attack_ms: 5.0,
            stop_fade_ms: 30.0,
            param_smoothing_ms: 30.0,
            completion_epsilon_ms: 10.0,
            master_gain: 1.0,
            stretch: StretchQuality::Default,
        }
    }
}

impl EngineConfig {
    /// Reject sizes and ramp lengths the engine cannot run with
    pub fn validate(&self) -> EngineResult<()> {
        let invalid = |msg: String| -> EngineResult<()> { Err(EngineError::InvalidConfig(msg)) };

        if self.channels == 0 || self.channels > MAX_CHANNELS {
            return invalid(format!(
                "channels must be 1..={}, got {}",
                MAX_CHANNELS, self.channels
            ));
        }
        if self.chunk_frames == 0 {
            return invalid("chunk_frames must be positive".into());
        }
        if !(self.input_ring_seconds > 0.0) {
            return invalid("input_ring_seconds must be positive".into());
        }
        if self.output_target_frames == 0 || self.output_target_frames >= self.output_ring_frames
        {
            return invalid(format!(
                "output_target_frames ({}) must be positive and below output_ring_frames ({})",
                self.output_target_frames, self.output_ring_frames
            ));
        }
        for (name, value) in [
            ("min_attack_ms", self.min_attack_ms),
            ("stop_fade_ms", self.stop_fade_ms),
            ("param_smoothing_ms", self.param_smoothing_ms),
            ("completion_epsilon_ms", self.completion_epsilon_ms),
        ] {
            if !value.is_finite() || value < 0.0 {
                return invalid(format!("{} must be a non-negative number", name));
            }
        }
        if !self.master_gain.is_finite() || self.master_gain < 0.0 {
            return invalid("master_gain must be a non-negative number".into());
        }
        Ok(())
    }

    /// Input ring capacity at `sample_rate`, never smaller than two chunks
    pub fn input_ring_frames(&self, sample_rate: u32) -> usize {
        seconds_to_frames(self.input_ring_seconds, sample_rate).max(2 * self.chunk_frames)
    }

    pub fn stop_fade_seconds(&self) -> f64 {
        self.stop_fade_ms / 1000.0
    }

    pub fn min_attack_seconds(&self) -> f64 {
        self.min_attack_ms / 1000.0
    }

    pub fn completion_epsilon_seconds(&self) -> f64 {
        self.completion_epsilon_ms / 1000.0
    }

    /// Parameter smoothing time constant in frames
    pub fn smoothing_frames(&self, sample_rate: u32) -> f64 {
        self.param_smoothing_ms / 1000.0 * sample_rate as f64
    }
}
