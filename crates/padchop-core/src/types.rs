//! Common types for Padchop
//!
//! Fundamental sample, identity and timing helpers shared by the control
//! side and the render side.

use serde::{Deserialize, Serialize};

/// Default sample rate used when the device does not dictate one (48kHz)
pub const SAMPLE_RATE: u32 = 48000;

/// Number of pad slots in a pad bank
pub const NUM_PADS: usize = 16;

/// Maximum number of interleaved channels the render pipeline carries
pub const MAX_CHANNELS: usize = 8;

/// Largest render slice processed in one pass
///
/// Host callbacks asking for more frames are split into slices of this size,
/// so every scratch buffer can be allocated once up front.
/// Covers all common configurations (64 .. 4096 frames).
pub const MAX_BUFFER_SIZE: usize = 8192;

/// Audio sample type (32-bit float for processing)
pub type Sample = f32;

/// Pad identifier (0..NUM_PADS)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PadId(pub u8);

impl PadId {
    /// Create a pad id, returning None when out of range
    pub fn new(index: usize) -> Option<Self> {
        (index < NUM_PADS).then_some(Self(index as u8))
    }

    /// Slot index into a pad bank
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for PadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "pad {}", self.0)
    }
}

/// Playback direction through the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

impl Direction {
    /// Sign applied to elapsed source time when estimating position
    #[inline]
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Forward => 1.0,
            Direction::Reverse => -1.0,
        }
    }

    pub fn from_reverse(reverse: bool) -> Self {
        if reverse {
            Direction::Reverse
        } else {
            Direction::Forward
        }
    }
}

/// Identity of one triggered playback instance
///
/// Every play/trigger gets a fresh id. Fades and completion notices carry
/// the id they belong to so a superseded instance can be recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct VoiceId(pub u64);

/// Convert a pitch offset in semitones to a frequency scale factor
#[inline]
pub fn semitones_to_scale(semitones: f64) -> f64 {
    2.0_f64.powf(semitones / 12.0)
}

/// Convert a frequency scale factor to semitones
#[inline]
pub fn scale_to_semitones(scale: f64) -> f64 {
    if scale > 0.0 {
        12.0 * scale.log2()
    } else {
        0.0
    }
}

/// Seconds to whole frames at the given rate (rounded, never negative)
#[inline]
pub fn seconds_to_frames(seconds: f64, sample_rate: u32) -> usize {
    if seconds <= 0.0 {
        0
    } else {
        (seconds * sample_rate as f64).round() as usize
    }
}

/// Frames to seconds at the given rate
#[inline]
pub fn frames_to_seconds(frames: usize, sample_rate: u32) -> f64 {
    if sample_rate == 0 {
        0.0
    } else {
        frames as f64 / sample_rate as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_id_range() {
        assert_eq!(PadId::new(0), Some(PadId(0)));
        assert_eq!(PadId::new(NUM_PADS - 1).map(|p| p.index()), Some(NUM_PADS - 1));
        assert!(PadId::new(NUM_PADS).is_none());
    }

    #[test]
    fn test_semitone_conversion() {
        assert!((semitones_to_scale(12.0) - 2.0).abs() < 1e-9);
        assert!((semitones_to_scale(-12.0) - 0.5).abs() < 1e-9);
        assert!((scale_to_semitones(2.0) - 12.0).abs() < 1e-9);
        assert_eq!(scale_to_semitones(0.0), 0.0);
    }

    #[test]
    fn test_frame_conversion() {
        assert_eq!(seconds_to_frames(1.0, 48000), 48000);
        assert_eq!(seconds_to_frames(-1.0, 48000), 0);
        assert!((frames_to_seconds(24000, 48000) - 0.5).abs() < 1e-12);
    }
}
