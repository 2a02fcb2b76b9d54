//! Time-stretch / pitch-shift engines
//!
//! The render side drives any engine through [`StretchEngine`]: feed it
//! interleaved chunks, then pull whatever output it has ready. Two
//! implementations exist:
//!
//! - [`TimeStretcher`] wraps signalsmith-stretch (tempo and pitch independent)
//! - [`Varispeed`] is a plain interpolating resampler (tempo bends pitch)

mod signalsmith;
mod varispeed;

pub use signalsmith::TimeStretcher;
pub use varispeed::Varispeed;

use serde::{Deserialize, Serialize};

use crate::types::Sample;

/// Lowest accepted time ratio / pitch scale
pub const MIN_RATIO: f64 = 0.25;
/// Highest accepted time ratio / pitch scale
pub const MAX_RATIO: f64 = 4.0;

/// Chunked tempo/pitch processor
///
/// `time_ratio` is a playback-speed multiplier: 2.0 produces half as many
/// output frames as input frames. Both setters take effect on the next
/// processed chunk.
pub trait StretchEngine: Send {
    /// Interleaved channel count of input and output
    fn channels(&self) -> usize;

    fn set_time_ratio(&mut self, ratio: f64);

    fn set_pitch_scale(&mut self, scale: f64);

    /// Consume one interleaved chunk
    ///
    /// `is_final` marks the end of the stream: any internally delayed
    /// output is flushed after this chunk. `input` may be empty.
    fn process(&mut self, input: &[Sample], is_final: bool);

    /// Output frames ready to retrieve
    fn available(&self) -> usize;

    /// Move up to `max_frames` ready frames into `out` (interleaved)
    fn retrieve(&mut self, out: &mut [Sample], max_frames: usize) -> usize;

    /// Drop all history and pending output
    fn reset(&mut self);

    /// Frames a final chunk appends beyond `n / ratio` when it flushes
    fn tail_frames(&self) -> usize;
}

/// Stretch algorithm choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StretchQuality {
    /// signalsmith-stretch default preset
    #[default]
    Default,
    /// signalsmith-stretch cheaper preset (30-50% less CPU)
    Cheaper,
    /// Linear-interpolation varispeed, no pitch independence
    Bypass,
}

impl std::fmt::Display for StretchQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StretchQuality::Default => "default",
            StretchQuality::Cheaper => "cheaper",
            StretchQuality::Bypass => "bypass",
        };
        f.write_str(name)
    }
}

/// Build an engine for `channels` interleaved channels
///
/// `max_chunk_frames` bounds the size of a single `process` input.
pub fn build_engine(
    quality: StretchQuality,
    channels: usize,
    sample_rate: u32,
    max_chunk_frames: usize,
) -> Box<dyn StretchEngine> {
    match quality {
        StretchQuality::Default => {
            Box::new(TimeStretcher::new(channels, sample_rate, max_chunk_frames))
        }
        StretchQuality::Cheaper => Box::new(TimeStretcher::new_cheaper(
            channels,
            sample_rate,
            max_chunk_frames,
        )),
        StretchQuality::Bypass => Box::new(Varispeed::new(channels, max_chunk_frames)),
    }
}

/// Clamp a ratio or scale into the supported range, mapping non-finite values to 1.0
#[inline]
pub(crate) fn clamp_ratio(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(MIN_RATIO, MAX_RATIO)
    } else {
        1.0
    }
}

/// Worst-case output frames for one chunk, used to size pending buffers
#[inline]
pub(crate) fn max_output_frames(max_chunk_frames: usize) -> usize {
    (max_chunk_frames as f64 / MIN_RATIO).ceil() as usize + 1
}
