//! Decoded source recording
//!
//! A `Source` is created once per load and never mutated afterwards. It is
//! handed to the render side wrapped in a `basedrop::Shared`, so the last
//! reference can be dropped on the audio thread without freeing memory there.

use basedrop::Shared;

use crate::engine::gc_handle;
use crate::error::{EngineError, EngineResult};
use crate::types::{frames_to_seconds, Sample, MAX_CHANNELS};

/// Per-channel decoded sample arrays plus their sample rate
#[derive(Debug, Clone)]
pub struct Source {
    channels: Vec<Vec<Sample>>,
    sample_rate: u32,
    len: usize,
}

/// Reference-counted source whose deallocation is deferred to the GC thread
pub type SharedSource = Shared<Source>;

impl Source {
    /// Build a source from channel-separated samples
    ///
    /// All channels must have the same length.
    pub fn new(channels: Vec<Vec<Sample>>, sample_rate: u32) -> EngineResult<Self> {
        if channels.is_empty() {
            return Err(EngineError::InvalidSource("no channels".into()));
        }
        if channels.len() > MAX_CHANNELS {
            return Err(EngineError::InvalidSource(format!(
                "{} channels exceeds the maximum of {}",
                channels.len(),
                MAX_CHANNELS
            )));
        }
        if sample_rate == 0 {
            return Err(EngineError::InvalidSource("sample rate is zero".into()));
        }
        let len = channels[0].len();
        if channels.iter().any(|c| c.len() != len) {
            return Err(EngineError::InvalidSource("channel lengths differ".into()));
        }
        Ok(Self {
            channels,
            sample_rate,
            len,
        })
    }

    /// Build a source from interleaved samples [c0, c1, .., c0, c1, ..]
    pub fn from_interleaved(
        interleaved: &[Sample],
        channel_count: usize,
        sample_rate: u32,
    ) -> EngineResult<Self> {
        if channel_count == 0 || interleaved.len() % channel_count != 0 {
            return Err(EngineError::InvalidSource(format!(
                "{} samples cannot be split into {} channels",
                interleaved.len(),
                channel_count
            )));
        }
        let frames = interleaved.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in interleaved.chunks_exact(channel_count) {
            for (ch, &s) in frame.iter().enumerate() {
                channels[ch].push(s);
            }
        }
        Self::new(channels, sample_rate)
    }

    /// Wrap into a GC-backed shared pointer for handing to the render side
    pub fn into_shared(self) -> SharedSource {
        Shared::new(&gc_handle(), self)
    }

    #[inline]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Length in frames
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration_seconds(&self) -> f64 {
        frames_to_seconds(self.len, self.sample_rate)
    }

    #[inline]
    pub fn channel(&self, index: usize) -> &[Sample] {
        &self.channels[index]
    }

    /// Average of all channels, used by offline analysis
    pub fn mono_mix(&self) -> Vec<Sample> {
        let scale = 1.0 / self.channels.len() as Sample;
        (0..self.len)
            .map(|i| self.channels.iter().map(|c| c[i]).sum::<Sample>() * scale)
            .collect()
    }
}
