//! Time-stretching via signalsmith-stretch
//!
//! signalsmith-stretch derives its stretch ratio from buffer sizes: each call
//! maps `input_len` frames onto `output_len` frames. The wrapper turns a
//! speed multiplier into output sizes, carries the fractional frame between
//! chunks and parks the produced frames until the caller retrieves them.

use signalsmith_stretch::Stretch;

use super::{clamp_ratio, max_output_frames, StretchEngine};
use crate::engine::FrameRing;
use crate::types::{scale_to_semitones, Sample};

/// Tempo and pitch processor with independent controls
pub struct TimeStretcher {
    stretcher: Stretch,
    channels: usize,
    max_chunk_frames: usize,
    /// Playback-speed multiplier
    ratio: f64,
    pitch_scale: f64,
    /// Fractional output frame carried into the next chunk
    carry: f64,
    /// Output buffer for one `process` / `flush` call
    scratch: Box<[Sample]>,
    /// Produced frames not yet retrieved
    pending: FrameRing,
}

impl TimeStretcher {
    /// Default-quality stretcher
    pub fn new(channels: usize, sample_rate: u32, max_chunk_frames: usize) -> Self {
        let channels = channels.max(1);
        Self::with_stretch(
            Stretch::preset_default(channels as u32, sample_rate),
            channels,
            max_chunk_frames,
        )
    }

    /// Faster stretcher with reduced quality (`preset_cheaper`)
    pub fn new_cheaper(channels: usize, sample_rate: u32, max_chunk_frames: usize) -> Self {
        let channels = channels.max(1);
        Self::with_stretch(
            Stretch::preset_cheaper(channels as u32, sample_rate),
            channels,
            max_chunk_frames,
        )
    }

    fn with_stretch(stretcher: Stretch, channels: usize, max_chunk_frames: usize) -> Self {
        let max_chunk_frames = max_chunk_frames.max(1);
        let tail = stretcher.output_latency();
        let scratch_frames = max_output_frames(max_chunk_frames).max(tail);
        // One chunk's output plus a flush tail on top of whatever is parked
        let pending_frames = 2 * max_output_frames(max_chunk_frames) + tail;
        Self {
            stretcher,
            channels,
            max_chunk_frames,
            ratio: 1.0,
            pitch_scale: 1.0,
            carry: 0.0,
            scratch: vec![0.0; scratch_frames * channels].into_boxed_slice(),
            pending: FrameRing::new(pending_frames, channels),
        }
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    pub fn pitch_scale(&self) -> f64 {
        self.pitch_scale
    }

    /// Output frames a chunk of `frames` input frames produces at the current ratio
    fn output_frames_for(&mut self, frames: usize) -> usize {
        let exact = frames as f64 / self.ratio + self.carry;
        let whole = exact.floor();
        self.carry = exact - whole;
        whole as usize
    }

    fn park(&mut self, frames: usize) {
        let len = frames * self.channels;
        // Sized so a drained engine always accepts one chunk plus its tail
        let _ = self.pending.write(&self.scratch[..len]);
    }
}

impl StretchEngine for TimeStretcher {
    fn channels(&self) -> usize {
        self.channels
    }

    fn set_time_ratio(&mut self, ratio: f64) {
        self.ratio = clamp_ratio(ratio);
    }

    fn set_pitch_scale(&mut self, scale: f64) {
        let scale = clamp_ratio(scale);
        if scale != self.pitch_scale {
            self.pitch_scale = scale;
            self.stretcher
                .set_transpose_factor_semitones(scale_to_semitones(scale) as f32, None);
        }
    }

    fn process(&mut self, input: &[Sample], is_final: bool) {
        let ch = self.channels;
        let frames = (input.len() / ch).min(self.max_chunk_frames);

        if frames > 0 {
            let out_frames = self.output_frames_for(frames);
            if out_frames > 0 {
                let out = &mut self.scratch[..out_frames * ch];
                out.fill(0.0);
                self.stretcher.process(&input[..frames * ch], out);
                self.park(out_frames);
            }
        }

        if is_final {
            let tail = self.stretcher.output_latency();
            if tail > 0 {
                let out = &mut self.scratch[..tail * ch];
                out.fill(0.0);
                self.stretcher.flush(out);
                self.park(tail);
            }
            self.carry = 0.0;
        }
    }

    fn available(&self) -> usize {
        self.pending.available()
    }

    fn retrieve(&mut self, out: &mut [Sample], max_frames: usize) -> usize {
        let frames = max_frames
            .min(self.pending.available())
            .min(out.len() / self.channels);
        self.pending.read(out, frames)
    }

    fn reset(&mut self) {
        self.stretcher.reset();
        self.pending.clear();
        self.carry = 0.0;
    }

    fn tail_frames(&self) -> usize {
        self.stretcher.output_latency()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(frames: usize, channels: usize) -> Vec<Sample> {
        (0..frames * channels)
            .map(|i| ((i / channels) as f32 * 0.05).sin() * 0.5)
            .collect()
    }

    fn drain(stretcher: &mut TimeStretcher) -> usize {
        let mut out = vec![0.0; 4096 * 2];
        let mut total = 0;
        loop {
            let n = stretcher.retrieve(&mut out, 4096);
            if n == 0 {
                return total;
            }
            total += n;
        }
    }

    #[test]
    fn test_creation() {
        let stretcher = TimeStretcher::new(2, 48000, 1024);
        assert_eq!(stretcher.ratio(), 1.0);
        assert_eq!(stretcher.channels(), 2);
        assert!(stretcher.tail_frames() > 0);
        assert_eq!(stretcher.available(), 0);
    }

    #[test]
    fn test_double_speed_halves_output() {
        let mut stretcher = TimeStretcher::new(2, 48000, 1024);
        stretcher.set_time_ratio(2.0);
        let chunk = sine(1024, 2);
        let mut total = 0;
        for _ in 0..8 {
            stretcher.process(&chunk, false);
            total += drain(&mut stretcher);
        }
        assert_eq!(total, 8 * 512);
    }

    #[test]
    fn test_fraction_is_carried() {
        let mut stretcher = TimeStretcher::new_cheaper(2, 48000, 1024);
        stretcher.set_time_ratio(1.5);
        let chunk = sine(1000, 2);
        let mut total = 0;
        for _ in 0..3 {
            stretcher.process(&chunk, false);
            total += drain(&mut stretcher);
        }
        // 3000 / 1.5 exactly, despite 666.67 per chunk
        assert_eq!(total, 2000);
    }

    #[test]
    fn test_final_chunk_appends_tail() {
        let mut stretcher = TimeStretcher::new(2, 48000, 1024);
        let tail = stretcher.stretcher.output_latency();
        stretcher.process(&sine(300, 2), true);
        assert_eq!(drain(&mut stretcher), 300 + tail);

        stretcher.reset();
        stretcher.process(&[], true);
        assert_eq!(drain(&mut stretcher), tail);
    }

    #[test]
    fn test_ratio_and_pitch_are_clamped() {
        let mut stretcher = TimeStretcher::new(1, 48000, 512);
        stretcher.set_time_ratio(100.0);
        assert_eq!(stretcher.ratio(), 4.0);
        stretcher.set_pitch_scale(0.01);
        assert_eq!(stretcher.pitch_scale(), 0.25);
    }
}
