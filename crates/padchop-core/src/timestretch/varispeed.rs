//! Linear-interpolation varispeed
//!
//! Reads the input stream at `ratio` frames per output frame, like a tape
//! played faster or slower. Tempo and pitch move together, so the pitch
//! scale is ignored. Output length is exact: a stream of `n` frames yields
//! `ceil(n / ratio)` frames, with no latency.

use super::{clamp_ratio, max_output_frames, StretchEngine};
use crate::engine::FrameRing;
use crate::types::{Sample, MAX_CHANNELS};

pub struct Varispeed {
    channels: usize,
    max_chunk_frames: usize,
    ratio: f64,
    /// Read position of the next output frame, relative to the first frame
    /// of the next chunk. -1.0 addresses `history`.
    position: f64,
    /// Last frame of the previous chunk
    history: [Sample; MAX_CHANNELS],
    finished: bool,
    scratch: Box<[Sample]>,
    pending: FrameRing,
}

impl Varispeed {
    pub fn new(channels: usize, max_chunk_frames: usize) -> Self {
        let channels = channels.clamp(1, MAX_CHANNELS);
        let max_chunk_frames = max_chunk_frames.max(1);
        let max_out = max_output_frames(max_chunk_frames);
        Self {
            channels,
            max_chunk_frames,
            ratio: 1.0,
            position: 0.0,
            history: [0.0; MAX_CHANNELS],
            finished: false,
            scratch: vec![0.0; max_out * channels].into_boxed_slice(),
            pending: FrameRing::new(2 * max_out, channels),
        }
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// Sample `c` of frame `index` in the current chunk; -1 reads history and
    /// indices past the end hold the last frame
    #[inline]
    fn frame_sample(&self, input: &[Sample], frames: usize, index: isize, c: usize) -> Sample {
        if index < 0 || frames == 0 {
            self.history[c]
        } else {
            let i = (index as usize).min(frames - 1);
            input[i * self.channels + c]
        }
    }
}

impl StretchEngine for Varispeed {
    fn channels(&self) -> usize {
        self.channels
    }

    fn set_time_ratio(&mut self, ratio: f64) {
        self.ratio = clamp_ratio(ratio);
    }

    fn set_pitch_scale(&mut self, _scale: f64) {}

    fn process(&mut self, input: &[Sample], is_final: bool) {
        if self.finished {
            return;
        }
        let ch = self.channels;
        let frames = (input.len() / ch).min(self.max_chunk_frames);

        // Interpolating needs the frame after the read position, so the last
        // frame of a chunk is only passed once the next chunk (or the end) arrives
        let limit = if is_final {
            frames as f64
        } else {
            frames as f64 - 1.0
        };

        let capacity = self.scratch.len() / ch;
        let mut produced = 0;
        while self.position < limit && produced < capacity {
            let base = self.position.floor();
            let frac = (self.position - base) as Sample;
            let index = base as isize;
            for c in 0..ch {
                let a = self.frame_sample(input, frames, index, c);
                let b = self.frame_sample(input, frames, index + 1, c);
                self.scratch[produced * ch + c] = a + (b - a) * frac;
            }
            produced += 1;
            self.position += self.ratio;
        }

        if produced > 0 {
            let _ = self.pending.write(&self.scratch[..produced * ch]);
        }

        if frames > 0 {
            let last = (frames - 1) * ch;
            self.history[..ch].copy_from_slice(&input[last..last + ch]);
        }
        self.position -= frames as f64;
        if is_final {
            self.finished = true;
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
        self.position = 0.0;
        self.history = [0.0; MAX_CHANNELS];
        self.finished = false;
        self.pending.clear();
    }

    fn tail_frames(&self) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(frames: usize) -> Vec<Sample> {
        (0..frames).map(|i| i as Sample).collect()
    }

    fn collect(engine: &mut Varispeed) -> Vec<Sample> {
        let mut out = vec![0.0; engine.available() * engine.channels()];
        let n = engine.available();
        engine.retrieve(&mut out, n);
        out
    }

    #[test]
    fn test_unity_ratio_is_identity() {
        let mut engine = Varispeed::new(1, 16);
        let input = ramp(48);
        let mut output = Vec::new();
        for (i, chunk) in input.chunks(16).enumerate() {
            engine.process(chunk, i == 2);
            output.extend(collect(&mut engine));
        }
        assert_eq!(output, input);
    }

    #[test]
    fn test_double_speed_skips_frames() {
        let mut engine = Varispeed::new(1, 16);
        engine.set_time_ratio(2.0);
        engine.process(&ramp(16), false);
        engine.process(&[], true);
        let output = collect(&mut engine);
        assert_eq!(output, (0..8).map(|i| (i * 2) as Sample).collect::<Vec<_>>());
    }

    #[test]
    fn test_half_speed_interpolates_across_chunks() {
        let mut engine = Varispeed::new(1, 4);
        engine.set_time_ratio(0.5);
        engine.process(&[0.0, 1.0, 2.0, 3.0], false);
        engine.process(&[4.0, 5.0], true);
        let output = collect(&mut engine);
        assert_eq!(output.len(), 12);
        assert_eq!(&output[..9], &[0.0, 0.5, 1.0, 1.5, 2.0, 2.5, 3.0, 3.5, 4.0]);
        // Held last frame
        assert_eq!(output[11], 5.0);
    }

    #[test]
    fn test_output_length_is_exact() {
        let mut engine = Varispeed::new(2, 1024);
        engine.set_time_ratio(1.5);
        let chunk = vec![0.1; 1024 * 2];
        let mut total = 0;
        for i in 0..10 {
            engine.process(&chunk, i == 9);
            total += collect(&mut engine).len() / 2;
        }
        assert_eq!(total, (10240.0f64 / 1.5).ceil() as usize);
    }

    #[test]
    fn test_reset_allows_new_stream() {
        let mut engine = Varispeed::new(1, 8);
        engine.process(&ramp(8), true);
        engine.process(&ramp(8), true);
        assert_eq!(collect(&mut engine).len(), 8);
        engine.reset();
        engine.process(&ramp(4), true);
        assert_eq!(collect(&mut engine), ramp(4));
    }
}
