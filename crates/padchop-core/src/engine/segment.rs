//! Segments and the render-side playhead
//!
//! A segment is a directional span of source frames. Forward segments cover
//! `[start, start + length)`. Reverse segments begin at `start` and walk
//! down, visiting `start - 1` through `start - length`.

use crate::source::Source;
use crate::types::{Direction, Sample};

use super::FrameRing;

/// A bounded, directional span of source frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// Frame where playback begins
    pub start: usize,
    /// Number of frames to play
    pub length: usize,
    pub direction: Direction,
}

impl Segment {
    pub fn forward(start: usize, length: usize) -> Self {
        Self {
            start,
            length,
            direction: Direction::Forward,
        }
    }

    pub fn reverse(start: usize, length: usize) -> Self {
        Self {
            start,
            length,
            direction: Direction::Reverse,
        }
    }

    /// Segment running from a cue point to the end (forward) or to frame 0 (reverse)
    ///
    /// Returns None when that span is empty.
    pub fn from_cue(cue: usize, total: usize, direction: Direction) -> Option<Self> {
        let cue = cue.min(total);
        let segment = match direction {
            Direction::Forward => Self::forward(cue, total - cue),
            Direction::Reverse => Self::reverse(cue, cue),
        };
        (segment.length > 0).then_some(segment)
    }

    /// Frame where playback ends (exclusive in the direction of travel)
    pub fn end(&self) -> usize {
        match self.direction {
            Direction::Forward => self.start + self.length,
            Direction::Reverse => self.start.saturating_sub(self.length),
        }
    }

    /// Clamp the segment so every visited frame exists in a source of `total` frames
    pub fn clamped(&self, total: usize) -> Self {
        let start = self.start.min(total);
        let length = match self.direction {
            Direction::Forward => self.length.min(total - start),
            Direction::Reverse => self.length.min(start),
        };
        Self {
            start,
            length,
            direction: self.direction,
        }
    }
}

/// Owns the playhead of the segment currently feeding the input ring
#[derive(Debug, Default)]
pub struct SegmentTracker {
    segment: Option<Segment>,
    /// Absolute source frame of the next read boundary.
    /// Forward: next frame to read. Reverse: one past the next frame to read.
    playhead: usize,
}

impl SegmentTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a segment, clamped to a source of `source_len` frames
    pub fn start(&mut self, segment: Segment, source_len: usize) {
        let segment = segment.clamped(source_len);
        self.playhead = segment.start;
        self.segment = Some(segment);
    }

    pub fn stop(&mut self) {
        self.segment = None;
        self.playhead = 0;
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.segment.is_some()
    }

    pub fn segment(&self) -> Option<&Segment> {
        self.segment.as_ref()
    }

    #[inline]
    pub fn playhead(&self) -> usize {
        self.playhead
    }

    /// Source frames not yet moved into the input ring
    #[inline]
    pub fn remaining(&self) -> usize {
        match self.segment {
            Some(seg) => match seg.direction {
                Direction::Forward => seg.end().saturating_sub(self.playhead),
                Direction::Reverse => self.playhead.saturating_sub(seg.end()),
            },
            None => 0,
        }
    }

    /// True when an active segment has handed over all of its frames
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.segment.is_some() && self.remaining() == 0
    }

    /// Top up `ring` with up to `min(free, remaining)` frames from `source`
    ///
    /// Frames are staged through `scratch` (interleaved, ring channel
    /// layout) in blocks of `scratch.len() / channels` frames. Source channels
    /// beyond the ring's are dropped; a mono source feeds every ring channel.
    /// Returns the number of frames written.
    pub fn fill(&mut self, source: &Source, ring: &mut FrameRing, scratch: &mut [Sample]) -> usize {
        let Some(seg) = self.segment else {
            return 0;
        };
        let ch = ring.channels();
        let src_channels = source.channel_count();
        let block_frames = scratch.len() / ch;
        if block_frames == 0 {
            return 0;
        }

        let mut written = 0;
        loop {
            let n = ring.free().min(self.remaining()).min(block_frames);
            if n == 0 {
                break;
            }

            for c in 0..ch {
                let data = source.channel(c.min(src_channels - 1));
                match seg.direction {
                    Direction::Forward => {
                        let frames = &data[self.playhead..self.playhead + n];
                        for (i, &s) in frames.iter().enumerate() {
                            scratch[i * ch + c] = s;
                        }
                    }
                    Direction::Reverse => {
                        let frames = &data[self.playhead - n..self.playhead];
                        for (i, &s) in frames.iter().rev().enumerate() {
                            scratch[i * ch + c] = s;
                        }
                    }
                }
            }

            if !ring.write(&scratch[..n * ch]) {
                // Cannot happen with n <= free; leave the playhead where it is
                break;
            }
            match seg.direction {
                Direction::Forward => self.playhead += n,
                Direction::Reverse => self.playhead -= n,
            }
            written += n;
        }
        written
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_source(len: usize) -> Source {
        let left: Vec<Sample> = (0..len).map(|i| i as Sample).collect();
        let right: Vec<Sample> = (0..len).map(|i| -(i as Sample)).collect();
        Source::new(vec![left, right], 48000).unwrap()
    }

    fn drain(ring: &mut FrameRing) -> Vec<Sample> {
        let n = ring.available();
        let mut out = vec![0.0; n * ring.channels()];
        ring.read(&mut out, n);
        out
    }

    #[test]
    fn test_from_cue() {
        assert_eq!(Segment::from_cue(60, 100, Direction::Forward), Some(Segment::forward(60, 40)));
        assert_eq!(Segment::from_cue(60, 100, Direction::Reverse), Some(Segment::reverse(60, 60)));
        assert_eq!(Segment::from_cue(100, 100, Direction::Forward), None);
        assert_eq!(Segment::from_cue(0, 100, Direction::Reverse), None);
        // Cue past the end is clamped
        assert_eq!(Segment::from_cue(150, 100, Direction::Reverse), Some(Segment::reverse(100, 100)));
    }

    #[test]
    fn test_end() {
        assert_eq!(Segment::forward(10, 5).end(), 15);
        assert_eq!(Segment::reverse(10, 5).end(), 5);
    }

    #[test]
    fn test_forward_fill_reads_in_order() {
        let source = ramp_source(100);
        let mut ring = FrameRing::new(64, 2);
        let mut scratch = vec![0.0; 16 * 2];
        let mut tracker = SegmentTracker::new();
        tracker.start(Segment::forward(10, 20), source.len());

        assert_eq!(tracker.fill(&source, &mut ring, &mut scratch), 20);
        assert!(tracker.is_exhausted());
        let out = drain(&mut ring);
        let lefts: Vec<Sample> = out.chunks(2).map(|f| f[0]).collect();
        assert_eq!(lefts, (10..30).map(|i| i as Sample).collect::<Vec<_>>());
        assert_eq!(out[1], -10.0);
    }

    #[test]
    fn test_fill_respects_ring_space() {
        let source = ramp_source(1000);
        let mut ring = FrameRing::new(100, 2);
        let mut scratch = vec![0.0; 32 * 2];
        let mut tracker = SegmentTracker::new();
        tracker.start(Segment::forward(0, 1000), source.len());

        assert_eq!(tracker.fill(&source, &mut ring, &mut scratch), 100);
        assert_eq!(tracker.remaining(), 900);
        assert_eq!(tracker.fill(&source, &mut ring, &mut scratch), 0);
    }

    #[test]
    fn test_reverse_mirrors_forward() {
        let source = ramp_source(500);
        let cue = 300;
        let mut scratch = vec![0.0; 64 * 2];

        let mut fwd_ring = FrameRing::new(512, 2);
        let mut fwd = SegmentTracker::new();
        fwd.start(Segment::forward(0, cue), source.len());
        fwd.fill(&source, &mut fwd_ring, &mut scratch);

        let mut rev_ring = FrameRing::new(512, 2);
        let mut rev = SegmentTracker::new();
        rev.start(Segment::reverse(cue, cue), source.len());
        rev.fill(&source, &mut rev_ring, &mut scratch);

        let forward: Vec<Vec<Sample>> = drain(&mut fwd_ring).chunks(2).map(|f| f.to_vec()).collect();
        let mut reverse: Vec<Vec<Sample>> = drain(&mut rev_ring).chunks(2).map(|f| f.to_vec()).collect();
        assert_eq!(forward.len(), cue);
        reverse.reverse();
        assert_eq!(forward, reverse);
        assert!(rev.is_exhausted());
    }

    #[test]
    fn test_mono_source_feeds_all_channels() {
        let source = Source::new(vec![vec![0.25; 8]], 48000).unwrap();
        let mut ring = FrameRing::new(8, 2);
        let mut scratch = vec![0.0; 8 * 2];
        let mut tracker = SegmentTracker::new();
        tracker.start(Segment::forward(0, 8), source.len());
        tracker.fill(&source, &mut ring, &mut scratch);
        assert!(drain(&mut ring).iter().all(|&s| s == 0.25));
    }

    #[test]
    fn test_start_clamps_to_source() {
        let mut tracker = SegmentTracker::new();
        tracker.start(Segment::forward(90, 50), 100);
        assert_eq!(tracker.remaining(), 10);
        tracker.start(Segment::reverse(120, 200), 100);
        assert_eq!(tracker.remaining(), 100);
        tracker.stop();
        assert!(!tracker.is_active());
        assert!(!tracker.is_exhausted());
    }
}
