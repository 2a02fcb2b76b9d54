//! Just-in-time feeding of the stretch engine
//!
//! Sits between the input ring (raw source frames) and the output ring
//! (stretched frames awaiting delivery). Each pump processes fixed-size
//! chunks only while the output ring is below its target fill level, so the
//! engine never works on more than a chunk ahead of demand.

use basedrop::Owned;

use super::FrameRing;
use crate::timestretch::StretchEngine;
use crate::types::Sample;

/// Stretch engine handed across to the render side
pub type OwnedEngine = Owned<Box<dyn StretchEngine>>;

pub struct StretchAdapter {
    engine: Option<OwnedEngine>,
    channels: usize,
    chunk_frames: usize,
    target_frames: usize,
    /// Interleaved chunk read from the input ring
    chunk: Box<[Sample]>,
    /// Interleaved staging for engine output
    drain: Box<[Sample]>,
    /// The end-of-stream chunk has been sent for the current segment
    flushed: bool,
}

impl StretchAdapter {
    pub fn new(channels: usize, chunk_frames: usize, target_frames: usize) -> Self {
        let channels = channels.max(1);
        let chunk_frames = chunk_frames.max(1);
        Self {
            engine: None,
            channels,
            chunk_frames,
            target_frames,
            chunk: vec![0.0; chunk_frames * channels].into_boxed_slice(),
            drain: vec![0.0; chunk_frames * channels].into_boxed_slice(),
            flushed: false,
        }
    }

    /// Install an engine, returning the one it replaces
    ///
    /// The returned engine must be dropped through its `Owned` wrapper so
    /// the deallocation happens on the collector thread.
    pub fn install(&mut self, engine: OwnedEngine) -> Option<OwnedEngine> {
        self.flushed = false;
        self.engine.replace(engine)
    }

    #[inline]
    pub fn has_engine(&self) -> bool {
        self.engine.is_some()
    }

    pub fn chunk_frames(&self) -> usize {
        self.chunk_frames
    }

    pub fn set_time_ratio(&mut self, ratio: f64) {
        if let Some(engine) = self.engine.as_mut() {
            engine.set_time_ratio(ratio);
        }
    }

    pub fn set_pitch_scale(&mut self, scale: f64) {
        if let Some(engine) = self.engine.as_mut() {
            engine.set_pitch_scale(scale);
        }
    }

    /// Output frames still held inside the engine
    pub fn pending_frames(&self) -> usize {
        self.engine.as_ref().map_or(0, |e| e.available())
    }

    /// Output frames the engine will still produce from input it already holds
    ///
    /// Adds the flush tail while the final chunk has not been processed.
    pub fn frames_to_come(&self) -> usize {
        let tail = match (&self.engine, self.flushed) {
            (Some(engine), false) => engine.tail_frames(),
            _ => 0,
        };
        self.pending_frames() + tail
    }

    /// True once the final chunk was processed and every output frame left the engine
    pub fn is_drained(&self) -> bool {
        self.flushed && self.pending_frames() == 0
    }

    /// Forget engine history for a new segment
    pub fn reset(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            engine.reset();
        }
        self.flushed = false;
    }

    /// Run the feed/drain policy once
    ///
    /// While `output` holds fewer than the target frames: process a full
    /// chunk from `input` if one is there, otherwise, when the source side is
    /// exhausted, process the remainder as the final chunk. Output that does
    /// not fit in `output` stays pending in the engine. Returns frames moved
    /// into `output`.
    pub fn pump(
        &mut self,
        input: &mut FrameRing,
        output: &mut FrameRing,
        source_exhausted: bool,
    ) -> usize {
        let Self {
            engine,
            channels,
            chunk_frames,
            target_frames,
            chunk,
            drain,
            flushed,
        } = self;
        let Some(engine) = engine.as_mut() else {
            return 0;
        };
        let engine: &mut dyn StretchEngine = &mut ***engine;
        let ch = *channels;

        let mut moved = drain_engine(engine, output, drain, ch);
        while output.available() < *target_frames {
            if input.available() >= *chunk_frames {
                input.read(chunk, *chunk_frames);
                engine.process(&chunk[..*chunk_frames * ch], false);
            } else if source_exhausted && !*flushed {
                let rest = input.available();
                input.read(chunk, rest);
                engine.process(&chunk[..rest * ch], true);
                *flushed = true;
            } else {
                break;
            }
            moved += drain_engine(engine, output, drain, ch);
        }
        moved
    }
}

/// Move as many engine frames into `output` as fit
fn drain_engine(
    engine: &mut dyn StretchEngine,
    output: &mut FrameRing,
    scratch: &mut [Sample],
    channels: usize,
) -> usize {
    let block = scratch.len() / channels;
    let mut moved = 0;
    loop {
        let n = engine.available().min(output.free()).min(block);
        if n == 0 {
            break;
        }
        let got = engine.retrieve(scratch, n);
        if got == 0 || !output.write(&scratch[..got * channels]) {
            break;
        }
        moved += got;
    }
    moved
}
