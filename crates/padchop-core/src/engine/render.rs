//! Render side of the engine
//!
//! [`Renderer::render`] is the periodic entry point: the host audio callback
//! calls it with an interleaved output buffer. Each call drains pending
//! commands, then renders in slices no longer than the output ring's target
//! fill (and never more than [`MAX_BUFFER_SIZE`] frames):
//!
//! 1. advance smoothed global pitch/tempo and apply them to the stretch engine
//! 2. top up the input ring from the source at the playhead
//! 3. pump the stretch adapter (input ring -> output ring)
//! 4. detect completion and start the release ramp near the segment end
//! 5. copy from the output ring with envelope and master gain; silence for any shortfall
//!
//! Nothing here allocates, locks or logs. Anomalies are counted in
//! [`RenderStats`] for the control side to read.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::command::{PlayRequest, RenderCommand, RenderEvent};
use super::envelope::{GainEnvelope, ParamSmoother};
use super::stretch_adapter::StretchAdapter;
use super::{FrameRing, SegmentTracker};
use crate::config::EngineConfig;
use crate::source::SharedSource;
use crate::types::{seconds_to_frames, semitones_to_scale, Sample, VoiceId, MAX_BUFFER_SIZE};

/// Lock-free counters published by the render side
///
/// All loads/stores are `Relaxed`: these are diagnostics, not synchronisation.
#[derive(Debug, Default)]
pub struct RenderStats {
    /// Frames filled with silence while a segment was still producing
    underrun_frames: AtomicU64,
    /// Ring writes refused for lack of space
    rejected_writes: AtomicU64,
    /// Commands ignored because the renderer could not act on them
    dropped_commands: AtomicU64,
    /// Events lost because the event queue was full
    dropped_events: AtomicU64,
    /// Id of the rendering voice, 0 when idle
    active_voice: AtomicU64,
}

/// Point-in-time copy of [`RenderStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub underrun_frames: u64,
    pub rejected_writes: u64,
    pub dropped_commands: u64,
    pub dropped_events: u64,
}

impl RenderStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            underrun_frames: self.underrun_frames.load(Ordering::Relaxed),
            rejected_writes: self.rejected_writes.load(Ordering::Relaxed),
            dropped_commands: self.dropped_commands.load(Ordering::Relaxed),
            dropped_events: self.dropped_events.load(Ordering::Relaxed),
        }
    }

    /// Voice currently rendering, as last published by the render side
    #[inline]
    pub fn active_voice(&self) -> Option<VoiceId> {
        match self.active_voice.load(Ordering::Relaxed) {
            0 => None,
            id => Some(VoiceId(id)),
        }
    }
}

/// The segment currently being rendered
#[derive(Debug, Clone, Copy)]
struct ActiveVoice {
    id: VoiceId,
    time_ratio: f64,
    pitch_scale: f64,
    release_frames: usize,
    release_started: bool,
    /// A stop fade is running; the voice goes silent when it ends
    fading: bool,
}

pub struct Renderer {
    commands: rtrb::Consumer<RenderCommand>,
    events: rtrb::Producer<RenderEvent>,
    stats: Arc<RenderStats>,

    channels: usize,
    sample_rate: u32,
    initialized: bool,
    min_attack_seconds: f64,
    /// Tuning kept for re-deriving rate-dependent values on `Init`
    config: EngineConfig,
    /// Frames rendered per slice
    slice_frames: usize,

    source: Option<SharedSource>,
    tracker: SegmentTracker,
    input: FrameRing,
    output: FrameRing,
    adapter: StretchAdapter,

    voice: Option<ActiveVoice>,
    envelope: GainEnvelope,
    master_gain: f32,
    global_tempo: ParamSmoother,
    /// Global pitch offset in semitones
    global_pitch: ParamSmoother,
    /// Ratio and scale last handed to the engine
    applied: (f64, f64),

    /// Source frames staged for the input ring
    fill_scratch: Box<[Sample]>,
    /// Output ring frames staged for delivery
    out_scratch: Box<[Sample]>,
}

impl Renderer {
    /// Build a renderer with every buffer allocated up front
    ///
    /// `config` must have passed [`EngineConfig::validate`].
    pub fn new(
        config: &EngineConfig,
        sample_rate: u32,
        commands: rtrb::Consumer<RenderCommand>,
        events: rtrb::Producer<RenderEvent>,
        stats: Arc<RenderStats>,
    ) -> Self {
        let channels = config.channels;
        let tau = config.smoothing_frames(sample_rate);
        Self {
            commands,
            events,
            stats,
            channels,
            sample_rate,
            initialized: false,
            min_attack_seconds: config.min_attack_seconds(),
            config: config.clone(),
            slice_frames: config.output_target_frames.clamp(1, MAX_BUFFER_SIZE),
            source: None,
            tracker: SegmentTracker::new(),
            input: FrameRing::new(config.input_ring_frames(sample_rate), channels),
            output: FrameRing::new(config.output_ring_frames, channels),
            adapter: StretchAdapter::new(
                channels,
                config.chunk_frames,
                config.output_target_frames,
            ),
            voice: None,
            envelope: GainEnvelope::new(),
            master_gain: config.master_gain,
            global_tempo: ParamSmoother::new(1.0, tau),
            global_pitch: ParamSmoother::new(0.0, tau),
            applied: (1.0, 1.0),
            fill_scratch: vec![0.0; config.chunk_frames * channels].into_boxed_slice(),
            out_scratch: vec![0.0; MAX_BUFFER_SIZE * channels].into_boxed_slice(),
        }
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Voice currently rendering
    pub fn active_voice(&self) -> Option<VoiceId> {
        self.voice.map(|v| v.id)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn stats(&self) -> &Arc<RenderStats> {
        &self.stats
    }

    /// Produce `out.len() / out_channels` interleaved frames
    pub fn render(&mut self, out: &mut [Sample], out_channels: usize) {
        self.process_commands();

        if out_channels == 0 {
            return;
        }
        if !self.initialized {
            out.fill(0.0);
            return;
        }

        for slice in out.chunks_mut(self.slice_frames * out_channels) {
            self.render_slice(slice, out_channels);
        }

        let rejected = self.input.rejected_writes() + self.output.rejected_writes();
        self.stats.rejected_writes.store(rejected, Ordering::Relaxed);
    }

    /// Apply every queued command in arrival order
    fn process_commands(&mut self) {
        while let Ok(command) = self.commands.pop() {
            match command {
                RenderCommand::Init {
                    engine,
                    sample_rate,
                } => {
                    if engine.channels() != self.channels {
                        self.emit(RenderEvent::InitFailed {
                            reason: "stretch engine channel count does not match the engine",
                        });
                    } else if sample_rate == 0 {
                        self.emit(RenderEvent::InitFailed {
                            reason: "sample rate is zero",
                        });
                    } else {
                        self.halt();
                        // The replaced engine drops through basedrop
                        let _ = self.adapter.install(engine);
                        self.sample_rate = sample_rate;
                        let tau = self.config.smoothing_frames(sample_rate);
                        self.global_tempo = ParamSmoother::new(self.global_tempo.target(), tau);
                        self.global_pitch = ParamSmoother::new(self.global_pitch.target(), tau);
                        self.applied = (0.0, 0.0);
                        self.initialized = true;
                        self.emit(RenderEvent::Ready { sample_rate });
                    }
                }
                RenderCommand::Load { source } => {
                    self.halt();
                    self.source = Some(source);
                }
                RenderCommand::Play(request) => self.start(request),
                RenderCommand::Fade { voice, seconds } => match self.voice.as_mut() {
                    Some(active) if active.id == voice => {
                        active.fading = true;
                        let frames = seconds_to_frames(seconds, self.sample_rate);
                        self.envelope.ramp_to(0.0, frames);
                    }
                    _ => self.count_dropped(),
                },
                RenderCommand::Stop => self.halt(),
                RenderCommand::SetGlobalPitch { semitones } => {
                    if semitones.is_finite() {
                        self.global_pitch.set_target(semitones);
                    }
                }
                RenderCommand::SetGlobalTempo { multiplier } => {
                    if multiplier.is_finite() && multiplier > 0.0 {
                        self.global_tempo.set_target(multiplier);
                    }
                }
                RenderCommand::SetMasterGain(gain) => {
                    if gain.is_finite() {
                        self.master_gain = gain.max(0.0);
                    }
                }
            }
        }
    }

    /// Begin a segment, superseding whatever was rendering
    fn start(&mut self, request: PlayRequest) {
        let Some(source) = self.source.as_ref() else {
            self.count_dropped();
            return;
        };
        if !self.initialized {
            self.count_dropped();
            return;
        }
        let source_len = source.len();

        self.halt();
        self.tracker.start(request.segment, source_len);
        self.voice = Some(ActiveVoice {
            id: request.voice,
            time_ratio: request.time_ratio,
            pitch_scale: request.pitch_scale,
            release_frames: seconds_to_frames(request.release_seconds, self.sample_rate),
            release_started: false,
            fading: false,
        });
        self.stats
            .active_voice
            .store(request.voice.0, Ordering::Relaxed);

        let attack = request.attack_seconds.max(self.min_attack_seconds);
        self.envelope.set(0.0);
        self.envelope
            .ramp_to(request.volume, seconds_to_frames(attack, self.sample_rate));
        self.apply_params();
    }

    /// Stop advancing the playhead and clear both rings
    fn halt(&mut self) {
        self.tracker.stop();
        self.input.clear();
        self.output.clear();
        self.adapter.reset();
        self.envelope.set(0.0);
        self.voice = None;
        self.stats.active_voice.store(0, Ordering::Relaxed);
    }

    /// Push combined ratio/pitch to the engine when they changed
    fn apply_params(&mut self) {
        let Some(voice) = self.voice else {
            return;
        };
        let ratio = voice.time_ratio * self.global_tempo.current();
        let scale = voice.pitch_scale * semitones_to_scale(self.global_pitch.current());
        if (ratio, scale) != self.applied {
            self.adapter.set_time_ratio(ratio);
            self.adapter.set_pitch_scale(scale);
            self.applied = (ratio, scale);
        }
    }

    fn render_slice(&mut self, out: &mut [Sample], out_channels: usize) {
        let frames = out.len() / out_channels;

        // 1. parameters
        self.global_tempo.advance(frames);
        self.global_pitch.advance(frames);
        self.apply_params();

        if let Some(voice) = self.voice {
            // 2. source -> input ring
            if let Some(source) = self.source.as_ref() {
                self.tracker
                    .fill(source, &mut self.input, &mut self.fill_scratch);
            }

            // 3. input ring -> stretch -> output ring
            let exhausted = self.tracker.is_exhausted();
            self.adapter.pump(&mut self.input, &mut self.output, exhausted);

            // 4. completion and release
            if exhausted
                && self.input.is_empty()
                && self.adapter.is_drained()
                && self.output.is_empty()
            {
                self.halt();
                self.emit(RenderEvent::Complete { voice: voice.id });
            } else if voice.release_frames > 0
                && !voice.release_started
                && !voice.fading
                && !self.envelope.is_ramping()
            {
                // Waits for the attack to reach `volume`, then fades out over what is left
                let left = self.estimated_output_left(voice.time_ratio);
                if left <= voice.release_frames {
                    self.envelope.ramp_to(0.0, left);
                    if let Some(active) = self.voice.as_mut() {
                        active.release_started = true;
                    }
                }
            }
        }

        // 5. output ring -> device buffer
        let delivered = self.deliver(out, out_channels, frames);
        if delivered < frames {
            out[delivered * out_channels..].fill(0.0);
            if self.voice.is_some() && !(self.tracker.is_exhausted() && self.adapter.is_drained())
            {
                self.stats
                    .underrun_frames
                    .fetch_add((frames - delivered) as u64, Ordering::Relaxed);
            }
        }

        if matches!(self.voice, Some(v) if v.fading) && self.envelope.is_silent() {
            self.halt();
        }
    }

    /// Output frames still to come from the current segment
    fn estimated_output_left(&self, time_ratio: f64) -> usize {
        let ratio = (time_ratio * self.global_tempo.current()).max(f64::EPSILON);
        let unstretched = (self.tracker.remaining() + self.input.available()) as f64;
        (unstretched / ratio) as usize + self.adapter.frames_to_come() + self.output.available()
    }

    /// Copy up to `frames` from the output ring into `out`, returning the count
    ///
    /// Output channel `c` takes ring channel `c`. A mono ring feeds every
    /// output channel; output channels beyond a multichannel ring are silent.
    fn deliver(&mut self, out: &mut [Sample], out_channels: usize, frames: usize) -> usize {
        let count = frames.min(self.output.available());
        if count == 0 {
            return 0;
        }
        let ring_channels = self.channels;
        let read = self.output.read(&mut self.out_scratch, count);

        for (dst, src) in out
            .chunks_exact_mut(out_channels)
            .zip(self.out_scratch.chunks_exact(ring_channels))
            .take(read)
        {
            let gain = self.envelope.next() * self.master_gain;
            for (c, sample) in dst.iter_mut().enumerate() {
                *sample = if ring_channels == 1 {
                    src[0] * gain
                } else if c < ring_channels {
                    src[c] * gain
                } else {
                    0.0
                };
            }
        }
        read
    }

    fn emit(&mut self, event: RenderEvent) {
        if self.events.push(event).is_err() {
            self.stats.dropped_events.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn count_dropped(&self) {
        self.stats.dropped_commands.fetch_add(1, Ordering::Relaxed);
    }
}
