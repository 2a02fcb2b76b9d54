//! Control-side state machine
//!
//! The [`Controller`] owns cue points, per-trigger parameters and transport
//! semantics. It never touches render state directly: every transition is
//! sent to the [`Renderer`] as a [`RenderCommand`], and render-side events
//! come back through [`Controller::tick`].
//!
//! ```text
//! Idle ──play──▶ GlobalPlaying ──pause / complete──▶ Idle
//! Idle ──trigger_pad──▶ PadPlaying ──stop_pad / complete──▶ Idle
//! ```
//!
//! Starting either playing state supersedes the other: there is one voice.

use std::sync::Arc;

use basedrop::Owned;

use super::clock::{Clock, SystemClock};
use super::params::PlaybackParams;
use super::position::Playback;
use super::state::{EngineState, Mode};
use crate::config::EngineConfig;
use crate::engine::{
    command_channel, event_channel, gc_handle, PlayRequest, RenderCommand, RenderEvent,
    RenderStats, Renderer, Segment, StatsSnapshot,
};
use crate::error::{EngineError, EngineResult};
use crate::source::{SharedSource, Source};
use crate::timestretch::{build_engine, StretchEngine};
use crate::types::{frames_to_seconds, seconds_to_frames, Direction, PadId, VoiceId};

/// Handshake state with the render side
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Lifecycle {
    /// No engine sent yet
    #[default]
    Uninitialized,
    /// Engine sent, waiting for `Ready`
    Initializing,
    Ready,
    /// The render side refused the engine; `init` may be retried
    Failed(String),
}

/// Notifications produced by [`Controller::tick`]
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Ready,
    InitFailed(String),
    /// A segment ran to its end; `position` is the snapped end position
    Completed { mode: Mode, position: f64 },
    /// A released pad finished its fade and handed back to the global transport
    Released { pad: PadId },
}

/// Loaded source as seen from the control side
#[derive(Debug, Clone, Copy)]
struct SourceInfo {
    frames: usize,
    duration: f64,
}

/// A stop fade in flight
#[derive(Debug, Clone, Copy)]
struct PendingRelease {
    pad: PadId,
    voice: VoiceId,
    due: f64,
}

pub struct Controller {
    config: EngineConfig,
    sample_rate: u32,
    clock: Box<dyn Clock>,
    commands: rtrb::Producer<RenderCommand>,
    events: rtrb::Consumer<RenderEvent>,
    stats: Arc<RenderStats>,

    lifecycle: Lifecycle,
    source: Option<SourceInfo>,
    state: EngineState,
    global_offset: f64,
    global_pitch_semitones: f64,
    global_speed: f64,
    master_gain: f32,
    next_voice: u64,
    pending_release: Option<PendingRelease>,
    /// Stored modulation did not reach the render side and is re-sent by `tick`
    globals_dirty: bool,
}

/// Build a connected controller/renderer pair using the wall clock
///
/// The renderer belongs on the audio thread (see `audio::AudioOutput::start`);
/// the controller stays with the caller.
pub fn engine_pair(config: EngineConfig, sample_rate: u32) -> EngineResult<(Controller, Renderer)> {
    engine_pair_with_clock(config, sample_rate, Box::new(SystemClock::new()))
}

/// Build a connected controller/renderer pair with a custom clock
pub fn engine_pair_with_clock(
    config: EngineConfig,
    sample_rate: u32,
    clock: Box<dyn Clock>,
) -> EngineResult<(Controller, Renderer)> {
    config.validate()?;
    if sample_rate == 0 {
        return Err(EngineError::InvalidConfig("sample rate is zero".into()));
    }

    let (command_tx, command_rx) = command_channel();
    let (event_tx, event_rx) = event_channel();
    let stats = Arc::new(RenderStats::new());

    let renderer = Renderer::new(&config, sample_rate, command_rx, event_tx, stats.clone());
    let master_gain = config.master_gain;
    let controller = Controller {
        config,
        sample_rate,
        clock,
        commands: command_tx,
        events: event_rx,
        stats,
        lifecycle: Lifecycle::Uninitialized,
        source: None,
        state: EngineState::default(),
        global_offset: 0.0,
        global_pitch_semitones: 0.0,
        global_speed: 1.0,
        master_gain,
        next_voice: 0,
        pending_release: None,
        globals_dirty: false,
    };
    Ok((controller, renderer))
}

impl Controller {
    // ─────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────

    /// Hand a stretch engine to the render side
    ///
    /// The handshake completes when `tick` reports `Notice::Ready`. Calling
    /// this again after a failure retries with the new engine.
    pub fn init(&mut self, engine: Box<dyn StretchEngine>) -> EngineResult<()> {
        log::info!(
            "Initializing render engine ({} channels, {} Hz)",
            engine.channels(),
            self.sample_rate
        );
        let engine = Owned::new(&gc_handle(), engine);
        self.send(RenderCommand::Init {
            engine,
            sample_rate: self.sample_rate,
        })?;
        self.lifecycle = Lifecycle::Initializing;
        Ok(())
    }

    /// `init` with the engine named by the configured stretch quality
    pub fn init_default(&mut self) -> EngineResult<()> {
        let engine = build_engine(
            self.config.stretch,
            self.config.channels,
            self.sample_rate,
            self.config.chunk_frames,
        );
        self.init(engine)
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.lifecycle == Lifecycle::Ready
    }

    /// Replace the source, stopping anything that plays
    pub fn load(&mut self, source: Source) -> EngineResult<()> {
        if !self.check_ready("load") {
            return Err(EngineError::NotInitialized);
        }
        if source.sample_rate() != self.sample_rate {
            return Err(EngineError::InvalidSource(format!(
                "source rate {} Hz does not match engine rate {} Hz",
                source.sample_rate(),
                self.sample_rate
            )));
        }
        let info = SourceInfo {
            frames: source.len(),
            duration: frames_to_seconds(source.len(), self.sample_rate),
        };
        let shared: SharedSource = source.into_shared();
        self.send(RenderCommand::Load { source: shared })?;

        log::info!("Loaded source: {:.2}s", info.duration);
        self.source = Some(info);
        self.state = EngineState::default();
        self.global_offset = 0.0;
        self.pending_release = None;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────
    // Global transport
    // ─────────────────────────────────────────────────────────────

    /// Play the recording from the global offset at unity parameters
    ///
    /// No-op while the global transport already plays or nothing is loaded.
    /// A playing pad is superseded.
    pub fn play(&mut self) {
        if !self.check_ready("play") {
            return;
        }
        let Some(source) = self.source else {
            log::debug!("play: no source loaded");
            return;
        };
        if self.state.mode == Mode::Global && self.state.is_playing() {
            return;
        }

        // At (or within half a frame of) the end, start over from the top
        let mut start = seconds_to_frames(self.global_offset, self.sample_rate).min(source.frames);
        if start == source.frames {
            self.global_offset = 0.0;
            start = 0;
        }
        let duration = source.duration - self.global_offset;
        let length = source.frames - start;
        if length == 0 {
            log::debug!("play: source is empty");
            return;
        }

        let params = PlaybackParams::default();
        let request = self.play_request(Segment::forward(start, length), &params);
        if self.send(RenderCommand::Play(request)).is_err() {
            return;
        }

        let now = self.clock.now();
        self.state.mode = Mode::Global;
        self.state.params = params;
        self.state.playback = Some(Playback::new(
            request.voice,
            self.global_offset,
            duration,
            Direction::Forward,
            now,
            self.global_speed,
        ));
        log::debug!("play: from {:.3}s for {:.3}s", self.global_offset, duration);
    }

    /// Stop playback and remember where the global transport was
    ///
    /// Pausing a pad stops it without moving the global offset. When the
    /// command queue is full nothing changes and playback continues.
    pub fn pause(&mut self) {
        if !self.check_ready("pause") {
            return;
        }
        if let Some(playback) = self.state.playback {
            if self.send(RenderCommand::Stop).is_err() {
                return;
            }
            if self.state.mode == Mode::Global {
                self.global_offset = playback.position(self.clock.now(), self.duration());
            }
        }
        self.pending_release = None;
        self.state.reset_to_idle();
    }

    /// Move the global offset, restarting global playback there if it was playing
    pub fn seek(&mut self, seconds: f64) {
        if !self.check_ready("seek") {
            return;
        }
        let target = if seconds.is_finite() {
            seconds.clamp(0.0, self.duration())
        } else {
            0.0
        };
        let global_playing = self.state.mode == Mode::Global && self.state.is_playing();
        if global_playing {
            self.pause();
            if self.state.is_playing() {
                return;
            }
            self.global_offset = target;
            self.play();
        } else {
            self.global_offset = target;
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Pads
    // ─────────────────────────────────────────────────────────────

    /// Play from `cue_seconds` to the end (or back to 0 when reversed)
    ///
    /// Supersedes whatever plays. A trigger whose segment would be empty is
    /// rejected and leaves the state unchanged.
    pub fn trigger_pad(
        &mut self,
        pad: PadId,
        cue_seconds: f64,
        params: PlaybackParams,
    ) -> EngineResult<VoiceId> {
        if !self.check_ready("trigger_pad") {
            return Err(EngineError::NotInitialized);
        }
        let Some(source) = self.source else {
            return Err(EngineError::NoSource);
        };
        let params = params.sanitized();
        let cue = if cue_seconds.is_finite() {
            cue_seconds.clamp(0.0, source.duration)
        } else {
            0.0
        };
        let duration = match params.direction {
            Direction::Forward => source.duration - cue,
            Direction::Reverse => cue,
        };
        let cue_frame = seconds_to_frames(cue, self.sample_rate);
        let segment = Segment::from_cue(cue_frame, source.frames, params.direction);
        let (Some(segment), true) = (segment, duration > 0.0) else {
            log::warn!(
                "trigger_pad: {} rejected, cue {:.3}s gives duration {:.3}s",
                pad,
                cue,
                duration
            );
            return Err(EngineError::InvalidTrigger {
                pad,
                cue,
                duration,
            });
        };

        let request = self.play_request(segment, &params);
        self.send(RenderCommand::Play(request))?;

        let now = self.clock.now();
        if let (Mode::Global, Some(playback)) = (self.state.mode, self.state.playback) {
            // Global playback ends here; keep its place for the next play()
            self.global_offset = playback.position(now, source.duration);
        }
        self.state.mode = Mode::Pad(pad);
        self.state.params = params;
        self.state.playback = Some(Playback::new(
            request.voice,
            cue,
            duration,
            params.direction,
            now,
            params.time_ratio * self.global_speed,
        ));
        log::debug!(
            "trigger_pad: {} cue {:.3}s {:?} for {:.3}s",
            pad,
            cue,
            params.direction,
            duration
        );
        Ok(request.voice)
    }

    /// Fade out the active pad, then hand back to the paused global transport
    ///
    /// The hand-back happens in `tick` once the fade is over, and only if the
    /// released trigger is still the one playing.
    pub fn stop_pad(&mut self) {
        if !self.check_ready("stop_pad") {
            return;
        }
        let (Mode::Pad(pad), Some(playback)) = (self.state.mode, self.state.playback) else {
            return;
        };
        if self.pending_release.is_some_and(|r| r.voice == playback.voice) {
            return;
        }
        let seconds = self.config.stop_fade_seconds();
        if self
            .send(RenderCommand::Fade {
                voice: playback.voice,
                seconds,
            })
            .is_err()
        {
            return;
        }
        self.pending_release = Some(PendingRelease {
            pad,
            voice: playback.voice,
            due: self.clock.now() + seconds,
        });
    }

    // ─────────────────────────────────────────────────────────────
    // Global modulation
    // ─────────────────────────────────────────────────────────────

    /// Pitch offset applied on top of every trigger's own pitch (ramped)
    pub fn set_global_pitch_offset(&mut self, semitones: f64) {
        if !semitones.is_finite() {
            log::warn!("set_global_pitch_offset: ignoring {}", semitones);
            return;
        }
        self.global_pitch_semitones = semitones;
        if self.is_ready() && self.send(RenderCommand::SetGlobalPitch { semitones }).is_err() {
            self.globals_dirty = true;
        }
    }

    /// Speed multiplier applied on top of every trigger's own ratio (ramped)
    pub fn set_global_speed(&mut self, multiplier: f64) {
        if !multiplier.is_finite() || multiplier <= 0.0 {
            log::warn!("set_global_speed: ignoring {}", multiplier);
            return;
        }
        let now = self.clock.now();
        let ratio = self.state.params.time_ratio;
        if let Some(playback) = self.state.playback.as_mut() {
            playback.rebase(now, ratio * multiplier);
        }
        self.global_speed = multiplier;
        if self.is_ready() && self.send(RenderCommand::SetGlobalTempo { multiplier }).is_err() {
            self.globals_dirty = true;
        }
    }

    pub fn set_master_gain(&mut self, gain: f32) {
        if !gain.is_finite() {
            log::warn!("set_master_gain: ignoring {}", gain);
            return;
        }
        self.master_gain = gain.max(0.0);
        if self.is_ready() && self.send(RenderCommand::SetMasterGain(self.master_gain)).is_err() {
            self.globals_dirty = true;
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Polling
    // ─────────────────────────────────────────────────────────────

    /// Process render events, finished releases and estimated completion
    ///
    /// Call regularly from the control thread (every UI frame or so).
    ///
    /// Completion by the wall-clock estimate only resets control state; no
    /// `Stop` is sent. The renderer plays out what it has buffered and halts
    /// the voice itself when the segment drains. A release `Stop` or global
    /// setting that found the queue full is retried here.
    pub fn tick(&mut self) -> Vec<Notice> {
        let mut notices = Vec::new();

        while let Ok(event) = self.events.pop() {
            match event {
                RenderEvent::Ready { sample_rate } => {
                    log::info!("Render engine ready at {} Hz", sample_rate);
                    self.lifecycle = Lifecycle::Ready;
                    self.push_globals();
                    notices.push(Notice::Ready);
                }
                RenderEvent::InitFailed { reason } => {
                    log::error!("Render engine initialization failed: {}", reason);
                    self.lifecycle = Lifecycle::Failed(reason.to_string());
                    notices.push(Notice::InitFailed(reason.to_string()));
                }
                RenderEvent::Complete { voice } => {
                    if self.state.playback.is_some_and(|p| p.voice == voice) {
                        notices.extend(self.complete());
                    }
                }
            }
        }

        let now = self.clock.now();
        if let Some(release) = self.pending_release {
            if now >= release.due {
                match self.state.playback {
                    Some(playback) if playback.voice == release.voice => {
                        // Stays pending until the stop is queued
                        if self.send(RenderCommand::Stop).is_ok() {
                            self.pending_release = None;
                            self.global_offset = playback.cue;
                            self.state.reset_to_idle();
                            notices.push(Notice::Released { pad: release.pad });
                        }
                    }
                    // Superseded by a later trigger, or already complete
                    _ => self.pending_release = None,
                }
            }
        }

        let epsilon = self.config.completion_epsilon_seconds();
        if self
            .state
            .playback
            .is_some_and(|p| p.is_complete(now, epsilon))
        {
            notices.extend(self.complete());
        }

        if self.globals_dirty && self.is_ready() {
            self.push_globals();
        }

        notices
    }

    // ─────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────

    /// Estimated playback position in seconds, or the global offset when idle
    pub fn position(&self) -> f64 {
        match self.state.playback {
            Some(playback) => playback.position(self.clock.now(), self.duration()),
            None => self.global_offset,
        }
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.state.is_playing()
    }

    pub fn mode(&self) -> Mode {
        self.state.mode
    }

    pub fn active_pad(&self) -> Option<PadId> {
        self.state.active_pad()
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn global_offset(&self) -> f64 {
        self.global_offset
    }

    /// Loaded source length in seconds (0 when nothing is loaded)
    pub fn duration(&self) -> f64 {
        self.source.map_or(0.0, |s| s.duration)
    }

    pub fn global_pitch_offset(&self) -> f64 {
        self.global_pitch_semitones
    }

    pub fn global_speed(&self) -> f64 {
        self.global_speed
    }

    pub fn master_gain(&self) -> f32 {
        self.master_gain
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    // ─────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────

    /// Finish the current playback at its snapped end position
    fn complete(&mut self) -> Option<Notice> {
        let playback = self.state.playback?;
        let mode = self.state.mode;
        let position = playback.end_position(self.duration());

        let mut notices = None;
        match mode {
            Mode::Global => self.global_offset = position,
            Mode::Pad(pad) => {
                if self.pending_release.is_some_and(|r| r.voice == playback.voice) {
                    // Ran out during its stop fade: same outcome as the release
                    self.pending_release = None;
                    self.global_offset = playback.cue;
                    notices = Some(Notice::Released { pad });
                }
            }
        }
        self.state.reset_to_idle();
        log::debug!("Completed {} at {:.3}s", mode, position);
        notices.or(Some(Notice::Completed { mode, position }))
    }

    fn play_request(&mut self, segment: Segment, params: &PlaybackParams) -> PlayRequest {
        self.next_voice += 1;
        PlayRequest {
            voice: VoiceId(self.next_voice),
            segment,
            time_ratio: params.time_ratio,
            pitch_scale: params.pitch_scale,
            volume: params.volume,
            attack_seconds: params.attack_seconds,
            release_seconds: params.release_seconds,
        }
    }

    /// Send the stored modulation, marking it dirty again if the queue is full
    fn push_globals(&mut self) {
        let sent = self
            .send(RenderCommand::SetGlobalPitch {
                semitones: self.global_pitch_semitones,
            })
            .and_then(|()| {
                self.send(RenderCommand::SetGlobalTempo {
                    multiplier: self.global_speed,
                })
            })
            .and_then(|()| self.send(RenderCommand::SetMasterGain(self.master_gain)));
        self.globals_dirty = sent.is_err();
    }

    fn check_ready(&self, operation: &str) -> bool {
        if self.is_ready() {
            return true;
        }
        log::warn!("{}: ignored, engine is {:?}", operation, self.lifecycle);
        false
    }

    fn send(&mut self, command: RenderCommand) -> EngineResult<()> {
        self.commands.push(command).map_err(|rtrb::PushError::Full(command)| {
            log::warn!("Render command queue full, dropping {:?}", command);
            EngineError::QueueFull
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::clock::ManualClock;
    use crate::timestretch::{StretchQuality, Varispeed};
    use crate::types::SAMPLE_RATE;

    const QUANTUM: usize = 256;

    struct Rig {
        controller: Controller,
        renderer: Renderer,
        clock: ManualClock,
        out: Vec<f32>,
    }

    impl Rig {
        fn new() -> Self {
            let config = EngineConfig {
                stretch: StretchQuality::Bypass,
                ..EngineConfig::default()
            };
            let clock = ManualClock::new();
            let (controller, renderer) =
                engine_pair_with_clock(config, SAMPLE_RATE, Box::new(clock.clone())).unwrap();
            Self {
                controller,
                renderer,
                clock,
                out: vec![0.0; QUANTUM * 2],
            }
        }

        /// Initialized and loaded with a 10 s stereo source
        fn ready() -> Self {
            let mut rig = Self::new();
            rig.controller.init_default().unwrap();
            rig.render();
            assert_eq!(rig.controller.tick(), vec![Notice::Ready]);
            rig.controller.load(source(10.0)).unwrap();
            rig
        }

        fn render(&mut self) {
            self.renderer.render(&mut self.out, 2);
        }

        /// Advance wall time and audio time together by roughly `seconds`
        fn run(&mut self, seconds: f64) -> Vec<Notice> {
            let quanta = (seconds * SAMPLE_RATE as f64 / QUANTUM as f64).round() as usize;
            let mut notices = Vec::new();
            for _ in 0..quanta {
                self.render();
                self.clock.advance(QUANTUM as f64 / SAMPLE_RATE as f64);
                notices.extend(self.controller.tick());
            }
            notices
        }
    }

    fn source(seconds: f64) -> Source {
        let frames = (seconds * SAMPLE_RATE as f64) as usize;
        let data: Vec<f32> = (0..frames).map(|i| ((i % 480) as f32 / 480.0) - 0.5).collect();
        Source::new(vec![data.clone(), data], SAMPLE_RATE).unwrap()
    }

    #[test]
    fn test_commands_before_ready_are_ignored() {
        let mut rig = Rig::new();
        rig.controller.play();
        rig.controller.seek(3.0);
        assert!(!rig.controller.is_playing());
        assert_eq!(rig.controller.global_offset(), 0.0);
        assert_eq!(
            rig.controller.trigger_pad(PadId(0), 1.0, PlaybackParams::default()),
            Err(EngineError::NotInitialized)
        );
        assert_eq!(rig.controller.load(source(1.0)), Err(EngineError::NotInitialized));
    }

    #[test]
    fn test_init_failure_then_retry() {
        let mut rig = Rig::new();
        rig.controller.init(Box::new(Varispeed::new(1, 1024))).unwrap();
        rig.render();
        let notices = rig.controller.tick();
        assert!(matches!(notices.as_slice(), [Notice::InitFailed(_)]));
        assert!(matches!(rig.controller.lifecycle(), Lifecycle::Failed(_)));

        rig.controller.play();
        assert!(!rig.controller.is_playing());

        rig.controller.init(Box::new(Varispeed::new(2, 1024))).unwrap();
        rig.render();
        assert_eq!(rig.controller.tick(), vec![Notice::Ready]);
        assert!(rig.controller.is_ready());
    }

    #[test]
    fn test_reverse_pad_position() {
        let mut rig = Rig::ready();
        rig.controller
            .trigger_pad(PadId(2), 6.0, PlaybackParams::default().reversed())
            .unwrap();
        assert_eq!(rig.controller.mode(), Mode::Pad(PadId(2)));
        let playback = rig.controller.state().playback.unwrap();
        assert!((playback.duration - 6.0).abs() < 1e-9);

        rig.run(3.0);
        assert!((rig.controller.position() - 3.0).abs() < 0.01);
        assert_eq!(rig.controller.global_offset(), 0.0);
    }

    #[test]
    fn test_play_from_offset_commits_end() {
        let mut rig = Rig::ready();
        rig.controller.seek(4.0);
        rig.controller.play();
        assert!((rig.controller.state().playback.unwrap().duration - 6.0).abs() < 1e-9);

        let notices = rig.run(6.1);
        assert!(notices.contains(&Notice::Completed {
            mode: Mode::Global,
            position: 10.0
        }));
        assert_eq!(rig.controller.global_offset(), 10.0);
        assert!(!rig.controller.is_playing());

        // Playing again from the end restarts at 0
        rig.controller.play();
        assert_eq!(rig.controller.global_offset(), 0.0);
        assert!((rig.controller.state().playback.unwrap().duration - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_play_within_half_frame_of_end_restarts() {
        let mut rig = Rig::ready();
        rig.controller.seek(rig.controller.duration() - 5e-6);
        rig.controller.play();
        assert!(rig.controller.is_playing());
        assert_eq!(rig.controller.global_offset(), 0.0);
        assert!((rig.controller.state().playback.unwrap().duration - 10.0).abs() < 1e-9);

        rig.controller.pause();
        rig.controller.play();
        assert!(rig.controller.is_playing());
    }

    #[test]
    fn test_completion_timing() {
        let mut rig = Rig::ready();
        rig.controller.seek(8.0);
        rig.controller.play();

        let step = QUANTUM as f64 / SAMPLE_RATE as f64;
        let mut completed_at = None;
        for _ in 0..1000 {
            rig.render();
            rig.clock.advance(step);
            let notices = rig.controller.tick();
            if notices.iter().any(|n| matches!(n, Notice::Completed { .. })) {
                completed_at = Some(rig.clock.now());
                break;
            }
        }
        let t = completed_at.unwrap();
        assert!((t - 2.0).abs() <= 0.02, "completed at {}", t);
    }

    #[test]
    fn test_render_completion_is_authoritative() {
        let mut rig = Rig::ready();
        rig.controller
            .trigger_pad(PadId(0), 9.5, PlaybackParams::default())
            .unwrap();
        // Wall clock frozen: only the render side can report the end
        for _ in 0..200 {
            rig.render();
        }
        let notices = rig.controller.tick();
        assert_eq!(
            notices,
            vec![Notice::Completed {
                mode: Mode::Pad(PadId(0)),
                position: 10.0
            }]
        );
        assert!(!rig.controller.is_playing());
    }

    #[test]
    fn test_pause_seek_round_trip() {
        let mut rig = Rig::ready();
        rig.controller.seek(2.0);
        rig.controller.play();
        rig.run(1.5);
        rig.controller.pause();
        assert!(!rig.controller.is_playing());
        let quantum = QUANTUM as f64 / SAMPLE_RATE as f64;
        assert!((rig.controller.global_offset() - 3.5).abs() <= quantum);
        assert!((rig.controller.position() - 3.5).abs() <= quantum);
    }

    #[test]
    fn test_seek_while_playing_restarts_there() {
        let mut rig = Rig::ready();
        rig.controller.play();
        rig.run(1.0);
        rig.controller.seek(7.0);
        assert!(rig.controller.is_playing());
        assert!((rig.controller.position() - 7.0).abs() < 1e-9);
        rig.controller.pause();
        rig.controller.seek(50.0);
        assert_eq!(rig.controller.global_offset(), 10.0);
    }

    #[test]
    fn test_trigger_supersedes_previous_pad() {
        let mut rig = Rig::ready();
        let a = rig
            .controller
            .trigger_pad(PadId(0), 1.0, PlaybackParams::default())
            .unwrap();
        rig.run(0.1);
        let b = rig
            .controller
            .trigger_pad(PadId(1), 5.0, PlaybackParams::default())
            .unwrap();
        rig.run(0.1);

        assert_ne!(a, b);
        assert_eq!(rig.controller.active_pad(), Some(PadId(1)));
        assert_eq!(rig.renderer.active_voice(), Some(b));
        assert_eq!(rig.controller.stats().underrun_frames, 0);
    }

    #[test]
    fn test_invalid_trigger_leaves_state() {
        let mut rig = Rig::ready();
        rig.controller.play();
        let result = rig
            .controller
            .trigger_pad(PadId(3), 0.0, PlaybackParams::default().reversed());
        assert!(matches!(result, Err(EngineError::InvalidTrigger { .. })));
        assert_eq!(rig.controller.mode(), Mode::Global);
        assert!(rig.controller.is_playing());

        let result = rig
            .controller
            .trigger_pad(PadId(3), 12.0, PlaybackParams::default());
        assert!(matches!(result, Err(EngineError::InvalidTrigger { .. })));
    }

    #[test]
    fn test_stop_pad_returns_to_cue() {
        let mut rig = Rig::ready();
        rig.controller
            .trigger_pad(PadId(4), 3.0, PlaybackParams::default())
            .unwrap();
        rig.run(0.5);
        rig.controller.stop_pad();
        assert!(rig.controller.is_playing());

        let notices = rig.run(0.1);
        assert_eq!(notices, vec![Notice::Released { pad: PadId(4) }]);
        assert!(!rig.controller.is_playing());
        assert_eq!(rig.controller.mode(), Mode::Global);
        assert_eq!(rig.controller.global_offset(), 3.0);
        assert_eq!(rig.renderer.active_voice(), None);
    }

    #[test]
    fn test_stop_pad_superseded_by_new_trigger() {
        let mut rig = Rig::ready();
        rig.controller
            .trigger_pad(PadId(0), 1.0, PlaybackParams::default())
            .unwrap();
        rig.run(0.2);
        rig.controller.stop_pad();
        let b = rig
            .controller
            .trigger_pad(PadId(1), 2.0, PlaybackParams::default())
            .unwrap();

        let notices = rig.run(0.2);
        assert!(notices.is_empty());
        assert_eq!(rig.controller.active_pad(), Some(PadId(1)));
        assert_eq!(rig.renderer.active_voice(), Some(b));
        assert_eq!(rig.controller.global_offset(), 0.0);
    }

    #[test]
    fn test_pause_during_pad_keeps_offset() {
        let mut rig = Rig::ready();
        rig.controller.seek(1.5);
        rig.controller
            .trigger_pad(PadId(0), 6.0, PlaybackParams::default())
            .unwrap();
        rig.run(0.5);
        rig.controller.pause();
        assert!(!rig.controller.is_playing());
        assert_eq!(rig.controller.global_offset(), 1.5);
    }

    #[test]
    fn test_global_speed_rebases_progress() {
        let mut rig = Rig::ready();
        rig.controller.play();
        rig.run(1.0);
        rig.controller.set_global_speed(2.0);
        rig.run(1.0);
        // 1 s at unity then 1 s at double speed
        assert!((rig.controller.position() - 3.0).abs() < 0.02);
    }

    #[test]
    fn test_globals_stored_before_ready() {
        let mut rig = Rig::new();
        rig.controller.set_global_pitch_offset(-3.0);
        rig.controller.set_global_speed(1.25);
        rig.controller.set_global_speed(-1.0);
        assert_eq!(rig.controller.global_pitch_offset(), -3.0);
        assert_eq!(rig.controller.global_speed(), 1.25);
    }

    #[test]
    fn test_pause_with_full_queue_keeps_playing() {
        let mut rig = Rig::ready();
        rig.controller.play();
        rig.render();
        for i in 0..300 {
            rig.controller.set_global_pitch_offset(i as f64 / 100.0);
        }
        assert!(rig.controller.globals_dirty);

        rig.controller.pause();
        assert!(rig.controller.is_playing());
        assert_eq!(rig.controller.mode(), Mode::Global);

        // Once the queue drains the stored pitch goes out again and pause works
        rig.render();
        assert!(rig.controller.tick().is_empty());
        assert!(!rig.controller.globals_dirty);
        rig.controller.pause();
        rig.render();
        assert!(!rig.controller.is_playing());
        assert_eq!(rig.renderer.active_voice(), None);
    }

    #[test]
    fn test_release_stop_retried_after_full_queue() {
        let mut rig = Rig::ready();
        rig.controller
            .trigger_pad(PadId(2), 3.0, PlaybackParams::default())
            .unwrap();
        rig.run(0.1);
        rig.controller.stop_pad();
        for _ in 0..300 {
            rig.controller.set_master_gain(1.0);
        }
        rig.clock.advance(1.0);
        assert!(rig.controller.tick().is_empty());
        assert_eq!(rig.controller.active_pad(), Some(PadId(2)));

        rig.render();
        assert_eq!(
            rig.controller.tick(),
            vec![Notice::Released { pad: PadId(2) }]
        );
        assert_eq!(rig.controller.global_offset(), 3.0);
        rig.render();
        assert_eq!(rig.renderer.active_voice(), None);
    }
}
