//! Lock-free message queues between the control side and the render side
//!
//! Commands flow control -> render, events flow render -> control, each over
//! its own `rtrb` SPSC ring. Both push and pop are wait-free and never
//! allocate, so the render callback can drain commands at the start of each
//! quantum and report back without blocking.
//!
//! Heap payloads (the source, the stretch engine) travel inside `basedrop`
//! wrappers: when the renderer replaces one, the old value is released on
//! the collector thread rather than in the callback.

use super::stretch_adapter::OwnedEngine;
use super::Segment;
use crate::source::SharedSource;
use crate::types::VoiceId;

/// Parameters of one segment playback
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayRequest {
    /// Identity of this trigger, echoed in `Fade` and `Complete`
    pub voice: VoiceId,
    pub segment: Segment,
    /// Per-trigger speed multiplier (combined with the global tempo)
    pub time_ratio: f64,
    /// Per-trigger pitch scale (combined with the global pitch offset)
    pub pitch_scale: f64,
    /// Linear gain reached at the end of the attack
    pub volume: f32,
    pub attack_seconds: f64,
    /// Fade-out length before the natural end of the segment (0 = none)
    pub release_seconds: f64,
}

/// Commands sent from the control side to the render side
pub enum RenderCommand {
    /// One-time setup; answered with `Ready` or `InitFailed`
    ///
    /// Sending it again replaces the engine (retry after a failure).
    Init {
        engine: OwnedEngine,
        sample_rate: u32,
    },
    /// Replace the source, stopping whatever plays
    Load { source: SharedSource },
    /// Begin a segment immediately, superseding any running one
    Play(PlayRequest),
    /// Ramp the gain of `voice` to zero over `seconds`, then go silent
    ///
    /// Ignored if `voice` is no longer the one rendering.
    Fade { voice: VoiceId, seconds: f64 },
    /// Halt rendering and clear both rings
    Stop,
    /// Global pitch offset applied on top of the per-trigger scale (ramped)
    SetGlobalPitch { semitones: f64 },
    /// Global speed multiplier applied on top of the per-trigger ratio (ramped)
    SetGlobalTempo { multiplier: f64 },
    /// Output gain applied after the envelope
    SetMasterGain(f32),
}

impl std::fmt::Debug for RenderCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderCommand::Init { sample_rate, .. } => {
                write!(f, "Init {{ sample_rate: {} }}", sample_rate)
            }
            RenderCommand::Load { source } => write!(f, "Load {{ frames: {} }}", source.len()),
            RenderCommand::Play(request) => write!(f, "Play({:?})", request),
            RenderCommand::Fade { voice, seconds } => {
                write!(f, "Fade {{ voice: {:?}, seconds: {} }}", voice, seconds)
            }
            RenderCommand::Stop => f.write_str("Stop"),
            RenderCommand::SetGlobalPitch { semitones } => {
                write!(f, "SetGlobalPitch {{ semitones: {} }}", semitones)
            }
            RenderCommand::SetGlobalTempo { multiplier } => {
                write!(f, "SetGlobalTempo {{ multiplier: {} }}", multiplier)
            }
            RenderCommand::SetMasterGain(gain) => write!(f, "SetMasterGain({})", gain),
        }
    }
}

/// Notifications sent from the render side to the control side
#[derive(Debug, Clone, PartialEq)]
pub enum RenderEvent {
    /// Engine installed and accepted
    Ready { sample_rate: u32 },
    /// Engine refused; playback stays disabled until another `Init`
    InitFailed { reason: &'static str },
    /// Segment exhausted and every produced frame delivered
    Complete { voice: VoiceId },
}

/// Capacity of the command queue
///
/// Control commands arrive at human rates; this leaves headroom for bursts
/// such as a parameter sweep arriving between two callbacks.
pub const COMMAND_QUEUE_CAPACITY: usize = 256;

/// Capacity of the event queue
pub const EVENT_QUEUE_CAPACITY: usize = 64;

/// Create the control -> render command channel
pub fn command_channel() -> (rtrb::Producer<RenderCommand>, rtrb::Consumer<RenderCommand>) {
    rtrb::RingBuffer::new(COMMAND_QUEUE_CAPACITY)
}

/// Create the render -> control event channel
pub fn event_channel() -> (rtrb::Producer<RenderEvent>, rtrb::Consumer<RenderEvent>) {
    rtrb::RingBuffer::new(EVENT_QUEUE_CAPACITY)
}
