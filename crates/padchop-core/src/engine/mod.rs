//! Render-side playback pipeline
//!
//! ```text
//! Source ──fill──▶ input FrameRing ──StretchAdapter──▶ output FrameRing ──envelope──▶ device
//!            ▲                                                                  │
//!   SegmentTracker (playhead)                                     Complete ◀────┘
//! ```
//!
//! Everything here is owned by the [`Renderer`], which lives on the audio
//! thread and is driven by the host callback. The control side talks to it
//! only through the queues in [`command`].

pub mod command;
mod envelope;
mod gc;
mod render;
mod ring_buffer;
mod segment;
mod stretch_adapter;

pub use command::{
    command_channel, event_channel, PlayRequest, RenderCommand, RenderEvent,
    COMMAND_QUEUE_CAPACITY, EVENT_QUEUE_CAPACITY,
};
pub use envelope::{GainEnvelope, ParamSmoother};
pub use gc::gc_handle;
pub use render::{RenderStats, Renderer, StatsSnapshot};
pub use ring_buffer::FrameRing;
pub use segment::{Segment, SegmentTracker};
pub use stretch_adapter::{OwnedEngine, StretchAdapter};
