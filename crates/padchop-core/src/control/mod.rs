//! Control side of the engine
//!
//! Owns everything that is not real-time constrained: transport and pad
//! semantics, parameter ownership, position estimation and the pad bank.
//! It drives the render side exclusively through commands.
//!
//! ```ignore
//! use padchop_core::control::{engine_pair, PlaybackParams};
//!
//! let (mut controller, renderer) = engine_pair(config, 48000)?;
//! // move `renderer` into the audio callback, then:
//! controller.init_default()?;
//! loop {
//!     for notice in controller.tick() { /* Ready, Completed, ... */ }
//! }
//! ```

mod clock;
mod controller;
mod pads;
mod params;
mod position;
mod state;

pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::{engine_pair, engine_pair_with_clock, Controller, Lifecycle, Notice};
pub use pads::{Pad, PadBank};
pub use params::PlaybackParams;
pub use position::Playback;
pub use state::{EngineState, Mode};
