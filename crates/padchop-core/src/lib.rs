//! Padchop Core - pad slicing playback engine
//!
//! A loaded recording is chopped into cue points. Each pad trigger plays one
//! segment (forward or reversed) through a time-stretch engine into the
//! output, with one voice at a time.
//!
//! The [`control::Controller`] and [`engine::Renderer`] are created as a pair
//! by [`control::engine_pair`]; the renderer is moved onto the audio thread
//! (see [`audio::AudioOutput::start`]) and the two talk only through
//! lock-free queues.

pub mod analysis;
pub mod audio;
pub mod audio_file;
pub mod config;
pub mod control;
pub mod engine;
pub mod error;
pub mod source;
pub mod timestretch;
pub mod types;

pub use error::{EngineError, EngineResult};
pub use source::{SharedSource, Source};
pub use types::*;
