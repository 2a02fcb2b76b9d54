//! Engine error types

use thiserror::Error;

use crate::types::PadId;

/// Errors surfaced by the control side of the engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The stretch engine could not be created or was refused by the renderer
    #[error("Engine initialization failed: {0}")]
    Init(String),

    /// A command arrived before the render side reported ready
    #[error("Engine is not initialized")]
    NotInitialized,

    /// Playback was requested without a loaded source
    #[error("No source loaded")]
    NoSource,

    /// Source sample data is unusable
    #[error("Invalid source: {0}")]
    InvalidSource(String),

    /// The computed segment for a trigger has no length
    #[error("Invalid trigger for {pad}: cue {cue:.3}s yields duration {duration:.3}s")]
    InvalidTrigger { pad: PadId, cue: f64, duration: f64 },

    /// The command queue to the render side is full
    #[error("Render command queue is full")]
    QueueFull,

    /// Engine configuration is inconsistent
    #[error("Invalid engine configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
