//! Control-side engine state

use super::params::PlaybackParams;
use super::position::Playback;
use crate::types::PadId;

/// Which transport owns the single render voice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Whole-recording transport (playing or paused)
    #[default]
    Global,
    /// A pad trigger
    Pad(PadId),
}

impl Mode {
    pub fn pad(&self) -> Option<PadId> {
        match self {
            Mode::Global => None,
            Mode::Pad(pad) => Some(*pad),
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Global => f.write_str("global"),
            Mode::Pad(pad) => write!(f, "{}", pad),
        }
    }
}

/// The one live record of what the engine is doing
///
/// Every command overwrites it; there is no history. At most one playback
/// exists at a time.
#[derive(Debug, Clone, Default)]
pub struct EngineState {
    pub mode: Mode,
    pub params: PlaybackParams,
    pub playback: Option<Playback>,
}

impl EngineState {
    #[inline]
    pub fn is_playing(&self) -> bool {
        self.playback.is_some()
    }

    pub fn active_pad(&self) -> Option<PadId> {
        if self.is_playing() {
            self.mode.pad()
        } else {
            None
        }
    }

    /// Back to the paused global transport
    pub fn reset_to_idle(&mut self) {
        self.mode = Mode::Global;
        self.playback = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Direction, VoiceId};

    #[test]
    fn test_active_pad_requires_playback() {
        let mut state = EngineState {
            mode: Mode::Pad(PadId(3)),
            ..EngineState::default()
        };
        assert_eq!(state.active_pad(), None);
        state.playback = Some(Playback::new(VoiceId(1), 0.0, 1.0, Direction::Forward, 0.0, 1.0));
        assert_eq!(state.active_pad(), Some(PadId(3)));
        state.reset_to_idle();
        assert_eq!(state.mode, Mode::Global);
        assert!(!state.is_playing());
    }
}
