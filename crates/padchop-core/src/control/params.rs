//! Per-trigger playback parameters

use serde::{Deserialize, Serialize};

use crate::timestretch::{MAX_RATIO, MIN_RATIO};
use crate::types::{semitones_to_scale, Direction};

/// How one trigger plays its segment
///
/// Global pitch and tempo overrides are applied on top of these values by
/// the render side, so a trigger keeps its own character under them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackParams {
    /// Speed multiplier (1.0 = original tempo)
    pub time_ratio: f64,
    /// Frequency multiplier (1.0 = original pitch)
    pub pitch_scale: f64,
    /// Fade-in length; a short minimum is always applied
    pub attack_seconds: f64,
    /// Fade-out length before the natural end of the segment
    pub release_seconds: f64,
    /// Linear gain after the attack
    pub volume: f32,
    pub direction: Direction,
}

impl Default for PlaybackParams {
    fn default() -> Self {
        Self {
            time_ratio: 1.0,
            pitch_scale: 1.0,
            attack_seconds: 0.0,
            release_seconds: 0.0,
            volume: 1.0,
            direction: Direction::Forward,
        }
    }
}

impl PlaybackParams {
    /// Same parameters, playing backward
    pub fn reversed(mut self) -> Self {
        self.direction = Direction::Reverse;
        self
    }

    /// Same parameters, transposed by `semitones`
    pub fn with_semitones(mut self, semitones: f64) -> Self {
        self.pitch_scale = semitones_to_scale(semitones);
        self
    }

    #[inline]
    pub fn is_reverse(&self) -> bool {
        self.direction == Direction::Reverse
    }

    /// Copy with every value forced into its usable range
    pub fn sanitized(&self) -> Self {
        let ratio = |v: f64| {
            if v.is_finite() {
                v.clamp(MIN_RATIO, MAX_RATIO)
            } else {
                1.0
            }
        };
        let non_negative = |v: f64| if v.is_finite() { v.max(0.0) } else { 0.0 };
        Self {
            time_ratio: ratio(self.time_ratio),
            pitch_scale: ratio(self.pitch_scale),
            attack_seconds: non_negative(self.attack_seconds),
            release_seconds: non_negative(self.release_seconds),
            volume: if self.volume.is_finite() {
                self.volume.max(0.0)
            } else {
                1.0
            },
            direction: self.direction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unity() {
        let params = PlaybackParams::default();
        assert_eq!(params.time_ratio, 1.0);
        assert_eq!(params.pitch_scale, 1.0);
        assert_eq!(params.direction, Direction::Forward);
    }

    #[test]
    fn test_builders() {
        let params = PlaybackParams::default().reversed().with_semitones(12.0);
        assert!(params.is_reverse());
        assert!((params.pitch_scale - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_sanitized_clamps() {
        let params = PlaybackParams {
            time_ratio: 9.0,
            pitch_scale: f64::NAN,
            attack_seconds: -1.0,
            volume: -0.5,
            ..PlaybackParams::default()
        }
        .sanitized();
        assert_eq!(params.time_ratio, 4.0);
        assert_eq!(params.pitch_scale, 1.0);
        assert_eq!(params.attack_seconds, 0.0);
        assert_eq!(params.volume, 0.0);
    }

    #[test]
    fn test_yaml_uses_defaults_for_missing_fields() {
        let params: PlaybackParams = serde_yaml::from_str("direction: reverse\nvolume: 0.5\n").unwrap();
        assert!(params.is_reverse());
        assert_eq!(params.volume, 0.5);
        assert_eq!(params.time_ratio, 1.0);
    }
}
