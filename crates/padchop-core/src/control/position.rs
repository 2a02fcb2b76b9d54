//! Wall-clock position estimation
//!
//! Position is estimated from elapsed time rather than read back from the
//! render side. Effective elapsed source time is elapsed wall time times the
//! playback rate; when the rate changes mid-segment, progress made so far is
//! folded into `progress` and timing restarts from the change.

use crate::types::{Direction, VoiceId};

/// Timing record of the segment the control side believes is playing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Playback {
    pub voice: VoiceId,
    /// Source position (seconds) the segment starts from
    pub cue: f64,
    /// Source seconds the segment covers
    pub duration: f64,
    pub direction: Direction,
    /// Clock time progress is measured from
    pub started_at: f64,
    /// Source seconds covered before `started_at`
    pub progress: f64,
    /// Source seconds per wall second
    pub rate: f64,
}

impl Playback {
    pub fn new(
        voice: VoiceId,
        cue: f64,
        duration: f64,
        direction: Direction,
        now: f64,
        rate: f64,
    ) -> Self {
        Self {
            voice,
            cue,
            duration,
            direction,
            started_at: now,
            progress: 0.0,
            rate,
        }
    }

    /// Source seconds covered by `now`
    pub fn effective_elapsed(&self, now: f64) -> f64 {
        self.progress + (now - self.started_at).max(0.0) * self.rate
    }

    /// Estimated source position at `now`, clamped to `[0, total]`
    pub fn position(&self, now: f64, total: f64) -> f64 {
        let elapsed = self.effective_elapsed(now).min(self.duration);
        (self.cue + self.direction.sign() * elapsed).clamp(0.0, total.max(0.0))
    }

    /// Position the segment ends at: its last frame forward, frame 0 reverse
    pub fn end_position(&self, total: f64) -> f64 {
        (self.cue + self.direction.sign() * self.duration).clamp(0.0, total.max(0.0))
    }

    /// True once the estimate is within `epsilon` of the segment end
    pub fn is_complete(&self, now: f64, epsilon: f64) -> bool {
        self.effective_elapsed(now) >= self.duration - epsilon
    }

    /// Continue at `rate` from `now`, keeping progress made so far
    pub fn rebase(&mut self, now: f64, rate: f64) {
        self.progress = self.effective_elapsed(now);
        self.started_at = now;
        self.rate = rate;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reverse_position_counts_down() {
        let playback = Playback::new(VoiceId(1), 6.0, 6.0, Direction::Reverse, 0.0, 1.0);
        assert!((playback.position(3.0, 10.0) - 3.0).abs() < 1e-9);
        assert_eq!(playback.position(20.0, 10.0), 0.0);
        assert_eq!(playback.end_position(10.0), 0.0);
    }

    #[test]
    fn test_forward_position_scales_with_rate() {
        let playback = Playback::new(VoiceId(1), 2.0, 8.0, Direction::Forward, 1.0, 2.0);
        assert!((playback.position(2.0, 10.0) - 4.0).abs() < 1e-9);
        assert!(playback.is_complete(5.0, 0.01));
        assert!(!playback.is_complete(4.9, 0.01));
    }

    #[test]
    fn test_rebase_keeps_progress() {
        let mut playback = Playback::new(VoiceId(1), 0.0, 10.0, Direction::Forward, 0.0, 1.0);
        playback.rebase(2.0, 0.5);
        // 2s at full speed, then 2s at half speed
        assert!((playback.effective_elapsed(4.0) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_position_before_start_is_cue() {
        let playback = Playback::new(VoiceId(1), 5.0, 5.0, Direction::Forward, 10.0, 1.0);
        assert_eq!(playback.position(9.0, 10.0), 5.0);
    }
}
