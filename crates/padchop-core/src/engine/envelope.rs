//! Gain ramps and parameter smoothing for the render side

/// Linear per-frame gain ramp
///
/// Only one ramp runs at a time: scheduling a new one replaces the old one,
/// starting from wherever the gain currently is.
#[derive(Debug, Clone, Copy)]
pub struct GainEnvelope {
    value: f32,
    target: f32,
    step: f32,
    remaining: usize,
}

impl Default for GainEnvelope {
    fn default() -> Self {
        Self {
            value: 0.0,
            target: 0.0,
            step: 0.0,
            remaining: 0,
        }
    }
}

impl GainEnvelope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Jump to `value` with no ramp
    pub fn set(&mut self, value: f32) {
        self.value = value;
        self.target = value;
        self.step = 0.0;
        self.remaining = 0;
    }

    /// Ramp linearly from the current value to `target` over `frames`
    pub fn ramp_to(&mut self, target: f32, frames: usize) {
        if frames == 0 {
            self.set(target);
            return;
        }
        self.target = target;
        self.step = (target - self.value) / frames as f32;
        self.remaining = frames;
    }

    /// Advance one frame and return the gain for it
    #[inline]
    pub fn next(&mut self) -> f32 {
        if self.remaining > 0 {
            self.remaining -= 1;
            self.value = if self.remaining == 0 {
                self.target
            } else {
                self.value + self.step
            };
        }
        self.value
    }

    #[inline]
    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    #[inline]
    pub fn is_ramping(&self) -> bool {
        self.remaining > 0
    }

    /// True once a ramp to zero has finished
    pub fn is_silent(&self) -> bool {
        self.remaining == 0 && self.value == 0.0
    }
}

/// One-pole smoother for a control parameter, advanced once per render slice
#[derive(Debug, Clone, Copy)]
pub struct ParamSmoother {
    current: f64,
    target: f64,
    /// Time constant in frames (0 = no smoothing)
    tau_frames: f64,
}

impl ParamSmoother {
    /// Values closer than this to the target snap onto it
    const SNAP: f64 = 1e-6;

    pub fn new(initial: f64, tau_frames: f64) -> Self {
        Self {
            current: initial,
            target: initial,
            tau_frames: tau_frames.max(0.0),
        }
    }

    pub fn set_target(&mut self, target: f64) {
        self.target = target;
    }

    /// Jump to `value` immediately
    pub fn reset(&mut self, value: f64) {
        self.current = value;
        self.target = value;
    }

    /// Move towards the target by `frames` worth of time and return the new value
    pub fn advance(&mut self, frames: usize) -> f64 {
        if self.current == self.target {
            return self.current;
        }
        if self.tau_frames <= 0.0 {
            self.current = self.target;
        } else {
            let k = 1.0 - (-(frames as f64) / self.tau_frames).exp();
            self.current += (self.target - self.current) * k;
            if (self.target - self.current).abs() < Self::SNAP {
                self.current = self.target;
            }
        }
        self.current
    }

    #[inline]
    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn target(&self) -> f64 {
        self.target
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attack_ramp_reaches_target() {
        let mut env = GainEnvelope::new();
        env.ramp_to(1.0, 4);
        let values: Vec<f32> = (0..6).map(|_| env.next()).collect();
        assert_eq!(values, vec![0.25, 0.5, 0.75, 1.0, 1.0, 1.0]);
        assert!(!env.is_ramping());
    }

    #[test]
    fn test_new_ramp_cancels_running_one() {
        let mut env = GainEnvelope::new();
        env.ramp_to(1.0, 10);
        for _ in 0..5 {
            env.next();
        }
        assert!((env.value() - 0.5).abs() < 1e-6);
        // Fade out from the current value, not from the old target
        env.ramp_to(0.0, 5);
        assert!((env.next() - 0.4).abs() < 1e-6);
        for _ in 0..4 {
            env.next();
        }
        assert!(env.is_silent());
    }

    #[test]
    fn test_zero_length_ramp_jumps() {
        let mut env = GainEnvelope::new();
        env.ramp_to(0.7, 0);
        assert_eq!(env.value(), 0.7);
        assert_eq!(env.next(), 0.7);
    }

    #[test]
    fn test_smoother_converges_monotonically() {
        let mut smoother = ParamSmoother::new(1.0, 1440.0);
        smoother.set_target(2.0);
        let mut last = 1.0;
        for _ in 0..200 {
            let v = smoother.advance(256);
            assert!(v >= last && v <= 2.0);
            last = v;
        }
        assert_eq!(smoother.current(), 2.0);
    }

    #[test]
    fn test_smoother_without_time_constant_steps() {
        let mut smoother = ParamSmoother::new(0.0, 0.0);
        smoother.set_target(3.0);
        assert_eq!(smoother.advance(1), 3.0);
    }
}
