//! Frame timing shared by controllers

/// Clock handed to every controller update.
///
/// `delta_seconds()` is the variable frame step, `fixed_delta_seconds()` the
/// physics step, and `elapsed_seconds()` the total simulated time (used to
/// age stimuli such as heard sounds).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Time {
    delta: f32,
    fixed_delta: f32,
    elapsed: f32,
    /// Frame time not yet consumed by fixed steps
    accumulator: f32,
}

impl Time {
    /// Default fixed step (50 Hz).
    pub const DEFAULT_FIXED_DELTA: f32 = 0.02;
    /// Upper bound on fixed steps run for a single frame
    pub const MAX_FIXED_STEPS: u32 = 10;

    /// Create a clock at t = 0 with the given fixed step.
    #[must_use]
    pub fn new(fixed_delta: f32) -> Self {
        Self {
            delta: 0.0,
            fixed_delta,
            elapsed: 0.0,
            accumulator: 0.0,
        }
    }

    /// Begin a new frame lasting `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        self.delta = dt.max(0.0);
        self.elapsed += self.delta;
    }

    /// Add the current frame to the fixed-step accumulator.
    ///
    /// Returns how many fixed steps are due. A frame long enough to need more
    /// than [`Self::MAX_FIXED_STEPS`] drops the backlog instead of spiralling.
    pub fn accumulate(&mut self) -> u32 {
        if self.fixed_delta <= 0.0 {
            return 0;
        }
        self.accumulator += self.delta;
        let mut steps = 0;
        while self.accumulator >= self.fixed_delta && steps < Self::MAX_FIXED_STEPS {
            self.accumulator -= self.fixed_delta;
            steps += 1;
        }
        if self.accumulator > self.fixed_delta * 2.0 {
            log::warn!("dropping {:.3}s of fixed-step backlog", self.accumulator);
            self.accumulator = 0.0;
        }
        steps
    }

    /// Variable frame step in seconds
    #[must_use]
    #[inline]
    pub fn delta_seconds(&self) -> f32 {
        self.delta
    }

    /// Fixed physics step in seconds
    #[must_use]
    #[inline]
    pub fn fixed_delta_seconds(&self) -> f32 {
        self.fixed_delta
    }

    /// Total simulated time in seconds
    #[must_use]
    #[inline]
    pub fn elapsed_seconds(&self) -> f32 {
        self.elapsed
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new(Self::DEFAULT_FIXED_DELTA)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_advance() {
        let mut time = Time::default();
        time.advance(0.5);
        time.advance(0.25);
        assert_eq!(time.delta_seconds(), 0.25);
        assert_eq!(time.elapsed_seconds(), 0.75);
        assert_eq!(time.fixed_delta_seconds(), Time::DEFAULT_FIXED_DELTA);
    }

    #[test]
    fn test_accumulate_carries_remainder() {
        let mut time = Time::new(0.25);
        time.advance(0.625);
        assert_eq!(time.accumulate(), 2);
        time.advance(0.125);
        assert_eq!(time.accumulate(), 1);
        time.advance(0.0);
        assert_eq!(time.accumulate(), 0);
    }

    #[test]
    fn test_accumulate_caps_long_frames() {
        let mut time = Time::new(0.02);
        time.advance(1.0);
        assert_eq!(time.accumulate(), Time::MAX_FIXED_STEPS);
        time.advance(0.0);
        assert_eq!(time.accumulate(), 0);
    }

    #[test]
    fn test_time_ignores_negative_delta() {
        let mut time = Time::default();
        time.advance(-1.0);
        assert_eq!(time.delta_seconds(), 0.0);
        assert_eq!(time.elapsed_seconds(), 0.0);
    }
}
