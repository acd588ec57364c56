//! Randomness for AI decisions
//!
//! Every random choice (idle duration, patrol pauses, flee rolls) goes through
//! [`RandomSource`] so tests can script the outcome.

use glam::Vec2;

/// Source of uniformly distributed numbers.
pub trait RandomSource {
    /// Uniform value in `[0, 1)`.
    fn value(&mut self) -> f32;

    /// Uniform value in `[min, max)`.
    fn range(&mut self, min: f32, max: f32) -> f32 {
        min + (max - min) * self.value()
    }

    /// Uniform point inside the unit circle.
    fn inside_unit_circle(&mut self) -> Vec2 {
        let angle = self.value() * std::f32::consts::TAU;
        let radius = self.value().sqrt();
        Vec2::new(angle.cos(), angle.sin()) * radius
    }
}

/// [`RandomSource`] backed by `fastrand`.
#[derive(Debug, Clone)]
pub struct FastRandom {
    rng: fastrand::Rng,
}

impl FastRandom {
    /// Seeded generator, reproducible across runs.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: fastrand::Rng::with_seed(seed),
        }
    }
}

impl Default for FastRandom {
    fn default() -> Self {
        Self {
            rng: fastrand::Rng::new(),
        }
    }
}

impl RandomSource for FastRandom {
    fn value(&mut self) -> f32 {
        self.rng.f32()
    }
}
