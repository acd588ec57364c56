//! Multi-frame timed effects
//!
//! Each effect is a small resumable object: its owner keeps it in an `Option`
//! slot, calls `step(dt)` once per tick, and drops it when it reports
//! completion. Replacing the slot cancels whatever was running.

use glam::Vec3;

/// Progress reporting shared by every timed effect.
pub trait TimedEffect {
    /// Fraction of the effect completed, in `[0, 1]`.
    fn progress(&self) -> f32;

    /// Check if the effect has nothing left to do.
    fn is_finished(&self) -> bool {
        self.progress() >= 1.0
    }
}

// ============================================================================
// Knockback
// ============================================================================

/// Constant-speed push along a horizontal direction.
///
/// Navigation is expected to be suspended while a knockback is running.
#[derive(Debug, Clone, PartialEq)]
pub struct Knockback {
    direction: Vec3,
    force: f32,
    duration: f32,
    elapsed: f32,
}

impl Knockback {
    /// Push speed in units per second
    pub const DEFAULT_FORCE: f32 = 5.0;
    /// Push duration in seconds
    pub const DEFAULT_DURATION: f32 = 0.3;

    /// Knockback along `direction` (flattened to the ground plane).
    #[must_use]
    pub fn new(direction: Vec3, force: f32, duration: f32) -> Self {
        Self {
            direction: Vec3::new(direction.x, 0.0, direction.z).normalize_or_zero(),
            force,
            duration: duration.max(0.0),
            elapsed: 0.0,
        }
    }

    /// Advance by `dt`, returning this tick's displacement.
    ///
    /// Returns `None` once the duration has already elapsed.
    pub fn step(&mut self, dt: f32) -> Option<Vec3> {
        if self.is_finished() {
            return None;
        }
        self.elapsed += dt;
        Some(self.direction * self.force * dt)
    }
}

impl TimedEffect for Knockback {
    fn progress(&self) -> f32 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        (self.elapsed / self.duration).min(1.0)
    }
}

// ============================================================================
// Volley
// ============================================================================

/// A burst of shots spaced by a fixed interval. The first shot fires on the
/// first step.
#[derive(Debug, Clone, PartialEq)]
pub struct Volley {
    shots: u32,
    fired: u32,
    interval: f32,
    timer: f32,
}

impl Volley {
    /// Burst of `shots` shots, `interval` seconds apart.
    #[must_use]
    pub fn new(shots: u32, interval: f32) -> Self {
        Self {
            shots,
            fired: 0,
            interval: interval.max(0.0),
            timer: 0.0,
        }
    }

    /// Advance by `dt`, returning how many shots to fire this tick.
    pub fn step(&mut self, dt: f32) -> u32 {
        if self.fired >= self.shots {
            return 0;
        }
        if self.fired == 0 {
            self.fired = 1;
            return 1;
        }

        self.timer += dt;
        let mut due = 0;
        while self.fired < self.shots && self.timer >= self.interval {
            self.timer -= self.interval;
            self.fired += 1;
            due += 1;
        }
        due
    }

    /// Shots fired so far
    #[must_use]
    pub fn fired(&self) -> u32 {
        self.fired
    }
}

impl TimedEffect for Volley {
    fn progress(&self) -> f32 {
        if self.shots == 0 {
            return 1.0;
        }
        self.fired as f32 / self.shots as f32
    }
}

// ============================================================================
// Countdown
// ============================================================================

/// Fires once after a delay.
#[derive(Debug, Clone, PartialEq)]
pub struct Countdown {
    delay: f32,
    elapsed: f32,
}

impl Countdown {
    /// Countdown of `delay` seconds
    #[must_use]
    pub fn new(delay: f32) -> Self {
        Self {
            delay: delay.max(0.0),
            elapsed: 0.0,
        }
    }

    /// Advance by `dt`. Returns `true` exactly on the tick the delay runs out.
    pub fn step(&mut self, dt: f32) -> bool {
        if self.is_finished() {
            return false;
        }
        self.elapsed += dt;
        self.is_finished()
    }

    /// Seconds left
    #[must_use]
    pub fn remaining(&self) -> f32 {
        (self.delay - self.elapsed).max(0.0)
    }
}

impl TimedEffect for Countdown {
    fn progress(&self) -> f32 {
        if self.delay <= 0.0 {
            return 1.0;
        }
        (self.elapsed / self.delay).min(1.0)
    }
}
