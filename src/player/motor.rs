//! Character motor interface

use glam::Vec3;

/// Collision-aware mover for the player capsule.
pub trait CharacterMotor {
    /// Apply a displacement, resolving ground contact.
    fn move_by(&mut self, delta: Vec3);

    /// Feet position
    fn position(&self) -> Vec3;

    fn is_grounded(&self) -> bool;

    /// Capsule height
    fn height(&self) -> f32;

    fn set_height(&mut self, height: f32);
}

/// Motor on an infinite flat floor.
#[derive(Debug, Clone)]
pub struct GroundMotor {
    position: Vec3,
    ground_height: f32,
    height: f32,
    grounded: bool,
}

impl GroundMotor {
    /// Default capsule height
    pub const DEFAULT_HEIGHT: f32 = 2.0;

    /// Create a motor at `position` over a floor at `ground_height`
    #[must_use]
    pub fn new(position: Vec3, ground_height: f32) -> Self {
        let mut position = position;
        position.y = position.y.max(ground_height);
        Self {
            position,
            ground_height,
            height: Self::DEFAULT_HEIGHT,
            grounded: position.y <= ground_height,
        }
    }

    /// Teleport without collision resolution
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.grounded = position.y <= self.ground_height;
    }
}

impl Default for GroundMotor {
    fn default() -> Self {
        Self::new(Vec3::ZERO, 0.0)
    }
}

impl CharacterMotor for GroundMotor {
    fn move_by(&mut self, delta: Vec3) {
        self.position += delta;
        if self.position.y <= self.ground_height {
            self.position.y = self.ground_height;
            self.grounded = true;
        } else {
            self.grounded = false;
        }
    }

    fn position(&self) -> Vec3 {
        self.position
    }

    fn is_grounded(&self) -> bool {
        self.grounded
    }

    fn height(&self) -> f32 {
        self.height
    }

    fn set_height(&mut self, height: f32) {
        self.height = height.max(0.1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_clamps_and_grounds() {
        let mut motor = GroundMotor::new(Vec3::new(0.0, 2.0, 0.0), 0.0);
        assert!(!motor.is_grounded());

        motor.move_by(Vec3::new(1.0, -1.0, 0.0));
        assert!(!motor.is_grounded());

        motor.move_by(Vec3::new(0.0, -5.0, 0.0));
        assert!(motor.is_grounded());
        assert_eq!(motor.position(), Vec3::new(1.0, 0.0, 0.0));

        motor.move_by(Vec3::new(0.0, 0.5, 0.0));
        assert!(!motor.is_grounded());
    }
}
