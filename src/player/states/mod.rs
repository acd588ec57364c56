//! Player states
//!
//! Movement states re-evaluate their exits every frame from the agent's
//! input and ground contact. Attack, Dash and Parry are only entered on
//! request by the controller and pick their own exit once they finish.

mod actions;
mod locomotion;

pub use actions::{AttackState, DashState, ParryState};
pub use locomotion::{CrouchState, FallState, IdleState, JumpState, RunState, WalkState};

use glam::Vec2;

use super::controller::PlayerAgent;

/// Smoothing time for horizontal velocity changes
const SMOOTH_TIME: f32 = 0.1;

/// Critically damped spring toward `target`, as used for camera-style smoothing.
///
/// `velocity` carries the spring state between calls.
pub(crate) fn smooth_damp(
    current: Vec2,
    target: Vec2,
    velocity: &mut Vec2,
    smooth_time: f32,
    dt: f32,
) -> Vec2 {
    if dt <= 0.0 {
        return current;
    }
    let smooth_time = smooth_time.max(1e-4);
    let omega = 2.0 / smooth_time;
    let x = omega * dt;
    let decay = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);

    let change = current - target;
    let temp = (*velocity + omega * change) * dt;
    *velocity = (*velocity - omega * temp) * decay;
    let output = target + (change + temp) * decay;

    // Never overshoot the target
    if (target - current).dot(output - target) > 0.0 {
        *velocity = Vec2::ZERO;
        return target;
    }
    output
}

/// Horizontal velocity integration shared by every state.
///
/// Each state owns its own instance, so the smoothing velocity of one state
/// never leaks into another.
#[derive(Debug, Clone, Default)]
pub(crate) struct Locomotion {
    smoothing: Vec2,
}

impl Locomotion {
    /// Approach `speed` along the input direction and move for one fixed step.
    pub(crate) fn drive(&mut self, agent: &mut PlayerAgent, speed: f32) {
        let dt = agent.fixed_dt;
        let desired = agent.input.move_direction() * speed;
        let current = Vec2::new(agent.velocity.x, agent.velocity.z);
        let next = smooth_damp(
            current,
            Vec2::new(desired.x, desired.z),
            &mut self.smoothing,
            SMOOTH_TIME,
            dt,
        );
        agent.velocity.x = next.x;
        agent.velocity.z = next.y;
        agent.motor.move_by(agent.velocity * dt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smooth_damp_converges_without_overshoot() {
        let target = Vec2::new(5.0, 0.0);
        let mut current = Vec2::ZERO;
        let mut velocity = Vec2::ZERO;
        for _ in 0..50 {
            current = smooth_damp(current, target, &mut velocity, SMOOTH_TIME, 0.02);
            assert!(current.x <= target.x + 1e-4);
        }
        assert!((current.x - 5.0).abs() < 0.01);
    }

    #[test]
    fn test_smooth_damp_zero_dt_is_identity() {
        let mut velocity = Vec2::ONE;
        let current = Vec2::new(1.0, 2.0);
        assert_eq!(smooth_damp(current, Vec2::ZERO, &mut velocity, 0.1, 0.0), current);
    }
}
