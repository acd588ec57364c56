//! Grounded and airborne movement states

use crate::core::{State, StateResult, Transition};
use crate::player::controller::{GRAVITY, PlayerAgent, PlayerStateKind};

use super::Locomotion;

type Kind = PlayerStateKind;

/// Jump, then fall, under the same rules in every grounded state.
fn airborne_exit(agent: &PlayerAgent) -> Option<Kind> {
    if agent.is_grounded() && agent.input.jump {
        Some(Kind::Jump)
    } else if !agent.is_grounded() && agent.velocity.y < 0.0 {
        Some(Kind::Fall)
    } else {
        None
    }
}

fn to(kind: Option<Kind>) -> StateResult<Transition<Kind>> {
    Ok(kind.map_or(Transition::None, Transition::To))
}

/// Horizontal speed while airborne, chosen at take-off
fn air_speed(agent: &PlayerAgent) -> f32 {
    if agent.input.sprint {
        agent.movement.run_speed
    } else {
        agent.movement.walk_speed
    }
}

// ============================================================================
// Idle
// ============================================================================

/// Standing still.
#[derive(Debug, Default)]
pub struct IdleState {
    locomotion: Locomotion,
}

impl State<Kind, PlayerAgent> for IdleState {
    fn id(&self) -> Kind {
        Kind::Idle
    }

    fn update(&mut self, agent: &mut PlayerAgent) -> StateResult<Transition<Kind>> {
        if agent.is_grounded() && agent.input.jump {
            return to(Some(Kind::Jump));
        }
        if agent.input.is_moving() {
            return to(Some(agent.locomotion_state()));
        }
        if agent.input.crouch {
            return to(Some(Kind::Crouch));
        }
        to(airborne_exit(agent))
    }

    fn fixed_update(&mut self, agent: &mut PlayerAgent) -> StateResult {
        self.locomotion.drive(agent, 0.0);
        Ok(())
    }
}

// ============================================================================
// Walk / Run
// ============================================================================

/// Moving at walk speed.
#[derive(Debug, Default)]
pub struct WalkState {
    locomotion: Locomotion,
}

impl State<Kind, PlayerAgent> for WalkState {
    fn id(&self) -> Kind {
        Kind::Walk
    }

    fn update(&mut self, agent: &mut PlayerAgent) -> StateResult<Transition<Kind>> {
        if !agent.input.is_moving() {
            return to(Some(Kind::Idle));
        }
        if agent.input.sprint {
            return to(Some(Kind::Run));
        }
        if let Some(next) = airborne_exit(agent) {
            return to(Some(next));
        }
        if agent.input.crouch {
            return to(Some(Kind::Crouch));
        }
        to(None)
    }

    fn fixed_update(&mut self, agent: &mut PlayerAgent) -> StateResult {
        let speed = agent.movement.walk_speed;
        self.locomotion.drive(agent, speed);
        Ok(())
    }
}

/// Moving at sprint speed.
#[derive(Debug, Default)]
pub struct RunState {
    locomotion: Locomotion,
}

impl State<Kind, PlayerAgent> for RunState {
    fn id(&self) -> Kind {
        Kind::Run
    }

    fn update(&mut self, agent: &mut PlayerAgent) -> StateResult<Transition<Kind>> {
        if !agent.input.is_moving() {
            return to(Some(Kind::Idle));
        }
        if !agent.input.sprint {
            return to(Some(Kind::Walk));
        }
        if let Some(next) = airborne_exit(agent) {
            return to(Some(next));
        }
        if agent.input.crouch {
            return to(Some(Kind::Crouch));
        }
        to(None)
    }

    fn fixed_update(&mut self, agent: &mut PlayerAgent) -> StateResult {
        let speed = agent.movement.run_speed;
        self.locomotion.drive(agent, speed);
        Ok(())
    }
}

// ============================================================================
// Jump / Fall
// ============================================================================

/// Rising after take-off.
#[derive(Debug, Default)]
pub struct JumpState {
    locomotion: Locomotion,
    speed: f32,
}

impl State<Kind, PlayerAgent> for JumpState {
    fn id(&self) -> Kind {
        Kind::Jump
    }

    fn enter(&mut self, agent: &mut PlayerAgent) -> StateResult {
        agent.velocity.y = (agent.movement.jump_height * -2.0 * GRAVITY).sqrt();
        self.speed = air_speed(agent);
        log::trace!("Jump with vy = {:.2}", agent.velocity.y);
        Ok(())
    }

    fn update(&mut self, agent: &mut PlayerAgent) -> StateResult<Transition<Kind>> {
        if agent.velocity.y <= 0.0 {
            return to(Some(Kind::Fall));
        }
        to(None)
    }

    fn fixed_update(&mut self, agent: &mut PlayerAgent) -> StateResult {
        self.locomotion.drive(agent, self.speed);
        Ok(())
    }
}

/// Airborne and descending.
#[derive(Debug, Default)]
pub struct FallState {
    locomotion: Locomotion,
    speed: f32,
}

impl State<Kind, PlayerAgent> for FallState {
    fn id(&self) -> Kind {
        Kind::Fall
    }

    fn enter(&mut self, agent: &mut PlayerAgent) -> StateResult {
        self.speed = air_speed(agent);
        Ok(())
    }

    fn update(&mut self, agent: &mut PlayerAgent) -> StateResult<Transition<Kind>> {
        if agent.is_grounded() {
            return to(Some(agent.locomotion_state()));
        }
        to(None)
    }

    fn fixed_update(&mut self, agent: &mut PlayerAgent) -> StateResult {
        self.locomotion.drive(agent, self.speed);
        Ok(())
    }
}

// ============================================================================
// Crouch
// ============================================================================

/// Crouched: shorter capsule, slow movement.
#[derive(Debug, Default)]
pub struct CrouchState {
    locomotion: Locomotion,
    standing_height: Option<f32>,
}

impl State<Kind, PlayerAgent> for CrouchState {
    fn id(&self) -> Kind {
        Kind::Crouch
    }

    fn enter(&mut self, agent: &mut PlayerAgent) -> StateResult {
        let height = agent.motor.height();
        self.standing_height = Some(height);
        agent
            .motor
            .set_height(height * agent.movement.crouch_height_ratio);
        Ok(())
    }

    fn update(&mut self, agent: &mut PlayerAgent) -> StateResult<Transition<Kind>> {
        if !agent.input.crouch {
            return to(Some(agent.locomotion_state()));
        }
        to(airborne_exit(agent))
    }

    fn fixed_update(&mut self, agent: &mut PlayerAgent) -> StateResult {
        let speed = agent.movement.crouch_speed;
        self.locomotion.drive(agent, speed);
        Ok(())
    }

    fn exit(&mut self, agent: &mut PlayerAgent) -> StateResult {
        if let Some(height) = self.standing_height.take() {
            agent.motor.set_height(height);
        }
        Ok(())
    }
}
