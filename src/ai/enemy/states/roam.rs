//! Idle, Patrol and Investigate

use glam::Vec3;

use crate::ai::enemy::controller::EnemyAgent;
use crate::core::{State, StateResult, Transition};

use super::{Kind, go, stay};

// ============================================================================
// Idle
// ============================================================================

/// Standing around for a few seconds before patrolling again.
#[derive(Debug, Default)]
pub struct IdleState {
    timer: f32,
    duration: f32,
}

impl IdleState {
    const MIN_WAIT: f32 = 2.0;
    const MAX_WAIT: f32 = 5.0;
}

impl State<Kind, EnemyAgent> for IdleState {
    fn id(&self) -> Kind {
        Kind::Idle
    }

    fn enter(&mut self, agent: &mut EnemyAgent) -> StateResult {
        agent.stop();
        self.timer = 0.0;
        self.duration = agent.rng.range(Self::MIN_WAIT, Self::MAX_WAIT);
        Ok(())
    }

    fn update(&mut self, agent: &mut EnemyAgent) -> StateResult<Transition<Kind>> {
        if agent.check_for_target() {
            return go(Kind::Chase);
        }
        self.timer += agent.dt;
        if self.timer >= self.duration {
            return go(Kind::Patrol);
        }
        stay()
    }
}

// ============================================================================
// Patrol
// ============================================================================

/// Walking the waypoint loop, or random points when there is none.
#[derive(Debug, Default)]
pub struct PatrolState {
    /// Next waypoint to visit
    next: usize,
    waiting: bool,
    wait_timer: f32,
}

impl PatrolState {
    const ARRIVAL_DISTANCE: f32 = 0.5;
    const WAIT_TIME: f32 = 1.0;
    /// Chance of dropping to Idle on each arrival
    const IDLE_CHANCE: f32 = 0.3;

    fn head_to_next(&mut self, agent: &mut EnemyAgent) {
        let destination = if agent.waypoints.is_empty() {
            let radius = agent.settings.wander_radius;
            agent.random_point(radius)
        } else {
            let index = self.next % agent.waypoints.len();
            self.next = (index + 1) % agent.waypoints.len();
            Some(agent.waypoints[index])
        };

        match destination {
            Some(point) => {
                if !agent.move_to(point) {
                    log::trace!("{:?} cannot reach patrol point {point}", agent.entity);
                }
            }
            None => log::trace!("{:?} found no patrol point", agent.entity),
        }
    }
}

impl State<Kind, EnemyAgent> for PatrolState {
    fn id(&self) -> Kind {
        Kind::Patrol
    }

    fn enter(&mut self, agent: &mut EnemyAgent) -> StateResult {
        agent.set_speed(agent.settings.patrol_speed);
        // Waypoints are walked onto, not approached
        agent.nav.set_stopping_distance(0.0);
        agent.resume();
        if !self.waiting {
            self.head_to_next(agent);
        }
        Ok(())
    }

    fn update(&mut self, agent: &mut EnemyAgent) -> StateResult<Transition<Kind>> {
        if agent.check_for_target() {
            return go(Kind::Chase);
        }

        if self.waiting {
            self.wait_timer += agent.dt;
            if self.wait_timer >= Self::WAIT_TIME {
                self.waiting = false;
                self.head_to_next(agent);
            }
            return stay();
        }

        if agent.remaining_distance() < Self::ARRIVAL_DISTANCE {
            self.waiting = true;
            self.wait_timer = 0.0;
            if agent.rng.value() < Self::IDLE_CHANCE {
                return go(Kind::Idle);
            }
        }
        stay()
    }

    fn exit(&mut self, agent: &mut EnemyAgent) -> StateResult {
        agent.set_speed(agent.settings.move_speed);
        agent.nav.set_stopping_distance(agent.settings.stopping_distance);
        Ok(())
    }
}

// ============================================================================
// Investigate
// ============================================================================

/// Checking out a noise or the place the target was last seen.
#[derive(Debug, Default)]
pub struct InvestigateState {
    point: Vec3,
    timer: f32,
    reached: bool,
    look_timer: f32,
}

impl InvestigateState {
    const MAX_TIME: f32 = 10.0;
    const LOOK_AROUND_TIME: f32 = 3.0;
    /// Extra look-around time before giving up on waiting for the roll
    const LOOK_AROUND_GRACE: f32 = 2.0;
    /// Sounds older than this are ignored when picking a point
    const SOUND_MEMORY: f32 = 5.0;
    const SPEED_SCALE: f32 = 0.8;

    fn pick_point(&mut self, agent: &mut EnemyAgent) {
        let point = agent
            .perception
            .heard_within(agent.time, Self::SOUND_MEMORY)
            .or(agent.perception.last_known)
            .or_else(|| {
                let radius = agent.settings.wander_radius;
                agent.random_point(radius)
            })
            .unwrap_or(agent.position);

        self.point = point;
        self.reached = false;
        self.look_timer = 0.0;
        agent.resume();
        agent.move_to(point);
        log::trace!("{:?} investigating {point}", agent.entity);
    }
}

impl State<Kind, EnemyAgent> for InvestigateState {
    fn id(&self) -> Kind {
        Kind::Investigate
    }

    fn enter(&mut self, agent: &mut EnemyAgent) -> StateResult {
        self.timer = 0.0;
        agent.set_speed(agent.settings.move_speed * Self::SPEED_SCALE);
        self.pick_point(agent);
        Ok(())
    }

    fn update(&mut self, agent: &mut EnemyAgent) -> StateResult<Transition<Kind>> {
        if agent.check_for_target() {
            return go(Kind::Chase);
        }

        self.timer += agent.dt;
        if self.timer >= Self::MAX_TIME {
            return go(Kind::Idle);
        }

        if !self.reached
            && agent.position.distance(self.point) <= agent.nav.stopping_distance() + 0.5
        {
            self.reached = true;
            agent.stop();
        }
        if !self.reached {
            return stay();
        }

        self.look_timer += agent.dt;
        if self.look_timer <= Self::LOOK_AROUND_TIME {
            // Sweep the gaze left and right
            let sweep = (self.look_timer * 2.0).sin() * std::f32::consts::FRAC_PI_2;
            agent.facing = (glam::Quat::from_rotation_y(sweep * agent.dt) * agent.facing).normalize();
            return stay();
        }

        let give_up_waiting = self.look_timer >= Self::LOOK_AROUND_TIME + Self::LOOK_AROUND_GRACE;
        if agent.rng.value() < 0.3 || give_up_waiting {
            if self.timer < Self::MAX_TIME * 0.7 && agent.rng.value() < 0.7 {
                self.pick_point(agent);
            } else {
                return go(Kind::Idle);
            }
        }
        stay()
    }

    fn exit(&mut self, agent: &mut EnemyAgent) -> StateResult {
        agent.set_speed(agent.settings.move_speed);
        agent.resume();
        Ok(())
    }
}
