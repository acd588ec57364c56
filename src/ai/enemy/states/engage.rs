//! Chase, Attack and RangedAttack

use glam::Vec3;

use crate::ai::effects::Volley;
use crate::ai::enemy::controller::EnemyAgent;
use crate::core::{GameEvent, State, StateResult, Transition};

use super::{Kind, go, stay};

/// Minimum number of other enemies already on the target before circling
const CROWD_SIZE: usize = 3;
/// A sound this recent sends a chaser that lost its target to investigate
const RECENT_SOUND: f32 = 3.0;

// ============================================================================
// Chase
// ============================================================================

/// Running after the target, or to where it was last seen.
#[derive(Debug, Default)]
pub struct ChaseState {
    lost_timer: f32,
    /// Destination around the target while the melee slots are taken
    circle_point: Option<Vec3>,
}

impl ChaseState {
    /// Flee check for a wounded enemy
    fn wants_to_flee(agent: &mut EnemyAgent) -> bool {
        let settings = &agent.settings;
        if !settings.can_flee {
            return false;
        }
        let fraction = agent.health_fraction();
        if fraction > settings.flee_health_percentage {
            return false;
        }
        agent.rng.value() < (1.0 - fraction) * 0.5
    }
}

impl State<Kind, EnemyAgent> for ChaseState {
    fn id(&self) -> Kind {
        Kind::Chase
    }

    fn enter(&mut self, agent: &mut EnemyAgent) -> StateResult {
        self.lost_timer = 0.0;
        self.circle_point = None;
        agent.set_speed(agent.settings.chase_speed);
        agent.resume();
        if let Some(point) = agent.target_position().or(agent.perception.last_known) {
            agent.move_to(point);
        }
        Ok(())
    }

    fn update(&mut self, agent: &mut EnemyAgent) -> StateResult<Transition<Kind>> {
        agent.check_for_target();

        if let Some(target) = agent.target_position() {
            self.lost_timer = 0.0;
            agent.move_to(self.circle_point.unwrap_or(target));

            let distance = agent.position.distance(target);
            if distance <= agent.settings.attack_range {
                return go(Kind::Attack);
            }
            if agent.settings.in_ranged_band(distance) {
                return go(Kind::RangedAttack);
            }
        } else {
            if self.lost_timer == 0.0 {
                if let Some(last_known) = agent.perception.last_known {
                    agent.move_to(last_known);
                }
            }
            self.lost_timer += agent.dt;

            if self.lost_timer >= agent.settings.target_lost_time {
                if agent.perception.heard_within(agent.time, RECENT_SOUND).is_some() {
                    return go(Kind::Investigate);
                }
                return go(Kind::Idle);
            }
            if agent.nav.has_arrived(agent.position) {
                return go(Kind::Investigate);
            }
        }

        if Self::wants_to_flee(agent) {
            return go(Kind::Flee);
        }
        stay()
    }

    fn fixed_update(&mut self, agent: &mut EnemyAgent) -> StateResult {
        self.circle_point = None;
        if !agent.settings.can_coordinate_attacks || agent.allies.is_empty() {
            return Ok(());
        }
        let Some(target) = agent.target_position() else {
            return Ok(());
        };

        let crowd = agent
            .physics
            .overlap_sphere(target, agent.settings.attack_range, agent.settings.ally_layers)
            .iter()
            .filter(|hit| hit.entity != agent.entity)
            .count();
        if crowd >= CROWD_SIZE {
            let to_target = (target - agent.position).normalize_or_zero();
            let side = to_target.cross(Vec3::Y);
            let point = target + side * agent.settings.attack_range * 1.5;
            self.circle_point = Some(point);
            agent.move_to(point);
        }
        Ok(())
    }
}

// ============================================================================
// Attack
// ============================================================================

/// Melee cycle: wind up, strike at the half-way mark, recover.
#[derive(Debug, Default)]
pub struct AttackState {
    timer: f32,
    has_attacked: bool,
}

impl State<Kind, EnemyAgent> for AttackState {
    fn id(&self) -> Kind {
        Kind::Attack
    }

    fn enter(&mut self, agent: &mut EnemyAgent) -> StateResult {
        agent.stop();
        self.timer = 0.0;
        self.has_attacked = false;
        if let Some(target) = agent.target_position() {
            agent.face_towards(target, agent.dt);
        }
        Ok(())
    }

    fn update(&mut self, agent: &mut EnemyAgent) -> StateResult<Transition<Kind>> {
        let (Some(target), Some(target_position)) =
            (agent.perception.target, agent.target_position())
        else {
            return go(Kind::Idle);
        };
        agent.face_towards(target_position, agent.dt);

        let distance = agent.position.distance(target_position);
        if distance > agent.settings.attack_range * 1.1 {
            if agent.settings.in_ranged_band(distance) {
                return go(Kind::RangedAttack);
            }
            return go(Kind::Chase);
        }

        self.timer += agent.dt;
        let cycle = agent.attack_rate();
        if !self.has_attacked && self.timer >= cycle * 0.5 {
            self.has_attacked = true;
            if distance <= agent.settings.attack_range {
                log::debug!("{:?} strikes {target:?}", agent.entity);
                agent.bus.publish(&GameEvent::EnemyAttack {
                    attacker: agent.entity,
                    target,
                    power: agent.settings.attack_power,
                });
            }
        }
        if self.timer >= cycle {
            self.timer = 0.0;
            self.has_attacked = false;
        }
        stay()
    }

    fn exit(&mut self, agent: &mut EnemyAgent) -> StateResult {
        agent.resume();
        Ok(())
    }
}

// ============================================================================
// RangedAttack
// ============================================================================

/// Keeping distance and firing volleys.
#[derive(Debug, Default)]
pub struct RangedAttackState {
    timer: f32,
    volley: Option<Volley>,
    fired_this_cycle: bool,
}

impl State<Kind, EnemyAgent> for RangedAttackState {
    fn id(&self) -> Kind {
        Kind::RangedAttack
    }

    fn enter(&mut self, agent: &mut EnemyAgent) -> StateResult {
        self.timer = 0.0;
        self.volley = None;
        self.fired_this_cycle = false;
        agent.stop();
        Ok(())
    }

    fn update(&mut self, agent: &mut EnemyAgent) -> StateResult<Transition<Kind>> {
        let (Some(target), Some(target_position)) =
            (agent.perception.target, agent.target_position())
        else {
            return go(Kind::Idle);
        };

        let distance = agent.position.distance(target_position);
        if distance > agent.settings.ranged_attack_distance * 1.1 {
            return go(Kind::Chase);
        }
        if distance <= agent.settings.attack_range {
            return go(Kind::Attack);
        }

        self.timer += agent.dt;
        if !self.fired_this_cycle && self.timer >= agent.settings.ranged_attack_rate * 0.5 {
            self.fired_this_cycle = true;
            self.volley = Some(Volley::new(
                agent.settings.ranged_volley_count.max(1),
                agent.settings.ranged_volley_interval,
            ));
        }

        if let Some(volley) = self.volley.as_mut() {
            let shots = volley.step(agent.dt);
            let damage = agent.settings.ranged_attack_power;
            let speed = agent.settings.projectile_speed;
            for _ in 0..shots {
                agent.fire_projectile(target, target_position, damage, speed, Vec3::ZERO);
            }
            if shots > 0 {
                log::debug!("{:?} fired {shots} shot(s) at {target:?}", agent.entity);
            }
        }

        if self.timer >= agent.settings.ranged_attack_rate {
            self.timer = 0.0;
            self.fired_this_cycle = false;
        }
        stay()
    }

    fn fixed_update(&mut self, agent: &mut EnemyAgent) -> StateResult {
        if let Some(target) = agent.target_position() {
            agent.face_towards(target, agent.fixed_dt);
        }
        Ok(())
    }

    fn exit(&mut self, agent: &mut EnemyAgent) -> StateResult {
        self.volley = None;
        agent.resume();
        Ok(())
    }
}
