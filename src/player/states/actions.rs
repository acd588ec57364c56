//! Attack, Dash and Parry

use glam::Vec3;
use hecs::Entity;
use smallvec::SmallVec;

use crate::core::{GameEvent, State, StateResult, Transition};
use crate::physics::LayerMask;
use crate::player::controller::{PlayerAgent, PlayerStateKind};

use super::Locomotion;

type Kind = PlayerStateKind;

/// Flattened direction, or `fallback` when degenerate
fn flat_direction(v: Vec3, fallback: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z).try_normalize().unwrap_or(fallback)
}

// ============================================================================
// Attack
// ============================================================================

/// One melee swing, replayed for each combo step.
///
/// The hit lands `attack_delay` into the swing and opens the combo window.
/// A press during the window, or attack still held when it opens, queues the
/// next step. When the swing ends a queued step starts in place; otherwise
/// control returns to locomotion.
#[derive(Debug, Default)]
pub struct AttackState {
    locomotion: Locomotion,
    timer: f32,
    delay: f32,
    duration: f32,
    has_hit: bool,
}

impl AttackState {
    fn begin_swing(&mut self, agent: &mut PlayerAgent) {
        let index = agent.combo.begin_swing(agent.max_combo());
        (self.delay, self.duration) = agent.swing_timing();
        self.timer = 0.0;
        self.has_hit = false;

        if let Some(clip) = agent.attack_sound(index) {
            agent.audio.play(&clip, Some(agent.position()));
        }
        log::debug!("Swing {} of {}", index + 1, agent.max_combo());
    }

    fn strike(&mut self, agent: &mut PlayerAgent) {
        let index = agent.combo.index();
        let (mut damage, critical) = agent.roll_damage(index);
        if agent.combo.take_counter() {
            damage *= agent.combat.parry_counter_damage_multiplier;
        }

        let origin = agent.position();
        let forward = agent.forward();
        let range = agent.attack_range();
        let half_angle = agent.attack_angle() * 0.5;
        let hits = agent
            .physics
            .overlap_sphere(origin + forward * range * 0.5, range, agent.target_layers());

        agent.bus.publish(&GameEvent::PlayerAttack {
            player: agent.entity,
            combo_index: index,
            damage,
        });

        let me = agent.entity;
        let mut landed = 0;
        for hit in hits.iter().filter(|hit| hit.entity != me) {
            let direction = flat_direction(hit.position - origin, forward);
            if forward.angle_between(direction).to_degrees() >= half_angle {
                continue;
            }
            agent.bus.publish(&GameEvent::EnemyDamaged {
                target: hit.entity,
                amount: damage,
                direction,
                source: Some(me),
            });
            if let Some(clip) = agent.hit_sound() {
                agent.audio.play(&clip, Some(hit.position));
            }
            landed += 1;
        }

        log::debug!(
            "Combo step {index} dealt {damage:.1}{} to {landed} target(s)",
            if critical { " (critical)" } else { "" }
        );
    }
}

impl State<Kind, PlayerAgent> for AttackState {
    fn id(&self) -> Kind {
        Kind::Attack
    }

    fn enter(&mut self, agent: &mut PlayerAgent) -> StateResult {
        self.begin_swing(agent);
        Ok(())
    }

    fn update(&mut self, agent: &mut PlayerAgent) -> StateResult<Transition<Kind>> {
        self.timer += agent.dt;

        if !self.has_hit && self.timer >= self.delay {
            self.has_hit = true;
            self.strike(agent);
            agent.combo.open_window(agent.combat.combo_time_window);
        }

        if agent.input.attack
            && !agent.combo.requested
            && agent.combo.window_open()
            && agent.combo.can_chain(agent.max_combo())
        {
            agent.combo.requested = true;
        }

        if self.timer >= self.duration {
            if agent.combo.requested && agent.combo.can_chain(agent.max_combo()) {
                self.begin_swing(agent);
                return Ok(Transition::None);
            }
            return Ok(Transition::To(agent.locomotion_state()));
        }
        Ok(Transition::None)
    }

    fn fixed_update(&mut self, agent: &mut PlayerAgent) -> StateResult {
        let speed = if agent.input.is_moving() {
            agent.movement.walk_speed * agent.combat.movement_speed_multiplier
        } else {
            0.0
        };
        self.locomotion.drive(agent, speed);
        Ok(())
    }

    fn exit(&mut self, agent: &mut PlayerAgent) -> StateResult {
        agent.combo.requested = false;
        agent.attack_cooldown = agent.combat.attack_cooldown;
        Ok(())
    }
}

// ============================================================================
// Dash
// ============================================================================

/// Burst of constant-speed movement. The controller owns the dash timer.
#[derive(Debug, Default)]
pub struct DashState;

impl State<Kind, PlayerAgent> for DashState {
    fn id(&self) -> Kind {
        Kind::Dash
    }

    fn enter(&mut self, agent: &mut PlayerAgent) -> StateResult {
        let direction = if agent.input.is_moving() {
            flat_direction(agent.input.move_direction(), agent.forward())
        } else {
            agent.forward()
        };
        agent.dash.start(direction, agent.movement.dash_duration);
        agent.bus.publish(&GameEvent::PlayerDashStarted {
            player: agent.entity,
            direction,
        });
        log::debug!("Dash toward {direction}");
        Ok(())
    }

    fn update(&mut self, agent: &mut PlayerAgent) -> StateResult<Transition<Kind>> {
        if !agent.dash.is_dashing() {
            return Ok(Transition::To(agent.settle_state()));
        }
        if agent.movement.can_change_direction_while_dashing && agent.input.is_moving() {
            let current = agent.dash.direction;
            agent.dash.direction = flat_direction(agent.input.move_direction(), current);
        }
        Ok(Transition::None)
    }

    fn fixed_update(&mut self, agent: &mut PlayerAgent) -> StateResult {
        if !agent.dash.is_dashing() {
            return Ok(());
        }
        let horizontal = agent.dash.direction * agent.movement.dash_speed;
        agent.velocity.x = horizontal.x;
        agent.velocity.z = horizontal.z;
        let step = agent.velocity * agent.fixed_dt;
        agent.motor.move_by(step);
        Ok(())
    }
}

// ============================================================================
// Parry
// ============================================================================

/// Deflection window followed by recovery.
#[derive(Debug, Default)]
pub struct ParryState {
    locomotion: Locomotion,
    timer: f32,
    successful: bool,
    parried: SmallVec<[Entity; 4]>,
}

impl ParryState {
    /// Speed scale while parrying
    const MOVE_MULTIPLIER: f32 = 0.3;

    fn detect(&mut self, agent: &mut PlayerAgent) {
        let range = agent.combat.parry_range;
        let center = agent.position() + agent.forward() * range * 0.5;
        let hits = agent
            .physics
            .overlap_sphere(center, range, LayerMask::ENEMY | LayerMask::ENEMY_ATTACK);

        for hit in hits {
            if hit.entity == agent.entity || self.parried.contains(&hit.entity) {
                continue;
            }
            if let Some(cap) = agent.combat.parry_max_targets {
                if self.parried.len() >= cap as usize {
                    break;
                }
            }
            self.parried.push(hit.entity);
            self.successful = true;
            agent.combo.counter_ready = true;

            if let Some(clip) = &agent.combat.parry_success_sound {
                agent.audio.play(clip, Some(hit.position));
            }
            agent.bus.publish(&GameEvent::ParrySucceeded {
                player: agent.entity,
                attacker: hit.entity,
            });
            log::debug!("Parried {:?}", hit.entity);
        }
    }
}

impl State<Kind, PlayerAgent> for ParryState {
    fn id(&self) -> Kind {
        Kind::Parry
    }

    fn enter(&mut self, agent: &mut PlayerAgent) -> StateResult {
        self.timer = 0.0;
        self.successful = false;
        self.parried.clear();
        if let Some(clip) = &agent.combat.parry_sound {
            agent.audio.play(clip, Some(agent.position()));
        }
        Ok(())
    }

    fn update(&mut self, agent: &mut PlayerAgent) -> StateResult<Transition<Kind>> {
        self.timer += agent.dt;
        if self.timer <= agent.combat.parry_active_window {
            self.detect(agent);
        }

        if self.timer >= agent.combat.parry_recovery_time {
            if self.successful && agent.input.attack {
                return Ok(Transition::To(Kind::Attack));
            }
            return Ok(Transition::To(agent.settle_state()));
        }
        Ok(Transition::None)
    }

    fn fixed_update(&mut self, agent: &mut PlayerAgent) -> StateResult {
        let speed = if agent.input.is_moving() {
            agent.movement.walk_speed * Self::MOVE_MULTIPLIER
        } else {
            0.0
        };
        self.locomotion.drive(agent, speed);
        Ok(())
    }

    fn exit(&mut self, agent: &mut PlayerAgent) -> StateResult {
        agent.parry_cooldown = agent.combat.parry_cooldown;
        log::debug!("Parry ended (successful: {})", self.successful);
        Ok(())
    }
}
