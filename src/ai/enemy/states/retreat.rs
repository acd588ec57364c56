//! Flee and Death

use glam::Vec3;

use crate::ai::effects::Countdown;
use crate::ai::enemy::controller::EnemyAgent;
use crate::core::{GameEvent, State, StateResult, Transition};

use super::{Kind, go, stay};

// ============================================================================
// Flee
// ============================================================================

/// Running from the threat toward cover or open distance.
#[derive(Debug, Default)]
pub struct FleeState {
    timer: f32,
    repath_timer: f32,
    destination: Option<Vec3>,
}

impl FleeState {
    const SPEED_SCALE: f32 = 1.2;
    const REPATH_INTERVAL: f32 = 2.0;
    /// How far a straight-line escape aims
    const FLEE_DISTANCE: f32 = 15.0;
    /// Random escape points must be at least this far from the threat
    const MIN_THREAT_DISTANCE: f32 = 10.0;
    const SAMPLE_ATTEMPTS: usize = 8;
    const SAFE_FRACTION: f32 = 0.8;

    fn threat(agent: &EnemyAgent) -> Option<Vec3> {
        agent.target_position().or(agent.perception.last_known)
    }

    fn is_safe(agent: &EnemyAgent) -> bool {
        Self::threat(agent).is_none_or(|threat| {
            agent.position.distance(threat) > agent.settings.detection_range * Self::SAFE_FRACTION
        })
    }

    /// Nearest cover point on the far side of the enemy from the threat
    fn cover_point(agent: &EnemyAgent, threat: Vec3) -> Option<Vec3> {
        let to_threat = threat - agent.position;
        agent
            .cover_points
            .iter()
            .copied()
            .filter(|point| (*point - agent.position).dot(to_threat) < 0.0)
            .min_by(|a, b| {
                agent
                    .position
                    .distance_squared(*a)
                    .total_cmp(&agent.position.distance_squared(*b))
            })
    }

    /// Random navigable point far from the threat and hidden from it
    fn hidden_point(agent: &mut EnemyAgent, threat: Vec3) -> Option<Vec3> {
        for _ in 0..Self::SAMPLE_ATTEMPTS {
            let Some(point) = agent.random_point(Self::FLEE_DISTANCE) else {
                continue;
            };
            if point.distance(threat) > Self::MIN_THREAT_DISTANCE
                && !agent
                    .physics
                    .line_of_sight(threat, point, agent.settings.obstacle_layers)
            {
                return Some(point);
            }
        }
        None
    }

    fn choose_destination(&mut self, agent: &mut EnemyAgent) {
        let threat = Self::threat(agent);
        let away = threat
            .and_then(|t| {
                let d = agent.position - t;
                Vec3::new(d.x, 0.0, d.z).try_normalize()
            })
            .unwrap_or_else(|| {
                let v = agent.rng.inside_unit_circle();
                Vec3::new(v.x, 0.0, v.y).try_normalize().unwrap_or(Vec3::Z)
            });

        let destination = threat
            .and_then(|t| Self::cover_point(agent, t))
            .or_else(|| threat.and_then(|t| Self::hidden_point(agent, t)))
            .or_else(|| {
                agent
                    .nav
                    .sample_position(agent.position + away * Self::FLEE_DISTANCE, Self::FLEE_DISTANCE)
            });

        if let Some(point) = destination {
            agent.move_to(point);
            log::debug!("{:?} fleeing to {point}", agent.entity);
        }
        self.destination = destination;
    }
}

impl State<Kind, EnemyAgent> for FleeState {
    fn id(&self) -> Kind {
        Kind::Flee
    }

    fn enter(&mut self, agent: &mut EnemyAgent) -> StateResult {
        self.timer = 0.0;
        self.repath_timer = 0.0;
        agent.set_speed(agent.settings.chase_speed * Self::SPEED_SCALE);
        agent.resume();
        self.choose_destination(agent);
        Ok(())
    }

    fn update(&mut self, agent: &mut EnemyAgent) -> StateResult<Transition<Kind>> {
        self.timer += agent.dt;
        self.repath_timer += agent.dt;

        if self.timer >= agent.settings.max_flee_time || Self::is_safe(agent) {
            return go(Kind::Idle);
        }
        if self.repath_timer >= Self::REPATH_INTERVAL {
            self.repath_timer = 0.0;
            self.choose_destination(agent);
        }
        stay()
    }

    fn fixed_update(&mut self, agent: &mut EnemyAgent) -> StateResult {
        // Look back over the shoulder, turning at half rate
        if let Some(threat) = agent.target_position() {
            let away = agent.position * 2.0 - threat;
            agent.face_towards(away, agent.fixed_dt * 0.5);
        }
        Ok(())
    }

    fn exit(&mut self, agent: &mut EnemyAgent) -> StateResult {
        agent.set_speed(agent.settings.move_speed);
        // Once away, only a fresh sighting brings it back
        agent.perception.lose_target();
        self.destination = None;
        Ok(())
    }
}

// ============================================================================
// Death
// ============================================================================

/// Terminal state. The body lingers until the despawn countdown runs out.
#[derive(Debug, Default)]
pub struct DeathState;

impl DeathState {
    pub const DESPAWN_DELAY: f32 = 3.0;
}

impl State<Kind, EnemyAgent> for DeathState {
    fn id(&self) -> Kind {
        Kind::Death
    }

    fn enter(&mut self, agent: &mut EnemyAgent) -> StateResult {
        agent.stop();
        agent.nav.set_enabled(false);
        agent.perception.lose_target();
        agent.adaptation.defending = false;
        agent.despawn = Some(Countdown::new(Self::DESPAWN_DELAY));

        log::info!("{:?} died at {}", agent.entity, agent.position);
        agent.bus.publish(&GameEvent::EnemyDied {
            enemy: agent.entity,
            position: agent.position,
        });
        Ok(())
    }

    fn update(&mut self, agent: &mut EnemyAgent) -> StateResult<Transition<Kind>> {
        if let Some(countdown) = agent.despawn.as_mut() {
            if countdown.step(agent.dt) {
                agent.despawn_ready = true;
                log::debug!("{:?} ready to despawn", agent.entity);
            }
        }
        stay()
    }
}
