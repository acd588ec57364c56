//! Enemy controller
//!
//! [`EnemyController`] runs one enemy's [`StateMachine`] over an
//! [`EnemyAgent`]. Damage, help calls, sounds and the player's dash
//! notifications arrive through the event bus into a per-enemy mailbox that
//! is drained at the start of every frame.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use glam::{Quat, Vec3};
use hecs::Entity;

use crate::ai::effects::{Countdown, Knockback};
use crate::ai::navigation::Navigator;
use crate::audio::AudioService;
use crate::core::{
    EventBus, EventHandler, EventKind, EventQueue, FsmError, GameEvent, RandomSource, StateMachine,
};
use crate::physics::{OverlapHit, PhysicsQueries};

use super::abilities::{ActiveAbility, EnemyClass, SpecialAbility};
use super::perception::{Adaptation, Perception};
use super::settings::EnemySettings;
use super::states::{
    AttackState, ChaseState, DeathState, FleeState, IdleState, InvestigateState, PatrolState,
    RangedAttackState,
};

/// Key of each enemy state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnemyStateKind {
    Idle,
    Patrol,
    Chase,
    Attack,
    RangedAttack,
    Flee,
    Investigate,
    Death,
}

impl EnemyStateKind {
    /// States that already have a target to deal with
    #[must_use]
    pub fn is_engaged(self) -> bool {
        matches!(self, Self::Chase | Self::Attack | Self::RangedAttack)
    }
}

/// Collaborators handed to a new enemy.
pub struct EnemyServices {
    pub physics: Rc<dyn PhysicsQueries>,
    pub navigator: Box<dyn Navigator>,
    pub bus: Rc<EventBus>,
    pub audio: Rc<dyn AudioService>,
    pub rng: Box<dyn RandomSource>,
}

/// Everything the enemy states read and mutate.
pub struct EnemyAgent {
    pub entity: Entity,
    pub settings: Rc<EnemySettings>,
    pub physics: Rc<dyn PhysicsQueries>,
    pub nav: Box<dyn Navigator>,
    pub bus: Rc<EventBus>,
    pub audio: Rc<dyn AudioService>,
    pub rng: Box<dyn RandomSource>,
    pub position: Vec3,
    /// Yaw-only orientation; forward is +Z
    pub facing: Quat,
    pub health: f32,
    pub perception: Perception,
    pub adaptation: Adaptation,
    /// Other enemies within help range, refreshed every frame
    pub allies: Vec<OverlapHit>,
    pub waypoints: Vec<Vec3>,
    pub cover_points: Vec<Vec3>,
    pub knockback: Option<Knockback>,
    /// Runs once dead; the body is removed when it expires
    pub despawn: Option<Countdown>,
    pub despawn_ready: bool,
    /// The current target is mid-dash
    pub target_dashing: bool,
    /// Side picked for the current dodge (+1 right, -1 left)
    pub dodge_side: f32,
    pub class: Option<EnemyClass>,
    /// The class ability currently winding up or running
    pub ability: Option<ActiveAbility>,
    /// Seconds until the class ability may be used again
    pub ability_cooldown: f32,
    /// Speed requested by the states, before ability buffs
    pub base_speed: f32,
    /// Seconds since spawn
    pub time: f32,
    pub dt: f32,
    pub fixed_dt: f32,
}

impl EnemyAgent {
    pub fn new(
        entity: Entity,
        position: Vec3,
        settings: Rc<EnemySettings>,
        services: EnemyServices,
    ) -> Self {
        let mut nav = services.navigator;
        nav.set_speed(settings.move_speed);
        nav.set_stopping_distance(settings.stopping_distance);
        Self {
            entity,
            health: settings.max_health,
            class: settings.enemy_class,
            ability: None,
            ability_cooldown: settings.special_ability_cooldown,
            base_speed: settings.move_speed,
            settings,
            physics: services.physics,
            nav,
            bus: services.bus,
            audio: services.audio,
            rng: services.rng,
            position,
            facing: Quat::IDENTITY,
            perception: Perception::default(),
            adaptation: Adaptation::default(),
            allies: Vec::new(),
            waypoints: Vec::new(),
            cover_points: Vec::new(),
            knockback: None,
            despawn: None,
            despawn_ready: false,
            target_dashing: false,
            dodge_side: 1.0,
            time: 0.0,
            dt: 0.0,
            fixed_dt: crate::core::Time::DEFAULT_FIXED_DELTA,
        }
    }

    #[must_use]
    pub fn forward(&self) -> Vec3 {
        self.facing * Vec3::Z
    }

    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.health <= 0.0
    }

    #[must_use]
    pub fn health_fraction(&self) -> f32 {
        if self.settings.max_health <= 0.0 {
            return 0.0;
        }
        (self.health / self.settings.max_health).clamp(0.0, 1.0)
    }

    /// Live position of the current target
    #[must_use]
    pub fn target_position(&self) -> Option<Vec3> {
        self.perception
            .target
            .and_then(|target| self.physics.locate(target))
    }

    #[must_use]
    pub fn target_distance(&self) -> Option<f32> {
        self.target_position().map(|p| self.position.distance(p))
    }

    /// Inside the vision cone, within detection range, and unobstructed
    #[must_use]
    pub fn can_see(&self, point: Vec3) -> bool {
        let offset = point - self.position;
        let distance = offset.length();
        if distance > self.settings.detection_range {
            return false;
        }
        if distance > f32::EPSILON {
            let angle = self.forward().angle_between(offset / distance).to_degrees();
            if angle >= self.settings.detection_angle * 0.5 {
                return false;
            }
        }
        self.physics
            .line_of_sight(self.position, point, self.settings.obstacle_layers)
    }

    /// Keep the current target while it stays visible, otherwise look for a new one.
    ///
    /// A newly spotted target is announced with `EnemyTargetDetected` and
    /// triggers this life's help call.
    pub fn check_for_target(&mut self) -> bool {
        if let Some(target) = self.perception.target {
            match self.physics.locate(target) {
                Some(position) if self.can_see(position) => {
                    self.perception.acquire(target, position, self.time);
                    self.perception.responding = false;
                    return true;
                }
                // Still heading for the target an ally reported
                Some(position) if self.perception.responding => {
                    self.perception.last_known = Some(position);
                    return true;
                }
                _ => self.perception.lose_target(),
            }
        }

        let mut candidates = self.physics.overlap_sphere(
            self.position,
            self.settings.detection_range,
            self.settings.target_layers,
        );
        candidates.sort_by(|a, b| {
            self.position
                .distance_squared(a.position)
                .total_cmp(&self.position.distance_squared(b.position))
        });
        let Some(hit) = candidates
            .into_iter()
            .find(|hit| hit.entity != self.entity && self.can_see(hit.position))
        else {
            return false;
        };

        let distance = self.position.distance(hit.position);
        self.perception.acquire(hit.entity, hit.position, self.time);
        log::debug!("{:?} spotted {:?} at {distance:.1}", self.entity, hit.entity);
        self.bus.publish(&GameEvent::EnemyTargetDetected {
            enemy: self.entity,
            target: hit.entity,
            distance,
        });
        self.call_for_help();
        true
    }

    /// Alert nearby allies to the current target. At most once per life.
    pub fn call_for_help(&mut self) {
        if !self.settings.can_call_for_help || self.perception.called_for_help {
            return;
        }
        let Some(target) = self.perception.target else {
            return;
        };
        self.perception.called_for_help = true;
        log::info!("{:?} calls for help against {target:?}", self.entity);
        self.bus.publish(&GameEvent::EnemyHelpCall {
            caller: self.entity,
            position: self.position,
            target: Some(target),
        });
    }

    /// Turn toward `point` at the configured rotation speed.
    pub fn face_towards(&mut self, point: Vec3, dt: f32) {
        let direction = point - self.position;
        if direction.x == 0.0 && direction.z == 0.0 {
            return;
        }
        let target = Quat::from_rotation_y(direction.x.atan2(direction.z));
        let t = (self.settings.rotation_speed * dt).clamp(0.0, 1.0);
        self.facing = self.facing.slerp(target, t).normalize();
    }

    /// Path to `destination`. Returns `false` if it cannot be reached.
    pub fn move_to(&mut self, destination: Vec3) -> bool {
        self.nav.set_destination(self.position, destination)
    }

    pub fn stop(&mut self) {
        self.nav.set_stopped(true);
    }

    pub fn resume(&mut self) {
        self.nav.set_stopped(false);
    }

    /// Set the movement speed. Running ability buffs scale it.
    pub fn set_speed(&mut self, speed: f32) {
        self.base_speed = speed;
        self.refresh_speed();
    }

    /// Re-apply the base speed with the current ability buff.
    pub fn refresh_speed(&mut self) {
        let scale = self
            .ability
            .as_ref()
            .map_or(1.0, ActiveAbility::speed_multiplier);
        self.nav.set_speed(self.base_speed * scale);
    }

    /// Seconds between melee attacks, after ability buffs
    #[must_use]
    pub fn attack_rate(&self) -> f32 {
        self.settings.attack_rate
            * self
                .ability
                .as_ref()
                .map_or(1.0, ActiveAbility::attack_rate_multiplier)
    }

    #[must_use]
    pub fn damage_taken_multiplier(&self) -> f32 {
        self.ability
            .as_ref()
            .map_or(1.0, ActiveAbility::damage_taken_multiplier)
    }

    /// Launch a projectile at `target`, aimed at `aim_at` and nudged by `spread`.
    ///
    /// The host flies it and reports the impact. Returns `false` when there
    /// is no direction to shoot in.
    pub fn fire_projectile(
        &mut self,
        target: Entity,
        aim_at: Vec3,
        damage: f32,
        speed: f32,
        spread: Vec3,
    ) -> bool {
        let Some(aim) = (aim_at - self.position).try_normalize() else {
            return false;
        };
        let direction = (aim + spread).try_normalize().unwrap_or(aim);
        self.bus.publish(&GameEvent::ProjectileFired {
            owner: self.entity,
            target,
            origin: self.position + aim * MUZZLE_OFFSET,
            direction,
            speed,
            damage,
            lifetime: self.settings.projectile_lifetime,
        });
        true
    }

    /// Apply the one-off part of `ability` the moment its windup completes.
    pub fn unleash(&mut self, ability: SpecialAbility) {
        let me = self.entity;
        log::debug!("{me:?} unleashes {}", ability.name());
        match ability {
            SpecialAbility::PowerStrike => {
                let reach = self.settings.attack_range * SpecialAbility::POWER_STRIKE_REACH;
                let in_reach = self.target_distance().is_some_and(|d| d <= reach);
                if let Some(target) = self.perception.target.filter(|_| in_reach) {
                    self.bus.publish(&GameEvent::EnemyAttack {
                        attacker: me,
                        target,
                        power: self.settings.attack_power * SpecialAbility::POWER_STRIKE_DAMAGE,
                    });
                }
            }
            SpecialAbility::MagicBurst => {
                let power = self.settings.attack_power * SpecialAbility::MAGIC_BURST_DAMAGE;
                let hits = self.physics.overlap_sphere(
                    self.position,
                    SpecialAbility::MAGIC_BURST_RADIUS,
                    self.settings.target_layers,
                );
                for hit in hits.into_iter().filter(|hit| hit.entity != me) {
                    self.bus.publish(&GameEvent::EnemyAttack {
                        attacker: me,
                        target: hit.entity,
                        power,
                    });
                }
            }
            SpecialAbility::PlaceTrap => {
                log::info!("{me:?} set a trap at {}", self.position);
            }
            SpecialAbility::WildRoar => {
                if self.settings.can_call_for_help {
                    self.bus.publish(&GameEvent::EnemyHelpCall {
                        caller: me,
                        position: self.position,
                        target: self.perception.target,
                    });
                }
            }
            SpecialAbility::RapidShot
            | SpecialAbility::Stealth
            | SpecialAbility::DefensiveStance
            | SpecialAbility::Berserk => {}
        }
    }

    /// Fire `shots` rapid-shot projectiles with a little random spread.
    fn rapid_fire(&mut self, shots: u32) {
        let (Some(target), Some(aim_at)) = (self.perception.target, self.target_position()) else {
            return;
        };
        let damage = self.settings.ranged_attack_power * SpecialAbility::RAPID_SHOT_DAMAGE;
        let speed = self.settings.projectile_speed * SpecialAbility::RAPID_SHOT_SPEED;
        for _ in 0..shots {
            let spread = Vec3::new(
                self.rng.range(-0.1, 0.1),
                self.rng.range(-0.05, 0.05),
                self.rng.range(-0.1, 0.1),
            );
            self.fire_projectile(target, aim_at, damage, speed, spread);
        }
    }

    /// Tick the running ability, or start one when the class allows it.
    ///
    /// A new ability needs the cooldown elapsed and a target within
    /// detection range. It then starts when health is below the threshold
    /// or on an `ability_chance` roll.
    pub fn update_ability(&mut self, dt: f32) {
        if self.is_dead() {
            self.ability = None;
            return;
        }
        self.ability_cooldown = (self.ability_cooldown - dt).max(0.0);

        if let Some(mut active) = self.ability.take() {
            if active.step(dt) {
                self.unleash(active.ability());
            }
            let shots = active.shots_due(dt);
            if shots > 0 {
                self.rapid_fire(shots);
            }
            if active.is_finished() {
                log::debug!("{:?}: {} wore off", self.entity, active.ability().name());
            } else {
                self.ability = Some(active);
            }
            self.refresh_speed();
            return;
        }

        let Some(class) = self.class else {
            return;
        };
        if self.ability_cooldown > 0.0 {
            return;
        }
        let in_range = self
            .target_distance()
            .is_some_and(|d| d <= self.settings.detection_range);
        if !in_range {
            return;
        }
        let desperate = self.health_fraction() < self.settings.ability_health_threshold;
        if !desperate && self.rng.value() >= self.settings.ability_chance {
            return;
        }
        let ability = class.ability();
        log::info!("{:?} ({class:?}) uses {}", self.entity, ability.name());
        self.ability = Some(ActiveAbility::new(ability));
        self.ability_cooldown = self.settings.special_ability_cooldown;
    }

    #[must_use]
    pub fn remaining_distance(&self) -> f32 {
        self.nav.remaining_distance(self.position)
    }

    /// Navigable point sampled around `center` within `radius`
    pub fn random_point_around(&mut self, center: Vec3, radius: f32) -> Option<Vec3> {
        let offset = self.rng.inside_unit_circle() * radius;
        let candidate = center + Vec3::new(offset.x, 0.0, offset.y);
        self.nav.sample_position(candidate, radius)
    }

    /// Navigable point sampled within `radius` of the enemy
    pub fn random_point(&mut self, radius: f32) -> Option<Vec3> {
        self.random_point_around(self.position, radius)
    }
}

/// Mailbox filter for one enemy
fn accepts(enemy: Entity, event: &GameEvent) -> bool {
    match event {
        GameEvent::EnemyDamaged { target, .. } => *target == enemy,
        GameEvent::EnemyHelpCall { caller, .. } => *caller != enemy,
        GameEvent::SoundEmitted { source, .. } => *source != Some(enemy),
        GameEvent::PlayerDashStarted { .. }
        | GameEvent::PlayerDashEnded { .. }
        | GameEvent::PlayerDied { .. } => true,
        _ => false,
    }
}

const SUBSCRIPTIONS: [EventKind; 6] = [
    EventKind::EnemyDamaged,
    EventKind::EnemyHelpCall,
    EventKind::SoundEmitted,
    EventKind::PlayerDashStarted,
    EventKind::PlayerDashEnded,
    EventKind::PlayerDied,
];

/// Distance in front of the enemy where projectiles start
const MUZZLE_OFFSET: f32 = 1.0;

/// Drives one enemy.
pub struct EnemyController {
    agent: EnemyAgent,
    machine: StateMachine<EnemyStateKind, EnemyAgent>,
    mailbox: Rc<RefCell<EventQueue>>,
    inbox: EventHandler,
}

impl EnemyController {
    /// Build the state set, enter Idle and subscribe to the bus.
    ///
    /// # Errors
    ///
    /// Returns an error if the state machine cannot be initialized
    pub fn new(
        entity: Entity,
        position: Vec3,
        settings: Rc<EnemySettings>,
        services: EnemyServices,
    ) -> Result<Self, FsmError<EnemyStateKind>> {
        let mut agent = EnemyAgent::new(entity, position, settings, services);

        let mut machine = StateMachine::new(format!("enemy {entity:?}"));
        machine.add_state(IdleState::default())?;
        machine.add_state(PatrolState::default())?;
        machine.add_state(ChaseState::default())?;
        machine.add_state(AttackState::default())?;
        machine.add_state(RangedAttackState::default())?;
        machine.add_state(FleeState::default())?;
        machine.add_state(InvestigateState::default())?;
        machine.add_state(DeathState)?;
        machine.initialize(EnemyStateKind::Idle, &mut agent)?;

        let mailbox = Rc::new(RefCell::new(EventQueue::new()));
        let inbox = EventQueue::forwarder(&mailbox, move |event| accepts(entity, event));

        let controller = Self {
            agent,
            machine,
            mailbox,
            inbox,
        };
        controller.attach();
        Ok(controller)
    }

    /// Patrol route, visited in order and then from the start again.
    #[must_use]
    pub fn with_waypoints(mut self, waypoints: Vec<Vec3>) -> Self {
        self.agent.waypoints = waypoints;
        self
    }

    /// Hiding spots used when fleeing.
    #[must_use]
    pub fn with_cover_points(mut self, cover_points: Vec<Vec3>) -> Self {
        self.agent.cover_points = cover_points;
        self
    }

    /// Combat class, which decides the special ability.
    #[must_use]
    pub fn with_class(mut self, class: EnemyClass) -> Self {
        self.agent.class = Some(class);
        self
    }

    /// Face `rotation` (yaw only) without waiting for the turn rate.
    #[must_use]
    pub fn with_facing(mut self, rotation: Quat) -> Self {
        self.agent.facing = rotation;
        self
    }

    /// Subscribe to the bus. Returns the number of new subscriptions.
    pub fn attach(&self) -> usize {
        SUBSCRIPTIONS
            .iter()
            .filter(|kind| self.agent.bus.subscribe(**kind, &self.inbox))
            .count()
    }

    /// Remove every subscription of this controller.
    pub fn detach(&self) {
        for kind in SUBSCRIPTIONS {
            self.agent.bus.unsubscribe(kind, &self.inbox);
        }
    }

    /// Per-frame update: events, senses, state logic, then movement.
    pub fn update(&mut self, dt: f32) {
        self.agent.time += dt;
        self.agent.dt = dt;
        self.process_events();

        if !self.agent.is_dead() {
            self.refresh_allies();
            let distance = self.agent.target_distance();
            let roll = self.agent.rng.value();
            let agent = &mut self.agent;
            agent.adaptation.update_guard(&agent.settings, distance, roll);
        }

        self.machine.update(&mut self.agent);
        self.agent.update_ability(dt);
        self.apply_movement(dt);
    }

    /// Fixed-step update.
    pub fn fixed_update(&mut self, fixed_dt: f32) {
        self.agent.fixed_dt = fixed_dt;
        self.machine.fixed_update(&mut self.agent);
    }

    fn refresh_allies(&mut self) {
        let agent = &mut self.agent;
        if !agent.settings.can_call_for_help && !agent.settings.can_coordinate_attacks {
            agent.allies.clear();
            return;
        }
        let me = agent.entity;
        agent.allies = agent
            .physics
            .overlap_sphere(
                agent.position,
                agent.settings.help_call_range,
                agent.settings.ally_layers,
            )
            .into_iter()
            .filter(|hit| hit.entity != me)
            .collect();
    }

    /// Sidestep velocity while countering a dashing target
    fn dodge_velocity(&self) -> Option<Vec3> {
        let agent = &self.agent;
        if !agent.target_dashing || !agent.adaptation.counters_dash(&agent.settings) {
            return None;
        }
        let distance = agent.target_distance()?;
        if distance >= agent.settings.attack_range * 1.5 {
            return None;
        }
        let right = agent.facing * Vec3::X;
        Some(right * agent.dodge_side * agent.settings.move_speed * 1.5)
    }

    fn apply_movement(&mut self, dt: f32) {
        let before = self.agent.position;
        let dodge = self.dodge_velocity();
        let agent = &mut self.agent;

        if let Some(knockback) = agent.knockback.as_mut() {
            // Path following is paused until the push is over
            match knockback.step(dt) {
                Some(offset) => agent.position += offset,
                None => agent.knockback = None,
            }
            return;
        }

        if let Some(velocity) = dodge {
            agent.position += velocity * dt;
            return;
        }

        agent.position = agent.nav.advance(agent.position, dt);
        let moved = agent.position - before;
        if moved.x.abs() + moved.z.abs() > 1e-5 {
            let ahead = agent.position + moved;
            agent.face_towards(ahead, dt);
        }
    }

    fn process_events(&mut self) {
        let events: Vec<GameEvent> = self.mailbox.borrow_mut().drain().collect();
        if self.agent.is_dead() {
            return;
        }
        for event in events {
            self.handle_event(event);
            if self.agent.is_dead() {
                break;
            }
        }
    }

    fn handle_event(&mut self, event: GameEvent) {
        match event {
            GameEvent::EnemyDamaged {
                amount,
                direction,
                source,
                ..
            } => {
                self.take_damage(amount, direction, source);
            }
            GameEvent::EnemyHelpCall {
                caller,
                position,
                target,
            } => self.respond_to_help(caller, position, target),
            GameEvent::SoundEmitted {
                position,
                intensity,
                ..
            } => self.hear(position, intensity),
            GameEvent::PlayerDashStarted { player, .. } => {
                if self.agent.perception.target == Some(player) {
                    self.agent.target_dashing = true;
                    self.agent.dodge_side = if self.agent.rng.value() > 0.5 { 1.0 } else { -1.0 };
                }
            }
            GameEvent::PlayerDashEnded { player } => {
                if self.agent.perception.target == Some(player) {
                    self.agent.target_dashing = false;
                }
            }
            GameEvent::PlayerDied { player, .. } => {
                if self.agent.perception.target == Some(player) {
                    self.agent.perception.lose_target();
                    self.agent.target_dashing = false;
                }
            }
            _ => {}
        }
    }

    /// Apply a hit. Returns the remaining health.
    ///
    /// The enemy is knocked back along `direction`, remembers the hit, and
    /// then dies, flees or turns on `source` depending on what is left.
    pub fn take_damage(&mut self, amount: f32, direction: Vec3, source: Option<Entity>) -> f32 {
        if self.agent.is_dead() {
            return 0.0;
        }
        let agent = &mut self.agent;
        let amount =
            agent.adaptation.mitigate(&agent.settings, amount) * agent.damage_taken_multiplier();
        agent.health = (agent.health - amount.max(0.0)).max(0.0);
        agent.knockback = Some(Knockback::new(
            direction,
            Knockback::DEFAULT_FORCE,
            Knockback::DEFAULT_DURATION,
        ));
        agent.adaptation.record_hit(&agent.settings, agent.target_dashing);
        log::debug!(
            "{:?} took {amount:.1} damage ({:.1} left)",
            agent.entity,
            agent.health
        );

        if agent.is_dead() {
            agent.ability = None;
            self.transition(EnemyStateKind::Death);
            return 0.0;
        }

        if let Some(source) = source.filter(|s| *s != agent.entity) {
            match agent.physics.locate(source) {
                Some(position) => agent.perception.acquire(source, position, agent.time),
                None => agent.perception.target = Some(source),
            }
            // Keep after the attacker even if it struck from out of sight
            agent.perception.responding = true;
        }
        if agent.settings.can_flee
            && agent.health_fraction() <= agent.settings.flee_health_percentage
        {
            if !self.machine.is_in_state(EnemyStateKind::Flee) {
                self.transition(EnemyStateKind::Flee);
            }
        } else {
            agent.call_for_help();
            let engaged = self.machine.current().is_some_and(EnemyStateKind::is_engaged);
            if !engaged && self.agent.perception.target.is_some() {
                self.transition(EnemyStateKind::Chase);
            }
        }
        self.agent.health
    }

    /// Join an ally's fight if close enough and not already busy.
    pub fn respond_to_help(&mut self, caller: Entity, position: Vec3, target: Option<Entity>) {
        let agent = &mut self.agent;
        if agent.is_dead() || caller == agent.entity || agent.perception.target.is_some() {
            return;
        }
        if agent.position.distance(position) > agent.settings.help_call_range {
            return;
        }
        if self.machine.is_in_state(EnemyStateKind::Flee) {
            return;
        }

        match target {
            Some(target) => {
                let seen_at = agent.physics.locate(target).unwrap_or(position);
                agent.perception.target = Some(target);
                agent.perception.last_known = Some(seen_at);
            }
            None => agent.perception.last_known = Some(position),
        }
        agent.perception.responding = true;
        log::debug!("{:?} answers help call from {caller:?}", agent.entity);
        self.transition(EnemyStateKind::Chase);
    }

    /// React to a sound at `position`.
    pub fn hear(&mut self, position: Vec3, intensity: f32) {
        let agent = &mut self.agent;
        if agent.is_dead() {
            return;
        }
        let alarming = agent.perception.hear(
            agent.position,
            position,
            intensity,
            agent.settings.hearing_range,
            agent.time,
        );
        let idle_minded = matches!(
            self.machine.current(),
            Some(EnemyStateKind::Idle | EnemyStateKind::Patrol)
        );
        if alarming && agent.perception.target.is_none() && idle_minded {
            log::trace!("{:?} heard something at {position}", agent.entity);
            self.transition(EnemyStateKind::Investigate);
        }
    }

    /// Request a state change. Death is final.
    fn transition(&mut self, kind: EnemyStateKind) {
        if self.machine.is_in_state(EnemyStateKind::Death) {
            return;
        }
        if let Err(e) = self.machine.change_state(kind, &mut self.agent) {
            log::error!("{:?}: {e}", self.agent.entity);
        }
    }

    #[must_use]
    pub fn entity(&self) -> Entity {
        self.agent.entity
    }

    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.agent.position
    }

    /// Teleport, e.g. when the host resolves collisions.
    pub fn set_position(&mut self, position: Vec3) {
        self.agent.position = position;
    }

    #[must_use]
    pub fn current_state(&self) -> Option<EnemyStateKind> {
        self.machine.current()
    }

    #[must_use]
    pub fn is_in_state(&self, kind: EnemyStateKind) -> bool {
        self.machine.is_in_state(kind)
    }

    #[must_use]
    pub fn health(&self) -> f32 {
        self.agent.health
    }

    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.agent.is_dead()
    }

    /// Dead and the despawn delay has run out
    #[must_use]
    pub fn is_despawn_ready(&self) -> bool {
        self.agent.despawn_ready
    }

    #[must_use]
    pub fn target(&self) -> Option<Entity> {
        self.agent.perception.target
    }

    #[must_use]
    pub fn class(&self) -> Option<EnemyClass> {
        self.agent.class
    }

    /// The class ability in progress, if any
    #[must_use]
    pub fn active_ability(&self) -> Option<SpecialAbility> {
        self.agent.ability.as_ref().map(ActiveAbility::ability)
    }

    #[must_use]
    pub fn agent(&self) -> &EnemyAgent {
        &self.agent
    }

    pub fn agent_mut(&mut self) -> &mut EnemyAgent {
        &mut self.agent
    }
}

impl Drop for EnemyController {
    fn drop(&mut self) {
        self.detach();
    }
}

impl fmt::Debug for EnemyController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnemyController")
            .field("entity", &self.agent.entity)
            .field("state", &self.machine.current())
            .field("health", &self.agent.health)
            .field("position", &self.agent.position)
            .field("target", &self.agent.perception.target)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use glam::Vec3;
    use hecs::Entity;

    use super::*;
    use crate::core::{EventBus, EventKind, GameEvent, handler};
    use crate::physics::LayerMask;
    use crate::testing::{FakePhysics, RecordingAudio, ScriptedRandom, StraightNavigator, entities};

    const DT: f32 = 0.1;

    struct Scene {
        bus: Rc<EventBus>,
        physics: Rc<FakePhysics>,
        player: Entity,
    }

    impl Scene {
        fn with_player_at(position: Vec3) -> Self {
            let [player] = entities();
            let physics = Rc::new(FakePhysics::default());
            physics.add(player, position, LayerMask::PLAYER);
            Self {
                bus: Rc::new(EventBus::new()),
                physics,
                player,
            }
        }

        fn enemy_with(&self, position: Vec3, settings: EnemySettings, roll: f32) -> EnemyController {
            let [entity] = entities();
            EnemyController::new(
                entity,
                position,
                Rc::new(settings),
                EnemyServices {
                    physics: self.physics.clone(),
                    navigator: Box::new(StraightNavigator::default()),
                    bus: self.bus.clone(),
                    audio: Rc::new(RecordingAudio::default()),
                    rng: Box::new(ScriptedRandom::constant(roll)),
                },
            )
            .unwrap()
        }

        fn enemy(&self, position: Vec3) -> EnemyController {
            self.enemy_with(position, EnemySettings::default(), 0.9)
        }

        fn record(&self, kind: EventKind) -> Rc<RefCell<Vec<GameEvent>>> {
            let log = Rc::new(RefCell::new(Vec::new()));
            let sink = log.clone();
            let recorder = handler(move |event| {
                sink.borrow_mut().push(event.clone());
                Ok(())
            });
            self.bus.subscribe(kind, &recorder);
            log
        }

        fn hit(&self, enemy: &EnemyController, amount: f32) {
            self.bus.publish(&GameEvent::EnemyDamaged {
                target: enemy.entity(),
                amount,
                direction: Vec3::NEG_Z,
                source: Some(self.player),
            });
        }
    }

    fn run(enemy: &mut EnemyController, frames: usize) {
        for _ in 0..frames {
            enemy.fixed_update(DT);
            enemy.update(DT);
        }
    }

    fn run_until(enemy: &mut EnemyController, kind: EnemyStateKind, max_frames: usize) -> bool {
        for _ in 0..max_frames {
            run(enemy, 1);
            if enemy.is_in_state(kind) {
                return true;
            }
        }
        false
    }

    #[test]
    fn test_idle_spots_player_and_chases() {
        let scene = Scene::with_player_at(Vec3::new(0.0, 0.0, 5.0));
        let detected = scene.record(EventKind::EnemyTargetDetected);
        let help = scene.record(EventKind::EnemyHelpCall);
        let mut enemy = scene.enemy(Vec3::ZERO);
        assert_eq!(enemy.current_state(), Some(EnemyStateKind::Idle));

        run(&mut enemy, 1);
        assert_eq!(enemy.current_state(), Some(EnemyStateKind::Chase));
        assert_eq!(enemy.target(), Some(scene.player));

        let detected = detected.borrow();
        assert_eq!(detected.len(), 1);
        assert!(matches!(
            detected[0],
            GameEvent::EnemyTargetDetected { target, distance, .. }
                if target == scene.player && (distance - 5.0).abs() < 1e-4
        ));

        run(&mut enemy, 5);
        assert_eq!(help.borrow().len(), 1);
    }

    #[test]
    fn test_player_behind_or_occluded_is_not_seen() {
        let scene = Scene::with_player_at(Vec3::new(0.0, 0.0, -5.0));
        let mut enemy = scene.enemy(Vec3::ZERO);
        run(&mut enemy, 3);
        assert_eq!(enemy.current_state(), Some(EnemyStateKind::Idle));

        scene.physics.set_position(scene.player, Vec3::new(0.0, 0.0, 5.0));
        scene.physics.add_blocker(Vec3::new(0.0, 0.0, 2.5), 0.5);
        run(&mut enemy, 3);
        assert_eq!(enemy.current_state(), Some(EnemyStateKind::Idle));
    }

    #[test]
    fn test_chase_attacks_exactly_in_range() {
        let scene = Scene::with_player_at(Vec3::new(0.0, 0.0, 6.0));
        let mut enemy = scene.enemy(Vec3::ZERO);
        run(&mut enemy, 1);
        assert!(enemy.is_in_state(EnemyStateKind::Chase));

        let target = Vec3::new(0.0, 0.0, 6.0);
        for _ in 0..40 {
            let distance = enemy.position().distance(target);
            run(&mut enemy, 1);
            if enemy.is_in_state(EnemyStateKind::Attack) {
                assert!(distance <= 2.0, "attacked from {distance}");
                return;
            }
            assert!(distance > 2.0, "still chasing at {distance}");
        }
        panic!("never reached attack range");
    }

    #[test]
    fn test_attack_cycle_strikes_once_per_rate() {
        let scene = Scene::with_player_at(Vec3::new(0.0, 0.0, 1.5));
        let attacks = scene.record(EventKind::EnemyAttack);
        let mut enemy = scene.enemy(Vec3::ZERO);
        assert!(run_until(&mut enemy, EnemyStateKind::Attack, 5));

        run(&mut enemy, 10);
        assert_eq!(attacks.borrow().len(), 1);
        assert!(matches!(
            attacks.borrow()[0],
            GameEvent::EnemyAttack { target, power, .. } if target == scene.player && power == 10.0
        ));

        run(&mut enemy, 15);
        assert_eq!(attacks.borrow().len(), 2);
    }

    #[test]
    fn test_attack_resumes_chase_when_target_backs_off() {
        let scene = Scene::with_player_at(Vec3::new(0.0, 0.0, 1.5));
        let mut enemy = scene.enemy(Vec3::ZERO);
        assert!(run_until(&mut enemy, EnemyStateKind::Attack, 5));

        scene.physics.set_position(scene.player, Vec3::new(0.0, 0.0, 6.0));
        run(&mut enemy, 1);
        assert_eq!(enemy.current_state(), Some(EnemyStateKind::Chase));
    }

    #[test]
    fn test_ranged_enemy_fires_volley_from_distance() {
        let settings = EnemySettings {
            can_use_ranged_attack: true,
            ranged_volley_count: 3,
            ranged_volley_interval: 0.2,
            ..EnemySettings::default()
        };
        let scene = Scene::with_player_at(Vec3::new(0.0, 0.0, 7.0));
        let shots = scene.record(EventKind::ProjectileFired);
        let impacts = scene.record(EventKind::EnemyRangedAttack);
        let mut enemy = scene.enemy_with(Vec3::ZERO, settings, 0.9);

        assert!(run_until(&mut enemy, EnemyStateKind::RangedAttack, 5));
        run(&mut enemy, 16);
        let shots = shots.borrow();
        assert_eq!(shots.len(), 3);
        assert!(shots.iter().all(|shot| matches!(
            shot,
            GameEvent::ProjectileFired { owner, target, damage, speed, direction, origin, .. }
                if *owner == enemy.entity()
                    && *target == scene.player
                    && *damage == 8.0
                    && *speed == 20.0
                    && direction.z > 0.99
                    && origin.z > enemy.position().z
        )));
        // Damage is reported by whoever flies the projectile
        assert!(impacts.borrow().is_empty());
    }

    fn classed(class: EnemyClass, cooldown: f32) -> EnemySettings {
        EnemySettings {
            enemy_class: Some(class),
            special_ability_cooldown: cooldown,
            can_flee: false,
            ..EnemySettings::default()
        }
    }

    fn power_strikes(attacks: &RefCell<Vec<GameEvent>>) -> usize {
        attacks
            .borrow()
            .iter()
            .filter(|e| matches!(e, GameEvent::EnemyAttack { power, .. } if *power == 25.0))
            .count()
    }

    #[test]
    fn test_wounded_warrior_power_strikes_once_per_cooldown() {
        let scene = Scene::with_player_at(Vec3::new(0.0, 0.0, 1.0));
        let attacks = scene.record(EventKind::EnemyAttack);
        let mut enemy = scene.enemy_with(Vec3::ZERO, classed(EnemyClass::Warrior, 1.0), 0.9);
        assert_eq!(enemy.class(), Some(EnemyClass::Warrior));

        scene.hit(&enemy, 60.0);
        run(&mut enemy, 12);
        // Below half health, so no roll is needed once the cooldown is over
        assert_eq!(enemy.active_ability(), Some(SpecialAbility::PowerStrike));
        assert_eq!(power_strikes(&attacks), 0);

        run(&mut enemy, 12);
        assert_eq!(power_strikes(&attacks), 1);
    }

    #[test]
    fn test_healthy_enemy_needs_the_roll() {
        for (roll, uses) in [(0.9, false), (0.1, true)] {
            let scene = Scene::with_player_at(Vec3::new(0.0, 0.0, 1.0));
            let mut enemy = scene.enemy_with(Vec3::ZERO, classed(EnemyClass::Warrior, 1.0), roll);
            run(&mut enemy, 12);
            assert_eq!(enemy.active_ability().is_some(), uses, "roll {roll}");
        }
    }

    #[test]
    fn test_classless_enemy_never_uses_abilities() {
        let settings = EnemySettings {
            special_ability_cooldown: 0.0,
            ..EnemySettings::default()
        };
        let scene = Scene::with_player_at(Vec3::new(0.0, 0.0, 1.0));
        let mut enemy = scene.enemy_with(Vec3::ZERO, settings, 0.0);
        run(&mut enemy, 10);
        assert_eq!(enemy.active_ability(), None);
    }

    #[test]
    fn test_defensive_stance_halves_damage() {
        let scene = Scene::with_player_at(Vec3::new(0.0, 0.0, 1.0));
        let mut enemy = scene.enemy_with(Vec3::ZERO, classed(EnemyClass::Guard, 0.5), 0.1);
        run(&mut enemy, 8);
        assert_eq!(enemy.active_ability(), Some(SpecialAbility::DefensiveStance));

        scene.hit(&enemy, 20.0);
        run(&mut enemy, 1);
        assert_eq!(enemy.health(), 90.0);
    }

    #[test]
    fn test_berserk_speeds_up_movement_and_attacks() {
        let scene = Scene::with_player_at(Vec3::new(0.0, 0.0, 8.0));
        let mut enemy = scene.enemy_with(Vec3::ZERO, classed(EnemyClass::Marauder, 0.5), 0.1);
        run(&mut enemy, 8);
        assert_eq!(enemy.active_ability(), Some(SpecialAbility::Berserk));

        let agent = enemy.agent();
        assert!((agent.nav.speed() - agent.base_speed * 1.8).abs() < 1e-4);
        assert!((agent.attack_rate() - agent.settings.attack_rate * 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_archer_rapid_shot_fires_three_projectiles() {
        let scene = Scene::with_player_at(Vec3::new(0.0, 0.0, 1.0));
        let shots = scene.record(EventKind::ProjectileFired);
        let mut enemy = scene.enemy_with(Vec3::ZERO, classed(EnemyClass::Archer, 3.0), 0.1);
        run(&mut enemy, 45);

        let shots = shots.borrow();
        assert_eq!(shots.len(), 3);
        assert!(shots.iter().all(|shot| matches!(
            shot,
            GameEvent::ProjectileFired { damage, speed, .. }
                if (*damage - 5.6).abs() < 1e-4 && *speed == 30.0
        )));
    }

    #[test]
    fn test_wild_roar_rallies_allies() {
        let scene = Scene::with_player_at(Vec3::new(0.0, 0.0, 1.0));
        let help = scene.record(EventKind::EnemyHelpCall);
        let mut enemy = scene.enemy_with(Vec3::ZERO, classed(EnemyClass::Beast, 1.0), 0.1);
        run(&mut enemy, 20);
        // One call on sight, one from the roar
        assert_eq!(help.borrow().len(), 2);
    }

    #[test]
    fn test_chase_flees_only_when_wounded_and_roll_succeeds() {
        let cases = [
            // (health, roll, flees)
            (50.0, 0.0, false),
            (20.0, 0.9, false),
            (20.0, 0.1, true),
        ];
        for (health, roll, flees) in cases {
            let scene = Scene::with_player_at(Vec3::new(0.0, 0.0, 8.0));
            let mut enemy = scene.enemy_with(Vec3::ZERO, EnemySettings::default(), roll);
            run(&mut enemy, 1);
            assert!(enemy.is_in_state(EnemyStateKind::Chase));

            enemy.agent_mut().health = health;
            run(&mut enemy, 1);
            assert_eq!(
                enemy.is_in_state(EnemyStateKind::Flee),
                flees,
                "health {health}, roll {roll}"
            );
        }
    }

    #[test]
    fn test_damage_turns_enemy_on_attacker() {
        // Behind the enemy, so it has not seen the player
        let scene = Scene::with_player_at(Vec3::new(0.0, 0.0, -4.0));
        let help = scene.record(EventKind::EnemyHelpCall);
        let mut enemy = scene.enemy(Vec3::ZERO);

        scene.hit(&enemy, 10.0);
        run(&mut enemy, 1);
        assert_eq!(enemy.health(), 90.0);
        assert_eq!(enemy.target(), Some(scene.player));
        assert_eq!(enemy.current_state(), Some(EnemyStateKind::Chase));
        // Knocked back along the hit direction
        assert!(enemy.position().z < 0.0);

        scene.hit(&enemy, 10.0);
        run(&mut enemy, 1);
        assert_eq!(help.borrow().len(), 1);
    }

    #[test]
    fn test_heavy_damage_makes_enemy_flee() {
        let scene = Scene::with_player_at(Vec3::new(0.0, 0.0, 5.0));
        let mut enemy = scene.enemy(Vec3::ZERO);
        run(&mut enemy, 1);

        scene.hit(&enemy, 75.0);
        run(&mut enemy, 1);
        assert_eq!(enemy.current_state(), Some(EnemyStateKind::Flee));
        let destination = enemy.agent().nav.destination().unwrap();
        assert!(destination.z < -10.0, "fleeing toward {destination}");
    }

    #[test]
    fn test_flee_ends_when_safe() {
        let scene = Scene::with_player_at(Vec3::new(0.0, 0.0, 5.0));
        let mut enemy = scene.enemy(Vec3::ZERO);
        run(&mut enemy, 1);
        scene.hit(&enemy, 75.0);
        run(&mut enemy, 1);

        // chase_speed 5 × 1.2 covers the 8 units needed in well under the time limit
        assert!(run_until(&mut enemy, EnemyStateKind::Idle, 40));
        assert!(enemy.position().distance(Vec3::new(0.0, 0.0, 5.0)) > 8.0);
    }

    #[test]
    fn test_death_is_terminal_and_despawns() {
        let scene = Scene::with_player_at(Vec3::new(0.0, 0.0, 5.0));
        let deaths = scene.record(EventKind::EnemyDied);
        let mut enemy = scene.enemy(Vec3::ZERO);

        scene.hit(&enemy, 150.0);
        run(&mut enemy, 1);
        assert!(enemy.is_dead());
        assert_eq!(enemy.current_state(), Some(EnemyStateKind::Death));
        assert_eq!(deaths.borrow().len(), 1);
        assert!(!enemy.agent().nav.is_enabled());

        scene.hit(&enemy, 10.0);
        scene.bus.publish(&GameEvent::SoundEmitted {
            position: Vec3::X,
            intensity: 1.0,
            source: None,
        });
        run(&mut enemy, 20);
        assert_eq!(enemy.current_state(), Some(EnemyStateKind::Death));
        assert_eq!(deaths.borrow().len(), 1);
        assert!(!enemy.is_despawn_ready());

        run(&mut enemy, 15);
        assert!(enemy.is_despawn_ready());
    }

    #[test]
    fn test_help_call_recruits_idle_ally() {
        let scene = Scene::with_player_at(Vec3::new(0.0, 0.0, 5.0));
        let help = scene.record(EventKind::EnemyHelpCall);
        let mut caller = scene.enemy(Vec3::ZERO);
        // Too far to see the player itself
        let mut ally = scene.enemy(Vec3::new(12.0, 0.0, 0.0));

        run(&mut caller, 1);
        run(&mut ally, 1);
        assert_eq!(ally.current_state(), Some(EnemyStateKind::Chase));
        assert_eq!(ally.target(), Some(scene.player));

        run(&mut ally, 5);
        assert_eq!(ally.target(), Some(scene.player));
        assert_eq!(help.borrow().len(), 1);
    }

    #[test]
    fn test_help_call_out_of_range_is_ignored() {
        let scene = Scene::with_player_at(Vec3::new(0.0, 0.0, 5.0));
        let mut caller = scene.enemy(Vec3::ZERO);
        let mut ally = scene.enemy(Vec3::new(30.0, 0.0, 0.0));

        run(&mut caller, 1);
        run(&mut ally, 1);
        assert_eq!(ally.current_state(), Some(EnemyStateKind::Idle));
    }

    #[test]
    fn test_loud_sound_triggers_investigation() {
        let scene = Scene::with_player_at(Vec3::new(50.0, 0.0, 50.0));
        let mut enemy = scene.enemy(Vec3::ZERO);

        scene.bus.publish(&GameEvent::SoundEmitted {
            position: Vec3::new(12.0, 0.0, 0.0),
            intensity: 0.2,
            source: None,
        });
        run(&mut enemy, 1);
        assert_eq!(enemy.current_state(), Some(EnemyStateKind::Idle));

        let noise = Vec3::new(-6.0, 0.0, 6.0);
        scene.bus.publish(&GameEvent::SoundEmitted {
            position: noise,
            intensity: 0.9,
            source: None,
        });
        run(&mut enemy, 1);
        assert_eq!(enemy.current_state(), Some(EnemyStateKind::Investigate));
        assert_eq!(enemy.agent().nav.destination(), Some(noise));
    }

    #[test]
    fn test_lost_target_is_tracked_to_last_known_position() {
        let start = Vec3::new(0.0, 0.0, 6.0);
        let scene = Scene::with_player_at(start);
        let mut enemy = scene.enemy(Vec3::ZERO);
        run(&mut enemy, 1);
        assert!(enemy.is_in_state(EnemyStateKind::Chase));

        scene.physics.remove(scene.player);
        run(&mut enemy, 1);
        assert_eq!(enemy.target(), None);
        assert_eq!(enemy.current_state(), Some(EnemyStateKind::Chase));
        assert_eq!(enemy.agent().perception.last_known, Some(start));

        assert!(run_until(&mut enemy, EnemyStateKind::Investigate, 30));
    }

    #[test]
    fn test_patrol_cycles_waypoints() {
        let scene = Scene::with_player_at(Vec3::new(100.0, 0.0, 100.0));
        let a = Vec3::new(2.0, 0.0, 0.0);
        let b = Vec3::new(2.0, 0.0, 2.0);
        let mut enemy = scene.enemy(Vec3::ZERO).with_waypoints(vec![a, b]);

        // Idle for 2 + 0.9 × 3 seconds
        assert!(run_until(&mut enemy, EnemyStateKind::Patrol, 60));
        assert_eq!(enemy.agent().nav.speed(), enemy.agent().settings.patrol_speed);

        let mut visited: Vec<Vec3> = Vec::new();
        for _ in 0..60 {
            run(&mut enemy, 1);
            let destination = enemy.agent().nav.destination();
            if let Some(point) = destination.filter(|p| visited.last() != Some(p)) {
                visited.push(point);
            }
        }
        assert_eq!(enemy.current_state(), Some(EnemyStateKind::Patrol));
        assert_eq!(&visited[..3], &[a, b, a]);
    }

    #[test]
    fn test_coordinated_chaser_circles_crowded_target() {
        let target = Vec3::new(0.0, 0.0, 8.0);
        let scene = Scene::with_player_at(target);
        for (entity, offset) in entities::<3>().into_iter().zip([
            Vec3::new(0.5, 0.0, 0.0),
            Vec3::new(-0.5, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 0.5),
        ]) {
            scene.physics.add(entity, target + offset, LayerMask::ENEMY);
        }
        let mut enemy = scene.enemy(Vec3::ZERO);
        run(&mut enemy, 1);
        assert!(enemy.is_in_state(EnemyStateKind::Chase));

        enemy.fixed_update(DT);
        let destination = enemy.agent().nav.destination().unwrap();
        assert!(destination.distance(Vec3::new(-3.0, 0.0, 8.0)) < 1e-3, "{destination}");
    }

    #[test]
    fn test_experienced_enemy_dodges_dash() {
        let scene = Scene::with_player_at(Vec3::new(0.0, 0.0, 1.5));
        let mut enemy = scene.enemy(Vec3::ZERO);
        enemy.agent_mut().adaptation.dash_count = 4.0;
        assert!(run_until(&mut enemy, EnemyStateKind::Attack, 5));

        let before = enemy.position();
        scene.bus.publish(&GameEvent::PlayerDashStarted {
            player: scene.player,
            direction: Vec3::NEG_Z,
        });
        run(&mut enemy, 1);
        let moved = enemy.position() - before;
        assert!((moved.x.abs() - 3.5 * 1.5 * DT).abs() < 1e-3, "{moved}");
        assert!(moved.z.abs() < 1e-3);

        scene.bus.publish(&GameEvent::PlayerDashEnded {
            player: scene.player,
        });
        let before = enemy.position();
        run(&mut enemy, 1);
        assert_eq!(enemy.position(), before);
    }

    #[test]
    fn test_guard_halves_damage_after_repeated_hits() {
        let scene = Scene::with_player_at(Vec3::new(0.0, 0.0, 1.5));
        let mut enemy = scene.enemy(Vec3::ZERO);
        enemy.agent_mut().adaptation.attack_count = 6.0;
        assert!(run_until(&mut enemy, EnemyStateKind::Attack, 5));
        assert!(enemy.agent().adaptation.defending);

        scene.hit(&enemy, 20.0);
        run(&mut enemy, 1);
        assert_eq!(enemy.health(), 90.0);
    }

    #[test]
    fn test_forgets_dead_player() {
        let scene = Scene::with_player_at(Vec3::new(0.0, 0.0, 1.5));
        let mut enemy = scene.enemy(Vec3::ZERO);
        assert!(run_until(&mut enemy, EnemyStateKind::Attack, 5));

        scene.bus.publish(&GameEvent::PlayerDied {
            player: scene.player,
            position: Vec3::new(0.0, 0.0, 1.5),
        });
        run(&mut enemy, 1);
        assert_eq!(enemy.target(), None);
        assert_eq!(enemy.current_state(), Some(EnemyStateKind::Idle));
    }

    #[test]
    fn test_detach_on_drop() {
        let scene = Scene::with_player_at(Vec3::ZERO);
        let enemy = scene.enemy(Vec3::ZERO);
        assert_eq!(scene.bus.subscriber_count(EventKind::EnemyDamaged), 1);
        drop(enemy);
        assert_eq!(scene.bus.subscriber_count(EventKind::EnemyDamaged), 0);
    }
}
