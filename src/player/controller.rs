//! Player controller
//!
//! [`PlayerController`] owns the player's [`StateMachine`] and its context,
//! the [`PlayerAgent`]. Input and incoming enemy attacks reach it through the
//! event bus: a forwarder copies them into the controller's mailbox, which is
//! drained at the start of every [`update`](PlayerController::update).

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use glam::{Quat, Vec2, Vec3};
use hecs::Entity;

use crate::audio::AudioService;
use crate::core::{
    EventBus, EventHandler, EventKind, EventQueue, FsmError, GameEvent, RandomSource, StateMachine,
};
use crate::physics::{LayerMask, PhysicsQueries};

use super::combat::{ComboTracker, DashTracker};
use super::health::{DamageOutcome, PlayerHealth};
use super::motor::CharacterMotor;
use super::settings::{CombatSettings, MovementSettings, WeaponData};
use super::states::{
    AttackState, CrouchState, DashState, FallState, IdleState, JumpState, ParryState, RunState,
    WalkState,
};

/// World gravity (units/s²)
pub const GRAVITY: f32 = -9.81;

/// Vertical velocity kept while grounded so the motor stays in contact
const GROUNDED_VELOCITY: f32 = -2.0;

/// Key of each player state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerStateKind {
    Idle,
    Walk,
    Run,
    Jump,
    Fall,
    Crouch,
    Attack,
    Dash,
    Parry,
}

/// Latest decoded input.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerInput {
    /// Stick / WASD (x = strafe, y = forward)
    pub movement: Vec2,
    pub look: Vec2,
    pub jump: bool,
    pub sprint: bool,
    pub crouch: bool,
    pub attack: bool,
    pub aim: bool,
    pub dash: bool,
    pub parry: bool,
    pub interact: bool,
}

impl PlayerInput {
    /// Stick magnitude below which the player counts as standing still
    pub const DEADZONE: f32 = 0.1;

    #[must_use]
    pub fn is_moving(&self) -> bool {
        self.movement.length() > Self::DEADZONE
    }

    /// World-space movement direction, at most unit length
    #[must_use]
    pub fn move_direction(&self) -> Vec3 {
        Vec3::new(self.movement.x, 0.0, self.movement.y).clamp_length_max(1.0)
    }
}

/// Collaborators handed to a new player.
pub struct PlayerServices {
    pub physics: Rc<dyn PhysicsQueries>,
    pub bus: Rc<EventBus>,
    pub audio: Rc<dyn AudioService>,
    pub rng: Box<dyn RandomSource>,
}

/// Everything the player states read and mutate.
pub struct PlayerAgent {
    pub entity: Entity,
    pub movement: Rc<MovementSettings>,
    pub combat: Rc<CombatSettings>,
    /// Equipped weapon, overriding the unarmed combat values
    pub weapon: Option<Rc<WeaponData>>,
    pub motor: Box<dyn CharacterMotor>,
    pub physics: Rc<dyn PhysicsQueries>,
    pub bus: Rc<EventBus>,
    pub audio: Rc<dyn AudioService>,
    pub rng: Box<dyn RandomSource>,
    pub input: PlayerInput,
    /// Yaw-only orientation; forward is +Z
    pub facing: Quat,
    pub velocity: Vec3,
    pub combo: ComboTracker,
    pub dash: DashTracker,
    pub attack_cooldown: f32,
    pub parry_cooldown: f32,
    pub health: PlayerHealth,
    /// Frame delta of the current update
    pub dt: f32,
    /// Step of the current fixed update
    pub fixed_dt: f32,
}

impl PlayerAgent {
    pub fn new(
        entity: Entity,
        movement: Rc<MovementSettings>,
        combat: Rc<CombatSettings>,
        motor: Box<dyn CharacterMotor>,
        services: PlayerServices,
    ) -> Self {
        let health = PlayerHealth::new(combat.max_health);
        Self {
            entity,
            movement,
            combat,
            weapon: None,
            motor,
            physics: services.physics,
            bus: services.bus,
            audio: services.audio,
            rng: services.rng,
            input: PlayerInput::default(),
            facing: Quat::IDENTITY,
            velocity: Vec3::ZERO,
            combo: ComboTracker::default(),
            dash: DashTracker::default(),
            attack_cooldown: 0.0,
            parry_cooldown: 0.0,
            health,
            dt: 0.0,
            fixed_dt: crate::core::Time::DEFAULT_FIXED_DELTA,
        }
    }

    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.motor.position()
    }

    #[must_use]
    pub fn forward(&self) -> Vec3 {
        self.facing * Vec3::Z
    }

    #[must_use]
    pub fn is_grounded(&self) -> bool {
        self.motor.is_grounded()
    }

    /// Idle, Walk or Run, from the movement and sprint input
    #[must_use]
    pub fn locomotion_state(&self) -> PlayerStateKind {
        match (self.input.is_moving(), self.input.sprint) {
            (false, _) => PlayerStateKind::Idle,
            (true, true) => PlayerStateKind::Run,
            (true, false) => PlayerStateKind::Walk,
        }
    }

    /// Locomotion state when grounded, Fall otherwise
    #[must_use]
    pub fn settle_state(&self) -> PlayerStateKind {
        if self.is_grounded() {
            self.locomotion_state()
        } else {
            PlayerStateKind::Fall
        }
    }

    /// Accumulate gravity while airborne; keep a small downward push when grounded.
    ///
    /// Falling speed is unbounded unless `max_fall_speed` is set.
    pub fn apply_gravity(&mut self, dt: f32) {
        if !self.is_grounded() {
            self.velocity.y += GRAVITY * self.movement.gravity_multiplier * dt;
            if let Some(limit) = self.movement.max_fall_speed {
                self.velocity.y = self.velocity.y.max(-limit);
            }
        } else if self.velocity.y < 0.0 {
            self.velocity.y = GROUNDED_VELOCITY;
        }
    }

    /// Turn toward `direction` at the configured rotation speed.
    pub fn face_towards(&mut self, direction: Vec3, dt: f32) {
        if direction.x == 0.0 && direction.z == 0.0 {
            return;
        }
        let target = Quat::from_rotation_y(direction.x.atan2(direction.z));
        let t = (self.movement.rotation_speed * dt).clamp(0.0, 1.0);
        self.facing = self.facing.slerp(target, t).normalize();
    }

    #[must_use]
    pub fn max_combo(&self) -> usize {
        self.weapon
            .as_ref()
            .map_or(self.combat.max_combo_count, |w| w.max_combo_count)
            .max(1)
    }

    /// `(hit delay, swing duration)` scaled by the weapon's swing speed
    #[must_use]
    pub fn swing_timing(&self) -> (f32, f32) {
        let speed = self
            .weapon
            .as_ref()
            .map_or(1.0, |w| w.attack_speed_multiplier)
            .max(0.01);
        (
            self.combat.attack_delay / speed,
            self.combat.attack_duration / speed,
        )
    }

    #[must_use]
    pub fn attack_range(&self) -> f32 {
        self.weapon
            .as_ref()
            .map_or(self.combat.attack_range, |w| w.attack_range)
    }

    /// Full attack cone angle in degrees
    #[must_use]
    pub fn attack_angle(&self) -> f32 {
        self.weapon
            .as_ref()
            .map_or(self.combat.attack_angle, |w| w.attack_angle)
    }

    #[must_use]
    pub fn target_layers(&self) -> LayerMask {
        match &self.weapon {
            Some(w) if w.target_layers != LayerMask::NONE => w.target_layers,
            _ => self.combat.target_layers,
        }
    }

    /// Damage of combo step `index` and whether it was a critical hit
    pub fn roll_damage(&mut self, index: usize) -> (f32, bool) {
        match &self.weapon {
            Some(weapon) => {
                let (damage, critical) = weapon.calculate_damage(index, self.rng.as_mut());
                (damage + weapon.elemental_bonus(), critical)
            }
            None => (self.combat.calculate_damage(index), false),
        }
    }

    /// Swing sound: the clip matching the combo step, else a random one
    pub fn attack_sound(&mut self, index: usize) -> Option<String> {
        let clips = match &self.weapon {
            Some(w) if !w.attack_sounds.is_empty() => &w.attack_sounds,
            _ => &self.combat.attack_sounds,
        };
        clips
            .get(index)
            .or_else(|| pick(clips, self.rng.as_mut()))
            .cloned()
    }

    /// Random impact sound
    pub fn hit_sound(&mut self) -> Option<String> {
        let clips = match &self.weapon {
            Some(w) if !w.hit_sounds.is_empty() => &w.hit_sounds,
            _ => &self.combat.hit_sounds,
        };
        pick(clips, self.rng.as_mut()).cloned()
    }
}

fn pick<'a>(clips: &'a [String], rng: &mut dyn RandomSource) -> Option<&'a String> {
    if clips.is_empty() {
        return None;
    }
    let index = (rng.value() * clips.len() as f32) as usize;
    clips.get(index.min(clips.len() - 1))
}

/// Events the player's mailbox accepts
fn accepts(player: Entity, event: &GameEvent) -> bool {
    match event {
        GameEvent::EnemyAttack { target, .. } | GameEvent::EnemyRangedAttack { target, .. } => {
            *target == player
        }
        other => EventKind::INPUTS.contains(&other.kind()),
    }
}

const SUBSCRIPTIONS: [EventKind; 12] = [
    EventKind::MovementInput,
    EventKind::LookInput,
    EventKind::JumpInput,
    EventKind::SprintInput,
    EventKind::CrouchInput,
    EventKind::AttackInput,
    EventKind::AimInput,
    EventKind::DashInput,
    EventKind::ParryInput,
    EventKind::InteractInput,
    EventKind::EnemyAttack,
    EventKind::EnemyRangedAttack,
];

/// Drives one player character.
pub struct PlayerController {
    agent: PlayerAgent,
    machine: StateMachine<PlayerStateKind, PlayerAgent>,
    mailbox: Rc<RefCell<EventQueue>>,
    inbox: EventHandler,
    weapons: Vec<Rc<WeaponData>>,
    weapon_index: Option<usize>,
}

impl PlayerController {
    /// Build the state set, enter Idle and subscribe to the bus.
    ///
    /// # Errors
    ///
    /// Returns an error if the state machine cannot be initialized
    pub fn new(
        entity: Entity,
        movement: Rc<MovementSettings>,
        combat: Rc<CombatSettings>,
        motor: Box<dyn CharacterMotor>,
        services: PlayerServices,
    ) -> Result<Self, FsmError<PlayerStateKind>> {
        let mut agent = PlayerAgent::new(entity, movement, combat, motor, services);

        let mut machine = StateMachine::new(format!("player {entity:?}"));
        machine.add_state(IdleState::default())?;
        machine.add_state(WalkState::default())?;
        machine.add_state(RunState::default())?;
        machine.add_state(JumpState::default())?;
        machine.add_state(FallState::default())?;
        machine.add_state(CrouchState::default())?;
        machine.add_state(AttackState::default())?;
        machine.add_state(DashState)?;
        machine.add_state(ParryState::default())?;
        machine.initialize(PlayerStateKind::Idle, &mut agent)?;

        let mailbox = Rc::new(RefCell::new(EventQueue::new()));
        let inbox = EventQueue::forwarder(&mailbox, move |event| accepts(entity, event));

        let controller = Self {
            agent,
            machine,
            mailbox,
            inbox,
            weapons: Vec::new(),
            weapon_index: None,
        };
        controller.attach();
        Ok(controller)
    }

    /// Provide the weapon list and equip the first entry.
    #[must_use]
    pub fn with_weapons(mut self, weapons: impl IntoIterator<Item = WeaponData>) -> Self {
        self.weapons = weapons.into_iter().map(Rc::new).collect();
        if !self.weapons.is_empty() {
            self.equip_weapon(0);
        }
        self
    }

    /// Subscribe to the bus. Call again after [`EventBus::reset`].
    ///
    /// Returns the number of new subscriptions.
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

    /// Per-frame update.
    pub fn update(&mut self, dt: f32) {
        if self.agent.health.is_dead() {
            return;
        }
        self.agent.dt = dt;
        self.process_events();
        if self.agent.health.is_dead() {
            return;
        }

        if self.agent.input.is_moving() && !self.agent.dash.is_dashing() {
            let direction = self.agent.input.move_direction();
            self.agent.face_towards(direction, dt);
        }

        self.machine.update(&mut self.agent);

        let agent = &mut self.agent;
        agent.combo.tick(dt);
        agent.attack_cooldown = (agent.attack_cooldown - dt).max(0.0);
        agent.parry_cooldown = (agent.parry_cooldown - dt).max(0.0);
        if agent.dash.tick(dt, agent.movement.dash_cooldown) {
            agent.bus.publish(&GameEvent::PlayerDashEnded {
                player: agent.entity,
            });
            log::trace!("Dash finished, cooldown {:.2}s", agent.movement.dash_cooldown);
        }
    }

    /// Fixed-step update: gravity first, then the state's movement.
    pub fn fixed_update(&mut self, fixed_dt: f32) {
        if self.agent.health.is_dead() {
            return;
        }
        self.agent.fixed_dt = fixed_dt;
        self.agent.apply_gravity(fixed_dt);
        self.machine.fixed_update(&mut self.agent);
    }

    fn process_events(&mut self) {
        let events: Vec<GameEvent> = self.mailbox.borrow_mut().drain().collect();
        for event in events {
            if self.agent.health.is_dead() {
                break;
            }
            self.handle_event(event);
        }
    }

    fn handle_event(&mut self, event: GameEvent) {
        let input = &mut self.agent.input;
        match event {
            GameEvent::MovementInput { direction } => input.movement = direction,
            GameEvent::LookInput { delta } => input.look = delta,
            GameEvent::JumpInput { pressed } => input.jump = pressed,
            GameEvent::SprintInput { pressed } => input.sprint = pressed,
            GameEvent::CrouchInput { pressed } => input.crouch = pressed,
            GameEvent::AimInput { pressed } => input.aim = pressed,
            GameEvent::InteractInput { pressed } => input.interact = pressed,
            GameEvent::AttackInput { pressed } => {
                input.attack = pressed;
                if pressed {
                    self.request_attack();
                }
            }
            GameEvent::DashInput { pressed } => {
                input.dash = pressed;
                if pressed {
                    self.request_dash();
                }
            }
            GameEvent::ParryInput { pressed } => {
                input.parry = pressed;
                if pressed {
                    self.request_parry();
                }
            }
            GameEvent::EnemyAttack { power, .. } | GameEvent::EnemyRangedAttack { power, .. } => {
                self.take_damage(power);
            }
            _ => {}
        }
    }

    /// Start (or buffer) an attack. Returns `false` if the press was dropped.
    pub fn request_attack(&mut self) -> bool {
        if self.agent.health.is_dead() {
            return false;
        }
        if self.machine.is_in_state(PlayerStateKind::Attack) {
            if self.agent.combo.window_open() {
                self.agent.combo.requested = true;
                return true;
            }
            return false;
        }
        if self.agent.attack_cooldown > 0.0 {
            log::trace!("Attack on cooldown");
            return false;
        }
        self.machine
            .change_state(PlayerStateKind::Attack, &mut self.agent)
            .is_ok()
    }

    /// Start a dash if none is running and the cooldown has elapsed.
    pub fn request_dash(&mut self) -> bool {
        if self.agent.health.is_dead() || !self.agent.dash.can_start() {
            return false;
        }
        self.machine
            .change_state(PlayerStateKind::Dash, &mut self.agent)
            .is_ok()
    }

    /// Start a parry if the cooldown has elapsed.
    pub fn request_parry(&mut self) -> bool {
        if self.agent.health.is_dead()
            || self.agent.parry_cooldown > 0.0
            || self.machine.is_in_state(PlayerStateKind::Parry)
        {
            return false;
        }
        self.machine
            .change_state(PlayerStateKind::Parry, &mut self.agent)
            .is_ok()
    }

    /// Apply incoming damage, reduced while dashing.
    pub fn take_damage(&mut self, amount: f32) -> DamageOutcome {
        let agent = &mut self.agent;
        let amount = if agent.dash.is_dashing() {
            amount * (1.0 - agent.movement.dash_damage_reduction).clamp(0.0, 1.0)
        } else {
            amount
        };

        let outcome = agent.health.take_damage(amount);
        let player = agent.entity;
        match outcome {
            DamageOutcome::Ignored => {}
            DamageOutcome::Hurt { remaining } => {
                agent.bus.publish(&GameEvent::PlayerDamaged {
                    player,
                    amount,
                    remaining,
                });
                if let Some(clip) = &agent.combat.hurt_sound {
                    agent.audio.play(clip, Some(agent.motor.position()));
                }
            }
            DamageOutcome::Died => {
                let position = agent.motor.position();
                agent.bus.publish(&GameEvent::PlayerDamaged {
                    player,
                    amount,
                    remaining: 0.0,
                });
                if let Some(clip) = &agent.combat.death_sound {
                    agent.audio.play(clip, Some(position));
                }
                log::info!("Player {player:?} died at {position}");
                agent.bus.publish(&GameEvent::PlayerDied { player, position });
            }
        }
        outcome
    }

    /// Restore health. Returns the new value.
    pub fn heal(&mut self, amount: f32) -> f32 {
        self.agent.health.heal(amount)
    }

    /// Equip weapon `index` from the list. Out-of-range indices are refused.
    pub fn equip_weapon(&mut self, index: usize) -> bool {
        let Some(weapon) = self.weapons.get(index) else {
            log::warn!(
                "Weapon index {index} out of range ({} weapons)",
                self.weapons.len()
            );
            return false;
        };
        log::debug!("Equipped {}", weapon.name);
        self.agent.weapon = Some(Rc::clone(weapon));
        self.agent.combo = ComboTracker::default();
        self.weapon_index = Some(index);
        true
    }

    /// Move `step` entries through the weapon list, wrapping around.
    pub fn cycle_weapon(&mut self, step: isize) -> bool {
        let count = self.weapons.len();
        if count == 0 {
            return false;
        }
        let current = self.weapon_index.unwrap_or(0) as isize;
        let next = (current + step).rem_euclid(count as isize) as usize;
        self.equip_weapon(next)
    }

    /// Fight unarmed.
    pub fn unequip_weapon(&mut self) {
        self.agent.weapon = None;
        self.weapon_index = None;
    }

    #[must_use]
    pub fn equipped_weapon(&self) -> Option<&WeaponData> {
        self.agent.weapon.as_deref()
    }

    #[must_use]
    pub fn weapon_index(&self) -> Option<usize> {
        self.weapon_index
    }

    #[must_use]
    pub fn entity(&self) -> Entity {
        self.agent.entity
    }

    #[must_use]
    pub fn current_state(&self) -> Option<PlayerStateKind> {
        self.machine.current()
    }

    #[must_use]
    pub fn is_in_state(&self, kind: PlayerStateKind) -> bool {
        self.machine.is_in_state(kind)
    }

    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.agent.position()
    }

    #[must_use]
    pub fn health(&self) -> &PlayerHealth {
        &self.agent.health
    }

    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.agent.health.is_dead()
    }

    #[must_use]
    pub fn is_dashing(&self) -> bool {
        self.agent.dash.is_dashing()
    }

    #[must_use]
    pub fn agent(&self) -> &PlayerAgent {
        &self.agent
    }

    pub fn agent_mut(&mut self) -> &mut PlayerAgent {
        &mut self.agent
    }
}

impl Drop for PlayerController {
    fn drop(&mut self) {
        self.detach();
    }
}

impl fmt::Debug for PlayerController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayerController")
            .field("entity", &self.agent.entity)
            .field("state", &self.machine.current())
            .field("health", &self.agent.health.current())
            .field("position", &self.agent.position())
            .finish()
    }
}
