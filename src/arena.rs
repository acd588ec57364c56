//! Headless arena
//!
//! [`Arena`] plays the part of the engine for a session without a window: it
//! owns the event bus, the rapier-backed query world and the hecs world,
//! spawns the player and enemies, and steps every controller on a fixed
//! accumulator followed by the frame update.
//!
//! Projectiles fired by enemies live in the hecs world and are flown on the
//! fixed step. An optional [`Spawner`] keeps the arena stocked with enemies.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use glam::Vec3;
use hecs::Entity;

use crate::ai::enemy::{
    EnemyClass, EnemyController, EnemyServices, EnemySettings, EnemyStateKind,
};
use crate::ai::{GridNavigator, NavGrid};
use crate::audio::{AudioService, LogAudio};
use crate::config::GameConfig;
use crate::core::{
    EventBus, EventHandler, EventKind, EventQueue, FastRandom, FsmError, GameEvent, RandomSource,
    Time,
};
use crate::physics::{Flight, LayerMask, PhysicsQueries, PhysicsWorld, Projectile};
use crate::player::{
    CombatSettings, GroundMotor, MovementSettings, PlayerController, PlayerServices,
    PlayerStateKind,
};

// ============================================================================
// Components
// ============================================================================

/// Display name of an arena entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name(pub String);

impl Name {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

/// Side an arena entity fights for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Faction {
    Player,
    Enemy,
}

// ============================================================================
// Configuration
// ============================================================================

/// Arena configuration
#[derive(Debug, Clone)]
pub struct ArenaConfig {
    /// Tuning records for the player, enemies and weapons
    pub game: GameConfig,
    /// Fixed (physics) step in seconds
    pub fixed_delta: f32,
    /// Collider radius of every actor
    pub actor_radius: f32,
    /// Navigation grid cells along X and Z
    pub grid_size: (usize, usize),
    /// Navigation grid cell size in world units
    pub cell_size: f32,
    /// Static boxes as (center, half extents); they block sight and paths
    pub obstacles: Vec<(Vec3, Vec3)>,
    /// Seed for every random source, `None` for entropy
    pub seed: Option<u64>,
    /// Periodic enemy spawning, off when `None`
    pub spawner: Option<SpawnerSettings>,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            game: GameConfig::default(),
            fixed_delta: Time::DEFAULT_FIXED_DELTA,
            actor_radius: 0.5,
            grid_size: (60, 60),
            cell_size: 1.0,
            obstacles: Vec::new(),
            seed: None,
            spawner: None,
        }
    }
}

impl ArenaConfig {
    /// Use these tuning records
    #[must_use]
    pub fn with_game(mut self, game: GameConfig) -> Self {
        self.game = game;
        self
    }

    /// Set the fixed step
    #[must_use]
    pub fn with_fixed_delta(mut self, fixed_delta: f32) -> Self {
        self.fixed_delta = fixed_delta;
        self
    }

    /// Set the navigation grid dimensions
    #[must_use]
    pub fn with_grid(mut self, width: usize, depth: usize, cell_size: f32) -> Self {
        self.grid_size = (width, depth);
        self.cell_size = cell_size;
        self
    }

    /// Add a static box
    #[must_use]
    pub fn with_obstacle(mut self, center: Vec3, half_extents: Vec3) -> Self {
        self.obstacles.push((center, half_extents));
        self
    }

    /// Make every random roll reproducible
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Spawn enemies periodically
    #[must_use]
    pub fn with_spawner(mut self, spawner: SpawnerSettings) -> Self {
        self.spawner = Some(spawner);
        self
    }
}

// ============================================================================
// Spawner
// ============================================================================

/// Spawner configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnerSettings {
    /// Candidate positions, one picked at random per spawn
    pub spawn_points: Vec<Vec3>,
    /// Live enemies the spawner keeps at most
    pub max_enemies: usize,
    /// Seconds between spawn attempts
    pub spawn_interval: f32,
    /// Start spawning with the first frame
    pub auto_start: bool,
    /// Classes handed out in turn; empty spawns classless enemies
    pub classes: Vec<EnemyClass>,
    /// Patrol route of every spawned enemy
    pub waypoints: Vec<Vec3>,
}

impl Default for SpawnerSettings {
    fn default() -> Self {
        Self {
            spawn_points: Vec::new(),
            max_enemies: 5,
            spawn_interval: 5.0,
            auto_start: true,
            classes: Vec::new(),
            waypoints: Vec::new(),
        }
    }
}

impl SpawnerSettings {
    #[must_use]
    pub fn new(spawn_points: Vec<Vec3>) -> Self {
        Self {
            spawn_points,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_max_enemies(mut self, max_enemies: usize) -> Self {
        self.max_enemies = max_enemies;
        self
    }

    #[must_use]
    pub fn with_interval(mut self, spawn_interval: f32) -> Self {
        self.spawn_interval = spawn_interval;
        self
    }

    #[must_use]
    pub fn with_classes(mut self, classes: Vec<EnemyClass>) -> Self {
        self.classes = classes;
        self
    }

    /// Wait for [`Spawner::start`] instead of spawning right away
    #[must_use]
    pub fn manual(mut self) -> Self {
        self.auto_start = false;
        self
    }
}

/// Keeps up to `max_enemies` spawned enemies alive, trying once per interval.
///
/// A death frees the slot; the next attempt fills it.
#[derive(Debug, Clone)]
pub struct Spawner {
    settings: SpawnerSettings,
    active: Vec<Entity>,
    timer: f32,
    running: bool,
    next_class: usize,
}

impl Spawner {
    #[must_use]
    pub fn new(settings: SpawnerSettings) -> Self {
        Self {
            running: settings.auto_start,
            settings,
            active: Vec::new(),
            timer: 0.0,
            next_class: 0,
        }
    }

    /// Resume spawning; the first attempt is on the next frame.
    pub fn start(&mut self) {
        if !self.running {
            self.running = true;
            self.timer = 0.0;
            log::info!("Spawner started");
        }
    }

    pub fn stop(&mut self) {
        if self.running {
            self.running = false;
            log::info!("Spawner stopped with {} active", self.active.len());
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Enemies spawned here that are still alive
    #[must_use]
    pub fn active(&self) -> &[Entity] {
        &self.active
    }

    #[must_use]
    pub fn settings(&self) -> &SpawnerSettings {
        &self.settings
    }

    /// Advance by `dt`. Returns `true` when an enemy should spawn now.
    pub fn tick(&mut self, dt: f32) -> bool {
        if !self.running {
            return false;
        }
        self.timer -= dt;
        if self.timer > 0.0 {
            return false;
        }
        self.timer = self.settings.spawn_interval.max(0.0);
        self.active.len() < self.settings.max_enemies
    }

    pub fn track(&mut self, entity: Entity) {
        self.active.push(entity);
    }

    /// Free the slot of a dead enemy. Returns `false` if it was not ours.
    pub fn on_enemy_died(&mut self, entity: Entity) -> bool {
        let before = self.active.len();
        self.active.retain(|e| *e != entity);
        before != self.active.len()
    }

    /// Class for the next enemy
    pub fn next_class(&mut self) -> Option<EnemyClass> {
        if self.settings.classes.is_empty() {
            return None;
        }
        let class = self.settings.classes[self.next_class % self.settings.classes.len()];
        self.next_class += 1;
        Some(class)
    }

    /// Random spawn point
    pub fn pick_point(&self, rng: &mut dyn RandomSource) -> Option<Vec3> {
        let points = &self.settings.spawn_points;
        if points.is_empty() {
            log::warn!("Spawner has no spawn points");
            return None;
        }
        let index = ((rng.value() * points.len() as f32) as usize).min(points.len() - 1);
        Some(points[index])
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Failure to spawn an actor
#[derive(Debug, Clone, PartialEq)]
pub enum ArenaError {
    /// The arena already has a player
    PlayerExists,
    /// The player's state machine failed to start
    Player(FsmError<PlayerStateKind>),
    /// An enemy's state machine failed to start
    Enemy(FsmError<EnemyStateKind>),
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PlayerExists => write!(f, "the arena already has a player"),
            Self::Player(e) => write!(f, "player failed to start: {e}"),
            Self::Enemy(e) => write!(f, "enemy failed to start: {e}"),
        }
    }
}

impl std::error::Error for ArenaError {}

impl From<FsmError<PlayerStateKind>> for ArenaError {
    fn from(e: FsmError<PlayerStateKind>) -> Self {
        Self::Player(e)
    }
}

impl From<FsmError<EnemyStateKind>> for ArenaError {
    fn from(e: FsmError<EnemyStateKind>) -> Self {
        Self::Enemy(e)
    }
}

// ============================================================================
// Arena
// ============================================================================

/// Running totals of a session
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ArenaStats {
    /// Frames stepped
    pub frames: u64,
    /// Fixed steps run
    pub fixed_steps: u64,
    pub enemies_spawned: u32,
    pub enemies_killed: u32,
    pub enemies_despawned: u32,
    /// Enemy hits (melee and ranged) aimed at the player
    pub player_hits: u32,
    pub projectiles_fired: u32,
    /// Projectiles that struck an entity rather than a wall or nothing
    pub projectiles_hit: u32,
    pub player_died: bool,
}

/// Host driver for one session.
pub struct Arena {
    config: ArenaConfig,
    time: Time,
    bus: Rc<EventBus>,
    physics: Rc<RefCell<PhysicsWorld>>,
    world: hecs::World,
    grid: Rc<NavGrid>,
    audio: Rc<LogAudio>,
    movement: Rc<MovementSettings>,
    combat: Rc<CombatSettings>,
    enemy_settings: Rc<EnemySettings>,
    player: Option<PlayerController>,
    enemies: Vec<EnemyController>,
    spawner: Option<Spawner>,
    rng: FastRandom,
    mailbox: Rc<RefCell<EventQueue>>,
    inbox: EventHandler,
    stats: ArenaStats,
    spawned: u64,
}

const WATCHED: [EventKind; 5] = [
    EventKind::EnemyDied,
    EventKind::PlayerDied,
    EventKind::EnemyAttack,
    EventKind::EnemyRangedAttack,
    EventKind::ProjectileFired,
];

/// What a projectile can strike
const PROJECTILE_LAYERS: LayerMask = LayerMask::from_bits(
    LayerMask::PLAYER.bits() | LayerMask::OBSTACLE.bits() | LayerMask::DESTRUCTIBLE.bits(),
);

impl Arena {
    /// Create an empty arena with its obstacles in place.
    pub fn new(config: ArenaConfig) -> Self {
        let (width, depth) = config.grid_size;
        let mut grid = NavGrid::centered(width, depth, config.cell_size);
        let mut physics = PhysicsWorld::new();
        for &(center, half_extents) in &config.obstacles {
            physics.add_obstacle(center, half_extents);
            grid.block_box(center, half_extents);
        }
        physics.sync();

        let bus = Rc::new(EventBus::new());
        let mailbox = Rc::new(RefCell::new(EventQueue::with_capacity(256)));
        let inbox = EventQueue::forwarder(&mailbox, |_| true);
        for kind in WATCHED {
            bus.subscribe(kind, &inbox);
        }

        log::info!(
            "Arena ready: {width}x{depth} grid, {} obstacles",
            config.obstacles.len()
        );

        let rng = match config.seed {
            Some(seed) => FastRandom::with_seed(seed),
            None => FastRandom::default(),
        };
        Self {
            time: Time::new(config.fixed_delta),
            spawner: config.spawner.clone().map(Spawner::new),
            rng,
            movement: Rc::new(config.game.movement.clone()),
            combat: Rc::new(config.game.combat.clone()),
            enemy_settings: Rc::new(config.game.enemy.clone()),
            config,
            bus,
            physics: Rc::new(RefCell::new(physics)),
            world: hecs::World::new(),
            grid: Rc::new(grid),
            audio: Rc::new(LogAudio::new()),
            player: None,
            enemies: Vec::new(),
            mailbox,
            inbox,
            stats: ArenaStats::default(),
            spawned: 0,
        }
    }

    fn next_rng(&mut self) -> Box<dyn RandomSource> {
        self.spawned += 1;
        match self.config.seed {
            Some(seed) => Box::new(FastRandom::with_seed(seed.wrapping_add(self.spawned))),
            None => Box::new(FastRandom::default()),
        }
    }

    fn queries(&self) -> Rc<dyn PhysicsQueries> {
        self.physics.clone()
    }

    fn audio_service(&self) -> Rc<dyn AudioService> {
        self.audio.clone()
    }

    /// Spawn the player at `position`, armed with the configured weapons.
    ///
    /// # Errors
    ///
    /// Returns an error if a player already exists or its state machine
    /// cannot start
    pub fn spawn_player(&mut self, position: Vec3) -> Result<Entity, ArenaError> {
        if self.player.is_some() {
            return Err(ArenaError::PlayerExists);
        }
        let entity = self.world.spawn((Name::new("Player"), Faction::Player));
        let services = PlayerServices {
            physics: self.queries(),
            bus: self.bus.clone(),
            audio: self.audio_service(),
            rng: self.next_rng(),
        };
        let controller = match PlayerController::new(
            entity,
            self.movement.clone(),
            self.combat.clone(),
            Box::new(GroundMotor::new(position, 0.0)),
            services,
        ) {
            Ok(controller) => controller.with_weapons(self.config.game.weapons.clone()),
            Err(e) => {
                let _ = self.world.despawn(entity);
                return Err(e.into());
            }
        };

        self.physics.borrow_mut().add_actor(
            entity,
            controller.position(),
            self.config.actor_radius,
            LayerMask::PLAYER,
        );
        self.player = Some(controller);
        log::info!("Spawned player {entity:?} at {position}");
        Ok(entity)
    }

    /// Spawn an enemy at `position` that patrols `waypoints` (or wanders
    /// when empty).
    ///
    /// # Errors
    ///
    /// Returns an error if the enemy's state machine cannot start
    pub fn spawn_enemy(&mut self, position: Vec3, waypoints: Vec<Vec3>) -> Result<Entity, ArenaError> {
        self.spawn_enemy_as(position, waypoints, None)
    }

    /// [`Arena::spawn_enemy`] with a combat class.
    ///
    /// # Errors
    ///
    /// Returns an error if the enemy's state machine cannot start
    pub fn spawn_enemy_as(
        &mut self,
        position: Vec3,
        waypoints: Vec<Vec3>,
        class: Option<EnemyClass>,
    ) -> Result<Entity, ArenaError> {
        let index = self.stats.enemies_spawned + 1;
        let entity = self
            .world
            .spawn((Name::new(format!("Enemy {index}")), Faction::Enemy));
        let services = EnemyServices {
            physics: self.queries(),
            navigator: Box::new(GridNavigator::new(self.grid.clone())),
            bus: self.bus.clone(),
            audio: self.audio_service(),
            rng: self.next_rng(),
        };
        let controller =
            match EnemyController::new(entity, position, self.enemy_settings.clone(), services) {
                Ok(controller) => match class {
                    Some(class) => controller.with_waypoints(waypoints).with_class(class),
                    None => controller.with_waypoints(waypoints),
                },
                Err(e) => {
                    let _ = self.world.despawn(entity);
                    return Err(e.into());
                }
            };

        self.physics.borrow_mut().add_actor(
            entity,
            position,
            self.config.actor_radius,
            LayerMask::ENEMY,
        );
        self.enemies.push(controller);
        self.stats.enemies_spawned += 1;
        match class {
            Some(class) => log::info!("Spawned {class:?} {entity:?} at {position}"),
            None => log::info!("Spawned enemy {entity:?} at {position}"),
        }
        Ok(entity)
    }

    /// Publish an event on the session bus, e.g. decoded player input.
    pub fn publish(&self, event: &GameEvent) -> usize {
        self.bus.publish(event)
    }

    /// Make a noise enemies may hear.
    pub fn emit_sound(&self, position: Vec3, intensity: f32, source: Option<Entity>) {
        self.bus.publish(&GameEvent::SoundEmitted {
            position,
            intensity: intensity.clamp(0.0, 1.0),
            source,
        });
    }

    /// Advance the session by one frame of `dt` seconds.
    pub fn step(&mut self, dt: f32) {
        self.time.advance(dt);
        let dt = self.time.delta_seconds();
        self.sync_colliders();

        let fixed_dt = self.time.fixed_delta_seconds();
        for _ in 0..self.time.accumulate() {
            if let Some(player) = self.player.as_mut() {
                player.fixed_update(fixed_dt);
            }
            for enemy in &mut self.enemies {
                enemy.fixed_update(fixed_dt);
            }
            self.fly_projectiles(fixed_dt);
            self.stats.fixed_steps += 1;
        }

        if let Some(player) = self.player.as_mut() {
            player.update(dt);
        }
        for enemy in &mut self.enemies {
            enemy.update(dt);
        }

        self.process_events();
        self.despawn_finished();
        self.run_spawner(dt);
        self.stats.frames += 1;
    }

    /// Step `seconds` of simulated time in frames of `dt`.
    pub fn run_for(&mut self, seconds: f32, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        let frames = (seconds / dt).ceil() as u64;
        for _ in 0..frames {
            self.step(dt);
        }
    }

    /// Move every actor's collider to where its controller left it.
    fn sync_colliders(&mut self) {
        let mut physics = self.physics.borrow_mut();
        if let Some(player) = &self.player {
            physics.set_actor_position(player.entity(), player.position());
        }
        for enemy in &self.enemies {
            physics.set_actor_position(enemy.entity(), enemy.position());
        }
        physics.sync();
    }

    fn process_events(&mut self) {
        let events: Vec<GameEvent> = self.mailbox.borrow_mut().drain().collect();
        let player = self.player.as_ref().map(PlayerController::entity);
        for event in events {
            match event {
                GameEvent::EnemyDied { enemy, .. } => {
                    // Corpses are invisible to overlaps but linger until despawn
                    self.physics.borrow_mut().set_actor_enabled(enemy, false);
                    self.stats.enemies_killed += 1;
                    if let Some(spawner) = self.spawner.as_mut() {
                        spawner.on_enemy_died(enemy);
                    }
                }
                GameEvent::PlayerDied { player, .. } => {
                    self.physics.borrow_mut().set_actor_enabled(player, false);
                    self.stats.player_died = true;
                    log::info!("Player {player:?} died after {:.1}s", self.time.elapsed_seconds());
                }
                GameEvent::EnemyAttack { target, .. }
                | GameEvent::EnemyRangedAttack { target, .. } => {
                    if Some(target) == player {
                        self.stats.player_hits += 1;
                    }
                }
                GameEvent::ProjectileFired {
                    owner,
                    target,
                    origin,
                    direction,
                    speed,
                    damage,
                    lifetime,
                } => {
                    let projectile = Projectile::new(owner, origin, direction, speed, lifetime)
                        .with_payload(target, damage);
                    self.world.spawn((Name::new("Projectile"), projectile));
                    self.stats.projectiles_fired += 1;
                }
                _ => {}
            }
        }
    }

    /// Move every projectile one fixed step and report what they struck.
    fn fly_projectiles(&mut self, fixed_dt: f32) {
        let mut finished = Vec::new();
        let mut impacts = Vec::new();
        {
            let physics = self.physics.borrow();
            for (entity, projectile) in self.world.query_mut::<&mut Projectile>() {
                match projectile.fly(&*physics, fixed_dt, PROJECTILE_LAYERS) {
                    Flight::Flying => {}
                    Flight::Expired => finished.push(entity),
                    Flight::Hit(hit) => {
                        finished.push(entity);
                        if let Some(struck) = hit.entity.filter(|e| *e != projectile.owner) {
                            impacts.push(GameEvent::EnemyRangedAttack {
                                attacker: projectile.owner,
                                target: struck,
                                power: projectile.damage,
                                direction: projectile.direction,
                            });
                        }
                    }
                }
            }
        }

        for entity in finished {
            if self.world.despawn(entity).is_err() {
                log::warn!("Projectile {entity:?} was already gone");
            }
        }
        for impact in impacts {
            self.stats.projectiles_hit += 1;
            self.bus.publish(&impact);
        }
    }

    fn run_spawner(&mut self, dt: f32) {
        let Some(spawner) = self.spawner.as_mut() else {
            return;
        };
        if !spawner.tick(dt) {
            return;
        }
        let Some(point) = spawner.pick_point(&mut self.rng) else {
            return;
        };
        let class = spawner.next_class();
        let waypoints = spawner.settings().waypoints.clone();

        match self.spawn_enemy_as(point, waypoints, class) {
            Ok(entity) => {
                if let Some(spawner) = self.spawner.as_mut() {
                    spawner.track(entity);
                    log::debug!("Spawner now tracks {} enemies", spawner.active().len());
                }
            }
            Err(e) => log::error!("Spawner failed: {e}"),
        }
    }

    fn despawn_finished(&mut self) {
        let (gone, alive): (Vec<_>, Vec<_>) = std::mem::take(&mut self.enemies)
            .into_iter()
            .partition(EnemyController::is_despawn_ready);
        self.enemies = alive;

        for enemy in gone {
            let entity = enemy.entity();
            self.physics.borrow_mut().remove_actor(entity);
            if self.world.despawn(entity).is_err() {
                log::warn!("{entity:?} was already gone from the world");
            }
            self.stats.enemies_despawned += 1;
            log::debug!("Despawned {entity:?}");
        }
    }

    #[must_use]
    pub fn bus(&self) -> &Rc<EventBus> {
        &self.bus
    }

    #[must_use]
    pub fn time(&self) -> &Time {
        &self.time
    }

    #[must_use]
    pub fn world(&self) -> &hecs::World {
        &self.world
    }

    #[must_use]
    pub fn physics(&self) -> &Rc<RefCell<PhysicsWorld>> {
        &self.physics
    }

    #[must_use]
    pub fn player(&self) -> Option<&PlayerController> {
        self.player.as_ref()
    }

    pub fn player_mut(&mut self) -> Option<&mut PlayerController> {
        self.player.as_mut()
    }

    #[must_use]
    pub fn enemies(&self) -> &[EnemyController] {
        &self.enemies
    }

    #[must_use]
    pub fn enemy(&self, entity: Entity) -> Option<&EnemyController> {
        self.enemies.iter().find(|e| e.entity() == entity)
    }

    pub fn enemy_mut(&mut self, entity: Entity) -> Option<&mut EnemyController> {
        self.enemies.iter_mut().find(|e| e.entity() == entity)
    }

    /// Display name of a spawned entity
    #[must_use]
    pub fn name_of(&self, entity: Entity) -> Option<String> {
        self.world
            .get::<&Name>(entity)
            .ok()
            .map(|name| name.0.clone())
    }

    #[must_use]
    pub fn spawner(&self) -> Option<&Spawner> {
        self.spawner.as_ref()
    }

    pub fn spawner_mut(&mut self) -> Option<&mut Spawner> {
        self.spawner.as_mut()
    }

    /// Projectiles still in flight
    #[must_use]
    pub fn projectiles(&self) -> usize {
        self.world.query::<&Projectile>().iter().count()
    }

    /// Enemies still standing
    #[must_use]
    pub fn alive_enemies(&self) -> usize {
        self.enemies.iter().filter(|e| !e.is_dead()).count()
    }

    #[must_use]
    pub fn stats(&self) -> ArenaStats {
        self.stats
    }

    /// Clips played through the arena's audio so far
    #[must_use]
    pub fn sounds_played(&self) -> u32 {
        self.audio.played()
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        for kind in WATCHED {
            self.bus.unsubscribe(kind, &self.inbox);
        }
    }
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("elapsed", &self.time.elapsed_seconds())
            .field("player", &self.player)
            .field("enemies", &self.enemies.len())
            .field("stats", &self.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::*;
    use crate::ai::enemy::DeathState;

    const DT: f32 = 0.05;

    fn arena() -> Arena {
        Arena::new(ArenaConfig::default().with_seed(11))
    }

    #[test]
    fn test_spawns_named_actors() {
        let mut arena = arena();
        let player = arena.spawn_player(Vec3::ZERO).unwrap();
        let enemy = arena.spawn_enemy(Vec3::new(0.5, 0.0, 12.5), Vec::new()).unwrap();

        assert_eq!(arena.name_of(player).as_deref(), Some("Player"));
        assert_eq!(arena.name_of(enemy).as_deref(), Some("Enemy 1"));
        assert_eq!(*arena.world().get::<&Faction>(enemy).unwrap(), Faction::Enemy);
        assert_eq!(arena.physics().borrow().actor_count(), 2);
        assert_eq!(arena.spawn_player(Vec3::X), Err(ArenaError::PlayerExists));
    }

    #[test]
    fn test_step_runs_fixed_steps_on_accumulator() {
        let mut arena = Arena::new(ArenaConfig::default().with_fixed_delta(0.025));
        arena.spawn_player(Vec3::ZERO).unwrap();
        arena.step(0.05);
        arena.step(0.05);
        let stats = arena.stats();
        assert_eq!(stats.frames, 2);
        assert_eq!(stats.fixed_steps, 4);
    }

    #[test]
    fn test_input_moves_player_and_syncs_collider() {
        let mut arena = arena();
        let player = arena.spawn_player(Vec3::new(0.5, 0.0, 0.5)).unwrap();
        arena.publish(&GameEvent::MovementInput {
            direction: Vec2::new(0.0, 1.0),
        });
        arena.run_for(1.0, DT);
        let position = arena.player().unwrap().position();
        assert!(position.z > 2.0, "player at {position}");

        // Colliders follow at the start of the next frame
        arena.step(DT);
        assert_eq!(arena.physics().borrow().locate(player), Some(position));
    }

    #[test]
    fn test_enemy_hunts_down_idle_player() {
        let mut arena = arena();
        arena.spawn_player(Vec3::new(0.5, 0.0, 6.5)).unwrap();
        arena.spawn_enemy(Vec3::new(0.5, 0.0, 0.5), Vec::new()).unwrap();

        arena.run_for(8.0, DT);
        let stats = arena.stats();
        assert!(stats.player_hits > 0);
        let health = arena.player().unwrap().health();
        assert!(health.current() < health.max());
    }

    #[test]
    fn test_wall_hides_player() {
        let config = ArenaConfig::default()
            .with_seed(5)
            .with_obstacle(Vec3::new(0.5, 0.0, 3.5), Vec3::new(3.0, 2.0, 0.4));
        let mut arena = Arena::new(config);
        arena.spawn_player(Vec3::new(0.5, 0.0, 6.5)).unwrap();
        let enemy = arena.spawn_enemy(Vec3::new(0.5, 0.0, 0.5), Vec::new()).unwrap();

        arena.step(DT);
        assert_eq!(arena.enemy(enemy).unwrap().target(), None);
    }

    #[test]
    fn test_dead_enemy_despawns() {
        let mut arena = arena();
        let player = arena.spawn_player(Vec3::new(20.5, 0.0, 20.5)).unwrap();
        let enemy = arena.spawn_enemy(Vec3::new(0.5, 0.0, 0.5), Vec::new()).unwrap();

        arena.publish(&GameEvent::EnemyDamaged {
            target: enemy,
            amount: 500.0,
            direction: Vec3::Z,
            source: Some(player),
        });
        arena.step(DT);
        assert!(arena.enemy(enemy).unwrap().is_dead());
        assert_eq!(arena.stats().enemies_killed, 1);
        assert_eq!(arena.alive_enemies(), 0);

        arena.run_for(DeathState::DESPAWN_DELAY + 0.5, DT);
        assert!(arena.enemy(enemy).is_none());
        assert!(!arena.world().contains(enemy));
        assert_eq!(arena.physics().borrow().locate(enemy), None);
        assert_eq!(arena.stats().enemies_despawned, 1);
        // Dropped controllers leave the bus
        assert_eq!(arena.bus().subscriber_count(EventKind::EnemyDamaged), 0);
    }

    fn fire_at(arena: &Arena, owner: Entity, target: Entity, origin: Vec3) {
        arena.publish(&GameEvent::ProjectileFired {
            owner,
            target,
            origin,
            direction: Vec3::Z,
            speed: 20.0,
            damage: 8.0,
            lifetime: 5.0,
        });
    }

    #[test]
    fn test_projectile_flies_into_player() {
        let mut arena = arena();
        let player = arena.spawn_player(Vec3::new(0.5, 0.0, 6.5)).unwrap();
        // Far out of sight, only used as the shooter
        let owner = arena.spawn_enemy(Vec3::new(20.5, 0.0, 20.5), Vec::new()).unwrap();

        fire_at(&arena, owner, player, Vec3::new(0.5, 0.0, 0.5));
        arena.step(DT);
        assert_eq!(arena.projectiles(), 1);
        assert_eq!(arena.stats().player_hits, 0);

        arena.run_for(1.0, DT);
        assert_eq!(arena.projectiles(), 0);
        let stats = arena.stats();
        assert_eq!(stats.projectiles_fired, 1);
        assert_eq!(stats.projectiles_hit, 1);
        assert_eq!(stats.player_hits, 1);
        let health = arena.player().unwrap().health();
        assert_eq!(health.current(), health.max() - 8.0);
    }

    #[test]
    fn test_wall_stops_projectile() {
        let config = ArenaConfig::default()
            .with_seed(5)
            .with_obstacle(Vec3::new(0.5, 0.0, 3.5), Vec3::new(3.0, 2.0, 0.4));
        let mut arena = Arena::new(config);
        let player = arena.spawn_player(Vec3::new(0.5, 0.0, 6.5)).unwrap();
        let owner = arena.spawn_enemy(Vec3::new(20.5, 0.0, 20.5), Vec::new()).unwrap();

        fire_at(&arena, owner, player, Vec3::new(0.5, 0.0, 0.5));
        arena.run_for(1.0, DT);
        assert_eq!(arena.projectiles(), 0);
        assert_eq!(arena.stats().projectiles_hit, 0);
        assert_eq!(arena.stats().player_hits, 0);
        let health = arena.player().unwrap().health();
        assert_eq!(health.current(), health.max());
    }

    #[test]
    fn test_unanswered_projectile_expires() {
        let mut arena = arena();
        let owner = arena.spawn_enemy(Vec3::new(20.5, 0.0, 20.5), Vec::new()).unwrap();
        fire_at(&arena, owner, owner, Vec3::new(-20.5, 0.0, -20.5));
        arena.run_for(1.0, DT);
        assert_eq!(arena.projectiles(), 1);
        arena.run_for(5.0, DT);
        assert_eq!(arena.projectiles(), 0);
        assert_eq!(arena.stats().projectiles_hit, 0);
    }

    #[test]
    fn test_ranged_enemy_wounds_player_with_projectiles() {
        let mut game = GameConfig::default();
        game.enemy.can_use_ranged_attack = true;
        let mut arena = Arena::new(ArenaConfig::default().with_seed(3).with_game(game));
        arena.spawn_player(Vec3::new(0.5, 0.0, 7.5)).unwrap();
        arena.spawn_enemy(Vec3::new(0.5, 0.0, 0.5), Vec::new()).unwrap();

        arena.run_for(4.0, DT);
        let stats = arena.stats();
        assert!(stats.projectiles_fired > 0);
        assert!(stats.projectiles_hit > 0);
        let health = arena.player().unwrap().health();
        assert!(health.current() < health.max());
    }

    fn spawner_arena(spawner: SpawnerSettings) -> Arena {
        Arena::new(ArenaConfig::default().with_seed(7).with_spawner(spawner))
    }

    fn spawn_points() -> Vec<Vec3> {
        vec![Vec3::new(0.5, 0.0, 0.5), Vec3::new(10.5, 0.0, 10.5)]
    }

    #[test]
    fn test_spawner_fills_up_to_max() {
        let settings = SpawnerSettings::new(spawn_points())
            .with_max_enemies(2)
            .with_interval(1.0);
        let mut arena = spawner_arena(settings);

        arena.step(DT);
        assert_eq!(arena.enemies().len(), 1);
        arena.run_for(1.2, DT);
        assert_eq!(arena.enemies().len(), 2);
        arena.run_for(3.0, DT);
        assert_eq!(arena.enemies().len(), 2);
        assert_eq!(arena.spawner().unwrap().active().len(), 2);
        assert_eq!(arena.stats().enemies_spawned, 2);
    }

    #[test]
    fn test_spawner_replaces_the_dead() {
        let settings = SpawnerSettings::new(spawn_points())
            .with_max_enemies(2)
            .with_interval(1.0);
        let mut arena = spawner_arena(settings);
        arena.run_for(1.5, DT);
        assert_eq!(arena.alive_enemies(), 2);

        let victim = arena.enemies()[0].entity();
        arena.publish(&GameEvent::EnemyDamaged {
            target: victim,
            amount: 500.0,
            direction: Vec3::Z,
            source: None,
        });
        arena.step(DT);
        assert_eq!(arena.alive_enemies(), 1);
        assert_eq!(arena.spawner().unwrap().active().len(), 1);

        arena.run_for(1.1, DT);
        assert_eq!(arena.alive_enemies(), 2);
        assert_eq!(arena.stats().enemies_spawned, 3);
        assert!(!arena.spawner().unwrap().active().contains(&victim));
    }

    #[test]
    fn test_manual_spawner_waits_for_start_and_stops() {
        let settings = SpawnerSettings::new(spawn_points())
            .with_interval(1.0)
            .manual();
        let mut arena = spawner_arena(settings);
        arena.run_for(2.0, DT);
        assert!(arena.enemies().is_empty());

        arena.spawner_mut().unwrap().start();
        arena.step(DT);
        assert_eq!(arena.enemies().len(), 1);

        arena.spawner_mut().unwrap().stop();
        arena.run_for(3.0, DT);
        assert_eq!(arena.enemies().len(), 1);
        assert!(!arena.spawner().unwrap().is_running());
    }

    #[test]
    fn test_spawner_hands_out_classes_in_turn() {
        let settings = SpawnerSettings::new(spawn_points())
            .with_max_enemies(3)
            .with_interval(0.5)
            .with_classes(vec![EnemyClass::Archer, EnemyClass::Mage]);
        let mut arena = spawner_arena(settings);
        arena.run_for(1.2, DT);

        let classes: Vec<_> = arena.enemies().iter().map(EnemyController::class).collect();
        assert_eq!(
            classes,
            vec![
                Some(EnemyClass::Archer),
                Some(EnemyClass::Mage),
                Some(EnemyClass::Archer)
            ]
        );
    }

    #[test]
    fn test_spawner_without_points_spawns_nothing() {
        let mut arena = spawner_arena(SpawnerSettings::default());
        arena.run_for(6.0, DT);
        assert!(arena.enemies().is_empty());
    }

    #[test]
    fn test_sound_draws_enemy() {
        let mut arena = arena();
        let enemy = arena.spawn_enemy(Vec3::new(0.5, 0.0, 0.5), Vec::new()).unwrap();
        arena.emit_sound(Vec3::new(-5.5, 0.0, -5.5), 1.0, None);
        arena.step(DT);
        assert_eq!(
            arena.enemy(enemy).unwrap().current_state(),
            Some(EnemyStateKind::Investigate)
        );
    }
}
