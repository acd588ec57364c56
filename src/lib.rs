//! Gameplay core for a third-person action game
//!
//! This crate provides:
//! - A generic finite state machine with rollback on failed entry
//! - The player locomotion and combat state machine
//! - The enemy AI state machine (patrol, chase, attack, flee, investigate)
//!   with per-class special abilities
//! - A typed publish/subscribe event bus
//! - Physics queries with rapier3d and A* navigation
//! - A headless arena that drives everything frame by frame, flies
//!   projectiles and runs an enemy spawner

pub mod ai;
pub mod arena;
pub mod audio;
pub mod config;
pub mod core;
pub mod physics;
pub mod player;

#[cfg(test)]
mod testing;

// Re-exports for convenience
pub use glam;
pub use hecs;
pub use rapier3d;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::ai::enemy::{
        EnemyClass, EnemyController, EnemyServices, EnemySettings, EnemyStateKind, SpecialAbility,
    };
    pub use crate::ai::{GridNavigator, NavGrid, Navigator};
    pub use crate::arena::{
        Arena, ArenaConfig, ArenaStats, Faction, Name, Spawner, SpawnerSettings,
    };
    pub use crate::audio::{AudioService, LogAudio, SilentAudio};
    pub use crate::config::{ConfigError, GameConfig};
    pub use crate::core::{
        EventBus, EventKind, GameEvent, RandomSource, State, StateMachine, Time, Transition,
        handler,
    };
    pub use crate::physics::{LayerMask, PhysicsQueries, PhysicsWorld, Projectile};
    pub use crate::player::{
        CombatSettings, MovementSettings, PlayerController, PlayerServices, PlayerStateKind,
        WeaponData,
    };
    pub use glam::{Quat, Vec2, Vec3};
}
