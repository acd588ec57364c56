//! Enemy AI
//!
//! Each enemy is an [`EnemyController`] running eight states over an
//! [`EnemyAgent`]: Idle, Patrol, Chase, Attack, RangedAttack, Flee,
//! Investigate and Death. Enemies sense through [`PhysicsQueries`] and move
//! through a [`Navigator`]. An enemy with an [`EnemyClass`] also owns a
//! [`SpecialAbility`] it uses on a cooldown.
//!
//! [`PhysicsQueries`]: crate::physics::PhysicsQueries
//! [`Navigator`]: crate::ai::Navigator

mod abilities;
mod controller;
mod perception;
mod settings;
mod states;

pub use abilities::{ActiveAbility, EnemyClass, SpecialAbility};
pub use controller::{EnemyAgent, EnemyController, EnemyServices, EnemyStateKind};
pub use perception::{Adaptation, HeardSound, Perception};
pub use settings::EnemySettings;
pub use states::{
    AttackState, ChaseState, DeathState, FleeState, IdleState, InvestigateState, PatrolState,
    RangedAttackState,
};
