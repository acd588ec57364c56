//! Player character
//!
//! The player is a [`PlayerController`] driving a [`CharacterMotor`] through
//! nine states: Idle, Walk, Run, Jump, Fall, Crouch, Attack, Dash and Parry.

mod combat;
mod controller;
mod health;
mod motor;
mod settings;
mod states;

pub use combat::{ComboTracker, DashTracker};
pub use controller::{
    GRAVITY, PlayerAgent, PlayerController, PlayerInput, PlayerServices, PlayerStateKind,
};
pub use health::{DamageOutcome, PlayerHealth};
pub use motor::{CharacterMotor, GroundMotor};
pub use settings::{
    CombatSettings, Element, MovementSettings, WeaponData, WeaponKind, combo_multiplier,
};
pub use states::{
    AttackState, CrouchState, DashState, FallState, IdleState, JumpState, ParryState, RunState,
    WalkState,
};
