//! AI and navigation module
//!
//! Provides the enemy state machine, grid pathfinding, the navigation agent
//! seam, and the timed effects enemies run across frames.

pub mod enemy;
pub mod effects;
pub mod navigation;
pub mod pathfinding;

pub use effects::{Countdown, Knockback, TimedEffect, Volley};
pub use navigation::{ARRIVAL_TOLERANCE, GridNavigator, Navigator};
pub use pathfinding::{NavGrid, Path, find_path};
