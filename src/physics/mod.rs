//! Physics queries module
//!
//! Built on top of rapier3d

mod projectile;
mod query;
mod world;

pub use projectile::{Flight, Projectile};
pub use query::{LayerMask, OverlapHit, PhysicsQueries, RaycastHit};
pub use world::PhysicsWorld;
