//! Physics query seam
//!
//! Gameplay code asks "what is inside this sphere?" and "is anything in the
//! way?" through [`PhysicsQueries`]. [`super::PhysicsWorld`] answers with
//! rapier3d; tests answer with hand-placed fixtures.

use std::cell::RefCell;
use std::ops::{BitOr, BitOrAssign};

use glam::Vec3;
use hecs::Entity;
use serde::{Deserialize, Serialize};

/// Bit set of collision layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerMask(u32);

impl LayerMask {
    /// Matches nothing
    pub const NONE: Self = Self(0);
    /// The player character
    pub const PLAYER: Self = Self(1 << 0);
    /// Enemy bodies
    pub const ENEMY: Self = Self(1 << 1);
    /// Static level geometry that blocks sight
    pub const OBSTACLE: Self = Self(1 << 2);
    /// Enemy weapon and projectile hit volumes
    pub const ENEMY_ATTACK: Self = Self(1 << 3);
    /// Breakable props
    pub const DESTRUCTIBLE: Self = Self(1 << 4);
    /// Matches everything
    pub const ALL: Self = Self(u32::MAX);

    /// Mask from raw bits
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw bits
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Check if any layer is shared with `other`
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Check if every layer of `other` is set
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        Self::NONE
    }
}

impl BitOr for LayerMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for LayerMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// An entity found by an overlap query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlapHit {
    /// The overlapping entity
    pub entity: Entity,
    /// Its collider's center
    pub position: Vec3,
}

/// Result of a raycast
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastHit {
    /// Entity owning the collider, `None` for level geometry
    pub entity: Option<Entity>,
    /// The point of intersection
    pub point: Vec3,
    /// Distance from ray origin
    pub distance: f32,
}

/// Read-only spatial queries used by gameplay code.
pub trait PhysicsQueries {
    /// Every enabled entity collider on `layers` touching the sphere.
    fn overlap_sphere(&self, center: Vec3, radius: f32, layers: LayerMask) -> Vec<OverlapHit>;

    /// First collider on `layers` hit by the ray within `max_distance`.
    fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        layers: LayerMask,
    ) -> Option<RaycastHit>;

    /// Current position of an entity's collider.
    fn locate(&self, entity: Entity) -> Option<Vec3>;

    /// Check if the segment `from -> to` is free of `blockers`.
    fn line_of_sight(&self, from: Vec3, to: Vec3, blockers: LayerMask) -> bool {
        let offset = to - from;
        let distance = offset.length();
        if distance <= f32::EPSILON {
            return true;
        }
        self.raycast(from, offset / distance, distance, blockers)
            .is_none()
    }
}

impl<T: PhysicsQueries + ?Sized> PhysicsQueries for RefCell<T> {
    fn overlap_sphere(&self, center: Vec3, radius: f32, layers: LayerMask) -> Vec<OverlapHit> {
        self.borrow().overlap_sphere(center, radius, layers)
    }

    fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        layers: LayerMask,
    ) -> Option<RaycastHit> {
        self.borrow()
            .raycast(origin, direction, max_distance, layers)
    }

    fn locate(&self, entity: Entity) -> Option<Vec3> {
        self.borrow().locate(entity)
    }
}
