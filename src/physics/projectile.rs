//! Projectiles in flight
//!
//! A [`Projectile`] travels in a straight line and sweeps every step with a
//! raycast, so a fast shot cannot skip over a thin wall. Late in its life it
//! eases down toward a settle speed.

use glam::Vec3;
use hecs::Entity;

use super::query::{LayerMask, PhysicsQueries, RaycastHit};

/// Outcome of one flight step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Flight {
    Flying,
    /// Stopped at the first collider on its path
    Hit(RaycastHit),
    /// Lifetime ran out in the air
    Expired,
}

/// A shot on its way.
#[derive(Debug, Clone, PartialEq)]
pub struct Projectile {
    /// Whoever fired it
    pub owner: Entity,
    /// The entity it was aimed at
    pub target: Option<Entity>,
    pub position: Vec3,
    /// Unit travel direction
    pub direction: Vec3,
    pub speed: f32,
    pub damage: f32,
    /// Seconds before it disappears
    pub lifetime: f32,
    age: f32,
}

impl Projectile {
    /// Speed a spent projectile eases toward
    pub const SETTLE_SPEED: f32 = 5.0;
    /// Fraction of the lifetime after which it starts to slow down
    pub const SLOWDOWN_AFTER: f32 = 0.6;
    /// Easing rate of the slowdown, per second
    pub const SLOWDOWN_RATE: f32 = 2.0;

    #[must_use]
    pub fn new(owner: Entity, origin: Vec3, direction: Vec3, speed: f32, lifetime: f32) -> Self {
        Self {
            owner,
            target: None,
            position: origin,
            direction: direction.try_normalize().unwrap_or(Vec3::Z),
            speed: speed.max(0.0),
            damage: 0.0,
            lifetime: lifetime.max(0.0),
            age: 0.0,
        }
    }

    /// Damage delivered to whatever it strikes.
    #[must_use]
    pub fn with_payload(mut self, target: Entity, damage: f32) -> Self {
        self.target = Some(target);
        self.damage = damage;
        self
    }

    #[must_use]
    pub fn age(&self) -> f32 {
        self.age
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.age >= self.lifetime
    }

    /// Age by `dt` and return this step's displacement.
    pub fn advance(&mut self, dt: f32) -> Vec3 {
        self.age += dt;
        if self.age > self.lifetime * Self::SLOWDOWN_AFTER {
            let t = (dt * Self::SLOWDOWN_RATE).min(1.0);
            self.speed += (Self::SETTLE_SPEED - self.speed) * t;
        }
        self.direction * self.speed * dt
    }

    /// Move one step, stopping at the first collider on `layers`.
    pub fn fly<P>(&mut self, physics: &P, dt: f32, layers: LayerMask) -> Flight
    where
        P: PhysicsQueries + ?Sized,
    {
        if self.is_expired() {
            return Flight::Expired;
        }
        let step = self.advance(dt);
        let distance = step.length();
        if distance > f32::EPSILON {
            if let Some(hit) = physics.raycast(self.position, self.direction, distance, layers) {
                self.position = hit.point;
                return Flight::Hit(hit);
            }
        }
        self.position += step;
        if self.is_expired() {
            Flight::Expired
        } else {
            Flight::Flying
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::PhysicsWorld;

    fn shot(owner: Entity, speed: f32, lifetime: f32) -> Projectile {
        Projectile::new(owner, Vec3::new(0.0, 1.0, 0.0), Vec3::Z, speed, lifetime)
    }

    #[test]
    fn test_keeps_speed_until_late_in_life() {
        let [owner] = crate::testing::entities();
        let mut projectile = shot(owner, 20.0, 1.0);
        for _ in 0..5 {
            projectile.advance(0.1);
        }
        assert_eq!(projectile.speed, 20.0);

        for _ in 0..4 {
            projectile.advance(0.1);
        }
        assert!(projectile.speed < 20.0);
        assert!(projectile.speed > Projectile::SETTLE_SPEED);
    }

    #[test]
    fn test_expires_in_the_air() {
        let [owner] = crate::testing::entities();
        let world = PhysicsWorld::new();
        let mut projectile = shot(owner, 20.0, 0.5);

        let mut steps = 0;
        while projectile.fly(&world, 0.1, LayerMask::ALL) == Flight::Flying {
            steps += 1;
            assert!(steps < 10, "never expired");
        }
        assert!(projectile.is_expired());
        assert!(projectile.position.z > 5.0);
    }

    #[test]
    fn test_fast_shot_stops_at_thin_wall() {
        let [owner] = crate::testing::entities();
        let mut world = PhysicsWorld::new();
        world.add_obstacle(Vec3::new(0.0, 1.0, 5.0), Vec3::new(2.0, 2.0, 0.1));
        world.sync();

        // 10 units per step, far more than the wall is thick
        let mut projectile = shot(owner, 100.0, 5.0);
        match projectile.fly(&world, 0.1, LayerMask::OBSTACLE) {
            Flight::Hit(hit) => {
                assert_eq!(hit.entity, None);
                assert!((hit.point.z - 4.9).abs() < 1e-3, "hit at {}", hit.point);
            }
            other => panic!("expected a hit, got {other:?}"),
        }
        assert!((projectile.position.z - 4.9).abs() < 1e-3);
    }

    #[test]
    fn test_hits_actor_on_requested_layer() {
        let mut ecs = hecs::World::new();
        let owner = ecs.spawn(());
        let player = ecs.spawn(());
        let mut world = PhysicsWorld::new();
        world.add_actor(player, Vec3::new(0.0, 1.0, 3.0), 0.5, LayerMask::PLAYER);
        world.sync();

        let mut projectile = shot(owner, 20.0, 5.0);
        assert_eq!(projectile.fly(&world, 0.1, LayerMask::ENEMY), Flight::Flying);
        let hit = match projectile.fly(&world, 0.1, LayerMask::PLAYER) {
            Flight::Hit(hit) => hit,
            other => panic!("expected a hit, got {other:?}"),
        };
        assert_eq!(hit.entity, Some(player));
    }
}
