//! Deterministic collaborators for unit tests

use std::cell::RefCell;

use glam::Vec3;
use hecs::Entity;

use crate::ai::Navigator;
use crate::audio::AudioService;
use crate::core::RandomSource;
use crate::physics::{LayerMask, OverlapHit, PhysicsQueries, RaycastHit};

thread_local! {
    static IDS: RefCell<hecs::World> = RefCell::new(hecs::World::new());
}

/// Fresh entity ids, distinct from every other id handed out on this thread.
pub fn entities<const N: usize>() -> [Entity; N] {
    IDS.with(|world| {
        let mut world = world.borrow_mut();
        std::array::from_fn(|_| world.spawn(()))
    })
}

/// Replays a fixed sequence of values, cycling when it runs out.
#[derive(Debug, Clone)]
pub struct ScriptedRandom {
    values: Vec<f32>,
    next: usize,
}

impl ScriptedRandom {
    pub fn new(values: impl IntoIterator<Item = f32>) -> Self {
        Self {
            values: values.into_iter().collect(),
            next: 0,
        }
    }

    /// Always returns `value`
    pub fn constant(value: f32) -> Self {
        Self::new([value])
    }
}

impl RandomSource for ScriptedRandom {
    fn value(&mut self) -> f32 {
        if self.values.is_empty() {
            return 0.5;
        }
        let value = self.values[self.next % self.values.len()];
        self.next += 1;
        value
    }
}

/// Audio service that remembers every clip.
#[derive(Debug, Default)]
pub struct RecordingAudio {
    played: RefCell<Vec<(String, Option<Vec3>)>>,
}

impl RecordingAudio {
    pub fn clips(&self) -> Vec<String> {
        self.played.borrow().iter().map(|(clip, _)| clip.clone()).collect()
    }
}

impl AudioService for RecordingAudio {
    fn play(&self, clip: &str, position: Option<Vec3>) {
        self.played.borrow_mut().push((clip.to_string(), position));
    }
}

#[derive(Debug, Clone, Copy)]
struct FakeBody {
    entity: Entity,
    position: Vec3,
    layer: LayerMask,
}

/// Point bodies plus spherical sight blockers, editable through `&self`.
#[derive(Debug, Default)]
pub struct FakePhysics {
    bodies: RefCell<Vec<FakeBody>>,
    blockers: RefCell<Vec<(Vec3, f32)>>,
}

impl FakePhysics {
    pub fn add(&self, entity: Entity, position: Vec3, layer: LayerMask) {
        self.remove(entity);
        self.bodies.borrow_mut().push(FakeBody {
            entity,
            position,
            layer,
        });
    }

    pub fn set_position(&self, entity: Entity, position: Vec3) {
        if let Some(body) = self.bodies.borrow_mut().iter_mut().find(|b| b.entity == entity) {
            body.position = position;
        }
    }

    pub fn remove(&self, entity: Entity) {
        self.bodies.borrow_mut().retain(|b| b.entity != entity);
    }

    /// Sphere on the obstacle layer
    pub fn add_blocker(&self, center: Vec3, radius: f32) {
        self.blockers.borrow_mut().push((center, radius));
    }
}

impl PhysicsQueries for FakePhysics {
    fn overlap_sphere(&self, center: Vec3, radius: f32, layers: LayerMask) -> Vec<OverlapHit> {
        self.bodies
            .borrow()
            .iter()
            .filter(|b| b.layer.intersects(layers) && b.position.distance(center) <= radius)
            .map(|b| OverlapHit {
                entity: b.entity,
                position: b.position,
            })
            .collect()
    }

    fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        layers: LayerMask,
    ) -> Option<RaycastHit> {
        if !layers.intersects(LayerMask::OBSTACLE) {
            return None;
        }
        let direction = direction.try_normalize()?;
        self.blockers
            .borrow()
            .iter()
            .filter_map(|&(center, radius)| {
                let to_center = center - origin;
                let along = to_center.dot(direction);
                let miss_sq = to_center.length_squared() - along * along;
                if miss_sq > radius * radius {
                    return None;
                }
                let distance = along - (radius * radius - miss_sq).sqrt();
                (distance >= 0.0 && distance <= max_distance).then_some(distance)
            })
            .min_by(|a, b| a.total_cmp(b))
            .map(|distance| RaycastHit {
                entity: None,
                point: origin + direction * distance,
                distance,
            })
    }

    fn locate(&self, entity: Entity) -> Option<Vec3> {
        self.bodies
            .borrow()
            .iter()
            .find(|b| b.entity == entity)
            .map(|b| b.position)
    }
}

/// Navigator that walks straight at its destination over open ground.
#[derive(Debug)]
pub struct StraightNavigator {
    destination: Option<Vec3>,
    speed: f32,
    stopping_distance: f32,
    stopped: bool,
    enabled: bool,
    /// Every accepted destination, oldest first
    pub history: Vec<Vec3>,
}

impl Default for StraightNavigator {
    fn default() -> Self {
        Self {
            destination: None,
            speed: 3.5,
            stopping_distance: 0.0,
            stopped: false,
            enabled: true,
            history: Vec::new(),
        }
    }
}

fn flat(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

impl Navigator for StraightNavigator {
    fn set_destination(&mut self, _from: Vec3, destination: Vec3) -> bool {
        if !self.enabled {
            return false;
        }
        self.destination = Some(destination);
        self.history.push(destination);
        true
    }

    fn destination(&self) -> Option<Vec3> {
        self.destination
    }

    fn remaining_distance(&self, from: Vec3) -> f32 {
        self.destination
            .map_or(0.0, |dest| flat(dest).distance(flat(from)))
    }

    fn stopping_distance(&self) -> f32 {
        self.stopping_distance
    }

    fn set_stopping_distance(&mut self, distance: f32) {
        self.stopping_distance = distance;
    }

    fn speed(&self) -> f32 {
        self.speed
    }

    fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }

    fn set_stopped(&mut self, stopped: bool) {
        self.stopped = stopped;
    }

    fn is_stopped(&self) -> bool {
        self.stopped
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn sample_position(&self, point: Vec3, _max_distance: f32) -> Option<Vec3> {
        Some(point)
    }

    fn advance(&mut self, from: Vec3, dt: f32) -> Vec3 {
        let Some(dest) = self.destination else {
            return from;
        };
        if !self.enabled || self.stopped {
            return from;
        }
        let remaining = self.remaining_distance(from) - self.stopping_distance;
        if remaining <= 0.0 {
            return from;
        }
        let step = (self.speed * dt).min(remaining);
        from + flat(dest - from).normalize_or_zero() * step
    }
}
