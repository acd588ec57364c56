//! Physics queries backed by rapier3d
//!
//! Actors (player, enemies, attack volumes) are parentless ball colliders
//! whose translation the host updates every frame; level geometry is a set of
//! static cuboids. The owning entity is packed into the collider's
//! `user_data`, and its layer into the collider's collision groups.

use glam::Vec3;
use hecs::Entity;
use rapier3d::prelude::*;
use rustc_hash::FxHashMap;

use super::query::{LayerMask, OverlapHit, PhysicsQueries, RaycastHit};

fn to_rapier(v: Vec3) -> Vector<Real> {
    vector![v.x, v.y, v.z]
}

fn to_glam(v: &Vector<Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

fn groups(membership: LayerMask, filter: LayerMask) -> InteractionGroups {
    InteractionGroups::new(
        Group::from_bits_truncate(membership.bits()),
        Group::from_bits_truncate(filter.bits()),
    )
}

fn query_filter(layers: LayerMask) -> QueryFilter<'static> {
    QueryFilter::new().groups(groups(LayerMask::ALL, layers))
}

/// Collider world used to answer [`PhysicsQueries`].
pub struct PhysicsWorld {
    /// Physics pipeline (only used to refresh broad phase and queries)
    pipeline: PhysicsPipeline,
    /// Island manager
    island_manager: IslandManager,
    /// Broad phase
    broad_phase: DefaultBroadPhase,
    /// Narrow phase
    narrow_phase: NarrowPhase,
    /// Rigid body set (empty: every collider is parentless)
    rigid_body_set: RigidBodySet,
    /// Collider set
    collider_set: ColliderSet,
    /// Impulse joint set
    impulse_joint_set: ImpulseJointSet,
    /// Multibody joint set
    multibody_joint_set: MultibodyJointSet,
    /// CCD solver
    ccd_solver: CCDSolver,
    /// Query pipeline for overlaps and raycasts
    query_pipeline: QueryPipeline,
    /// Integration parameters
    integration_parameters: IntegrationParameters,
    /// Collider of each registered actor
    actors: FxHashMap<Entity, ColliderHandle>,
}

impl PhysicsWorld {
    /// Create an empty world.
    pub fn new() -> Self {
        Self {
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            integration_parameters: IntegrationParameters::default(),
            actors: FxHashMap::default(),
        }
    }

    /// Register `entity` as a ball of `radius` on `layer`.
    ///
    /// Re-registering an entity replaces its previous collider.
    pub fn add_actor(&mut self, entity: Entity, position: Vec3, radius: f32, layer: LayerMask) {
        self.remove_actor(entity);
        let collider = ColliderBuilder::ball(radius)
            .translation(to_rapier(position))
            .collision_groups(groups(layer, LayerMask::ALL))
            .sensor(true)
            .user_data(u128::from(entity.to_bits().get()))
            .build();
        let handle = self.collider_set.insert(collider);
        self.actors.insert(entity, handle);
    }

    /// Add a static sight-blocking box.
    pub fn add_obstacle(&mut self, center: Vec3, half_extents: Vec3) {
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .translation(to_rapier(center))
            .collision_groups(groups(LayerMask::OBSTACLE, LayerMask::ALL))
            .build();
        self.collider_set.insert(collider);
    }

    /// Move an actor's collider. Returns `false` for unknown entities.
    pub fn set_actor_position(&mut self, entity: Entity, position: Vec3) -> bool {
        let Some(collider) = self
            .actors
            .get(&entity)
            .and_then(|handle| self.collider_set.get_mut(*handle))
        else {
            return false;
        };
        collider.set_translation(to_rapier(position));
        true
    }

    /// Enable or disable an actor's collider (disabled actors are invisible to overlaps).
    pub fn set_actor_enabled(&mut self, entity: Entity, enabled: bool) {
        if let Some(collider) = self
            .actors
            .get(&entity)
            .and_then(|handle| self.collider_set.get_mut(*handle))
        {
            collider.set_enabled(enabled);
        }
    }

    /// Remove an actor's collider. Returns `false` if it was not registered.
    pub fn remove_actor(&mut self, entity: Entity) -> bool {
        let Some(handle) = self.actors.remove(&entity) else {
            return false;
        };
        self.collider_set.remove(
            handle,
            &mut self.island_manager,
            &mut self.rigid_body_set,
            true,
        );
        true
    }

    /// Number of registered actors
    #[must_use]
    pub fn actor_count(&self) -> usize {
        self.actors.len()
    }

    /// Push collider changes into the query pipeline.
    ///
    /// Call once per frame after moving actors and before any query.
    pub fn sync(&mut self) {
        self.pipeline.step(
            &vector![0.0, 0.0, 0.0],
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsQueries for PhysicsWorld {
    fn overlap_sphere(&self, center: Vec3, radius: f32, layers: LayerMask) -> Vec<OverlapHit> {
        let shape = SharedShape::ball(radius);
        let shape_pos = Isometry::translation(center.x, center.y, center.z);
        let mut hits = Vec::new();

        self.query_pipeline.intersections_with_shape(
            &self.rigid_body_set,
            &self.collider_set,
            &shape_pos,
            &*shape,
            query_filter(layers),
            |handle| {
                let found = self
                    .collider_set
                    .get(handle)
                    .filter(|c| c.is_enabled())
                    .and_then(|c| Some((Entity::from_bits(c.user_data as u64)?, c)));
                if let Some((entity, collider)) = found {
                    hits.push(OverlapHit {
                        entity,
                        position: to_glam(collider.translation()),
                    });
                }
                true
            },
        );

        hits
    }

    fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        layers: LayerMask,
    ) -> Option<RaycastHit> {
        let direction = direction.try_normalize()?;
        let ray = Ray::new(
            point![origin.x, origin.y, origin.z],
            to_rapier(direction),
        );

        self.query_pipeline
            .cast_ray(
                &self.rigid_body_set,
                &self.collider_set,
                &ray,
                max_distance,
                true,
                query_filter(layers),
            )
            .map(|(handle, distance)| {
                let point = ray.point_at(distance);
                let entity = self
                    .collider_set
                    .get(handle)
                    .and_then(|c| Entity::from_bits(c.user_data as u64));
                RaycastHit {
                    entity,
                    point: Vec3::new(point.x, point.y, point.z),
                    distance,
                }
            })
    }

    fn locate(&self, entity: Entity) -> Option<Vec3> {
        let handle = self.actors.get(&entity)?;
        self.collider_set
            .get(*handle)
            .map(|c| to_glam(c.translation()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world_with_actors() -> (PhysicsWorld, Entity, Entity) {
        let mut ecs = hecs::World::new();
        let player = ecs.spawn(());
        let enemy = ecs.spawn(());

        let mut world = PhysicsWorld::new();
        world.add_actor(player, Vec3::new(0.0, 1.0, 5.0), 0.5, LayerMask::PLAYER);
        world.add_actor(enemy, Vec3::new(0.0, 1.0, 0.0), 0.5, LayerMask::ENEMY);
        world.sync();
        (world, player, enemy)
    }

    #[test]
    fn test_overlap_filters_by_layer() {
        let (world, player, _) = world_with_actors();

        let hits = world.overlap_sphere(Vec3::new(0.0, 1.0, 0.0), 10.0, LayerMask::PLAYER);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entity, player);

        let all = world.overlap_sphere(Vec3::new(0.0, 1.0, 0.0), 10.0, LayerMask::ALL);
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_overlap_respects_radius() {
        let (world, _, _) = world_with_actors();
        let hits = world.overlap_sphere(Vec3::new(0.0, 1.0, 0.0), 2.0, LayerMask::PLAYER);
        assert!(hits.is_empty());
    }

    #[test]
    fn test_obstacle_blocks_line_of_sight() {
        let (mut world, _, _) = world_with_actors();
        let eye = Vec3::new(0.0, 1.0, 0.0);
        let target = Vec3::new(0.0, 1.0, 5.0);
        assert!(world.line_of_sight(eye, target, LayerMask::OBSTACLE));

        world.add_obstacle(Vec3::new(0.0, 1.0, 2.5), Vec3::new(2.0, 2.0, 0.2));
        world.sync();
        assert!(!world.line_of_sight(eye, target, LayerMask::OBSTACLE));
    }

    #[test]
    fn test_move_disable_and_remove_actor() {
        let (mut world, player, enemy) = world_with_actors();

        assert!(world.set_actor_position(player, Vec3::new(3.0, 1.0, 0.0)));
        world.sync();
        assert_eq!(world.locate(player), Some(Vec3::new(3.0, 1.0, 0.0)));

        world.set_actor_enabled(enemy, false);
        world.sync();
        let hits = world.overlap_sphere(Vec3::new(0.0, 1.0, 0.0), 1.0, LayerMask::ENEMY);
        assert!(hits.is_empty());

        assert!(world.remove_actor(enemy));
        assert!(!world.remove_actor(enemy));
        assert_eq!(world.locate(enemy), None);
        assert_eq!(world.actor_count(), 1);
    }
}
