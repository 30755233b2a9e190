use log::debug;

use super::collision_system::CollisionSystem;
use super::events::EventSink;
use super::store::{EntityId, EntityStore};
use crate::colliders::{ColliderId, ColliderShape, RayCastHit};
use crate::collision::contact::CollisionContact;
use crate::collision::processor::RayCastOptions;
use crate::common::config::PhysicsConfig;
use crate::error::{CollisionError, Result};
use crate::integration::integrate;
use crate::math::{BoundingBox, Ray, Transform, Vec2};
use crate::objects::body::{Body, CollisionType};

/// Entities plus the collision system that simulates them.
///
/// Colliders attached through the world are tracked by the broadphase
/// automatically; colliders attached directly on the store are not.
pub struct PhysicsWorld {
    store: EntityStore,
    system: CollisionSystem,
}

impl PhysicsWorld {
    /// Creates an empty world. The configuration is fixed for its lifetime.
    pub fn new(config: PhysicsConfig) -> Self {
        Self {
            store: EntityStore::with_config(config.bodies),
            system: CollisionSystem::new(config),
        }
    }

    pub fn config(&self) -> &PhysicsConfig {
        self.system.config()
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut EntityStore {
        &mut self.store
    }

    pub fn system(&self) -> &CollisionSystem {
        &self.system
    }

    /// Contacts resolved during the last step.
    pub fn contacts(&self) -> &[CollisionContact] {
        self.system.contacts()
    }

    pub fn add_entity(&mut self, local: Transform, parent: Option<EntityId>) -> EntityId {
        self.store.add_entity(local, parent)
    }

    pub fn add_body(&mut self, entity: EntityId, body: Body) -> Result<()> {
        self.store.attach_body(entity, body)
    }

    /// Body with the world's default mass and sleep settings.
    pub fn new_body(&self, collision_type: CollisionType) -> Body {
        Body::with_config(collision_type, &self.config().bodies)
    }

    /// Attaches `shape` to `entity` and starts tracking it, replacing any
    /// previous collider.
    pub fn add_collider(&mut self, entity: EntityId, shape: impl Into<ColliderShape>) -> Result<ColliderId> {
        self.untrack_current(entity)?;
        let collider = self.store.attach_collider(entity, shape)?;
        self.system.processor_mut().track(&self.store.colliders, collider)?;
        Ok(collider)
    }

    pub fn add_composite(&mut self, entity: EntityId, children: Vec<ColliderShape>) -> Result<ColliderId> {
        self.untrack_current(entity)?;
        let collider = self.store.attach_composite(entity, children)?;
        self.system.processor_mut().track(&self.store.colliders, collider)?;
        Ok(collider)
    }

    /// Detaches and untracks the entity's collider.
    pub fn remove_collider(&mut self, entity: EntityId) -> Result<Option<ColliderId>> {
        self.untrack_current(entity)?;
        Ok(self.store.detach_collider(entity))
    }

    /// Convenience for the common case: an entity at `position` with a body
    /// and one collider.
    pub fn spawn(&mut self, position: Vec2, collision_type: CollisionType, shape: impl Into<ColliderShape>) -> Result<EntityId> {
        let entity = self.add_entity(Transform::new(position, 0.0), None);
        let body = self.new_body(collision_type);
        self.add_body(entity, body)?;
        self.add_collider(entity, shape)?;
        Ok(entity)
    }

    /// Advances the simulation by `elapsed_ms`: integrates motion, then
    /// detects and resolves collisions. Events go to `sink` as one batch.
    pub fn step<S: EventSink + ?Sized>(&mut self, elapsed_ms: f64, sink: &mut S) -> Result<()> {
        let config = *self.config();
        let substep = config.substep.max(1) as f64;
        integrate(&mut self.store, config.gravity, elapsed_ms / substep);
        self.system.update(&mut self.store, elapsed_ms, sink)
    }

    // --- Queries --- //

    pub fn query_point(&self, point: Vec2) -> Vec<ColliderId> {
        self.system.processor().query_point(point)
    }

    pub fn query_bounds(&self, bounds: &BoundingBox) -> Vec<ColliderId> {
        self.system.processor().query_bounds(bounds)
    }

    pub fn ray_cast(&self, ray: &Ray, options: &RayCastOptions) -> Vec<RayCastHit> {
        self.system.processor().ray_cast(&self.store, ray, options)
    }

    // --- Helper Methods ---

    fn untrack_current(&mut self, entity: EntityId) -> Result<()> {
        if self.store.entity(entity).is_none() {
            return Err(CollisionError::UnknownEntity(entity));
        }
        if let Some(old) = self.store.collider(entity) {
            debug!("untracking collider {:?} of {:?}", old, entity);
            self.system.processor_mut().untrack(&self.store.colliders, old)?;
        }
        Ok(())
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new(PhysicsConfig::default())
    }
}
