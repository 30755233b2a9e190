use serde::{Deserialize, Serialize};

use crate::colliders::{ColliderArena, ColliderId, ColliderShape};
use crate::common::config::BodyConfig;
use crate::error::{CollisionError, Result};
use crate::math::{Transform, TransformArena, TransformId, Vec2};
use crate::objects::body::{Body, Motion};

/// Handle to an entity in an [`EntityStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub(crate) usize);

impl EntityId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One simulated thing: a transform, its motion and optionally a body and a collider.
#[derive(Debug, Clone)]
pub struct Entity {
    pub active: bool,
    pub transform: TransformId,
    pub motion: Motion,
    pub body: Option<Body>,
    pub collider: Option<ColliderId>,
}

/// Owns every entity, transform and collider of a world.
///
/// Colliders keep their world geometry in sync with the owner's global
/// transform only through [`EntityStore::sync_collider`]; every setter here
/// calls it.
#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    pub transforms: TransformArena,
    pub colliders: ColliderArena,
    entities: Vec<Entity>,
    config: BodyConfig,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::with_config(BodyConfig::default())
    }

    pub fn with_config(config: BodyConfig) -> Self {
        Self {
            transforms: TransformArena::new(),
            colliders: ColliderArena::new(),
            entities: Vec::new(),
            config,
        }
    }

    pub fn body_config(&self) -> &BodyConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        (0..self.entities.len()).map(EntityId)
    }

    /// Adds an active entity with no body and no collider.
    ///
    /// # Arguments
    /// * `local` - Transform relative to `parent`, or the world if `None`.
    /// * `parent` - Entity whose transform this one follows.
    pub fn add_entity(&mut self, local: Transform, parent: Option<EntityId>) -> EntityId {
        let parent_transform = parent.and_then(|p| self.entities.get(p.0)).map(|e| e.transform);
        let transform = self.transforms.insert(local, parent_transform);
        let id = EntityId(self.entities.len());
        self.entities.push(Entity {
            active: true,
            transform,
            motion: Motion::default(),
            body: None,
            collider: None,
        });
        id
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id.0)
    }

    fn entity_mut(&mut self, id: EntityId) -> Result<&mut Entity> {
        self.entities.get_mut(id.0).ok_or(CollisionError::UnknownEntity(id))
    }

    pub fn attach_body(&mut self, id: EntityId, mut body: Body) -> Result<()> {
        let global = self.transform(id).ok_or(CollisionError::UnknownEntity(id))?;
        body.capture_old_transform(&global);
        self.entity_mut(id)?.body = Some(body);
        Ok(())
    }

    /// Gives the entity a collider, replacing any previous one.
    /// The old collider stays in the arena but loses its owner.
    pub fn attach_collider(&mut self, id: EntityId, shape: impl Into<ColliderShape>) -> Result<ColliderId> {
        self.entity(id).ok_or(CollisionError::UnknownEntity(id))?;
        let collider = self.colliders.insert(shape);
        self.bind_collider(id, collider)
    }

    pub fn attach_composite(&mut self, id: EntityId, children: Vec<ColliderShape>) -> Result<ColliderId> {
        self.entity(id).ok_or(CollisionError::UnknownEntity(id))?;
        let collider = self.colliders.insert_composite(children);
        self.bind_collider(id, collider)
    }

    fn bind_collider(&mut self, id: EntityId, collider: ColliderId) -> Result<ColliderId> {
        if let Some(old) = self.detach_collider(id) {
            log::debug!("entity {:?} replaced collider {:?} with {:?}", id, old, collider);
        }
        self.colliders.set_owner(collider, Some(id));
        self.entity_mut(id)?.collider = Some(collider);
        self.sync_collider(id);
        Ok(collider)
    }

    /// Removes the entity's collider, returning its id.
    pub fn detach_collider(&mut self, id: EntityId) -> Option<ColliderId> {
        let old = self.entities.get_mut(id.0)?.collider.take()?;
        self.colliders.set_owner(old, None);
        Some(old)
    }

    pub fn collider(&self, id: EntityId) -> Option<ColliderId> {
        self.entity(id)?.collider
    }

    pub fn body(&self, id: EntityId) -> Option<&Body> {
        self.entity(id)?.body.as_ref()
    }

    pub fn body_mut(&mut self, id: EntityId) -> Option<&mut Body> {
        self.entities.get_mut(id.0)?.body.as_mut()
    }

    pub fn motion(&self, id: EntityId) -> Option<&Motion> {
        self.entity(id).map(|e| &e.motion)
    }

    pub fn motion_mut(&mut self, id: EntityId) -> Option<&mut Motion> {
        self.entities.get_mut(id.0).map(|e| &mut e.motion)
    }

    /// Body and motion together, for code that updates both.
    pub fn body_and_motion_mut(&mut self, id: EntityId) -> Option<(&mut Body, &mut Motion)> {
        let entity = self.entities.get_mut(id.0)?;
        let body = entity.body.as_mut()?;
        Some((body, &mut entity.motion))
    }

    pub fn is_active(&self, id: EntityId) -> bool {
        self.entity(id).is_some_and(|e| e.active)
    }

    pub fn set_active(&mut self, id: EntityId, active: bool) -> Result<()> {
        self.entity_mut(id)?.active = active;
        Ok(())
    }

    /// Sleeps or wakes the entity's body. Entities without a body are ignored.
    pub fn set_sleeping(&mut self, id: EntityId, sleeping: bool) {
        let config = self.config;
        if let Some((body, motion)) = self.body_and_motion_mut(id) {
            body.set_sleeping(sleeping, motion, &config);
        }
    }

    /// Global transform.
    pub fn transform(&self, id: EntityId) -> Option<Transform> {
        self.entity(id).map(|e| self.transforms.global(e.transform))
    }

    pub fn set_transform(&mut self, id: EntityId, local: Transform) -> Result<()> {
        let transform = self.entity(id).ok_or(CollisionError::UnknownEntity(id))?.transform;
        self.transforms.set_local(transform, local);
        self.sync_collider(id);
        Ok(())
    }

    pub fn position(&self, id: EntityId) -> Option<Vec2> {
        self.transform(id).map(|t| t.position)
    }

    /// Moves the entity to a world position and resyncs its collider.
    pub fn set_position(&mut self, id: EntityId, position: Vec2) -> Result<()> {
        let transform = self.entity(id).ok_or(CollisionError::UnknownEntity(id))?.transform;
        self.transforms.set_global_position(transform, position);
        self.sync_collider(id);
        Ok(())
    }

    pub fn set_rotation(&mut self, id: EntityId, rotation: f64) -> Result<()> {
        let transform = self.entity(id).ok_or(CollisionError::UnknownEntity(id))?.transform;
        self.transforms.set_global_rotation(transform, rotation);
        self.sync_collider(id);
        Ok(())
    }

    /// Moves and turns an entity in world space, then resyncs its collider.
    /// Unknown ids are ignored.
    pub(crate) fn place(&mut self, id: EntityId, position: Vec2, rotation: f64) {
        let Some(transform) = self.entity(id).map(|e| e.transform) else {
            return;
        };
        self.transforms.set_global_position(transform, position);
        self.transforms.set_global_rotation(transform, rotation);
        self.sync_collider(id);
    }

    /// Pushes the entity's global transform into its collider geometry.
    pub fn sync_collider(&mut self, id: EntityId) {
        let Some(entity) = self.entities.get(id.0) else {
            return;
        };
        if let Some(collider) = entity.collider {
            let global = self.transforms.global(entity.transform);
            self.colliders.update(collider, &global);
        }
    }

    /// Recomputes every global transform and resyncs every collider.
    pub fn sync_all(&mut self) {
        self.transforms.recompute();
        for index in 0..self.entities.len() {
            self.sync_collider(EntityId(index));
        }
    }

    /// Collider center, falling back to the entity position.
    pub fn center(&self, id: EntityId) -> Vec2 {
        match self.collider(id) {
            Some(collider) => self.colliders.center(collider),
            None => self.position(id).unwrap_or(Vec2::ZERO),
        }
    }

    pub fn inverse_mass(&self, id: EntityId) -> f64 {
        self.body(id).map_or(0.0, Body::inverse_mass)
    }

    /// Inverse moment of inertia from the collider shape and the body mass.
    pub fn inverse_inertia(&self, id: EntityId) -> f64 {
        let (Some(body), Some(collider)) = (self.body(id), self.collider(id)) else {
            return 0.0;
        };
        body.inverse_inertia(self.colliders.inertia(collider, body.mass))
    }

    /// Applies an impulse at a world point to the entity's body. Torque is
    /// taken about the body position.
    pub fn apply_impulse(&mut self, id: EntityId, point: Vec2, impulse: Vec2) {
        let inverse_inertia = self.inverse_inertia(id);
        let Some(center) = self.position(id) else {
            return;
        };
        let Some(entity) = self.entities.get_mut(id.0) else {
            return;
        };
        if let Some(body) = &entity.body {
            body.apply_impulse(&mut entity.motion, center, inverse_inertia, point, impulse);
        }
    }
}
