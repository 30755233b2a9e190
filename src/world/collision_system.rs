use log::debug;
use rustc_hash::FxHashMap;

use super::events::{CollisionEvent, EventKind, EventSink};
use super::store::EntityStore;
use crate::colliders::ColliderId;
use crate::collision::contact::CollisionContact;
use crate::collision::pair::{Pair, PairId};
use crate::collision::processor::CollisionProcessor;
use crate::collision::side::Side;
use crate::common::config::{PhysicsConfig, SolverStrategy};
use crate::error::Result;
use crate::integration::integrate;
use crate::solver::{ArcadeSolver, CollisionSolver, RealisticSolver};

/// Contacts of one frame keyed by lifecycle key, in first-seen order.
#[derive(Debug, Clone, Default)]
struct FrameContacts {
    contacts: Vec<CollisionContact>,
    index: FxHashMap<PairId, usize>,
}

impl FrameContacts {
    /// Later contacts with the same key replace earlier ones in place.
    fn insert(&mut self, contact: CollisionContact) {
        let key = contact.id.lifecycle_key();
        match self.index.get(&key) {
            Some(&slot) => self.contacts[slot] = contact,
            None => {
                self.index.insert(key, self.contacts.len());
                self.contacts.push(contact);
            }
        }
    }

    fn contains(&self, key: &PairId) -> bool {
        self.index.contains_key(key)
    }

    fn clear(&mut self) {
        self.contacts.clear();
        self.index.clear();
    }
}

/// Runs detection and resolution for one frame and reports contact
/// lifecycle changes.
pub struct CollisionSystem {
    config: PhysicsConfig,
    processor: CollisionProcessor,
    solver: Box<dyn CollisionSolver + Send>,
    last_frame: FrameContacts,
    current_frame: FrameContacts,
}

impl CollisionSystem {
    pub fn new(config: PhysicsConfig) -> Self {
        let solver: Box<dyn CollisionSolver + Send> = match config.solver {
            SolverStrategy::Arcade => Box::new(ArcadeSolver::new(config.arcade)),
            SolverStrategy::Realistic => Box::new(RealisticSolver::new(config.realistic)),
        };
        Self {
            config,
            processor: CollisionProcessor::new(&config),
            solver,
            last_frame: FrameContacts::default(),
            current_frame: FrameContacts::default(),
        }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    pub fn processor(&self) -> &CollisionProcessor {
        &self.processor
    }

    pub fn processor_mut(&mut self) -> &mut CollisionProcessor {
        &mut self.processor
    }

    /// Contacts that survived solving in the last update, in first-seen order.
    pub fn contacts(&self) -> &[CollisionContact] {
        &self.last_frame.contacts
    }

    /// Detects and resolves this frame's collisions.
    ///
    /// # Arguments
    /// * `store` - Entities, already integrated for this frame.
    /// * `elapsed_ms` - Frame length in milliseconds.
    /// * `sink` - Receives every event of the frame as one batch.
    pub fn update<S: EventSink + ?Sized>(&mut self, store: &mut EntityStore, elapsed_ms: f64, sink: &mut S) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }

        // --- Broadphase --- //
        let colliders = Self::active_colliders(store);
        self.processor.update(store, &colliders)?;
        let mut pairs = self.processor.broadphase(store, &colliders, elapsed_ms)?;

        // --- Narrowphase and Solve --- //
        self.current_frame.clear();
        let mut events = Vec::new();
        let mut contacts: Vec<CollisionContact> = Vec::new();
        let substep = self.config.substep.max(1);
        self.solver.begin_step(elapsed_ms / substep as f64);
        for step in 0..substep {
            if step > 0 {
                integrate(store, self.config.gravity, elapsed_ms / substep as f64);
            }
            if !contacts.is_empty() {
                pairs = contacts.iter().map(|c| Pair::new(c.collider_a, c.collider_b)).collect();
            }
            if pairs.is_empty() {
                continue;
            }
            let found = self
                .processor
                .narrowphase(&store.colliders, &pairs, self.config.colliders.composite_strategy)?;
            contacts = self.solver.solve(store, found, &mut events);
            for contact in &contacts {
                if !contact.is_canceled() {
                    self.current_frame.insert(contact.clone());
                }
            }
        }

        let body_config = *store.body_config();
        let ids: Vec<_> = store.ids().collect();
        for id in ids {
            if let Some((body, motion)) = store.body_and_motion_mut(id) {
                body.update_motion(motion, &body_config);
            }
        }

        self.run_contact_start_end(store, &mut events);
        std::mem::swap(&mut self.last_frame, &mut self.current_frame);
        debug!("collision step produced {} contacts, {} events", self.last_frame.contacts.len(), events.len());
        sink.publish(events);
        Ok(())
    }

    // --- Helper Methods ---

    /// Leaf colliders of every active entity; composites are expanded.
    fn active_colliders(store: &EntityStore) -> Vec<ColliderId> {
        store
            .ids()
            .filter(|&id| store.is_active(id))
            .filter_map(|id| store.collider(id))
            .flat_map(|collider| store.colliders.flatten(collider))
            .collect()
    }

    fn run_contact_start_end(&self, store: &mut EntityStore, events: &mut Vec<CollisionEvent>) {
        for contact in &self.current_frame.contacts {
            if !self.last_frame.contains(&contact.id.lifecycle_key()) {
                emit_lifecycle(events, contact, EventKind::CollisionStart, EventKind::ContactStart);
            }
        }

        for contact in &self.last_frame.contacts {
            if !self.current_frame.contains(&contact.id.lifecycle_key()) {
                for owner in [contact.owner_a, contact.owner_b].into_iter().flatten() {
                    store.set_sleeping(owner, false);
                }
                emit_lifecycle(events, contact, EventKind::CollisionEnd, EventKind::ContactEnd);
            }
        }
    }
}

/// A sees both kinds first, then B with the opposite side.
fn emit_lifecycle(events: &mut Vec<CollisionEvent>, contact: &CollisionContact, collision: EventKind, touch: EventKind) {
    let side = Side::from_direction(contact.mtv);
    let opposite = side.opposite();
    events.extend(CollisionEvent::for_a(collision, contact, side, contact.mtv));
    events.extend(CollisionEvent::for_a(touch, contact, side, contact.mtv));
    events.extend(CollisionEvent::for_b(collision, contact, opposite, -contact.mtv));
    events.extend(CollisionEvent::for_b(touch, contact, opposite, -contact.mtv));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colliders::{CircleCollider, PolygonCollider};
    use crate::collision::group::CollisionGroup;
    use crate::math::{Transform, Vec2};
    use crate::objects::body::{Body, CollisionType};
    use crate::world::store::EntityId;

    fn tracked(system: &mut CollisionSystem, store: &mut EntityStore, x: f64, y: f64, collision_type: CollisionType) -> EntityId {
        let e = store.add_entity(Transform::new(Vec2::new(x, y), 0.0), None);
        store.attach_body(e, Body::new(collision_type)).unwrap();
        let c = store.attach_collider(e, CircleCollider::new(10.0, Vec2::ZERO)).unwrap();
        system.processor_mut().track(&store.colliders, c).unwrap();
        e
    }

    fn kinds(events: &[CollisionEvent], target: EntityId) -> Vec<EventKind> {
        events.iter().filter(|e| e.target == target).map(|e| e.kind).collect()
    }

    #[test]
    fn test_start_then_end_events() {
        let mut store = EntityStore::new();
        let mut system = CollisionSystem::new(PhysicsConfig::default());
        let a = tracked(&mut system, &mut store, 0.0, 0.0, CollisionType::Passive);
        let b = tracked(&mut system, &mut store, 15.0, 0.0, CollisionType::Passive);

        let mut events = Vec::new();
        system.update(&mut store, 16.0, &mut events).unwrap();
        assert_eq!(
            kinds(&events, a),
            vec![EventKind::PreCollision, EventKind::CollisionStart, EventKind::ContactStart]
        );
        let start = events.iter().find(|e| e.target == b && e.kind == EventKind::CollisionStart).unwrap();
        assert_eq!(start.side, Side::Left);
        assert_eq!(system.contacts().len(), 1);

        // Still touching: no new lifecycle events
        let mut events = Vec::new();
        system.update(&mut store, 16.0, &mut events).unwrap();
        assert_eq!(kinds(&events, a), vec![EventKind::PreCollision]);

        store.set_position(b, Vec2::new(100.0, 0.0)).unwrap();
        let mut events = Vec::new();
        system.update(&mut store, 16.0, &mut events).unwrap();
        assert_eq!(kinds(&events, a), vec![EventKind::CollisionEnd, EventKind::ContactEnd]);
        assert_eq!(kinds(&events, b), vec![EventKind::CollisionEnd, EventKind::ContactEnd]);
        assert!(system.contacts().is_empty());
    }

    #[test]
    fn test_end_wakes_sleeping_bodies() {
        let mut store = EntityStore::new();
        let mut system = CollisionSystem::new(PhysicsConfig::default());
        let a = tracked(&mut system, &mut store, 0.0, 0.0, CollisionType::Passive);
        let b = tracked(&mut system, &mut store, 15.0, 0.0, CollisionType::Passive);
        system.update(&mut store, 16.0, &mut Vec::new()).unwrap();

        store.body_mut(a).unwrap().sleeping = true;
        store.set_position(b, Vec2::new(100.0, 0.0)).unwrap();
        system.update(&mut store, 16.0, &mut Vec::new()).unwrap();
        assert!(!store.body(a).unwrap().sleeping);
    }

    #[test]
    fn test_disabled_config_does_nothing() {
        let mut store = EntityStore::new();
        let config = PhysicsConfig {
            enabled: false,
            ..PhysicsConfig::default()
        };
        let mut system = CollisionSystem::new(config);
        let a = tracked(&mut system, &mut store, 0.0, 0.0, CollisionType::Active);
        tracked(&mut system, &mut store, 15.0, 0.0, CollisionType::Fixed);

        let mut events = Vec::new();
        system.update(&mut store, 16.0, &mut events).unwrap();
        assert!(events.is_empty());
        assert_eq!(store.position(a).unwrap(), Vec2::ZERO);
    }

    #[test]
    fn test_groups_filter_pairs() {
        let mut store = EntityStore::new();
        let mut system = CollisionSystem::new(PhysicsConfig::default());
        let a = tracked(&mut system, &mut store, 0.0, 0.0, CollisionType::Active);
        let b = tracked(&mut system, &mut store, 15.0, 0.0, CollisionType::Active);
        store.body_mut(a).unwrap().group = CollisionGroup::new(0b01, 0b01);
        store.body_mut(b).unwrap().group = CollisionGroup::new(0b10, 0b10);

        let mut events = Vec::new();
        system.update(&mut store, 16.0, &mut events).unwrap();
        assert!(events.is_empty());
        assert_eq!(store.position(a).unwrap(), Vec2::ZERO);
    }

    #[test]
    fn test_composite_contacts_share_one_lifecycle() {
        let mut store = EntityStore::new();
        let mut system = CollisionSystem::new(PhysicsConfig::default());
        let floor = store.add_entity(Transform::identity(), None);
        store.attach_body(floor, Body::new(CollisionType::Passive)).unwrap();
        let composite = store
            .attach_composite(
                floor,
                vec![
                    PolygonCollider::rectangle(20.0, 10.0, Vec2::new(-10.0, 0.0)).into(),
                    PolygonCollider::rectangle(20.0, 10.0, Vec2::new(10.0, 0.0)).into(),
                ],
            )
            .unwrap();
        system.processor_mut().track(&store.colliders, composite).unwrap();
        let ball = store.add_entity(Transform::new(Vec2::new(0.0, -12.0), 0.0), None);
        store.attach_body(ball, Body::new(CollisionType::Passive)).unwrap();
        let c = store.attach_collider(ball, CircleCollider::new(10.0, Vec2::ZERO)).unwrap();
        system.processor_mut().track(&store.colliders, c).unwrap();

        let mut events = Vec::new();
        system.update(&mut store, 16.0, &mut events).unwrap();
        assert_eq!(system.contacts().len(), 1);
        let starts = events.iter().filter(|e| e.target == ball && e.kind == EventKind::CollisionStart).count();
        assert_eq!(starts, 1);
    }
}
