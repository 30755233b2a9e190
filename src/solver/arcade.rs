use rustc_hash::{FxHashMap, FxHashSet};

use super::{contact_bodies, either_passive, order_contacts, CollisionSolver, SolveOrder, MTV_EPSILON};
use crate::collision::contact::{CollisionContact, ContactId};
use crate::collision::pair::PairId;
use crate::common::config::ArcadeConfig;
use crate::objects::body::CollisionType;
use crate::world::events::{emit_both, CollisionEvent, EventKind};
use crate::world::store::EntityStore;

/// Pushes shapes apart and removes the velocity that drove them together.
///
/// No restitution, friction or rotation: the usual choice for 2D games that
/// want crisp, non-physical collisions. Holds no state between frames.
#[derive(Debug, Clone, Default)]
pub struct ArcadeSolver {
    config: ArcadeConfig,
    order: FxHashMap<ContactId, SolveOrder>,
    composite_ids: FxHashSet<PairId>,
}

impl ArcadeSolver {
    pub fn new(config: ArcadeConfig) -> Self {
        Self {
            config,
            order: FxHashMap::default(),
            composite_ids: FxHashSet::default(),
        }
    }

    fn pre_solve(&mut self, contacts: &mut [CollisionContact], events: &mut Vec<CollisionEvent>) {
        self.order.clear();
        for contact in contacts.iter_mut() {
            // One contact per composite pair when composites collide together
            if let Some(composite) = contact.id.composite {
                if !self.composite_ids.insert(composite) {
                    contact.cancel();
                    continue;
                }
            }
            if contact.mtv.x.abs() < MTV_EPSILON && contact.mtv.y.abs() < MTV_EPSILON {
                contact.cancel();
                continue;
            }
            self.order.insert(contact.id, SolveOrder::new(contact));
            emit_both(events, EventKind::PreCollision, contact, contact.side_a(), -contact.mtv);
        }
        self.composite_ids.clear();
    }

    fn post_solve(&self, store: &EntityStore, contacts: &[CollisionContact], events: &mut Vec<CollisionEvent>) {
        for contact in contacts {
            if contact.is_canceled() {
                continue;
            }
            if let Some((_, body_a, _, body_b)) = contact_bodies(store, contact) {
                if either_passive(body_a, body_b) {
                    continue;
                }
            }
            emit_both(events, EventKind::PostCollision, contact, contact.side_a(), -contact.mtv);
        }
    }

    fn solve_position(&self, store: &mut EntityStore, contact: &mut CollisionContact) {
        // Bounds that no longer touch were already separated by an earlier contact
        let bounds_a = store.colliders.bounds(contact.collider_a);
        let bounds_b = store.colliders.bounds(contact.collider_b);
        if !bounds_a.overlaps(&bounds_b, MTV_EPSILON) {
            contact.cancel();
            return;
        }
        if contact.mtv.x.abs() < MTV_EPSILON && contact.mtv.y.abs() < MTV_EPSILON {
            contact.cancel();
            return;
        }

        let Some((owner_a, body_a, owner_b, body_b)) = contact_bodies(store, contact) else {
            return;
        };
        if either_passive(body_a, body_b) {
            return;
        }
        let (type_a, type_b) = (body_a.collision_type, body_b.collision_type);
        let mut mtv = contact.mtv;
        if type_a == CollisionType::Active && type_b == CollisionType::Active {
            mtv = mtv * 0.5;
        }

        if type_a == CollisionType::Active {
            if let Some(tx) = store.transform(owner_a) {
                store.place(owner_a, tx.position - mtv, tx.rotation);
            }
        }
        if type_b == CollisionType::Active {
            if let Some(tx) = store.transform(owner_b) {
                store.place(owner_b, tx.position + mtv, tx.rotation);
            }
        }
    }

    fn solve_velocity(&self, store: &mut EntityStore, contact: &CollisionContact) {
        if contact.is_canceled() {
            return;
        }
        let Some((owner_a, body_a, owner_b, body_b)) = contact_bodies(store, contact) else {
            return;
        };
        if either_passive(body_a, body_b) {
            return;
        }
        let (active_a, active_b) = (body_a.is_active(), body_b.is_active());
        let normal = contact.normal;
        let opposite = -normal;

        // Only cancel velocity heading into the contact, so bodies can slide off ledges
        if active_a {
            if let Some(motion) = store.motion_mut(owner_a) {
                if motion.vel.normalize().dot(opposite) < 0.0 {
                    motion.vel += normal * normal.dot(-motion.vel);
                }
            }
        }
        if active_b {
            if let Some(motion) = store.motion_mut(owner_b) {
                if motion.vel.normalize().dot(normal) < 0.0 {
                    motion.vel += opposite * opposite.dot(-motion.vel);
                }
            }
        }
    }
}

impl CollisionSolver for ArcadeSolver {
    fn solve(
        &mut self,
        store: &mut EntityStore,
        mut contacts: Vec<CollisionContact>,
        events: &mut Vec<CollisionEvent>,
    ) -> Vec<CollisionContact> {
        self.pre_solve(&mut contacts, events);
        contacts.retain(|c| !c.is_canceled());
        order_contacts(&mut contacts, &self.order, self.config.contact_solve_bias);

        for contact in contacts.iter_mut() {
            self.solve_position(store, contact);
            self.solve_velocity(store, contact);
        }

        self.post_solve(store, &contacts, events);
        contacts
    }
}
