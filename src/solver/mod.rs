//! Contact resolution strategies.

pub mod arcade;
pub mod contact_constraint_point;
pub mod realistic;

pub use arcade::ArcadeSolver;
pub use contact_constraint_point::ContactConstraintPoint;
pub use realistic::RealisticSolver;

use rustc_hash::FxHashMap;

use crate::collision::contact::{CollisionContact, ContactId};
use crate::collision::side::Side;
use crate::common::config::ContactSolveBias;
use crate::objects::body::{Body, CollisionType};
use crate::world::events::CollisionEvent;
use crate::world::store::{EntityId, EntityStore};

/// Mtv components below this are treated as no overlap.
pub(crate) const MTV_EPSILON: f64 = 0.0001;

/// Resolves the contacts of one narrowphase pass.
pub trait CollisionSolver {
    /// Length in milliseconds of the step the following `solve` calls
    /// belong to. Called once per step or substep, after integration.
    fn begin_step(&mut self, _elapsed_ms: f64) {}

    /// Resolves `contacts` in place on the store and returns the ones that
    /// were not canceled before solving. Events are appended to `events`.
    fn solve(
        &mut self,
        store: &mut EntityStore,
        contacts: Vec<CollisionContact>,
        events: &mut Vec<CollisionEvent>,
    ) -> Vec<CollisionContact>;
}

/// Sort key recorded during pre-solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SolveOrder {
    pub horizontal: bool,
    pub distance: f64,
}

impl SolveOrder {
    pub fn new(contact: &CollisionContact) -> Self {
        Self {
            horizontal: Side::from_direction(contact.mtv).is_horizontal(),
            distance: contact.info.separation.abs(),
        }
    }

    fn rank(&self, bias: ContactSolveBias) -> u8 {
        match (bias, self.horizontal) {
            (ContactSolveBias::None, _) => 0,
            (ContactSolveBias::VerticalFirst, false) | (ContactSolveBias::HorizontalFirst, true) => 1,
            (ContactSolveBias::VerticalFirst, true) | (ContactSolveBias::HorizontalFirst, false) => 2,
        }
    }
}

/// Stable sort by bias rank, then by separation distance.
pub(crate) fn order_contacts(
    contacts: &mut [CollisionContact],
    order: &FxHashMap<ContactId, SolveOrder>,
    bias: ContactSolveBias,
) {
    contacts.sort_by(|a, b| {
        let (Some(oa), Some(ob)) = (order.get(&a.id), order.get(&b.id)) else {
            return std::cmp::Ordering::Equal;
        };
        oa.rank(bias)
            .cmp(&ob.rank(bias))
            .then(oa.distance.total_cmp(&ob.distance))
    });
}

/// Owners and bodies of both sides of a contact.
pub(crate) fn contact_bodies<'a>(
    store: &'a EntityStore,
    contact: &CollisionContact,
) -> Option<(EntityId, &'a Body, EntityId, &'a Body)> {
    let owner_a = contact.owner_a?;
    let owner_b = contact.owner_b?;
    Some((owner_a, store.body(owner_a)?, owner_b, store.body(owner_b)?))
}

pub(crate) fn either_passive(a: &Body, b: &Body) -> bool {
    a.collision_type == CollisionType::Passive || b.collision_type == CollisionType::Passive
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::colliders::{ColliderShape, PolygonCollider};
    use crate::math::{Transform, Vec2};
    use crate::objects::body::{Body, CollisionType};
    use crate::world::store::{EntityId, EntityStore};

    pub fn body_with(store: &mut EntityStore, pos: Vec2, collision_type: CollisionType, shape: impl Into<ColliderShape>) -> EntityId {
        let e = store.add_entity(Transform::new(pos, 0.0), None);
        store.attach_body(e, Body::new(collision_type)).unwrap();
        store.attach_collider(e, shape).unwrap();
        e
    }

    pub fn box_body(store: &mut EntityStore, pos: Vec2, size: f64, collision_type: CollisionType) -> EntityId {
        let shape = PolygonCollider::rectangle(size, size, Vec2::ZERO);
        body_with(store, pos, collision_type, shape)
    }
}
