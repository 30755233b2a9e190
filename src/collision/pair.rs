use serde::{Deserialize, Serialize};

use crate::colliders::{ColliderArena, ColliderId};
use crate::collision::contact::CollisionContact;
use crate::error::Result;
use crate::objects::body::CollisionType;
use crate::world::store::EntityStore;

/// Order-independent identity of two colliders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PairId {
    pub low: ColliderId,
    pub high: ColliderId,
}

impl PairId {
    pub fn new(a: ColliderId, b: ColliderId) -> Self {
        Self {
            low: a.min(b),
            high: a.max(b),
        }
    }
}

/// A broadphase candidate. Order matters for dispatch, not for identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pair {
    pub collider_a: ColliderId,
    pub collider_b: ColliderId,
    pub id: PairId,
}

impl Pair {
    pub fn new(collider_a: ColliderId, collider_b: ColliderId) -> Self {
        Self {
            collider_a,
            collider_b,
            id: PairId::new(collider_a, collider_b),
        }
    }

    /// Whether two colliders are allowed to produce contacts at all.
    pub fn can_collide(store: &EntityStore, a: ColliderId, b: ColliderId) -> bool {
        if a == b {
            return false;
        }
        let (Some(collider_a), Some(collider_b)) = (store.colliders.get(a), store.colliders.get(b)) else {
            return false;
        };
        // Parts of one entity never collide with each other
        if collider_a.owner.is_some() && collider_a.owner == collider_b.owner {
            return false;
        }
        if store.colliders.bounds(a).has_zero_dimensions() || store.colliders.bounds(b).has_zero_dimensions() {
            return false;
        }

        let (Some(owner_a), Some(owner_b)) = (collider_a.owner, collider_b.owner) else {
            return false;
        };
        let (Some(body_a), Some(body_b)) = (store.body(owner_a), store.body(owner_b)) else {
            return false;
        };

        if !body_a.group.can_collide(&body_b.group) {
            return false;
        }
        if body_a.collision_type == CollisionType::Fixed && body_b.collision_type == CollisionType::Fixed {
            return false;
        }
        if body_a.collision_type == CollisionType::PreventCollision
            || body_b.collision_type == CollisionType::PreventCollision
        {
            return false;
        }
        store.is_active(owner_a) && store.is_active(owner_b)
    }

    pub fn collide(&self, colliders: &ColliderArena) -> Result<Vec<CollisionContact>> {
        colliders.collide(self.collider_a, self.collider_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colliders::{CircleCollider, EdgeCollider};
    use crate::collision::group::CollisionGroup;
    use crate::math::{Transform, Vec2};
    use crate::objects::body::Body;

    fn circle_entity(store: &mut EntityStore, x: f64, collision_type: CollisionType) -> ColliderId {
        let e = store.add_entity(Transform::new(Vec2::new(x, 0.0), 0.0), None);
        store.attach_body(e, Body::new(collision_type)).unwrap();
        store.attach_collider(e, CircleCollider::new(5.0, Vec2::ZERO)).unwrap()
    }

    #[test]
    fn test_pair_id_is_order_independent() {
        let a = ColliderId(3);
        let b = ColliderId(9);
        assert_eq!(PairId::new(a, b), PairId::new(b, a));
        assert_eq!(Pair::new(b, a).id.low, a);
    }

    #[test]
    fn test_pair_can_collide_rules() {
        let mut store = EntityStore::new();
        let active = circle_entity(&mut store, 0.0, CollisionType::Active);
        let fixed = circle_entity(&mut store, 1.0, CollisionType::Fixed);
        let fixed2 = circle_entity(&mut store, 2.0, CollisionType::Fixed);
        let ghost = circle_entity(&mut store, 3.0, CollisionType::PreventCollision);

        assert!(Pair::can_collide(&store, active, fixed));
        assert!(!Pair::can_collide(&store, active, active));
        assert!(!Pair::can_collide(&store, fixed, fixed2));
        assert!(!Pair::can_collide(&store, active, ghost));
    }

    #[test]
    fn test_pair_can_collide_requires_bodies_and_active_owners() {
        let mut store = EntityStore::new();
        let active = circle_entity(&mut store, 0.0, CollisionType::Active);
        let other = circle_entity(&mut store, 1.0, CollisionType::Active);

        let no_body = store.add_entity(Transform::identity(), None);
        let loose = store
            .attach_collider(no_body, EdgeCollider::new(Vec2::new(-5.0, 0.0), Vec2::new(5.0, 0.0), Vec2::ZERO))
            .unwrap();
        assert!(!Pair::can_collide(&store, active, loose));

        let owner = store.colliders[other].owner.unwrap();
        store.set_active(owner, false).unwrap();
        assert!(!Pair::can_collide(&store, active, other));
    }

    #[test]
    fn test_pair_can_collide_respects_groups() {
        let mut store = EntityStore::new();
        let a = circle_entity(&mut store, 0.0, CollisionType::Active);
        let b = circle_entity(&mut store, 1.0, CollisionType::Active);
        let group = CollisionGroup::new(0b1, 0b10);
        for c in [a, b] {
            let owner = store.colliders[c].owner.unwrap();
            store.body_mut(owner).unwrap().group = group;
        }
        assert!(!Pair::can_collide(&store, a, b));
    }
}
