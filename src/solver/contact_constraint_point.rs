use crate::collision::contact::CollisionContact;
use crate::math::Vec2;
use crate::objects::body::Motion;
use crate::world::store::EntityStore;

/// Per-point solver state of a contact, kept across frames for warm starting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactConstraintPoint {
    /// World contact point.
    pub point: Vec2,
    /// Contact point in body space, for positional correction.
    pub local: Vec2,
    /// Lever arm from collider A's center.
    pub a_to_contact: Vec2,
    pub b_to_contact: Vec2,
    pub normal_mass: f64,
    pub tangent_mass: f64,
    /// Accumulated over the frame, always >= 0.
    pub normal_impulse: f64,
    pub tangent_impulse: f64,
    /// Restitution target velocity captured before solving.
    pub original_velocity_and_restitution: f64,
}

impl ContactConstraintPoint {
    pub fn new(point: Vec2, local: Vec2) -> Self {
        Self {
            point,
            local,
            a_to_contact: Vec2::ZERO,
            b_to_contact: Vec2::ZERO,
            normal_mass: 0.0,
            tangent_mass: 0.0,
            normal_impulse: 0.0,
            tangent_impulse: 0.0,
            original_velocity_and_restitution: 0.0,
        }
    }

    /// Velocity of B's contact point relative to A's, including spin.
    pub fn relative_velocity(&self, store: &EntityStore, contact: &CollisionContact) -> Vec2 {
        let motion_a = contact.owner_a.and_then(|o| store.motion(o)).copied().unwrap_or_default();
        let motion_b = contact.owner_b.and_then(|o| store.motion(o)).copied().unwrap_or_default();
        point_velocity(&motion_b, self.b_to_contact) - point_velocity(&motion_a, self.a_to_contact)
    }
}

fn point_velocity(motion: &Motion, lever: Vec2) -> Vec2 {
    // omega x r
    motion.vel + Vec2::scalar_cross(motion.angular_velocity, lever)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::contact::SeparationInfo;
    use crate::colliders::CircleCollider;
    use crate::math::Transform;
    use smallvec::smallvec;
    const EPSILON: f64 = 1e-10;

    #[test]
    fn test_relative_velocity_includes_spin() {
        let mut store = EntityStore::new();
        let e1 = store.add_entity(Transform::identity(), None);
        let a = store.attach_collider(e1, CircleCollider::new(1.0, Vec2::ZERO)).unwrap();
        let e2 = store.add_entity(Transform::new(Vec2::new(2.0, 0.0), 0.0), None);
        let b = store.attach_collider(e2, CircleCollider::new(1.0, Vec2::ZERO)).unwrap();
        store.motion_mut(e1).unwrap().vel = Vec2::new(1.0, 0.0);
        store.motion_mut(e2).unwrap().angular_velocity = 2.0;

        let contact = CollisionContact::new(
            &store.colliders[a],
            &store.colliders[b],
            Vec2::ZERO,
            Vec2::RIGHT,
            Vec2::RIGHT.perpendicular(),
            smallvec![Vec2::new(1.0, 0.0)],
            smallvec![Vec2::new(1.0, 0.0)],
            SeparationInfo::new(a, 0.0, Vec2::RIGHT, Vec2::ZERO),
        );
        let mut point = ContactConstraintPoint::new(Vec2::new(1.0, 0.0), Vec2::new(1.0, 0.0));
        point.a_to_contact = Vec2::new(1.0, 0.0);
        point.b_to_contact = Vec2::new(-1.0, 0.0);

        // B spins its left side downward: 2 x (-1, 0) = (0, -2)
        let rv = point.relative_velocity(&store, &contact);
        assert!((rv.x + 1.0).abs() < EPSILON);
        assert!((rv.y + 2.0).abs() < EPSILON);
    }
}
