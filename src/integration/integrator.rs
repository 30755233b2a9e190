use crate::math::Vec2;
use crate::objects::body::DegreeOfFreedom;
use crate::world::store::EntityStore;

/// Integrates every awake, non-fixed body forward in time using Semi-Implicit Euler.
///
/// Each body's pre-integration transform is captured first so the fast-body
/// sweep can tell how far it travelled. Colliders are resynced at the end.
///
/// # Arguments
/// * `gravity` - Added to the acceleration of bodies with `use_gravity`.
/// * `elapsed_ms` - Step length in milliseconds.
pub fn integrate(store: &mut EntityStore, gravity: Vec2, elapsed_ms: f64) {
    let seconds = elapsed_ms / 1000.0;
    let ids: Vec<_> = store.ids().collect();
    for id in ids {
        integrate_entity(store, id, gravity, seconds);
    }
    store.sync_all();
}

fn integrate_entity(store: &mut EntityStore, id: crate::world::store::EntityId, gravity: Vec2, seconds: f64) {
    if !store.is_active(id) {
        return;
    }
    let Some(global) = store.transform(id) else {
        return;
    };
    let inverse_inertia = store.inverse_inertia(id);
    let Some((body, motion)) = store.body_and_motion_mut(id) else {
        return;
    };
    body.capture_old_transform(&global);
    if body.is_fixed() || body.sleeping {
        return;
    }
    let locks = body.limit_degree_of_freedom;

    // --- Linear Motion --- //
    let mut acceleration = motion.acc;
    if body.use_gravity {
        acceleration += gravity;
    }
    motion.vel += acceleration * seconds;
    if locks.contains(DegreeOfFreedom::X) {
        motion.vel.x = 0.0;
    }
    if locks.contains(DegreeOfFreedom::Y) {
        motion.vel.y = 0.0;
    }
    let position = global.position + motion.vel * seconds;

    // --- Angular Motion --- //
    let mut rotation = global.rotation;
    if locks.contains(DegreeOfFreedom::ROTATION) {
        motion.angular_velocity = 0.0;
    } else {
        motion.angular_velocity += motion.torque * inverse_inertia * seconds;
        rotation = wrap_angle(rotation + motion.angular_velocity * seconds);
    }

    let Some(entity) = store.entity(id) else {
        return;
    };
    let transform = entity.transform;
    store.transforms.set_global_position(transform, position);
    store.transforms.set_global_rotation(transform, rotation);
}

/// Wraps an angle in radians to the range [-PI, PI].
fn wrap_angle(angle: f64) -> f64 {
    angle.sin().atan2(angle.cos())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colliders::CircleCollider;
    use crate::math::Transform;
    use crate::objects::body::{Body, CollisionType};
    use std::f64::consts::PI;
    const EPSILON: f64 = 1e-9;

    fn body_entity(store: &mut EntityStore, collision_type: CollisionType) -> crate::world::store::EntityId {
        let e = store.add_entity(Transform::identity(), None);
        store.attach_body(e, Body::new(collision_type)).unwrap();
        store.attach_collider(e, CircleCollider::new(1.0, Vec2::ZERO)).unwrap();
        e
    }

    #[test]
    fn test_integrate_linear_motion_no_force() {
        let mut store = EntityStore::new();
        let e = body_entity(&mut store, CollisionType::Active);
        store.motion_mut(e).unwrap().vel = Vec2::new(10.0, -5.0);

        integrate(&mut store, Vec2::ZERO, 100.0);

        let p = store.position(e).unwrap();
        assert!((p.x - 1.0).abs() < EPSILON);
        assert!((p.y - -0.5).abs() < EPSILON);
        assert_eq!(store.motion(e).unwrap().vel, Vec2::new(10.0, -5.0));
        // Collider follows the body
        assert!((store.center(e).x - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_integrate_gravity_and_acceleration() {
        let mut store = EntityStore::new();
        let e = body_entity(&mut store, CollisionType::Active);
        store.motion_mut(e).unwrap().acc = Vec2::new(5.0, 0.0);

        integrate(&mut store, Vec2::new(0.0, 10.0), 100.0);

        // v = (5, 10) * 0.1, p = v * 0.1
        let motion = store.motion(e).unwrap();
        assert!((motion.vel.x - 0.5).abs() < EPSILON);
        assert!((motion.vel.y - 1.0).abs() < EPSILON);
        let p = store.position(e).unwrap();
        assert!((p.x - 0.05).abs() < EPSILON);
        assert!((p.y - 0.1).abs() < EPSILON);

        store.body_mut(e).unwrap().use_gravity = false;
        store.motion_mut(e).unwrap().vel = Vec2::ZERO;
        store.motion_mut(e).unwrap().acc = Vec2::ZERO;
        integrate(&mut store, Vec2::new(0.0, 10.0), 100.0);
        assert_eq!(store.motion(e).unwrap().vel, Vec2::ZERO);
    }

    #[test]
    fn test_integrate_angular_motion_constant_torque() {
        let mut store = EntityStore::new();
        let e = body_entity(&mut store, CollisionType::Active);
        store.motion_mut(e).unwrap().torque = 5.0;
        let expected_alpha = 5.0 * store.inverse_inertia(e);
        assert!(expected_alpha > 0.0);

        integrate(&mut store, Vec2::ZERO, 100.0);

        assert!((store.motion(e).unwrap().angular_velocity - expected_alpha * 0.1).abs() < EPSILON);
        assert!((store.transform(e).unwrap().rotation - expected_alpha * 0.01).abs() < EPSILON);
    }

    #[test]
    fn test_integrate_skips_fixed_and_sleeping() {
        let mut store = EntityStore::new();
        let fixed = body_entity(&mut store, CollisionType::Fixed);
        store.motion_mut(fixed).unwrap().vel = Vec2::new(1.0, 1.0);
        let sleeper = body_entity(&mut store, CollisionType::Active);
        store.set_sleeping(sleeper, true);

        integrate(&mut store, Vec2::new(0.0, 100.0), 100.0);

        assert_eq!(store.position(fixed).unwrap(), Vec2::ZERO);
        assert_eq!(store.position(sleeper).unwrap(), Vec2::ZERO);
        assert_eq!(store.motion(sleeper).unwrap().vel, Vec2::ZERO);
    }

    #[test]
    fn test_integrate_honors_locked_axes() {
        let mut store = EntityStore::new();
        let e = body_entity(&mut store, CollisionType::Active);
        store.body_mut(e).unwrap().limit_degree_of_freedom = DegreeOfFreedom::Y | DegreeOfFreedom::ROTATION;
        let motion = store.motion_mut(e).unwrap();
        motion.vel = Vec2::new(10.0, 10.0);
        motion.angular_velocity = 3.0;

        integrate(&mut store, Vec2::new(0.0, 50.0), 100.0);

        let p = store.position(e).unwrap();
        assert!((p.x - 1.0).abs() < EPSILON);
        assert_eq!(p.y, 0.0);
        assert_eq!(store.transform(e).unwrap().rotation, 0.0);
    }

    #[test]
    fn test_integrate_captures_old_transform() {
        let mut store = EntityStore::new();
        let e = body_entity(&mut store, CollisionType::Active);
        store.set_position(e, Vec2::new(3.0, 4.0)).unwrap();
        store.motion_mut(e).unwrap().vel = Vec2::new(10.0, 0.0);

        integrate(&mut store, Vec2::ZERO, 100.0);

        let body = store.body(e).unwrap();
        assert_eq!(body.old_pos, Vec2::new(3.0, 4.0));
        assert!((store.position(e).unwrap().x - 4.0).abs() < EPSILON);
    }

    #[test]
    fn test_wrap_angle() {
        assert!((wrap_angle(0.0) - 0.0).abs() < EPSILON);
        assert!((wrap_angle(PI) - PI).abs() < EPSILON);
        assert!((wrap_angle(PI + 0.1) - (-PI + 0.1)).abs() < EPSILON);
        assert!((wrap_angle(-PI - 0.1) - (PI - 0.1)).abs() < EPSILON);
        assert!((wrap_angle(2.0 * PI) - 0.0).abs() < EPSILON);
    }
}
