use crate::math::{BoundingBox, Projection, Ray, Transform, Vec2};

#[derive(Debug, Clone, PartialEq)]
pub struct CircleCollider {
    /// Radius before the owner's scale is applied.
    pub radius: f64,
    /// Center relative to the owner's origin, in body space.
    pub offset: Vec2,
    transform: Transform,
    center: Vec2,
}

impl CircleCollider {
    pub fn new(radius: f64, offset: Vec2) -> Self {
        let radius = radius.abs();
        Self {
            radius,
            offset,
            transform: Transform::identity(),
            center: offset,
        }
    }

    /// Refreshes the world-space center from the owner's transform.
    pub fn update(&mut self, transform: &Transform) {
        self.transform = *transform;
        self.center = transform.apply(self.offset);
    }

    /// Owner transform as of the last update.
    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn center(&self) -> Vec2 {
        self.center
    }

    /// Radius in world space, scaled by the smaller scale axis.
    pub fn world_radius(&self) -> f64 {
        let scale = self.transform.scale;
        self.radius * scale.x.abs().min(scale.y.abs())
    }

    pub fn bounds(&self) -> BoundingBox {
        let r = self.world_radius();
        BoundingBox::new(
            self.center.x - r,
            self.center.y - r,
            self.center.x + r,
            self.center.y + r,
        )
    }

    pub fn local_bounds(&self) -> BoundingBox {
        BoundingBox::new(
            self.offset.x - self.radius,
            self.offset.y - self.radius,
            self.offset.x + self.radius,
            self.offset.y + self.radius,
        )
    }

    pub fn contains(&self, point: Vec2) -> bool {
        self.center.distance(point) <= self.world_radius()
    }

    /// Nearest non-negative time of impact within `max`, with the surface normal there.
    pub fn ray_cast(&self, ray: &Ray, max: f64) -> Option<(f64, Vec2)> {
        let to_origin = ray.pos - self.center;
        let b = ray.dir.dot(to_origin);
        let r = self.world_radius();
        let discriminant = b * b - to_origin.magnitude_squared() + r * r;
        if discriminant < 0.0 {
            return None;
        }
        let root = discriminant.sqrt();
        let near = -b - root;
        let far = -b + root;
        let toi = if near >= 0.0 {
            near
        } else if far >= 0.0 {
            far
        } else {
            return None;
        };
        if toi > max {
            return None;
        }
        let normal = (ray.point_at(toi) - self.center).normalize();
        Some((toi, normal))
    }

    pub fn furthest_point(&self, direction: Vec2) -> Vec2 {
        self.center + direction.normalize() * self.world_radius()
    }

    pub fn project(&self, axis: Vec2) -> Projection {
        let c = self.center.dot(axis);
        let r = self.world_radius();
        Projection::new(c - r, c + r)
    }

    pub fn inertia(&self, mass: f64) -> f64 {
        let r = self.world_radius();
        mass * r * r / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    const EPSILON: f64 = 1e-10;

    #[test]
    fn test_circle_update_and_bounds() {
        let mut c = CircleCollider::new(5.0, Vec2::new(1.0, 0.0));
        c.update(&Transform::new(Vec2::new(10.0, 10.0), std::f64::consts::PI / 2.0));
        // Offset is rotated with the owner
        assert!((c.center().x - 10.0).abs() < EPSILON);
        assert!((c.center().y - 11.0).abs() < EPSILON);
        let bb = c.bounds();
        assert!((bb.width() - 10.0).abs() < EPSILON);
        assert!((bb.left - 5.0).abs() < EPSILON);
    }

    #[test]
    fn test_circle_scaled_radius() {
        let mut c = CircleCollider::new(10.0, Vec2::ZERO);
        c.update(&Transform::identity().with_scale(Vec2::new(2.0, 0.5)));
        assert!((c.world_radius() - 5.0).abs() < EPSILON);
        assert!((c.inertia(2.0) - 25.0).abs() < EPSILON);
    }

    #[test]
    fn test_circle_contains_and_project() {
        let c = CircleCollider::new(2.0, Vec2::ZERO);
        assert!(c.contains(Vec2::new(2.0, 0.0)));
        assert!(!c.contains(Vec2::new(2.0, 0.1)));
        let p = c.project(Vec2::new(0.0, 1.0));
        assert!((p.min - -2.0).abs() < EPSILON);
        assert!((p.max - 2.0).abs() < EPSILON);
    }

    #[test]
    fn test_circle_ray_cast() {
        let mut c = CircleCollider::new(1.0, Vec2::ZERO);
        c.update(&Transform::new(Vec2::new(5.0, 0.0), 0.0));

        let ray = Ray::new(Vec2::ZERO, Vec2::new(1.0, 0.0));
        let (toi, normal) = c.ray_cast(&ray, f64::INFINITY).unwrap();
        assert!((toi - 4.0).abs() < EPSILON);
        assert!((normal.x - -1.0).abs() < EPSILON);

        assert!(c.ray_cast(&ray, 3.0).is_none());
        let miss = Ray::new(Vec2::new(0.0, 2.0), Vec2::new(1.0, 0.0));
        assert!(c.ray_cast(&miss, f64::INFINITY).is_none());
    }

    #[test]
    fn test_circle_furthest_point() {
        let c = CircleCollider::new(3.0, Vec2::ZERO);
        let p = c.furthest_point(Vec2::new(0.0, -10.0));
        assert!((p.y - -3.0).abs() < EPSILON);
    }
}
