use crate::math::{BoundingBox, LineSegment, Projection, Ray, Transform, Vec2};

/// Bounds of an edge are padded so a flat edge never has a zero-height box.
const EDGE_BOUNDS_PADDING: f64 = 10.0;

/// A one-sided line collider, handy for ground and walls.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeCollider {
    pub begin: Vec2,
    pub end: Vec2,
    pub offset: Vec2,
    transform: Transform,
    world: LineSegment,
}

impl EdgeCollider {
    pub fn new(begin: Vec2, end: Vec2, offset: Vec2) -> Self {
        Self {
            begin,
            end,
            offset,
            transform: Transform::identity(),
            world: LineSegment::new(begin + offset, end + offset),
        }
    }

    pub fn update(&mut self, transform: &Transform) {
        self.transform = *transform;
        self.world = LineSegment::new(
            transform.apply(self.begin + self.offset),
            transform.apply(self.end + self.offset),
        );
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    /// The edge in world space.
    pub fn world_line(&self) -> LineSegment {
        self.world
    }

    /// The edge in the owner's body space.
    pub fn local_line(&self) -> LineSegment {
        LineSegment::new(self.begin + self.offset, self.end + self.offset)
    }

    pub fn center(&self) -> Vec2 {
        self.world.midpoint()
    }

    pub fn bounds(&self) -> BoundingBox {
        Self::padded_bounds(self.world)
    }

    pub fn local_bounds(&self) -> BoundingBox {
        Self::padded_bounds(self.local_line())
    }

    fn padded_bounds(line: LineSegment) -> BoundingBox {
        BoundingBox::new(
            line.begin.x.min(line.end.x),
            line.begin.y.min(line.end.y),
            line.begin.x.max(line.end.x),
            line.begin.y.max(line.end.y),
        )
        .pad(EDGE_BOUNDS_PADDING)
    }

    /// Edges have no interior.
    pub fn contains(&self, _point: Vec2) -> bool {
        false
    }

    /// Time of impact and the edge normal facing the ray.
    pub fn ray_cast(&self, ray: &Ray, max: f64) -> Option<(f64, Vec2)> {
        let toi = ray.intersect(&self.world)?;
        if toi > max {
            return None;
        }
        let normal = self.world.normal();
        let normal = if normal.dot(ray.dir) > 0.0 { -normal } else { normal };
        Some((toi, normal))
    }

    pub fn furthest_point(&self, direction: Vec2) -> Vec2 {
        if direction.dot(self.world.begin) >= direction.dot(self.world.end) {
            self.world.begin
        } else {
            self.world.end
        }
    }

    /// Both faces of the edge plus its direction.
    pub fn axes(&self) -> Vec<Vec2> {
        let normal = self.world.normal();
        let along = normal.normal();
        vec![normal, -normal, along, -along]
    }

    pub fn project(&self, axis: Vec2) -> Projection {
        let a = self.world.begin.dot(axis);
        let b = self.world.end.dot(axis);
        Projection::new(a.min(b), a.max(b))
    }

    /// A thin rod about its midpoint.
    pub fn inertia(&self, mass: f64) -> f64 {
        let half_length = self.begin.distance(self.end) / 2.0;
        mass * half_length * half_length
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    const EPSILON: f64 = 1e-10;

    fn ground() -> EdgeCollider {
        let mut edge = EdgeCollider::new(Vec2::new(-50.0, 0.0), Vec2::new(50.0, 0.0), Vec2::ZERO);
        edge.update(&Transform::new(Vec2::new(0.0, 100.0), 0.0));
        edge
    }

    #[test]
    fn test_edge_world_line_and_bounds() {
        let edge = ground();
        assert_eq!(edge.world_line().begin, Vec2::new(-50.0, 100.0));
        assert_eq!(edge.center(), Vec2::new(0.0, 100.0));
        let bb = edge.bounds();
        assert!((bb.height() - 20.0).abs() < EPSILON);
        assert!((bb.width() - 120.0).abs() < EPSILON);
        assert!(!bb.has_zero_dimensions());
    }

    #[test]
    fn test_edge_ray_cast_faces_ray() {
        let edge = ground();
        let ray = Ray::new(Vec2::new(0.0, 0.0), Vec2::new(0.0, 1.0));
        let (toi, normal) = edge.ray_cast(&ray, f64::INFINITY).unwrap();
        assert!((toi - 100.0).abs() < EPSILON);
        assert!(normal.dot(ray.dir) < 0.0);
        assert!(edge.ray_cast(&ray, 50.0).is_none());
    }

    #[test]
    fn test_edge_furthest_point_and_inertia() {
        let edge = ground();
        assert_eq!(edge.furthest_point(Vec2::new(1.0, 0.0)), Vec2::new(50.0, 100.0));
        assert_eq!(edge.furthest_point(Vec2::new(-1.0, 0.0)), Vec2::new(-50.0, 100.0));
        assert!((edge.inertia(2.0) - 5000.0).abs() < EPSILON);
        assert!(!edge.contains(edge.center()));
        assert_eq!(edge.axes().len(), 4);
    }
}
