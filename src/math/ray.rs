use super::line_segment::LineSegment;
use super::vec2::Vec2;

/// A half line starting at `pos` heading along the normalized `dir`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub pos: Vec2,
    pub dir: Vec2,
}

impl Ray {
    /// Creates a ray, normalizing the direction.
    pub fn new(pos: Vec2, dir: Vec2) -> Self {
        Self {
            pos,
            dir: dir.normalize(),
        }
    }

    /// Distance along the ray to where it crosses `segment`, if it does.
    pub fn intersect(&self, segment: &LineSegment) -> Option<f64> {
        let numerator = segment.begin - self.pos;
        let slope = segment.normalized_direction();
        let divisor = self.dir.cross(slope);
        if divisor == 0.0 {
            return None; // Parallel
        }

        let t = numerator.cross(slope) / divisor;
        if t < 0.0 {
            return None;
        }

        let u = numerator.cross(self.dir) / divisor / segment.length();
        if (0.0..=1.0).contains(&u) {
            Some(t)
        } else {
            None
        }
    }

    pub fn point_at(&self, t: f64) -> Vec2 {
        self.pos + self.dir * t
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    const EPSILON: f64 = 1e-10;

    #[test]
    fn test_ray_intersect_segment() {
        let ray = Ray::new(Vec2::ZERO, Vec2::new(2.0, 0.0));
        assert!((ray.dir.magnitude() - 1.0).abs() < EPSILON);

        let wall = LineSegment::new(Vec2::new(5.0, -1.0), Vec2::new(5.0, 1.0));
        let t = ray.intersect(&wall).unwrap();
        assert!((t - 5.0).abs() < EPSILON);
        assert_eq!(ray.point_at(t), Vec2::new(5.0, 0.0));
    }

    #[test]
    fn test_ray_misses() {
        let ray = Ray::new(Vec2::ZERO, Vec2::new(1.0, 0.0));
        // Behind the origin
        let behind = LineSegment::new(Vec2::new(-5.0, -1.0), Vec2::new(-5.0, 1.0));
        assert!(ray.intersect(&behind).is_none());
        // Off the end of the segment
        let short = LineSegment::new(Vec2::new(5.0, 1.0), Vec2::new(5.0, 3.0));
        assert!(ray.intersect(&short).is_none());
        // Parallel
        let parallel = LineSegment::new(Vec2::new(0.0, 1.0), Vec2::new(5.0, 1.0));
        assert!(ray.intersect(&parallel).is_none());
    }
}
