// Defines an Axis-Aligned Bounding Box

use super::ray::Ray;
use super::transform::Transform;
use super::vec2::Vec2;

/// An Axis-Aligned Bounding Box. `top` is the smaller y value, `bottom` the larger.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl BoundingBox {
    /// Creates a new bounding box, sorting the edges so that right >= left and bottom >= top.
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        BoundingBox {
            left: left.min(right),
            top: top.min(bottom),
            right: left.max(right),
            bottom: top.max(bottom),
        }
    }

    /// Box of the given size centered on `center`.
    pub fn from_center(center: Vec2, width: f64, height: f64) -> Self {
        let half_w = width.abs() / 2.0;
        let half_h = height.abs() / 2.0;
        BoundingBox::new(center.x - half_w, center.y - half_h, center.x + half_w, center.y + half_h)
    }

    /// Creates a bounding box that encompasses a set of points.
    pub fn from_points(points: &[Vec2]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut bb = BoundingBox::new(first.x, first.y, first.x, first.y);
        for point in rest {
            bb.left = bb.left.min(point.x);
            bb.top = bb.top.min(point.y);
            bb.right = bb.right.max(point.x);
            bb.bottom = bb.bottom.max(point.y);
        }
        Some(bb)
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new((self.left + self.right) / 2.0, (self.top + self.bottom) / 2.0)
    }

    /// Perimeter, used as the surface-area heuristic by the dynamic tree.
    pub fn perimeter(&self) -> f64 {
        2.0 * (self.width() + self.height())
    }

    pub fn has_zero_dimensions(&self) -> bool {
        self.width() == 0.0 || self.height() == 0.0
    }

    /// Smallest box containing both boxes.
    pub fn combine(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }

    pub fn translate(&self, offset: Vec2) -> BoundingBox {
        BoundingBox {
            left: self.left + offset.x,
            top: self.top + offset.y,
            right: self.right + offset.x,
            bottom: self.bottom + offset.y,
        }
    }

    /// Grows every side by `amount`.
    pub fn pad(&self, amount: f64) -> BoundingBox {
        self.pad_sides(amount, amount, amount, amount)
    }

    pub fn pad_sides(&self, left: f64, top: f64, right: f64, bottom: f64) -> BoundingBox {
        BoundingBox {
            left: self.left - left,
            top: self.top - top,
            right: self.right + right,
            bottom: self.bottom + bottom,
        }
    }

    /// Inclusive point containment.
    pub fn contains_point(&self, point: Vec2) -> bool {
        self.left <= point.x && self.top <= point.y && self.bottom >= point.y && self.right >= point.x
    }

    /// True when `other` lies entirely inside this box (edges may touch).
    pub fn contains_box(&self, other: &BoundingBox) -> bool {
        self.left <= other.left
            && self.top <= other.top
            && other.bottom <= self.bottom
            && other.right <= self.right
    }

    /// Strict overlap test. Boxes that only touch do not overlap, and
    /// `epsilon` shrinks the tolerance further.
    pub fn overlaps(&self, other: &BoundingBox, epsilon: f64) -> bool {
        let combined = self.combine(other);
        combined.width() + epsilon < self.width() + other.width()
            && combined.height() + epsilon < self.height() + other.height()
    }

    /// Slab test against a ray. `far` bounds the hit distance along the ray.
    pub fn ray_cast(&self, ray: &Ray, far: f64) -> bool {
        let x_inv = if ray.dir.x == 0.0 { f64::MAX } else { 1.0 / ray.dir.x };
        let y_inv = if ray.dir.y == 0.0 { f64::MAX } else { 1.0 / ray.dir.y };

        let tx1 = (self.left - ray.pos.x) * x_inv;
        let tx2 = (self.right - ray.pos.x) * x_inv;
        let mut t_min = tx1.min(tx2);
        let mut t_max = tx1.max(tx2);

        let ty1 = (self.top - ray.pos.y) * y_inv;
        let ty2 = (self.bottom - ray.pos.y) * y_inv;
        t_min = t_min.max(ty1.min(ty2));
        t_max = t_max.min(ty1.max(ty2));

        t_max >= t_min.max(0.0) && t_min < far
    }

    /// Bounds of this box after transforming its four corners.
    pub fn transform(&self, transform: &Transform) -> BoundingBox {
        let corners = self.points().map(|p| transform.apply(p));
        // Four corners are never empty
        BoundingBox::from_points(&corners).unwrap_or(*self)
    }

    /// Corners in the order top-left, top-right, bottom-right, bottom-left.
    pub fn points(&self) -> [Vec2; 4] {
        [
            Vec2::new(self.left, self.top),
            Vec2::new(self.right, self.top),
            Vec2::new(self.right, self.bottom),
            Vec2::new(self.left, self.bottom),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;
    const EPSILON: f64 = 1e-10;

    #[test]
    fn test_bounding_box_new_sorts_edges() {
        let bb = BoundingBox::new(10.0, 5.0, -10.0, -5.0);
        assert_eq!(bb, BoundingBox::new(-10.0, -5.0, 10.0, 5.0));
        assert!((bb.width() - 20.0).abs() < EPSILON);
        assert!((bb.height() - 10.0).abs() < EPSILON);
        assert!((bb.perimeter() - 60.0).abs() < EPSILON);
        assert_eq!(bb.center(), Vec2::ZERO);
    }

    #[test]
    fn test_bounding_box_from_points() {
        assert!(BoundingBox::from_points(&[]).is_none());
        let bb = BoundingBox::from_points(&[
            Vec2::new(1.0, 4.0),
            Vec2::new(-2.0, 0.5),
            Vec2::new(3.0, -1.0),
        ])
        .unwrap();
        assert_eq!(bb, BoundingBox::new(-2.0, -1.0, 3.0, 4.0));
    }

    #[test]
    fn test_bounding_box_overlap_is_strict() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let touching = BoundingBox::new(10.0, 0.0, 20.0, 10.0);
        let overlapping = BoundingBox::new(9.0, 9.0, 20.0, 20.0);
        let apart = BoundingBox::new(11.0, 0.0, 20.0, 10.0);

        assert!(!a.overlaps(&touching, 0.0));
        assert!(a.overlaps(&overlapping, 0.0));
        assert!(overlapping.overlaps(&a, 0.0));
        assert!(!a.overlaps(&apart, 0.0));
        // One unit of overlap is not enough with a larger epsilon
        assert!(!a.overlaps(&overlapping, 1.5));
    }

    #[test]
    fn test_bounding_box_contains() {
        let outer = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        assert!(outer.contains_point(Vec2::new(10.0, 5.0)));
        assert!(!outer.contains_point(Vec2::new(10.1, 5.0)));
        assert!(outer.contains_box(&BoundingBox::new(1.0, 1.0, 9.0, 10.0)));
        assert!(!outer.contains_box(&BoundingBox::new(-1.0, 1.0, 9.0, 9.0)));
    }

    #[test]
    fn test_bounding_box_zero_dimensions() {
        assert!(BoundingBox::new(0.0, 0.0, 0.0, 5.0).has_zero_dimensions());
        assert!(!BoundingBox::new(0.0, 0.0, 1.0, 5.0).has_zero_dimensions());
    }

    #[test]
    fn test_bounding_box_pad_and_translate() {
        let bb = BoundingBox::new(0.0, 0.0, 2.0, 2.0).pad(1.0).translate(Vec2::new(5.0, 0.0));
        assert_eq!(bb, BoundingBox::new(4.0, -1.0, 8.0, 3.0));
    }

    #[test]
    fn test_bounding_box_ray_cast() {
        let bb = BoundingBox::new(10.0, -5.0, 20.0, 5.0);
        let ray = Ray::new(Vec2::ZERO, Vec2::new(1.0, 0.0));
        assert!(bb.ray_cast(&ray, f64::INFINITY));
        assert!(!bb.ray_cast(&ray, 5.0));

        let away = Ray::new(Vec2::ZERO, Vec2::new(-1.0, 0.0));
        assert!(!bb.ray_cast(&away, f64::INFINITY));

        let vertical = Ray::new(Vec2::new(15.0, -50.0), Vec2::new(0.0, 1.0));
        assert!(bb.ray_cast(&vertical, 100.0));
    }

    #[test]
    fn test_bounding_box_transform_rotation() {
        let bb = BoundingBox::new(-2.0, -1.0, 2.0, 1.0);
        let rotated = bb.transform(&Transform::new(Vec2::new(10.0, 0.0), PI / 2.0));
        assert!((rotated.width() - 2.0).abs() < EPSILON);
        assert!((rotated.height() - 4.0).abs() < EPSILON);
        assert!((rotated.center().x - 10.0).abs() < EPSILON);
    }
}
