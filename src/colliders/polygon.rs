use std::f64::consts::{PI, TAU};

use log::warn;

use crate::error::{CollisionError, Result};
use crate::math::{BoundingBox, LineSegment, Projection, Ray, Transform, Vec2};

/// A convex polygon collider. Points are stored counter-clockwise in the
/// polygon's own space; `offset` moves them within the owner's body space.
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonCollider {
    pub offset: Vec2,
    points: Vec<Vec2>,
    transform: Transform,
    world_points: Vec<Vec2>,
    sides: Vec<LineSegment>,
    local_sides: Vec<LineSegment>,
}

impl PolygonCollider {
    /// Creates a polygon, re-winding clockwise input to counter-clockwise.
    ///
    /// Fewer than 3 points is an error. Concave input is accepted with a
    /// warning; collisions against it are not reliable, so split it with
    /// [`PolygonCollider::triangulate`] first.
    pub fn new(points: Vec<Vec2>, offset: Vec2) -> Result<Self> {
        Self::build(points, offset, false)
    }

    /// Axis-aligned box of the given size centered on `offset`.
    pub fn rectangle(width: f64, height: f64, offset: Vec2) -> Self {
        let hw = width.abs() / 2.0;
        let hh = height.abs() / 2.0;
        let points = vec![
            Vec2::new(-hw, -hh),
            Vec2::new(hw, -hh),
            Vec2::new(hw, hh),
            Vec2::new(-hw, hh),
        ];
        Self::from_ordered_points(points, offset)
    }

    pub(crate) fn build(mut points: Vec<Vec2>, offset: Vec2, suppress_convex_warning: bool) -> Result<Self> {
        if points.len() < 3 {
            return Err(CollisionError::TooFewPoints(points.len()));
        }
        if signed_area(&points) < 0.0 {
            points.reverse();
        }
        if !suppress_convex_warning && !is_convex_loop(&points) {
            warn!(
                "Polygon collider with {} points is not convex, collisions will be unreliable. \
                 Use triangulate() to split it into convex pieces",
                points.len()
            );
        }
        Ok(Self::from_ordered_points(points, offset))
    }

    fn from_ordered_points(points: Vec<Vec2>, offset: Vec2) -> Self {
        let local_sides = sides_of(&points.iter().map(|p| *p + offset).collect::<Vec<_>>());
        let mut polygon = Self {
            offset,
            world_points: Vec::with_capacity(points.len()),
            sides: Vec::with_capacity(points.len()),
            points,
            transform: Transform::identity(),
            local_sides,
        };
        polygon.update(&Transform::identity());
        polygon
    }

    /// Recomputes world points and sides from the owner's transform.
    pub fn update(&mut self, transform: &Transform) {
        self.transform = *transform;
        self.world_points.clear();
        for p in &self.points {
            self.world_points.push(transform.apply(*p + self.offset));
        }
        self.sides = sides_of(&self.world_points);
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    pub fn world_points(&self) -> &[Vec2] {
        &self.world_points
    }

    /// World-space sides; side `i` runs from point `i` to point `i + 1`.
    pub fn sides(&self) -> &[LineSegment] {
        &self.sides
    }

    /// Sides in the owner's body space, indexed like [`sides`](Self::sides).
    pub fn local_sides(&self) -> &[LineSegment] {
        &self.local_sides
    }

    /// Index of the side whose outward normal best matches `direction`.
    pub fn find_side_index(&self, direction: Vec2) -> usize {
        let mut best = 0;
        let mut max_distance = f64::MIN;
        for (i, side) in self.sides.iter().enumerate() {
            let d = side.normal().dot(direction);
            if d > max_distance {
                best = i;
                max_distance = d;
            }
        }
        best
    }

    pub fn find_side(&self, direction: Vec2) -> LineSegment {
        self.sides[self.find_side_index(direction)]
    }

    /// Body-space counterpart of [`find_side`](Self::find_side).
    pub fn find_local_side(&self, direction: Vec2) -> LineSegment {
        self.local_sides[self.find_side_index(direction)]
    }

    /// Outward normals of the world sides.
    pub fn axes(&self) -> Vec<Vec2> {
        self.sides.iter().map(|s| s.normal()).collect()
    }

    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::from_points(&self.world_points)
            .unwrap_or_else(|| BoundingBox::new(0.0, 0.0, 0.0, 0.0).translate(self.transform.position))
    }

    pub fn local_bounds(&self) -> BoundingBox {
        BoundingBox::from_points(&self.points)
            .map(|bb| bb.translate(self.offset))
            .unwrap_or_else(|| BoundingBox::new(0.0, 0.0, 0.0, 0.0))
    }

    pub fn center(&self) -> Vec2 {
        self.bounds().center()
    }

    /// Even-odd ray parity test in body space.
    pub fn contains(&self, point: Vec2) -> bool {
        let local = self.transform.apply_inverse(point);
        let test_ray = Ray::new(local, Vec2::RIGHT);
        let crossings = self
            .local_sides
            .iter()
            .filter(|side| test_ray.intersect(side).is_some())
            .count();
        crossings % 2 == 1
    }

    pub fn ray_cast(&self, ray: &Ray, max: f64) -> Option<(f64, Vec2)> {
        let mut best: Option<(f64, Vec2)> = None;
        for side in &self.sides {
            if let Some(toi) = ray.intersect(side) {
                if toi <= max && best.map_or(true, |(t, _)| toi < t) {
                    best = Some((toi, side.normal()));
                }
            }
        }
        best
    }

    pub fn furthest_point(&self, direction: Vec2) -> Vec2 {
        furthest_of(&self.world_points, direction)
    }

    /// Support point in body space for a body-space direction.
    pub fn furthest_local_point(&self, direction: Vec2) -> Vec2 {
        furthest_of(&self.points, direction) + self.offset
    }

    pub fn project(&self, axis: Vec2) -> Projection {
        let mut min = f64::MAX;
        let mut max = f64::MIN;
        for p in &self.world_points {
            let s = p.dot(axis);
            min = min.min(s);
            max = max.max(s);
        }
        Projection::new(min, max)
    }

    /// Moment of inertia of a uniform polygon with the given mass.
    pub fn inertia(&self, mass: f64) -> f64 {
        let n = self.points.len();
        let mut numerator = 0.0;
        let mut denominator = 0.0;
        for i in 0..n {
            let p0 = self.points[i];
            let p1 = self.points[(i + 1) % n];
            let cross = p1.cross(p0);
            numerator += cross * (p0.dot(p0) + p0.dot(p1) + p1.dot(p1));
            denominator += cross;
        }
        if denominator == 0.0 {
            return 0.0;
        }
        (mass / 6.0) * (numerator / denominator)
    }

    pub fn is_convex(&self) -> bool {
        is_convex_loop(&self.points)
    }

    /// Splits the polygon into triangles by ear clipping. Works for concave
    /// simple polygons; the result is meant for a composite collider.
    pub fn triangulate(&self) -> Vec<PolygonCollider> {
        let mut remaining = self.points.clone();
        let mut triangles = Vec::with_capacity(remaining.len().saturating_sub(2));
        while remaining.len() > 3 {
            let n = remaining.len();
            let ear = find_ear(&remaining);
            let prev = (ear + n - 1) % n;
            let next = (ear + 1) % n;
            triangles.push(vec![remaining[prev], remaining[ear], remaining[next]]);
            remaining.remove(ear);
        }
        triangles.push(remaining);
        triangles
            .into_iter()
            .filter_map(|t| PolygonCollider::build(t, self.offset, true).ok())
            .collect()
    }

    /// Fan triangulation from the first point. Only correct for convex input.
    pub fn tessellate(&self) -> Vec<PolygonCollider> {
        let first = self.points[0];
        self.points
            .windows(2)
            .skip(1)
            .filter_map(|w| PolygonCollider::build(vec![first, w[0], w[1]], self.offset, true).ok())
            .collect()
    }
}

fn sides_of(points: &[Vec2]) -> Vec<LineSegment> {
    let n = points.len();
    (0..n)
        .map(|i| LineSegment::new(points[i], points[(i + 1) % n]))
        .collect()
}

fn furthest_of(points: &[Vec2], direction: Vec2) -> Vec2 {
    let mut best = points[0];
    let mut max_distance = f64::MIN;
    for p in points {
        let d = direction.dot(*p);
        if d > max_distance {
            max_distance = d;
            best = *p;
        }
    }
    best
}

/// Twice the signed area; positive for counter-clockwise loops.
fn signed_area(points: &[Vec2]) -> f64 {
    let n = points.len();
    (0..n).map(|i| points[i].cross(points[(i + 1) % n])).sum()
}

/// Walks the loop checking every turn has the same sign and that the turns
/// add up to exactly one revolution.
fn is_convex_loop(points: &[Vec2]) -> bool {
    let n = points.len();
    if n < 3 {
        return false;
    }
    let heading = |from: Vec2, to: Vec2| (to.y - from.y).atan2(to.x - from.x);

    let mut new_point = points[n - 1];
    let mut direction = heading(points[n - 2], new_point);
    let mut orientation = 0.0;
    let mut angle_sum = 0.0;
    for (i, &point) in points.iter().enumerate() {
        let old_point = new_point;
        let old_direction = direction;
        new_point = point;
        if old_point == new_point {
            return false; // repeated point
        }
        direction = heading(old_point, new_point);
        let mut angle = direction - old_direction;
        if angle <= -PI {
            angle += TAU;
        } else if angle > PI {
            angle -= TAU;
        }
        if i == 0 {
            if angle == 0.0 {
                return false;
            }
            orientation = angle.signum();
        } else if orientation * angle <= 0.0 {
            return false;
        }
        angle_sum += angle;
    }
    (angle_sum / TAU).round().abs() == 1.0
}

fn find_ear(points: &[Vec2]) -> usize {
    let n = points.len();
    let corner = |i: usize| (points[(i + n - 1) % n], points[i], points[(i + 1) % n]);
    let is_convex_corner = |i: usize| {
        let (a, b, c) = corner(i);
        (b - a).cross(c - b) >= 0.0
    };

    for i in 0..n {
        if !is_convex_corner(i) {
            continue;
        }
        let (a, b, c) = corner(i);
        let prev = (i + n - 1) % n;
        let next = (i + 1) % n;
        let blocked = (0..n)
            .filter(|&j| j != i && j != prev && j != next)
            .any(|j| point_in_triangle(points[j], a, b, c));
        if !blocked {
            return i;
        }
    }
    // Degenerate input, clip any convex corner to make progress
    (0..n).find(|&i| is_convex_corner(i)).unwrap_or(0)
}

fn point_in_triangle(p: Vec2, a: Vec2, b: Vec2, c: Vec2) -> bool {
    (b - a).cross(p - a) >= 0.0 && (c - b).cross(p - b) >= 0.0 && (a - c).cross(p - c) >= 0.0
}
