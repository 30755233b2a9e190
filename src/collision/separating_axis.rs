use super::contact::SeparationInfo;
use crate::colliders::{CircleCollider, ColliderId, PolygonCollider};
use crate::math::Vec2;

/// Best separating face of `polygon_a` against `polygon_b`.
///
/// For every side of A, measures how far B's deepest vertex (along the side
/// normal) sits outside that side. The largest value wins: positive means a
/// separating axis exists, negative is the penetration depth.
pub fn find_polygon_polygon_separation(
    collider_a: ColliderId,
    polygon_a: &PolygonCollider,
    polygon_b: &PolygonCollider,
) -> SeparationInfo {
    let mut best_separation = f64::MIN;
    let mut best_index = 0;
    let mut best_point = Vec2::ZERO;

    for (i, side) in polygon_a.sides().iter().enumerate() {
        let axis = side.normal();
        let vertex_b = polygon_b.furthest_point(-axis);
        let separation = side.distance_to_point(vertex_b, true);
        if separation > best_separation {
            best_separation = separation;
            best_index = i;
            best_point = vertex_b;
        }
    }

    let side = polygon_a.sides()[best_index];
    SeparationInfo {
        collider: collider_a,
        separation: best_separation,
        axis: side.normal(),
        point: best_point,
        local_point: Some(polygon_b.transform().apply_inverse(best_point)),
        side: Some(side),
        local_side: Some(polygon_a.local_sides()[best_index]),
        side_id: Some(best_index),
    }
}

/// Minimum translation axis between a circle and a polygon, scaled by the
/// overlap, or `None` when some axis separates them.
///
/// The polygon's face normals are not enough for circles, so the axis from
/// the polygon's closest vertex to the circle center is tested as well.
pub fn find_circle_polygon_separation(circle: &CircleCollider, polygon: &PolygonCollider) -> Option<Vec2> {
    let center = circle.center();
    let mut axes = polygon.axes();

    let closest_vertex = polygon
        .world_points()
        .iter()
        .copied()
        .min_by(|a, b| a.distance_squared(center).total_cmp(&b.distance_squared(center)))?;
    axes.push((center - closest_vertex).normalize());

    let mut min_overlap = f64::MAX;
    let mut min_axis = Vec2::ZERO;
    for axis in axes {
        let overlap = polygon.project(axis).overlap(&circle.project(axis));
        if overlap <= 0.0 {
            return None;
        }
        if overlap < min_overlap {
            min_overlap = overlap;
            min_axis = axis;
        }
    }
    Some(min_axis * min_overlap)
}
