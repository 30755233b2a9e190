//! Narrowphase dispatch: exact contact generation per pair of leaf shapes.

use smallvec::smallvec;

use super::contact::{CollisionContact, SeparationInfo};
use super::separating_axis::{find_circle_polygon_separation, find_polygon_polygon_separation};
use crate::colliders::{
    CircleCollider, Collider, ColliderArena, ColliderShape, EdgeCollider, PolygonCollider,
};
use crate::error::{CollisionError, Result};
use crate::math::{LineSegment, Transform, Vec2};

/// How far the edge is extruded into a solid quad for polygon-edge tests.
const EDGE_EXTRUSION: f64 = 100.0;
/// Separations closer than this pick the same reference polygon either way.
const FACE_TIE_TOLERANCE: f64 = 1e-6;

/// Collides two leaf colliders. Circles are always reported as collider A
/// against polygons and edges, and polygons as A against edges.
pub fn collide(a: &Collider, b: &Collider) -> Result<Vec<CollisionContact>> {
    use ColliderShape::*;

    let contact = match (&a.shape, &b.shape) {
        (Circle(ca), Circle(cb)) => collide_circle_circle(a, ca, b, cb),
        (Circle(c), Polygon(p)) => collide_circle_polygon(a, c, b, p),
        (Polygon(p), Circle(c)) => collide_circle_polygon(b, c, a, p),
        (Circle(c), Edge(e)) => collide_circle_edge(a, c, b, e),
        (Edge(e), Circle(c)) => collide_circle_edge(b, c, a, e),
        (Polygon(pa), Polygon(pb)) => collide_polygon_polygon(a, pa, b, pb),
        (Polygon(p), Edge(e)) => collide_polygon_edge(a, p, b, e),
        (Edge(e), Polygon(p)) => collide_polygon_edge(b, p, a, e),
        // Edges never collide with each other
        (Edge(_), Edge(_)) => None,
        (Composite(_), _) | (_, Composite(_)) => {
            return Err(CollisionError::UnsupportedPair {
                a: a.shape.kind_name(),
                b: b.shape.kind_name(),
            })
        }
    };
    Ok(contact.into_iter().collect())
}

fn collide_circle_circle(
    a: &Collider,
    circle_a: &CircleCollider,
    b: &Collider,
    circle_b: &CircleCollider,
) -> Option<CollisionContact> {
    let pos_a = circle_a.center();
    let pos_b = circle_b.center();
    let combined_radius = circle_a.world_radius() + circle_b.world_radius();
    let distance = pos_a.distance(pos_b);
    if distance > combined_radius {
        return None;
    }

    let separation = combined_radius - distance;
    let normal = (pos_b - pos_a).normalize();
    let point = circle_a.furthest_point(normal);
    let local = circle_a.transform().apply_inverse(point);

    let mut info = SeparationInfo::new(a.id, separation, normal, point);
    info.local_point = Some(local);
    Some(CollisionContact::new(
        a,
        b,
        normal * separation,
        normal,
        normal.perpendicular(),
        smallvec![point],
        smallvec![local],
        info,
    ))
}

fn collide_circle_polygon(
    circle_collider: &Collider,
    circle: &CircleCollider,
    polygon_collider: &Collider,
    polygon: &PolygonCollider,
) -> Option<CollisionContact> {
    let mut min_axis = find_circle_polygon_separation(circle, polygon)?;
    // Point the axis from the circle toward the polygon
    if min_axis.dot(polygon.center() - circle.center()) < 0.0 {
        min_axis = -min_axis;
    }

    let point = circle.furthest_point(min_axis);
    let local = circle.transform().apply_inverse(point);
    let normal = min_axis.normalize();
    let side_index = polygon.find_side_index(-normal);

    let info = SeparationInfo {
        collider: circle_collider.id,
        separation: -min_axis.magnitude(),
        axis: normal,
        point,
        local_point: Some(local),
        side: Some(polygon.sides()[side_index]),
        local_side: Some(polygon.local_sides()[side_index]),
        side_id: Some(side_index),
    };
    Some(CollisionContact::new(
        circle_collider,
        polygon_collider,
        min_axis,
        normal,
        normal.perpendicular(),
        smallvec![point],
        smallvec![local],
        info,
    ))
}

/// Point-segment distance split into three regions: before `begin`, past
/// `end`, and alongside the span.
fn collide_circle_edge(
    circle_collider: &Collider,
    circle: &CircleCollider,
    edge_collider: &Collider,
    edge: &EdgeCollider,
) -> Option<CollisionContact> {
    let center = circle.center();
    let radius = circle.world_radius();
    let line = edge.world_line();
    let local_line = edge.local_line();
    let edge_tx = edge.transform();

    let e = line.end - line.begin;
    let u = e.dot(line.end - center);
    let v = e.dot(center - line.begin);

    let endpoint_contact = |endpoint: Vec2| -> Option<CollisionContact> {
        let d = endpoint - center;
        let dd = d.dot(d);
        if dd > radius * radius {
            return None;
        }
        let normal = d.normalize();
        let separation = radius - dd.sqrt();
        let local = edge_tx.apply_inverse(endpoint);
        let mut info = SeparationInfo::new(circle_collider.id, separation, normal, endpoint);
        info.side = Some(line);
        info.local_side = Some(local_line);
        Some(CollisionContact::new(
            circle_collider,
            edge_collider,
            normal * separation,
            normal,
            normal.perpendicular(),
            smallvec![endpoint],
            smallvec![local],
            info,
        ))
    };

    if v <= 0.0 {
        return endpoint_contact(line.begin);
    }
    if u <= 0.0 {
        return endpoint_contact(line.end);
    }

    let den = e.dot(e);
    let point_on_edge = (line.begin * u + line.end * v) * (1.0 / den);
    let d = center - point_on_edge;
    let dd = d.dot(d);
    if dd > radius * radius {
        return None;
    }

    // Edge normal facing the circle, then flipped so it runs from A to B
    let mut edge_normal = e.perpendicular();
    if edge_normal.dot(center - line.begin) < 0.0 {
        edge_normal = -edge_normal;
    }
    let normal = -edge_normal.normalize();
    let separation = radius - dd.sqrt();
    let local = edge_tx.apply_inverse(point_on_edge);

    let mut info = SeparationInfo::new(circle_collider.id, separation, normal, point_on_edge);
    info.side = Some(line);
    info.local_side = Some(local_line);
    Some(CollisionContact::new(
        circle_collider,
        edge_collider,
        normal * separation,
        normal,
        normal.perpendicular(),
        smallvec![point_on_edge],
        smallvec![local],
        info,
    ))
}

/// Reference/incident face clipping.
fn collide_polygon_polygon(
    a: &Collider,
    polygon_a: &PolygonCollider,
    b: &Collider,
    polygon_b: &PolygonCollider,
) -> Option<CollisionContact> {
    let separation_a = find_polygon_polygon_separation(a.id, polygon_a, polygon_b);
    if separation_a.separation > 0.0 {
        return None;
    }
    let separation_b = find_polygon_polygon_separation(b.id, polygon_b, polygon_a);
    if separation_b.separation > 0.0 {
        return None;
    }

    // Near ties go to the lower collider id so the reference face does not
    // flip between frames or with pair order
    let a_is_reference = if (separation_a.separation - separation_b.separation).abs() <= FACE_TIE_TOLERANCE {
        a.id < b.id
    } else {
        separation_a.separation > separation_b.separation
    };
    let (separation, other) = if a_is_reference {
        (separation_a, polygon_b)
    } else {
        (separation_b, polygon_a)
    };
    let reference = separation.side?;
    let incident = other.find_side(-separation.axis);

    let ref_dir = reference.normalized_direction();
    let clip_right = incident.clip(-ref_dir, -ref_dir.dot(reference.begin))?;
    let clip_left = clip_right.clip(ref_dir, ref_dir.dot(reference.end))?;

    let points: smallvec::SmallVec<[Vec2; 2]> = clip_left
        .points()
        .into_iter()
        .filter(|p| reference.below(*p))
        .collect();
    if points.is_empty() {
        return None;
    }

    let mut normal = separation.axis;
    if (polygon_b.center() - polygon_a.center()).dot(normal) < 0.0 {
        normal = -normal;
    }

    // Local points live on the incident body
    let incident_tx = if separation.collider == a.id {
        polygon_b.transform()
    } else {
        polygon_a.transform()
    };
    let local_points = points.iter().map(|p| incident_tx.apply_inverse(*p)).collect();

    Some(CollisionContact::new(
        a,
        b,
        normal * -separation.separation,
        normal,
        normal.perpendicular(),
        points,
        local_points,
        separation,
    ))
}

/// Extrudes the edge into a quad pointing away from the polygon and reuses
/// the polygon-polygon test. The quad stands in for the edge's collider.
fn collide_polygon_edge(
    polygon_collider: &Collider,
    polygon: &PolygonCollider,
    edge_collider: &Collider,
    edge: &EdgeCollider,
) -> Option<CollisionContact> {
    let dir = (edge.center() - polygon.center()).normalize();
    let edge_tx = edge.transform();
    let local_dir = edge_tx.apply_inverse_direction(dir).normalize() * EDGE_EXTRUSION;
    let local = edge.local_line();

    let mut quad = PolygonCollider::build(
        vec![local.begin, local.end, local.end + local_dir, local.begin + local_dir],
        Vec2::ZERO,
        true,
    )
    .ok()?;
    quad.update(&edge_tx);

    let quad_collider = Collider {
        id: edge_collider.id,
        owner: edge_collider.owner,
        composite: edge_collider.composite,
        shape: ColliderShape::Polygon(quad),
    };
    let ColliderShape::Polygon(quad) = &quad_collider.shape else {
        return None;
    };
    collide_polygon_polygon(polygon_collider, polygon, &quad_collider, quad)
}

/// Signed separation of a contact point recomputed from the bodies' current
/// transforms. Negative means still overlapping.
pub fn find_contact_separation(
    colliders: &ColliderArena,
    contact: &CollisionContact,
    local_point: Vec2,
    tx_a: &Transform,
    tx_b: &Transform,
) -> f64 {
    use ColliderShape::*;

    let (Some(a), Some(b)) = (colliders.get(contact.collider_a), colliders.get(contact.collider_b)) else {
        return 0.0;
    };
    let info = &contact.info;

    match (&a.shape, &b.shape) {
        (Circle(ca), Circle(cb)) => {
            let combined_radius = ca.world_radius() + cb.world_radius();
            let distance = tx_a.apply(ca.offset).distance(tx_b.apply(cb.offset));
            -(combined_radius - distance)
        }
        (Polygon(_), Polygon(_)) => {
            let Some(local_side) = info.local_side else {
                return 0.0;
            };
            let (side, world_point) = if info.collider == a.id {
                (transform_side(tx_a, local_side), tx_b.apply(local_point))
            } else {
                (transform_side(tx_b, local_side), tx_a.apply(local_point))
            };
            side.distance_to_point(world_point, true)
        }
        (Circle(_), Polygon(_)) | (Polygon(_), Circle(_)) => {
            let world_point = tx_a.apply(local_point);
            info.side
                .map(|side| side.distance_to_point(world_point, true))
                .unwrap_or(0.0)
        }
        (Polygon(_), Edge(_)) | (Edge(_), Polygon(_)) => {
            let world_point = if info.collider == a.id {
                tx_b.apply(local_point)
            } else {
                tx_a.apply(local_point)
            };
            info.side
                .map(|side| side.distance_to_point(world_point, true))
                .unwrap_or(0.0)
        }
        (Circle(circle), Edge(_)) => {
            if info.side.is_none() {
                return 0.0;
            }
            let world_point = tx_b.apply(local_point);
            let circle_point = circle.furthest_point(contact.normal);
            let distance = world_point.distance(circle_point);
            if distance > 0.0 {
                -distance
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}

fn transform_side(tx: &Transform, side: LineSegment) -> LineSegment {
    LineSegment::new(tx.apply(side.begin), tx.apply(side.end))
}
