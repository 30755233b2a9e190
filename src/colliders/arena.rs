use std::ops::{Index, IndexMut};

use super::{Collider, ColliderId, ColliderShape, CompositeCollider, RayCastHit};
use crate::collision::contact::CollisionContact;
use crate::collision::jump_table;
use crate::error::Result;
use crate::math::{BoundingBox, Projection, Ray, Transform, Vec2};
use crate::world::store::EntityId;

/// Append-only storage for every collider in a world.
///
/// Composites hold child ids rather than owning their children, so the
/// broadphase can track children individually while the composite stays
/// addressable as one shape.
#[derive(Debug, Clone, Default)]
pub struct ColliderArena {
    colliders: Vec<Collider>,
}

impl ColliderArena {
    pub fn new() -> Self {
        Self { colliders: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }

    pub fn get(&self, id: ColliderId) -> Option<&Collider> {
        self.colliders.get(id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Collider> {
        self.colliders.iter()
    }

    pub fn insert(&mut self, shape: impl Into<ColliderShape>) -> ColliderId {
        self.push(shape.into(), None)
    }

    /// Inserts a composite and its children. A composite passed as a child
    /// is flattened into the new composite.
    pub fn insert_composite(&mut self, children: Vec<ColliderShape>) -> ColliderId {
        let parent = self.push(ColliderShape::Composite(CompositeCollider::default()), None);
        let mut ids = Vec::with_capacity(children.len());
        for shape in children {
            match shape {
                ColliderShape::Composite(nested) => {
                    for child in nested.children {
                        if let Some(c) = self.colliders.get_mut(child.0) {
                            c.composite = Some(parent);
                            ids.push(child);
                        }
                    }
                }
                leaf => ids.push(self.push(leaf, Some(parent))),
            }
        }
        if let ColliderShape::Composite(composite) = &mut self.colliders[parent.0].shape {
            composite.children = ids;
        }
        parent
    }

    fn push(&mut self, shape: ColliderShape, composite: Option<ColliderId>) -> ColliderId {
        let id = ColliderId(self.colliders.len());
        self.colliders.push(Collider {
            id,
            owner: None,
            composite,
            shape,
        });
        id
    }

    fn children(&self, id: ColliderId) -> Option<Vec<ColliderId>> {
        match &self.colliders[id.0].shape {
            ColliderShape::Composite(c) => Some(c.children.clone()),
            _ => None,
        }
    }

    /// Sets the owner of a collider and, for composites, all of its children.
    pub fn set_owner(&mut self, id: ColliderId, owner: Option<EntityId>) {
        self.colliders[id.0].owner = owner;
        if let Some(children) = self.children(id) {
            for child in children {
                self.set_owner(child, owner);
            }
        }
    }

    /// Recomputes world geometry from the owner's global transform.
    pub fn update(&mut self, id: ColliderId, transform: &Transform) {
        match &mut self.colliders[id.0].shape {
            ColliderShape::Circle(c) => c.update(transform),
            ColliderShape::Polygon(p) => p.update(transform),
            ColliderShape::Edge(e) => e.update(transform),
            ColliderShape::Composite(c) => {
                c.transform = *transform;
                let children = c.children.clone();
                for child in children {
                    self.update(child, transform);
                }
            }
        }
    }

    /// Leaf colliders under `id`, or `id` itself for a leaf.
    pub fn flatten(&self, id: ColliderId) -> Vec<ColliderId> {
        let mut leaves = Vec::new();
        self.flatten_into(id, &mut leaves);
        leaves
    }

    fn flatten_into(&self, id: ColliderId, leaves: &mut Vec<ColliderId>) {
        match &self.colliders[id.0].shape {
            ColliderShape::Composite(c) => {
                for child in &c.children {
                    self.flatten_into(*child, leaves);
                }
            }
            _ => leaves.push(id),
        }
    }

    pub fn bounds(&self, id: ColliderId) -> BoundingBox {
        match &self.colliders[id.0].shape {
            ColliderShape::Circle(c) => c.bounds(),
            ColliderShape::Polygon(p) => p.bounds(),
            ColliderShape::Edge(e) => e.bounds(),
            ColliderShape::Composite(c) => c
                .children
                .iter()
                .map(|child| self.bounds(*child))
                .reduce(|acc, bb| acc.combine(&bb))
                .unwrap_or_else(|| empty_box_at(c.transform.position)),
        }
    }

    pub fn local_bounds(&self, id: ColliderId) -> BoundingBox {
        match &self.colliders[id.0].shape {
            ColliderShape::Circle(c) => c.local_bounds(),
            ColliderShape::Polygon(p) => p.local_bounds(),
            ColliderShape::Edge(e) => e.local_bounds(),
            ColliderShape::Composite(c) => c
                .children
                .iter()
                .map(|child| self.local_bounds(*child))
                .reduce(|acc, bb| acc.combine(&bb))
                .unwrap_or_else(|| empty_box_at(Vec2::ZERO)),
        }
    }

    pub fn center(&self, id: ColliderId) -> Vec2 {
        match &self.colliders[id.0].shape {
            ColliderShape::Circle(c) => c.center(),
            ColliderShape::Polygon(p) => p.center(),
            ColliderShape::Edge(e) => e.center(),
            ColliderShape::Composite(c) => c.transform.position,
        }
    }

    pub fn contains(&self, id: ColliderId, point: Vec2) -> bool {
        match &self.colliders[id.0].shape {
            ColliderShape::Circle(c) => c.contains(point),
            ColliderShape::Polygon(p) => p.contains(point),
            ColliderShape::Edge(e) => e.contains(point),
            ColliderShape::Composite(c) => c.children.iter().any(|child| self.contains(*child, point)),
        }
    }

    /// Nearest hit within `max`. Composites report their nearest child.
    pub fn ray_cast(&self, id: ColliderId, ray: &Ray, max: f64) -> Option<RayCastHit> {
        let collider = &self.colliders[id.0];
        let leaf_hit = match &collider.shape {
            ColliderShape::Circle(c) => c.ray_cast(ray, max),
            ColliderShape::Polygon(p) => p.ray_cast(ray, max),
            ColliderShape::Edge(e) => e.ray_cast(ray, max),
            ColliderShape::Composite(c) => {
                return c
                    .children
                    .iter()
                    .filter_map(|child| self.ray_cast(*child, ray, max))
                    .min_by(|a, b| a.distance.total_cmp(&b.distance));
            }
        };
        leaf_hit.map(|(distance, normal)| RayCastHit {
            collider: id,
            owner: collider.owner,
            distance,
            point: ray.point_at(distance),
            normal,
        })
    }

    pub fn furthest_point(&self, id: ColliderId, direction: Vec2) -> Vec2 {
        match &self.colliders[id.0].shape {
            ColliderShape::Circle(c) => c.furthest_point(direction),
            ColliderShape::Polygon(p) => p.furthest_point(direction),
            ColliderShape::Edge(e) => e.furthest_point(direction),
            ColliderShape::Composite(c) => c
                .children
                .iter()
                .map(|child| self.furthest_point(*child, direction))
                .max_by(|a, b| a.dot(direction).total_cmp(&b.dot(direction)))
                .unwrap_or(c.transform.position),
        }
    }

    /// Candidate separating axes. Circles contribute none.
    pub fn axes(&self, id: ColliderId) -> Vec<Vec2> {
        match &self.colliders[id.0].shape {
            ColliderShape::Circle(_) => Vec::new(),
            ColliderShape::Polygon(p) => p.axes(),
            ColliderShape::Edge(e) => e.axes(),
            ColliderShape::Composite(c) => c.children.iter().flat_map(|child| self.axes(*child)).collect(),
        }
    }

    /// `None` only for an empty composite.
    pub fn project(&self, id: ColliderId, axis: Vec2) -> Option<Projection> {
        match &self.colliders[id.0].shape {
            ColliderShape::Circle(c) => Some(c.project(axis)),
            ColliderShape::Polygon(p) => Some(p.project(axis)),
            ColliderShape::Edge(e) => Some(e.project(axis)),
            ColliderShape::Composite(c) => c
                .children
                .iter()
                .filter_map(|child| self.project(*child, axis))
                .reduce(|acc, p| Projection::new(acc.min.min(p.min), acc.max.max(p.max))),
        }
    }

    /// Moment of inertia for a body of `mass` using this collider.
    pub fn inertia(&self, id: ColliderId, mass: f64) -> f64 {
        match &self.colliders[id.0].shape {
            ColliderShape::Circle(c) => c.inertia(mass),
            ColliderShape::Polygon(p) => p.inertia(mass),
            ColliderShape::Edge(e) => e.inertia(mass),
            ColliderShape::Composite(c) => c.children.iter().map(|child| self.inertia(*child, mass)).sum(),
        }
    }

    /// Exact contacts between two colliders. Composites are expanded and
    /// only children with overlapping bounds are tested.
    pub fn collide(&self, a: ColliderId, b: ColliderId) -> Result<Vec<CollisionContact>> {
        let expanded = self.colliders[a.0].is_composite() || self.colliders[b.0].is_composite();
        let leaves_a = self.flatten(a);
        let leaves_b = self.flatten(b);

        let mut contacts = Vec::new();
        for &leaf_a in &leaves_a {
            for &leaf_b in &leaves_b {
                if leaf_a == leaf_b {
                    continue;
                }
                if expanded && !self.bounds(leaf_a).overlaps(&self.bounds(leaf_b), 0.0) {
                    continue;
                }
                contacts.extend(jump_table::collide(&self.colliders[leaf_a.0], &self.colliders[leaf_b.0])?);
            }
        }
        Ok(contacts)
    }
}

fn empty_box_at(position: Vec2) -> BoundingBox {
    BoundingBox::new(position.x, position.y, position.x, position.y)
}

impl Index<ColliderId> for ColliderArena {
    type Output = Collider;

    fn index(&self, id: ColliderId) -> &Collider {
        &self.colliders[id.0]
    }
}

impl IndexMut<ColliderId> for ColliderArena {
    fn index_mut(&mut self, id: ColliderId) -> &mut Collider {
        &mut self.colliders[id.0]
    }
}
