pub mod arena;
pub mod circle;
pub mod edge;
pub mod polygon;

pub use arena::ColliderArena;
pub use circle::CircleCollider;
pub use edge::EdgeCollider;
pub use polygon::PolygonCollider;

use serde::{Deserialize, Serialize};

use crate::math::{Transform, Vec2};
use crate::world::store::EntityId;

/// Handle into a [`ColliderArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColliderId(pub(crate) usize);

impl ColliderId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A group of colliders that move with one owner and report as one logical shape.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompositeCollider {
    children: Vec<ColliderId>,
    transform: Transform,
}

impl CompositeCollider {
    pub fn children(&self) -> &[ColliderId] {
        &self.children
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }
}

/// Enum representing the geometry of a collider.
#[derive(Debug, Clone, PartialEq)]
pub enum ColliderShape {
    Circle(CircleCollider),
    Polygon(PolygonCollider),
    Edge(EdgeCollider),
    Composite(CompositeCollider),
}

impl ColliderShape {
    pub fn kind_name(&self) -> &'static str {
        match self {
            ColliderShape::Circle(_) => "circle",
            ColliderShape::Polygon(_) => "polygon",
            ColliderShape::Edge(_) => "edge",
            ColliderShape::Composite(_) => "composite",
        }
    }
}

impl From<CircleCollider> for ColliderShape {
    fn from(c: CircleCollider) -> Self {
        ColliderShape::Circle(c)
    }
}

impl From<PolygonCollider> for ColliderShape {
    fn from(p: PolygonCollider) -> Self {
        ColliderShape::Polygon(p)
    }
}

impl From<EdgeCollider> for ColliderShape {
    fn from(e: EdgeCollider) -> Self {
        ColliderShape::Edge(e)
    }
}

/// An arena entry: shape plus the bookkeeping the broadphase and solvers need.
#[derive(Debug, Clone, PartialEq)]
pub struct Collider {
    pub id: ColliderId,
    /// Entity whose body this collider belongs to.
    pub owner: Option<EntityId>,
    /// Enclosing composite, if any.
    pub composite: Option<ColliderId>,
    pub shape: ColliderShape,
}

impl Collider {
    pub fn is_composite(&self) -> bool {
        matches!(self.shape, ColliderShape::Composite(_))
    }

    /// Owner transform as of the last update.
    pub fn transform(&self) -> Transform {
        match &self.shape {
            ColliderShape::Circle(c) => c.transform(),
            ColliderShape::Polygon(p) => p.transform(),
            ColliderShape::Edge(e) => e.transform(),
            ColliderShape::Composite(c) => c.transform(),
        }
    }
}

/// Result of a successful ray cast against a collider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayCastHit {
    pub collider: ColliderId,
    pub owner: Option<EntityId>,
    /// Distance along the ray.
    pub distance: f64,
    pub point: Vec2,
    pub normal: Vec2,
}
