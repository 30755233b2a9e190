//! 2D collision detection and rigid body resolution.
//!
//! A [`PhysicsWorld`] owns entities (transform, motion, optional body and
//! collider). Each step integrates motion, finds candidate pairs in a
//! dynamic AABB tree, computes exact contacts and resolves them with the
//! configured solver, then reports contact lifecycle events.

pub mod colliders;
pub mod collision;
pub mod common;
pub mod error;
pub mod integration;
pub mod math;
pub mod objects;
pub mod offload;
pub mod solver;
pub mod world;

// Re-export key types for easier use
pub use colliders::{CircleCollider, ColliderId, ColliderShape, EdgeCollider, PolygonCollider};
pub use collision::{CollisionContact, CollisionGroup, RayCastOptions, Side};
pub use common::{Material, PhysicsConfig, SolverStrategy};
pub use error::{CollisionError, Result};
pub use math::{BoundingBox, Ray, Transform, Vec2};
pub use objects::{Body, CollisionType, Motion};
pub use world::{CollisionEvent, EntityId, EventKind, EventSink, PhysicsWorld};
