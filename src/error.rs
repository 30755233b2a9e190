use thiserror::Error;

use crate::colliders::ColliderId;
use crate::world::store::EntityId;

/// Errors surfaced by the collision engine.
///
/// Bad geometry and odd contacts never show up here; those degrade to "no
/// contact". Only broken internal state, bad caller input at the API edge,
/// configuration and worker failures are reported.
#[derive(Debug, Error)]
pub enum CollisionError {
    /// The dynamic tree reached a state that insertion/removal can never produce.
    #[error("dynamic tree invariant violated: {0}")]
    TreeInvariant(&'static str),
    /// A collider pair with no narrowphase routine (composites are expanded first).
    #[error("no narrowphase routine for {a} vs {b}")]
    UnsupportedPair { a: &'static str, b: &'static str },
    /// Polygons need at least three points.
    #[error("polygon needs at least 3 points, got {0}")]
    TooFewPoints(usize),
    #[error("unknown entity {0:?}")]
    UnknownEntity(EntityId),
    #[error("unknown collider {0:?}")]
    UnknownCollider(ColliderId),
    /// Reading, parsing or writing the INI configuration failed.
    #[error("config error: {0}")]
    Config(String),
    /// Collision groups are backed by a 32-bit category mask.
    #[error("cannot create more than 32 collision groups")]
    GroupLimit,
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    /// The offload worker thread is gone or replied with an error.
    #[error("worker error: {0}")]
    Worker(String),
}

pub type Result<T> = std::result::Result<T, CollisionError>;
