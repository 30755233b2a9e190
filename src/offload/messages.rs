//! Wire format between a host thread and a [`PhysicsWorker`](super::PhysicsWorker).
//!
//! Everything is plain data so a frame can be shipped as JSON.

use serde::{Deserialize, Serialize};

use crate::math::{Transform, Vec2};
use crate::objects::body::{CollisionType, Motion};

/// Kinematic state of one body, keyed by a caller-chosen id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyMessage {
    pub id: u64,
    /// `[a, b, c, d, tx, ty]` of the body's affine transform.
    pub transform_matrix_data: [f64; 6],
    pub velocity: Vec2,
    pub acceleration: Vec2,
    pub angular_velocity: f64,
}

impl BodyMessage {
    pub fn new(id: u64, transform: Transform, motion: &Motion) -> Self {
        Self {
            id,
            transform_matrix_data: transform.to_matrix_data(),
            velocity: motion.vel,
            acceleration: motion.acc,
            angular_velocity: motion.angular_velocity,
        }
    }

    pub fn transform(&self) -> Transform {
        Transform::from_matrix_data(self.transform_matrix_data)
    }
}

/// Polygon outline in body space, for the body with the same id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolygonColliderMessage {
    pub id: u64,
    pub points: Vec<Vec2>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WorkerRequest {
    AddBody {
        body: BodyMessage,
        #[serde(rename = "collisionType")]
        collision_type: CollisionType,
        collider: Option<PolygonColliderMessage>,
    },
    /// Applies `bodies`, then advances the world by `elapsed` milliseconds.
    Step { elapsed: f64, bodies: Vec<BodyMessage> },
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WorkerReply {
    Added { id: u64 },
    /// Every known body after the step, in the order they were added.
    Step { bodies: Vec<BodyMessage> },
    Error { message: String },
}
