//! Running a world off the calling thread, one message exchange per frame.

pub mod messages;
pub mod worker;

pub use messages::{BodyMessage, PolygonColliderMessage, WorkerReply, WorkerRequest};
pub use worker::PhysicsWorker;
