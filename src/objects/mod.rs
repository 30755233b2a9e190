pub mod body;

pub use body::{Body, CollisionType, DegreeOfFreedom, Motion};
