pub mod bounding_box;
pub mod line_segment;
pub mod projection;
pub mod ray;
pub mod transform;
pub mod vec2;

// Re-export the geometry primitives
pub use bounding_box::BoundingBox;
pub use line_segment::LineSegment;
pub use projection::Projection;
pub use ray::Ray;
pub use transform::{Transform, TransformArena, TransformId};
pub use vec2::Vec2;
