pub mod collision_system;
pub mod events;
pub mod physics_world;
pub mod store;

pub use collision_system::CollisionSystem;
pub use events::{CollisionEvent, DiscardEvents, EventKind, EventSink};
pub use physics_world::PhysicsWorld;
pub use store::{Entity, EntityId, EntityStore};
