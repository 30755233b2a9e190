pub mod contact;
pub mod dynamic_tree;
pub mod group;
pub mod jump_table;
pub mod pair;
pub mod processor;
pub mod separating_axis;
pub mod side;

// Re-export key types
pub use contact::{CollisionContact, ContactId, SeparationInfo};
pub use dynamic_tree::DynamicTree;
pub use group::{CollisionGroup, CollisionGroupManager};
pub use pair::{Pair, PairId};
pub use processor::{CollisionProcessor, RayCastOptions};
pub use side::Side;
