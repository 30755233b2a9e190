pub mod config;
pub mod material;

pub use config::{
    ArcadeConfig, BodyConfig, ColliderConfig, CompositeStrategy, ContactSolveBias, ContinuousConfig,
    DynamicTreeConfig, PhysicsConfig, RealisticConfig, SolverStrategy,
};
pub use material::Material;
