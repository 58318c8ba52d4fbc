pub mod config;
pub mod error;
pub mod flock_params;
pub mod snapshot;
pub mod vecmath;

// Re-export key types for easier use by dependent crates
pub use config::{
    BoundaryPolicy, FlockConfig, FlockSettings, InitialConditions, NeighborIndex, OutputConfig, RulesConfig,
    RunConfig, WorldConfig,
};
pub use error::ConfigError;
pub use flock_params::FlockParams;
pub use snapshot::{AgentRecord, Snapshot};
pub use vecmath::{clamp, Vec2};
