//! Boids flocking engine.
//!
//! [`FlockSimulation`] owns a fixed population of agents and advances it one
//! step at a time with three local rules (cohesion, alignment, separation)
//! plus an optional goal-seeking pull.

pub mod agent_store;
pub mod integrator;
pub mod neighbors;
pub mod output;
pub mod rules;
pub mod simulation;

pub use agent_store::{Agent, AgentStore};
pub use neighbors::NeighborSets;
pub use output::OutputFormat;
pub use simulation::{EngineState, FlockSimulation};

// Shared types, re-exported so callers need a single dependency
pub use flock_common::{
    AgentRecord, BoundaryPolicy, ConfigError, FlockConfig, FlockParams, NeighborIndex, Snapshot, Vec2,
};
