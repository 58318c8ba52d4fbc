use crate::vecmath::Vec2;
use serde::{Deserialize, Serialize};

/// Location and velocity of one agent, as written into snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub location: Vec2,
    pub velocity: Vec2,
}

/// Flock statistics recorded at a specific step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Number of `advance()` calls completed when the snapshot was taken.
    pub step: u64,
    pub agent_count: u32,
    /// Mean location of the whole flock.
    pub centroid: Vec2,
    pub mean_speed: f32,
    pub max_speed: f32,
    /// Mean number of neighbors within the neighbor radius.
    pub mean_neighbor_count: f32,
    /// `neighbor_counts_distribution[n]` is the number of agents with exactly `n` neighbors.
    /// The last bin also collects every agent above it.
    pub neighbor_counts_distribution: Vec<u32>,
    // Written even when None; bincode cannot skip fields.
    #[serde(default)]
    pub agents: Option<Vec<AgentRecord>>,
}
