use crate::config::{BoundaryPolicy, NeighborIndex};
use serde::{Deserialize, Serialize};

/// Flock parameters derived from the configuration, read on every step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlockParams {
    // World & boundary
    pub world_width: f32,
    pub world_height: f32,
    pub boundary: BoundaryPolicy,
    pub border_buffer: f32, // Zero when wrapping

    // Population & neighborhood
    pub boid_count: u32,
    pub neighbor_radius: f32,
    pub neighbor_index: NeighborIndex,
    pub parallel: bool,

    // Rules
    pub safe_distance_sq: f32,
    pub safe_distance_repel: f32,
    pub percent_to_center: f32,
    pub velocity_added: f32,
    pub percent_to_goal: f32,

    // Speed cap
    pub max_velocity: f32,
}
