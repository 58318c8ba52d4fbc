//! The flocking rules. Every rule reads the pre-step snapshot only.

use crate::agent_store::Agent;
use crate::neighbors::for_each_pair_within;
use flock_common::Vec2;

/// Steers agent `idx` a fraction of the way toward the mean location of its
/// neighbors. Zero when there are no neighbors.
pub fn cohesion(idx: usize, neighbors: &[u32], agents: &[Agent], percent_to_center: f32) -> Vec2 {
    if neighbors.is_empty() {
        return Vec2::zero();
    }
    let mut sum = Vec2::zero();
    for &j in neighbors {
        sum += agents[j as usize].location;
    }
    let center = sum.scale(1.0 / neighbors.len() as f32);
    (center - agents[idx].location) * percent_to_center
}

/// Sum of neighbor velocities scaled by `velocity_added`.
///
/// A sum rather than a mean, so denser neighborhoods pull harder. Zero when
/// there are no neighbors.
pub fn alignment(neighbors: &[u32], agents: &[Agent], velocity_added: f32) -> Vec2 {
    if neighbors.is_empty() {
        return Vec2::zero();
    }
    let mut sum = Vec2::zero();
    for &j in neighbors {
        sum += agents[j as usize].velocity;
    }
    sum * velocity_added
}

/// Push applied to the second agent of a pair; the first receives its negation.
#[inline(always)]
pub fn separation_push(from: Vec2, to: Vec2, safe_distance_repel: f32) -> Vec2 {
    (to - from) * safe_distance_repel
}

/// Accumulates separation into `movement` with one pass over all pairs within
/// the safe distance. Each qualifying pair is visited once and written to both
/// of its agents.
pub fn separation(agents: &[Agent], safe_distance_sq: f32, safe_distance_repel: f32, movement: &mut [Vec2]) {
    for_each_pair_within(agents, safe_distance_sq, |i, j| {
        let push = separation_push(agents[i].location, agents[j].location, safe_distance_repel);
        movement[i] -= push;
        movement[j] += push;
    });
}

/// Pull toward an external target point, e.g. a pointer position.
pub fn seek_goal(location: Vec2, target: Vec2, percent_to_goal: f32) -> Vec2 {
    (target - location) * percent_to_goal
}
