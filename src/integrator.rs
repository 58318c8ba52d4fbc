use crate::agent_store::Agent;
use flock_common::{clamp, BoundaryPolicy, FlockParams, Vec2};
use log::trace;

/// Limits `velocity` to `max_velocity` while preserving its direction.
///
/// Zero-length or non-finite velocities cannot be rescaled and come back as
/// the zero vector.
pub fn clamp_velocity(velocity: Vec2, max_velocity: f32) -> Vec2 {
    let magnitude = velocity.length();
    if magnitude <= max_velocity {
        return velocity;
    }
    if !velocity.is_finite() {
        trace!("Dropping non-finite velocity ({}, {}).", velocity.x, velocity.y);
        return Vec2::zero();
    }
    // length_squared overflows long before the components do.
    let magnitude = if magnitude.is_finite() { magnitude } else { velocity.x.hypot(velocity.y) };
    if magnitude == 0.0 {
        return Vec2::zero();
    }

    let mut clamped = velocity.scale(max_velocity / magnitude);
    // Rounding can leave the result a few ulps above the cap.
    for _ in 0..4 {
        if clamped.length() <= max_velocity {
            break;
        }
        clamped = clamped.scale(1.0 - 2.0 * f32::EPSILON);
    }
    clamped
}

/// Reduces `value` into `[0, extent)` with true modulo arithmetic, so any
/// displacement, however large, lands inside the world.
pub fn wrap_coordinate(value: f32, extent: f32) -> f32 {
    let wrapped = value.rem_euclid(extent);
    // rem_euclid rounds tiny negative inputs up to exactly `extent`.
    if wrapped >= extent {
        0.0
    } else {
        wrapped
    }
}

/// Reflects `value` back into `[lo, hi]`, folding repeatedly for displacements
/// longer than the span. Returns the position and whether the motion along
/// this axis ended up reversed.
pub fn reflect_coordinate(value: f32, lo: f32, hi: f32) -> (f32, bool) {
    if value >= lo && value <= hi {
        return (value, false);
    }
    let span = hi - lo;
    let period = 2.0 * span;
    let folded = (value - lo).rem_euclid(period);
    // The second half of each period is the mirrored pass; position and
    // direction both come from the same folded offset.
    let mirrored = folded >= span;
    let position = if mirrored { period - folded } else { folded };
    (clamp(lo + position, lo, hi), mirrored)
}

/// Applies the configured boundary policy to an agent in place.
pub fn apply_boundary(agent: &mut Agent, params: &FlockParams) {
    match params.boundary {
        BoundaryPolicy::Wrap => {
            agent.location.x = wrap_coordinate(agent.location.x, params.world_width);
            agent.location.y = wrap_coordinate(agent.location.y, params.world_height);
        }
        BoundaryPolicy::Clamp => {
            let b = params.border_buffer;
            agent.location.x = clamp(agent.location.x, b, params.world_width - b);
            agent.location.y = clamp(agent.location.y, b, params.world_height - b);
        }
        BoundaryPolicy::Bounce => {
            let b = params.border_buffer;
            let (x, flip_x) = reflect_coordinate(agent.location.x, b, params.world_width - b);
            let (y, flip_y) = reflect_coordinate(agent.location.y, b, params.world_height - b);
            agent.location = Vec2::new(x, y);
            if flip_x {
                agent.velocity.x = -agent.velocity.x;
            }
            if flip_y {
                agent.velocity.y = -agent.velocity.y;
            }
        }
    }
}

/// Computes an agent's next state from its snapshot and accumulated movement:
/// velocity update, speed cap, position update, then the boundary policy.
pub fn integrate(agent: &Agent, movement: Vec2, params: &FlockParams) -> Agent {
    let velocity = clamp_velocity(agent.velocity + movement, params.max_velocity);
    let mut next = Agent::new(agent.location + velocity, velocity);
    apply_boundary(&mut next, params);
    next
}
