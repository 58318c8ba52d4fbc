use crate::agent_store::{Agent, AgentStore, StepBuffers};
use crate::integrator::{clamp_velocity, integrate, wrap_coordinate};
use crate::neighbors::{find_neighbors, NeighborSets};
use crate::rules::{alignment, cohesion, seek_goal, separation};
use flock_common::{AgentRecord, ConfigError, FlockConfig, FlockParams, Snapshot, Vec2};
use log::{debug, info, trace};
use rand::prelude::*;
use rayon::prelude::*;

const MAX_EXPECTED_NEIGHBORS: usize = 32; // Histogram size for neighbor counts

/// Lifecycle of the engine. There is no terminal state; stopping is up to the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Agents initialized, no step taken yet.
    Constructed,
    /// `advance()` has been called at least once.
    Stepping,
}

/// Where the agents come from on construction and on [`FlockSimulation::reset`].
#[derive(Debug, Clone)]
enum InitialStore {
    Random { configured_seed: Option<u64> },
    Explicit(Vec<Agent>),
}

/// Owns the agent population and advances the flock one step at a time.
pub struct FlockSimulation {
    config: FlockConfig,
    params: FlockParams,
    state: AgentStore,
    origin: InitialStore,
    /// Seed behind the current random placement, if any.
    seed: Option<u64>,
    current_step: u64,
    /// Optional goal point for the goal-seeking rule.
    target: Option<Vec2>,
    recorded_snapshots: Vec<Snapshot>,
}

impl FlockSimulation {
    /// Creates a flock with randomly placed agents.
    ///
    /// Locations are uniform over the world. Each velocity component has a
    /// uniform magnitude up to `max_velocity` and a random sign; the combined
    /// velocity is then capped at `max_velocity`.
    pub fn new(config: FlockConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let configured_seed = config.initial_conditions.seed;
        let seed = configured_seed.unwrap_or_else(rand::random);
        let params = config.get_flock_params();
        let agents = place_initial_agents(&params, seed);
        info!("Initialized flock with {} agents (seed {}).", agents.len(), seed);
        Ok(Self::assemble(config, params, agents, InitialStore::Random { configured_seed }, Some(seed)))
    }

    /// Creates a flock from an explicit initial population.
    ///
    /// `agents.len()` must equal `boid_count` and every value must be finite.
    pub fn from_agents(config: FlockConfig, agents: Vec<Agent>) -> Result<Self, ConfigError> {
        config.validate()?;
        if agents.len() != config.flock.boid_count as usize {
            return Err(ConfigError::InvalidConfiguration(format!(
                "boid_count is {} but {} agents were supplied",
                config.flock.boid_count,
                agents.len()
            )));
        }
        if let Some(idx) = agents.iter().position(|a| !a.location.is_finite() || !a.velocity.is_finite()) {
            return Err(ConfigError::InvalidConfiguration(format!("agent {} has a non-finite component", idx)));
        }
        let params = config.get_flock_params();
        info!("Initialized flock with {} supplied agents.", agents.len());
        let origin = InitialStore::Explicit(agents.clone());
        Ok(Self::assemble(config, params, agents, origin, None))
    }

    fn assemble(
        config: FlockConfig,
        params: FlockParams,
        agents: Vec<Agent>,
        origin: InitialStore,
        seed: Option<u64>,
    ) -> Self {
        debug!("Flock parameters: {:#?}", params);
        Self {
            config,
            params,
            state: AgentStore::new(agents),
            origin,
            seed,
            current_step: 0,
            target: None,
            recorded_snapshots: Vec::new(),
        }
    }

    /// Computes and applies one step, returning the updated agents.
    ///
    /// Every rule reads the same pre-step snapshot; results land in the back
    /// buffer and become visible only when the buffers swap at the end.
    pub fn advance(&mut self) -> &[Agent] {
        let params = &self.params;
        let target = self.target;
        let StepBuffers { snapshot, next, movement } = self.state.step_buffers();

        // --- 1. Neighbor sets (immutable from here on) ---
        let neighbors = find_neighbors(snapshot, params.neighbor_radius, params.neighbor_index);

        // --- 2. Per-agent rules: cohesion, alignment, goal ---
        let steer = |idx: usize| -> Vec2 {
            let local = neighbors.of(idx);
            let mut m = cohesion(idx, local, snapshot, params.percent_to_center)
                + alignment(local, snapshot, params.velocity_added);
            if let Some(goal) = target {
                m += seek_goal(snapshot[idx].location, goal, params.percent_to_goal);
            }
            m
        };
        if params.parallel {
            movement.par_iter_mut().enumerate().for_each(|(idx, m)| *m = steer(idx));
        } else {
            movement.iter_mut().enumerate().for_each(|(idx, m)| *m = steer(idx));
        }

        // --- 3. Separation: one serial pairwise pass writing both agents of a pair ---
        separation(snapshot, params.safe_distance_sq, params.safe_distance_repel, movement);

        // --- 4. Integrate into the back buffer ---
        if params.parallel {
            next.par_iter_mut()
                .zip(snapshot.par_iter())
                .zip(movement.par_iter())
                .for_each(|((out, agent), m)| *out = integrate(agent, *m, params));
        } else {
            for ((out, agent), m) in next.iter_mut().zip(snapshot).zip(movement.iter()) {
                *out = integrate(agent, *m, params);
            }
        }

        // --- Swap Buffers: Output becomes Input for next step ---
        self.state.swap_buffers();
        self.current_step += 1;
        trace!("Completed step {}.", self.current_step);
        self.state.agents()
    }

    /// Returns the flock to the `Constructed` state.
    ///
    /// A configured seed reproduces the original placement; without one a
    /// fresh seed is drawn. Explicitly supplied agents are restored as given.
    /// The goal target and recorded snapshots are kept.
    pub fn reset(&mut self) {
        match &self.origin {
            InitialStore::Random { configured_seed } => {
                let seed = configured_seed.unwrap_or_else(rand::random);
                let agents = place_initial_agents(&self.params, seed);
                self.state.replace_all(&agents);
                self.seed = Some(seed);
            }
            InitialStore::Explicit(agents) => {
                self.state.replace_all(agents);
            }
        }
        self.current_step = 0;
        info!("Flock reset to step 0.");
    }

    /// The current agents, as of the last completed step.
    pub fn agents(&self) -> &[Agent] {
        self.state.agents()
    }

    /// Movement accumulated for each agent during the last step.
    pub fn last_movement(&self) -> &[Vec2] {
        self.state.movement()
    }

    /// Neighbor sets of the current agents at the neighbor radius.
    pub fn neighbor_sets(&self) -> NeighborSets {
        find_neighbors(self.state.agents(), self.params.neighbor_radius, self.params.neighbor_index)
    }

    pub fn engine_state(&self) -> EngineState {
        if self.current_step == 0 {
            EngineState::Constructed
        } else {
            EngineState::Stepping
        }
    }

    pub fn current_step(&self) -> u64 {
        self.current_step
    }

    /// Sets or clears the goal point for the goal-seeking rule.
    pub fn set_target(&mut self, target: Option<Vec2>) {
        self.target = target;
    }

    pub fn target(&self) -> Option<Vec2> {
        self.target
    }

    /// Seed behind the current random placement; `None` for supplied agents.
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Returns the current number of agents in the flock.
    pub fn agent_count(&self) -> usize {
        self.state.len()
    }

    /// Provides access to the derived flock parameters.
    pub fn params(&self) -> &FlockParams {
        &self.params
    }

    /// Provides access to the original flock configuration.
    pub fn config(&self) -> &FlockConfig {
        &self.config
    }

    /// Copies the current agents out as plain records.
    pub fn get_results(&self) -> Vec<AgentRecord> {
        self.state.records()
    }

    /// Collects flock statistics for the current state and stores them as a Snapshot.
    pub fn record_snapshot(&mut self) -> &Snapshot {
        let agents = self.state.agents();
        let count = agents.len();
        debug!("Recording snapshot at step {}...", self.current_step);

        let mut location_sum = Vec2::zero();
        let mut speed_sum = 0.0f32;
        let mut max_speed = 0.0f32;
        for agent in agents {
            location_sum += agent.location;
            let speed = agent.velocity.length();
            speed_sum += speed;
            max_speed = max_speed.max(speed);
        }
        let inv_count = if count > 0 { 1.0 / count as f32 } else { 0.0 };

        // Neighbor count distribution at the neighbor radius
        let neighbors = self.neighbor_sets();
        let mut neighbor_counts_distribution = vec![0u32; MAX_EXPECTED_NEIGHBORS];
        let mut total_neighbors = 0usize;
        let mut max_neighbors = 0usize;
        for n in neighbors.counts() {
            total_neighbors += n;
            max_neighbors = max_neighbors.max(n);
            // Anything above the histogram range lands in the last bin
            neighbor_counts_distribution[n.min(MAX_EXPECTED_NEIGHBORS - 1)] += 1;
        }
        let mean_neighbor_count = total_neighbors as f32 * inv_count;

        debug!(
            "Neighbor stats: agents={}, avg_neighbors={:.2}, max_neighbors={}, max_speed={:.3}",
            count, mean_neighbor_count, max_neighbors, max_speed
        );

        let agents_snapshot = if self.config.output.save_agents_in_snapshot {
            Some(self.get_results())
        } else {
            None
        };

        let snapshot = Snapshot {
            step: self.current_step,
            agent_count: count as u32,
            centroid: location_sum.scale(inv_count),
            mean_speed: speed_sum * inv_count,
            max_speed,
            mean_neighbor_count,
            neighbor_counts_distribution,
            agents: agents_snapshot,
        };
        self.recorded_snapshots.push(snapshot);
        &self.recorded_snapshots[self.recorded_snapshots.len() - 1]
    }

    /// Provides access to the recorded snapshots.
    pub fn recorded_snapshots(&self) -> &[Snapshot] {
        &self.recorded_snapshots
    }
}

/// Places `boid_count` agents uniformly over the world with random velocities.
fn place_initial_agents(params: &FlockParams, seed: u64) -> Vec<Agent> {
    let mut rng = StdRng::seed_from_u64(seed);
    let random_component = |rng: &mut StdRng| {
        let magnitude = rng.random::<f32>() * params.max_velocity;
        if rng.random::<bool>() {
            magnitude
        } else {
            -magnitude
        }
    };

    (0..params.boid_count)
        .map(|_| {
            let location = Vec2::new(
                wrap_coordinate(rng.random::<f32>() * params.world_width, params.world_width),
                wrap_coordinate(rng.random::<f32>() * params.world_height, params.world_height),
            );
            let velocity = Vec2::new(random_component(&mut rng), random_component(&mut rng));
            Agent::new(location, clamp_velocity(velocity, params.max_velocity))
        })
        .collect()
}
