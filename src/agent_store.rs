use flock_common::{AgentRecord, Vec2};

/// A single flocking agent. Its identity is its index in the [`AgentStore`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Agent {
    pub location: Vec2,
    pub velocity: Vec2,
}

impl Agent {
    pub fn new(location: Vec2, velocity: Vec2) -> Self {
        Agent { location, velocity }
    }
}

impl From<Agent> for AgentRecord {
    fn from(agent: Agent) -> Self {
        AgentRecord { location: agent.location, velocity: agent.velocity }
    }
}

/// Borrowed views of the store for one step: the read-only snapshot, the back
/// buffer the integrator writes, and the per-agent movement accumulators.
pub struct StepBuffers<'a> {
    pub snapshot: &'a [Agent],
    pub next: &'a mut [Agent],
    pub movement: &'a mut [Vec2],
}

/// Holds the flock state. Fixed size and index stable for its whole lifetime.
#[derive(Debug)]
pub struct AgentStore {
    // --- Ping-Pong Buffers ---
    // Current step's input. Every rule reads only this buffer.
    agents_in: Vec<Agent>,
    // Current step's output, next step's input.
    agents_out: Vec<Agent>,

    // Movement accumulated by the rules for the step in flight.
    // Disjoint from the snapshot so pairwise writes never affect reads.
    movement: Vec<Vec2>,
}

impl AgentStore {
    /// Creates a store holding exactly `agents`. No resizing exists after this.
    pub fn new(agents: Vec<Agent>) -> Self {
        let count = agents.len();
        Self {
            agents_out: agents.clone(),
            agents_in: agents,
            movement: vec![Vec2::zero(); count],
        }
    }

    pub fn len(&self) -> usize {
        self.agents_in.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents_in.is_empty()
    }

    /// The current agents, as of the last completed step.
    pub fn agents(&self) -> &[Agent] {
        &self.agents_in
    }

    pub fn get(&self, idx: usize) -> Option<&Agent> {
        self.agents_in.get(idx)
    }

    /// Updates one agent in place. Returns `false` if `idx` is out of range.
    pub fn update<F>(&mut self, idx: usize, f: F) -> bool
    where
        F: FnOnce(&mut Agent),
    {
        match self.agents_in.get_mut(idx) {
            Some(agent) => {
                f(agent);
                true
            }
            None => false,
        }
    }

    /// Replaces the whole population with `agents` of the same length.
    /// Returns `false` (and leaves the store untouched) on a length mismatch.
    pub fn replace_all(&mut self, agents: &[Agent]) -> bool {
        if agents.len() != self.agents_in.len() {
            log::error!(
                "Refusing to replace {} agents with {} agents; the population size is fixed.",
                self.agents_in.len(),
                agents.len()
            );
            return false;
        }
        self.agents_in.copy_from_slice(agents);
        self.movement.fill(Vec2::zero());
        true
    }

    /// Splits the store into the buffers used by one step, with movement zeroed.
    pub fn step_buffers(&mut self) -> StepBuffers<'_> {
        self.movement.fill(Vec2::zero());
        StepBuffers {
            snapshot: &self.agents_in,
            next: &mut self.agents_out,
            movement: &mut self.movement,
        }
    }

    /// Movement accumulated during the last step.
    pub fn movement(&self) -> &[Vec2] {
        &self.movement
    }

    /// Swaps the input and output buffers: the freshly integrated state becomes current.
    pub fn swap_buffers(&mut self) {
        std::mem::swap(&mut self.agents_in, &mut self.agents_out);
    }

    /// Copies the current agents out as plain records.
    pub fn records(&self) -> Vec<AgentRecord> {
        self.agents_in.iter().copied().map(AgentRecord::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_store() -> AgentStore {
        AgentStore::new(vec![
            Agent::new(Vec2::new(1.0, 2.0), Vec2::new(0.5, 0.0)),
            Agent::new(Vec2::new(3.0, 4.0), Vec2::new(0.0, -0.5)),
        ])
    }

    #[test]
    fn update_touches_only_the_addressed_agent() {
        let mut store = sample_store();
        assert!(store.update(1, |a| a.location = Vec2::new(9.0, 9.0)));
        assert_eq!(store.get(1).unwrap().location, Vec2::new(9.0, 9.0));
        assert_eq!(store.get(0).unwrap().location, Vec2::new(1.0, 2.0));
        assert!(!store.update(2, |_| {}));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn writes_to_back_buffer_stay_hidden_until_swap() {
        let mut store = sample_store();
        {
            let buffers = store.step_buffers();
            buffers.next[0] = Agent::new(Vec2::new(7.0, 7.0), Vec2::zero());
            buffers.next[1] = buffers.snapshot[1];
            assert_eq!(buffers.snapshot[0].location, Vec2::new(1.0, 2.0));
        }
        assert_eq!(store.agents()[0].location, Vec2::new(1.0, 2.0));
        store.swap_buffers();
        assert_eq!(store.agents()[0].location, Vec2::new(7.0, 7.0));
        assert_eq!(store.agents()[1].location, Vec2::new(3.0, 4.0));
    }

    #[test]
    fn step_buffers_start_with_zero_movement() {
        let mut store = sample_store();
        store.step_buffers().movement[0] = Vec2::new(1.0, 1.0);
        assert_eq!(store.movement()[0], Vec2::new(1.0, 1.0));
        let buffers = store.step_buffers();
        assert!(buffers.movement.iter().all(|m| *m == Vec2::zero()));
    }

    #[test]
    fn replace_all_rejects_resizing() {
        let mut store = sample_store();
        assert!(!store.replace_all(&[Agent::default()]));
        assert_eq!(store.len(), 2);
        assert!(store.replace_all(&[Agent::default(), Agent::default()]));
        assert_eq!(store.agents()[1], Agent::default());
    }
}
