use crate::agent_store::Agent;
use flock_common::{NeighborIndex, Vec2};

/// Upper bound on grid cells per axis; the cell size grows instead.
const MAX_GRID_DIM: f32 = 256.0;

/// Per-agent neighbor lists. The relation is symmetric and every list is in
/// ascending index order, whichever finder produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NeighborSets {
    lists: Vec<Vec<u32>>,
}

impl NeighborSets {
    fn empty(count: usize) -> Self {
        NeighborSets { lists: vec![Vec::new(); count] }
    }

    /// Records `i` and `j` as neighbors of each other.
    fn link(&mut self, i: usize, j: usize) {
        self.lists[i].push(j as u32);
        self.lists[j].push(i as u32);
    }

    /// Neighbors of agent `idx`. Empty for an out-of-range index.
    pub fn of(&self, idx: usize) -> &[u32] {
        self.lists.get(idx).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, i: usize, j: usize) -> bool {
        self.of(i).binary_search(&(j as u32)).is_ok()
    }

    /// Number of agents covered.
    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    /// Neighbor count of each agent, in index order.
    pub fn counts(&self) -> impl Iterator<Item = usize> + '_ {
        self.lists.iter().map(Vec::len)
    }
}

/// Finds the neighbors of every agent within `radius` using the chosen index.
pub fn find_neighbors(agents: &[Agent], radius: f32, index: NeighborIndex) -> NeighborSets {
    match index {
        NeighborIndex::Pairwise => pairwise_neighbors(agents, radius),
        NeighborIndex::Grid => grid_neighbors(agents, radius),
    }
}

/// Calls `f(i, j)` once for every unordered pair `i < j` whose squared
/// distance is at most `max_dist_sq`.
#[inline(always)]
pub fn for_each_pair_within<F>(agents: &[Agent], max_dist_sq: f32, mut f: F)
where
    F: FnMut(usize, usize),
{
    for (i, a) in agents.iter().enumerate() {
        for (offset, b) in agents[i + 1..].iter().enumerate() {
            if a.location.distance_squared(b.location) <= max_dist_sq {
                f(i, i + 1 + offset);
            }
        }
    }
}

/// Reference neighbor finder: tests each unordered pair exactly once.
///
/// The outer loop runs in ascending order, so each list comes out sorted
/// without an extra pass.
pub fn pairwise_neighbors(agents: &[Agent], radius: f32) -> NeighborSets {
    let mut sets = NeighborSets::empty(agents.len());
    if radius < 0.0 || radius.is_nan() {
        return sets;
    }
    for_each_pair_within(agents, radius * radius, |i, j| sets.link(i, j));
    sets
}

/// Grid-accelerated neighbor finder. Returns exactly what
/// [`pairwise_neighbors`] returns for the same input.
pub fn grid_neighbors(agents: &[Agent], radius: f32) -> NeighborSets {
    if !(radius > 0.0 && radius.is_finite()) {
        // Radius 0 only matches coincident points; no grid helps there.
        return pairwise_neighbors(agents, radius);
    }
    let grid = match UniformGrid::build(agents, radius) {
        Some(grid) => grid,
        None => return pairwise_neighbors(agents, radius),
    };

    let radius_sq = radius * radius;
    let mut sets = NeighborSets::empty(agents.len());
    for (i, agent) in agents.iter().enumerate() {
        grid.for_each_candidate(agent.location, |j| {
            if j > i && agent.location.distance_squared(agents[j].location) <= radius_sq {
                sets.link(i, j);
            }
        });
    }
    for list in &mut sets.lists {
        list.sort_unstable();
    }
    sets
}

/// Uniform bucket grid over the bounding box of the agents.
///
/// Built as a counting sort: per-cell counts, a prefix sum into cell starts,
/// then a sorted list of agent indices.
struct UniformGrid {
    origin: Vec2,
    inv_cell_size: f32,
    dim_x: usize,
    dim_y: usize,
    cell_starts: Vec<u32>,
    cell_counts: Vec<u32>,
    cell_agent_indices: Vec<u32>,
}

impl UniformGrid {
    fn build(agents: &[Agent], radius: f32) -> Option<Self> {
        let first = agents.first()?;
        let mut min = first.location;
        let mut max = first.location;
        for agent in agents {
            let p = agent.location;
            if !p.is_finite() {
                return None;
            }
            min = Vec2::new(min.x.min(p.x), min.y.min(p.y));
            max = Vec2::new(max.x.max(p.x), max.y.max(p.y));
        }

        let extent = max - min;
        // Slack keeps any pair within `radius` at most one cell apart after rounding.
        let cell_size = (radius * 1.001)
            .max(extent.x / MAX_GRID_DIM)
            .max(extent.y / MAX_GRID_DIM);
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return None;
        }
        let inv_cell_size = 1.0 / cell_size;
        let dim_x = (extent.x * inv_cell_size).floor() as usize + 1;
        let dim_y = (extent.y * inv_cell_size).floor() as usize + 1;

        let mut grid = UniformGrid {
            origin: min,
            inv_cell_size,
            dim_x,
            dim_y,
            cell_starts: vec![0; dim_x * dim_y],
            cell_counts: vec![0; dim_x * dim_y],
            cell_agent_indices: vec![0; agents.len()],
        };

        // Phase 1: count agents per cell.
        let cell_of: Vec<usize> = agents.iter().map(|a| grid.cell_idx(a.location)).collect();
        for &cell in &cell_of {
            grid.cell_counts[cell] += 1;
        }

        // Phase 2: prefix sum into cell starts.
        let mut total = 0;
        for (start, &count) in grid.cell_starts.iter_mut().zip(&grid.cell_counts) {
            *start = total;
            total += count;
        }

        // Phase 3: scatter agent indices into their cell's block.
        let mut write_offsets = vec![0u32; grid.cell_counts.len()];
        for (agent_idx, &cell) in cell_of.iter().enumerate() {
            let slot = (grid.cell_starts[cell] + write_offsets[cell]) as usize;
            grid.cell_agent_indices[slot] = agent_idx as u32;
            write_offsets[cell] += 1;
        }

        Some(grid)
    }

    #[inline(always)]
    fn cell_coords(&self, pos: Vec2) -> (usize, usize) {
        let gx = ((pos.x - self.origin.x) * self.inv_cell_size).floor() as i64;
        let gy = ((pos.y - self.origin.y) * self.inv_cell_size).floor() as i64;
        // Clamp to grid dimensions to handle edge cases
        (
            gx.clamp(0, self.dim_x as i64 - 1) as usize,
            gy.clamp(0, self.dim_y as i64 - 1) as usize,
        )
    }

    #[inline(always)]
    fn cell_idx(&self, pos: Vec2) -> usize {
        let (gx, gy) = self.cell_coords(pos);
        gy * self.dim_x + gx
    }

    /// Calls `f` with every agent index stored in the 3x3 cell block around `pos`.
    fn for_each_candidate<F>(&self, pos: Vec2, mut f: F)
    where
        F: FnMut(usize),
    {
        let (cx, cy) = self.cell_coords(pos);
        let x_range = cx.saturating_sub(1)..=(cx + 1).min(self.dim_x - 1);
        for gy in cy.saturating_sub(1)..=(cy + 1).min(self.dim_y - 1) {
            for gx in x_range.clone() {
                let cell = gy * self.dim_x + gx;
                let start = self.cell_starts[cell] as usize;
                let end = start + self.cell_counts[cell] as usize;
                for &idx in &self.cell_agent_indices[start..end] {
                    f(idx as usize);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;

    fn at(points: &[(f32, f32)]) -> Vec<Agent> {
        points
            .iter()
            .map(|&(x, y)| Agent::new(Vec2::new(x, y), Vec2::zero()))
            .collect()
    }

    fn random_agents(rng: &mut StdRng, count: usize, extent: f32) -> Vec<Agent> {
        (0..count)
            .map(|_| {
                let p = Vec2::new(rng.random_range(0.0..extent), rng.random_range(0.0..extent));
                Agent::new(p, Vec2::zero())
            })
            .collect()
    }

    fn assert_symmetric(sets: &NeighborSets) {
        for i in 0..sets.len() {
            assert!(!sets.contains(i, i), "agent {} listed as its own neighbor", i);
            for &j in sets.of(i) {
                assert!(sets.contains(j as usize, i), "{} -> {} has no reverse link", i, j);
            }
        }
    }

    #[test]
    fn radius_is_inclusive() {
        let agents = at(&[(0.0, 0.0), (3.0, 4.0), (10.0, 0.0)]);
        let sets = pairwise_neighbors(&agents, 5.0);
        assert_eq!(sets.of(0), &[1]);
        assert_eq!(sets.of(1), &[0]);
        assert!(sets.of(2).is_empty());
    }

    #[test]
    fn zero_radius_only_links_coincident_points() {
        let agents = at(&[(1.0, 1.0), (1.0, 1.0), (1.5, 1.0)]);
        for index in [NeighborIndex::Pairwise, NeighborIndex::Grid] {
            let sets = find_neighbors(&agents, 0.0, index);
            assert_eq!(sets.of(0), &[1]);
            assert_eq!(sets.of(1), &[0]);
            assert!(sets.of(2).is_empty());
        }
    }

    #[test]
    fn lists_are_sorted_and_symmetric() {
        let mut rng = StdRng::seed_from_u64(7);
        let agents = random_agents(&mut rng, 200, 100.0);
        for radius in [0.0, 1.0, 7.5, 30.0, 500.0] {
            let sets = pairwise_neighbors(&agents, radius);
            assert_symmetric(&sets);
            for i in 0..sets.len() {
                assert!(sets.of(i).windows(2).all(|w| w[0] < w[1]));
            }
        }
    }

    #[test]
    fn grid_matches_pairwise_scan() {
        let mut rng = StdRng::seed_from_u64(0xB01D);
        for trial in 0..20 {
            let count = rng.random_range(1..150);
            let extent = rng.random_range(1.0..400.0);
            let radius = rng.random_range(0.0..60.0);
            let agents = random_agents(&mut rng, count, extent);
            assert_eq!(
                grid_neighbors(&agents, radius),
                pairwise_neighbors(&agents, radius),
                "trial {} (count {}, extent {}, radius {})",
                trial,
                count,
                extent,
                radius
            );
        }
    }

    #[test]
    fn grid_handles_points_on_cell_boundaries() {
        // Exactly one radius apart along each axis, including negative coordinates.
        let agents = at(&[(-2.0, 0.0), (0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (4.0, 4.0)]);
        assert_eq!(grid_neighbors(&agents, 2.0), pairwise_neighbors(&agents, 2.0));
    }

    #[test]
    fn for_each_pair_visits_each_pair_once() {
        let agents = at(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]);
        let mut pairs = Vec::new();
        for_each_pair_within(&agents, 1.0, |i, j| pairs.push((i, j)));
        assert_eq!(pairs, vec![(0, 1), (1, 2)]);
    }

    #[test]
    fn counts_report_list_lengths() {
        let agents = at(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]);
        let sets = pairwise_neighbors(&agents, 1.0);
        assert_eq!(sets.counts().collect::<Vec<_>>(), vec![1, 2, 1]);
        assert!(sets.of(99).is_empty());
    }
}
