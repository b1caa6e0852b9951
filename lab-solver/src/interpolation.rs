use crate::{error::SolverResult, grid::Grid, surrogate::Surrogate};
use ahash::AHashSet;
use lab_structs::{
    config::InterpolationConfig,
    core::{BatchStats, Progress},
};
use tracing::info;

/// Adaptive hierarchical interpolation driven round by round.
pub struct Interpolator {
    grid: Grid,
    outputs: usize,
    config: InterpolationConfig,
}

impl Interpolator {
    pub fn new(inputs: usize, outputs: usize, config: &InterpolationConfig) -> Self {
        Self {
            grid: Grid::new(inputs),
            outputs,
            config: config.clone(),
        }
    }

    /// Builds a surrogate of `target`, which evaluates a batch of nodes given
    /// their coordinates and packed indices. `monitor` sees every round.
    ///
    /// The first round holds every node up to the minimal level. A node is
    /// refined when its score exceeds the tolerance and its level is below
    /// the maximal one; a tolerance of zero disables refinement.
    pub fn compute<F, M>(&self, mut target: F, mut monitor: M) -> SolverResult<Surrogate>
    where
        F: FnMut(&[f64], &[u64]) -> SolverResult<(Vec<f64>, BatchStats)>,
        M: FnMut(&Progress),
    {
        let (ni, no) = (self.grid.dimensions(), self.outputs);
        let budget = self.config.max_nodes.unwrap_or(usize::MAX);
        let mut surrogate = Surrogate::new(ni, no);
        let mut indices = self.grid.initial(self.config.min_level);
        let mut known: AHashSet<Vec<u64>> = indices.chunks(ni).map(|i| i.to_vec()).collect();
        let mut progress = Progress {
            round: 0,
            level: 0,
            requested: 0,
            misses: 0,
            total_requested: 0,
            total_misses: 0,
        };

        while !indices.is_empty() {
            let count = self.grid.count(&indices);
            let nodes = self.grid.nodes(&indices);
            let (values, stats) = target(&nodes, &indices)?;

            let levels: Vec<usize> = indices.chunks(ni).map(|i| self.grid.level(i)).collect();
            let mut order: Vec<usize> = (0..count).collect();
            order.sort_by_key(|&i| levels[i]);

            // Nodes of one level are measured against coarser levels only.
            let mut surpluses = vec![0.0; count * no];
            let mut scores = vec![0.0f64; count];
            for group in order.chunk_by(|&a, &b| levels[a] == levels[b]) {
                for &i in group {
                    let surplus = &mut surpluses[i * no..(i + 1) * no];
                    surrogate.evaluate_into(&nodes[i * ni..(i + 1) * ni], surplus);
                    for (s, v) in surplus.iter_mut().zip(&values[i * no..(i + 1) * no]) {
                        *s = v - *s;
                        scores[i] = scores[i].max(s.abs());
                    }
                }
                for &i in group {
                    surrogate.push(
                        &indices[i * ni..(i + 1) * ni],
                        &surpluses[i * no..(i + 1) * no],
                    );
                }
            }

            progress.round += 1;
            progress.level = levels.iter().copied().max().unwrap_or(0);
            progress.requested = stats.requested;
            progress.misses = stats.misses;
            progress.total_requested += stats.requested;
            progress.total_misses += stats.misses;
            info!(
                "Round {}: level {}, {} nodes, {} simulated ({:.2}%, {:.2}% of {} so far)",
                progress.round,
                progress.level,
                progress.requested,
                progress.misses,
                progress.miss_rate(),
                progress.total_miss_rate(),
                progress.total_requested,
            );
            monitor(&progress);

            if self.config.tolerance == 0.0 {
                break;
            }
            let remaining = budget.saturating_sub(surrogate.len());
            if remaining == 0 {
                break;
            }
            let mut next = Vec::new();
            for i in 0..count {
                if !(scores[i] > self.config.tolerance) || levels[i] >= self.config.max_level {
                    continue;
                }
                for child in self.grid.children(&indices[i * ni..(i + 1) * ni]).chunks(ni) {
                    if known.insert(child.to_vec()) {
                        next.extend_from_slice(child);
                    }
                }
            }
            next.truncate(remaining.saturating_mul(ni));
            indices = next;
        }

        Ok(surrogate)
    }
}
