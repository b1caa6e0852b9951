use crate::{
    cache::{Cache, Fingerprint},
    error::{SolverError, SolverResult},
    grid::Grid,
    pool::{Completion, Job, Outcome, Pool},
};
use ahash::AHashMap;
use crossbeam_channel::{bounded, RecvError};
use lab_structs::core::BatchStats;
use tracing::debug;

/// Fans node batches out to the pool and gathers the values in node order.
///
/// The cache is read and written here only, on the calling thread.
pub struct Dispatcher<'a> {
    pool: &'a Pool,
    cache: &'a mut Cache,
    inputs: usize,
    outputs: usize,
    limit: usize,
}

impl<'a> Dispatcher<'a> {
    pub fn new(pool: &'a Pool, cache: &'a mut Cache, inputs: usize, outputs: usize) -> Self {
        Self {
            pool,
            cache,
            inputs,
            outputs,
            limit: 2 * pool.size().max(1),
        }
    }

    /// Caps the jobs `evaluate` keeps in flight. Defaults to twice the pool
    /// size.
    pub fn in_flight(mut self, limit: usize) -> Self {
        self.limit = limit.max(1);
        self
    }

    /// Evaluates grid nodes. `indices` holds the packed grid index of every
    /// node; the expensive part of each index keys the cache.
    ///
    /// Nodes sharing a fingerprint that misses the cache are simulated once:
    /// the first is submitted right away and the rest follow with its series
    /// once it completes.
    pub fn dispatch(
        &mut self,
        nodes: &[f64],
        indices: &[u64],
    ) -> SolverResult<(Vec<f64>, BatchStats)> {
        let (ni, no) = (self.inputs, self.outputs);
        let count = self.count(nodes)?;
        if indices.len() != nodes.len() {
            return Err(SolverError::InvalidInput {
                reason: format!(
                    "{} indices do not match {} coordinates",
                    indices.len(),
                    nodes.len()
                ),
            });
        }

        let (done, completions) = bounded::<Completion>(count.max(1));
        let mut followers: AHashMap<Fingerprint, Vec<usize>> = AHashMap::new();
        let mut misses = 0;
        for slot in 0..count {
            let key = Fingerprint::new(&indices[slot * ni + 1..(slot + 1) * ni]);
            if let Some(waiting) = followers.get_mut(&key) {
                waiting.push(slot);
                continue;
            }
            let data = self.cache.get(&key);
            if data.is_none() {
                misses += 1;
                followers.insert(key.clone(), Vec::new());
            }
            self.pool.submit(Job {
                key: Some(key),
                data,
                node: nodes[slot * ni..(slot + 1) * ni].to_vec(),
                slot,
                value: vec![0.0; no],
                done: done.clone(),
            })?;
        }
        followers.retain(|_, waiting| !waiting.is_empty());
        let mut done = (!followers.is_empty()).then_some(done);

        let mut values = vec![0.0; count * no];
        let mut failure = None;
        let mut submitted = count - followers.values().map(Vec::len).sum::<usize>();
        let mut received = 0;
        while received < submitted {
            let completion = match completions.recv() {
                Ok(completion) => completion,
                Err(RecvError) => {
                    return Err(SolverError::Disconnected {
                        expected: count,
                        received,
                    })
                }
            };
            received += 1;
            if let Ok(outcome) = &completion {
                let waiting = match &outcome.key {
                    Some(key) if failure.is_none() => followers.remove(key),
                    _ => None,
                };
                if let (Some(waiting), Some(sender)) = (waiting, &done) {
                    for slot in waiting {
                        self.pool.submit(Job {
                            key: None,
                            data: Some(outcome.data.clone()),
                            node: nodes[slot * ni..(slot + 1) * ni].to_vec(),
                            slot,
                            value: vec![0.0; no],
                            done: sender.clone(),
                        })?;
                        submitted += 1;
                    }
                }
            }
            self.accept(completion, &mut values, &mut failure);
            if failure.is_some() || followers.is_empty() {
                done = None;
            }
        }
        if let Some(error) = failure {
            return Err(error);
        }
        debug!("Dispatched {} nodes with {} misses", count, misses);
        Ok((
            values,
            BatchStats {
                requested: count,
                misses,
            },
        ))
    }

    /// Evaluates arbitrary points, keeping at most the `in_flight` limit of
    /// jobs queued or running. Points whose expensive coordinates all sit on grid nodes go through
    /// the cache; the others are simulated without it.
    pub fn evaluate(&mut self, points: &[f64]) -> SolverResult<(Vec<f64>, BatchStats)> {
        let (ni, no) = (self.inputs, self.outputs);
        let count = self.count(points)?;
        let limit = self.limit;
        let grid = Grid::new(ni - 1);

        let (done, completions) = bounded::<Completion>(limit);
        let mut done = Some(done);
        let mut values = vec![0.0; count * no];
        let mut failure = None;
        let (mut submitted, mut received, mut misses) = (0, 0, 0);
        while received < count {
            while submitted < count && submitted - received < limit {
                let node = &points[submitted * ni..(submitted + 1) * ni];
                let key = grid.locate(&node[1..]).map(Fingerprint::from);
                let data = key.as_ref().and_then(|key| self.cache.get(key));
                if data.is_none() {
                    misses += 1;
                }
                let sender = match &done {
                    Some(sender) => sender.clone(),
                    None => break,
                };
                self.pool.submit(Job {
                    key,
                    data,
                    node: node.to_vec(),
                    slot: submitted,
                    value: vec![0.0; no],
                    done: sender,
                })?;
                submitted += 1;
                if submitted == count {
                    done = None;
                }
            }
            match completions.recv() {
                Ok(completion) => self.accept(completion, &mut values, &mut failure),
                Err(RecvError) => {
                    return Err(SolverError::Disconnected {
                        expected: count,
                        received,
                    })
                }
            }
            received += 1;
        }
        if let Some(error) = failure {
            return Err(error);
        }
        Ok((
            values,
            BatchStats {
                requested: count,
                misses,
            },
        ))
    }

    fn count(&self, points: &[f64]) -> SolverResult<usize> {
        if self.inputs == 0 || points.len() % self.inputs != 0 {
            return Err(SolverError::InvalidInput {
                reason: format!(
                    "{} coordinates do not form points of dimension {}",
                    points.len(),
                    self.inputs
                ),
            });
        }
        Ok(points.len() / self.inputs)
    }

    /// Records one completion. After the first failure, later outcomes are
    /// drained without being stored.
    fn accept(
        &mut self,
        completion: Completion,
        values: &mut [f64],
        failure: &mut Option<SolverError>,
    ) {
        match completion {
            Ok(Outcome {
                slot,
                key,
                data,
                value,
            }) => {
                if failure.is_some() {
                    return;
                }
                let no = self.outputs;
                values[slot * no..(slot + 1) * no].copy_from_slice(&value);
                if let Some(key) = key {
                    self.cache.set(key, data);
                }
            }
            Err(error) => {
                failure.get_or_insert(error);
            }
        }
    }
}
