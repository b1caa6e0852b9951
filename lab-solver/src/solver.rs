use crate::{
    cache::Cache,
    dispatch::Dispatcher,
    error::{SolverError, SolverResult},
    grid::MAX_LEVEL,
    interpolation::Interpolator,
    pool::Pool,
    surrogate::Surrogate,
    target::{Kernel, Transform},
};
use lab_structs::{
    config::{InterpolationConfig, SolverConfig},
    core::{BatchStats, Progress},
};
use std::sync::Arc;
use tracing::info;

/// Builds surrogates of `kernel` composed with `transform`.
///
/// Inputs are `1 + transform.inputs()` dimensional: normalized time first,
/// then the standard-uniform variables. The result cache lives as long as the
/// solver, so later runs and direct evaluations reuse earlier simulations.
pub struct Solver<T: Transform, K: Kernel> {
    transform: Arc<T>,
    kernel: Arc<K>,
    interpolation: InterpolationConfig,
    workers: usize,
    cache: Cache,
}

impl<T, K> Solver<T, K>
where
    T: Transform + 'static,
    K: Kernel + 'static,
{
    pub fn new(
        transform: T,
        kernel: K,
        interpolation: &InterpolationConfig,
        config: &SolverConfig,
    ) -> SolverResult<Self> {
        interpolation.validate()?;
        config.validate()?;
        let invalid = |reason: &str| SolverError::InvalidConfig {
            reason: reason.to_string(),
        };
        if interpolation.max_level > MAX_LEVEL {
            return Err(SolverError::InvalidConfig {
                reason: format!("the maximal level should not exceed {}", MAX_LEVEL),
            });
        }
        if transform.inputs() == 0 {
            return Err(invalid("the transform has no inputs"));
        }
        if kernel.steps() == 0 {
            return Err(invalid("the kernel has no time steps"));
        }
        if kernel.channels().is_empty() {
            return Err(invalid("the kernel has no output channels"));
        }
        Ok(Self {
            transform: Arc::new(transform),
            kernel: Arc::new(kernel),
            interpolation: interpolation.clone(),
            workers: config.worker_count(),
            cache: Cache::new(config.cache_capacity_or_default()),
        })
    }

    pub fn inputs(&self) -> usize {
        1 + self.transform.inputs()
    }

    pub fn outputs(&self) -> usize {
        self.kernel.channels().len()
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn transform(&self) -> &T {
        &self.transform
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    /// Runs the adaptive interpolation to completion. A failed simulation
    /// aborts the run and no surrogate is returned.
    pub fn solve<M>(&mut self, monitor: M) -> SolverResult<Surrogate>
    where
        M: FnMut(&Progress),
    {
        let (ni, no) = (self.inputs(), self.outputs());
        info!(
            "Constructing a surrogate with {} inputs and {} outputs on {} workers",
            ni, no, self.workers
        );
        let pool = Pool::spawn(self.workers, self.transform.clone(), self.kernel.clone())?;
        let interpolator = Interpolator::new(ni, no, &self.interpolation);
        let result = {
            let mut dispatcher = Dispatcher::new(&pool, &mut self.cache, ni, no);
            interpolator.compute(|nodes, indices| dispatcher.dispatch(nodes, indices), monitor)
        };
        pool.close();
        let surrogate = result?;
        info!(
            "Surrogate ready: {} nodes up to level {}, {} cached simulations ({} hits, {} misses)",
            surrogate.len(),
            surrogate.level,
            self.cache.len(),
            self.cache.hits(),
            self.cache.misses()
        );
        Ok(surrogate)
    }

    /// Evaluates a surrogate at a row-major batch of points.
    pub fn evaluate(&self, surrogate: &Surrogate, points: &[f64]) -> SolverResult<Vec<f64>> {
        surrogate.validate()?;
        if surrogate.inputs != self.inputs() || surrogate.outputs != self.outputs() {
            return Err(SolverError::InvalidInput {
                reason: format!(
                    "a surrogate with {} inputs and {} outputs does not fit a solver with {} and {}",
                    surrogate.inputs,
                    surrogate.outputs,
                    self.inputs(),
                    self.outputs()
                ),
            });
        }
        if points.len() % surrogate.inputs != 0 {
            return Err(SolverError::InvalidInput {
                reason: format!(
                    "{} coordinates do not form points of dimension {}",
                    points.len(),
                    surrogate.inputs
                ),
            });
        }
        Ok(surrogate.evaluate(points))
    }

    /// Evaluates the simulation itself at a row-major batch of points.
    pub fn compute(&mut self, points: &[f64]) -> SolverResult<(Vec<f64>, BatchStats)> {
        let (ni, no) = (self.inputs(), self.outputs());
        let pool = Pool::spawn(self.workers, self.transform.clone(), self.kernel.clone())?;
        let result = Dispatcher::new(&pool, &mut self.cache, ni, no).evaluate(points);
        pool.close();
        result
    }
}
