use crate::{
    error::{SolverError, SolverResult},
    grid::{self, Grid, MAX_LEVEL},
};
use serde::{Deserialize, Serialize};

/// A hierarchical interpolant: nodes identified by packed grid indices, each
/// carrying one surplus per output.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Surrogate {
    pub inputs: usize,
    pub outputs: usize,
    /// Largest node level reached.
    pub level: usize,
    pub indices: Vec<u64>,
    pub surpluses: Vec<f64>,
}

impl Surrogate {
    pub fn new(inputs: usize, outputs: usize) -> Self {
        Self {
            inputs,
            outputs,
            level: 0,
            indices: Vec::new(),
            surpluses: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.indices.len() / self.inputs.max(1)
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Checks the shape and the indices of a surrogate read from elsewhere.
    pub fn validate(&self) -> SolverResult<()> {
        let invalid = |reason: String| Err(SolverError::InvalidInput { reason });
        if self.inputs == 0 || self.outputs == 0 {
            return invalid("the surrogate has no inputs or no outputs".to_string());
        }
        if self.indices.len() % self.inputs != 0 {
            return invalid(format!(
                "{} indices do not form nodes of dimension {}",
                self.indices.len(),
                self.inputs
            ));
        }
        if self.surpluses.len() != self.len() * self.outputs {
            return invalid(format!(
                "{} surpluses do not match {} nodes with {} outputs",
                self.surpluses.len(),
                self.len(),
                self.outputs
            ));
        }
        for &index in self.indices.iter() {
            let (level, order) = (grid::level(index) as usize, grid::order(index) as u64);
            if level > MAX_LEVEL || order % 2 == 0 || order >= 1u64 << (level + 1) {
                return invalid(format!("{:#x} is not a grid index", index));
            }
        }
        Ok(())
    }

    pub fn grid(&self) -> Grid {
        Grid::new(self.inputs)
    }

    pub fn nodes(&self) -> Vec<f64> {
        self.grid().nodes(&self.indices)
    }

    pub(crate) fn push(&mut self, index: &[u64], surplus: &[f64]) {
        self.level = self.level.max(self.grid().level(index));
        self.indices.extend_from_slice(index);
        self.surpluses.extend_from_slice(surplus);
    }

    /// Evaluates the interpolant at a row-major batch of points, returning a
    /// row-major matrix with `outputs` columns.
    pub fn evaluate(&self, points: &[f64]) -> Vec<f64> {
        let count = points.len() / self.inputs.max(1);
        let mut values = vec![0.0; count * self.outputs];
        for (point, value) in points
            .chunks(self.inputs)
            .zip(values.chunks_mut(self.outputs))
        {
            self.evaluate_into(point, value);
        }
        values
    }

    pub(crate) fn evaluate_into(&self, point: &[f64], value: &mut [f64]) {
        let grid = self.grid();
        value.fill(0.0);
        for (index, surplus) in self
            .indices
            .chunks(self.inputs)
            .zip(self.surpluses.chunks(self.outputs))
        {
            let weight = grid.basis(index, point);
            if weight == 0.0 {
                continue;
            }
            for (v, s) in value.iter_mut().zip(surplus) {
                *v += weight * s;
            }
        }
    }
}
