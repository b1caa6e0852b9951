//! Hierarchical grid on the open unit hypercube.
//!
//! A one-dimensional node is identified by a level `l` and an odd order `o`
//! and sits at `o / 2^(l + 1)`. Level 0 holds the single node `1/2`; every
//! node has two children one level deeper. Boundary points 0 and 1 never
//! appear, so coordinates stay strictly inside the unit interval.
//!
//! Indices are packed into `u64` words, one word per dimension, with the
//! level in the low half and the order in the high half.

const LEVEL_BITS: u32 = 32;
const LEVEL_MASK: u64 = (1 << LEVEL_BITS) - 1;

/// The deepest level a single dimension may reach.
pub const MAX_LEVEL: usize = 31;

pub fn pack(level: u32, order: u32) -> u64 {
    level as u64 | (order as u64) << LEVEL_BITS
}

pub fn level(index: u64) -> u32 {
    (index & LEVEL_MASK) as u32
}

pub fn order(index: u64) -> u32 {
    (index >> LEVEL_BITS) as u32
}

pub fn root() -> u64 {
    pack(0, 1)
}

pub fn coordinate(index: u64) -> f64 {
    order(index) as f64 / scale(level(index))
}

pub fn children(index: u64) -> [u64; 2] {
    let (level, order) = (level(index), order(index));
    [pack(level + 1, 2 * order - 1), pack(level + 1, 2 * order + 1)]
}

/// Finds the node sitting exactly at `x`, if any.
pub fn locate(x: f64) -> Option<u64> {
    if !(x > 0.0 && x < 1.0) {
        return None;
    }
    for level in 0..=MAX_LEVEL as u32 {
        let scaled = x * scale(level);
        if scaled.fract() == 0.0 {
            let order = scaled as u64;
            return (order % 2 == 1).then(|| pack(level, order as u32));
        }
    }
    None
}

/// Modified piecewise-linear hat function.
///
/// The two outermost functions of every level above 0 are extrapolated
/// linearly toward the boundary, so the basis spans linear functions
/// without boundary nodes.
pub fn basis(index: u64, x: f64) -> f64 {
    let (level, order) = (level(index), order(index));
    if level == 0 {
        return 1.0;
    }
    let scale = scale(level);
    let last = (1u64 << (level + 1)) - 1;
    if order == 1 {
        (2.0 - x * scale).max(0.0)
    } else if order as u64 == last {
        (2.0 - (1.0 - x) * scale).max(0.0)
    } else {
        (1.0 - (x * scale - order as f64).abs()).max(0.0)
    }
}

fn scale(level: u32) -> f64 {
    (1u64 << (level + 1)) as f64
}

/// Multi-dimensional view over packed indices, `dimensions` words per node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    dimensions: usize,
}

impl Grid {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn count(&self, indices: &[u64]) -> usize {
        indices.len() / self.dimensions
    }

    /// Sum of the per-dimension levels of one node.
    pub fn level(&self, index: &[u64]) -> usize {
        index.iter().map(|&i| level(i) as usize).sum()
    }

    pub fn nodes(&self, indices: &[u64]) -> Vec<f64> {
        indices.iter().map(|&i| coordinate(i)).collect()
    }

    /// Every node whose level does not exceed `level`, in breadth-first order.
    pub fn initial(&self, level: usize) -> Vec<u64> {
        let mut indices = vec![root(); self.dimensions];
        let mut start = 0;
        while start < indices.len() {
            let end = indices.len();
            for offset in (start..end).step_by(self.dimensions) {
                let index = indices[offset..offset + self.dimensions].to_vec();
                if self.level(&index) >= level {
                    continue;
                }
                for child in self.children(&index).chunks(self.dimensions) {
                    let known = indices[..]
                        .chunks(self.dimensions)
                        .any(|existing| existing == child);
                    if !known {
                        indices.extend_from_slice(child);
                    }
                }
            }
            start = end;
        }
        indices
    }

    /// Children of one node, two per dimension, flattened.
    pub fn children(&self, index: &[u64]) -> Vec<u64> {
        let mut result = Vec::with_capacity(2 * self.dimensions * self.dimensions);
        for i in 0..self.dimensions {
            for child in children(index[i]) {
                result.extend_from_slice(index);
                let last = result.len() - self.dimensions;
                result[last + i] = child;
            }
        }
        result
    }

    pub fn basis(&self, index: &[u64], point: &[f64]) -> f64 {
        let mut result = 1.0;
        for (&i, &x) in index.iter().zip(point) {
            result *= basis(i, x);
            if result == 0.0 {
                break;
            }
        }
        result
    }

    pub fn locate(&self, point: &[f64]) -> Option<Vec<u64>> {
        point.iter().map(|&x| locate(x)).collect()
    }
}
