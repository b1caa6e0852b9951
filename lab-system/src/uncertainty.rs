use crate::platform::Model;
use anyhow::{anyhow, Result};
use lab_solver::Transform;
use lab_structs::config::ProbabilityConfig;
use ndarray::Array2;
use statrs::distribution::{Beta, ContinuousCDF, Normal};
use std::str::FromStr;

const EPSILON: f64 = 1e-12;

/// Marginal distribution of a delay on [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub enum Marginal {
    Beta(Beta),
    Uniform,
}

impl FromStr for Marginal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (name, arguments) = match s.split_once('(') {
            Some((name, rest)) => (
                name.trim(),
                rest.strip_suffix(')')
                    .ok_or_else(|| anyhow!("Unbalanced parentheses in '{}'", s))?,
            ),
            None => (s, ""),
        };
        let arguments = arguments
            .split(',')
            .map(str::trim)
            .filter(|argument| !argument.is_empty())
            .map(|argument| {
                argument
                    .parse::<f64>()
                    .map_err(|_| anyhow!("'{}' is not a number", argument))
            })
            .collect::<Result<Vec<f64>>>()?;
        match (name.to_lowercase().as_str(), arguments.as_slice()) {
            ("beta", &[a, b]) => Beta::new(a, b)
                .map(Marginal::Beta)
                .map_err(|e| anyhow!("Invalid beta distribution: {}", e)),
            ("uniform", &[]) => Ok(Marginal::Uniform),
            _ => Err(anyhow!("Unknown marginal distribution '{}'", s)),
        }
    }
}

impl Marginal {
    pub fn inverse_cdf(&self, p: f64) -> f64 {
        let p = p.clamp(0.0, 1.0);
        match self {
            Marginal::Beta(beta) => beta.inverse_cdf(p),
            Marginal::Uniform => p,
        }
    }
}

/// Correlation of task delays, decaying with the distance between tasks in
/// the layered drawing of the task graph.
pub fn correlation(model: &Model, tasks: &[usize], length: f64) -> Array2<f64> {
    let depths = model.depths();
    let mut lanes = vec![0usize; model.task_count()];
    let mut filled = vec![0usize; depths.iter().copied().max().map_or(0, |d| d + 1)];
    for task in 0..model.task_count() {
        lanes[task] = filled[depths[task]];
        filled[depths[task]] += 1;
    }

    let n = tasks.len();
    Array2::from_shape_fn((n, n), |(i, j)| {
        let (a, b) = (tasks[i], tasks[j]);
        let dy = depths[a] as f64 - depths[b] as f64;
        let dx = lanes[a] as f64 - lanes[b] as f64;
        (-(dx * dx + dy * dy) / (length * length)).exp()
    })
}

/// Eigenvalues in decreasing order and the matching eigenvectors as columns,
/// by cyclic Jacobi rotations.
pub fn decompose(matrix: &Array2<f64>) -> (Vec<f64>, Array2<f64>) {
    let n = matrix.nrows();
    let mut a = matrix.clone();
    let mut v = Array2::<f64>::eye(n);
    for _ in 0..100 {
        let off: f64 = (0..n)
            .flat_map(|i| (0..n).filter(move |&j| j != i).map(move |j| (i, j)))
            .map(|(i, j)| a[[i, j]] * a[[i, j]])
            .sum();
        if off < EPSILON * EPSILON {
            break;
        }
        for p in 0..n {
            for q in p + 1..n {
                if a[[p, q]].abs() < f64::MIN_POSITIVE {
                    continue;
                }
                let theta = (a[[q, q]] - a[[p, p]]) / (2.0 * a[[p, q]]);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;
                for k in 0..n {
                    let (akp, akq) = (a[[k, p]], a[[k, q]]);
                    a[[k, p]] = c * akp - s * akq;
                    a[[k, q]] = s * akp + c * akq;
                }
                for k in 0..n {
                    let (apk, aqk) = (a[[p, k]], a[[q, k]]);
                    a[[p, k]] = c * apk - s * aqk;
                    a[[q, k]] = s * apk + c * aqk;
                }
                for k in 0..n {
                    let (vkp, vkq) = (v[[k, p]], v[[k, q]]);
                    v[[k, p]] = c * vkp - s * vkq;
                    v[[k, q]] = s * vkp + c * vkq;
                }
            }
        }
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| a[[j, j]].total_cmp(&a[[i, i]]));
    let values = order.iter().map(|&i| a[[i, i]]).collect();
    let vectors = Array2::from_shape_fn((n, n), |(k, i)| v[[k, order[i]]]);
    (values, vectors)
}

/// Maps independent standard-uniform variables to correlated task delays.
///
/// Uniforms become standard normals, a truncated eigendecomposition of the
/// correlation matrix mixes them, and the normal distribution function
/// followed by the inverse marginal turns them into delays in
/// `[0, max_delay]`, as fractions of the execution time.
#[derive(Debug, Clone)]
pub struct Uncertainty {
    tasks: Vec<usize>,
    total: usize,
    max_delay: f64,
    mapping: Array2<f64>,
    marginal: Marginal,
    normal: Normal,
}

impl Uncertainty {
    pub fn new(model: &Model, tasks: &[usize], config: &ProbabilityConfig) -> Result<Self> {
        if tasks.is_empty() {
            return Err(anyhow!("At least one task should be uncertain"));
        }
        if let Some(&task) = tasks.iter().find(|&&task| task >= model.task_count()) {
            return Err(anyhow!("Task {} does not exist", task));
        }
        let marginal = config.marginal.parse::<Marginal>()?;
        let normal = Normal::new(0.0, 1.0).map_err(|e| anyhow!("{}", e))?;

        let correlation = correlation(model, tasks, config.corr_length);
        let (values, vectors) = decompose(&correlation);
        let total: f64 = values.iter().map(|v| v.max(0.0)).sum();
        let mut preserved = 0.0;
        let mut dimensions = 0;
        for &value in values.iter() {
            dimensions += 1;
            preserved += value.max(0.0);
            if preserved >= config.var_threshold * total {
                break;
            }
        }

        let n = tasks.len();
        let mapping = Array2::from_shape_fn((n, dimensions), |(i, j)| {
            vectors[[i, j]] * values[j].max(0.0).sqrt()
        });
        Ok(Self {
            tasks: tasks.to_vec(),
            total: model.task_count(),
            max_delay: config.max_delay,
            mapping,
            marginal,
            normal,
        })
    }

    pub fn dimensions(&self) -> usize {
        self.mapping.ncols()
    }

    pub fn max_delay(&self) -> f64 {
        self.max_delay
    }
}

impl Transform for Uncertainty {
    fn inputs(&self) -> usize {
        self.dimensions()
    }

    fn outputs(&self) -> usize {
        self.total
    }

    fn transform(&self, z: &[f64], u: &mut [f64]) -> Result<()> {
        if z.len() != self.dimensions() || u.len() != self.total {
            return Err(anyhow!(
                "Expected {} variables and {} delays but got {} and {}",
                self.dimensions(),
                self.total,
                z.len(),
                u.len()
            ));
        }
        let normals: Vec<f64> = z
            .iter()
            .map(|&x| self.normal.inverse_cdf(x.clamp(EPSILON, 1.0 - EPSILON)))
            .collect();
        u.fill(0.0);
        for (i, &task) in self.tasks.iter().enumerate() {
            let x: f64 = self
                .mapping
                .row(i)
                .iter()
                .zip(&normals)
                .map(|(m, g)| m * g)
                .sum();
            u[task] = self.max_delay * self.marginal.inverse_cdf(self.normal.cdf(x));
        }
        Ok(())
    }
}
