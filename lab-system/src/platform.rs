use anyhow::{anyhow, Result};
use lab_structs::config::SystemConfig;
use ndarray::Array2;
use rand::{rngs::SmallRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Core {
    pub id: usize,
    /// Relative speed; execution time scales with its inverse.
    pub speed: f64,
    /// Static power drawn regardless of load, in watts.
    pub leakage: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Task {
    pub id: usize,
    pub parents: Vec<usize>,
    pub children: Vec<usize>,
}

/// A multiprocessor platform running a task graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub cores: Vec<Core>,
    pub tasks: Vec<Task>,
    /// Execution time of every task on every core, tasks by cores.
    pub time: Array2<f64>,
    /// Dynamic power of every task on every core, tasks by cores.
    pub power: Array2<f64>,
}

pub const MIN_WORK: f64 = 1e-3;
pub const MAX_WORK: f64 = 1e-2;
pub const MIN_POWER: f64 = 5.0;
pub const MAX_POWER: f64 = 25.0;
pub const ROOT_PROBABILITY: f64 = 0.1;

impl Model {
    pub fn generate(config: &SystemConfig) -> Result<Self> {
        if config.cores == 0 || config.tasks == 0 {
            return Err(anyhow!("A model needs at least one core and one task"));
        }
        let mut rng = SmallRng::seed_from_u64(config.seed);

        let cores: Vec<Core> = (0..config.cores)
            .map(|id| Core {
                id,
                speed: rng.gen_range(0.8..1.2),
                leakage: rng.gen_range(0.5..1.5),
            })
            .collect();

        let mut tasks: Vec<Task> = Vec::with_capacity(config.tasks);
        for id in 0..config.tasks {
            let mut parents = Vec::new();
            if id > 0 && !rng.gen_bool(ROOT_PROBABILITY) {
                parents.push(rng.gen_range(0..id));
                if id > 1 && rng.gen_bool(0.5) {
                    let other = rng.gen_range(0..id);
                    if other != parents[0] {
                        parents.push(other);
                    }
                }
                parents.sort_unstable();
            }
            for &parent in parents.iter() {
                tasks[parent].children.push(id);
            }
            tasks.push(Task {
                id,
                parents,
                children: Vec::new(),
            });
        }

        let mut time = Array2::zeros((config.tasks, config.cores));
        let mut power = Array2::zeros((config.tasks, config.cores));
        for task in 0..config.tasks {
            let work = rng.gen_range(MIN_WORK..MAX_WORK);
            let draw = rng.gen_range(MIN_POWER..MAX_POWER);
            for (core, c) in cores.iter().enumerate() {
                time[[task, core]] = work / c.speed;
                power[[task, core]] = draw * c.speed * c.speed;
            }
        }

        Ok(Self {
            cores,
            tasks,
            time,
            power,
        })
    }

    pub fn core_count(&self) -> usize {
        self.cores.len()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Longest path from any root, in edges.
    pub fn depths(&self) -> Vec<usize> {
        let mut depths = vec![0; self.tasks.len()];
        // Parents always precede their children.
        for task in self.tasks.iter() {
            depths[task.id] = task
                .parents
                .iter()
                .map(|&parent| depths[parent] + 1)
                .max()
                .unwrap_or(0);
        }
        depths
    }
}
