//! Transient temperature, power, delay and energy of a multiprocessor system
//! whose task execution times are uncertain.

pub mod platform;
pub mod power;
pub mod schedule;
pub mod thermal;
pub mod uncertainty;

use anyhow::{anyhow, Result};
use lab_solver::{CachedSeries, Kernel};
use lab_structs::config::{Config, Target};
use ndarray::Array2;
use platform::Model;
use schedule::Schedule;
use thermal::Thermal;
use tracing::info;
use uncertainty::Uncertainty;

/// Simulator: replays the nominal schedule under the given task delays and
/// reports the configured target.
///
/// Temperature and power are series over the horizon with one channel per
/// core. Delay and energy are single-step series; energy carries its square
/// in a second channel.
pub struct System {
    model: Model,
    schedule: Schedule,
    thermal: Thermal,
    target: Target,
    time_step: f64,
    // Steps of the power and temperature profiles.
    horizon: usize,
    channels: Vec<usize>,
}

pub struct Scratch {
    schedule: Schedule,
    power: Array2<f64>,
}

impl System {
    pub fn new(model: Model, config: &Config, max_delay: f64) -> Result<Self> {
        let schedule = schedule::list(&model)?;
        let time_step = config.analysis.time_step;
        let target = config.system.target;

        // Every delayed schedule fits into the span of the slowest one.
        let mut slowest = schedule.clone();
        let delays = vec![max_delay; model.task_count()];
        schedule::recompute(&model, &schedule, &delays, &mut slowest);
        let horizon = ((slowest.span() / time_step).ceil() as usize).max(2);

        let channels = match target {
            Target::Temperature | Target::Power => config.system.core_index()?,
            Target::Delay => vec![0],
            Target::Energy => vec![0, 1],
        };
        if channels.is_empty() {
            return Err(anyhow!("At least one core should be observed"));
        }
        info!(
            "System with {} cores and {} tasks: span {:.4} s nominal, {} steps, target {}",
            model.core_count(),
            model.task_count(),
            schedule.span(),
            horizon,
            target
        );
        Ok(Self {
            thermal: Thermal::new(&config.analysis),
            model,
            schedule,
            target,
            time_step,
            horizon,
            channels,
        })
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn target(&self) -> Target {
        self.target
    }

    pub fn time_step(&self) -> f64 {
        self.time_step
    }
}

impl Kernel for System {
    type Scratch = Scratch;

    fn scratch(&self) -> Scratch {
        let rows = match self.target {
            Target::Temperature | Target::Power => self.horizon,
            Target::Delay | Target::Energy => 0,
        };
        Scratch {
            schedule: self.schedule.clone(),
            power: Array2::zeros((rows, self.model.core_count())),
        }
    }

    fn steps(&self) -> usize {
        match self.target {
            Target::Temperature | Target::Power => self.horizon,
            Target::Delay | Target::Energy => 1,
        }
    }

    fn channels(&self) -> &[usize] {
        &self.channels
    }

    fn simulate(&self, u: &[f64], scratch: &mut Scratch) -> Result<CachedSeries> {
        if u.len() != self.model.task_count() {
            return Err(anyhow!(
                "Expected {} delays but got {}",
                self.model.task_count(),
                u.len()
            ));
        }
        schedule::recompute(&self.model, &self.schedule, u, &mut scratch.schedule);
        let cores = self.model.core_count();
        match self.target {
            Target::Delay => CachedSeries::new(1, 1, vec![scratch.schedule.span()]),
            Target::Energy => {
                let energy = power::energy(&self.model, &scratch.schedule);
                CachedSeries::new(1, 2, vec![energy, energy * energy])
            }
            Target::Power => {
                power::distribute(&self.model, &scratch.schedule, self.time_step, &mut scratch.power);
                CachedSeries::new(self.horizon, cores, scratch.power.iter().copied().collect())
            }
            Target::Temperature => {
                power::distribute(&self.model, &scratch.schedule, self.time_step, &mut scratch.power);
                let temperature = self.thermal.compute(&scratch.power);
                CachedSeries::new(self.horizon, cores, temperature)
            }
        }
    }
}

/// Builds the uncertainty transform and the simulator described by `config`.
pub fn build(config: &Config) -> Result<(Uncertainty, System)> {
    config.validate()?;
    let model = Model::generate(&config.system)?;
    let tasks = config.system.task_index()?;
    let uncertainty = Uncertainty::new(&model, &tasks, &config.probability)?;
    info!(
        "Reduced {} uncertain tasks to {} variables",
        tasks.len(),
        uncertainty.dimensions()
    );
    let system = System::new(model, config, uncertainty.max_delay())?;
    Ok((uncertainty, system))
}
