use anyhow::{anyhow, Result};

/// Maps standard-uniform variables `z` to simulation inputs `u`.
pub trait Transform: Send + Sync {
    fn inputs(&self) -> usize;
    fn outputs(&self) -> usize;
    fn transform(&self, z: &[f64], u: &mut [f64]) -> Result<()>;
}

/// The expensive simulation producing a full time series per input.
pub trait Kernel: Send + Sync {
    /// Per-worker working memory, reused across simulations.
    type Scratch: Send;

    fn scratch(&self) -> Self::Scratch;
    fn steps(&self) -> usize;
    /// The channels extracted as outputs, in output order.
    fn channels(&self) -> &[usize];
    fn simulate(&self, u: &[f64], scratch: &mut Self::Scratch) -> Result<CachedSeries>;
}

/// A simulated time series, `steps` rows of `channels` values.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedSeries {
    steps: usize,
    channels: usize,
    data: Vec<f64>,
}

impl CachedSeries {
    pub fn new(steps: usize, channels: usize, data: Vec<f64>) -> Result<Self> {
        if steps == 0 || data.len() != steps * channels {
            return Err(anyhow!(
                "Expected {} steps of {} channels but got {} values",
                steps,
                channels,
                data.len()
            ));
        }
        Ok(Self {
            steps,
            channels,
            data,
        })
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// The step addressed by a normalized time in [0, 1].
    pub fn step(&self, time: f64) -> usize {
        let step = (time * (self.steps - 1) as f64).floor();
        if step > 0.0 {
            (step as usize).min(self.steps - 1)
        } else {
            0
        }
    }

    pub fn extract(&self, step: usize, channel: usize) -> Option<f64> {
        if step < self.steps && channel < self.channels {
            Some(self.data[step * self.channels + channel])
        } else {
            None
        }
    }
}
