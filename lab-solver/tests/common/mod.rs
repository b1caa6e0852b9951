#![allow(dead_code)]

use anyhow::{anyhow, Result};
use crossbeam_channel::Receiver;
use lab_solver::{CachedSeries, Kernel, Transform};
use lab_structs::config::{InterpolationConfig, SolverConfig};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

pub type Shape = fn(f64, &[f64], usize) -> f64;

pub struct Identity {
    pub dimensions: usize,
}

impl Transform for Identity {
    fn inputs(&self) -> usize {
        self.dimensions
    }

    fn outputs(&self) -> usize {
        self.dimensions
    }

    fn transform(&self, z: &[f64], u: &mut [f64]) -> Result<()> {
        u.copy_from_slice(z);
        Ok(())
    }
}

/// Tabulates `shape` over time and counts its simulations.
pub struct Counting {
    pub steps: usize,
    pub width: usize,
    pub channels: Vec<usize>,
    pub shape: Shape,
    pub calls: Arc<AtomicUsize>,
    pub fail_above: Option<f64>,
    pub panic_above: Option<f64>,
    /// When set, every simulation waits for one token before computing.
    pub gate: Option<Receiver<()>>,
}

impl Counting {
    pub fn new(shape: Shape) -> Self {
        Self {
            steps: 5,
            width: 2,
            channels: vec![0, 1],
            shape,
            calls: Arc::new(AtomicUsize::new(0)),
            fail_above: None,
            panic_above: None,
            gate: None,
        }
    }

    pub fn counter(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

impl Kernel for Counting {
    type Scratch = Vec<f64>;

    fn scratch(&self) -> Self::Scratch {
        Vec::with_capacity(self.steps * self.width)
    }

    fn steps(&self) -> usize {
        self.steps
    }

    fn channels(&self) -> &[usize] {
        &self.channels
    }

    fn simulate(&self, u: &[f64], scratch: &mut Self::Scratch) -> Result<CachedSeries> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.recv()?;
        }
        if let Some(threshold) = self.fail_above {
            if u[0] > threshold {
                return Err(anyhow!("Input {} is out of range", u[0]));
            }
        }
        if let Some(threshold) = self.panic_above {
            if u[0] > threshold {
                panic!("Input {} is out of range", u[0]);
            }
        }
        scratch.clear();
        for step in 0..self.steps {
            let time = step as f64 / (self.steps - 1).max(1) as f64;
            for channel in 0..self.width {
                scratch.push((self.shape)(time, u, channel));
            }
        }
        CachedSeries::new(self.steps, self.width, scratch.clone())
    }
}

pub fn linear(time: f64, u: &[f64], channel: usize) -> f64 {
    let sum: f64 = u.iter().enumerate().map(|(i, x)| (i + 1) as f64 * x).sum();
    (channel + 1) as f64 * time + sum + channel as f64
}

pub fn bump(time: f64, u: &[f64], channel: usize) -> f64 {
    let exponent: f64 = u.iter().map(|x| -10.0 * (x - 0.4) * (x - 0.4)).sum();
    (1.0 + time) * exponent.exp() + channel as f64 * u[0] * u[0]
}

pub fn calls(counter: &Arc<AtomicUsize>) -> usize {
    counter.load(Ordering::SeqCst)
}

pub fn interpolation(min_level: usize, max_level: usize, tolerance: f64) -> InterpolationConfig {
    InterpolationConfig {
        min_level,
        max_level,
        tolerance,
        max_nodes: None,
    }
}

pub fn solver_config(workers: usize) -> SolverConfig {
    SolverConfig {
        workers: Some(workers),
        cache_capacity: None,
    }
}
