use crate::{
    cache::Fingerprint,
    error::{SolverError, SolverResult},
    target::{CachedSeries, Kernel, Transform},
};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::{
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    thread::{self, JoinHandle},
};
use tracing::debug;

pub type Completion = SolverResult<Outcome>;

/// One node to evaluate. A job carrying `data` skips the simulation.
pub struct Job {
    pub key: Option<Fingerprint>,
    pub data: Option<Arc<CachedSeries>>,
    pub node: Vec<f64>,
    pub slot: usize,
    pub value: Vec<f64>,
    pub done: Sender<Completion>,
}

pub struct Outcome {
    pub slot: usize,
    pub key: Option<Fingerprint>,
    pub data: Arc<CachedSeries>,
    pub value: Vec<f64>,
}

/// Fixed set of worker threads consuming one shared job queue.
pub struct Pool {
    jobs: Option<Sender<Job>>,
    handles: Vec<JoinHandle<()>>,
}

impl Pool {
    pub fn spawn<T, K>(size: usize, transform: Arc<T>, kernel: Arc<K>) -> SolverResult<Self>
    where
        T: Transform + 'static,
        K: Kernel + 'static,
    {
        if size == 0 {
            return Err(SolverError::InvalidConfig {
                reason: "the pool needs at least one worker".to_string(),
            });
        }
        let (sender, receiver) = bounded::<Job>(size);
        let mut handles = Vec::with_capacity(size);
        for i in 0..size {
            let mut worker = Worker::new(transform.clone(), kernel.clone());
            let receiver = receiver.clone();
            let handle = thread::Builder::new()
                .name(format!("lab-worker-{}", i))
                .spawn(move || worker.serve(receiver))
                .map_err(|e| SolverError::Spawn {
                    reason: e.to_string(),
                })?;
            handles.push(handle);
        }
        debug!("Spawned {} workers", size);
        Ok(Self {
            jobs: Some(sender),
            handles,
        })
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Queues a job, blocking while every worker is busy and the queue is full.
    pub fn submit(&self, job: Job) -> SolverResult<()> {
        let closed = || SolverError::Disconnected {
            expected: 1,
            received: 0,
        };
        match &self.jobs {
            Some(jobs) => jobs.send(job).map_err(|_| closed()),
            None => Err(closed()),
        }
    }

    /// Stops accepting jobs and waits for the workers to drain the queue.
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if self.jobs.take().is_none() {
            return;
        }
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
        debug!("Workers stopped");
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct Worker<T: Transform, K: Kernel> {
    transform: Arc<T>,
    kernel: Arc<K>,
    input: Vec<f64>,
    scratch: K::Scratch,
}

impl<T: Transform, K: Kernel> Worker<T, K> {
    fn new(transform: Arc<T>, kernel: Arc<K>) -> Self {
        let input = vec![0.0; transform.outputs()];
        let scratch = kernel.scratch();
        Self {
            transform,
            kernel,
            input,
            scratch,
        }
    }

    fn serve(&mut self, jobs: Receiver<Job>) {
        for job in jobs.iter() {
            let Job {
                key,
                data,
                node,
                slot,
                mut value,
                done,
            } = job;
            let completion = self.process(data, &node, &mut value).map(|data| Outcome {
                slot,
                key,
                data,
                value,
            });
            // The dispatcher may have given up on the batch already.
            let _ = done.send(completion);
        }
    }

    fn process(
        &mut self,
        data: Option<Arc<CachedSeries>>,
        node: &[f64],
        value: &mut [f64],
    ) -> SolverResult<Arc<CachedSeries>> {
        let data = match data {
            Some(data) => data,
            None => Arc::new(self.simulate(&node[1..])?),
        };
        let step = data.step(node[0]);
        for (value, &channel) in value.iter_mut().zip(self.kernel.channels()) {
            *value = data.extract(step, channel).ok_or_else(|| SolverError::Kernel {
                reason: format!("channel {} is missing from the series", channel),
            })?;
        }
        Ok(data)
    }

    fn simulate(&mut self, z: &[f64]) -> SolverResult<CachedSeries> {
        let Self {
            transform,
            kernel,
            input,
            scratch,
        } = self;
        let result = panic::catch_unwind(AssertUnwindSafe(|| -> anyhow::Result<CachedSeries> {
            transform.transform(z, input)?;
            kernel.simulate(input, scratch)
        }));
        match result {
            Ok(Ok(series)) => Ok(series),
            Ok(Err(e)) => Err(SolverError::Kernel {
                reason: e.to_string(),
            }),
            Err(_) => Err(SolverError::Kernel {
                reason: "the simulation panicked".to_string(),
            }),
        }
    }
}
