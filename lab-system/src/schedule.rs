use crate::platform::Model;
use anyhow::{anyhow, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    /// Core of every task.
    pub mapping: Vec<usize>,
    /// Tasks in dispatch order; parents always come first.
    pub order: Vec<usize>,
    pub start: Vec<f64>,
    pub finish: Vec<f64>,
}

impl Schedule {
    pub fn span(&self) -> f64 {
        self.finish.iter().copied().fold(0.0, f64::max)
    }
}

fn mean_time(model: &Model, task: usize) -> f64 {
    let row = model.time.row(task);
    row.sum() / row.len() as f64
}

/// Difference between the latest and the earliest start of every task
/// under mean execution times and unlimited cores.
pub fn mobility(model: &Model) -> Vec<f64> {
    let count = model.task_count();
    let times: Vec<f64> = (0..count).map(|task| mean_time(model, task)).collect();

    let mut asap = vec![0.0f64; count];
    for task in model.tasks.iter() {
        asap[task.id] = task
            .parents
            .iter()
            .map(|&parent| asap[parent] + times[parent])
            .fold(0.0, f64::max);
    }
    let span = (0..count)
        .map(|task| asap[task] + times[task])
        .fold(0.0, f64::max);

    let mut alap = vec![0.0f64; count];
    for task in model.tasks.iter().rev() {
        alap[task.id] = task
            .children
            .iter()
            .map(|&child| alap[child])
            .fold(span, f64::min)
            - times[task.id];
    }

    asap.iter().zip(&alap).map(|(early, late)| late - early).collect()
}

/// List scheduling: among ready tasks the least mobile goes first, onto the
/// core where it finishes earliest.
pub fn list(model: &Model) -> Result<Schedule> {
    let (tasks, cores) = (model.task_count(), model.core_count());
    let mobility = mobility(model);

    let mut mapping = vec![0; tasks];
    let mut order = Vec::with_capacity(tasks);
    let mut start = vec![0.0; tasks];
    let mut finish = vec![0.0; tasks];
    let mut available = vec![0.0f64; cores];
    let mut pending: Vec<usize> = model.tasks.iter().map(|task| task.parents.len()).collect();
    let mut ready: Vec<usize> = (0..tasks).filter(|&task| pending[task] == 0).collect();

    while !ready.is_empty() {
        let (position, &task) = ready
            .iter()
            .enumerate()
            .min_by(|&(_, a), &(_, b)| mobility[*a].total_cmp(&mobility[*b]).then(a.cmp(b)))
            .ok_or_else(|| anyhow!("No ready task"))?;
        ready.swap_remove(position);

        let release = model.tasks[task]
            .parents
            .iter()
            .map(|&parent| finish[parent])
            .fold(0.0, f64::max);
        let mut best = (f64::INFINITY, 0);
        for core in 0..cores {
            let end = release.max(available[core]) + model.time[[task, core]];
            if end < best.0 {
                best = (end, core);
            }
        }
        let (end, core) = best;
        mapping[task] = core;
        start[task] = end - model.time[[task, core]];
        finish[task] = end;
        available[core] = end;
        order.push(task);

        for &child in model.tasks[task].children.iter() {
            pending[child] -= 1;
            if pending[child] == 0 {
                ready.push(child);
            }
        }
    }

    if order.len() != tasks {
        return Err(anyhow!(
            "Scheduled {} of {} tasks; the task graph has a cycle",
            order.len(),
            tasks
        ));
    }
    Ok(Schedule {
        mapping,
        order,
        start,
        finish,
    })
}

/// Replays a schedule with every execution time stretched by `1 + delays[task]`,
/// keeping mapping and order.
pub fn recompute(model: &Model, schedule: &Schedule, delays: &[f64], output: &mut Schedule) {
    output.mapping.clone_from(&schedule.mapping);
    output.order.clone_from(&schedule.order);
    output.start.resize(schedule.start.len(), 0.0);
    output.finish.resize(schedule.finish.len(), 0.0);

    let mut available = vec![0.0f64; model.core_count()];
    for &task in schedule.order.iter() {
        let core = schedule.mapping[task];
        let release = model.tasks[task]
            .parents
            .iter()
            .map(|&parent| output.finish[parent])
            .fold(available[core], f64::max);
        let delay = delays.get(task).copied().unwrap_or(0.0);
        let duration = model.time[[task, core]] * (1.0 + delay);
        output.start[task] = release;
        output.finish[task] = release + duration;
        available[core] = release + duration;
    }
}
