use crate::{platform::Model, schedule::Schedule};
use ndarray::Array2;

/// Average power of every core over every time step, steps by cores.
///
/// Activity past the last step is dropped.
pub fn distribute(model: &Model, schedule: &Schedule, time_step: f64, power: &mut Array2<f64>) {
    let steps = power.nrows();
    for (core, mut column) in power.columns_mut().into_iter().enumerate() {
        column.fill(model.cores[core].leakage);
    }
    for task in 0..model.task_count() {
        let core = schedule.mapping[task];
        let (start, finish) = (schedule.start[task], schedule.finish[task]);
        let draw = model.power[[task, core]];
        let first = (start / time_step).floor() as usize;
        let last = ((finish / time_step).ceil() as usize).min(steps);
        for step in first..last {
            let from = step as f64 * time_step;
            let overlap = finish.min(from + time_step) - start.max(from);
            if overlap > 0.0 {
                power[[step, core]] += draw * overlap / time_step;
            }
        }
    }
}

/// Dynamic energy of a schedule: execution time times task power, summed.
pub fn energy(model: &Model, schedule: &Schedule) -> f64 {
    (0..model.task_count())
        .map(|task| {
            let core = schedule.mapping[task];
            (schedule.finish[task] - schedule.start[task]) * model.power[[task, core]]
        })
        .sum()
}
