mod common;

use common::*;
use lab_solver::*;
use lab_structs::config::SolverConfig;
use rand::{rngs::SmallRng, Rng, SeedableRng};

fn build(
    counting: Counting,
    dimensions: usize,
    min: usize,
    max: usize,
    tolerance: f64,
    workers: usize,
) -> Solver<Identity, Counting> {
    Solver::new(
        Identity { dimensions },
        counting,
        &interpolation(min, max, tolerance),
        &solver_config(workers),
    )
    .unwrap()
}

fn random_points(inputs: usize, count: usize, seed: u64) -> Vec<f64> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..inputs * count).map(|_| rng.gen_range(0.01..0.99)).collect()
}

#[test]
fn test_same_surrogate_for_any_worker_count() {
    let surrogates: Vec<Surrogate> = [1, 2, 8]
        .into_iter()
        .map(|workers| {
            build(Counting::new(bump), 2, 1, 5, 1e-3, workers)
                .solve(|_| {})
                .unwrap()
        })
        .collect();
    assert!(surrogates[0].len() > 7);
    assert_eq!(surrogates[0], surrogates[1]);
    assert_eq!(surrogates[0], surrogates[2]);
}

#[test]
fn test_evaluation_is_repeatable() {
    let mut solver = build(Counting::new(bump), 2, 1, 4, 1e-3, 4);
    let surrogate = solver.solve(|_| {}).unwrap();
    let points = random_points(solver.inputs(), 50, 0);
    let first = solver.evaluate(&surrogate, &points).unwrap();
    let second = solver.evaluate(&surrogate, &points).unwrap();
    assert_eq!(first.len(), 50 * solver.outputs());
    assert_eq!(first, second);
}

#[test]
fn test_surrogate_matches_simulation_at_nodes() {
    let mut solver = build(Counting::new(bump), 2, 1, 4, 1e-3, 2);
    let surrogate = solver.solve(|_| {}).unwrap();
    let nodes = surrogate.nodes();
    let approximation = solver.evaluate(&surrogate, &nodes).unwrap();
    let (exact, stats) = solver.compute(&nodes).unwrap();
    assert_eq!(stats.misses, 0);
    for (a, b) in approximation.iter().zip(&exact) {
        assert!((a - b).abs() < 1e-10);
    }
}

#[test]
fn test_progress_counters_are_monotone() {
    let mut solver = build(Counting::new(bump), 2, 1, 5, 1e-3, 3);
    let mut rounds = Vec::new();
    let surrogate = solver.solve(|progress| rounds.push(progress.clone())).unwrap();
    assert!(rounds.len() > 1);
    let mut requested = 0;
    let mut misses = 0;
    for (i, progress) in rounds.iter().enumerate() {
        assert_eq!(progress.round, i + 1);
        assert!(progress.misses <= progress.requested);
        requested += progress.requested;
        misses += progress.misses;
        assert_eq!(progress.total_requested, requested);
        assert_eq!(progress.total_misses, misses);
    }
    assert_eq!(requested, surrogate.len());
    assert!(rounds.windows(2).all(|pair| pair[0].level <= pair[1].level));
}

#[test]
fn test_zero_tolerance_stops_after_first_round() {
    let mut solver = build(Counting::new(bump), 2, 1, 5, 0.0, 2);
    let mut rounds = 0;
    let surrogate = solver.solve(|_| rounds += 1).unwrap();
    assert_eq!(rounds, 1);
    assert_eq!(surrogate.len(), 7);
}

#[test]
fn test_equal_levels_stop_after_first_round() {
    let mut solver = build(Counting::new(bump), 2, 2, 2, 1e-9, 2);
    let mut rounds = 0;
    let surrogate = solver.solve(|_| rounds += 1).unwrap();
    assert_eq!(rounds, 1);
    assert_eq!(surrogate.len(), 31);
    assert_eq!(surrogate.level, 2);
}

#[test]
fn test_linear_simulation_is_reproduced() {
    let mut solver = build(Counting::new(linear), 2, 1, 1, 1e-6, 2);
    let surrogate = solver.solve(|_| {}).unwrap();
    let points = random_points(3, 20, 1);
    let values = solver.evaluate(&surrogate, &points).unwrap();
    for (point, value) in points.chunks(3).zip(values.chunks(2)) {
        for channel in 0..2 {
            let expected = linear(point[0], &point[1..], channel);
            assert!((value[channel] - expected).abs() < 1e-12);
        }
    }
}

#[test]
fn test_time_shares_simulations() {
    let counting = Counting::new(bump);
    let counter = counting.counter();
    let mut solver = build(counting, 2, 1, 1, 0.0, 4);
    let mut rounds = Vec::new();
    let surrogate = solver.solve(|progress| rounds.push(progress.clone())).unwrap();

    // The root of the expensive axes appears at three times and is
    // simulated once.
    assert_eq!(surrogate.len(), 7);
    assert_eq!(rounds.len(), 1);
    assert_eq!(rounds[0].requested, 7);
    assert_eq!(rounds[0].misses, 5);
    assert_eq!(calls(&counter), 5);
    assert_eq!(solver.cache().len(), 5);

    let expensive = [(0.5, 0.5), (0.25, 0.5), (0.75, 0.5), (0.5, 0.25), (0.5, 0.75)];
    let points: Vec<f64> = expensive.iter().flat_map(|&(a, b)| [0.3, a, b]).collect();
    let (values, stats) = solver.compute(&points).unwrap();
    assert_eq!(stats.requested, 5);
    assert_eq!(stats.hits(), 5);
    assert_eq!(stats.misses, 0);
    assert_eq!(calls(&counter), 5);
    for (point, value) in points.chunks(3).zip(values.chunks(2)) {
        // floor(0.3 * 4) selects the step at time 0.25.
        assert_eq!(value[0], bump(0.25, &point[1..], 0));
        assert_eq!(value[1], bump(0.25, &point[1..], 1));
    }
}

#[test]
fn test_off_grid_points_bypass_cache() {
    let counting = Counting::new(bump);
    let counter = counting.counter();
    let mut solver = build(counting, 2, 1, 1, 0.0, 2);
    solver.solve(|_| {}).unwrap();
    let cached = solver.cache().len();
    let (_, stats) = solver.compute(&[0.5, 0.3, 0.3, 0.5, 0.3, 0.3]).unwrap();
    assert_eq!(stats.misses, 2);
    assert_eq!(calls(&counter), 7);
    assert_eq!(solver.cache().len(), cached);
}

#[test]
fn test_cache_survives_between_runs() {
    let counting = Counting::new(bump);
    let counter = counting.counter();
    let mut solver = build(counting, 2, 1, 4, 1e-3, 2);
    let first = solver.solve(|_| {}).unwrap();
    let simulated = calls(&counter);
    let mut misses = 0;
    let second = solver.solve(|progress| misses += progress.misses).unwrap();
    assert_eq!(first, second);
    assert_eq!(misses, 0);
    assert_eq!(calls(&counter), simulated);
}

#[test]
fn test_cache_capacity_bounds_entries() {
    let mut solver = Solver::new(
        Identity { dimensions: 2 },
        Counting::new(bump),
        &interpolation(1, 4, 1e-3),
        &SolverConfig {
            workers: Some(2),
            cache_capacity: Some(3),
        },
    )
    .unwrap();
    let surrogate = solver.solve(|_| {}).unwrap();
    assert!(surrogate.len() > 3);
    assert_eq!(solver.cache().len(), 3);
}

#[test]
fn test_node_budget() {
    let mut config = interpolation(1, 6, 1e-6);
    config.max_nodes = Some(12);
    let mut solver = Solver::new(
        Identity { dimensions: 2 },
        Counting::new(bump),
        &config,
        &solver_config(2),
    )
    .unwrap();
    let surrogate = solver.solve(|_| {}).unwrap();
    assert_eq!(surrogate.len(), 12);
}

#[test]
fn test_simulation_failure_aborts() {
    let mut counting = Counting::new(bump);
    counting.fail_above = Some(0.6);
    let mut solver = build(counting, 2, 1, 3, 1e-3, 4);
    let result = solver.solve(|_| {});
    assert!(matches!(result, Err(SolverError::Kernel { .. })));
}

#[test]
fn test_simulation_panic_aborts() {
    let mut counting = Counting::new(bump);
    counting.panic_above = Some(0.6);
    let mut solver = build(counting, 2, 1, 3, 1e-3, 4);
    let result = solver.solve(|_| {});
    assert!(matches!(result, Err(SolverError::Kernel { .. })));
}

#[test]
fn test_invalid_configuration() {
    let workers = Solver::new(
        Identity { dimensions: 1 },
        Counting::new(bump),
        &interpolation(1, 2, 1e-3),
        &solver_config(0),
    );
    assert!(matches!(workers, Err(SolverError::InvalidConfig { .. })));

    let level = Solver::new(
        Identity { dimensions: 1 },
        Counting::new(bump),
        &interpolation(1, 40, 1e-3),
        &solver_config(1),
    );
    assert!(matches!(level, Err(SolverError::InvalidConfig { .. })));

    let tolerance = Solver::new(
        Identity { dimensions: 1 },
        Counting::new(bump),
        &interpolation(1, 2, -1.0),
        &solver_config(1),
    );
    assert!(matches!(tolerance, Err(SolverError::InvalidConfig { .. })));
}

#[test]
fn test_mismatched_points_are_rejected() {
    let mut solver = build(Counting::new(bump), 2, 0, 0, 0.0, 1);
    let surrogate = solver.solve(|_| {}).unwrap();
    assert!(matches!(
        solver.evaluate(&surrogate, &[0.5, 0.5]),
        Err(SolverError::InvalidInput { .. })
    ));
    assert!(matches!(
        solver.compute(&[0.5, 0.5]),
        Err(SolverError::InvalidInput { .. })
    ));
}

#[test]
fn test_corrupt_surrogate_is_rejected() {
    let mut solver = build(Counting::new(bump), 2, 1, 2, 1e-3, 2);
    let surrogate = solver.solve(|_| {}).unwrap();
    let points = [0.5, 0.5, 0.5];
    assert!(surrogate.validate().is_ok());
    assert!(solver.evaluate(&surrogate, &points).is_ok());

    let mut surpluses = surrogate.clone();
    surpluses.surpluses.push(1.0);
    let mut deep = surrogate.clone();
    deep.indices[4] = grid::pack(40, 1);
    let mut even = surrogate.clone();
    even.indices[4] = grid::pack(2, 2);
    let mut outside = surrogate.clone();
    outside.indices[4] = grid::pack(1, 5);
    let mut ragged = surrogate.clone();
    ragged.indices.pop();
    for corrupt in [&surpluses, &deep, &even, &outside, &ragged] {
        assert!(matches!(
            corrupt.validate(),
            Err(SolverError::InvalidInput { .. })
        ));
        assert!(matches!(
            solver.evaluate(corrupt, &points),
            Err(SolverError::InvalidInput { .. })
        ));
    }

    // A well-formed surrogate of another system does not fit this one.
    let mut other = build(Counting::new(bump), 3, 1, 1, 0.0, 1);
    let foreign = other.solve(|_| {}).unwrap();
    assert!(foreign.validate().is_ok());
    assert!(matches!(
        solver.evaluate(&foreign, &points),
        Err(SolverError::InvalidInput { .. })
    ));
}

#[test]
fn test_surrogate_serialization() {
    let mut solver = build(Counting::new(bump), 2, 1, 3, 1e-3, 2);
    let surrogate = solver.solve(|_| {}).unwrap();
    let json = lab_utils::jsonify(&surrogate).unwrap();
    let restored: Surrogate = lab_utils::dejsonify(&json).unwrap();
    assert_eq!(restored.indices, surrogate.indices);
    assert_eq!(restored.level, surrogate.level);
    for (a, b) in restored.surpluses.iter().zip(&surrogate.surpluses) {
        assert!((a - b).abs() <= 1e-12 * b.abs().max(1.0));
    }
}
