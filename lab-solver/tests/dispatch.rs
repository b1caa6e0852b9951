mod common;

use common::*;
use lab_solver::{
    dispatch::Dispatcher,
    grid::Grid,
    pool::Pool,
    Cache, Fingerprint, SolverError,
};
use crossbeam_channel::unbounded;
use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

fn spawn(counting: Counting, workers: usize) -> Pool {
    Pool::spawn(workers, Arc::new(Identity { dimensions: 2 }), Arc::new(counting)).unwrap()
}

#[test]
fn test_values_follow_node_order() {
    let pool = spawn(Counting::new(bump), 3);
    let mut cache = Cache::new(100);
    let grid = Grid::new(3);
    let indices = grid.initial(2);
    let nodes = grid.nodes(&indices);
    let (values, stats) = Dispatcher::new(&pool, &mut cache, 3, 2)
        .dispatch(&nodes, &indices)
        .unwrap();
    assert_eq!(stats.requested, 31);
    assert_eq!(values.len(), 31 * 2);
    for (node, value) in nodes.chunks(3).zip(values.chunks(2)) {
        let time = (node[0] * 4.0).floor() / 4.0;
        assert_eq!(value[0], bump(time, &node[1..], 0));
        assert_eq!(value[1], bump(time, &node[1..], 1));
    }
    for index in indices.chunks(3) {
        assert!(cache.contains(&Fingerprint::new(&index[1..])));
    }
    pool.close();
}

#[test]
fn test_cached_series_skip_simulation() {
    let counting = Counting::new(bump);
    let counter = counting.counter();
    let pool = spawn(counting, 2);
    let mut cache = Cache::new(100);
    let grid = Grid::new(3);
    let indices = grid.initial(1);
    let nodes = grid.nodes(&indices);
    let mut dispatcher = Dispatcher::new(&pool, &mut cache, 3, 2);
    let (first, _) = dispatcher.dispatch(&nodes, &indices).unwrap();
    let (second, stats) = dispatcher.dispatch(&nodes, &indices).unwrap();
    assert_eq!(first, second);
    assert_eq!(stats.misses, 0);
    assert_eq!(calls(&counter), 5);
}

#[test]
fn test_shared_fingerprint_simulated_once_per_batch() {
    let counting = Counting::new(bump);
    let counter = counting.counter();
    let pool = spawn(counting, 4);
    let mut cache = Cache::new(100);
    let grid = Grid::new(3);
    // Both time nodes of level 1 share the root's expensive coordinates.
    let indices = grid.initial(1);
    let nodes = grid.nodes(&indices);
    let (values, stats) = Dispatcher::new(&pool, &mut cache, 3, 2)
        .dispatch(&nodes, &indices)
        .unwrap();
    assert_eq!(stats.requested, 7);
    assert_eq!(stats.misses, 5);
    assert_eq!(calls(&counter), 5);
    for (node, value) in nodes.chunks(3).zip(values.chunks(2)) {
        let time = (node[0] * 4.0).floor() / 4.0;
        assert_eq!(value[0], bump(time, &node[1..], 0));
        assert_eq!(value[1], bump(time, &node[1..], 1));
    }
    assert_eq!(cache.len(), 5);
    pool.close();
}

#[test]
fn test_failure_drains_batch() {
    let mut counting = Counting::new(bump);
    counting.fail_above = Some(0.7);
    let pool = spawn(counting, 2);
    let mut cache = Cache::new(100);
    let grid = Grid::new(3);
    let indices = grid.initial(2);
    let nodes = grid.nodes(&indices);
    let mut dispatcher = Dispatcher::new(&pool, &mut cache, 3, 2);
    let result = dispatcher.dispatch(&nodes, &indices);
    assert!(matches!(result, Err(SolverError::Kernel { .. })));

    // Nothing from the failed batch leaks into the next one.
    let root = grid.initial(0);
    let (values, stats) = dispatcher.dispatch(&grid.nodes(&root), &root).unwrap();
    assert_eq!(stats.requested, 1);
    assert_eq!(values, vec![bump(0.5, &[0.5, 0.5], 0), bump(0.5, &[0.5, 0.5], 1)]);
}

#[test]
fn test_bounded_evaluation() {
    let pool = spawn(Counting::new(linear), 1);
    let mut cache = Cache::new(100);
    let points: Vec<f64> = (0..40)
        .flat_map(|i| [1.0, 0.01 * i as f64, 0.5])
        .collect();
    let (values, stats) = Dispatcher::new(&pool, &mut cache, 3, 2)
        .evaluate(&points)
        .unwrap();
    assert_eq!(stats.requested, 40);
    for (point, value) in points.chunks(3).zip(values.chunks(2)) {
        assert_eq!(value[0], linear(1.0, &point[1..], 0));
    }
}

#[test]
fn test_evaluation_respects_in_flight_limit() {
    let (tokens, gate) = unbounded();
    let mut counting = Counting::new(linear);
    counting.gate = Some(gate);
    let counter = counting.counter();
    let points: Vec<f64> = (0..10)
        .flat_map(|i| [1.0, 0.3, 0.3 + 0.01 * i as f64])
        .collect();
    let expected = points.clone();

    let evaluation = thread::spawn(move || {
        let pool = spawn(counting, 8);
        let mut cache = Cache::new(100);
        let result = Dispatcher::new(&pool, &mut cache, 3, 2)
            .in_flight(3)
            .evaluate(&points);
        pool.close();
        result
    });

    let deadline = Instant::now() + Duration::from_secs(10);
    while calls(&counter) < 3 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    thread::sleep(Duration::from_millis(50));
    // Eight idle workers, yet only three jobs were handed out.
    assert_eq!(calls(&counter), 3);

    for _ in 0..10 {
        tokens.send(()).unwrap();
    }
    let (values, stats) = evaluation.join().unwrap().unwrap();
    assert_eq!(stats.requested, 10);
    assert_eq!(calls(&counter), 10);
    for (point, value) in expected.chunks(3).zip(values.chunks(2)) {
        assert_eq!(value[0], linear(1.0, &point[1..], 0));
        assert_eq!(value[1], linear(1.0, &point[1..], 1));
    }
}

#[test]
fn test_empty_batch() {
    let pool = spawn(Counting::new(linear), 2);
    let mut cache = Cache::new(10);
    let mut dispatcher = Dispatcher::new(&pool, &mut cache, 3, 2);
    let (values, stats) = dispatcher.dispatch(&[], &[]).unwrap();
    assert!(values.is_empty());
    assert_eq!(stats.requested, 0);
    let (values, _) = dispatcher.evaluate(&[]).unwrap();
    assert!(values.is_empty());
}
