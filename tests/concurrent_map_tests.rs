//! `map_concurrent` inside pipelines.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use gatherflow::prelude::*;

fn nz(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).expect("non-zero bound")
}

#[test]
fn test_results_keep_input_order() {
    let pipeline = Pipeline::<u64, u64>::new()
        .gather(map_concurrent(nz(4), |x: u64| {
            // Later elements finish sooner.
            std::thread::sleep(Duration::from_millis(20 - x));
            x * x
        }))
        .gather(map(|x: u64| x + 1));

    // Auto parallelism pins the SEQUENTIAL stage; the run stays ordered.
    let engine = Engine::new(EngineConfig::default()).expect("valid engine config");
    let out = engine
        .collect(&pipeline, (0..16).collect::<Vec<u64>>())
        .expect("run");
    assert_eq!(out, (0..16u64).map(|x| x * x + 1).collect::<Vec<u64>>());
}

#[test]
fn test_in_flight_bound_respected() {
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let (r, p) = (Arc::clone(&running), Arc::clone(&peak));

    let pipeline = Pipeline::<usize, usize>::new().gather(map_concurrent(nz(3), move |x: usize| {
        let now = r.fetch_add(1, Ordering::SeqCst) + 1;
        p.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(5));
        r.fetch_sub(1, Ordering::SeqCst);
        x
    }));
    let engine = Engine::new(EngineConfig::sequential()).expect("valid engine config");
    let out = engine
        .collect(&pipeline, (0..24).collect::<Vec<usize>>())
        .expect("run");

    assert_eq!(out, (0..24).collect::<Vec<usize>>());
    assert!(peak.load(Ordering::SeqCst) <= 3);
    assert!(peak.load(Ordering::SeqCst) >= 1);
}

#[test]
fn test_stops_on_infinite_source() {
    let pipeline = Pipeline::<u32, u32>::new()
        .gather(map_concurrent(nz(2), |x: u32| x * 2))
        .gather(limit(4));
    let engine = Engine::new(EngineConfig::sequential()).expect("valid engine config");
    let out = engine
        .collect(&pipeline, IterSource::new(0u32..))
        .expect("run");
    assert_eq!(out, vec![0, 2, 4, 6]);
}

#[test]
fn test_forced_parallelism_rejected() {
    let pipeline = Pipeline::<u32, u32>::new().gather(map_concurrent(nz(2), |x: u32| x));
    let engine = Engine::new(EngineConfig::default().with_parallelism(Parallelism::Exact(2)))
        .expect("valid engine config");
    let err = engine
        .collect(&pipeline, vec![1, 2, 3])
        .expect_err("SEQUENTIAL stage");
    assert!(matches!(err, ExecError::Configuration(_)));
}

#[test]
fn test_bound_from_config_hint() {
    let cfg = EngineConfig::default();
    let bound = NonZeroUsize::new(cfg.max_concurrency_hint).expect("validated hint");
    let pipeline = Pipeline::<i32, i32>::new().gather(map_concurrent(bound, |x: i32| -x));
    let engine = Engine::new(cfg).expect("valid engine config");
    assert_eq!(
        engine.collect(&pipeline, vec![1, 2, 3]).expect("run"),
        vec![-1, -2, -3]
    );
}

#[test]
fn test_run_from_async_context_reports_runtime_error() {
    let pipeline = Pipeline::<u32, u32>::new().gather(map_concurrent(nz(2), |x: u32| x + 1));
    let engine = Engine::new(EngineConfig::sequential()).expect("valid engine config");
    let outer = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("current-thread runtime");

    let err = outer
        .block_on(async { engine.collect(&pipeline, vec![1, 2, 3]) })
        .expect_err("blocking inside a runtime");
    match err {
        ExecError::UserFunction { stage, source } => {
            assert_eq!(stage, StageId::new(0));
            assert!(matches!(source, OpError::Runtime(_)));
        }
        other => panic!("unexpected error: {other}"),
    }

    // Outside the runtime the same pipeline runs normally.
    assert_eq!(engine.collect(&pipeline, vec![1, 2, 3]).expect("run"), vec![2, 3, 4]);
}
