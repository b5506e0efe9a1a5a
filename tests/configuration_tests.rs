//! INIT-time validation, capability flags, contracts and error propagation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use gatherflow::core::hash::hash_serde;
use gatherflow::prelude::*;

fn exact(n: usize) -> Engine {
    Engine::new(EngineConfig::default().with_parallelism(Parallelism::Exact(n)))
        .expect("valid engine config")
}

#[test]
fn test_forced_parallelism_rejects_sequential_stage_before_any_element() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let sequential_op = Gatherer::of_sequential(
        || (),
        Integrator::of(move |_: &mut (), x: i32, downstream: &mut dyn Downstream<i32>| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(downstream.push(x))
        }),
    );
    assert!(sequential_op.capabilities().is_sequential());

    let pipeline = Pipeline::<i32, i32>::new()
        .gather(map(|x: i32| x))
        .gather(sequential_op);
    let mut sink = Collect::new();
    let err = exact(2)
        .run(&pipeline, (0..10).collect::<Vec<i32>>(), &mut sink)
        .expect_err("sequential stage under forced parallelism");

    assert!(matches!(err, ExecError::Configuration(_)), "got {err}");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(sink.items().is_empty());
}

#[test]
fn test_forced_parallelism_rejects_unsplittable_source() {
    let pipeline = Pipeline::<i32, i32>::new().gather(map(|x: i32| x));
    let err = exact(2)
        .collect(&pipeline, IterSource::new(0..10))
        .expect_err("unsplittable source under forced parallelism");
    assert!(matches!(err, ExecError::Configuration(_)));

    // Exact(1) is just sequential.
    let out = exact(1)
        .collect(&pipeline, IterSource::new(0..3))
        .expect("exact(1) run");
    assert_eq!(out, vec![0, 1, 2]);
}

#[test]
fn test_reference_capabilities() {
    use std::num::NonZeroUsize;
    let two = NonZeroUsize::new(2).expect("non-zero");
    let caps = |seq, stateless, greedy| Capabilities::from_flags(seq, stateless, greedy);

    assert_eq!(limit::<i32>(3).capabilities(), caps(true, false, false));
    assert_eq!(find_index(|_: &i32| true).capabilities(), caps(true, false, false));
    assert_eq!(find_indexes(|_: &i32| true).capabilities(), caps(true, false, true));
    assert_eq!(fold(|| 0, |a, x: i32| a + x).capabilities(), caps(true, false, true));
    assert_eq!(
        fold_parallel(|| 0, |a, x: i32| a + x, |a, b| a + b).capabilities(),
        caps(false, false, true)
    );
    assert_eq!(scan(|| 0, |a: &i32, x: i32| a + x).capabilities(), caps(true, false, false));
    assert_eq!(window_fixed::<i32>(two).capabilities(), caps(true, false, true));
    assert_eq!(window_sliding::<i32>(two).capabilities(), caps(true, false, true));
    assert_eq!(map(|x: i32| x).capabilities(), caps(false, true, true));
    assert_eq!(map_sequential(|x: i32| x).capabilities(), caps(true, true, true));
    assert_eq!(filter(|_: &i32| true).capabilities(), caps(false, true, true));
    assert_eq!(
        flat_map(|x: i32, emit: &mut dyn FnMut(i32)| emit(x)).capabilities(),
        caps(false, true, false)
    );
    assert_eq!(map_concurrent(two, |x: i32| x).capabilities(), caps(true, false, false));
    assert_eq!(dedup_consecutive::<i32>().capabilities(), caps(true, false, true));

    assert_eq!(limit::<i32>(3).capabilities().to_string(), "{SEQUENTIAL}");
}

#[test]
fn test_stage_list_reports_capabilities() {
    let pipeline = Pipeline::<i32, i32>::new()
        .gather(map(|x: i32| x))
        .gather(limit(1));
    let info = pipeline.stages();
    assert_eq!(info.len(), 2);
    assert_eq!(info[0].name, "map");
    assert!(info[0].capabilities.contains(Characteristic::Stateless));
    assert!(info[1].capabilities.contains(Characteristic::Sequential));
}

fn failing_at(bad: i32) -> Gatherer<i32, (), i32> {
    Gatherer::stateless(Integrator::of(
        move |_: &mut (), x: i32, downstream: &mut dyn Downstream<i32>| {
            if x == bad {
                return Err(OpError::Exec(format!("cannot handle {x}")));
            }
            Ok(downstream.push(x))
        },
    ))
    .named("failing")
}

#[test]
fn test_user_function_failure_keeps_partial_output() {
    let pipeline = Pipeline::<i32, i32>::new()
        .gather(map(|x: i32| x + 1))
        .gather(failing_at(4));
    let engine = Engine::new(EngineConfig::sequential()).expect("valid engine config");
    let mut sink = Collect::new();
    let err = engine
        .run(&pipeline, (0..10).collect::<Vec<i32>>(), &mut sink)
        .expect_err("failure in stage 1");

    match err {
        ExecError::UserFunction { stage, source } => {
            assert_eq!(stage, StageId::new(1));
            assert!(matches!(source, OpError::Exec(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(sink.into_vec(), vec![1, 2, 3]);
}

#[test]
fn test_user_function_failure_in_partition() {
    let pipeline = Pipeline::<i32, i32>::new().gather(failing_at(7));
    let err = exact(3)
        .collect(&pipeline, (0..9).collect::<Vec<i32>>())
        .expect_err("failure in a partition");
    assert!(matches!(err, ExecError::UserFunction { .. }));
}

#[test]
fn test_panicking_partition_is_reported() {
    let pipeline = Pipeline::<i32, i32>::new().gather(map(|x: i32| {
        if x == 5 {
            panic!("boom");
        }
        x
    }));
    let err = exact(2)
        .collect(&pipeline, (0..8).collect::<Vec<i32>>())
        .expect_err("panicking partition");
    match err {
        ExecError::Panicked { stage, partition } => {
            assert_eq!(stage, StageId::new(0));
            assert_eq!(partition, PartitionId::new(1));
        }
        other => panic!("unexpected error: {other}"),
    }
}

/// Pushes every element twice, ignoring refusals.
fn duplicate() -> Gatherer<i32, (), i32> {
    Gatherer::stateless_sequential(Integrator::greedy(
        |_: &mut (), x: i32, downstream: &mut dyn Downstream<i32>| {
            downstream.push(x);
            downstream.push(x);
            Ok(true)
        },
    ))
    .named("duplicate")
}

#[test]
fn test_late_pushes_counted_and_dropped() {
    let pipeline = Pipeline::<i32, i32>::new().gather(duplicate());
    let engine = Engine::new(EngineConfig::sequential()).expect("valid engine config");
    let mut take = Take::first();
    let manifest = engine.run(&pipeline, vec![1, 2, 3], &mut take).expect("run");

    assert_eq!(take.items(), &[1]);
    assert_eq!(take.late_pushes(), 0);
    assert_eq!(manifest.stages[0].late_pushes, 1);
    assert_eq!(manifest.stages[0].integrated, 1);
}

#[test]
fn test_strict_contracts_turn_late_pushes_into_errors() {
    let cfg = EngineConfig {
        strict_contracts: true,
        ..EngineConfig::sequential()
    };
    let engine = Engine::new(cfg).expect("valid engine config");
    let pipeline = Pipeline::<i32, i32>::new().gather(duplicate());
    let err = engine
        .run(&pipeline, vec![1, 2, 3], &mut Take::first())
        .expect_err("strict mode");
    assert!(matches!(err, ExecError::ContractViolation { .. }));
}

#[test]
fn test_manifest_hash_follows_config() {
    let a = Engine::new(EngineConfig::sequential()).expect("valid engine config");
    let b = Engine::new(EngineConfig::sequential()).expect("valid engine config");
    let c = exact(2);
    assert_eq!(a.config_hash(), b.config_hash());
    assert_ne!(a.config_hash(), c.config_hash());
    assert_eq!(
        a.config_hash(),
        hash_serde(a.config()).expect("hashable config")
    );

    let pipeline = Pipeline::<i32, i32>::new().gather(map(|x: i32| x));
    let first = a.run(&pipeline, vec![1], &mut Collect::new()).expect("run");
    let second = a.run(&pipeline, vec![1], &mut Collect::new()).expect("run");
    assert_eq!(first.config_hash, second.config_hash);
    assert_ne!(first.id, second.id);

    let json = serde_json::to_value(&first).expect("manifest serializes");
    assert_eq!(json["stages"][0]["name"], "map");
    assert_eq!(json["stages"][0]["capabilities"][0], "STATELESS");
}

#[test]
fn test_invalid_config_is_a_configuration_error() {
    let err = Engine::new(EngineConfig::default().with_parallelism(Parallelism::Auto(0)))
        .expect_err("zero partitions");
    assert!(matches!(err, ExecError::Configuration(_)));
}
