//! Integration tests for the exploration loop
//!
//! Runs complete explorations against small deterministic oracles and checks
//! the registry, termination and recorded streams end to end.

use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use ndarray::array;
use psp_core::{
    CancellationToken, ConfigError, CsvRecorder, Evaluator, ExplorationLoop, OracleError,
    OrdinalDiscretizer, Pattern, PspConfig, PspError, Response, Termination, model_fn,
    stream_paths,
};

// =============================================================================
// Test Helpers
// =============================================================================

fn pattern_a() -> Pattern {
    Pattern::from_rows(vec![vec![0, 1], vec![-1, 0]]).unwrap()
}

fn pattern_b() -> Pattern {
    Pattern::from_rows(vec![vec![0, -1], vec![1, 0]]).unwrap()
}

/// Oracle returning one fixed pattern, counting its invocations.
fn constant_oracle(calls: Arc<AtomicUsize>) -> Evaluator {
    Evaluator::new(
        model_fn(move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Response::Pattern(pattern_a()))
        }),
        2,
        2,
    )
}

/// Oracle splitting the space on the sign of the first parameter.
fn sign_oracle() -> Evaluator {
    Evaluator::new(
        model_fn(|p| {
            Ok(Response::Pattern(if p[0] >= 0.0 {
                pattern_a()
            } else {
                pattern_b()
            }))
        }),
        2,
        2,
    )
}

fn unit_box(init: Vec<f64>, radius: f64) -> PspConfig {
    PspConfig::new(init, vec![-1.0, -1.0], vec![1.0, 1.0], radius, 2)
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_single_region_reaches_population() {
    let calls = Arc::new(AtomicUsize::new(0));
    let config = PspConfig::new(vec![5.0, 5.0], vec![0.0, 0.0], vec![10.0, 10.0], 1.0, 2)
        .with_population(5)
        .with_seed(3);

    let result = ExplorationLoop::new(config, constant_oracle(calls.clone()))
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(result.patterns, vec![pattern_a()]);
    assert_eq!(result.populations, vec![5]);
    assert_eq!(result.iterations, 4);
    assert_eq!(result.termination, Termination::PopulationReached);
    assert_eq!(calls.load(Ordering::SeqCst), 5);
}

#[test]
fn test_two_regions_both_reach_population() {
    let config = unit_box(vec![0.5, 0.0], 2.0)
        .with_population(40)
        .with_seed(11);

    let result = ExplorationLoop::new(config, sign_oracle())
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(result.region_count(), 2);
    assert_eq!(result.patterns[0], pattern_a());
    assert_eq!(result.patterns[1], pattern_b());
    assert!(result.populations.iter().all(|&p| p >= 40));
    assert_eq!(result.termination, Termination::PopulationReached);

    assert!(result.representatives[0][0] >= 0.0);
    assert!(result.representatives[1][0] < 0.0);
}

#[test]
fn test_mismatched_bounds_rejected_without_oracle_calls() {
    let calls = Arc::new(AtomicUsize::new(0));
    let config = PspConfig::new(vec![5.0, 5.0], vec![0.0, 0.0], vec![10.0], 1.0, 2)
        .with_population(5);

    let err = ExplorationLoop::new(config, constant_oracle(calls.clone())).unwrap_err();

    assert!(matches!(
        err,
        PspError::Config(ConfigError::DimensionMismatch {
            field: "upper",
            expected: 2,
            actual: 1
        })
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

// =============================================================================
// Loop Properties
// =============================================================================

#[test]
fn test_iteration_limit_is_exact() {
    for limit in [1, 5, 23] {
        let config = unit_box(vec![0.5, 0.0], 2.0)
            .with_iterations(limit)
            .with_seed(u64::from(limit));
        let result = ExplorationLoop::new(config, sign_oracle())
            .unwrap()
            .run()
            .unwrap();

        assert_eq!(result.iterations, limit);
        assert_eq!(result.termination, Termination::IterationLimit);
    }
}

#[test]
fn test_registry_is_monotonic_across_passes() {
    let config = unit_box(vec![0.5, 0.0], 1.5)
        .with_iterations(60)
        .with_samples_per_region(3)
        .with_seed(7);
    let mut explorer = ExplorationLoop::new(config, sign_oracle()).unwrap();

    let mut previous: Vec<(Pattern, u32)> = Vec::new();
    while explorer.step().unwrap().is_none() {
        let current: Vec<(Pattern, u32)> = explorer
            .registry()
            .regions()
            .iter()
            .map(|r| (r.pattern().clone(), r.population()))
            .collect();

        assert!(current.len() >= previous.len());
        for ((old_pattern, old_pop), (new_pattern, new_pop)) in previous.iter().zip(&current) {
            assert_eq!(old_pattern, new_pattern);
            assert!(new_pop >= old_pop);
        }
        previous = current;
    }

    assert_eq!(explorer.iteration(), 60);
}

#[test]
fn test_same_seed_reproduces_run() {
    let run = |seed| {
        let config = unit_box(vec![0.5, 0.5], 0.8)
            .with_iterations(30)
            .with_samples_per_region(2)
            .with_seed(seed);
        ExplorationLoop::new(config, sign_oracle())
            .unwrap()
            .run()
            .unwrap()
    };

    assert_eq!(run(99), run(99));
}

#[test]
fn test_candidates_never_leave_the_box() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let evaluator = Evaluator::new(
        model_fn(move |p| {
            sink.lock().unwrap().push(p.clone());
            Ok(Response::Continuous(array![p[0], p[1], 0.0]))
        }),
        3,
        3,
    )
    .with_discretizer(OrdinalDiscretizer);
    let config = PspConfig::new(vec![0.1, 0.9], vec![0.0, 0.0], vec![1.0, 1.0], 5.0, 3)
        .with_iterations(40)
        .with_seed(5);

    let result = ExplorationLoop::new(config, evaluator).unwrap().run().unwrap();

    assert!(result.region_count() >= 1);
    for point in seen.lock().unwrap().iter() {
        assert!(point.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }
}

#[test]
fn test_multiple_initial_points_share_regions() {
    let config = unit_box(vec![0.0, 0.0], 0.1)
        .with_init_rows(vec![vec![0.5, 0.0], vec![-0.5, 0.0], vec![0.7, 0.1]])
        .with_iterations(1)
        .with_seed(2);
    let mut explorer = ExplorationLoop::new(config, sign_oracle()).unwrap();
    explorer.step().unwrap();

    let registry = explorer.registry();
    assert_eq!(registry.len(), 2);
    let populations = registry.populations();
    // Two points seed the first region and one seeds the second, then one
    // pass adds a sample to each.
    assert_eq!(populations, vec![3, 2]);
}

// =============================================================================
// Failure and Cancellation
// =============================================================================

#[test]
fn test_oracle_failure_aborts_with_context() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let evaluator = Evaluator::new(
        model_fn(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 3 {
                Ok(Response::Continuous(array![1.0, 2.0]))
            } else {
                Ok(Response::Pattern(pattern_a()))
            }
        }),
        2,
        2,
    );
    let config = unit_box(vec![0.5, 0.0], 0.5).with_iterations(10).with_seed(1);

    let err = ExplorationLoop::new(config, evaluator).unwrap().run().unwrap_err();

    match err {
        PspError::Oracle {
            iteration,
            candidate,
            point,
            source,
        } => {
            assert_eq!(iteration, 3);
            assert_eq!(candidate, 0);
            assert_eq!(point.len(), 2);
            assert_eq!(source, OracleError::MissingDiscretizer);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[test]
fn test_cancelled_run_keeps_completed_passes() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = CsvRecorder::create(dir.path(), "cancel").unwrap();
    let shutdown = CancellationToken::new();
    let config = unit_box(vec![0.5, 0.0], 0.5)
        .with_iterations(1000)
        .with_seed(4);

    let mut explorer = ExplorationLoop::new(config, sign_oracle())
        .unwrap()
        .with_recorder(recorder)
        .with_shutdown(shutdown.clone());
    for _ in 0..3 {
        assert_eq!(explorer.step().unwrap(), None);
    }
    shutdown.cancel();
    assert_eq!(explorer.step().unwrap(), Some(Termination::Cancelled));

    // Streams are flushed on termination, before the loop is dropped.
    let (parameters, _) = stream_paths(dir.path(), "cancel");
    let contents = std::fs::read_to_string(parameters).unwrap();
    let iterations: Vec<&str> = contents
        .lines()
        .skip(1)
        .map(|line| line.split(',').next().unwrap())
        .collect();
    assert_eq!(iterations.first(), Some(&"0"));
    assert_eq!(iterations.last(), Some(&"3"));

    let result = explorer.finish().unwrap();
    assert_eq!(result.iterations, 3);
    assert_eq!(result.termination, Termination::Cancelled);
}

#[test]
fn test_failed_initialization_is_not_retried() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = CsvRecorder::create(dir.path(), "failed").unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let evaluator = Evaluator::new(
        model_fn(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(OracleError::Evaluation("cold start".into()))
            } else {
                Ok(Response::Pattern(pattern_a()))
            }
        }),
        2,
        2,
    );
    let config = unit_box(vec![0.5, 0.5], 0.5).with_iterations(10).with_seed(6);
    let mut explorer = ExplorationLoop::new(config, evaluator)
        .unwrap()
        .with_recorder(recorder);

    assert!(matches!(
        explorer.step(),
        Err(PspError::Oracle { iteration: 0, .. })
    ));
    assert!(matches!(explorer.step(), Err(PspError::Aborted)));
    assert!(matches!(explorer.step(), Err(PspError::Aborted)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(explorer.iteration(), 0);
    assert!(explorer.registry().is_empty());
    assert!(matches!(explorer.finish(), Err(PspError::Aborted)));

    let (parameters, _) = stream_paths(dir.path(), "failed");
    let contents = std::fs::read_to_string(parameters).unwrap();
    assert_eq!(contents, "iteration,p1,p2,pattern\n");
}

#[test]
fn test_failed_pass_is_not_retried() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let evaluator = Evaluator::new(
        model_fn(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 2 {
                Err(OracleError::Evaluation("diverged".into()))
            } else {
                Ok(Response::Pattern(pattern_a()))
            }
        }),
        2,
        2,
    );
    let config = unit_box(vec![0.5, 0.5], 0.5).with_iterations(10).with_seed(6);
    let mut explorer = ExplorationLoop::new(config, evaluator).unwrap();

    assert_eq!(explorer.step().unwrap(), None);
    assert!(matches!(
        explorer.step(),
        Err(PspError::Oracle { iteration: 2, .. })
    ));
    assert!(matches!(explorer.step(), Err(PspError::Aborted)));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(explorer.registry().populations(), vec![2]);
}

// =============================================================================
// Stream Failures
// =============================================================================

/// In-memory stream that can refuse writes or start failing on a given flush.
#[derive(Debug, Default)]
struct FlakyStream {
    reject_writes: bool,
    fail_on_flush: Option<usize>,
    flushes: usize,
}

impl Write for FlakyStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.reject_writes {
            Err(io::Error::other("disk full"))
        } else {
            Ok(buf.len())
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushes += 1;
        if self.fail_on_flush.is_some_and(|n| self.flushes >= n) {
            Err(io::Error::other("disk full"))
        } else {
            Ok(())
        }
    }
}

#[test]
fn test_header_write_failure_aborts_before_oracle() {
    let calls = Arc::new(AtomicUsize::new(0));
    let recorder = CsvRecorder::from_writers(
        FlakyStream {
            reject_writes: true,
            ..Default::default()
        },
        FlakyStream::default(),
    );
    let config = unit_box(vec![0.5, 0.5], 0.5).with_population(5);

    let err = ExplorationLoop::new(config, constant_oracle(calls.clone()))
        .unwrap()
        .with_recorder(recorder)
        .run()
        .unwrap_err();

    assert!(matches!(err, PspError::Io(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_flush_failure_stops_the_run() {
    let calls = Arc::new(AtomicUsize::new(0));
    let recorder = CsvRecorder::from_writers(
        FlakyStream {
            fail_on_flush: Some(2),
            ..Default::default()
        },
        FlakyStream::default(),
    );
    let config = unit_box(vec![0.5, 0.5], 0.5).with_iterations(10).with_seed(2);
    let mut explorer = ExplorationLoop::new(config, constant_oracle(calls.clone()))
        .unwrap()
        .with_recorder(recorder);

    assert_eq!(explorer.step().unwrap(), None);
    assert!(matches!(explorer.step(), Err(PspError::Io(_))));
    assert!(matches!(explorer.step(), Err(PspError::Aborted)));
    // Init plus one candidate in each of the two passes.
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_run_surfaces_stream_failure() {
    let calls = Arc::new(AtomicUsize::new(0));
    let recorder = CsvRecorder::from_writers(
        FlakyStream {
            fail_on_flush: Some(3),
            ..Default::default()
        },
        FlakyStream::default(),
    );
    let config = unit_box(vec![0.5, 0.5], 0.5).with_iterations(50).with_seed(2);

    let err = ExplorationLoop::new(config, constant_oracle(calls.clone()))
        .unwrap()
        .with_recorder(recorder)
        .run()
        .unwrap_err();

    assert!(matches!(err, PspError::Io(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

// =============================================================================
// Recorded Streams
// =============================================================================

#[test]
fn test_recorded_streams_match_run() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = CsvRecorder::create(dir.path(), "psp").unwrap();
    let evaluator = Evaluator::new(
        model_fn(|p| Ok(Response::Continuous(array![p[0], -p[0]]))),
        2,
        2,
    )
    .with_discretizer(OrdinalDiscretizer);
    let config = unit_box(vec![0.5, 0.0], 2.0)
        .with_iterations(5)
        .with_parameter_names(vec!["alpha".into(), "beta".into()])
        .with_stimuli_names(vec!["left".into(), "right".into()])
        .with_seed(8);

    let result = ExplorationLoop::new(config, evaluator)
        .unwrap()
        .with_recorder(recorder)
        .run()
        .unwrap();

    let (parameters, responses) = stream_paths(dir.path(), "psp");
    let parameters = std::fs::read_to_string(parameters).unwrap();
    let responses = std::fs::read_to_string(responses).unwrap();

    let mut lines = parameters.lines();
    assert_eq!(lines.next(), Some("iteration,alpha,beta,pattern"));
    let rows: Vec<Vec<&str>> = lines.map(|l| l.split(',').collect()).collect();
    assert_eq!(rows[0], vec!["0", "0.5", "0", "0"]);
    assert!(rows.iter().all(|r| r.len() == 4));

    let recorded: u64 = rows.len() as u64;
    assert_eq!(recorded, result.total_population());

    let mut lines = responses.lines();
    assert_eq!(lines.next(), Some("iteration,left,right,pattern"));
    assert_eq!(lines.count(), rows.len());
}
