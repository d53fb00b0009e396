use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use treeclimb::optimizer::{
    adjust, ClimbOptions, HillClimber, IterationReport, ProgressCallback, SearchError, Silent,
    Stage, Tolerance,
};
use treeclimb::oracle::{OracleError, ScoreRequest};
use treeclimb::tree::{canonicalize, TaxaMap, Topology};

fn taxa(n: usize) -> TaxaMap {
    let names: Vec<String> = (0..n).map(|i| format!("taxon_{}", i)).collect();
    TaxaMap::initial(&names).unwrap()
}

fn options(patience: usize) -> ClimbOptions {
    ClimbOptions {
        patience,
        rooted: false,
        num_threads: 3,
        tolerance: Tolerance::default(),
    }
}

/// Robinson-Foulds distance to a fixed unrooted tree, read through the initial taxa names.
fn rf_oracle(
    target: &str,
    names: TaxaMap,
) -> impl Fn(&ScoreRequest) -> Result<f64, OracleError> + Send + Sync {
    let target = Topology::from_named_newick(target, &names).unwrap().splits();
    move |request: &ScoreRequest| {
        let tree = Topology::from_named_newick(&request.newick, &names)
            .map_err(|e| OracleError::Other(e.to_string()))?;
        let splits = tree.splits();
        Ok(splits.symmetric_difference(&target).count() as f64)
    }
}

const TARGET_8: &str =
    "((((taxon_0,taxon_5),taxon_3),(taxon_7,taxon_1)),((taxon_2,taxon_6),taxon_4));";

#[test]
fn test_adjust_skips_the_current_value() {
    for original in 0..=8 {
        let count = original.max(1) * 2;
        let values: Vec<usize> = (0..count).map(|i| adjust(i, original)).collect();
        let expected: Vec<usize> = (0..=count).filter(|&x| x != original).collect();
        assert_eq!(values, expected);
    }
    assert_eq!(adjust(2, 1), 3);
    assert_eq!(adjust(0, 1), 0);
    assert_eq!(adjust(1, 1), 2);
}

#[test]
fn test_two_taxa_with_zero_patience_runs_once() {
    let calls = AtomicUsize::new(0);
    let oracle = |_: &ScoreRequest| -> Result<f64, OracleError> {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(1.5)
    };
    let mut climber = HillClimber::new(oracle, options(0), 1).unwrap();
    let result = climber.run(vec![0], taxa(2), Silent).unwrap();

    assert_eq!(result.iterations, 1);
    assert_eq!(result.v, vec![0]);
    assert_eq!(result.loss, 1.5);
    assert_eq!(result.trajectory.as_slice(), &[1.5, 1.5]);
    // Initial score plus the pass baseline; a two-taxon tree has no candidates.
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_flat_landscape_stops_after_patience() {
    let calls = AtomicUsize::new(0);
    let oracle = |_: &ScoreRequest| -> Result<f64, OracleError> {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(10.0)
    };
    let mut climber = HillClimber::new(oracle, options(2), 5).unwrap();
    let result = climber.run(vec![0, 1, 3], taxa(4), Silent).unwrap();

    assert_eq!(result.iterations, 2);
    assert_eq!(result.trajectory.len(), 3);
    // Per pass: one baseline and 2i candidates at positions 2 and 1.
    assert_eq!(calls.load(Ordering::SeqCst), 1 + 2 * (1 + 4 + 2));
}

#[test]
fn test_candidate_scratch_names_are_unique_per_sweep() {
    let names = Mutex::new(Vec::new());
    let oracle = |request: &ScoreRequest| -> Result<f64, OracleError> {
        if request.scratch.coordinate.is_some() {
            names.lock().unwrap().push(request.scratch.file_name());
        }
        Ok(3.0)
    };
    let mut climber = HillClimber::new(oracle, options(1), 9).unwrap();
    let session = climber.session().to_string();
    climber.run(vec![0, 2, 1, 5], taxa(5), Silent).unwrap();

    let names = names.lock().unwrap().clone();
    assert_eq!(names.len(), 2 + 4 + 6);
    let unique: HashSet<&String> = names.iter().collect();
    assert_eq!(unique.len(), names.len());
    assert!(names.iter().all(|n| n.starts_with(&session)));
}

#[test]
fn test_climb_reduces_distance_to_target() {
    let names = taxa(8);
    let oracle = rf_oracle(TARGET_8, names.clone());
    let mut climber = HillClimber::new(oracle, options(2), 42).unwrap();
    let start = climber.sample_start(7);
    let result = climber.run(start, names.clone(), Silent).unwrap();

    assert!(result.trajectory.is_non_increasing());
    assert_eq!(result.trajectory.last(), Some(result.loss));
    assert!(result.loss <= result.trajectory.as_slice()[0]);

    // The reported loss is the distance of the returned tree.
    let check = rf_oracle(TARGET_8, names.clone());
    let newick = result.labeled_newick(false).unwrap();
    let request = ScoreRequest {
        newick,
        scratch: treeclimb::oracle::ScratchId::baseline("check"),
    };
    assert_eq!(check(&request).unwrap(), result.loss);
}

#[test]
fn test_same_seed_same_climb() {
    let names = taxa(8);
    let run = |seed: u64| {
        let oracle = rf_oracle(TARGET_8, names.clone());
        let mut climber = HillClimber::new(oracle, options(1), seed).unwrap();
        let start = climber.sample_start(7);
        climber.run(start, names.clone(), Silent).unwrap()
    };
    let a = run(17);
    let b = run(17);
    assert_eq!(a.v, b.v);
    assert_eq!(a.taxa, b.taxa);
    assert_eq!(a.trajectory, b.trajectory);
}

#[test]
fn test_baseline_failure_is_initial() {
    let oracle = |_: &ScoreRequest| -> Result<f64, OracleError> {
        Err(OracleError::Other("no binary".into()))
    };
    let mut climber = HillClimber::new(oracle, options(1), 0).unwrap();
    match climber.run(vec![0, 1], taxa(3), Silent) {
        Err(SearchError::Initial(failure)) => {
            assert_eq!(failure.stage, Stage::Baseline);
            assert_eq!(failure.v, vec![0, 1]);
        }
        other => panic!("expected an initial failure, got {:?}", other.map(|r| r.loss)),
    }
}

#[test]
fn test_non_finite_loss_is_an_error() {
    let oracle = |_: &ScoreRequest| -> Result<f64, OracleError> { Ok(f64::NAN) };
    let mut climber = HillClimber::new(oracle, options(1), 0).unwrap();
    let err = climber.run(vec![0, 1], taxa(3), Silent).unwrap_err();
    assert!(matches!(err, SearchError::Initial(_)));
}

#[test]
fn test_candidate_failure_aborts_with_its_coordinate() {
    let start = vec![0, 1, 3, 2];
    let oracle = |request: &ScoreRequest| -> Result<f64, OracleError> {
        match request.scratch.coordinate {
            Some(3) => Err(OracleError::Other("crashed".into())),
            _ => Ok(7.0),
        }
    };
    let mut climber = HillClimber::new(oracle, options(3), 0).unwrap();
    let err = climber.run(start.clone(), taxa(5), Silent).unwrap_err();

    let (canonical, _) = canonicalize(&start).unwrap();
    let expected_value = adjust(0, canonical[3]);

    match err {
        SearchError::Interrupted { failure, partial } => {
            assert_eq!(
                failure.stage,
                Stage::Candidate {
                    coordinate: 3,
                    value: expected_value
                }
            );
            assert_eq!(failure.v[3], expected_value);
            assert_eq!(partial.iterations, 0);
            assert_eq!(partial.loss, 7.0);
            assert_eq!(partial.trajectory.len(), 1);
            assert_eq!(partial.v, start);
        }
        other => panic!("expected an interrupted search, got {}", other),
    }
}

#[test]
fn test_mismatched_taxa_is_a_setup_error() {
    let oracle = |_: &ScoreRequest| -> Result<f64, OracleError> { Ok(0.0) };
    let mut climber = HillClimber::new(oracle, options(1), 0).unwrap();
    let err = climber.run(vec![0, 1], taxa(5), Silent).unwrap_err();
    assert!(matches!(err, SearchError::Setup(_)));
}

struct StopAfter(usize);

impl ProgressCallback for StopAfter {
    fn on_iteration(&self, report: &IterationReport) -> bool {
        report.iteration < self.0
    }
}

#[test]
fn test_callback_can_stop_the_search() {
    let oracle = |_: &ScoreRequest| -> Result<f64, OracleError> { Ok(1.0) };
    let mut climber = HillClimber::new(oracle, options(10), 0).unwrap();
    let result = climber.run(vec![0, 0, 0], taxa(4), StopAfter(2)).unwrap();
    assert_eq!(result.iterations, 2);
}

#[test]
fn test_single_pass_never_worsens_the_baseline() {
    let names = taxa(8);
    let oracle = rf_oracle(TARGET_8, names.clone());
    let mut climber = HillClimber::new(oracle, options(1), 3).unwrap();
    let start = climber.sample_start(7);
    let outcome = climber.optimise_single(&start, &names).unwrap();

    let check = rf_oracle(TARGET_8, names.clone());
    let start_loss = check(&ScoreRequest {
        newick: treeclimb::tree::relabel(
            &treeclimb::tree::decode_newick(&start, false).unwrap(),
            &names,
        )
        .unwrap(),
        scratch: treeclimb::oracle::ScratchId::baseline("check"),
    })
    .unwrap();
    assert!(outcome.loss <= start_loss);
    assert_eq!(outcome.v.len(), start.len());
}

/// Scores the first baseline `initial` and every later baseline `pass`.
fn baselines(initial: f64, pass: f64) -> impl Fn(&ScoreRequest) -> Option<f64> + Send + Sync {
    let seen = AtomicUsize::new(0);
    move |request: &ScoreRequest| {
        if request.scratch.coordinate.is_some() {
            return None;
        }
        match seen.fetch_add(1, Ordering::SeqCst) {
            0 => Some(initial),
            _ => Some(pass),
        }
    }
}

#[test]
fn test_interruption_ignores_gains_below_tolerance() {
    let baseline = baselines(10.0, 9.9999);
    let oracle = move |request: &ScoreRequest| -> Result<f64, OracleError> {
        baseline(request).ok_or_else(|| OracleError::Other("crashed".into()))
    };
    let start = vec![0, 1, 3];
    let mut climber = HillClimber::new(oracle, options(3), 0).unwrap();
    match climber.run(start.clone(), taxa(4), Silent).unwrap_err() {
        SearchError::Interrupted { partial, .. } => {
            assert_eq!(partial.loss, 10.0);
            assert_eq!(partial.trajectory.as_slice(), &[10.0]);
            assert_eq!(partial.v, start);
        }
        other => panic!("expected an interrupted search, got {}", other),
    }
}

#[test]
fn test_interruption_keeps_a_real_gain_on_the_trajectory() {
    let baseline = baselines(10.0, 9.0);
    let oracle = move |request: &ScoreRequest| -> Result<f64, OracleError> {
        baseline(request).ok_or_else(|| OracleError::Other("crashed".into()))
    };
    let start = vec![0, 1, 3];
    let mut climber = HillClimber::new(oracle, options(3), 0).unwrap();
    match climber.run(start.clone(), taxa(4), Silent).unwrap_err() {
        SearchError::Interrupted { partial, .. } => {
            assert_eq!(partial.loss, 9.0);
            assert_eq!(partial.trajectory.as_slice(), &[10.0, 9.0]);
            assert_eq!(partial.trajectory.last(), Some(partial.loss));
            assert_eq!(partial.iterations, 0);
            assert_eq!(partial.v, canonicalize(&start).unwrap().0);
        }
        other => panic!("expected an interrupted search, got {}", other),
    }
}

#[test]
fn test_pass_rejects_gain_below_tolerance() {
    let oracle = |request: &ScoreRequest| -> Result<f64, OracleError> {
        match request.scratch.coordinate {
            Some(2) => Ok(4.9996),
            _ => Ok(5.0),
        }
    };
    let start = vec![0, 2, 1];
    let climber = HillClimber::new(oracle, options(1), 0).unwrap();
    let outcome = climber.optimise_single(&start, &taxa(4)).unwrap();
    assert_eq!(outcome.moves, 0);
    assert_eq!(outcome.loss, 5.0);
    assert_eq!(outcome.v, canonicalize(&start).unwrap().0);
}

#[test]
fn test_outer_loop_rejects_gain_below_tolerance() {
    let baseline = baselines(5.0, 4.9996);
    let oracle = move |request: &ScoreRequest| -> Result<f64, OracleError> {
        Ok(baseline(request).unwrap_or(6.0))
    };
    let mut climber = HillClimber::new(oracle, options(1), 0).unwrap();
    let result = climber.run(vec![0, 1, 3], taxa(4), Silent).unwrap();
    assert_eq!(result.iterations, 1);
    assert_eq!(result.loss, 5.0);
    assert_eq!(result.trajectory.as_slice(), &[5.0, 5.0]);
}

#[test]
fn test_pass_visits_positions_from_last_to_first() {
    let coordinates = Mutex::new(Vec::new());
    let oracle = |request: &ScoreRequest| -> Result<f64, OracleError> {
        if let Some(c) = request.scratch.coordinate {
            coordinates.lock().unwrap().push(c);
        }
        Ok(1.0)
    };
    let climber = HillClimber::new(oracle, options(1), 0).unwrap();
    climber.optimise_single(&[0, 1, 3, 2, 5], &taxa(6)).unwrap();

    let mut visited = coordinates.lock().unwrap().clone();
    visited.dedup();
    assert_eq!(visited, vec![4, 3, 2, 1]);
}

#[test]
fn test_accepted_move_becomes_the_new_baseline() {
    // Position 2 improves 10 -> 6; position 1 only beats the stale baseline.
    let oracle = |request: &ScoreRequest| -> Result<f64, OracleError> {
        match request.scratch.coordinate {
            Some(2) => Ok(6.0),
            Some(1) => Ok(7.0),
            _ => Ok(10.0),
        }
    };
    let start = vec![0, 2, 1];
    let (canonical, _) = canonicalize(&start).unwrap();
    let climber = HillClimber::new(oracle, options(1), 0).unwrap();
    let outcome = climber.optimise_single(&start, &taxa(4)).unwrap();

    assert_eq!(outcome.moves, 1);
    assert_eq!(outcome.loss, 6.0);
    assert_eq!(outcome.v[2], adjust(0, canonical[2]));
    assert_eq!(outcome.v[1], canonical[1]);
}
