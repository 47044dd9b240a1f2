//! Integration Test: Bounded Exploration
//!
//! Completeness, safety soundness across worker counts, work stealing,
//! cancellation and the local stack ceiling, all on hand-built graphs.

mod common;

use common::{broom, chain, grid, GraphBuilder};
use krepis_crunch::{
    Crunch, CrunchConfig, CutoffSchedule, Fingerprint, Outcome, ProgressControl, ViolationKind,
};

fn workers(n: usize) -> CrunchConfig {
    CrunchConfig::builder().workers(n).build().unwrap()
}

// ============================================================================
// Completeness
// ============================================================================

#[test]
fn test_grid_visits_every_reachable_state() {
    let model = grid(5, 4).build();
    let report = Crunch::new(&model, workers(4)).unwrap().crunch().unwrap();

    assert_eq!(report.outcome, Outcome::Success);
    assert_eq!(report.distinct_states, 20);
    assert!(!report.bound_exhausted);
    // longest path is 3 + 4 = 7 transitions
    assert_eq!(report.stats.iterations, 8);
}

#[test]
fn test_unreachable_states_are_not_counted() {
    // 3 and 4 only point at the reachable part
    let model = GraphBuilder::new(5)
        .edge(0, 1)
        .edge(1, 2)
        .edge(3, 1)
        .edge(4, 0)
        .build();
    let report = Crunch::new(&model, workers(2)).unwrap().crunch().unwrap();
    assert_eq!(report.distinct_states, 3);
}

#[test]
fn test_diamond_with_back_edges_terminates() {
    let model = GraphBuilder::new(4)
        .edge(0, 1)
        .edge(0, 2)
        .edge(1, 3)
        .edge(2, 3)
        .edge(3, 0)
        .edge(2, 1)
        .build();
    let report = Crunch::new(&model, workers(3)).unwrap().crunch().unwrap();
    assert_eq!(report.outcome, Outcome::Success);
    assert_eq!(report.distinct_states, 4);
}

#[test]
fn test_single_iteration_schedule_matches_linear() {
    let model = grid(6, 6).build();
    let linear = Crunch::new(&model, workers(2)).unwrap().crunch().unwrap();

    let cfg = CrunchConfig::builder()
        .workers(2)
        .schedule(CutoffSchedule::Explicit(vec![64]))
        .build()
        .unwrap();
    let one_shot = Crunch::new(&model, cfg).unwrap().crunch().unwrap();

    assert_eq!(one_shot.stats.iterations, 1);
    assert_eq!(one_shot.distinct_states, linear.distinct_states);
}

// ============================================================================
// Safety Soundness
// ============================================================================

#[test]
fn test_single_error_found_once_regardless_of_workers() {
    // error at depth 4, reachable along many grid paths
    let model = grid(4, 4).error(10, 3).build();

    for n in [1, 2, 8] {
        let report = Crunch::new(&model, workers(n)).unwrap().crunch().unwrap();
        println!("workers={n} states={}", report.stats.states_explored);

        assert_eq!(report.outcome, Outcome::SafetyViolation, "workers={n}");
        assert_eq!(report.safety_traces.len(), 1, "workers={n}");
        let trace = &report.safety_traces[0];
        assert_eq!(trace.kind, ViolationKind::Safety { code: 3 });
        assert_eq!(trace.len(), 4);
        assert_eq!(trace.last_state(), Some(Fingerprint::new(10)));
    }
}

#[test]
fn test_continue_after_error_collects_every_error_state() {
    let model = broom(3, 4).error(2, 1).error(8, 2).error(12, 3).build();
    let cfg = CrunchConfig::builder()
        .workers(2)
        .stop_on_first_error(false)
        .build()
        .unwrap();
    let report = Crunch::new(&model, cfg).unwrap().crunch().unwrap();

    assert_eq!(report.outcome, Outcome::SafetyViolation);
    let mut codes: Vec<_> = report
        .safety_traces
        .iter()
        .map(|t| match t.kind {
            ViolationKind::Safety { code } => code,
            other => panic!("unexpected {other:?}"),
        })
        .collect();
    codes.sort_unstable();
    assert_eq!(codes, vec![1, 2, 3]);
}

// ============================================================================
// Work Stealing
// ============================================================================

#[test]
fn test_worker_count_does_not_change_verdict() {
    let model = broom(16, 12).build();
    let single = Crunch::new(&model, workers(1)).unwrap().crunch().unwrap();

    let cfg = CrunchConfig::builder().workers(6).steal_batch(2).build().unwrap();
    let parallel = Crunch::new(&model, cfg).unwrap().crunch().unwrap();

    assert_eq!(single.outcome, parallel.outcome);
    assert_eq!(single.distinct_states, parallel.distinct_states);
    assert_eq!(single.distinct_states, 1 + 16 * 12);
    assert_eq!(single.stats.iterations, parallel.stats.iterations);
    assert_eq!(single.stats.steals, 0);
}

#[test]
fn test_idle_workers_steal_from_busy_owner() {
    // the root's worker defers every branch head, so the others only get
    // work in the second iteration by stealing
    let model = broom(48, 400).build();
    let cfg = CrunchConfig::builder()
        .workers(6)
        .steal_batch(2)
        .schedule(CutoffSchedule::Explicit(vec![1, 1_000]))
        .build()
        .unwrap();
    let report = Crunch::new(&model, cfg).unwrap().crunch().unwrap();

    assert_eq!(report.outcome, Outcome::Success);
    assert_eq!(report.distinct_states, 1 + 48 * 400);
    assert!(report.stats.steals > 0);
}

#[test]
fn test_violation_verdicts_do_not_depend_on_worker_count() {
    // error at the end of branch 5; accepting 2 on the cycle 2 -> 30 -> 2
    let unsafe_model = broom(8, 6).error(5 * 6 + 6, 4).build();
    let mut live = GraphBuilder::new(31)
        .edge(0, 1)
        .edge(1, 2)
        .edge(2, 3)
        .edge(2, 30)
        .edge(30, 2)
        .accepting(2);
    for n in 3..29 {
        live = live.edge(n, n + 1);
    }
    let live_model = live.build();

    let mut verdicts = Vec::new();
    for n in [1, 2, 8] {
        let safety = Crunch::new(&unsafe_model, workers(n)).unwrap().crunch().unwrap();
        let cfg = CrunchConfig::builder().workers(n).liveness(true).build().unwrap();
        let liveness = Crunch::new(&live_model, cfg).unwrap().crunch().unwrap();

        assert_eq!(safety.safety_traces.len(), 1, "workers={n}");
        assert_eq!(safety.safety_traces[0].len(), 6, "workers={n}");
        assert_eq!(liveness.confirmed_cycles().count(), 1, "workers={n}");
        verdicts.push((safety.outcome, liveness.outcome));
    }

    assert!(verdicts
        .iter()
        .all(|&v| v == (Outcome::SafetyViolation, Outcome::LivenessViolation)));
}

// ============================================================================
// Cancellation
// ============================================================================

#[test]
fn test_stop_on_first_error_halts_promptly() {
    // first successor of the root is erroneous, the second heads a long chain
    let mut builder = GraphBuilder::new(2_002).edge(0, 1).edge(0, 2).error(1, 5);
    for n in 2..2_001 {
        builder = builder.edge(n, n + 1);
    }
    let model = builder.build();
    let cfg = CrunchConfig::builder()
        .workers(4)
        .schedule(CutoffSchedule::Explicit(vec![5_000]))
        .build()
        .unwrap();
    let report = Crunch::new(&model, cfg).unwrap().crunch().unwrap();

    assert_eq!(report.outcome, Outcome::SafetyViolation);
    assert_eq!(report.stats.iterations, 1);
    assert!(report.stats.states_explored < 10, "explored {}", report.stats.states_explored);
}

#[test]
fn test_progress_cancel_keeps_statistics() {
    let model = chain(40);
    let report = Crunch::new(&model, workers(2))
        .unwrap()
        .crunch_with_progress(|snapshot| {
            if snapshot.distinct_states >= 5 {
                ProgressControl::Cancel
            } else {
                ProgressControl::Continue
            }
        })
        .unwrap();

    assert_eq!(report.outcome, Outcome::Canceled);
    assert!(report.distinct_states >= 5);
    assert!(report.distinct_states < 40);
    assert!(report.stats.states_explored > 0);
}

// ============================================================================
// Resource Ceilings
// ============================================================================

#[test]
fn test_stack_ceiling_reports_overflow_trace() {
    let model = chain(50);
    let cfg = CrunchConfig::builder()
        .workers(1)
        .max_stack_depth(8)
        .schedule(CutoffSchedule::Explicit(vec![100]))
        .build()
        .unwrap();
    let report = Crunch::new(&model, cfg).unwrap().crunch().unwrap();

    assert_eq!(report.outcome, Outcome::SafetyViolation);
    assert_eq!(report.safety_traces.len(), 1);
    assert_eq!(report.safety_traces[0].kind, ViolationKind::StackOverflow { limit: 8 });
    assert_eq!(report.stats.max_stack_depth, 8);
}

#[test]
fn test_choice_ceiling_prunes_costly_branches() {
    // 0 -> 1 -> 2 is free; 0 => 3 -> 4 costs one choice
    let model = GraphBuilder::new(5)
        .edge(0, 1)
        .edge(1, 2)
        .choice_edge(0, 3)
        .edge(3, 4)
        .build();

    let free = Crunch::new(&model, workers(1)).unwrap().crunch().unwrap();
    assert_eq!(free.distinct_states, 5);

    let cfg = CrunchConfig::builder().workers(1).max_choice_cost(0).build().unwrap();
    let pruned = Crunch::new(&model, cfg).unwrap().crunch().unwrap();
    assert_eq!(pruned.outcome, Outcome::Success);
    assert_eq!(pruned.distinct_states, 3);
    assert!(pruned.stats.pruned >= 1);
}

#[test]
fn test_cutoff_ceiling_reports_exhaustion() {
    let model = chain(30);
    let cfg = CrunchConfig::builder().workers(2).max_cutoff(10).build().unwrap();
    let report = Crunch::new(&model, cfg).unwrap().crunch().unwrap();

    assert!(report.is_clean());
    assert!(report.bound_exhausted);
    assert_eq!(report.final_cutoff, 10);
    assert_eq!(report.distinct_states, 10);
}
