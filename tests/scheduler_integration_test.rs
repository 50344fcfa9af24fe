//! Drives the exploration scheduler through whole runs, the way an external
//! training-loop orchestrator would.

use std::io::Write;

use mlip_explore::{
    ConfigLoader, DeviQuantity, DeviationManager, ExplorationError, ExplorationPlan,
    ExplorationScheduler, SchedulerState, StageStatus,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tempfile::NamedTempFile;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const CONFIG: &str = r"
explore:
  fp_task_max: 4
  max_numb_iter: 3
  report:
    type: adaptive_lower
    level_f_hi: 0.7
    numb_candi_f: 3
    rate_candi_f: 0.0
    n_checked_steps: 2
    conv_tolerance: 0.01
  stages:
    - name: nvt-300K
      task_groups:
        - tasks:
            - files:
                in.lammps: 'temp 300'
    - name: nvt-600K
      task_groups:
        - tasks:
            - files:
                in.lammps: 'temp 600'
            - files:
                in.lammps: 'temp 600 seed 2'
      fatal_at_max: false
";

fn scheduler() -> ExplorationScheduler {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(CONFIG.as_bytes()).unwrap();
    let config = ConfigLoader::load_from_file(file.path()).unwrap();
    ExplorationScheduler::from_config(&config.explore).unwrap()
}

/// One trajectory whose third-largest value is `lo`.
fn snapshot(lo: f64) -> DeviationManager {
    let mut md = DeviationManager::new();
    md.add(
        DeviQuantity::MaxDeviF,
        vec![0.9, lo + 0.2, lo + 0.1, lo, lo - 0.1, 0.01, 0.02],
    )
    .unwrap();
    md
}

/// Run one iteration: record the snapshot with the planned selector, pick
/// frames, and plan the next iteration.
fn step(
    scheduler: &ExplorationScheduler,
    state: &mut SchedulerState,
    plan: &ExplorationPlan,
    devi: &DeviationManager,
    rng: &mut ChaCha8Rng,
) -> Result<ExplorationPlan, ExplorationError> {
    let ExplorationPlan::Continue { selector, .. } = plan else {
        panic!("no iteration planned");
    };
    let (report, confs) = selector.select_from_deviations(devi, &[], rng)?;
    assert!(confs.len() <= 4);
    scheduler.plan_next_iteration(state, Some(&report), &[])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn test_full_run_converges_every_stage() {
    let scheduler = scheduler();
    let mut state = scheduler.initial_state();
    let mut rng = ChaCha8Rng::seed_from_u64(2024);

    let mut plan = scheduler.plan_next_iteration(&mut state, None, &[]).unwrap();
    match &plan {
        ExplorationPlan::Continue {
            stage_index,
            task_group,
            ..
        } => {
            assert_eq!(*stage_index, 0);
            assert_eq!(task_group.len(), 1);
        }
        ExplorationPlan::Complete => panic!("first stage should start"),
    }

    // Stage 0: lower bound moves, then settles.
    for lo in [0.30, 0.40, 0.401] {
        plan = step(&scheduler, &mut state, &plan, &snapshot(lo), &mut rng).unwrap();
    }
    assert_eq!(state.stages[0].status, StageStatus::Converged);
    assert_eq!(state.stages[0].iteration, 3);
    match &plan {
        ExplorationPlan::Continue {
            stage_index,
            stage_iteration,
            task_group,
            ..
        } => {
            assert_eq!(*stage_index, 1);
            assert_eq!(*stage_iteration, 0);
            assert_eq!(task_group.len(), 2);
        }
        ExplorationPlan::Complete => panic!("second stage should start"),
    }

    // Stage 1 converges on its second report.
    for lo in [0.2, 0.2] {
        plan = step(&scheduler, &mut state, &plan, &snapshot(lo), &mut rng).unwrap();
    }
    assert_eq!(plan, ExplorationPlan::Complete);
    assert!(scheduler.converged(&state));
    assert!(scheduler.complete(&state));
    assert_eq!(scheduler.stage_and_iteration(&state), (1, 2));
    assert_eq!(
        scheduler.stage_of_iterations(&state),
        vec![(0, 0), (0, 1), (0, 2), (1, 0), (1, 1)]
    );

    let table = scheduler.print_convergence(&state);
    let rows: Vec<&str> = table.lines().collect();
    assert_eq!(rows.len(), 7);
    assert!(rows[3].contains("0.4010"), "{}", rows[3]);
    assert!(rows[5].starts_with("        1        1        4"), "{}", rows[5]);
    assert_eq!(rows[6], "# All stages converged");
}

#[test]
fn test_fatal_stage_halts_everything() {
    let scheduler = scheduler();
    let mut state = scheduler.initial_state();
    let mut rng = ChaCha8Rng::seed_from_u64(7);

    let mut plan = scheduler.plan_next_iteration(&mut state, None, &[]).unwrap();
    plan = step(&scheduler, &mut state, &plan, &snapshot(0.1), &mut rng).unwrap();
    plan = step(&scheduler, &mut state, &plan, &snapshot(0.3), &mut rng).unwrap();
    let err = step(&scheduler, &mut state, &plan, &snapshot(0.5), &mut rng).unwrap_err();

    assert_eq!(
        err,
        ExplorationError::FatalConvergence {
            stage: "nvt-300K".to_string(),
            iterations: 3
        }
    );
    assert!(state.halted());
    assert_eq!(state.cursor, 0, "must not advance past a fatal stage");
    assert_eq!(state.stages[1].status, StageStatus::Iterating);
    assert!(!scheduler.converged(&state));
    assert!(scheduler
        .print_convergence(&state)
        .ends_with("# Stage 0 did not converge after 3 iterations\n"));
}

#[test]
fn test_nonfatal_stage_exhausts_and_completes() {
    let scheduler = scheduler();
    let mut state = scheduler.initial_state();
    let mut rng = ChaCha8Rng::seed_from_u64(11);

    let mut plan = scheduler.plan_next_iteration(&mut state, None, &[]).unwrap();
    for lo in [0.3, 0.3] {
        plan = step(&scheduler, &mut state, &plan, &snapshot(lo), &mut rng).unwrap();
    }
    for lo in [0.1, 0.3, 0.5] {
        plan = step(&scheduler, &mut state, &plan, &snapshot(lo), &mut rng).unwrap();
    }

    assert_eq!(plan, ExplorationPlan::Complete);
    assert_eq!(state.stages[1].status, StageStatus::ExhaustedNonfatal);
    assert!(scheduler.converged(&state));
}

#[test]
fn test_state_survives_a_checkpoint() {
    let scheduler = scheduler();
    let mut state = scheduler.initial_state();
    let mut rng = ChaCha8Rng::seed_from_u64(3);

    let plan = scheduler.plan_next_iteration(&mut state, None, &[]).unwrap();
    let plan = step(&scheduler, &mut state, &plan, &snapshot(0.3), &mut rng).unwrap();

    let saved = serde_json::to_string(&state).unwrap();
    let mut restored: SchedulerState = serde_json::from_str(&saved).unwrap();
    assert_eq!(restored.cursor, state.cursor);
    assert_eq!(restored.stages[0].iteration, 1);
    assert_eq!(restored.stages[0].history.len(), 1);

    let next = step(&scheduler, &mut restored, &plan, &snapshot(0.3), &mut rng).unwrap();
    assert!(matches!(next, ExplorationPlan::Continue { stage_index: 1, .. }));
}
