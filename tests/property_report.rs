use std::collections::BTreeSet;

use mlip_explore::services::report::ExplorationReport;
use mlip_explore::{
    AdaptiveLowerConfig, CandidateSelection, DeviQuantity, DeviationManager,
    ExplorationReportConfig, FrameId, TrustLevel,
};
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Up to 4 trajectories of up to 12 frames, with matching force and virial
/// shapes.
fn deviations() -> impl Strategy<Value = (Vec<Vec<f64>>, Vec<Vec<f64>>)> {
    prop::collection::vec(1usize..12, 1..4).prop_flat_map(|lengths| {
        let force = lengths
            .iter()
            .map(|&n| prop::collection::vec(0.0f64..1.0, n))
            .collect::<Vec<_>>();
        let virial = lengths
            .iter()
            .map(|&n| prop::collection::vec(0.0f64..1.0, n))
            .collect::<Vec<_>>();
        (force, virial)
    })
}

fn manager(force: &[Vec<f64>], virial: Option<&[Vec<f64>]>) -> DeviationManager {
    let mut md = DeviationManager::new();
    for values in force {
        md.add(DeviQuantity::MaxDeviF, values.clone()).unwrap();
    }
    if let Some(virial) = virial {
        for values in virial {
            md.add(DeviQuantity::MaxDeviV, values.clone()).unwrap();
        }
    }
    md
}

fn config(
    level_f_hi: f64,
    numb_candi_f: usize,
    level_v_hi: Option<f64>,
    numb_candi_v: usize,
) -> AdaptiveLowerConfig {
    AdaptiveLowerConfig {
        level_f_hi,
        numb_candi_f,
        rate_candi_f: 0.0,
        level_v_hi,
        numb_candi_v: if level_v_hi.is_some() { numb_candi_v } else { 0 },
        rate_candi_v: 0.0,
        n_checked_steps: 2,
        conv_tolerance: 0.01,
        candi_sel_prob: CandidateSelection::Uniform,
    }
}

fn record(config: AdaptiveLowerConfig, md: &DeviationManager) -> Result<ExplorationReport, TestCaseError> {
    ExplorationReportConfig::AdaptiveLower(config)
        .record(md)
        .map_err(|e| TestCaseError::fail(e.to_string()))
}

proptest! {
    /// Property: accurate, candidate and failed partition the frame set
    #[test]
    fn prop_sets_partition_frames(
        (force, virial) in deviations(),
        level_f_hi in 0.0f64..1.0,
        level_v_hi in prop::option::of(0.0f64..1.0),
        numb_candi_f in 0usize..20,
        numb_candi_v in 0usize..20,
    ) {
        let md = manager(&force, Some(&virial));
        let report = record(config(level_f_hi, numb_candi_f, level_v_hi, numb_candi_v), &md)?;

        let total: usize = force.iter().map(Vec::len).sum();
        let all: BTreeSet<FrameId> = report
            .accurate()
            .iter()
            .chain(report.candidate())
            .chain(report.failed())
            .copied()
            .collect();
        prop_assert_eq!(all.len(), total);
        prop_assert_eq!(
            report.accurate().len() + report.candidate().len() + report.failed().len(),
            total
        );
    }

    /// Property: a frame fails iff it exceeds an upper bound, whatever the
    /// candidate budget
    #[test]
    fn prop_failed_set_ignores_budget(
        (force, virial) in deviations(),
        level_f_hi in 0.0f64..1.0,
        level_v_hi in prop::option::of(0.0f64..1.0),
        budget_a in 0usize..20,
        budget_b in 0usize..20,
    ) {
        let md = manager(&force, Some(&virial));
        let a = record(config(level_f_hi, budget_a, level_v_hi, budget_a), &md)?;
        let b = record(config(level_f_hi, budget_b, level_v_hi, budget_b), &md)?;
        prop_assert_eq!(a.failed(), b.failed());

        for (traj, values) in force.iter().enumerate() {
            for (frame, &f) in values.iter().enumerate() {
                let v = virial[traj][frame];
                let expected = f > level_f_hi || level_v_hi.is_some_and(|hi| v > hi);
                prop_assert_eq!(a.failed().contains(&FrameId::new(traj, frame)), expected);
            }
        }
    }

    /// Property: each quantity contributes at most its budget of candidates
    #[test]
    fn prop_candidates_within_budget(
        (force, virial) in deviations(),
        numb_candi_f in 0usize..20,
        numb_candi_v in 0usize..20,
        with_virial in any::<bool>(),
    ) {
        let level_v_hi = with_virial.then_some(0.8);
        let md = manager(&force, with_virial.then_some(virial.as_slice()));
        let report = record(config(0.8, numb_candi_f, level_v_hi, numb_candi_v), &md)?;

        let budget = if with_virial { numb_candi_f + numb_candi_v } else { numb_candi_f };
        prop_assert!(report.candidate().len() <= budget);
    }

    /// Property: selection returns min(n, |candidate|) distinct candidates
    #[test]
    fn prop_selection_cap(
        (force, _virial) in deviations(),
        numb_candi_f in 0usize..20,
        max_numb in 0usize..20,
        seed in any::<u64>(),
        inverse_population in any::<bool>(),
    ) {
        let md = manager(&force, None);
        let mut cfg = config(0.9, numb_candi_f, None, 0);
        if inverse_population {
            cfg.candi_sel_prob = CandidateSelection::InversePopulation {
                quantity: DeviQuantity::MaxDeviF,
                bins: 3,
            };
        }
        let report = record(cfg, &md)?;

        let picked = report
            .get_candidate_ids(max_numb, &mut ChaCha8Rng::seed_from_u64(seed))
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(picked.len(), report.ntraj());

        let ids: BTreeSet<FrameId> = picked
            .iter()
            .enumerate()
            .flat_map(|(traj, frames)| frames.iter().map(move |&f| FrameId::new(traj, f)))
            .collect();
        let total: usize = picked.iter().map(Vec::len).sum();
        prop_assert_eq!(ids.len(), total);
        prop_assert_eq!(total, max_numb.min(report.candidate().len()));
        prop_assert!(ids.is_subset(report.candidate()));
    }

    /// Property: convergence is decided by the trailing window only
    #[test]
    fn prop_convergence_window(
        (force, _virial) in deviations(),
        history_lo in prop::collection::vec(0.0f64..1.0, 0..6),
        n_checked_steps in 1usize..5,
        conv_tolerance in 0.0f64..0.5,
    ) {
        let md = manager(&force, None);
        let cfg = AdaptiveLowerConfig {
            n_checked_steps,
            conv_tolerance,
            ..config(0.9, 3, None, 0)
        };
        let report = record(cfg, &md)?;
        let history: Vec<TrustLevel> = history_lo
            .iter()
            .map(|&lo| TrustLevel::new(lo, 0.9))
            .collect();

        let window = n_checked_steps - 1;
        let expected = history.len() >= window && {
            let levels: Vec<f64> = history[history.len() - window..]
                .iter()
                .map(|tl| tl.level_f_lo)
                .chain(std::iter::once(report.trust_level().level_f_lo))
                .collect();
            let min = levels.iter().copied().fold(f64::INFINITY, f64::min);
            let max = levels.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            max - min <= conv_tolerance
        };
        prop_assert_eq!(report.converged(&history), expected);
    }
}
