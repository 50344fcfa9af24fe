//! Randomized down-selection of candidate frames.
//!
//! All functions take the random source explicitly so callers can seed it.

use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;

use crate::domain::errors::{ExplorationError, ExplorationResult};
use crate::domain::models::FrameId;

/// Keep `max_numb` candidates chosen uniformly at random.
pub fn select_uniform<R: Rng + ?Sized>(
    mut candidates: Vec<FrameId>,
    max_numb: usize,
    rng: &mut R,
) -> Vec<FrameId> {
    candidates.shuffle(rng);
    candidates.truncate(max_numb);
    candidates
}

/// Draw `max_numb` candidates without replacement, with probability
/// proportional to `weights`.
pub fn select_weighted<R: Rng + ?Sized>(
    candidates: &[FrameId],
    weights: &[f64],
    max_numb: usize,
    rng: &mut R,
) -> ExplorationResult<Vec<FrameId>> {
    if candidates.len() != weights.len() {
        return Err(ExplorationError::InvalidWeights(format!(
            "{} candidates but {} weights",
            candidates.len(),
            weights.len()
        )));
    }
    let indices: Vec<usize> = (0..candidates.len()).collect();
    let picked = indices
        .choose_multiple_weighted(rng, max_numb, |&idx| weights[idx])
        .map_err(|e| ExplorationError::InvalidWeights(e.to_string()))?;
    Ok(picked.map(|&idx| candidates[idx]).collect())
}

/// Weight every value by the reciprocal of its histogram bin population.
///
/// The histogram has `bins` equal-width bins spanning `[min, max]` of
/// `values`; the last bin is closed. When all values are equal they share a
/// single bin.
pub fn inverse_population_weights(values: &[f64], bins: usize) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let bins = bins.max(1);
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let width = (max - min) / bins as f64;
    let bin_of = |value: f64| -> usize {
        if width > 0.0 {
            (((value - min) / width) as usize).min(bins - 1)
        } else {
            0
        }
    };

    let mut population = vec![0usize; bins];
    for &value in values {
        population[bin_of(value)] += 1;
    }
    values
        .iter()
        .map(|&value| 1.0 / population[bin_of(value)] as f64)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::BTreeSet;

    fn frames(n: usize) -> Vec<FrameId> {
        (0..n).map(|i| FrameId::new(i % 2, i)).collect()
    }

    #[test]
    fn test_inverse_population_weights_two_bins() {
        // 5 values in [0.10, 0.315), 7 in [0.315, 0.53]
        let values = [
            0.10, 0.11, 0.50, 0.53, 0.51, 0.52, 0.41, 0.20, 0.21, 0.41, 0.22, 0.42,
        ];
        let weights = inverse_population_weights(&values, 2);
        assert_eq!(weights.len(), 12);
        for (value, weight) in values.iter().zip(&weights) {
            let expected = if *value < 0.4 { 1.0 / 5.0 } else { 1.0 / 7.0 };
            assert!((weight - expected).abs() < 1e-12, "{value}: {weight}");
        }
    }

    #[test]
    fn test_inverse_population_weights_degenerate_range() {
        let weights = inverse_population_weights(&[0.3, 0.3, 0.3, 0.3], 5);
        assert!(weights.iter().all(|w| (w - 0.25).abs() < 1e-12));
        assert!(inverse_population_weights(&[], 3).is_empty());
    }

    #[test]
    fn test_maximum_lands_in_last_bin() {
        let weights = inverse_population_weights(&[0.0, 1.0], 4);
        assert_eq!(weights, vec![1.0, 1.0]);
    }

    #[test]
    fn test_select_uniform_picks_distinct_subset() {
        let candidates = frames(10);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let picked = select_uniform(candidates.clone(), 4, &mut rng);
        assert_eq!(picked.len(), 4);
        let unique: BTreeSet<_> = picked.iter().collect();
        assert_eq!(unique.len(), 4);
        assert!(picked.iter().all(|id| candidates.contains(id)));
    }

    #[test]
    fn test_select_weighted_without_replacement() {
        let candidates = frames(6);
        let weights = vec![1.0, 1.0, 1.0, 1.0, 1.0, 1.0];
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let picked = select_weighted(&candidates, &weights, 6, &mut rng).unwrap();
        let unique: BTreeSet<_> = picked.iter().collect();
        assert_eq!(unique.len(), 6);
    }

    #[test]
    fn test_select_weighted_prefers_heavy_candidates() {
        let candidates = frames(4);
        // Only the last two candidates carry weight.
        let weights = vec![0.0, 0.0, 1.0, 1.0];
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let picked: BTreeSet<_> = select_weighted(&candidates, &weights, 2, &mut rng)
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(picked, candidates[2..].iter().copied().collect());
    }

    #[test]
    fn test_select_weighted_rejects_mismatched_lengths() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(matches!(
            select_weighted(&frames(3), &[1.0], 1, &mut rng),
            Err(ExplorationError::InvalidWeights(_))
        ));
    }
}
