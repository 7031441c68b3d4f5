// =============================================================================
// Seeded Train/Test Split
// =============================================================================
//
// Splits a dataset for holdout evaluation while guaranteeing that the
// training set spans the observed range: for every predictor column and
// for the response, the rows holding the minimum and maximum raw values
// are pinned into the training set. A model extrapolates badly outside
// its training range, so the extremes must be trained on, not tested on.
//
// The remaining rows are shuffled with an explicitly seeded StdRng and
// divided by ratio. The same seed always produces the same split; there
// is no ambient randomness anywhere in this crate.
//
// =============================================================================

use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::dataset::Dataset;
use crate::error::{PowerFitError, Result};

/// Split a dataset into (train, test).
///
/// `train_ratio` is the target fraction of rows in the training set; the
/// pinned min/max rows count toward it. Both halves are themselves valid
/// datasets, so each must end up with at least p + 2 rows.
///
/// # Errors
/// * `InvalidDomain` - ratio outside (0, 1), or either half too small
pub fn train_test_split(
    dataset: &Dataset,
    train_ratio: f64,
    seed: u64,
) -> Result<(Dataset, Dataset)> {
    if !(train_ratio > 0.0 && train_ratio < 1.0) {
        return Err(PowerFitError::InvalidDomain(format!(
            "train_ratio must be in (0, 1), got {}",
            train_ratio
        )));
    }

    let n = dataset.len();
    let pinned = range_extremes(dataset);

    let mut remaining: Vec<usize> = (0..n).filter(|i| !pinned.contains(i)).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    remaining.shuffle(&mut rng);

    let target_train = (n as f64 * train_ratio) as usize;
    let extra = target_train.saturating_sub(pinned.len());

    let mut train_indices: Vec<usize> = pinned.into_iter().collect();
    train_indices.extend(&remaining[..extra.min(remaining.len())]);
    let mut test_indices: Vec<usize> = remaining[extra.min(remaining.len())..].to_vec();

    // Deterministic output order: original dataset order on both sides
    train_indices.sort_unstable();
    test_indices.sort_unstable();

    Ok((
        dataset.subset(&train_indices)?,
        dataset.subset(&test_indices)?,
    ))
}

/// Indices of the rows holding the per-column min and max raw values,
/// across all predictors and the response.
fn range_extremes(dataset: &Dataset) -> BTreeSet<usize> {
    let obs = dataset.observations();
    let mut pinned = BTreeSet::new();

    for col in 0..dataset.num_predictors() {
        let (min_i, _) = extreme(obs.iter().map(|o| o.predictors()[col]), false);
        let (max_i, _) = extreme(obs.iter().map(|o| o.predictors()[col]), true);
        pinned.insert(min_i);
        pinned.insert(max_i);
    }
    let (min_i, _) = extreme(obs.iter().map(|o| o.response()), false);
    let (max_i, _) = extreme(obs.iter().map(|o| o.response()), true);
    pinned.insert(min_i);
    pinned.insert(max_i);

    pinned
}

fn extreme(values: impl Iterator<Item = f64>, want_max: bool) -> (usize, f64) {
    let mut best = (0, f64::NAN);
    for (i, v) in values.enumerate() {
        let better = if best.1.is_nan() {
            true
        } else if want_max {
            v > best.1
        } else {
            v < best.1
        };
        if better {
            best = (i, v);
        }
    }
    best
}

// =============================================================================
// Tests
// =============================================================================
