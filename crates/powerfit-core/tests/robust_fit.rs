// =============================================================================
// End-to-End Properties of the Robust Fitting Engine
// =============================================================================
//
// These tests drive the public API the way a caller would: build a
// dataset, run the robust fit, inspect the model, metrics, and removal
// history.
//
// Synthetic data construction: predictors live on log-spaced grids in
// [1, 1000], and the noise values are exact normal scores (Blom-
// approximated normal order statistics), assigned so that the largest
// noise magnitudes land on the most central design points. That makes the
// residuals normal BY CONSTRUCTION - the Shapiro-Wilk gate is satisfied
// deterministically, without sampling.
//
// =============================================================================

use approx::assert_abs_diff_eq;
use statrs::distribution::{ContinuousCDF, Normal};

use powerfit_core::{
    detection, evaluate, fit, robust_fit, score, train_test_split, Dataset, PowerFitError, Record,
    RobustFitConfig, StopReason, DEFAULT_FLOOR, DEFAULT_PRED_THRESHOLD,
};

const B0: f64 = 0.30;
const B1: f64 = 0.5;
const B2: f64 = 1.2;

/// Normal scores: the expected order statistics of a standard normal
/// sample of size n (Blom approximation), winsorized at |1.8| so that no
/// single residual sits on the prediction-interval boundary.
fn normal_scores(n: usize) -> Vec<f64> {
    let normal = Normal::new(0.0, 1.0).unwrap();
    (0..n)
        .map(|i| {
            normal
                .inverse_cdf((i as f64 + 0.625) / (n as f64 + 0.25))
                .clamp(-1.8, 1.8)
        })
        .collect()
}

/// Power-law data y = 10^B0 * x1^B1 * x2^B2 with multiplicative noise
/// 10^eps. `noise_scale = 0` gives exact, noise-free data.
fn power_law_records(n: usize, noise_scale: f64) -> Vec<Record> {
    let nf = (n - 1) as f64;
    let grid = |i: usize| 3.0 * i as f64 / nf; // log10 range [0, 3]
    let zx1: Vec<f64> = (0..n).map(|i| grid(i)).collect();
    let zx2: Vec<f64> = (0..n).map(|i| grid((i * 17) % n)).collect();

    // Rank design points by centrality; hand the largest |score| to the
    // most central point so no corner of the design carries extreme noise.
    let mut by_centrality: Vec<usize> = (0..n).collect();
    by_centrality.sort_by(|&a, &b| {
        let ca = (zx1[a] - 1.5).abs() + (zx2[a] - 1.5).abs();
        let cb = (zx1[b] - 1.5).abs() + (zx2[b] - 1.5).abs();
        ca.partial_cmp(&cb).unwrap()
    });
    let mut scores = normal_scores(n);
    scores.sort_by(|a, b| b.abs().partial_cmp(&a.abs()).unwrap());

    let mut eps = vec![0.0; n];
    for (rank, &row) in by_centrality.iter().enumerate() {
        eps[row] = noise_scale * scores[rank];
    }

    (0..n)
        .map(|i| {
            let log_y = B0 + B1 * zx1[i] + B2 * zx2[i] + eps[i];
            Record::new(
                format!("obs-{}", i),
                vec![10f64.powf(zx1[i]), 10f64.powf(zx2[i])],
                10f64.powf(log_y),
            )
        })
        .collect()
}

// =============================================================================
// Exact recovery
// =============================================================================

#[test]
fn exact_recovery_with_zero_noise() {
    let ds = Dataset::build(&power_law_records(30, 0.0), DEFAULT_FLOOR).unwrap();
    let model = fit(&ds).unwrap();

    assert_abs_diff_eq!(model.intercept(), B0, epsilon = 1e-6);
    assert_abs_diff_eq!(model.slopes()[0], B1, epsilon = 1e-6);
    assert_abs_diff_eq!(model.slopes()[1], B2, epsilon = 1e-6);

    let metrics = evaluate(&model);
    assert_abs_diff_eq!(metrics.r_squared, 1.0, epsilon = 1e-9);
    assert!(metrics.mmre < 1e-6);
    assert_eq!(metrics.pred, 1.0);
}

#[test]
fn log_transform_round_trips() {
    let ds = Dataset::build(&power_law_records(10, 0.0), DEFAULT_FLOOR).unwrap();
    for obs in ds.observations() {
        for (&raw, &logv) in obs.predictors().iter().zip(obs.log_predictors()) {
            assert_abs_diff_eq!(10f64.powf(logv), raw, epsilon = 1e-9 * raw);
        }
    }
}

// =============================================================================
// Outlier sensitivity
// =============================================================================

#[test]
fn displaced_observation_is_flagged_and_removed() {
    let mut records = power_law_records(30, 0.02);
    // Joint log vector displaced by ~5 orders of magnitude in the
    // response: far beyond 10 standard deviations of the noise.
    records.push(Record::new("planted", vec![40.0, 70.0], 3.0e9));
    let planted = records.len() - 1;
    let ds = Dataset::build(&records, DEFAULT_FLOOR).unwrap();

    // Flagged by the Mahalanobis detector at alpha = 0.05 ...
    let report = detection::mahalanobis::flag(&ds, 0.05).unwrap();
    assert!(report.indices().contains(&planted));

    // ... and gone from the dataset after the controller runs.
    let result = robust_fit(&ds, &RobustFitConfig::default()).unwrap();
    assert!(result.converged);
    assert!(result
        .model
        .dataset()
        .observations()
        .iter()
        .all(|o| o.label() != "planted"));
    assert!(result
        .history
        .iter()
        .any(|round| round.report.flags.iter().any(|f| f.label == "planted")));
}

// =============================================================================
// Convergence behavior
// =============================================================================

#[test]
fn shrinkage_is_monotonic_and_terminates() {
    let mut records = power_law_records(30, 0.02);
    records.push(Record::new("bad-a", vec![40.0, 70.0], 3.0e9));
    records.push(Record::new("bad-b", vec![5.0, 400.0], 1.0e8));
    let ds = Dataset::build(&records, DEFAULT_FLOOR).unwrap();

    let result = robust_fit(&ds, &RobustFitConfig::default()).unwrap();
    assert!(result.iterations <= 100);
    assert!(matches!(
        result.stop_reason,
        StopReason::Converged | StopReason::IterationLimit | StopReason::MinimumSize
    ));

    // Each removal round strictly shrinks the dataset
    let mut n = ds.len();
    for round in &result.history {
        let removed = round.report.indices().len();
        assert!(removed >= 1);
        assert!(n - removed >= ds.min_len());
        n -= removed;
    }
    assert_eq!(n, result.model.n());
}

#[test]
fn detectors_are_idempotent_after_convergence() {
    let mut records = power_law_records(30, 0.02);
    records.push(Record::new("planted", vec![40.0, 70.0], 3.0e9));
    let ds = Dataset::build(&records, DEFAULT_FLOOR).unwrap();

    let result = robust_fit(&ds, &RobustFitConfig::default()).unwrap();
    assert!(result.converged);

    // Re-running both detectors on the converged dataset finds nothing
    let mahalanobis = detection::mahalanobis::flag(result.model.dataset(), 0.05).unwrap();
    assert!(mahalanobis.is_empty(), "flags: {:?}", mahalanobis.flags);
    let interval = detection::intervals::flag(&result.model, 0.05).unwrap();
    assert!(interval.is_empty(), "flags: {:?}", interval.flags);
}

// =============================================================================
// Degenerate input
// =============================================================================

#[test]
fn collinear_predictors_raise_singular_design() {
    // y = 5 * x1 with x2 = 10 * x1: in log space x2 is an exact affine
    // function of x1, so X'X is singular.
    let rows = [
        (10.0, 100.0, 50.0),
        (20.0, 200.0, 100.0),
        (40.0, 400.0, 200.0),
        (80.0, 800.0, 400.0),
        (160.0, 1600.0, 800.0),
    ];
    let records: Vec<Record> = rows
        .iter()
        .enumerate()
        .map(|(i, &(x1, x2, y))| Record::new(format!("r{}", i), vec![x1, x2], y))
        .collect();
    let ds = Dataset::build(&records, DEFAULT_FLOOR).unwrap();

    assert!(matches!(fit(&ds), Err(PowerFitError::SingularDesign(_))));
}

// =============================================================================
// Holdout workflow
// =============================================================================

#[test]
fn split_fit_and_score_holdout() {
    let ds = Dataset::build(&power_law_records(30, 0.02), DEFAULT_FLOOR).unwrap();

    let (train, test) = train_test_split(&ds, 0.7, 7).unwrap();
    assert_eq!(train.len() + test.len(), ds.len());

    // Same seed, same split
    let (train_again, _) = train_test_split(&ds, 0.7, 7).unwrap();
    let labels = |d: &Dataset| -> Vec<String> {
        d.observations()
            .iter()
            .map(|o| o.label().to_string())
            .collect()
    };
    assert_eq!(labels(&train), labels(&train_again));

    let result = robust_fit(&train, &RobustFitConfig::default()).unwrap();
    assert!(result.converged);

    let holdout = score(&result.model, &test, DEFAULT_PRED_THRESHOLD).unwrap();
    assert!(holdout.r_squared > 0.95, "r^2 = {}", holdout.r_squared);
    assert!(holdout.mmre < 0.15, "mmre = {}", holdout.mmre);
    assert!(holdout.pred >= 0.8, "pred = {}", holdout.pred);
}
