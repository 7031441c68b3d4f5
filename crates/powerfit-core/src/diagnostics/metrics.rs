// =============================================================================
// Regression Metrics (Original Scale)
// =============================================================================
//
// All metrics compare raw responses y against back-transformed predictions
// y_hat = 10^(fitted log value):
//
//     R^2     = 1 - sum((y - y_hat)^2) / sum((y - y_bar)^2)
//     MMRE    = mean(|y - y_hat| / y)
//     PRED(t) = fraction of observations with |y - y_hat| / y < t
//
// plus the residual mean and unbiased (n - 1) residual variance. MMRE and
// PRED are the standard accuracy measures for effort/size estimation
// models; PRED(0.25) is the conventional reporting threshold.
//
// =============================================================================

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::error::{PowerFitError, Result};
use crate::solvers::FittedModel;

/// Conventional PRED threshold: a prediction "hits" when its relative
/// error is below 25%.
pub const DEFAULT_PRED_THRESHOLD: f64 = 0.25;

/// Original-scale quality metrics for a fitted model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub r_squared: f64,
    /// Mean magnitude of relative error.
    pub mmre: f64,
    /// Fraction of observations with relative error below `pred_threshold`.
    pub pred: f64,
    pub pred_threshold: f64,
    /// Mean of the original-scale residuals y - y_hat.
    pub residual_mean: f64,
    /// Unbiased (n - 1) variance of the original-scale residuals.
    pub residual_variance: f64,
}

/// Evaluate a model against the dataset it was fit on, with PRED(0.25).
pub fn evaluate(model: &FittedModel) -> RegressionMetrics {
    evaluate_with_threshold(model, DEFAULT_PRED_THRESHOLD)
}

/// Evaluate a model against the dataset it was fit on, with a caller-chosen
/// PRED threshold.
pub fn evaluate_with_threshold(model: &FittedModel, tau: f64) -> RegressionMetrics {
    let actual = model.dataset().responses();
    let predicted = model.fitted();
    compute(&actual, &predicted, tau)
}

/// Evaluate a fitted model against a held-out dataset.
///
/// # Errors
/// * `DimensionMismatch` - the holdout dataset has a different predictor
///   count than the model
pub fn score(model: &FittedModel, holdout: &Dataset, tau: f64) -> Result<RegressionMetrics> {
    if holdout.num_predictors() != model.num_predictors() {
        return Err(PowerFitError::DimensionMismatch(format!(
            "model has {} predictors but the holdout dataset has {}",
            model.num_predictors(),
            holdout.num_predictors()
        )));
    }

    let actual = holdout.responses();
    let predicted: Array1<f64> = holdout
        .observations()
        .iter()
        .map(|obs| {
            let mut log_y = model.intercept();
            for (&zx, &b) in obs.log_predictors().iter().zip(model.slopes()) {
                log_y += b * zx;
            }
            10f64.powf(log_y)
        })
        .collect();

    Ok(compute(&actual, &predicted, tau))
}

fn compute(actual: &Array1<f64>, predicted: &Array1<f64>, tau: f64) -> RegressionMetrics {
    let n = actual.len();
    let nf = n as f64;

    let residuals = actual - predicted;
    let y_mean = actual.sum() / nf;

    let ss_res = residuals.mapv(|e| e * e).sum();
    let ss_tot = actual.mapv(|y| (y - y_mean) * (y - y_mean)).sum();
    let r_squared = 1.0 - ss_res / ss_tot;

    let relative: Array1<f64> = residuals
        .iter()
        .zip(actual.iter())
        .map(|(&e, &y)| (e / y).abs())
        .collect();
    let mmre = relative.sum() / nf;
    let pred = relative.iter().filter(|&&r| r < tau).count() as f64 / nf;

    let residual_mean = residuals.sum() / nf;
    let residual_variance = residuals
        .mapv(|e| (e - residual_mean) * (e - residual_mean))
        .sum()
        / (nf - 1.0);

    RegressionMetrics {
        r_squared,
        mmre,
        pred,
        pred_threshold: tau,
        residual_mean,
        residual_variance,
    }
}

// =============================================================================
// Tests
// =============================================================================
