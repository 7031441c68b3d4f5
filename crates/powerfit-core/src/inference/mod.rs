// =============================================================================
// Interval Estimation
// =============================================================================
//
// Prediction and confidence bands around the fitted log-linear model.
//
// Both bands share the same shape:
//
//     bound_i = y_hat_i +/- t(1 - alpha/2; n-p-1) * se_i
//
// and differ only in the standard error:
//
//     prediction: se_i = sqrt(MSE * (1 + h_i))   covers a NEW observation
//     confidence: se_i = sqrt(MSE * h_i)         covers the MEAN response
//
// where h_i is the leverage of observation i. Bounds are computed in log
// space (where the linear model lives) and additionally reported
// back-transformed to the original scale via 10^bound.
//
// The outlier screen in `detection::intervals` tests the actual log
// response against the log-space prediction band, before any
// back-transformation.
//
// =============================================================================

use ndarray::Array1;
use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::error::{PowerFitError, Result};
use crate::solvers::FittedModel;

// =============================================================================
// Types
// =============================================================================

/// Which band to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalKind {
    /// Band for the mean response at each design point.
    Confidence,
    /// Band for a new observation at each design point (wider).
    Prediction,
}

/// Per-observation interval bounds, in log space and on the original scale.
#[derive(Debug, Clone)]
pub struct IntervalBands {
    pub kind: IntervalKind,
    /// Lower/upper bounds in log10 space.
    pub lower_log: Array1<f64>,
    pub upper_log: Array1<f64>,
    /// The same bounds raised to power 10, for reporting against raw data.
    pub lower: Array1<f64>,
    pub upper: Array1<f64>,
    /// Per-observation standard error used for the margin.
    pub standard_errors: Array1<f64>,
    /// The t-quantile at (1 - alpha/2) with n - p - 1 degrees of freedom.
    pub critical_t: f64,
}

// =============================================================================
// Computation
// =============================================================================

/// Two-sided critical t-value at significance `alpha` with `df` degrees of
/// freedom.
pub fn critical_t(alpha: f64, df: f64) -> Result<f64> {
    if !(0.0..1.0).contains(&alpha) || alpha <= 0.0 {
        return Err(PowerFitError::InvalidDomain(format!(
            "alpha must be in (0, 1), got {}",
            alpha
        )));
    }
    let t_dist = StudentsT::new(0.0, 1.0, df).map_err(|e| {
        PowerFitError::InvalidDomain(format!("t-distribution with df={}: {}", df, e))
    })?;
    Ok(t_dist.inverse_cdf(1.0 - alpha / 2.0))
}

/// Compute interval bands around the fitted values of a model.
pub fn intervals(model: &FittedModel, alpha: f64, kind: IntervalKind) -> Result<IntervalBands> {
    let t = critical_t(alpha, model.residual_df() as f64)?;
    let mse = model.mse();

    let standard_errors: Array1<f64> = model
        .leverage()
        .mapv(|h| match kind {
            IntervalKind::Prediction => (mse * (1.0 + h)).sqrt(),
            IntervalKind::Confidence => (mse * h).sqrt(),
        });

    let lower_log = model.fitted_log() - &(t * &standard_errors);
    let upper_log = model.fitted_log() + &(t * &standard_errors);

    Ok(IntervalBands {
        kind,
        lower: lower_log.mapv(|z| 10f64.powf(z)),
        upper: upper_log.mapv(|z| 10f64.powf(z)),
        lower_log,
        upper_log,
        standard_errors,
        critical_t: t,
    })
}

// =============================================================================
// Tests
// =============================================================================
