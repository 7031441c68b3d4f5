// =============================================================================
// Robust Fit Controller
// =============================================================================
//
// The iterative loop that composes the solver, the detectors, and the
// normality gate:
//
//     FITTING -> DETECTING -> (CONVERGED | REMOVING) -> FITTING -> ...
//
// Canonical policy per iteration:
//
//   1. Fit the model on the current dataset.
//   2. Run the enabled detectors (Mahalanobis, prediction-interval).
//   3. Any flags: remove ALL flagged indices at once, rebuild, refit.
//   4. No flags: run the Shapiro-Wilk gate on the residuals. Normal:
//      CONVERGED. Not normal: remove the single largest-|residual|
//      observation (ties broken toward the lowest index), rebuild, refit.
//   5. Guards: if a removal would drop the dataset below p + 2, or the
//      iteration cap is reached, stop and hand back the current model
//      with `converged = false` instead of failing.
//
// Each iteration owns its Dataset exclusively and replaces it wholesale;
// models are never mutated after creation. SingularDesign and
// DegenerateCovariance propagate as fatal - the remaining data cannot
// support the model, and retrying would only hide that.
//
// =============================================================================

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::dataset::Dataset;
use crate::detection::{self, Detector, OutlierFlag, OutlierReport};
use crate::diagnostics::residuals_normal;
use crate::error::Result;
use crate::solvers::{self, FittedModel};

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the robust fitting loop.
///
/// `alpha` is threaded through every hypothesis test explicitly; there is
/// no process-wide significance constant.
#[derive(Debug, Clone)]
pub struct RobustFitConfig {
    /// Significance level for every hypothesis test.
    /// Default: 0.05
    pub alpha: f64,

    /// Cap on fit iterations before giving up with a non-convergence
    /// outcome. Default: 100
    pub max_iterations: usize,

    /// Run the joint log-space Mahalanobis detector.
    pub mahalanobis: bool,

    /// Run the prediction-interval screen.
    pub prediction_interval: bool,

    /// Require residual normality (Shapiro-Wilk) before converging.
    pub normality_gate: bool,
}

impl Default for RobustFitConfig {
    fn default() -> Self {
        Self {
            alpha: 0.05,
            max_iterations: 100,
            mahalanobis: true,
            prediction_interval: true,
            normality_gate: true,
        }
    }
}

// =============================================================================
// Outcome
// =============================================================================

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// No detector flags and (if gated) normal residuals.
    Converged,
    /// The iteration cap was reached with flags still outstanding.
    IterationLimit,
    /// The pending removal would have dropped the dataset below p + 2.
    MinimumSize,
}

/// One removal round, for caller audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemovalRound {
    /// 1-based fit iteration that produced these removals.
    pub iteration: usize,
    pub report: OutlierReport,
}

/// The outcome of a robust fit.
///
/// Always carries a complete fitted model: on non-convergence it is the
/// best model obtained so far, with the still-outstanding flags attached.
#[derive(Debug, Clone)]
pub struct RobustFit {
    pub model: FittedModel,
    /// Per-iteration removal reports, in order.
    pub history: Vec<RemovalRound>,
    /// Number of fits performed.
    pub iterations: usize,
    pub converged: bool,
    pub stop_reason: StopReason,
    /// Flags that were outstanding when a guard stopped the loop; empty
    /// when converged.
    pub remaining_flags: Vec<OutlierFlag>,
}

impl RobustFit {
    /// Total observations removed across all iterations.
    pub fn removed_count(&self) -> usize {
        self.history.iter().map(|r| r.report.indices().len()).sum()
    }
}

// =============================================================================
// The loop
// =============================================================================

/// Fit a model, iteratively excluding outliers until a fixed point.
///
/// # Errors
/// * `SingularDesign` / `DegenerateCovariance` - fatal, propagated from
///   the solver or detectors
/// * `InvalidDomain` - alpha outside (0, 1)
pub fn robust_fit(dataset: &Dataset, config: &RobustFitConfig) -> Result<RobustFit> {
    let mut current = dataset.clone();
    let mut history: Vec<RemovalRound> = Vec::new();
    let mut iteration = 0;

    loop {
        iteration += 1;
        let model = solvers::fit(&current)?;

        let pending = pending_removal(&current, &model, config)?;
        let report = match pending {
            None => {
                debug!(iteration, n = current.len(), "converged");
                return Ok(RobustFit {
                    model,
                    history,
                    iterations: iteration,
                    converged: true,
                    stop_reason: StopReason::Converged,
                    remaining_flags: Vec::new(),
                });
            }
            Some(report) => report,
        };

        let indices = report.indices();

        if current.len() - indices.len() < current.min_len() {
            warn!(
                iteration,
                n = current.len(),
                flagged = indices.len(),
                "removal would drop the dataset below p + 2; keeping the current model"
            );
            return Ok(RobustFit {
                model,
                history,
                iterations: iteration,
                converged: false,
                stop_reason: StopReason::MinimumSize,
                remaining_flags: report.flags,
            });
        }

        if iteration >= config.max_iterations {
            warn!(
                iteration,
                n = current.len(),
                flagged = indices.len(),
                "iteration cap reached with flags outstanding; keeping the current model"
            );
            return Ok(RobustFit {
                model,
                history,
                iterations: iteration,
                converged: false,
                stop_reason: StopReason::IterationLimit,
                remaining_flags: report.flags,
            });
        }

        debug!(
            iteration,
            n = current.len(),
            removed = indices.len(),
            "removing flagged observations and refitting"
        );
        current = current.exclude(&indices)?;
        history.push(RemovalRound { iteration, report });
    }
}

/// Decide what (if anything) to remove this iteration.
///
/// Detector flags take priority and are removed all at once; otherwise a
/// failing normality gate removes the single worst-fitting observation.
fn pending_removal(
    dataset: &Dataset,
    model: &FittedModel,
    config: &RobustFitConfig,
) -> Result<Option<OutlierReport>> {
    let mut report = OutlierReport::default();
    if config.mahalanobis {
        report.merge(detection::mahalanobis::flag(dataset, config.alpha)?);
    }
    if config.prediction_interval {
        report.merge(detection::intervals::flag(model, config.alpha)?);
    }
    if !report.is_empty() {
        return Ok(Some(report));
    }

    if config.normality_gate {
        let residuals = model.residuals().to_vec();
        if !residuals_normal(&residuals, config.alpha) {
            return Ok(Some(worst_residual_report(dataset, &residuals)));
        }
    }

    Ok(None)
}

/// Flag the observation with the largest absolute log-space residual.
/// Strictly-greater comparison: ties resolve to the lowest index.
fn worst_residual_report(dataset: &Dataset, residuals: &[f64]) -> OutlierReport {
    let mut worst = 0;
    for (i, e) in residuals.iter().enumerate() {
        if e.abs() > residuals[worst].abs() {
            worst = i;
        }
    }
    OutlierReport {
        flags: vec![OutlierFlag {
            index: worst,
            label: dataset.observations()[worst].label().to_string(),
            detector: Detector::Normality,
            statistic: residuals[worst].abs(),
        }],
    }
}

// =============================================================================
// Tests
// =============================================================================
