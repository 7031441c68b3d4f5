// =============================================================================
// Model Diagnostics
// =============================================================================
//
// Two concerns live here:
//
// - METRICS: R-squared, MMRE, PRED(tau), and residual statistics, all on
//   the ORIGINAL scale (10^log values). The target metrics are compared
//   against ground-truth magnitudes, so log-space goodness-of-fit numbers
//   would flatter the model.
//
// - NORMALITY: the Shapiro-Wilk residual test that gates convergence of
//   the robust fitting loop. A linear model whose residuals are not
//   normal is still mis-specified even when no detector flags anything.
//
// =============================================================================

mod metrics;
mod normality;

pub use metrics::{evaluate, evaluate_with_threshold, score, RegressionMetrics, DEFAULT_PRED_THRESHOLD};
pub use normality::{residuals_normal, shapiro_wilk, ShapiroWilk};
