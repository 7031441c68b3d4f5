// =============================================================================
// PowerFit Core Library
// =============================================================================
//
// Robust power-law regression: fits y = 10^b0 * x1^b1 * ... * xp^bp by
// ordinary least squares in log10 space, while iteratively excluding
// anomalous observations.
//
// STRUCTURE:
// ----------
// The library is organized into modules, each handling a specific concern:
//
//   - dataset:     immutable log-space datasets (Observation, Dataset)
//   - solvers:     closed-form OLS fit over the log design matrix
//   - detection:   outlier detectors (Mahalanobis, prediction-interval)
//   - inference:   prediction/confidence interval estimation
//   - diagnostics: fit metrics (R^2, MMRE, PRED) and residual normality
//   - robust:      the iterative fit -> detect -> remove -> refit loop
//   - convert:     ndarray <-> nalgebra interop helpers
//   - split:       seeded train/test splitting for holdout evaluation
//   - error:       error types used throughout the library
//
// The core is pure and single-threaded: every function is deterministic
// given its dataset and alpha inputs. I/O (CSV loading, reporting,
// interactive prediction) belongs to callers.
//
// FOR MAINTAINERS:
// ----------------
// When adding new functionality:
//   1. Add it to the appropriate module (or create a new one)
//   2. Write tests in that module (see existing tests for examples)
//   3. Re-export public items here so users can access them easily
//
// =============================================================================

// Declare our modules - each is in its own file or folder
pub mod convert;
pub mod dataset;
pub mod detection;
pub mod diagnostics;
pub mod error;
pub mod inference;
pub mod robust;
pub mod solvers;
pub mod split;

// Re-export commonly used items at the top level for convenience
// Users can write `use powerfit_core::Dataset` instead of
// `use powerfit_core::dataset::Dataset`
pub use dataset::{Dataset, Observation, Record, DEFAULT_FLOOR};
pub use detection::{Detector, OutlierFlag, OutlierReport};
pub use diagnostics::{
    evaluate, evaluate_with_threshold, residuals_normal, score, shapiro_wilk, RegressionMetrics,
    ShapiroWilk, DEFAULT_PRED_THRESHOLD,
};
pub use error::{PowerFitError, Result};
pub use inference::{intervals, IntervalBands, IntervalKind};
pub use robust::{robust_fit, RemovalRound, RobustFit, RobustFitConfig, StopReason};
pub use solvers::{fit, FittedModel, PowerLaw};
pub use split::train_test_split;
