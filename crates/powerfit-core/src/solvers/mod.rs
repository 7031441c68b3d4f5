// =============================================================================
// Solvers
// =============================================================================
//
// The model is linear after the log10 transform:
//
//     log10(y) = b0 + b1*log10(x1) + ... + bp*log10(xp)
//
// which is equivalent to the power law
//
//     y = 10^b0 * x1^b1 * ... * xp^bp
//
// Because the transformed problem is plain linear regression, the fit is
// closed-form: build the design matrix X by prepending an intercept column
// of ones to the log predictors and solve the normal equations
//
//     (X'X) beta = X'y
//
// There is no iteration and no link function - the only failure mode is a
// singular X'X, which is reported as an error, never coerced.
//
// =============================================================================

mod ols;

pub use ols::{fit, FittedModel, PowerLaw};
