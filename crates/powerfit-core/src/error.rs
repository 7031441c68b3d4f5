// =============================================================================
// Error Types
// =============================================================================
//
// All failure modes of the engine live here. The taxonomy is deliberately
// small:
//
//   - InvalidDomain:        bad input data, caught before any fitting
//   - DimensionMismatch:    ragged or length-mismatched inputs
//   - SingularDesign:       X'X is not invertible (collinear predictors)
//   - DegenerateCovariance: joint covariance matrix is not invertible
//
// Matrix-singularity errors are surfaced verbatim and never retried with
// perturbation: they indicate the data cannot support the model, and the
// caller needs to see that.
//
// Non-convergence of the robust fitting loop is NOT an error - the caller
// still receives the best model obtained so far. See `robust::RobustFit`.
//
// =============================================================================

/// Errors that can occur while building datasets or fitting models.
#[derive(Debug, thiserror::Error)]
pub enum PowerFitError {
    /// Input data violates the positive-value domain or the minimum-size
    /// invariant (n >= p + 2).
    #[error("invalid domain: {0}")]
    InvalidDomain(String),

    /// Input vectors or matrices have inconsistent lengths.
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// The design matrix X'X could not be inverted. This usually means the
    /// predictors are collinear (in log space) or n is too close to p.
    #[error("singular design matrix: {0}")]
    SingularDesign(String),

    /// The joint covariance matrix could not be inverted. This usually
    /// means near-perfect collinearity among the analyzed variables.
    #[error("degenerate covariance matrix: {0}")]
    DegenerateCovariance(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PowerFitError>;

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = PowerFitError::SingularDesign("x1 and x2 are collinear".to_string());
        assert!(e.to_string().contains("singular design"));

        let e = PowerFitError::InvalidDomain("n=3 but p+2=4".to_string());
        assert!(e.to_string().contains("invalid domain"));
    }
}
