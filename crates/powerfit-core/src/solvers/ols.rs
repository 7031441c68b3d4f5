// =============================================================================
// Ordinary Least Squares over the Log-Space Design Matrix
// =============================================================================
//
// Everything downstream hangs off the quantities computed here:
//
//   - coefficients beta = (X'X)^-1 X'y
//   - fitted values y_hat = X beta            (log scale)
//   - residuals e = y - y_hat                 (log scale)
//   - leverage h = diag(X (X'X)^-1 X')
//   - MSE = sum(e^2) / (n - p - 1)
//
// Leverage and MSE feed the interval estimator; residuals feed the
// normality gate; the coefficient vector feeds prediction.
//
// =============================================================================

use ndarray::{s, Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::convert::{solve_and_invert, to_dmatrix, to_dvector};
use crate::dataset::Dataset;
use crate::error::{PowerFitError, Result};

// =============================================================================
// Fitted model
// =============================================================================

/// The result of an OLS fit. Immutable: a refit produces a new value.
#[derive(Debug, Clone)]
pub struct FittedModel {
    coefficients: Array1<f64>,
    dataset: Dataset,
    fitted_log: Array1<f64>,
    residuals: Array1<f64>,
    leverage: Array1<f64>,
    mse: f64,
}

impl FittedModel {
    /// Coefficient vector [b0, b1, ..., bp] (intercept first).
    pub fn coefficients(&self) -> &Array1<f64> {
        &self.coefficients
    }

    pub fn intercept(&self) -> f64 {
        self.coefficients[0]
    }

    /// Slope coefficients b1..bp.
    pub fn slopes(&self) -> &[f64] {
        &self.coefficients.as_slice().unwrap()[1..]
    }

    /// The dataset this model was fit on.
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Fitted values on the log scale, one per observation.
    pub fn fitted_log(&self) -> &Array1<f64> {
        &self.fitted_log
    }

    /// Fitted values back-transformed to the original scale.
    pub fn fitted(&self) -> Array1<f64> {
        self.fitted_log.mapv(|z| 10f64.powf(z))
    }

    /// Log-scale residuals e = y - y_hat.
    pub fn residuals(&self) -> &Array1<f64> {
        &self.residuals
    }

    /// Hat values diag(X (X'X)^-1 X').
    pub fn leverage(&self) -> &Array1<f64> {
        &self.leverage
    }

    /// Mean squared error with df = n - p - 1.
    pub fn mse(&self) -> f64 {
        self.mse
    }

    pub fn n(&self) -> usize {
        self.dataset.len()
    }

    pub fn num_predictors(&self) -> usize {
        self.dataset.num_predictors()
    }

    /// Residual degrees of freedom n - p - 1 (>= 1 by dataset invariant).
    pub fn residual_df(&self) -> usize {
        self.n() - self.num_predictors() - 1
    }

    /// Predict the response for new predictor values on the original scale:
    /// y_hat = 10^b0 * x1^b1 * ... * xp^bp.
    ///
    /// Values <= 0 are floored the same way the training dataset was.
    pub fn predict(&self, predictors: &[f64]) -> Result<f64> {
        let p = self.num_predictors();
        if predictors.len() != p {
            return Err(PowerFitError::DimensionMismatch(format!(
                "expected {} predictor values, got {}",
                p,
                predictors.len()
            )));
        }
        let floor = self.dataset.floor();
        let mut log_y = self.intercept();
        for (&x, &b) in predictors.iter().zip(self.slopes()) {
            let x = if x <= 0.0 { floor } else { x };
            if !x.is_finite() || x <= 0.0 {
                return Err(PowerFitError::InvalidDomain(format!(
                    "predictor value {} is non-positive after flooring",
                    x
                )));
            }
            log_y += b * x.log10();
        }
        Ok(10f64.powf(log_y))
    }

    /// The equivalent power-law form y = a * x1^b1 * ... * xp^bp with
    /// a = 10^b0.
    pub fn power_law(&self) -> PowerLaw {
        PowerLaw {
            scale: 10f64.powf(self.intercept()),
            exponents: self.slopes().to_vec(),
        }
    }
}

/// Power-law reporting form of a fitted model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerLaw {
    /// Multiplicative scale a = 10^b0.
    pub scale: f64,
    /// Per-predictor exponents b1..bp.
    pub exponents: Vec<f64>,
}

impl std::fmt::Display for PowerLaw {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "y = {:.6}", self.scale)?;
        for (i, b) in self.exponents.iter().enumerate() {
            write!(f, " * x{}^{:.6}", i + 1, b)?;
        }
        Ok(())
    }
}

// =============================================================================
// Fitting
// =============================================================================

/// Fit the log-linear model by ordinary least squares.
///
/// # Errors
/// * `SingularDesign` - X'X is not invertible (collinear predictors in log
///   space, or n too close to p). Reported verbatim, never coerced.
pub fn fit(dataset: &Dataset) -> Result<FittedModel> {
    let n = dataset.len();
    let p = dataset.num_predictors();

    // Design matrix X = [1 | Z_X], shape (n, p + 1)
    let mut x = Array2::ones((n, p + 1));
    x.slice_mut(s![.., 1..]).assign(&dataset.log_predictor_matrix());
    let y = dataset.log_responses();

    let x_nalg = to_dmatrix(&x);
    let y_nalg = to_dvector(&y);

    // Normal equations: (X'X) beta = X'y
    let xtx = x_nalg.transpose() * &x_nalg;
    let xty = x_nalg.transpose() * y_nalg;

    let (coefficients, xtx_inv) = solve_and_invert(&xtx, &xty).ok_or_else(|| {
        PowerFitError::SingularDesign(format!(
            "X'X is not invertible for n={}, p={}; predictors are likely collinear in log space",
            n, p
        ))
    })?;

    let fitted_log = x.dot(&coefficients);
    let residuals = &y - &fitted_log;

    // Leverage: h_i = x_i' (X'X)^-1 x_i
    let mut leverage = Array1::zeros(n);
    for i in 0..n {
        let mut h = 0.0;
        for j in 0..p + 1 {
            for k in 0..p + 1 {
                h += x[[i, j]] * xtx_inv[[j, k]] * x[[i, k]];
            }
        }
        leverage[i] = h;
    }

    let df = (n - p - 1) as f64;
    let mse = residuals.mapv(|e| e * e).sum() / df;

    Ok(FittedModel {
        coefficients,
        dataset: dataset.clone(),
        fitted_log,
        residuals,
        leverage,
        mse,
    })
}

// =============================================================================
// Tests
// =============================================================================
