// =============================================================================
// Log-Space Dataset
// =============================================================================
//
// The model is a power law: y = 10^b0 * x1^b1 * ... * xp^bp. Taking log10 of
// every variable turns it into a linear model, so each observation stores
// both its raw values and their log10 transforms, computed once at
// construction and never mutated.
//
// Raw values must be strictly positive before the transform. Values <= 0
// are substituted with a caller-chosen floor (commonly 1, whose log is 0)
// BEFORE taking log10; the transformed value itself is never floored.
//
// Datasets are immutable: removing observations produces a new Dataset via
// `exclude`, which re-checks the minimum-size invariant n >= p + 2.
//
// =============================================================================

use std::collections::BTreeSet;

use ndarray::{Array1, Array2};

use crate::error::{PowerFitError, Result};

/// Default substitution value for raw entries <= 0 (log10(1) = 0).
pub const DEFAULT_FLOOR: f64 = 1.0;

// =============================================================================
// Construction input
// =============================================================================

/// One raw input row: an opaque identifier, p positive predictor values,
/// and one positive response value.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub label: String,
    pub predictors: Vec<f64>,
    pub response: f64,
}

impl Record {
    pub fn new(label: impl Into<String>, predictors: Vec<f64>, response: f64) -> Self {
        Self {
            label: label.into(),
            predictors,
            response,
        }
    }
}

// =============================================================================
// Observation
// =============================================================================

/// A single observation with its log10 transforms.
///
/// The stored raw values are the post-floor values, so the log fields are
/// always exactly log10 of the raw fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    label: String,
    predictors: Vec<f64>,
    response: f64,
    log_predictors: Vec<f64>,
    log_response: f64,
}

impl Observation {
    fn from_record(record: &Record, floor: f64) -> Result<Self> {
        let predictors: Vec<f64> = record
            .predictors
            .iter()
            .map(|&x| apply_floor(x, floor))
            .collect();
        let response = apply_floor(record.response, floor);

        // Defensive: if the floor itself is <= 0 or an input was NaN, the
        // transform below would produce garbage. Reject now.
        for &x in predictors.iter().chain(std::iter::once(&response)) {
            if !x.is_finite() || x <= 0.0 {
                return Err(PowerFitError::InvalidDomain(format!(
                    "observation '{}' has non-positive value {} after flooring",
                    record.label, x
                )));
            }
        }

        let log_predictors: Vec<f64> = predictors.iter().map(|&x| x.log10()).collect();
        let log_response = response.log10();

        Ok(Self {
            label: record.label.clone(),
            predictors,
            response,
            log_predictors,
            log_response,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Raw predictor values (post-floor).
    pub fn predictors(&self) -> &[f64] {
        &self.predictors
    }

    /// Raw response value (post-floor).
    pub fn response(&self) -> f64 {
        self.response
    }

    /// log10 of each predictor.
    pub fn log_predictors(&self) -> &[f64] {
        &self.log_predictors
    }

    /// log10 of the response.
    pub fn log_response(&self) -> f64 {
        self.log_response
    }
}

fn apply_floor(x: f64, floor: f64) -> f64 {
    if x <= 0.0 {
        floor
    } else {
        x
    }
}

// =============================================================================
// Dataset
// =============================================================================

/// An ordered, immutable collection of observations.
///
/// Invariant: n >= p + 2, leaving at least one residual degree of freedom
/// after fitting an intercept plus p slopes.
#[derive(Debug, Clone)]
pub struct Dataset {
    observations: Vec<Observation>,
    num_predictors: usize,
    floor: f64,
}

impl Dataset {
    /// Build a dataset from raw records, substituting `floor` for any raw
    /// value <= 0 before the log10 transform.
    ///
    /// # Errors
    /// * `DimensionMismatch` - records disagree on predictor count
    /// * `InvalidDomain` - a value is still <= 0 after flooring, or fewer
    ///   than p + 2 rows were supplied
    pub fn build(records: &[Record], floor: f64) -> Result<Self> {
        let num_predictors = match records.first() {
            Some(r) => r.predictors.len(),
            None => {
                return Err(PowerFitError::InvalidDomain(
                    "no records supplied".to_string(),
                ))
            }
        };
        if num_predictors == 0 {
            return Err(PowerFitError::InvalidDomain(
                "records have no predictor values".to_string(),
            ));
        }

        for record in records {
            if record.predictors.len() != num_predictors {
                return Err(PowerFitError::DimensionMismatch(format!(
                    "record '{}' has {} predictors but the first record has {}",
                    record.label,
                    record.predictors.len(),
                    num_predictors
                )));
            }
        }

        let observations: Vec<Observation> = records
            .iter()
            .map(|r| Observation::from_record(r, floor))
            .collect::<Result<_>>()?;

        Self::from_observations(observations, num_predictors, floor)
    }

    fn from_observations(
        observations: Vec<Observation>,
        num_predictors: usize,
        floor: f64,
    ) -> Result<Self> {
        let min_len = num_predictors + 2;
        if observations.len() < min_len {
            return Err(PowerFitError::InvalidDomain(format!(
                "{} observations but at least {} are required for {} predictors",
                observations.len(),
                min_len,
                num_predictors
            )));
        }
        Ok(Self {
            observations,
            num_predictors,
            floor,
        })
    }

    /// The floor value used when this dataset was built.
    pub fn floor(&self) -> f64 {
        self.floor
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Number of predictor variables p.
    pub fn num_predictors(&self) -> usize {
        self.num_predictors
    }

    /// Smallest admissible dataset size: p + 2.
    pub fn min_len(&self) -> usize {
        self.num_predictors + 2
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Log-space predictor matrix Z_X, shape (n, p).
    pub fn log_predictor_matrix(&self) -> Array2<f64> {
        let n = self.len();
        let p = self.num_predictors;
        let mut z = Array2::zeros((n, p));
        for (i, obs) in self.observations.iter().enumerate() {
            for (j, &v) in obs.log_predictors.iter().enumerate() {
                z[[i, j]] = v;
            }
        }
        z
    }

    /// Log-space response vector, length n.
    pub fn log_responses(&self) -> Array1<f64> {
        self.observations.iter().map(|o| o.log_response).collect()
    }

    /// Raw (post-floor) response vector, length n.
    pub fn responses(&self) -> Array1<f64> {
        self.observations.iter().map(|o| o.response).collect()
    }

    /// Joint log-space matrix [Z_X | z_y], shape (n, p + 1).
    ///
    /// This is the matrix the Mahalanobis detector analyzes: predictors
    /// and response together, so that multivariate anomalies in either
    /// direction are visible.
    pub fn joint_log_matrix(&self) -> Array2<f64> {
        let n = self.len();
        let k = self.num_predictors + 1;
        let mut z = Array2::zeros((n, k));
        for (i, obs) in self.observations.iter().enumerate() {
            for (j, &v) in obs.log_predictors.iter().enumerate() {
                z[[i, j]] = v;
            }
            z[[i, k - 1]] = obs.log_response;
        }
        z
    }

    /// Produce a new dataset containing exactly the given indices, in the
    /// order supplied.
    ///
    /// # Errors
    /// * `DimensionMismatch` - an index is out of range
    /// * `InvalidDomain` - fewer than p + 2 indices were supplied
    pub fn subset(&self, indices: &[usize]) -> Result<Dataset> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.len()) {
            return Err(PowerFitError::DimensionMismatch(format!(
                "index {} out of range for a dataset of {} observations",
                bad,
                self.len()
            )));
        }
        let observations: Vec<Observation> = indices
            .iter()
            .map(|&i| self.observations[i].clone())
            .collect();
        Self::from_observations(observations, self.num_predictors, self.floor)
    }

    /// Produce a new dataset with the given observation indices removed.
    ///
    /// # Errors
    /// * `DimensionMismatch` - an index is out of range
    /// * `InvalidDomain` - the remaining dataset would fall below p + 2
    pub fn exclude(&self, indices: &BTreeSet<usize>) -> Result<Dataset> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.len()) {
            return Err(PowerFitError::DimensionMismatch(format!(
                "cannot remove index {} from a dataset of {} observations",
                bad,
                self.len()
            )));
        }
        let observations: Vec<Observation> = self
            .observations
            .iter()
            .enumerate()
            .filter(|(i, _)| !indices.contains(i))
            .map(|(_, o)| o.clone())
            .collect();
        Self::from_observations(observations, self.num_predictors, self.floor)
    }
}

// =============================================================================
// Tests
// =============================================================================
