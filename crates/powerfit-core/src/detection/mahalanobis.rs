// =============================================================================
// Mahalanobis Outlier Detection
// =============================================================================
//
// Works on the JOINT log-space matrix Z = [Z_X | z_y] (n rows, k = p + 1
// columns): an observation can be anomalous in its response, its
// predictors, or their relationship, and only the joint covariance sees
// all three.
//
// For each observation,
//
//     d2_i = (z_i - z_bar)' S^-1 (z_i - z_bar)
//
// with S the sample covariance (n - 1 denominator). The raw d2 would be
// compared against a chi-square quantile asymptotically; for the small n
// this engine sees (often only tens of rows), the finite-sample corrected
// statistic
//
//     T_i = ((n - k - 1) * n / ((n^2 - 1) * k)) * d2_i
//
// is used instead and tested against F(1 - alpha; k, n - k), which is
// strictly more conservative.
//
// A non-invertible S means the analyzed variables are (near-)exactly
// collinear; that is reported as DegenerateCovariance, never as a set of
// meaningless distances.
//
// =============================================================================

use ndarray::{Array1, Array2, Axis};
use statrs::distribution::{ContinuousCDF, FisherSnedecor};

use crate::convert::{invert_symmetric, to_dmatrix};
use crate::dataset::Dataset;
use crate::detection::{Detector, OutlierFlag, OutlierReport};
use crate::error::{PowerFitError, Result};

/// Flag multivariate outliers in the joint log-space of a dataset.
///
/// # Errors
/// * `DegenerateCovariance` - the joint covariance matrix is singular
/// * `InvalidDomain` - alpha outside (0, 1), or n <= k so the F test has
///   no degrees of freedom
pub fn flag(dataset: &Dataset, alpha: f64) -> Result<OutlierReport> {
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(PowerFitError::InvalidDomain(format!(
            "alpha must be in (0, 1), got {}",
            alpha
        )));
    }

    let z = dataset.joint_log_matrix();
    let n = z.nrows();
    let k = z.ncols(); // p + 1 jointly analyzed dimensions

    if n <= k {
        return Err(PowerFitError::InvalidDomain(format!(
            "need more than {} observations for a {}-dimensional Mahalanobis test, got {}",
            k, k, n
        )));
    }

    let d2 = squared_distances(&z)?;

    // Finite-sample correction and F threshold
    let nf = n as f64;
    let kf = k as f64;
    let correction = ((nf - kf - 1.0) * nf) / ((nf * nf - 1.0) * kf);
    let f_dist = FisherSnedecor::new(kf, nf - kf).map_err(|e| {
        PowerFitError::InvalidDomain(format!("F({}, {}) distribution: {}", kf, nf - kf, e))
    })?;
    let threshold = f_dist.inverse_cdf(1.0 - alpha);

    let flags = d2
        .iter()
        .enumerate()
        .filter_map(|(i, &d2_i)| {
            let statistic = correction * d2_i;
            (statistic > threshold).then(|| OutlierFlag {
                index: i,
                label: dataset.observations()[i].label().to_string(),
                detector: Detector::Mahalanobis,
                statistic,
            })
        })
        .collect();

    Ok(OutlierReport { flags })
}

/// Squared Mahalanobis distance of each row of `z` from the column means,
/// using the sample covariance.
pub fn squared_distances(z: &Array2<f64>) -> Result<Array1<f64>> {
    let n = z.nrows();
    let k = z.ncols();

    let mean = z
        .mean_axis(Axis(0))
        .expect("non-empty by dataset invariant");
    let centered = z - &mean;

    // Sample covariance S = C'C / (n - 1)
    let c = to_dmatrix(&centered);
    let cov = (c.transpose() * &c) / (n as f64 - 1.0);

    let cov_inv = invert_symmetric(&cov).ok_or_else(|| {
        PowerFitError::DegenerateCovariance(format!(
            "joint covariance matrix ({}x{}) is singular; the analyzed variables are collinear",
            k, k
        ))
    })?;

    let mut d2 = Array1::zeros(n);
    for i in 0..n {
        let mut acc = 0.0;
        for a in 0..k {
            for b in 0..k {
                acc += centered[[i, a]] * cov_inv[[a, b]] * centered[[i, b]];
            }
        }
        d2[i] = acc;
    }
    Ok(d2)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Record, DEFAULT_FLOOR};

    /// Well-spread two-predictor data with mild noise; no outliers.
    ///
    /// 20 rows: the finite-sample corrected statistic is bounded by
    /// correction * (n-1)^2/n, so very small datasets cannot exceed the
    /// F threshold at all and would make these tests vacuous.
    fn clean_records() -> Vec<Record> {
        let x1: [f64; 20] = [
            2.0, 4.0, 9.0, 15.0, 30.0, 55.0, 110.0, 240.0, 500.0, 950.0, 3.0, 7.0, 22.0, 48.0,
            85.0, 170.0, 340.0, 620.0, 13.0, 780.0,
        ];
        let x2: [f64; 20] = [
            7.0, 90.0, 20.0, 400.0, 45.0, 700.0, 150.0, 12.0, 320.0, 80.0, 250.0, 35.0, 600.0,
            15.0, 480.0, 65.0, 900.0, 28.0, 130.0, 210.0,
        ];
        let noise = [
            1.04, 0.95, 1.07, 0.92, 1.01, 1.09, 0.94, 1.02, 0.97, 1.05, 0.98, 1.03, 0.91, 1.06,
            0.99, 1.08, 0.93, 1.01, 0.96, 1.04,
        ];
        x1.iter()
            .zip(x2.iter())
            .zip(noise.iter())
            .enumerate()
            .map(|(i, ((&a, &b), &eps))| {
                let y = 2.0 * a.powf(0.6) * b.powf(0.9) * eps;
                Record::new(format!("r{}", i), vec![a, b], y)
            })
            .collect()
    }

    #[test]
    fn test_clean_data_unflagged() {
        let ds = Dataset::build(&clean_records(), DEFAULT_FLOOR).unwrap();
        let report = flag(&ds, 0.05).unwrap();
        assert!(report.is_empty(), "unexpected flags: {:?}", report.flags);
    }

    #[test]
    fn test_displaced_point_flagged() {
        let mut records = clean_records();
        // A point whose response is ~6 orders of magnitude off the
        // power-law surface: far beyond 10 sigma in joint log space.
        records.push(Record::new("planted", vec![50.0, 60.0], 1.0e9));
        let planted = records.len() - 1;
        let ds = Dataset::build(&records, DEFAULT_FLOOR).unwrap();
        let report = flag(&ds, 0.05).unwrap();

        let flagged: Vec<usize> = report.indices().into_iter().collect();
        assert!(flagged.contains(&planted), "flags: {:?}", report.flags);
        for f in &report.flags {
            assert_eq!(f.detector, Detector::Mahalanobis);
            assert!(f.statistic.is_finite());
        }
    }

    #[test]
    fn test_collinear_columns_degenerate() {
        // Response is an exact power of x1, with x2 constant = 1 giving it
        // zero variance in log space: the joint covariance is singular.
        let records: Vec<Record> = [10.0, 20.0, 40.0, 80.0, 160.0]
            .iter()
            .enumerate()
            .map(|(i, &x)| Record::new(format!("r{}", i), vec![x, 1.0], 5.0 * x))
            .collect();
        let ds = Dataset::build(&records, DEFAULT_FLOOR).unwrap();
        let err = flag(&ds, 0.05).unwrap_err();
        assert!(matches!(err, PowerFitError::DegenerateCovariance(_)));
    }

    #[test]
    fn test_bad_alpha_rejected() {
        let ds = Dataset::build(&clean_records(), DEFAULT_FLOOR).unwrap();
        assert!(flag(&ds, 0.0).is_err());
        assert!(flag(&ds, 1.0).is_err());
    }
}
