// =============================================================================
// Prediction-Interval Outlier Screen
// =============================================================================
//
// An observation is an interval-outlier when its ACTUAL log response falls
// outside the prediction band the model places around its own fitted
// value. The comparison happens in log space, before the bounds are
// back-transformed for reporting.
//
// The reported statistic is the standardized residual |e_i| / se_i, so a
// flag's magnitude is directly comparable to the critical t-value that
// produced it.
//
// =============================================================================

use crate::detection::{Detector, OutlierFlag, OutlierReport};
use crate::error::Result;
use crate::inference::{intervals, IntervalKind};
use crate::solvers::FittedModel;

/// Flag observations whose log response lies outside the model's
/// prediction interval at significance `alpha`.
pub fn flag(model: &FittedModel, alpha: f64) -> Result<OutlierReport> {
    let bands = intervals(model, alpha, IntervalKind::Prediction)?;
    let y = model.dataset().log_responses();

    let flags = model
        .dataset()
        .observations()
        .iter()
        .enumerate()
        .filter_map(|(i, obs)| {
            let outside = y[i] < bands.lower_log[i] || y[i] > bands.upper_log[i];
            outside.then(|| OutlierFlag {
                index: i,
                label: obs.label().to_string(),
                detector: Detector::PredictionInterval,
                statistic: (y[i] - model.fitted_log()[i]).abs() / bands.standard_errors[i],
            })
        })
        .collect();

    Ok(OutlierReport { flags })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Dataset, Record, DEFAULT_FLOOR};
    use crate::solvers;

    fn base_records() -> Vec<Record> {
        let x = [2.0, 4.0, 7.0, 12.0, 20.0, 35.0, 60.0, 100.0, 170.0, 300.0];
        let noise = [1.02, 0.97, 1.03, 0.99, 1.01, 0.96, 1.04, 0.98, 1.02, 0.99];
        x.iter()
            .zip(noise.iter())
            .enumerate()
            .map(|(i, (&x, &eps))| Record::new(format!("r{}", i), vec![x], 4.0 * x.powf(1.5) * eps))
            .collect()
    }

    #[test]
    fn test_well_behaved_data_unflagged() {
        let ds = Dataset::build(&base_records(), DEFAULT_FLOOR).unwrap();
        let model = solvers::fit(&ds).unwrap();
        let report = flag(&model, 0.05).unwrap();
        assert!(report.is_empty(), "unexpected flags: {:?}", report.flags);
    }

    #[test]
    fn test_gross_residual_flagged() {
        let mut records = base_records();
        // 50x the power-law value: a residual of ~1.7 in log10 space
        // against a noise level of ~0.02.
        records[4] = Record::new("bad", vec![20.0], 50.0 * 4.0 * 20f64.powf(1.5));
        let ds = Dataset::build(&records, DEFAULT_FLOOR).unwrap();
        let model = solvers::fit(&ds).unwrap();
        let report = flag(&model, 0.05).unwrap();

        assert!(report.indices().contains(&4), "flags: {:?}", report.flags);
        let bad = report.flags.iter().find(|f| f.index == 4).unwrap();
        assert_eq!(bad.detector, Detector::PredictionInterval);
        assert_eq!(bad.label, "bad");
        assert!(bad.statistic > 1.0);
    }
}
