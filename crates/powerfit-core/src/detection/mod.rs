// =============================================================================
// Outlier Detection
// =============================================================================
//
// Two detectors produce candidate removals for the robust fitting loop:
//
//   - mahalanobis: multivariate distance from the joint (predictors,
//     response) log-space centroid, tested against an F threshold
//   - intervals:   actual log response outside the model's prediction band
//
// Both emit an OutlierReport: flagged indices tagged with the detector
// name and its test statistic, so the caller can audit exactly why each
// observation was removed.
//
// =============================================================================

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

pub mod intervals;
pub mod mahalanobis;

// =============================================================================
// Report types
// =============================================================================

/// Which detector produced a flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Detector {
    /// Joint log-space Mahalanobis distance test.
    Mahalanobis,
    /// Actual response outside the prediction interval.
    PredictionInterval,
    /// Largest-residual removal driven by the normality gate.
    Normality,
}

/// One flagged observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierFlag {
    /// Index into the dataset the detector ran against.
    pub index: usize,
    /// The observation's identifier, stable across refits.
    pub label: String,
    pub detector: Detector,
    /// The detector's test statistic for this observation.
    pub statistic: f64,
}

/// The set of observations flagged in one detector pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutlierReport {
    pub flags: Vec<OutlierFlag>,
}

impl OutlierReport {
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    /// Distinct flagged indices, sorted.
    pub fn indices(&self) -> BTreeSet<usize> {
        self.flags.iter().map(|f| f.index).collect()
    }

    /// Combine flags from another detector pass over the same dataset.
    pub fn merge(&mut self, other: OutlierReport) {
        self.flags.extend(other.flags);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_and_indices() {
        let mut a = OutlierReport {
            flags: vec![OutlierFlag {
                index: 3,
                label: "u3".to_string(),
                detector: Detector::Mahalanobis,
                statistic: 9.1,
            }],
        };
        let b = OutlierReport {
            flags: vec![
                OutlierFlag {
                    index: 3,
                    label: "u3".to_string(),
                    detector: Detector::PredictionInterval,
                    statistic: 2.4,
                },
                OutlierFlag {
                    index: 0,
                    label: "u0".to_string(),
                    detector: Detector::PredictionInterval,
                    statistic: 2.1,
                },
            ],
        };
        a.merge(b);
        assert_eq!(a.len(), 3);
        // Index 3 flagged by both detectors collapses to one removal
        let indices: Vec<usize> = a.indices().into_iter().collect();
        assert_eq!(indices, vec![0, 3]);
    }
}
