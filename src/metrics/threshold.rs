//! Metrics that depend on the decision threshold.
//!
//! Every ratio falls back to 0 when its denominator is 0.

use serde::Serialize;

use crate::compute::sweep::ConfusionCounts;
use crate::error::{BctoolsError, Result};

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

pub fn precision(c: &ConfusionCounts) -> f64 {
    ratio(c.tp as f64, (c.tp + c.fp) as f64)
}

pub fn recall(c: &ConfusionCounts) -> f64 {
    ratio(c.tp as f64, (c.tp + c.fn_) as f64)
}

pub fn specificity(c: &ConfusionCounts) -> f64 {
    ratio(c.tn as f64, (c.tn + c.fp) as f64)
}

pub fn false_positive_rate(c: &ConfusionCounts) -> f64 {
    ratio(c.fp as f64, (c.fp + c.tn) as f64)
}

pub fn accuracy(c: &ConfusionCounts) -> f64 {
    ratio((c.tp + c.tn) as f64, c.total() as f64)
}

pub fn balanced_accuracy(c: &ConfusionCounts) -> f64 {
    (recall(c) + specificity(c)) / 2.0
}

/// Weighted harmonic mean of precision and recall.
pub fn fbeta(c: &ConfusionCounts, beta: f64) -> Result<f64> {
    if !beta.is_finite() || beta < 0.0 {
        return Err(BctoolsError::value(format!(
            "beta should be >= 0 in the F-beta score, got {beta}"
        )));
    }
    Ok(fbeta_unchecked(c, beta))
}

pub(crate) fn fbeta_unchecked(c: &ConfusionCounts, beta: f64) -> f64 {
    let p = precision(c);
    let r = recall(c);
    let b2 = beta * beta;
    ratio((1.0 + b2) * p * r, b2 * p + r)
}

pub fn f1(c: &ConfusionCounts) -> f64 {
    fbeta_unchecked(c, 1.0)
}

pub fn matthews_corrcoef(c: &ConfusionCounts) -> f64 {
    let (tp, tn, fp, fn_) = (c.tp as f64, c.tn as f64, c.fp as f64, c.fn_ as f64);
    let denominator = ((tp + fp) * (tp + fn_) * (tn + fp) * (tn + fn_)).sqrt();
    ratio(tp * tn - fp * fn_, denominator)
}

pub fn cohen_kappa(c: &ConfusionCounts) -> f64 {
    let n = c.total() as f64;
    if n == 0.0 {
        return 0.0;
    }
    let (tp, tn, fp, fn_) = (c.tp as f64, c.tn as f64, c.fp as f64, c.fn_ as f64);
    let observed = (tp + tn) / n;
    let chance = ((tp + fp) * (tp + fn_) + (fn_ + tn) * (fp + tn)) / (n * n);
    ratio(observed - chance, 1.0 - chance)
}

/// Youden's J statistic (TPR - FPR).
pub fn youden_j(c: &ConfusionCounts) -> f64 {
    recall(c) - false_positive_rate(c)
}

/// The fixed set of threshold-dependent metrics shown in the dashboard.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ThresholdMetrics {
    pub accuracy: f64,
    pub balanced_accuracy: f64,
    pub f1: f64,
    pub precision: f64,
    pub recall: f64,
    pub mcc: f64,
    pub cohen_kappa: f64,
}

impl ThresholdMetrics {
    pub const NAMES: [&'static str; 7] = [
        "Accuracy",
        "Balanced Acc.",
        "F1 score",
        "Precision",
        "Recall",
        "MCC",
        "Cohen's Kappa",
    ];

    pub fn from_counts(c: &ConfusionCounts) -> Self {
        Self {
            accuracy: accuracy(c),
            balanced_accuracy: balanced_accuracy(c),
            f1: f1(c),
            precision: precision(c),
            recall: recall(c),
            mcc: matthews_corrcoef(c),
            cohen_kappa: cohen_kappa(c),
        }
    }

    /// Values in the same order as [`ThresholdMetrics::NAMES`].
    pub fn values(&self) -> [f64; 7] {
        [
            self.accuracy,
            self.balanced_accuracy,
            self.f1,
            self.precision,
            self.recall,
            self.mcc,
            self.cohen_kappa,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(tn: usize, fp: usize, fn_: usize, tp: usize) -> ConfusionCounts {
        ConfusionCounts { tn, fp, fn_, tp }
    }

    #[test]
    fn scenario_metrics() {
        let m = ThresholdMetrics::from_counts(&counts(2, 0, 1, 1));
        assert_eq!(m.accuracy, 0.75);
        assert_eq!(m.precision, 1.0);
        assert_eq!(m.recall, 0.5);
        assert_eq!(m.balanced_accuracy, 0.75);
        assert!((m.f1 - 2.0 / 3.0).abs() < 1e-12);
        assert!((m.mcc - 1.0 / 3f64.sqrt()).abs() < 1e-12);
        assert!((m.cohen_kappa - 0.5).abs() < 1e-12);
    }

    #[test]
    fn no_predicted_positives_gives_zero_precision() {
        let c = counts(3, 0, 2, 0);
        assert_eq!(precision(&c), 0.0);
        assert_eq!(f1(&c), 0.0);
        assert_eq!(matthews_corrcoef(&c), 0.0);
    }

    #[test]
    fn single_class_kappa_is_zero() {
        let c = counts(4, 0, 0, 0);
        assert_eq!(cohen_kappa(&c), 0.0);
        assert_eq!(matthews_corrcoef(&c), 0.0);
        assert_eq!(ThresholdMetrics::from_counts(&ConfusionCounts::default()).accuracy, 0.0);
    }

    #[test]
    fn fbeta_with_beta_one_is_f1() {
        for c in [counts(2, 0, 1, 1), counts(5, 3, 2, 7), counts(0, 4, 0, 4)] {
            let p = precision(&c);
            let r = recall(&c);
            let expected = if p + r == 0.0 { 0.0 } else { 2.0 * p * r / (p + r) };
            assert!((fbeta(&c, 1.0).unwrap() - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn fbeta_limits() {
        let c = counts(5, 3, 2, 7);
        assert!((fbeta(&c, 0.0).unwrap() - precision(&c)).abs() < 1e-12);
        assert!(fbeta(&c, 2.0).unwrap() > fbeta(&c, 0.5).unwrap());
        assert!(matches!(fbeta(&c, -1.0), Err(BctoolsError::Value(_))));
    }

    #[test]
    fn youden_of_perfect_split_is_one() {
        assert_eq!(youden_j(&counts(3, 0, 0, 2)), 1.0);
        assert_eq!(youden_j(&counts(0, 3, 0, 2)), 0.0);
    }
}
