//! Threshold-invariant curves and summary metrics.
//!
//! Curves are computed over the distinct predicted probabilities, scanning
//! from the highest score down and accumulating true/false positives.

use serde::Serialize;

use crate::compute::sweep::ConfusionCounts;
use crate::data::sample::Dataset;
use crate::error::{BctoolsError, Result};

/// Cumulative counts when every sample scoring `>= threshold` is positive.
#[derive(Clone, Copy, Debug, PartialEq)]
struct CurvePoint {
    threshold: f64,
    tp: usize,
    fp: usize,
}

/// Distinct thresholds in descending order with cumulative TP/FP counts.
fn binary_clf_curve(true_y: &[u8], predicted_proba: &[f64]) -> Vec<CurvePoint> {
    let mut indices: Vec<usize> = (0..true_y.len()).collect();
    indices.sort_by(|&a, &b| {
        predicted_proba[b]
            .partial_cmp(&predicted_proba[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut points = Vec::new();
    let (mut tp, mut fp) = (0usize, 0usize);
    let mut i = 0;
    while i < indices.len() {
        let score = predicted_proba[indices[i]];
        while i < indices.len() && predicted_proba[indices[i]] == score {
            if true_y[indices[i]] == 1 {
                tp += 1;
            } else {
                fp += 1;
            }
            i += 1;
        }
        points.push(CurvePoint { threshold: score, tp, fp });
    }
    points
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RocCurve {
    pub fpr: Vec<f64>,
    pub tpr: Vec<f64>,
    /// Descending; the first entry is `+inf` (nothing predicted positive).
    pub thresholds: Vec<f64>,
}

impl RocCurve {
    pub fn auc(&self) -> f64 {
        auc(&self.fpr, &self.tpr)
    }
}

pub fn roc_curve(dataset: &Dataset) -> Result<RocCurve> {
    let (positives, negatives) = (dataset.positives(), dataset.negatives());
    if positives == 0 || negatives == 0 {
        return Err(BctoolsError::value(
            "ROC curve is undefined when only one class is present in true_y",
        ));
    }
    let points = binary_clf_curve(dataset.true_y(), dataset.predicted_proba());
    let mut curve = RocCurve {
        fpr: Vec::with_capacity(points.len() + 1),
        tpr: Vec::with_capacity(points.len() + 1),
        thresholds: Vec::with_capacity(points.len() + 1),
    };
    curve.fpr.push(0.0);
    curve.tpr.push(0.0);
    curve.thresholds.push(f64::INFINITY);
    for p in points {
        curve.fpr.push(p.fp as f64 / negatives as f64);
        curve.tpr.push(p.tp as f64 / positives as f64);
        curve.thresholds.push(p.threshold);
    }
    Ok(curve)
}

/// Precision-recall curve ordered by ascending threshold. `precision` and
/// `recall` carry one extra trailing point (precision 1, recall 0) that has no
/// threshold.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PrecisionRecallCurve {
    pub precision: Vec<f64>,
    pub recall: Vec<f64>,
    pub thresholds: Vec<f64>,
    /// Confusion counts at each entry of `thresholds`.
    pub counts: Vec<ConfusionCounts>,
}

impl PrecisionRecallCurve {
    pub fn auc(&self) -> f64 {
        auc(&self.recall, &self.precision)
    }
}

pub fn precision_recall_curve(dataset: &Dataset) -> Result<PrecisionRecallCurve> {
    let (positives, negatives) = (dataset.positives(), dataset.negatives());
    if positives == 0 {
        return Err(BctoolsError::value(
            "precision-recall curve is undefined without positive samples",
        ));
    }
    let points = binary_clf_curve(dataset.true_y(), dataset.predicted_proba());
    let mut curve = PrecisionRecallCurve {
        precision: Vec::with_capacity(points.len() + 1),
        recall: Vec::with_capacity(points.len() + 1),
        thresholds: Vec::with_capacity(points.len()),
        counts: Vec::with_capacity(points.len()),
    };
    for p in points.iter().rev() {
        curve.precision.push(p.tp as f64 / (p.tp + p.fp) as f64);
        curve.recall.push(p.tp as f64 / positives as f64);
        curve.thresholds.push(p.threshold);
        curve.counts.push(ConfusionCounts {
            tn: negatives - p.fp,
            fp: p.fp,
            fn_: positives - p.tp,
            tp: p.tp,
        });
    }
    curve.precision.push(1.0);
    curve.recall.push(0.0);
    Ok(curve)
}

/// Trapezoidal area under a curve whose `x` is monotonic in either direction.
pub fn auc(x: &[f64], y: &[f64]) -> f64 {
    x.windows(2)
        .zip(y.windows(2))
        .map(|(xs, ys)| (xs[1] - xs[0]).abs() * (ys[0] + ys[1]) / 2.0)
        .sum()
}

/// Mean squared difference between probability and true label.
pub fn brier_score(dataset: &Dataset) -> f64 {
    let sum: f64 = dataset
        .true_y()
        .iter()
        .zip(dataset.predicted_proba())
        .map(|(&y, &p)| (p - y as f64).powi(2))
        .sum();
    sum / dataset.len() as f64
}

/// Metrics computed once per dataset, independent of any threshold.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct InvariantMetrics {
    pub roc_auc: f64,
    pub pr_auc: f64,
    pub brier_score: f64,
}

impl InvariantMetrics {
    pub const NAMES: [&'static str; 3] = ["ROC AUC", "PR AUC", "Brier score"];

    pub fn compute(dataset: &Dataset) -> Result<Self> {
        Ok(Self {
            roc_auc: roc_curve(dataset)?.auc(),
            pr_auc: precision_recall_curve(dataset)?.auc(),
            brier_score: brier_score(dataset),
        })
    }

    pub fn values(&self) -> [f64; 3] {
        [self.roc_auc, self.pr_auc, self.brier_score]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> Dataset {
        Dataset::new(vec![0, 0, 1, 1], vec![0.1, 0.4, 0.35, 0.8]).unwrap()
    }

    #[test]
    fn roc_auc_of_scenario() {
        let roc = roc_curve(&scenario()).unwrap();
        assert_eq!(roc.thresholds[0], f64::INFINITY);
        assert_eq!(roc.fpr.first(), Some(&0.0));
        assert_eq!(roc.tpr.last(), Some(&1.0));
        assert!((roc.auc() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn perfect_ranking_has_unit_auc() {
        let data = Dataset::new(vec![0, 0, 1, 1], vec![0.1, 0.2, 0.8, 0.9]).unwrap();
        assert!((roc_curve(&data).unwrap().auc() - 1.0).abs() < 1e-12);
        assert!((precision_recall_curve(&data).unwrap().auc() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn pr_curve_shape() {
        let pr = precision_recall_curve(&scenario()).unwrap();
        assert_eq!(pr.thresholds, vec![0.1, 0.35, 0.4, 0.8]);
        assert_eq!(pr.precision.len(), pr.thresholds.len() + 1);
        assert_eq!(pr.precision, vec![0.5, 2.0 / 3.0, 0.5, 1.0, 1.0]);
        assert_eq!(pr.recall, vec![1.0, 1.0, 0.5, 0.5, 0.0]);
        assert_eq!(pr.counts[3], ConfusionCounts { tn: 2, fp: 0, fn_: 1, tp: 1 });
    }

    #[test]
    fn tied_scores_collapse_into_one_point() {
        let data = Dataset::new(vec![0, 1, 1], vec![0.5, 0.5, 0.9]).unwrap();
        let pr = precision_recall_curve(&data).unwrap();
        assert_eq!(pr.thresholds, vec![0.5, 0.9]);
    }

    #[test]
    fn single_class_is_rejected() {
        let data = Dataset::new(vec![1, 1], vec![0.2, 0.7]).unwrap();
        assert!(roc_curve(&data).is_err());
        assert!(InvariantMetrics::compute(&data).is_err());
    }

    #[test]
    fn brier_of_scenario() {
        let expected = (0.01 + 0.16 + 0.4225 + 0.04) / 4.0;
        assert!((brier_score(&scenario()) - expected).abs() < 1e-12);
    }

    #[test]
    fn auc_handles_decreasing_x() {
        assert!((auc(&[1.0, 0.5, 0.0], &[0.5, 1.0, 1.0]) - 0.875).abs() < 1e-12);
        assert_eq!(auc(&[0.3], &[1.0]), 0.0);
    }
}
