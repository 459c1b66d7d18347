//! Threshold sweep: confusion counts, amounts and costs for every grid point.
//!
//! Samples are sorted by probability once; a cursor then walks the ascending
//! thresholds, so every snapshot is read from prefix/suffix sums instead of a
//! pass over the data.

use ordered_float::OrderedFloat;
use serde::Serialize;
use tracing::debug;

use crate::compute::grid::ThresholdGrid;
use crate::data::sample::{ConfusionClass, Dataset, ResolvedCosts};
use crate::error::{BctoolsError, Result};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ConfusionCounts {
    pub tn: usize,
    pub fp: usize,
    pub fn_: usize,
    pub tp: usize,
}

impl ConfusionCounts {
    pub fn total(&self) -> usize {
        self.tn + self.fp + self.fn_ + self.tp
    }

    pub fn get(&self, class: ConfusionClass) -> usize {
        match class {
            ConfusionClass::TrueNegative => self.tn,
            ConfusionClass::FalsePositive => self.fp,
            ConfusionClass::FalseNegative => self.fn_,
            ConfusionClass::TruePositive => self.tp,
        }
    }

    pub fn predicted_positive(&self) -> usize {
        self.fp + self.tp
    }

    /// Counts for a single threshold by a direct pass over the samples.
    pub fn at_threshold(true_y: &[u8], predicted_proba: &[f64], threshold: f64) -> Self {
        let mut counts = Self::default();
        for (&y, &p) in true_y.iter().zip(predicted_proba) {
            match ConfusionClass::of(y, p >= threshold) {
                ConfusionClass::TrueNegative => counts.tn += 1,
                ConfusionClass::FalsePositive => counts.fp += 1,
                ConfusionClass::FalseNegative => counts.fn_ += 1,
                ConfusionClass::TruePositive => counts.tp += 1,
            }
        }
        counts
    }
}

/// Per-class sums of a sample-level quantity (amounts or costs).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct ClassTotals {
    pub tn: f64,
    pub fp: f64,
    pub fn_: f64,
    pub tp: f64,
}

impl ClassTotals {
    pub fn total(&self) -> f64 {
        self.tn + self.fp + self.fn_ + self.tp
    }

    pub fn get(&self, class: ConfusionClass) -> f64 {
        match class {
            ConfusionClass::TrueNegative => self.tn,
            ConfusionClass::FalsePositive => self.fp,
            ConfusionClass::FalseNegative => self.fn_,
            ConfusionClass::TruePositive => self.tp,
        }
    }

    pub fn sum_of(&self, classes: &[ConfusionClass]) -> f64 {
        classes.iter().map(|&c| self.get(c)).sum()
    }
}

/// Which sample-level quantities are aggregated besides the counts.
#[derive(Clone, Copy, Debug)]
pub enum AggregationMode<'a> {
    Counts,
    AmountOnly(&'a [f64]),
    CostOnly(&'a ResolvedCosts),
    Both {
        amounts: &'a [f64],
        costs: &'a ResolvedCosts,
    },
}

impl<'a> AggregationMode<'a> {
    pub fn from_inputs(amounts: Option<&'a [f64]>, costs: Option<&'a ResolvedCosts>) -> Self {
        match (amounts, costs) {
            (None, None) => AggregationMode::Counts,
            (Some(amounts), None) => AggregationMode::AmountOnly(amounts),
            (None, Some(costs)) => AggregationMode::CostOnly(costs),
            (Some(amounts), Some(costs)) => AggregationMode::Both { amounts, costs },
        }
    }

    pub fn has_amounts(&self) -> bool {
        matches!(self, AggregationMode::AmountOnly(_) | AggregationMode::Both { .. })
    }

    pub fn has_costs(&self) -> bool {
        matches!(self, AggregationMode::CostOnly(_) | AggregationMode::Both { .. })
    }

    fn check_len(&self, n: usize) -> Result<()> {
        let amounts_len = match self {
            AggregationMode::AmountOnly(a) | AggregationMode::Both { amounts: a, .. } => Some(a.len()),
            _ => None,
        };
        let costs_len = match self {
            AggregationMode::CostOnly(c) | AggregationMode::Both { costs: c, .. } => Some(c.len()),
            _ => None,
        };
        if let Some(len) = amounts_len.filter(|&len| len != n) {
            return Err(BctoolsError::shape("amounts", n, len));
        }
        if let Some(len) = costs_len.filter(|&len| len != n) {
            return Err(BctoolsError::shape("costs", n, len));
        }
        Ok(())
    }
}

/// Everything known about one threshold. Counts always sum to the sample
/// count; amount and cost sums are present according to the aggregation mode.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConfusionSnapshot {
    pub threshold: f64,
    pub counts: ConfusionCounts,
    pub amounts: Option<ClassTotals>,
    pub costs: Option<ClassTotals>,
}

impl ConfusionSnapshot {
    pub fn total_cost(&self) -> Option<f64> {
        self.costs.map(|c| c.total())
    }
}

/// Prefix sums over samples predicted negative and suffix sums over samples
/// predicted positive, both in ascending-probability order and split by label.
struct SideSums {
    neg0: Vec<f64>,
    neg1: Vec<f64>,
    pos0: Vec<f64>,
    pos1: Vec<f64>,
}

impl SideSums {
    fn build(order: &[usize], true_y: &[u8], value: impl Fn(ConfusionClass, usize) -> f64) -> Self {
        let n = order.len();
        let mut sums = Self {
            neg0: vec![0.0; n + 1],
            neg1: vec![0.0; n + 1],
            pos0: vec![0.0; n + 1],
            pos1: vec![0.0; n + 1],
        };
        for (k, &i) in order.iter().enumerate() {
            let (d0, d1) = match ConfusionClass::of(true_y[i], false) {
                ConfusionClass::TrueNegative => (value(ConfusionClass::TrueNegative, i), 0.0),
                _ => (0.0, value(ConfusionClass::FalseNegative, i)),
            };
            sums.neg0[k + 1] = sums.neg0[k] + d0;
            sums.neg1[k + 1] = sums.neg1[k] + d1;
        }
        for (k, &i) in order.iter().enumerate().rev() {
            let (d0, d1) = match ConfusionClass::of(true_y[i], true) {
                ConfusionClass::FalsePositive => (value(ConfusionClass::FalsePositive, i), 0.0),
                _ => (0.0, value(ConfusionClass::TruePositive, i)),
            };
            sums.pos0[k] = sums.pos0[k + 1] + d0;
            sums.pos1[k] = sums.pos1[k + 1] + d1;
        }
        sums
    }

    /// Totals when the first `cursor` sorted samples are predicted negative.
    fn at(&self, cursor: usize) -> ClassTotals {
        ClassTotals {
            tn: self.neg0[cursor],
            fp: self.pos0[cursor],
            fn_: self.neg1[cursor],
            tp: self.pos1[cursor],
        }
    }
}

/// One snapshot per grid point.
pub fn sweep(
    dataset: &Dataset,
    grid: &ThresholdGrid,
    mode: AggregationMode<'_>,
) -> Result<Vec<ConfusionSnapshot>> {
    debug!(step = grid.step(), points = grid.len(), "sweeping threshold grid");
    sweep_thresholds(dataset.true_y(), dataset.predicted_proba(), grid.values(), mode)
}

/// Sweep over arbitrary ascending thresholds. A sample is predicted positive
/// iff its probability is `>=` the threshold.
pub fn sweep_thresholds(
    true_y: &[u8],
    predicted_proba: &[f64],
    thresholds: &[f64],
    mode: AggregationMode<'_>,
) -> Result<Vec<ConfusionSnapshot>> {
    let n = true_y.len();
    if n == 0 {
        return Err(BctoolsError::value("cannot sweep an empty dataset"));
    }
    if predicted_proba.len() != n {
        return Err(BctoolsError::shape("predicted_proba", n, predicted_proba.len()));
    }
    if thresholds.windows(2).any(|w| w[0] >= w[1]) {
        return Err(BctoolsError::value("thresholds must be strictly increasing"));
    }
    mode.check_len(n)?;

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by_key(|&i| OrderedFloat(predicted_proba[i]));

    // Label counts among the first k sorted samples.
    let mut neg_prefix = vec![(0usize, 0usize); n + 1];
    for (k, &i) in order.iter().enumerate() {
        let (zeros, ones) = neg_prefix[k];
        neg_prefix[k + 1] = if true_y[i] == 0 { (zeros + 1, ones) } else { (zeros, ones + 1) };
    }
    let (total_zeros, total_ones) = neg_prefix[n];

    let (amount_sums, cost_sums) = match mode {
        AggregationMode::Counts => (None, None),
        AggregationMode::AmountOnly(amounts) => {
            (Some(SideSums::build(&order, true_y, |_, i| amounts[i])), None)
        }
        AggregationMode::CostOnly(costs) => (
            None,
            Some(SideSums::build(&order, true_y, |class, i| costs.cost(class, i))),
        ),
        AggregationMode::Both { amounts, costs } => (
            Some(SideSums::build(&order, true_y, |_, i| amounts[i])),
            Some(SideSums::build(&order, true_y, |class, i| costs.cost(class, i))),
        ),
    };

    debug!(samples = n, thresholds = thresholds.len(), "sweeping thresholds");

    let mut cursor = 0;
    let snapshots = thresholds
        .iter()
        .map(|&threshold| {
            while cursor < n && predicted_proba[order[cursor]] < threshold {
                cursor += 1;
            }
            let (tn, fn_) = neg_prefix[cursor];
            ConfusionSnapshot {
                threshold,
                counts: ConfusionCounts {
                    tn,
                    fp: total_zeros - tn,
                    fn_,
                    tp: total_ones - fn_,
                },
                amounts: amount_sums.as_ref().map(|s| s.at(cursor)),
                costs: cost_sums.as_ref().map(|s| s.at(cursor)),
            }
        })
        .collect();
    Ok(snapshots)
}
