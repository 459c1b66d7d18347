//! GHOST-style threshold optimization: every candidate threshold is scored on
//! many random subsets of the data and ranked by its median score.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::compute::grid::ThresholdGrid;
use crate::compute::sweep::{sweep_thresholds, AggregationMode, ConfusionSnapshot};
use crate::data::sample::{Dataset, ResolvedCosts};
use crate::error::{BctoolsError, Result};
use crate::metrics::threshold::{cohen_kappa, fbeta_unchecked, matthews_corrcoef, youden_j};
use crate::optimize::request::{OptimalThreshold, OptimizeMetric, ThresholdOptimizer};

/// Size of every resampled subset.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubsetSize {
    Count(usize),
    Fraction(f64),
}

impl SubsetSize {
    fn resolve(self, n: usize, with_replacement: bool) -> Result<usize> {
        let size = match self {
            SubsetSize::Fraction(f) => {
                if !f.is_finite() || f <= 0.0 || f > 1.0 {
                    return Err(BctoolsError::value(format!(
                        "subsets_size as a fraction must lie in (0, 1], got {f}"
                    )));
                }
                ((f * n as f64).round() as usize).max(1)
            }
            SubsetSize::Count(k) => k,
        };
        if size == 0 {
            return Err(BctoolsError::value("subsets_size must be at least 1"));
        }
        if size > n && !with_replacement {
            return Err(BctoolsError::value(format!(
                "subsets_size {size} exceeds the {n} samples available without replacement"
            )));
        }
        Ok(size)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GhostOptimizer {
    pub n_subsets: usize,
    pub subset_size: SubsetSize,
    pub with_replacement: bool,
    pub random_state: Option<u64>,
    /// Weight of recall in the Fscore objective.
    pub beta: f64,
}

impl Default for GhostOptimizer {
    fn default() -> Self {
        Self {
            n_subsets: 70,
            subset_size: SubsetSize::Fraction(0.2),
            with_replacement: false,
            random_state: None,
            beta: 1.0,
        }
    }
}

fn draw_subset(n: usize, size: usize, with_replacement: bool, rng: &mut impl Rng) -> Vec<usize> {
    if with_replacement {
        (0..size).map(|_| rng.gen_range(0..n)).collect()
    } else {
        rand::seq::index::sample(rng, n, size).into_vec()
    }
}

fn score(metric: OptimizeMetric, snapshot: &ConfusionSnapshot, beta: f64) -> f64 {
    let c = &snapshot.counts;
    match metric {
        OptimizeMetric::Roc => youden_j(c),
        OptimizeMetric::Mcc => matthews_corrcoef(c),
        OptimizeMetric::Kappa => cohen_kappa(c),
        OptimizeMetric::Fscore => fbeta_unchecked(c, beta),
        OptimizeMetric::Cost => snapshot.total_cost().unwrap_or(0.0),
    }
}

/// Linearly interpolated quantile of one column of per-subset scores.
fn column_quantile(curves: &[Vec<f64>], column: usize, q: f64) -> f64 {
    let mut col: Vec<f64> = curves.iter().map(|v| v[column]).collect();
    col.sort_by(|a, b| a.total_cmp(b));
    let m = col.len();
    if m == 1 {
        return col[0];
    }
    let h = (m - 1) as f64 * q.clamp(0.0, 1.0);
    let i0 = h.floor() as usize;
    let i1 = h.ceil() as usize;
    let frac = h - i0 as f64;
    (1.0 - frac) * col[i0] + frac * col[i1]
}

/// Index of the best median; ties keep the lowest threshold.
fn best_index(medians: &[f64], minimize: bool) -> usize {
    let mut best = 0;
    for (i, &value) in medians.iter().enumerate().skip(1) {
        let better = if minimize {
            value < medians[best]
        } else {
            value > medians[best]
        };
        if better {
            best = i;
        }
    }
    best
}

impl GhostOptimizer {
    fn validate(&self) -> Result<()> {
        if self.n_subsets == 0 {
            return Err(BctoolsError::value("N_subsets must be at least 1"));
        }
        if !self.beta.is_finite() || self.beta < 0.0 {
            return Err(BctoolsError::value(format!(
                "beta should be >= 0 in the F-beta score, got {}",
                self.beta
            )));
        }
        Ok(())
    }
}

impl ThresholdOptimizer for GhostOptimizer {
    fn optimize(
        &self,
        dataset: &Dataset,
        costs: Option<&ResolvedCosts>,
        grid: &ThresholdGrid,
        metrics: &[OptimizeMetric],
    ) -> Result<Vec<OptimalThreshold>> {
        self.validate()?;
        let candidates = grid.interior();
        if candidates.is_empty() {
            return Err(BctoolsError::value(
                "threshold grid has no interior thresholds to optimize over",
            ));
        }
        if metrics.contains(&OptimizeMetric::Cost) && costs.is_none() {
            return Err(BctoolsError::usage(
                "optimizing the Cost metric requires a cost specification",
            ));
        }
        let n = dataset.len();
        let size = self.subset_size.resolve(n, self.with_replacement)?;
        let base_seed = self
            .random_state
            .unwrap_or_else(|| rand::thread_rng().gen());
        debug!(
            subsets = self.n_subsets,
            subset_size = size,
            candidates = candidates.len(),
            "running GHOST optimization"
        );

        // scores[subset][metric][candidate]
        let scores: Vec<Vec<Vec<f64>>> = (0..self.n_subsets)
            .into_par_iter()
            .map(|i| {
                let mut rng = StdRng::seed_from_u64(base_seed.wrapping_add(i as u64));
                let idx = draw_subset(n, size, self.with_replacement, &mut rng);
                let true_y: Vec<u8> = idx.iter().map(|&j| dataset.true_y()[j]).collect();
                let proba: Vec<f64> = idx.iter().map(|&j| dataset.predicted_proba()[j]).collect();
                let subset_costs = costs.map(|c| c.select(&idx));
                let mode = AggregationMode::from_inputs(None, subset_costs.as_ref());
                let snapshots = sweep_thresholds(&true_y, &proba, candidates, mode)?;
                Ok(metrics
                    .iter()
                    .map(|&metric| {
                        snapshots
                            .iter()
                            .map(|s| score(metric, s, self.beta))
                            .collect()
                    })
                    .collect())
            })
            .collect::<Result<_>>()?;

        let rows = metrics
            .iter()
            .enumerate()
            .map(|(m, &metric)| {
                let curves: Vec<Vec<f64>> = scores.iter().map(|s| s[m].clone()).collect();
                let medians: Vec<f64> = (0..candidates.len())
                    .into_par_iter()
                    .map(|k| column_quantile(&curves, k, 0.5))
                    .collect();
                let threshold = candidates[best_index(&medians, metric.is_minimized())];
                info!(metric = metric.name(), threshold, "optimized threshold");
                OptimalThreshold { metric, threshold }
            })
            .collect();
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sample::{ConfusionClass, CostSpecification};

    fn separable() -> Dataset {
        let mut true_y = Vec::new();
        let mut proba = Vec::new();
        for i in 0..100 {
            let label = (i % 2) as u8;
            true_y.push(label);
            let base = if label == 1 { 0.6 } else { 0.1 };
            proba.push(base + (i % 7) as f64 * 0.03);
        }
        Dataset::new(true_y, proba).unwrap()
    }

    fn seeded() -> GhostOptimizer {
        GhostOptimizer {
            random_state: Some(42),
            ..GhostOptimizer::default()
        }
    }

    #[test]
    fn fixed_seed_is_deterministic() {
        let data = separable();
        let grid = ThresholdGrid::new(0.05).unwrap();
        let metrics = [OptimizeMetric::Mcc, OptimizeMetric::Kappa];
        let a = seeded().optimize(&data, None, &grid, &metrics).unwrap();
        let b = seeded().optimize(&data, None, &grid, &metrics).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn separable_data_splits_between_classes() {
        let data = separable();
        let grid = ThresholdGrid::new(0.05).unwrap();
        let rows = seeded()
            .optimize(&data, None, &grid, &[OptimizeMetric::Roc, OptimizeMetric::Fscore])
            .unwrap();
        for row in rows {
            assert!(row.threshold > 0.28 && row.threshold <= 0.6, "{row:?}");
        }
    }

    #[test]
    fn cost_is_minimized() {
        let data = separable();
        let grid = ThresholdGrid::new(0.1).unwrap();
        let costs = CostSpecification::new()
            .with(ConfusionClass::FalsePositive, 1.0)
            .with(ConfusionClass::FalseNegative, 1.0)
            .resolve(data.len())
            .unwrap();
        let rows = seeded()
            .optimize(&data, Some(&costs), &grid, &[OptimizeMetric::Cost])
            .unwrap();
        assert!(rows[0].threshold >= 0.3 && rows[0].threshold <= 0.6);
    }

    #[test]
    fn cost_without_costs_is_usage_error() {
        let grid = ThresholdGrid::new(0.1).unwrap();
        let err = seeded()
            .optimize(&separable(), None, &grid, &[OptimizeMetric::Cost])
            .unwrap_err();
        assert!(matches!(err, BctoolsError::Usage(_)));
    }

    #[test]
    fn grid_without_interior_is_rejected() {
        let grid = ThresholdGrid::new(1.0).unwrap();
        let err = seeded()
            .optimize(&separable(), None, &grid, &[OptimizeMetric::Mcc])
            .unwrap_err();
        assert!(matches!(err, BctoolsError::Value(_)));
    }

    #[test]
    fn subset_sizes() {
        assert_eq!(SubsetSize::Fraction(0.2).resolve(100, false).unwrap(), 20);
        assert_eq!(SubsetSize::Fraction(0.01).resolve(10, false).unwrap(), 1);
        assert_eq!(SubsetSize::Count(150).resolve(100, true).unwrap(), 150);
        assert!(SubsetSize::Count(150).resolve(100, false).is_err());
        assert!(SubsetSize::Fraction(1.5).resolve(100, false).is_err());
    }

    #[test]
    fn ties_keep_lowest_threshold() {
        assert_eq!(best_index(&[0.1, 0.5, 0.5, 0.2], false), 1);
        assert_eq!(best_index(&[3.0, 1.0, 1.0], true), 1);
    }

    #[test]
    fn median_of_even_column_interpolates() {
        let curves = vec![vec![1.0], vec![4.0], vec![2.0], vec![3.0]];
        assert_eq!(column_quantile(&curves, 0, 0.5), 2.5);
    }
}
