use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::compute::grid::ThresholdGrid;
use crate::data::columnar::{ColumnarTable, ToFrame};
use crate::data::sample::{Dataset, ResolvedCosts};
use crate::error::{BctoolsError, Result};

/// Objective a threshold can be optimized for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptimizeMetric {
    #[serde(rename = "ROC")]
    Roc,
    #[serde(rename = "MCC")]
    Mcc,
    Kappa,
    Fscore,
    Cost,
}

impl OptimizeMetric {
    pub fn name(self) -> &'static str {
        match self {
            OptimizeMetric::Roc => "ROC",
            OptimizeMetric::Mcc => "MCC",
            OptimizeMetric::Kappa => "Kappa",
            OptimizeMetric::Fscore => "Fscore",
            OptimizeMetric::Cost => "Cost",
        }
    }

    /// Cost is the only objective that is minimized.
    pub fn is_minimized(self) -> bool {
        matches!(self, OptimizeMetric::Cost)
    }
}

impl fmt::Display for OptimizeMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OptimizeMetric {
    type Err = BctoolsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "roc" => Ok(OptimizeMetric::Roc),
            "mcc" => Ok(OptimizeMetric::Mcc),
            "kappa" => Ok(OptimizeMetric::Kappa),
            "fscore" => Ok(OptimizeMetric::Fscore),
            "cost" => Ok(OptimizeMetric::Cost),
            other => Err(BctoolsError::value(format!(
                "unknown metric '{other}' to optimize, expected 'all' or any of ROC, MCC, Kappa, Fscore, Cost"
            ))),
        }
    }
}

/// Which thresholds the confusion dashboard should optimize.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RequestRepr", into = "RequestRepr")]
pub enum OptimizeRequest {
    All,
    Metrics(Vec<OptimizeMetric>),
}

impl OptimizeRequest {
    /// Concrete metric list. `All` includes Cost only when costs are known;
    /// asking for Cost explicitly without costs is a usage error.
    pub fn resolve(&self, has_costs: bool) -> Result<Vec<OptimizeMetric>> {
        let metrics = match self {
            OptimizeRequest::All => {
                let mut all = vec![
                    OptimizeMetric::Roc,
                    OptimizeMetric::Mcc,
                    OptimizeMetric::Kappa,
                    OptimizeMetric::Fscore,
                ];
                if has_costs {
                    all.push(OptimizeMetric::Cost);
                }
                all
            }
            OptimizeRequest::Metrics(list) => {
                if list.is_empty() {
                    return Err(BctoolsError::value("at least one metric to optimize is required"));
                }
                if list.contains(&OptimizeMetric::Cost) && !has_costs {
                    return Err(BctoolsError::usage(
                        "optimizing the Cost metric requires a cost specification",
                    ));
                }
                let mut unique = Vec::with_capacity(list.len());
                for metric in list {
                    if !unique.contains(metric) {
                        unique.push(*metric);
                    }
                }
                unique
            }
        };
        Ok(metrics)
    }
}

impl FromStr for OptimizeRequest {
    type Err = BctoolsError;

    /// `all`, or a comma separated list of metric names.
    fn from_str(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(OptimizeRequest::All);
        }
        let metrics = s
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(|part| part.parse::<OptimizeMetric>())
            .collect::<Result<Vec<_>>>()?;
        Ok(OptimizeRequest::Metrics(metrics))
    }
}

/// Settings form: `"all"`, a single name, or a list of names.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RequestRepr {
    One(String),
    Many(Vec<OptimizeMetric>),
}

impl TryFrom<RequestRepr> for OptimizeRequest {
    type Error = BctoolsError;

    fn try_from(repr: RequestRepr) -> Result<Self> {
        match repr {
            RequestRepr::One(name) => name.parse(),
            RequestRepr::Many(metrics) => Ok(OptimizeRequest::Metrics(metrics)),
        }
    }
}

impl From<OptimizeRequest> for RequestRepr {
    fn from(request: OptimizeRequest) -> Self {
        match request {
            OptimizeRequest::All => RequestRepr::One("all".to_string()),
            OptimizeRequest::Metrics(metrics) => RequestRepr::Many(metrics),
        }
    }
}

/// One row of the optimized-thresholds table.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct OptimalThreshold {
    pub metric: OptimizeMetric,
    pub threshold: f64,
}

impl ToFrame for [OptimalThreshold] {
    fn to_frame(&self) -> Result<ColumnarTable> {
        ColumnarTable::with_label_column(
            "metric",
            self.iter().map(|row| row.metric.name().to_string()).collect(),
            vec![(
                "threshold".to_string(),
                self.iter().map(|row| row.threshold).collect(),
            )],
        )
    }
}

/// Picks one threshold per metric out of the interior of a grid.
pub trait ThresholdOptimizer {
    fn optimize(
        &self,
        dataset: &Dataset,
        costs: Option<&ResolvedCosts>,
        grid: &ThresholdGrid,
        metrics: &[OptimizeMetric],
    ) -> Result<Vec<OptimalThreshold>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_includes_cost_only_with_costs() {
        assert_eq!(OptimizeRequest::All.resolve(false).unwrap().len(), 4);
        let with_costs = OptimizeRequest::All.resolve(true).unwrap();
        assert_eq!(with_costs.last(), Some(&OptimizeMetric::Cost));
    }

    #[test]
    fn explicit_cost_without_costs_is_usage_error() {
        let request = OptimizeRequest::Metrics(vec![OptimizeMetric::Mcc, OptimizeMetric::Cost]);
        assert!(matches!(request.resolve(false), Err(BctoolsError::Usage(_))));
        assert!(request.resolve(true).is_ok());
    }

    #[test]
    fn duplicates_are_dropped_in_order() {
        let request: OptimizeRequest = "kappa, ROC,kappa".parse().unwrap();
        assert_eq!(
            request.resolve(false).unwrap(),
            vec![OptimizeMetric::Kappa, OptimizeMetric::Roc]
        );
    }

    #[test]
    fn parsing() {
        assert_eq!("ALL".parse::<OptimizeRequest>().unwrap(), OptimizeRequest::All);
        assert!("mcc,auc".parse::<OptimizeRequest>().is_err());
        assert_eq!(OptimizeMetric::Fscore.to_string(), "Fscore");
    }

    #[test]
    fn rows_convert_to_frame() {
        let rows = vec![
            OptimalThreshold { metric: OptimizeMetric::Roc, threshold: 0.4 },
            OptimalThreshold { metric: OptimizeMetric::Cost, threshold: 0.7 },
        ];
        let frame = rows.to_frame().unwrap();
        assert_eq!(frame.column_names(), vec!["metric", "threshold"]);
        assert_eq!(frame.column_f64("threshold"), Some(vec![0.4, 0.7]));
    }
}
