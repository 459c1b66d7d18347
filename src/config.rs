use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::metrics::density::CurveType;
use crate::optimize::ghost::GhostOptimizer;
use crate::optimize::request::OptimizeRequest;
use crate::plot::amount_cost::ClassSelection;

pub const DEFAULT_THRESHOLD_STEP: f64 = 0.01;

/// Currency symbol as it is written into plot markup. A literal `$` would be
/// read as a math delimiter by plotly.js and is stored as its HTML entity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    pub fn new(symbol: impl Into<String>) -> Self {
        let symbol = symbol.into();
        if symbol == "$" {
            Currency("&#36;".to_string())
        } else {
            Currency(symbol)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency("€".to_string())
    }
}

impl From<String> for Currency {
    fn from(symbol: String) -> Self {
        Currency::new(symbol)
    }
}

impl From<&str> for Currency {
    fn from(symbol: &str) -> Self {
        Currency::new(symbol)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrCurveOptions {
    pub beta: f64,
    pub title: String,
    pub show_display_modebar: bool,
}

impl Default for PrCurveOptions {
    fn default() -> Self {
        Self {
            beta: 1.0,
            title: "Precision Recall Curve".to_string(),
            show_display_modebar: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RocCurveOptions {
    pub title: String,
    pub show_display_modebar: bool,
}

impl Default for RocCurveOptions {
    fn default() -> Self {
        Self {
            title: "Receiver Operating Characteristic Curve".to_string(),
            show_display_modebar: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViolinOptions {
    pub threshold_step: f64,
    pub marker_size: usize,
    /// Seed of the horizontal jitter applied to the strip points.
    pub jitter_seed: u64,
    pub title: String,
    pub show_display_modebar: bool,
}

impl Default for ViolinOptions {
    fn default() -> Self {
        Self {
            threshold_step: DEFAULT_THRESHOLD_STEP,
            marker_size: 3,
            jitter_seed: 11,
            title: "Interactive Probabilities Violin Plot".to_string(),
            show_display_modebar: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DensityOptions {
    pub threshold_step: f64,
    pub curve_type: CurveType,
    pub title: String,
    pub show_display_modebar: bool,
}

impl Default for DensityOptions {
    fn default() -> Self {
        Self {
            threshold_step: DEFAULT_THRESHOLD_STEP,
            curve_type: CurveType::Kde,
            title: "Interactive Probabilities Density Plot".to_string(),
            show_display_modebar: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfusionMatrixOptions {
    pub threshold_step: f64,
    /// `None` leaves the optimized-thresholds table empty.
    pub optimize_threshold: Option<OptimizeRequest>,
    pub ghost: GhostOptimizer,
    pub currency: Currency,
    pub title: String,
    pub show_display_modebar: bool,
}

impl Default for ConfusionMatrixOptions {
    fn default() -> Self {
        Self {
            threshold_step: DEFAULT_THRESHOLD_STEP,
            optimize_threshold: None,
            ghost: GhostOptimizer::default(),
            currency: Currency::default(),
            title: "Interactive Confusion Matrix".to_string(),
            show_display_modebar: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineChartOptions {
    pub threshold_step: f64,
    pub currency: Currency,
    pub title: String,
    pub show_display_modebar: bool,
}

impl Default for LineChartOptions {
    fn default() -> Self {
        Self {
            threshold_step: DEFAULT_THRESHOLD_STEP,
            currency: Currency::default(),
            title: "Interactive Confusion Line Chart".to_string(),
            show_display_modebar: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TotalAmountCostOptions {
    pub threshold_step: f64,
    /// Defaults to every class when amounts are given.
    pub amount_classes: Option<ClassSelection>,
    /// Defaults to every class when costs are given.
    pub cost_classes: Option<ClassSelection>,
    pub currency: Currency,
    pub title: String,
    pub show_display_modebar: bool,
}

impl Default for TotalAmountCostOptions {
    fn default() -> Self {
        Self {
            threshold_step: DEFAULT_THRESHOLD_STEP,
            amount_classes: None,
            cost_classes: None,
            currency: Currency::default(),
            title: "Interactive Amount-Cost Line Chart".to_string(),
            show_display_modebar: true,
        }
    }
}

/// Options of every plot, as read from a JSON settings file. Missing sections
/// and fields keep their defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub pr_curve: PrCurveOptions,
    pub roc_curve: RocCurveOptions,
    pub violin: ViolinOptions,
    pub density: DensityOptions,
    pub confusion_matrix: ConfusionMatrixOptions,
    pub confusion_linechart: LineChartOptions,
    pub total_amount_cost: TotalAmountCostOptions,
}

impl Settings {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sample::ConfusionClass;
    use crate::optimize::ghost::SubsetSize;
    use crate::optimize::request::OptimizeMetric;

    #[test]
    fn dollar_is_escaped() {
        assert_eq!(Currency::new("$").as_str(), "&#36;");
        assert_eq!(Currency::from("£").as_str(), "£");
        assert_eq!(Currency::default().to_string(), "€");
    }

    #[test]
    fn empty_settings_are_defaults() {
        assert_eq!(Settings::from_json_str("{}").unwrap(), Settings::default());
    }

    #[test]
    fn partial_settings_override_fields() {
        let settings = Settings::from_json_str(
            r#"{
                "confusion_matrix": {
                    "threshold_step": 0.05,
                    "currency": "$",
                    "optimize_threshold": ["MCC", "Kappa"],
                    "ghost": {"n_subsets": 10, "subset_size": 25, "random_state": 7}
                },
                "density": {"curve_type": "normal"},
                "total_amount_cost": {"amount_classes": "all", "cost_classes": ["FP", "FN"]}
            }"#,
        )
        .unwrap();
        let cm = &settings.confusion_matrix;
        assert_eq!(cm.threshold_step, 0.05);
        assert_eq!(cm.currency.as_str(), "&#36;");
        assert_eq!(
            cm.optimize_threshold,
            Some(OptimizeRequest::Metrics(vec![OptimizeMetric::Mcc, OptimizeMetric::Kappa]))
        );
        assert_eq!(cm.ghost.n_subsets, 10);
        assert_eq!(cm.ghost.subset_size, SubsetSize::Count(25));
        assert_eq!(cm.ghost.random_state, Some(7));
        assert_eq!(cm.title, "Interactive Confusion Matrix");
        assert_eq!(settings.density.curve_type, CurveType::Normal);
        assert_eq!(settings.total_amount_cost.amount_classes, Some(ClassSelection::All));
        assert_eq!(
            settings.total_amount_cost.cost_classes,
            Some(ClassSelection::Classes(vec![
                ConfusionClass::FalsePositive,
                ConfusionClass::FalseNegative
            ]))
        );
    }

    #[test]
    fn unknown_curve_type_is_rejected() {
        assert!(Settings::from_json_str(r#"{"density": {"curve_type": "box"}}"#).is_err());
    }
}
