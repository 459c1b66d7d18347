use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{BctoolsError, Result};

/// Outcome of comparing a true label with a thresholded prediction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConfusionClass {
    #[serde(rename = "TN")]
    TrueNegative,
    #[serde(rename = "FP")]
    FalsePositive,
    #[serde(rename = "FN")]
    FalseNegative,
    #[serde(rename = "TP")]
    TruePositive,
}

impl ConfusionClass {
    /// Display order used by every table and subplot grid.
    pub const ALL: [ConfusionClass; 4] = [
        ConfusionClass::TrueNegative,
        ConfusionClass::FalsePositive,
        ConfusionClass::FalseNegative,
        ConfusionClass::TruePositive,
    ];

    pub fn of(label: u8, predicted_positive: bool) -> Self {
        match (label, predicted_positive) {
            (0, false) => ConfusionClass::TrueNegative,
            (0, true) => ConfusionClass::FalsePositive,
            (_, false) => ConfusionClass::FalseNegative,
            (_, true) => ConfusionClass::TruePositive,
        }
    }

    pub fn short(self) -> &'static str {
        match self {
            ConfusionClass::TrueNegative => "TN",
            ConfusionClass::FalsePositive => "FP",
            ConfusionClass::FalseNegative => "FN",
            ConfusionClass::TruePositive => "TP",
        }
    }

    pub fn long(self) -> &'static str {
        match self {
            ConfusionClass::TrueNegative => "True Negative",
            ConfusionClass::FalsePositive => "False Positive",
            ConfusionClass::FalseNegative => "False Negative",
            ConfusionClass::TruePositive => "True Positive",
        }
    }

    pub fn actual_label(self) -> u8 {
        match self {
            ConfusionClass::TrueNegative | ConfusionClass::FalsePositive => 0,
            ConfusionClass::FalseNegative | ConfusionClass::TruePositive => 1,
        }
    }
}

impl fmt::Display for ConfusionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short())
    }
}

impl FromStr for ConfusionClass {
    type Err = BctoolsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TN" => Ok(ConfusionClass::TrueNegative),
            "FP" => Ok(ConfusionClass::FalsePositive),
            "FN" => Ok(ConfusionClass::FalseNegative),
            "TP" => Ok(ConfusionClass::TruePositive),
            other => Err(BctoolsError::value(format!(
                "unknown confusion class '{other}', expected one of TN, FP, FN, TP"
            ))),
        }
    }
}

/// Labels, probabilities and optional amounts, validated and index-aligned.
#[derive(Clone, Debug, PartialEq)]
pub struct Dataset {
    true_y: Vec<u8>,
    predicted_proba: Vec<f64>,
    amounts: Option<Vec<f64>>,
}

impl Dataset {
    pub fn new(true_y: Vec<u8>, predicted_proba: Vec<f64>) -> Result<Self> {
        if true_y.is_empty() || predicted_proba.is_empty() {
            return Err(BctoolsError::value("true_y and predicted_proba must not be empty"));
        }
        if true_y.len() != predicted_proba.len() {
            return Err(BctoolsError::shape(
                "predicted_proba",
                true_y.len(),
                predicted_proba.len(),
            ));
        }
        if let Some(bad) = true_y.iter().find(|&&y| y > 1) {
            return Err(BctoolsError::value(format!(
                "true_y must contain only 0 and 1, found {bad}"
            )));
        }
        if let Some(bad) = predicted_proba
            .iter()
            .find(|p| !p.is_finite() || **p < 0.0 || **p > 1.0)
        {
            return Err(BctoolsError::value(format!(
                "predicted_proba must lie in [0, 1], found {bad}"
            )));
        }
        Ok(Self {
            true_y,
            predicted_proba,
            amounts: None,
        })
    }

    pub fn with_amounts(mut self, amounts: Vec<f64>) -> Result<Self> {
        if amounts.len() != self.len() {
            return Err(BctoolsError::shape("amounts", self.len(), amounts.len()));
        }
        if let Some(bad) = amounts.iter().find(|a| !a.is_finite()) {
            return Err(BctoolsError::value(format!("amounts must be finite, found {bad}")));
        }
        self.amounts = Some(amounts);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.true_y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.true_y.is_empty()
    }

    pub fn true_y(&self) -> &[u8] {
        &self.true_y
    }

    pub fn predicted_proba(&self) -> &[f64] {
        &self.predicted_proba
    }

    pub fn amounts(&self) -> Option<&[f64]> {
        self.amounts.as_deref()
    }

    pub fn total_amount(&self) -> Option<f64> {
        self.amounts.as_ref().map(|a| a.iter().sum())
    }

    pub fn positives(&self) -> usize {
        self.true_y.iter().filter(|&&y| y == 1).count()
    }

    pub fn negatives(&self) -> usize {
        self.len() - self.positives()
    }

    /// Probabilities of the samples whose true label is `label`, in input order.
    pub fn proba_of_class(&self, label: u8) -> Vec<f64> {
        self.true_y
            .iter()
            .zip(&self.predicted_proba)
            .filter(|(&y, _)| y == label)
            .map(|(_, &p)| p)
            .collect()
    }
}

/// A cost entry: one value for every sample, or one value per sample.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CostValue {
    Scalar(f64),
    PerSample(Vec<f64>),
}

impl Default for CostValue {
    fn default() -> Self {
        CostValue::Scalar(0.0)
    }
}

impl From<f64> for CostValue {
    fn from(value: f64) -> Self {
        CostValue::Scalar(value)
    }
}

impl From<Vec<f64>> for CostValue {
    fn from(values: Vec<f64>) -> Self {
        CostValue::PerSample(values)
    }
}

impl CostValue {
    fn broadcast(&self, class: ConfusionClass, n: usize) -> Result<Vec<f64>> {
        match self {
            CostValue::Scalar(v) => Ok(vec![*v; n]),
            CostValue::PerSample(values) if values.len() == n => Ok(values.clone()),
            CostValue::PerSample(values) => Err(BctoolsError::shape(
                format!("cost_dict[{class}]"),
                n,
                values.len(),
            )),
        }
    }
}

/// Cost incurred by a sample depending on the confusion class it lands in.
/// Keys that are not given cost nothing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CostSpecification {
    #[serde(rename = "TN", default)]
    pub tn: CostValue,
    #[serde(rename = "FP", default)]
    pub fp: CostValue,
    #[serde(rename = "FN", default)]
    pub fn_: CostValue,
    #[serde(rename = "TP", default)]
    pub tp: CostValue,
}

impl CostSpecification {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, class: ConfusionClass, value: impl Into<CostValue>) -> Self {
        *self.entry_mut(class) = value.into();
        self
    }

    pub fn get(&self, class: ConfusionClass) -> &CostValue {
        match class {
            ConfusionClass::TrueNegative => &self.tn,
            ConfusionClass::FalsePositive => &self.fp,
            ConfusionClass::FalseNegative => &self.fn_,
            ConfusionClass::TruePositive => &self.tp,
        }
    }

    fn entry_mut(&mut self, class: ConfusionClass) -> &mut CostValue {
        match class {
            ConfusionClass::TrueNegative => &mut self.tn,
            ConfusionClass::FalsePositive => &mut self.fp,
            ConfusionClass::FalseNegative => &mut self.fn_,
            ConfusionClass::TruePositive => &mut self.tp,
        }
    }

    /// Broadcast every entry to a per-sample array of length `n`.
    pub fn resolve(&self, n: usize) -> Result<ResolvedCosts> {
        let [tn, fp, fn_, tp] = ConfusionClass::ALL.map(|class| self.get(class).broadcast(class, n));
        let resolved = ResolvedCosts {
            tn: tn?,
            fp: fp?,
            fn_: fn_?,
            tp: tp?,
        };
        if let Some(bad) = [&resolved.tn, &resolved.fp, &resolved.fn_, &resolved.tp]
            .iter()
            .flat_map(|v| v.iter())
            .find(|c| !c.is_finite())
        {
            return Err(BctoolsError::value(format!("costs must be finite, found {bad}")));
        }
        Ok(resolved)
    }
}

/// Per-sample costs for each confusion class after broadcasting scalars.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedCosts {
    pub tn: Vec<f64>,
    pub fp: Vec<f64>,
    pub fn_: Vec<f64>,
    pub tp: Vec<f64>,
}

impl ResolvedCosts {
    pub fn len(&self) -> usize {
        self.tn.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tn.is_empty()
    }

    #[inline]
    pub fn cost(&self, class: ConfusionClass, index: usize) -> f64 {
        match class {
            ConfusionClass::TrueNegative => self.tn[index],
            ConfusionClass::FalsePositive => self.fp[index],
            ConfusionClass::FalseNegative => self.fn_[index],
            ConfusionClass::TruePositive => self.tp[index],
        }
    }

    /// Costs of the given samples, in the order of `indices`.
    pub fn select(&self, indices: &[usize]) -> Self {
        let pick = |v: &[f64]| indices.iter().map(|&i| v[i]).collect();
        Self {
            tn: pick(&self.tn),
            fp: pick(&self.fp),
            fn_: pick(&self.fn_),
            tp: pick(&self.tp),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataset_rejects_empty_input() {
        let err = Dataset::new(vec![], vec![]).unwrap_err();
        assert!(matches!(err, BctoolsError::Value(_)));
    }

    #[test]
    fn dataset_rejects_misaligned_input() {
        let err = Dataset::new(vec![0, 1], vec![0.2]).unwrap_err();
        assert!(matches!(err, BctoolsError::Shape { expected: 2, actual: 1, .. }));
    }

    #[test]
    fn dataset_rejects_bad_labels_and_probabilities() {
        assert!(Dataset::new(vec![0, 2], vec![0.1, 0.2]).is_err());
        assert!(Dataset::new(vec![0, 1], vec![0.1, 1.2]).is_err());
        assert!(Dataset::new(vec![0, 1], vec![0.1, f64::NAN]).is_err());
    }

    #[test]
    fn amounts_must_match_sample_count() {
        let data = Dataset::new(vec![0, 1], vec![0.1, 0.9]).unwrap();
        let err = data.with_amounts(vec![1.0]).unwrap_err();
        assert!(matches!(err, BctoolsError::Shape { .. }));
    }

    #[test]
    fn cost_scalars_are_broadcast() {
        let costs = CostSpecification::new()
            .with(ConfusionClass::FalsePositive, 10.0)
            .with(ConfusionClass::FalseNegative, vec![1.0, 2.0, 3.0]);
        let resolved = costs.resolve(3).unwrap();
        assert_eq!(resolved.fp, vec![10.0; 3]);
        assert_eq!(resolved.fn_, vec![1.0, 2.0, 3.0]);
        assert_eq!(resolved.tn, vec![0.0; 3]);
        assert_eq!(resolved.cost(ConfusionClass::FalseNegative, 2), 3.0);
    }

    #[test]
    fn cost_sequence_length_mismatch_is_a_shape_error() {
        let costs = CostSpecification::new().with(ConfusionClass::TruePositive, vec![1.0, 2.0]);
        let err = costs.resolve(3).unwrap_err();
        assert!(matches!(err, BctoolsError::Shape { expected: 3, actual: 2, .. }));
    }

    #[test]
    fn cost_specification_parses_from_json() {
        let costs: CostSpecification =
            serde_json::from_str(r#"{"FP": 10, "FN": [50, 60], "TN": 0}"#).unwrap();
        assert_eq!(costs.fp, CostValue::Scalar(10.0));
        assert_eq!(costs.fn_, CostValue::PerSample(vec![50.0, 60.0]));
        assert_eq!(costs.tp, CostValue::Scalar(0.0));

        let unknown: std::result::Result<CostSpecification, _> =
            serde_json::from_str(r#"{"XX": 1}"#);
        assert!(unknown.is_err());
    }

    #[test]
    fn confusion_class_round_trips_through_text() {
        for class in ConfusionClass::ALL {
            assert_eq!(class.short().parse::<ConfusionClass>().unwrap(), class);
        }
        assert!("tp".parse::<ConfusionClass>().is_ok());
        assert!("XX".parse::<ConfusionClass>().is_err());
    }

    #[test]
    fn actual_label_inverts_of() {
        for label in [0u8, 1] {
            for predicted_positive in [false, true] {
                assert_eq!(ConfusionClass::of(label, predicted_positive).actual_label(), label);
            }
        }
    }

    #[test]
    fn dataset_counts_both_classes() {
        let dataset = Dataset::new(vec![0, 1, 1, 0, 0], vec![0.1, 0.9, 0.7, 0.3, 0.5]).unwrap();
        assert_eq!(dataset.positives(), 2);
        assert_eq!(dataset.negatives(), 3);
    }
}
