use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::data::sample::{CostSpecification, Dataset};
use crate::error::{BctoolsError, Result};

pub const TRUE_Y_COLUMN: &str = "true_y";
pub const PROBA_COLUMN: &str = "predicted_proba";
pub const AMOUNT_COLUMN: &str = "amount";

/// Column-oriented JSON table: `{"columns": [...], "data": [[...], ...]}`.
#[derive(Debug, Deserialize)]
struct JsonTable {
    columns: Vec<String>,
    data: Vec<Vec<Value>>,
}

impl JsonTable {
    fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(
            self.data
                .iter()
                .map(|row| row.get(idx).and_then(Value::as_f64).unwrap_or(f64::NAN))
                .collect(),
        )
    }

    fn required(&self, name: &str) -> Result<Vec<f64>> {
        self.column(name)
            .ok_or_else(|| BctoolsError::value(format!("input table has no `{name}` column")))
    }
}

fn label(value: f64, row: usize) -> Result<u8> {
    match value {
        v if v == 0.0 => Ok(0),
        v if v == 1.0 => Ok(1),
        v => Err(BctoolsError::value(format!(
            "{TRUE_Y_COLUMN} must be 0 or 1, got {v} in row {row}"
        ))),
    }
}

/// Dataset from JSON text; the `amount` column is optional.
pub fn dataset_from_json_str(text: &str) -> Result<Dataset> {
    let table: JsonTable = serde_json::from_str(text)?;
    let true_y = table
        .required(TRUE_Y_COLUMN)?
        .into_iter()
        .enumerate()
        .map(|(row, v)| label(v, row))
        .collect::<Result<Vec<u8>>>()?;
    let mut dataset = Dataset::new(true_y, table.required(PROBA_COLUMN)?)?;
    if let Some(amounts) = table.column(AMOUNT_COLUMN) {
        dataset = dataset.with_amounts(amounts)?;
    }
    debug!(
        rows = dataset.len(),
        amounts = dataset.amounts().is_some(),
        "parsed input table"
    );
    Ok(dataset)
}

pub fn load_dataset(json_path: impl AsRef<Path>) -> Result<Dataset> {
    let path = json_path.as_ref();
    let dataset = dataset_from_json_str(&fs::read_to_string(path)?)?;
    info!(
        path = %path.display(),
        positives = dataset.positives(),
        negatives = dataset.negatives(),
        "loaded dataset"
    );
    Ok(dataset)
}

/// Cost specification from a JSON object keyed by `TN`, `FP`, `FN`, `TP`.
pub fn load_costs(json_path: impl AsRef<Path>) -> Result<CostSpecification> {
    Ok(serde_json::from_str(&fs::read_to_string(json_path)?)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sample::{ConfusionClass, CostValue};

    const TABLE: &str = r#"{
        "columns": ["id", "true_y", "predicted_proba", "amount"],
        "data": [[1, 0, 0.1, 100.0], [2, 0, 0.4, 200.0], [3, 1, 0.35, 300.0], [4, 1, 0.8, 400.0]]
    }"#;

    #[test]
    fn parses_labels_probabilities_and_amounts() {
        let dataset = dataset_from_json_str(TABLE).unwrap();
        assert_eq!(dataset.true_y(), &[0, 0, 1, 1]);
        assert_eq!(dataset.predicted_proba(), &[0.1, 0.4, 0.35, 0.8]);
        assert_eq!(dataset.total_amount(), Some(1000.0));
    }

    #[test]
    fn amount_column_is_optional() {
        let text = r#"{"columns": ["predicted_proba", "true_y"], "data": [[0.2, 0], [0.7, 1]]}"#;
        let dataset = dataset_from_json_str(text).unwrap();
        assert_eq!(dataset.true_y(), &[0, 1]);
        assert!(dataset.amounts().is_none());
    }

    #[test]
    fn rejects_missing_columns_and_bad_labels() {
        let missing = r#"{"columns": ["true_y"], "data": [[0]]}"#;
        assert!(matches!(dataset_from_json_str(missing), Err(BctoolsError::Value(_))));
        let bad = r#"{"columns": ["true_y", "predicted_proba"], "data": [[2, 0.5]]}"#;
        assert!(matches!(dataset_from_json_str(bad), Err(BctoolsError::Value(_))));
        assert!(matches!(dataset_from_json_str("{"), Err(BctoolsError::Json(_))));
    }

    #[test]
    fn loads_files() {
        let dir = std::env::temp_dir().join(format!("bctools-loader-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let data_path = dir.join("data.json");
        let cost_path = dir.join("costs.json");
        fs::write(&data_path, TABLE).unwrap();
        fs::write(&cost_path, r#"{"FP": 10, "FN": [1, 2, 3, 4]}"#).unwrap();

        let dataset = load_dataset(&data_path).unwrap();
        assert_eq!(dataset.len(), 4);
        assert_eq!(dataset.negatives(), 2);
        let costs = load_costs(&cost_path).unwrap();
        assert_eq!(costs.get(ConfusionClass::FalsePositive), &CostValue::Scalar(10.0));
        assert_eq!(costs.get(ConfusionClass::TruePositive), &CostValue::Scalar(0.0));

        fs::remove_dir_all(&dir).unwrap();
    }
}
