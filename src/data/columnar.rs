use polars::prelude::{DataFrame, NamedFrom, Series};

use crate::error::Result;

/// A simple ColumnarTable wrapper using Polars DataFrame
#[derive(Clone, Debug)]
pub struct ColumnarTable {
    pub df: DataFrame,
}

impl ColumnarTable {
    pub fn new(df: DataFrame) -> Self {
        Self { df }
    }

    /// Build from named float columns of equal length.
    pub fn from_f64_columns(columns: Vec<(String, Vec<f64>)>) -> Result<Self> {
        let series = columns
            .into_iter()
            .map(|(name, values)| Series::new(&name, values))
            .collect();
        Ok(Self::new(DataFrame::new(series)?))
    }

    /// Build from a leading text column followed by float columns.
    pub fn with_label_column(
        label_name: &str,
        labels: Vec<String>,
        columns: Vec<(String, Vec<f64>)>,
    ) -> Result<Self> {
        let mut series = vec![Series::new(label_name, labels)];
        series.extend(
            columns
                .into_iter()
                .map(|(name, values)| Series::new(&name, values)),
        );
        Ok(Self::new(DataFrame::new(series)?))
    }

    /// Extract a column as Vec<f64>
    pub fn column_f64(&self, col: &str) -> Option<Vec<f64>> {
        self.df
            .column(col)
            .ok()?
            .f64()
            .ok()
            .map(|s| s.into_no_null_iter().collect())
    }

    pub fn column_names(&self) -> Vec<String> {
        self.df
            .get_column_names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Cell values rendered as text, row by row.
    pub fn rows_as_text(&self) -> Vec<Vec<String>> {
        (0..self.len())
            .map(|row| {
                self.df
                    .get_columns()
                    .iter()
                    .map(|s| s.get(row).map(|v| v.to_string()).unwrap_or_default())
                    .collect()
            })
            .collect()
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.df.height()
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }
}

/// Conversion of a typed result table into a data frame.
pub trait ToFrame {
    fn to_frame(&self) -> Result<ColumnarTable>;
}
