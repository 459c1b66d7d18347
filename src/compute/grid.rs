use crate::data::utils::{format_label, infer_decimals, round_to};
use crate::error::{BctoolsError, Result};

const GRID_TOLERANCE: f64 = 1e-9;

/// Ascending candidate thresholds `0, step, 2 * step, ...` terminated by 1.0.
#[derive(Clone, Debug, PartialEq)]
pub struct ThresholdGrid {
    step: f64,
    decimals: usize,
    values: Vec<f64>,
}

impl ThresholdGrid {
    pub fn new(step: f64) -> Result<Self> {
        if !step.is_finite() || step <= 0.0 || step > 1.0 {
            return Err(BctoolsError::value(format!(
                "threshold_step must lie in (0, 1], got {step}"
            )));
        }
        let decimals = infer_decimals(step);
        let mut values: Vec<f64> = (0u64..)
            .map(|k| k as f64 * step)
            .take_while(|t| *t < 1.0 - GRID_TOLERANCE)
            .map(|t| round_to(t, decimals))
            .collect();
        values.push(1.0);
        values.dedup();
        Ok(Self {
            step,
            decimals,
            values,
        })
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    /// Precision used for slider labels and hover text.
    pub fn decimals(&self) -> usize {
        self.decimals
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Candidates for optimization: the grid without its two endpoints.
    pub fn interior(&self) -> &[f64] {
        if self.values.len() <= 2 {
            &[]
        } else {
            &self.values[1..self.values.len() - 1]
        }
    }

    pub fn label(&self, index: usize) -> String {
        format_label(self.values[index], self.decimals)
    }

    pub fn labels(&self) -> Vec<String> {
        (0..self.len()).map(|i| self.label(i)).collect()
    }

    /// Midpoint of the grid span, used to pick label sides in line charts.
    pub fn middle(&self) -> f64 {
        match (self.values.first(), self.values.last()) {
            (Some(first), Some(last)) => (first + last) / 2.0,
            _ => 0.5,
        }
    }
}
