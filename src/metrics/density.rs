//! Density curves of the predicted probabilities of one true class.

use std::str::FromStr;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::distribution::{Continuous, Normal};
use statrs::statistics::Statistics;

use crate::data::utils::linspace;
use crate::error::{BctoolsError, Result};

/// Number of evaluation points per curve.
pub const CURVE_POINTS: usize = 500;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurveType {
    /// Gaussian kernel density estimate with Scott's bandwidth.
    #[default]
    Kde,
    /// Normal pdf fitted by maximum likelihood.
    Normal,
}

impl FromStr for CurveType {
    type Err = BctoolsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kde" => Ok(CurveType::Kde),
            "normal" => Ok(CurveType::Normal),
            other => Err(BctoolsError::value(format!(
                "curve_type must be 'kde' or 'normal', got '{other}'"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DensityCurve {
    /// Ascending evaluation points between the sample minimum and maximum.
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl DensityCurve {
    /// Index of the first point with `x >= threshold`.
    pub fn split_index(&self, threshold: f64) -> usize {
        self.x.partition_point(|&x| x < threshold)
    }

    pub fn max_density(&self) -> f64 {
        self.y.iter().copied().fold(0.0, f64::max)
    }
}

fn normal(mean: f64, std_dev: f64) -> Result<Normal> {
    Normal::new(mean, std_dev).map_err(|e| BctoolsError::value(format!("normal density: {e}")))
}

pub fn density_curve(values: &[f64], curve_type: CurveType) -> Result<DensityCurve> {
    if values.len() < 2 {
        return Err(BctoolsError::value(format!(
            "a density curve needs at least two probabilities per class, got {}",
            values.len()
        )));
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if min == max {
        return Err(BctoolsError::value(
            "a density curve needs probabilities with a non-zero spread",
        ));
    }
    let x = linspace(min, max, CURVE_POINTS);
    let y = match curve_type {
        CurveType::Kde => {
            let n = values.len() as f64;
            let bandwidth = values.iter().std_dev() * n.powf(-0.2);
            let kernel = normal(0.0, 1.0)?;
            x.par_iter()
                .map(|&xi| {
                    values
                        .iter()
                        .map(|&v| kernel.pdf((xi - v) / bandwidth))
                        .sum::<f64>()
                        / (n * bandwidth)
                })
                .collect()
        }
        CurveType::Normal => {
            let fitted = normal(values.iter().mean(), values.iter().population_std_dev())?;
            x.iter().map(|&xi| fitted.pdf(xi)).collect()
        }
    };
    Ok(DensityCurve { x, y })
}
