//! Interactive threshold diagnostics for binary classifiers: curves,
//! probability distributions and confusion-matrix views with a threshold
//! slider, exported as plotly figures.

pub mod config;
pub mod error;

pub mod data {
    pub mod columnar;
    pub mod loader;
    pub mod sample;
    pub mod utils;
}

pub mod compute {
    pub mod grid;
    pub mod sweep;
}

pub mod metrics {
    pub mod curves;
    pub mod density;
    pub mod threshold;
}

pub mod optimize {
    pub mod ghost;
    pub mod request;
}

pub mod plot {
    pub mod amount_cost;
    pub mod confusion;
    pub mod curves;
    pub mod distribution;
    pub mod figure;
    pub mod frames;
}

pub use config::{Currency, Settings};
pub use data::columnar::{ColumnarTable, ToFrame};
pub use data::sample::{ConfusionClass, CostSpecification, CostValue, Dataset};
pub use error::{BctoolsError, Result};
pub use optimize::ghost::GhostOptimizer;
pub use optimize::request::{OptimalThreshold, OptimizeMetric, OptimizeRequest, ThresholdOptimizer};
pub use plot::amount_cost::{confusion_linechart_plot, total_amount_cost_plot, ClassSelection};
pub use plot::confusion::{confusion_matrix_plot, confusion_matrix_plot_with, ConfusionDashboard};
pub use plot::curves::{curve_pr_plot, curve_roc_plot};
pub use plot::distribution::{predicted_proba_density_curve_plot, predicted_proba_violin_plot};
pub use plot::figure::{Figure, PlotOutput};
