use plotly::common::{DashType, Line, Mode};
use plotly::layout::Margin;
use plotly::{Layout, Scatter};
use serde_json::{json, Value};
use tracing::info;

use crate::config::{PrCurveOptions, RocCurveOptions};
use crate::data::sample::Dataset;
use crate::data::utils::linspace;
use crate::error::{BctoolsError, Result};
use crate::metrics::curves::{precision_recall_curve, roc_curve};
use crate::metrics::threshold::fbeta;
use crate::plot::figure::{Figure, PlotOutput};
use crate::plot::frames::TraceOwner;

const BASELINE_COLOR: &str = "#20313e";
const ISO_COLOR: &str = "#4C78A8";
const ISO_F_SCORES: [f64; 4] = [0.2, 0.4, 0.6, 0.8];

fn square_layout() -> Layout {
    Layout::new()
        .width(550)
        .height(550)
        .margin(Margin::new().left(40).right(40).top(40).bottom(40))
}

fn axis(title: &str, range: [f64; 2]) -> Value {
    json!({ "title": { "text": title }, "range": range })
}

const ISO_RECALL_POINTS: usize = 50;
/// Recall grid index the ISO-Fβ labels are anchored at.
const ISO_LABEL_INDEX: usize = 45;

fn iso_f_precision(f: f64, beta: f64, recall: f64) -> f64 {
    let b2 = beta * beta;
    f * recall / (recall + b2 * (recall - f))
}

/// Recall/precision points of the ISO-Fβ curve `f`, restricted to precision >= 0.
fn iso_f_curve(f: f64, beta: f64) -> (Vec<f64>, Vec<f64>) {
    linspace(0.01, 1.0, ISO_RECALL_POINTS)
        .into_iter()
        .map(|x| (x, iso_f_precision(f, beta, x)))
        .filter(|(_, y)| *y >= 0.0)
        .unzip()
}

/// Height of the label of ISO-Fβ curve `f`, taken on the full recall grid.
fn iso_f_label_y(f: f64, beta: f64) -> f64 {
    let recall = linspace(0.01, 1.0, ISO_RECALL_POINTS)[ISO_LABEL_INDEX];
    iso_f_precision(f, beta, recall) + 0.01
}

/// Precision-recall curve with ISO-Fβ curves and the positive-rate baseline.
/// Returns the area under the curve.
pub fn curve_pr_plot(
    true_y: &[u8],
    predicted_proba: &[f64],
    options: &PrCurveOptions,
) -> Result<PlotOutput<f64>> {
    let beta = options.beta;
    if !beta.is_finite() || beta < 0.0 {
        return Err(BctoolsError::value(format!(
            "beta should be >= 0 in the F-beta score, got {beta}"
        )));
    }
    let dataset = Dataset::new(true_y.to_vec(), predicted_proba.to_vec())?;
    let curve = precision_recall_curve(&dataset)?;
    let area = curve.auc();
    let baseline = dataset.positives() as f64 / dataset.len() as f64;

    // The trailing sentinel point has no threshold.
    let mut custom: Vec<Value> = curve
        .thresholds
        .iter()
        .zip(&curve.counts)
        .map(|(t, c)| Ok(json!([t, fbeta(c, beta)?])))
        .collect::<Result<_>>()?;
    custom.push(json!([Value::Null, 0.0]));

    let mut figure = Figure::new(square_layout(), options.show_display_modebar)?;
    let pr = Scatter::new(curve.recall.clone(), curve.precision.clone())
        .mode(Mode::Lines)
        .name(&format!("PR Curve (AUC={area:.2})"))
        .show_legend(true)
        .hover_template(&format!(
            "Threshold: %{{customdata[0]:.4f}} <br>Precision: %{{y:.4f}} <br>Recall: %{{x:.4f}}  <br>F{beta} score: %{{customdata[1]:.4f}} <extra></extra>"
        ));
    let index = figure.add_trace(&pr, TraceOwner::Static)?;
    figure.set_trace_attr(index, "customdata", Value::Array(custom));

    for (i, &f) in ISO_F_SCORES.iter().enumerate() {
        let (x, y) = iso_f_curve(f, beta);
        let label_y = iso_f_label_y(f, beta);
        let iso = Scatter::new(x, y)
            .mode(Mode::Lines)
            .name(&format!("ISO-f{beta} Curves"))
            .legend_group("iso_curves")
            .show_legend(i == 0)
            .hover_template("")
            .line(Line::new().color(ISO_COLOR).dash(DashType::Dot).width(0.8));
        let index = figure.add_trace(&iso, TraceOwner::Static)?;
        figure.set_trace_attr(index, "hoverinfo", json!("skip"));
        figure.add_annotation(json!({
            "x": 0.90,
            "y": label_y,
            "text": format!("f{beta}={f:.1}"),
            "showarrow": false,
            "yshift": 10,
        }));
    }

    let baseline_trace = Scatter::new(vec![-1.0, 2.0], vec![baseline, baseline])
        .mode(Mode::Lines)
        .name("Baseline")
        .show_legend(true)
        .line(Line::new().dash(DashType::Dash).color(BASELINE_COLOR));
    figure.add_trace(&baseline_trace, TraceOwner::Static)?;

    figure.set_title(&format!("<b>{}</b>", options.title));
    figure.set_layout("xaxis", axis("Recall", [0.0, 1.03]));
    figure.set_layout("yaxis", axis("Precision", [0.0, 1.03]));
    figure.set_layout(
        "legend",
        json!({ "yanchor": "top", "y": 0.18, "xanchor": "left", "x": 0.03, "font": { "size": 9 } }),
    );
    info!(auc = area, "built precision-recall curve");
    Ok(PlotOutput { figure, data: area })
}

/// ROC curve with the chance diagonal. Returns the area under the curve.
pub fn curve_roc_plot(
    true_y: &[u8],
    predicted_proba: &[f64],
    options: &RocCurveOptions,
) -> Result<PlotOutput<f64>> {
    let dataset = Dataset::new(true_y.to_vec(), predicted_proba.to_vec())?;
    let curve = roc_curve(&dataset)?;
    let area = curve.auc();

    let mut figure = Figure::new(square_layout(), options.show_display_modebar)?;
    // The first threshold is +inf, which JSON cannot carry.
    let custom: Vec<Value> = curve
        .thresholds
        .iter()
        .map(|t| if t.is_finite() { json!(t) } else { json!("inf") })
        .collect();
    let roc = Scatter::new(curve.fpr.clone(), curve.tpr.clone())
        .mode(Mode::Lines)
        .name(&format!("ROC Curve (AUC={area:.3})"))
        .show_legend(true)
        .hover_template(
            "Threshold: %{customdata:.4f} <br>False Positive Rate: %{x:.4f} <br>True Positive Rate: %{y:.4f}<extra></extra>",
        );
    let index = figure.add_trace(&roc, TraceOwner::Static)?;
    figure.set_trace_attr(index, "customdata", Value::Array(custom));

    let diagonal = Scatter::new(vec![-1.0, 2.0], vec![-1.0, 2.0])
        .mode(Mode::Lines)
        .name("Baseline")
        .show_legend(true)
        .line(Line::new().dash(DashType::Dash).color(BASELINE_COLOR));
    figure.add_trace(&diagonal, TraceOwner::Static)?;

    figure.set_title(&format!("<b>{}</b>", options.title));
    figure.set_layout("xaxis", axis("False Positive Rate", [-0.03, 1.0]));
    figure.set_layout("yaxis", axis("True Positive Rate", [0.0, 1.03]));
    figure.set_layout(
        "legend",
        json!({ "yanchor": "top", "y": 0.18, "xanchor": "right", "x": 0.97, "font": { "size": 9 } }),
    );
    info!(auc = area, "built ROC curve");
    Ok(PlotOutput { figure, data: area })
}
