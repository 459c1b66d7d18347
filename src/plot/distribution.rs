//! Distribution views of the predicted probabilities, split by true class and
//! coloured by confusion class at the selected threshold.

use interp1d::Interp1d;
use plotly::common::{DashType, Fill, Line, Marker, Mode};
use plotly::layout::Margin;
use plotly::{Layout, Scatter};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::compute::grid::ThresholdGrid;
use crate::compute::sweep::{sweep, AggregationMode, ConfusionCounts};
use crate::config::{DensityOptions, ViolinOptions};
use crate::data::sample::{ConfusionClass, Dataset};
use crate::error::{BctoolsError, Result};
use crate::metrics::density::{density_curve, DensityCurve};
use crate::plot::figure::{Figure, PlotOutput, ViolinTrace};
use crate::plot::frames::{compose_title, FrameContent, TraceOwner};

const JITTER_WIDTH: f64 = 0.3;
const THRESHOLD_LINE_COLOR: &str = "#20313e";

pub(crate) fn class_color(class: ConfusionClass) -> &'static str {
    match class {
        ConfusionClass::TrueNegative => "#636EFA",
        ConfusionClass::FalsePositive => "#EF553B",
        ConfusionClass::FalseNegative => "#EF71D9",
        ConfusionClass::TruePositive => "#00CC96",
    }
}

/// Present classes ordered by decreasing count, e.g. `TN: 2,  FN: 1,  TP: 1`.
fn count_summary(counts: &ConfusionCounts) -> String {
    let mut present: Vec<(ConfusionClass, usize)> = ConfusionClass::ALL
        .iter()
        .map(|&c| (c, counts.get(c)))
        .filter(|(_, n)| *n > 0)
        .collect();
    present.sort_by(|a, b| b.1.cmp(&a.1));
    present
        .iter()
        .map(|(c, n)| format!("{c}: {n}"))
        .collect::<Vec<_>>()
        .join(",  ")
}

/// Strip plot of every sample over a violin per true class. Each threshold
/// gets one trace per confusion class present.
pub fn predicted_proba_violin_plot(
    true_y: &[u8],
    predicted_proba: &[f64],
    options: &ViolinOptions,
) -> Result<PlotOutput<()>> {
    let dataset = Dataset::new(true_y.to_vec(), predicted_proba.to_vec())?;
    let grid = ThresholdGrid::new(options.threshold_step)?;
    let snapshots = sweep(&dataset, &grid, AggregationMode::Counts)?;

    let mut rng = StdRng::seed_from_u64(options.jitter_seed);
    let jitter: Vec<f64> = (0..dataset.len())
        .map(|_| rng.gen_range(-JITTER_WIDTH..=JITTER_WIDTH))
        .collect();

    let layout = Layout::new()
        .width(550)
        .height(550)
        .margin(Margin::new().left(40).right(40).top(60).bottom(40));
    let mut figure = Figure::new(layout, options.show_display_modebar)?;
    figure.add_trace(
        &ViolinTrace::new(dataset.true_y().to_vec(), dataset.predicted_proba().to_vec(), "#0D2A63"),
        TraceOwner::Static,
    )?;

    let mut frames = Vec::with_capacity(grid.len());
    for (k, snapshot) in snapshots.iter().enumerate() {
        for class in ConfusionClass::ALL {
            let members: Vec<usize> = (0..dataset.len())
                .filter(|&i| {
                    ConfusionClass::of(
                        dataset.true_y()[i],
                        dataset.predicted_proba()[i] >= snapshot.threshold,
                    ) == class
                })
                .collect();
            if members.is_empty() {
                continue;
            }
            let label = class.actual_label();
            let x: Vec<f64> = members.iter().map(|&i| label as f64 + jitter[i]).collect();
            let y: Vec<f64> = members.iter().map(|&i| dataset.predicted_proba()[i]).collect();
            let custom: Vec<Value> = members.iter().map(|&i| json!([i, label])).collect();
            let strip = Scatter::new(x, y)
                .mode(Mode::Markers)
                .name(class.short())
                .legend_group(class.short())
                .marker(Marker::new().color(class_color(class)).size(options.marker_size))
                .hover_template("Idx = %{customdata[0]}<br>Class = %{customdata[1]}<br>Pred = %{y}<extra></extra>");
            let index = figure.add_trace(&strip, TraceOwner::Frame(k))?;
            figure.set_trace_attr(index, "customdata", Value::Array(custom));
        }
        frames.push(FrameContent::new(
            grid.label(k),
            compose_title(&options.title, &count_summary(&snapshot.counts)),
        ));
    }
    debug!(traces = figure.traces().len(), "violin traces built");
    figure.attach_frames(frames)?;
    figure.set_layout(
        "xaxis",
        json!({ "title": { "text": "True class" }, "tickvals": [0, 1] }),
    );
    figure.set_layout(
        "yaxis",
        json!({ "title": { "text": "Predicted probabilities" }, "type": "log" }),
    );
    figure.set_layout(
        "legend",
        json!({ "font": { "size": 9.5 }, "itemsizing": "constant", "traceorder": "grouped" }),
    );
    info!(thresholds = grid.len(), "built probability violin plot");
    Ok(PlotOutput { figure, data: () })
}

/// Piece of a density curve on one side of the threshold.
#[derive(Clone, Debug, Default, PartialEq)]
struct CurvePiece {
    x: Vec<f64>,
    y: Vec<f64>,
}

/// Points below the threshold and points at or above it. A threshold strictly
/// inside the curve adds an interpolated point to both pieces so they join.
fn split_curve(curve: &DensityCurve, threshold: f64) -> Result<(CurvePiece, CurvePiece)> {
    let (x, y) = (&curve.x, &curve.y);
    let at = curve.split_index(threshold);
    let mut below = CurvePiece {
        x: x[..at].to_vec(),
        y: y[..at].to_vec(),
    };
    let mut above = CurvePiece {
        x: x[at..].to_vec(),
        y: y[at..].to_vec(),
    };
    if at > 0 && at < x.len() && x[at] != threshold {
        let interp = Interp1d::new_sorted(x.clone(), y.clone())
            .map_err(|e| BctoolsError::value(format!("cannot interpolate density curve: {e:?}")))?;
        let joint = interp.interpolate(threshold);
        below.x.push(threshold);
        below.y.push(joint);
        above.x.insert(0, threshold);
        above.y.insert(0, joint);
    }
    Ok((below, above))
}

fn quadrant_label(text: &str, x: f64, yref: &str) -> Value {
    json!({
        "text": text,
        "x": x,
        "y": 0.97,
        "yref": yref,
        "visible": true,
        "font": { "size": 14 },
        "showarrow": false,
    })
}

/// Annotations of one frame: the sliding side labels plus the quadrant
/// labels that have room next to the threshold line.
fn density_annotations(threshold: f64) -> Vec<Value> {
    let sliding = json!({
        "text": "Predicted Negative        Predicted Positive",
        "x": threshold,
        "y": 0.5,
        "yref": "paper",
        "visible": true,
        "font": { "size": 14 },
        "showarrow": false,
    });
    let tn = quadrant_label("TN", 0.025, "y domain");
    let fp = quadrant_label("FP", 0.975, "y domain");
    let fn_ = quadrant_label("FN", 0.025, "y2 domain");
    let tp = quadrant_label("TP", 0.975, "y2 domain");
    if threshold > 0.96 {
        vec![sliding, tn, fn_]
    } else if threshold < 0.04 {
        vec![sliding, fp, tp]
    } else {
        vec![sliding, tn, fp, fn_, tp]
    }
}

/// Density curve of each true class on its own subplot, filled by confusion
/// class at the selected threshold.
pub fn predicted_proba_density_curve_plot(
    true_y: &[u8],
    predicted_proba: &[f64],
    options: &DensityOptions,
) -> Result<PlotOutput<()>> {
    let dataset = Dataset::new(true_y.to_vec(), predicted_proba.to_vec())?;
    let grid = ThresholdGrid::new(options.threshold_step)?;
    let negatives = density_curve(&dataset.proba_of_class(0), options.curve_type)?;
    let positives = density_curve(&dataset.proba_of_class(1), options.curve_type)?;
    let snapshots = sweep(&dataset, &grid, AggregationMode::Counts)?;
    let max_y = negatives.max_density().max(positives.max_density());

    let layout = Layout::new().height(800).margin(Margin::new().top(80));
    let mut figure = Figure::new(layout, options.show_display_modebar)?;
    let mut frames = Vec::with_capacity(grid.len());

    for (k, snapshot) in snapshots.iter().enumerate() {
        let t = snapshot.threshold;
        let (tn, fp) = split_curve(&negatives, t)?;
        let (fn_, tp) = split_curve(&positives, t)?;
        let pieces = [
            (ConfusionClass::TrueNegative, tn, "Negative", "y"),
            (ConfusionClass::FalsePositive, fp, "Negative", "y"),
            (ConfusionClass::FalseNegative, fn_, "Positive", "y2"),
            (ConfusionClass::TruePositive, tp, "Positive", "y2"),
        ];
        for (class, piece, group, yaxis) in pieces {
            let xaxis = if yaxis == "y" { "x" } else { "x2" };
            let trace = Scatter::new(piece.x, piece.y)
                .mode(Mode::Lines)
                .name(class.short())
                .legend_group(group)
                .fill(Fill::ToZeroY)
                .line(Line::new().color(class_color(class)))
                .marker(Marker::new().color(class_color(class)))
                .hover_template(&format!(
                    "Probability: %{{x:.4~}}<br>Count: {}",
                    snapshot.counts.get(class)
                ))
                .x_axis(xaxis)
                .y_axis(yaxis);
            let index = figure.add_trace(&trace, TraceOwner::Frame(k))?;
            figure.set_trace_attr(
                index,
                "legendgrouptitle",
                json!({ "text": format!("{group} class") }),
            );
        }
        for (xaxis, yaxis, show_legend) in [("x", "y", false), ("x2", "y2", true)] {
            let line = Scatter::new(vec![t, t], vec![-1.0, max_y * 1.1])
                .mode(Mode::Lines)
                .name("Threshold")
                .legend_group("threshold")
                .show_legend(show_legend)
                .line(Line::new().dash(DashType::Dash).color(THRESHOLD_LINE_COLOR))
                .x_axis(xaxis)
                .y_axis(yaxis);
            figure.add_trace(&line, TraceOwner::Frame(k))?;
        }
        let c = &snapshot.counts;
        frames.push(
            FrameContent::new(
                grid.label(k),
                compose_title(
                    &options.title,
                    &format!("TN: {}, FP: {}, FN: {}, TP: {}", c.tn, c.fp, c.fn_, c.tp),
                ),
            )
            .with_annotations(density_annotations(t)),
        );
    }
    figure.attach_frames(frames)?;

    let y_range = [0.0, max_y * 1.1];
    figure.set_layout(
        "xaxis",
        json!({ "domain": [0.0, 1.0], "anchor": "y", "matches": "x2", "showticklabels": false, "range": [0.0, 1.0] }),
    );
    figure.set_layout(
        "yaxis",
        json!({ "domain": [0.525, 1.0], "anchor": "x", "title": { "text": "Actual Negatives" }, "range": y_range }),
    );
    figure.set_layout(
        "xaxis2",
        json!({ "domain": [0.0, 1.0], "anchor": "y2", "title": { "text": "Probabilities" }, "range": [0.0, 1.0] }),
    );
    figure.set_layout(
        "yaxis2",
        json!({ "domain": [0.0, 0.475], "anchor": "x2", "title": { "text": "Actual Positives" }, "range": y_range }),
    );
    info!(thresholds = grid.len(), curve = ?options.curve_type, "built probability density plot");
    Ok(PlotOutput { figure, data: () })
}
