//! Confusion-matrix dashboard: invariant metrics, optimized thresholds and,
//! per threshold, a metrics table and an annotated confusion heatmap.

use plotly::Layout;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::compute::grid::ThresholdGrid;
use crate::compute::sweep::{sweep, AggregationMode, ClassTotals, ConfusionSnapshot};
use crate::config::{ConfusionMatrixOptions, Currency};
use crate::data::columnar::{ColumnarTable, ToFrame};
use crate::data::sample::{ConfusionClass, CostSpecification, Dataset};
use crate::data::utils::{format_count, format_thousands, round_to, share};
use crate::error::Result;
use crate::metrics::curves::InvariantMetrics;
use crate::metrics::threshold::ThresholdMetrics;
use crate::optimize::request::{OptimalThreshold, ThresholdOptimizer};
use crate::plot::figure::{Domain, Figure, HeatmapTrace, PlotOutput, TableTrace};
use crate::plot::frames::{compose_title, FrameContent, TraceOwner};

const TABLE_DECIMALS: usize = 4;

/// Heatmap cell layout: rows are actual True/False (top to bottom), columns
/// are predicted False/True.
const HEATMAP_CELLS: [[ConfusionClass; 2]; 2] = [
    [ConfusionClass::FalseNegative, ConfusionClass::TruePositive],
    [ConfusionClass::TrueNegative, ConfusionClass::FalsePositive],
];

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ThresholdMetricsRow {
    pub threshold: f64,
    pub metrics: ThresholdMetrics,
}

impl ToFrame for [ThresholdMetricsRow] {
    fn to_frame(&self) -> Result<ColumnarTable> {
        let mut columns = vec![(
            "threshold".to_string(),
            self.iter().map(|row| row.threshold).collect(),
        )];
        for (i, name) in ThresholdMetrics::NAMES.iter().enumerate() {
            columns.push((
                name.to_string(),
                self.iter().map(|row| row.metrics.values()[i]).collect(),
            ));
        }
        ColumnarTable::from_f64_columns(columns)
    }
}

impl ToFrame for InvariantMetrics {
    fn to_frame(&self) -> Result<ColumnarTable> {
        ColumnarTable::with_label_column(
            "invariant_metric",
            Self::NAMES.iter().map(|n| n.to_string()).collect(),
            vec![("value".to_string(), self.values().to_vec())],
        )
    }
}

/// Tables returned by [`confusion_matrix_plot`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConfusionDashboard {
    pub threshold_metrics: Vec<ThresholdMetricsRow>,
    pub invariant_metrics: InvariantMetrics,
    /// `None` when no optimization was requested.
    pub optimal_thresholds: Option<Vec<OptimalThreshold>>,
}

fn table_domain(column: usize) -> Domain {
    const WIDTH: f64 = 0.98 / 3.0;
    let start = column as f64 * (WIDTH + 0.01);
    Domain {
        x: [round_to(start, 4), round_to(start + WIDTH, 4)],
        y: [0.5, 1.0],
    }
}

fn rounded_cells(values: &[f64]) -> Vec<Value> {
    values
        .iter()
        .map(|v| json!(round_to(*v, TABLE_DECIMALS)))
        .collect()
}

/// Hover/text template shared by the cell text and the hover label.
fn cell_template(mode: &AggregationMode<'_>, currency: &Currency) -> String {
    let mut template = "%{z} (%{text[2]:.2~%})".to_string();
    let mut last = 2;
    if mode.has_amounts() {
        template.push_str(&format!(
            "<br>Amount: {currency}%{{text[3]:~s}} (%{{text[4]:.2~%}})"
        ));
        last += 2;
    }
    if mode.has_costs() {
        template.push_str(&format!(
            "<br>Cost: {currency}%{{text[{}]:~s}} (%{{text[{}]:.2~%}})",
            last + 1,
            last + 2
        ));
    }
    template
}

/// Per-cell text arrays `[short, long, count share, amount, amount share,
/// cost, cost share]`; amount and cost entries only when aggregated.
fn cell_text(snapshot: &ConfusionSnapshot, n: usize, total_amount: f64) -> Vec<Vec<Vec<Value>>> {
    let total_cost = snapshot.costs.map(|c| c.total()).unwrap_or(0.0);
    HEATMAP_CELLS
        .iter()
        .map(|row| {
            row.iter()
                .map(|&class| {
                    let mut text = vec![
                        json!(class.short()),
                        json!(class.long()),
                        json!(share(snapshot.counts.get(class) as f64, n as f64)),
                    ];
                    let mut push = |totals: &Option<ClassTotals>, base: f64| {
                        if let Some(totals) = totals {
                            text.push(json!(totals.get(class)));
                            text.push(json!(share(totals.get(class), base)));
                        }
                    };
                    push(&snapshot.amounts, total_amount);
                    push(&snapshot.costs, total_cost);
                    text
                })
                .collect()
        })
        .collect()
}

/// Dashboard using the GHOST optimizer configured in `options`.
pub fn confusion_matrix_plot(
    true_y: &[u8],
    predicted_proba: &[f64],
    amounts: Option<&[f64]>,
    costs: Option<&CostSpecification>,
    options: &ConfusionMatrixOptions,
) -> Result<PlotOutput<ConfusionDashboard>> {
    confusion_matrix_plot_with(true_y, predicted_proba, amounts, costs, options, &options.ghost)
}

/// Dashboard with a caller-provided threshold optimizer.
pub fn confusion_matrix_plot_with(
    true_y: &[u8],
    predicted_proba: &[f64],
    amounts: Option<&[f64]>,
    costs: Option<&CostSpecification>,
    options: &ConfusionMatrixOptions,
    optimizer: &dyn ThresholdOptimizer,
) -> Result<PlotOutput<ConfusionDashboard>> {
    let mut dataset = Dataset::new(true_y.to_vec(), predicted_proba.to_vec())?;
    if let Some(amounts) = amounts {
        dataset = dataset.with_amounts(amounts.to_vec())?;
    }
    let grid = ThresholdGrid::new(options.threshold_step)?;
    let resolved = costs.map(|c| c.resolve(dataset.len())).transpose()?;
    let to_optimize = options
        .optimize_threshold
        .as_ref()
        .map(|request| request.resolve(resolved.is_some()))
        .transpose()?;

    let mode = AggregationMode::from_inputs(dataset.amounts(), resolved.as_ref());
    let n = dataset.len();
    let currency = &options.currency;
    let snapshots = sweep(&dataset, &grid, mode)?;
    let invariant = InvariantMetrics::compute(&dataset)?;
    let optimal = to_optimize
        .map(|metrics| optimizer.optimize(&dataset, resolved.as_ref(), &grid, &metrics))
        .transpose()?;

    let mut subtitle = format!("Total obs: {}", format_count(n));
    let total_amount = dataset.total_amount().unwrap_or(0.0);
    if let Some(total) = dataset.total_amount() {
        subtitle.push_str(&format!("<br>Total amount: {currency}{}", format_thousands(total, 2)));
        if total == 0.0 {
            warn!("total amount is 0, amount percentages are reported as 0%");
        }
    }
    if snapshots.iter().any(|s| s.total_cost() == Some(0.0)) {
        warn!("total cost is 0 at some thresholds, cost percentages are reported as 0% there");
    }

    let mut figure = Figure::new(Layout::new().height(600), options.show_display_modebar)?;
    figure.add_trace(
        &TableTrace::new(
            vec!["Invariant Metric".into(), "Value".into()],
            vec![
                InvariantMetrics::NAMES.iter().map(|n| json!(n)).collect(),
                rounded_cells(&invariant.values()),
            ],
        )
        .domain(table_domain(1)),
        TraceOwner::Static,
    )?;
    let optimal_table = match &optimal {
        Some(rows) => TableTrace::new(
            vec!["Optimized Metric".into(), "Optimal Threshold".into()],
            vec![
                rows.iter().map(|r| json!(r.metric.name())).collect(),
                rows.iter().map(|r| json!(r.threshold)).collect(),
            ],
        ),
        None => TableTrace::empty(),
    };
    figure.add_trace(&optimal_table.domain(table_domain(2)), TraceOwner::Static)?;

    let template = cell_template(&mode, currency);
    let mut threshold_metrics = Vec::with_capacity(snapshots.len());
    let mut frames = Vec::with_capacity(snapshots.len());
    for (k, snapshot) in snapshots.iter().enumerate() {
        let metrics = ThresholdMetrics::from_counts(&snapshot.counts);
        threshold_metrics.push(ThresholdMetricsRow {
            threshold: snapshot.threshold,
            metrics,
        });
        figure.add_trace(
            &TableTrace::new(
                vec!["Variable Metric".into(), "Value".into()],
                vec![
                    ThresholdMetrics::NAMES.iter().map(|n| json!(n)).collect(),
                    rounded_cells(&metrics.values()),
                ],
            )
            .domain(table_domain(0)),
            TraceOwner::Frame(k),
        )?;
        let heatmap = HeatmapTrace {
            kind: "heatmap",
            z: HEATMAP_CELLS
                .iter()
                .map(|row| row.iter().map(|&c| snapshot.counts.get(c) as f64).collect())
                .collect(),
            x: vec!["False".into(), "True".into()],
            y: vec!["True".into(), "False".into()],
            text: cell_text(snapshot, n, total_amount),
            texttemplate: format!("<b>%{{text[0]}}</b><br>{template}"),
            hovertemplate: format!("<b>%{{text[1]}}</b><br>Count: {template}"),
            name: format!("threshold: {}", grid.label(k)),
            colorscale: "Blues",
            showscale: false,
            xaxis: "x",
            yaxis: "y",
        };
        figure.add_trace(&heatmap, TraceOwner::Frame(k))?;

        let cost_line = snapshot
            .total_cost()
            .map(|c| format!("<br>Total cost: {currency}{}", format_thousands(c, 2)))
            .unwrap_or_default();
        frames.push(FrameContent::new(
            grid.label(k),
            compose_title(&options.title, &format!("{subtitle}{cost_line}")),
        ));
    }
    debug!(traces = figure.traces().len(), "confusion dashboard traces built");
    figure.attach_frames(frames)?;
    figure.set_layout(
        "xaxis",
        json!({ "domain": [0.0, 1.0], "anchor": "y", "title": { "text": "Predicted" } }),
    );
    figure.set_layout(
        "yaxis",
        json!({ "domain": [0.0, 0.5], "anchor": "x", "title": { "text": "Actual" } }),
    );
    info!(
        samples = n,
        thresholds = grid.len(),
        optimized = optimal.is_some(),
        "built confusion matrix dashboard"
    );
    Ok(PlotOutput {
        figure,
        data: ConfusionDashboard {
            threshold_metrics,
            invariant_metrics: invariant,
            optimal_thresholds: optimal,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sample::ResolvedCosts;
    use crate::error::BctoolsError;
    use crate::optimize::request::{OptimizeMetric, OptimizeRequest};

    const TRUE_Y: [u8; 4] = [0, 0, 1, 1];
    const PROBA: [f64; 4] = [0.1, 0.4, 0.35, 0.8];

    fn options() -> ConfusionMatrixOptions {
        ConfusionMatrixOptions {
            threshold_step: 0.1,
            ..ConfusionMatrixOptions::default()
        }
    }

    fn fp_fn_costs() -> CostSpecification {
        CostSpecification::new()
            .with(ConfusionClass::FalsePositive, 10.0)
            .with(ConfusionClass::FalseNegative, 50.0)
    }

    /// Returns the midpoint of the interior grid for every metric.
    struct Midpoint;

    impl ThresholdOptimizer for Midpoint {
        fn optimize(
            &self,
            _dataset: &Dataset,
            _costs: Option<&ResolvedCosts>,
            grid: &ThresholdGrid,
            metrics: &[OptimizeMetric],
        ) -> Result<Vec<OptimalThreshold>> {
            let interior = grid.interior();
            Ok(metrics
                .iter()
                .map(|&metric| OptimalThreshold {
                    metric,
                    threshold: interior[interior.len() / 2],
                })
                .collect())
        }
    }

    #[test]
    fn scenario_metrics_at_one_half() {
        let out = confusion_matrix_plot(&TRUE_Y, &PROBA, None, None, &options()).unwrap();
        let row = out.data.threshold_metrics[5];
        assert_eq!(row.threshold, 0.5);
        assert_eq!(row.metrics.accuracy, 0.75);
        assert_eq!(row.metrics.precision, 1.0);
        assert_eq!(row.metrics.recall, 0.5);
        assert!(out.data.optimal_thresholds.is_none());
        assert!((out.data.invariant_metrics.roc_auc - 0.75).abs() < 1e-12);
    }

    #[test]
    fn trace_layout_is_two_static_tables_then_pairs() {
        let out = confusion_matrix_plot(&TRUE_Y, &PROBA, None, None, &options()).unwrap();
        let traces = out.figure.traces();
        assert_eq!(traces.len(), 2 + 2 * 11);
        assert_eq!(traces[1]["header"]["values"].as_array().unwrap().len(), 0);
        assert_eq!(traces[2]["type"], "table");
        assert_eq!(traces[3]["type"], "heatmap");
        // threshold 0.5 heatmap: rows [FN, TP], [TN, FP]
        let z = &traces[3 + 2 * 5]["z"];
        assert_eq!(z[0][0], 1.0);
        assert_eq!(z[0][1], 1.0);
        assert_eq!(z[1][0], 2.0);
        assert_eq!(z[1][1], 0.0);
        let visible: Vec<bool> = traces.iter().map(|t| t["visible"].as_bool().unwrap()).collect();
        assert_eq!(visible.iter().filter(|v| **v).count(), 4);
    }

    #[test]
    fn costs_extend_templates_and_titles() {
        let costs = fp_fn_costs();
        let amounts = [100.0, 200.0, 300.0, 400.0];
        let options = ConfusionMatrixOptions {
            currency: Currency::new("$"),
            ..options()
        };
        let out = confusion_matrix_plot(&TRUE_Y, &PROBA, Some(&amounts), Some(&costs), &options).unwrap();
        let frames = out.figure.frames().unwrap();
        let title = &frames.frames()[5].title;
        assert!(title.contains("Total obs: 4"));
        assert!(title.contains("Total amount: &#36;1,000.00"));
        assert!(title.contains("Total cost: &#36;50.00"));
        let heatmap = &out.figure.traces()[3];
        let template = heatmap["texttemplate"].as_str().unwrap();
        assert!(template.contains("%{text[4]:.2~%}"));
        assert!(template.contains("%{text[6]:.2~%}"));
        assert_eq!(heatmap["text"][0][0].as_array().unwrap().len(), 7);
    }

    #[test]
    fn cost_only_template_uses_slots_three_and_four() {
        let template = cell_template(
            &AggregationMode::CostOnly(&fp_fn_costs().resolve(4).unwrap()),
            &Currency::default(),
        );
        assert_eq!(
            template,
            "%{z} (%{text[2]:.2~%})<br>Cost: €%{text[3]:~s} (%{text[4]:.2~%})"
        );
    }

    #[test]
    fn zero_total_amount_gives_zero_shares() {
        let out = confusion_matrix_plot(&TRUE_Y, &PROBA, Some(&[0.0; 4]), None, &options()).unwrap();
        let text = &out.figure.traces()[3]["text"];
        assert_eq!(text[0][1][4], 0.0);
    }

    #[test]
    fn rebuilding_gives_identical_tables() {
        let a = confusion_matrix_plot(&TRUE_Y, &PROBA, None, None, &options()).unwrap();
        let b = confusion_matrix_plot(&TRUE_Y, &PROBA, None, None, &options()).unwrap();
        assert_eq!(a.data, b.data);
        assert_eq!(
            serde_json::to_string(&a.data).unwrap(),
            serde_json::to_string(&b.data).unwrap()
        );
        assert_eq!(a.figure.to_json().unwrap(), b.figure.to_json().unwrap());
    }

    #[test]
    fn custom_optimizer_fills_the_table() {
        let options = ConfusionMatrixOptions {
            optimize_threshold: Some(OptimizeRequest::All),
            ..options()
        };
        let out = confusion_matrix_plot_with(&TRUE_Y, &PROBA, None, None, &options, &Midpoint).unwrap();
        let rows = out.data.optimal_thresholds.unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].threshold, 0.5);
        assert_eq!(out.figure.traces()[1]["cells"]["values"][0][0], "ROC");
    }

    #[test]
    fn cost_optimization_without_costs_fails_before_plotting() {
        let options = ConfusionMatrixOptions {
            optimize_threshold: Some(OptimizeRequest::Metrics(vec![OptimizeMetric::Cost])),
            ..options()
        };
        let err = confusion_matrix_plot(&TRUE_Y, &PROBA, None, None, &options).unwrap_err();
        assert!(matches!(err, BctoolsError::Usage(_)));
    }

    #[test]
    fn tables_convert_to_frames() {
        let out = confusion_matrix_plot(&TRUE_Y, &PROBA, None, None, &options()).unwrap();
        let frame = out.data.threshold_metrics.to_frame().unwrap();
        assert_eq!(frame.len(), 11);
        assert_eq!(frame.column_f64("Accuracy").unwrap()[5], 0.75);
        let invariant = out.data.invariant_metrics.to_frame().unwrap();
        assert_eq!(invariant.column_names(), vec!["invariant_metric", "value"]);
    }
}
