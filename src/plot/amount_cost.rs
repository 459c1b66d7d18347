//! Amount and cost views: the per-class confusion line chart and the total
//! amount/cost chart over selected classes.

use std::fmt;
use std::str::FromStr;

use itertools::Itertools;
use plotly::common::{Line, Marker, MarkerSymbol, Mode};
use plotly::layout::Margin;
use plotly::{Layout, Scatter};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::compute::grid::ThresholdGrid;
use crate::compute::sweep::{sweep, AggregationMode, ClassTotals};
use crate::config::{LineChartOptions, TotalAmountCostOptions};
use crate::data::columnar::{ColumnarTable, ToFrame};
use crate::data::sample::{ConfusionClass, CostSpecification, Dataset};
use crate::data::utils::{format_count, format_label, format_thousands, round_to};
use crate::error::{BctoolsError, Result};
use crate::plot::figure::{Figure, PlotOutput};
use crate::plot::frames::{compose_title, FrameContent, TraceOwner};

const SWAP_COLOR: &str = "black";
const MARKER_HOVER_COLOR: &str = "rgb(68, 68, 68)";

/// Subplot of each class in the 2x2 line chart: title, axes, line colors.
struct Subplot {
    class: ConfusionClass,
    xaxis: &'static str,
    yaxis: &'static str,
    amount_color: &'static str,
    cost_color: &'static str,
}

const SUBPLOTS: [Subplot; 4] = [
    Subplot {
        class: ConfusionClass::TrueNegative,
        xaxis: "x",
        yaxis: "y",
        amount_color: "blue",
        cost_color: "rgb(128, 177, 211)",
    },
    Subplot {
        class: ConfusionClass::FalsePositive,
        xaxis: "x2",
        yaxis: "y2",
        amount_color: "red",
        cost_color: "rgb(251, 128, 114)",
    },
    Subplot {
        class: ConfusionClass::FalseNegative,
        xaxis: "x3",
        yaxis: "y3",
        amount_color: "#EF71D9",
        cost_color: "rgb(220, 186, 218)",
    },
    Subplot {
        class: ConfusionClass::TruePositive,
        xaxis: "x4",
        yaxis: "y4",
        amount_color: "#00CC96",
        cost_color: "rgb(141, 211, 199)",
    },
];

/// Confusion classes picked for a total: every class, or an explicit list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SelectionRepr", into = "SelectionRepr")]
pub enum ClassSelection {
    All,
    Classes(Vec<ConfusionClass>),
}

impl ClassSelection {
    /// Selected classes in first-mention order, without duplicates.
    pub fn classes(&self) -> Result<Vec<ConfusionClass>> {
        match self {
            ClassSelection::All => Ok(ConfusionClass::ALL.to_vec()),
            ClassSelection::Classes(list) if list.is_empty() => {
                Err(BctoolsError::value("a class selection needs at least one class"))
            }
            ClassSelection::Classes(list) => Ok(list.iter().copied().unique().collect()),
        }
    }
}

impl FromStr for ClassSelection {
    type Err = BctoolsError;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(ClassSelection::All);
        }
        s.split(',')
            .map(|part| part.parse::<ConfusionClass>())
            .collect::<Result<Vec<_>>>()
            .map(ClassSelection::Classes)
    }
}

impl fmt::Display for ClassSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassSelection::All => write!(f, "all"),
            ClassSelection::Classes(list) => write!(f, "{}", list.iter().map(|c| c.short()).join(",")),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum SelectionRepr {
    One(String),
    Many(Vec<ConfusionClass>),
}

impl TryFrom<SelectionRepr> for ClassSelection {
    type Error = BctoolsError;

    fn try_from(repr: SelectionRepr) -> Result<Self> {
        match repr {
            SelectionRepr::One(text) => text.parse(),
            SelectionRepr::Many(list) => Ok(ClassSelection::Classes(list)),
        }
    }
}

impl From<ClassSelection> for SelectionRepr {
    fn from(selection: ClassSelection) -> Self {
        match selection {
            ClassSelection::All => SelectionRepr::One("all".to_string()),
            ClassSelection::Classes(list) => SelectionRepr::Many(list),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct AmountCostRow {
    pub threshold: f64,
    pub amounts: Option<ClassTotals>,
    pub costs: Option<ClassTotals>,
}

/// Per-threshold amount and cost of every confusion class.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AmountCostTable {
    pub rows: Vec<AmountCostRow>,
}

impl AmountCostTable {
    pub fn thresholds(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.threshold).collect()
    }

    pub fn has_amounts(&self) -> bool {
        self.rows.first().map_or(false, |r| r.amounts.is_some())
    }

    pub fn has_costs(&self) -> bool {
        self.rows.first().map_or(false, |r| r.costs.is_some())
    }

    pub fn amount_series(&self, class: ConfusionClass) -> Option<Vec<f64>> {
        self.rows.iter().map(|r| r.amounts.map(|a| a.get(class))).collect()
    }

    pub fn cost_series(&self, class: ConfusionClass) -> Option<Vec<f64>> {
        self.rows.iter().map(|r| r.costs.map(|c| c.get(class))).collect()
    }

    /// Per-threshold class amounts, when amounts were aggregated.
    pub fn amount_totals(&self) -> Option<Vec<ClassTotals>> {
        self.rows.iter().map(|r| r.amounts).collect()
    }

    pub fn cost_totals(&self) -> Option<Vec<ClassTotals>> {
        self.rows.iter().map(|r| r.costs).collect()
    }

    pub fn total_costs(&self) -> Option<Vec<f64>> {
        self.rows.iter().map(|r| r.costs.map(|c| c.total())).collect()
    }
}

impl ToFrame for AmountCostTable {
    fn to_frame(&self) -> Result<ColumnarTable> {
        let mut columns = vec![("threshold".to_string(), self.thresholds())];
        for class in ConfusionClass::ALL {
            if let Some(series) = self.amount_series(class) {
                columns.push((format!("amount_{}", class.short()), series));
            }
        }
        for class in ConfusionClass::ALL {
            if let Some(series) = self.cost_series(class) {
                columns.push((format!("cost_{}", class.short()), series));
            }
        }
        if let Some(total) = self.total_costs() {
            columns.push(("total_cost".to_string(), total));
        }
        ColumnarTable::from_f64_columns(columns)
    }
}

/// Per-class series of one variable over the selected classes, plus their sum.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SelectedSeries {
    pub classes: Vec<ConfusionClass>,
    pub per_class: Vec<Vec<f64>>,
    pub sum: Vec<f64>,
}

impl SelectedSeries {
    fn select(classes: Vec<ConfusionClass>, totals: &[ClassTotals]) -> Self {
        let per_class = classes
            .iter()
            .map(|&c| totals.iter().map(|t| t.get(c)).collect())
            .collect();
        let sum = totals.iter().map(|t| t.sum_of(&classes)).collect();
        Self {
            classes,
            per_class,
            sum,
        }
    }

    fn label(&self) -> String {
        self.classes.iter().map(|c| c.short()).join(" + ")
    }
}

/// Returned by [`total_amount_cost_plot`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SelectedTotalsTable {
    pub thresholds: Vec<f64>,
    pub amount: Option<SelectedSeries>,
    pub cost: Option<SelectedSeries>,
}

impl ToFrame for SelectedTotalsTable {
    fn to_frame(&self) -> Result<ColumnarTable> {
        let mut columns = vec![("threshold".to_string(), self.thresholds.clone())];
        for (prefix, selected) in [("amount", &self.amount), ("cost", &self.cost)] {
            if let Some(selected) = selected {
                for (class, series) in selected.classes.iter().zip(&selected.per_class) {
                    columns.push((format!("{prefix}_{}", class.short()), series.clone()));
                }
                columns.push((format!("{prefix}_sum"), selected.sum.clone()));
            }
        }
        ColumnarTable::from_f64_columns(columns)
    }
}

/// Returned by [`confusion_linechart_plot`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LineChartOutput {
    pub table: AmountCostTable,
    /// Sum of the amounts rounded to 2 places, when amounts are given.
    pub total_amount: Option<f64>,
}

struct AmountCostSweep {
    dataset: Dataset,
    grid: ThresholdGrid,
    table: AmountCostTable,
}

fn amount_cost_sweep(
    true_y: &[u8],
    predicted_proba: &[f64],
    amounts: Option<&[f64]>,
    costs: Option<&CostSpecification>,
    threshold_step: f64,
) -> Result<AmountCostSweep> {
    if amounts.is_none() && costs.is_none() {
        return Err(BctoolsError::usage("at least one of amounts and costs must be given"));
    }
    let mut dataset = Dataset::new(true_y.to_vec(), predicted_proba.to_vec())?;
    if let Some(amounts) = amounts {
        dataset = dataset.with_amounts(amounts.to_vec())?;
    }
    let grid = ThresholdGrid::new(threshold_step)?;
    let resolved = costs.map(|c| c.resolve(dataset.len())).transpose()?;
    let mode = AggregationMode::from_inputs(dataset.amounts(), resolved.as_ref());
    let rows = sweep(&dataset, &grid, mode)?
        .into_iter()
        .map(|s| AmountCostRow {
            threshold: s.threshold,
            amounts: s.amounts,
            costs: s.costs,
        })
        .collect();
    Ok(AmountCostSweep {
        dataset,
        grid,
        table: AmountCostTable { rows },
    })
}

/// Points where the sign of `a - b` changes between consecutive thresholds,
/// reported at the later threshold with the value of `b`.
fn swaps(thresholds: &[f64], a: &[f64], b: &[f64]) -> Vec<(f64, f64)> {
    thresholds
        .iter()
        .zip(a.iter().zip(b))
        .tuple_windows()
        .filter_map(|((_, (a0, b0)), (t1, (a1, b1)))| {
            let (d0, d1) = (a0 - b0, a1 - b1);
            ((d0 < 0.0 && d1 >= 0.0) || (d0 > 0.0 && d1 <= 0.0)).then_some((*t1, *b1))
        })
        .collect()
}

fn swap_labels(points: &[(f64, f64)], decimals: usize) -> String {
    points.iter().map(|(t, _)| format_label(*t, decimals)).join(", ")
}

fn swap_markers(points: &[(f64, f64)]) -> Box<Scatter<f64, f64>> {
    let (x, y): (Vec<f64>, Vec<f64>) = points.iter().copied().unzip();
    Scatter::new(x, y)
        .mode(Mode::Markers)
        .show_legend(false)
        .marker(Marker::new().symbol(MarkerSymbol::Diamond).size(8).color(SWAP_COLOR))
        .hover_template("%{x}<extra></extra>")
}

fn midpoint(series: &[f64]) -> (f64, f64) {
    let max = series.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = series.iter().copied().fold(f64::INFINITY, f64::min);
    ((max + min) / 2.0, min)
}

/// Label side for a marker at `y`: above when in the lower half of the line.
fn vertical_side(y: f64, middle_y: f64) -> &'static str {
    if y < middle_y {
        "top"
    } else {
        "bottom"
    }
}

/// Text positions of the amount and cost markers of one subplot. Close
/// markers get opposite sides; otherwise each follows its own half.
fn paired_sides(amount: f64, cost: f64, middle_y: f64, unit_y: f64) -> (&'static str, &'static str) {
    if (amount - cost).abs() < unit_y {
        if amount > cost {
            ("top", "bottom")
        } else {
            ("bottom", "top")
        }
    } else {
        (vertical_side(amount, middle_y), vertical_side(cost, middle_y))
    }
}

fn line_chart_layout(figure: &mut Figure) {
    let columns = [[0.0, 0.45], [0.55, 1.0]];
    let rows = [[0.58, 1.0], [0.0, 0.42]];
    for (i, subplot) in SUBPLOTS.iter().enumerate() {
        let (row, col) = (i / 2, i % 2);
        let suffix = if i == 0 { String::new() } else { (i + 1).to_string() };
        let mut xaxis = json!({ "domain": columns[col], "anchor": subplot.yaxis });
        let mut yaxis = json!({ "domain": rows[row], "anchor": subplot.xaxis });
        if row == 0 {
            xaxis["matches"] = json!(SUBPLOTS[i + 2].xaxis);
            xaxis["showticklabels"] = json!(false);
        } else {
            xaxis["title"] = json!({ "text": "Threshold", "font": { "size": 12 } });
        }
        if col == 0 {
            yaxis["title"] = json!({ "text": "Amount/Cost", "font": { "size": 12 } });
        }
        figure.set_layout(&format!("xaxis{suffix}"), xaxis);
        figure.set_layout(&format!("yaxis{suffix}"), yaxis);
        figure.add_annotation(json!({
            "text": subplot.class.long(),
            "x": (columns[col][0] + columns[col][1]) / 2.0,
            "y": rows[row][1] + 0.04,
            "xref": "paper",
            "yref": "paper",
            "xanchor": "center",
            "yanchor": "bottom",
            "showarrow": false,
            "font": { "size": 16 },
        }));
    }
}

fn value_line(x: &[f64], y: Vec<f64>, subplot: &Subplot, color: &'static str, hover: String) -> Box<Scatter<f64, f64>> {
    Scatter::new(x.to_vec(), y)
        .mode(Mode::Lines)
        .show_legend(false)
        .line(Line::new().color(color))
        .hover_template(&hover)
        .x_axis(subplot.xaxis)
        .y_axis(subplot.yaxis)
}

/// One labelled marker at the selected threshold.
#[allow(clippy::too_many_arguments)]
fn threshold_marker(
    figure: &mut Figure,
    (threshold, y): (f64, f64),
    subplot: &Subplot,
    color: &'static str,
    text_template: String,
    position: String,
    decimals: usize,
    frame: usize,
) -> Result<()> {
    let marker = Scatter::new(vec![threshold], vec![y])
        .mode(Mode::MarkersText)
        .show_legend(false)
        .name(&format_label(threshold, decimals))
        .marker(Marker::new().color(color).size(8))
        .hover_template(&format!("%{{x:.{decimals}f}}<extra></extra>"))
        .x_axis(subplot.xaxis)
        .y_axis(subplot.yaxis);
    let index = figure.add_trace(&marker, TraceOwner::Frame(frame))?;
    figure.set_trace_attr(index, "texttemplate", json!(text_template));
    figure.set_trace_attr(index, "textposition", json!(position));
    figure.set_trace_attr(index, "hoverlabel", json!({ "bgcolor": MARKER_HOVER_COLOR }));
    Ok(())
}

/// Four subplots, one per confusion class, with the amount and/or cost of the
/// class against the threshold and a marker on the selected threshold.
pub fn confusion_linechart_plot(
    true_y: &[u8],
    predicted_proba: &[f64],
    amounts: Option<&[f64]>,
    costs: Option<&CostSpecification>,
    options: &LineChartOptions,
) -> Result<PlotOutput<LineChartOutput>> {
    let AmountCostSweep {
        dataset,
        grid,
        table,
    } = amount_cost_sweep(true_y, predicted_proba, amounts, costs, options.threshold_step)?;
    let currency = &options.currency;
    let decimals = grid.decimals();
    let thresholds = table.thresholds();
    let middle_x = grid.middle();

    let mut subtitle = format!("Total obs: {}", format_count(dataset.len()));
    if let Some(total) = dataset.total_amount() {
        subtitle.push_str(&format!("<br>Total amount: {currency}{}", format_thousands(total, 2)));
    }

    let layout = Layout::new()
        .height(600)
        .margin(Margin::new().top(125));
    let mut figure = Figure::new(layout, options.show_display_modebar)?;
    line_chart_layout(&mut figure);
    figure.set_layout("hovermode", json!("x"));

    // (amount, cost) series per subplot; either may be absent.
    let series: Vec<(Option<Vec<f64>>, Option<Vec<f64>>)> = SUBPLOTS
        .iter()
        .map(|s| (table.amount_series(s.class), table.cost_series(s.class)))
        .collect();
    let mut bands = Vec::with_capacity(SUBPLOTS.len());
    for (subplot, (amount, cost)) in SUBPLOTS.iter().zip(&series) {
        let mut combined = Vec::new();
        if let Some(amount) = amount {
            figure.add_trace(
                &value_line(&thresholds, amount.clone(), subplot, subplot.amount_color, format!("amount: {currency}%{{y}}<extra></extra>")),
                TraceOwner::Static,
            )?;
            combined.extend_from_slice(amount);
        }
        if let Some(cost) = cost {
            let color = if amount.is_some() {
                subplot.cost_color
            } else {
                subplot.amount_color
            };
            figure.add_trace(
                &value_line(&thresholds, cost.clone(), subplot, color, format!("cost: {currency}%{{y}}<extra></extra>")),
                TraceOwner::Static,
            )?;
            combined.extend_from_slice(cost);
        }
        if let (Some(amount), Some(cost)) = (amount, cost) {
            let points = swaps(&thresholds, amount, cost);
            figure.add_trace(
                &swap_markers(&points).x_axis(subplot.xaxis).y_axis(subplot.yaxis),
                TraceOwner::Static,
            )?;
            if !points.is_empty() {
                figure.add_annotation(json!({
                    "text": format!("Swaps: {}", swap_labels(&points, decimals)),
                    "xref": format!("{} domain", subplot.xaxis),
                    "yref": format!("{} domain", subplot.yaxis),
                    "x": 0.5,
                    "y": 1.15,
                    "showarrow": false,
                }));
            }
        }
        let (middle_y, min) = midpoint(&combined);
        bands.push((middle_y, (middle_y - min) / 4.0));
    }

    let total_costs = table.total_costs();
    let mut frames = Vec::with_capacity(grid.len());
    for (k, &threshold) in thresholds.iter().enumerate() {
        let horizontal = if threshold > middle_x { "left" } else { "right" };
        for ((subplot, (amount, cost)), &(middle_y, unit_y)) in SUBPLOTS.iter().zip(&series).zip(&bands) {
            let (amount_side, cost_side) = match (amount, cost) {
                (Some(a), Some(c)) => paired_sides(a[k], c[k], middle_y, unit_y),
                (Some(a), None) => (vertical_side(a[k], middle_y), ""),
                (None, Some(c)) => ("", vertical_side(c[k], middle_y)),
                (None, None) => ("", ""),
            };
            if let Some(amount) = amount {
                threshold_marker(
                    &mut figure,
                    (threshold, amount[k]),
                    subplot,
                    subplot.amount_color,
                    format!("amount: {currency}%{{y}}"),
                    format!("{amount_side} {horizontal}"),
                    decimals,
                    k,
                )?;
            }
            if let Some(cost) = cost {
                let color = if amount.is_some() {
                    subplot.cost_color
                } else {
                    subplot.amount_color
                };
                threshold_marker(
                    &mut figure,
                    (threshold, cost[k]),
                    subplot,
                    color,
                    format!("cost: {currency}%{{y}}"),
                    format!("{cost_side} {horizontal}"),
                    decimals,
                    k,
                )?;
            }
        }
        let cost_line = total_costs
            .as_ref()
            .map(|totals| format!("<br>Total cost: {currency}{}", format_thousands(totals[k], 2)))
            .unwrap_or_default();
        frames.push(FrameContent::new(
            grid.label(k),
            compose_title(&options.title, &format!("{subtitle}{cost_line}")),
        ));
    }
    debug!(traces = figure.traces().len(), "line chart traces built");
    figure.attach_frames(frames)?;
    info!(
        thresholds = grid.len(),
        amounts = table.has_amounts(),
        costs = table.has_costs(),
        "built confusion line chart"
    );
    let total_amount = dataset.total_amount().map(|t| round_to(t, 2));
    Ok(PlotOutput {
        figure,
        data: LineChartOutput {
            table,
            total_amount,
        },
    })
}

/// One line per variable: the amount summed over `amount_classes` and the
/// cost summed over `cost_classes`, with swap markers when both are plotted.
pub fn total_amount_cost_plot(
    true_y: &[u8],
    predicted_proba: &[f64],
    amounts: Option<&[f64]>,
    costs: Option<&CostSpecification>,
    options: &TotalAmountCostOptions,
) -> Result<PlotOutput<SelectedTotalsTable>> {
    let amount_classes = match (&options.amount_classes, amounts) {
        (Some(_), None) => {
            return Err(BctoolsError::usage("amount classes are selected but no amounts are given"))
        }
        (selection, Some(_)) => Some(selection.clone().unwrap_or(ClassSelection::All).classes()?),
        (None, None) => None,
    };
    let cost_classes = match (&options.cost_classes, costs) {
        (Some(_), None) => {
            return Err(BctoolsError::usage("cost classes are selected but no costs are given"))
        }
        (selection, Some(_)) => Some(selection.clone().unwrap_or(ClassSelection::All).classes()?),
        (None, None) => None,
    };
    let AmountCostSweep { grid, table, .. } =
        amount_cost_sweep(true_y, predicted_proba, amounts, costs, options.threshold_step)?;
    let currency = &options.currency;
    let thresholds = table.thresholds();
    let n = thresholds.len();

    let amount = amount_classes
        .zip(table.amount_totals())
        .map(|(classes, totals)| SelectedSeries::select(classes, &totals));
    let cost = cost_classes
        .zip(table.cost_totals())
        .map(|(classes, totals)| SelectedSeries::select(classes, &totals));

    let mut figure = Figure::new(
        Layout::new().height(600).margin(Margin::new().top(120)),
        options.show_display_modebar,
    )?;
    let mut subtitle = String::new();
    if let Some(amount) = &amount {
        let line = Scatter::new(thresholds.clone(), amount.sum.clone())
            .mode(Mode::Lines)
            .show_legend(false)
            .hover_template(&format!("total amount: {currency}%{{y}}<extra></extra>"));
        figure.add_trace(&line, TraceOwner::Static)?;
        subtitle.push_str(&format!("Amount categories: {}<br>", amount.label()));
    }
    if let Some(cost) = &cost {
        let line = Scatter::new(thresholds.clone(), cost.sum.clone())
            .mode(Mode::Lines)
            .show_legend(false)
            .hover_template(&format!("total cost: {currency}%{{y}}<extra></extra>"));
        figure.add_trace(&line, TraceOwner::Static)?;
        subtitle.push_str(&format!("Cost categories: {}", cost.label()));
    }
    let mut intercepts = String::new();
    if let (Some(amount), Some(cost)) = (&amount, &cost) {
        let points = swaps(&thresholds, &amount.sum, &cost.sum);
        figure.add_trace(&swap_markers(&points), TraceOwner::Static)?;
        if !points.is_empty() {
            intercepts = format!("Swaps at thresholds: {}", swap_labels(&points, grid.decimals()));
        }
    }
    figure.set_title(&format!(
        "<b>{}</b><span style='font-size: 13px;'><br>{subtitle}<br>{intercepts}</span>",
        options.title
    ));
    figure.set_layout("hovermode", json!("x unified"));
    figure.set_layout("xaxis", json!({ "title": { "text": "Threshold" } }));
    figure.set_layout("yaxis", json!({ "title": { "text": "Amount/Cost" } }));
    info!(thresholds = n, "built total amount/cost chart");
    Ok(PlotOutput {
        figure,
        data: SelectedTotalsTable {
            thresholds,
            amount,
            cost,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRUE_Y: [u8; 4] = [0, 0, 1, 1];
    const PROBA: [f64; 4] = [0.1, 0.4, 0.35, 0.8];
    const AMOUNTS: [f64; 4] = [100.0, 200.0, 300.0, 400.0];

    fn fp_fn_costs() -> CostSpecification {
        CostSpecification::new()
            .with(ConfusionClass::FalsePositive, 10.0)
            .with(ConfusionClass::FalseNegative, 50.0)
    }

    fn line_options() -> LineChartOptions {
        LineChartOptions {
            threshold_step: 0.1,
            ..LineChartOptions::default()
        }
    }

    fn total_options() -> TotalAmountCostOptions {
        TotalAmountCostOptions {
            threshold_step: 0.1,
            ..TotalAmountCostOptions::default()
        }
    }

    #[test]
    fn selection_parses_all_and_lists() {
        assert_eq!("ALL".parse::<ClassSelection>().unwrap(), ClassSelection::All);
        let parsed: ClassSelection = "fp, FN".parse().unwrap();
        assert_eq!(
            parsed,
            ClassSelection::Classes(vec![ConfusionClass::FalsePositive, ConfusionClass::FalseNegative])
        );
        assert_eq!(parsed.to_string(), "FP,FN");
        assert!("FP,XX".parse::<ClassSelection>().is_err());
        let single: ClassSelection = serde_json::from_str("\"TP\"").unwrap();
        assert_eq!(single, ClassSelection::Classes(vec![ConfusionClass::TruePositive]));
        assert_eq!(serde_json::to_string(&ClassSelection::All).unwrap(), "\"all\"");
    }

    #[test]
    fn selection_drops_duplicates_and_rejects_empty() {
        let selection = ClassSelection::Classes(vec![
            ConfusionClass::TruePositive,
            ConfusionClass::FalseNegative,
            ConfusionClass::TruePositive,
        ]);
        assert_eq!(
            selection.classes().unwrap(),
            vec![ConfusionClass::TruePositive, ConfusionClass::FalseNegative]
        );
        assert!(matches!(
            ClassSelection::Classes(Vec::new()).classes(),
            Err(BctoolsError::Value(_))
        ));
    }

    #[test]
    fn swaps_report_the_later_threshold() {
        let t = [0.0, 0.5, 1.0];
        let points = swaps(&t, &[1.0, 3.0, 0.0], &[2.0, 2.0, 2.0]);
        assert_eq!(points, vec![(0.5, 2.0), (1.0, 2.0)]);
        // touching zero from above counts, staying at zero does not
        assert_eq!(swaps(&t, &[1.0, 0.0, 0.0], &[0.0; 3]), vec![(0.5, 0.0)]);
        assert!(swaps(&t, &[0.0, 1.0, 2.0], &[0.0; 3]).is_empty());
    }

    #[test]
    fn close_markers_take_opposite_sides() {
        assert_eq!(paired_sides(10.0, 9.0, 50.0, 5.0), ("top", "bottom"));
        assert_eq!(paired_sides(9.0, 10.0, 50.0, 5.0), ("bottom", "top"));
        assert_eq!(paired_sides(10.0, 90.0, 50.0, 5.0), ("top", "bottom"));
        assert_eq!(paired_sides(90.0, 10.0, 50.0, 5.0), ("bottom", "top"));
    }

    #[test]
    fn line_chart_with_both_inputs() {
        let out = confusion_linechart_plot(&TRUE_Y, &PROBA, Some(&AMOUNTS), Some(&fp_fn_costs()), &line_options())
            .unwrap();
        // 4 x (amount, cost, swaps) statics, then 8 markers per threshold
        assert_eq!(out.figure.traces().len(), 12 + 8 * 11);
        assert_eq!(out.data.total_amount, Some(1000.0));
        let row = out.data.table.rows[5];
        assert_eq!(row.threshold, 0.5);
        let amounts = row.amounts.unwrap();
        assert_eq!((amounts.tn, amounts.fp, amounts.fn_, amounts.tp), (300.0, 0.0, 300.0, 400.0));
        assert_eq!(row.costs.unwrap().total(), 50.0);
        let title = &out.figure.frames().unwrap().frames()[5].title;
        assert!(title.contains("Total amount: €1,000.00<br>Total cost: €50.00"));
        let marker = &out.figure.traces()[12 + 8 * 5];
        assert_eq!(marker["x"][0], 0.5);
        assert_eq!(marker["hovertemplate"], "%{x:.1f}<extra></extra>");
        assert!(marker["textposition"].as_str().unwrap().ends_with(" right"));
    }

    #[test]
    fn line_chart_with_amounts_only() {
        let out = confusion_linechart_plot(&TRUE_Y, &PROBA, Some(&AMOUNTS), None, &line_options()).unwrap();
        assert_eq!(out.figure.traces().len(), 4 + 4 * 11);
        let title = &out.figure.frames().unwrap().frames()[0].title;
        assert!(!title.contains("Total cost"));
        let frame = out.data.table.to_frame().unwrap();
        assert_eq!(
            frame.column_names(),
            vec!["threshold", "amount_TN", "amount_FP", "amount_FN", "amount_TP"]
        );
    }

    #[test]
    fn line_chart_with_costs_only_has_no_total_amount() {
        let out = confusion_linechart_plot(&TRUE_Y, &PROBA, None, Some(&fp_fn_costs()), &line_options()).unwrap();
        assert_eq!(out.data.total_amount, None);
        let frame = out.data.table.to_frame().unwrap();
        assert_eq!(frame.column_f64("total_cost").unwrap()[10], 100.0);
        assert_eq!(out.figure.layout()["annotations"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn line_chart_needs_amounts_or_costs() {
        let err = confusion_linechart_plot(&TRUE_Y, &PROBA, None, None, &line_options()).unwrap_err();
        assert!(matches!(err, BctoolsError::Usage(_)));
    }

    #[test]
    fn selected_series_sums_only_the_chosen_classes() {
        let totals = [
            ClassTotals { tn: 1.0, fp: 2.0, fn_: 4.0, tp: 8.0 },
            ClassTotals { tn: 16.0, fp: 32.0, fn_: 64.0, tp: 128.0 },
        ];
        let selected = SelectedSeries::select(
            vec![ConfusionClass::FalsePositive, ConfusionClass::TruePositive],
            &totals,
        );
        assert_eq!(selected.per_class, vec![vec![2.0, 32.0], vec![8.0, 128.0]]);
        assert_eq!(selected.sum, vec![10.0, 160.0]);
        assert_eq!(selected.label(), "FP + TP");
    }

    #[test]
    fn totals_over_selected_classes() {
        let options = TotalAmountCostOptions {
            amount_classes: Some(ClassSelection::Classes(vec![ConfusionClass::FalseNegative])),
            ..total_options()
        };
        let out = total_amount_cost_plot(&TRUE_Y, &PROBA, Some(&AMOUNTS), Some(&fp_fn_costs()), &options).unwrap();
        let frame = out.data.to_frame().unwrap();
        assert_eq!(
            frame.column_names(),
            vec![
                "threshold", "amount_FN", "amount_sum", "cost_TN", "cost_FP", "cost_FN", "cost_TP", "cost_sum"
            ]
        );
        assert_eq!(out.data.amount.as_ref().unwrap().sum[5], 300.0);
        assert_eq!(out.data.cost.as_ref().unwrap().sum[5], 50.0);
        assert_eq!(out.figure.traces().len(), 3);
        assert!(out.figure.frames().is_none());
        let title = out.figure.layout()["title"]["text"].as_str().unwrap();
        assert!(title.contains("Amount categories: FN<br>Cost categories: TN + FP + FN + TP"));
    }

    #[test]
    fn totals_report_swaps() {
        let costs = CostSpecification::new().with(ConfusionClass::FalsePositive, 1000.0);
        let options = TotalAmountCostOptions {
            amount_classes: Some(ClassSelection::Classes(vec![ConfusionClass::FalsePositive])),
            cost_classes: Some(ClassSelection::Classes(vec![ConfusionClass::FalsePositive])),
            ..total_options()
        };
        let out = total_amount_cost_plot(&TRUE_Y, &PROBA, Some(&AMOUNTS), Some(&costs), &options).unwrap();
        let title = out.figure.layout()["title"]["text"].as_str().unwrap();
        assert!(title.contains("Swaps at thresholds: 0.5"));
        assert_eq!(out.figure.traces()[2]["x"][0], 0.5);
    }

    #[test]
    fn selection_without_input_is_a_usage_error() {
        let options = TotalAmountCostOptions {
            cost_classes: Some(ClassSelection::All),
            ..total_options()
        };
        let err = total_amount_cost_plot(&TRUE_Y, &PROBA, Some(&AMOUNTS), None, &options).unwrap_err();
        assert!(matches!(err, BctoolsError::Usage(_)));
        let err = total_amount_cost_plot(&TRUE_Y, &PROBA, None, None, &total_options()).unwrap_err();
        assert!(matches!(err, BctoolsError::Usage(_)));
    }
}
