use std::path::PathBuf;

use anyhow::{Context, Result};
use bctools::data::loader::{load_costs, load_dataset};
use bctools::{
    confusion_linechart_plot, confusion_matrix_plot, curve_pr_plot, curve_roc_plot,
    predicted_proba_density_curve_plot, predicted_proba_violin_plot, total_amount_cost_plot,
    ClassSelection, ColumnarTable, CostSpecification, Dataset, Figure, OptimizeRequest, Settings,
    ToFrame,
};
use clap::{Args, Parser, Subcommand};
use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Interactive threshold diagnostics for binary classifiers
#[derive(Parser)]
#[command(name = "bctools", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Precision-recall curve with ISO-F curves
    Pr(IoArgs),
    /// ROC curve
    Roc(IoArgs),
    /// Probability strip plot over violins, per threshold
    Violin(IoArgs),
    /// Probability density curves split at the threshold
    Density(IoArgs),
    /// Confusion matrix dashboard with metrics tables
    ConfusionMatrix(ConfusionMatrixArgs),
    /// Amount/cost line chart for every confusion class
    ConfusionLinechart(IoArgs),
    /// Total amount and cost over selected confusion classes
    TotalAmountCost(TotalAmountCostArgs),
}

#[derive(Args)]
struct IoArgs {
    /// JSON table with `true_y`, `predicted_proba` and optionally `amount` columns
    #[arg(long)]
    input: PathBuf,

    /// JSON object with `TN`, `FP`, `FN`, `TP` costs
    #[arg(long)]
    costs: Option<PathBuf>,

    /// JSON settings overriding the plot defaults
    #[arg(long)]
    settings: Option<PathBuf>,

    #[arg(long, default_value = "plot.html")]
    output: PathBuf,

    /// Overrides the threshold step of the settings
    #[arg(long)]
    threshold_step: Option<f64>,
}

#[derive(Args)]
struct ConfusionMatrixArgs {
    #[command(flatten)]
    io: IoArgs,

    /// `all` or a comma separated list of ROC, MCC, Kappa, Fscore, Cost
    #[arg(long)]
    optimize: Option<OptimizeRequest>,

    /// Seed of the threshold optimizer
    #[arg(long)]
    random_state: Option<u64>,
}

#[derive(Args)]
struct TotalAmountCostArgs {
    #[command(flatten)]
    io: IoArgs,

    /// `all` or a comma separated list of TN, FP, FN, TP
    #[arg(long)]
    amount_classes: Option<ClassSelection>,

    #[arg(long)]
    cost_classes: Option<ClassSelection>,
}

struct Inputs {
    dataset: Dataset,
    costs: Option<CostSpecification>,
    settings: Settings,
}

impl IoArgs {
    fn load(&self) -> Result<Inputs> {
        let dataset = load_dataset(&self.input)
            .with_context(|| format!("loading {}", self.input.display()))?;
        let costs = self
            .costs
            .as_ref()
            .map(|path| load_costs(path).with_context(|| format!("loading {}", path.display())))
            .transpose()?;
        let settings = match &self.settings {
            Some(path) => Settings::from_json_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => Settings::default(),
        };
        Ok(Inputs {
            dataset,
            costs,
            settings,
        })
    }

    fn step(&self, configured: f64) -> f64 {
        self.threshold_step.unwrap_or(configured)
    }

    fn write(&self, figure: &Figure) -> Result<()> {
        figure
            .write_html(&self.output)
            .with_context(|| format!("writing {}", self.output.display()))
    }
}

fn print_table(title: &str, table: &ColumnarTable) {
    let mut out = Table::new();
    out.load_preset(UTF8_FULL);
    out.set_header(table.column_names());
    for row in table.rows_as_text() {
        out.add_row(row);
    }
    println!("{title}\n{out}");
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Pr(io) => {
            let Inputs { dataset, settings, .. } = io.load()?;
            let out = curve_pr_plot(dataset.true_y(), dataset.predicted_proba(), &settings.pr_curve)?;
            io.write(&out.figure)?;
            println!("PR AUC: {:.4}", out.data);
        }
        Command::Roc(io) => {
            let Inputs { dataset, settings, .. } = io.load()?;
            let out = curve_roc_plot(dataset.true_y(), dataset.predicted_proba(), &settings.roc_curve)?;
            io.write(&out.figure)?;
            println!("ROC AUC: {:.4}", out.data);
        }
        Command::Violin(io) => {
            let Inputs { dataset, settings, .. } = io.load()?;
            let mut options = settings.violin;
            options.threshold_step = io.step(options.threshold_step);
            let out = predicted_proba_violin_plot(dataset.true_y(), dataset.predicted_proba(), &options)?;
            io.write(&out.figure)?;
        }
        Command::Density(io) => {
            let Inputs { dataset, settings, .. } = io.load()?;
            let mut options = settings.density;
            options.threshold_step = io.step(options.threshold_step);
            let out =
                predicted_proba_density_curve_plot(dataset.true_y(), dataset.predicted_proba(), &options)?;
            io.write(&out.figure)?;
        }
        Command::ConfusionMatrix(args) => {
            let Inputs {
                dataset,
                costs,
                settings,
            } = args.io.load()?;
            let mut options = settings.confusion_matrix;
            options.threshold_step = args.io.step(options.threshold_step);
            if args.optimize.is_some() {
                options.optimize_threshold = args.optimize;
            }
            if args.random_state.is_some() {
                options.ghost.random_state = args.random_state;
            }
            let out = confusion_matrix_plot(
                dataset.true_y(),
                dataset.predicted_proba(),
                dataset.amounts(),
                costs.as_ref(),
                &options,
            )?;
            args.io.write(&out.figure)?;
            print_table("Invariant metrics", &out.data.invariant_metrics.to_frame()?);
            if let Some(optimal) = &out.data.optimal_thresholds {
                print_table("Optimal thresholds", &optimal.to_frame()?);
            }
            print_table("Threshold metrics", &out.data.threshold_metrics.to_frame()?);
        }
        Command::ConfusionLinechart(io) => {
            let Inputs {
                dataset,
                costs,
                settings,
            } = io.load()?;
            let mut options = settings.confusion_linechart;
            options.threshold_step = io.step(options.threshold_step);
            let out = confusion_linechart_plot(
                dataset.true_y(),
                dataset.predicted_proba(),
                dataset.amounts(),
                costs.as_ref(),
                &options,
            )?;
            io.write(&out.figure)?;
            print_table("Amounts and costs", &out.data.table.to_frame()?);
            if let Some(total) = out.data.total_amount {
                println!("Total amount: {total:.2}");
            }
        }
        Command::TotalAmountCost(args) => {
            let Inputs {
                dataset,
                costs,
                settings,
            } = args.io.load()?;
            let mut options = settings.total_amount_cost;
            options.threshold_step = args.io.step(options.threshold_step);
            if args.amount_classes.is_some() {
                options.amount_classes = args.amount_classes;
            }
            if args.cost_classes.is_some() {
                options.cost_classes = args.cost_classes;
            }
            let out = total_amount_cost_plot(
                dataset.true_y(),
                dataset.predicted_proba(),
                dataset.amounts(),
                costs.as_ref(),
                &options,
            )?;
            args.io.write(&out.figure)?;
            print_table("Selected totals", &out.data.to_frame()?);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Cli::parse();
    run(cli.command)?;
    info!("done");
    Ok(())
}
