// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use co2cpd_analysis::analyze_batch;
use co2cpd_cli::output::Report;
use co2cpd_cli::plot::{ALL_SERIES_FILE, CHANGEPOINTS_FILE};
use co2cpd_cli::{
    ConfigFile, DetectionArgs, load_store, plot_all_series, plot_changepoints,
    render_text_report, resolve_config, write_outputs,
};
use co2cpd_core::{AnalysisConfig, CostKind};
use co2cpd_costs::{CostL2Mean, CostNormalMeanVar};
use co2cpd_eval::aggregate;
use co2cpd_offline::{SlidingWindow, SlidingWindowConfig};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "co2cpd",
    about = "Changepoint detection and significance testing for CO2 decay scenarios",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect, test and summarize changepoints in every scenario
    Analyze {
        /// CSV table: time column followed by one column per scenario
        #[arg(long)]
        input: PathBuf,

        /// Directory for result tables, report and plots
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Skip SVG plot rendering
        #[arg(long)]
        no_plots: bool,

        /// Print the JSON report instead of the text summary
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        detection: DetectionArgs,
    },

    /// Print the changepoint indices of one scenario as JSON
    Segment {
        /// CSV table: time column followed by one column per scenario
        #[arg(long)]
        input: PathBuf,

        /// Scenario column header
        #[arg(long)]
        scenario: String,

        #[command(flatten)]
        detection: DetectionArgs,
    },
}

#[derive(Serialize)]
struct SegmentOutput<'a> {
    scenario: &'a str,
    n: usize,
    window_size: usize,
    change_points: Vec<usize>,
    times: Vec<f64>,
    warnings: Vec<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            input,
            output_dir,
            no_plots,
            json,
            detection,
        } => {
            let config = load_config(&detection)?;
            tracing::info!(input = %input.display(), output_dir = %output_dir.display(), "running analysis");
            let store = load_store(&input)?;
            let results = analyze_batch(&store, &config)?;
            let summary = aggregate(&results);
            let report = Report::new(&config, &results, &summary);

            let paths = write_outputs(&output_dir, &report)?;
            tracing::info!(
                results = %paths.results_csv.display(),
                summary = %paths.summary_csv.display(),
                report = %paths.report_json.display(),
                "result tables written"
            );

            if !no_plots {
                let all_series = output_dir.join(ALL_SERIES_FILE);
                if let Err(err) = plot_all_series(&all_series, &store) {
                    tracing::warn!(path = %all_series.display(), error = %err, "plot failed");
                }
                let grid = output_dir.join(CHANGEPOINTS_FILE);
                if let Err(err) = plot_changepoints(&grid, &store, &results) {
                    tracing::warn!(path = %grid.display(), error = %err, "plot failed");
                }
            }

            if json {
                println!("{}", report.to_json()?);
            } else {
                print!("{}", render_text_report(&results, &summary));
            }
        }
        Commands::Segment {
            input,
            scenario,
            detection,
        } => {
            let config = load_config(&detection)?;
            let store = load_store(&input)?;
            let series = store
                .get(&scenario)
                .ok_or_else(|| anyhow!("scenario '{scenario}' not found in '{}'", input.display()))?;
            let window_size = config.resolve(series.len()).window_size;
            let segmentation = segment_one(series.values(), window_size, &config)
                .with_context(|| format!("failed to segment scenario '{scenario}'"))?;

            let output = SegmentOutput {
                scenario: &scenario,
                n: series.len(),
                window_size,
                times: segmentation
                    .change_points
                    .iter()
                    .map(|&idx| series.time()[idx])
                    .collect(),
                change_points: segmentation.change_points,
                warnings: segmentation.diagnostics.warnings,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

fn load_config(args: &DetectionArgs) -> Result<AnalysisConfig> {
    let file = args.config.as_deref().map(ConfigFile::load).transpose()?;
    Ok(resolve_config(file.as_ref(), args)?)
}

fn segment_one(
    values: &[f64],
    window_size: usize,
    config: &AnalysisConfig,
) -> Result<co2cpd_offline::Segmentation> {
    let window_config = SlidingWindowConfig {
        stopping: config.stopping.clone(),
        window_size,
        params_per_segment: 0,
    };
    let segmentation = match config.cost {
        CostKind::L2 => SlidingWindow::new(CostL2Mean::default(), window_config)?.detect(values)?,
        CostKind::Normal => {
            SlidingWindow::new(CostNormalMeanVar::default(), window_config)?.detect(values)?
        }
    };
    Ok(segmentation)
}
