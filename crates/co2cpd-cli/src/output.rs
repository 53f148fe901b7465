// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use anyhow::Context;
use co2cpd_core::{AnalysisConfig, ScenarioResult, ScenarioStatus, Significance};
use co2cpd_eval::{SignificantStats, Stats, SummaryRecord};
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const RESULTS_FILE: &str = "changepoint_results.csv";
pub const SUMMARY_FILE: &str = "changepoint_summary.csv";
pub const REPORT_FILE: &str = "changepoint_report.json";

const RESULTS_HEADER: [&str; 12] = [
    "scenario",
    "magnitude_pgc",
    "ordinal",
    "index",
    "time",
    "concentration",
    "magnitude",
    "statistic",
    "df",
    "p_value",
    "significant",
    "note",
];

const SUMMARY_HEADER: [&str; 17] = [
    "scenario",
    "magnitude_pgc",
    "detected",
    "significant",
    "location_mean",
    "location_std",
    "magnitude_mean",
    "magnitude_std",
    "concentration_mean",
    "concentration_std",
    "statistic_mean",
    "statistic_std",
    "p_value_mean",
    "p_value_std",
    "significant_count_mean",
    "significant_count_std",
    "status",
];

/// JSON document written next to the CSV files. The engine version is
/// recorded once here rather than in every scenario's diagnostics.
#[derive(Serialize)]
pub struct Report<'a> {
    pub engine_version: &'static str,
    pub config: &'a AnalysisConfig,
    pub results: &'a [ScenarioResult],
    pub summary: &'a SummaryRecord,
}

impl<'a> Report<'a> {
    pub fn new(
        config: &'a AnalysisConfig,
        results: &'a [ScenarioResult],
        summary: &'a SummaryRecord,
    ) -> Self {
        Self {
            engine_version: env!("CARGO_PKG_VERSION"),
            config,
            results,
            summary,
        }
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize report")
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputPaths {
    pub results_csv: PathBuf,
    pub summary_csv: PathBuf,
    pub report_json: PathBuf,
}

/// Writes the results CSV, the summary CSV and the JSON report into `dir`.
pub fn write_outputs(dir: &Path, report: &Report<'_>) -> anyhow::Result<OutputPaths> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory '{}'", dir.display()))?;

    let paths = OutputPaths {
        results_csv: dir.join(RESULTS_FILE),
        summary_csv: dir.join(SUMMARY_FILE),
        report_json: dir.join(REPORT_FILE),
    };
    write_file(&paths.results_csv, &results_csv(report.results))?;
    write_file(&paths.summary_csv, &summary_csv(report.summary))?;
    write_file(&paths.report_json, &report.to_json()?)?;
    info!(dir = %dir.display(), "wrote result files");
    Ok(paths)
}

fn write_file(path: &Path, contents: &str) -> anyhow::Result<()> {
    fs::write(path, contents).with_context(|| format!("failed to write '{}'", path.display()))
}

/// One row per changepoint; a degraded scenario contributes a single row
/// carrying the reason in `note`.
pub fn results_csv(results: &[ScenarioResult]) -> String {
    let mut out = csv_line(RESULTS_HEADER.iter().map(|h| h.to_string()));
    for result in results {
        let scenario = result.label.name.clone();
        let magnitude_pgc = opt_num(result.label.magnitude_pgc);

        if let ScenarioStatus::Degraded { reason } = &result.status {
            let mut row = vec![String::new(); RESULTS_HEADER.len()];
            row[0] = scenario;
            row[1] = magnitude_pgc;
            row[11] = reason.clone();
            out.push_str(&csv_line(row));
            continue;
        }

        for (ordinal, cp) in result.changepoints.iter().enumerate() {
            let (statistic, df, p_value, note) = match &cp.significance {
                Significance::Tested(outcome) => (
                    num(outcome.statistic),
                    num(outcome.df),
                    num(outcome.p_value),
                    String::new(),
                ),
                Significance::Untestable { reason } => {
                    (String::new(), String::new(), String::new(), reason.clone())
                }
            };
            out.push_str(&csv_line([
                scenario.clone(),
                magnitude_pgc.clone(),
                (ordinal + 1).to_string(),
                cp.index.to_string(),
                num(cp.time),
                num(cp.concentration),
                opt_num(cp.magnitude),
                statistic,
                df,
                p_value,
                cp.is_significant().to_string(),
                note,
            ]));
        }
    }
    out
}

/// One row per scenario plus an `ALL` row. Empty cells mean "no significant
/// changepoints" or an undefined standard deviation.
pub fn summary_csv(record: &SummaryRecord) -> String {
    let mut out = csv_line(SUMMARY_HEADER.iter().map(|h| h.to_string()));
    for row in &record.scenarios {
        let mut cells = vec![
            row.label.name.clone(),
            opt_num(row.label.magnitude_pgc),
            row.detected.to_string(),
            row.significant.to_string(),
        ];
        cells.extend(stats_cells(&row.stats));
        cells.extend([String::new(), String::new()]);
        cells.push(match &row.status {
            ScenarioStatus::Analyzed => "analyzed".to_string(),
            ScenarioStatus::Degraded { reason } => format!("degraded: {reason}"),
        });
        out.push_str(&csv_line(cells));
    }

    let overall = &record.overall;
    let mut cells = vec![
        "ALL".to_string(),
        String::new(),
        overall.detected.to_string(),
        overall.significant.to_string(),
    ];
    cells.extend(stats_cells(&overall.stats));
    match overall.significant_count {
        Some(counts) => cells.extend([num(counts.mean), opt_num(counts.std)]),
        None => cells.extend([String::new(), String::new()]),
    }
    cells.push(format!(
        "{} scenario(s), {} degraded",
        overall.scenarios, overall.degraded
    ));
    out.push_str(&csv_line(cells));
    out
}

fn stats_cells(stats: &SignificantStats) -> [String; 10] {
    match stats {
        SignificantStats::NoSignificantChangepoints => Default::default(),
        SignificantStats::Present {
            location,
            magnitude,
            concentration,
            statistic,
            p_value,
        } => {
            let [a, b] = mean_std(location);
            let [c, d] = mean_std(magnitude);
            let [e, f] = mean_std(concentration);
            let [g, h] = mean_std(statistic);
            let [i, j] = mean_std(p_value);
            [a, b, c, d, e, f, g, h, i, j]
        }
    }
}

fn mean_std(stats: &Stats) -> [String; 2] {
    [num(stats.mean), opt_num(stats.std)]
}

fn num(value: f64) -> String {
    format!("{value}")
}

fn opt_num(value: Option<f64>) -> String {
    value.map(num).unwrap_or_default()
}

fn csv_line(cells: impl IntoIterator<Item = String>) -> String {
    let mut line = cells
        .into_iter()
        .map(|cell| escape_csv(&cell))
        .collect::<Vec<_>>()
        .join(",");
    line.push('\n');
    line
}

fn escape_csv(cell: &str) -> String {
    if cell.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

/// Human-readable report printed by `co2cpd analyze`.
pub fn render_text_report(results: &[ScenarioResult], record: &SummaryRecord) -> String {
    let mut out = String::new();
    for result in results {
        let _ = write!(out, "{}", result.label.display_name());
        match &result.status {
            ScenarioStatus::Degraded { reason } => {
                let _ = writeln!(out, ": DEGRADED ({reason})");
                continue;
            }
            ScenarioStatus::Analyzed => {
                let _ = writeln!(
                    out,
                    ": {} changepoint(s), {} significant (window {}, test window {})",
                    result.changepoints.len(),
                    result.n_significant(),
                    result.window_size,
                    result.test_window
                );
            }
        }
        for cp in &result.changepoints {
            let verdict = match &cp.significance {
                Significance::Tested(outcome) => format!(
                    "t={:.3} p={:.3e} {}",
                    outcome.statistic,
                    outcome.p_value,
                    if outcome.is_significant {
                        "significant"
                    } else {
                        "not significant"
                    }
                ),
                Significance::Untestable { reason } => format!("untestable ({reason})"),
            };
            let shift = cp
                .magnitude
                .map_or_else(|| "n/a".to_string(), |m| format!("{m:+.3}"));
            let _ = writeln!(
                out,
                "  time {} (index {}): concentration {:.3}, shift {shift}, {verdict}",
                cp.time, cp.index, cp.concentration
            );
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{:<16} | {:>8} | {:>11} | {:>14} | {:>14}",
        "Scenario", "Detected", "Significant", "Location mean", "Shift mean"
    );
    let _ = writeln!(out, "{:-<16}-|-{:-<8}-|-{:-<11}-|-{:-<14}-|-{:-<14}", "", "", "", "", "");
    for row in &record.scenarios {
        let (location, shift) = stats_means(&row.stats);
        let _ = writeln!(
            out,
            "{:<16} | {:>8} | {:>11} | {:>14} | {:>14}",
            row.label.display_name(),
            row.detected,
            row.significant,
            location,
            shift
        );
    }
    let (location, shift) = stats_means(&record.overall.stats);
    let _ = writeln!(
        out,
        "{:<16} | {:>8} | {:>11} | {:>14} | {:>14}",
        "ALL", record.overall.detected, record.overall.significant, location, shift
    );
    if record.overall.degraded > 0 {
        let _ = writeln!(
            out,
            "{} of {} scenario(s) degraded",
            record.overall.degraded, record.overall.scenarios
        );
    }
    out
}

fn stats_means(stats: &SignificantStats) -> (String, String) {
    match stats {
        SignificantStats::NoSignificantChangepoints => ("-".to_string(), "-".to_string()),
        SignificantStats::Present {
            location,
            magnitude,
            ..
        } => (
            format!("{:.3}", location.mean),
            format!("{:+.3}", magnitude.mean),
        ),
    }
}
