// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

pub mod config;
pub mod load;
pub mod output;
pub mod plot;

pub use config::{ConfigFile, CostArg, DetectionArgs, TestArg, parse_penalty, resolve_config};
pub use load::{load_store, parse_scenario_csv};
pub use output::{
    OutputPaths, Report, render_text_report, results_csv, summary_csv, write_outputs,
};
pub use plot::{plot_all_series, plot_changepoints};
