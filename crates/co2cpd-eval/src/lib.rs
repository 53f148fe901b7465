// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

pub mod significance;
pub mod summary;

pub use significance::{SignificanceTest, draw_samples, evaluate, mean_shift};
pub use summary::{
    OverallSummary, ScenarioSummary, SignificantStats, Stats, SummaryRecord, aggregate,
};
