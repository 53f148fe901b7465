// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use anyhow::Context;
use co2cpd_core::{CpdError, ScenarioLabel, SeriesStore};
use std::fs;
use std::path::Path;
use tracing::info;

/// Reads a scenario table from `path`.
pub fn load_store(path: &Path) -> anyhow::Result<SeriesStore> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read '{}'", path.display()))?;
    let store = parse_scenario_csv(&raw)
        .with_context(|| format!("failed to load scenarios from '{}'", path.display()))?;
    info!(
        path = %path.display(),
        scenarios = store.len(),
        rows = store.iter().next().map_or(0, |series| series.len()),
        "loaded scenario table"
    );
    Ok(store)
}

/// Parses a CSV table whose first column is time and whose remaining
/// columns are one scenario each.
///
/// The first non-empty line must be a header. Every failure is a
/// [`CpdError::DataFormat`]; no partial store is returned.
pub fn parse_scenario_csv(raw: &str) -> Result<SeriesStore, CpdError> {
    let mut rows = raw
        .lines()
        .map(str::trim)
        .enumerate()
        .filter(|(_, line)| !line.is_empty());

    let (_, header_row) = rows
        .next()
        .ok_or_else(|| CpdError::data_format("CSV input is empty"))?;
    let header = split_row(header_row);
    validate_header(&header)?;

    let width = header.len();
    let mut time = vec![];
    let mut columns: Vec<Vec<f64>> = vec![vec![]; width - 1];

    for (line_idx, row) in rows {
        let cells = split_row(row);
        if cells.len() != width {
            return Err(CpdError::data_format(format!(
                "CSV line {} has {} columns but the header has {}",
                line_idx + 1,
                cells.len(),
                width
            )));
        }

        for (col_idx, cell) in cells.iter().enumerate() {
            let value = parse_cell(cell, line_idx, col_idx, &header)?;
            if col_idx == 0 {
                time.push(value);
            } else {
                columns[col_idx - 1].push(value);
            }
        }
    }

    if time.is_empty() {
        return Err(CpdError::data_format("CSV input has a header but no data rows"));
    }

    SeriesStore::from_columns(
        &time,
        header[1..]
            .iter()
            .map(|name| ScenarioLabel::parse(name))
            .zip(columns),
    )
}

fn split_row(row: &str) -> Vec<&str> {
    row.split(',')
        .map(|cell| cell.trim().trim_matches('"').trim())
        .collect()
}

fn validate_header(header: &[&str]) -> Result<(), CpdError> {
    if header.len() < 2 {
        return Err(CpdError::data_format(format!(
            "CSV header must name a time column and at least one scenario; got {} column(s)",
            header.len()
        )));
    }
    if let Some(col_idx) = header.iter().position(|cell| cell.is_empty()) {
        return Err(CpdError::data_format(format!(
            "CSV header column {} is empty",
            col_idx + 1
        )));
    }
    if header.iter().all(|cell| cell.parse::<f64>().is_ok()) {
        return Err(CpdError::data_format(
            "CSV header row is missing; the first line is entirely numeric",
        ));
    }
    Ok(())
}

fn parse_cell(cell: &str, line_idx: usize, col_idx: usize, header: &[&str]) -> Result<f64, CpdError> {
    if cell.is_empty() {
        return Err(CpdError::data_format(format!(
            "CSV line {} column '{}' is empty",
            line_idx + 1,
            header[col_idx]
        )));
    }
    let value = cell.parse::<f64>().map_err(|_| {
        CpdError::data_format(format!(
            "CSV line {} column '{}' is not a valid number: '{cell}'",
            line_idx + 1,
            header[col_idx]
        ))
    })?;
    if !value.is_finite() {
        return Err(CpdError::data_format(format!(
            "CSV line {} column '{}' is not finite: '{cell}'",
            line_idx + 1,
            header[col_idx]
        )));
    }
    Ok(value)
}
