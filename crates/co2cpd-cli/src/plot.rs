// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use anyhow::{Context, anyhow};
use co2cpd_core::{ScenarioResult, Series, SeriesStore};
use plotters::prelude::*;
use std::ops::Range;
use std::path::Path;

pub const ALL_SERIES_FILE: &str = "all_series_plot.svg";
pub const CHANGEPOINTS_FILE: &str = "changepoint_detection_results.svg";

const MAX_GRID_COLUMNS: usize = 5;
const PANEL_SIZE: (u32, u32) = (380, 300);
const MARKER_DASHES: usize = 24;

/// Every scenario on one log-time axis.
pub fn plot_all_series(path: &Path, store: &SeriesStore) -> anyhow::Result<()> {
    let (x_range, y_range) = axis_ranges(store.iter())?;

    let root = SVGBackend::new(path, (1200, 800)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("CO2 Concentration Scenarios", ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range.log_scale(), y_range)?;

    chart
        .configure_mesh()
        .x_desc("Time [years, log scale]")
        .y_desc("pCO2 anomaly [ppmv]")
        .draw()?;

    for (idx, series) in store.iter().enumerate() {
        let color = Palette99::pick(idx).to_rgba();
        chart
            .draw_series(LineSeries::new(positive_time_points(series), &color))?
            .label(series.label().display_name())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()
        .with_context(|| format!("failed to write '{}'", path.display()))?;
    Ok(())
}

/// One panel per scenario with dashed markers at the detected changepoints.
pub fn plot_changepoints(
    path: &Path,
    store: &SeriesStore,
    results: &[ScenarioResult],
) -> anyhow::Result<()> {
    if results.is_empty() {
        return Err(anyhow!("no scenario results to plot"));
    }

    let columns = results.len().min(MAX_GRID_COLUMNS);
    let rows = results.len().div_ceil(columns);
    let size = (
        PANEL_SIZE.0 * columns as u32,
        PANEL_SIZE.1 * rows as u32,
    );

    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;
    let panels = root.split_evenly((rows, columns));

    for (result, panel) in results.iter().zip(panels.iter()) {
        let series = store
            .get(&result.label.name)
            .ok_or_else(|| anyhow!("scenario '{}' missing from the store", result.label))?;
        let (x_range, y_range) = axis_ranges(std::iter::once(series))?;
        let (y_low, y_high) = (y_range.start, y_range.end);

        let caption = if result.is_degraded() {
            format!("{} (degraded)", result.label.display_name())
        } else {
            format!(
                "{} ({}/{} significant)",
                result.label.display_name(),
                result.n_significant(),
                result.changepoints.len()
            )
        };

        let mut chart = ChartBuilder::on(panel)
            .caption(caption, ("sans-serif", 14))
            .margin(6)
            .x_label_area_size(24)
            .y_label_area_size(40)
            .build_cartesian_2d(x_range.log_scale(), y_range)?;
        chart.configure_mesh().x_labels(4).y_labels(5).draw()?;

        chart.draw_series(LineSeries::new(positive_time_points(series), &BLUE))?;

        for cp in result.changepoints.iter().filter(|cp| cp.time > 0.0) {
            chart.draw_series(dashed_vertical(cp.time, y_low, y_high))?;
        }
    }

    root.present()
        .with_context(|| format!("failed to write '{}'", path.display()))?;
    Ok(())
}

// Log axes cannot show non-positive times.
fn positive_time_points(series: &Series) -> Vec<(f64, f64)> {
    series
        .time()
        .iter()
        .copied()
        .zip(series.values().iter().copied())
        .filter(|(t, _)| *t > 0.0)
        .collect()
}

fn axis_ranges<'a>(
    series: impl Iterator<Item = &'a Series>,
) -> anyhow::Result<(Range<f64>, Range<f64>)> {
    let mut t_min = f64::INFINITY;
    let mut t_max = f64::NEG_INFINITY;
    let mut y_min = 0.0f64;
    let mut y_max = f64::NEG_INFINITY;

    for series in series {
        for (t, y) in positive_time_points(series) {
            t_min = t_min.min(t);
            t_max = t_max.max(t);
            y_min = y_min.min(y);
            y_max = y_max.max(y);
        }
    }

    if !t_min.is_finite() {
        return Err(anyhow!("no positive time values to place on a log axis"));
    }
    if t_max <= t_min {
        t_max = t_min * 10.0;
    }
    let mut y_high = y_max * 1.05;
    if y_high <= y_min {
        y_high = y_min + 1.0;
    }
    Ok((t_min..t_max, y_min..y_high))
}

fn dashed_vertical(x: f64, y_low: f64, y_high: f64) -> Vec<PathElement<(f64, f64)>> {
    let step = (y_high - y_low) / (2 * MARKER_DASHES) as f64;
    (0..MARKER_DASHES)
        .map(|dash| {
            let start = y_low + (2 * dash) as f64 * step;
            PathElement::new(vec![(x, start), (x, start + step)], RED.mix(0.5))
        })
        .collect()
}
