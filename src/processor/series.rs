//! Chart series over a cleaned table
//!
//! Produces the data behind the proportion and trend charts: the trailing
//! window of value columns, averaged per row for the proportion breakdown,
//! or read along a single row for the trend.

use crate::config::StatisticsConfig;
use crate::error::{PopdataError, Result};
use crate::models::{DistributionSlice, TrendPoint};
use crate::processor::stats::{load_table, split_columns, value_exprs};

use polars::lazy::dsl::mean_horizontal;
use polars::prelude::*;
use std::path::Path;
use tracing::debug;

const WINDOW_MEAN: &str = "__window_mean";

/// The last `window` value columns, or all of them if there are fewer
pub fn window_columns(value_columns: &[String], window: usize) -> &[String] {
    let start = value_columns.len().saturating_sub(window);
    &value_columns[start..]
}

fn labels(df: &DataFrame, label_column: &str) -> Result<Vec<String>> {
    let column = df.column(label_column)?.cast(&DataType::String)?;
    let labels = column
        .as_materialized_series()
        .str()?
        .into_iter()
        .map(|label| label.unwrap_or_default().trim().to_string())
        .collect();
    Ok(labels)
}

/// Per-row window mean and its share of the column total
pub fn distribution(input: &Path, config: &StatisticsConfig) -> Result<Vec<DistributionSlice>> {
    config.validate()?;

    let df = load_table(input)?;
    let (label_column, value_columns) = split_columns(&df, config, input)?;
    let window = window_columns(&value_columns, config.series_window);
    debug!("Distribution window: {:?}", window);

    let labels = labels(&df, &label_column)?;
    let means = df
        .lazy()
        .select([mean_horizontal(value_exprs(window), true)?.alias(WINDOW_MEAN)])
        .collect()?;
    let means: Vec<Option<f64>> = means
        .column(WINDOW_MEAN)?
        .cast(&DataType::Float64)?
        .as_materialized_series()
        .f64()?
        .into_iter()
        .collect();

    let total: f64 = means.iter().flatten().sum();

    Ok(labels
        .into_iter()
        .zip(means)
        .map(|(label, mean)| DistributionSlice {
            label,
            mean,
            share: mean.filter(|_| total != 0.0).map(|m| m / total),
        })
        .collect())
}

/// Values of the row labelled `label` across the trailing window
pub fn trend(input: &Path, label: &str, config: &StatisticsConfig) -> Result<Vec<TrendPoint>> {
    config.validate()?;

    let df = load_table(input)?;
    let (label_column, value_columns) = split_columns(&df, config, input)?;
    let window = window_columns(&value_columns, config.series_window);

    let wanted = label.trim();
    let row = labels(&df, &label_column)?
        .iter()
        .position(|candidate| candidate == wanted)
        .ok_or_else(|| PopdataError::LabelNotFound {
            label: label.to_string(),
            path: input.to_path_buf(),
        })?;

    let mut points = Vec::with_capacity(window.len());
    for name in window {
        let values = df.column(name)?.cast(&DataType::Float64)?;
        let value = values.as_materialized_series().f64()?.get(row);
        points.push(TrendPoint {
            column: name.clone(),
            value,
        });
    }

    Ok(points)
}
