//! Row-wise summary statistics over a cleaned table
//!
//! The first column of a cleaned table holds row labels; every other column
//! is a value column. Values are cast to `f64` (unparsable cells become null)
//! and the row mean, maximum, and minimum are appended as new columns.

use crate::config::StatisticsConfig;
use crate::error::{PopdataError, Result};
use crate::models::StatisticsStats;
use crate::processor::writer::OutputWriter;

use polars::lazy::dsl::{max_horizontal, mean_horizontal, min_horizontal};
use polars::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// Load a cleaned CSV table with its first row as column names
pub fn load_table(path: &Path) -> Result<DataFrame> {
    if !path.exists() {
        return Err(PopdataError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    debug!(
        "Loaded {}: {} rows x {} columns",
        path.display(),
        df.height(),
        df.width()
    );
    Ok(df)
}

/// Label column name and the value columns, excluding derived statistics
pub fn split_columns(
    df: &DataFrame,
    config: &StatisticsConfig,
    path: &Path,
) -> Result<(String, Vec<String>)> {
    let names: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect();

    let Some((label, rest)) = names.split_first() else {
        return Err(PopdataError::InvalidTable {
            path: path.to_path_buf(),
            reason: "table has no columns".to_string(),
        });
    };

    let derived = config.derived_columns();
    let values: Vec<String> = rest
        .iter()
        .filter(|name| !derived.contains(&name.as_str()))
        .cloned()
        .collect();

    if values.is_empty() {
        return Err(PopdataError::InvalidTable {
            path: path.to_path_buf(),
            reason: format!("no value columns after label column '{}'", label),
        });
    }

    Ok((label.clone(), values))
}

/// Float casts of the named columns
pub fn value_exprs(columns: &[String]) -> Vec<Expr> {
    columns
        .iter()
        .map(|name| col(name.as_str()).cast(DataType::Float64))
        .collect()
}

/// Append mean/max/min columns computed across the value columns of each row
pub fn append_statistics(
    df: DataFrame,
    config: &StatisticsConfig,
    path: &Path,
) -> Result<DataFrame> {
    let (_, value_columns) = split_columns(&df, config, path)?;
    let values = value_exprs(&value_columns);

    let df = df
        .lazy()
        .with_columns([
            mean_horizontal(values.clone(), true)?.alias(config.mean_column.as_str()),
            max_horizontal(values.clone())?.alias(config.max_column.as_str()),
            min_horizontal(values)?.alias(config.min_column.as_str()),
        ])
        .collect()?;

    Ok(df)
}

/// Compute statistics for `input` and write the extended table to `output`
pub fn calculate_statistics(
    input: &Path,
    output: &Path,
    config: &StatisticsConfig,
) -> Result<StatisticsStats> {
    config.validate()?;

    let df = load_table(input)?;
    let (_, value_columns) = split_columns(&df, config, input)?;
    let mut df = append_statistics(df, config, input)?;

    OutputWriter::new(output.to_path_buf()).write_with(|sink| {
        CsvWriter::new(sink)
            .include_bom(config.write_bom)
            .include_header(true)
            .finish(&mut df)?;
        Ok(())
    })?;

    info!("Statistics saved to {}", output.display());

    Ok(StatisticsStats {
        input_path: input.to_path_buf(),
        output_path: output.to_path_buf(),
        rows: df.height(),
        value_columns: value_columns.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_table(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn f64_column(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
        df.column(name)
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .into_iter()
            .collect()
    }

    #[test]
    fn test_statistics_columns() {
        let temp_dir = TempDir::new().unwrap();
        let input = write_table(
            &temp_dir,
            "pop.csv",
            "地区,2021,2022,2023\n北京,20,22,24\n上海,30,,36\n",
        );
        let config = StatisticsConfig::default();

        let df = append_statistics(load_table(&input).unwrap(), &config, &input).unwrap();

        assert_eq!(f64_column(&df, "均值"), vec![Some(22.0), Some(33.0)]);
        assert_eq!(f64_column(&df, "最大值"), vec![Some(24.0), Some(36.0)]);
        assert_eq!(f64_column(&df, "最小值"), vec![Some(20.0), Some(30.0)]);
    }

    #[test]
    fn test_rerun_does_not_count_derived_columns() {
        let temp_dir = TempDir::new().unwrap();
        let input = write_table(
            &temp_dir,
            "pop.csv",
            "地区,2021,2022,均值,最大值,最小值\n北京,10,30,999,999,999\n",
        );
        let config = StatisticsConfig::default();

        let df = append_statistics(load_table(&input).unwrap(), &config, &input).unwrap();
        assert_eq!(f64_column(&df, "均值"), vec![Some(20.0)]);
        assert_eq!(f64_column(&df, "最大值"), vec![Some(30.0)]);
        assert_eq!(df.width(), 6);
    }

    #[test]
    fn test_label_only_table_is_invalid() {
        let temp_dir = TempDir::new().unwrap();
        let input = write_table(&temp_dir, "labels.csv", "地区\n北京\n");

        let result = calculate_statistics(
            &input,
            &temp_dir.path().join("out.csv"),
            &StatisticsConfig::default(),
        );
        assert!(matches!(result, Err(PopdataError::InvalidTable { .. })));
    }

    #[test]
    fn test_missing_input_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let result = calculate_statistics(
            &temp_dir.path().join("missing.csv"),
            &temp_dir.path().join("out.csv"),
            &StatisticsConfig::default(),
        );
        assert!(matches!(result, Err(PopdataError::NotFound { .. })));
    }

    #[test]
    fn test_calculate_statistics_writes_output() {
        let temp_dir = TempDir::new().unwrap();
        let input = write_table(&temp_dir, "pop.csv", "地区,2021,2022\n北京,20,22\n");
        let output = temp_dir.path().join("pop_stats.csv");

        let stats = calculate_statistics(
            &input,
            &output,
            &StatisticsConfig::default().with_bom(false),
        )
        .unwrap();

        assert_eq!(stats.rows, 1);
        assert_eq!(stats.value_columns, 2);

        let written = fs::read_to_string(&output).unwrap();
        let header = written.lines().next().unwrap();
        assert_eq!(header, "地区,2021,2022,均值,最大值,最小值");
    }
}
