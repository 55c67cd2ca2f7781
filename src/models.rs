//! Core data structures and types for extraction and reporting.
//!
//! Defines the boundary policies, retained rows, and the statistics returned
//! by each processing step.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How the preamble/body boundary is located in a source export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum BoundaryPolicy {
    /// Lines starting with a column label are header lines and are dropped;
    /// body lines are re-split on the field delimiter.
    #[default]
    LabelPrefix,
    /// The first line starting with a region label opens the body and is
    /// kept; body lines are written verbatim.
    RegionPrefix,
}

impl BoundaryPolicy {
    /// Whether retained lines are written as-is rather than re-split
    pub fn is_verbatim(&self) -> bool {
        matches!(self, BoundaryPolicy::RegionPrefix)
    }
}

impl std::fmt::Display for BoundaryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BoundaryPolicy::LabelPrefix => write!(f, "label-prefix"),
            BoundaryPolicy::RegionPrefix => write!(f, "region-prefix"),
        }
    }
}

/// A body line retained by the extractor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractedRow {
    /// Fields split on the delimiter, written through the CSV writer
    Fields(Vec<String>),
    /// Original line text, written byte-for-byte
    Verbatim(String),
}

impl ExtractedRow {
    pub fn is_verbatim(&self) -> bool {
        matches!(self, ExtractedRow::Verbatim(_))
    }

    /// Number of delimited fields in the row
    pub fn field_count(&self) -> usize {
        match self {
            ExtractedRow::Fields(fields) => fields.len(),
            ExtractedRow::Verbatim(line) => line.split(crate::constants::FIELD_DELIMITER).count(),
        }
    }
}

/// Line accounting for one pass over a source document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    pub lines_read: usize,
    pub preamble_lines: usize,
    pub header_lines: usize,
    pub blank_lines: usize,
    pub footer_found: bool,
    pub body_rows: usize,
    pub bom_stripped: bool,
}

/// Outcome of extracting one source export
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractionStats {
    pub source_path: PathBuf,
    pub output_path: PathBuf,
    pub policy: BoundaryPolicy,
    pub scan: ScanStats,
    pub rows_written: usize,
    pub processing_time_ms: u128,
}

/// Outcome of the statistics step
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatisticsStats {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub rows: usize,
    pub value_columns: usize,
}

/// One slice of the proportion breakdown
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionSlice {
    pub label: String,
    pub mean: Option<f64>,
    pub share: Option<f64>,
}

/// One point of a single row's trend series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub column: String,
    pub value: Option<f64>,
}

/// Batch totals reported by the CLI
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub files_processed: usize,
    pub files_failed: usize,
    pub empty_sources: usize,
    pub total_rows: usize,
    pub outputs: Vec<PathBuf>,
    pub processing_time_ms: u128,
}
