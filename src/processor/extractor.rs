//! Fixed-format table extraction
//!
//! Reads a source export once, keeps the body rows selected by the boundary
//! scanner, and writes them as CSV. Nothing is written unless at least one
//! row survives, and a source that cannot be read leaves any existing
//! output untouched.

use crate::config::ExtractorConfig;
use crate::error::{PopdataError, Result};
use crate::header::scan_reader;
use crate::models::{ExtractedRow, ExtractionStats, ScanStats};
use crate::processor::writer::OutputWriter;

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Extractor bound to one configuration
#[derive(Debug, Clone)]
pub struct TableExtractor {
    config: ExtractorConfig,
}

impl TableExtractor {
    pub fn new(config: ExtractorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Read `source` and return its body rows without writing anything
    pub fn read_rows(&self, source: &Path) -> Result<(Vec<ExtractedRow>, ScanStats)> {
        // The handle lives only for this scope, including on error
        let file = File::open(source).map_err(|e| PopdataError::from_io(source, e))?;
        let (rows, scan) = scan_reader(&self.config, BufReader::new(file), source)?;

        debug!(
            "Scanned {}: {} lines, {} preamble, {} header, {} body rows, footer={}",
            source.display(),
            scan.lines_read,
            scan.preamble_lines,
            scan.header_lines,
            scan.body_rows,
            scan.footer_found
        );

        Ok((rows, scan))
    }

    /// Extract the body of `source` into a CSV file at `destination`
    pub fn extract(&self, source: &Path, destination: &Path) -> Result<ExtractionStats> {
        let start_time = Instant::now();
        let (rows, scan) = self.read_rows(source)?;

        if rows.is_empty() {
            return Err(PopdataError::EmptyResult {
                path: source.to_path_buf(),
            });
        }

        let rows_written = OutputWriter::new(destination.to_path_buf())
            .with_bom(self.config.write_bom)
            .with_atomic(self.config.atomic_write)
            .write_rows(&rows)?;

        info!("Cleaned data saved to {}", destination.display());

        Ok(ExtractionStats {
            source_path: source.to_path_buf(),
            output_path: destination.to_path_buf(),
            policy: self.config.policy,
            scan,
            rows_written,
            processing_time_ms: start_time.elapsed().as_millis(),
        })
    }
}

/// Extract with a one-off configuration
pub fn extract_table(
    source: &Path,
    destination: &Path,
    config: &ExtractorConfig,
) -> Result<ExtractionStats> {
    TableExtractor::new(config.clone())?.extract(source, destination)
}
