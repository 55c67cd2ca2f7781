//! Processing engine for population table exports.
//!
//! Ties together source discovery, table extraction, output writing, and the
//! statistics and series steps that consume extraction results.

pub mod discovery;
pub mod extractor;
pub mod series;
pub mod stats;
pub mod writer;

#[cfg(test)]
pub mod tests;

use self::discovery::cleaned_output_path;
use self::extractor::TableExtractor;

use crate::config::ExtractorConfig;
use crate::error::{PopdataError, Result};
use crate::models::{ExtractionStats, ProcessingStats};

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, warn};

/// Result of one source in a batch run
#[derive(Debug)]
pub struct SourceOutcome {
    pub source: PathBuf,
    pub result: Result<ExtractionStats>,
}

/// Extracts a list of sources one after another
#[derive(Debug)]
pub struct BatchProcessor {
    extractor: TableExtractor,
    show_progress: bool,
}

impl BatchProcessor {
    pub fn new(config: ExtractorConfig) -> Result<Self> {
        Ok(Self {
            extractor: TableExtractor::new(config)?,
            show_progress: false,
        })
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Extract every source to its derived `_cleaned.csv` path, or to
    /// `output` when exactly one source is given
    pub fn process(
        &self,
        sources: &[PathBuf],
        output: Option<&Path>,
    ) -> Result<(ProcessingStats, Vec<SourceOutcome>)> {
        if output.is_some() && sources.len() != 1 {
            return Err(PopdataError::configuration(format!(
                "an explicit output path needs exactly one source, got {}",
                sources.len()
            )));
        }

        let start_time = Instant::now();
        let progress_bar = self.progress_bar(sources.len());

        let mut stats = ProcessingStats::default();
        let mut outcomes = Vec::with_capacity(sources.len());

        for source in sources {
            if let Some(pb) = &progress_bar {
                pb.set_message(source.display().to_string());
            }

            let destination = match output {
                Some(path) => path.to_path_buf(),
                None => cleaned_output_path(source),
            };

            let result = self.extractor.extract(source, &destination);
            match &result {
                Ok(extraction) => {
                    stats.files_processed += 1;
                    stats.total_rows += extraction.rows_written;
                    stats.outputs.push(extraction.output_path.clone());
                }
                Err(PopdataError::EmptyResult { path }) => {
                    warn!(
                        "No valid data found after removing headers and footers: {}",
                        path.display()
                    );
                    stats.empty_sources += 1;
                }
                Err(e) => {
                    error!("Failed to extract {}: {}", source.display(), e);
                    stats.files_failed += 1;
                }
            }

            outcomes.push(SourceOutcome {
                source: source.clone(),
                result,
            });

            if let Some(pb) = &progress_bar {
                pb.inc(1);
            }
        }

        if let Some(pb) = progress_bar {
            pb.finish_and_clear();
        }

        stats.processing_time_ms = start_time.elapsed().as_millis();
        Ok((stats, outcomes))
    }

    fn progress_bar(&self, total: usize) -> Option<ProgressBar> {
        if !self.show_progress || total < 2 {
            return None;
        }

        let pb = ProgressBar::new(total as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        pb.set_style(style);
        Some(pb)
    }
}

/// Print a colored summary of a batch run
pub fn print_summary(stats: &ProcessingStats) {
    println!("\n{}", "Extraction complete".bright_green().bold());
    println!(
        "  {} {}",
        "Files processed:".bright_cyan(),
        stats.files_processed.to_string().bright_white().bold()
    );
    if stats.empty_sources > 0 {
        println!(
            "  {} {}",
            "Empty sources:".bright_yellow(),
            stats.empty_sources
        );
    }
    if stats.files_failed > 0 {
        println!("  {} {}", "Failed:".bright_red(), stats.files_failed);
    }
    println!(
        "  {} {}",
        "Rows written:".bright_cyan(),
        stats.total_rows.to_string().bright_white().bold()
    );
    for output in &stats.outputs {
        println!("  {} {}", "Saved:".bright_cyan(), output.display());
    }
    println!(
        "  {} {}ms",
        "Time:".bright_cyan(),
        stats.processing_time_ms
    );
}
