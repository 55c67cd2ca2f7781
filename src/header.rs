//! Header, body, and footer boundary detection for fixed-format exports.
//!
//! A source export has a preamble, a header, a body, and a footnote block, in
//! that order. None of the boundaries sit at fixed line numbers, so they are
//! found by scanning each line once, top to bottom, with no lookahead:
//!
//! `ScanningPreamble -> ScanningBody -> Done`
//!
//! The transition into the body fires on a configured prefix match; the
//! transition to `Done` fires on the footer marker and is permanent.

use crate::config::ExtractorConfig;
use crate::constants::{FIELD_DELIMITER, UTF8_BOM};
use crate::error::{PopdataError, Result};
use crate::models::{BoundaryPolicy, ExtractedRow, ScanStats};
use regex::Regex;
use std::io::BufRead;
use std::path::Path;
use tracing::{debug, trace};

/// Anchored matcher over a set of literal line prefixes
#[derive(Debug, Clone)]
pub struct PrefixMatcher {
    pattern: Regex,
}

impl PrefixMatcher {
    /// Build a matcher for lines starting with any of `prefixes`
    pub fn new<S: AsRef<str>>(prefixes: &[S]) -> Result<Self> {
        if prefixes.is_empty() {
            return Err(PopdataError::configuration("prefix set is empty"));
        }

        let alternatives: Vec<String> = prefixes
            .iter()
            .map(|p| regex::escape(p.as_ref()))
            .collect();
        let pattern = Regex::new(&format!("^(?:{})", alternatives.join("|"))).map_err(|e| {
            PopdataError::configuration(format!("invalid prefix pattern: {}", e))
        })?;

        Ok(Self { pattern })
    }

    /// Whether the already-trimmed line begins with a configured prefix
    pub fn is_match(&self, trimmed: &str) -> bool {
        self.pattern.is_match(trimmed)
    }
}

/// Position of the scanner within the source document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    ScanningPreamble,
    ScanningBody,
    Done,
}

/// Single-pass line classifier implementing both boundary policies
#[derive(Debug)]
pub struct BoundaryScanner {
    policy: BoundaryPolicy,
    matcher: PrefixMatcher,
    footer_marker: String,
    skip_blank_lines: bool,
    state: ScanState,
    stats: ScanStats,
}

impl BoundaryScanner {
    pub fn new(config: &ExtractorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            policy: config.policy,
            matcher: PrefixMatcher::new(config.active_prefixes())?,
            footer_marker: config.footer_marker.clone(),
            skip_blank_lines: config.skip_blank_lines,
            state: ScanState::ScanningPreamble,
            stats: ScanStats::default(),
        })
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn stats(&self) -> &ScanStats {
        &self.stats
    }

    /// Classify the next source line, returning it if it belongs to the body
    pub fn feed(&mut self, line: &str) -> Option<ExtractedRow> {
        if self.state == ScanState::Done {
            return None;
        }

        let line = if self.stats.lines_read == 0 {
            match line.strip_prefix(UTF8_BOM) {
                Some(rest) => {
                    self.stats.bom_stripped = true;
                    rest
                }
                None => line,
            }
        } else {
            line
        };
        self.stats.lines_read += 1;

        let trimmed = line.trim();

        match self.state {
            ScanState::ScanningPreamble => {
                if !self.matcher.is_match(trimmed) {
                    self.stats.preamble_lines += 1;
                    return None;
                }

                self.state = ScanState::ScanningBody;
                debug!(
                    "Body starts after line {} ({} policy)",
                    self.stats.lines_read, self.policy
                );

                match self.policy {
                    BoundaryPolicy::LabelPrefix => {
                        self.stats.header_lines += 1;
                        None
                    }
                    BoundaryPolicy::RegionPrefix => Some(self.emit(line, trimmed)),
                }
            }
            ScanState::ScanningBody => {
                // Header blocks can span several label lines; none of them is data
                if self.policy == BoundaryPolicy::LabelPrefix && self.matcher.is_match(trimmed) {
                    self.stats.header_lines += 1;
                    return None;
                }

                if trimmed.starts_with(self.footer_marker.as_str()) {
                    self.state = ScanState::Done;
                    self.stats.footer_found = true;
                    debug!("Footer marker found at line {}", self.stats.lines_read);
                    return None;
                }

                if trimmed.is_empty() {
                    self.stats.blank_lines += 1;
                    if self.skip_blank_lines {
                        return None;
                    }
                }

                Some(self.emit(line, trimmed))
            }
            ScanState::Done => None,
        }
    }

    fn emit(&mut self, line: &str, trimmed: &str) -> ExtractedRow {
        self.stats.body_rows += 1;
        trace!("Retained line {}: {}", self.stats.lines_read, trimmed);

        if self.policy.is_verbatim() {
            return ExtractedRow::Verbatim(line.trim_end().to_string());
        }

        ExtractedRow::Fields(
            trimmed
                .split(FIELD_DELIMITER)
                .map(|field| field.to_string())
                .collect(),
        )
    }

    /// Close the scan and return its line accounting
    pub fn finish(self) -> ScanStats {
        self.stats
    }
}

/// Scan in-memory lines with the configured policy
pub fn scan_lines<I, S>(config: &ExtractorConfig, lines: I) -> Result<(Vec<ExtractedRow>, ScanStats)>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut scanner = BoundaryScanner::new(config)?;
    let mut rows = Vec::new();

    for line in lines {
        if let Some(row) = scanner.feed(line.as_ref()) {
            rows.push(row);
        }
        if scanner.state() == ScanState::Done {
            break;
        }
    }

    Ok((rows, scanner.finish()))
}

/// Scan a buffered reader, stopping at the footer without reading further
pub fn scan_reader<R: BufRead>(
    config: &ExtractorConfig,
    reader: R,
    source_path: &Path,
) -> Result<(Vec<ExtractedRow>, ScanStats)> {
    let mut scanner = BoundaryScanner::new(config)?;
    let mut rows = Vec::new();

    for line in reader.lines() {
        let line = line.map_err(|e| PopdataError::from_io(source_path, e))?;
        if let Some(row) = scanner.feed(&line) {
            rows.push(row);
        }
        if scanner.state() == ScanState::Done {
            break;
        }
    }

    Ok((rows, scanner.finish()))
}
