//! Population Data Processor Library
//!
//! A Rust library for cleaning fixed-format statistical text exports (such
//! as year-end resident population tables) into CSV and working with the
//! cleaned tables.
//!
//! This library provides tools for:
//! - Locating the header, body, and footnote boundaries of an export in one pass
//! - Writing body rows as CSV, optionally BOM-prefixed, with atomic replacement
//! - Appending row-wise mean, maximum, and minimum columns
//! - Deriving proportion and trend series over the trailing year window
//! - Describing these operations to a language model and dispatching its choices

pub mod cli;
pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod header;
pub mod models;
pub mod processor;
pub mod registry;

// Re-export commonly used types
pub use client::GenerateClient;
pub use config::{AppConfig, ExtractorConfig, StatisticsConfig};
pub use error::{PopdataError, Result};
pub use models::{BoundaryPolicy, ExtractedRow, ExtractionStats};
pub use processor::extractor::{TableExtractor, extract_table};
pub use registry::{OperationRegistry, ToolCall};
