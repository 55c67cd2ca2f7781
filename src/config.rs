//! Configuration management and validation.
//!
//! Provides configuration structures for the extractor, the statistics step,
//! and operation dispatch. Values come from defaults, an optional TOML file,
//! and finally command-line overrides.

use crate::constants::{
    CONFIG_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_ASSETS_DIR, DEFAULT_GENERATE_ENDPOINT,
    DEFAULT_HEADER_LABELS, DEFAULT_MODEL, DEFAULT_SERIES_WINDOW, FOOTER_MARKER,
    GENERATE_TIMEOUT_SECS, REGION_CATALOG, REGION_LABEL, stats_columns,
};
use crate::error::{PopdataError, Result};
use crate::models::BoundaryPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Top-level configuration passed to every component
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub extractor: ExtractorConfig,
    pub statistics: StatisticsConfig,
    pub dispatch: DispatchConfig,
}

/// Settings for the fixed-format table extractor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Boundary detection policy
    pub policy: BoundaryPolicy,

    /// Prefixes marking header lines under the label-prefix policy
    pub header_labels: Vec<String>,

    /// Prefixes opening the body under the region-prefix policy
    pub region_labels: Vec<String>,

    /// Leading text of footnote lines that end the body
    pub footer_marker: String,

    /// Drop empty lines inside the body instead of writing them out
    pub skip_blank_lines: bool,

    /// Write a UTF-8 BOM so spreadsheet applications detect the encoding
    pub write_bom: bool,

    /// Write to a temporary file and rename into place on success
    pub atomic_write: bool,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        let mut region_labels = vec![REGION_LABEL.to_string()];
        region_labels.extend(REGION_CATALOG.iter().map(|r| r.to_string()));

        Self {
            policy: BoundaryPolicy::LabelPrefix,
            header_labels: DEFAULT_HEADER_LABELS.iter().map(|l| l.to_string()).collect(),
            region_labels,
            footer_marker: FOOTER_MARKER.to_string(),
            skip_blank_lines: true,
            write_bom: true,
            atomic_write: true,
        }
    }
}

impl ExtractorConfig {
    /// Select the boundary policy
    pub fn with_policy(mut self, policy: BoundaryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the header label prefixes
    pub fn with_header_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.header_labels = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the region label prefixes
    pub fn with_region_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.region_labels = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Set the footer marker
    pub fn with_footer_marker(mut self, marker: impl Into<String>) -> Self {
        self.footer_marker = marker.into();
        self
    }

    /// Keep or drop empty body lines
    pub fn with_skip_blank_lines(mut self, skip_blank_lines: bool) -> Self {
        self.skip_blank_lines = skip_blank_lines;
        self
    }

    /// Enable or disable the output BOM
    pub fn with_bom(mut self, write_bom: bool) -> Self {
        self.write_bom = write_bom;
        self
    }

    /// Enable or disable temp-file-and-rename output
    pub fn with_atomic_write(mut self, atomic_write: bool) -> Self {
        self.atomic_write = atomic_write;
        self
    }

    /// Prefixes that drive the active policy
    pub fn active_prefixes(&self) -> &[String] {
        match self.policy {
            BoundaryPolicy::LabelPrefix => &self.header_labels,
            BoundaryPolicy::RegionPrefix => &self.region_labels,
        }
    }

    /// Reject settings that would make every line ambiguous
    pub fn validate(&self) -> Result<()> {
        let prefixes = self.active_prefixes();
        if prefixes.is_empty() {
            return Err(PopdataError::configuration(format!(
                "no prefixes configured for the {} policy",
                self.policy
            )));
        }
        if prefixes.iter().any(|p| p.trim().is_empty()) {
            return Err(PopdataError::configuration(
                "prefix list contains an empty entry, which would match every line",
            ));
        }
        if self.footer_marker.trim().is_empty() {
            return Err(PopdataError::configuration("footer marker must not be empty"));
        }
        Ok(())
    }
}

/// Settings for the statistics and series steps
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatisticsConfig {
    pub mean_column: String,
    pub max_column: String,
    pub min_column: String,

    /// Trailing value columns used by the distribution and trend series
    pub series_window: usize,

    pub write_bom: bool,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            mean_column: stats_columns::MEAN.to_string(),
            max_column: stats_columns::MAX.to_string(),
            min_column: stats_columns::MIN.to_string(),
            series_window: DEFAULT_SERIES_WINDOW,
            write_bom: true,
        }
    }
}

impl StatisticsConfig {
    pub fn with_series_window(mut self, window: usize) -> Self {
        self.series_window = window;
        self
    }

    pub fn with_bom(mut self, write_bom: bool) -> Self {
        self.write_bom = write_bom;
        self
    }

    /// Names of the columns appended by the statistics step
    pub fn derived_columns(&self) -> [&str; 3] {
        [&self.mean_column, &self.max_column, &self.min_column]
    }

    pub fn validate(&self) -> Result<()> {
        if self.series_window == 0 {
            return Err(PopdataError::configuration("series window must be at least 1"));
        }
        let [mean, max, min] = self.derived_columns();
        if mean == max || mean == min || max == min {
            return Err(PopdataError::configuration(
                "statistics column names must be distinct",
            ));
        }
        Ok(())
    }
}

/// Settings for the operation registry and generate requests
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Directory against which operation file names are resolved
    pub assets_dir: PathBuf,
    pub model: String,
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            assets_dir: PathBuf::from(DEFAULT_ASSETS_DIR),
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_GENERATE_ENDPOINT.to_string(),
            timeout_secs: GENERATE_TIMEOUT_SECS,
        }
    }
}

impl DispatchConfig {
    pub fn with_assets_dir(mut self, assets_dir: impl Into<PathBuf>) -> Self {
        self.assets_dir = assets_dir.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Resolve an operation file argument against the assets directory
    pub fn resolve(&self, file_name: &str) -> PathBuf {
        let path = Path::new(file_name);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.assets_dir.join(path)
        }
    }
}

impl AppConfig {
    /// Platform default location, e.g. `~/.config/popdata/config.toml`
    pub fn default_config_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
            .ok_or_else(|| PopdataError::configuration("could not determine config directory"))
    }

    /// Parse a TOML configuration file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PopdataError::configuration(format!(
                "failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            PopdataError::Configuration { message } => PopdataError::configuration(format!(
                "{} ({})",
                message,
                path.display()
            )),
            other => other,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)
            .map_err(|e| PopdataError::configuration(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Explicit file if given, else the default location if it exists, else defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            debug!("Loading configuration from {}", path.display());
            return Self::load_from_file(path);
        }

        match Self::default_config_path() {
            Ok(path) if path.exists() => {
                debug!("Loading configuration from {}", path.display());
                Self::load_from_file(&path)
            }
            _ => {
                debug!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.extractor.validate()?;
        self.statistics.validate()
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| PopdataError::configuration(format!("failed to serialize config: {}", e)))
    }
}
