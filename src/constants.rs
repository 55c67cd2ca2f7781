//! Application constants for the population data processor
//!
//! Default label catalogs, markers, and derived-file naming used when no
//! configuration overrides them.

// =============================================================================
// Source Format
// =============================================================================

/// UTF-8 byte order mark as it appears once decoded
pub const UTF8_BOM: char = '\u{feff}';

/// UTF-8 byte order mark as written to output files
pub const UTF8_BOM_BYTES: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Field delimiter used by the export body
pub const FIELD_DELIMITER: char = ',';

/// Leading character of footnote lines closing the export ("note")
pub const FOOTER_MARKER: &str = "注";

/// Column-label prefixes that identify header lines (database, indicator, time)
pub const DEFAULT_HEADER_LABELS: &[&str] = &["数据库", "指标", "时间"];

/// Generic row label heading the region column
pub const REGION_LABEL: &str = "地区";

/// Provincial-level administrative divisions recognised as body row labels
pub const REGION_CATALOG: &[&str] = &[
    "北京", "上海", "天津", "重庆", "黑龙江", "吉林", "辽宁", "内蒙古", "新疆", "西藏", "宁夏",
    "青海", "甘肃", "陕西", "四川", "云南", "贵州", "广西", "海南", "广东", "福建", "江西",
    "湖南", "湖北", "安徽", "浙江", "江苏", "山东", "河南", "河北", "山西",
];

// =============================================================================
// Derived Files
// =============================================================================

/// Extension of source exports picked up when a directory is given
pub const SOURCE_EXTENSION: &str = "txt";

/// Suffix appended to the source stem for extraction output
pub const CLEANED_SUFFIX: &str = "_cleaned";

/// Suffix appended to the input stem for statistics output
pub const STATS_SUFFIX: &str = "_stats";

/// Extension of every file this tool writes
pub const OUTPUT_EXTENSION: &str = "csv";

// =============================================================================
// Statistics and Series
// =============================================================================

/// Column names appended by the statistics step (mean, maximum, minimum)
pub mod stats_columns {
    pub const MEAN: &str = "均值";
    pub const MAX: &str = "最大值";
    pub const MIN: &str = "最小值";
}

/// Number of trailing value columns used by the distribution and trend series
pub const DEFAULT_SERIES_WINDOW: usize = 10;

// =============================================================================
// Operation Dispatch
// =============================================================================

/// Model name sent in generate requests
pub const DEFAULT_MODEL: &str = "mistral:latest";

/// Local text-generation endpoint
pub const DEFAULT_GENERATE_ENDPOINT: &str = "http://localhost:11434/api/generate";

/// Generate request timeout in seconds
pub const GENERATE_TIMEOUT_SECS: u64 = 1800;

// =============================================================================
// Configuration
// =============================================================================

/// Directory under the platform config dir holding `config.toml`
pub const CONFIG_DIR_NAME: &str = "popdata";

/// Configuration file name
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Default directory against which operation file names are resolved
pub const DEFAULT_ASSETS_DIR: &str = "assets";
