//! Source discovery and derived output naming
//!
//! Expands directory arguments into the text exports they contain and
//! derives the names of the files each step writes.

use crate::constants::{CLEANED_SUFFIX, OUTPUT_EXTENSION, SOURCE_EXTENSION, STATS_SUFFIX};
use crate::error::{PopdataError, Result};

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Expand each input: files are kept, directories contribute their `*.txt` files
pub fn discover_sources(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut sources = Vec::new();

    for input in inputs {
        if input.is_dir() {
            let pattern = input.join(format!("*.{}", SOURCE_EXTENSION));
            let pattern = pattern.to_string_lossy();
            let mut found: Vec<PathBuf> = glob::glob(&pattern)
                .map_err(|e| {
                    PopdataError::configuration(format!(
                        "invalid source pattern {}: {}",
                        pattern, e
                    ))
                })?
                .filter_map(|entry| match entry {
                    Ok(path) if path.is_file() => Some(path),
                    Ok(_) => None,
                    Err(e) => {
                        warn!("Skipping unreadable entry: {}", e);
                        None
                    }
                })
                .collect();
            found.sort();

            debug!("Found {} sources in {}", found.len(), input.display());
            sources.extend(found);
        } else {
            sources.push(input.clone());
        }
    }

    Ok(sources)
}

/// `<dir>/<stem><suffix>.csv` alongside `input`
fn derived_path(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    input.with_file_name(format!("{}{}.{}", stem, suffix, OUTPUT_EXTENSION))
}

/// Output path for the extraction of `source`, e.g. `pop.txt` -> `pop_cleaned.csv`
pub fn cleaned_output_path(source: &Path) -> PathBuf {
    derived_path(source, CLEANED_SUFFIX)
}

/// Output path for statistics over `input`, e.g. `pop_cleaned.csv` -> `pop_cleaned_stats.csv`
pub fn stats_output_path(input: &Path) -> PathBuf {
    derived_path(input, STATS_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_derived_names() {
        assert_eq!(
            cleaned_output_path(Path::new("assets/permanent_population.txt")),
            PathBuf::from("assets/permanent_population_cleaned.csv")
        );
        assert_eq!(
            stats_output_path(Path::new("assets/permanent_population_cleaned.csv")),
            PathBuf::from("assets/permanent_population_cleaned_stats.csv")
        );
        assert_eq!(
            cleaned_output_path(Path::new("年末常住人口.txt")),
            PathBuf::from("年末常住人口_cleaned.csv")
        );
    }

    #[test]
    fn test_directory_expands_to_sorted_text_files() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("b.txt"), "x").unwrap();
        fs::write(temp_dir.path().join("a.txt"), "x").unwrap();
        fs::write(temp_dir.path().join("c.csv"), "x").unwrap();

        let sources = discover_sources(&[temp_dir.path().to_path_buf()]).unwrap();
        let names: Vec<_> = sources
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();

        assert_eq!(names, vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn test_files_pass_through_even_if_missing() {
        let missing = PathBuf::from("does/not/exist.txt");
        let sources = discover_sources(&[missing.clone()]).unwrap();
        assert_eq!(sources, vec![missing]);
    }
}
