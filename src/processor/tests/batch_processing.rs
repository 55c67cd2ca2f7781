//! Multi-source extraction tests

use super::{population_export, write_source};
use crate::config::ExtractorConfig;
use crate::error::PopdataError;
use crate::processor::BatchProcessor;
use crate::processor::discovery::discover_sources;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_directory_batch_with_mixed_outcomes() {
    let temp_dir = TempDir::new().unwrap();
    write_source(&temp_dir, "a_population.txt", &population_export());
    write_source(&temp_dir, "b_empty.txt", "nothing to see\n");
    write_source(&temp_dir, "c_population.txt", &population_export());

    let sources = discover_sources(&[temp_dir.path().to_path_buf()]).unwrap();
    assert_eq!(sources.len(), 3);

    let processor = BatchProcessor::new(ExtractorConfig::default()).unwrap();
    let (stats, outcomes) = processor.process(&sources, None).unwrap();

    assert_eq!(stats.files_processed, 2);
    assert_eq!(stats.empty_sources, 1);
    assert_eq!(stats.files_failed, 0);
    assert_eq!(stats.total_rows, 8);
    assert!(temp_dir.path().join("a_population_cleaned.csv").exists());
    assert!(!temp_dir.path().join("b_empty_cleaned.csv").exists());
    assert!(matches!(
        outcomes[1].result,
        Err(PopdataError::EmptyResult { .. })
    ));
}

#[test]
fn test_missing_source_counted_as_failure() {
    let temp_dir = TempDir::new().unwrap();
    let good = write_source(&temp_dir, "good.txt", &population_export());
    let missing = temp_dir.path().join("missing.txt");

    let processor = BatchProcessor::new(ExtractorConfig::default()).unwrap();
    let (stats, outcomes) = processor.process(&[missing, good], None).unwrap();

    assert_eq!(stats.files_failed, 1);
    assert_eq!(stats.files_processed, 1);
    assert!(matches!(
        outcomes[0].result,
        Err(PopdataError::NotFound { .. })
    ));
}

#[test]
fn test_explicit_output_requires_single_source() {
    let temp_dir = TempDir::new().unwrap();
    let a = write_source(&temp_dir, "a.txt", &population_export());
    let b = write_source(&temp_dir, "b.txt", &population_export());
    let output = temp_dir.path().join("combined.csv");

    let processor = BatchProcessor::new(ExtractorConfig::default()).unwrap();
    let result = processor.process(&[a.clone(), b], Some(&output));
    assert!(matches!(result, Err(PopdataError::Configuration { .. })));

    let (stats, _) = processor.process(&[a], Some(&output)).unwrap();
    assert_eq!(stats.outputs, vec![output.clone()]);
    assert!(fs::metadata(&output).unwrap().len() > 0);
}
