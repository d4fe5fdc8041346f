//! Concurrent per-file cleaning pipeline
//!
//! Each table is read, masked, imputed and written by exactly one worker.
//! Tables share no state, so independent files run in parallel with bounded
//! concurrency; results come back in input order.

use crate::config::ProcessorConfig;
use crate::error::{ProcessorError, Result};
use crate::models::FileReport;
use crate::processor::clean_table;
use crate::processor::writer::OutputWriter;
use crate::table::read_table;

use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use polars::prelude::DataFrame;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use sysinfo::System;
use tokio::sync::Mutex;
use tokio::task;
use tracing::{debug, error, info};

/// Outcome of cleaning one input file
#[derive(Debug)]
pub struct CleanedFile {
    pub source: PathBuf,
    pub output_path: PathBuf,
    pub table: DataFrame,
    pub report: FileReport,
}

/// Streaming processor for a batch of input tables
#[derive(Debug)]
pub struct StreamingProcessor {
    config: ProcessorConfig,
    writer: OutputWriter,
    system_monitor: Arc<Mutex<System>>,
    memory_threshold: f64,
}

impl StreamingProcessor {
    /// Create a new streaming processor
    pub fn new(config: ProcessorConfig, writer: OutputWriter) -> Self {
        let memory_threshold = config.memory_threshold;
        Self {
            config,
            writer,
            system_monitor: Arc::new(Mutex::new(System::new())),
            memory_threshold,
        }
    }

    /// Whether used memory is above the configured share of total memory
    pub async fn check_memory_pressure(&self) -> bool {
        let (used, total) = {
            let mut system = self.system_monitor.lock().await;
            system.refresh_memory();
            (system.used_memory(), system.total_memory())
        };

        let under_pressure = exceeds_memory_threshold(used, total, self.memory_threshold);
        if under_pressure {
            debug!(
                "{} of {} bytes in use, above the {:.0}% threshold",
                used,
                total,
                self.memory_threshold * 100.0
            );
        }
        under_pressure
    }

    /// Clean every file, returning one result per file in input order
    pub async fn process_files(&self, files: &[PathBuf]) -> Vec<(PathBuf, Result<CleanedFile>)> {
        if files.is_empty() {
            return Vec::new();
        }

        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb.set_message("Cleaning tables");

        let mut concurrent_limit = self.config.max_concurrent_files.min(files.len()).max(1);
        if self.check_memory_pressure().await {
            concurrent_limit = (concurrent_limit / 2).max(1);
            debug!(
                "Memory pressure detected, reducing concurrency to {}",
                concurrent_limit
            );
        }

        let results = stream::iter(files.iter().cloned())
            .map(|file_path| {
                let pb = pb.clone();
                let config = self.config.clone();
                let writer = self.writer.clone();
                async move {
                    if let Some(file_name) = file_path.file_name() {
                        pb.set_message(format!("Processing: {}", file_name.to_string_lossy()));
                    }

                    let task_path = file_path.clone();
                    let result = task::spawn_blocking(move || {
                        process_single_file(&task_path, &config, &writer)
                    })
                    .await
                    .map_err(|e| ProcessorError::ProcessingFailed {
                        path: file_path.clone(),
                        reason: format!("Worker task failed: {}", e),
                    })
                    .and_then(|r| r);

                    pb.inc(1);
                    if let Err(e) = &result {
                        error!("Failed to process {}: {:#}", file_path.display(), e);
                    }
                    (file_path, result)
                }
            })
            .buffered(concurrent_limit)
            .collect::<Vec<_>>()
            .await;

        pb.finish_with_message("All tables cleaned");
        results
    }
}

/// Usage strictly above `threshold` (a fraction of `total`) counts as pressure.
/// An unknown total never does.
fn exceeds_memory_threshold(used: u64, total: u64, threshold: f64) -> bool {
    total > 0 && used as f64 / total as f64 > threshold
}

/// Read, mask, impute and write a single table
pub fn process_single_file(
    file_path: &Path,
    config: &ProcessorConfig,
    writer: &OutputWriter,
) -> Result<CleanedFile> {
    let file_name = file_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| ProcessorError::ProcessingFailed {
            path: file_path.to_path_buf(),
            reason: "path has no file name".to_string(),
        })?;

    debug!("Processing table: {}", file_path.display());
    let mut table = read_table(file_path, config)?;
    let report = clean_table(&mut table, &file_name, &config.masking)?;
    let output_path = writer.write_table(&mut table, &file_name)?;

    info!(
        "{}: {} rows, LST outliers masked: {}, values imputed: {}",
        file_name,
        report.total_rows,
        report.outliers_masked.get("lst_celsius").copied().unwrap_or(0),
        report.total_imputed()
    );

    Ok(CleanedFile {
        source: file_path.to_path_buf(),
        output_path,
        table,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_processor(temp_dir: &TempDir) -> StreamingProcessor {
        let config = ProcessorConfig::default();
        let writer = OutputWriter::new(temp_dir.path().join("out"), config.clone());
        StreamingProcessor::new(config, writer)
    }

    #[test]
    fn test_memory_threshold_boundaries() {
        assert!(exceeds_memory_threshold(9, 10, 0.8));
        assert!(!exceeds_memory_threshold(8, 10, 0.8));
        assert!(!exceeds_memory_threshold(10, 10, 1.0));
        assert!(exceeds_memory_threshold(1, 10, 0.0));
        assert!(!exceeds_memory_threshold(0, 0, 0.0));
    }

    #[tokio::test]
    async fn test_full_threshold_never_reports_pressure() {
        let temp_dir = TempDir::new().unwrap();
        let config = ProcessorConfig {
            memory_threshold: 1.0,
            ..Default::default()
        };
        let writer = OutputWriter::new(temp_dir.path().join("out"), config.clone());
        let processor = StreamingProcessor::new(config, writer);

        assert!(!processor.check_memory_pressure().await);
    }

    #[tokio::test]
    async fn test_empty_file_list() {
        let temp_dir = TempDir::new().unwrap();
        let processor = create_test_processor(&temp_dir);

        let results = processor.process_files(&[]).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_results_keep_input_order_and_isolate_failures() {
        let temp_dir = TempDir::new().unwrap();
        let processor = create_test_processor(&temp_dir);

        let good_a = temp_dir.path().join("kerala_env_2019.csv");
        let bad = temp_dir.path().join("kerala_env_2020.csv");
        let good_b = temp_dir.path().join("kerala_env_2021.csv");
        fs::write(
            &good_a,
            "grid_id,date,month,ndvi\nG1,2019-01-01,1,0.2\nG1,2019-02-01,2,-999\n",
        )
        .unwrap();
        fs::write(&bad, "ndvi\n0.3\n").unwrap();
        fs::write(
            &good_b,
            "grid_id,date,month,ndvi\nG1,2021-01-01,1,0.5\n",
        )
        .unwrap();

        let files = vec![good_a.clone(), bad.clone(), good_b.clone()];
        let results = processor.process_files(&files).await;

        let paths: Vec<_> = results.iter().map(|(p, _)| p.clone()).collect();
        assert_eq!(paths, files);
        assert!(results[0].1.is_ok());
        assert!(results[1].1.is_err());
        assert!(results[2].1.is_ok());

        let first = results[0].1.as_ref().unwrap();
        assert_eq!(first.report.outliers_masked["ndvi"], 1);
        assert_eq!(first.report.values_imputed["ndvi"], 1);
        assert!(first.output_path.exists());
    }

    #[test]
    fn test_process_single_file_missing_input() {
        let temp_dir = TempDir::new().unwrap();
        let config = ProcessorConfig::default();
        let writer = OutputWriter::new(temp_dir.path().join("out"), config.clone());

        let result = process_single_file(&temp_dir.path().join("nope.csv"), &config, &writer);
        assert!(matches!(result, Err(ProcessorError::InputNotFound { .. })));
    }
}
