//! Batch processing engine.
//!
//! Orchestrates a preprocessing run over a data directory: file discovery,
//! per-table masking and imputation, per-file output, and the combined
//! master table and JSON summary.

pub mod discovery;
pub mod streaming;
pub mod writer;

#[cfg(test)]
pub mod tests;

use self::{discovery::FileDiscovery, streaming::StreamingProcessor, writer::OutputWriter};

use crate::config::{MaskingRules, ProcessorConfig};
use crate::error::{ProcessorError, Result};
use crate::imputation::impute_missing;
use crate::masking::mask_outliers;
use crate::models::{FileReport, ProcessingStats};

use colored::*;
use polars::prelude::DataFrame;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Mask then impute one table in place and build its report
///
/// Masking always completes before imputation starts. The table ends up
/// sorted by grid and date.
pub fn clean_table(df: &mut DataFrame, source: &str, rules: &MaskingRules) -> Result<FileReport> {
    let outliers_masked = mask_outliers(df, rules)?;
    let imputation = impute_missing(df)?;
    Ok(FileReport::new(
        source,
        df.height(),
        outliers_masked,
        &imputation,
    ))
}

/// Main processor for a directory of observation tables
#[derive(Debug)]
pub struct BatchProcessor {
    data_dir: PathBuf,
    output_dir: PathBuf,
    config: ProcessorConfig,
    file_discovery: FileDiscovery,
    streaming_processor: StreamingProcessor,
    output_writer: OutputWriter,
}

impl BatchProcessor {
    /// Create a new batch processor
    pub fn new(data_dir: PathBuf, output_dir: PathBuf) -> Result<Self> {
        if !data_dir.is_dir() {
            return Err(ProcessorError::InputNotFound { path: data_dir });
        }

        let config = ProcessorConfig::default();
        let output_writer = OutputWriter::new(output_dir.clone(), config.clone());

        Ok(Self {
            file_discovery: FileDiscovery::new(data_dir.clone(), config.file_pattern.clone()),
            streaming_processor: StreamingProcessor::new(config.clone(), output_writer.clone()),
            data_dir,
            output_dir,
            config,
            output_writer,
        })
    }

    /// Configure the processor
    pub fn with_config(mut self, config: ProcessorConfig) -> Result<Self> {
        config.validate()?;
        self.output_writer = OutputWriter::new(self.output_dir.clone(), config.clone());
        self.file_discovery =
            FileDiscovery::new(self.data_dir.clone(), config.file_pattern.clone());
        self.streaming_processor =
            StreamingProcessor::new(config.clone(), self.output_writer.clone());
        self.config = config;
        Ok(self)
    }

    /// Main processing entry point
    pub async fn process(&self) -> Result<ProcessingStats> {
        let start_time = Instant::now();
        println!(
            "{}",
            "Starting environmental grid preprocessing".bright_green().bold()
        );
        println!("  {} {}", "Data:".bright_cyan(), self.data_dir.display());
        println!("  {} {}", "Output:".bright_cyan(), self.output_dir.display());

        // Step 1: Discover input tables
        let files = self.file_discovery.discover_files().await?;
        let mut stats = ProcessingStats {
            files_discovered: files.len(),
            output_dir: self.output_dir.clone(),
            ..Default::default()
        };

        if files.is_empty() {
            warn!(
                "No files found matching {} in {}",
                self.config.file_pattern,
                self.data_dir.display()
            );
            println!(
                "  {} {}",
                "No files found matching".bright_red(),
                self.config.file_pattern
            );
            stats.processing_time_ms = start_time.elapsed().as_millis();
            return Ok(stats);
        }
        println!(
            "  {} {} input tables",
            "Found".bright_green(),
            files.len().to_string().bright_white().bold()
        );

        // Step 2: Clean each table; a failed file is recorded and skipped
        println!("\n{}", "Cleaning tables...".bright_yellow());
        let results = self.streaming_processor.process_files(&files).await;

        let mut cleaned_tables = Vec::new();
        for (path, result) in results {
            match result {
                Ok(cleaned) => {
                    debug!(
                        "Cleaned {} -> {}",
                        cleaned.source.display(),
                        cleaned.output_path.display()
                    );
                    stats.files_processed += 1;
                    stats.total_rows += cleaned.report.total_rows;
                    stats.reports.push(cleaned.report);
                    cleaned_tables.push(cleaned.table);
                }
                Err(e) => {
                    stats.files_failed += 1;
                    stats.failures.push((path, e.to_string()));
                }
            }
        }

        // Step 3: Master table and summary from the successful files only
        if !cleaned_tables.is_empty() {
            if let Some(master) = self.output_writer.write_master(cleaned_tables)? {
                info!(
                    "Master table written: {} ({} rows)",
                    master.csv_path.display(),
                    master.rows
                );
                stats.master_path = Some(master.csv_path);
                stats.master_parquet_path = master.parquet_path;
            }
            let summary_path = self.output_writer.write_summary(&stats.reports)?;
            info!("Summary written: {}", summary_path.display());
            stats.summary_path = Some(summary_path);
        }

        stats.processing_time_ms = start_time.elapsed().as_millis();
        self.print_summary(&stats);

        Ok(stats)
    }

    fn print_summary(&self, stats: &ProcessingStats) {
        println!("\n{}", "Processing Summary".bright_green().bold());
        println!(
            "  {} {}ms",
            "Time elapsed:".bright_cyan(),
            stats.processing_time_ms.to_string().bright_white()
        );
        println!(
            "  {} {}",
            "Files processed:".bright_cyan(),
            stats.files_processed.to_string().bright_white()
        );
        if stats.files_failed > 0 {
            println!(
                "  {} {}",
                "Files failed:".bright_red(),
                stats.files_failed.to_string().bright_red().bold()
            );
            for (path, reason) in &stats.failures {
                println!("    {} {}", path.display().to_string().bright_red(), reason);
            }
        }
        println!(
            "  {} {}",
            "Total rows:".bright_cyan(),
            stats.total_rows.to_string().bright_white().bold()
        );
        for report in &stats.reports {
            println!(
                "  {} LST outliers: {}, imputed: {}",
                format!("{}:", report.source).bright_cyan(),
                report
                    .outliers_masked
                    .get("lst_celsius")
                    .copied()
                    .unwrap_or(0)
                    .to_string()
                    .bright_white(),
                report.total_imputed().to_string().bright_white()
            );
        }
        println!(
            "  {} {}",
            "Output directory:".bright_cyan(),
            stats.output_dir.display().to_string().bright_white()
        );
        if let Some(master) = &stats.master_path {
            println!(
                "  {} {}",
                "Master file:".bright_cyan(),
                master.display().to_string().bright_white()
            );
        }
        if let Some(summary) = &stats.summary_path {
            println!(
                "  {} {}",
                "Summary:".bright_cyan(),
                summary.display().to_string().bright_white()
            );
        }
    }
}
