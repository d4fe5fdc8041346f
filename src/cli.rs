//! Command-line interface components.

use crate::config::{CompressionAlgorithm, ProcessorConfig};
use crate::constants::DEFAULT_OUTPUT_DIR;
use crate::error::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "envgrid")]
#[command(about = "Mask sentinels and impute gaps in gridded environmental time series")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
    /// Directory containing the yearly input tables
    #[arg(long, default_value = ".")]
    pub data_dir: PathBuf,

    /// Directory for cleaned tables, the master table and the summary
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// File name pattern for input tables (e.g. "kerala_env_*.csv")
    #[arg(long)]
    pub pattern: Option<String>,

    /// JSON configuration file (defaults to the user config directory if present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Maximum number of tables cleaned concurrently
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Also write the master table as Parquet
    #[arg(long)]
    pub master_parquet: bool,

    /// Parquet compression algorithm (snappy, zstd, lz4, none)
    #[arg(long, default_value = "snappy")]
    pub compression: String,

    /// Enable verbose logging
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Log level implied by the verbosity flags
    pub fn get_log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        }
    }

    /// Load layered configuration and apply command-line overrides
    pub fn build_config(&self) -> Result<ProcessorConfig> {
        let mut config = ProcessorConfig::load_layered(self.config.as_deref())?;

        if let Some(pattern) = &self.pattern {
            config.file_pattern = pattern.clone();
        }
        if let Some(workers) = self.workers {
            config.max_concurrent_files = workers;
        }
        if self.master_parquet {
            config.write_master_parquet = true;
            config.compression = CompressionAlgorithm::parse(&self.compression)?;
        }

        config.validate()?;
        Ok(config)
    }
}
