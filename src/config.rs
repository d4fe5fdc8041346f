//! Configuration management and validation.
//!
//! Provides the masking rules, input discovery settings and output options
//! for a batch run. Configuration is layered: built-in defaults, then an
//! optional JSON file, then command-line overrides.

use crate::constants::{
    APP_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_FILE_PATTERN, DEFAULT_INFER_SCHEMA_LENGTH,
    MASTER_FILE_NAME, MAX_DEFAULT_WORKERS, MAX_VALID_LST, MIN_VALID_LST, SENTINEL_VALUE,
    SUMMARY_FILE_NAME,
};
use crate::error::{ProcessorError, Result};
use polars::prelude::ParquetCompression;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Thresholds used to decide which covariate values are masked
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskingRules {
    /// Out-of-band marker for "no data at source", masked in every covariate
    pub sentinel: f64,

    /// Temperatures below this are masked
    pub min_valid_temperature: f64,

    /// Temperatures above this are masked
    pub max_valid_temperature: f64,
}

impl Default for MaskingRules {
    fn default() -> Self {
        Self {
            sentinel: SENTINEL_VALUE,
            min_valid_temperature: MIN_VALID_LST,
            max_valid_temperature: MAX_VALID_LST,
        }
    }
}

/// Supported compression algorithms for the master parquet file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionAlgorithm {
    /// Snappy compression - good balance of speed and compression
    Snappy,
    /// ZSTD compression - better compression ratio, slower
    Zstd,
    /// LZ4 compression - fastest, lower compression ratio
    Lz4,
    /// No compression
    #[serde(alias = "none")]
    Uncompressed,
}

impl CompressionAlgorithm {
    /// Convert to polars ParquetCompression type
    pub fn to_polars_compression(&self) -> ParquetCompression {
        match self {
            CompressionAlgorithm::Snappy => ParquetCompression::Snappy,
            CompressionAlgorithm::Zstd => ParquetCompression::Zstd(None),
            CompressionAlgorithm::Lz4 => ParquetCompression::Lz4Raw,
            CompressionAlgorithm::Uncompressed => ParquetCompression::Uncompressed,
        }
    }

    /// Parse the command-line spelling of a compression algorithm
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "snappy" => Ok(Self::Snappy),
            "zstd" => Ok(Self::Zstd),
            "lz4" => Ok(Self::Lz4),
            "none" | "uncompressed" => Ok(Self::Uncompressed),
            other => Err(ProcessorError::configuration(format!(
                "unknown compression '{}' (expected snappy, zstd, lz4 or none)",
                other
            ))),
        }
    }
}

/// Global configuration for a preprocessing run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Sentinel and plausibility thresholds
    pub masking: MaskingRules,

    /// Glob matched against file names in the data directory
    pub file_pattern: String,

    /// File name of the combined table in the output directory
    pub master_file_name: String,

    /// File name of the JSON report array in the output directory
    pub summary_file_name: String,

    /// Maximum number of tables cleaned at the same time
    pub max_concurrent_files: usize,

    /// Rows sampled when inferring CSV column types
    pub infer_schema_length: usize,

    /// Also write the master table as parquet next to the CSV
    pub write_master_parquet: bool,

    /// Compression for the master parquet file
    pub compression: CompressionAlgorithm,

    /// Fraction of system memory in use above which concurrency is halved
    pub memory_threshold: f64,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            masking: MaskingRules::default(),
            file_pattern: DEFAULT_FILE_PATTERN.to_string(),
            master_file_name: MASTER_FILE_NAME.to_string(),
            summary_file_name: SUMMARY_FILE_NAME.to_string(),
            max_concurrent_files: num_cpus::get().clamp(1, MAX_DEFAULT_WORKERS),
            infer_schema_length: DEFAULT_INFER_SCHEMA_LENGTH,
            write_master_parquet: false,
            compression: CompressionAlgorithm::Snappy,
            memory_threshold: 0.8,
        }
    }
}

impl ProcessorConfig {
    /// Default location of the optional configuration file
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load configuration from a JSON file; missing keys keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ProcessorError::InputNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load defaults, overlaid by an explicit file or the default config file if present
    pub fn load_layered(config_file: Option<&Path>) -> Result<Self> {
        match config_file {
            Some(path) => Self::from_file(path),
            None => match Self::default_config_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(&path),
                None => Ok(Self::default()),
            },
        }
    }

    /// Reject settings that would make the run meaningless
    pub fn validate(&self) -> Result<()> {
        let rules = &self.masking;
        if !rules.sentinel.is_finite()
            || !rules.min_valid_temperature.is_finite()
            || !rules.max_valid_temperature.is_finite()
        {
            return Err(ProcessorError::configuration(
                "masking thresholds must be finite numbers",
            ));
        }
        if rules.min_valid_temperature >= rules.max_valid_temperature {
            return Err(ProcessorError::configuration(format!(
                "min_valid_temperature ({}) must be below max_valid_temperature ({})",
                rules.min_valid_temperature, rules.max_valid_temperature
            )));
        }
        if self.max_concurrent_files == 0 {
            return Err(ProcessorError::configuration(
                "max_concurrent_files must be at least 1",
            ));
        }
        if self.infer_schema_length == 0 {
            return Err(ProcessorError::configuration(
                "infer_schema_length must be at least 1",
            ));
        }
        if self.master_file_name.trim().is_empty() || self.summary_file_name.trim().is_empty() {
            return Err(ProcessorError::configuration(
                "output file names must not be empty",
            ));
        }
        if !(0.0..=1.0).contains(&self.memory_threshold) {
            return Err(ProcessorError::configuration(
                "memory_threshold must be between 0 and 1",
            ));
        }
        if self.file_pattern.trim().is_empty() {
            return Err(ProcessorError::configuration("file_pattern must not be empty"));
        }
        glob::Pattern::new(&self.file_pattern)?;
        Ok(())
    }

    /// Set the input file pattern
    pub fn with_file_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.file_pattern = pattern.into();
        self
    }

    /// Set maximum concurrent files
    pub fn with_max_concurrent_files(mut self, max_files: usize) -> Self {
        self.max_concurrent_files = max_files;
        self
    }

    /// Replace the masking thresholds
    pub fn with_masking(mut self, masking: MaskingRules) -> Self {
        self.masking = masking;
        self
    }

    /// Write the master table as parquet too, with the given compression
    pub fn with_master_parquet(mut self, compression: CompressionAlgorithm) -> Self {
        self.write_master_parquet = true;
        self.compression = compression;
        self
    }
}
