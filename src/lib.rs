//! Environmental Grid Processor Library
//!
//! Cleans per-grid monthly environmental time series (land surface
//! temperature, vegetation and water indices, radar backscatter, rainfall)
//! before they are loaded into a spatial store.
//!
//! This library provides tools for:
//! - Reading yearly observation tables with tolerant numeric and date parsing
//! - Masking sentinel values and implausible land surface temperatures
//! - Imputing gaps by intra-grid interpolation, then seasonal and global medians
//! - Writing cleaned tables, a combined master table and a JSON summary
//! - Per-file error isolation so one bad input never stops a batch

pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod imputation;
pub mod masking;
pub mod models;
pub mod processor;
pub mod table;

pub use config::{MaskingRules, ProcessorConfig};
pub use error::{ProcessorError, Result};
pub use models::{Covariate, FileReport, ProcessingStats};
pub use processor::{BatchProcessor, clean_table};
