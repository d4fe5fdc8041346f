//! Output writing for cleaned tables
//!
//! Writes per-file cleaned CSVs, the combined master table (CSV and,
//! optionally, Parquet) and the JSON array of per-file reports.

use crate::config::ProcessorConfig;
use crate::error::{ProcessorError, Result};
use crate::models::FileReport;

use polars::prelude::{
    CsvWriter, DataFrame, IntoLazy, LazyFrame, ParquetWriter as PolarsParquetWriter, SerWriter,
    StatisticsOptions, UnionArgs, concat_lf_diagonal,
};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Paths written for the combined master table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterOutput {
    pub csv_path: PathBuf,
    pub parquet_path: Option<PathBuf>,
    pub rows: usize,
}

/// Writer for everything that lands in the output directory
#[derive(Debug, Clone)]
pub struct OutputWriter {
    output_dir: PathBuf,
    config: ProcessorConfig,
}

impl OutputWriter {
    /// Create a new output writer
    pub fn new(output_dir: PathBuf, config: ProcessorConfig) -> Self {
        Self { output_dir, config }
    }

    /// Create the output directory if needed
    pub fn ensure_output_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.output_dir)?;
        Ok(())
    }

    /// Write a cleaned table under its source file name, overwriting any previous run
    pub fn write_table(&self, df: &mut DataFrame, file_name: &str) -> Result<PathBuf> {
        self.ensure_output_dir()?;
        let path = self.output_dir.join(file_name);
        write_csv(df, &path)?;
        debug!("Wrote {} rows to {}", df.height(), path.display());
        Ok(path)
    }

    /// Concatenate cleaned tables in order and write the master table
    ///
    /// Tables with differing column sets are combined diagonally; columns
    /// missing from a table are null in its rows. No deduplication is done.
    pub fn write_master(&self, tables: Vec<DataFrame>) -> Result<Option<MasterOutput>> {
        if tables.is_empty() {
            return Ok(None);
        }
        self.ensure_output_dir()?;

        let frames: Vec<LazyFrame> = tables.into_iter().map(IntoLazy::lazy).collect();
        let mut master = concat_lf_diagonal(
            frames,
            UnionArgs {
                to_supertypes: true,
                ..Default::default()
            },
        )?
        .collect()?;

        let csv_path = self.output_dir.join(&self.config.master_file_name);
        write_csv(&mut master, &csv_path)?;

        let parquet_path = if self.config.write_master_parquet {
            let path = csv_path.with_extension("parquet");
            self.write_parquet(&mut master, &path)?;
            Some(path)
        } else {
            None
        };

        debug!(
            "Master table: {} rows x {} columns",
            master.height(),
            master.width()
        );

        Ok(Some(MasterOutput {
            csv_path,
            parquet_path,
            rows: master.height(),
        }))
    }

    /// Serialize the per-file reports as a pretty-printed JSON array
    pub fn write_summary(&self, reports: &[FileReport]) -> Result<PathBuf> {
        self.ensure_output_dir()?;
        let path = self.output_dir.join(&self.config.summary_file_name);
        let writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(writer, reports)?;
        debug!("Wrote {} reports to {}", reports.len(), path.display());
        Ok(path)
    }

    fn write_parquet(&self, df: &mut DataFrame, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        PolarsParquetWriter::new(file)
            .with_compression(self.config.compression.to_polars_compression())
            .with_statistics(StatisticsOptions::full())
            .finish(df)
            .map_err(|e| ProcessorError::ProcessingFailed {
                path: path.to_path_buf(),
                reason: format!("Failed to write parquet: {}", e),
            })?;
        Ok(())
    }
}

fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .finish(df)
        .map_err(|e| ProcessorError::ProcessingFailed {
            path: path.to_path_buf(),
            reason: format!("Failed to write CSV: {}", e),
        })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CompressionAlgorithm, ProcessorConfig};
    use crate::models::{CovariateCounts, ImputationSummary};
    use polars::prelude::*;
    use tempfile::TempDir;

    fn create_test_writer(temp_dir: &TempDir, config: ProcessorConfig) -> OutputWriter {
        OutputWriter::new(temp_dir.path().join("out"), config)
    }

    #[test]
    fn test_write_table_creates_output_dir() {
        let temp_dir = TempDir::new().unwrap();
        let writer = create_test_writer(&temp_dir, ProcessorConfig::default());
        let mut df = df!["grid_id" => ["G1"], "ndvi" => [0.4]].unwrap();

        let path = writer.write_table(&mut df, "kerala_env_2020.csv").unwrap();

        assert!(path.exists());
        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.starts_with("grid_id,ndvi"));
    }

    #[test]
    fn test_master_concatenates_without_dedup() {
        let temp_dir = TempDir::new().unwrap();
        let writer = create_test_writer(&temp_dir, ProcessorConfig::default());

        let a = df!["grid_id" => ["G1", "G2"], "ndvi" => [0.1, 0.2]].unwrap();
        let b = df!["grid_id" => ["G1"], "ndvi" => [0.1]].unwrap();

        let master = writer.write_master(vec![a, b]).unwrap().unwrap();

        assert_eq!(master.rows, 3);
        assert!(master.csv_path.ends_with("kerala_env_master_imputed.csv"));
        assert!(master.parquet_path.is_none());
        let content = std::fs::read_to_string(&master.csv_path).unwrap();
        assert_eq!(content.lines().count(), 4);
    }

    #[test]
    fn test_master_with_differing_columns() {
        let temp_dir = TempDir::new().unwrap();
        let writer = create_test_writer(&temp_dir, ProcessorConfig::default());

        let a = df!["grid_id" => ["G1"], "ndvi" => [0.1]].unwrap();
        let b = df!["grid_id" => ["G2"], "rainfall_mm" => [3.0]].unwrap();

        let master = writer.write_master(vec![a, b]).unwrap().unwrap();
        assert_eq!(master.rows, 2);

        let header = std::fs::read_to_string(&master.csv_path)
            .unwrap()
            .lines()
            .next()
            .unwrap()
            .to_string();
        assert_eq!(header, "grid_id,ndvi,rainfall_mm");
    }

    #[test]
    fn test_master_parquet_output() {
        let temp_dir = TempDir::new().unwrap();
        let config = ProcessorConfig::default().with_master_parquet(CompressionAlgorithm::Zstd);
        let writer = create_test_writer(&temp_dir, config);

        let a = df!["grid_id" => ["G1", "G2"], "ndvi" => [0.1, 0.2]].unwrap();
        let master = writer.write_master(vec![a]).unwrap().unwrap();

        let parquet_path = master.parquet_path.unwrap();
        assert!(parquet_path.ends_with("kerala_env_master_imputed.parquet"));

        let read_back = ParquetReader::new(File::open(&parquet_path).unwrap())
            .finish()
            .unwrap();
        assert_eq!(read_back.height(), 2);
    }

    #[test]
    fn test_empty_master_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let writer = create_test_writer(&temp_dir, ProcessorConfig::default());

        assert!(writer.write_master(vec![]).unwrap().is_none());
        assert!(!temp_dir.path().join("out").exists());
    }

    #[test]
    fn test_summary_is_json_array() {
        let temp_dir = TempDir::new().unwrap();
        let writer = create_test_writer(&temp_dir, ProcessorConfig::default());

        let reports = vec![
            FileReport::new("a.csv", 3, CovariateCounts::new(), &ImputationSummary::default()),
            FileReport::new("b.csv", 5, CovariateCounts::new(), &ImputationSummary::default()),
        ];
        let path = writer.write_summary(&reports).unwrap();

        let parsed: Vec<FileReport> =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(parsed, reports);
    }
}
