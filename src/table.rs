//! Observation table loading and typed column access.
//!
//! Reads a per-year CSV into a polars `DataFrame`, normalises column names
//! and dates, and exposes covariate columns as `Vec<Option<f64>>` so the
//! cleaning stages work on an explicit missing-value representation.

use crate::config::ProcessorConfig;
use crate::constants::{DATE_FORMATS, DATETIME_FORMATS, OUTPUT_DATE_FORMAT, columns};
use crate::error::{ProcessorError, Result};
use crate::models::Covariate;
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Columns without which a table cannot be grouped or ordered
const REQUIRED_COLUMNS: &[&str] = &[columns::GRID_ID, columns::DATE];

/// Read one observation table from disk
///
/// Column names are trimmed, required columns are checked, and the `date`
/// column is rewritten as ISO dates with unparseable entries set to null.
pub fn read_table(path: &Path, config: &ProcessorConfig) -> Result<DataFrame> {
    if !path.exists() {
        return Err(ProcessorError::InputNotFound {
            path: path.to_path_buf(),
        });
    }

    let mut df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(config.infer_schema_length))
        .with_schema_overwrite(Some(Arc::new(covariate_schema(path)?)))
        .with_ignore_errors(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()
        .map_err(|e| ProcessorError::InvalidFormat {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    normalize_column_names(&mut df)?;

    for required in REQUIRED_COLUMNS {
        if !has_column(&df, required) {
            return Err(ProcessorError::InvalidFormat {
                path: path.to_path_buf(),
                reason: format!("missing required column '{}'", required),
            });
        }
    }

    for expected in columns::EXPECTED {
        if !has_column(&df, expected) {
            debug!("{}: column '{}' not present", path.display(), expected);
        }
    }

    let unparsed = normalize_dates(&mut df)?;
    if unparsed > 0 {
        warn!(
            "{}: {} date values could not be parsed and were set to missing",
            path.display(),
            unparsed
        );
    }

    debug!(
        "Read {} rows x {} columns from {}",
        df.height(),
        df.width(),
        path.display()
    );

    Ok(df)
}

/// Float schema for every covariate named in the header row
///
/// Covariates are read as floats regardless of what the first rows suggest,
/// so a decimal or non-numeric cell late in the file becomes missing instead
/// of failing the whole table.
fn covariate_schema(path: &Path) -> Result<Schema> {
    let mut header = String::new();
    BufReader::new(File::open(path)?).read_line(&mut header)?;

    Ok(header
        .trim_end_matches(['\r', '\n'])
        .split(',')
        .filter(|raw| Covariate::from_column_name(raw.trim().trim_matches('"')).is_some())
        .map(|raw| (PlSmallStr::from(raw.trim_matches('"')), DataType::Float64))
        .collect())
}

/// Strip surrounding whitespace from every column name
pub fn normalize_column_names(df: &mut DataFrame) -> Result<()> {
    let names: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|name| name.as_str().trim().to_string())
        .collect();
    df.set_column_names(names)?;
    Ok(())
}

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| c.as_str() == name)
}

/// Parse a date cell, keeping only the calendar date of timestamps
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|ts| ts.date())
        })
}

/// Rewrite the `date` column as ISO strings; returns how many non-empty cells failed to parse
pub fn normalize_dates(df: &mut DataFrame) -> Result<usize> {
    let raw = string_column(df, columns::DATE)?;
    let mut unparsed = 0;

    let dates: Vec<Option<String>> = raw
        .iter()
        .map(|cell| match cell.as_deref() {
            Some(text) => match parse_date(text) {
                Some(date) => Some(date.format(OUTPUT_DATE_FORMAT).to_string()),
                None => {
                    if !text.trim().is_empty() {
                        unparsed += 1;
                    }
                    None
                }
            },
            None => None,
        })
        .collect();

    df.with_column(Series::new(columns::DATE.into(), dates))?;
    Ok(unparsed)
}

/// Read a column as nullable floats; cells that do not coerce become `None`
pub fn numeric_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let series = df
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    Ok(series
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect())
}

/// Replace (or add) a nullable float column
pub fn replace_numeric_column(df: &mut DataFrame, name: &str, values: Vec<Option<f64>>) -> Result<()> {
    df.with_column(Series::new(name.into(), values))?;
    Ok(())
}

/// Read any column as nullable strings
pub fn string_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let series = df
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::String)?;
    Ok(series
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Month of each row, from the `month` column or derived from `date` when absent
///
/// Non-integral or non-numeric months are treated as missing.
pub fn month_keys(df: &DataFrame) -> Result<Vec<Option<i64>>> {
    if has_column(df, columns::MONTH) {
        return Ok(numeric_column(df, columns::MONTH)?
            .into_iter()
            .map(|m| m.filter(|v| v.fract() == 0.0).map(|v| v as i64))
            .collect());
    }

    debug!("No month column, deriving months from dates");
    Ok(string_column(df, columns::DATE)?
        .into_iter()
        .map(|d| d.as_deref().and_then(parse_date).map(|d| d.month() as i64))
        .collect())
}

/// Stable sort by grid then date, rows with missing keys last
pub fn sort_by_grid_and_date(df: &DataFrame) -> Result<DataFrame> {
    let sorted = df.sort(
        [columns::GRID_ID, columns::DATE],
        SortMultipleOptions::default()
            .with_maintain_order(true)
            .with_nulls_last(true),
    )?;
    Ok(sorted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_csv(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        assert_eq!(parse_date("2020-03-01"), Some(expected));
        assert_eq!(parse_date("2020/03/01"), Some(expected));
        assert_eq!(parse_date("01/03/2020"), Some(expected));
        assert_eq!(parse_date(" 2020-03-01 00:00:00 "), Some(expected));
        assert_eq!(parse_date("2020-03-01T12:30:00"), Some(expected));
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("2020-13-45"), None);
    }

    #[test]
    fn test_read_table_normalizes_names_and_dates() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_csv(
            &temp_dir,
            "kerala_env_2020.csv",
            " grid_id , date ,month, lst_celsius \n\
             g1,2020-01-01,1,25.0\n\
             g1,garbage,2,26.0\n\
             g1,2020/03/01,3,27.0\n",
        );

        let df = read_table(&path, &ProcessorConfig::default()).unwrap();

        assert!(has_column(&df, "grid_id"));
        assert!(has_column(&df, "lst_celsius"));
        let dates = string_column(&df, "date").unwrap();
        assert_eq!(
            dates,
            vec![
                Some("2020-01-01".to_string()),
                None,
                Some("2020-03-01".to_string())
            ]
        );
    }

    #[test]
    fn test_bad_covariate_cells_beyond_inference_window() {
        let temp_dir = TempDir::new().unwrap();
        let mut content = String::from("grid_id,date,month, rainfall_mm ,ndvi\n");
        for row in 0..1200 {
            let rainfall = match row {
                1100 => "n/a",
                1150 => "2.5",
                _ => "5",
            };
            content.push_str(&format!("G{},2020-01-01,1,{},0.4\n", row, rainfall));
        }
        let path = write_csv(&temp_dir, "kerala_env_2020.csv", &content);

        let df = read_table(&path, &ProcessorConfig::default()).unwrap();

        assert_eq!(df.height(), 1200);
        let rainfall = numeric_column(&df, "rainfall_mm").unwrap();
        assert_eq!(rainfall[0], Some(5.0));
        assert_eq!(rainfall[1100], None);
        assert_eq!(rainfall[1150], Some(2.5));
        assert_eq!(rainfall[1199], Some(5.0));
    }

    #[test]
    fn test_read_table_missing_required_column() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_csv(&temp_dir, "bad.csv", "date,ndvi\n2020-01-01,0.4\n");

        let result = read_table(&path, &ProcessorConfig::default());
        match result {
            Err(ProcessorError::InvalidFormat { reason, .. }) => {
                assert!(reason.contains("grid_id"));
            }
            other => panic!("Expected InvalidFormat error, got {:?}", other),
        }
    }

    #[test]
    fn test_read_table_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("absent.csv");
        assert!(matches!(
            read_table(&path, &ProcessorConfig::default()),
            Err(ProcessorError::InputNotFound { .. })
        ));
    }

    #[test]
    fn test_numeric_column_coerces_bad_cells_to_missing() {
        let df = df![
            "ndvi" => [Some("0.5"), Some("oops"), None, Some("NaN"), Some("-999")],
        ]
        .unwrap();

        let values = numeric_column(&df, "ndvi").unwrap();
        assert_eq!(values, vec![Some(0.5), None, None, None, Some(-999.0)]);
    }

    #[test]
    fn test_month_keys_from_column() {
        let df = df![
            "date" => ["2020-01-01", "2020-02-01", "2020-03-01"],
            "month" => [Some(1.0), None, Some(2.5)],
        ]
        .unwrap();

        assert_eq!(month_keys(&df).unwrap(), vec![Some(1), None, None]);
    }

    #[test]
    fn test_month_keys_derived_from_date() {
        let df = df![
            "date" => [Some("2020-01-01"), None, Some("2020-11-01")],
        ]
        .unwrap();

        assert_eq!(month_keys(&df).unwrap(), vec![Some(1), None, Some(11)]);
    }

    #[test]
    fn test_sort_by_grid_and_date_puts_missing_dates_last() {
        let df = df![
            "grid_id" => ["b", "a", "a", "a"],
            "date" => [Some("2020-01-01"), None, Some("2020-02-01"), Some("2020-01-01")],
            "ndvi" => [1.0, 2.0, 3.0, 4.0],
        ]
        .unwrap();

        let sorted = sort_by_grid_and_date(&df).unwrap();
        let ndvi = numeric_column(&sorted, "ndvi").unwrap();
        assert_eq!(ndvi, vec![Some(4.0), Some(3.0), Some(2.0), Some(1.0)]);
    }
}
