//! Application constants for the environmental grid processor
//!
//! Column names, masking thresholds and output file names shared across
//! the reader, the cleaning stages and the batch writer.

// =============================================================================
// Masking Thresholds
// =============================================================================

/// Value written by the upstream export wherever the source had no data
pub const SENTINEL_VALUE: f64 = -999.0;

/// Lowest land surface temperature (°C) accepted as physically plausible
pub const MIN_VALID_LST: f64 = 10.0;

/// Highest land surface temperature (°C) accepted as physically plausible
pub const MAX_VALID_LST: f64 = 60.0;

// =============================================================================
// Input Discovery
// =============================================================================

/// Glob matched against file names in the data directory
pub const DEFAULT_FILE_PATTERN: &str = "kerala_env_*.csv";

/// Rows sampled by the CSV reader when inferring column types
pub const DEFAULT_INFER_SCHEMA_LENGTH: usize = 1000;

/// Upper bound on tables cleaned at the same time
pub const MAX_DEFAULT_WORKERS: usize = 8;

/// Accepted layouts for the `date` column, tried in order
pub const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"];

/// Accepted layouts for timestamps whose date part is kept
pub const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Layout written back to the `date` column
pub const OUTPUT_DATE_FORMAT: &str = "%Y-%m-%d";

// =============================================================================
// Output Files
// =============================================================================

/// Default output directory, relative to the working directory
pub const DEFAULT_OUTPUT_DIR: &str = "./preprocessed";

/// Combined table of every cleaned input
pub const MASTER_FILE_NAME: &str = "kerala_env_master_imputed.csv";

/// JSON array of per-file reports
pub const SUMMARY_FILE_NAME: &str = "imputation_summary.json";

/// Name of the optional JSON configuration file under the user config dir
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Application directory under the user config dir
pub const APP_DIR_NAME: &str = "envgrid_processor";

// =============================================================================
// Column Names
// =============================================================================

/// Column names of the observation table
pub mod columns {
    pub const GRID_ID: &str = "grid_id";
    pub const DATE: &str = "date";
    pub const YEAR: &str = "year";
    pub const MONTH: &str = "month";
    pub const LAT: &str = "lat";
    pub const LON: &str = "lon";

    // Covariates
    pub const LST_CELSIUS: &str = "lst_celsius";
    pub const NDVI: &str = "ndvi";
    pub const NDWI: &str = "ndwi";
    pub const RADAR_VH: &str = "radar_vh";
    pub const RAINFALL_MM: &str = "rainfall_mm";

    // Static per-grid attributes, passed through untouched
    pub const SLOPE: &str = "slope";
    pub const ELEVATION: &str = "elevation";

    /// Columns a complete input table carries
    pub const EXPECTED: &[&str] = &[
        GRID_ID,
        DATE,
        YEAR,
        MONTH,
        LAT,
        LON,
        LST_CELSIUS,
        NDVI,
        NDWI,
        RADAR_VH,
        RAINFALL_MM,
        SLOPE,
        ELEVATION,
    ];
}
