//! Core data structures and types for grid preprocessing.
//!
//! Defines the covariates that get cleaned, the per-file report that is
//! serialized into the batch summary, and the batch processing statistics.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::constants::columns;

/// Measured covariates that are masked and imputed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Covariate {
    LstCelsius,
    Ndvi,
    Ndwi,
    RadarVh,
    RainfallMm,
}

impl Covariate {
    /// Every covariate, in column order
    pub const ALL: [Covariate; 5] = [
        Covariate::LstCelsius,
        Covariate::Ndvi,
        Covariate::Ndwi,
        Covariate::RadarVh,
        Covariate::RainfallMm,
    ];

    /// Column name in the observation table
    pub fn column_name(&self) -> &'static str {
        match self {
            Covariate::LstCelsius => columns::LST_CELSIUS,
            Covariate::Ndvi => columns::NDVI,
            Covariate::Ndwi => columns::NDWI,
            Covariate::RadarVh => columns::RADAR_VH,
            Covariate::RainfallMm => columns::RAINFALL_MM,
        }
    }

    /// Whether a physical plausibility range applies on top of the sentinel check
    pub fn is_range_checked(&self) -> bool {
        matches!(self, Covariate::LstCelsius)
    }

    pub fn from_column_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.column_name() == name)
    }
}

impl fmt::Display for Covariate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// Covariate column name -> count, ordered for stable JSON output
pub type CovariateCounts = BTreeMap<String, usize>;

/// Number of cells each imputation stage filled for one covariate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFills {
    pub interpolated: usize,
    pub seasonal: usize,
    pub global: usize,
}

impl StageFills {
    pub fn total(&self) -> usize {
        self.interpolated + self.seasonal + self.global
    }
}

/// Imputation outcome for a single covariate column
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CovariateImputation {
    pub initially_missing: usize,
    pub stages: StageFills,
    pub still_missing: usize,
}

impl CovariateImputation {
    /// Cells that were missing before and hold a value now
    pub fn imputed(&self) -> usize {
        self.initially_missing - self.still_missing
    }
}

/// Imputation results for every covariate present in a table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImputationSummary {
    pub columns: BTreeMap<Covariate, CovariateImputation>,
}

impl ImputationSummary {
    pub fn values_imputed(&self) -> CovariateCounts {
        self.columns
            .iter()
            .map(|(c, r)| (c.column_name().to_string(), r.imputed()))
            .collect()
    }

    pub fn still_missing(&self) -> CovariateCounts {
        self.columns
            .iter()
            .map(|(c, r)| (c.column_name().to_string(), r.still_missing))
            .collect()
    }

    pub fn stage_fills(&self) -> BTreeMap<String, StageFills> {
        self.columns
            .iter()
            .map(|(c, r)| (c.column_name().to_string(), r.stages))
            .collect()
    }

    pub fn total_imputed(&self) -> usize {
        self.columns.values().map(CovariateImputation::imputed).sum()
    }
}

/// Per-table report written into the batch summary JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReport {
    pub source: String,
    pub total_rows: usize,
    pub outliers_masked: CovariateCounts,
    pub values_imputed: CovariateCounts,
    pub final_null_count: CovariateCounts,
    pub stage_fills: BTreeMap<String, StageFills>,
}

impl FileReport {
    pub fn new(
        source: impl Into<String>,
        total_rows: usize,
        outliers_masked: CovariateCounts,
        imputation: &ImputationSummary,
    ) -> Self {
        Self {
            source: source.into(),
            total_rows,
            outliers_masked,
            values_imputed: imputation.values_imputed(),
            final_null_count: imputation.still_missing(),
            stage_fills: imputation.stage_fills(),
        }
    }

    pub fn total_imputed(&self) -> usize {
        self.values_imputed.values().sum()
    }
}

/// Processing statistics for a batch run
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub files_discovered: usize,
    pub files_processed: usize,
    pub files_failed: usize,
    pub total_rows: usize,
    pub output_dir: PathBuf,
    pub master_path: Option<PathBuf>,
    pub master_parquet_path: Option<PathBuf>,
    pub summary_path: Option<PathBuf>,
    pub reports: Vec<FileReport>,
    pub failures: Vec<(PathBuf, String)>,
    pub processing_time_ms: u128,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_covariate_column_names_round_trip() {
        for covariate in Covariate::ALL {
            assert_eq!(
                Covariate::from_column_name(covariate.column_name()),
                Some(covariate)
            );
        }
        assert_eq!(Covariate::from_column_name("slope"), None);
    }

    #[test]
    fn test_only_temperature_is_range_checked() {
        let checked: Vec<_> = Covariate::ALL
            .into_iter()
            .filter(Covariate::is_range_checked)
            .collect();
        assert_eq!(checked, vec![Covariate::LstCelsius]);
    }

    #[test]
    fn test_file_report_from_summary() {
        let mut summary = ImputationSummary::default();
        summary.columns.insert(
            Covariate::Ndvi,
            CovariateImputation {
                initially_missing: 5,
                stages: StageFills {
                    interpolated: 3,
                    seasonal: 1,
                    global: 0,
                },
                still_missing: 1,
            },
        );

        let mut masked = CovariateCounts::new();
        masked.insert("ndvi".to_string(), 2);

        let report = FileReport::new("kerala_env_2020.csv", 12, masked, &summary);

        assert_eq!(report.values_imputed["ndvi"], 4);
        assert_eq!(report.final_null_count["ndvi"], 1);
        assert_eq!(report.stage_fills["ndvi"].total(), 4);
        assert_eq!(report.total_imputed(), 4);
    }

    #[test]
    fn test_file_report_json_field_names() {
        let report = FileReport::new(
            "a.csv",
            0,
            CovariateCounts::new(),
            &ImputationSummary::default(),
        );
        let json = serde_json::to_value(&report).unwrap();

        for key in [
            "source",
            "total_rows",
            "outliers_masked",
            "values_imputed",
            "final_null_count",
            "stage_fills",
        ] {
            assert!(json.get(key).is_some(), "missing key {key}");
        }
    }
}
