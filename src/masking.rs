//! Sentinel and outlier masking.
//!
//! Every covariate is coerced to floats and values equal to the sentinel are
//! replaced with missing. Land surface temperature is additionally masked
//! outside its plausible range. Masking never fails on bad data: cells that
//! do not coerce are already missing and are not counted as masked.

use crate::config::MaskingRules;
use crate::error::Result;
use crate::models::{Covariate, CovariateCounts};
use crate::table::{has_column, numeric_column, replace_numeric_column};
use polars::prelude::DataFrame;
use tracing::debug;

/// Whether a known value must be masked for this covariate
pub fn is_invalid(value: f64, covariate: Covariate, rules: &MaskingRules) -> bool {
    if value == rules.sentinel {
        return true;
    }
    covariate.is_range_checked()
        && (value < rules.min_valid_temperature || value > rules.max_valid_temperature)
}

/// Mask one column, returning the cleaned values and how many were masked
pub fn mask_values(
    values: &[Option<f64>],
    covariate: Covariate,
    rules: &MaskingRules,
) -> (Vec<Option<f64>>, usize) {
    let mut masked = 0;
    let cleaned = values
        .iter()
        .map(|v| match v {
            Some(x) if is_invalid(*x, covariate, rules) => {
                masked += 1;
                None
            }
            other => *other,
        })
        .collect();
    (cleaned, masked)
}

/// Mask every covariate present in the table in place
///
/// Absent covariates are skipped and get no entry in the returned counts.
pub fn mask_outliers(df: &mut DataFrame, rules: &MaskingRules) -> Result<CovariateCounts> {
    let mut counts = CovariateCounts::new();

    for covariate in Covariate::ALL {
        let name = covariate.column_name();
        if !has_column(df, name) {
            debug!("Skipping masking for absent column '{}'", name);
            continue;
        }

        let values = numeric_column(df, name)?;
        let (cleaned, masked) = mask_values(&values, covariate, rules);
        replace_numeric_column(df, name, cleaned)?;

        debug!("Masked {} values in '{}'", masked, name);
        counts.insert(name.to_string(), masked);
    }

    Ok(counts)
}
