//! Three-stage imputation of masked covariates.
//!
//! For each covariate present in the table, missing cells are filled by:
//!
//! 1. linear interpolation within each grid's date-ordered series, holding
//!    the nearest value constant at series edges,
//! 2. the median of that calendar month's known values across the whole
//!    table, computed after stage 1,
//! 3. the median of all known values, computed after stage 2.
//!
//! Each stage only touches cells still missing after the previous one. A
//! covariate with no known value anywhere stays missing and is reported as
//! such rather than failing.

pub mod interpolation;
pub mod median;

pub use interpolation::{interpolate_series, interpolate_within_groups};
pub use median::{MedianLookup, fill_constant, fill_from_lookup, global_median, median};

use crate::constants::columns;
use crate::error::Result;
use crate::models::{Covariate, CovariateImputation, ImputationSummary, StageFills};
use crate::table::{
    has_column, month_keys, numeric_column, replace_numeric_column, sort_by_grid_and_date,
    string_column,
};
use polars::prelude::DataFrame;
use tracing::debug;

/// Run all three stages on one column
///
/// `grid_keys` and `month_keys` are row-aligned with `values`; rows are
/// expected to be sorted by date within each grid.
pub fn impute_column(
    values: &[Option<f64>],
    grid_keys: &[Option<String>],
    month_keys: &[Option<i64>],
) -> (Vec<Option<f64>>, CovariateImputation) {
    let initially_missing = count_missing(values);

    let (stage1, interpolated) = interpolate_within_groups(values, grid_keys);

    let monthly = MedianLookup::build(&stage1, month_keys);
    let (stage2, seasonal) = fill_from_lookup(&stage1, month_keys, &monthly);

    let (stage3, global) = fill_constant(&stage2, global_median(&stage2));

    let still_missing = count_missing(&stage3);
    let result = CovariateImputation {
        initially_missing,
        stages: StageFills {
            interpolated,
            seasonal,
            global,
        },
        still_missing,
    };

    (stage3, result)
}

/// Sort the table by grid and date, then impute every covariate present
///
/// The table is replaced by its sorted version; the returned summary holds
/// one entry per covariate column found.
pub fn impute_missing(df: &mut DataFrame) -> Result<ImputationSummary> {
    *df = sort_by_grid_and_date(df)?;

    let grid_keys = string_column(df, columns::GRID_ID)?;
    let months = month_keys(df)?;
    let mut summary = ImputationSummary::default();

    for covariate in Covariate::ALL {
        let name = covariate.column_name();
        if !has_column(df, name) {
            continue;
        }

        let values = numeric_column(df, name)?;
        let (filled, result) = impute_column(&values, &grid_keys, &months);
        replace_numeric_column(df, name, filled)?;

        debug!(
            "'{}': {} missing -> interpolated {}, seasonal {}, global {}, {} still missing",
            name,
            result.initially_missing,
            result.stages.interpolated,
            result.stages.seasonal,
            result.stages.global,
            result.still_missing
        );
        summary.columns.insert(covariate, result);
    }

    Ok(summary)
}

fn count_missing(values: &[Option<f64>]) -> usize {
    values.iter().filter(|v| v.is_none()).count()
}
