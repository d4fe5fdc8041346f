//! Intra-grid temporal interpolation.
//!
//! Rows arrive sorted by date within each grid, one row per month, so row
//! position is the time axis. Interior gaps are filled linearly between the
//! nearest known neighbours; gaps at either end of a grid's series hold the
//! nearest known value constant.

use std::collections::HashMap;

/// Interpolate a single ordered series in place, returning the number of cells filled
///
/// A series with no known value is left untouched.
pub fn interpolate_series(series: &mut [Option<f64>]) -> usize {
    let known: Vec<usize> = series
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|_| i))
        .collect();

    let (Some(&first), Some(&last)) = (known.first(), known.last()) else {
        return 0;
    };

    let mut filled = 0;

    // Leading and trailing edges hold the nearest known value
    let head = series[first];
    for cell in series[..first].iter_mut() {
        *cell = head;
        filled += 1;
    }
    let tail = series[last];
    for cell in series[last + 1..].iter_mut() {
        *cell = tail;
        filled += 1;
    }

    for pair in known.windows(2) {
        let (left, right) = (pair[0], pair[1]);
        if right - left < 2 {
            continue;
        }
        let (Some(y0), Some(y1)) = (series[left], series[right]) else {
            continue;
        };
        let span = (right - left) as f64;
        for i in left + 1..right {
            let t = (i - left) as f64 / span;
            series[i] = Some(y0 + (y1 - y0) * t);
            filled += 1;
        }
    }

    filled
}

/// Interpolate each grid's series independently
///
/// Rows sharing a grid key form one series in their existing order. Rows
/// without a grid key belong to no series and are left as they are.
pub fn interpolate_within_groups(
    values: &[Option<f64>],
    grid_keys: &[Option<String>],
) -> (Vec<Option<f64>>, usize) {
    let mut groups: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, key) in grid_keys.iter().enumerate() {
        if let Some(k) = key {
            groups.entry(k.as_str()).or_default().push(i);
        }
    }

    let mut out = values.to_vec();
    let mut filled = 0;

    for rows in groups.values() {
        let mut series: Vec<Option<f64>> = rows.iter().map(|&i| values[i]).collect();
        let group_filled = interpolate_series(&mut series);
        if group_filled == 0 {
            continue;
        }
        for (&row, value) in rows.iter().zip(series) {
            out[row] = value;
        }
        filled += group_filled;
    }

    (out, filled)
}
