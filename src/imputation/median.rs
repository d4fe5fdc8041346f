//! Median aggregation and lookup-based filling.
//!
//! The seasonal and global fallbacks are split into an aggregation pass that
//! builds an immutable median lookup and a fill pass that consults it, so a
//! stage always sees the column exactly as the previous stage left it.

use std::collections::HashMap;
use std::hash::Hash;

/// Median of the given values
///
/// Odd counts take the middle element, even counts the midpoint of the two
/// middle elements. Returns `None` for an empty slice.
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) / 2.0)
    }
}

/// Median of the known values of a column
pub fn global_median(values: &[Option<f64>]) -> Option<f64> {
    let mut known: Vec<f64> = values.iter().flatten().copied().collect();
    median(&mut known)
}

/// Medians of a column's known values, grouped by a per-row key
#[derive(Debug, Clone)]
pub struct MedianLookup<K> {
    medians: HashMap<K, f64>,
}

impl<K: Eq + Hash + Copy> MedianLookup<K> {
    /// Aggregate known values by key; rows with a missing key or value are ignored
    pub fn build(values: &[Option<f64>], keys: &[Option<K>]) -> Self {
        let mut groups: HashMap<K, Vec<f64>> = HashMap::new();
        for (value, key) in values.iter().zip(keys) {
            if let (Some(v), Some(k)) = (value, key) {
                groups.entry(*k).or_default().push(*v);
            }
        }

        let medians = groups
            .into_iter()
            .filter_map(|(k, mut vs)| median(&mut vs).map(|m| (k, m)))
            .collect();

        Self { medians }
    }

    pub fn get(&self, key: &K) -> Option<f64> {
        self.medians.get(key).copied()
    }
}

/// Fill missing values from the lookup entry of each row's key
pub fn fill_from_lookup<K: Eq + Hash + Copy>(
    values: &[Option<f64>],
    keys: &[Option<K>],
    lookup: &MedianLookup<K>,
) -> (Vec<Option<f64>>, usize) {
    let mut filled = 0;
    let out = values
        .iter()
        .zip(keys)
        .map(|(value, key)| match (value, key) {
            (None, Some(k)) => {
                let fill = lookup.get(k);
                if fill.is_some() {
                    filled += 1;
                }
                fill
            }
            (v, _) => *v,
        })
        .collect();
    (out, filled)
}

/// Fill every missing value with a single constant, if one is defined
pub fn fill_constant(values: &[Option<f64>], fill: Option<f64>) -> (Vec<Option<f64>>, usize) {
    match fill {
        Some(constant) => {
            let filled = values.iter().filter(|v| v.is_none()).count();
            (
                values.iter().map(|v| Some(v.unwrap_or(constant))).collect(),
                filled,
            )
        }
        None => (values.to_vec(), 0),
    }
}
