//! Hourly tables of observations with explicit missing values.
use crate::time::{Snapshot, hourly_range, is_on_the_hour};
use anyhow::{Result, ensure};
use chrono::Duration;
use indexmap::IndexMap;
use log::debug;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::hash::Hash;

/// A table of hourly values keyed by column, on a gap-free hourly index.
///
/// Values which could not be observed or interpolated are `None`.
#[derive(Debug, PartialEq, Clone)]
pub struct HourlyTable<K: Hash + Eq> {
    start: Snapshot,
    len: usize,
    columns: IndexMap<K, Vec<Option<f64>>>,
}

impl<K: Hash + Eq + Clone + Display> HourlyTable<K> {
    /// Build a table from individual observations.
    ///
    /// The index runs hourly from the earliest to the latest observed timestamp. Repeated
    /// observations of the same column and timestamp are averaged. Gaps within each column are
    /// then filled with [`interpolate_gaps`].
    pub fn from_observations<I>(observations: I) -> Result<Self>
    where
        I: IntoIterator<Item = (Snapshot, K, Option<f64>)>,
    {
        let mut sums: IndexMap<K, BTreeMap<Snapshot, (f64, u32)>> = IndexMap::new();
        let mut bounds: Option<(Snapshot, Snapshot)> = None;
        for (snapshot, key, value) in observations {
            ensure!(
                is_on_the_hour(&snapshot),
                "Timestamp {snapshot} does not fall on the hour"
            );

            bounds = Some(match bounds {
                None => (snapshot, snapshot),
                Some((first, last)) => (first.min(snapshot), last.max(snapshot)),
            });

            let column = sums.entry(key).or_default();
            if let Some(value) = value {
                let (sum, count) = column.entry(snapshot).or_insert((0.0, 0));
                *sum += value;
                *count += 1;
            }
        }

        let (start, end) = bounds.unwrap_or_default();
        let index = if sums.is_empty() {
            Vec::new()
        } else {
            hourly_range(start, end)
        };
        let columns = sums
            .into_iter()
            .map(|(key, observed)| {
                let mut values: Vec<_> = index
                    .iter()
                    .map(|snapshot| {
                        observed
                            .get(snapshot)
                            .map(|(sum, count)| sum / f64::from(*count))
                    })
                    .collect();
                let filled = interpolate_gaps(&mut values);
                if filled > 0 {
                    debug!("Interpolated {filled} missing hourly values for {key}");
                }
                (key, values)
            })
            .collect();

        Ok(Self {
            start,
            len: index.len(),
            columns,
        })
    }
}

impl<K: Hash + Eq> HourlyTable<K> {
    /// The number of hourly rows in the table
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The first and last snapshot covered by the table
    pub fn bounds(&self) -> Option<(Snapshot, Snapshot)> {
        let hours = i64::try_from(self.len).ok()?.checked_sub(1)?;
        Some((self.start, self.start + Duration::hours(hours)))
    }

    /// Iterate over the column keys
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.columns.keys()
    }

    /// Whether the table contains the given column
    pub fn contains_key(&self, key: &K) -> bool {
        self.columns.contains_key(key)
    }

    /// The value of a column at a snapshot, if observed or interpolated
    pub fn get(&self, key: &K, snapshot: &Snapshot) -> Option<f64> {
        let elapsed = *snapshot - self.start;
        if elapsed != Duration::hours(elapsed.num_hours()) {
            return None;
        }
        let offset = usize::try_from(elapsed.num_hours()).ok()?;
        *self.columns.get(key)?.get(offset)?
    }

    /// Rename or drop columns, e.g. to map source column names onto model IDs
    pub fn map_keys<L, F>(self, mut f: F) -> HourlyTable<L>
    where
        L: Hash + Eq,
        F: FnMut(K) -> Option<L>,
    {
        HourlyTable {
            start: self.start,
            len: self.len,
            columns: self
                .columns
                .into_iter()
                .filter_map(|(key, values)| Some((f(key)?, values)))
                .collect(),
        }
    }
}

/// Fill gaps in a series by linear interpolation between the nearest valid neighbours.
///
/// Values before the first valid value or after the last one are left missing: the series is
/// never extrapolated. Non-finite values count as missing.
///
/// # Returns
///
/// The number of values which were filled in.
pub fn interpolate_gaps(values: &mut [Option<f64>]) -> usize {
    for value in values.iter_mut() {
        if value.is_some_and(|v| !v.is_finite()) {
            *value = None;
        }
    }

    let mut filled = 0;
    let mut previous: Option<(usize, f64)> = None;
    for i in 0..values.len() {
        let Some(current) = values[i] else {
            continue;
        };

        if let Some((j, left)) = previous
            && i > j + 1
        {
            let span = (i - j) as f64;
            for (k, value) in values.iter_mut().enumerate().take(i).skip(j + 1) {
                let weight = (k - j) as f64 / span;
                *value = Some(left + weight * (current - left));
                filled += 1;
            }
        }
        previous = Some((i, current));
    }

    filled
}
