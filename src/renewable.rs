//! Fleet-wide hourly capacity factors for renewable technologies.
use crate::series::HourlyTable;
use crate::technology::RenewableKind;
use crate::time::Snapshot;
use anyhow::{Context, Result};

/// Hourly capacity factors for each kind of renewable, shared by every unit of that kind
#[derive(Debug, Clone, PartialEq)]
pub struct RenewableCapacityFactors(HourlyTable<RenewableKind>);

impl RenewableCapacityFactors {
    /// Create a new [`RenewableCapacityFactors`] from an interpolated hourly table
    pub fn new(table: HourlyTable<RenewableKind>) -> Self {
        Self(table)
    }

    /// The capacity factor for a kind of renewable at a snapshot.
    ///
    /// It is an error for a value to be missing, e.g. because the snapshot lies outside the range
    /// of the source data.
    pub fn get(&self, kind: RenewableKind, snapshot: &Snapshot) -> Result<f64> {
        self.0
            .get(&kind, snapshot)
            .with_context(|| format!("No {kind} capacity factor available for {snapshot}"))
    }

    /// The underlying table
    pub fn table(&self) -> &HourlyTable<RenewableKind> {
        &self.0
    }
}
