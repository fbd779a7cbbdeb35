//! Hourly load for each zone.
use crate::series::HourlyTable;
use crate::time::Snapshot;
use crate::units::Capacity;
use crate::zone::ZoneID;
use anyhow::{Context, Result};

/// Hourly load (MW) for each zone
#[derive(Debug, Clone, PartialEq)]
pub struct ZonalLoad(HourlyTable<ZoneID>);

impl ZonalLoad {
    /// Create a new [`ZonalLoad`] from an interpolated hourly table
    pub fn new(table: HourlyTable<ZoneID>) -> Self {
        Self(table)
    }

    /// The load in a zone at a snapshot
    pub fn get(&self, zone: &ZoneID, snapshot: &Snapshot) -> Result<Capacity> {
        self.0
            .get(zone, snapshot)
            .map(Capacity)
            .with_context(|| format!("No load available for zone {zone} at {snapshot}"))
    }

    /// The underlying table
    pub fn table(&self) -> &HourlyTable<ZoneID> {
        &self.0
    }
}
