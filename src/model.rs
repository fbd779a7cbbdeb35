//! The model struct, holding all the reconciled input data for a run.
use crate::fallback::FallbackLog;
use crate::fuel::FuelPriceSeries;
use crate::load::ZonalLoad;
use crate::renewable::RenewableCapacityFactors;
use crate::technology::TechnologyMap;
use crate::time::Snapshot;
use crate::unit::UnitMap;
use crate::zone::ZoneTopology;
use std::path::PathBuf;

pub mod parameters;
pub use parameters::ModelParameters;

/// Model definition
pub struct Model {
    /// Path to the model folder
    pub model_path: PathBuf,
    /// Parameters from the model TOML file
    pub parameters: ModelParameters,
    /// Zones and the links between them
    pub topology: ZoneTopology,
    /// Technologies
    pub technologies: TechnologyMap,
    /// Reconciled generating units
    pub units: UnitMap,
    /// Monthly fuel prices
    pub fuel_prices: FuelPriceSeries,
    /// Renewable capacity factors
    pub renewables: RenewableCapacityFactors,
    /// Hourly zonal load
    pub load: ZonalLoad,
    /// Substitutions made while reconciling the input data
    pub fallbacks: FallbackLog,
}

impl Model {
    /// The hourly snapshots covered by the simulation
    pub fn snapshots(&self) -> Vec<Snapshot> {
        self.parameters.snapshots()
    }
}
