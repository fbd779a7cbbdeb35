//! Generating units and the registry records they are built from.
use crate::fuel::FuelID;
use crate::id::{define_id_getter, define_id_type};
use crate::technology::Technology;
use crate::time::{Month, OperatingWindow};
use crate::units::{Capacity, EmissionsRate, HeatRate};
use crate::zone::ZoneID;
use indexmap::IndexMap;
use std::rc::Rc;
use strum::Display;

define_id_type! {UnitID}

impl UnitID {
    /// The ID of a generator at a plant, e.g. "3453-CT1"
    pub fn from_parts(plant_id: &str, generator_id: &str) -> Self {
        format!("{plant_id}-{generator_id}").into()
    }
}

/// A map of [`GeneratingUnit`]s, keyed by unit ID
pub type UnitMap = IndexMap<UnitID, Rc<GeneratingUnit>>;

/// One row of the unit registry for a reporting month, after normalisation
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryRecord {
    /// The reporting month
    pub period: Month,
    /// The plant's identifier
    pub plant_id: String,
    /// The generator's identifier within the plant
    pub generator_id: String,
    /// Technology name
    pub technology: String,
    /// The county in which the plant is located
    pub county: String,
    /// Reported operating status (e.g. "Operating")
    pub status: String,
    /// Nameplate capacity in MW, if it could be parsed
    pub capacity: Option<f64>,
    /// The month in which the unit first operated
    pub operating_month: Month,
    /// The code for the fuel the unit burns
    pub energy_source_code: String,
    /// The unit-level heat rate, if reported
    pub heat_rate: Option<f64>,
}

impl RegistryRecord {
    /// The ID of the unit this record describes
    pub fn unit_id(&self) -> UnitID {
        UnitID::from_parts(&self.plant_id, &self.generator_id)
    }

    /// Whether the record reports the unit as operating
    pub fn is_operating(&self) -> bool {
        self.status.trim().eq_ignore_ascii_case("operating")
    }
}

/// Where a unit's heat rate came from, in order of preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[strum(serialize_all = "snake_case")]
pub enum HeatRateTier {
    /// Reported for the unit itself
    Unit,
    /// Calculated from the plant's total fuel consumption and generation
    Plant,
    /// Mean over other units of the same technology
    TechnologyAverage,
    /// A hardcoded constant for the technology
    TechnologyConstant,
}

/// A heat rate along with the tier it was resolved from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedHeatRate {
    /// The heat rate
    pub value: HeatRate,
    /// Where it came from
    pub tier: HeatRateTier,
}

impl ResolvedHeatRate {
    /// Whether the heat rate can be used to calculate a bid
    pub fn is_valid(&self) -> bool {
        is_valid_heat_rate(self.value)
    }
}

/// Whether a heat rate is finite and positive
pub fn is_valid_heat_rate(value: HeatRate) -> bool {
    value.is_finite() && value > HeatRate(0.0)
}

/// Where a unit's emissions rate came from, in order of preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum EmissionsTier {
    /// Reported for the unit itself
    Unit,
    /// Mean over the plant's reported units
    Plant,
    /// Mean over other units of the same technology
    TechnologyAverage,
}

/// An emissions rate along with the tier it was resolved from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedEmissions {
    /// CO2 emitted per unit of generation
    pub co2_rate: EmissionsRate,
    /// Where it came from
    pub tier: EmissionsTier,
}

/// A generating unit, reconciled from the registry and supporting data
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratingUnit {
    /// Unique identifier, `"{plant_id}-{generator_id}"`
    pub id: UnitID,
    /// The plant's identifier
    pub plant_id: String,
    /// The generator's identifier within the plant
    pub generator_id: String,
    /// The unit's technology
    pub technology: Rc<Technology>,
    /// Nameplate capacity, if known
    pub capacity: Option<Capacity>,
    /// The zone in which the unit is located
    pub zone: ZoneID,
    /// The months in which the unit is operating
    pub window: OperatingWindow,
    /// The fuel the unit burns
    pub fuel: FuelID,
    /// Heat rate (dispatchable units only)
    pub heat_rate: Option<ResolvedHeatRate>,
    /// Heat rate to use if `heat_rate` turns out to be invalid (dispatchable units only)
    pub default_heat_rate: Option<ResolvedHeatRate>,
    /// CO2 intensity, if known
    pub emissions: Option<ResolvedEmissions>,
}
define_id_getter! {GeneratingUnit, UnitID}

impl GeneratingUnit {
    /// Nameplate capacity, with a missing value treated as 0 MW
    pub fn capacity_or_zero(&self) -> Capacity {
        self.capacity.unwrap_or_default()
    }
}
