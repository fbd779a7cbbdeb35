//! Generation technologies and the economic assumptions attached to them.
use crate::id::{define_id_getter, define_id_type};
use crate::units::{Dimensionless, HeatRate, Money, MoneyPerEnergy};
use indexmap::IndexMap;
use serde_string_enum::DeserializeLabeledStringEnum;
use std::rc::Rc;
use strum::{Display, EnumIter, EnumString};

define_id_type! {TechnologyID}
define_id_type! {CarrierID}

/// A map of [`Technology`]s, keyed by technology ID
pub type TechnologyMap = IndexMap<TechnologyID, Rc<Technology>>;

/// Heat rates for technologies whose empirical heat rates are systematically unavailable.
///
/// Values in MMBtu/MWh, from EIA Electric Power Annual table 8.2.
const HEAT_RATE_CONSTANTS: [(&str, f64); 5] = [
    ("Natural Gas Internal Combustion Engine", 8.894),
    ("Landfill Gas", 11.030),
    ("Other Waste Biomass", 11.030),
    ("Petroleum Coke", 10.026),
    // Mostly waste heat
    ("All Other", 11.030),
];

/// A renewable resource whose output follows a fleet-wide capacity factor
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter, EnumString,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum RenewableKind {
    /// Solar photovoltaic
    Solar,
    /// Onshore wind
    Wind,
    /// Conventional hydroelectric
    Hydro,
}

/// Operating parameters for dispatchable thermal technologies
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DispatchParameters {
    /// Variable operating and maintenance cost
    pub vom: MoneyPerEnergy,
    /// Maximum increase in output between hours, as a fraction of capacity
    pub ramp_up_limit: Option<Dimensionless>,
    /// Maximum decrease in output between hours, as a fraction of capacity
    pub ramp_down_limit: Option<Dimensionless>,
    /// Cost incurred each time a unit starts up (only used for unit commitment)
    pub start_up_cost: Money,
    /// Minimum number of hours a unit must stay on once started (only used for unit commitment)
    pub min_up_time: u32,
}

/// Parameters for storage technologies
#[derive(Debug, Clone, PartialEq)]
pub struct StorageParameters {
    /// Hours of storage at full power
    pub max_hours: f64,
}

/// How a technology is modelled
#[derive(Debug, Clone, PartialEq)]
pub enum TechnologyClass {
    /// Output follows a fleet capacity factor and is bid at the default bid
    Renewable(RenewableKind),
    /// Always available and bid at the default bid
    Baseload,
    /// Charges and discharges subject to a round-trip efficiency
    Storage(StorageParameters),
    /// Bids at fuel cost plus variable operating cost
    Dispatchable(DispatchParameters),
}

/// The class of technology as named in the technology assumptions file
#[derive(Debug, Clone, Copy, PartialEq, DeserializeLabeledStringEnum)]
pub enum TechnologyClassLabel {
    /// Solar renewable
    #[string = "solar"]
    Solar,
    /// Wind renewable
    #[string = "wind"]
    Wind,
    /// Hydro renewable
    #[string = "hydro"]
    Hydro,
    /// Baseload generation
    #[string = "baseload"]
    Baseload,
    /// Storage
    #[string = "storage"]
    Storage,
    /// Dispatchable thermal generation
    #[string = "dispatchable"]
    Dispatchable,
}

impl TechnologyClassLabel {
    /// Infer the class from a technology's name, for when it is not given explicitly
    pub fn infer(technology: &str) -> Self {
        match technology {
            "Solar Photovoltaic" => Self::Solar,
            "Onshore Wind Turbine" => Self::Wind,
            "Conventional Hydroelectric" => Self::Hydro,
            "Batteries" | "Flywheels" => Self::Storage,
            name if name.contains("Nuclear") || name.contains("Landfill Gas") => Self::Baseload,
            _ => Self::Dispatchable,
        }
    }
}

/// A generation technology
#[derive(Debug, Clone, PartialEq)]
pub struct Technology {
    /// Technology name as used in the unit registry (e.g. "Natural Gas Fired Combined Cycle")
    pub id: TechnologyID,
    /// The energy carrier reported for units of this technology
    pub carrier: CarrierID,
    /// Bid used where no fuel-based cost can be calculated
    pub default_bid: MoneyPerEnergy,
    /// How the technology is modelled
    pub class: TechnologyClass,
}
define_id_getter! {Technology, TechnologyID}

impl Technology {
    /// Whether units of this technology burn fuel and need a heat rate
    pub fn is_dispatchable(&self) -> bool {
        matches!(self.class, TechnologyClass::Dispatchable(_))
    }

    /// The dispatch parameters, if this is a dispatchable technology
    pub fn dispatch_parameters(&self) -> Option<&DispatchParameters> {
        match &self.class {
            TechnologyClass::Dispatchable(params) => Some(params),
            _ => None,
        }
    }

    /// The hardcoded heat rate for this technology, if there is one
    pub fn heat_rate_constant(&self) -> Option<HeatRate> {
        heat_rate_constant(&self.id.0)
    }
}

/// Look up the hardcoded heat rate for a technology
pub fn heat_rate_constant(technology: &str) -> Option<HeatRate> {
    HEAT_RATE_CONSTANTS
        .iter()
        .find(|(name, _)| *name == technology)
        .map(|(_, value)| HeatRate(*value))
}
