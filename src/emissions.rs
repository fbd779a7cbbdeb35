//! Reported CO2 emissions rates and the crosswalk from registry units to emitting units.
use crate::units::EmissionsRate;
use std::collections::HashMap;

/// An emitting unit as identified in the emissions source: (facility ID, unit ID)
pub type EmissionsUnitKey = (String, String);

/// Emissions rates keyed by emitting unit, with a crosswalk from registry units
#[derive(Debug, Default, Clone, PartialEq)]
pub struct EmissionsData {
    rates: HashMap<EmissionsUnitKey, EmissionsRate>,
    crosswalk: HashMap<(String, String), EmissionsUnitKey>,
}

impl EmissionsData {
    /// Create a new [`EmissionsData`]
    ///
    /// # Arguments
    ///
    /// * `rates` - Emissions rates for each emitting unit
    /// * `crosswalk` - Maps (plant ID, generator ID) in the registry to an emitting unit
    pub fn new(
        rates: HashMap<EmissionsUnitKey, EmissionsRate>,
        crosswalk: HashMap<(String, String), EmissionsUnitKey>,
    ) -> Self {
        Self { rates, crosswalk }
    }

    /// The emissions rate reported for a specific registry unit
    pub fn unit_rate(&self, plant_id: &str, generator_id: &str) -> Option<EmissionsRate> {
        let key = self
            .crosswalk
            .get(&(plant_id.to_string(), generator_id.to_string()))?;
        self.rates.get(key).copied()
    }

    /// The mean emissions rate over every emitting unit crosswalked to the plant
    pub fn plant_rate(&self, plant_id: &str) -> Option<EmissionsRate> {
        let rates: Vec<_> = self
            .crosswalk
            .iter()
            .filter(|((plant, _), _)| plant == plant_id)
            .filter_map(|(_, key)| self.rates.get(key))
            .map(|rate| rate.value())
            .collect();
        if rates.is_empty() {
            return None;
        }

        Some(EmissionsRate(rates.iter().sum::<f64>() / rates.len() as f64))
    }
}
