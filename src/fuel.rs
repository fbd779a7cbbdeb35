//! Monthly fuel prices.
use crate::id::define_id_type;
use crate::series::interpolate_gaps;
use crate::time::Month;
use crate::units::MoneyPerFuelEnergy;
use itertools::Itertools;
use std::collections::BTreeMap;

define_id_type! {FuelID}

/// The result of looking up a fuel price
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FuelPriceLookup {
    /// A price was reported for the month
    Found(MoneyPerFuelEnergy),
    /// No price was reported, but one was interpolated from neighbouring months
    Interpolated(MoneyPerFuelEnergy),
    /// No price is available for the month
    Missing,
}

/// Sparse monthly fuel prices, keyed by fuel and month.
///
/// Interpolated prices are kept apart from reported ones so that their use can be audited.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FuelPriceSeries {
    reported: BTreeMap<(FuelID, Month), MoneyPerFuelEnergy>,
    interpolated: BTreeMap<(FuelID, Month), MoneyPerFuelEnergy>,
}

impl FuelPriceSeries {
    /// Build the series from raw readings.
    ///
    /// Readings which are missing, non-finite, zero or negative are discarded, as a zero price
    /// indicates that no data was reported. Repeated readings for the same fuel and month are
    /// averaged.
    pub fn from_readings<I>(readings: I) -> Self
    where
        I: IntoIterator<Item = (Month, FuelID, Option<f64>)>,
    {
        let grouped = readings
            .into_iter()
            .filter_map(|(month, fuel, value)| {
                let value = value.filter(|v| v.is_finite() && *v > 0.0)?;
                Some(((fuel, month), value))
            })
            .into_group_map();

        let reported = grouped
            .into_iter()
            .map(|(key, values)| {
                let mean = values.iter().sum::<f64>() / values.len() as f64;
                (key, MoneyPerFuelEnergy(mean))
            })
            .collect();

        Self {
            reported,
            interpolated: BTreeMap::new(),
        }
    }

    /// Look up the price of a fuel in a month
    pub fn lookup(&self, fuel: &FuelID, month: Month) -> FuelPriceLookup {
        let key = (fuel.clone(), month);
        if let Some(price) = self.reported.get(&key) {
            FuelPriceLookup::Found(*price)
        } else if let Some(price) = self.interpolated.get(&key) {
            FuelPriceLookup::Interpolated(*price)
        } else {
            FuelPriceLookup::Missing
        }
    }

    /// Fill months with no reported price by linear interpolation between reported months.
    ///
    /// Each fuel is only filled between its first and last reported month.
    ///
    /// # Returns
    ///
    /// The number of prices which were filled in.
    pub fn interpolate_gaps(&mut self) -> usize {
        let fuels = self.fuels().cloned().collect_vec();
        let mut filled = 0;
        for fuel in fuels {
            let Some((first, last)) = self
                .reported
                .keys()
                .filter(|(key_fuel, _)| *key_fuel == fuel)
                .map(|(_, month)| *month)
                .minmax()
                .into_option()
            else {
                continue;
            };
            let months = first.iter_to(last).collect_vec();
            let mut values = months
                .iter()
                .map(|month| {
                    self.reported
                        .get(&(fuel.clone(), *month))
                        .map(|price| price.0)
                })
                .collect_vec();
            let reported = values.iter().map(Option::is_some).collect_vec();
            filled += interpolate_gaps(&mut values);

            for ((month, value), reported) in months.into_iter().zip(values).zip(reported) {
                if let Some(value) = value
                    && !reported
                {
                    self.interpolated
                        .insert((fuel.clone(), month), MoneyPerFuelEnergy(value));
                }
            }
        }

        filled
    }

    /// Iterate over the fuels with at least one reported price
    pub fn fuels(&self) -> impl Iterator<Item = &FuelID> {
        self.reported.keys().map(|(fuel, _)| fuel).dedup()
    }

    /// The number of (fuel, month) prices, including interpolated ones
    pub fn len(&self) -> usize {
        self.reported.len() + self.interpolated.len()
    }

    /// Whether there are no prices
    pub fn is_empty(&self) -> bool {
        self.reported.is_empty() && self.interpolated.is_empty()
    }
}
