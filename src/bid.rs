//! Builds hourly bids and availability for each unit.
//!
//! Bids are calculated once per calendar month and held constant over the month's hours.
use crate::fallback::{FallbackKind, FallbackLog};
use crate::fuel::{FuelPriceLookup, FuelPriceSeries};
use crate::renewable::RenewableCapacityFactors;
use crate::technology::{DispatchParameters, StorageParameters, TechnologyClass};
use crate::time::{Month, Snapshot, group_by_month};
use crate::unit::{GeneratingUnit, ResolvedHeatRate, UnitID, UnitMap};
use crate::units::{Dimensionless, HeatRate, MoneyPerEnergy};
use anyhow::{Context, Result};
use indexmap::IndexMap;

/// The bid and availability of a unit for a single snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BidRecord {
    /// The marginal cost at which the unit offers its output
    pub marginal_cost: MoneyPerEnergy,
    /// Available fraction of nameplate capacity
    pub availability: Dimensionless,
    /// Whether the unit is within its operating window
    pub operating: bool,
}

impl BidRecord {
    /// The record for a unit outside its operating window
    const NOT_OPERATING: BidRecord = BidRecord {
        marginal_cost: MoneyPerEnergy(0.0),
        availability: Dimensionless(0.0),
        operating: false,
    };
}

/// Bid records for a unit, aligned with the model's snapshots
#[derive(Debug, Clone, PartialEq)]
pub struct BidSeries(Vec<BidRecord>);

impl BidSeries {
    /// Iterate over the records in snapshot order
    pub fn iter(&self) -> impl Iterator<Item = &BidRecord> {
        self.0.iter()
    }

    /// The number of snapshots covered
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the series is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The marginal cost at each snapshot
    pub fn marginal_costs(&self) -> Vec<MoneyPerEnergy> {
        self.0.iter().map(|record| record.marginal_cost).collect()
    }

    /// The availability at each snapshot
    pub fn availabilities(&self) -> Vec<Dimensionless> {
        self.0.iter().map(|record| record.availability).collect()
    }
}

/// The economic parameters of a storage unit
#[derive(Debug, Clone, PartialEq)]
pub struct StorageOffer {
    /// Efficiency when charging
    pub efficiency_store: Dimensionless,
    /// Efficiency when discharging
    pub efficiency_dispatch: Dimensionless,
    /// Cost of discharging
    pub marginal_cost: MoneyPerEnergy,
    /// Hours of storage at full power
    pub max_hours: f64,
    /// Available fraction of power capacity at each snapshot
    pub availability: Vec<Dimensionless>,
}

impl StorageOffer {
    /// Split a round-trip efficiency equally between the charge and discharge legs
    pub fn new(
        parameters: &StorageParameters,
        round_trip_efficiency: Dimensionless,
        marginal_cost: MoneyPerEnergy,
        availability: Vec<Dimensionless>,
    ) -> Self {
        let leg = round_trip_efficiency.sqrt();
        Self {
            efficiency_store: leg,
            efficiency_dispatch: leg,
            marginal_cost,
            max_hours: parameters.max_hours,
            availability,
        }
    }
}

/// What a unit offers to the market
#[derive(Debug, Clone, PartialEq)]
pub enum UnitOffer {
    /// A generator with hourly bids
    Generator(BidSeries),
    /// A storage unit
    Storage(StorageOffer),
}

/// Data shared by the bid calculations for all units
pub struct BidContext<'a> {
    /// The model's snapshots
    pub snapshots: &'a [Snapshot],
    /// Monthly fuel prices
    pub fuel_prices: &'a FuelPriceSeries,
    /// Renewable capacity factors
    pub renewables: &'a RenewableCapacityFactors,
    /// Round-trip efficiency of storage
    pub round_trip_efficiency: Dimensionless,
}

/// Build the offers for every unit.
///
/// # Returns
///
/// An offer for each unit, in the same order as `units`.
pub fn build_offers(
    units: &UnitMap,
    context: &BidContext,
    fallbacks: &mut FallbackLog,
) -> Result<IndexMap<UnitID, UnitOffer>> {
    units
        .iter()
        .map(|(id, unit)| {
            let offer = build_offer(unit, context, fallbacks)
                .with_context(|| format!("Failed to build bids for unit {id}"))?;
            Ok((id.clone(), offer))
        })
        .collect()
}

/// Build the offer for a single unit
fn build_offer(
    unit: &GeneratingUnit,
    context: &BidContext,
    fallbacks: &mut FallbackLog,
) -> Result<UnitOffer> {
    if let TechnologyClass::Storage(parameters) = &unit.technology.class {
        return Ok(UnitOffer::Storage(StorageOffer::new(
            parameters,
            context.round_trip_efficiency,
            unit.technology.default_bid,
            window_availability(unit, context.snapshots),
        )));
    }

    let heat_rate = match unit.technology.dispatch_parameters() {
        Some(_) => Some(effective_heat_rate(unit, fallbacks)?),
        None => None,
    };

    let mut records = Vec::with_capacity(context.snapshots.len());
    for (month, range) in group_by_month(context.snapshots) {
        if !unit.window.contains(month) {
            records.extend(std::iter::repeat_n(BidRecord::NOT_OPERATING, range.len()));
            continue;
        }

        match &unit.technology.class {
            TechnologyClass::Renewable(kind) => {
                for snapshot in &context.snapshots[range] {
                    records.push(BidRecord {
                        marginal_cost: unit.technology.default_bid,
                        availability: Dimensionless(context.renewables.get(*kind, snapshot)?),
                        operating: true,
                    });
                }
            }
            TechnologyClass::Baseload => {
                let record = BidRecord {
                    marginal_cost: unit.technology.default_bid,
                    availability: Dimensionless(1.0),
                    operating: true,
                };
                records.extend(std::iter::repeat_n(record, range.len()));
            }
            TechnologyClass::Dispatchable(parameters) => {
                let heat_rate = heat_rate.context("Dispatchable unit has no heat rate")?;
                let record = BidRecord {
                    marginal_cost: dispatchable_bid(
                        unit,
                        parameters,
                        heat_rate,
                        month,
                        context.fuel_prices,
                        fallbacks,
                    ),
                    availability: Dimensionless(1.0),
                    operating: true,
                };
                records.extend(std::iter::repeat_n(record, range.len()));
            }
            TechnologyClass::Storage(_) => unreachable!("Storage units have no bid series"),
        }
    }

    Ok(UnitOffer::Generator(BidSeries(records)))
}

/// Full availability while the unit is within its operating window and none outside it
fn window_availability(unit: &GeneratingUnit, snapshots: &[Snapshot]) -> Vec<Dimensionless> {
    group_by_month(snapshots)
        .into_iter()
        .flat_map(|(month, range)| {
            let availability = if unit.window.contains(month) {
                1.0
            } else {
                0.0
            };
            std::iter::repeat_n(Dimensionless(availability), range.len())
        })
        .collect()
}

/// The heat rate to use for a dispatchable unit's bids.
///
/// An invalid resolved heat rate (only possible for plant-level values) is replaced with the
/// technology default and the substitution recorded.
pub fn effective_heat_rate(unit: &GeneratingUnit, fallbacks: &mut FallbackLog) -> Result<HeatRate> {
    match unit.heat_rate {
        Some(heat_rate) if heat_rate.is_valid() => Ok(heat_rate.value),
        _ => {
            let ResolvedHeatRate { value, .. } = unit
                .default_heat_rate
                .with_context(|| format!("No usable heat rate for unit {}", unit.id))?;
            fallbacks.record(&unit.id, None, FallbackKind::HeatRateSubstituted);
            Ok(value)
        }
    }
}

/// The bid of a dispatchable unit for a month in which it is operating.
///
/// This is the fuel cost plus variable operating cost or, if no fuel price is available for the
/// month, the technology's default bid. Use of an interpolated price is recorded.
pub fn dispatchable_bid(
    unit: &GeneratingUnit,
    parameters: &DispatchParameters,
    heat_rate: HeatRate,
    month: Month,
    fuel_prices: &FuelPriceSeries,
    fallbacks: &mut FallbackLog,
) -> MoneyPerEnergy {
    match fuel_prices.lookup(&unit.fuel, month) {
        FuelPriceLookup::Found(price) => heat_rate * price + parameters.vom,
        FuelPriceLookup::Interpolated(price) => {
            fallbacks.record(
                &unit.id,
                Some(month),
                FallbackKind::FuelPriceInterpolated {
                    fuel: unit.fuel.clone(),
                },
            );
            heat_rate * price + parameters.vom
        }
        FuelPriceLookup::Missing => {
            fallbacks.record(
                &unit.id,
                Some(month),
                FallbackKind::FuelPriceDefault {
                    fuel: unit.fuel.clone(),
                },
            );
            unit.technology.default_bid
        }
    }
}
