//! Joins the unit registry to zones, technologies, heat rates and emissions rates.
use crate::emissions::EmissionsData;
use crate::fallback::{FallbackKind, FallbackLog};
use crate::technology::{TechnologyID, TechnologyMap};
use crate::time::{Month, OperatingWindow};
use crate::unit::{
    EmissionsTier, GeneratingUnit, HeatRateTier, RegistryRecord, ResolvedEmissions,
    ResolvedHeatRate, UnitID, UnitMap, is_valid_heat_rate,
};
use crate::units::{Capacity, EmissionsRate, Energy, FuelEnergy, HeatRate};
use crate::zone::CountyZoneMap;
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use log::{debug, info};
use std::collections::HashMap;
use std::rc::Rc;

/// Reported fuel consumption and generation for a plant in one reporting period
#[derive(Debug, Clone, PartialEq)]
pub struct PlantGenerationRecord {
    /// The plant's identifier
    pub plant_id: String,
    /// Total fuel consumed
    pub consumption: Option<FuelEnergy>,
    /// Total electricity generated
    pub generation: Option<Energy>,
}

/// Calculate a heat rate for each plant from its full reporting history.
///
/// The heat rate is total fuel consumption over total generation. Missing readings are skipped.
/// The result is kept even when it is not a usable number (e.g. zero generation), so that the
/// plant-level value still takes precedence over technology-level fallbacks.
pub fn plant_heat_rates<I>(records: I) -> HashMap<String, HeatRate>
where
    I: IntoIterator<Item = PlantGenerationRecord>,
{
    let mut totals: HashMap<String, (FuelEnergy, Energy)> = HashMap::new();
    for record in records {
        let (consumption, generation) = totals.entry(record.plant_id).or_default();
        if let Some(value) = record.consumption {
            *consumption = *consumption + value;
        }
        if let Some(value) = record.generation {
            *generation = *generation + value;
        }
    }

    totals
        .into_iter()
        .map(|(plant_id, (consumption, generation))| (plant_id, consumption / generation))
        .collect()
}

/// Select the record describing each unit as of `end_month`.
///
/// Only records for operating units with a period no later than `end_month` are considered. Of
/// those, the latest record for each unit is kept.
pub fn select_operating_records(
    records: Vec<RegistryRecord>,
    end_month: Month,
) -> IndexMap<UnitID, RegistryRecord> {
    let mut latest: IndexMap<UnitID, RegistryRecord> = IndexMap::new();
    for record in records {
        if !record.is_operating() || record.period > end_month {
            continue;
        }

        let id = record.unit_id();
        match latest.get(&id) {
            Some(existing) if existing.period >= record.period => {}
            _ => {
                latest.insert(id, record);
            }
        }
    }

    latest
}

/// Supporting data used to reconcile registry records into units
pub struct ReconcileSources<'a> {
    /// Known technologies
    pub technologies: &'a TechnologyMap,
    /// County to zone lookup
    pub counties: &'a CountyZoneMap,
    /// Heat rates calculated for each plant
    pub plant_heat_rates: &'a HashMap<String, HeatRate>,
    /// Emissions rates, if supplied
    pub emissions: Option<&'a EmissionsData>,
}

/// Build the generating units from the registry.
///
/// # Arguments
///
/// * `records` - All registry records
/// * `end_month` - The month of the end of the simulation; later records are ignored
/// * `sources` - Supporting data
/// * `fallbacks` - Log to which substitutions are recorded
///
/// # Returns
///
/// The reconciled units, in registry order.
pub fn reconcile_units(
    records: Vec<RegistryRecord>,
    end_month: Month,
    sources: &ReconcileSources,
    fallbacks: &mut FallbackLog,
) -> Result<UnitMap> {
    let records = select_operating_records(records, end_month);
    ensure!(
        !records.is_empty(),
        "No operating units found in the registry up to {end_month}"
    );
    info!("Found {} operating units", records.len());

    let mut units = IndexMap::new();
    for (id, record) in &records {
        let unit = build_unit(id, record, sources, fallbacks)?;
        units.insert(id.clone(), unit);
    }

    resolve_default_heat_rates(&mut units, fallbacks)?;
    if let Some(emissions) = sources.emissions {
        resolve_emissions(&mut units, emissions, fallbacks);
    }

    Ok(units
        .into_iter()
        .map(|(id, unit)| (id, Rc::new(unit)))
        .collect())
}

/// Build a single unit, resolving only the unit- and plant-level heat rate tiers
fn build_unit(
    id: &UnitID,
    record: &RegistryRecord,
    sources: &ReconcileSources,
    fallbacks: &mut FallbackLog,
) -> Result<GeneratingUnit> {
    let technology = sources
        .technologies
        .get(record.technology.as_str())
        .with_context(|| {
            format!(
                "Unit {id} has technology '{}' which is not in the technology assumptions",
                record.technology
            )
        })?;
    let zone = sources.counties.zone_for(&record.county).with_context(|| {
        format!(
            "Unit {id} is in county '{}' which is not mapped to a zone",
            record.county
        )
    })?;

    let capacity = record
        .capacity
        .filter(|capacity| capacity.is_finite() && *capacity >= 0.0)
        .map(Capacity);
    if capacity.is_none() {
        fallbacks.record(id, None, FallbackKind::CapacityMissing);
    }

    let heat_rate = if technology.is_dispatchable() {
        resolve_unit_or_plant_heat_rate(record, sources.plant_heat_rates)
    } else {
        None
    };

    Ok(GeneratingUnit {
        id: id.clone(),
        plant_id: record.plant_id.clone(),
        generator_id: record.generator_id.clone(),
        technology: Rc::clone(technology),
        capacity,
        zone: zone.clone(),
        window: OperatingWindow {
            first: record.operating_month,
            last: record.period,
        },
        fuel: record.energy_source_code.as_str().into(),
        heat_rate,
        default_heat_rate: None,
        emissions: None,
    })
}

/// Try the unit-reported heat rate, then the plant-level one
fn resolve_unit_or_plant_heat_rate(
    record: &RegistryRecord,
    plant_heat_rates: &HashMap<String, HeatRate>,
) -> Option<ResolvedHeatRate> {
    if let Some(value) = record.heat_rate.map(HeatRate)
        && is_valid_heat_rate(value)
    {
        return Some(ResolvedHeatRate {
            value,
            tier: HeatRateTier::Unit,
        });
    }

    plant_heat_rates
        .get(&record.plant_id)
        .map(|value| ResolvedHeatRate {
            value: *value,
            tier: HeatRateTier::Plant,
        })
}

/// The mean of the valid unit- and plant-level heat rates for each technology
fn technology_average_heat_rates(
    units: &IndexMap<UnitID, GeneratingUnit>,
) -> HashMap<TechnologyID, HeatRate> {
    let mut sums: HashMap<TechnologyID, (f64, u32)> = HashMap::new();
    for unit in units.values() {
        if let Some(heat_rate) = unit.heat_rate
            && heat_rate.is_valid()
        {
            let (sum, count) = sums.entry(unit.technology.id.clone()).or_default();
            *sum += heat_rate.value.value();
            *count += 1;
        }
    }

    sums.into_iter()
        .map(|(id, (sum, count))| (id, HeatRate(sum / f64::from(count))))
        .collect()
}

/// Resolve the technology-level heat rates, for units without one and as a substitute for invalid
/// plant-level values
fn resolve_default_heat_rates(
    units: &mut IndexMap<UnitID, GeneratingUnit>,
    fallbacks: &mut FallbackLog,
) -> Result<()> {
    let averages = technology_average_heat_rates(units);
    for (id, unit) in units.iter_mut() {
        if !unit.technology.is_dispatchable() {
            continue;
        }

        let default = averages
            .get(&unit.technology.id)
            .map(|value| ResolvedHeatRate {
                value: *value,
                tier: HeatRateTier::TechnologyAverage,
            })
            .or_else(|| {
                unit.technology
                    .heat_rate_constant()
                    .map(|value| ResolvedHeatRate {
                        value,
                        tier: HeatRateTier::TechnologyConstant,
                    })
            });
        unit.default_heat_rate = default;

        match unit.heat_rate {
            None => {
                let default = default.with_context(|| {
                    format!(
                        "Could not resolve a heat rate for unit {id} (technology {})",
                        unit.technology.id
                    )
                })?;
                let kind = match default.tier {
                    HeatRateTier::TechnologyAverage => FallbackKind::HeatRateTechnologyAverage,
                    _ => FallbackKind::HeatRateTechnologyConstant,
                };
                fallbacks.record(id, None, kind);
                unit.heat_rate = Some(default);
            }
            Some(heat_rate) if !heat_rate.is_valid() => {
                ensure!(
                    default.is_some(),
                    "Plant heat rate for unit {id} is invalid and technology {} has no default \
                    heat rate",
                    unit.technology.id
                );
            }
            Some(_) => {}
        }
    }

    Ok(())
}

/// Resolve emissions rates: unit, then plant, then technology average
fn resolve_emissions(
    units: &mut IndexMap<UnitID, GeneratingUnit>,
    emissions: &EmissionsData,
    fallbacks: &mut FallbackLog,
) {
    for unit in units.values_mut() {
        unit.emissions = emissions
            .unit_rate(&unit.plant_id, &unit.generator_id)
            .map(|co2_rate| ResolvedEmissions {
                co2_rate,
                tier: EmissionsTier::Unit,
            })
            .or_else(|| {
                emissions
                    .plant_rate(&unit.plant_id)
                    .map(|co2_rate| ResolvedEmissions {
                        co2_rate,
                        tier: EmissionsTier::Plant,
                    })
            });
    }

    let mut sums: HashMap<TechnologyID, (f64, u32)> = HashMap::new();
    for unit in units.values() {
        if let Some(emissions) = unit.emissions {
            let (sum, count) = sums.entry(unit.technology.id.clone()).or_default();
            *sum += emissions.co2_rate.value();
            *count += 1;
        }
    }

    for (id, unit) in units.iter_mut() {
        match unit.emissions {
            Some(ResolvedEmissions {
                tier: EmissionsTier::Plant,
                ..
            }) => fallbacks.record(id, None, FallbackKind::EmissionsPlant),
            Some(_) => {}
            None => {
                if let Some((sum, count)) = sums.get(&unit.technology.id) {
                    unit.emissions = Some(ResolvedEmissions {
                        co2_rate: EmissionsRate(sum / f64::from(*count)),
                        tier: EmissionsTier::TechnologyAverage,
                    });
                    fallbacks.record(id, None, FallbackKind::EmissionsTechnologyAverage);
                } else {
                    debug!("No emissions rate for unit {id}; treating it as zero-emitting");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, county_zones, registry_record, technologies};
    use float_cmp::assert_approx_eq;
    use map_macro::hash_map;
    use rstest::rstest;

    fn month(s: &str) -> Month {
        s.parse().unwrap()
    }

    fn sources<'a>(
        technologies: &'a TechnologyMap,
        counties: &'a CountyZoneMap,
        plant_heat_rates: &'a HashMap<String, HeatRate>,
    ) -> ReconcileSources<'a> {
        ReconcileSources {
            technologies,
            counties,
            plant_heat_rates,
            emissions: None,
        }
    }

    fn record(plant: &str, generator: &str, technology: &str) -> RegistryRecord {
        RegistryRecord {
            plant_id: plant.into(),
            generator_id: generator.into(),
            technology: technology.into(),
            ..registry_record()
        }
    }

    #[test]
    fn test_plant_heat_rates() {
        let record = |plant: &str, consumption: Option<f64>, generation: Option<f64>| PlantGenerationRecord {
            plant_id: plant.into(),
            consumption: consumption.map(FuelEnergy),
            generation: generation.map(Energy),
        };
        let rates = plant_heat_rates([
            record("1", Some(5000.0), Some(500.0)),
            record("1", Some(4000.0), None),
            record("1", None, Some(500.0)),
            record("2", Some(100.0), Some(0.0)),
        ]);
        assert_approx_eq!(f64, rates["1"].value(), 9.0);
        assert!(!rates["2"].is_finite());
    }

    #[test]
    fn test_select_operating_records() {
        let with = |period: &str, status: &str| RegistryRecord {
            period: month(period),
            status: status.into(),
            ..registry_record()
        };
        let records = vec![
            with("2022-01", "Operating"),
            with("2022-03", "Operating"),
            with("2022-02", "Operating"),
            with("2022-04", "Retired"),
            with("2023-01", "Operating"),
        ];
        let selected = select_operating_records(records, month("2022-12"));
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].period, month("2022-03"));
    }

    #[rstest]
    fn test_reconcile_heat_rate_tiers(technologies: TechnologyMap, county_zones: CountyZoneMap) {
        let plant_heat_rates = hash_map! {
            "200".to_string() => HeatRate(9.0),
            "300".to_string() => HeatRate(f64::NAN),
        };
        let mut unit_level = record("100", "1", "Natural Gas Fired Combined Cycle");
        unit_level.heat_rate = Some(7.0);
        let records = vec![
            unit_level,
            record("200", "1", "Natural Gas Fired Combined Cycle"),
            record("300", "1", "Natural Gas Fired Combined Cycle"),
            record("400", "1", "Natural Gas Fired Combined Cycle"),
            record("500", "1", "Natural Gas Internal Combustion Engine"),
            record("600", "1", "Solar Photovoltaic"),
        ];

        let mut fallbacks = FallbackLog::default();
        let units = reconcile_units(
            records,
            month("2022-12"),
            &sources(&technologies, &county_zones, &plant_heat_rates),
            &mut fallbacks,
        )
        .unwrap();

        let tier = |id: &str| units[id].heat_rate.unwrap().tier;
        assert_eq!(tier("100-1"), HeatRateTier::Unit);
        assert_eq!(tier("200-1"), HeatRateTier::Plant);
        assert_eq!(tier("300-1"), HeatRateTier::Plant);
        assert!(!units["300-1"].heat_rate.unwrap().is_valid());
        assert_eq!(tier("400-1"), HeatRateTier::TechnologyAverage);
        assert_approx_eq!(f64, units["400-1"].heat_rate.unwrap().value.value(), 8.0);
        assert_eq!(tier("500-1"), HeatRateTier::TechnologyConstant);
        assert_eq!(units["600-1"].heat_rate, None);

        // Plant-resolvable units never fall back to technology values
        for id in ["100-1", "200-1", "300-1"] {
            assert!(fallbacks.iter().all(|record| record.unit != UnitID::from(id)));
        }
        assert_eq!(fallbacks.len(), 2);
    }

    #[rstest]
    fn test_reconcile_unresolvable_heat_rate(
        technologies: TechnologyMap,
        county_zones: CountyZoneMap,
    ) {
        let plant_heat_rates = HashMap::new();
        let records = vec![record("100", "1", "Conventional Steam Coal")];
        assert_error!(
            reconcile_units(
                records,
                month("2022-12"),
                &sources(&technologies, &county_zones, &plant_heat_rates),
                &mut FallbackLog::default(),
            ),
            "Could not resolve a heat rate for unit 100-1 (technology Conventional Steam Coal)"
        );
    }

    #[rstest]
    fn test_reconcile_invalid_plant_without_default(
        technologies: TechnologyMap,
        county_zones: CountyZoneMap,
    ) {
        let plant_heat_rates = hash_map! {"100".to_string() => HeatRate(0.0)};
        let records = vec![record("100", "1", "Conventional Steam Coal")];
        assert_error!(
            reconcile_units(
                records,
                month("2022-12"),
                &sources(&technologies, &county_zones, &plant_heat_rates),
                &mut FallbackLog::default(),
            ),
            "Plant heat rate for unit 100-1 is invalid and technology Conventional Steam Coal \
            has no default heat rate"
        );
    }

    #[rstest]
    fn test_reconcile_unmapped_county(technologies: TechnologyMap, county_zones: CountyZoneMap) {
        let plant_heat_rates = HashMap::new();
        let records = vec![RegistryRecord {
            county: "Nowhere".into(),
            ..record("100", "1", "Solar Photovoltaic")
        }];
        assert_error!(
            reconcile_units(
                records,
                month("2022-12"),
                &sources(&technologies, &county_zones, &plant_heat_rates),
                &mut FallbackLog::default(),
            ),
            "Unit 100-1 is in county 'Nowhere' which is not mapped to a zone"
        );
    }

    #[rstest]
    fn test_reconcile_unknown_technology(
        technologies: TechnologyMap,
        county_zones: CountyZoneMap,
    ) {
        let plant_heat_rates = HashMap::new();
        let records = vec![record("100", "1", "Fusion")];
        assert_error!(
            reconcile_units(
                records,
                month("2022-12"),
                &sources(&technologies, &county_zones, &plant_heat_rates),
                &mut FallbackLog::default(),
            ),
            "Unit 100-1 has technology 'Fusion' which is not in the technology assumptions"
        );
    }

    #[rstest]
    fn test_reconcile_missing_capacity(technologies: TechnologyMap, county_zones: CountyZoneMap) {
        let plant_heat_rates = HashMap::new();
        let records = vec![RegistryRecord {
            capacity: Some(-5.0),
            ..record("100", "1", "Solar Photovoltaic")
        }];
        let mut fallbacks = FallbackLog::default();
        let units = reconcile_units(
            records,
            month("2022-12"),
            &sources(&technologies, &county_zones, &plant_heat_rates),
            &mut fallbacks,
        )
        .unwrap();
        assert_eq!(units["100-1"].capacity, None);
        assert_eq!(units["100-1"].capacity_or_zero(), Capacity(0.0));
        assert_eq!(
            fallbacks.iter().next().unwrap().kind,
            FallbackKind::CapacityMissing
        );
    }

    #[rstest]
    fn test_reconcile_emissions(technologies: TechnologyMap, county_zones: CountyZoneMap) {
        let emissions = EmissionsData::new(
            hash_map! {
                ("F1".to_string(), "1".to_string()) => EmissionsRate(0.4),
            },
            hash_map! {
                ("100".to_string(), "1".to_string()) => ("F1".to_string(), "1".to_string()),
            },
        );
        let plant_heat_rates = hash_map! {
            "100".to_string() => HeatRate(7.0),
            "200".to_string() => HeatRate(7.0),
        };
        let records = vec![
            record("100", "1", "Natural Gas Fired Combined Cycle"),
            record("100", "2", "Natural Gas Fired Combined Cycle"),
            record("200", "1", "Natural Gas Fired Combined Cycle"),
            record("300", "1", "Solar Photovoltaic"),
        ];
        let mut sources = sources(&technologies, &county_zones, &plant_heat_rates);
        sources.emissions = Some(&emissions);
        let mut fallbacks = FallbackLog::default();
        let units = reconcile_units(records, month("2022-12"), &sources, &mut fallbacks).unwrap();

        let tier = |id: &str| units[id].emissions.map(|emissions| emissions.tier);
        assert_eq!(tier("100-1"), Some(EmissionsTier::Unit));
        assert_eq!(tier("100-2"), Some(EmissionsTier::Plant));
        assert_eq!(tier("200-1"), Some(EmissionsTier::TechnologyAverage));
        assert_eq!(tier("300-1"), None);
        assert_eq!(fallbacks.len(), 2);
    }
}
