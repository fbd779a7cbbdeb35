//! Fixtures for tests

use crate::fallback::FallbackLog;
use crate::fuel::{FuelID, FuelPriceSeries};
use crate::load::ZonalLoad;
use crate::model::{Model, ModelParameters};
use crate::network::{Bus, Generator, Link, Load, Network, StorageUnit};
use crate::renewable::RenewableCapacityFactors;
use crate::series::HourlyTable;
use crate::technology::{
    DispatchParameters, RenewableKind, StorageParameters, Technology, TechnologyClass,
    TechnologyMap,
};
use crate::time::{Month, OperatingWindow, hourly_range, hourly_snapshots};
use crate::unit::{GeneratingUnit, HeatRateTier, RegistryRecord, ResolvedHeatRate, UnitID};
use crate::units::{Capacity, Dimensionless, HeatRate, Money, MoneyPerEnergy};
use crate::zone::{CountyZoneMap, TransferLink, Zone, ZoneID, ZoneMap, ZoneTopology};
use chrono::{NaiveDate, Timelike};
use indexmap::indexmap;
use rstest::fixture;
use std::iter;
use std::path::PathBuf;
use std::rc::Rc;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn month(s: &str) -> Month {
    s.parse().unwrap()
}

#[fixture]
pub fn zones() -> ZoneMap {
    let zone = |id: &str, latitude, longitude| Zone {
        id: id.into(),
        latitude,
        longitude,
        load_column: id.into(),
    };
    indexmap! {
        "COAST".into() => zone("COAST", 29.76, -95.4),
        "NORTH".into() => zone("NORTH", 32.78, -96.8),
    }
}

#[fixture]
pub fn county_zones() -> CountyZoneMap {
    let mut counties = CountyZoneMap::default();
    counties.insert("Harris", "COAST".into());
    counties.insert("Dallas", "NORTH".into());
    counties
}

#[fixture]
pub fn technologies() -> TechnologyMap {
    let dispatchable = |id: &str, carrier: &str, default_bid, parameters| Technology {
        id: id.into(),
        carrier: carrier.into(),
        default_bid: MoneyPerEnergy(default_bid),
        class: TechnologyClass::Dispatchable(parameters),
    };
    let technologies = [
        dispatchable(
            "Natural Gas Fired Combined Cycle",
            "gas",
            60.0,
            DispatchParameters {
                vom: MoneyPerEnergy(2.0),
                ramp_up_limit: Some(Dimensionless(0.5)),
                ramp_down_limit: Some(Dimensionless(0.5)),
                start_up_cost: Money(1000.0),
                min_up_time: 2,
            },
        ),
        dispatchable(
            "Natural Gas Internal Combustion Engine",
            "gas",
            80.0,
            DispatchParameters {
                vom: MoneyPerEnergy(3.0),
                ..Default::default()
            },
        ),
        dispatchable(
            "Conventional Steam Coal",
            "coal",
            25.0,
            DispatchParameters {
                vom: MoneyPerEnergy(4.0),
                ..Default::default()
            },
        ),
        Technology {
            id: "Solar Photovoltaic".into(),
            carrier: "solar".into(),
            default_bid: MoneyPerEnergy(0.0),
            class: TechnologyClass::Renewable(RenewableKind::Solar),
        },
        Technology {
            id: "Nuclear".into(),
            carrier: "nuclear".into(),
            default_bid: MoneyPerEnergy(10.0),
            class: TechnologyClass::Baseload,
        },
        Technology {
            id: "Batteries".into(),
            carrier: "battery".into(),
            default_bid: MoneyPerEnergy(0.0),
            class: TechnologyClass::Storage(StorageParameters { max_hours: 2.0 }),
        },
    ];

    technologies
        .into_iter()
        .map(|technology| (technology.id.clone(), Rc::new(technology)))
        .collect()
}

/// A registry record for an operating combined cycle unit in Harris county
pub fn registry_record() -> RegistryRecord {
    RegistryRecord {
        period: month("2022-01"),
        plant_id: "1".into(),
        generator_id: "1".into(),
        technology: "Natural Gas Fired Combined Cycle".into(),
        county: "Harris".into(),
        status: "Operating".into(),
        capacity: Some(100.0),
        operating_month: month("2010-01"),
        energy_source_code: "NG".into(),
        heat_rate: None,
    }
}

#[fixture]
pub fn fuel_prices() -> FuelPriceSeries {
    FuelPriceSeries::from_readings([
        (month("2022-01"), FuelID::from("NG"), Some(4.0)),
        (month("2022-02"), FuelID::from("NG"), Some(4.5)),
    ])
}

/// Solar output across January 2022: 0.6 during daylight hours and zero otherwise
#[fixture]
pub fn renewables() -> RenewableCapacityFactors {
    let observations = hourly_snapshots(date(2022, 1, 1), date(2022, 1, 31))
        .into_iter()
        .map(|snapshot| {
            let value = if (7..=17).contains(&snapshot.hour()) {
                0.6
            } else {
                0.0
            };
            (snapshot, RenewableKind::Solar, Some(value))
        });
    RenewableCapacityFactors::new(HourlyTable::from_observations(observations).unwrap())
}

fn unit(
    id: &str,
    technology: &Rc<Technology>,
    zone: &str,
    capacity: f64,
    fuel: &str,
) -> GeneratingUnit {
    let (plant_id, generator_id) = id.split_once('-').unwrap();
    GeneratingUnit {
        id: UnitID::from_parts(plant_id, generator_id),
        plant_id: plant_id.into(),
        generator_id: generator_id.into(),
        technology: Rc::clone(technology),
        capacity: Some(Capacity(capacity)),
        zone: zone.into(),
        window: OperatingWindow {
            first: month("2010-01"),
            last: month("2022-12"),
        },
        fuel: fuel.into(),
        heat_rate: None,
        default_heat_rate: None,
        emissions: None,
    }
}

#[fixture]
pub fn gas_unit(technologies: TechnologyMap) -> GeneratingUnit {
    GeneratingUnit {
        heat_rate: Some(ResolvedHeatRate {
            value: HeatRate(7.5),
            tier: HeatRateTier::Unit,
        }),
        ..unit(
            "gas-1",
            &technologies["Natural Gas Fired Combined Cycle"],
            "COAST",
            300.0,
            "NG",
        )
    }
}

#[fixture]
pub fn solar_unit(technologies: TechnologyMap) -> GeneratingUnit {
    unit(
        "solar-1",
        &technologies["Solar Photovoltaic"],
        "COAST",
        50.0,
        "SUN",
    )
}

/// A two-bus network over three hours with gas, solar and a battery
#[fixture]
pub fn network() -> Network {
    let first = date(2022, 1, 1).and_hms_opt(0, 0, 0).unwrap();
    let snapshots = hourly_range(first, date(2022, 1, 1).and_hms_opt(2, 0, 0).unwrap());
    let bus = |name: &str, x, y| Bus {
        name: name.into(),
        x,
        y,
        v_nom: 345_000.0,
    };
    let load = |name: &str, values: [f64; 3]| Load {
        name: format!("{name}L"),
        bus: name.into(),
        p_set: values.into_iter().map(Capacity).collect(),
    };
    let generator =
        |name: &str, technology: &str, carrier: &str, p_nom, cost, p_max_pu: [f64; 3]| Generator {
            name: name.into(),
            bus: "COAST".into(),
            carrier: carrier.into(),
            technology: technology.into(),
            p_nom: Capacity(p_nom),
            marginal_cost: vec![MoneyPerEnergy(cost); 3],
            p_max_pu: p_max_pu.into_iter().map(Dimensionless).collect(),
            ramp_limit_up: None,
            ramp_limit_down: None,
            commitment: None,
            co2_intensity: None,
        };

    Network {
        snapshots,
        buses: indexmap! {
            "COAST".into() => bus("COAST", -95.4, 29.76),
            "NORTH".into() => bus("NORTH", -96.8, 32.78),
        },
        links: vec![Link {
            name: "COAST-NORTH".into(),
            bus0: "COAST".into(),
            bus1: "NORTH".into(),
            p_nom: Capacity(1000.0),
            p_min_pu: -1.0,
        }],
        loads: vec![
            load("COAST", [100.0, 120.0, 110.0]),
            load("NORTH", [50.0, 60.0, 55.0]),
        ],
        generators: vec![
            generator(
                "gas-1",
                "Natural Gas Fired Combined Cycle",
                "gas",
                300.0,
                30.0,
                [1.0; 3],
            ),
            generator(
                "solar-1",
                "Solar Photovoltaic",
                "solar",
                50.0,
                0.0,
                [0.5, 0.8, 0.2],
            ),
        ],
        storage_units: vec![StorageUnit {
            name: "battery-1".into(),
            bus: "NORTH".into(),
            carrier: "battery".into(),
            technology: "Batteries".into(),
            p_nom: Capacity(20.0),
            max_hours: 2.0,
            efficiency_store: Dimensionless(0.8).sqrt(),
            efficiency_dispatch: Dimensionless(0.8).sqrt(),
            marginal_cost: MoneyPerEnergy(0.0),
            p_max_pu: vec![Dimensionless(1.0); 3],
        }],
    }
}

/// A model covering 1 January 2022, with load available for the first three days
#[fixture]
pub fn model(
    zones: ZoneMap,
    technologies: TechnologyMap,
    gas_unit: GeneratingUnit,
    solar_unit: GeneratingUnit,
    fuel_prices: FuelPriceSeries,
    renewables: RenewableCapacityFactors,
) -> Model {
    let parameters = ModelParameters {
        start_date: date(2022, 1, 1),
        end_date: date(2022, 1, 1),
        committable: false,
        set_size: 0,
        overlap: 0,
        round_trip_efficiency: Dimensionless(0.8),
        bus_nominal_voltage: 345_000.0,
        interpolate_fuel_prices: false,
        solver_time_limit: None,
    };
    let link = TransferLink {
        from: "COAST".into(),
        to: "NORTH".into(),
        capacity: Capacity(1000.0),
    };
    let topology = ZoneTopology::new(zones, vec![link]).unwrap();

    let battery = unit(
        "battery-1",
        &technologies["Batteries"],
        "NORTH",
        20.0,
        "MWH",
    );
    let units = [gas_unit, solar_unit, battery]
        .into_iter()
        .map(|unit| (unit.id.clone(), Rc::new(unit)))
        .collect();

    let observations = hourly_snapshots(date(2022, 1, 1), date(2022, 1, 3))
        .into_iter()
        .flat_map(|snapshot| {
            iter::once((snapshot, ZoneID::from("COAST"), Some(100.0)))
                .chain(iter::once((snapshot, ZoneID::from("NORTH"), Some(50.0))))
        });
    let load = ZonalLoad::new(HourlyTable::from_observations(observations).unwrap());

    Model {
        model_path: PathBuf::from("."),
        parameters,
        topology,
        technologies,
        units,
        fuel_prices,
        renewables,
        load,
        fallbacks: FallbackLog::default(),
    }
}
