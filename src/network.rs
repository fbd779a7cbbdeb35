//! The assembled network passed to the optimiser.
//!
//! Components follow the usual power-system modelling schema: buses, links between buses, fixed
//! loads, generators and storage units, with time series aligned to the network's snapshots.
use crate::technology::{CarrierID, TechnologyID};
use crate::time::Snapshot;
use crate::unit::UnitID;
use crate::units::{Capacity, Dimensionless, EmissionsRate, Money, MoneyPerEnergy};
use crate::zone::ZoneID;
use anyhow::{Result, ensure};
use chrono::Duration;
use indexmap::IndexMap;

/// A node of the network, one per zone
#[derive(Debug, Clone, PartialEq)]
pub struct Bus {
    /// The zone the bus represents
    pub name: ZoneID,
    /// Longitude
    pub x: f64,
    /// Latitude
    pub y: f64,
    /// Nominal voltage (V)
    pub v_nom: f64,
}

/// A controllable, lossless connection between two buses
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    /// The link's name, e.g. "NORTH-COAST"
    pub name: String,
    /// The bus at the start of the link
    pub bus0: ZoneID,
    /// The bus at the end of the link
    pub bus1: ZoneID,
    /// Nominal capacity
    pub p_nom: Capacity,
    /// Minimum flow as a fraction of capacity; -1 allows flow in both directions
    pub p_min_pu: f64,
}

/// A fixed load at a bus
#[derive(Debug, Clone, PartialEq)]
pub struct Load {
    /// The load's name, e.g. "COASTL"
    pub name: String,
    /// The bus at which the load is connected
    pub bus: ZoneID,
    /// Load at each snapshot
    pub p_set: Vec<Capacity>,
}

/// Parameters for units which are subject to unit commitment
#[derive(Debug, Clone, PartialEq)]
pub struct CommitmentParameters {
    /// Cost of each start-up
    pub start_up_cost: Money,
    /// Minimum number of hours to stay on after starting
    pub min_up_time: u32,
}

/// A generator
#[derive(Debug, Clone, PartialEq)]
pub struct Generator {
    /// The generator's name
    pub name: UnitID,
    /// The bus at which the generator is connected
    pub bus: ZoneID,
    /// Energy carrier
    pub carrier: CarrierID,
    /// Technology name
    pub technology: TechnologyID,
    /// Nominal capacity
    pub p_nom: Capacity,
    /// Marginal cost at each snapshot
    pub marginal_cost: Vec<MoneyPerEnergy>,
    /// Maximum output at each snapshot as a fraction of capacity
    pub p_max_pu: Vec<Dimensionless>,
    /// Maximum increase in output per hour as a fraction of capacity
    pub ramp_limit_up: Option<Dimensionless>,
    /// Maximum decrease in output per hour as a fraction of capacity
    pub ramp_limit_down: Option<Dimensionless>,
    /// Unit commitment parameters, if the generator is committable
    pub commitment: Option<CommitmentParameters>,
    /// CO2 emitted per unit of output
    pub co2_intensity: Option<EmissionsRate>,
}

/// A storage unit
#[derive(Debug, Clone, PartialEq)]
pub struct StorageUnit {
    /// The storage unit's name
    pub name: UnitID,
    /// The bus at which the unit is connected
    pub bus: ZoneID,
    /// Energy carrier
    pub carrier: CarrierID,
    /// Technology name
    pub technology: TechnologyID,
    /// Power capacity
    pub p_nom: Capacity,
    /// Hours of storage at full power
    pub max_hours: f64,
    /// Efficiency when charging
    pub efficiency_store: Dimensionless,
    /// Efficiency when discharging
    pub efficiency_dispatch: Dimensionless,
    /// Cost of discharging
    pub marginal_cost: MoneyPerEnergy,
    /// Available fraction of power capacity at each snapshot
    pub p_max_pu: Vec<Dimensionless>,
}

impl StorageUnit {
    /// The maximum state of charge (MWh)
    pub fn energy_capacity(&self) -> f64 {
        self.p_nom.value() * self.max_hours
    }
}

/// The complete network to be optimised
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Network {
    /// Hourly snapshots covered by the network
    pub snapshots: Vec<Snapshot>,
    /// Buses, keyed by zone
    pub buses: IndexMap<ZoneID, Bus>,
    /// Links between buses
    pub links: Vec<Link>,
    /// Fixed loads
    pub loads: Vec<Load>,
    /// Generators
    pub generators: Vec<Generator>,
    /// Storage units
    pub storage_units: Vec<StorageUnit>,
}

impl Network {
    /// Whether any generator is subject to unit commitment
    pub fn is_committable(&self) -> bool {
        self.generators.iter().any(|generator| generator.commitment.is_some())
    }

    /// Check that the network is internally consistent before it is optimised.
    ///
    /// Every component must be connected to an existing bus, every time series must cover every
    /// snapshot, availabilities must be fractions, all values must be finite and snapshots must be
    /// strictly hourly.
    pub fn consistency_check(&self) -> Result<()> {
        let n = self.snapshots.len();
        ensure!(n > 0, "Network has no snapshots");
        for (previous, next) in self.snapshots.iter().zip(self.snapshots.iter().skip(1)) {
            ensure!(
                *next - *previous == Duration::hours(1),
                "Snapshots are not strictly hourly: {next} follows {previous}"
            );
        }

        for (name, bus) in &self.buses {
            ensure!(
                bus.x.is_finite() && bus.y.is_finite() && bus.v_nom.is_finite(),
                "Bus {name} has non-finite attributes"
            );
        }

        for link in &self.links {
            self.check_bus(&link.name, &link.bus0)?;
            self.check_bus(&link.name, &link.bus1)?;
            check_capacity(&link.name, link.p_nom)?;
        }

        for load in &self.loads {
            self.check_bus(&load.name, &load.bus)?;
            check_series(&load.name, "p_set", n, load.p_set.iter().map(|v| v.value()))?;
        }

        for generator in &self.generators {
            self.check_bus(&generator.name, &generator.bus)?;
            check_capacity(&generator.name, generator.p_nom)?;
            check_series(
                &generator.name,
                "marginal_cost",
                n,
                generator.marginal_cost.iter().map(|v| v.value()),
            )?;
            check_series(&generator.name, "p_max_pu", n, generator.p_max_pu.iter().map(|v| v.0))?;
            ensure!(
                generator.p_max_pu.iter().all(|v| (0.0..=1.0).contains(&v.0)),
                "Availability for {} must be between 0 and 1",
                generator.name
            );
        }

        for storage in &self.storage_units {
            self.check_bus(&storage.name, &storage.bus)?;
            check_capacity(&storage.name, storage.p_nom)?;
            ensure!(
                storage.max_hours.is_finite()
                    && storage.efficiency_store.0.is_finite()
                    && storage.efficiency_dispatch.0.is_finite()
                    && storage.marginal_cost.is_finite(),
                "Storage unit {} has non-finite attributes",
                storage.name
            );
            check_series(&storage.name, "p_max_pu", n, storage.p_max_pu.iter().map(|v| v.0))?;
            ensure!(
                storage.p_max_pu.iter().all(|v| (0.0..=1.0).contains(&v.0)),
                "Availability for {} must be between 0 and 1",
                storage.name
            );
        }

        Ok(())
    }

    /// Check that a component's bus exists
    fn check_bus(&self, component: &impl std::fmt::Display, bus: &ZoneID) -> Result<()> {
        ensure!(
            self.buses.contains_key(bus),
            "{component} is connected to unknown bus {bus}"
        );

        Ok(())
    }
}

/// Check that a capacity is finite and non-negative
fn check_capacity(component: &impl std::fmt::Display, capacity: Capacity) -> Result<()> {
    ensure!(
        capacity.is_finite() && capacity >= Capacity(0.0),
        "{component} has an invalid capacity: {capacity}"
    );

    Ok(())
}

/// Check that a series has one finite value per snapshot
fn check_series<I>(
    component: &impl std::fmt::Display,
    attribute: &str,
    expected_len: usize,
    values: I,
) -> Result<()>
where
    I: ExactSizeIterator<Item = f64>,
{
    ensure!(
        values.len() == expected_len,
        "{attribute} for {component} has {} values but there are {expected_len} snapshots",
        values.len()
    );
    for value in values {
        ensure!(
            value.is_finite(),
            "{attribute} for {component} contains non-finite values"
        );
    }

    Ok(())
}
