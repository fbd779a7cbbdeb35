//! Translates the reconciled model into the network schema used by the optimiser.
use crate::bid::{BidContext, UnitOffer, build_offers};
use crate::fallback::FallbackLog;
use crate::model::Model;
use crate::network::{Bus, CommitmentParameters, Generator, Link, Load, Network, StorageUnit};
use crate::time::Snapshot;
use crate::unit::{GeneratingUnit, UnitID};
use anyhow::{Context, Result};
use indexmap::IndexMap;
use log::info;

/// Build bids for every unit and assemble the network.
///
/// Substitutions made while building bids are added to `fallbacks`. The returned network has
/// passed its consistency check.
pub fn assemble(
    model: &Model,
    fallbacks: &mut FallbackLog,
) -> Result<(Network, IndexMap<UnitID, UnitOffer>)> {
    let snapshots = model.snapshots();
    let context = BidContext {
        snapshots: &snapshots,
        fuel_prices: &model.fuel_prices,
        renewables: &model.renewables,
        round_trip_efficiency: model.parameters.round_trip_efficiency,
    };
    let offers = build_offers(&model.units, &context, fallbacks)?;
    let network = build_network(model, snapshots, &offers)?;
    network
        .consistency_check()
        .context("Assembled network failed consistency check")?;
    info!(
        "Assembled network with {} buses, {} links, {} generators and {} storage units over {} \
        snapshots",
        network.buses.len(),
        network.links.len(),
        network.generators.len(),
        network.storage_units.len(),
        network.snapshots.len()
    );

    Ok((network, offers))
}

/// Build the network from the model and the units' offers.
///
/// # Arguments
///
/// * `model` - The model
/// * `snapshots` - The snapshots to cover
/// * `offers` - An offer for every unit in the model
pub fn build_network(
    model: &Model,
    snapshots: Vec<Snapshot>,
    offers: &IndexMap<UnitID, UnitOffer>,
) -> Result<Network> {
    let buses = model
        .topology
        .zones
        .values()
        .map(|zone| {
            let bus = Bus {
                name: zone.id.clone(),
                x: zone.longitude,
                y: zone.latitude,
                v_nom: model.parameters.bus_nominal_voltage,
            };
            (zone.id.clone(), bus)
        })
        .collect();

    let links = model
        .topology
        .links
        .iter()
        .map(|link| Link {
            name: link.name(),
            bus0: link.from.clone(),
            bus1: link.to.clone(),
            p_nom: link.capacity,
            p_min_pu: -1.0,
        })
        .collect();

    let loads = model
        .topology
        .zones
        .keys()
        .map(|zone| {
            let p_set = snapshots
                .iter()
                .map(|snapshot| model.load.get(zone, snapshot))
                .collect::<Result<_>>()?;
            Ok(Load {
                name: format!("{zone}L"),
                bus: zone.clone(),
                p_set,
            })
        })
        .collect::<Result<_>>()?;

    let mut network = Network {
        snapshots,
        buses,
        links,
        loads,
        ..Default::default()
    };

    for (id, offer) in offers {
        let unit = model
            .units
            .get(id)
            .with_context(|| format!("No unit found for offer {id}"))?;
        match offer {
            UnitOffer::Generator(bids) => network.generators.push(Generator {
                marginal_cost: bids.marginal_costs(),
                p_max_pu: bids.availabilities(),
                ..generator_for(unit, model.parameters.committable)
            }),
            UnitOffer::Storage(offer) => network.storage_units.push(StorageUnit {
                name: unit.id.clone(),
                bus: unit.zone.clone(),
                carrier: unit.technology.carrier.clone(),
                technology: unit.technology.id.clone(),
                p_nom: unit.capacity_or_zero(),
                max_hours: offer.max_hours,
                efficiency_store: offer.efficiency_store,
                efficiency_dispatch: offer.efficiency_dispatch,
                marginal_cost: offer.marginal_cost,
                p_max_pu: offer.availability.clone(),
            }),
        }
    }

    Ok(network)
}

/// A generator for the unit, without its time series
fn generator_for(unit: &GeneratingUnit, committable: bool) -> Generator {
    let parameters = unit.technology.dispatch_parameters();
    let commitment = parameters
        .filter(|_| committable)
        .map(|parameters| CommitmentParameters {
            start_up_cost: parameters.start_up_cost,
            min_up_time: parameters.min_up_time,
        });

    Generator {
        name: unit.id.clone(),
        bus: unit.zone.clone(),
        carrier: unit.technology.carrier.clone(),
        technology: unit.technology.id.clone(),
        p_nom: unit.capacity_or_zero(),
        marginal_cost: Vec::new(),
        p_max_pu: Vec::new(),
        ramp_limit_up: parameters.and_then(|parameters| parameters.ramp_up_limit),
        ramp_limit_down: parameters.and_then(|parameters| parameters.ramp_down_limit),
        commitment,
        co2_intensity: unit.emissions.map(|emissions| emissions.co2_rate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::model;
    use rstest::rstest;

    #[rstest]
    fn test_assemble(model: Model) {
        let mut fallbacks = FallbackLog::default();
        let (network, offers) = assemble(&model, &mut fallbacks).unwrap();
        assert_eq!(offers.len(), model.units.len());
        assert_eq!(network.buses.len(), 2);
        assert_eq!(network.buses["COAST"].x, -95.4);
        assert_eq!(network.buses["COAST"].v_nom, 345_000.0);
        assert_eq!(network.links[0].p_min_pu, -1.0);
        assert_eq!(network.loads[0].name, "COASTL");
        assert_eq!(network.loads[0].p_set.len(), network.snapshots.len());
        assert_eq!(
            network.generators.len() + network.storage_units.len(),
            model.units.len()
        );
        assert!(!network.is_committable());
    }

    #[rstest]
    fn test_assemble_committable(mut model: Model) {
        model.parameters.committable = true;
        let (network, _) = assemble(&model, &mut FallbackLog::default()).unwrap();
        let gas = network
            .generators
            .iter()
            .find(|generator| generator.name == UnitID::from("gas-1"))
            .unwrap();
        assert!(gas.commitment.is_some());
        assert!(gas.ramp_limit_up.is_some());
        let solar = network
            .generators
            .iter()
            .find(|generator| generator.name == UnitID::from("solar-1"))
            .unwrap();
        assert!(solar.commitment.is_none());
        assert!(network.is_committable());
    }

    #[rstest]
    fn test_assemble_missing_load(mut model: Model) {
        model.parameters.end_date = chrono::NaiveDate::from_ymd_opt(2022, 1, 5).unwrap();
        let snapshots = model.snapshots();
        let offers = IndexMap::new();
        assert!(build_network(&model, snapshots, &offers).is_err());
    }
}
