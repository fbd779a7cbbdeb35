//! Weather zones, the transfer links between them and the county-to-zone lookup.
//!
//! Each zone becomes a bus in the assembled network and each transfer link becomes a
//! bidirectional, capacity-limited link.
use crate::id::{define_id_getter, define_id_type};
use crate::units::Capacity;
use anyhow::{Result, ensure};
use indexmap::IndexMap;
use log::warn;
use petgraph::algo::connected_components;
use petgraph::graph::UnGraph;
use std::collections::HashMap;
use unicase::UniCase;

define_id_type! {ZoneID}

/// A map of [`Zone`]s, keyed by zone ID
pub type ZoneMap = IndexMap<ZoneID, Zone>;

/// A weather zone
#[derive(Debug, PartialEq, Clone)]
pub struct Zone {
    /// A unique identifier for the zone (e.g. "COAST")
    pub id: ZoneID,
    /// Latitude of the zone's representative point
    pub latitude: f64,
    /// Longitude of the zone's representative point
    pub longitude: f64,
    /// The name of this zone's column in the load table
    pub load_column: String,
}
define_id_getter! {Zone, ZoneID}

/// A transfer path between two zones.
///
/// The capacity applies in both directions.
#[derive(Debug, PartialEq, Clone)]
pub struct TransferLink {
    /// The zone at the start of the link
    pub from: ZoneID,
    /// The zone at the end of the link
    pub to: ZoneID,
    /// Total transfer capability
    pub capacity: Capacity,
}

impl TransferLink {
    /// The name of the link, e.g. "NORTH-COAST"
    pub fn name(&self) -> String {
        format!("{}-{}", self.from, self.to)
    }
}

/// The zones of the grid and the links between them
#[derive(Debug, PartialEq)]
pub struct ZoneTopology {
    /// The zones
    pub zones: ZoneMap,
    /// Links between zones
    pub links: Vec<TransferLink>,
}

impl ZoneTopology {
    /// Create a new [`ZoneTopology`], checking that the links are valid.
    ///
    /// A topology in which some zones cannot reach each other is allowed, but a warning is
    /// emitted as each island will then have to balance its own load.
    pub fn new(zones: ZoneMap, links: Vec<TransferLink>) -> Result<Self> {
        ensure!(!zones.is_empty(), "At least one zone must be defined");

        for link in &links {
            for end in [&link.from, &link.to] {
                ensure!(
                    zones.contains_key(end),
                    "Link {} refers to unknown zone {end}",
                    link.name()
                );
            }
            ensure!(
                link.from != link.to,
                "Link {} connects zone {} to itself",
                link.name(),
                link.from
            );
            ensure!(
                link.capacity.is_finite() && link.capacity >= Capacity(0.0),
                "Capacity for link {} must be a finite, non-negative number",
                link.name()
            );
        }

        let topology = Self { zones, links };
        let islands = topology.count_islands();
        if islands > 1 {
            warn!("Zones form {islands} disconnected groups; each must meet its own load");
        }

        Ok(topology)
    }

    /// The number of groups of zones which are not connected to each other
    pub fn count_islands(&self) -> usize {
        let mut graph = UnGraph::<(), ()>::new_undirected();
        let nodes: HashMap<_, _> = self
            .zones
            .keys()
            .map(|id| (id, graph.add_node(())))
            .collect();
        for link in &self.links {
            graph.add_edge(nodes[&link.from], nodes[&link.to], ());
        }

        connected_components(&graph)
    }
}

/// A case-insensitive lookup from county name to zone
#[derive(Debug, Default, PartialEq)]
pub struct CountyZoneMap(HashMap<UniCase<String>, ZoneID>);

impl CountyZoneMap {
    /// Add a county, returning `false` if it was already present
    pub fn insert(&mut self, county: &str, zone: ZoneID) -> bool {
        self.0
            .insert(UniCase::new(county.trim().to_string()), zone)
            .is_none()
    }

    /// Look up the zone for a county
    pub fn zone_for(&self, county: &str) -> Option<&ZoneID> {
        self.0.get(&UniCase::new(county.trim().to_string()))
    }

    /// The number of counties in the map
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the map is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
