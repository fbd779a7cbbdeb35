//! The interface between the rolling-horizon driver and the dispatch optimiser.
use crate::network::Network;
use anyhow::Result;
use std::ops::Range;

pub mod highs;
pub use self::highs::HighsOptimiser;

/// The result of optimising one chunk of the horizon.
///
/// All series are indexed first by component (in the order the components appear in the
/// [`Network`]) and then by snapshot, relative to the start of the chunk.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChunkSolution {
    /// Output of each generator (MW)
    pub generator_dispatch: Vec<Vec<f64>>,
    /// Net output of each storage unit (MW); negative when charging
    pub storage_dispatch: Vec<Vec<f64>>,
    /// State of charge of each storage unit at the end of each snapshot (MWh)
    pub storage_soc: Vec<Vec<f64>>,
    /// Flow along each link from `bus0` to `bus1` (MW)
    pub link_flows: Vec<Vec<f64>>,
    /// Marginal price at each bus ($/MWh); absent for unit commitment problems
    pub prices: Option<Vec<Vec<f64>>>,
    /// Total cost of the chunk
    pub objective: f64,
}

/// Something which can optimise the dispatch of a network
pub trait Optimiser {
    /// Optimise dispatch over a range of the network's snapshots.
    ///
    /// # Arguments
    ///
    /// * `network` - The network
    /// * `snapshots` - The indices of the snapshots to optimise
    /// * `initial_soc` - State of charge of each storage unit before the first snapshot
    fn optimise(
        &self,
        network: &Network,
        snapshots: Range<usize>,
        initial_soc: &[f64],
    ) -> Result<ChunkSolution>;
}
