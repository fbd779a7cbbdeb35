//! Functionality for running the rolling-horizon dispatch simulation.
use crate::assembly::assemble;
use crate::horizon::{Chunk, partition_horizon};
use crate::model::{Model, ModelParameters};
use crate::network::Network;
use crate::optimiser::{ChunkSolution, HighsOptimiser, Optimiser};
use crate::output::DataWriter;
use crate::output::metadata::write_metadata;
use crate::time::Snapshot;
use anyhow::{Result, bail};
use log::{error, info, warn};
use std::path::Path;

/// A chunk which could not be optimised
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkFailure {
    /// Position of the chunk in the sequence
    pub index: usize,
    /// The first snapshot optimised in the chunk
    pub first_snapshot: Snapshot,
    /// The last snapshot optimised in the chunk
    pub last_snapshot: Snapshot,
    /// Why the chunk failed
    pub reason: String,
}

/// A summary of how a chunk was optimised
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkReport {
    /// Position of the chunk in the sequence
    pub index: usize,
    /// The first snapshot optimised in the chunk
    pub first_snapshot: Snapshot,
    /// The last snapshot optimised in the chunk
    pub last_snapshot: Snapshot,
    /// Number of snapshots optimised
    pub snapshots: usize,
    /// Number of snapshots whose results were kept
    pub retained: usize,
    /// The chunk's total cost, if it was solved
    pub objective: Option<f64>,
}

/// Results for the whole horizon, stitched together from the retained part of each chunk.
///
/// Series are indexed first by component (in network order) and then by snapshot. Values for
/// snapshots retained by a failed chunk are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct StitchedResult {
    /// Output of each generator (MW)
    pub generator_dispatch: Vec<Vec<Option<f64>>>,
    /// Net output of each storage unit (MW)
    pub storage_dispatch: Vec<Vec<Option<f64>>>,
    /// State of charge of each storage unit (MWh)
    pub storage_soc: Vec<Vec<Option<f64>>>,
    /// Flow along each link (MW)
    pub link_flows: Vec<Vec<Option<f64>>>,
    /// Marginal price at each bus ($/MWh), if the problem is not committable
    pub prices: Option<Vec<Vec<Option<f64>>>>,
    /// One report per chunk, in order
    pub chunks: Vec<ChunkReport>,
    /// The chunks which failed
    pub failures: Vec<ChunkFailure>,
}

/// An empty series for each of `count` components
fn empty_series(count: usize, n: usize) -> Vec<Vec<Option<f64>>> {
    vec![vec![None; n]; count]
}

/// Copy the retained part of a chunk's series into the stitched series
fn stitch(target: &mut [Vec<Option<f64>>], source: &[Vec<f64>], chunk: &Chunk) {
    let offset = chunk.snapshots.start;
    for (target, source) in target.iter_mut().zip(source) {
        for t in chunk.retained.clone() {
            target[t] = Some(source[t - offset]);
        }
    }
}

impl StitchedResult {
    /// An empty result for the network
    fn new(network: &Network) -> Self {
        let n = network.snapshots.len();
        Self {
            generator_dispatch: empty_series(network.generators.len(), n),
            storage_dispatch: empty_series(network.storage_units.len(), n),
            storage_soc: empty_series(network.storage_units.len(), n),
            link_flows: empty_series(network.links.len(), n),
            prices: (!network.is_committable()).then(|| empty_series(network.buses.len(), n)),
            chunks: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Whether every chunk was solved
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// The state of charge of each storage unit before the chunk starting at `start`.
    ///
    /// Storage starts empty at the beginning of the horizon and after a failed chunk.
    fn initial_soc(&self, start: usize) -> Vec<f64> {
        let Some(previous) = start.checked_sub(1) else {
            return vec![0.0; self.storage_soc.len()];
        };

        let soc: Vec<_> = self.storage_soc.iter().map(|soc| soc[previous]).collect();
        if soc.iter().any(Option::is_none) {
            warn!(
                "No state of charge is available from the previous chunk; storage will start \
                empty"
            );
        }

        soc.into_iter().map(Option::unwrap_or_default).collect()
    }

    /// Add the retained part of a chunk's solution
    fn insert(&mut self, chunk: &Chunk, solution: &ChunkSolution) {
        stitch(&mut self.generator_dispatch, &solution.generator_dispatch, chunk);
        stitch(&mut self.storage_dispatch, &solution.storage_dispatch, chunk);
        stitch(&mut self.storage_soc, &solution.storage_soc, chunk);
        stitch(&mut self.link_flows, &solution.link_flows, chunk);
        if let (Some(prices), Some(chunk_prices)) = (&mut self.prices, &solution.prices) {
            stitch(prices, chunk_prices, chunk);
        }
    }
}

/// Optimise the network over its whole horizon, one chunk at a time.
///
/// Chunks are solved in chronological order. A failed chunk is recorded and its retained
/// snapshots are left without results; later chunks are still solved.
///
/// # Arguments
///
/// * `network` - The assembled network
/// * `parameters` - Model parameters giving the chunk size and overlap
/// * `optimiser` - The optimiser with which to solve each chunk
pub fn run_rolling_horizon(
    network: &Network,
    parameters: &ModelParameters,
    optimiser: &dyn Optimiser,
) -> StitchedResult {
    let chunks = partition_horizon(
        network.snapshots.len(),
        parameters.set_size,
        parameters.overlap,
    );
    info!(
        "Optimising {} snapshots in {} chunks",
        network.snapshots.len(),
        chunks.len()
    );

    let mut result = StitchedResult::new(network);
    for chunk in &chunks {
        let first_snapshot = network.snapshots[chunk.snapshots.start];
        let last_snapshot = network.snapshots[chunk.snapshots.end - 1];
        info!(
            "Chunk {}: {first_snapshot} to {last_snapshot} ({} snapshots, {} retained)",
            chunk.index,
            chunk.snapshots.len(),
            chunk.retained.len()
        );

        let initial_soc = result.initial_soc(chunk.snapshots.start);
        let objective = match optimiser.optimise(network, chunk.snapshots.clone(), &initial_soc) {
            Ok(solution) => {
                result.insert(chunk, &solution);
                Some(solution.objective)
            }
            Err(err) => {
                warn!("Chunk {} failed: {err:#}", chunk.index);
                result.failures.push(ChunkFailure {
                    index: chunk.index,
                    first_snapshot,
                    last_snapshot,
                    reason: format!("{err:#}"),
                });
                None
            }
        };

        result.chunks.push(ChunkReport {
            index: chunk.index,
            first_snapshot,
            last_snapshot,
            snapshots: chunk.snapshots.len(),
            retained: chunk.retained.len(),
            objective,
        });
    }

    result
}

/// Run the simulation.
///
/// # Arguments:
///
/// * `model` - The model to run
/// * `output_path` - The folder to which output files will be written
/// * `debug_model` - Whether to write additional information (e.g. bids) to CSV files
pub fn run(model: &Model, output_path: &Path, debug_model: bool) -> Result<()> {
    write_metadata(output_path, &model.model_path, &model.snapshots())?;

    let mut fallbacks = model.fallbacks.clone();
    let (network, offers) = assemble(model, &mut fallbacks)?;
    fallbacks.log_summary();

    let optimiser = HighsOptimiser::new(model.parameters.solver_time_limit);
    let result = run_rolling_horizon(&network, &model.parameters, &optimiser);

    let mut writer = DataWriter::create(output_path, debug_model)?;
    writer.write_units(model.units.values())?;
    writer.write_results(&network, &result)?;
    writer.write_fallbacks(&fallbacks)?;
    writer.write_debug_bids(&network.snapshots, &offers)?;
    writer.flush()?;
    info!("Results written to {}", output_path.display());

    if !result.is_complete() {
        for failure in &result.failures {
            error!(
                "Chunk {} ({} to {}) failed: {}",
                failure.index, failure.first_snapshot, failure.last_snapshot, failure.reason
            );
        }
        bail!(
            "{} of {} chunks could not be solved",
            result.failures.len(),
            result.chunks.len()
        );
    }

    Ok(())
}
