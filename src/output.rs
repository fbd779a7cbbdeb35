//! The module responsible for writing output data to disk.
use crate::bid::UnitOffer;
use crate::fallback::FallbackLog;
use crate::network::Network;
use crate::simulation::StitchedResult;
use crate::technology::{CarrierID, TechnologyID};
use crate::time::{Month, Snapshot};
use crate::unit::{GeneratingUnit, UnitID};
use crate::zone::ZoneID;
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::rc::Rc;

pub mod metadata;

/// The root folder in which model-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "openercot_results";

/// The output file name for units
const UNITS_FILE_NAME: &str = "units.csv";

/// The output file name for generator dispatch
const DISPATCH_FILE_NAME: &str = "dispatch.csv";

/// The output file name for dispatch aggregated by carrier
const DISPATCH_BY_CARRIER_FILE_NAME: &str = "dispatch_by_carrier.csv";

/// The output file name for storage dispatch and state of charge
const STORAGE_FILE_NAME: &str = "storage.csv";

/// The output file name for link flows
const FLOWS_FILE_NAME: &str = "flows.csv";

/// The output file name for nodal prices
const PRICES_FILE_NAME: &str = "prices.csv";

/// The output file name for the fallback log
const FALLBACKS_FILE_NAME: &str = "fallbacks.csv";

/// The output file name for chunk reports
const CHUNKS_FILE_NAME: &str = "chunks.csv";

/// The output file name for unit bids
const BIDS_FILE_NAME: &str = "debug_bids.csv";

/// Get the default output directory for the model specified at `model_dir`
pub fn get_output_dir(model_dir: &Path) -> Result<PathBuf> {
    // Get the model name from the dir path. This ends up being convoluted because we need to check
    // for all possible errors. Ugh.
    let model_dir = model_dir
        .canonicalize() // canonicalise in case the user has specified "."
        .context("Could not resolve path to model")?;

    let model_name = model_dir
        .file_name()
        .context("Model cannot be in root folder")?
        .to_str()
        .context("Invalid chars in model dir name")?;

    // Construct path
    Ok([OUTPUT_DIRECTORY_ROOT, model_name].iter().collect())
}

/// Create a new output directory for the model, optionally overwriting existing data
///
/// # Arguments
///
/// * `output_dir` - The output directory to create/overwrite
/// * `allow_overwrite` - Whether to delete and recreate the folder if it is non-empty
///
/// # Returns
///
/// `true` if the output dir contained existing data that was deleted, `false` if not, or an error.
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    // If the folder already exists, then delete it
    let overwrite = if let Ok(mut it) = fs::read_dir(output_dir) {
        if it.next().is_none() {
            // Folder exists and is empty: nothing to do
            return Ok(false);
        }

        ensure!(
            allow_overwrite,
            "Output folder already exists and is not empty. \
            Please delete the folder or pass the --overwrite command-line option."
        );

        fs::remove_dir_all(output_dir).context("Could not delete folder")?;
        true
    } else {
        false
    };

    // Try to create the directory, with parents
    fs::create_dir_all(output_dir)?;

    Ok(overwrite)
}

/// Format a snapshot for output files
fn format_snapshot(snapshot: &Snapshot) -> String {
    snapshot.format("%Y-%m-%d %H:%M").to_string()
}

/// Create a new CSV writer in the output folder
fn new_writer(output_path: &Path, file_name: &str) -> Result<csv::Writer<File>> {
    let file_path = output_path.join(file_name);
    csv::Writer::from_path(&file_path)
        .with_context(|| format!("Could not create {}", file_path.display()))
}

/// Represents a row in the units CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct UnitRow {
    unit_id: UnitID,
    plant_id: String,
    generator_id: String,
    technology: TechnologyID,
    carrier: CarrierID,
    zone: ZoneID,
    capacity: Option<f64>,
    first_month: Month,
    last_month: Month,
    fuel: String,
    heat_rate: Option<f64>,
    heat_rate_tier: Option<String>,
    co2_rate: Option<f64>,
    emissions_tier: Option<String>,
}

impl UnitRow {
    /// Create a new [`UnitRow`]
    fn new(unit: &GeneratingUnit) -> Self {
        Self {
            unit_id: unit.id.clone(),
            plant_id: unit.plant_id.clone(),
            generator_id: unit.generator_id.clone(),
            technology: unit.technology.id.clone(),
            carrier: unit.technology.carrier.clone(),
            zone: unit.zone.clone(),
            capacity: unit.capacity.map(|capacity| capacity.value()),
            first_month: unit.window.first,
            last_month: unit.window.last,
            fuel: unit.fuel.to_string(),
            heat_rate: unit.heat_rate.map(|heat_rate| heat_rate.value.value()),
            heat_rate_tier: unit.heat_rate.map(|heat_rate| heat_rate.tier.to_string()),
            co2_rate: unit.emissions.map(|emissions| emissions.co2_rate.value()),
            emissions_tier: unit.emissions.map(|emissions| emissions.tier.to_string()),
        }
    }
}

/// Represents a row in the dispatch CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct DispatchRow {
    snapshot: String,
    unit_id: UnitID,
    zone: ZoneID,
    carrier: CarrierID,
    dispatch: Option<f64>,
}

/// Represents a row in the dispatch by carrier CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct CarrierDispatchRow {
    snapshot: String,
    carrier: CarrierID,
    dispatch: Option<f64>,
}

/// Represents a row in the storage CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct StorageRow {
    snapshot: String,
    unit_id: UnitID,
    zone: ZoneID,
    dispatch: Option<f64>,
    state_of_charge: Option<f64>,
}

/// Represents a row in the flows CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct FlowRow {
    snapshot: String,
    link: String,
    flow: Option<f64>,
}

/// Represents a row in the prices CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct PriceRow {
    snapshot: String,
    zone: ZoneID,
    price: Option<f64>,
}

/// Represents a row in the fallbacks CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct FallbackRow {
    unit_id: UnitID,
    month: Option<Month>,
    kind: String,
    detail: Option<String>,
}

/// Represents a row in the chunks CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct ChunkRow {
    chunk: usize,
    first_snapshot: String,
    last_snapshot: String,
    snapshots: usize,
    retained: usize,
    status: String,
    objective: Option<f64>,
    reason: Option<String>,
}

/// Represents a row in the bids CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct BidRow {
    snapshot: String,
    unit_id: UnitID,
    marginal_cost: f64,
    availability: f64,
    operating: bool,
}

/// Sum the values at each snapshot, giving `None` if any value is missing
fn sum_series<'a, I>(series: I, n: usize) -> Vec<Option<f64>>
where
    I: IntoIterator<Item = &'a Vec<Option<f64>>>,
{
    let mut totals = vec![Some(0.0); n];
    for values in series {
        for (total, value) in totals.iter_mut().zip(values) {
            *total = total.zip(*value).map(|(total, value)| total + value);
        }
    }

    totals
}

/// For writing extra debug information about the model
struct DebugDataWriter {
    bids_writer: csv::Writer<File>,
}

impl DebugDataWriter {
    /// Open CSV files to write debug info to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    fn create(output_path: &Path) -> Result<Self> {
        Ok(Self {
            bids_writer: new_writer(output_path, BIDS_FILE_NAME)?,
        })
    }

    /// Write the bids of every generating unit
    fn write_bids(
        &mut self,
        snapshots: &[Snapshot],
        offers: &IndexMap<UnitID, UnitOffer>,
    ) -> Result<()> {
        for (unit_id, offer) in offers {
            let UnitOffer::Generator(bids) = offer else {
                continue;
            };

            for (snapshot, bid) in snapshots.iter().zip(bids.iter()) {
                self.bids_writer.serialize(BidRow {
                    snapshot: format_snapshot(snapshot),
                    unit_id: unit_id.clone(),
                    marginal_cost: bid.marginal_cost.value(),
                    availability: bid.availability.0,
                    operating: bid.operating,
                })?;
            }
        }

        Ok(())
    }

    /// Flush the underlying streams
    fn flush(&mut self) -> Result<()> {
        self.bids_writer.flush()?;

        Ok(())
    }
}

/// An object for writing simulation results to file
pub struct DataWriter {
    output_path: PathBuf,
    units_writer: csv::Writer<File>,
    dispatch_writer: csv::Writer<File>,
    carrier_dispatch_writer: csv::Writer<File>,
    storage_writer: csv::Writer<File>,
    flows_writer: csv::Writer<File>,
    fallbacks_writer: csv::Writer<File>,
    chunks_writer: csv::Writer<File>,
    debug_writer: Option<DebugDataWriter>,
}

impl DataWriter {
    /// Open CSV files to write output data to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    /// * `save_debug_info` - Whether to include extra CSV files for debugging model
    pub fn create(output_path: &Path, save_debug_info: bool) -> Result<Self> {
        let debug_writer = if save_debug_info {
            // Create debug CSV files
            Some(DebugDataWriter::create(output_path)?)
        } else {
            None
        };

        Ok(Self {
            output_path: output_path.to_path_buf(),
            units_writer: new_writer(output_path, UNITS_FILE_NAME)?,
            dispatch_writer: new_writer(output_path, DISPATCH_FILE_NAME)?,
            carrier_dispatch_writer: new_writer(output_path, DISPATCH_BY_CARRIER_FILE_NAME)?,
            storage_writer: new_writer(output_path, STORAGE_FILE_NAME)?,
            flows_writer: new_writer(output_path, FLOWS_FILE_NAME)?,
            fallbacks_writer: new_writer(output_path, FALLBACKS_FILE_NAME)?,
            chunks_writer: new_writer(output_path, CHUNKS_FILE_NAME)?,
            debug_writer,
        })
    }

    /// Write units to a CSV file
    pub fn write_units<'a, I>(&mut self, units: I) -> Result<()>
    where
        I: Iterator<Item = &'a Rc<GeneratingUnit>>,
    {
        for unit in units {
            self.units_writer.serialize(UnitRow::new(unit))?;
        }

        Ok(())
    }

    /// Write the stitched results of the simulation to CSV files.
    ///
    /// Prices are only written if the result has them.
    pub fn write_results(&mut self, network: &Network, result: &StitchedResult) -> Result<()> {
        let n = network.snapshots.len();

        let mut carriers: IndexMap<&CarrierID, Vec<&Vec<Option<f64>>>> = IndexMap::new();
        for (generator, dispatch) in network.generators.iter().zip(&result.generator_dispatch) {
            carriers.entry(&generator.carrier).or_default().push(dispatch);
        }
        for (storage, dispatch) in network.storage_units.iter().zip(&result.storage_dispatch) {
            carriers.entry(&storage.carrier).or_default().push(dispatch);
        }
        let carrier_totals: Vec<_> = carriers
            .into_iter()
            .map(|(carrier, series)| (carrier, sum_series(series, n)))
            .collect();

        let mut prices_writer = result
            .prices
            .as_ref()
            .map(|_| new_writer(&self.output_path, PRICES_FILE_NAME))
            .transpose()?;

        for (t, snapshot) in network.snapshots.iter().enumerate() {
            let snapshot = format_snapshot(snapshot);

            for (generator, dispatch) in network.generators.iter().zip(&result.generator_dispatch) {
                self.dispatch_writer.serialize(DispatchRow {
                    snapshot: snapshot.clone(),
                    unit_id: generator.name.clone(),
                    zone: generator.bus.clone(),
                    carrier: generator.carrier.clone(),
                    dispatch: dispatch[t],
                })?;
            }

            for (carrier, totals) in &carrier_totals {
                self.carrier_dispatch_writer.serialize(CarrierDispatchRow {
                    snapshot: snapshot.clone(),
                    carrier: (*carrier).clone(),
                    dispatch: totals[t],
                })?;
            }

            for (i, storage) in network.storage_units.iter().enumerate() {
                self.storage_writer.serialize(StorageRow {
                    snapshot: snapshot.clone(),
                    unit_id: storage.name.clone(),
                    zone: storage.bus.clone(),
                    dispatch: result.storage_dispatch[i][t],
                    state_of_charge: result.storage_soc[i][t],
                })?;
            }

            for (link, flows) in network.links.iter().zip(&result.link_flows) {
                self.flows_writer.serialize(FlowRow {
                    snapshot: snapshot.clone(),
                    link: link.name.clone(),
                    flow: flows[t],
                })?;
            }

            if let (Some(writer), Some(prices)) = (&mut prices_writer, &result.prices) {
                for (zone, prices) in network.buses.keys().zip(prices) {
                    writer.serialize(PriceRow {
                        snapshot: snapshot.clone(),
                        zone: zone.clone(),
                        price: prices[t],
                    })?;
                }
            }
        }

        if let Some(mut writer) = prices_writer {
            writer.flush()?;
        }

        for report in &result.chunks {
            let failure = result
                .failures
                .iter()
                .find(|failure| failure.index == report.index);
            self.chunks_writer.serialize(ChunkRow {
                chunk: report.index,
                first_snapshot: format_snapshot(&report.first_snapshot),
                last_snapshot: format_snapshot(&report.last_snapshot),
                snapshots: report.snapshots,
                retained: report.retained,
                status: if failure.is_some() { "failed" } else { "solved" }.to_string(),
                objective: report.objective,
                reason: failure.map(|failure| failure.reason.clone()),
            })?;
        }

        Ok(())
    }

    /// Write the fallback log to a CSV file
    pub fn write_fallbacks(&mut self, fallbacks: &FallbackLog) -> Result<()> {
        for record in fallbacks.iter() {
            self.fallbacks_writer.serialize(FallbackRow {
                unit_id: record.unit.clone(),
                month: record.month,
                kind: record.kind.label().to_string(),
                detail: record.kind.detail(),
            })?;
        }

        Ok(())
    }

    /// Write unit bids to a CSV file, if debug info is enabled
    pub fn write_debug_bids(
        &mut self,
        snapshots: &[Snapshot],
        offers: &IndexMap<UnitID, UnitOffer>,
    ) -> Result<()> {
        if let Some(ref mut wtr) = self.debug_writer {
            wtr.write_bids(snapshots, offers)?;
        }

        Ok(())
    }

    /// Flush the underlying streams
    pub fn flush(&mut self) -> Result<()> {
        self.units_writer.flush()?;
        self.dispatch_writer.flush()?;
        self.carrier_dispatch_writer.flush()?;
        self.storage_writer.flush()?;
        self.flows_writer.flush()?;
        self.fallbacks_writer.flush()?;
        self.chunks_writer.flush()?;
        if let Some(ref mut wtr) = self.debug_writer {
            wtr.flush()?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback::FallbackKind;
    use crate::fixture::{gas_unit, network};
    use crate::simulation::{ChunkFailure, ChunkReport};
    use itertools::{Itertools, assert_equal};
    use rstest::rstest;
    use std::iter;
    use tempfile::tempdir;

    /// Read all rows of an output file
    fn read_rows<T: serde::de::DeserializeOwned>(dir: &Path, file_name: &str) -> Vec<T> {
        csv::Reader::from_path(dir.join(file_name))
            .unwrap()
            .into_deserialize()
            .try_collect()
            .unwrap()
    }

    /// A result with the given dispatch for every component, with the last snapshot missing
    fn result_for(network: &Network, value: f64) -> StitchedResult {
        let n = network.snapshots.len();
        let series = |count: usize| {
            let mut values = vec![Some(value); n];
            values[n - 1] = None;
            vec![values; count]
        };
        StitchedResult {
            generator_dispatch: series(network.generators.len()),
            storage_dispatch: series(network.storage_units.len()),
            storage_soc: series(network.storage_units.len()),
            link_flows: series(network.links.len()),
            prices: Some(series(network.buses.len())),
            chunks: vec![
                ChunkReport {
                    index: 0,
                    first_snapshot: network.snapshots[0],
                    last_snapshot: network.snapshots[n - 2],
                    snapshots: n - 1,
                    retained: n - 1,
                    objective: Some(10.0),
                },
                ChunkReport {
                    index: 1,
                    first_snapshot: network.snapshots[n - 1],
                    last_snapshot: network.snapshots[n - 1],
                    snapshots: 1,
                    retained: 1,
                    objective: None,
                },
            ],
            failures: vec![ChunkFailure {
                index: 1,
                first_snapshot: network.snapshots[n - 1],
                last_snapshot: network.snapshots[n - 1],
                reason: "Could not solve: Infeasible".into(),
            }],
        }
    }

    #[rstest]
    fn test_write_units(gas_unit: GeneratingUnit) {
        let unit = Rc::new(gas_unit);
        let dir = tempdir().unwrap();

        // Write a unit
        {
            let mut writer = DataWriter::create(dir.path(), false).unwrap();
            writer.write_units(iter::once(&unit)).unwrap();
            writer.flush().unwrap();
        }

        // Read back and compare
        let expected = UnitRow::new(&unit);
        assert_eq!(expected.heat_rate_tier.as_deref(), Some("unit"));
        let records: Vec<UnitRow> = read_rows(dir.path(), UNITS_FILE_NAME);
        assert_equal(records, iter::once(expected));
    }

    #[rstest]
    fn test_write_results(network: Network) {
        let result = result_for(&network, 5.0);
        let dir = tempdir().unwrap();
        {
            let mut writer = DataWriter::create(dir.path(), false).unwrap();
            writer.write_results(&network, &result).unwrap();
            writer.flush().unwrap();
        }

        let n = network.snapshots.len();
        let dispatch: Vec<DispatchRow> = read_rows(dir.path(), DISPATCH_FILE_NAME);
        assert_eq!(dispatch.len(), n * network.generators.len());
        assert_eq!(dispatch[0].snapshot, "2022-01-01 00:00");
        assert_eq!(dispatch[0].unit_id, network.generators[0].name);
        assert_eq!(dispatch[0].dispatch, Some(5.0));
        assert_eq!(dispatch.last().unwrap().dispatch, None);

        let by_carrier: Vec<CarrierDispatchRow> =
            read_rows(dir.path(), DISPATCH_BY_CARRIER_FILE_NAME);
        let gas = by_carrier
            .iter()
            .find(|row| row.carrier == network.generators[0].carrier)
            .unwrap();
        let count = network
            .generators
            .iter()
            .filter(|generator| generator.carrier == network.generators[0].carrier)
            .count();
        assert_eq!(gas.dispatch, Some(5.0 * count as f64));

        let prices: Vec<PriceRow> = read_rows(dir.path(), PRICES_FILE_NAME);
        assert_eq!(prices.len(), n * network.buses.len());

        let storage: Vec<StorageRow> = read_rows(dir.path(), STORAGE_FILE_NAME);
        assert_eq!(storage.len(), n * network.storage_units.len());

        let chunks: Vec<ChunkRow> = read_rows(dir.path(), CHUNKS_FILE_NAME);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].status, "solved");
        assert_eq!(chunks[1].status, "failed");
        assert_eq!(
            chunks[1].reason.as_deref(),
            Some("Could not solve: Infeasible")
        );
    }

    #[rstest]
    fn test_write_results_no_prices(network: Network) {
        let result = StitchedResult {
            prices: None,
            ..result_for(&network, 1.0)
        };
        let dir = tempdir().unwrap();
        {
            let mut writer = DataWriter::create(dir.path(), false).unwrap();
            writer.write_results(&network, &result).unwrap();
            writer.flush().unwrap();
        }

        assert!(!dir.path().join(PRICES_FILE_NAME).exists());
    }

    #[test]
    fn test_write_fallbacks() {
        let mut fallbacks = FallbackLog::default();
        let month = Month::new(2022, 3).unwrap();
        fallbacks.record(
            &"1-2".into(),
            Some(month),
            FallbackKind::FuelPriceDefault { fuel: "NG".into() },
        );
        fallbacks.record(&"3-4".into(), None, FallbackKind::CapacityMissing);

        let dir = tempdir().unwrap();
        {
            let mut writer = DataWriter::create(dir.path(), false).unwrap();
            writer.write_fallbacks(&fallbacks).unwrap();
            writer.flush().unwrap();
        }

        let records: Vec<FallbackRow> = read_rows(dir.path(), FALLBACKS_FILE_NAME);
        assert_equal(
            records,
            [
                FallbackRow {
                    unit_id: "1-2".into(),
                    month: Some(month),
                    kind: "fuel_price_default".into(),
                    detail: Some("NG".into()),
                },
                FallbackRow {
                    unit_id: "3-4".into(),
                    month: None,
                    kind: "capacity_missing".into(),
                    detail: None,
                },
            ],
        );
    }

    #[test]
    fn test_sum_series() {
        let a = vec![Some(1.0), Some(2.0), None];
        let b = vec![Some(3.0), Some(4.0), Some(5.0)];
        assert_eq!(sum_series([&a, &b], 3), [Some(4.0), Some(6.0), None]);
    }

    #[test]
    fn test_create_output_directory_new_directory() {
        let temp_dir = tempdir().unwrap();
        let output_dir = temp_dir.path().join("output");

        // Create a new directory should succeed and return false (no overwrite)
        assert!(!create_output_directory(&output_dir, false).unwrap());
        assert!(output_dir.is_dir());
    }

    #[test]
    fn test_create_output_directory_existing_non_empty_directory() {
        let temp_dir = tempdir().unwrap();
        let output_dir = temp_dir.path().join("output");
        fs::create_dir(&output_dir).unwrap();
        fs::write(output_dir.join("test_file.txt"), "test content").unwrap();

        // Without allow_overwrite this should fail
        assert!(create_output_directory(&output_dir, false).is_err());

        // With allow_overwrite the existing files should be deleted
        assert!(create_output_directory(&output_dir, true).unwrap());
        assert!(output_dir.is_dir());
        assert!(!output_dir.join("test_file.txt").exists());
    }
}
