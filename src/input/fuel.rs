//! Code for reading monthly fuel prices.
use super::*;
use crate::fuel::FuelPriceSeries;
use crate::time::Month;
use log::warn;

const FUEL_COSTS_FILE_NAME: &str = "fuel_costs.csv";

/// A row of the fuel costs file
#[derive(Debug, Deserialize, PartialEq)]
struct FuelCostRaw {
    period: Month,
    fuel_type: String,
    #[serde(deserialize_with = "deserialise_numeric")]
    cost_per_mmbtu: Option<f64>,
}

/// Read monthly fuel prices.
///
/// Unusable readings are discarded (see [`FuelPriceSeries::from_readings`]).
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
pub fn read_fuel_prices(model_dir: &Path) -> Result<FuelPriceSeries> {
    let file_path = model_dir.join(FUEL_COSTS_FILE_NAME);
    let mut total = 0;
    let prices = FuelPriceSeries::from_readings(read_csv(&file_path)?.map(|raw: FuelCostRaw| {
        total += 1;
        (raw.period, raw.fuel_type.as_str().into(), raw.cost_per_mmbtu)
    }));

    if prices.is_empty() {
        warn!("No usable fuel prices found in {}", file_path.display());
    }
    info!(
        "Read {} monthly prices for {} fuels from {total} readings",
        prices.len(),
        prices.fuels().count()
    );

    Ok(prices)
}
