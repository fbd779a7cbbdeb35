//! Common routines for handling input data.
use crate::fallback::FallbackLog;
use crate::model::{Model, ModelParameters};
use crate::reconcile::{ReconcileSources, plant_heat_rates, reconcile_units};
use crate::units::Dimensionless;
use anyhow::{Context, Result, ensure};
use chrono::NaiveDate;
use itertools::Itertools;
use log::info;
use serde::Deserialize;
use serde::de::{DeserializeOwned, Deserializer};
use std::fs;
use std::path::Path;

mod emissions;
use emissions::read_emissions;
mod fuel;
use fuel::read_fuel_prices;
mod load;
use load::read_zonal_load;
mod plant;
use plant::read_plant_generation;
mod renewable;
use renewable::read_renewable_capacity_factors;
mod technology;
use technology::read_technologies;
mod unit;
use unit::read_registry;
mod zone;
use zone::{read_county_zones, read_topology};

/// Markers used in source data to indicate that a value is not available
const MISSING_VALUE_MARKERS: [&str; 6] = ["", "NA", "N/A", "NaN", ".", "-"];

/// Read a series of type `T`s from a CSV file.
///
/// Will raise an error if the file is empty.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv<'a, T: DeserializeOwned + 'a>(
    file_path: &'a Path,
) -> Result<impl Iterator<Item = T> + 'a> {
    let vec = read_csv_internal(file_path)?;
    ensure!(
        !vec.is_empty(),
        "CSV file {} cannot be empty",
        file_path.display()
    );

    Ok(vec.into_iter())
}

/// Read a series of type `T`s from a CSV file.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv_optional<'a, T: DeserializeOwned + 'a>(
    file_path: &'a Path,
) -> Result<impl Iterator<Item = T> + 'a> {
    let vec = read_csv_internal(file_path)?;
    Ok(vec.into_iter())
}

fn read_csv_internal<T: DeserializeOwned>(file_path: &Path) -> Result<Vec<T>> {
    let vec = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(file_path)
        .with_context(|| input_err_msg(file_path))?
        .into_deserialize()
        .process_results(|iter| iter.collect_vec())
        .with_context(|| input_err_msg(file_path))?;

    Ok(vec)
}

/// Parse a TOML file at the specified path.
///
/// # Arguments
///
/// * `file_path` - Path to the TOML file
///
/// # Returns
///
/// * The deserialised TOML data or an error if the file could not be read or parsed.
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    let toml_data = toml::from_str(&toml_str).with_context(|| input_err_msg(file_path))?;
    Ok(toml_data)
}

/// Format an error message to include the file path. To be used with `anyhow::Context`.
pub fn input_err_msg<P: AsRef<Path>>(file_path: P) -> String {
    format!("Error reading {}", file_path.as_ref().display())
}

/// Parse a numeric field from source data.
///
/// Explicit "not available" markers, unparseable text and non-finite numbers all give `None`.
pub fn parse_numeric(s: &str) -> Option<f64> {
    let s = s.trim();
    if MISSING_VALUE_MARKERS
        .iter()
        .any(|marker| s.eq_ignore_ascii_case(marker))
    {
        return None;
    }

    s.replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Read a numeric field which may be missing (see [`parse_numeric`])
pub fn deserialise_numeric<'de, D>(deserialiser: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Deserialize::deserialize(deserialiser)?;
    Ok(value.as_deref().and_then(parse_numeric))
}

/// Read a date in `YYYY-MM-DD` format
pub fn deserialise_date<'de, D>(deserialiser: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let value: String = Deserialize::deserialize(deserialiser)?;
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        serde::de::Error::custom(format!("Invalid date '{value}': should be YYYY-MM-DD"))
    })
}

/// Read a [`Dimensionless`] value, checking that it is between 0 and 1 and not zero
pub fn deserialise_proportion_nonzero<'de, D>(deserialiser: D) -> Result<Dimensionless, D::Error>
where
    D: Deserializer<'de>,
{
    let value: f64 = Deserialize::deserialize(deserialiser)?;
    if !(value > 0.0 && value <= 1.0) {
        Err(serde::de::Error::custom("Value must be > 0 and <= 1"))?;
    }

    Ok(Dimensionless(value))
}

/// Read a model from the specified directory.
///
/// Every source file is read before reconciliation begins.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
///
/// # Returns
///
/// The reconciled model, or an error if any input is invalid.
pub fn load_model<P: AsRef<Path>>(model_dir: P) -> Result<Model> {
    let model_dir = model_dir.as_ref();
    let parameters = ModelParameters::from_path(model_dir)?;

    let topology = read_topology(model_dir)?;
    let counties = read_county_zones(model_dir, &topology.zones)?;
    let technologies = read_technologies(model_dir)?;
    let registry = read_registry(model_dir)?;
    let plant_records = read_plant_generation(model_dir)?;
    let emissions = read_emissions(model_dir)?;
    let mut fuel_prices = read_fuel_prices(model_dir)?;
    let renewables = read_renewable_capacity_factors(model_dir)?;
    let load = read_zonal_load(model_dir, &topology.zones)?;

    if parameters.interpolate_fuel_prices {
        let filled = fuel_prices.interpolate_gaps();
        info!("Interpolated {filled} missing monthly fuel prices");
    }

    let plant_heat_rates = plant_heat_rates(plant_records);
    let sources = ReconcileSources {
        technologies: &technologies,
        counties: &counties,
        plant_heat_rates: &plant_heat_rates,
        emissions: emissions.as_ref(),
    };
    let mut fallbacks = FallbackLog::default();
    let units = reconcile_units(registry, parameters.end_month(), &sources, &mut fallbacks)?;

    Ok(Model {
        model_path: model_dir.to_path_buf(),
        parameters,
        topology,
        technologies,
        units,
        fuel_prices,
        renewables,
        load,
        fallbacks,
    })
}
