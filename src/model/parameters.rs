//! Defines the `ModelParameters` struct, which represents the contents of `model.toml`.
use crate::input::{deserialise_date, deserialise_proportion_nonzero, input_err_msg, read_toml};
use crate::time::{Month, Snapshot, hourly_snapshots};
use crate::units::Dimensionless;
use anyhow::{Context, Result, ensure};
use chrono::NaiveDate;
use log::warn;
use serde::Deserialize;
use std::path::Path;

const MODEL_PARAMETERS_FILE_NAME: &str = "model.toml";

macro_rules! define_unit_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            <$type>::new($value)
        }
    };
}

macro_rules! define_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            $value
        }
    };
}

define_param_default!(default_round_trip_efficiency, Dimensionless, Dimensionless(0.8));
define_param_default!(default_bus_nominal_voltage, f64, 345_000.0);

/// Represents the contents of the entire model file.
#[derive(Debug, Deserialize, PartialEq)]
pub struct ModelParameters {
    /// The first day of the simulation (`YYYY-MM-DD`)
    #[serde(deserialize_with = "deserialise_date")]
    pub start_date: NaiveDate,
    /// The last day of the simulation (`YYYY-MM-DD`), inclusive
    #[serde(deserialize_with = "deserialise_date")]
    pub end_date: NaiveDate,
    /// Whether dispatchable units are subject to unit commitment
    #[serde(default)]
    pub committable: bool,
    /// Number of snapshots retained from each chunk of the horizon; zero solves in one go
    #[serde(default)]
    pub set_size: usize,
    /// Number of extra snapshots of lookahead in each chunk
    #[serde(default)]
    pub overlap: usize,
    /// Round-trip efficiency of storage units
    #[serde(default = "default_round_trip_efficiency")]
    #[serde(deserialize_with = "deserialise_proportion_nonzero")]
    pub round_trip_efficiency: Dimensionless,
    /// Nominal voltage of every bus (V)
    #[serde(default = "default_bus_nominal_voltage")]
    pub bus_nominal_voltage: f64,
    /// Whether to fill months with no fuel price by interpolating between reported months
    #[serde(default)]
    pub interpolate_fuel_prices: bool,
    /// Maximum time the solver may spend on each chunk (seconds)
    #[serde(default)]
    pub solver_time_limit: Option<f64>,
}

/// Check that the simulation dates are valid
fn check_dates(start_date: NaiveDate, end_date: NaiveDate) -> Result<()> {
    ensure!(
        start_date <= end_date,
        "start_date ({start_date}) must not be after end_date ({end_date})"
    );

    Ok(())
}

/// Check that the `bus_nominal_voltage` parameter is valid
fn check_bus_nominal_voltage(value: f64) -> Result<()> {
    ensure!(
        value.is_finite() && value > 0.0,
        "bus_nominal_voltage must be a finite number greater than zero"
    );

    Ok(())
}

/// Check that the `solver_time_limit` parameter is valid
fn check_solver_time_limit(value: Option<f64>) -> Result<()> {
    if let Some(value) = value {
        ensure!(
            value.is_finite() && value > 0.0,
            "solver_time_limit must be a finite number greater than zero"
        );
    }

    Ok(())
}

impl ModelParameters {
    /// Read a model file from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    ///
    /// # Returns
    ///
    /// The model file contents as a [`ModelParameters`] struct or an error if the file is invalid
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<ModelParameters> {
        let file_path = model_dir.as_ref().join(MODEL_PARAMETERS_FILE_NAME);
        let model_params: ModelParameters = read_toml(&file_path)?;

        model_params
            .validate()
            .with_context(|| input_err_msg(file_path))?;

        Ok(model_params)
    }

    /// Validate parameters after reading in file
    fn validate(&self) -> Result<()> {
        check_dates(self.start_date, self.end_date)?;

        // round_trip_efficiency already validated with deserialise_proportion_nonzero

        check_bus_nominal_voltage(self.bus_nominal_voltage)?;
        check_solver_time_limit(self.solver_time_limit)?;

        if self.set_size == 0 && self.overlap > 0 {
            warn!("overlap is ignored because set_size is zero; the horizon is solved in one go");
        }

        Ok(())
    }

    /// The hourly snapshots covered by the simulation
    pub fn snapshots(&self) -> Vec<Snapshot> {
        hourly_snapshots(self.start_date, self.end_date)
    }

    /// The month of the simulation's last day
    pub fn end_month(&self) -> Month {
        Month::of_date(self.end_date)
    }
}
