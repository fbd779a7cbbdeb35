//! Code for reading fleet-wide renewable capacity factors.
use super::*;
use crate::renewable::RenewableCapacityFactors;
use crate::series::HourlyTable;
use crate::technology::RenewableKind;
use crate::time::{Snapshot, parse_timestamp};
use indexmap::IndexSet;
use log::warn;
use std::str::FromStr;

const RENEWABLE_OUTPUT_FILE_NAME: &str = "renewable_output.csv";

/// A row of the renewable output file
#[derive(Debug, Deserialize, PartialEq)]
struct RenewableOutputRaw {
    timestamp: String,
    technology: String,
    #[serde(deserialize_with = "deserialise_numeric")]
    capacity_factor: Option<f64>,
}

/// Read hourly renewable capacity factors.
///
/// Values outside the range 0 to 1 are treated as missing and, like other missing values, filled
/// by interpolation within each technology's observed range.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
pub fn read_renewable_capacity_factors(model_dir: &Path) -> Result<RenewableCapacityFactors> {
    let file_path = model_dir.join(RENEWABLE_OUTPUT_FILE_NAME);
    read_renewable_capacity_factors_from_iter(read_csv(&file_path)?)
        .with_context(|| input_err_msg(&file_path))
}

fn read_renewable_capacity_factors_from_iter<I>(iter: I) -> Result<RenewableCapacityFactors>
where
    I: Iterator<Item = RenewableOutputRaw>,
{
    let mut unknown = IndexSet::new();
    let mut observations: Vec<(Snapshot, RenewableKind, Option<f64>)> = Vec::new();
    for raw in iter {
        let Ok(kind) = RenewableKind::from_str(raw.technology.trim()) else {
            unknown.insert(raw.technology);
            continue;
        };

        let snapshot = parse_timestamp(&raw.timestamp)?;
        let value = raw
            .capacity_factor
            .filter(|value| (0.0..=1.0).contains(value));
        observations.push((snapshot, kind, value));
    }

    for technology in unknown {
        warn!("Ignoring capacity factors for unknown renewable technology '{technology}'");
    }

    let table = HourlyTable::from_observations(observations)?;
    ensure!(!table.is_empty(), "No renewable capacity factors found");

    Ok(RenewableCapacityFactors::new(table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    fn raw(timestamp: &str, technology: &str, capacity_factor: Option<f64>) -> RenewableOutputRaw {
        RenewableOutputRaw {
            timestamp: timestamp.into(),
            technology: technology.into(),
            capacity_factor,
        }
    }

    #[test]
    fn test_read_renewable_capacity_factors_from_iter() {
        let factors = read_renewable_capacity_factors_from_iter(
            [
                raw("2022-01-01 00:00", "solar", Some(0.0)),
                raw("2022-01-01 01:00", "Solar", Some(1.7)),
                raw("2022-01-01 02:00", "solar", Some(0.5)),
                raw("2022-01-01 00:00", "wind", Some(0.4)),
                raw("2022-01-01 01:00", "wind", None),
                raw("2022-01-01 00:00", "geothermal", Some(0.9)),
            ]
            .into_iter(),
        )
        .unwrap();

        let hour = |h| parse_timestamp(&format!("2022-01-01 0{h}:00")).unwrap();
        // Out of range value is interpolated
        assert_approx_eq!(
            f64,
            factors.get(RenewableKind::Solar, &hour(1)).unwrap(),
            0.25
        );
        // Never extrapolated past the last valid value
        assert!(factors.get(RenewableKind::Wind, &hour(1)).is_err());
        assert!(factors.get(RenewableKind::Wind, &hour(2)).is_err());
        assert!(!factors.table().contains_key(&RenewableKind::Hydro));
    }

    #[test]
    fn test_read_renewable_capacity_factors_dense_unchanged() {
        let values = [0.1, 0.2, 0.3, 0.4];
        let factors = read_renewable_capacity_factors_from_iter(
            values
                .iter()
                .enumerate()
                .map(|(h, v)| raw(&format!("2022-01-01 0{h}:00"), "wind", Some(*v))),
        )
        .unwrap();

        for (h, v) in values.iter().enumerate() {
            let snapshot = parse_timestamp(&format!("2022-01-01 0{h}:00")).unwrap();
            assert_eq!(factors.get(RenewableKind::Wind, &snapshot).unwrap(), *v);
        }
    }

    #[test]
    fn test_read_renewable_capacity_factors_bad_timestamp() {
        assert!(
            read_renewable_capacity_factors_from_iter(
                [raw("yesterday", "solar", Some(0.5))].into_iter()
            )
            .is_err()
        );
    }
}
