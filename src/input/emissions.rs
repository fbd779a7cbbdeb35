//! Code for reading emissions rates and the crosswalk from registry units to emitting units.
use super::*;
use crate::emissions::EmissionsData;
use crate::units::EmissionsRate;
use anyhow::bail;
use std::collections::HashMap;

const EMISSIONS_RATES_FILE_NAME: &str = "emissions_rates.csv";
const CROSSWALK_FILE_NAME: &str = "unit_crosswalk.csv";

/// A row of the emissions rates file
#[derive(Debug, Deserialize, PartialEq)]
struct EmissionsRateRaw {
    facility_id: String,
    unit_id: String,
    #[serde(deserialize_with = "deserialise_numeric")]
    co2_rate: Option<f64>,
}

/// A row of the unit crosswalk file
#[derive(Debug, Deserialize, PartialEq)]
struct CrosswalkRaw {
    plant_id: String,
    generator_id: String,
    facility_id: String,
    unit_id: String,
}

/// Read emissions data, if supplied.
///
/// The emissions rates and crosswalk files are optional but must be supplied together.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
pub fn read_emissions(model_dir: &Path) -> Result<Option<EmissionsData>> {
    let rates_path = model_dir.join(EMISSIONS_RATES_FILE_NAME);
    let crosswalk_path = model_dir.join(CROSSWALK_FILE_NAME);
    match (rates_path.is_file(), crosswalk_path.is_file()) {
        (false, false) => {
            info!("No emissions data supplied");
            return Ok(None);
        }
        (true, true) => {}
        _ => bail!(
            "{EMISSIONS_RATES_FILE_NAME} and {CROSSWALK_FILE_NAME} must be supplied together"
        ),
    }

    let rates = read_rates_from_iter(read_csv(&rates_path)?)
        .with_context(|| input_err_msg(&rates_path))?;
    let crosswalk = read_crosswalk_from_iter(read_csv(&crosswalk_path)?)
        .with_context(|| input_err_msg(&crosswalk_path))?;

    Ok(Some(EmissionsData::new(rates, crosswalk)))
}

fn read_rates_from_iter<I>(iter: I) -> Result<HashMap<(String, String), EmissionsRate>>
where
    I: Iterator<Item = EmissionsRateRaw>,
{
    let mut rates = HashMap::new();
    for raw in iter {
        let Some(rate) = raw.co2_rate else {
            continue;
        };
        ensure!(
            rate >= 0.0,
            "CO2 rate for facility {} unit {} must not be negative",
            raw.facility_id,
            raw.unit_id
        );

        let key = (raw.facility_id, raw.unit_id);
        ensure!(
            rates.insert(key.clone(), EmissionsRate(rate)).is_none(),
            "Duplicate entry for facility {} unit {}",
            key.0,
            key.1
        );
    }

    Ok(rates)
}

fn read_crosswalk_from_iter<I>(iter: I) -> Result<HashMap<(String, String), (String, String)>>
where
    I: Iterator<Item = CrosswalkRaw>,
{
    let mut crosswalk = HashMap::new();
    for raw in iter {
        let key = (raw.plant_id, raw.generator_id);
        let value = (raw.facility_id, raw.unit_id);
        if let Some(existing) = crosswalk.insert(key.clone(), value.clone())
            && existing != value
        {
            bail!(
                "Generator {} at plant {} is mapped to more than one emitting unit",
                key.1,
                key.0
            );
        }
    }

    Ok(crosswalk)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn rate(facility_id: &str, unit_id: &str, co2_rate: Option<f64>) -> EmissionsRateRaw {
        EmissionsRateRaw {
            facility_id: facility_id.into(),
            unit_id: unit_id.into(),
            co2_rate,
        }
    }

    #[test]
    fn test_read_rates_from_iter() {
        let rates = read_rates_from_iter(
            [rate("F1", "U1", Some(0.4)), rate("F1", "U2", None)].into_iter(),
        )
        .unwrap();
        assert_eq!(rates.len(), 1);
        assert_error!(
            read_rates_from_iter([rate("F1", "U1", Some(-0.4))].into_iter()),
            "CO2 rate for facility F1 unit U1 must not be negative"
        );
        assert_error!(
            read_rates_from_iter(
                [rate("F1", "U1", Some(0.4)), rate("F1", "U1", Some(0.5))].into_iter()
            ),
            "Duplicate entry for facility F1 unit U1"
        );
    }

    #[test]
    fn test_read_emissions() {
        let dir = tempdir().unwrap();
        assert!(read_emissions(dir.path()).unwrap().is_none());

        {
            let mut file = File::create(dir.path().join(EMISSIONS_RATES_FILE_NAME)).unwrap();
            writeln!(file, "facility_id,unit_id,co2_rate\nF1,U1,0.45").unwrap();
        }
        assert!(read_emissions(dir.path()).is_err());

        {
            let mut file = File::create(dir.path().join(CROSSWALK_FILE_NAME)).unwrap();
            writeln!(
                file,
                "plant_id,generator_id,facility_id,unit_id\n3453,CT1,F1,U1"
            )
            .unwrap();
        }
        let emissions = read_emissions(dir.path()).unwrap().unwrap();
        assert_eq!(emissions.unit_rate("3453", "CT1"), Some(EmissionsRate(0.45)));
        assert_eq!(emissions.plant_rate("3453"), Some(EmissionsRate(0.45)));
        assert_eq!(emissions.unit_rate("3453", "CT2"), None);
    }
}
