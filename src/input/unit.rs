//! Code for reading the unit registry.
use super::*;
use crate::time::Month;
use crate::unit::RegistryRecord;

const GENERATORS_FILE_NAME: &str = "generators.csv";

/// A row of the unit registry file
#[derive(Debug, Deserialize, PartialEq)]
struct RegistryRecordRaw {
    period: Month,
    plant_id: String,
    generator_id: String,
    technology: String,
    county: String,
    status: String,
    #[serde(deserialize_with = "deserialise_numeric")]
    nameplate_capacity_mw: Option<f64>,
    operating_year_month: Month,
    energy_source_code: String,
    #[serde(default, deserialize_with = "deserialise_numeric")]
    heat_rate: Option<f64>,
}

impl From<RegistryRecordRaw> for RegistryRecord {
    fn from(raw: RegistryRecordRaw) -> Self {
        Self {
            period: raw.period,
            plant_id: raw.plant_id,
            generator_id: raw.generator_id,
            technology: raw.technology,
            county: raw.county,
            status: raw.status,
            capacity: raw.nameplate_capacity_mw,
            operating_month: raw.operating_year_month,
            energy_source_code: raw.energy_source_code,
            heat_rate: raw.heat_rate,
        }
    }
}

/// Read every monthly record from the unit registry.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
pub fn read_registry(model_dir: &Path) -> Result<Vec<RegistryRecord>> {
    let file_path = model_dir.join(GENERATORS_FILE_NAME);
    let records = read_csv::<RegistryRecordRaw>(&file_path)?
        .map(RegistryRecord::from)
        .collect();

    Ok(records)
}
