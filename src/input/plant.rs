//! Code for reading reported plant fuel consumption and generation.
use super::*;
use crate::reconcile::PlantGenerationRecord;
use crate::time::Month;
use crate::units::{Energy, FuelEnergy};

const PLANT_GENERATION_FILE_NAME: &str = "plant_generation.csv";

/// A row of the plant generation file
#[derive(Debug, Deserialize, PartialEq)]
struct PlantGenerationRaw {
    plant_id: String,
    #[allow(dead_code)]
    period: Month,
    #[serde(deserialize_with = "deserialise_numeric")]
    total_consumption_mmbtu: Option<f64>,
    #[serde(deserialize_with = "deserialise_numeric")]
    generation_mwh: Option<f64>,
}

/// Read every reported period of plant fuel consumption and generation.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
pub fn read_plant_generation(model_dir: &Path) -> Result<Vec<PlantGenerationRecord>> {
    let file_path = model_dir.join(PLANT_GENERATION_FILE_NAME);
    let records = read_csv(&file_path)?
        .map(|raw: PlantGenerationRaw| PlantGenerationRecord {
            plant_id: raw.plant_id,
            consumption: raw.total_consumption_mmbtu.map(FuelEnergy),
            generation: raw.generation_mwh.map(Energy),
        })
        .collect();

    Ok(records)
}
