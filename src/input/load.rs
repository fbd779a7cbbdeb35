//! Code for reading hourly zonal load.
use super::*;
use crate::load::ZonalLoad;
use crate::series::HourlyTable;
use crate::time::parse_hour_ending;
use crate::zone::{ZoneID, ZoneMap};
use log::debug;

const ZONAL_LOAD_FILE_NAME: &str = "zonal_load.csv";

/// The name of the column holding the hour-ending label
const HOUR_ENDING_COLUMN: &str = "hour_ending";

/// Read hourly load for every zone.
///
/// The file has one row per hour and one column per zone, named by the zone's load column.
/// Repeated daylight-saving hours are dropped.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `zones` - The zones for which to read load
pub fn read_zonal_load(model_dir: &Path, zones: &ZoneMap) -> Result<ZonalLoad> {
    let file_path = model_dir.join(ZONAL_LOAD_FILE_NAME);
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(&file_path)
        .with_context(|| input_err_msg(&file_path))?;
    let headers = reader
        .headers()
        .with_context(|| input_err_msg(&file_path))?
        .clone();
    let rows: Vec<csv::StringRecord> = reader
        .records()
        .try_collect()
        .with_context(|| input_err_msg(&file_path))?;

    read_zonal_load_from_records(&headers, &rows, zones).with_context(|| input_err_msg(&file_path))
}

fn read_zonal_load_from_records(
    headers: &csv::StringRecord,
    rows: &[csv::StringRecord],
    zones: &ZoneMap,
) -> Result<ZonalLoad> {
    let column_index = |name: &str| headers.iter().position(|header| header == name);
    let hour_column = column_index(HOUR_ENDING_COLUMN)
        .with_context(|| format!("Missing column '{HOUR_ENDING_COLUMN}'"))?;
    let zone_columns: Vec<(ZoneID, usize)> = zones
        .values()
        .map(|zone| {
            let index = column_index(&zone.load_column).with_context(|| {
                format!(
                    "Load column '{}' for zone {} not found",
                    zone.load_column, zone.id
                )
            })?;
            Ok((zone.id.clone(), index))
        })
        .collect::<Result<_>>()?;

    let mut dropped = 0;
    let mut observations = Vec::with_capacity(rows.len() * zone_columns.len());
    for row in rows {
        let label = row.get(hour_column).unwrap_or_default();
        let Some(snapshot) = parse_hour_ending(label)? else {
            dropped += 1;
            continue;
        };

        for (zone, index) in &zone_columns {
            let value = row.get(*index).and_then(parse_numeric);
            observations.push((snapshot, zone.clone(), value));
        }
    }

    if dropped > 0 {
        debug!("Dropped {dropped} repeated daylight-saving hours of load");
    }

    let table = HourlyTable::from_observations(observations)?;
    ensure!(!table.is_empty(), "No load data found");

    Ok(ZonalLoad::new(table))
}
