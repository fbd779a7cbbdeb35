//! Code for reading zones, transfer links and the county to zone lookup.
use super::*;
use crate::id::IDCollection;
use crate::units::Capacity;
use crate::zone::{CountyZoneMap, TransferLink, Zone, ZoneID, ZoneMap, ZoneTopology};
use anyhow::bail;
use indexmap::IndexSet;

const ZONES_FILE_NAME: &str = "weather_zones.csv";
const LINKS_FILE_NAME: &str = "transmission_lines.csv";
const COUNTY_ZONES_FILE_NAME: &str = "county_zones.csv";

/// A row of the zones file
#[derive(Debug, Deserialize, PartialEq)]
struct ZoneRaw {
    zone: String,
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    load_column: Option<String>,
}

/// A row of the transmission lines file
#[derive(Debug, Deserialize, PartialEq)]
struct TransferLinkRaw {
    from_zone: String,
    to_zone: String,
    capacity: f64,
}

/// A row of the county to zone file
#[derive(Debug, Deserialize, PartialEq)]
struct CountyZoneRaw {
    county: String,
    zone: String,
}

/// Read the zones and the links between them from the model directory.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
pub fn read_topology(model_dir: &Path) -> Result<ZoneTopology> {
    let zones_path = model_dir.join(ZONES_FILE_NAME);
    let zones = read_zones_from_iter(read_csv(&zones_path)?)
        .with_context(|| input_err_msg(&zones_path))?;

    let links_path = model_dir.join(LINKS_FILE_NAME);
    let links = read_csv_optional(&links_path)?
        .map(|raw: TransferLinkRaw| TransferLink {
            from: raw.from_zone.into(),
            to: raw.to_zone.into(),
            capacity: Capacity(raw.capacity),
        })
        .collect();

    ZoneTopology::new(zones, links).with_context(|| input_err_msg(&links_path))
}

fn read_zones_from_iter<I>(iter: I) -> Result<ZoneMap>
where
    I: Iterator<Item = ZoneRaw>,
{
    let mut zones = ZoneMap::new();
    for raw in iter {
        let id = ZoneID::from(raw.zone.as_str());
        ensure!(
            raw.latitude.is_finite() && raw.longitude.is_finite(),
            "Coordinates for zone {id} must be finite"
        );

        let zone = Zone {
            id: id.clone(),
            latitude: raw.latitude,
            longitude: raw.longitude,
            load_column: raw.load_column.unwrap_or(raw.zone),
        };
        if zones.insert(id.clone(), zone).is_some() {
            bail!("Duplicate zone ID found: {id}");
        }
    }

    let load_columns: IndexSet<_> = zones.values().map(|zone| &zone.load_column).collect();
    ensure!(
        load_columns.len() == zones.len(),
        "Each zone must have a different load column"
    );

    Ok(zones)
}

/// Read the county to zone lookup from the model directory.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `zones` - Known zones
pub fn read_county_zones(model_dir: &Path, zones: &ZoneMap) -> Result<CountyZoneMap> {
    let file_path = model_dir.join(COUNTY_ZONES_FILE_NAME);
    read_county_zones_from_iter(read_csv(&file_path)?, zones)
        .with_context(|| input_err_msg(&file_path))
}

fn read_county_zones_from_iter<I>(iter: I, zones: &ZoneMap) -> Result<CountyZoneMap>
where
    I: Iterator<Item = CountyZoneRaw>,
{
    let mut counties = CountyZoneMap::default();
    for raw in iter {
        let zone = zones.get_id(&raw.zone)?.clone();
        ensure!(
            counties.insert(&raw.county, zone),
            "County {} is assigned to more than one zone",
            raw.county
        );
    }

    Ok(counties)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, zones};
    use rstest::rstest;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn zone_raw(zone: &str, load_column: Option<&str>) -> ZoneRaw {
        ZoneRaw {
            zone: zone.into(),
            latitude: 30.0,
            longitude: -97.0,
            load_column: load_column.map(Into::into),
        }
    }

    #[test]
    fn test_read_zones_from_iter() {
        let zones = read_zones_from_iter(
            [zone_raw("COAST", None), zone_raw("FWEST", Some("FAR_WEST"))].into_iter(),
        )
        .unwrap();
        assert_eq!(zones.len(), 2);
        assert_eq!(zones["COAST"].load_column, "COAST");
        assert_eq!(zones["FWEST"].load_column, "FAR_WEST");
    }

    #[test]
    fn test_read_zones_from_iter_duplicate() {
        assert_error!(
            read_zones_from_iter([zone_raw("COAST", None), zone_raw("COAST", None)].into_iter()),
            "Duplicate zone ID found: COAST"
        );
        assert_error!(
            read_zones_from_iter(
                [zone_raw("COAST", None), zone_raw("EAST", Some("COAST"))].into_iter()
            ),
            "Each zone must have a different load column"
        );
    }

    #[rstest]
    fn test_read_county_zones_from_iter(zones: ZoneMap) {
        let raw = |county: &str, zone: &str| CountyZoneRaw {
            county: county.into(),
            zone: zone.into(),
        };

        let counties = read_county_zones_from_iter(
            [raw("Harris", "COAST"), raw("Dallas", "NORTH")].into_iter(),
            &zones,
        )
        .unwrap();
        assert_eq!(counties.zone_for("HARRIS"), Some(&ZoneID::from("COAST")));

        assert_error!(
            read_county_zones_from_iter([raw("Harris", "WEST")].into_iter(), &zones),
            "Unknown ID WEST found"
        );
        assert_error!(
            read_county_zones_from_iter(
                [raw("Harris", "COAST"), raw("harris", "NORTH")].into_iter(),
                &zones
            ),
            "County harris is assigned to more than one zone"
        );
    }

    #[test]
    fn test_read_topology() {
        let dir = tempdir().unwrap();
        {
            let mut file = File::create(dir.path().join(ZONES_FILE_NAME)).unwrap();
            writeln!(
                file,
                "zone,latitude,longitude,load_column\n\
                COAST,29.76,-95.37,COAST\n\
                NORTH,33.2,-97.1,NORTH"
            )
            .unwrap();
            let mut file = File::create(dir.path().join(LINKS_FILE_NAME)).unwrap();
            writeln!(file, "from_zone,to_zone,capacity\nCOAST,NORTH,1500").unwrap();
        }

        let topology = read_topology(dir.path()).unwrap();
        assert_eq!(topology.zones.len(), 2);
        assert_eq!(topology.links.len(), 1);
        assert_eq!(topology.links[0].capacity, Capacity(1500.0));
    }
}
