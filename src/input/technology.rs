//! Code for reading the technology assumptions file.
use super::*;
use crate::technology::{
    DispatchParameters, RenewableKind, StorageParameters, Technology, TechnologyClass,
    TechnologyClassLabel, TechnologyID, TechnologyMap,
};
use crate::units::{Money, MoneyPerEnergy};
use anyhow::bail;

const TECHNOLOGIES_FILE_NAME: &str = "technology_assumptions.csv";

/// Storage duration used when none is given
const DEFAULT_MAX_HOURS: f64 = 1.0;

/// A row of the technology assumptions file
#[derive(Debug, Deserialize, PartialEq)]
struct TechnologyRaw {
    technology: String,
    carrier: String,
    #[serde(default)]
    class: Option<TechnologyClassLabel>,
    default_bid: f64,
    #[serde(default)]
    vom: Option<f64>,
    #[serde(default)]
    ramp_up_limit: Option<f64>,
    #[serde(default)]
    ramp_down_limit: Option<f64>,
    #[serde(default)]
    start_up_cost: Option<f64>,
    #[serde(default)]
    min_up_time: Option<u32>,
    #[serde(default)]
    max_hours: Option<f64>,
}

/// Check that a ramp limit, if given, is a fraction of capacity per hour
fn check_ramp_limit(value: Option<f64>, name: &str) -> Result<Option<Dimensionless>> {
    let Some(value) = value else {
        return Ok(None);
    };
    ensure!(value > 0.0 && value <= 1.0, "{name} must be > 0 and <= 1");

    Ok(Some(Dimensionless(value)))
}

impl TechnologyRaw {
    /// Build the technology's class from the optional columns
    fn class(&self) -> Result<TechnologyClass> {
        let label = self
            .class
            .unwrap_or_else(|| TechnologyClassLabel::infer(&self.technology));

        let class = match label {
            TechnologyClassLabel::Solar => TechnologyClass::Renewable(RenewableKind::Solar),
            TechnologyClassLabel::Wind => TechnologyClass::Renewable(RenewableKind::Wind),
            TechnologyClassLabel::Hydro => TechnologyClass::Renewable(RenewableKind::Hydro),
            TechnologyClassLabel::Baseload => TechnologyClass::Baseload,
            TechnologyClassLabel::Storage => {
                let max_hours = self.max_hours.unwrap_or(DEFAULT_MAX_HOURS);
                ensure!(
                    max_hours.is_finite() && max_hours > 0.0,
                    "max_hours must be a finite number greater than zero"
                );
                TechnologyClass::Storage(StorageParameters { max_hours })
            }
            TechnologyClassLabel::Dispatchable => {
                let vom = self.vom.unwrap_or(0.0);
                ensure!(
                    vom.is_finite() && vom >= 0.0,
                    "vom must be a finite, non-negative number"
                );
                let start_up_cost = self.start_up_cost.unwrap_or(0.0);
                ensure!(
                    start_up_cost.is_finite() && start_up_cost >= 0.0,
                    "start_up_cost must be a finite, non-negative number"
                );

                TechnologyClass::Dispatchable(DispatchParameters {
                    vom: MoneyPerEnergy(vom),
                    ramp_up_limit: check_ramp_limit(self.ramp_up_limit, "ramp_up_limit")?,
                    ramp_down_limit: check_ramp_limit(self.ramp_down_limit, "ramp_down_limit")?,
                    start_up_cost: Money(start_up_cost),
                    min_up_time: self.min_up_time.unwrap_or(0),
                })
            }
        };

        Ok(class)
    }
}

/// Read technologies from the technology assumptions file.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
pub fn read_technologies(model_dir: &Path) -> Result<TechnologyMap> {
    let file_path = model_dir.join(TECHNOLOGIES_FILE_NAME);
    read_technologies_from_iter(read_csv(&file_path)?).with_context(|| input_err_msg(&file_path))
}

fn read_technologies_from_iter<I>(iter: I) -> Result<TechnologyMap>
where
    I: Iterator<Item = TechnologyRaw>,
{
    let mut technologies = TechnologyMap::new();
    for raw in iter {
        let id = TechnologyID::from(raw.technology.as_str());
        ensure!(
            raw.default_bid.is_finite(),
            "Default bid for technology {id} must be finite"
        );

        let class = raw
            .class()
            .with_context(|| format!("Invalid assumptions for technology {id}"))?;
        let technology = Technology {
            id: id.clone(),
            carrier: raw.carrier.as_str().into(),
            default_bid: MoneyPerEnergy(raw.default_bid),
            class,
        };

        if technologies.insert(id.clone(), technology.into()).is_some() {
            bail!("Duplicate technology found: {id}");
        }
    }

    Ok(technologies)
}
