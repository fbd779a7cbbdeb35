//! An audit log of the substitutions made where source data is sparse.
use crate::fuel::FuelID;
use crate::time::Month;
use crate::unit::UnitID;
use itertools::Itertools;
use log::{debug, warn};
use std::fmt::{self, Display};

/// The kind of substitution which was made
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackKind {
    /// Heat rate taken from the mean of other units of the same technology
    HeatRateTechnologyAverage,
    /// Heat rate taken from a hardcoded per-technology constant
    HeatRateTechnologyConstant,
    /// An invalid plant heat rate was replaced when building bids
    HeatRateSubstituted,
    /// No fuel price was available for the month so the default bid was used
    FuelPriceDefault {
        /// The fuel with no price
        fuel: FuelID,
    },
    /// No fuel price was reported for the month so an interpolated price was used
    FuelPriceInterpolated {
        /// The fuel with no reported price
        fuel: FuelID,
    },
    /// The unit's nameplate capacity was missing or invalid so 0 MW was used
    CapacityMissing,
    /// Emissions rate taken from the plant's other units
    EmissionsPlant,
    /// Emissions rate taken from the mean of other units of the same technology
    EmissionsTechnologyAverage,
}

impl FallbackKind {
    /// A short label for the kind of substitution, as written to output files
    pub fn label(&self) -> &'static str {
        match self {
            Self::HeatRateTechnologyAverage => "heat_rate_technology_average",
            Self::HeatRateTechnologyConstant => "heat_rate_technology_constant",
            Self::HeatRateSubstituted => "heat_rate_substituted",
            Self::FuelPriceDefault { .. } => "fuel_price_default",
            Self::FuelPriceInterpolated { .. } => "fuel_price_interpolated",
            Self::CapacityMissing => "capacity_missing",
            Self::EmissionsPlant => "emissions_plant",
            Self::EmissionsTechnologyAverage => "emissions_technology_average",
        }
    }

    /// Extra detail about the substitution, if any
    pub fn detail(&self) -> Option<String> {
        match self {
            Self::FuelPriceDefault { fuel } | Self::FuelPriceInterpolated { fuel } => {
                Some(fuel.to_string())
            }
            _ => None,
        }
    }
}

/// A single substitution made for a unit, optionally for a particular month
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackRecord {
    /// The unit affected
    pub unit: UnitID,
    /// The month affected, if the substitution is month-specific
    pub month: Option<Month>,
    /// What was substituted
    pub kind: FallbackKind,
}

impl Display for FallbackRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.unit, self.kind.label())?;
        if let Some(detail) = self.kind.detail() {
            write!(f, " ({detail})")?;
        }
        if let Some(month) = self.month {
            write!(f, " in {month}")?;
        }

        Ok(())
    }
}

/// All substitutions made while building a model
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FallbackLog(Vec<FallbackRecord>);

impl FallbackLog {
    /// Record a substitution
    pub fn record(&mut self, unit: &UnitID, month: Option<Month>, kind: FallbackKind) {
        let record = FallbackRecord {
            unit: unit.clone(),
            month,
            kind,
        };
        debug!("Fallback used for {record}");
        self.0.push(record);
    }

    /// Append the records of another log
    pub fn extend(&mut self, other: FallbackLog) {
        self.0.extend(other.0);
    }

    /// Iterate over the records in the order they were made
    pub fn iter(&self) -> impl Iterator<Item = &FallbackRecord> {
        self.0.iter()
    }

    /// The number of records
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no substitutions were made
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Emit a warning summarising the substitutions by kind
    pub fn log_summary(&self) {
        let counts = self.0.iter().counts_by(|record| record.kind.label());
        for (label, count) in counts.into_iter().sorted() {
            warn!("{count} fallback(s) of kind {label} were used; see fallbacks.csv for details");
        }
    }
}
