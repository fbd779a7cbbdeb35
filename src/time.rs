//! Calendar types for the simulation: hourly snapshots and calendar months.
//!
//! Snapshots are naive local timestamps at the top of each hour. Source data labels hours by the
//! hour *ending*, which is converted here into the hour beginning convention used everywhere
//! else.
use anyhow::{Context, Result, ensure};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::de::Error;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::ops::Range;
use std::str::FromStr;

/// A single hourly timestep of the simulation
pub type Snapshot = NaiveDateTime;

/// The timestamp formats accepted for hourly source data
const TIMESTAMP_FORMATS: [&str; 5] = [
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// A calendar month
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Month {
    year: i32,
    month: u32,
}

impl Month {
    /// Create a new [`Month`], checking that `month` is in the range 1-12
    pub fn new(year: i32, month: u32) -> Result<Self> {
        ensure!(
            (1..=12).contains(&month),
            "Month must be between 1 and 12, got {month}"
        );
        Ok(Self { year, month })
    }

    /// The month in which the given date falls
    pub fn of_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The month in which the given snapshot falls
    pub fn of(snapshot: &Snapshot) -> Self {
        Self::of_date(snapshot.date())
    }

    /// The calendar year
    pub fn year(self) -> i32 {
        self.year
    }

    /// The month of the year (1-12)
    pub fn month(self) -> u32 {
        self.month
    }

    /// The following month
    pub fn succ(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Iterate over the months from `self` to `last`, inclusive
    pub fn iter_to(self, last: Month) -> impl Iterator<Item = Month> {
        std::iter::successors(Some(self), move |month| {
            let next = month.succ();
            (next <= last).then_some(next)
        })
        .take_while(move |month| *month <= last)
    }
}

impl Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Month {
    type Err = anyhow::Error;

    /// Parse a month from `YYYY-MM`, also accepting a full `YYYY-MM-DD` date
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let mut parts = s.split('-');
        let (Some(year), Some(month)) = (parts.next(), parts.next()) else {
            anyhow::bail!("Invalid month '{s}': should be in the form YYYY-MM");
        };
        let year = year
            .parse()
            .with_context(|| format!("Invalid year in month '{s}'"))?;
        let month = month
            .parse()
            .with_context(|| format!("Invalid month in '{s}'"))?;

        Month::new(year, month)
    }
}

impl<'de> Deserialize<'de> for Month {
    fn deserialize<D>(deserialiser: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s: String = Deserialize::deserialize(deserialiser)?;
        s.parse().map_err(|err: anyhow::Error| D::Error::custom(err))
    }
}

impl Serialize for Month {
    fn serialize<S>(&self, serialiser: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serialiser.collect_str(self)
    }
}

/// The calendar range between a unit's first operating month and its last observed operating
/// month, inclusive
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct OperatingWindow {
    /// The first month in which the unit operated
    pub first: Month,
    /// The last month in which the unit was observed operating
    pub last: Month,
}

impl OperatingWindow {
    /// Whether the unit is operating in the given month
    pub fn contains(&self, month: Month) -> bool {
        self.first <= month && month <= self.last
    }
}

/// Parse an hour-ending timestamp into a snapshot.
///
/// Hour-ending labels are mapped onto snapshots directly, except that `24:00` becomes `00:00` of
/// the following day. Labels marked as the repeated daylight-saving hour (containing `DST`) are
/// dropped, in which case `None` is returned.
pub fn parse_hour_ending(s: &str) -> Result<Option<Snapshot>> {
    let s = s.trim();
    if s.contains("DST") {
        return Ok(None);
    }

    // chrono cannot parse hour 24 so we roll the date forward ourselves
    if let Some((date, time)) = s.rsplit_once(' ')
        && (time == "24:00" || time == "24:00:00")
    {
        let midnight = parse_timestamp(&format!("{date} 00:00"))?;
        return Ok(Some(midnight + Duration::days(1)));
    }

    parse_timestamp(s).map(Some)
}

/// Parse a timestamp in any of the accepted formats
pub fn parse_timestamp(s: &str) -> Result<Snapshot> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
        .with_context(|| format!("Invalid timestamp: '{s}'"))
}

/// A gap-free hourly sequence of snapshots from `first_day` 00:00 to `last_day` 23:00
pub fn hourly_snapshots(first_day: NaiveDate, last_day: NaiveDate) -> Vec<Snapshot> {
    let start = first_day.and_time(NaiveTime::MIN);
    let end = last_day.and_time(NaiveTime::MIN) + Duration::hours(23);
    hourly_range(start, end)
}

/// All snapshots between `start` and `end` inclusive, at hourly intervals
pub fn hourly_range(start: Snapshot, end: Snapshot) -> Vec<Snapshot> {
    std::iter::successors(Some(start), |snapshot| Some(*snapshot + Duration::hours(1)))
        .take_while(|snapshot| *snapshot <= end)
        .collect()
}

/// Whether the snapshot falls exactly on the hour
pub fn is_on_the_hour(snapshot: &Snapshot) -> bool {
    snapshot.minute() == 0 && snapshot.second() == 0 && snapshot.nanosecond() == 0
}

/// Split an ordered sequence of snapshots into contiguous runs by calendar month
pub fn group_by_month(snapshots: &[Snapshot]) -> Vec<(Month, Range<usize>)> {
    let mut groups: Vec<(Month, Range<usize>)> = Vec::new();
    for (i, snapshot) in snapshots.iter().enumerate() {
        let month = Month::of(snapshot);
        match groups.last_mut() {
            Some((last, range)) if *last == month => range.end = i + 1,
            _ => groups.push((month, i..i + 1)),
        }
    }

    groups
}
