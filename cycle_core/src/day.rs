//! Day-key normalization.
//!
//! Every component identifies a calendar day by a single integer: the epoch
//! milliseconds of that day's local midnight. This is also the persisted
//! representation, so it must stay bit-for-bit stable across releases.
//!
//! Arithmetic on day keys always goes through calendar dates rather than
//! adding multiples of 24h, because local days are 23 or 25 hours long
//! around daylight-saving transitions.

use crate::{Error, Result};
use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical identity of a calendar day (local-midnight epoch millis).
///
/// Deserialization rejects millis outside chrono's representable range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct DayKey(i64);

impl DayKey {
    /// Wrap raw epoch millis without normalizing or range-checking them.
    ///
    /// Use [`DayKey::try_from_millis`] for untrusted input and
    /// [`DayKey::normalize_in`] for values that may not sit on midnight.
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Wrap raw epoch millis, rejecting instants chrono cannot represent
    pub fn try_from_millis(millis: i64) -> Result<Self> {
        match DateTime::from_timestamp_millis(millis) {
            Some(_) => Ok(Self(millis)),
            None => Err(Error::InvalidDate(format!(
                "day key {} is outside the supported date range",
                millis
            ))),
        }
    }

    /// Raw epoch millis of this key
    pub const fn millis(self) -> i64 {
        self.0
    }

    /// Key of `date` in the given time zone.
    ///
    /// If local midnight does not exist (a DST gap at 00:00), the first valid
    /// instant of that day is used, which is what a wall-clock "start of day"
    /// resolves to.
    pub fn from_date_in<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Self {
        for hour in 0..24 {
            let Some(naive) = date.and_hms_opt(hour, 0, 0) else {
                continue;
            };
            if let Some(instant) = tz.from_local_datetime(&naive).earliest() {
                return Self(instant.timestamp_millis());
            }
        }
        // Unreachable for real zones; fall back to UTC midnight.
        Self(date.and_time(chrono::NaiveTime::MIN).and_utc().timestamp_millis())
    }

    /// Key of `date` in the system's local time zone
    pub fn from_date(date: NaiveDate) -> Self {
        Self::from_date_in(date, &Local)
    }

    /// Key of the calendar day containing `instant`, in the instant's own zone
    pub fn from_datetime<Tz: TimeZone>(instant: &DateTime<Tz>) -> Self {
        Self::from_date_in(instant.date_naive(), &instant.timezone())
    }

    /// Key of the current local day
    pub fn today() -> Self {
        Self::from_datetime(&Local::now())
    }

    /// Calendar date this key falls on in the given time zone.
    ///
    /// Keys outside chrono's range (only reachable through
    /// [`DayKey::from_millis`]) map to `NaiveDate::MIN`.
    pub fn date_in<Tz: TimeZone>(self, tz: &Tz) -> NaiveDate {
        tz.timestamp_millis_opt(self.0)
            .earliest()
            .map(|instant| instant.date_naive())
            .unwrap_or(NaiveDate::MIN)
    }

    /// Calendar date in the system's local time zone
    pub fn date(self) -> NaiveDate {
        self.date_in(&Local)
    }

    /// Snap an arbitrary instant (epoch millis) to its day's midnight key
    pub fn normalize_in<Tz: TimeZone>(self, tz: &Tz) -> Self {
        Self::from_date_in(self.date_in(tz), tz)
    }

    /// Key `days` calendar days away from this one
    pub fn add_days_in<Tz: TimeZone>(self, days: i64, tz: &Tz) -> Self {
        Self::from_date_in(self.date_in(tz) + Duration::days(days), tz)
    }

    /// Signed number of calendar days from `self` to `other`
    pub fn days_until_in<Tz: TimeZone>(self, other: DayKey, tz: &Tz) -> i64 {
        (other.date_in(tz) - self.date_in(tz)).num_days()
    }
}

impl TryFrom<i64> for DayKey {
    type Error = Error;

    fn try_from(millis: i64) -> Result<Self> {
        Self::try_from_millis(millis)
    }
}

impl From<DayKey> for i64 {
    fn from(key: DayKey) -> i64 {
        key.0
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parse a `YYYY-MM-DD` date as entered on the command line
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|e| Error::InvalidDate(format!("{:?}: {} (expected YYYY-MM-DD)", input, e)))
}

/// Inclusive list of keys from `from` to `to` (in either order)
pub fn days_between_in<Tz: TimeZone>(from: DayKey, to: DayKey, tz: &Tz) -> Vec<DayKey> {
    let (lo, hi) = if from <= to { (from, to) } else { (to, from) };
    let start = lo.date_in(tz);
    let end = hi.date_in(tz);
    start
        .iter_days()
        .take_while(|date| *date <= end)
        .map(|date| DayKey::from_date_in(date, tz))
        .collect()
}
