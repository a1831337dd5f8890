//! Period run detection.
//!
//! A run is a maximal sequence of consecutive period days. Runs are the unit
//! that cycle statistics and the forecast are built from.

use crate::DayKey;
use chrono::{Local, NaiveDate, TimeZone};
use serde::Serialize;
use std::collections::BTreeSet;

/// A maximal contiguous sequence of period days
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PeriodRun {
    pub start: DayKey,
    pub end: DayKey,
    pub length: u32,
}

impl PeriodRun {
    pub fn contains(&self, day: DayKey) -> bool {
        self.start <= day && day <= self.end
    }
}

/// Group period days into runs, ordered by start ascending.
///
/// Input may be unsorted and contain duplicates. A new run starts whenever the
/// gap to the previous included day exceeds one calendar day.
pub fn detect_runs_in<Tz, I>(days: I, tz: &Tz) -> Vec<PeriodRun>
where
    Tz: TimeZone,
    I: IntoIterator<Item = DayKey>,
{
    let dates: BTreeSet<NaiveDate> = days.into_iter().map(|d| d.date_in(tz)).collect();

    date_runs(&dates)
        .into_iter()
        .map(|(start, end)| PeriodRun {
            start: DayKey::from_date_in(start, tz),
            end: DayKey::from_date_in(end, tz),
            length: ((end - start).num_days() + 1) as u32,
        })
        .collect()
}

/// [`detect_runs_in`] for the system's local time zone
pub fn detect_runs<I>(days: I) -> Vec<PeriodRun>
where
    I: IntoIterator<Item = DayKey>,
{
    detect_runs_in(days, &Local)
}

/// Runs as inclusive `(start, end)` date pairs over an ordered, deduplicated set
fn date_runs(dates: &BTreeSet<NaiveDate>) -> Vec<(NaiveDate, NaiveDate)> {
    let mut runs: Vec<(NaiveDate, NaiveDate)> = Vec::new();

    for &date in dates {
        match runs.last_mut() {
            Some((_, end)) if (date - *end).num_days() <= 1 => *end = date,
            _ => runs.push((date, date)),
        }
    }

    runs
}
