//! Calendar views over recorded history and the forecast.

use crate::forecast::ForecastResult;
use crate::runs::PeriodRun;
use crate::{CycleProfile, CycleSnapshot, DayKey, DayState, Error, Result};
use chrono::{Datelike, Duration, NaiveDate, TimeZone};
use serde::Serialize;

/// Number of cells in a month grid (six Monday-first weeks)
pub const GRID_CELLS: usize = 42;

/// Dates of the Monday-first grid covering `year`-`month`, each flagged with
/// whether it belongs to that month
pub fn month_grid(year: i32, month: u32) -> Result<Vec<(NaiveDate, bool)>> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| Error::InvalidDate(format!("{}-{:02} is not a valid month", year, month)))?;
    let lead = i64::from(first.weekday().num_days_from_monday());
    let grid_start = first - Duration::days(lead);

    Ok(grid_start
        .iter_days()
        .take(GRID_CELLS)
        .map(|date| (date, date.month() == month && date.year() == year))
        .collect())
}

/// One cell of a month view
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CalendarDay {
    pub day: DayKey,
    pub date: NaiveDate,
    pub in_month: bool,
    pub state: DayState,
    /// Forecast period shading; suppressed on recorded days
    pub predicted_period: bool,
    pub fertile: bool,
    pub ovulation: bool,
}

impl CalendarDay {
    pub fn new<Tz: TimeZone>(
        date: NaiveDate,
        in_month: bool,
        snapshot: &CycleSnapshot,
        forecast: &ForecastResult,
        tz: &Tz,
    ) -> Self {
        let day = DayKey::from_date_in(date, tz);
        let state = snapshot.state(day);
        Self {
            day,
            date,
            in_month,
            state,
            predicted_period: state == DayState::None
                && forecast.predicted_period_days.contains(&day),
            fertile: forecast.fertile_days.contains(&day),
            ovulation: forecast.ovulation_days.contains(&day),
        }
    }

    /// Single-character marker used by text renderings
    pub fn marker(&self) -> char {
        match self.state {
            DayState::Period => '*',
            DayState::Pregnancy => 'P',
            DayState::None if self.predicted_period => '~',
            DayState::None if self.ovulation => 'O',
            DayState::None if self.fertile => '+',
            DayState::None => ' ',
        }
    }
}

/// Headline numbers of the cycle state
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CycleSummary {
    pub cycle_length: Option<u32>,
    pub period_length: Option<u32>,
    pub next_period_start: Option<DayKey>,
    pub current_cycle_day: Option<u32>,
    pub latest_run: Option<PeriodRun>,
    pub recorded_runs: usize,
    /// Whether lengths come from the saved profile rather than history
    pub from_profile: bool,
}

impl CycleSummary {
    pub fn new(forecast: &ForecastResult, runs: &[PeriodRun], profile: Option<&CycleProfile>) -> Self {
        Self {
            cycle_length: forecast.inferred_cycle_length,
            period_length: forecast.inferred_period_length,
            next_period_start: forecast.next_period_start,
            current_cycle_day: forecast.current_cycle_day,
            latest_run: runs.last().copied(),
            recorded_runs: runs.len(),
            from_profile: profile.is_some(),
        }
    }

    /// True when there is nothing to forecast from yet
    pub fn needs_setup(&self) -> bool {
        self.next_period_start.is_none()
    }
}
