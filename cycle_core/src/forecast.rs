//! Forecast projection.
//!
//! Projects predicted period windows, fertile windows and ovulation estimates
//! forward from the anchor run, and computes the current cycle day.
//!
//! ## Projection
//!
//! 1. **Anchor**: most recent run starting on or before today, else the last
//!    run overall. No runs means an empty forecast.
//! 2. **Next period**: anchor start + cycle length.
//! 3. **Cycles**: at least `min_cycles`, extended to cover the horizon (capped
//!    at [`MAX_HORIZON_DAYS`] past the next start). Each
//!    cycle contributes a period window, an ovulation day `luteal_phase_days`
//!    before its start, and a fertile window around that ovulation.
//! 4. **Ovulation guard**: ovulation never falls on or before the end of the
//!    preceding period window (recorded for the first cycle, predicted after).
//!
//! Everything here is pure: the same history, profile and today always yield
//! the same result.

use crate::runs::{detect_runs_in, PeriodRun};
use crate::stats::{infer_stats, LengthOverrides, DEFAULT_HISTORY_WINDOW};
use crate::{DayKey, Error, Result};
use chrono::{Duration, Local, NaiveDate, TimeZone};
use serde::Serialize;
use std::collections::BTreeSet;

/// Assumed days between ovulation and the next period's onset
pub const DEFAULT_LUTEAL_PHASE_DAYS: u32 = 17;

/// Minimum number of cycles projected ahead
pub const FORECAST_CYCLE_COUNT: u32 = 8;

/// Furthest a horizon can extend projection past the next period start
pub const MAX_HORIZON_DAYS: i64 = 3660;

/// Tunable assumptions of the projection
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ForecastPolicy {
    pub luteal_phase_days: u32,
    pub fertile_days_before: u32,
    pub fertile_days_after: u32,
    pub min_cycles: u32,
    pub history_window: usize,
    pub clamp_ovulation: bool,
}

impl Default for ForecastPolicy {
    fn default() -> Self {
        Self {
            luteal_phase_days: DEFAULT_LUTEAL_PHASE_DAYS,
            fertile_days_before: 5,
            fertile_days_after: 1,
            min_cycles: FORECAST_CYCLE_COUNT,
            history_window: DEFAULT_HISTORY_WINDOW,
            clamp_ovulation: true,
        }
    }
}

impl ForecastPolicy {
    pub fn validate(&self) -> Result<()> {
        if self.luteal_phase_days == 0 {
            return Err(Error::Config("luteal_phase_days must be at least 1".into()));
        }
        if self.min_cycles == 0 {
            return Err(Error::Config("min_cycles must be at least 1".into()));
        }
        if self.history_window == 0 {
            return Err(Error::Config("history_window must be at least 1".into()));
        }
        Ok(())
    }
}

/// Derived forecast; never persisted
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ForecastResult {
    pub predicted_period_days: BTreeSet<DayKey>,
    pub fertile_days: BTreeSet<DayKey>,
    pub ovulation_days: BTreeSet<DayKey>,
    pub next_period_start: Option<DayKey>,
    pub inferred_cycle_length: Option<u32>,
    pub inferred_period_length: Option<u32>,
    pub current_cycle_day: Option<u32>,
}

impl ForecastResult {
    /// True when there was no history to project from
    pub fn is_empty(&self) -> bool {
        self.next_period_start.is_none()
    }
}

/// Forecast engine bound to a policy and a time zone
#[derive(Clone, Debug)]
pub struct Forecaster<Tz: TimeZone = Local> {
    policy: ForecastPolicy,
    tz: Tz,
}

impl Default for Forecaster<Local> {
    fn default() -> Self {
        Self::new(ForecastPolicy::default(), Local)
    }
}

impl<Tz: TimeZone> Forecaster<Tz> {
    pub fn new(policy: ForecastPolicy, tz: Tz) -> Self {
        Self { policy, tz }
    }

    pub fn policy(&self) -> &ForecastPolicy {
        &self.policy
    }

    pub fn timezone(&self) -> &Tz {
        &self.tz
    }

    /// Compute the forecast from recorded period days.
    ///
    /// `horizon`, when later than the next predicted start, extends projection
    /// so that every cycle up to it is covered.
    pub fn compute(
        &self,
        period_days: &[DayKey],
        today: DayKey,
        overrides: LengthOverrides,
        horizon: Option<DayKey>,
    ) -> ForecastResult {
        let runs = detect_runs_in(period_days.iter().copied(), &self.tz);
        let Some(anchor) = anchor_run(&runs, today) else {
            tracing::debug!("No period history, forecast is empty");
            return ForecastResult::default();
        };

        let stats = infer_stats(&runs, overrides, self.policy.history_window, &self.tz);
        let cycle = i64::from(stats.cycle_length);
        let period = i64::from(stats.period_length);

        let anchor_end = anchor.end.date_in(&self.tz);
        let Some(next_start) = shift(anchor.start.date_in(&self.tz), cycle) else {
            tracing::warn!("Anchor run {} is out of the projectable date range", anchor.start);
            return ForecastResult::default();
        };
        let cycles = self.cycle_count(next_start, horizon, cycle);

        let mut predicted = BTreeSet::new();
        let mut fertile = BTreeSet::new();
        let mut ovulation_days = BTreeSet::new();

        for offset in 0..i64::from(cycles) {
            // Stop at the end of chrono's date range
            let Some(start) = shift(next_start, offset * cycle) else {
                break;
            };
            predicted.extend((0..period).filter_map(|i| shift(start, i)).map(|d| self.key(d)));

            let previous_period_end = if offset == 0 {
                Some(anchor_end)
            } else {
                shift(start, period - 1 - cycle)
            };
            let Some(ovulation) = previous_period_end.and_then(|end| self.ovulation(start, end)) else {
                break;
            };
            ovulation_days.insert(self.key(ovulation));

            let before = i64::from(self.policy.fertile_days_before);
            let after = i64::from(self.policy.fertile_days_after);
            fertile.extend(
                (-before..=after)
                    .filter_map(|i| shift(ovulation, i))
                    .map(|d| self.key(d)),
            );
        }

        let current_cycle_day = latest_past_run(&runs, today).map(|run| {
            let elapsed = run.start.days_until_in(today, &self.tz);
            (elapsed + 1).max(1) as u32
        });

        tracing::debug!(
            "Forecast: next period {} ({} cycles, cycle={} period={})",
            next_start,
            cycles,
            stats.cycle_length,
            stats.period_length
        );

        ForecastResult {
            predicted_period_days: predicted,
            fertile_days: fertile,
            ovulation_days,
            next_period_start: Some(self.key(next_start)),
            inferred_cycle_length: Some(stats.cycle_length),
            inferred_period_length: Some(stats.period_length),
            current_cycle_day,
        }
    }

    /// Ovulation estimate for the cycle whose period starts at `start`
    fn ovulation(&self, start: NaiveDate, previous_period_end: NaiveDate) -> Option<NaiveDate> {
        let raw = shift(start, -i64::from(self.policy.luteal_phase_days))?;
        let earliest = shift(previous_period_end, 1)?;
        if self.policy.clamp_ovulation && raw < earliest {
            Some(earliest)
        } else {
            Some(raw)
        }
    }

    fn cycle_count(&self, next_start: NaiveDate, horizon: Option<DayKey>, cycle: i64) -> u32 {
        let min = self.policy.min_cycles;
        let Some(horizon) = horizon.map(|h| h.date_in(&self.tz)) else {
            return min;
        };
        if horizon <= next_start {
            return min;
        }
        let days_ahead = (horizon - next_start).num_days().min(MAX_HORIZON_DAYS);
        let cycle = cycle.max(1);
        let needed = (days_ahead + cycle - 1) / cycle + 2;
        min.max(u32::try_from(needed).unwrap_or(u32::MAX))
    }

    fn key(&self, date: NaiveDate) -> DayKey {
        DayKey::from_date_in(date, &self.tz)
    }
}

/// `date` moved by `days`, or `None` past chrono's date range
fn shift(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    date.checked_add_signed(Duration::days(days))
}

/// Most recent run starting on or before `today`, else the last run overall
pub fn anchor_run(runs: &[PeriodRun], today: DayKey) -> Option<&PeriodRun> {
    latest_past_run(runs, today).or_else(|| runs.last())
}

fn latest_past_run(runs: &[PeriodRun], today: DayKey) -> Option<&PeriodRun> {
    runs.iter().rev().find(|run| run.start <= today)
}

/// Forecast in the local time zone with the default policy
pub fn compute_forecast(
    period_days: &[DayKey],
    today: DayKey,
    overrides: LengthOverrides,
    horizon: Option<DayKey>,
) -> ForecastResult {
    Forecaster::default().compute(period_days, today, overrides, horizon)
}
