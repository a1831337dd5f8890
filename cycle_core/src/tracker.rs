//! Day-level mutations and forecast access.
//!
//! Each mutation plans its store changes from a snapshot read under the
//! store's update lock and commits them as a single batch, so a range edit is
//! never observed half-applied. Every day moves through the
//! `None / Period / Pregnancy` state machine of [`DayState`], which keeps the
//! two flags mutually exclusive.
//!
//! After a committed mutation the revision counter is bumped; callers holding
//! a rendered forecast compare revisions to know when to recompute.

use crate::calendar::{month_grid, CalendarDay, CycleSummary};
use crate::day::days_between_in;
use crate::forecast::{ForecastResult, Forecaster};
use crate::journal::{CycleEdit, EditRecord, EditSink};
use crate::runs::detect_runs_in;
use crate::stats::LengthOverrides;
use crate::store::CycleStore;
use crate::{CycleDayEvent, CycleProfile, CycleSnapshot, DayKey, DayState, Result, StoreChange};
use chrono::{Local, TimeZone};

/// Change moving `day` from `before` to `after`, if any
fn transition(day: DayKey, before: DayState, after: DayState) -> Option<StoreChange> {
    if before == after {
        None
    } else if after == DayState::None {
        Some(StoreChange::DeleteDay(day))
    } else {
        Some(StoreChange::UpsertDay {
            day,
            patch: after.patch(),
        })
    }
}

/// Changes that set the period flag on every day of `days`
pub fn plan_period_range(snapshot: &CycleSnapshot, days: &[DayKey], is_period: bool) -> Vec<StoreChange> {
    days.iter()
        .filter_map(|&day| {
            let before = snapshot.state(day);
            transition(day, before, before.with_period(is_period))
        })
        .collect()
}

/// Cycle tracker over a store
pub struct CycleTracker<S: CycleStore, Tz: TimeZone = Local> {
    store: S,
    forecaster: Forecaster<Tz>,
    journal: Option<Box<dyn EditSink>>,
    revision: u64,
}

impl<S: CycleStore> CycleTracker<S, Local> {
    /// Tracker in the local time zone with the default forecast policy
    pub fn new(store: S) -> Self {
        Self::with_forecaster(store, Forecaster::default())
    }
}

impl<S: CycleStore, Tz: TimeZone> CycleTracker<S, Tz> {
    pub fn with_forecaster(store: S, forecaster: Forecaster<Tz>) -> Self {
        Self {
            store,
            forecaster,
            journal: None,
            revision: 0,
        }
    }

    /// Record every committed edit to `sink`
    pub fn with_journal(mut self, sink: impl EditSink + 'static) -> Self {
        self.journal = Some(Box::new(sink));
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn forecaster(&self) -> &Forecaster<Tz> {
        &self.forecaster
    }

    /// Bumped after every committed mutation
    pub fn revision(&self) -> u64 {
        self.revision
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Flip the period flag of `day`; returns the resulting state
    pub fn toggle_day(&mut self, day: DayKey) -> Result<DayState> {
        let day = self.key(day);
        self.mutate_day(CycleEdit::ToggleDay { day }, day, DayState::toggle_period)
    }

    /// Flip the pregnancy flag of `day`; returns the resulting state
    pub fn toggle_pregnancy_day(&mut self, day: DayKey) -> Result<DayState> {
        let day = self.key(day);
        self.mutate_day(
            CycleEdit::TogglePregnancyDay { day },
            day,
            DayState::toggle_pregnancy,
        )
    }

    pub fn set_period_day(&mut self, day: DayKey, is_period: bool) -> Result<DayState> {
        let day = self.key(day);
        self.mutate_day(CycleEdit::SetPeriodDay { day, is_period }, day, |state| {
            state.with_period(is_period)
        })
    }

    pub fn set_pregnancy_day(&mut self, day: DayKey, is_pregnancy: bool) -> Result<DayState> {
        let day = self.key(day);
        self.mutate_day(
            CycleEdit::SetPregnancyDay { day, is_pregnancy },
            day,
            |state| state.with_pregnancy(is_pregnancy),
        )
    }

    /// Set the period flag on every day between `start` and `end` inclusive,
    /// in either order. Returns the number of days that changed.
    pub fn set_range(&mut self, start: DayKey, end: DayKey, is_period: bool) -> Result<usize> {
        let (start, end) = (self.key(start), self.key(end));
        let days = days_between_in(start, end, self.forecaster.timezone());
        let changes = self
            .store
            .update(|snapshot| Ok(plan_period_range(snapshot, &days, is_period)))?;

        tracing::info!(
            "Set {} days to period={} ({} changed)",
            days.len(),
            is_period,
            changes.len()
        );
        self.committed(
            CycleEdit::SetRange {
                start,
                end,
                is_period,
            },
            changes.len(),
        );
        Ok(changes.len())
    }

    /// Validate and save the cycle profile.
    ///
    /// With `period_start`, the days `[period_start, period_start + period_len - 1]`
    /// are marked as period on first setup, or whenever `period_start` is not
    /// the start of the latest recorded run. Validation happens before any
    /// write, and profile and days are committed together.
    pub fn save_profile(
        &mut self,
        cycle_length_days: u32,
        period_length_days: u32,
        period_start: Option<DayKey>,
    ) -> Result<CycleProfile> {
        let profile = CycleProfile::new(cycle_length_days, period_length_days)?;
        let period_start = period_start.map(|start| self.key(start));
        let tz = self.forecaster.timezone().clone();

        let changes = self.store.update(|snapshot| {
            let mut changes = vec![StoreChange::UpsertProfile(profile.clone())];

            if let Some(start) = period_start {
                let first_setup = snapshot.profile.is_none();
                let latest_start = detect_runs_in(snapshot.period_days(), &tz)
                    .last()
                    .map(|run| run.start);

                if first_setup || latest_start != Some(start) {
                    let end = start.add_days_in(i64::from(period_length_days) - 1, &tz);
                    let days = days_between_in(start, end, &tz);
                    changes.extend(plan_period_range(snapshot, &days, true));
                }
            }
            Ok(changes)
        })?;

        tracing::info!(
            "Saved cycle profile: cycle={} period={} ({} changes)",
            cycle_length_days,
            period_length_days,
            changes.len()
        );
        self.committed(
            CycleEdit::SaveProfile {
                cycle_length_days,
                period_length_days,
                period_start,
            },
            changes.len(),
        );
        Ok(profile)
    }

    /// Midnight key of the calendar day containing `day`
    fn key(&self, day: DayKey) -> DayKey {
        day.normalize_in(self.forecaster.timezone())
    }

    fn mutate_day<F>(&mut self, edit: CycleEdit, day: DayKey, next: F) -> Result<DayState>
    where
        F: FnOnce(DayState) -> DayState,
    {
        let mut resulting = DayState::None;
        let changes = self.store.update(|snapshot| {
            let before = snapshot.state(day);
            resulting = next(before);
            Ok(transition(day, before, resulting).into_iter().collect())
        })?;

        tracing::info!("Day {} is now {:?}", day, resulting);
        self.committed(edit, changes.len());
        Ok(resulting)
    }

    fn committed(&mut self, edit: CycleEdit, changes: usize) {
        self.revision += 1;
        tracing::debug!("Revision {}: recompute needed", self.revision);

        if let Some(journal) = self.journal.as_mut() {
            // The store has already committed; a journal failure must not
            // report the edit itself as failed.
            if let Err(e) = journal.record(&EditRecord::new(edit, changes)) {
                tracing::warn!("Failed to journal edit: {}", e);
            }
        }
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn history(&self) -> Result<Vec<CycleDayEvent>> {
        self.store.list_day_events()
    }

    pub fn profile(&self) -> Result<Option<CycleProfile>> {
        self.store.get_profile()
    }

    /// State of a single day
    pub fn day_state(&self, day: DayKey) -> Result<DayState> {
        let day = self.key(day);
        let events = self.store.list_day_events_in_range(day, day)?;
        Ok(DayState::of(events.first()))
    }

    /// Recompute the forecast from a fresh full-history read.
    ///
    /// The stored profile, if any, supplies the length overrides.
    pub fn forecast(&self, today: DayKey, horizon: Option<DayKey>) -> Result<ForecastResult> {
        let snapshot = self.store.snapshot()?;
        Ok(self.forecast_snapshot(&snapshot, today, horizon))
    }

    fn forecast_snapshot(
        &self,
        snapshot: &CycleSnapshot,
        today: DayKey,
        horizon: Option<DayKey>,
    ) -> ForecastResult {
        self.forecaster.compute(
            &snapshot.period_days(),
            today,
            LengthOverrides::from(snapshot.profile.as_ref()),
            horizon,
        )
    }

    /// Headline numbers for a status view
    pub fn summary(&self, today: DayKey) -> Result<CycleSummary> {
        let snapshot = self.store.snapshot()?;
        let forecast = self.forecast_snapshot(&snapshot, today, None);
        let runs = detect_runs_in(snapshot.period_days(), self.forecaster.timezone());
        Ok(CycleSummary::new(&forecast, &runs, snapshot.profile.as_ref()))
    }

    /// Month calendar grid with recorded and forecast marks
    pub fn month(&self, year: i32, month: u32, today: DayKey) -> Result<Vec<CalendarDay>> {
        let snapshot = self.store.snapshot()?;
        let tz = self.forecaster.timezone();
        let cells = month_grid(year, month)?;
        let horizon = cells.last().map(|&(date, _)| DayKey::from_date_in(date, tz));
        let forecast = self.forecast_snapshot(&snapshot, today, horizon);

        Ok(cells
            .into_iter()
            .map(|(date, in_month)| CalendarDay::new(date, in_month, &snapshot, &forecast, tz))
            .collect())
    }
}
