//! Core domain types for the cycle tracker.
//!
//! This module defines the persisted records and the day-level state machine:
//! - Day events (period / pregnancy markings)
//! - The cycle profile
//! - Store changes and the full-history snapshot

use crate::{DayKey, Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

// ============================================================================
// Day State
// ============================================================================

/// State of a single calendar day. `None` is the initial state and is never
/// persisted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayState {
    #[default]
    None,
    Period,
    Pregnancy,
}

impl DayState {
    /// State of a day given its (possibly absent) record.
    ///
    /// A legacy record with both flags set reads as `Period`.
    pub fn of(event: Option<&CycleDayEvent>) -> Self {
        match event {
            Some(e) if e.is_period => DayState::Period,
            Some(e) if e.is_pregnancy => DayState::Pregnancy,
            _ => DayState::None,
        }
    }

    pub fn is_period(self) -> bool {
        self == DayState::Period
    }

    pub fn is_pregnancy(self) -> bool {
        self == DayState::Pregnancy
    }

    /// Set or clear the period flag. Setting it clears pregnancy.
    pub fn with_period(self, on: bool) -> Self {
        match (self, on) {
            (_, true) => DayState::Period,
            (DayState::Period, false) => DayState::None,
            (other, false) => other,
        }
    }

    /// Set or clear the pregnancy flag. Setting it clears period.
    pub fn with_pregnancy(self, on: bool) -> Self {
        match (self, on) {
            (_, true) => DayState::Pregnancy,
            (DayState::Pregnancy, false) => DayState::None,
            (other, false) => other,
        }
    }

    pub fn toggle_period(self) -> Self {
        self.with_period(!self.is_period())
    }

    pub fn toggle_pregnancy(self) -> Self {
        self.with_pregnancy(!self.is_pregnancy())
    }

    /// Full patch that moves any record into this state
    pub fn patch(self) -> DayEventPatch {
        DayEventPatch {
            is_period: Some(self.is_period()),
            is_pregnancy: Some(self.is_pregnancy()),
        }
    }
}

// ============================================================================
// Persisted Records
// ============================================================================

/// A recorded day. Days with both flags false are not stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleDayEvent {
    pub day: DayKey,
    pub is_period: bool,
    #[serde(default)]
    pub is_pregnancy: bool,
}

impl CycleDayEvent {
    /// Record for `day` in `state`, or `None` when nothing should be stored
    pub fn for_state(day: DayKey, state: DayState) -> Option<Self> {
        match state {
            DayState::None => None,
            _ => Some(Self {
                day,
                is_period: state.is_period(),
                is_pregnancy: state.is_pregnancy(),
            }),
        }
    }

    pub fn state(&self) -> DayState {
        DayState::of(Some(self))
    }
}

/// Partial update of a day record; `None` fields keep their stored value
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayEventPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_period: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_pregnancy: Option<bool>,
}

/// Valid user-configured cycle lengths (days)
pub const CYCLE_LENGTH_RANGE: RangeInclusive<u32> = 21..=60;

/// Valid user-configured period lengths (days)
pub const PERIOD_LENGTH_RANGE: RangeInclusive<u32> = 2..=12;

/// User-configured cycle parameters (one per dataset)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleProfile {
    pub cycle_length_days: u32,
    pub period_length_days: u32,
    pub updated_at: DateTime<Utc>,
}

impl CycleProfile {
    /// Validate and build a profile stamped with the current time
    pub fn new(cycle_length_days: u32, period_length_days: u32) -> Result<Self> {
        Self::validate(cycle_length_days, period_length_days)?;
        Ok(Self {
            cycle_length_days,
            period_length_days,
            updated_at: Utc::now(),
        })
    }

    /// Check a candidate profile without building it
    pub fn validate(cycle_length_days: u32, period_length_days: u32) -> Result<()> {
        if period_length_days > cycle_length_days {
            return Err(Error::InvalidProfile(format!(
                "period length ({} days) cannot exceed cycle length ({} days)",
                period_length_days, cycle_length_days
            )));
        }
        if !CYCLE_LENGTH_RANGE.contains(&cycle_length_days) {
            return Err(Error::InvalidProfile(format!(
                "cycle length must be between {} and {} days, got {}",
                CYCLE_LENGTH_RANGE.start(),
                CYCLE_LENGTH_RANGE.end(),
                cycle_length_days
            )));
        }
        if !PERIOD_LENGTH_RANGE.contains(&period_length_days) {
            return Err(Error::InvalidProfile(format!(
                "period length must be between {} and {} days, got {}",
                PERIOD_LENGTH_RANGE.start(),
                PERIOD_LENGTH_RANGE.end(),
                period_length_days
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Store Changes and Snapshot
// ============================================================================

/// One write issued against a store. Batches of these are applied atomically.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreChange {
    UpsertDay { day: DayKey, patch: DayEventPatch },
    DeleteDay(DayKey),
    UpsertProfile(CycleProfile),
}

/// Full dataset: every recorded day (sorted by day) plus the profile
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleSnapshot {
    #[serde(default)]
    pub profile: Option<CycleProfile>,
    #[serde(default)]
    pub events: Vec<CycleDayEvent>,
}

impl CycleSnapshot {
    /// Record for `day`, if any
    pub fn event(&self, day: DayKey) -> Option<&CycleDayEvent> {
        self.events
            .binary_search_by_key(&day, |e| e.day)
            .ok()
            .map(|idx| &self.events[idx])
    }

    /// Current state of `day`
    pub fn state(&self, day: DayKey) -> DayState {
        DayState::of(self.event(day))
    }

    /// Every day currently marked as period, ascending
    pub fn period_days(&self) -> Vec<DayKey> {
        self.events
            .iter()
            .filter(|e| e.is_period)
            .map(|e| e.day)
            .collect()
    }

    /// Restore ordering and drop duplicate / empty records from loaded data.
    /// Legacy records with both flags keep only the period flag.
    pub fn normalize(&mut self) {
        self.events.sort_by_key(|e| e.day);
        self.events.dedup_by_key(|e| e.day);
        self.events.retain(|e| e.is_period || e.is_pregnancy);
        for event in self.events.iter_mut().filter(|e| e.is_period) {
            event.is_pregnancy = false;
        }
    }

    /// Apply a batch in order. On error the snapshot may be partially
    /// modified, so callers apply to a copy and commit on success.
    pub fn apply(&mut self, changes: &[StoreChange]) -> Result<()> {
        for change in changes {
            match change {
                StoreChange::UpsertDay { day, patch } => self.upsert_day(*day, *patch)?,
                StoreChange::DeleteDay(day) => self.delete_day(*day),
                StoreChange::UpsertProfile(profile) => self.profile = Some(profile.clone()),
            }
        }
        Ok(())
    }

    fn upsert_day(&mut self, day: DayKey, patch: DayEventPatch) -> Result<()> {
        let idx = self.events.binary_search_by_key(&day, |e| e.day);
        let current = idx.ok().map(|i| self.events[i]);
        let merged = CycleDayEvent {
            day,
            is_period: patch
                .is_period
                .unwrap_or_else(|| current.is_some_and(|e| e.is_period)),
            is_pregnancy: patch
                .is_pregnancy
                .unwrap_or_else(|| current.is_some_and(|e| e.is_pregnancy)),
        };

        if merged.is_period && merged.is_pregnancy {
            return Err(Error::Store(format!(
                "day {} cannot be both period and pregnancy",
                day
            )));
        }

        match (idx, merged.is_period || merged.is_pregnancy) {
            (Ok(i), true) => self.events[i] = merged,
            (Ok(i), false) => {
                self.events.remove(i);
            }
            (Err(i), true) => self.events.insert(i, merged),
            (Err(_), false) => {}
        }
        Ok(())
    }

    fn delete_day(&mut self, day: DayKey) {
        if let Ok(i) = self.events.binary_search_by_key(&day, |e| e.day) {
            self.events.remove(i);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(n: i64) -> DayKey {
        DayKey::from_millis(n * 86_400_000)
    }

    #[test]
    fn test_state_transitions() {
        assert_eq!(DayState::None.toggle_period(), DayState::Period);
        assert_eq!(DayState::Period.toggle_period(), DayState::None);
        assert_eq!(DayState::Pregnancy.toggle_period(), DayState::Period);
        assert_eq!(DayState::Period.toggle_pregnancy(), DayState::Pregnancy);
        assert_eq!(DayState::Pregnancy.with_period(false), DayState::Pregnancy);
        assert_eq!(DayState::Period.with_pregnancy(false), DayState::Period);
    }

    #[test]
    fn test_both_flags_reads_as_period() {
        let legacy = CycleDayEvent {
            day: key(1),
            is_period: true,
            is_pregnancy: true,
        };
        assert_eq!(legacy.state(), DayState::Period);
    }

    #[test]
    fn test_profile_validation() {
        assert!(CycleProfile::new(28, 5).is_ok());

        let err = CycleProfile::new(21, 22).unwrap_err();
        assert!(matches!(err, Error::InvalidProfile(ref msg) if msg.contains("cannot exceed")));

        assert!(CycleProfile::new(20, 5).is_err());
        assert!(CycleProfile::new(61, 5).is_err());
        assert!(CycleProfile::new(30, 1).is_err());
        assert!(CycleProfile::new(30, 13).is_err());
    }

    #[test]
    fn test_snapshot_upsert_keeps_sorted_and_merges() {
        let mut snapshot = CycleSnapshot::default();
        snapshot
            .apply(&[
                StoreChange::UpsertDay {
                    day: key(5),
                    patch: DayState::Period.patch(),
                },
                StoreChange::UpsertDay {
                    day: key(2),
                    patch: DayState::Pregnancy.patch(),
                },
            ])
            .unwrap();

        let days: Vec<_> = snapshot.events.iter().map(|e| e.day).collect();
        assert_eq!(days, vec![key(2), key(5)]);

        // Partial patch keeps the other flag
        snapshot
            .apply(&[StoreChange::UpsertDay {
                day: key(2),
                patch: DayEventPatch {
                    is_period: Some(false),
                    is_pregnancy: None,
                },
            }])
            .unwrap();
        assert_eq!(snapshot.state(key(2)), DayState::Pregnancy);
    }

    #[test]
    fn test_snapshot_rejects_both_flags() {
        let mut snapshot = CycleSnapshot::default();
        let result = snapshot.apply(&[StoreChange::UpsertDay {
            day: key(3),
            patch: DayEventPatch {
                is_period: Some(true),
                is_pregnancy: Some(true),
            },
        }]);
        assert!(matches!(result, Err(Error::Store(_))));
    }

    #[test]
    fn test_snapshot_drops_cleared_days() {
        let mut snapshot = CycleSnapshot::default();
        snapshot
            .apply(&[StoreChange::UpsertDay {
                day: key(3),
                patch: DayState::Period.patch(),
            }])
            .unwrap();
        snapshot
            .apply(&[StoreChange::UpsertDay {
                day: key(3),
                patch: DayState::None.patch(),
            }])
            .unwrap();
        assert!(snapshot.events.is_empty());
    }

    #[test]
    fn test_normalize_loaded_snapshot() {
        let mut snapshot = CycleSnapshot {
            profile: None,
            events: vec![
                CycleDayEvent { day: key(4), is_period: true, is_pregnancy: false },
                CycleDayEvent { day: key(1), is_period: false, is_pregnancy: false },
                CycleDayEvent { day: key(4), is_period: true, is_pregnancy: false },
                CycleDayEvent { day: key(2), is_period: false, is_pregnancy: true },
                CycleDayEvent { day: key(7), is_period: true, is_pregnancy: true },
            ],
        };
        snapshot.normalize();
        let days: Vec<_> = snapshot.events.iter().map(|e| e.day).collect();
        assert_eq!(days, vec![key(2), key(4), key(7)]);
        assert_eq!(snapshot.period_days(), vec![key(4), key(7)]);
        assert!(snapshot.events.iter().all(|e| !(e.is_period && e.is_pregnancy)));
        assert_eq!(snapshot.state(key(7)), DayState::Period);
    }
}
