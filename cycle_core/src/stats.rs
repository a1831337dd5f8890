//! Cycle statistics inference.
//!
//! User overrides win for each field independently. Otherwise the field is the
//! rounded mean over the most recent runs, clamped to a plausible range.

use crate::runs::PeriodRun;
use crate::types::{CycleProfile, CYCLE_LENGTH_RANGE, PERIOD_LENGTH_RANGE};
use chrono::TimeZone;
use std::ops::RangeInclusive;

/// Cycle length used when fewer than two runs exist
pub const DEFAULT_CYCLE_LENGTH: u32 = 28;

/// Period length used when no runs exist
pub const DEFAULT_PERIOD_LENGTH: u32 = 5;

/// Number of most recent runs / start gaps averaged
pub const DEFAULT_HISTORY_WINDOW: usize = 6;

/// Bounds applied to a period length inferred from history
pub const INFERRED_PERIOD_LENGTH_RANGE: RangeInclusive<u32> = 3..=12;

/// Optional user-supplied lengths that take precedence over history
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LengthOverrides {
    pub cycle_length: Option<u32>,
    pub period_length: Option<u32>,
}

impl From<&CycleProfile> for LengthOverrides {
    fn from(profile: &CycleProfile) -> Self {
        Self {
            cycle_length: Some(profile.cycle_length_days),
            period_length: Some(profile.period_length_days),
        }
    }
}

impl From<Option<&CycleProfile>> for LengthOverrides {
    fn from(profile: Option<&CycleProfile>) -> Self {
        profile.map(Self::from).unwrap_or_default()
    }
}

/// Effective cycle parameters used for projection
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CycleStats {
    pub cycle_length: u32,
    pub period_length: u32,
}

/// Infer cycle and period length from runs (ordered by start ascending).
///
/// `history_window` bounds how many recent run lengths and start-to-start gaps
/// are averaged.
pub fn infer_stats<Tz: TimeZone>(
    runs: &[PeriodRun],
    overrides: LengthOverrides,
    history_window: usize,
    tz: &Tz,
) -> CycleStats {
    let cycle_length = match overrides.cycle_length {
        Some(value) => clamp(value, &CYCLE_LENGTH_RANGE),
        None => {
            let gaps: Vec<i64> = runs
                .windows(2)
                .map(|pair| pair[0].start.days_until_in(pair[1].start, tz))
                .collect();
            averaged(
                recent(&gaps, history_window),
                DEFAULT_CYCLE_LENGTH,
                &CYCLE_LENGTH_RANGE,
            )
        }
    };

    let period_length = match overrides.period_length {
        Some(value) => clamp(value, &PERIOD_LENGTH_RANGE),
        None => {
            let lengths: Vec<i64> = runs.iter().map(|r| r.length as i64).collect();
            averaged(
                recent(&lengths, history_window),
                DEFAULT_PERIOD_LENGTH,
                &INFERRED_PERIOD_LENGTH_RANGE,
            )
        }
    };

    tracing::debug!(
        "Cycle stats from {} runs: cycle={} period={} (overrides: {:?})",
        runs.len(),
        cycle_length,
        period_length,
        overrides
    );

    CycleStats {
        cycle_length,
        period_length,
    }
}

fn recent(values: &[i64], window: usize) -> &[i64] {
    &values[values.len().saturating_sub(window)..]
}

/// Rounded mean clamped into `range`, or `fallback` for no values
fn averaged(values: &[i64], fallback: u32, range: &RangeInclusive<u32>) -> u32 {
    if values.is_empty() {
        return fallback;
    }
    let mean = values.iter().sum::<i64>() as f64 / values.len() as f64;
    let rounded = mean.round().max(0.0).min(u32::MAX as f64) as u32;
    clamp(rounded, range)
}

fn clamp(value: u32, range: &RangeInclusive<u32>) -> u32 {
    value.clamp(*range.start(), *range.end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{detect_runs_in, DayKey};
    use chrono::{NaiveDate, Utc};

    fn day(n: i64) -> DayKey {
        DayKey::from_date_in(NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(), &Utc)
            .add_days_in(n, &Utc)
    }

    /// Runs of `len` days starting at each offset
    fn runs_at(starts: &[i64], len: i64) -> Vec<PeriodRun> {
        let days = starts
            .iter()
            .flat_map(|&s| (0..len).map(move |i| day(s + i)));
        detect_runs_in(days, &Utc)
    }

    fn infer(runs: &[PeriodRun], overrides: LengthOverrides) -> CycleStats {
        infer_stats(runs, overrides, DEFAULT_HISTORY_WINDOW, &Utc)
    }

    #[test]
    fn test_defaults_without_history() {
        let stats = infer(&[], LengthOverrides::default());
        assert_eq!(stats.cycle_length, 28);
        assert_eq!(stats.period_length, 5);
    }

    #[test]
    fn test_single_run_uses_default_cycle() {
        let stats = infer(&runs_at(&[0], 4), LengthOverrides::default());
        assert_eq!(stats.cycle_length, 28);
        assert_eq!(stats.period_length, 4);
    }

    #[test]
    fn test_two_runs_thirty_days_apart() {
        let stats = infer(&runs_at(&[0, 30], 5), LengthOverrides::default());
        assert_eq!(stats.cycle_length, 30);
        assert_eq!(stats.period_length, 5);
    }

    #[test]
    fn test_rounds_mean_half_up() {
        // Gaps 29 and 30 average to 29.5
        let stats = infer(&runs_at(&[0, 29, 59], 5), LengthOverrides::default());
        assert_eq!(stats.cycle_length, 30);
    }

    #[test]
    fn test_only_recent_window_is_averaged() {
        // One old 45-day gap followed by six 28-day gaps
        let starts = [0, 45, 73, 101, 129, 157, 185, 213];
        let stats = infer(&runs_at(&starts, 5), LengthOverrides::default());
        assert_eq!(stats.cycle_length, 28);
    }

    #[test]
    fn test_inferred_values_are_clamped() {
        // Two-day runs three days apart: gap 3 clamps to 21, length 2 clamps to 3
        let stats = infer(&runs_at(&[0, 3], 2), LengthOverrides::default());
        assert_eq!(stats.cycle_length, 21);
        assert_eq!(stats.period_length, 3);
    }

    #[test]
    fn test_overrides_ignore_history_and_clamp() {
        let runs = runs_at(&[0, 30], 5);
        let stats = infer(
            &runs,
            LengthOverrides {
                cycle_length: Some(90),
                period_length: Some(1),
            },
        );
        assert_eq!(stats.cycle_length, 60);
        assert_eq!(stats.period_length, 2);
    }

    #[test]
    fn test_override_applies_per_field() {
        let runs = runs_at(&[0, 30], 5);
        let stats = infer(
            &runs,
            LengthOverrides {
                cycle_length: Some(26),
                period_length: None,
            },
        );
        assert_eq!(stats.cycle_length, 26);
        assert_eq!(stats.period_length, 5);
    }
}
