#![forbid(unsafe_code)]

//! Core domain model and forecasting engine for the cycle tracker.
//!
//! This crate provides:
//! - Day-key normalization (the integer identity of a calendar day)
//! - Period run detection and cycle statistics inference
//! - Forecasting of period, fertile and ovulation windows
//! - Day-level mutations with period/pregnancy exclusivity
//! - Persistence (file store, edit journal, CSV export)

pub mod types;
pub mod error;
pub mod day;
pub mod config;
pub mod logging;
pub mod runs;
pub mod stats;
pub mod forecast;
pub mod store;
pub mod memory;
pub mod journal;
pub mod export;
pub mod tracker;
pub mod calendar;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use day::{parse_date, DayKey};
pub use config::Config;
pub use runs::{detect_runs, detect_runs_in, PeriodRun};
pub use stats::{infer_stats, CycleStats, LengthOverrides};
pub use forecast::{compute_forecast, ForecastPolicy, ForecastResult, Forecaster};
pub use store::{CycleStore, FileStore};
pub use memory::MemoryStore;
pub use journal::{read_journal, CycleEdit, EditRecord, EditSink, JsonlJournal};
pub use tracker::CycleTracker;
pub use calendar::{month_grid, CalendarDay, CycleSummary};
pub use export::export_csv;
