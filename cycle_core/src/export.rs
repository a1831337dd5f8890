//! CSV export of recorded days.
//!
//! The export is written to a temp file, synced, and renamed into place so a
//! crash never leaves a truncated CSV behind.

use crate::{CycleDayEvent, Error, Result};
use chrono::TimeZone;
use std::path::Path;
use tempfile::NamedTempFile;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow {
    date: String,
    day_key: i64,
    is_period: bool,
    is_pregnancy: bool,
}

impl CsvRow {
    fn new<Tz: TimeZone>(event: &CycleDayEvent, tz: &Tz) -> Self {
        CsvRow {
            date: event.day.date_in(tz).format("%Y-%m-%d").to_string(),
            day_key: event.day.millis(),
            is_period: event.is_period,
            is_pregnancy: event.is_pregnancy,
        }
    }
}

/// Write every recorded day to `csv_path`, replacing any previous export.
///
/// Returns the number of rows written.
pub fn export_csv<Tz: TimeZone>(events: &[CycleDayEvent], csv_path: &Path, tz: &Tz) -> Result<usize> {
    let parent = match csv_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let temp = NamedTempFile::new_in(parent)?;
    {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(true)
            .from_writer(temp.as_file());

        for event in events {
            writer.serialize(CsvRow::new(event, tz))?;
        }
        writer.flush()?;
    }
    temp.as_file().sync_all()?;
    temp.persist(csv_path).map_err(|e| Error::Io(e.error))?;

    tracing::info!("Exported {} days to {:?}", events.len(), csv_path);
    Ok(events.len())
}
