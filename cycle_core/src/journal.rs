//! Edit journal.
//!
//! Every committed edit is appended to a JSONL (JSON Lines) file with file
//! locking. The journal is an audit trail; the store remains the source of
//! truth for day state.

use crate::{DayKey, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// File name of the journal inside the data directory
pub const JOURNAL_FILE: &str = "journal.jsonl";

/// A user-level edit as issued to the tracker
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum CycleEdit {
    ToggleDay {
        day: DayKey,
    },
    TogglePregnancyDay {
        day: DayKey,
    },
    SetPeriodDay {
        day: DayKey,
        is_period: bool,
    },
    SetPregnancyDay {
        day: DayKey,
        is_pregnancy: bool,
    },
    SetRange {
        start: DayKey,
        end: DayKey,
        is_period: bool,
    },
    SaveProfile {
        cycle_length_days: u32,
        period_length_days: u32,
        period_start: Option<DayKey>,
    },
}

/// One journal line
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EditRecord {
    pub id: Uuid,
    pub recorded_at: DateTime<Utc>,
    #[serde(flatten)]
    pub edit: CycleEdit,
    /// Number of store changes the edit produced
    pub changes: usize,
}

impl EditRecord {
    pub fn new(edit: CycleEdit, changes: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            recorded_at: Utc::now(),
            edit,
            changes,
        }
    }
}

/// Sink for committed edits
pub trait EditSink {
    fn record(&mut self, record: &EditRecord) -> Result<()>;
}

/// JSONL-based journal with file locking
pub struct JsonlJournal {
    path: PathBuf,
}

impl JsonlJournal {
    /// Create a new journal for the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Journal at the standard location inside a data directory
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(JOURNAL_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl EditSink for JsonlJournal {
    fn record(&mut self, record: &EditRecord) -> Result<()> {
        self.ensure_parent_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.lock_exclusive()?;

        let mut writer = std::io::BufWriter::new(&file);
        let line = serde_json::to_string(record)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        drop(writer);

        file.unlock()?;

        tracing::debug!("Journaled edit {} ({:?})", record.id, record.edit);
        Ok(())
    }
}

/// Read all records from a journal file, oldest first
pub fn read_journal(path: &Path) -> Result<Vec<EditRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut records = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<EditRecord>(&line) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!("Failed to parse journal entry at line {}: {}", line_num + 1, e);
            }
        }
    }

    file.unlock()?;
    tracing::debug!("Read {} journal entries", records.len());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toggle(n: i64) -> EditRecord {
        EditRecord::new(
            CycleEdit::ToggleDay {
                day: DayKey::from_millis(n * 86_400_000),
            },
            1,
        )
    }

    #[test]
    fn test_append_and_read_single_record() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("journal.jsonl");

        let record = toggle(1);
        let record_id = record.id;

        let mut journal = JsonlJournal::new(&path);
        journal.record(&record).unwrap();

        let records = read_journal(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, record_id);
        assert_eq!(records[0].edit, record.edit);
    }

    #[test]
    fn test_line_format_is_flat() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut journal = JsonlJournal::in_dir(temp_dir.path());
        journal
            .record(&EditRecord::new(
                CycleEdit::SetRange {
                    start: DayKey::from_millis(0),
                    end: DayKey::from_millis(86_400_000),
                    is_period: true,
                },
                2,
            ))
            .unwrap();

        let line = std::fs::read_to_string(journal.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(value["op"], "set_range");
        assert_eq!(value["end"], 86_400_000);
        assert_eq!(value["changes"], 2);
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("journal.jsonl");

        let mut journal = JsonlJournal::new(&path);
        journal.record(&toggle(1)).unwrap();
        {
            let mut file = OpenOptions::new().append(true).open(&path).unwrap();
            writeln!(file, "{{ not json").unwrap();
        }
        journal.record(&toggle(2)).unwrap();

        let records = read_journal(&path).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_read_missing_journal() {
        let temp_dir = tempfile::tempdir().unwrap();
        let records = read_journal(&temp_dir.path().join("nonexistent.jsonl")).unwrap();
        assert!(records.is_empty());
    }
}
