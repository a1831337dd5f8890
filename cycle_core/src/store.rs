//! Cycle history persistence with file locking.
//!
//! The dataset (profile + recorded days) lives in one JSON document. Writers
//! hold an exclusive lock on a sidecar lock file for the whole
//! read-modify-write, so concurrent processes never interleave edits, and the
//! document is replaced atomically so readers never see a half-applied batch.

use crate::{CycleDayEvent, CycleProfile, CycleSnapshot, DayEventPatch, DayKey, Error, Result, StoreChange};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// File name of the dataset inside the data directory
pub const STORE_FILE: &str = "cycle.json";

/// Persistence port consumed by the tracker.
///
/// `apply` must commit a batch atomically: either every change is visible to
/// later reads or none is.
pub trait CycleStore {
    /// Full dataset with events sorted by day
    fn snapshot(&self) -> Result<CycleSnapshot>;

    /// Apply a batch of changes as one unit
    fn apply(&mut self, changes: &[StoreChange]) -> Result<()>;

    fn list_day_events(&self) -> Result<Vec<CycleDayEvent>> {
        Ok(self.snapshot()?.events)
    }

    /// Recorded days with `from <= day <= to`
    fn list_day_events_in_range(&self, from: DayKey, to: DayKey) -> Result<Vec<CycleDayEvent>> {
        Ok(self
            .list_day_events()?
            .into_iter()
            .filter(|e| from <= e.day && e.day <= to)
            .collect())
    }

    fn get_profile(&self) -> Result<Option<CycleProfile>> {
        Ok(self.snapshot()?.profile)
    }

    fn upsert_day_event(&mut self, day: DayKey, patch: DayEventPatch) -> Result<()> {
        self.apply(&[StoreChange::UpsertDay { day, patch }])
    }

    fn delete_day_event(&mut self, day: DayKey) -> Result<()> {
        self.apply(&[StoreChange::DeleteDay(day)])
    }

    fn upsert_profile(&mut self, profile: &CycleProfile) -> Result<()> {
        self.apply(&[StoreChange::UpsertProfile(profile.clone())])
    }

    /// Read the dataset, derive a batch from it, and apply the batch.
    ///
    /// Implementations that can be shared between processes override this to
    /// keep the read and the write under one lock.
    fn update<F>(&mut self, plan: F) -> Result<Vec<StoreChange>>
    where
        F: FnOnce(&CycleSnapshot) -> Result<Vec<StoreChange>>,
        Self: Sized,
    {
        let snapshot = self.snapshot()?;
        let changes = plan(&snapshot)?;
        if !changes.is_empty() {
            self.apply(&changes)?;
        }
        Ok(changes)
    }
}

/// JSON-document store with `fs2` locking
#[derive(Clone, Debug)]
pub struct FileStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl FileStore {
    /// Store backed by the document at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let lock_path = path.with_extension("lock");
        Self { path, lock_path }
    }

    /// Store at the standard location inside a data directory
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(STORE_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_lock(&self) -> Result<File> {
        if let Some(parent) = self.lock_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&self.lock_path)?;
        Ok(file)
    }

    /// Read the document; caller holds the lock
    fn read_locked(&self) -> Result<CycleSnapshot> {
        if !self.path.exists() {
            return Ok(CycleSnapshot::default());
        }

        let mut contents = String::new();
        File::open(&self.path)?.read_to_string(&mut contents)?;

        // A corrupt document is reported, never replaced: rewriting it would
        // drop the recorded history.
        let mut snapshot: CycleSnapshot = serde_json::from_str(&contents)?;
        snapshot.normalize();
        Ok(snapshot)
    }

    /// Atomically replace the document; caller holds the lock
    ///
    /// 1. Write to a temp file in the same directory
    /// 2. Sync to disk
    /// 3. Rename over the original
    fn write_locked(&self, snapshot: &CycleSnapshot) -> Result<()> {
        let parent = self.path.parent().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::Other, "store path missing parent")
        })?;
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string(snapshot)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!(
            "Saved {} day events to {:?}",
            snapshot.events.len(),
            self.path
        );
        Ok(())
    }

    fn transact<F>(&self, plan: F) -> Result<Vec<StoreChange>>
    where
        F: FnOnce(&CycleSnapshot) -> Result<Vec<StoreChange>>,
    {
        let lock = self.open_lock()?;
        lock.lock_exclusive()?;

        let result = (|| -> Result<Vec<StoreChange>> {
            let current = self.read_locked()?;
            let changes = plan(&current)?;
            if changes.is_empty() {
                return Ok(changes);
            }
            let mut next = current;
            next.apply(&changes)?;
            self.write_locked(&next)?;
            Ok(changes)
        })();

        lock.unlock()?;
        result
    }
}

impl CycleStore for FileStore {
    fn snapshot(&self) -> Result<CycleSnapshot> {
        if !self.path.exists() {
            tracing::debug!("No store file at {:?}, starting empty", self.path);
            return Ok(CycleSnapshot::default());
        }

        let lock = self.open_lock()?;
        lock.lock_shared()?;
        let result = self.read_locked();
        lock.unlock()?;

        let snapshot = result?;
        tracing::debug!(
            "Loaded {} day events from {:?}",
            snapshot.events.len(),
            self.path
        );
        Ok(snapshot)
    }

    fn apply(&mut self, changes: &[StoreChange]) -> Result<()> {
        self.transact(|_| Ok(changes.to_vec())).map(|_| ())
    }

    fn update<F>(&mut self, plan: F) -> Result<Vec<StoreChange>>
    where
        F: FnOnce(&CycleSnapshot) -> Result<Vec<StoreChange>>,
    {
        self.transact(plan)
    }
}
