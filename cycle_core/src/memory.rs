//! In-memory store.
//!
//! Used by tests and by callers embedding the tracker without a data
//! directory. Batches are applied to a copy and committed only on success.

use crate::store::CycleStore;
use crate::{CycleSnapshot, Result, StoreChange};
use std::io;

/// Volatile [`CycleStore`] with optional failure injection
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    snapshot: CycleSnapshot,
    fail_next_write: Option<io::ErrorKind>,
    write_count: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `snapshot`
    pub fn with_snapshot(mut snapshot: CycleSnapshot) -> Self {
        snapshot.normalize();
        Self {
            snapshot,
            ..Self::default()
        }
    }

    /// Make the next `apply` fail with an I/O error of `kind`
    pub fn fail_next_write(&mut self, kind: io::ErrorKind) {
        self.fail_next_write = Some(kind);
    }

    /// Number of successfully committed batches
    pub fn write_count(&self) -> usize {
        self.write_count
    }
}

impl CycleStore for MemoryStore {
    fn snapshot(&self) -> Result<CycleSnapshot> {
        Ok(self.snapshot.clone())
    }

    fn apply(&mut self, changes: &[StoreChange]) -> Result<()> {
        if let Some(kind) = self.fail_next_write.take() {
            return Err(io::Error::new(kind, "injected write failure").into());
        }

        let mut next = self.snapshot.clone();
        next.apply(changes)?;
        self.snapshot = next;
        self.write_count += 1;
        Ok(())
    }
}
