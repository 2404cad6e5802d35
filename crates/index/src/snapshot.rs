//! Immutable snapshots and the atomically swapped published reference.

use crate::error::IndexError;
use crate::types::Summary;
use crate::vector_index::FlatIndex;
use chrono::{DateTime, Utc};
use std::sync::{Arc, RwLock};

/// Vectors paired 1:1 with their summaries, plus a generation counter.
///
/// Fields are private: once built, a snapshot cannot change, and the
/// constructor is the only place the pairing is checked.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    generation: u64,
    built_at: Option<DateTime<Utc>>,
    index: FlatIndex,
    summaries: Vec<Summary>,
}

impl Snapshot {
    pub fn new(
        generation: u64,
        built_at: Option<DateTime<Utc>>,
        index: FlatIndex,
        summaries: Vec<Summary>,
    ) -> Result<Self, IndexError> {
        if index.len() != summaries.len() {
            return Err(IndexError::LengthMismatch {
                vectors: index.len(),
                summaries: summaries.len(),
            });
        }

        Ok(Self {
            generation,
            built_at,
            index,
            summaries,
        })
    }

    /// Generation 0, no entries. What the service starts with.
    pub fn empty(dimensions: usize) -> Self {
        Self {
            generation: 0,
            built_at: None,
            index: FlatIndex::empty(dimensions),
            summaries: Vec::new(),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn built_at(&self) -> Option<DateTime<Utc>> {
        self.built_at
    }

    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    pub fn summaries(&self) -> &[Summary] {
        &self.summaries
    }

    pub fn summary(&self, position: usize) -> Option<&Summary> {
        self.summaries.get(position)
    }

    pub fn dimensions(&self) -> usize {
        self.index.dimensions()
    }

    pub fn len(&self) -> usize {
        self.summaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
    }
}

/// The single shared slot between the rebuild writer and query readers.
///
/// The lock guards only the pointer swap; readers clone the `Arc` and
/// release the lock before doing any work.
#[derive(Debug)]
pub struct SnapshotStore {
    current: RwLock<Arc<Snapshot>>,
}

impl SnapshotStore {
    pub fn new(initial: Snapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
        }
    }

    pub fn empty(dimensions: usize) -> Self {
        Self::new(Snapshot::empty(dimensions))
    }

    /// Take a stable reference to the published snapshot.
    pub fn pin(&self) -> Arc<Snapshot> {
        let guard = self
            .current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    /// Replace the published snapshot in one step, returning the old one.
    pub fn publish(&self, snapshot: impl Into<Arc<Snapshot>>) -> Arc<Snapshot> {
        let next = snapshot.into();
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::replace(&mut *guard, next)
    }
}
