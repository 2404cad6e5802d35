//! Background rebuild loop.
//!
//! Every tick runs one full cycle:
//! `Extracting -> Embedding -> Indexing -> Persisting -> Published`.
//! A cycle that fails leaves the published snapshot alone and the next
//! tick simply tries again. Nothing in here stops the loop.

use crate::embeddings::EmbeddingAdapter;
use crate::error::CycleError;
use crate::persist::SnapshotPersistence;
use crate::snapshot::{Snapshot, SnapshotStore};
use crate::sources::SourceSet;
use crate::vector_index::FlatIndex;
use chrono::Utc;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStage {
    Extracting,
    Embedding,
    Indexing,
    Persisting,
    Published,
}

impl fmt::Display for CycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CycleStage::Extracting => "extracting",
            CycleStage::Embedding => "embedding",
            CycleStage::Indexing => "indexing",
            CycleStage::Persisting => "persisting",
            CycleStage::Published => "published",
        };
        f.write_str(name)
    }
}

/// Outcome of a cycle that published.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub generation: u64,
    pub entries: usize,
    pub dropped: usize,
    pub skipped_sources: usize,
    pub persisted: bool,
    pub duration: Duration,
}

pub struct RebuildScheduler {
    sources: SourceSet,
    embedder: EmbeddingAdapter,
    store: Arc<SnapshotStore>,
    persistence: Option<SnapshotPersistence>,
    interval: Duration,
    concurrency: usize,
}

impl RebuildScheduler {
    pub fn new(
        sources: SourceSet,
        embedder: EmbeddingAdapter,
        store: Arc<SnapshotStore>,
        interval: Duration,
    ) -> Self {
        Self {
            sources,
            embedder,
            store,
            persistence: None,
            interval,
            concurrency: 4,
        }
    }

    pub fn with_persistence(mut self, persistence: SnapshotPersistence) -> Self {
        self.persistence = Some(persistence);
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    /// Publish the persisted snapshot, if there is a usable one.
    ///
    /// Returns the generation that was published. An unreadable or
    /// mismatched pair is logged and the service starts empty.
    pub async fn bootstrap(&self) -> Option<u64> {
        let persistence = self.persistence.clone()?;
        let dimensions = self.embedder.dimensions();

        let loaded = tokio::task::spawn_blocking(move || persistence.load(dimensions)).await;
        match loaded {
            Ok(Ok(Some(snapshot))) => {
                let generation = snapshot.generation();
                info!(
                    generation,
                    entries = snapshot.len(),
                    "Loaded persisted snapshot"
                );
                self.store.publish(snapshot);
                Some(generation)
            }
            Ok(Ok(None)) => {
                debug!("No persisted snapshot, starting empty");
                None
            }
            Ok(Err(e)) => {
                warn!("Ignoring persisted snapshot: {}", e);
                None
            }
            Err(e) => {
                warn!("Snapshot load task failed: {}", e);
                None
            }
        }
    }

    /// Run one full cycle and publish its snapshot.
    pub async fn run_cycle(&self) -> Result<CycleReport, CycleError> {
        let started = Instant::now();

        debug!(stage = %CycleStage::Extracting, "Rebuild cycle");
        let extraction = self.sources.extract().await;
        if extraction.summaries.is_empty() {
            return Err(CycleError::EmptyCorpus {
                stage: CycleStage::Extracting,
            });
        }
        let skipped_sources = extraction.failures.len();

        debug!(
            stage = %CycleStage::Embedding,
            summaries = extraction.summaries.len(),
            "Rebuild cycle"
        );
        let batch = self
            .embedder
            .embed_all(extraction.summaries, self.concurrency)
            .await;
        if batch.vectors.is_empty() {
            return Err(CycleError::EmptyCorpus {
                stage: CycleStage::Embedding,
            });
        }
        let dropped = batch.dropped.len();

        debug!(stage = %CycleStage::Indexing, "Rebuild cycle");
        let index = FlatIndex::build(self.embedder.dimensions(), &batch.vectors)?;
        // Single writer: nothing else publishes between this read and ours.
        let generation = self.store.pin().generation() + 1;
        let snapshot = Arc::new(Snapshot::new(
            generation,
            Some(Utc::now()),
            index,
            batch.summaries,
        )?);

        let persisted = match &self.persistence {
            Some(persistence) => {
                debug!(stage = %CycleStage::Persisting, "Rebuild cycle");
                self.persist(persistence.clone(), Arc::clone(&snapshot)).await
            }
            None => false,
        };

        let entries = snapshot.len();
        self.store.publish(snapshot);
        debug!(stage = %CycleStage::Published, generation, "Rebuild cycle");

        Ok(CycleReport {
            generation,
            entries,
            dropped,
            skipped_sources,
            persisted,
            duration: started.elapsed(),
        })
    }

    async fn persist(&self, persistence: SnapshotPersistence, snapshot: Arc<Snapshot>) -> bool {
        let result = tokio::task::spawn_blocking(move || persistence.save(&snapshot)).await;
        match result {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!("Failed to persist snapshot: {}", e);
                false
            }
            Err(e) => {
                warn!("Snapshot persist task failed: {}", e);
                false
            }
        }
    }

    /// Cycle forever. The first cycle starts immediately.
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_secs = self.interval.as_secs_f64(),
            "Rebuild scheduler started"
        );

        loop {
            ticker.tick().await;
            match self.run_cycle().await {
                Ok(report) => info!(
                    generation = report.generation,
                    entries = report.entries,
                    dropped = report.dropped,
                    skipped_sources = report.skipped_sources,
                    persisted = report.persisted,
                    duration_ms = report.duration.as_millis() as u64,
                    "Index rebuilt"
                ),
                Err(e) => warn!("Rebuild cycle aborted, keeping current snapshot: {}", e),
            }
        }
    }

    /// Run the loop on its own task.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }
}
