//! Semantic index engine over aviation telemetry.
//!
//! Summaries are extracted from two telemetry files, embedded, and held in
//! an immutable [`Snapshot`] that a background [`RebuildScheduler`]
//! replaces on a fixed interval. Queries pin whichever snapshot is
//! published when they start and never observe a rebuild half-way.

pub mod chat;
pub mod embeddings;
pub mod error;
pub mod persist;
pub mod retrieval;
pub mod scheduler;
pub mod snapshot;
pub mod sources;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

pub use chat::{ChatAnswer, ChatRequest, ChatService};
pub use embeddings::{create_provider, EmbeddingAdapter, EmbeddingProvider};
pub use error::{CycleError, EmbeddingFailure, IndexError, PersistError, QueryError, SourceError};
pub use persist::SnapshotPersistence;
pub use retrieval::RetrievalEngine;
pub use scheduler::{CycleReport, CycleStage, RebuildScheduler};
pub use snapshot::{Snapshot, SnapshotStore};
pub use sources::SourceSet;
pub use types::{DebugInfo, Query, SearchOutcome, SearchResult, Summary};

use radar_core::{AppConfig, AppResult};
use std::sync::Arc;

/// Everything a running service needs, wired from one configuration.
pub struct IndexServices {
    pub store: Arc<SnapshotStore>,
    pub scheduler: Arc<RebuildScheduler>,
    pub engine: RetrievalEngine,
    pub persistence: SnapshotPersistence,
}

impl IndexServices {
    /// Build the services with an empty published snapshot.
    ///
    /// Call [`RebuildScheduler::bootstrap`] to publish a persisted one.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let provider = create_provider(&config.embedding)?;
        let embedder = EmbeddingAdapter::new(provider);

        tracing::debug!(
            "Embedding provider '{}' (model: {}, dimensions: {})",
            embedder.provider().provider_name(),
            embedder.model_name(),
            embedder.dimensions()
        );

        let store = Arc::new(SnapshotStore::empty(embedder.dimensions()));
        let persistence = SnapshotPersistence::new(config.index_dir());

        let scheduler = RebuildScheduler::new(
            SourceSet::from_config(&config.sources),
            embedder.clone(),
            Arc::clone(&store),
            config.rebuild.interval(),
        )
        .with_persistence(persistence.clone())
        .with_concurrency(config.embedding.concurrency);

        Ok(Self {
            engine: RetrievalEngine::new(Arc::clone(&store), embedder),
            scheduler: Arc::new(scheduler),
            store,
            persistence,
        })
    }
}
