//! Retrieval engine: threshold-filtered similarity search.

use crate::embeddings::EmbeddingAdapter;
use crate::error::QueryError;
use crate::snapshot::{Snapshot, SnapshotStore};
use crate::types::{
    preview, DebugInfo, Query, SearchOutcome, SearchResult, UnfilteredCandidate, DEBUG_RAW_LIMIT,
    DEBUG_UNFILTERED_LIMIT,
};
use crate::vector_index::Hit;
use std::sync::Arc;
use tracing::debug;

const PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone)]
pub struct RetrievalEngine {
    store: Arc<SnapshotStore>,
    embedder: EmbeddingAdapter,
}

impl RetrievalEngine {
    pub fn new(store: Arc<SnapshotStore>, embedder: EmbeddingAdapter) -> Self {
        Self { store, embedder }
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    pub fn embedder(&self) -> &EmbeddingAdapter {
        &self.embedder
    }

    /// Search the snapshot that is published when the call starts.
    ///
    /// A rebuild that publishes mid-call has no effect on this call: every
    /// position is resolved against the same pinned snapshot.
    pub async fn search(&self, query: &Query) -> Result<SearchOutcome, QueryError> {
        validate(query)?;

        let snapshot = self.store.pin();

        if query.max_results == 0 {
            return Ok(empty_outcome(&snapshot, query));
        }

        if snapshot.is_empty() {
            return Err(QueryError::NoIndexedData);
        }

        let query_vector = self.embedder.embed(&query.text).await?;

        let search_k = query
            .max_results
            .saturating_mul(query.breadth_multiplier)
            .min(snapshot.len());
        let hits = snapshot.index().search(&query_vector, search_k)?;

        let results: Vec<SearchResult> = hits
            .iter()
            .filter(|hit| hit.score >= query.threshold)
            .take(query.max_results)
            .enumerate()
            .filter_map(|(i, hit)| {
                snapshot.summary(hit.position).map(|summary| SearchResult {
                    text: summary.to_string(),
                    score: hit.score,
                    rank: i + 1,
                    position: hit.position,
                })
            })
            .collect();

        debug!(
            generation = snapshot.generation(),
            search_k,
            candidates = hits.len(),
            results = results.len(),
            threshold = query.threshold,
            "Search complete"
        );

        let debug = query
            .debug
            .then(|| debug_info(&snapshot, query, search_k, &hits, results.is_empty()));

        Ok(SearchOutcome {
            results,
            generation: snapshot.generation(),
            indexed_count: snapshot.len(),
            threshold: query.threshold,
            debug,
        })
    }
}

fn validate(query: &Query) -> Result<(), QueryError> {
    if query.text.trim().is_empty() {
        return Err(QueryError::InvalidParameters(
            "query text must not be empty".to_string(),
        ));
    }
    if !query.threshold.is_finite() {
        return Err(QueryError::InvalidParameters(format!(
            "threshold must be a finite number, got {}",
            query.threshold
        )));
    }
    if query.breadth_multiplier == 0 {
        return Err(QueryError::InvalidParameters(
            "breadth multiplier must be at least 1".to_string(),
        ));
    }
    Ok(())
}

fn empty_outcome(snapshot: &Snapshot, query: &Query) -> SearchOutcome {
    SearchOutcome {
        results: Vec::new(),
        generation: snapshot.generation(),
        indexed_count: snapshot.len(),
        threshold: query.threshold,
        debug: None,
    }
}

fn debug_info(
    snapshot: &Snapshot,
    query: &Query,
    search_k: usize,
    hits: &[Hit],
    filtered_empty: bool,
) -> DebugInfo {
    let raw = hits.iter().take(DEBUG_RAW_LIMIT);

    let best_unfiltered = filtered_empty.then(|| {
        hits.iter()
            .take(DEBUG_UNFILTERED_LIMIT)
            .filter_map(|hit| {
                snapshot.summary(hit.position).map(|summary| UnfilteredCandidate {
                    text: preview(summary.as_str(), PREVIEW_CHARS),
                    score: hit.score,
                })
            })
            .collect()
    });

    DebugInfo {
        search_k,
        raw_scores: raw.clone().map(|hit| hit.score).collect(),
        raw_indices: raw.map(|hit| hit.position).collect(),
        threshold: query.threshold,
        indexed_count: snapshot.len(),
        generation: snapshot.generation(),
        best_unfiltered,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::mock::MockProvider;

    fn engine() -> RetrievalEngine {
        let store = Arc::new(SnapshotStore::empty(64));
        let adapter = EmbeddingAdapter::new(Arc::new(MockProvider::new(64)));
        RetrievalEngine::new(store, adapter)
    }

    #[tokio::test]
    async fn test_rejects_invalid_parameters() {
        let engine = engine();

        let err = engine.search(&Query::new("  ")).await.unwrap_err();
        assert!(matches!(err, QueryError::InvalidParameters(_)));

        let err = engine
            .search(&Query::new("fuel").with_threshold(f32::NAN))
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::InvalidParameters(_)));

        let err = engine
            .search(&Query::new("fuel").with_breadth_multiplier(0))
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::InvalidParameters(_)));
    }

    #[tokio::test]
    async fn test_empty_snapshot_reports_no_indexed_data() {
        let err = engine().search(&Query::new("fuel")).await.unwrap_err();
        assert!(matches!(err, QueryError::NoIndexedData));
    }

    #[tokio::test]
    async fn test_zero_max_results_is_empty_not_an_error() {
        let outcome = engine()
            .search(&Query::new("fuel").with_max_results(0))
            .await
            .unwrap();
        assert!(outcome.results.is_empty());
    }
}
