//! Embedding adapter: provider output to unit vectors.

use super::provider::EmbeddingProvider;
use crate::error::EmbeddingFailure;
use crate::types::Summary;
use futures::stream::{self, StreamExt};
use radar_core::AppResult;
use std::sync::Arc;
use tracing::{debug, warn};

/// Wraps a provider so every vector leaving it has the configured
/// dimension and unit L2 norm.
#[derive(Debug, Clone)]
pub struct EmbeddingAdapter {
    provider: Arc<dyn EmbeddingProvider>,
    dimensions: usize,
}

/// Vectors and summaries that survived a batch embed, in lockstep.
#[derive(Debug, Default)]
pub struct EmbeddedBatch {
    pub vectors: Vec<Vec<f32>>,
    pub summaries: Vec<Summary>,
    pub dropped: Vec<(Summary, EmbeddingFailure)>,
}

impl EmbeddingAdapter {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        let dimensions = provider.dimensions();
        Self {
            provider,
            dimensions,
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    /// Ask the provider whether it can serve embeddings right now.
    pub async fn verify(&self) -> AppResult<()> {
        self.provider.verify().await
    }

    /// Embed one text into a unit vector.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingFailure> {
        if text.trim().is_empty() {
            return Err(EmbeddingFailure::new("cannot embed empty text"));
        }

        let raw = self
            .provider
            .embed(text)
            .await
            .map_err(|e| EmbeddingFailure::new(e.to_string()))?;

        if raw.len() != self.dimensions {
            return Err(EmbeddingFailure::new(format!(
                "provider returned {} dimensions, expected {}",
                raw.len(),
                self.dimensions
            )));
        }

        normalize(raw)
    }

    /// Embed every summary with at most `concurrency` requests in flight.
    ///
    /// Output order follows input order. A failed item is dropped from
    /// both lists together.
    pub async fn embed_all(&self, summaries: Vec<Summary>, concurrency: usize) -> EmbeddedBatch {
        let total = summaries.len();
        let outcomes: Vec<(Summary, Result<Vec<f32>, EmbeddingFailure>)> =
            stream::iter(summaries)
                .map(|summary| async move {
                    let result = self.embed(summary.as_str()).await;
                    (summary, result)
                })
                .buffered(concurrency.max(1))
                .collect()
                .await;

        let mut batch = EmbeddedBatch::default();
        for (summary, result) in outcomes {
            match result {
                Ok(vector) => {
                    batch.vectors.push(vector);
                    batch.summaries.push(summary);
                }
                Err(failure) => {
                    warn!("Dropping summary from batch: {}", failure);
                    batch.dropped.push((summary, failure));
                }
            }
        }

        debug!(
            total,
            embedded = batch.vectors.len(),
            dropped = batch.dropped.len(),
            "Batch embedded"
        );
        batch
    }
}

/// Scale `vector` to unit length.
pub fn normalize(mut vector: Vec<f32>) -> Result<Vec<f32>, EmbeddingFailure> {
    if vector.iter().any(|x| !x.is_finite()) {
        return Err(EmbeddingFailure::new("vector contains non-finite values"));
    }

    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return Err(EmbeddingFailure::new("vector has zero norm"));
    }

    for v in &mut vector {
        *v /= norm;
    }
    Ok(vector)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::mock::MockProvider;

    fn norm(v: &[f32]) -> f32 {
        v.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    #[derive(Debug)]
    struct FixedProvider(Vec<f32>);

    #[async_trait::async_trait]
    impl EmbeddingProvider for FixedProvider {
        fn provider_name(&self) -> &str {
            "fixed"
        }
        fn model_name(&self) -> &str {
            "fixed"
        }
        fn dimensions(&self) -> usize {
            3
        }
        async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| self.0.clone()).collect())
        }
    }

    #[tokio::test]
    async fn test_verify_passes_for_local_provider() {
        let adapter = EmbeddingAdapter::new(Arc::new(MockProvider::new(16)));
        assert!(adapter.verify().await.is_ok());
    }

    #[test]
    fn test_normalize_unit_length() {
        let v = normalize(vec![3.0, 4.0]).unwrap();
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_rejects_degenerate_vectors() {
        assert!(normalize(vec![0.0, 0.0]).is_err());
        assert!(normalize(vec![f32::NAN, 1.0]).is_err());
        assert!(normalize(vec![f32::INFINITY, 1.0]).is_err());
    }

    #[tokio::test]
    async fn test_embed_returns_unit_vector() {
        let adapter = EmbeddingAdapter::new(Arc::new(MockProvider::new(128)));
        let v = adapter.embed("fuel remaining 12400").await.unwrap();
        assert_eq!(v.len(), 128);
        assert!((norm(&v) - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_embed_rejects_empty_and_wrong_dimension() {
        let adapter = EmbeddingAdapter::new(Arc::new(MockProvider::new(16)));
        assert!(adapter.embed("  ").await.is_err());

        // Declares 3 dimensions, returns 2.
        let short = EmbeddingAdapter::new(Arc::new(FixedProvider(vec![1.0, 0.0])));
        let err = short.embed("anything").await.unwrap_err();
        assert!(err.reason.contains("2 dimensions"));
    }

    #[tokio::test]
    async fn test_embed_all_drops_failures_in_lockstep() {
        let adapter = EmbeddingAdapter::new(Arc::new(MockProvider::new(64)));
        let summaries = vec![
            Summary::new("altitude report climbing"),
            // Only stop words: the mock yields a zero vector.
            Summary::new("is at on"),
            Summary::new("fuel status nominal"),
        ];

        let batch = adapter.embed_all(summaries, 2).await;
        assert_eq!(batch.vectors.len(), 2);
        assert_eq!(batch.summaries.len(), 2);
        assert_eq!(batch.summaries[0].as_str(), "altitude report climbing");
        assert_eq!(batch.summaries[1].as_str(), "fuel status nominal");
        assert_eq!(batch.dropped.len(), 1);
    }
}
