//! Ollama embedding provider.
//!
//! Calls `POST /api/embeddings` on a local Ollama instance (models like
//! `nomic-embed-text`). Ollama has no batch endpoint, so a batch is a
//! sequence of single requests. Transient failures are retried with
//! exponential backoff.

use crate::embeddings::EmbeddingProvider;
use async_trait::async_trait;
use radar_core::{AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

const EMBEDDING_ENDPOINT: &str = "/api/embeddings";

/// Maximum attempts per text
const MAX_RETRIES: u32 = 3;

/// Initial backoff duration in milliseconds
const INITIAL_BACKOFF_MS: u64 = 100;

#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
    dimensions: usize,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

/// A failed request and whether sending it again can succeed.
///
/// Transport errors and 5xx replies are transient. A 4xx reply such as
/// an unknown model, or an unreadable body, is not.
#[derive(Debug)]
struct AttemptError {
    error: AppError,
    retryable: bool,
}

impl AttemptError {
    fn transient(message: String) -> Self {
        Self {
            error: AppError::Embedding(message),
            retryable: true,
        }
    }

    fn permanent(message: String) -> Self {
        Self {
            error: AppError::Embedding(message),
            retryable: false,
        }
    }
}

/// Delay before the retry that follows failed attempt `attempt` (1-based).
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(INITIAL_BACKOFF_MS * 2_u64.pow(attempt.saturating_sub(1)))
}

impl OllamaProvider {
    /// Build the provider. No request is made until the first embedding.
    pub fn new(
        base_url: &str,
        model: &str,
        dimensions: usize,
        timeout: Duration,
    ) -> AppResult<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            AppError::Embedding(format!("Failed to create HTTP client for Ollama: {}", e))
        })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            dimensions,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check that Ollama answers and the model yields the configured dimension.
    #[instrument(skip(self), fields(model = %self.model))]
    async fn verify_connection(&self) -> AppResult<()> {
        debug!("Verifying Ollama connection at {}", self.base_url);

        let embedding = self.embed_with_retries("test connection").await.map_err(|e| {
            AppError::Embedding(format!(
                "Ollama not available at {} ({}). Ensure Ollama is running and run: ollama pull {}",
                self.base_url, e, self.model
            ))
        })?;

        if embedding.len() != self.dimensions {
            return Err(AppError::Embedding(format!(
                "Ollama model '{}' returned {} dimensions, expected {}",
                self.model,
                embedding.len(),
                self.dimensions
            )));
        }

        debug!("Ollama connection verified, model '{}' ready", self.model);
        Ok(())
    }

    async fn embed_with_retries(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut attempt = 0;

        loop {
            match self.embed_single(text).await {
                Ok(embedding) => return Ok(embedding),
                Err(AttemptError { error, retryable }) => {
                    attempt += 1;
                    if !retryable || attempt >= MAX_RETRIES {
                        return Err(error);
                    }

                    let backoff = backoff_delay(attempt);
                    warn!(
                        "Embedding failed (attempt {}/{}), retrying in {}ms: {}",
                        attempt,
                        MAX_RETRIES,
                        backoff.as_millis(),
                        error
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    #[instrument(skip(self, text), fields(text_len = text.len()))]
    async fn embed_single(&self, text: &str) -> Result<Vec<f32>, AttemptError> {
        let url = format!("{}{}", self.base_url, EMBEDDING_ENDPOINT);
        let request = EmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                AttemptError::transient(format!("Failed to send request to Ollama: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            let message = serde_json::from_str::<ErrorResponse>(&error_text)
                .map(|body| body.error)
                .unwrap_or(error_text);

            let message = format!("Ollama API error ({}): {}", status, message);
            return Err(if status.is_server_error() {
                AttemptError::transient(message)
            } else {
                AttemptError::permanent(message)
            });
        }

        let body: EmbeddingResponse = response.json().await.map_err(|e| {
            AttemptError::permanent(format!("Failed to parse Ollama response: {}", e))
        })?;

        Ok(body.embedding)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn verify(&self) -> AppResult<()> {
        self.verify_connection().await
    }

    #[instrument(skip(self, text), fields(text_len = text.len(), provider = "ollama", model = %self.model))]
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(AppError::Embedding("Cannot embed empty text".to_string()));
        }

        self.embed_with_retries(text).await
    }

    #[instrument(skip(self, texts), fields(batch_size = texts.len(), provider = "ollama", model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// Answer every request with the same status line and JSON body.
    /// Returns the base URL and a counter of requests served.
    async fn fixed_reply_server(
        status: &'static str,
        body: &'static str,
    ) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                read_request(&mut socket).await;
                counter.fetch_add(1, Ordering::SeqCst);
                let reply = format!(
                    "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(reply.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{}", addr), hits)
    }

    /// Read headers and a `content-length` body off the socket.
    async fn read_request(socket: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap_or(0);
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    return;
                }
            }
        }
    }

    fn provider_at(base_url: &str, dimensions: usize) -> OllamaProvider {
        OllamaProvider::new(
            base_url,
            "nomic-embed-text",
            dimensions,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn unreachable_provider() -> OllamaProvider {
        // Port 9 (discard) is closed on test machines.
        OllamaProvider::new(
            "http://127.0.0.1:9/",
            "nomic-embed-text",
            768,
            Duration::from_secs(2),
        )
        .unwrap()
    }

    #[test]
    fn test_base_url_is_trimmed() {
        let provider = unreachable_provider();
        assert_eq!(provider.base_url(), "http://127.0.0.1:9");
        assert_eq!(provider.dimensions(), 768);
        assert_eq!(provider.model_name(), "nomic-embed-text");
    }

    #[tokio::test]
    async fn test_empty_text_is_rejected_without_request() {
        let provider = unreachable_provider();
        let err = provider.embed("   ").await.unwrap_err();
        assert!(err.to_string().contains("empty text"));
    }

    #[tokio::test]
    async fn test_unreachable_server_reports_embedding_error() {
        let provider = unreachable_provider();
        let err = provider.embed("fuel status").await.unwrap_err();
        assert!(matches!(err, AppError::Embedding(_)));

        let err = provider.verify().await.unwrap_err();
        assert!(err.to_string().contains("ollama pull nomic-embed-text"));
    }

    #[test]
    fn test_backoff_starts_at_initial_delay() {
        assert_eq!(backoff_delay(1), Duration::from_millis(INITIAL_BACKOFF_MS));
        assert_eq!(backoff_delay(2), Duration::from_millis(INITIAL_BACKOFF_MS * 2));
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let (url, hits) = fixed_reply_server(
            "404 Not Found",
            r#"{"error":"model \"nomic-embed-text\" not found"}"#,
        )
        .await;
        let provider = provider_at(&url, 3);

        let err = provider.embed("fuel status").await.unwrap_err();
        assert!(err.to_string().contains("not found"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_server_error_is_retried_up_to_limit() {
        let (url, hits) =
            fixed_reply_server("500 Internal Server Error", r#"{"error":"busy"}"#).await;
        let provider = provider_at(&url, 3);

        let err = provider.embed("fuel status").await.unwrap_err();
        assert!(err.to_string().contains("busy"));
        assert_eq!(hits.load(Ordering::SeqCst), MAX_RETRIES as usize);
    }

    #[tokio::test]
    async fn test_verify_checks_returned_dimension() {
        let (url, _) = fixed_reply_server("200 OK", r#"{"embedding":[0.1,0.2,0.3]}"#).await;

        assert!(provider_at(&url, 3).verify().await.is_ok());

        let err = provider_at(&url, 768).verify().await.unwrap_err();
        assert!(err.to_string().contains("returned 3 dimensions, expected 768"));
    }
}
