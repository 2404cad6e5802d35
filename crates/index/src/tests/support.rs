//! Deterministic doubles shared by the scenario tests.

use crate::embeddings::{EmbeddingAdapter, EmbeddingProvider};
use crate::scheduler::RebuildScheduler;
use crate::snapshot::SnapshotStore;
use crate::sources::SourceSet;
use radar_core::{AppError, AppResult};
use radar_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

pub const KEYWORDS: &[&str] = &["ads-b", "acars", "fuel", "altitude", "gate", "weather"];

/// Embeds text as keyword counts plus a constant bias dimension.
///
/// Texts containing `fail_marker` fail, which lets tests drop chosen items.
#[derive(Debug, Default)]
pub struct KeywordProvider {
    pub fail_marker: Option<String>,
}

impl KeywordProvider {
    pub fn failing_on(marker: &str) -> Self {
        Self {
            fail_marker: Some(marker.to_string()),
        }
    }

    pub fn vector(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        let mut v: Vec<f32> = KEYWORDS
            .iter()
            .map(|k| lower.matches(k).count() as f32)
            .collect();
        v.push(0.1);
        v
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for KeywordProvider {
    fn provider_name(&self) -> &str {
        "keyword"
    }

    fn model_name(&self) -> &str {
        "keyword-test"
    }

    fn dimensions(&self) -> usize {
        KEYWORDS.len() + 1
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        texts
            .iter()
            .map(|text| match &self.fail_marker {
                Some(marker) if text.contains(marker.as_str()) => {
                    Err(AppError::Embedding(format!("refused: {}", text)))
                }
                _ => Ok(Self::vector(text)),
            })
            .collect()
    }
}

/// Holds the embedding of `gate_text` until `release` is notified.
#[derive(Debug)]
pub struct GatedProvider {
    pub gate_text: String,
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

#[async_trait::async_trait]
impl EmbeddingProvider for GatedProvider {
    fn provider_name(&self) -> &str {
        "gated"
    }

    fn model_name(&self) -> &str {
        "keyword-test"
    }

    fn dimensions(&self) -> usize {
        KEYWORDS.len() + 1
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.iter().any(|t| t == &self.gate_text) {
            self.entered.notify_one();
            self.release.notified().await;
        }
        Ok(texts.iter().map(|t| KeywordProvider::vector(t)).collect())
    }
}

pub fn keyword_adapter() -> EmbeddingAdapter {
    EmbeddingAdapter::new(Arc::new(KeywordProvider::default()))
}

pub fn write_position_reports(dir: &Path, flights: &[&str]) -> PathBuf {
    let aircraft: Vec<serde_json::Value> = flights
        .iter()
        .enumerate()
        .map(|(i, flight)| {
            serde_json::json!({
                "flight": flight,
                "hex": format!("a0000{}", i),
                "alt_baro": 30000 + i * 1000,
                "gs": 420,
                "lat": 37.5,
                "lon": -122.1
            })
        })
        .collect();

    let path = dir.join("aircraft.json");
    std::fs::write(&path, serde_json::json!({ "aircraft": aircraft }).to_string()).unwrap();
    path
}

pub fn write_messages(dir: &Path, messages: &[(&str, &str)]) -> PathBuf {
    let entries: Vec<serde_json::Value> = messages
        .iter()
        .map(|(flight, text)| {
            serde_json::json!({ "vdl2": { "acars": { "flight": flight, "msg_text": text } } })
        })
        .collect();

    let path = dir.join("vdl2.json");
    std::fs::write(&path, serde_json::Value::Array(entries).to_string()).unwrap();
    path
}

pub fn scheduler(
    sources: SourceSet,
    adapter: EmbeddingAdapter,
    store: Arc<SnapshotStore>,
) -> RebuildScheduler {
    RebuildScheduler::new(sources, adapter, store, Duration::from_millis(50)).with_concurrency(2)
}

/// Replies with fixed text and remembers the last request.
#[derive(Default)]
pub struct ScriptedLlm {
    pub reply: String,
    pub last_request: Mutex<Option<LlmRequest>>,
}

impl ScriptedLlm {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            last_request: Mutex::new(None),
        }
    }

    pub fn last(&self) -> Option<LlmRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl LlmClient for ScriptedLlm {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        *self.last_request.lock().unwrap() = Some(request.clone());
        Ok(LlmResponse {
            content: self.reply.clone(),
            model: request.model.clone(),
            usage: LlmUsage::new(10, 5),
            done: true,
        })
    }
}

pub struct FailingLlm;

#[async_trait::async_trait]
impl LlmClient for FailingLlm {
    fn provider_name(&self) -> &str {
        "failing"
    }

    async fn complete(&self, _request: &LlmRequest) -> AppResult<LlmResponse> {
        Err(AppError::Llm("model 'gemma3:4b' not found".to_string()))
    }
}
