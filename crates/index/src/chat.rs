//! Chat: retrieve context, assemble the prompt, call the generation model.

use crate::error::QueryError;
use crate::retrieval::RetrievalEngine;
use crate::types::{Query, SearchResult, DEFAULT_THRESHOLD};
use radar_llm::{LlmClient, LlmRequest, SamplingParams};
use radar_prompt::{PromptAssembler, PromptMode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Default number of context lines handed to the model.
pub const DEFAULT_MAX_CONTEXT: usize = 3;

/// Default candidate headroom for chat retrieval.
pub const DEFAULT_CHAT_MULTIPLIER: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub query: String,
    pub threshold: f32,
    pub max_context: usize,
    /// Generation model; the service default when `None`.
    pub model: Option<String>,
    pub breadth_multiplier: usize,
}

impl ChatRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            threshold: DEFAULT_THRESHOLD,
            max_context: DEFAULT_MAX_CONTEXT,
            model: None,
            breadth_multiplier: DEFAULT_CHAT_MULTIPLIER,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_max_context(mut self, max_context: usize) -> Self {
        self.max_context = max_context;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_breadth_multiplier(mut self, multiplier: usize) -> Self {
        self.breadth_multiplier = multiplier;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatAnswer {
    pub query: String,
    pub response: String,
    /// Context lines that went into the prompt, in rank order.
    pub context: Vec<SearchResult>,
    pub model: String,
    pub threshold_used: f32,
    /// True when `response` carries a generation error instead of an answer.
    pub generation_failed: bool,
    pub prompt_mode: PromptMode,
}

impl ChatAnswer {
    pub fn context_used(&self) -> usize {
        self.context.len()
    }
}

pub struct ChatService {
    engine: RetrievalEngine,
    llm: Arc<dyn LlmClient>,
    assembler: PromptAssembler,
    default_model: String,
    sampling: SamplingParams,
}

impl ChatService {
    pub fn new(
        engine: RetrievalEngine,
        llm: Arc<dyn LlmClient>,
        assembler: PromptAssembler,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            llm,
            assembler,
            default_model: default_model.into(),
            sampling: SamplingParams::default(),
        }
    }

    pub fn with_sampling(mut self, sampling: SamplingParams) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn engine(&self) -> &RetrievalEngine {
        &self.engine
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Answer `request` from whatever the published snapshot holds.
    ///
    /// No indexed data means an empty context, not an error. A failed
    /// generation call is reported inside the answer.
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatAnswer, QueryError> {
        let query = Query::new(request.query.clone())
            .with_threshold(request.threshold)
            .with_max_results(request.max_context)
            .with_breadth_multiplier(request.breadth_multiplier);

        let context = match self.engine.search(&query).await {
            Ok(outcome) => outcome.results,
            Err(QueryError::NoIndexedData) => {
                debug!("No indexed data, answering without context");
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        let prompt = self
            .assembler
            .assemble(&request.query, &context)
            .map_err(|e| QueryError::Prompt(e.to_string()))?;

        let model = request
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone());

        let llm_request = LlmRequest::new(prompt.user.clone(), model.clone())
            .with_system(prompt.system.clone())
            .with_sampling(&self.sampling);

        let (response, generation_failed) = match self.llm.complete(&llm_request).await {
            Ok(reply) => (reply.content, false),
            Err(e) => {
                warn!(model = %model, "Generation failed: {}", e);
                (format!("Chat model error: {}", e), true)
            }
        };

        Ok(ChatAnswer {
            query: request.query.clone(),
            response,
            context,
            model,
            threshold_used: request.threshold,
            generation_failed,
            prompt_mode: prompt.metadata.mode,
        })
    }
}
