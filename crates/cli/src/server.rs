//! HTTP query interface.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/ask` | Similarity search (`q`, `threshold`, `max_results`, `format`, `debug`, `show_confidence`) |
//! | `GET`  | `/chat` | Grounded chat (`q`, `threshold`, `max_context`, `model`, `show_context`) |
//! | `GET`  | `/status` | Snapshot and configuration status |
//! | `GET`  | `/debug` | Index sample plus embedding and search self-tests |
//! | `GET`  | `/` | Usage page |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "no_indexed_data", "message": "..." } }
//! ```
//!
//! Codes: `bad_request`, `invalid_parameters` (400), `no_indexed_data` (503),
//! `embedding_failed` (502), `internal` (500).

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use radar_core::config::AppConfig;
use radar_index::{ChatRequest, ChatService, QueryError, RetrievalEngine, SearchResult};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    config: Arc<AppConfig>,
    engine: RetrievalEngine,
    chat: Arc<ChatService>,
}

impl AppState {
    pub fn new(config: AppConfig, engine: RetrievalEngine, chat: ChatService) -> Self {
        Self {
            config: Arc::new(config),
            engine,
            chat: Arc::new(chat),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_home))
        .route("/ask", get(handle_ask))
        .route("/chat", get(handle_chat))
        .route("/status", get(handle_status))
        .route("/debug", get(handle_debug))
        .layer(cors)
        .with_state(state)
}

/// Serve until the process is terminated.
pub async fn run_server(state: AppState, bind: &str) -> anyhow::Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("Radar assistant listening on http://{}", bind);
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> ApiError {
    ApiError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        let status = match &err {
            QueryError::NoIndexedData => StatusCode::SERVICE_UNAVAILABLE,
            QueryError::InvalidParameters(_) => StatusCode::BAD_REQUEST,
            QueryError::Embedding(_) => StatusCode::BAD_GATEWAY,
            QueryError::Index(_) | QueryError::Prompt(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError {
            status,
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        bad_request(rejection.body_text())
    }
}

fn required_query(q: Option<String>) -> Result<String, ApiError> {
    q.filter(|q| !q.trim().is_empty())
        .ok_or_else(|| bad_request("Missing query parameter 'q'"))
}

/// Negative limits behave like zero.
fn limit(value: Option<i64>, default: usize) -> usize {
    value.map_or(default, |v| usize::try_from(v).unwrap_or(0))
}

/// Query flag: `true` in any letter case is set, every other value is unset.
fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(raw.trim().eq_ignore_ascii_case("true"))
}

// ============ GET /ask ============

#[derive(Debug, Deserialize)]
pub struct AskParams {
    q: Option<String>,
    threshold: Option<f32>,
    max_results: Option<i64>,
    format: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    debug: bool,
    #[serde(default, deserialize_with = "flag")]
    show_confidence: bool,
}

#[derive(Serialize)]
struct DetailedResult {
    text: String,
    confidence: f32,
    score: f32,
    rank: usize,
}

async fn handle_ask(
    State(state): State<AppState>,
    params: Result<Query<AskParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(params) = params?;
    let text = required_query(params.q)?;
    let retrieval = &state.config.retrieval;

    let query = radar_index::Query::new(text.clone())
        .with_threshold(params.threshold.unwrap_or(retrieval.threshold))
        .with_max_results(limit(params.max_results, retrieval.max_results))
        .with_breadth_multiplier(retrieval.ask_multiplier)
        .with_debug(params.debug);

    let outcome = state.engine.search(&query).await?;

    let mut body = match params.format.as_deref() {
        Some("detailed") => {
            let results: Vec<DetailedResult> = outcome
                .results
                .iter()
                .map(|r| DetailedResult {
                    text: r.text.clone(),
                    confidence: r.score,
                    score: r.score,
                    rank: r.rank,
                })
                .collect();
            json!({
                "query": text,
                "threshold_used": outcome.threshold,
                "total_indexed": outcome.indexed_count,
                "generation": outcome.generation,
                "results_found": results.len(),
                "best_match_confidence": outcome.best_score().unwrap_or(0.0),
                "results": results,
            })
        }
        None | Some("simple") => {
            let results: Vec<String> = if outcome.results.is_empty() {
                vec![format!(
                    "No relevant messages found above confidence threshold {}. Try lowering threshold with &threshold=0.3",
                    outcome.threshold
                )]
            } else {
                outcome
                    .results
                    .iter()
                    .map(|r| simple_line(r, params.show_confidence))
                    .collect()
            };
            json!({ "query": text, "results": results })
        }
        Some(other) => {
            return Err(bad_request(format!(
                "Unknown format '{}'; use 'simple' or 'detailed'",
                other
            )))
        }
    };

    if let Some(debug) = outcome.debug {
        body["debug"] = serde_json::to_value(debug).map_err(|e| ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "internal".to_string(),
            message: e.to_string(),
        })?;
    }

    Ok(Json(body))
}

fn simple_line(result: &SearchResult, show_confidence: bool) -> String {
    if show_confidence {
        format!("{} (confidence: {:.2})", result.text, result.score)
    } else {
        result.text.clone()
    }
}

// ============ GET /chat ============

#[derive(Debug, Deserialize)]
pub struct ChatParams {
    q: Option<String>,
    threshold: Option<f32>,
    max_context: Option<i64>,
    model: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    show_context: bool,
}

async fn handle_chat(
    State(state): State<AppState>,
    params: Result<Query<ChatParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(params) = params?;
    let text = required_query(params.q)?;
    let retrieval = &state.config.retrieval;

    let mut request = ChatRequest::new(text)
        .with_threshold(params.threshold.unwrap_or(retrieval.threshold))
        .with_max_context(limit(params.max_context, retrieval.max_context))
        .with_breadth_multiplier(retrieval.chat_multiplier);
    if let Some(model) = params.model.filter(|m| !m.trim().is_empty()) {
        request = request.with_model(model);
    }

    let answer = state.chat.chat(&request).await?;

    let context_messages: Option<Vec<&str>> = params
        .show_context
        .then(|| answer.context.iter().map(|r| r.text.as_str()).collect());

    Ok(Json(json!({
        "query": answer.query,
        "response": answer.response,
        "context_used": answer.context_used(),
        "context_messages": context_messages,
        "model": answer.model,
        "threshold_used": answer.threshold_used,
        "generation_failed": answer.generation_failed,
    })))
}

// ============ GET /status ============

#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    indexed_messages: usize,
    generation: u64,
    built_at: Option<DateTime<Utc>>,
    index_dimension: usize,
    model: String,
    similarity_method: &'static str,
    files_monitored: Vec<String>,
}

async fn handle_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let snapshot = state.engine.store().pin();
    let sources = &state.config.sources;

    Json(StatusResponse {
        status: "running",
        indexed_messages: snapshot.len(),
        generation: snapshot.generation(),
        built_at: snapshot.built_at(),
        index_dimension: snapshot.dimensions(),
        model: state.engine.embedder().model_name().to_string(),
        similarity_method: "cosine",
        files_monitored: vec![
            sources.position_reports.display().to_string(),
            sources.messages.display().to_string(),
        ],
    })
}

// ============ GET /debug ============

async fn handle_debug(State(state): State<AppState>) -> Json<Value> {
    let snapshot = state.engine.store().pin();
    let sources = &state.config.sources;
    let index_dir = state.config.index_dir();

    let sample: Vec<&str> = snapshot
        .summaries()
        .iter()
        .take(3)
        .map(|s| s.as_str())
        .collect();

    let embedding_test = match state.engine.embedder().embed("test aircraft message").await {
        Ok(vector) => json!({
            "success": true,
            "embedding_shape": vector.len(),
            "sample_values": &vector[..vector.len().min(5)],
        }),
        Err(e) => json!({ "success": false, "error": e.to_string() }),
    };

    let sample_query = radar_index::Query::new("aircraft")
        .with_threshold(-1.0)
        .with_max_results(3)
        .with_breadth_multiplier(1);
    let search_test = match state.engine.search(&sample_query).await {
        Ok(outcome) => json!({
            "success": true,
            "generation": outcome.generation,
            "scores": outcome.results.iter().map(|r| r.score).collect::<Vec<_>>(),
            "indices": outcome.results.iter().map(|r| r.position).collect::<Vec<_>>(),
            "best_score": outcome.best_score(),
        }),
        Err(QueryError::NoIndexedData) => json!({ "success": false, "reason": "no_data_indexed" }),
        Err(e) => json!({ "success": false, "error": e.to_string() }),
    };

    Json(json!({
        "index_status": {
            "total_vectors": snapshot.index().len(),
            "metadata_count": snapshot.len(),
            "index_dimension": snapshot.dimensions(),
            "index_type": "flat_inner_product",
            "generation": snapshot.generation(),
        },
        "sample_metadata": sample,
        "files_exist": {
            "position_reports": sources.position_reports.exists(),
            "messages": sources.messages.exists(),
            "index_file": index_dir.join(radar_index::persist::INDEX_FILE).exists(),
            "meta_file": index_dir.join(radar_index::persist::METADATA_FILE).exists(),
        },
        "embedding_test": embedding_test,
        "search_test": search_test,
    }))
}

// ============ GET / ============

async fn handle_home() -> Html<&'static str> {
    Html(
        r#"<h1>Radar AI Assistant (Semantic RAG + Chat)</h1>
<p>Endpoints:</p>
<ul>
    <li><code>/ask?q=your_query&amp;threshold=0.3&amp;max_results=5</code> - Search messages</li>
    <li><code>/chat?q=your_question&amp;threshold=0.3&amp;model=gemma3:4b</code> - Conversational interface</li>
    <li><code>/status</code> - Check system status</li>
    <li><code>/debug</code> - Debug index and embedding status</li>
</ul>
<p><strong>Troubleshooting:</strong></p>
<ul>
    <li>No results? Try: <code>/ask?q=aircraft&amp;threshold=0.1&amp;debug=true</code></li>
    <li>Check system: <code>/debug</code></li>
</ul>
"#,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use radar_core::AppResult;
    use radar_index::{EmbeddingAdapter, SnapshotStore};
    use radar_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
    use radar_prompt::PromptAssembler;

    struct EchoLlm;

    #[async_trait::async_trait]
    impl LlmClient for EchoLlm {
        fn provider_name(&self) -> &str {
            "echo"
        }

        async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
            Ok(LlmResponse {
                content: format!("echo: {}", request.prompt),
                model: request.model.clone(),
                usage: LlmUsage::default(),
                done: true,
            })
        }
    }

    fn state() -> AppState {
        let mut config = AppConfig::default();
        config.embedding.provider = "mock".to_string();
        config.embedding.dimensions = 64;

        let provider = radar_index::create_provider(&config.embedding).unwrap();
        let engine = RetrievalEngine::new(
            Arc::new(SnapshotStore::empty(64)),
            EmbeddingAdapter::new(provider),
        );
        let chat = ChatService::new(
            engine.clone(),
            Arc::new(EchoLlm),
            PromptAssembler::new().unwrap(),
            "gemma3:4b",
        );
        AppState::new(config, engine, chat)
    }

    fn ask_params(q: Option<&str>) -> AskParams {
        AskParams {
            q: q.map(str::to_string),
            threshold: None,
            max_results: None,
            format: None,
            debug: false,
            show_confidence: false,
        }
    }

    #[tokio::test]
    async fn test_ask_without_query_is_bad_request() {
        let err = handle_ask(State(state()), Ok(Query(ask_params(None))))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "bad_request");
    }

    #[tokio::test]
    async fn test_ask_before_first_rebuild_is_unavailable() {
        let err = handle_ask(State(state()), Ok(Query(ask_params(Some("fuel")))))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.code, "no_indexed_data");
    }

    #[tokio::test]
    async fn test_ask_negative_max_results_is_empty() {
        let mut params = ask_params(Some("fuel"));
        params.max_results = Some(-3);
        let Json(body) = handle_ask(State(state()), Ok(Query(params))).await.unwrap();
        assert_eq!(body["results"].as_array().unwrap().len(), 1);
        assert!(body["results"][0]
            .as_str()
            .unwrap()
            .starts_with("No relevant messages found"));
    }

    #[tokio::test]
    async fn test_chat_without_data_still_answers() {
        let params = ChatParams {
            q: Some("any traffic near SFO?".to_string()),
            threshold: None,
            max_context: None,
            model: None,
            show_context: true,
        };
        let Json(body) = handle_chat(State(state()), Ok(Query(params))).await.unwrap();
        assert_eq!(body["context_used"], 0);
        assert_eq!(body["model"], "gemma3:4b");
        assert_eq!(body["response"], "echo: any traffic near SFO?");
        assert_eq!(body["generation_failed"], false);
    }

    #[tokio::test]
    async fn test_status_reports_empty_snapshot() {
        let Json(status) = handle_status(State(state())).await;
        assert_eq!(status.indexed_messages, 0);
        assert_eq!(status.generation, 0);
        assert_eq!(status.index_dimension, 64);
        assert_eq!(status.similarity_method, "cosine");
    }

    #[tokio::test]
    async fn test_debug_reports_no_data() {
        let Json(body) = handle_debug(State(state())).await;
        assert_eq!(body["search_test"]["reason"], "no_data_indexed");
        assert_eq!(body["embedding_test"]["success"], true);
        assert_eq!(body["embedding_test"]["embedding_shape"], 64);
    }

    fn parse<T: serde::de::DeserializeOwned>(uri: &str) -> T {
        let uri: axum::http::Uri = uri.parse().unwrap();
        Query::<T>::try_from_uri(&uri).unwrap().0
    }

    #[test]
    fn test_flags_accept_any_case_and_ignore_other_values() {
        let params: AskParams =
            parse("http://localhost/ask?q=fuel&debug=True&show_confidence=TRUE");
        assert!(params.debug);
        assert!(params.show_confidence);

        let params: AskParams = parse("http://localhost/ask?q=fuel&debug=1&show_confidence=yes");
        assert!(!params.debug);
        assert!(!params.show_confidence);

        let params: AskParams = parse("http://localhost/ask?q=fuel");
        assert!(!params.debug);

        let params: ChatParams = parse("http://localhost/chat?q=fuel&show_context=tRuE");
        assert!(params.show_context);
        let params: ChatParams = parse("http://localhost/chat?q=fuel&show_context=0");
        assert!(!params.show_context);
    }

    #[test]
    fn test_query_error_status_mapping() {
        let err: ApiError = QueryError::InvalidParameters("bad".into()).into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        let err: ApiError =
            QueryError::Embedding(radar_index::EmbeddingFailure::new("down")).into();
        assert_eq!(err.status, StatusCode::BAD_GATEWAY);
        assert_eq!(err.code, "embedding_failed");
    }
}
