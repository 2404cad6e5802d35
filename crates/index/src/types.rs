//! Value types shared by the index engine.

use radar_prompt::ContextSnippet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One human-readable line derived from a telemetry record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Summary(String);

impl Summary {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Summary {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for Summary {
    fn from(text: String) -> Self {
        Self(text)
    }
}

/// Default inclusive similarity floor.
pub const DEFAULT_THRESHOLD: f32 = 0.3;

/// Default number of results returned.
pub const DEFAULT_MAX_RESULTS: usize = 5;

/// Default candidate headroom for `/ask`-style searches.
pub const DEFAULT_BREADTH_MULTIPLIER: usize = 3;

/// Query text plus retrieval parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub text: String,
    pub threshold: f32,
    pub max_results: usize,
    pub breadth_multiplier: usize,
    pub debug: bool,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            threshold: DEFAULT_THRESHOLD,
            max_results: DEFAULT_MAX_RESULTS,
            breadth_multiplier: DEFAULT_BREADTH_MULTIPLIER,
            debug: false,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_breadth_multiplier(mut self, multiplier: usize) -> Self {
        self.breadth_multiplier = multiplier;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

/// A ranked hit against the pinned snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub text: String,
    /// Cosine similarity in [-1, 1].
    pub score: f32,
    /// 1-based rank after filtering.
    pub rank: usize,
    /// Position of the summary inside the snapshot it came from.
    pub position: usize,
}

impl ContextSnippet for SearchResult {
    fn snippet_text(&self) -> &str {
        &self.text
    }
}

/// Everything a search returns besides the results themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub results: Vec<SearchResult>,
    /// Generation of the snapshot the search ran against.
    pub generation: u64,
    pub indexed_count: usize,
    pub threshold: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugInfo>,
}

impl SearchOutcome {
    pub fn best_score(&self) -> Option<f32> {
        self.results.first().map(|r| r.score)
    }
}

/// Number of raw scores kept in the debug block.
pub const DEBUG_RAW_LIMIT: usize = 5;

/// Number of best unfiltered candidates shown when nothing passes.
pub const DEBUG_UNFILTERED_LIMIT: usize = 3;

/// Pre-filter diagnostics. Never used for ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugInfo {
    pub search_k: usize,
    pub raw_scores: Vec<f32>,
    pub raw_indices: Vec<usize>,
    pub threshold: f32,
    pub indexed_count: usize,
    pub generation: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_unfiltered: Option<Vec<UnfilteredCandidate>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnfilteredCandidate {
    pub text: String,
    pub score: f32,
}

/// Shortens `text` to at most `max_chars` characters, appending "..." when cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}
