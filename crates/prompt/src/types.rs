//! Prompt types.

use serde::{Deserialize, Serialize};

/// Anything that can contribute one line of context to a prompt.
///
/// Retrieval results implement this in the index crate so this crate does
/// not need to know their shape.
pub trait ContextSnippet {
    /// The text placed on the context line.
    fn snippet_text(&self) -> &str;
}

impl ContextSnippet for String {
    fn snippet_text(&self) -> &str {
        self.as_str()
    }
}

impl ContextSnippet for &str {
    fn snippet_text(&self) -> &str {
        *self
    }
}

/// Which system instruction was used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptMode {
    /// Answer from the supplied context lines only
    Grounded,
    /// No current data; general knowledge with that caveat
    NoData,
}

/// A fully assembled prompt ready for the generation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prompt {
    /// System instruction
    pub system: String,

    /// User turn (the original query)
    pub user: String,

    /// Metadata about the assembled prompt
    pub metadata: PromptMetadata,
}

/// Metadata about an assembled prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptMetadata {
    pub mode: PromptMode,

    /// Number of context lines embedded in the system instruction
    #[serde(rename = "contextCount")]
    pub context_count: usize,
}

impl Prompt {
    /// Create a new prompt.
    pub fn new(system: String, user: String, mode: PromptMode, context_count: usize) -> Self {
        Self {
            system,
            user,
            metadata: PromptMetadata {
                mode,
                context_count,
            },
        }
    }

    /// Whether the system instruction carries retrieved context.
    pub fn is_grounded(&self) -> bool {
        self.metadata.mode == PromptMode::Grounded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_serialization() {
        let prompt = Prompt::new(
            "system".to_string(),
            "user".to_string(),
            PromptMode::Grounded,
            2,
        );
        let json = serde_json::to_value(&prompt).unwrap();
        assert_eq!(json["metadata"]["mode"], "grounded");
        assert_eq!(json["metadata"]["contextCount"], 2);
        assert!(prompt.is_grounded());
    }
}
