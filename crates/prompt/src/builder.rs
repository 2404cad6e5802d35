//! Context assembly: retrieval results in, system instruction out.

use crate::types::{ContextSnippet, Prompt, PromptMode};
use handlebars::Handlebars;
use radar_core::{AppError, AppResult};
use serde_json::json;

const GROUNDED_TEMPLATE_NAME: &str = "grounded";
const NO_DATA_TEMPLATE_NAME: &str = "no_data";

const GROUNDED_TEMPLATE: &str = "\
You are an aviation radar assistant with access to real-time aircraft data.
Use only the following current aviation information to answer questions:

CURRENT AVIATION DATA:
{{context}}

Guidelines:
- Be conversational and helpful
- Focus on aviation safety and operational information
- If asked about specific flights, reference the data provided
- Answer only from the data above; if it does not contain what is asked, say clearly that the information is missing
- Use aviation terminology appropriately
- Keep responses concise but informative";

const NO_DATA_TEMPLATE: &str = "\
You are an aviation radar assistant. No current aviation data is available right now.
Answer from general aviation knowledge only, say that no live data backs your answer, \
and do not invent flight-specific details.";

/// Renders system instructions from retrieved snippets.
///
/// Templates are registered once; the assembler is cheap to share.
pub struct PromptAssembler {
    registry: Handlebars<'static>,
}

impl PromptAssembler {
    /// Create an assembler with the built-in templates registered.
    pub fn new() -> AppResult<Self> {
        let mut registry = Handlebars::new();

        // Telemetry text goes to a model, not a browser
        registry.register_escape_fn(handlebars::no_escape);
        registry.set_strict_mode(true);

        registry
            .register_template_string(GROUNDED_TEMPLATE_NAME, GROUNDED_TEMPLATE)
            .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;
        registry
            .register_template_string(NO_DATA_TEMPLATE_NAME, NO_DATA_TEMPLATE)
            .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

        Ok(Self { registry })
    }

    /// Build the prompt for `query` from `results`, in rank order.
    pub fn assemble<S: ContextSnippet>(&self, query: &str, results: &[S]) -> AppResult<Prompt> {
        let (mode, template, data) = if results.is_empty() {
            (PromptMode::NoData, NO_DATA_TEMPLATE_NAME, json!({}))
        } else {
            let context = results
                .iter()
                .map(|r| format!("- {}", single_line(r.snippet_text())))
                .collect::<Vec<_>>()
                .join("\n");
            (
                PromptMode::Grounded,
                GROUNDED_TEMPLATE_NAME,
                json!({ "context": context }),
            )
        };

        let system = self
            .registry
            .render(template, &data)
            .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))?;

        tracing::debug!(
            mode = ?mode,
            context_count = results.len(),
            "Assembled chat prompt"
        );

        Ok(Prompt::new(system, query.to_string(), mode, results.len()))
    }
}

/// Keep each bullet on one line.
fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
