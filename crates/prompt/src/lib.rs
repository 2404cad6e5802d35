//! Prompt assembly for the radar assistant's chat mode.
//!
//! This crate turns retrieved telemetry snippets into the system instruction
//! for the downstream generation call:
//! - Handlebars-rendered system templates
//! - Grounded mode (answer only from the bulleted context)
//! - No-data mode (general aviation knowledge, stated as such)
//!
//! It never calls a generation provider itself.

pub mod builder;
pub mod types;

// Re-export main types
pub use builder::PromptAssembler;
pub use types::{ContextSnippet, Prompt, PromptMetadata, PromptMode};
