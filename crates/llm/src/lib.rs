//! Generation provider integration for the radar assistant.
//!
//! This crate provides a provider-agnostic abstraction for the text-generation
//! call made in chat mode. The index crate only ever sees the [`LlmClient`]
//! trait; the concrete client is picked by [`create_client`].
//!
//! # Providers
//! - **Ollama**: Local LLM runtime (default)
//!
//! # Example
//! ```no_run
//! use radar_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("Which flights reported fuel status?", "gemma3:4b")
//!     .with_system("You are an aviation radar assistant.");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::OllamaClient;
pub use types::{ProviderType, SamplingParams};
