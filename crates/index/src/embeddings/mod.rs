//! Embedding providers and the normalizing adapter in front of them.

pub mod adapter;
pub mod provider;
pub mod providers;

pub use adapter::{normalize, EmbeddedBatch, EmbeddingAdapter};
pub use provider::{create_provider, EmbeddingProvider};
