//! Embedding providers for the knowledge base.
//!
//! All vector generation goes through the [`EmbeddingProvider`] trait so
//! ingestion and retrieval are provider-agnostic.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};
