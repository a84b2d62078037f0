//! Completion provider integration for the SafeChat pipeline.
//!
//! This crate provides a provider-agnostic abstraction for forwarding
//! guardrail-approved prompts to a Large Language Model and returning the
//! generated answer.
//!
//! # Providers
//! - **Ollama**: Local LLM runtime (default)

pub mod client;
pub mod factory;
pub mod providers;

// Re-export main types
pub use client::{CompletionClient, CompletionRequest, CompletionResponse, CompletionUsage};
pub use factory::create_client;
pub use providers::OllamaClient;
