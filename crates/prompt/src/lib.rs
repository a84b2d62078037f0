//! Grounded prompt construction for the SafeChat pipeline.
//!
//! Composes a single prompt string from retrieved knowledge chunks and the
//! user question, with an explicit instruction to answer only from the
//! provided context.

pub mod builder;
pub mod types;

// Re-export main types
pub use builder::build_grounded_prompt;
pub use types::{Citation, GroundedPrompt};
