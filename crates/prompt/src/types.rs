//! Prompt types.

use serde::{Deserialize, Serialize};

/// A source reference embedded in a grounded prompt.
///
/// The index matches the `[n]` markers the prompt instructs the model to
/// cite, so answers can be traced back to documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    /// 1-based context block number
    pub index: usize,

    /// Source document identifier
    pub doc_id: String,

    /// Chunk position within the document
    pub position: u32,
}

/// A fully composed prompt ready for scanning and completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundedPrompt {
    /// The rendered prompt text
    pub text: String,

    /// Citations for the context blocks, in order
    pub citations: Vec<Citation>,
}

impl GroundedPrompt {
    /// Whether any knowledge context was available for this prompt.
    pub fn is_grounded(&self) -> bool {
        !self.citations.is_empty()
    }
}
