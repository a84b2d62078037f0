//! Knowledge base type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Data classification of a source document.
///
/// Classifications follow the four-tier scheme used by the knowledge base
/// policy documents. `Restricted` documents are never ingested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Public,
    Internal,
    Confidential,
    Restricted,
}

impl Classification {
    /// Parse a classification from a front-matter string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "public" => Some(Self::Public),
            "internal" => Some(Self::Internal),
            "confidential" => Some(Self::Confidential),
            "restricted" => Some(Self::Restricted),
            _ => None,
        }
    }

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Internal => "internal",
            Self::Confidential => "confidential",
            Self::Restricted => "restricted",
        }
    }

    /// Whether documents of this classification may enter the index.
    pub fn is_ingestible(&self) -> bool {
        !matches!(self, Self::Restricted)
    }
}

/// A source document in the knowledge base.
///
/// Immutable once ingested; re-ingesting a document with the same identifier
/// replaces it (and all of its chunks) atomically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Identifier: path of the source file relative to the KB root
    pub id: String,

    /// Human-readable title (front matter, first heading, or file name)
    pub title: String,

    /// Classification tag
    pub classification: Classification,

    /// Content hash (sha256, 16-hex prefix)
    pub content_hash: String,

    /// When this document was ingested
    pub ingested_at: DateTime<Utc>,

    /// Body size in bytes
    pub byte_count: u64,
}

/// A retrievable span of a document with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Chunk identifier: `<doc_id>::<content_hash>::<position>`
    pub id: String,

    /// Back-reference to the source document
    pub doc_id: String,

    /// Position within the document
    pub position: u32,

    /// Text content
    pub text: String,

    /// Embedding vector (normalized)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl DocumentChunk {
    /// Build the chunk identifier for a document/position pair.
    pub fn make_id(doc_id: &str, content_hash: &str, position: u32) -> String {
        format!("{}::{}::{}", doc_id, content_hash, position)
    }
}

/// A chunk returned by the retriever, paired with its similarity score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub chunk: DocumentChunk,
    pub score: f32,
}

/// Options for the ingest operation.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Directory containing the knowledge base documents
    pub kb_dir: PathBuf,

    /// Chunk size in characters
    pub chunk_size: usize,

    /// Overlap between adjacent chunks in characters
    pub chunk_overlap: usize,

    /// Reset the index before ingesting
    pub reset: bool,
}

/// Statistics from an ingest operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestStats {
    /// Number of documents ingested
    pub documents_count: u32,

    /// Number of chunks written
    pub chunks_count: u32,

    /// Total bytes of document text processed
    pub bytes_processed: u64,

    /// Documents refused because they were classified Restricted
    pub restricted_rejected: u32,

    /// Files skipped because they could not be parsed
    pub skipped: u32,

    /// Duration in seconds
    pub duration_secs: f64,
}

/// Statistics for the knowledge index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    /// Number of documents
    pub documents_count: u32,

    /// Number of chunks
    pub chunks_count: u32,

    /// Database size in bytes
    pub db_size_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_parse() {
        assert_eq!(Classification::parse("public"), Some(Classification::Public));
        assert_eq!(
            Classification::parse("  Internal "),
            Some(Classification::Internal)
        );
        assert_eq!(
            Classification::parse("RESTRICTED"),
            Some(Classification::Restricted)
        );
        assert_eq!(Classification::parse("secret"), None);
    }

    #[test]
    fn test_classification_ingestible() {
        assert!(Classification::Public.is_ingestible());
        assert!(Classification::Internal.is_ingestible());
        assert!(Classification::Confidential.is_ingestible());
        assert!(!Classification::Restricted.is_ingestible());
    }

    #[test]
    fn test_chunk_id_format() {
        let id = DocumentChunk::make_id("retirement-basics.md", "ab12cd34ef56ab12", 3);
        assert_eq!(id, "retirement-basics.md::ab12cd34ef56ab12::3");
    }
}
