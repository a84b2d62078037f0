//! Query-time retrieval over the knowledge index.

use std::path::PathBuf;
use std::sync::Arc;

use safechat_core::{AppError, AppResult};

use crate::embeddings::EmbeddingProvider;
use crate::index;
use crate::types::RetrievedChunk;

/// Retrieves the most relevant chunks for a query.
///
/// The index is opened per retrieval: requests share nothing mutable, and
/// ingestion is a separate offline operation, so read-time connections are
/// cheap and conflict-free.
pub struct Retriever {
    index_path: PathBuf,
    embedder: Arc<dyn EmbeddingProvider>,
    min_score: f32,
}

impl Retriever {
    /// Create a new retriever over an existing index.
    pub fn new(index_path: PathBuf, embedder: Arc<dyn EmbeddingProvider>, min_score: f32) -> Self {
        Self {
            index_path,
            embedder,
            min_score,
        }
    }

    /// Retrieve the top-k most relevant chunks for a query.
    ///
    /// Fails with `NotFound` when no index exists or the index is empty.
    /// Chunks that survive ranking but fall below the relevance cutoff are
    /// dropped; an all-filtered result is a valid empty success.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> AppResult<Vec<RetrievedChunk>> {
        if !self.index_path.exists() {
            return Err(AppError::NotFound(
                "No knowledge index found. Run 'safechat ingest' first.".to_string(),
            ));
        }

        let query_embedding = self.embedder.embed(query).await?;

        let conn = index::open_index(&self.index_path)?;
        let ranked = index::query_top_k(&conn, &query_embedding, top_k)?;

        let total = ranked.len();
        let retrieved: Vec<RetrievedChunk> = ranked
            .into_iter()
            .filter(|(_, score)| *score >= self.min_score)
            .map(|(chunk, score)| RetrievedChunk { chunk, score })
            .collect();

        if retrieved.is_empty() {
            tracing::info!(
                "No relevant chunks for query (all {} scores below {:.2} cutoff)",
                total,
                self.min_score
            );
        } else {
            tracing::info!(
                "Retrieved {} relevant chunks (top score: {:.3})",
                retrieved.len(),
                retrieved.first().map(|r| r.score).unwrap_or(0.0)
            );
        }

        Ok(retrieved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::TrigramProvider;
    use crate::types::{Classification, Document, DocumentChunk};
    use chrono::Utc;

    async fn seeded_index(dir: &std::path::Path) -> PathBuf {
        let db_path = dir.join("index.db");
        let mut conn = index::open_index(&db_path).unwrap();
        let embedder = TrigramProvider::new(384);

        for (id, text) in [
            ("roth.md", "A Roth IRA is funded with after-tax dollars"),
            ("401k.md", "A 401k plan is an employer sponsored retirement account"),
        ] {
            let embedding = embedder.embed(text).await.unwrap();
            let doc = Document {
                id: id.to_string(),
                title: id.to_string(),
                classification: Classification::Public,
                content_hash: "hash000000000000".to_string(),
                ingested_at: Utc::now(),
                byte_count: text.len() as u64,
            };
            let chunk = DocumentChunk {
                id: DocumentChunk::make_id(id, "hash000000000000", 0),
                doc_id: id.to_string(),
                position: 0,
                text: text.to_string(),
                embedding: Some(embedding),
            };
            index::replace_document(&mut conn, &doc, &[chunk]).unwrap();
        }

        db_path
    }

    #[tokio::test]
    async fn test_retrieve_ranks_relevant_first() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = seeded_index(dir.path()).await;

        let retriever = Retriever::new(db_path, Arc::new(TrigramProvider::new(384)), 0.0);
        let results = retriever
            .retrieve("what is a roth ira account?", 2)
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.doc_id, "roth.md");
    }

    #[tokio::test]
    async fn test_retrieve_missing_index_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let retriever = Retriever::new(
            dir.path().join("missing.db"),
            Arc::new(TrigramProvider::new(384)),
            0.0,
        );

        let err = retriever.retrieve("anything", 4).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_retrieve_empty_index_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("index.db");
        index::open_index(&db_path).unwrap();

        let retriever = Retriever::new(db_path, Arc::new(TrigramProvider::new(384)), 0.0);
        let err = retriever.retrieve("anything", 4).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_retrieve_cutoff_filters() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = seeded_index(dir.path()).await;

        // Impossible cutoff: ranked results exist but none survive
        let retriever = Retriever::new(db_path, Arc::new(TrigramProvider::new(384)), 1.1);
        let results = retriever.retrieve("roth ira", 2).await.unwrap();
        assert!(results.is_empty());
    }
}
