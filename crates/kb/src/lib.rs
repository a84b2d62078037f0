//! Knowledge base management for the SafeChat pipeline.
//!
//! Ingests a directory of markdown/text documents into a local SQLite vector
//! index and serves similarity retrieval over it. Ingestion is an exclusive
//! offline operation; retrieval is read-shared across concurrent requests.

pub mod chunker;
pub mod embeddings;
pub mod index;
pub mod loader;
pub mod retriever;
pub mod types;

// Re-export commonly used types
pub use retriever::Retriever;
pub use types::{
    Classification, Document, DocumentChunk, IndexStats, IngestOptions, IngestStats,
    RetrievedChunk,
};

use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use safechat_core::{AppError, AppResult};

use crate::embeddings::EmbeddingProvider;

/// Ingest a knowledge base directory into the index.
///
/// Every accepted document is chunked, embedded, and written in a single
/// transaction that replaces any prior version with the same identifier.
/// Restricted-classified documents never reach the index: they are counted
/// and skipped with a warning.
pub async fn ingest(
    index_path: &Path,
    embedder: Arc<dyn EmbeddingProvider>,
    options: &IngestOptions,
) -> AppResult<IngestStats> {
    let start = Instant::now();

    tracing::info!("Starting ingest from {:?}", options.kb_dir);

    let mut conn = index::open_index(index_path)?;

    if options.reset {
        tracing::info!("Resetting knowledge index before ingest");
        index::reset_index(&conn)?;
    }

    let files = loader::scan_kb_dir(&options.kb_dir)?;
    if files.is_empty() {
        return Err(AppError::Ingestion(format!(
            "No ingestible documents found in {:?}",
            options.kb_dir
        )));
    }

    let mut stats = IngestStats {
        documents_count: 0,
        chunks_count: 0,
        bytes_processed: 0,
        restricted_rejected: 0,
        skipped: 0,
        duration_secs: 0.0,
    };

    for path in &files {
        let doc = match loader::load_document(&options.kb_dir, path) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!("Skipping {:?}: {}", path, e);
                stats.skipped += 1;
                continue;
            }
        };

        // Policy constraint: Restricted documents must never enter the index
        if !doc.classification.is_ingestible() {
            tracing::warn!(
                "Refusing Restricted document {:?}; it will not be ingested",
                path
            );
            stats.restricted_rejected += 1;
            continue;
        }

        let chunks_written =
            ingest_document(&mut conn, embedder.as_ref(), &doc, options).await?;

        stats.documents_count += 1;
        stats.chunks_count += chunks_written;
        stats.bytes_processed += doc.body.len() as u64;
    }

    stats.duration_secs = start.elapsed().as_secs_f64();

    tracing::info!(
        "Ingest completed: {} documents, {} chunks, {} bytes in {:.2}s ({} restricted rejected, {} skipped)",
        stats.documents_count,
        stats.chunks_count,
        stats.bytes_processed,
        stats.duration_secs,
        stats.restricted_rejected,
        stats.skipped
    );

    Ok(stats)
}

/// Chunk, embed, and write one document.
async fn ingest_document(
    conn: &mut rusqlite::Connection,
    embedder: &dyn EmbeddingProvider,
    doc: &loader::LoadedDocument,
    options: &IngestOptions,
) -> AppResult<u32> {
    tracing::debug!("Ingesting document '{}'", doc.id);

    let spans = chunker::chunk_text(&doc.body, options.chunk_size, options.chunk_overlap);

    let texts: Vec<String> = spans.iter().map(|s| s.text.clone()).collect();
    let embeddings = embedder.embed_batch(&texts).await?;

    let chunks: Vec<DocumentChunk> = spans
        .into_iter()
        .zip(embeddings)
        .map(|(span, embedding)| DocumentChunk {
            id: DocumentChunk::make_id(&doc.id, &doc.content_hash, span.position),
            doc_id: doc.id.clone(),
            position: span.position,
            text: span.text,
            embedding: Some(embedding),
        })
        .collect();

    let document = Document {
        id: doc.id.clone(),
        title: doc.title.clone(),
        classification: doc.classification,
        content_hash: doc.content_hash.clone(),
        ingested_at: Utc::now(),
        byte_count: doc.body.len() as u64,
    };

    let count = chunks.len() as u32;
    index::replace_document(conn, &document, &chunks)?;

    tracing::debug!("Ingested '{}': {} chunks", doc.id, count);
    Ok(count)
}

/// Get statistics for the knowledge index.
pub fn stats(index_path: &Path) -> AppResult<IndexStats> {
    if !index_path.exists() {
        return Err(AppError::NotFound(
            "No knowledge index found. Run 'safechat ingest' first.".to_string(),
        ));
    }

    let conn = index::open_index(index_path)?;
    index::index_stats(&conn, index_path)
}

/// Clean (reset) the knowledge index.
pub fn clean(index_path: &Path) -> AppResult<()> {
    if !index_path.exists() {
        return Err(AppError::NotFound(
            "No knowledge index found; nothing to clean.".to_string(),
        ));
    }

    let conn = index::open_index(index_path)?;
    index::reset_index(&conn)?;

    tracing::info!("Knowledge index cleaned");
    Ok(())
}
