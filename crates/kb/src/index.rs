//! SQLite-backed vector index for knowledge chunks.
//!
//! Documents and chunks live in two tables; re-ingesting a document deletes
//! its prior chunks and rewrites the document row in a single transaction,
//! so a stale chunk can never survive its document.

use rusqlite::{params, Connection};
use std::cmp::Ordering;
use std::path::Path;

use safechat_core::{AppError, AppResult};

use crate::types::{Document, DocumentChunk, IndexStats};

/// Open the SQLite index, creating the schema if needed.
pub fn open_index(db_path: &Path) -> AppResult<Connection> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| AppError::Ingestion(format!("Failed to create index directory: {}", e)))?;
    }

    let conn = Connection::open(db_path)
        .map_err(|e| AppError::Ingestion(format!("Failed to open SQLite index: {}", e)))?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            classification TEXT NOT NULL,
            content_hash TEXT NOT NULL,
            ingested_at TEXT NOT NULL,
            byte_count INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS chunks (
            id TEXT PRIMARY KEY,
            doc_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            text TEXT NOT NULL,
            embedding BLOB NOT NULL,
            FOREIGN KEY (doc_id) REFERENCES documents(id)
        );

        CREATE INDEX IF NOT EXISTS idx_chunks_doc ON chunks(doc_id);
        "#,
    )
    .map_err(|e| AppError::Ingestion(format!("Failed to create tables: {}", e)))?;

    tracing::debug!("Opened SQLite index at {:?}", db_path);
    Ok(conn)
}

/// Insert or replace a document and its chunks.
///
/// Runs in one transaction: prior chunks of the same document id are deleted
/// before the new ones are written, so readers never observe a mix of
/// versions.
pub fn replace_document(
    conn: &mut Connection,
    document: &Document,
    chunks: &[DocumentChunk],
) -> AppResult<()> {
    let tx = conn
        .transaction()
        .map_err(|e| AppError::Ingestion(format!("Failed to start transaction: {}", e)))?;

    tx.execute("DELETE FROM chunks WHERE doc_id = ?1", params![document.id])
        .map_err(|e| AppError::Ingestion(format!("Failed to delete stale chunks: {}", e)))?;

    tx.execute(
        "INSERT OR REPLACE INTO documents (id, title, classification, content_hash, ingested_at, byte_count)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            document.id,
            document.title,
            document.classification.as_str(),
            document.content_hash,
            document.ingested_at.to_rfc3339(),
            document.byte_count as i64,
        ],
    )
    .map_err(|e| AppError::Ingestion(format!("Failed to insert document: {}", e)))?;

    for chunk in chunks {
        let embedding_bytes = embedding_to_bytes(chunk.embedding.as_ref().ok_or_else(|| {
            AppError::Ingestion(format!("Chunk {} missing embedding", chunk.id))
        })?);

        tx.execute(
            "INSERT INTO chunks (id, doc_id, position, text, embedding)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                chunk.id,
                chunk.doc_id,
                chunk.position as i64,
                chunk.text,
                embedding_bytes,
            ],
        )
        .map_err(|e| AppError::Ingestion(format!("Failed to insert chunk: {}", e)))?;
    }

    tx.commit()
        .map_err(|e| AppError::Ingestion(format!("Failed to commit document: {}", e)))?;

    Ok(())
}

/// Query the index for the top-k most similar chunks.
///
/// Results are ordered by descending cosine similarity; equal scores are
/// broken by document id, then chunk position, so retrieval is deterministic.
///
/// Fails with `NotFound` when the index holds no chunks.
pub fn query_top_k(
    conn: &Connection,
    query_embedding: &[f32],
    top_k: usize,
) -> AppResult<Vec<(DocumentChunk, f32)>> {
    let chunk_count: i64 = conn
        .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))
        .map_err(|e| AppError::Ingestion(format!("Failed to count chunks: {}", e)))?;

    if chunk_count == 0 {
        return Err(AppError::NotFound(
            "Knowledge index is empty. Run 'safechat ingest' first.".to_string(),
        ));
    }

    let mut stmt = conn
        .prepare("SELECT id, doc_id, position, text, embedding FROM chunks")
        .map_err(|e| AppError::Ingestion(format!("Failed to prepare query: {}", e)))?;

    let chunks_iter = stmt
        .query_map([], |row| {
            let embedding_bytes: Vec<u8> = row.get(4)?;
            let embedding = bytes_to_embedding(&embedding_bytes)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

            Ok(DocumentChunk {
                id: row.get(0)?,
                doc_id: row.get(1)?,
                position: row.get::<_, i64>(2)? as u32,
                text: row.get(3)?,
                embedding: Some(embedding),
            })
        })
        .map_err(|e| AppError::Ingestion(format!("Failed to query chunks: {}", e)))?;

    let mut results: Vec<(DocumentChunk, f32)> = Vec::new();
    for chunk in chunks_iter {
        let chunk =
            chunk.map_err(|e| AppError::Ingestion(format!("Failed to read chunk row: {}", e)))?;
        let score = chunk
            .embedding
            .as_ref()
            .map(|e| cosine_similarity(query_embedding, e))
            .unwrap_or(0.0);
        results.push((chunk, score));
    }

    // Descending score; ties broken by doc id then position for determinism
    results.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.doc_id.cmp(&b.0.doc_id))
            .then_with(|| a.0.position.cmp(&b.0.position))
    });

    results.truncate(top_k);

    tracing::debug!("Retrieved {} chunks (requested top-{})", results.len(), top_k);

    Ok(results)
}

/// Get statistics for the index.
pub fn index_stats(conn: &Connection, db_path: &Path) -> AppResult<IndexStats> {
    let documents_count: u32 = conn
        .query_row("SELECT COUNT(*) FROM documents", [], |row| {
            row.get::<_, i64>(0).map(|v| v as u32)
        })
        .map_err(|e| AppError::Ingestion(format!("Failed to count documents: {}", e)))?;

    let chunks_count: u32 = conn
        .query_row("SELECT COUNT(*) FROM chunks", [], |row| {
            row.get::<_, i64>(0).map(|v| v as u32)
        })
        .map_err(|e| AppError::Ingestion(format!("Failed to count chunks: {}", e)))?;

    let db_size_bytes = std::fs::metadata(db_path).map(|m| m.len()).unwrap_or(0);

    Ok(IndexStats {
        documents_count,
        chunks_count,
        db_size_bytes,
    })
}

/// Reset the index (delete all data).
pub fn reset_index(conn: &Connection) -> AppResult<()> {
    conn.execute("DELETE FROM chunks", [])
        .map_err(|e| AppError::Ingestion(format!("Failed to delete chunks: {}", e)))?;

    conn.execute("DELETE FROM documents", [])
        .map_err(|e| AppError::Ingestion(format!("Failed to delete documents: {}", e)))?;

    tracing::info!("Reset knowledge index");
    Ok(())
}

/// Convert embedding vector to bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert bytes back to embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Ingestion(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    let mut embedding = Vec::with_capacity(bytes.len() / 4);
    for chunk in bytes.chunks_exact(4) {
        embedding.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }

    Ok(embedding)
}

/// Calculate cosine similarity between two vectors.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Classification;
    use chrono::Utc;
    use tempfile::NamedTempFile;

    fn test_document(id: &str, hash: &str) -> Document {
        Document {
            id: id.to_string(),
            title: id.to_string(),
            classification: Classification::Internal,
            content_hash: hash.to_string(),
            ingested_at: Utc::now(),
            byte_count: 100,
        }
    }

    fn test_chunk(doc_id: &str, hash: &str, position: u32, embedding: Vec<f32>) -> DocumentChunk {
        DocumentChunk {
            id: DocumentChunk::make_id(doc_id, hash, position),
            doc_id: doc_id.to_string(),
            position,
            text: format!("{} chunk {}", doc_id, position),
            embedding: Some(embedding),
        }
    }

    #[test]
    fn test_open_index_creates_schema() {
        let temp_file = NamedTempFile::new().unwrap();
        let conn = open_index(temp_file.path()).unwrap();

        let table_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table'",
                [],
                |row| row.get(0),
            )
            .unwrap();

        assert!(table_count >= 2);
    }

    #[test]
    fn test_empty_index_is_not_found() {
        let temp_file = NamedTempFile::new().unwrap();
        let conn = open_index(temp_file.path()).unwrap();

        let err = query_top_k(&conn, &[1.0, 0.0], 5).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_insert_and_query() {
        let temp_file = NamedTempFile::new().unwrap();
        let mut conn = open_index(temp_file.path()).unwrap();

        let doc = test_document("a.md", "hash-a");
        let chunks = vec![
            test_chunk("a.md", "hash-a", 0, vec![1.0, 0.0, 0.0]),
            test_chunk("a.md", "hash-a", 1, vec![0.0, 1.0, 0.0]),
        ];
        replace_document(&mut conn, &doc, &chunks).unwrap();

        let results = query_top_k(&conn, &[1.0, 0.0, 0.0], 5).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0.position, 0);
        assert!(results[0].1 > results[1].1);
    }

    #[test]
    fn test_reingest_replaces_chunks() {
        let temp_file = NamedTempFile::new().unwrap();
        let mut conn = open_index(temp_file.path()).unwrap();

        let doc_v1 = test_document("a.md", "hash-v1");
        let chunks_v1 = vec![
            test_chunk("a.md", "hash-v1", 0, vec![1.0, 0.0]),
            test_chunk("a.md", "hash-v1", 1, vec![1.0, 0.0]),
            test_chunk("a.md", "hash-v1", 2, vec![1.0, 0.0]),
        ];
        replace_document(&mut conn, &doc_v1, &chunks_v1).unwrap();

        // Same identifier, new content: all prior chunks must vanish
        let doc_v2 = test_document("a.md", "hash-v2");
        let chunks_v2 = vec![test_chunk("a.md", "hash-v2", 0, vec![0.0, 1.0])];
        replace_document(&mut conn, &doc_v2, &chunks_v2).unwrap();

        let results = query_top_k(&conn, &[1.0, 0.0], 10).unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].0.id.contains("hash-v2"));

        let stats = index_stats(&conn, temp_file.path()).unwrap();
        assert_eq!(stats.documents_count, 1);
        assert_eq!(stats.chunks_count, 1);
    }

    #[test]
    fn test_tie_break_by_doc_id() {
        let temp_file = NamedTempFile::new().unwrap();
        let mut conn = open_index(temp_file.path()).unwrap();

        // Identical embeddings, so scores tie exactly
        let embedding = vec![0.6, 0.8];
        for id in ["zeta.md", "alpha.md", "mid.md"] {
            let doc = test_document(id, "h");
            let chunks = vec![test_chunk(id, "h", 0, embedding.clone())];
            replace_document(&mut conn, &doc, &chunks).unwrap();
        }

        let results = query_top_k(&conn, &[0.6, 0.8], 10).unwrap();
        let order: Vec<&str> = results.iter().map(|(c, _)| c.doc_id.as_str()).collect();
        assert_eq!(order, vec!["alpha.md", "mid.md", "zeta.md"]);
    }

    #[test]
    fn test_reset_index() {
        let temp_file = NamedTempFile::new().unwrap();
        let mut conn = open_index(temp_file.path()).unwrap();

        let doc = test_document("a.md", "h");
        let chunks = vec![test_chunk("a.md", "h", 0, vec![1.0])];
        replace_document(&mut conn, &doc, &chunks).unwrap();

        reset_index(&conn).unwrap();

        assert!(matches!(
            query_top_k(&conn, &[1.0], 5),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 0.001);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 0.001);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }
}
