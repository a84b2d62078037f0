//! Text chunking with configurable size and overlap.

/// Default chunk size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 800;

/// Default overlap between adjacent chunks in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 150;

/// A chunk candidate before embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkSpan {
    pub position: u32,
    pub text: String,
}

/// Chunk text into overlapping segments.
///
/// Character-based chunking with UTF-8 boundary handling. Overlap keeps
/// sentences that straddle a boundary retrievable from either side.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<ChunkSpan> {
    if text.is_empty() || chunk_size == 0 {
        return vec![];
    }

    let mut chunks = Vec::new();
    let mut position = 0u32;
    let mut start = 0;

    while start < text.len() {
        // Find a valid UTF-8 boundary for the end position
        let mut end = (start + chunk_size).min(text.len());
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }

        let span = text[start..end].trim();

        // Trailing slivers carry no retrievable content
        if span.len() < chunk_size / 10 && position > 0 {
            break;
        }

        if !span.is_empty() {
            chunks.push(ChunkSpan {
                position,
                text: span.to_string(),
            });
            position += 1;
        }

        if end == text.len() {
            break;
        }

        // Step forward by (chunk_size - overlap)
        let step = if chunk_size > overlap {
            chunk_size - overlap
        } else {
            chunk_size
        };

        let mut next_start = start + step;
        while next_start < text.len() && !text.is_char_boundary(next_start) {
            next_start += 1;
        }
        start = next_start;
    }

    tracing::debug!(
        "Chunked text into {} chunks (size: {}, overlap: {})",
        chunks.len(),
        chunk_size,
        overlap
    );

    chunks
}
