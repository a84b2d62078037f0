//! Document loading and text extraction.
//!
//! Reads knowledge base files from disk, parses the optional YAML front
//! matter (title, classification), and strips markdown furniture so the
//! chunker sees plain prose. Classification policy (refusing Restricted
//! documents) is applied by the ingest orchestration, which counts the
//! rejections.

use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use safechat_core::{AppError, AppResult};

use crate::types::Classification;

/// A document loaded from disk, ready for chunking.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    /// Identifier: path relative to the KB root
    pub id: String,

    /// Title from front matter, first heading, or file name
    pub title: String,

    /// Cleaned body text
    pub body: String,

    /// Classification tag (defaults to Internal when absent)
    pub classification: Classification,

    /// sha256 of the raw file contents, 16-hex prefix
    pub content_hash: String,
}

/// Optional YAML front matter at the top of a document.
#[derive(Debug, Default, Deserialize)]
struct FrontMatter {
    title: Option<String>,
    classification: Option<String>,
}

/// Scan a KB directory for ingestible files.
///
/// Only `.md`, `.markdown`, and `.txt` files are accepted; everything else
/// is ignored silently, matching the knowledge base authoring conventions.
pub fn scan_kb_dir(dir: &Path) -> AppResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(AppError::Ingestion(format!(
            "KB directory not found: {:?}",
            dir
        )));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().to_path_buf())
        .filter(|p| {
            matches!(
                p.extension().and_then(|e| e.to_str()),
                Some("md") | Some("markdown") | Some("txt")
            )
        })
        .collect();

    // Deterministic ingest order
    files.sort();

    tracing::debug!("Found {} ingestible files in {:?}", files.len(), dir);
    Ok(files)
}

/// Load a single document from disk.
///
/// Fails with `Ingestion` when the file is unreadable, empty, or carries an
/// unknown classification tag.
pub fn load_document(kb_root: &Path, path: &Path) -> AppResult<LoadedDocument> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| AppError::Ingestion(format!("Failed to read {:?}: {}", path, e)))?;

    if raw.trim().is_empty() {
        return Err(AppError::Ingestion(format!("Empty document: {:?}", path)));
    }

    let content_hash = hash_content(&raw);

    let id = path
        .strip_prefix(kb_root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/");

    let (front, body_raw) = split_front_matter(&raw, path)?;

    let classification = match front.classification.as_deref() {
        Some(tag) => Classification::parse(tag).ok_or_else(|| {
            AppError::Ingestion(format!(
                "Unknown classification '{}' in {:?}",
                tag, path
            ))
        })?,
        None => Classification::Internal,
    };

    let title = front
        .title
        .or_else(|| first_heading(body_raw))
        .unwrap_or_else(|| {
            path.file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| id.clone())
        });

    let body = strip_markdown(body_raw);

    if body.trim().is_empty() {
        return Err(AppError::Ingestion(format!(
            "Document {:?} has no body text after cleanup",
            path
        )));
    }

    Ok(LoadedDocument {
        id,
        title,
        body,
        classification,
        content_hash,
    })
}

/// sha256 hex digest of the raw contents, truncated to 16 characters.
fn hash_content(raw: &str) -> String {
    let digest = Sha256::digest(raw.as_bytes());
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    hex[..16].to_string()
}

/// Split an optional `---` fenced YAML front-matter block from the body.
fn split_front_matter<'a>(raw: &'a str, path: &Path) -> AppResult<(FrontMatter, &'a str)> {
    let Some(rest) = raw.strip_prefix("---\n").or_else(|| raw.strip_prefix("---\r\n")) else {
        return Ok((FrontMatter::default(), raw));
    };

    let Some(end) = rest.find("\n---") else {
        // An opening fence without a closing one is a horizontal rule, not
        // front matter; treat the whole file as body.
        return Ok((FrontMatter::default(), raw));
    };

    let yaml = &rest[..end];
    let body = rest[end + 4..].trim_start_matches(['-', '\r']).trim_start_matches('\n');

    let front: FrontMatter = serde_yaml::from_str(yaml).map_err(|e| {
        AppError::Ingestion(format!("Malformed front matter in {:?}: {}", path, e))
    })?;

    Ok((front, body))
}

/// Extract the first `#` heading as a title candidate.
fn first_heading(body: &str) -> Option<String> {
    body.lines()
        .map(str::trim)
        .find(|l| l.starts_with('#'))
        .map(|l| l.trim_start_matches('#').trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Strip markdown furniture so chunks carry prose, not formatting.
fn strip_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut in_fence = false;

    for line in text.lines() {
        let trimmed = line.trim();

        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }

        // Horizontal rules carry no content
        if trimmed.chars().all(|c| c == '-') && trimmed.len() >= 3 {
            continue;
        }

        let cleaned = trimmed.trim_start_matches('#').trim();
        result.push_str(cleaned);
        result.push('\n');
    }

    result
}
