//! Append-only audit logging.
//!
//! Every request produces exactly one audit record, written as one JSON line
//! before the response is returned to the caller. The log file is opened in
//! append mode and writes are serialized behind a mutex so concurrent
//! requests cannot interleave partial lines.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use safechat_core::{AppError, AppResult};
use safechat_guard::{ScanOutcome, TriggerCategory};

/// One compliance record for one request. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Unique record identifier
    pub record_id: String,

    /// The request this record belongs to
    pub request_id: String,

    /// When the record was written
    pub timestamp: DateTime<Utc>,

    /// User identifier (opaque audit dimension)
    pub user_id: String,

    /// The raw query text
    pub query: String,

    /// Guardrail outcome, absent when the request failed before scanning
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ScanOutcome>,

    /// Triggering category, absent when the request failed before scanning
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<TriggerCategory>,

    /// Last pipeline state the request reached before logging
    pub terminal_state: String,

    /// Error message when the request failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Append-only JSONL audit log.
pub struct AuditLogger {
    path: PathBuf,
    file: Mutex<File>,
}

impl AuditLogger {
    /// Open (or create) the audit log at the given path.
    pub fn open(path: impl Into<PathBuf>) -> AppResult<Self> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Audit(format!("Failed to create audit directory: {}", e))
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| AppError::Audit(format!("Failed to open audit log {:?}: {}", path, e)))?;

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Append one record, flushing and syncing before returning.
    ///
    /// The sync happens before the caller can respond to the user, so a
    /// crash after `append` returns cannot lose the record.
    pub fn append(&self, record: &AuditRecord) -> AppResult<()> {
        let line = serde_json::to_string(record)?;

        let mut file = self
            .file
            .lock()
            .map_err(|_| AppError::Audit("Audit log mutex poisoned".to_string()))?;

        writeln!(file, "{}", line)
            .map_err(|e| AppError::Audit(format!("Failed to append audit record: {}", e)))?;
        file.flush()
            .map_err(|e| AppError::Audit(format!("Failed to flush audit log: {}", e)))?;
        file.sync_data()
            .map_err(|e| AppError::Audit(format!("Failed to sync audit log: {}", e)))?;

        tracing::debug!(
            "Audit record {} written for request {}",
            record.record_id,
            record.request_id
        );

        Ok(())
    }

    /// Path of the underlying log file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
