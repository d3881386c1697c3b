//! # Audit Log Module
//!
//! Log di audit limitato delle operazioni di matching e cleanup.
//!
//! ## Responsabilità:
//! - Definisce `AuditEntry` con timestamp, tipo, flag dryRun, payload e statistiche
//! - Espone il trait `AuditSink` (append, latest, all, clear)
//! - Mantiene solo le ultime `capacity` entry (default 50), eliminando le più vecchie
//!
//! ## Implementazioni:
//! - `FileAuditSink`: Array JSON pretty-printed, Unicode preservato, scritto
//!   in modo atomico tramite file temporaneo
//! - `MemoryAuditSink`: In memoria, per i test
//!
//! ## Esempio struttura log file:
//! ```json
//! [
//!   {
//!     "timestamp": "2025-01-29 14:30:22",
//!     "type": "matching",
//!     "dryRun": true,
//!     "matched": [{ "video": "Clip_01.mov", "thumbnail": "clip-01.jpg" }],
//!     "unmatched": ["Trip.mp4"],
//!     "stats": { "matchedCount": 1, "unmatchedCount": 1 }
//!   }
//! ]
//! ```

use crate::error::{ReconcileError, Result};
use crate::model::{CleanupReport, MatchedPair, ReconcileReport};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::fs;
use tracing::{debug, warn};

/// Default number of entries retained
pub const DEFAULT_AUDIT_CAPACITY: usize = 50;

/// Payload of an audit entry, tagged by operation kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AuditRecord {
    Matching {
        matched: Vec<MatchedPair>,
        unmatched: Vec<String>,
        stats: MatchingStats,
    },
    Cleanup {
        moved: Vec<String>,
        stats: CleanupStats,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchingStats {
    pub matched_count: usize,
    pub unmatched_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupStats {
    pub moved_count: usize,
}

/// One persisted audit entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub timestamp: String,
    pub dry_run: bool,
    #[serde(flatten)]
    pub record: AuditRecord,
}

impl AuditEntry {
    pub fn matching(timestamp: impl Into<String>, report: &ReconcileReport, dry_run: bool) -> Self {
        Self {
            timestamp: timestamp.into(),
            dry_run,
            record: AuditRecord::Matching {
                matched: report.matched.clone(),
                unmatched: report.unmatched.clone(),
                stats: MatchingStats {
                    matched_count: report.matched.len(),
                    unmatched_count: report.unmatched.len(),
                },
            },
        }
    }

    pub fn cleanup(timestamp: impl Into<String>, report: &CleanupReport, dry_run: bool) -> Self {
        Self {
            timestamp: timestamp.into(),
            dry_run,
            record: AuditRecord::Cleanup {
                moved: report.moved.clone(),
                stats: CleanupStats {
                    moved_count: report.moved.len(),
                },
            },
        }
    }

    /// `"matching"` or `"cleanup"`
    pub fn kind(&self) -> &'static str {
        match self.record {
            AuditRecord::Matching { .. } => "matching",
            AuditRecord::Cleanup { .. } => "cleanup",
        }
    }
}

/// Bounded, append-only audit log
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Append an entry, evicting the oldest ones beyond capacity
    async fn append(&self, entry: AuditEntry) -> Result<()>;

    /// Most recently appended entry
    async fn latest(&self) -> Result<Option<AuditEntry>>;

    /// Every retained entry, oldest first
    async fn all(&self) -> Result<Vec<AuditEntry>>;

    /// Drop the whole log
    async fn clear(&self) -> Result<bool>;
}

fn truncate_to(entries: &mut Vec<AuditEntry>, capacity: usize) {
    if entries.len() > capacity {
        let excess = entries.len() - capacity;
        entries.drain(..excess);
    }
}

/// Audit log stored as a JSON array in a single file
#[derive(Debug, Clone)]
pub struct FileAuditSink {
    path: PathBuf,
    capacity: usize,
}

impl FileAuditSink {
    pub fn new(path: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            path: path.into(),
            capacity,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_entries(&self) -> Result<Vec<AuditEntry>> {
        if !fs::try_exists(&self.path).await? {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path).await?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        match serde_json::from_str(&content) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                warn!("Audit log {} is not valid JSON, treating as empty: {}", self.path.display(), e);
                Ok(Vec::new())
            }
        }
    }

    /// Write the whole log through a temp file in the same directory
    async fn write_entries(&self, entries: Vec<AuditEntry>) -> Result<()> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let dir = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            };
            std::fs::create_dir_all(&dir)?;

            let content = serde_json::to_string_pretty(&entries)?;
            let mut temp = tempfile::NamedTempFile::new_in(&dir)?;
            temp.write_all(content.as_bytes())?;
            temp.flush()?;
            temp.persist(&path).map_err(|e| ReconcileError::Io(e.error))?;
            Ok(())
        })
        .await
        .map_err(|e| ReconcileError::Audit(format!("audit writer task failed: {}", e)))?
    }
}

#[async_trait]
impl AuditSink for FileAuditSink {
    async fn append(&self, entry: AuditEntry) -> Result<()> {
        let mut entries = self.read_entries().await?;
        entries.push(entry);
        truncate_to(&mut entries, self.capacity);
        debug!("Writing {} audit entries to {}", entries.len(), self.path.display());
        self.write_entries(entries).await
    }

    async fn latest(&self) -> Result<Option<AuditEntry>> {
        Ok(self.read_entries().await?.pop())
    }

    async fn all(&self) -> Result<Vec<AuditEntry>> {
        self.read_entries().await
    }

    async fn clear(&self) -> Result<bool> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
            Err(e) => Err(e.into()),
        }
    }
}

/// Audit log kept in memory
#[derive(Debug)]
pub struct MemoryAuditSink {
    entries: Mutex<Vec<AuditEntry>>,
    capacity: usize,
}

impl MemoryAuditSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            capacity,
        }
    }

    fn snapshot(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl Default for MemoryAuditSink {
    fn default() -> Self {
        Self::new(DEFAULT_AUDIT_CAPACITY)
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn append(&self, entry: AuditEntry) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| ReconcileError::Audit("audit log lock poisoned".to_string()))?;
        entries.push(entry);
        truncate_to(&mut entries, self.capacity);
        Ok(())
    }

    async fn latest(&self) -> Result<Option<AuditEntry>> {
        Ok(self.snapshot().pop())
    }

    async fn all(&self) -> Result<Vec<AuditEntry>> {
        Ok(self.snapshot())
    }

    async fn clear(&self) -> Result<bool> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| ReconcileError::Audit("audit log lock poisoned".to_string()))?;
        entries.clear();
        Ok(true)
    }
}
