//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con le collection e i percorsi usati
//! - Fornisce validazione dei parametri
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//! - Fornisce valori di default sensati per tutti i parametri
//!
//! ## Parametri di configurazione:
//! - `library_root`: Root del backend filesystem (una sottodirectory per collection)
//! - `videos_collection`: Collection dei video (default: "videos")
//! - `inbox_collection`: Collection delle nuove thumbnail (default: "thumbnailsInbox")
//! - `target_collection`: Collection delle thumbnail assegnate (default: "thumbnailsFs")
//! - `backup_collection`: Collection di quarantena (default: "thumbnailsBackup")
//! - `audit_log_path`: File JSON del log di audit
//! - `audit_capacity`: Numero massimo di entry di audit (default: 50)
//! - `reconcile_timestamps` / `sweep_timestamps`: Granularità dei timestamp
//! - `json_output`: Output JSON per uso programmatico
//!
//! ## Validazione:
//! - Gli handle delle collection non devono essere vuoti
//! - Gli handle devono essere tutti diversi tra loro
//! - `audit_capacity` deve essere > 0
//!
//! ## Esempio:
//! ```ignore
//! let config = Config {
//!     library_root: PathBuf::from("/srv/assets"),
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use crate::audit::DEFAULT_AUDIT_CAPACITY;
use crate::clock::TimestampScope;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "thumb-reconcile";

/// Configuration for thumbnail reconciliation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root directory holding one subdirectory per collection
    pub library_root: PathBuf,
    /// Collection holding the videos
    pub videos_collection: String,
    /// Collection where new thumbnails are dropped
    pub inbox_collection: String,
    /// Collection holding thumbnails attached to videos
    pub target_collection: String,
    /// Collection receiving quarantined assets
    pub backup_collection: String,
    /// JSON file of the audit log
    pub audit_log_path: PathBuf,
    /// Number of audit entries retained
    pub audit_capacity: usize,
    /// Suffix timestamp granularity during reconciliation
    pub reconcile_timestamps: TimestampScope,
    /// Suffix timestamp granularity during the unused sweep
    pub sweep_timestamps: TimestampScope,
    /// Output responses as JSON for programmatic use
    pub json_output: bool,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .map(|dir| dir.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from("."));

        Self {
            library_root: data_dir.join("library"),
            videos_collection: "videos".to_string(),
            inbox_collection: "thumbnailsInbox".to_string(),
            target_collection: "thumbnailsFs".to_string(),
            backup_collection: "thumbnailsBackup".to_string(),
            audit_log_path: data_dir.join("logs").join("matching-audit.json"),
            audit_capacity: DEFAULT_AUDIT_CAPACITY,
            reconcile_timestamps: TimestampScope::PerUnit,
            sweep_timestamps: TimestampScope::PerRun,
            json_output: false,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        let handles = self.collections();

        for (name, handle) in &handles {
            if handle.trim().is_empty() {
                return Err(anyhow::anyhow!("Collection handle '{}' must not be empty", name));
            }
        }

        for (i, (name_a, handle_a)) in handles.iter().enumerate() {
            for (name_b, handle_b) in handles.iter().skip(i + 1) {
                if handle_a == handle_b {
                    return Err(anyhow::anyhow!(
                        "Collections '{}' and '{}' must differ (both are '{}')",
                        name_a,
                        name_b,
                        handle_a
                    ));
                }
            }
        }

        if self.audit_capacity == 0 {
            return Err(anyhow::anyhow!("Audit capacity must be greater than 0"));
        }

        Ok(())
    }

    fn collections(&self) -> [(&'static str, &str); 4] {
        [
            ("videos", self.videos_collection.as_str()),
            ("inbox", self.inbox_collection.as_str()),
            ("target", self.target_collection.as_str()),
            ("backup", self.backup_collection.as_str()),
        ]
    }

    /// Load configuration from file
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}
