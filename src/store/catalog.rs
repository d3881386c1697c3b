//! # Catalog State Module
//!
//! Persistenza del catalogo del backend filesystem.
//!
//! ## Responsabilità:
//! - Assegna un id stabile a ogni file scoperto in una collection
//! - Memorizza le relazioni video -> thumbnail assegnata
//! - Persiste tutto in un file JSON nella root della libreria
//! - Cleanup automatico di entry per file che non esistono più
//!
//! ## Esempio struttura catalog file:
//! ```json
//! {
//!   "next_id": 3,
//!   "assets": {
//!     "1": { "filename": "Trip.mp4", "collection": "videos" },
//!     "2": { "filename": "trip.jpg", "collection": "thumbnailsFs" }
//!   },
//!   "attachments": { "1": 2 }
//! }
//! ```

use crate::file_manager::FileManager;
use crate::model::{Asset, AssetId};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Name of the catalog file inside the library root
pub const CATALOG_FILE: &str = ".catalog.json";

/// Location of a cataloged asset
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub filename: String,
    pub collection: String,
}

/// Persisted catalog contents
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct CatalogFile {
    pub next_id: u64,
    pub assets: BTreeMap<u64, CatalogEntry>,
    /// video id -> thumbnail id
    pub attachments: BTreeMap<u64, u64>,
}

impl CatalogFile {
    pub fn asset(&self, id: u64) -> Option<Asset> {
        self.assets.get(&id).map(|entry| Asset {
            id: AssetId(id),
            filename: entry.filename.clone(),
            collection: entry.collection.clone(),
            kind: FileManager::classify(Path::new(&entry.filename)),
        })
    }

    /// Align the entries of one collection with the files actually on disk.
    ///
    /// Returns true when the catalog changed.
    pub fn sync_collection(&mut self, collection: &str, on_disk: &[String]) -> bool {
        let mut changed = false;

        let vanished: Vec<u64> = self
            .assets
            .iter()
            .filter(|(_, e)| e.collection == collection && !on_disk.contains(&e.filename))
            .map(|(id, _)| *id)
            .collect();
        for id in vanished {
            debug!("Dropping vanished asset {} from catalog", id);
            self.assets.remove(&id);
            changed = true;
        }

        for filename in on_disk {
            let known = self
                .assets
                .values()
                .any(|e| e.collection == collection && &e.filename == filename);
            if !known {
                self.next_id += 1;
                self.assets.insert(
                    self.next_id,
                    CatalogEntry {
                        filename: filename.clone(),
                        collection: collection.to_string(),
                    },
                );
                changed = true;
            }
        }

        if changed {
            let assets = &self.assets;
            self.attachments
                .retain(|video, thumb| assets.contains_key(video) && assets.contains_key(thumb));
        }

        changed
    }
}

/// Loads and saves the catalog file
#[derive(Debug)]
pub struct CatalogManager {
    catalog_path: PathBuf,
    pub catalog: CatalogFile,
}

impl CatalogManager {
    /// Load the catalog of a library root, starting empty if there is none
    pub async fn load(library_root: &Path) -> Result<Self> {
        let catalog_path = library_root.join(CATALOG_FILE);

        let catalog = if fs::try_exists(&catalog_path).await? {
            let content = fs::read_to_string(&catalog_path).await?;
            serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!("Catalog {} is unreadable, starting fresh: {}", catalog_path.display(), e);
                CatalogFile::default()
            })
        } else {
            CatalogFile::default()
        };

        Ok(Self {
            catalog_path,
            catalog,
        })
    }

    /// Save current catalog to file
    pub async fn save(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.catalog)?;
        fs::write(&self.catalog_path, content).await?;
        Ok(())
    }
}
