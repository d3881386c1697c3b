//! Filesystem asset backend.
//!
//! Ogni collection è una sottodirectory di `library_root`. Gli id degli
//! asset e le relazioni video -> thumbnail vivono nel catalogo JSON
//! (`.catalog.json`), riallineato con il disco a ogni query.

use crate::error::{MutationError, ReconcileError, Result};
use crate::file_manager::FileManager;
use crate::model::{Asset, AssetId, AssetKind, ReferenceRecord};
use crate::store::catalog::{CatalogEntry, CatalogManager};
use crate::store::{AssetStore, MutationGateway, RelationIndex, THUMBNAIL_FIELD};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Asset backend over a directory tree
#[derive(Debug)]
pub struct FsAssetStore {
    library_root: PathBuf,
    catalog: Mutex<CatalogManager>,
}

fn store_err(e: anyhow::Error) -> ReconcileError {
    ReconcileError::Store(e.to_string())
}

impl FsAssetStore {
    /// Open a library root, loading its catalog
    pub async fn open(library_root: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(library_root).await?;
        let catalog = CatalogManager::load(library_root).await.map_err(store_err)?;

        Ok(Self {
            library_root: library_root.to_path_buf(),
            catalog: Mutex::new(catalog),
        })
    }

    /// Create the directory of a collection if it does not exist yet
    pub async fn ensure_collection(&self, collection: &str) -> Result<()> {
        tokio::fs::create_dir_all(self.collection_dir(collection)).await?;
        Ok(())
    }

    pub fn library_root(&self) -> &Path {
        &self.library_root
    }

    fn collection_dir(&self, collection: &str) -> PathBuf {
        self.library_root.join(collection)
    }

    /// Rescan a collection and persist the catalog if anything changed
    async fn sync(&self, manager: &mut CatalogManager, collection: &str) -> Result<()> {
        let dir = self.collection_dir(collection);
        let on_disk = if dir.is_dir() {
            FileManager::list_collection(&dir).map_err(store_err)?
        } else {
            Vec::new()
        };

        if manager.catalog.sync_collection(collection, &on_disk) {
            debug!("Catalog updated after scanning collection '{}'", collection);
            manager.save().await.map_err(store_err)?;
        }
        Ok(())
    }
}

#[async_trait]
impl AssetStore for FsAssetStore {
    async fn query(&self, collection: &str, kind: Option<AssetKind>) -> Result<Vec<Asset>> {
        let mut manager = self.catalog.lock().await;
        self.sync(&mut manager, collection).await?;

        Ok(manager
            .catalog
            .assets
            .iter()
            .filter(|(_, e)| e.collection == collection)
            .filter_map(|(id, _)| manager.catalog.asset(*id))
            .filter(|a| kind.map_or(true, |k| a.kind == k))
            .collect())
    }

    async fn has_collection(&self, collection: &str) -> Result<bool> {
        Ok(self.collection_dir(collection).is_dir())
    }
}

#[async_trait]
impl RelationIndex for FsAssetStore {
    async fn references_to(&self, asset_id: AssetId) -> Result<Vec<ReferenceRecord>> {
        let mut manager = self.catalog.lock().await;

        // Videos deleted from disk must stop holding their thumbnail
        let source_collections: BTreeSet<String> = manager
            .catalog
            .attachments
            .iter()
            .filter(|(_, thumb)| **thumb == asset_id.0)
            .filter_map(|(video, _)| manager.catalog.assets.get(video))
            .map(|entry| entry.collection.clone())
            .collect();
        for collection in &source_collections {
            self.sync(&mut manager, collection).await?;
        }

        Ok(manager
            .catalog
            .attachments
            .iter()
            .filter(|(video, thumb)| **thumb == asset_id.0 && manager.catalog.assets.contains_key(*video))
            .map(|(video, thumb)| ReferenceRecord {
                source_id: AssetId(*video),
                target_id: AssetId(*thumb),
                field: THUMBNAIL_FIELD.to_string(),
            })
            .collect())
    }

    async fn attached_thumbnails(&self, video_id: AssetId) -> Result<Vec<Asset>> {
        let mut manager = self.catalog.lock().await;

        let Some(thumb_id) = manager.catalog.attachments.get(&video_id.0).copied() else {
            return Ok(Vec::new());
        };

        let collection = manager
            .catalog
            .assets
            .get(&thumb_id)
            .map(|entry| entry.collection.clone());
        if let Some(collection) = collection {
            self.sync(&mut manager, &collection).await?;
        }

        match manager.catalog.asset(thumb_id) {
            Some(thumb) => Ok(vec![thumb]),
            None => {
                if manager.catalog.attachments.remove(&video_id.0).is_some() {
                    warn!("Attached thumbnail {} of video {} no longer exists, detaching", thumb_id, video_id);
                    manager.save().await.map_err(store_err)?;
                }
                Ok(Vec::new())
            }
        }
    }
}

#[async_trait]
impl MutationGateway for FsAssetStore {
    async fn relocate(
        &self,
        asset: &Asset,
        new_filename: Option<&str>,
        target_collection: &str,
    ) -> std::result::Result<Asset, MutationError> {
        let mut manager = self.catalog.lock().await;

        let entry = manager
            .catalog
            .assets
            .get(&asset.id.0)
            .cloned()
            .ok_or(MutationError::AssetNotFound(asset.id.0))?;

        let target_dir = self.collection_dir(target_collection);
        if !target_dir.is_dir() {
            return Err(MutationError::CollectionNotFound(target_collection.to_string()));
        }

        let filename = new_filename.unwrap_or(&entry.filename).to_string();
        if entry.collection == target_collection && entry.filename == filename {
            debug!("Asset {} already in '{}' as {}", asset.id, target_collection, filename);
            return manager
                .catalog
                .asset(asset.id.0)
                .ok_or(MutationError::AssetNotFound(asset.id.0));
        }

        let source = self.collection_dir(&entry.collection).join(&entry.filename);
        let target = target_dir.join(&filename);
        if target.exists() {
            return Err(MutationError::TargetExists(target.display().to_string()));
        }

        FileManager::move_file(&source, &target)
            .await
            .map_err(|e| MutationError::Rejected(e.to_string()))?;

        manager.catalog.assets.insert(
            asset.id.0,
            CatalogEntry {
                filename,
                collection: target_collection.to_string(),
            },
        );
        manager
            .save()
            .await
            .map_err(|e| MutationError::Rejected(format!("file moved but catalog not saved: {}", e)))?;

        manager
            .catalog
            .asset(asset.id.0)
            .ok_or(MutationError::AssetNotFound(asset.id.0))
    }

    async fn attach(&self, video: &Asset, asset_id: AssetId) -> std::result::Result<(), MutationError> {
        let mut manager = self.catalog.lock().await;

        if !manager.catalog.assets.contains_key(&video.id.0) {
            return Err(MutationError::AssetNotFound(video.id.0));
        }
        if !manager.catalog.assets.contains_key(&asset_id.0) {
            return Err(MutationError::AssetNotFound(asset_id.0));
        }

        let previous = manager.catalog.attachments.insert(video.id.0, asset_id.0);
        if let Err(e) = manager.save().await {
            match previous {
                Some(prev) => manager.catalog.attachments.insert(video.id.0, prev),
                None => manager.catalog.attachments.remove(&video.id.0),
            };
            return Err(MutationError::Rejected(format!("catalog not saved: {}", e)));
        }
        Ok(())
    }
}
