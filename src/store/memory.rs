//! In-memory asset backend.
//!
//! Implementa tutti e tre i port (`AssetStore`, `RelationIndex`,
//! `MutationGateway`) su uno stato protetto da mutex. Pensato per i test:
//! permette di iniettare fallimenti per filename o collection e conta le
//! chiamate di mutazione ricevute.

use crate::error::{MutationError, ReconcileError, Result};
use crate::model::{Asset, AssetId, AssetKind, ReferenceRecord};
use crate::store::{AssetStore, MutationGateway, RelationIndex, THUMBNAIL_FIELD};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MemoryState {
    next_id: u64,
    collections: BTreeSet<String>,
    assets: BTreeMap<AssetId, Asset>,
    /// video id -> attached thumbnail id
    attachments: BTreeMap<AssetId, AssetId>,
    extra_references: Vec<ReferenceRecord>,
    fail_relocate: HashSet<String>,
    fail_attach: HashSet<String>,
    fail_query: HashSet<String>,
    fail_references: HashSet<AssetId>,
    relocate_calls: usize,
    attach_calls: usize,
}

/// Asset backend kept entirely in memory
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<MemoryState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with the given (empty) collections
    pub fn with_collections<I, S>(collections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::new();
        for collection in collections {
            store.add_collection(collection);
        }
        store
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // A poisoned lock only means a test thread panicked mid-update
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_collection(&self, collection: impl Into<String>) {
        self.lock().collections.insert(collection.into());
    }

    /// Add an asset and return it with its freshly assigned id
    pub fn add_asset(&self, collection: &str, filename: &str, kind: AssetKind) -> Asset {
        let mut state = self.lock();
        state.next_id += 1;
        let asset = Asset::new(state.next_id, filename, collection, kind);
        state.collections.insert(collection.to_string());
        state.assets.insert(asset.id, asset.clone());
        asset
    }

    /// Attach `thumbnail` to `video` without counting it as a mutation
    pub fn set_attachment(&self, video: AssetId, thumbnail: AssetId) {
        self.lock().attachments.insert(video, thumbnail);
    }

    /// Register a reference that is not a thumbnail attachment
    pub fn add_reference(&self, source_id: AssetId, target_id: AssetId, field: &str) {
        self.lock().extra_references.push(ReferenceRecord {
            source_id,
            target_id,
            field: field.to_string(),
        });
    }

    /// Make every relocate of an asset currently named `filename` fail
    pub fn fail_relocate_of(&self, filename: &str) {
        self.lock().fail_relocate.insert(filename.to_string());
    }

    /// Make attaching any thumbnail to the video named `filename` fail
    pub fn fail_attach_to(&self, filename: &str) {
        self.lock().fail_attach.insert(filename.to_string());
    }

    /// Make queries against `collection` fault
    pub fn fail_query_of(&self, collection: &str) {
        self.lock().fail_query.insert(collection.to_string());
    }

    /// Make relation lookups for `asset_id` fault
    pub fn fail_references_of(&self, asset_id: AssetId) {
        self.lock().fail_references.insert(asset_id);
    }

    /// Total relocate and attach calls received
    pub fn mutation_calls(&self) -> usize {
        let state = self.lock();
        state.relocate_calls + state.attach_calls
    }

    pub fn asset(&self, id: AssetId) -> Option<Asset> {
        self.lock().assets.get(&id).cloned()
    }

    /// Find an asset by collection and exact filename
    pub fn find(&self, collection: &str, filename: &str) -> Option<Asset> {
        self.lock()
            .assets
            .values()
            .find(|a| a.collection == collection && a.filename == filename)
            .cloned()
    }

    /// Filenames in a collection, sorted
    pub fn filenames(&self, collection: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .lock()
            .assets
            .values()
            .filter(|a| a.collection == collection)
            .map(|a| a.filename.clone())
            .collect();
        names.sort();
        names
    }

    pub fn attachment_of(&self, video: AssetId) -> Option<AssetId> {
        self.lock().attachments.get(&video).copied()
    }
}

#[async_trait]
impl AssetStore for InMemoryStore {
    async fn query(&self, collection: &str, kind: Option<AssetKind>) -> Result<Vec<Asset>> {
        let state = self.lock();
        if state.fail_query.contains(collection) {
            return Err(ReconcileError::Store(format!("query of '{}' failed", collection)));
        }
        Ok(state
            .assets
            .values()
            .filter(|a| a.collection == collection)
            .filter(|a| kind.map_or(true, |k| a.kind == k))
            .cloned()
            .collect())
    }

    async fn has_collection(&self, collection: &str) -> Result<bool> {
        Ok(self.lock().collections.contains(collection))
    }
}

#[async_trait]
impl RelationIndex for InMemoryStore {
    async fn references_to(&self, asset_id: AssetId) -> Result<Vec<ReferenceRecord>> {
        let state = self.lock();
        if state.fail_references.contains(&asset_id) {
            return Err(ReconcileError::Store(format!("relation lookup for {} failed", asset_id)));
        }

        let mut records: Vec<ReferenceRecord> = state
            .attachments
            .iter()
            .filter(|(_, target)| **target == asset_id)
            .map(|(source, target)| ReferenceRecord {
                source_id: *source,
                target_id: *target,
                field: THUMBNAIL_FIELD.to_string(),
            })
            .collect();
        records.extend(
            state
                .extra_references
                .iter()
                .filter(|r| r.target_id == asset_id)
                .cloned(),
        );
        Ok(records)
    }

    async fn attached_thumbnails(&self, video_id: AssetId) -> Result<Vec<Asset>> {
        let state = self.lock();
        Ok(state
            .attachments
            .get(&video_id)
            .and_then(|id| state.assets.get(id))
            .cloned()
            .into_iter()
            .collect())
    }
}

#[async_trait]
impl MutationGateway for InMemoryStore {
    async fn relocate(
        &self,
        asset: &Asset,
        new_filename: Option<&str>,
        target_collection: &str,
    ) -> std::result::Result<Asset, MutationError> {
        let mut state = self.lock();
        state.relocate_calls += 1;

        let current = state
            .assets
            .get(&asset.id)
            .cloned()
            .ok_or(MutationError::AssetNotFound(asset.id.0))?;

        if state.fail_relocate.contains(&current.filename) {
            return Err(MutationError::Rejected(format!(
                "relocation of '{}' rejected",
                current.filename
            )));
        }
        if !state.collections.contains(target_collection) {
            return Err(MutationError::CollectionNotFound(target_collection.to_string()));
        }

        let filename = new_filename.unwrap_or(&current.filename).to_string();
        let clash = state
            .assets
            .values()
            .any(|a| a.id != current.id && a.collection == target_collection && a.filename == filename);
        if clash {
            return Err(MutationError::TargetExists(format!("{}/{}", target_collection, filename)));
        }

        let moved = Asset {
            filename,
            collection: target_collection.to_string(),
            ..current
        };
        state.assets.insert(moved.id, moved.clone());
        Ok(moved)
    }

    async fn attach(&self, video: &Asset, asset_id: AssetId) -> std::result::Result<(), MutationError> {
        let mut state = self.lock();
        state.attach_calls += 1;

        if state.fail_attach.contains(&video.filename) {
            return Err(MutationError::Rejected(format!(
                "video '{}' refused the thumbnail",
                video.filename
            )));
        }
        if !state.assets.contains_key(&video.id) {
            return Err(MutationError::AssetNotFound(video.id.0));
        }
        if !state.assets.contains_key(&asset_id) {
            return Err(MutationError::AssetNotFound(asset_id.0));
        }
        state.attachments.insert(video.id, asset_id);
        Ok(())
    }
}
