//! # Asset Store Ports
//!
//! Contratti dei collaboratori esterni da cui dipende il core.
//! Il core non implementa mai questi trait, li riceve iniettati.
//!
//! ## Trait:
//! - `AssetStore`: Enumerazione degli asset in una collection
//! - `RelationIndex`: Chi referenzia un asset, quale thumbnail ha un video
//! - `MutationGateway`: Rename/spostamento di asset e assegnazione thumbnail
//!
//! ## Implementazioni:
//! - [`fs::FsAssetStore`]: Collection come sottodirectory di una root, con
//!   catalogo JSON per id e relazioni
//! - [`memory::InMemoryStore`]: Store in memoria per i test, con iniezione
//!   di fallimenti e conteggio delle mutazioni

use crate::error::{MutationError, Result};
use crate::model::{Asset, AssetId, AssetKind, ReferenceRecord};
use async_trait::async_trait;

pub mod catalog;
pub mod fs;
pub mod memory;

pub use fs::FsAssetStore;
pub use memory::InMemoryStore;

/// Field name of the single-valued thumbnail reference on a video
pub const THUMBNAIL_FIELD: &str = "thumbnail";

/// Read access to named asset collections
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Enumerate assets in a collection, optionally filtered by kind.
    /// Order is not significant.
    async fn query(&self, collection: &str, kind: Option<AssetKind>) -> Result<Vec<Asset>>;

    /// Whether the collection exists at all
    async fn has_collection(&self, collection: &str) -> Result<bool>;
}

/// Lookup of references between assets
#[async_trait]
pub trait RelationIndex: Send + Sync {
    /// Every record referencing the asset; empty means unused
    async fn references_to(&self, asset_id: AssetId) -> Result<Vec<ReferenceRecord>>;

    /// Thumbnails currently attached to a video
    async fn attached_thumbnails(&self, video_id: AssetId) -> Result<Vec<Asset>>;
}

/// Mutations applied to assets
#[async_trait]
pub trait MutationGateway: Send + Sync {
    /// Optionally rename an asset and move it into `target_collection`.
    /// Returns the asset as it looks after the move.
    async fn relocate(
        &self,
        asset: &Asset,
        new_filename: Option<&str>,
        target_collection: &str,
    ) -> std::result::Result<Asset, MutationError>;

    /// Set the video's thumbnail reference to `asset_id`, replacing any previous one
    async fn attach(&self, video: &Asset, asset_id: AssetId) -> std::result::Result<(), MutationError>;
}

