//! # Data Model Module
//!
//! Tipi condivisi tra matcher, executor, sweeper e backend di storage.
//!
//! ## Strutture dati:
//! - `Asset`: Asset con identità immutabile (id) e filename/collection mutabili
//! - `AssetKind`: Video, thumbnail o non specificato
//! - `ReferenceRecord`: Record che referenzia un asset (relazione)
//! - `MatchOutcome`: Esito del matching per un singolo video
//! - `MatchedPair`, `ReconcileReport`, `CleanupReport`: Risultati delle operazioni

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(pub u64);

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Video,
    Thumbnail,
    Unspecified,
}

/// A named asset living in a collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    pub filename: String,
    pub collection: String,
    pub kind: AssetKind,
}

impl Asset {
    pub fn new(id: u64, filename: impl Into<String>, collection: impl Into<String>, kind: AssetKind) -> Self {
        Self {
            id: AssetId(id),
            filename: filename.into(),
            collection: collection.into(),
            kind,
        }
    }
}

/// A record referencing an asset, e.g. a video whose thumbnail field points at it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceRecord {
    pub source_id: AssetId,
    pub target_id: AssetId,
    pub field: String,
}

/// Classification of a single video against the thumbnail index
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    Matched { video: Asset, thumbnail: Asset },
    Ambiguous { video: Asset, candidates: Vec<String> },
    NoMatch { video: Asset },
}

impl MatchOutcome {
    pub fn video(&self) -> &Asset {
        match self {
            Self::Matched { video, .. } | Self::Ambiguous { video, .. } | Self::NoMatch { video } => video,
        }
    }

    /// Diagnostic text reported in `unmatched`, `None` for a match
    pub fn unmatched_reason(&self) -> Option<String> {
        match self {
            Self::Matched { .. } => None,
            Self::Ambiguous { video, candidates } => Some(format!(
                "{} (duplicate thumbnails: {})",
                video.filename,
                candidates.join(", ")
            )),
            Self::NoMatch { video } => Some(video.filename.clone()),
        }
    }
}

/// A video and the thumbnail that was (or would be) attached to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedPair {
    pub video: String,
    pub thumbnail: String,
}

impl MatchedPair {
    pub fn new(video: impl Into<String>, thumbnail: impl Into<String>) -> Self {
        Self {
            video: video.into(),
            thumbnail: thumbnail.into(),
        }
    }
}

/// Result of `ReconcileAll`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub matched: Vec<MatchedPair>,
    pub unmatched: Vec<String>,
}

/// Result of `CleanupUnused`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    pub moved: Vec<String>,
}
