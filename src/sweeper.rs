//! # Unused Asset Sweeper Module
//!
//! Sposta in backup le thumbnail della collection target che nessuno referenzia.
//!
//! ## Responsabilità:
//! - Interroga il `RelationIndex` per ogni asset della collection target
//! - Riporta in `moved` ogni asset non usato, anche in dry run (anteprima)
//! - Fuori dal dry run rinomina in `<base>_unused_<ts>.<ext>` e sposta in backup
//!
//! Un singolo timestamp viene catturato per l'intera invocazione (di default).
//! Il fallimento di uno spostamento viene loggato e non interrompe lo sweep.

use crate::clock::{Clock, TimestampScope};
use crate::model::Asset;
use crate::normalizer::{normalize, quarantine_filename, QuarantineTag};
use crate::store::{MutationGateway, RelationIndex};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Quarantines target-collection assets that nothing references
pub struct UnusedAssetSweeper {
    relations: Arc<dyn RelationIndex>,
    gateway: Arc<dyn MutationGateway>,
    clock: Arc<dyn Clock>,
    backup_collection: String,
    timestamps: TimestampScope,
}

impl UnusedAssetSweeper {
    pub fn new(
        relations: Arc<dyn RelationIndex>,
        gateway: Arc<dyn MutationGateway>,
        clock: Arc<dyn Clock>,
        backup_collection: impl Into<String>,
    ) -> Self {
        Self {
            relations,
            gateway,
            clock,
            backup_collection: backup_collection.into(),
            timestamps: TimestampScope::PerRun,
        }
    }

    /// Share one suffix timestamp per run (default) or take one per asset
    pub fn with_timestamps(mut self, timestamps: TimestampScope) -> Self {
        self.timestamps = timestamps;
        self
    }

    /// Sweep the given target assets and return the filenames found unused
    pub async fn sweep(&self, target_assets: &[Asset], dry_run: bool) -> Vec<String> {
        let mut moved = Vec::new();
        let run_stamp = match self.timestamps {
            TimestampScope::PerRun if !dry_run => Some(self.clock.now()),
            _ => None,
        };

        for asset in target_assets {
            debug!(
                "Processing thumbnail: original=\"{}\" normalized=\"{}\" (ID: {})",
                asset.filename,
                normalize(&asset.filename),
                asset.id
            );

            if self.is_used(asset).await {
                continue;
            }

            info!("Unused thumbnail: {} (ID: {})", asset.filename, asset.id);
            moved.push(asset.filename.clone());

            if dry_run {
                continue;
            }

            let timestamp = match &run_stamp {
                Some(stamp) => stamp.clone(),
                None => self.clock.now(),
            };
            let new_name = quarantine_filename(&asset.filename, QuarantineTag::Unused, &timestamp);
            info!("Moving unused thumbnail to backup as: {}", new_name);

            match self
                .gateway
                .relocate(asset, Some(&new_name), &self.backup_collection)
                .await
            {
                Ok(_) => info!("Successfully moved to backup: {}", new_name),
                Err(e) => error!("Failed to move thumbnail: {} Errors: {}", asset.filename, e),
            }
        }

        info!("Sweep finished. Moved={}", moved.len());
        moved
    }

    /// An asset whose references cannot be looked up counts as used
    async fn is_used(&self, asset: &Asset) -> bool {
        match self.relations.references_to(asset.id).await {
            Ok(refs) if refs.is_empty() => false,
            Ok(refs) => {
                debug!("Asset {} has {} relations", asset.id, refs.len());
                true
            }
            Err(e) => {
                error!("Relation lookup failed for {} (ID: {}), keeping it: {}", asset.filename, asset.id, e);
                true
            }
        }
    }
}
