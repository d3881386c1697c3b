//! # Thumbnail Reconciler Orchestrator
//!
//! Facciata principale che compone matcher, executor e sweeper e scrive
//! il risultato di ogni operazione nel log di audit.
//!
//! ## Operazioni:
//! - `reconcile_all(dry_run)`: Matching video/thumbnail + mutazioni
//! - `cleanup_unused(dry_run)`: Sweep delle thumbnail non referenziate
//! - `clear_audit_log()` / `latest_audit_entry()` / `audit_entries()`
//! - `list_videos()`: Elenco dei video per la vista indice
//!
//! ## Gestione errori:
//! - Collection target o backup mancante: risultato degradato, nessun errore
//!   sollevato, log a livello error
//! - Errore di un collaboratore fuori dal ciclo per entità: propagato al
//!   chiamante, nessuna entry di audit scritta

use crate::{
    audit::{AuditEntry, AuditSink},
    clock::Clock,
    config::Config,
    error::Result,
    executor::{ExecutorCollections, ReconciliationExecutor},
    matcher::match_assets,
    model::{Asset, AssetKind, CleanupReport, ReconcileReport},
    store::{AssetStore, MutationGateway, RelationIndex},
    sweeper::UnusedAssetSweeper,
};
use std::sync::Arc;
use tracing::{error, info};

/// Orchestratore principale
pub struct ThumbnailReconciler {
    config: Config,
    store: Arc<dyn AssetStore>,
    relations: Arc<dyn RelationIndex>,
    gateway: Arc<dyn MutationGateway>,
    clock: Arc<dyn Clock>,
    audit: Arc<dyn AuditSink>,
}

impl ThumbnailReconciler {
    /// Crea l'orchestratore da un backend che implementa tutti i port
    pub fn new<B>(config: Config, backend: Arc<B>, clock: Arc<dyn Clock>, audit: Arc<dyn AuditSink>) -> Self
    where
        B: AssetStore + RelationIndex + MutationGateway + 'static,
    {
        Self::from_parts(config, backend.clone(), backend.clone(), backend, clock, audit)
    }

    /// Crea l'orchestratore con collaboratori separati
    pub fn from_parts(
        config: Config,
        store: Arc<dyn AssetStore>,
        relations: Arc<dyn RelationIndex>,
        gateway: Arc<dyn MutationGateway>,
        clock: Arc<dyn Clock>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            config,
            store,
            relations,
            gateway,
            clock,
            audit,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Match every video against the inbox and attach the unique matches
    pub async fn reconcile_all(&self, dry_run: bool) -> Result<ReconcileReport> {
        info!("Reconciliation started. DryRun={}", dry_run);

        let videos = self.list_videos().await?;
        info!("Videos found: {}", videos.len());

        let thumbnails = self.store.query(&self.config.inbox_collection, None).await?;
        info!("Thumbnails in {} found: {}", self.config.inbox_collection, thumbnails.len());

        let required = [&self.config.target_collection, &self.config.backup_collection];
        let report = match self.missing_collection(&required).await? {
            Some(missing) => {
                error!("Collection \"{}\" not found! Reporting every video as unmatched", missing);
                ReconcileReport {
                    matched: Vec::new(),
                    unmatched: videos.iter().map(|v| v.filename.clone()).collect(),
                }
            }
            None => {
                let outcomes = match_assets(&videos, &thumbnails);
                self.executor().apply(outcomes, dry_run).await
            }
        };

        info!(
            "Reconciliation finished. Matched={} Unmatched={}",
            report.matched.len(),
            report.unmatched.len()
        );

        let entry = AuditEntry::matching(self.clock.audit_timestamp(), &report, dry_run);
        self.audit.append(entry).await?;
        Ok(report)
    }

    /// Quarantine target-collection assets that nothing references
    pub async fn cleanup_unused(&self, dry_run: bool) -> Result<CleanupReport> {
        info!("Cleanup started. DryRun={}", dry_run);

        let thumbnails = self.store.query(&self.config.target_collection, None).await?;
        info!("Thumbnails found: {}", thumbnails.len());

        let report = match self.missing_collection(&[&self.config.backup_collection]).await? {
            Some(missing) => {
                error!("Collection \"{}\" not found! Nothing will be moved", missing);
                CleanupReport::default()
            }
            None => CleanupReport {
                moved: self.sweeper().sweep(&thumbnails, dry_run).await,
            },
        };

        info!("Cleanup finished. Moved={}", report.moved.len());

        let entry = AuditEntry::cleanup(self.clock.audit_timestamp(), &report, dry_run);
        self.audit.append(entry).await?;
        Ok(report)
    }

    pub async fn clear_audit_log(&self) -> Result<bool> {
        self.audit.clear().await
    }

    pub async fn latest_audit_entry(&self) -> Result<Option<AuditEntry>> {
        self.audit.latest().await
    }

    pub async fn audit_entries(&self) -> Result<Vec<AuditEntry>> {
        self.audit.all().await
    }

    /// Videos of the videos collection, sorted by filename
    pub async fn list_videos(&self) -> Result<Vec<Asset>> {
        let mut videos = self
            .store
            .query(&self.config.videos_collection, Some(AssetKind::Video))
            .await?;
        videos.sort_by(|a, b| a.filename.cmp(&b.filename).then(a.id.cmp(&b.id)));
        Ok(videos)
    }

    /// First required collection that does not exist
    async fn missing_collection(&self, handles: &[&String]) -> Result<Option<String>> {
        for handle in handles {
            if !self.store.has_collection(handle).await? {
                return Ok(Some(handle.to_string()));
            }
        }
        Ok(None)
    }

    fn executor(&self) -> ReconciliationExecutor {
        ReconciliationExecutor::new(
            self.store.clone(),
            self.relations.clone(),
            self.gateway.clone(),
            self.clock.clone(),
            ExecutorCollections {
                target: self.config.target_collection.clone(),
                backup: self.config.backup_collection.clone(),
            },
        )
        .with_timestamps(self.config.reconcile_timestamps)
    }

    fn sweeper(&self) -> UnusedAssetSweeper {
        UnusedAssetSweeper::new(
            self.relations.clone(),
            self.gateway.clone(),
            self.clock.clone(),
            self.config.backup_collection.clone(),
        )
        .with_timestamps(self.config.sweep_timestamps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{AuditRecord, FileAuditSink, MemoryAuditSink};
    use crate::clock::SequenceClock;
    use crate::model::MatchedPair;
    use crate::store::{FsAssetStore, InMemoryStore};
    use tempfile::TempDir;

    fn config() -> Config {
        Config::default()
    }

    fn library(config: &Config) -> Arc<InMemoryStore> {
        Arc::new(InMemoryStore::with_collections([
            config.videos_collection.as_str(),
            config.inbox_collection.as_str(),
            config.target_collection.as_str(),
            config.backup_collection.as_str(),
        ]))
    }

    fn reconciler(config: Config, store: &Arc<InMemoryStore>, audit: &Arc<MemoryAuditSink>) -> ThumbnailReconciler {
        ThumbnailReconciler::new(
            config,
            store.clone(),
            Arc::new(SequenceClock::new(["2025-01-29-143022"])),
            audit.clone(),
        )
    }

    #[tokio::test]
    async fn test_ambiguous_thumbnails_are_left_alone() {
        let config = config();
        let store = library(&config);
        let audit = Arc::new(MemoryAuditSink::default());
        store.add_asset(&config.videos_collection, "Trip.mp4", AssetKind::Video);
        store.add_asset(&config.inbox_collection, "trip.jpg", AssetKind::Thumbnail);
        store.add_asset(&config.inbox_collection, "TRIP.PNG", AssetKind::Thumbnail);

        let report = reconciler(config.clone(), &store, &audit)
            .reconcile_all(false)
            .await
            .unwrap();

        assert!(report.matched.is_empty());
        assert_eq!(
            report.unmatched,
            vec!["Trip.mp4 (duplicate thumbnails: trip.jpg, TRIP.PNG)".to_string()]
        );
        assert_eq!(store.mutation_calls(), 0);
        assert_eq!(store.filenames(&config.inbox_collection).len(), 2);
    }

    #[tokio::test]
    async fn test_single_match_is_attached() {
        let config = config();
        let store = library(&config);
        let audit = Arc::new(MemoryAuditSink::default());
        let video = store.add_asset(&config.videos_collection, "Clip_01.mov", AssetKind::Video);
        let thumb = store.add_asset(&config.inbox_collection, "clip-01.jpg", AssetKind::Thumbnail);

        let report = reconciler(config.clone(), &store, &audit)
            .reconcile_all(false)
            .await
            .unwrap();

        assert_eq!(report.matched, vec![MatchedPair::new("Clip_01.mov", "clip-01.jpg")]);
        assert!(report.unmatched.is_empty());
        assert_eq!(store.attachment_of(video.id), Some(thumb.id));
        assert_eq!(store.asset(thumb.id).unwrap().collection, config.target_collection);

        let latest = audit.latest().await.unwrap().unwrap();
        assert_eq!(latest.kind(), "matching");
        assert!(!latest.dry_run);
    }

    fn populate(config: &Config, store: &InMemoryStore) {
        let videos = ["Clip_01.mov", "Trip.mp4", "Lonely.mkv", "Beach Day.mp4", "a.mov"];
        for name in videos {
            store.add_asset(&config.videos_collection, name, AssetKind::Video);
        }
        for name in ["clip-01.jpg", "trip.jpg", "TRIP.PNG", "beach-day.webp", "unrelated.jpg"] {
            store.add_asset(&config.inbox_collection, name, AssetKind::Thumbnail);
        }
        store.add_asset(&config.videos_collection, "poster.jpg", AssetKind::Thumbnail);
    }

    #[tokio::test]
    async fn test_dry_run_classification_matches_live_run() {
        let config = config();

        let dry_store = library(&config);
        populate(&config, &dry_store);
        let dry_audit = Arc::new(MemoryAuditSink::default());
        let dry = reconciler(config.clone(), &dry_store, &dry_audit)
            .reconcile_all(true)
            .await
            .unwrap();
        assert_eq!(dry_store.mutation_calls(), 0);

        let live_store = library(&config);
        populate(&config, &live_store);
        let live_audit = Arc::new(MemoryAuditSink::default());
        let live = reconciler(config.clone(), &live_store, &live_audit)
            .reconcile_all(false)
            .await
            .unwrap();

        assert_eq!(dry, live);
        assert_eq!(live.matched.len() + live.unmatched.len(), 5);
        assert!(dry_audit.latest().await.unwrap().unwrap().dry_run);
    }

    #[tokio::test]
    async fn test_second_live_run_finds_inbox_empty() {
        let config = config();
        let store = library(&config);
        let audit = Arc::new(MemoryAuditSink::default());
        store.add_asset(&config.videos_collection, "Clip_01.mov", AssetKind::Video);
        store.add_asset(&config.inbox_collection, "clip-01.jpg", AssetKind::Thumbnail);
        let reconciler = reconciler(config.clone(), &store, &audit);

        let first = reconciler.reconcile_all(false).await.unwrap();
        assert_eq!(first.matched.len(), 1);
        let calls_after_first = store.mutation_calls();

        let second = reconciler.reconcile_all(false).await.unwrap();
        assert!(second.matched.is_empty());
        assert_eq!(second.unmatched, vec!["Clip_01.mov".to_string()]);
        assert_eq!(store.mutation_calls(), calls_after_first);
        assert_eq!(audit.all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_backup_degrades_without_error() {
        let config = config();
        let store = Arc::new(InMemoryStore::with_collections([
            config.videos_collection.as_str(),
            config.inbox_collection.as_str(),
            config.target_collection.as_str(),
        ]));
        let audit = Arc::new(MemoryAuditSink::default());
        store.add_asset(&config.videos_collection, "Clip_01.mov", AssetKind::Video);
        store.add_asset(&config.videos_collection, "Trip.mp4", AssetKind::Video);
        store.add_asset(&config.inbox_collection, "clip-01.jpg", AssetKind::Thumbnail);
        store.add_asset(&config.target_collection, "orphan.jpg", AssetKind::Thumbnail);
        let reconciler = reconciler(config.clone(), &store, &audit);

        let report = reconciler.reconcile_all(false).await.unwrap();
        assert!(report.matched.is_empty());
        assert_eq!(report.unmatched, vec!["Clip_01.mov".to_string(), "Trip.mp4".to_string()]);

        let cleanup = reconciler.cleanup_unused(false).await.unwrap();
        assert!(cleanup.moved.is_empty());
        assert_eq!(store.mutation_calls(), 0);
        assert_eq!(audit.all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_top_level_fault_writes_no_audit() {
        let config = config();
        let store = library(&config);
        let audit = Arc::new(MemoryAuditSink::default());
        store.add_asset(&config.videos_collection, "Clip_01.mov", AssetKind::Video);
        store.fail_query_of(&config.inbox_collection);

        let result = reconciler(config.clone(), &store, &audit).reconcile_all(true).await;
        assert!(result.is_err());
        assert!(audit.latest().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cleanup_previews_then_moves() {
        let config = config();
        let store = library(&config);
        let audit = Arc::new(MemoryAuditSink::default());
        let video = store.add_asset(&config.videos_collection, "Trip.mp4", AssetKind::Video);
        let used = store.add_asset(&config.target_collection, "trip.jpg", AssetKind::Thumbnail);
        store.add_asset(&config.target_collection, "old.jpg", AssetKind::Thumbnail);
        store.set_attachment(video.id, used.id);
        let reconciler = reconciler(config.clone(), &store, &audit);

        let preview = reconciler.cleanup_unused(true).await.unwrap();
        assert_eq!(preview.moved, vec!["old.jpg".to_string()]);
        assert!(store.find(&config.target_collection, "old.jpg").is_some());

        let live = reconciler.cleanup_unused(false).await.unwrap();
        assert_eq!(live.moved, vec!["old.jpg".to_string()]);
        assert!(store.find(&config.target_collection, "old.jpg").is_none());
        assert_eq!(
            store.filenames(&config.backup_collection),
            vec!["old_unused_2025-01-29-143022.jpg".to_string()]
        );

        match audit.latest().await.unwrap().unwrap().record {
            AuditRecord::Cleanup { moved, stats } => {
                assert_eq!(moved, vec!["old.jpg".to_string()]);
                assert_eq!(stats.moved_count, 1);
            }
            other => panic!("expected cleanup entry, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_audit_log_keeps_last_fifty() {
        let config = config();
        let store = library(&config);
        let audit = Arc::new(MemoryAuditSink::default());
        let reconciler = reconciler(config.clone(), &store, &audit);

        reconciler.reconcile_all(true).await.unwrap();
        for _ in 0..50 {
            reconciler.cleanup_unused(true).await.unwrap();
        }

        let entries = reconciler.audit_entries().await.unwrap();
        assert_eq!(entries.len(), 50);
        assert!(entries.iter().all(|e| e.kind() == "cleanup"));
        assert_eq!(reconciler.latest_audit_entry().await.unwrap().unwrap().kind(), "cleanup");

        assert!(reconciler.clear_audit_log().await.unwrap());
        assert!(reconciler.latest_audit_entry().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_filesystem_library_end_to_end() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config {
            library_root: temp_dir.path().join("library"),
            audit_log_path: temp_dir.path().join("logs").join("matching-audit.json"),
            ..Default::default()
        };

        let store = Arc::new(FsAssetStore::open(&config.library_root).await.unwrap());
        for collection in [
            &config.videos_collection,
            &config.inbox_collection,
            &config.target_collection,
            &config.backup_collection,
        ] {
            store.ensure_collection(collection).await.unwrap();
        }
        let root = config.library_root.clone();
        std::fs::write(root.join(&config.videos_collection).join("Clip_01.mov"), b"v").unwrap();
        std::fs::write(root.join(&config.inbox_collection).join("clip-01.jpg"), b"new").unwrap();
        std::fs::write(root.join(&config.target_collection).join("CLIP 01.png"), b"dup").unwrap();
        std::fs::write(root.join(&config.target_collection).join("stray.jpg"), b"s").unwrap();

        let audit = Arc::new(FileAuditSink::new(&config.audit_log_path, config.audit_capacity));
        let reconciler = ThumbnailReconciler::new(
            config.clone(),
            store,
            Arc::new(SequenceClock::new(["2025-01-29-143022"])),
            audit,
        );

        let report = reconciler.reconcile_all(false).await.unwrap();
        assert_eq!(report.matched, vec![MatchedPair::new("Clip_01.mov", "clip-01.jpg")]);

        let target = root.join(&config.target_collection);
        let backup = root.join(&config.backup_collection);
        assert!(target.join("clip-01.jpg").exists());
        assert!(backup.join("CLIP 01_duplicate_2025-01-29-143022.png").exists());

        let cleanup = reconciler.cleanup_unused(false).await.unwrap();
        assert_eq!(cleanup.moved, vec!["stray.jpg".to_string()]);
        assert!(!target.join("stray.jpg").exists());
        assert!(backup.join("stray_unused_2025-01-29-143022.jpg").exists());

        let entries = reconciler.audit_entries().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(config.audit_log_path.exists());
    }

    async fn fs_reconciler(temp_dir: &TempDir) -> (Config, ThumbnailReconciler) {
        let config = Config {
            library_root: temp_dir.path().join("library"),
            audit_log_path: temp_dir.path().join("matching-audit.json"),
            ..Default::default()
        };
        let store = Arc::new(FsAssetStore::open(&config.library_root).await.unwrap());
        for collection in [
            &config.videos_collection,
            &config.inbox_collection,
            &config.target_collection,
            &config.backup_collection,
        ] {
            store.ensure_collection(collection).await.unwrap();
        }
        let audit = Arc::new(FileAuditSink::new(&config.audit_log_path, config.audit_capacity));
        let reconciler = ThumbnailReconciler::new(
            config.clone(),
            store,
            Arc::new(SequenceClock::new(["2025-01-29-143022"])),
            audit,
        );
        (config, reconciler)
    }

    #[tokio::test]
    async fn test_filesystem_recovers_after_thumbnail_deleted_outside() {
        let temp_dir = TempDir::new().unwrap();
        let (config, reconciler) = fs_reconciler(&temp_dir).await;
        let root = config.library_root.clone();
        let inbox = root.join(&config.inbox_collection);
        let target = root.join(&config.target_collection);
        std::fs::write(root.join(&config.videos_collection).join("Clip.mov"), b"v").unwrap();
        std::fs::write(inbox.join("clip.jpg"), b"first").unwrap();

        let first = reconciler.reconcile_all(false).await.unwrap();
        assert_eq!(first.matched, vec![MatchedPair::new("Clip.mov", "clip.jpg")]);

        std::fs::remove_file(target.join("clip.jpg")).unwrap();
        std::fs::write(inbox.join("clip.png"), b"second").unwrap();

        let second = reconciler.reconcile_all(false).await.unwrap();
        assert_eq!(second.matched, vec![MatchedPair::new("Clip.mov", "clip.png")]);
        assert!(second.unmatched.is_empty());
        assert!(target.join("clip.png").exists());

        let cleanup = reconciler.cleanup_unused(true).await.unwrap();
        assert!(cleanup.moved.is_empty());
    }

    #[tokio::test]
    async fn test_filesystem_sweep_frees_thumbnail_of_deleted_video() {
        let temp_dir = TempDir::new().unwrap();
        let (config, reconciler) = fs_reconciler(&temp_dir).await;
        let root = config.library_root.clone();
        let video_path = root.join(&config.videos_collection).join("Clip.mov");
        std::fs::write(&video_path, b"v").unwrap();
        std::fs::write(root.join(&config.inbox_collection).join("clip.jpg"), b"t").unwrap();

        reconciler.reconcile_all(false).await.unwrap();
        std::fs::remove_file(&video_path).unwrap();

        let cleanup = reconciler.cleanup_unused(false).await.unwrap();
        assert_eq!(cleanup.moved, vec!["clip.jpg".to_string()]);
        assert!(root
            .join(&config.backup_collection)
            .join("clip_unused_2025-01-29-143022.jpg")
            .exists());
    }

    #[tokio::test]
    async fn test_filesystem_videos_sharing_one_thumbnail() {
        let temp_dir = TempDir::new().unwrap();
        let (config, reconciler) = fs_reconciler(&temp_dir).await;
        let root = config.library_root.clone();
        std::fs::write(root.join(&config.videos_collection).join("a.mp4"), b"v").unwrap();
        std::fs::write(root.join(&config.videos_collection).join("a.mov"), b"v").unwrap();
        std::fs::write(root.join(&config.inbox_collection).join("a.jpg"), b"t").unwrap();

        let dry = reconciler.reconcile_all(true).await.unwrap();
        let live = reconciler.reconcile_all(false).await.unwrap();

        assert_eq!(dry, live);
        assert_eq!(
            live.matched,
            vec![MatchedPair::new("a.mov", "a.jpg"), MatchedPair::new("a.mp4", "a.jpg")]
        );
        assert!(live.unmatched.is_empty());
        assert!(root.join(&config.target_collection).join("a.jpg").exists());
    }
}
