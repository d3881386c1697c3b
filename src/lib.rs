//! # Thumbnail Reconciler Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `normalizer`: Canonicalizzazione dei filename e nomi di quarantena
//! - `matcher`: Indice delle thumbnail e classificazione dei video
//! - `executor`: Sequenza di mutazioni per ogni video abbinato
//! - `sweeper`: Quarantena delle thumbnail non referenziate
//! - `audit`: Log di audit limitato (file JSON o memoria)
//! - `reconciler`: Orchestratore principale
//! - `store`: Port verso i collaboratori esterni e backend fs/memoria
//! - `clock`: Sorgente di timestamp iniettabile
//! - `config`: Gestione configurazione e validazione parametri
//! - `error`: Tipi di errore custom
//! - `json_output` / `progress`: Output per il livello di trasporto
//!
//! ## Utilizzo:
//! ```ignore
//! use thumbnail_reconciler::{Config, FileAuditSink, FsAssetStore, SystemClock, ThumbnailReconciler};
//!
//! let config = Config::default();
//! let store = Arc::new(FsAssetStore::open(&config.library_root).await?);
//! let audit = Arc::new(FileAuditSink::new(&config.audit_log_path, config.audit_capacity));
//! let reconciler = ThumbnailReconciler::new(config, store, Arc::new(SystemClock), audit);
//! let report = reconciler.reconcile_all(true).await?;
//! ```

pub mod audit;
pub mod clock;
pub mod config;
pub mod error;
pub mod executor;
pub mod file_manager;
pub mod json_output;
pub mod matcher;
pub mod model;
pub mod normalizer;
pub mod progress;
pub mod reconciler;
pub mod store;
pub mod sweeper;

pub use audit::{AuditEntry, AuditSink, FileAuditSink, MemoryAuditSink};
pub use clock::{Clock, FixedClock, SequenceClock, SystemClock, TimestampScope};
pub use config::Config;
pub use error::{MutationError, ReconcileError};
pub use matcher::match_assets;
pub use model::{Asset, AssetId, AssetKind, CleanupReport, MatchOutcome, MatchedPair, ReconcileReport};
pub use normalizer::normalize;
pub use reconciler::ThumbnailReconciler;
pub use store::{AssetStore, FsAssetStore, InMemoryStore, MutationGateway, RelationIndex};
