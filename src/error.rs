//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom della libreria.
//!
//! ## Responsabilità:
//! - Definisce `ReconcileError` per categorizzare gli errori di un'operazione
//! - Definisce `MutationError` per i fallimenti dei singoli step di mutazione
//! - Integra con `thiserror` per automatic error conversion
//!
//! ## Categorie di errori:
//! - `Configuration`: Collection richiesta o backup mancante
//! - `Mutation`: Uno step relocate/attach è fallito (soft failure per entità)
//! - `Store`: Errore del collaboratore esterno (query, relations)
//! - `Audit`: Errore di persistenza del log di audit
//! - `Io` / `Json`: Errori di I/O e serializzazione
//!
//! ## Politica:
//! Nessun retry automatico. Gli errori di mutazione sono terminali per
//! l'entità coinvolta, mai per l'intero batch.
//!
//! ## Esempio:
//! ```ignore
//! if !store.has_collection("thumbnailsBackup").await? {
//!     return Err(ReconcileError::Configuration("backup collection missing".to_string()));
//! }
//! ```

/// Result alias used across the library
pub type Result<T> = std::result::Result<T, ReconcileError>;

/// Errors surfaced by the reconciliation engine and its collaborators
#[derive(thiserror::Error, Debug)]
pub enum ReconcileError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Mutation failed: {0}")]
    Mutation(#[from] MutationError),

    #[error("Asset store error: {0}")]
    Store(String),

    #[error("Audit log error: {0}")]
    Audit(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure of a single relocate or attach call
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MutationError {
    #[error("asset {0} not found")]
    AssetNotFound(u64),

    #[error("collection '{0}' not found")]
    CollectionNotFound(String),

    #[error("target '{0}' already exists")]
    TargetExists(String),

    #[error("{0}")]
    Rejected(String),
}
