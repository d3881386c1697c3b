//! # Filename Normalizer Module
//!
//! Canonicalizzazione dei nomi file per il matching video/thumbnail.
//!
//! ## Passi (in ordine):
//! 1. Rimuove l'estensione
//! 2. Converte in minuscolo (Unicode, indipendente dal locale)
//! 3. Sostituisce gli spazi con trattini
//! 4. Sostituisce gli underscore con trattini
//!
//! Il matching è sempre per uguaglianza esatta della chiave normalizzata,
//! nessuna logica fuzzy o per sottostringa.
//!
//! ## Esempio:
//! ```
//! use thumbnail_reconciler::normalize;
//!
//! assert_eq!(normalize("My Video_01.MP4"), "my-video-01");
//! ```

use std::fmt;

/// Suffix tag appended to quarantined assets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuarantineTag {
    /// Thumbnail that was attached to a video before reconciliation
    Expired,
    /// Target-collection asset sharing the incoming thumbnail's key
    Duplicate,
    /// Target-collection asset referenced by nothing
    Unused,
}

impl QuarantineTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expired => "expired",
            Self::Duplicate => "duplicate",
            Self::Unused => "unused",
        }
    }
}

impl fmt::Display for QuarantineTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Split a filename into base and extension at the last dot.
///
/// `"clip.final.mp4"` gives `("clip.final", Some("mp4"))`, `"README"` gives
/// `("README", None)`.
pub fn split_filename(filename: &str) -> (&str, Option<&str>) {
    match filename.rfind('.') {
        Some(pos) => (&filename[..pos], Some(&filename[pos + 1..])),
        None => (filename, None),
    }
}

/// Normalized matching key of a filename
pub fn normalize(filename: &str) -> String {
    let (base, _) = split_filename(filename);
    base.to_lowercase().replace(' ', "-").replace('_', "-")
}

/// Build `<base>_<tag>_<timestamp>.<ext>` for a quarantined asset
pub fn quarantine_filename(filename: &str, tag: QuarantineTag, timestamp: &str) -> String {
    match split_filename(filename) {
        (base, Some(ext)) => format!("{}_{}_{}.{}", base, tag, timestamp, ext),
        (base, None) => format!("{}_{}_{}", base, tag, timestamp),
    }
}
