//! # File Management Module
//!
//! Questo modulo gestisce le operazioni sui file del backend filesystem.
//!
//! ## Responsabilità:
//! - Elenco dei file di una collection (una directory, non ricorsivo)
//! - Determinazione del tipo di asset dall'estensione (video vs thumbnail)
//! - Spostamento sicuro di un file con controllo del target
//!
//! ## Formati riconosciuti:
//! - **Thumbnail**: JPG, JPEG, PNG, WebP, GIF
//! - **Video**: MP4, MOV, AVI, MKV, WebM, M4V
//! - Tutto il resto è `Unspecified`
//!
//! ## Esempio:
//! ```ignore
//! let files = FileManager::list_collection(Path::new("/library/videos"))?;
//! for name in files {
//!     if FileManager::classify(Path::new(&name)) == AssetKind::Video {
//!         // candidate for matching
//!     }
//! }
//! ```

use crate::model::AssetKind;
use anyhow::Result;
use std::path::Path;
use tokio::fs;
use tracing::warn;
use walkdir::WalkDir;

/// Manages file operations and discovery
pub struct FileManager;

impl FileManager {
    /// List the filenames directly inside a collection directory.
    ///
    /// Hidden files (leading dot) and names that are not valid UTF-8 are
    /// skipped, subdirectories are ignored.
    pub fn list_collection(dir: &Path) -> Result<Vec<String>> {
        let mut files = Vec::new();

        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let Some(name) = entry.file_name().to_str() else {
                warn!("Skipping file with non UTF-8 name: {}", entry.path().display());
                continue;
            };
            if !name.starts_with('.') {
                files.push(name.to_string());
            }
        }

        files.sort();
        Ok(files)
    }

    /// Asset kind inferred from the file extension
    pub fn classify(path: &Path) -> AssetKind {
        if Self::is_video(path) {
            AssetKind::Video
        } else if Self::is_image(path) {
            AssetKind::Thumbnail
        } else {
            AssetKind::Unspecified
        }
    }

    /// Check if a file is an image usable as thumbnail
    pub fn is_image(path: &Path) -> bool {
        if let Some(ext) = path.extension() {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            matches!(ext_lower.as_str(), "jpg" | "jpeg" | "png" | "webp" | "gif")
        } else {
            false
        }
    }

    /// Check if a file is a video
    pub fn is_video(path: &Path) -> bool {
        if let Some(ext) = path.extension() {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            matches!(ext_lower.as_str(), "mp4" | "mov" | "avi" | "mkv" | "webm" | "m4v")
        } else {
            false
        }
    }

    /// Move `source` to `target`, refusing to overwrite an existing file.
    ///
    /// Falls back to copy + remove when a plain rename crosses filesystems.
    pub async fn move_file(source: &Path, target: &Path) -> Result<()> {
        if fs::try_exists(target).await? {
            return Err(anyhow::anyhow!("Target already exists: {}", target.display()));
        }

        if fs::rename(source, target).await.is_ok() {
            return Ok(());
        }

        fs::copy(source, target).await?;
        if let Err(e) = fs::remove_file(source).await {
            // Undo the copy so the asset does not exist twice
            let _ = fs::remove_file(target).await;
            return Err(e.into());
        }
        Ok(())
    }
}
