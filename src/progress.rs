//! # Progress and Summary Module
//!
//! Feedback a terminale per la modalità non JSON.
//!
//! ## Componenti principali:
//! - `ProgressManager`: Spinner `indicatif` mentre l'operazione è in corso
//! - `RunSummary`: Riepilogo leggibile del risultato di un'operazione
//!
//! ## Esempio:
//! ```ignore
//! let spinner = ProgressManager::spinner("Matching thumbnails...");
//! let report = reconciler.reconcile_all(true).await?;
//! spinner.finish_and_clear();
//! println!("{}", RunSummary::reconcile(&report, true));
//! ```

use crate::audit::{AuditEntry, AuditRecord};
use crate::model::{CleanupReport, ReconcileReport};
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;
use std::time::Duration;

/// Manages progress reporting on the terminal
pub struct ProgressManager;

impl ProgressManager {
    /// Create a spinner for indeterminate progress
    pub fn spinner(message: &str) -> ProgressBar {
        let spinner = ProgressBar::new_spinner();

        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            spinner.set_style(style);
        }

        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));

        spinner
    }
}

/// Human readable outcome of an operation
#[derive(Debug)]
pub struct RunSummary {
    title: String,
    lines: Vec<String>,
}

fn mode(dry_run: bool) -> &'static str {
    if dry_run {
        "dry run"
    } else {
        "live"
    }
}

impl RunSummary {
    pub fn reconcile(report: &ReconcileReport, dry_run: bool) -> Self {
        let mut lines = Vec::new();
        for pair in &report.matched {
            lines.push(format!("  ✅ {} -> {}", pair.video, pair.thumbnail));
        }
        for reason in &report.unmatched {
            lines.push(format!("  ❌ {}", reason));
        }

        Self {
            title: format!(
                "Matching ({}): {} matched | {} unmatched",
                mode(dry_run),
                report.matched.len(),
                report.unmatched.len()
            ),
            lines,
        }
    }

    pub fn cleanup(report: &CleanupReport, dry_run: bool) -> Self {
        Self {
            title: format!("Cleanup ({}): {} unused thumbnails", mode(dry_run), report.moved.len()),
            lines: report.moved.iter().map(|name| format!("  📦 {}", name)).collect(),
        }
    }

    pub fn audit_entry(entry: &AuditEntry) -> Self {
        let title = format!("[{}] {} ({})", entry.timestamp, entry.kind(), mode(entry.dry_run));
        let lines = match &entry.record {
            AuditRecord::Matching { stats, .. } => vec![format!(
                "  matched: {} | unmatched: {}",
                stats.matched_count, stats.unmatched_count
            )],
            AuditRecord::Cleanup { stats, .. } => vec![format!("  moved: {}", stats.moved_count)],
        };
        Self { title, lines }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)?;
        for line in &self.lines {
            write!(f, "\n{}", line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MatchedPair;

    #[test]
    fn test_reconcile_summary() {
        let report = ReconcileReport {
            matched: vec![MatchedPair::new("Clip_01.mov", "clip-01.jpg")],
            unmatched: vec!["Trip.mp4".to_string()],
        };
        let text = RunSummary::reconcile(&report, true).to_string();
        assert!(text.starts_with("Matching (dry run): 1 matched | 1 unmatched"));
        assert!(text.contains("Clip_01.mov -> clip-01.jpg"));
        assert!(text.contains("Trip.mp4"));
    }

    #[test]
    fn test_audit_entry_summary() {
        let report = CleanupReport {
            moved: vec!["a.jpg".to_string()],
        };
        let entry = AuditEntry::cleanup("2025-01-29 14:30:22", &report, false);
        let text = RunSummary::audit_entry(&entry).to_string();
        assert_eq!(text, "[2025-01-29 14:30:22] cleanup (live)\n  moved: 1");
    }
}
