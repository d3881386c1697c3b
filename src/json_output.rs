//! # JSON Output Module
//!
//! Questo modulo gestisce le risposte strutturate in JSON del livello di trasporto.
//!
//! ## Responsabilità:
//! - Emette le risposte JSON delle operazioni (successo o fallimento)
//! - Coercizione del parametro `dryRun` debolmente tipizzato in un `bool`
//!
//! La coercizione avviene solo qui, al bordo: il core accetta esclusivamente
//! un booleano. Valore assente o non interpretabile = `true` (mai mutare).
//!
//! ## Tipi di risposta:
//! - `Reconcile`: `{ success, dryRun, matched, unmatched }`
//! - `Cleanup`: `{ success, dryRun, moved }`
//! - `Cleared`: `{ success }`
//! - `Latest` / `Log`: entry di audit
//! - `Videos`: elenco video con l'ultima entry di audit
//! - `Failure`: `{ success: false, error, message }`

use crate::audit::AuditEntry;
use crate::model::{Asset, CleanupReport, MatchedPair, ReconcileReport};
use serde::Serialize;

/// Response emitted by the command line adapter
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum JsonResponse {
    #[serde(rename_all = "camelCase")]
    Reconcile {
        success: bool,
        dry_run: bool,
        matched: Vec<MatchedPair>,
        unmatched: Vec<String>,
    },

    #[serde(rename_all = "camelCase")]
    Cleanup {
        success: bool,
        dry_run: bool,
        moved: Vec<String>,
    },

    Cleared {
        success: bool,
    },

    Latest {
        success: bool,
        entry: Option<AuditEntry>,
    },

    Log {
        success: bool,
        entries: Vec<AuditEntry>,
    },

    #[serde(rename_all = "camelCase")]
    Videos {
        success: bool,
        videos: Vec<String>,
        latest_log: Option<AuditEntry>,
    },

    Failure {
        success: bool,
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

impl JsonResponse {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string_pretty(self) {
            println!("{}", json);
        }
    }

    pub fn reconcile(report: ReconcileReport, dry_run: bool) -> Self {
        Self::Reconcile {
            success: true,
            dry_run,
            matched: report.matched,
            unmatched: report.unmatched,
        }
    }

    pub fn cleanup(report: CleanupReport, dry_run: bool) -> Self {
        Self::Cleanup {
            success: true,
            dry_run,
            moved: report.moved,
        }
    }

    pub fn cleared(success: bool) -> Self {
        Self::Cleared { success }
    }

    pub fn latest(entry: Option<AuditEntry>) -> Self {
        Self::Latest { success: true, entry }
    }

    pub fn log(entries: Vec<AuditEntry>) -> Self {
        Self::Log { success: true, entries }
    }

    pub fn videos(videos: &[Asset], latest_log: Option<AuditEntry>) -> Self {
        Self::Videos {
            success: true,
            videos: videos.iter().map(|v| v.filename.clone()).collect(),
            latest_log,
        }
    }

    /// Crea un messaggio di errore
    pub fn failure(error: impl Into<String>, message: Option<String>) -> Self {
        Self::Failure {
            success: false,
            error: error.into(),
            message,
        }
    }
}

/// Interpret a loosely-typed `dryRun` value.
///
/// Accepts `1/true/on/yes` and `0/false/off/no/""` (trimmed, any case).
/// Anything else, including an absent value, means a dry run.
pub fn coerce_dry_run(value: Option<&str>) -> bool {
    let Some(raw) = value else {
        return true;
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => true,
        "0" | "false" | "off" | "no" | "" => false,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_dry_run() {
        assert!(coerce_dry_run(None));
        assert!(coerce_dry_run(Some("true")));
        assert!(coerce_dry_run(Some(" YES ")));
        assert!(coerce_dry_run(Some("1")));
        assert!(coerce_dry_run(Some("maybe")));
        assert!(!coerce_dry_run(Some("false")));
        assert!(!coerce_dry_run(Some("Off")));
        assert!(!coerce_dry_run(Some("0")));
        assert!(!coerce_dry_run(Some("")));
    }

    #[test]
    fn test_reconcile_response_shape() {
        let report = ReconcileReport {
            matched: vec![MatchedPair::new("Clip_01.mov", "clip-01.jpg")],
            unmatched: vec![],
        };
        let value = serde_json::to_value(JsonResponse::reconcile(report, false)).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["dryRun"], false);
        assert_eq!(value["matched"][0]["thumbnail"], "clip-01.jpg");
    }

    #[test]
    fn test_failure_response_shape() {
        let value = serde_json::to_value(JsonResponse::failure(
            "Unhandled exception",
            Some("store offline".to_string()),
        ))
        .unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["error"], "Unhandled exception");
        assert_eq!(value["message"], "store offline");
    }
}
