//! # Clock Module
//!
//! Sorgente di timestamp iniettabile.
//!
//! ## Formati:
//! - `now()`: `YYYY-MM-DD-HHMMSS`, ordinabile e sicuro per i filesystem,
//!   usato nei suffissi dei file messi in quarantena
//! - `audit_timestamp()`: `YYYY-MM-DD HH:MM:SS`, usato nelle entry di audit

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Format used for quarantine suffixes
pub const SUFFIX_FORMAT: &str = "%Y-%m-%d-%H%M%S";

/// Format used for audit entry timestamps
pub const AUDIT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// How many units of work share one suffix timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimestampScope {
    /// `Clock::now()` is called once per video or asset
    PerUnit,
    /// `Clock::now()` is called once for the whole invocation
    PerRun,
}

pub trait Clock: Send + Sync {
    /// Timestamp for quarantine filenames
    fn now(&self) -> String;

    /// Timestamp for audit entries
    fn audit_timestamp(&self) -> String;
}

/// Wall clock in local time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> String {
        Local::now().format(SUFFIX_FORMAT).to_string()
    }

    fn audit_timestamp(&self) -> String {
        Local::now().format(AUDIT_FORMAT).to_string()
    }
}

/// Clock frozen at a single instant
#[derive(Debug, Clone)]
pub struct FixedClock {
    instant: NaiveDateTime,
}

impl FixedClock {
    pub fn new(instant: NaiveDateTime) -> Self {
        Self { instant }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> String {
        self.instant.format(SUFFIX_FORMAT).to_string()
    }

    fn audit_timestamp(&self) -> String {
        self.instant.format(AUDIT_FORMAT).to_string()
    }
}

/// Clock returning a predefined sequence of suffix timestamps.
///
/// Once the sequence is exhausted the last value repeats.
#[derive(Debug)]
pub struct SequenceClock {
    stamps: Vec<String>,
    next: AtomicUsize,
}

impl SequenceClock {
    pub fn new<I, S>(stamps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            stamps: stamps.into_iter().map(Into::into).collect(),
            next: AtomicUsize::new(0),
        }
    }

    /// Number of `now()` calls made so far
    pub fn calls(&self) -> usize {
        self.next.load(Ordering::SeqCst)
    }
}

impl Clock for SequenceClock {
    fn now(&self) -> String {
        let index = self.next.fetch_add(1, Ordering::SeqCst);
        self.stamps
            .get(index)
            .or_else(|| self.stamps.last())
            .cloned()
            .unwrap_or_default()
    }

    fn audit_timestamp(&self) -> String {
        "1970-01-01 00:00:00".to_string()
    }
}
