//! # Reconciliation Executor Module
//!
//! Applica le mutazioni per le coppie video/thumbnail trovate dal matcher.
//!
//! ## Sequenza per ogni video `Matched` (solo se non dry run):
//! 1. **Start**: cattura un timestamp per questo video
//! 2. **DetachCurrent**: sposta in backup le thumbnail attualmente assegnate
//!    come `<base>_expired_<ts>.<ext>`
//! 3. **DetectDuplicate**: cerca nella collection target un asset con la stessa
//!    chiave normalizzata e lo sposta in backup come `<base>_duplicate_<ts>.<ext>`
//! 4. **MoveNewAsset**: sposta la thumbnail dall'inbox alla collection target
//! 5. **AttachToVideo**: assegna la thumbnail al video
//!
//! ## Isolamento dei fallimenti:
//! - Ogni step restituisce un risultato esplicito
//! - Il primo fallimento interrompe solo gli step rimanenti di quel video
//! - Nessun rollback degli step già completati
//! - Il video successivo viene processato comunque
//!
//! La sequenza non è atomica: un fallimento dopo lo step 2 lascia il video
//! senza thumbnail finché una run successiva non la riassegna.

use crate::clock::{Clock, TimestampScope};
use crate::error::{MutationError, ReconcileError};
use crate::model::{Asset, MatchOutcome, MatchedPair, ReconcileReport};
use crate::normalizer::{normalize, quarantine_filename, QuarantineTag};
use crate::store::{AssetStore, MutationGateway, RelationIndex};
use std::fmt;
use std::sync::Arc;
use tracing::{error, info};

/// Steps of the per-video mutation sequence that can fail.
///
/// Start only captures the timestamp and has no variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    DetachCurrent,
    DetectDuplicate,
    MoveNewAsset,
    AttachToVideo,
}

impl Step {
    /// Reason reported in `unmatched` when this step's mutation fails
    pub fn failure_reason(&self) -> &'static str {
        match self {
            Self::DetachCurrent => "failed to backup current thumbnail",
            Self::DetectDuplicate => "failed to backup duplicate",
            Self::MoveNewAsset => "failed to move thumbnail",
            Self::AttachToVideo => "failed to assign thumbnail",
        }
    }
}

/// Why a video's sequence stopped
#[derive(Debug)]
pub enum StepFailure {
    /// A relocate or attach call was refused
    Mutation { step: Step, error: MutationError },
    /// A collaborator faulted outside of a mutation call
    Fault { step: Step, error: ReconcileError },
}

impl StepFailure {
    pub fn step(&self) -> Step {
        match self {
            Self::Mutation { step, .. } | Self::Fault { step, .. } => *step,
        }
    }

    /// Text placed in parentheses after the video filename
    pub fn reason(&self) -> String {
        match self {
            Self::Mutation { step, .. } => step.failure_reason().to_string(),
            Self::Fault { error, .. } => format!("exception: {}", error),
        }
    }
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mutation { step, error } => write!(f, "{:?}: {}", step, error),
            Self::Fault { step, error } => write!(f, "{:?}: {}", step, error),
        }
    }
}

type StepResult<T> = std::result::Result<T, StepFailure>;

/// Collections the executor moves assets between
#[derive(Debug, Clone)]
pub struct ExecutorCollections {
    pub target: String,
    pub backup: String,
}

/// Drives the mutation sequence for matched videos
pub struct ReconciliationExecutor {
    store: Arc<dyn AssetStore>,
    relations: Arc<dyn RelationIndex>,
    gateway: Arc<dyn MutationGateway>,
    clock: Arc<dyn Clock>,
    collections: ExecutorCollections,
    timestamps: TimestampScope,
}

impl ReconciliationExecutor {
    pub fn new(
        store: Arc<dyn AssetStore>,
        relations: Arc<dyn RelationIndex>,
        gateway: Arc<dyn MutationGateway>,
        clock: Arc<dyn Clock>,
        collections: ExecutorCollections,
    ) -> Self {
        Self {
            store,
            relations,
            gateway,
            clock,
            collections,
            timestamps: TimestampScope::PerUnit,
        }
    }

    /// Share one suffix timestamp per video (default) or per run
    pub fn with_timestamps(mut self, timestamps: TimestampScope) -> Self {
        self.timestamps = timestamps;
        self
    }

    /// Apply the outcomes of a matching pass.
    ///
    /// `matched.len() + unmatched.len()` always equals `outcomes.len()`.
    pub async fn apply(&self, outcomes: Vec<MatchOutcome>, dry_run: bool) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let run_stamp = match (dry_run, self.timestamps) {
            (false, TimestampScope::PerRun) => Some(self.clock.now()),
            _ => None,
        };

        for outcome in outcomes {
            let (video, thumbnail) = match outcome {
                MatchOutcome::Matched { video, thumbnail } => (video, thumbnail),
                other => {
                    if let Some(reason) = other.unmatched_reason() {
                        report.unmatched.push(reason);
                    }
                    continue;
                }
            };

            if dry_run {
                report.matched.push(MatchedPair::new(&video.filename, &thumbnail.filename));
                continue;
            }

            match self.reconcile_video(&video, &thumbnail, run_stamp.as_deref()).await {
                Ok(()) => {
                    report.matched.push(MatchedPair::new(&video.filename, &thumbnail.filename));
                }
                Err(failure) => {
                    error!("Reconciliation of video \"{}\" stopped at {}", video.filename, failure);
                    report
                        .unmatched
                        .push(format!("{} ({})", video.filename, failure.reason()));
                }
            }
        }

        report
    }

    /// Run the five steps for one video, stopping at the first failure
    async fn reconcile_video(&self, video: &Asset, thumbnail: &Asset, run_stamp: Option<&str>) -> StepResult<()> {
        let timestamp = match run_stamp {
            Some(stamp) => stamp.to_string(),
            None => self.clock.now(),
        };
        info!(
            "Reconciling video \"{}\" with thumbnail \"{}\" (timestamp {})",
            video.filename, thumbnail.filename, timestamp
        );

        self.detach_current(video, &timestamp).await?;
        self.quarantine_duplicate(thumbnail, &timestamp).await?;
        let moved = self.move_new_asset(thumbnail).await?;
        self.attach_to_video(video, &moved).await?;

        info!("Thumbnail ASSIGNED: video=\"{}\" thumbnailId={}", video.filename, moved.id);
        Ok(())
    }

    async fn detach_current(&self, video: &Asset, timestamp: &str) -> StepResult<()> {
        let step = Step::DetachCurrent;
        let current = self
            .relations
            .attached_thumbnails(video.id)
            .await
            .map_err(|error| StepFailure::Fault { step, error })?;

        if current.is_empty() {
            info!("No thumbnail currently assigned to video: {}", video.filename);
            return Ok(());
        }

        for assigned in current {
            let new_name = quarantine_filename(&assigned.filename, QuarantineTag::Expired, timestamp);
            info!(
                "Moving currently assigned thumbnail {} (ID: {}) to backup as: {}",
                assigned.filename, assigned.id, new_name
            );
            self.gateway
                .relocate(&assigned, Some(&new_name), &self.collections.backup)
                .await
                .map_err(|error| StepFailure::Mutation { step, error })?;
        }
        Ok(())
    }

    async fn quarantine_duplicate(&self, thumbnail: &Asset, timestamp: &str) -> StepResult<()> {
        let step = Step::DetectDuplicate;
        let key = normalize(&thumbnail.filename);
        let existing = self
            .store
            .query(&self.collections.target, None)
            .await
            .map_err(|error| StepFailure::Fault { step, error })?;

        let duplicate = existing
            .into_iter()
            .find(|asset| asset.id != thumbnail.id && normalize(&asset.filename) == key);

        let Some(duplicate) = duplicate else {
            info!("No duplicate file found in {} for: {}", self.collections.target, thumbnail.filename);
            return Ok(());
        };

        let new_name = quarantine_filename(&duplicate.filename, QuarantineTag::Duplicate, timestamp);
        info!(
            "Duplicate detected: existing=\"{}\" matches new=\"{}\" (normalized=\"{}\"), moving to backup as: {}",
            duplicate.filename, thumbnail.filename, key, new_name
        );
        self.gateway
            .relocate(&duplicate, Some(&new_name), &self.collections.backup)
            .await
            .map_err(|error| StepFailure::Mutation { step, error })?;
        Ok(())
    }

    async fn move_new_asset(&self, thumbnail: &Asset) -> StepResult<Asset> {
        info!("Moving thumbnail to {}: {}", self.collections.target, thumbnail.filename);
        self.gateway
            .relocate(thumbnail, None, &self.collections.target)
            .await
            .map_err(|error| StepFailure::Mutation {
                step: Step::MoveNewAsset,
                error,
            })
    }

    async fn attach_to_video(&self, video: &Asset, thumbnail: &Asset) -> StepResult<()> {
        self.gateway
            .attach(video, thumbnail.id)
            .await
            .map_err(|error| StepFailure::Mutation {
                step: Step::AttachToVideo,
                error,
            })
    }
}
