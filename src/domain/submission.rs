use crate::domain::asset::UploadedAsset;
use crate::domain::records::PersistedRecord;
use crate::error::CheckoutError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Lifecycle of a single upload-then-persist attempt.
#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionState {
    Idle,
    Uploading,
    Uploaded,
    SubmittingDomain,
    Succeeded,
    RollingBack,
    RollbackSucceeded,
    RollbackQueued,
    /// The rollback delete failed and the orphan queue refused the record.
    /// The URL travels with the failure instead.
    RollbackUnrecorded,
    /// Stopped before the domain call; nothing to compensate.
    Failed,
}

impl SubmissionState {
    pub fn can_transition_to(&self, next: SubmissionState) -> bool {
        use SubmissionState::*;
        matches!(
            (self, next),
            (Idle, Uploading)
                | (Idle, SubmittingDomain)
                | (Idle, Failed)
                | (Uploading, Uploaded)
                | (Uploading, Failed)
                | (Uploaded, SubmittingDomain)
                | (SubmittingDomain, Succeeded)
                | (SubmittingDomain, RollingBack)
                | (SubmittingDomain, Failed)
                | (RollingBack, RollbackSucceeded)
                | (RollingBack, RollbackQueued)
                | (RollingBack, RollbackUnrecorded)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded
                | Self::RollbackSucceeded
                | Self::RollbackQueued
                | Self::RollbackUnrecorded
                | Self::Failed
        )
    }
}

impl fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// What happened to a replaced image after a successful update.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ReplacedAsset {
    Deleted(String),
    Queued(String),
    /// Neither deleted nor queued; the caller must keep the URL.
    Unrecorded(String),
}

#[derive(Debug, PartialEq, Clone)]
pub struct SubmissionReceipt {
    pub record: PersistedRecord,
    pub asset: Option<UploadedAsset>,
    pub replaced: Option<ReplacedAsset>,
    pub state: SubmissionState,
}

/// A failed attempt: the one error to show, and where the attempt stopped.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct SubmissionFailure {
    #[source]
    pub error: CheckoutError,
    pub state: SubmissionState,
    /// Uploaded asset that is still live and is in no orphan queue.
    pub orphan: Option<String>,
}

impl SubmissionFailure {
    pub fn user_message(&self) -> String {
        self.error.user_message()
    }
}
