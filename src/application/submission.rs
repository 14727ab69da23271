use crate::domain::asset::{AssetFile, AssetKind, OrphanRecord, UploadPolicy, UploadedAsset};
use crate::domain::ports::{MediaStoreRef, OrphanRepositoryRef, RecordApiRef};
use crate::domain::records::{AssetPayload, PersistedRecord};
use crate::domain::submission::{
    ReplacedAsset, SubmissionFailure, SubmissionReceipt, SubmissionState,
};
use crate::error::{CheckoutError, Result};
use tracing::{debug, error, info, instrument, warn};

/// Whether the payload creates a new record or updates an existing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionTarget {
    Create,
    Update {
        id: String,
        /// The image URL the record currently serves, if any.
        existing_asset_url: Option<String>,
    },
}

/// One upload-then-persist attempt and the state it has reached.
struct Attempt {
    kind: AssetKind,
    state: SubmissionState,
}

impl Attempt {
    fn new(kind: AssetKind) -> Self {
        Self {
            kind,
            state: SubmissionState::Idle,
        }
    }

    /// Moves to `next` if the transition is legal. An illegal move is
    /// logged and the state is left as it was.
    fn advance(&mut self, next: SubmissionState) {
        if !self.state.can_transition_to(next) {
            error!(kind = %self.kind, from = %self.state, to = %next, "illegal submission transition refused");
            return;
        }
        debug!(kind = %self.kind, from = %self.state, to = %next, "submission state");
        self.state = next;
    }

    fn fail(mut self, error: CheckoutError) -> SubmissionFailure {
        if !self.state.is_terminal() {
            self.advance(SubmissionState::Failed);
        }
        SubmissionFailure {
            error,
            state: self.state,
            orphan: None,
        }
    }
}

/// Uploads an image and persists the record that references it, undoing the
/// upload if the record cannot be saved.
///
/// Ordering within an attempt is strict: upload, then the domain call, then
/// either the rollback delete or (for a successful update) the deletion of
/// the image being replaced. A rollback delete that fails is queued in the
/// orphan repository instead of being reported.
pub struct AssetSubmitter {
    media: MediaStoreRef,
    records: RecordApiRef,
    orphans: OrphanRepositoryRef,
    policy: UploadPolicy,
}

impl AssetSubmitter {
    pub fn new(media: MediaStoreRef, records: RecordApiRef, orphans: OrphanRepositoryRef) -> Self {
        Self {
            media,
            records,
            orphans,
            policy: UploadPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: UploadPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[instrument(skip(self, payload, file), fields(kind = %P::KIND, has_file = file.is_some()))]
    pub async fn submit<P: AssetPayload>(
        &self,
        target: SubmissionTarget,
        mut payload: P,
        file: Option<AssetFile>,
    ) -> std::result::Result<SubmissionReceipt, SubmissionFailure> {
        let kind = P::KIND;
        let mut attempt = Attempt::new(kind);

        if let SubmissionTarget::Update { id, .. } = &target
            && kind.update_path(id).is_none()
        {
            return Err(attempt.fail(CheckoutError::ValidationError(format!(
                "{kind} records cannot be updated"
            ))));
        }

        if let Some(file) = &file
            && let Err(e) = self.policy.validate(file)
        {
            return Err(attempt.fail(e));
        }

        let owner_id = match &target {
            SubmissionTarget::Update { id, .. } => Some(id.as_str()),
            SubmissionTarget::Create => None,
        };

        let uploaded = match &file {
            Some(file) => {
                attempt.advance(SubmissionState::Uploading);
                match self.media.upload(kind, file, owner_id).await {
                    Ok(asset) => {
                        attempt.advance(SubmissionState::Uploaded);
                        info!(url = %asset.url, "asset uploaded, pending attachment");
                        Some(asset)
                    }
                    Err(e) => {
                        warn!(error = %e, "asset upload failed, nothing submitted");
                        return Err(attempt.fail(as_upload_error(e)));
                    }
                }
            }
            None => None,
        };

        let previous_url = match &target {
            SubmissionTarget::Update {
                existing_asset_url, ..
            } => existing_asset_url.clone(),
            SubmissionTarget::Create => None,
        };
        match &uploaded {
            Some(asset) => payload.set_asset_url(Some(asset.url.clone())),
            None if payload.asset_url().is_none() => payload.set_asset_url(previous_url.clone()),
            None => {}
        }

        let body = match serde_json::to_value(&payload) {
            Ok(body) => body,
            Err(e) => {
                let failure = self.compensate(&mut attempt, uploaded.as_ref(), e.into()).await;
                return Err(failure.unwrap_or_else(|e| attempt.fail(e)));
            }
        };

        attempt.advance(SubmissionState::SubmittingDomain);
        let result = match &target {
            SubmissionTarget::Create => self.records.create(kind, body).await,
            SubmissionTarget::Update { id, .. } => self.records.update(kind, id, body).await,
        };

        match result {
            Ok(record) => {
                attempt.advance(SubmissionState::Succeeded);
                let replaced = self
                    .release_replaced(kind, previous_url.as_deref(), uploaded.as_ref())
                    .await;
                Ok(SubmissionReceipt {
                    record,
                    asset: uploaded,
                    replaced,
                    state: attempt.state,
                })
            }
            Err(e) => {
                warn!(error = %e, "domain call failed");
                let failure = self.compensate(&mut attempt, uploaded.as_ref(), e).await;
                Err(failure.unwrap_or_else(|e| attempt.fail(e)))
            }
        }
    }

    /// Rolls back a freshly uploaded asset after a failed domain call.
    ///
    /// Returns `Ok(failure)` once the attempt reached a rollback state, or
    /// `Err(error)` when there was nothing to roll back.
    async fn compensate(
        &self,
        attempt: &mut Attempt,
        uploaded: Option<&UploadedAsset>,
        error: CheckoutError,
    ) -> std::result::Result<SubmissionFailure, CheckoutError> {
        let Some(asset) = uploaded else {
            return Err(error);
        };

        if attempt.state == SubmissionState::Uploaded {
            attempt.advance(SubmissionState::SubmittingDomain);
        }
        attempt.advance(SubmissionState::RollingBack);

        let mut orphan = None;
        let error = match self.media.delete(attempt.kind, &asset.url).await {
            Ok(()) => {
                info!(url = %asset.url, "rolled back uploaded asset");
                attempt.advance(SubmissionState::RollbackSucceeded);
                error
            }
            Err(delete_error) => {
                let rollback = CheckoutError::RollbackError {
                    url: asset.url.clone(),
                    reason: delete_error.to_string(),
                };
                warn!(error = %rollback, endpoint = attempt.kind.endpoint(), "queueing orphaned asset");
                match self
                    .queue_orphan(attempt.kind, asset.url.clone(), asset.pathname.clone())
                    .await
                {
                    Ok(()) => attempt.advance(SubmissionState::RollbackQueued),
                    Err(_) => {
                        attempt.advance(SubmissionState::RollbackUnrecorded);
                        orphan = Some(asset.url.clone());
                    }
                }
                if rollback.priority() < error.priority() {
                    rollback
                } else {
                    error
                }
            }
        };

        Ok(SubmissionFailure {
            error,
            state: attempt.state,
            orphan,
        })
    }

    /// Deletes the image an update replaced. Only called after the update
    /// succeeded.
    async fn release_replaced(
        &self,
        kind: AssetKind,
        previous_url: Option<&str>,
        uploaded: Option<&UploadedAsset>,
    ) -> Option<ReplacedAsset> {
        let (previous, new) = (previous_url?, uploaded?);
        if previous.is_empty() || previous == new.url {
            return None;
        }

        match self.media.delete(kind, previous).await {
            Ok(()) => {
                info!(url = %previous, "deleted replaced asset");
                Some(ReplacedAsset::Deleted(previous.to_string()))
            }
            Err(e) => {
                warn!(url = %previous, error = %e, "could not delete replaced asset, queueing");
                match self
                    .queue_orphan(kind, previous.to_string(), pathname_of(previous))
                    .await
                {
                    Ok(()) => Some(ReplacedAsset::Queued(previous.to_string())),
                    Err(_) => Some(ReplacedAsset::Unrecorded(previous.to_string())),
                }
            }
        }
    }

    async fn queue_orphan(&self, kind: AssetKind, url: String, pathname: String) -> Result<()> {
        let record = OrphanRecord::new(kind, url, pathname);
        self.orphans.append(record.clone()).await.inspect_err(|e| {
            error!(url = %record.url, error = %e, "failed to persist orphan record");
        })
    }
}

fn as_upload_error(error: CheckoutError) -> CheckoutError {
    match error {
        CheckoutError::UploadError(_) | CheckoutError::ValidationError(_) => error,
        other => CheckoutError::UploadError(other.to_string()),
    }
}

/// Last path segment of a blob URL, used when only the URL is known.
fn pathname_of(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    without_query
        .rsplit('/')
        .next()
        .unwrap_or(without_query)
        .to_string()
}
