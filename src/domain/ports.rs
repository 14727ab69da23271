use super::asset::{AssetFile, AssetKind, OrphanRecord, UploadedAsset};
use super::order::{OrderInitializationRequest, OrderInitializationResult};
use super::payment::{VerificationResponse, WidgetConfig, WidgetOutcome};
use super::records::PersistedRecord;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// The backend's order initialization endpoint. The only source of the
/// amount to charge.
#[async_trait]
pub trait OrderApi: Send + Sync {
    async fn initialize_order(
        &self,
        request: OrderInitializationRequest,
    ) -> Result<OrderInitializationResult>;
}

/// The backend's payment verification endpoint.
///
/// `Err` means the outcome is unknown (transport or server failure), not
/// that the payment failed.
#[async_trait]
pub trait VerificationApi: Send + Sync {
    async fn verify(&self, reference: &str) -> Result<VerificationResponse>;
}

/// The hosted payment widget, wrapped as a future instead of callbacks.
#[async_trait]
pub trait PaymentWidget: Send + Sync {
    async fn open(&self, config: WidgetConfig) -> Result<WidgetOutcome>;
}

/// Blob storage, reached through the site's image proxy routes.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn upload(
        &self,
        kind: AssetKind,
        file: &AssetFile,
        owner_id: Option<&str>,
    ) -> Result<UploadedAsset>;

    /// Must succeed when the asset is already gone.
    async fn delete(&self, kind: AssetKind, url: &str) -> Result<()>;
}

/// Backend create/update for the image-bearing records.
#[async_trait]
pub trait RecordApi: Send + Sync {
    async fn create(&self, kind: AssetKind, body: serde_json::Value) -> Result<PersistedRecord>;
    async fn update(
        &self,
        kind: AssetKind,
        id: &str,
        body: serde_json::Value,
    ) -> Result<PersistedRecord>;
}

/// Durable queue of assets whose compensating delete failed.
#[async_trait]
pub trait OrphanAssetRepository: Send + Sync {
    async fn append(&self, record: OrphanRecord) -> Result<()>;
    /// Snapshot of all queued records, oldest first.
    async fn pending(&self) -> Result<Vec<OrphanRecord>>;
    /// Removes one record. Removing an unknown id is not an error.
    async fn remove(&self, id: Uuid) -> Result<()>;
}

pub type OrderApiRef = Arc<dyn OrderApi>;
pub type VerificationApiRef = Arc<dyn VerificationApi>;
pub type PaymentWidgetRef = Arc<dyn PaymentWidget>;
pub type MediaStoreRef = Arc<dyn MediaStore>;
pub type RecordApiRef = Arc<dyn RecordApi>;
pub type OrphanRepositoryRef = Arc<dyn OrphanAssetRepository>;
