#![allow(dead_code)]

use async_trait::async_trait;
use eventify_checkout::domain::asset::{AssetFile, AssetKind, OrphanRecord, UploadedAsset};
use eventify_checkout::domain::cart::CartItem;
use eventify_checkout::domain::order::{
    Customer, OrderInitializationRequest, OrderInitializationResult, OrderItem,
};
use eventify_checkout::domain::payment::{VerificationResponse, WidgetConfig, WidgetOutcome};
use eventify_checkout::domain::ports::{
    MediaStore, OrderApi, OrphanAssetRepository, PaymentWidget, RecordApi, VerificationApi,
};
use eventify_checkout::domain::records::PersistedRecord;
use eventify_checkout::error::{CheckoutError, InitFailure, Result};
use serde_json::Value;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

/// Ordered log of side effects shared by the fakes, used to assert
/// cross-adapter ordering.
pub type Journal = Arc<Mutex<Vec<String>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().unwrap().clone()
}

pub fn cart_item(event_id: &str, tier_name: &str, price: u64, quantity: u32) -> CartItem {
    CartItem {
        event_id: event_id.to_string(),
        tier_id: format!("{event_id}-{tier_name}"),
        event_title: format!("Event {event_id}"),
        tier_name: tier_name.to_string(),
        price,
        quantity,
        max_quantity: 10,
        event_image: None,
    }
}

pub fn customer() -> Customer {
    Customer {
        first_name: "Ada".to_string(),
        last_name: "Obi".to_string(),
        email: "ada@example.com".to_string(),
        phone: "+2348000000000".to_string(),
        city: "Lagos".to_string(),
        state: "Lagos".to_string(),
        country: "Nigeria".to_string(),
    }
}

pub fn request(items: Vec<OrderItem>) -> OrderInitializationRequest {
    OrderInitializationRequest::new("ada@example.com", items, customer())
}

pub fn init(reference: &str, amount: u64) -> OrderInitializationResult {
    OrderInitializationResult {
        reference: reference.to_string(),
        amount_minor_units: amount,
    }
}

pub fn png(name: &str) -> AssetFile {
    AssetFile::new(name, "image/png", vec![0x89, b'P', b'N', b'G', 1, 2, 3])
}

/// Order backend that answers each call from a script, after an optional
/// per-call delay.
#[derive(Default)]
pub struct ScriptedOrders {
    script: Mutex<VecDeque<(Duration, std::result::Result<OrderInitializationResult, InitFailure>)>>,
    pub calls: AtomicUsize,
    pub completed: AtomicUsize,
}

impl ScriptedOrders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then_ok(self, reference: &str, amount: u64) -> Self {
        self.then_after(Duration::ZERO, Ok(init(reference, amount)))
    }

    pub fn then_after(
        self,
        delay: Duration,
        answer: std::result::Result<OrderInitializationResult, InitFailure>,
    ) -> Self {
        self.script.lock().unwrap().push_back((delay, answer));
        self
    }
}

#[async_trait]
impl OrderApi for ScriptedOrders {
    async fn initialize_order(
        &self,
        _request: OrderInitializationRequest,
    ) -> Result<OrderInitializationResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        let (delay, answer) = next.unwrap_or((
            Duration::ZERO,
            Err(InitFailure::Unavailable("script exhausted".to_string())),
        ));
        tokio::time::sleep(delay).await;
        self.completed.fetch_add(1, Ordering::SeqCst);
        answer.map_err(CheckoutError::PaymentInitError)
    }
}

/// Payment widget that records every configuration it was opened with.
#[derive(Default)]
pub struct RecordingWidget {
    pub opened: Mutex<Vec<WidgetConfig>>,
    close: bool,
}

impl RecordingWidget {
    pub fn paying() -> Self {
        Self::default()
    }

    pub fn closing() -> Self {
        Self {
            opened: Mutex::new(Vec::new()),
            close: true,
        }
    }

    pub fn opened(&self) -> Vec<WidgetConfig> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentWidget for RecordingWidget {
    async fn open(&self, config: WidgetConfig) -> Result<WidgetOutcome> {
        let reference = config.reference.clone();
        self.opened.lock().unwrap().push(config);
        if self.close {
            Ok(WidgetOutcome::Closed)
        } else {
            Ok(WidgetOutcome::Success { reference })
        }
    }
}

/// Verification backend that replays a script and keeps answering
/// `Pending` once it runs out.
#[derive(Default)]
pub struct ScriptedVerification {
    script: Mutex<VecDeque<Result<VerificationResponse>>>,
    pub calls: AtomicU32,
}

impl ScriptedVerification {
    pub fn new(script: Vec<Result<VerificationResponse>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VerificationApi for ScriptedVerification {
    async fn verify(&self, _reference: &str) -> Result<VerificationResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or(Ok(VerificationResponse::Pending))
    }
}

/// Blob store fake. Uploads get unique URLs; deletes can be made to fail
/// for chosen URLs.
pub struct FakeMediaStore {
    journal: Journal,
    uploads: AtomicUsize,
    fail_uploads: bool,
    failing_deletes: Mutex<HashSet<String>>,
    fail_all_deletes: bool,
    pub deletes: Mutex<Vec<String>>,
}

impl FakeMediaStore {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            uploads: AtomicUsize::new(0),
            fail_uploads: false,
            failing_deletes: Mutex::new(HashSet::new()),
            fail_all_deletes: false,
            deletes: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_uploads(mut self) -> Self {
        self.fail_uploads = true;
        self
    }

    pub fn failing_deletes(mut self) -> Self {
        self.fail_all_deletes = true;
        self
    }

    pub fn fail_delete_of(&self, url: &str) {
        self.failing_deletes.lock().unwrap().insert(url.to_string());
    }

    pub fn heal_delete_of(&self, url: &str) {
        self.failing_deletes.lock().unwrap().remove(url);
    }

    pub fn deletes(&self) -> Vec<String> {
        self.deletes.lock().unwrap().clone()
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaStore for FakeMediaStore {
    async fn upload(
        &self,
        kind: AssetKind,
        file: &AssetFile,
        owner_id: Option<&str>,
    ) -> Result<UploadedAsset> {
        let n = self.uploads.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_uploads {
            self.journal.lock().unwrap().push("upload failed".to_string());
            return Err(CheckoutError::UploadError("blob store unreachable".to_string()));
        }
        let pathname = format!("{kind}/{n}-{}", file.file_name);
        let url = format!("https://blob.test/{pathname}");
        self.journal.lock().unwrap().push(format!("upload {url}"));
        Ok(UploadedAsset {
            url,
            pathname,
            owner_id: owner_id.map(str::to_string),
        })
    }

    async fn delete(&self, _kind: AssetKind, url: &str) -> Result<()> {
        self.deletes.lock().unwrap().push(url.to_string());
        self.journal.lock().unwrap().push(format!("delete {url}"));
        if self.fail_all_deletes || self.failing_deletes.lock().unwrap().contains(url) {
            return Err(CheckoutError::UploadError("delete timed out".to_string()));
        }
        Ok(())
    }
}

/// Record backend fake that either persists or rejects every call.
pub struct FakeRecords {
    journal: Journal,
    reject_with: Option<u16>,
    pub bodies: Mutex<Vec<Value>>,
}

impl FakeRecords {
    pub fn accepting(journal: Journal) -> Self {
        Self {
            journal,
            reject_with: None,
            bodies: Mutex::new(Vec::new()),
        }
    }

    pub fn rejecting(journal: Journal, status: u16) -> Self {
        Self {
            journal,
            reject_with: Some(status),
            bodies: Mutex::new(Vec::new()),
        }
    }

    pub fn bodies(&self) -> Vec<Value> {
        self.bodies.lock().unwrap().clone()
    }

    fn answer(&self, entry: String, id: &str, body: Value) -> Result<PersistedRecord> {
        self.journal.lock().unwrap().push(entry);
        self.bodies.lock().unwrap().push(body.clone());
        match self.reject_with {
            Some(status) => Err(CheckoutError::DomainError {
                status: Some(status),
                message: "email already registered".to_string(),
            }),
            None => Ok(PersistedRecord {
                id: Some(id.to_string()),
                body,
            }),
        }
    }
}

#[async_trait]
impl RecordApi for FakeRecords {
    async fn create(&self, kind: AssetKind, body: Value) -> Result<PersistedRecord> {
        self.answer(format!("create {kind}"), "new-1", body)
    }

    async fn update(&self, kind: AssetKind, id: &str, body: Value) -> Result<PersistedRecord> {
        self.answer(format!("update {kind} {id}"), id, body)
    }
}

/// Orphan queue whose storage is gone: every append fails.
#[derive(Default)]
pub struct BrokenOrphans {
    pub appends: AtomicUsize,
}

#[async_trait]
impl OrphanAssetRepository for BrokenOrphans {
    async fn append(&self, _record: OrphanRecord) -> Result<()> {
        self.appends.fetch_add(1, Ordering::SeqCst);
        Err(CheckoutError::IoError(std::io::Error::other("disk full")))
    }

    async fn pending(&self) -> Result<Vec<OrphanRecord>> {
        Ok(Vec::new())
    }

    async fn remove(&self, _id: Uuid) -> Result<()> {
        Ok(())
    }
}
