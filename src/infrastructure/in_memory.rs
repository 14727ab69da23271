use crate::domain::asset::OrphanRecord;
use crate::domain::ports::OrphanAssetRepository;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A thread-safe in-memory orphan queue.
///
/// Uses `Arc<RwLock<Vec<OrphanRecord>>>` so clones share the same queue.
/// Nothing survives the process; suited to tests and short-lived tools.
#[derive(Default, Clone)]
pub struct InMemoryOrphanRepository {
    records: Arc<RwLock<Vec<OrphanRecord>>>,
}

impl InMemoryOrphanRepository {
    /// Creates a new, empty in-memory orphan queue.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrphanAssetRepository for InMemoryOrphanRepository {
    async fn append(&self, record: OrphanRecord) -> Result<()> {
        let mut records = self.records.write().await;
        records.push(record);
        Ok(())
    }

    async fn pending(&self) -> Result<Vec<OrphanRecord>> {
        let records = self.records.read().await;
        Ok(records.clone())
    }

    async fn remove(&self, id: Uuid) -> Result<()> {
        let mut records = self.records.write().await;
        records.retain(|r| r.id != id);
        Ok(())
    }
}
