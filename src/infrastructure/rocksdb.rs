use crate::domain::asset::OrphanRecord;
use crate::domain::ports::OrphanAssetRepository;
use crate::error::{CheckoutError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// Column Family holding queued orphan records, keyed by record id.
pub const CF_ORPHANS: &str = "orphans";

/// A persistent orphan queue backed by RocksDB.
///
/// Records are stored as JSON values under their 16-byte UUID key.
/// `Clone` shares the underlying `Arc<DB>`.
#[derive(Clone)]
pub struct RocksDbOrphanRepository {
    db: Arc<DB>,
}

impl RocksDbOrphanRepository {
    /// Opens or creates a RocksDB instance at `path`, creating the
    /// "orphans" column family if it is missing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_orphans = ColumnFamilyDescriptor::new(CF_ORPHANS, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf_orphans])?;

        Ok(Self { db: Arc::new(db) })
    }

    fn orphans(&self) -> Result<&ColumnFamily> {
        self.db.cf_handle(CF_ORPHANS).ok_or_else(|| {
            CheckoutError::InternalError(Box::new(std::io::Error::other(
                "Orphans column family not found",
            )))
        })
    }
}

#[async_trait]
impl OrphanAssetRepository for RocksDbOrphanRepository {
    async fn append(&self, record: OrphanRecord) -> Result<()> {
        let cf = self.orphans()?;
        let value = serde_json::to_vec(&record)?;
        self.db.put_cf(cf, record.id.as_bytes(), value)?;
        Ok(())
    }

    async fn pending(&self) -> Result<Vec<OrphanRecord>> {
        let cf = self.orphans()?;
        let mut records = Vec::new();

        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            let record: OrphanRecord = serde_json::from_slice(&value)?;
            records.push(record);
        }

        // Keys are random, so restore queue order from the timestamps.
        records.sort_by_key(|r| r.timestamp);
        Ok(records)
    }

    async fn remove(&self, id: Uuid) -> Result<()> {
        let cf = self.orphans()?;
        self.db.delete_cf(cf, id.as_bytes())?;
        Ok(())
    }
}
