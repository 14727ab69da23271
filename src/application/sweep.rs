use crate::domain::ports::{MediaStoreRef, OrphanRepositoryRef};
use crate::error::Result;
use serde::Serialize;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

pub const DEFAULT_SWEEP_PAUSE: Duration = Duration::from_millis(100);

#[derive(Debug, Default, Serialize, PartialEq, Eq, Clone, Copy)]
pub struct SweepReport {
    pub attempted: usize,
    pub deleted: usize,
    pub retained: usize,
}

/// Best-effort cleanup of the orphan queue.
///
/// Works on a snapshot taken at the start of the pass, so each record is
/// tried at most once per pass. Records whose delete fails stay queued for
/// a later sweep.
pub struct OrphanSweeper {
    media: MediaStoreRef,
    orphans: OrphanRepositoryRef,
    pause: Duration,
}

impl OrphanSweeper {
    pub fn new(media: MediaStoreRef, orphans: OrphanRepositoryRef) -> Self {
        Self {
            media,
            orphans,
            pause: DEFAULT_SWEEP_PAUSE,
        }
    }

    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    pub async fn sweep(&self) -> Result<SweepReport> {
        let pending = self.orphans.pending().await?;
        let mut report = SweepReport::default();

        for (index, record) in pending.into_iter().enumerate() {
            if index > 0 {
                sleep(self.pause).await;
            }
            report.attempted += 1;

            match self.media.delete(record.endpoint, &record.url).await {
                Ok(()) => {
                    self.orphans.remove(record.id).await?;
                    debug!(url = %record.url, "orphan deleted");
                    report.deleted += 1;
                }
                Err(e) => {
                    warn!(url = %record.url, error = %e, "orphan delete failed, keeping for next sweep");
                    report.retained += 1;
                }
            }
        }

        info!(
            attempted = report.attempted,
            deleted = report.deleted,
            retained = report.retained,
            "orphan sweep finished"
        );
        Ok(report)
    }
}
