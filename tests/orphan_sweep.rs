mod common;

use common::{FakeMediaStore, journal};
use eventify_checkout::application::sweep::{OrphanSweeper, SweepReport};
use eventify_checkout::domain::asset::{AssetKind, OrphanRecord};
use eventify_checkout::domain::ports::OrphanAssetRepository;
use eventify_checkout::infrastructure::in_memory::InMemoryOrphanRepository;
use eventify_checkout::infrastructure::json_file::JsonFileOrphanRepository;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn test_sweep_keeps_failures_and_is_idempotent() {
    let media = Arc::new(FakeMediaStore::new(journal()));
    let orphans = Arc::new(InMemoryOrphanRepository::new());
    let stuck = "https://blob.test/event/stuck.png";
    media.fail_delete_of(stuck);

    orphans
        .append(OrphanRecord::new(AssetKind::Vendor, "https://blob.test/vendor/a.png", "a.png"))
        .await
        .unwrap();
    orphans
        .append(OrphanRecord::new(AssetKind::Event, stuck, "stuck.png"))
        .await
        .unwrap();
    orphans
        .append(OrphanRecord::new(AssetKind::Feedback, "https://blob.test/feedback/c.png", "c.png"))
        .await
        .unwrap();

    let sweeper = OrphanSweeper::new(media.clone(), orphans.clone());

    let started = Instant::now();
    let first = sweeper.sweep().await.unwrap();
    assert_eq!(
        first,
        SweepReport {
            attempted: 3,
            deleted: 2,
            retained: 1
        }
    );
    // Paused between entries, not after the last.
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(200) && elapsed < Duration::from_millis(300));

    let left = orphans.pending().await.unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].url, stuck);

    media.heal_delete_of(stuck);
    let second = sweeper.sweep().await.unwrap();
    assert_eq!(second.deleted, 1);
    assert!(orphans.pending().await.unwrap().is_empty());

    // Nothing left: a third pass is a no-op.
    assert_eq!(sweeper.sweep().await.unwrap(), SweepReport::default());
    // Each entry was tried once per pass: 3 + 1 deletes.
    assert_eq!(media.deletes().len(), 4);
}

#[tokio::test]
async fn test_sweep_drains_a_durable_queue() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("orphans.json");
    let media = Arc::new(FakeMediaStore::new(journal()));

    JsonFileOrphanRepository::new(&path)
        .append(OrphanRecord::new(AssetKind::Vendor, "https://blob.test/vendor/x.png", "x.png"))
        .await
        .unwrap();

    let report = OrphanSweeper::new(media.clone(), Arc::new(JsonFileOrphanRepository::new(&path)))
        .with_pause(Duration::ZERO)
        .sweep()
        .await
        .unwrap();

    assert_eq!(report.deleted, 1);
    assert!(
        JsonFileOrphanRepository::new(&path)
            .pending()
            .await
            .unwrap()
            .is_empty()
    );
}
