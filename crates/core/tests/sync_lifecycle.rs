//! Sync controller lifecycle integration tests.
//!
//! These tests drive the controller through its public handle against a mock
//! fetcher and real SQLite stores:
//! catalog pages -> stub records -> details -> image, plus reset and resume.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_test::{assert_err, assert_ok};

use pokeindex_core::{
    create_sync_system,
    testing::{fixtures, MockFetcher, MockRecordStore},
    Fetcher, NextDownload, PokemonRecord, PokemonType, RecordStore, ResumeState,
    SqliteRecordStore, StatKind, SyncError, SyncEvent, SyncHandle, SyncOperation,
};

const PAGE_SIZE: u32 = 2;

/// Test helper owning the stores, the mock fetcher and a running controller.
struct TestHarness {
    store: Arc<SqliteRecordStore>,
    fetcher: Arc<MockFetcher>,
    handle: SyncHandle,
    controller: JoinHandle<()>,
    _temp_dir: Option<TempDir>,
}

impl TestHarness {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("pokeindex.db");
        let mut harness = Self::open(&db_path, Arc::new(MockFetcher::new()));
        harness._temp_dir = Some(temp_dir);
        harness
    }

    fn open(db_path: &Path, fetcher: Arc<MockFetcher>) -> Self {
        let store = Arc::new(SqliteRecordStore::new(db_path).expect("Failed to open store"));
        let (handle, controller) = create_sync_system(
            fixtures::sync_options(PAGE_SIZE),
            Arc::clone(&store) as Arc<dyn RecordStore>,
            Arc::clone(&fetcher) as Arc<dyn Fetcher>,
        );

        Self {
            store,
            fetcher,
            handle,
            controller: tokio::spawn(controller.run()),
            _temp_dir: None,
        }
    }

    /// Stop the controller and keep the database directory alive.
    async fn shutdown(self) -> Option<TempDir> {
        let Self {
            handle,
            controller,
            _temp_dir,
            ..
        } = self;
        drop(handle);
        controller.await.expect("controller task panicked");
        _temp_dir
    }

    async fn settle(&self) {
        settle(&self.handle).await;
    }

    fn record(&self, name: &str) -> pokeindex_core::PokemonRecord {
        self.store
            .find_by_name(name)
            .unwrap()
            .unwrap_or_else(|| panic!("record '{}' should exist", name))
    }
}

async fn settle(handle: &SyncHandle) {
    tokio::time::timeout(Duration::from_secs(5), handle.wait_idle())
        .await
        .expect("sync did not settle in time")
        .expect("controller stopped");
}

fn drain_events(rx: &mut broadcast::Receiver<SyncEvent>) -> Vec<SyncEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Three pages: bulbasaur/ivysaur, venusaur/charmander, clefairy.
async fn serve_three_pages(fetcher: &MockFetcher) {
    let p1 = fixtures::page_url(0, PAGE_SIZE);
    let p2 = fixtures::page_url(2, PAGE_SIZE);
    let p3 = fixtures::page_url(4, PAGE_SIZE);

    fetcher
        .set_json(
            &p1,
            &fixtures::catalog_page(5, Some(&p2), &[("bulbasaur", 1), ("ivysaur", 2)]),
        )
        .await;
    fetcher
        .set_json(
            &p2,
            &fixtures::catalog_page(5, Some(&p3), &[("venusaur", 3), ("charmander", 4)]),
        )
        .await;
    fetcher
        .set_json(&p3, &fixtures::catalog_page(5, None, &[("clefairy", 35)]))
        .await;
}

async fn serve_single_page(fetcher: &MockFetcher) {
    fetcher
        .set_json(
            &fixtures::page_url(0, PAGE_SIZE),
            &fixtures::catalog_page(1, None, &[("clefairy", 35)]),
        )
        .await;
}

// =============================================================================
// Catalog pagination
// =============================================================================

#[tokio::test]
async fn test_full_catalog_sync_walks_pages_in_order() {
    let harness = TestHarness::new();
    serve_three_pages(&harness.fetcher).await;
    let mut events = harness.handle.subscribe();

    harness.handle.sync_all_catalog().await;
    harness.settle().await;

    assert_eq!(
        harness.fetcher.requests().await,
        vec![
            fixtures::page_url(0, PAGE_SIZE),
            fixtures::page_url(2, PAGE_SIZE),
            fixtures::page_url(4, PAGE_SIZE),
        ]
    );
    assert_eq!(harness.store.count().unwrap(), 5);
    assert_eq!(harness.store.resume().load().unwrap(), ResumeState::complete());

    let events = drain_events(&mut events);
    let pages_saved = events
        .iter()
        .filter(|e| matches!(e, SyncEvent::PageSaved { .. }))
        .count();
    assert_eq!(pages_saved, 3);
    assert_eq!(events.last(), Some(&SyncEvent::CatalogComplete));
}

#[tokio::test]
async fn test_merge_creates_stub_with_guessed_id() {
    let harness = TestHarness::new();
    serve_single_page(&harness.fetcher).await;

    harness.handle.sync_all_catalog().await;
    harness.settle().await;

    let clefairy = harness.record("clefairy");
    assert_eq!(clefairy.numeric_id, 35);
    assert_eq!(clefairy.detail_url, fixtures::detail_url(35));
    assert!(!clefairy.is_hydrated());
    assert_eq!(clefairy.next_download(), NextDownload::Details);
}

#[tokio::test]
async fn test_sync_requests_are_idempotent_while_in_flight() {
    let harness = TestHarness::new();
    serve_single_page(&harness.fetcher).await;
    harness.fetcher.hold();

    futures::future::join_all(vec![
        harness.handle.sync_all_catalog(),
        harness.handle.sync_all_catalog(),
    ])
    .await;

    // Processed after both sync commands
    let status = harness.handle.status().await.unwrap();
    assert_eq!(status.pending_catalog_pages, 1);
    assert_eq!(status.pending_requests, 1);

    harness.fetcher.release();
    harness.settle().await;

    assert_eq!(
        harness
            .fetcher
            .request_count(&fixtures::page_url(0, PAGE_SIZE))
            .await,
        1
    );
    assert_eq!(harness.store.count().unwrap(), 1);
}

#[tokio::test]
async fn test_sync_after_completion_does_nothing() {
    let harness = TestHarness::new();
    serve_single_page(&harness.fetcher).await;

    harness.handle.sync_all_catalog().await;
    harness.settle().await;
    harness.handle.sync_all_catalog().await;
    harness.settle().await;

    assert_eq!(harness.fetcher.requests().await.len(), 1);
}

#[tokio::test]
async fn test_sync_resumes_from_checkpoint_after_restart() {
    let harness = TestHarness::new();
    serve_three_pages(&harness.fetcher).await;
    let p3 = fixtures::page_url(4, PAGE_SIZE);
    harness.fetcher.fail_url(&p3, 503).await;

    harness.handle.sync_all_catalog().await;
    harness.settle().await;
    assert_eq!(harness.store.resume().load().unwrap(), ResumeState::at_page(p3.clone()));
    assert_eq!(harness.store.count().unwrap(), 4);

    let db_path = harness
        ._temp_dir
        .as_ref()
        .map(|dir| dir.path().join("pokeindex.db"))
        .unwrap();
    let temp_dir = harness.shutdown().await;

    // Fresh process: new stores on the same file, new fetcher
    let fetcher = Arc::new(MockFetcher::new());
    serve_three_pages(&fetcher).await;
    let mut restarted = TestHarness::open(&db_path, fetcher);
    restarted._temp_dir = temp_dir;

    restarted.handle.sync_all_catalog().await;
    restarted.settle().await;

    assert_eq!(restarted.fetcher.requests().await, vec![p3]);
    assert_eq!(restarted.store.count().unwrap(), 5);
    assert_eq!(restarted.store.resume().load().unwrap(), ResumeState::complete());
}

#[tokio::test]
async fn test_page_failure_keeps_resume_state_and_allows_retry() {
    let harness = TestHarness::new();
    serve_single_page(&harness.fetcher).await;
    let p1 = fixtures::page_url(0, PAGE_SIZE);
    harness.fetcher.fail_url(&p1, 500).await;
    let mut events = harness.handle.subscribe();

    harness.handle.sync_all_catalog().await;
    harness.settle().await;

    assert_eq!(harness.store.resume().load().unwrap(), ResumeState::default());
    assert_eq!(harness.store.count().unwrap(), 0);
    assert!(drain_events(&mut events).iter().any(|e| matches!(
        e,
        SyncEvent::RequestFailed {
            operation: SyncOperation::CatalogPage,
            ..
        }
    )));

    harness.fetcher.clear_failure(&p1).await;
    harness.handle.sync_all_catalog().await;
    harness.settle().await;

    assert_eq!(harness.fetcher.request_count(&p1).await, 2);
    assert_eq!(harness.store.count().unwrap(), 1);
    assert_eq!(harness.store.resume().load().unwrap(), ResumeState::complete());
}

#[tokio::test]
async fn test_invalid_next_url_ends_catalog() {
    let harness = TestHarness::new();
    let p1 = fixtures::page_url(0, PAGE_SIZE);
    harness
        .fetcher
        .set_json(
            &p1,
            &fixtures::catalog_page(3, Some("not a url"), &[("clefairy", 35)]),
        )
        .await;

    harness.handle.sync_all_catalog().await;
    harness.settle().await;

    // The entries still merge; the unusable link is treated as the end
    assert!(harness.store.find_by_name("clefairy").unwrap().is_some());
    assert_eq!(harness.store.resume().load().unwrap(), ResumeState::complete());

    harness.handle.sync_all_catalog().await;
    harness.settle().await;
    assert_eq!(harness.fetcher.request_count(&p1).await, 1);
}

#[tokio::test]
async fn test_store_write_failure_leaves_resume_state() {
    let store = Arc::new(MockRecordStore::new().unwrap());
    let fetcher = Arc::new(MockFetcher::new());
    serve_single_page(&fetcher).await;

    let (handle, controller) = create_sync_system(
        fixtures::sync_options(PAGE_SIZE),
        Arc::clone(&store) as Arc<dyn RecordStore>,
        Arc::clone(&fetcher) as Arc<dyn Fetcher>,
    );
    tokio::spawn(controller.run());
    let mut events = handle.subscribe();

    store.set_fail_writes(true);
    handle.sync_all_catalog().await;
    settle(&handle).await;

    assert_eq!(store.resume().load().unwrap(), ResumeState::default());
    let failure = drain_events(&mut events)
        .into_iter()
        .find_map(|e| match e {
            SyncEvent::RequestFailed { error, .. } => Some(error),
            _ => None,
        })
        .expect("failure should be reported");
    assert!(failure.contains("Store write failed"));

    store.set_fail_writes(false);
    handle.sync_all_catalog().await;
    settle(&handle).await;

    assert_eq!(store.count().unwrap(), 1);
    assert_eq!(store.resume().load().unwrap(), ResumeState::complete());
}

// =============================================================================
// Per-record hydration
// =============================================================================

/// Sync one page and return the harness with a clefairy stub cached.
async fn harness_with_clefairy_stub() -> TestHarness {
    let harness = TestHarness::new();
    serve_single_page(&harness.fetcher).await;
    harness.handle.sync_all_catalog().await;
    harness.settle().await;
    harness
}

#[tokio::test]
async fn test_details_overwrite_record() {
    let harness = harness_with_clefairy_stub().await;
    harness
        .fetcher
        .set_json(&fixtures::detail_url(35), &fixtures::clefairy_details())
        .await;

    // A stale statistic must be replaced, not duplicated
    let mut stub = harness.record("clefairy");
    stub.statistics.push(pokeindex_core::StatEntry {
        kind: StatKind::Hp,
        value: 1,
    });
    harness.store.insert(stub.clone()).unwrap();
    harness.store.save_all().unwrap();

    let mut events = harness.handle.subscribe();
    harness.handle.start_next_download(&stub).await;
    harness.settle().await;

    let clefairy = harness.record("clefairy");
    assert!(clefairy.is_hydrated());
    assert_eq!(clefairy.weight_hectograms, 75);
    assert_eq!(clefairy.statistic(StatKind::Hp), Some(70));
    assert_eq!(clefairy.statistics.len(), 6);
    assert_eq!(clefairy.type_in_slot(1), Some(PokemonType::Fairy));
    assert_eq!(clefairy.image_url, Some(fixtures::image_url(35)));
    assert_eq!(clefairy.next_download(), NextDownload::Image);
    assert_eq!(
        drain_events(&mut events),
        vec![SyncEvent::DetailsSaved {
            name: "clefairy".to_string()
        }]
    );
}

#[tokio::test]
async fn test_unknown_statistic_and_type_are_ignored() {
    let harness = harness_with_clefairy_stub().await;
    harness
        .fetcher
        .set_json(
            &fixtures::detail_url(35),
            &fixtures::details(
                35,
                "clefairy",
                75,
                Some(&fixtures::image_url(35)),
                &[("hp", 70), ("luck", 99)],
                &[(1, "fairy"), (2, "shadow")],
            ),
        )
        .await;

    harness
        .handle
        .start_next_download(&harness.record("clefairy"))
        .await;
    harness.settle().await;

    let clefairy = harness.record("clefairy");
    assert!(clefairy.is_hydrated());
    assert_eq!(clefairy.statistics.len(), 1);
    assert_eq!(clefairy.types.len(), 1);
    assert_eq!(clefairy.type_in_slot(2), None);
}

#[tokio::test]
async fn test_malformed_details_leave_stub_untouched() {
    let harness = harness_with_clefairy_stub().await;
    harness
        .fetcher
        .set_response(&fixtures::detail_url(35), b"{\"id\": 35}".to_vec())
        .await;
    let mut events = harness.handle.subscribe();

    harness
        .handle
        .start_next_download(&harness.record("clefairy"))
        .await;
    harness.settle().await;

    assert!(!harness.record("clefairy").is_hydrated());
    assert!(drain_events(&mut events).iter().any(|e| matches!(
        e,
        SyncEvent::RequestFailed {
            operation: SyncOperation::Details,
            ..
        }
    )));
}

#[tokio::test]
async fn test_image_is_fetched_once() {
    let harness = harness_with_clefairy_stub().await;
    let image = fixtures::image_url(35);
    harness
        .fetcher
        .set_json(&fixtures::detail_url(35), &fixtures::clefairy_details())
        .await;
    harness
        .fetcher
        .set_response(&image, fixtures::PNG_BYTES.to_vec())
        .await;

    harness
        .handle
        .start_next_download(&harness.record("clefairy"))
        .await;
    harness.settle().await;

    harness.fetcher.hold();
    let hydrated = harness.record("clefairy");
    harness.handle.start_next_download(&hydrated).await;
    harness.handle.start_next_download(&hydrated).await;
    harness.handle.load_image(&hydrated).await;

    let status = harness.handle.status().await.unwrap();
    assert_eq!(status.pending_images, 1);

    harness.fetcher.release();
    harness.settle().await;
    assert_eq!(harness.fetcher.request_count(&image).await, 1);

    let clefairy = harness.record("clefairy");
    assert_eq!(clefairy.image_bytes.as_deref(), Some(fixtures::PNG_BYTES));
    assert_eq!(clefairy.next_download(), NextDownload::None);

    // Complete records never hit the network again
    let before = harness.fetcher.requests().await.len();
    harness.handle.start_next_download(&clefairy).await;
    harness.settle().await;
    assert_eq!(harness.fetcher.requests().await.len(), before);
}

#[tokio::test]
async fn test_empty_image_body_is_rejected() {
    let harness = harness_with_clefairy_stub().await;
    harness
        .fetcher
        .set_json(&fixtures::detail_url(35), &fixtures::clefairy_details())
        .await;
    harness
        .fetcher
        .set_response(&fixtures::image_url(35), Vec::new())
        .await;

    harness
        .handle
        .start_next_download(&harness.record("clefairy"))
        .await;
    harness.settle().await;
    harness
        .handle
        .load_image(&harness.record("clefairy"))
        .await;
    harness.settle().await;

    assert!(harness.record("clefairy").image_bytes.is_none());
}

#[tokio::test]
async fn test_download_for_unknown_record_does_nothing() {
    let harness = TestHarness::new();
    let ghost = PokemonRecord::new("missingno", fixtures::detail_url(0));

    harness.handle.start_next_download(&ghost).await;
    harness.settle().await;

    assert!(harness.fetcher.requests().await.is_empty());
}

// =============================================================================
// Reset
// =============================================================================

#[tokio::test]
async fn test_reset_clears_everything_and_restarts_from_first_page() {
    let harness = harness_with_clefairy_stub().await;
    let mut events = harness.handle.subscribe();

    assert_ok!(harness.handle.reset_all().await);

    assert_eq!(harness.store.count().unwrap(), 0);
    assert_eq!(harness.store.resume().load().unwrap(), ResumeState::default());
    assert_eq!(drain_events(&mut events), vec![SyncEvent::Reset]);

    harness.handle.sync_all_catalog().await;
    harness.settle().await;

    let p1 = fixtures::page_url(0, PAGE_SIZE);
    assert_eq!(harness.fetcher.request_count(&p1).await, 2);
    assert_eq!(harness.store.count().unwrap(), 1);
}

#[tokio::test]
async fn test_reset_discards_in_flight_results() {
    let harness = TestHarness::new();
    serve_single_page(&harness.fetcher).await;
    harness.fetcher.hold();

    harness.handle.sync_all_catalog().await;
    assert_ok!(harness.handle.reset_all().await);

    harness.fetcher.release();
    harness.settle().await;

    assert_eq!(harness.store.count().unwrap(), 0);
    assert_eq!(harness.store.resume().load().unwrap(), ResumeState::default());
}

#[tokio::test]
async fn test_sync_requested_during_stale_fetch_still_runs() {
    let harness = TestHarness::new();
    serve_single_page(&harness.fetcher).await;
    harness.fetcher.hold();

    harness.handle.sync_all_catalog().await;
    assert_ok!(harness.handle.reset_all().await);
    // Same URL is still in flight from before the reset
    harness.handle.sync_all_catalog().await;

    harness.fetcher.release();
    harness.settle().await;

    let p1 = fixtures::page_url(0, PAGE_SIZE);
    assert_eq!(harness.fetcher.request_count(&p1).await, 2);
    assert_eq!(harness.store.count().unwrap(), 1);
    assert_eq!(harness.store.resume().load().unwrap(), ResumeState::complete());
}

#[tokio::test]
async fn test_reset_failure_leaves_records_and_resume_state() {
    let store = Arc::new(MockRecordStore::new().unwrap());
    store
        .insert(PokemonRecord::new("clefairy", fixtures::detail_url(35)))
        .unwrap();
    store.save_all().unwrap();
    store.resume().save(&ResumeState::complete()).unwrap();

    let (handle, controller) = create_sync_system(
        fixtures::sync_options(PAGE_SIZE),
        Arc::clone(&store) as Arc<dyn RecordStore>,
        Arc::new(MockFetcher::new()),
    );
    tokio::spawn(controller.run());

    store.set_fail_writes(true);
    let err = assert_err!(handle.reset_all().await);
    assert!(matches!(err, SyncError::StoreWriteFailed(_)));

    // A failed reset changes nothing
    assert_eq!(store.count().unwrap(), 1);
    assert_eq!(store.resume().load().unwrap(), ResumeState::complete());

    store.set_fail_writes(false);
    assert_ok!(handle.reset_all().await);
    assert_eq!(store.count().unwrap(), 0);
    assert_eq!(store.resume().load().unwrap(), ResumeState::default());
}

#[tokio::test]
async fn test_handle_reports_stopped_controller() {
    let TestHarness {
        handle, controller, ..
    } = TestHarness::new();
    controller.abort();
    let _ = controller.await;

    let result = handle.status().await;
    assert!(matches!(result, Err(SyncError::ControllerStopped)));
}
