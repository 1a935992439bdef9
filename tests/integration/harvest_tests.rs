//! Integration tests for the harvester
//!
//! These tests replay saved review pages through the snapshot source and
//! check the full collect / merge / checkpoint cycle end-to-end against a
//! store in a temporary directory.

use review_harvester::batch::BatchOrchestrator;
use review_harvester::collector::{dump_state, DelayRange, Harvester, SessionEnd};
use review_harvester::config::Config;
use review_harvester::source::SnapshotSource;
use review_harvester::state::TargetState;
use review_harvester::storage::{load_store, Checkpointer, EntityId, Record, RecordStore};
use std::path::Path;

/// Default queries with every pause disabled
fn create_test_config() -> Config {
    let mut config = Config::default();
    config.resolver.backoff_ms = 0;
    config.resolver.timeout_ms = 200;
    config.resolver.poll_interval_ms = 1;
    config.pager.pause_min_ms = 0;
    config.pager.pause_max_ms = 0;
    config.extractor.node_pause_ms = 0;
    config.extractor.settle_ms = 0;
    config.batch.delay_min_ms = 0;
    config.batch.delay_max_ms = 0;
    config
}

/// A review page in the markup the default queries expect
fn review_page(count: usize, header: Option<&str>) -> String {
    let mut html = String::from("<html><head><title>Reviews</title></head><body>");
    if let Some(header) = header {
        html.push_str(&format!("<h2 class=\"reviews-count\">{}</h2>", header));
    }
    for i in 0..count {
        html.push_str(&format!(
            r#"<div class="business-review-view">
                 <div class="business-review-view__info">
                   <div class="business-rating-badge-view" itemprop="reviewRating" itemscope itemtype="http://schema.org/Rating">
                     <meta itemprop="ratingValue" content="{rating}.0">
                   </div>
                   <span class="business-review-view__date">
                     <meta itemprop="datePublished" content="2024-02-{day:02}T09:30:00.000Z">
                     <span>{day} February</span>
                   </span>
                 </div>
               </div>"#,
            rating = i % 5 + 1,
            day = i + 1
        ));
    }
    html.push_str("</body></html>");
    html
}

fn id(raw: &str) -> EntityId {
    EntityId::new(raw).unwrap()
}

fn write_store(path: &Path, records: &[Record]) {
    std::fs::write(path, serde_json::to_string_pretty(records).unwrap()).unwrap();
}

#[tokio::test]
async fn test_single_target_five_reviews() {
    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("json").join("reviews.json");
    let source = SnapshotSource::from_html(review_page(5, None), 2);
    let harvester = Harvester::new(&create_test_config()).with_seed(1);

    let mut store = Checkpointer::load(&store_path).unwrap();
    assert!(store.records().is_empty());

    let report = harvester.harvest(&source, &id("1001"), Some(10)).await.unwrap();
    assert_eq!(report.end, SessionEnd::Exhausted);
    store.absorb(report.records);
    store.flush().unwrap();

    let persisted = load_store(&store_path).unwrap();
    assert_eq!(persisted.len(), 5);
    assert!(persisted
        .records()
        .iter()
        .all(|r| r.entity_id.as_str() == "1001"));
    assert_eq!(persisted.records()[0].timestamp, "2024-02-01T09:30:00.000Z");
    assert_eq!(persisted.records()[0].rating_value.as_deref(), Some("1.0"));
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("reviews.json");
    let source = SnapshotSource::from_html(review_page(4, None), 10);
    let harvester = Harvester::new(&create_test_config()).with_seed(2);

    for _ in 0..2 {
        let mut store = Checkpointer::load(&store_path).unwrap();
        let report = harvester.harvest(&source, &id("55"), None).await.unwrap();
        store.absorb(report.records);
        store.flush().unwrap();
    }

    assert_eq!(load_store(&store_path).unwrap().len(), 4);
}

#[tokio::test]
async fn test_limit_stops_collection() {
    let source = SnapshotSource::from_html(review_page(25, None), 4);
    let harvester = Harvester::new(&create_test_config()).with_seed(3);

    let report = harvester.harvest(&source, &id("1"), Some(10)).await.unwrap();

    assert_eq!(report.records.len(), 10);
    assert_eq!(report.end, SessionEnd::LimitReached);
    assert!(report.scroll_attempts < 30);
}

#[tokio::test]
async fn test_advertised_total_caps_collection() {
    let mut config = create_test_config();
    config.source.total_count_query = Some("h2.reviews-count".to_string());
    let source = SnapshotSource::from_html(review_page(6, Some("3 reviews")), 10);
    let harvester = Harvester::new(&config).with_seed(4);

    let report = harvester.harvest(&source, &id("1"), None).await.unwrap();

    assert_eq!(report.advertised_total, Some(3));
    assert_eq!(report.records.len(), 3);
}

#[tokio::test]
async fn test_empty_page_is_abandoned_at_stall_threshold() {
    let source = SnapshotSource::from_html(review_page(0, None), 10);
    let harvester = Harvester::new(&create_test_config()).with_seed(5);

    let report = harvester.harvest(&source, &id("1"), Some(10)).await.unwrap();

    assert!(report.records.is_empty());
    assert_eq!(report.end, SessionEnd::Stalled);
    assert_eq!(report.scroll_attempts, 11);
    assert_eq!(source.scroll_count(), 11);
}

#[tokio::test]
async fn test_scrolling_terminates_at_ceiling() {
    let mut config = create_test_config();
    config.extractor.focus_each_node = false;
    let source = SnapshotSource::from_html(review_page(3, None), 10);
    let harvester = Harvester::new(&config).with_seed(6);

    let report = harvester.harvest(&source, &id("1"), None).await.unwrap();

    assert_eq!(report.records.len(), 3);
    assert_eq!(report.end, SessionEnd::Exhausted);
    assert_eq!(report.scroll_attempts, 30);
    assert_eq!(source.scroll_count(), 30);
}

#[tokio::test]
async fn test_batch_skips_targets_already_stored() {
    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("reviews.json");
    write_store(
        &store_path,
        &[Record::new(id("A"), "2023-11-01T00:00:00.000Z", Some("4.0".to_string()))],
    );

    let source = SnapshotSource::from_html(review_page(2, None), 10);
    let harvester = Harvester::new(&create_test_config()).with_seed(7);
    let mut store = Checkpointer::load(&store_path).unwrap();

    let summary = BatchOrchestrator::new(&harvester, &source, &mut store)
        .with_seed(7)
        .run(&[id("A"), id("B")], Some(100), DelayRange::zero())
        .await
        .unwrap();

    assert_eq!(summary.outcome(&id("A")).unwrap().state, TargetState::Skipped);
    assert_eq!(summary.outcome(&id("B")).unwrap().state, TargetState::Completed);

    let persisted = load_store(&store_path).unwrap();
    assert_eq!(persisted.len(), 3);
    assert_eq!(persisted.records_for(&id("A")).count(), 1);
    assert_eq!(persisted.records_for(&id("B")).count(), 2);
}

#[tokio::test]
async fn test_batch_of_stored_target_leaves_store_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("reviews.json");
    write_store(
        &store_path,
        &[
            Record::new(id("X"), "2023-01-01T00:00:00.000Z", Some("5.0".to_string())),
            Record::new(id("X"), "2023-01-02T00:00:00.000Z", None),
            Record::new(id("X"), "2023-01-03T00:00:00.000Z", Some("3.0".to_string())),
        ],
    );
    let before = std::fs::read_to_string(&store_path).unwrap();

    let source = SnapshotSource::from_html(review_page(5, None), 10);
    let harvester = Harvester::new(&create_test_config());
    let mut store = Checkpointer::load(&store_path).unwrap();

    let summary = BatchOrchestrator::new(&harvester, &source, &mut store)
        .run(&[id("X")], Some(100), DelayRange::zero())
        .await
        .unwrap();

    assert_eq!(summary.skipped(), 1);
    assert_eq!(source.scroll_count(), 0);
    assert_eq!(std::fs::read_to_string(&store_path).unwrap(), before);
}

#[tokio::test]
async fn test_batch_isolates_failing_target() {
    let dir = tempfile::tempdir().unwrap();
    let pages = dir.path().join("pages");
    std::fs::create_dir_all(&pages).unwrap();
    std::fs::write(pages.join("A.html"), review_page(3, None)).unwrap();
    std::fs::write(pages.join("C.html"), review_page(2, None)).unwrap();
    let store_path = dir.path().join("reviews.json");

    let source = SnapshotSource::from_dir(&pages, 10);
    let harvester = Harvester::new(&create_test_config()).with_seed(8);
    let mut store = Checkpointer::load(&store_path).unwrap();

    let summary = BatchOrchestrator::new(&harvester, &source, &mut store)
        .run(&[id("A"), id("B"), id("C")], Some(100), DelayRange::zero())
        .await
        .unwrap();

    assert_eq!(summary.outcome(&id("A")).unwrap().state, TargetState::Completed);
    assert_eq!(summary.outcome(&id("B")).unwrap().state, TargetState::Failed);
    assert_eq!(summary.outcome(&id("C")).unwrap().state, TargetState::Completed);
    assert!(summary.outcome(&id("B")).unwrap().error.is_some());

    let persisted = load_store(&store_path).unwrap();
    assert_eq!(persisted.len(), 5);
    assert!(!persisted.contains_entity(&id("B")));
}

#[tokio::test]
async fn test_legacy_numeric_ids_count_as_seen() {
    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("reviews.json");
    std::fs::write(
        &store_path,
        r#"[{"ratingValue": "5.0", "timestamp": "2022-05-01T00:00:00.000Z", "entityId": 1234, "authorName": "dropped"}]"#,
    )
    .unwrap();

    let store = Checkpointer::load(&store_path).unwrap();
    assert!(store.contains_entity(&id("1234")));
}

#[test]
fn test_corrupt_store_is_surfaced() {
    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("reviews.json");
    std::fs::write(&store_path, "[{\"timestamp\": ").unwrap();

    assert!(Checkpointer::load(&store_path).is_err());
}

#[tokio::test]
async fn test_dump_state_from_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("state.json");
    let html = r#"<html><body>
        <script type="application/json" class="state-view">{"config":{"requestId":"r-1"},"reviews":[]}</script>
        </body></html>"#;
    let source = SnapshotSource::from_html(html, 10);
    let harvester = Harvester::new(&create_test_config());

    let state = dump_state(&harvester, &source, &id("77"), &output).await.unwrap();

    assert_eq!(state["config"]["requestId"], "r-1");
    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(written, state);
}
