//! Operator cancellation and kill deadlines.

mod common;

use std::time::Duration;

use chrono::Utc;
use common::*;
use drilljobs::testing::{MemoryStore, StoreOperation};
use drilljobs::{CancelError, CancelReason, JobStatus};

const SLOW: Duration = Duration::from_millis(100);

fn slow_logs(uids: &[&str]) -> MemoryStore {
    uids.iter()
        .fold(store_with_logs(SERVER, uids), |store, uid| store.delay(*uid, SLOW))
}

#[tokio::test]
async fn test_cancel_mid_batch_stops_further_dispatch() {
    let uids = ["A", "B", "C", "D", "E"];
    let harness = TestHarness::with_config(slow_logs(&uids), sequential_config());

    let id = harness.submit(delete_logs(&uids));
    tokio::time::sleep(Duration::from_millis(150)).await;
    harness.dispatcher.cancel(&id).unwrap();
    let dispatched_at_cancel = harness.store.dispatched_count();

    let snapshot = harness.wait(&id).await;

    assert_eq!(snapshot.status, JobStatus::Cancelled);
    assert_eq!(snapshot.progress, 1.0);
    assert!(snapshot.ended_at.is_some());
    assert_eq!(snapshot.cancel_reason, Some(CancelReason::Operator));
    assert_eq!(harness.store.dispatched_count(), dispatched_at_cancel);
    assert!(dispatched_at_cancel < uids.len());

    let message = snapshot.message.unwrap();
    assert!(message.contains("not attempted"), "message was {}", message);
    let report = snapshot.report.unwrap();
    let attempted = report
        .rows
        .iter()
        .filter(|row| row.outcome != drilljobs::record::ReportOutcome::Skipped)
        .count();
    assert_eq!(attempted, dispatched_at_cancel);
}

#[tokio::test]
async fn test_cancelled_partial_work_still_refreshes() {
    let uids = ["A", "B", "C"];
    let harness = TestHarness::with_config(slow_logs(&uids), sequential_config());
    let mut events = harness.dispatcher.hub().subscribe();

    let id = harness.submit(delete_logs(&uids));
    tokio::time::sleep(Duration::from_millis(150)).await;
    harness.dispatcher.cancel(&id).unwrap();
    let snapshot = harness.wait(&id).await;

    assert_eq!(snapshot.status, JobStatus::Cancelled);
    assert!(matches!(
        events.recv().await.unwrap(),
        drilljobs::HubEvent::Refresh(_)
    ));
}

#[tokio::test]
async fn test_kill_deadline_cancels_without_operator() {
    let uids = ["A", "B", "C", "D", "E"];
    let harness = TestHarness::with_config(slow_logs(&uids), sequential_config());

    let id = harness
        .dispatcher
        .submit_with_deadline(
            delete_logs(&uids),
            Utc::now() + chrono::Duration::milliseconds(150),
        )
        .unwrap();
    let snapshot = harness.wait(&id).await;

    assert_eq!(snapshot.status, JobStatus::Cancelled);
    assert_eq!(snapshot.cancel_reason, Some(CancelReason::Deadline));
    assert!(harness.store.dispatched_count() < uids.len());
}

#[tokio::test]
async fn test_cancelled_download_keeps_completed_pages() {
    let harness = TestHarness::new(
        MemoryStore::new(SERVER)
            .with_log("L-1", 50, 10)
            .delay("L-1", Duration::from_millis(20)),
    );

    let id = harness.submit(download_log("L-1"));
    tokio::time::sleep(Duration::from_millis(90)).await;
    harness.dispatcher.cancel(&id).unwrap();
    let snapshot = harness.wait(&id).await;

    assert_eq!(snapshot.status, JobStatus::Cancelled);
    let pages_read = harness
        .store
        .calls()
        .iter()
        .filter(|call| call.operation == StoreOperation::ReadLogPage)
        .count();
    assert!(pages_read < 50);
    let rows = snapshot.report.unwrap().attachment.unwrap();
    assert_eq!(rows.lines().count(), pages_read * 10);
}

#[tokio::test]
async fn test_cancel_errors() {
    let harness = TestHarness::new(
        store_with_logs(SERVER, &["A"]).with_object(drilljobs::StoreObject::new(well_ref("W-9"))),
    );

    assert!(matches!(
        harness.dispatcher.cancel("no-such-job"),
        Err(CancelError::NotFound(_))
    ));

    let well_job = harness.submit(delete_well("W-9"));
    assert!(matches!(
        harness.dispatcher.cancel(&well_job),
        Err(CancelError::NotCancelable { .. })
    ));

    let id = harness.submit(delete_logs(&["A"]));
    harness.wait(&id).await;
    assert!(matches!(
        harness.dispatcher.cancel(&id),
        Err(CancelError::AlreadyFinished(_))
    ));
}
