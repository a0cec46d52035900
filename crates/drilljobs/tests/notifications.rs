//! Event delivery to observers of one or more servers.

mod common;

use common::*;
use drilljobs::{HubEvent, JobStatus, NotificationHub};

#[tokio::test]
async fn test_server_subscription_only_sees_its_server() {
    let hub = NotificationHub::new(64);
    let north = TestHarness::with_hub(store_with_logs("https://north", &["A"]), hub.clone());
    let south = TestHarness::with_hub(store_with_logs("https://south", &["A"]), hub.clone());
    let mut north_events = hub.subscribe_server("https://north");

    south.run(delete_logs(&["A"])).await;
    let id = north.submit(delete_logs(&["A"]));
    north.wait(&id).await;

    match north_events.recv().await.unwrap() {
        HubEvent::Refresh(refresh) => assert_eq!(refresh.server_url, "https://north"),
        other => panic!("expected refresh, got {:?}", other),
    }
    match north_events.recv().await.unwrap() {
        HubEvent::JobCompleted(event) => {
            assert_eq!(event.job_id, id);
            assert_eq!(event.status, JobStatus::Finished);
        }
        other => panic!("expected completion, got {:?}", other),
    }
    assert!(north_events.try_recv().is_none());
}

#[tokio::test]
async fn test_every_observer_gets_each_event_once() {
    let harness = TestHarness::new(store_with_logs(SERVER, &["A"]));
    let mut first = harness.dispatcher.hub().subscribe();
    let mut second = harness.dispatcher.hub().subscribe();

    harness.run(delete_logs(&["A"])).await;

    for events in [&mut first, &mut second] {
        assert!(matches!(events.recv().await.unwrap(), HubEvent::Refresh(_)));
        assert!(matches!(
            events.recv().await.unwrap(),
            HubEvent::JobCompleted(_)
        ));
        assert!(events.try_recv().is_err());
    }
}

#[tokio::test]
async fn test_completion_event_serializes_for_observers() {
    let harness = TestHarness::new(store_with_logs(SERVER, &["A"]));
    let mut events = harness.dispatcher.hub().subscribe();

    harness.run(delete_logs(&["A"])).await;
    let _refresh = events.recv().await.unwrap();
    let completed = events.recv().await.unwrap();

    let json = serde_json::to_value(&completed).unwrap();
    assert_eq!(json["type"], "job_completed");
    assert_eq!(json["status"], "finished");
    assert_eq!(json["kind"], "DeleteObjects");
    assert_eq!(json["result"]["success"], true);
}
