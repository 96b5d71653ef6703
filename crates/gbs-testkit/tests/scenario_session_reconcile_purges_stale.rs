use gbs_runtime::reconcile_sessions;
use gbs_testkit::{FakeTransport, MemoryStore, StoreFailures};

const GB: &str = "28181";
const GB_TALK: &str = "gb_talk";
const CASCADED: &str = "gb_cascaded_forward";
const TALK_FWD: &str = "gb_talk_forward";

fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();
    store.insert_stream("A", GB);
    store.insert_stream("B", GB);
    store.insert_stream("C", GB_TALK);
    store.insert_sink("X", "B", CASCADED);
    store.insert_sink("Y", "C", TALK_FWD);
    store
}

fn live_b_and_c_with_x_under_b() -> FakeTransport {
    FakeTransport::new()
        .with_source("B", GB)
        .with_source("C", GB_TALK)
        .with_sink("B", "X", CASCADED)
}

#[tokio::test]
async fn stale_stream_and_sink_are_deleted_then_reported() {
    let store = seeded_store();
    let transport = live_b_and_c_with_x_under_b();

    let invalid = reconcile_sessions(&store, &transport).await;

    assert_eq!(invalid.stream_ids(), vec!["A"]);
    assert_eq!(invalid.sink_ids(), vec!["Y"]);

    // already gone from the store when reported
    assert_eq!(store.stream_ids(), vec!["B".to_string(), "C".to_string()]);
    assert_eq!(store.sink_ids(), vec!["X".to_string()]);
}

#[tokio::test]
async fn second_run_against_same_live_state_is_clean() {
    let store = seeded_store();
    let transport = live_b_and_c_with_x_under_b();

    let first = reconcile_sessions(&store, &transport).await;
    assert!(!first.is_empty());

    let second = reconcile_sessions(&store, &transport).await;
    assert!(second.is_empty(), "nothing left to purge: {second:?}");
}

#[tokio::test]
async fn unreachable_media_server_purges_every_persisted_session() {
    let store = seeded_store();
    let transport = live_b_and_c_with_x_under_b().failing_sources();

    let invalid = reconcile_sessions(&store, &transport).await;

    assert_eq!(invalid.stream_ids(), vec!["A", "B", "C"]);
    assert_eq!(invalid.sink_ids(), vec!["X", "Y"]);
    assert!(store.stream_ids().is_empty());
    assert!(store.sink_ids().is_empty());
    assert!(transport.sink_queries().is_empty());
}

#[tokio::test]
async fn unrecognized_protocol_source_does_not_protect_matching_stream() {
    let store = MemoryStore::new();
    store.insert_stream("S1", GB);
    store.insert_sink("K1", "S1", CASCADED);

    // same id live, but owned by another subsystem
    let transport = FakeTransport::new()
        .with_source("S1", "rtmp")
        .with_sink("S1", "K1", CASCADED);

    let invalid = reconcile_sessions(&store, &transport).await;

    assert_eq!(invalid.stream_ids(), vec!["S1"]);
    assert_eq!(invalid.sink_ids(), vec!["K1"]);
    // ignored sources are never asked for sinks
    assert!(transport.sink_queries().is_empty());
}

#[tokio::test]
async fn unrecognized_sink_protocol_does_not_protect_sink() {
    let store = MemoryStore::new();
    store.insert_stream("B", GB);
    store.insert_sink("X", "B", CASCADED);

    let transport = FakeTransport::new()
        .with_source("B", GB)
        .with_sink("B", "X", "rtsp_push");

    let invalid = reconcile_sessions(&store, &transport).await;
    assert!(invalid.streams.is_empty());
    assert_eq!(invalid.sink_ids(), vec!["X"]);
}

#[tokio::test]
async fn sink_query_failure_drops_only_that_source() {
    let store = MemoryStore::new();
    store.insert_stream("B", GB);
    store.insert_stream("C", GB);
    store.insert_sink("X", "B", CASCADED);
    store.insert_sink("Y", "C", CASCADED);

    let transport = FakeTransport::new()
        .with_source("B", GB)
        .with_source("C", GB)
        .with_sink("B", "X", CASCADED)
        .with_sink("C", "Y", CASCADED)
        .failing_sinks_for("B");

    let invalid = reconcile_sessions(&store, &transport).await;

    // B itself is still live; only its sinks went unconfirmed
    assert!(invalid.streams.is_empty());
    assert_eq!(invalid.sink_ids(), vec!["X"]);
    assert_eq!(transport.sink_queries(), vec!["B".to_string(), "C".to_string()]);
}

#[tokio::test]
async fn stream_load_failure_aborts_without_touching_store() {
    let store = seeded_store();
    store.set_failures(StoreFailures {
        load_streams: true,
        ..Default::default()
    });
    let transport = FakeTransport::new().failing_sources();

    let invalid = reconcile_sessions(&store, &transport).await;
    assert!(invalid.is_empty());
    assert_eq!(store.stream_ids().len(), 3);
    assert_eq!(store.sink_ids().len(), 2);
}

#[tokio::test]
async fn sink_load_failure_aborts_without_touching_store() {
    let store = seeded_store();
    store.set_failures(StoreFailures {
        load_sinks: true,
        ..Default::default()
    });
    let transport = FakeTransport::new().failing_sources();

    let invalid = reconcile_sessions(&store, &transport).await;
    assert!(invalid.is_empty());
    assert_eq!(store.stream_ids().len(), 3);
}

#[tokio::test]
async fn delete_failure_still_reports_stale_records() {
    let store = seeded_store();
    store.set_failures(StoreFailures {
        delete_streams: true,
        ..Default::default()
    });
    let transport = live_b_and_c_with_x_under_b();

    let invalid = reconcile_sessions(&store, &transport).await;
    assert_eq!(invalid.stream_ids(), vec!["A"]);
    assert_eq!(invalid.sink_ids(), vec!["Y"]);

    // stream delete failed, sink delete went through
    assert_eq!(store.stream_ids().len(), 3);
    assert_eq!(store.sink_ids(), vec!["X".to_string()]);

    // next pass retries the survivor
    store.set_failures(StoreFailures::default());
    let retry = reconcile_sessions(&store, &transport).await;
    assert_eq!(retry.stream_ids(), vec!["A"]);
    assert!(retry.sinks.is_empty());
}
