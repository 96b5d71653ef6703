use std::time::Duration;

use gbs_media::{HttpLiveTransport, LiveTransport, TransportError};
use httpmock::prelude::*;
use serde_json::json;

fn client(server: &MockServer) -> HttpLiveTransport {
    HttpLiveTransport::new(server.base_url(), Duration::from_secs(2)).expect("client")
}

#[tokio::test]
async fn lists_sources_and_sinks_from_envelope() {
    let server = MockServer::start_async().await;

    let sources = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v1/source/list");
            then.status(200).json_body(json!({
                "code": 200,
                "msg": "success",
                "data": [
                    {"id": "B", "protocol": "28181", "sink_count": 1},
                    {"id": "R", "protocol": "rtmp"}
                ]
            }));
        })
        .await;

    let sinks = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v1/sink/list")
                .json_body(json!({"source": "B"}));
            then.status(200).json_body(json!({
                "code": 200,
                "data": [{"id": "X", "source_id": "B", "protocol": "gb_cascaded_forward"}]
            }));
        })
        .await;

    let t = client(&server);
    let live = t.list_sources().await.expect("sources");
    assert_eq!(live.len(), 2);
    assert_eq!(live[0].id, "B");
    assert_eq!(live[1].protocol, "rtmp");

    let ks = t.list_sinks_of("B").await.expect("sinks");
    assert_eq!(ks.len(), 1);
    assert_eq!(ks[0].id, "X");

    sources.assert_async().await;
    sinks.assert_async().await;
}

#[tokio::test]
async fn null_data_is_an_empty_list() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v1/source/list");
            then.status(200).json_body(json!({"code": 200, "msg": "", "data": null}));
        })
        .await;

    let live = client(&server).list_sources().await.expect("sources");
    assert!(live.is_empty());
}

#[tokio::test]
async fn envelope_error_code_is_api_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v1/sink/list");
            then.status(200).json_body(json!({"code": 404, "msg": "source not found"}));
        })
        .await;

    let err = client(&server).list_sinks_of("GONE").await.unwrap_err();
    match err {
        TransportError::Api { code, message } => {
            assert_eq!(code, Some(404));
            assert_eq!(message, "source not found");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn http_failure_status_is_api_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v1/source/list");
            then.status(503).body("restarting");
        })
        .await;

    let err = client(&server).list_sources().await.unwrap_err();
    assert!(matches!(err, TransportError::Api { code: Some(503), .. }));
}

#[tokio::test]
async fn garbage_body_is_decode_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v1/source/list");
            then.status(200).body("<html>not json</html>");
        })
        .await;

    let err = client(&server).list_sources().await.unwrap_err();
    assert!(matches!(err, TransportError::Decode(_)));
}

#[tokio::test]
async fn unreachable_server_is_transport_error() {
    let t = HttpLiveTransport::new("http://127.0.0.1:1", Duration::from_millis(500)).expect("client");
    let err = t.list_sources().await.unwrap_err();
    assert!(matches!(err, TransportError::Transport(_)));
}
