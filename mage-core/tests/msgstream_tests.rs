//! Tests for msgstream
//! Response parsing, confirmation bookkeeping and single-shot pulls.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Value};

use mage_core::msgstream::{parse_stream_body, PendingConfirmations, StreamBody};
use mage_core::*;

type Received = Arc<Mutex<Vec<(String, Option<Value>)>>>;

fn session_client() -> (RpcClient<MockTransport>, Arc<impl EventObserver>, Received) {
    let config = ClientConfig::new("game").with_session_key("abc");
    let client = RpcClient::with_transport(config, MockTransport::new()).unwrap();

    let received: Received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();
    let observer = Arc::new(CallbackObserver::new(move |name: &str, data: Option<&Value>| {
        sink.lock().push((name.to_string(), data.cloned()));
    }));
    client.add_observer(&observer);

    (client, observer, received)
}

#[test]
fn test_polling_mode_query_values() {
    assert_eq!(PollingMode::ShortPolling.as_str(), "shortpolling");
    assert_eq!(PollingMode::LongPolling.to_string(), "longpolling");
    assert_eq!(PollingMode::default(), PollingMode::LongPolling);
}

#[test]
fn test_polling_mode_serializes_as_query_value() {
    for mode in [PollingMode::ShortPolling, PollingMode::LongPolling] {
        assert_eq!(serde_json::to_value(mode).unwrap(), json!(mode.as_str()));
    }
    let mode: PollingMode = serde_json::from_str("\"shortpolling\"").unwrap();
    assert_eq!(mode, PollingMode::ShortPolling);
}

#[test]
fn test_parse_empty_and_heartbeat() {
    assert_eq!(parse_stream_body("").unwrap(), StreamBody::Empty);
    assert_eq!(parse_stream_body("HB").unwrap(), StreamBody::Heartbeat);
}

#[test]
fn test_parse_rejects_non_objects() {
    for body in ["[1,2]", "not json", "\"HB\""] {
        let err = parse_stream_body(body).unwrap_err();
        assert_eq!(
            err,
            MageError::client("Unable to parse the received content from the message stream.")
        );
    }
}

#[test]
fn test_parse_batches() {
    let StreamBody::Messages(batches) =
        parse_stream_body(r#"{"b1":[["evt"]],"b2":"oops"}"#).unwrap()
    else {
        panic!("expected messages");
    };

    assert_eq!(batches.len(), 2);
    let b1 = batches.iter().find(|b| b.channel == "b1").unwrap();
    assert_eq!(b1.events, vec![Ok(Event::new("evt", None))]);
    let b2 = batches.iter().find(|b| b.channel == "b2").unwrap();
    assert_eq!(b2.events, vec![Err(MalformedEvent::NotAnArray)]);
}

#[test]
fn test_acknowledge_keeps_later_ids() {
    let pending = PendingConfirmations::new();
    pending.push("a".into());
    pending.push("b".into());
    let sent = pending.snapshot();
    pending.push("c".into());

    pending.acknowledge(&sent);

    assert_eq!(pending.snapshot(), vec!["c".to_string()]);
}

#[test]
fn test_acknowledge_out_of_order() {
    let pending = PendingConfirmations::new();
    pending.push("x".into());
    pending.push("y".into());

    pending.acknowledge(&["y".to_string()]);

    assert_eq!(pending.snapshot(), vec!["x".to_string()]);
}

#[test]
fn test_pull_without_session_fails_without_request() {
    let client =
        RpcClient::with_transport(ClientConfig::new("game"), MockTransport::new()).unwrap();

    let err = client.pull_events(PollingMode::ShortPolling).unwrap_err();

    assert_eq!(err, MageError::client("No session key registered."));
    assert!(client.transport().get_requests().is_empty());
}

#[test]
fn test_heartbeat_and_empty_deliver_nothing() {
    let (client, _observer, received) = session_client();
    client.transport().queue_get_body("HB");
    client.transport().queue_get_body("");

    assert_eq!(client.pull_events(PollingMode::LongPolling).unwrap(), 0);
    assert_eq!(client.pull_events(PollingMode::LongPolling).unwrap(), 0);

    assert!(received.lock().is_empty());
    assert!(client.pending_confirmations().is_empty());
}

#[test]
fn test_batch_is_confirmed_on_next_request() {
    let (client, _observer, received) = session_client();
    client.transport().queue_get_body(r#"{"batch1":[["evt"]]}"#);

    assert_eq!(client.pull_events(PollingMode::LongPolling).unwrap(), 1);
    assert_eq!(received.lock()[0], ("evt".to_string(), None));
    assert_eq!(client.pending_confirmations(), vec!["batch1".to_string()]);

    assert_eq!(client.pull_events(PollingMode::LongPolling).unwrap(), 0);

    let requests = client.transport().get_requests();
    assert_eq!(
        requests[0],
        "http://localhost:8080/msgstream?transport=longpolling&sessionKey=abc"
    );
    assert_eq!(
        requests[1],
        "http://localhost:8080/msgstream?transport=longpolling&sessionKey=abc&confirmIds=batch1"
    );
    assert!(client.pending_confirmations().is_empty());
}

#[test]
fn test_session_change_drops_pending_ids() {
    let (client, _observer, _received) = session_client();
    client.transport().queue_get_body(r#"{"batch1":[["evt"]]}"#);
    client.pull_events(PollingMode::LongPolling).unwrap();

    client.set_session("abc");
    assert_eq!(client.pending_confirmations(), vec!["batch1".to_string()]);

    client.clear_session();
    client.set_session("bob");
    assert!(client.pending_confirmations().is_empty());
    assert_eq!(
        client.msg_stream_url(PollingMode::LongPolling).unwrap(),
        "http://localhost:8080/msgstream?transport=longpolling&sessionKey=bob"
    );

    client.transport().queue_get_body(r#"{"batch2":[["evt"]]}"#);
    client.pull_events(PollingMode::LongPolling).unwrap();
    client.set_session("carol");
    assert!(client.pending_confirmations().is_empty());
}

#[test]
fn test_failed_request_keeps_pending_ids() {
    let (client, _observer, _received) = session_client();
    client.transport().queue_get_body(r#"{"batch1":[["evt"]]}"#);
    client
        .transport()
        .queue_get_error(TransportError::connector("Unable to pull events: timeout"));

    client.pull_events(PollingMode::ShortPolling).unwrap();
    let err = client.pull_events(PollingMode::ShortPolling).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Rpc);
    assert_eq!(client.pending_confirmations(), vec!["batch1".to_string()]);

    client.pull_events(PollingMode::ShortPolling).unwrap();
    let requests = client.transport().get_requests();
    assert!(requests[1].ends_with("&confirmIds=batch1"));
    assert!(requests[2].ends_with("&confirmIds=batch1"));
    assert!(client.pending_confirmations().is_empty());
}

#[test]
fn test_malformed_stream_events_reported_after_delivery() {
    let (client, _observer, received) = session_client();
    client
        .transport()
        .queue_get_body(r#"{"b1":[["ok"],[1],["a",1,2]],"b2":{"x":1}}"#);

    let err = client.pull_events(PollingMode::LongPolling).unwrap_err();

    assert_eq!(
        err,
        MageError::client("3 received events have an invalid format.")
    );
    assert_eq!(received.lock().len(), 1);
    let mut pending = client.pending_confirmations();
    pending.sort();
    assert_eq!(pending, vec!["b1".to_string(), "b2".to_string()]);
}

#[test]
fn test_unparseable_body_is_client_error() {
    let (client, _observer, received) = session_client();
    client.transport().queue_get_body("<html>");

    let err = client.pull_events(PollingMode::LongPolling).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Client);
    assert!(received.lock().is_empty());
}
