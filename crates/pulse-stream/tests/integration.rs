//! End-to-end tests driving real transports: a wiremock HTTP stream server
//! and a loopback WebSocket server.

use std::sync::Arc;
use std::time::Duration;

use futures::SinkExt;
use parking_lot::Mutex;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pulse_core::ids::ResourceId;
use pulse_stream::{
    EventHandlers, SessionState, StreamConfig, StreamEndpoint, StreamSession, TransportChannel,
};

const TIMEOUT: Duration = Duration::from_secs(5);

type Collected = Arc<Mutex<Vec<String>>>;

fn collector() -> Collected {
    Arc::new(Mutex::new(Vec::new()))
}

struct Callbacks {
    tokens: Collected,
    finals: Collected,
    errors: Collected,
}

fn collecting_handlers() -> (EventHandlers, Callbacks) {
    let tokens = collector();
    let finals = collector();
    let errors = collector();
    let (t, f, e) = (
        Arc::clone(&tokens),
        Arc::clone(&finals),
        Arc::clone(&errors),
    );
    let handlers = EventHandlers::new()
        .on_token(move |tok| t.lock().push(tok.to_owned()))
        .on_complete(move |text| f.lock().push(text))
        .on_error(move |err| e.lock().push(err.to_owned()));
    (
        handlers,
        Callbacks {
            tokens,
            finals,
            errors,
        },
    )
}

/// Serve one SSE-style body for a resource path and return the endpoint.
async fn sse_server(resource: &str, body: &str) -> (MockServer, StreamEndpoint) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/streams/{resource}")))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/event-stream"),
        )
        .mount(&server)
        .await;
    let endpoint = StreamEndpoint::new(
        format!("{}/streams", server.uri()),
        ResourceId::from(resource),
    );
    (server, endpoint)
}

/// Loopback WebSocket server that sends `messages`, then either closes or
/// holds the connection open.
async fn ws_server(messages: Vec<String>, hold_open: bool) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(tokio::spawn(async move {
        let Ok((stream, _)) = listener.accept().await else {
            return;
        };
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        for message in messages {
            ws.send(Message::Text(message.into())).await.unwrap();
        }
        if hold_open {
            tokio::time::sleep(Duration::from_secs(30)).await;
        } else {
            let _ = ws.close(None).await;
        }
    }));
    format!("ws://{addr}")
}

/// Poll the handle's buffer until it holds `n` events.
async fn wait_for_events(handle: &pulse_stream::SessionHandle, n: usize) {
    timeout(TIMEOUT, async {
        while handle.snapshot().len() < n {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("expected events did not arrive");
}

// ── HTTP-stream transport ────────────────────────────────────────────────

#[tokio::test]
async fn http_tokens_accumulate_into_completion() {
    let body = "data: {\"token\":\"Hel\"}\n\ndata: {\"token\":\"lo\"}\n\ndata: [DONE]\n\n";
    let (_server, endpoint) = sse_server("conv-1", body).await;
    let (handlers, cb) = collecting_handlers();

    let handle = StreamSession::spawn(
        TransportChannel::http(endpoint),
        handlers,
        StreamConfig::default(),
    );
    timeout(TIMEOUT, handle.completed()).await.unwrap();

    assert_eq!(*cb.tokens.lock(), vec!["Hel".to_owned(), "lo".to_owned()]);
    assert_eq!(*cb.finals.lock(), vec!["Hello".to_owned()]);
    assert!(cb.errors.lock().is_empty());
    assert_eq!(handle.state(), SessionState::Closed);
}

#[tokio::test]
async fn http_malformed_frame_does_not_break_neighbors() {
    let body = "data: {\"token\":\"ok1\"}\n\ndata: {bad json\n\ndata: {\"token\":\"ok2\"}\n\ndata: [DONE]\n\n";
    let (_server, endpoint) = sse_server("conv-2", body).await;
    let (handlers, cb) = collecting_handlers();

    let handle = StreamSession::spawn(
        TransportChannel::http(endpoint),
        handlers,
        StreamConfig::default(),
    );
    timeout(TIMEOUT, handle.completed()).await.unwrap();

    assert_eq!(*cb.tokens.lock(), vec!["ok1".to_owned(), "ok2".to_owned()]);
    assert_eq!(cb.finals.lock().len(), 1);
    // Decode glitches are diagnostics, not session errors.
    assert!(cb.errors.lock().is_empty());
    assert_eq!(handle.state(), SessionState::Closed);
}

#[tokio::test]
async fn http_mixed_kinds_reach_kind_callbacks_and_buffer() {
    let body = "data: {\"event\":\"status_change\",\"status\":\"connected\"}\n\n\
                data: {\"percent\":50,\"stage\":\"crawl\"}\n\n\
                data: {\"competitor\":\"Acme\"}\n\n\
                data: {\"event\":\"complete\"}\n\n";
    let (_server, endpoint) = sse_server("run-1", body).await;
    let discoveries = collector();
    let d = Arc::clone(&discoveries);
    let handlers = EventHandlers::new().on_kind("discovery", move |event| {
        if let pulse_core::events::FeedEvent::Discovery { label, .. } = event {
            d.lock().push(label.clone());
        }
    });

    let handle = StreamSession::spawn(
        TransportChannel::http(endpoint),
        handlers,
        StreamConfig::default(),
    );
    timeout(TIMEOUT, handle.completed()).await.unwrap();

    assert_eq!(*discoveries.lock(), vec!["Acme".to_owned()]);

    let snapshot = handle.snapshot();
    let kinds: Vec<&str> = snapshot.iter().map(|e| e.event.kind()).collect();
    assert_eq!(
        kinds,
        vec!["status_change", "progress", "discovery", "complete"]
    );
    let seqs: Vec<u64> = snapshot.iter().map(|e| e.seq).collect();
    assert_eq!(seqs, vec![0, 1, 2, 3]);
}

#[tokio::test]
async fn http_non_success_status_fails_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let endpoint = StreamEndpoint::new(format!("{}/streams", server.uri()), ResourceId::new());
    let (handlers, cb) = collecting_handlers();

    let handle = StreamSession::spawn(
        TransportChannel::http(endpoint),
        handlers,
        StreamConfig::default(),
    );
    timeout(TIMEOUT, handle.completed()).await.unwrap();

    assert_eq!(handle.state(), SessionState::Failed);
    let errors = cb.errors.lock();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("503"), "got: {}", errors[0]);
}

#[tokio::test]
async fn http_eof_without_terminal_event_fails_session() {
    let body = "data: {\"token\":\"orphan\"}\n\n";
    let (_server, endpoint) = sse_server("conv-3", body).await;
    let (handlers, cb) = collecting_handlers();

    let handle = StreamSession::spawn(
        TransportChannel::http(endpoint),
        handlers,
        StreamConfig::default(),
    );
    timeout(TIMEOUT, handle.completed()).await.unwrap();

    assert_eq!(*cb.tokens.lock(), vec!["orphan".to_owned()]);
    assert!(cb.finals.lock().is_empty());
    assert_eq!(handle.state(), SessionState::Failed);
    assert_eq!(cb.errors.lock().len(), 1);
}

#[tokio::test]
async fn http_producer_error_event_fails_session() {
    let body = "data: {\"token\":\"a\"}\n\ndata: {\"event\":\"error\",\"error\":\"quota exceeded\"}\n\n";
    let (_server, endpoint) = sse_server("conv-4", body).await;
    let (handlers, cb) = collecting_handlers();

    let handle = StreamSession::spawn(
        TransportChannel::http(endpoint),
        handlers,
        StreamConfig::default(),
    );
    timeout(TIMEOUT, handle.completed()).await.unwrap();

    assert_eq!(handle.state(), SessionState::Failed);
    assert_eq!(*cb.errors.lock(), vec!["quota exceeded".to_owned()]);
    assert!(cb.finals.lock().is_empty());
}

#[tokio::test]
async fn http_rolling_buffer_keeps_last_n() {
    let mut body = String::new();
    for n in 0..8 {
        body.push_str(&format!("data: {{\"token\":\"t{n}\"}}\n\n"));
    }
    body.push_str("data: [DONE]\n\n");
    let (_server, endpoint) = sse_server("conv-5", &body).await;

    let config = StreamConfig {
        buffer_capacity: 3,
        ..Default::default()
    };
    let handle = StreamSession::spawn(TransportChannel::http(endpoint), EventHandlers::new(), config);
    timeout(TIMEOUT, handle.completed()).await.unwrap();

    // 8 tokens + synthetic complete = 9 events; capacity 3 keeps the last 3.
    let snapshot = handle.snapshot();
    assert_eq!(snapshot.len(), 3);
    let seqs: Vec<u64> = snapshot.iter().map(|e| e.seq).collect();
    assert_eq!(seqs, vec![6, 7, 8]);
    assert_eq!(snapshot[2].event.kind(), "complete");
}

// ── Push-socket transport ────────────────────────────────────────────────

#[tokio::test]
async fn socket_messages_route_as_events() {
    let url = ws_server(
        vec![
            "{\"event\":\"ping\"}".into(),
            "{\"event\":\"log_line\",\"line\":\"GET /leads 200\"}".into(),
            "{\"status\":\"connected\"}".into(),
            "{\"event\":\"complete\",\"text\":\"done\"}".into(),
        ],
        false,
    )
    .await;
    let endpoint = StreamEndpoint::new(url, ResourceId::from("live-1"));
    let (handlers, cb) = collecting_handlers();

    let handle = StreamSession::spawn(
        TransportChannel::socket(endpoint),
        handlers,
        StreamConfig::default(),
    );
    timeout(TIMEOUT, handle.completed()).await.unwrap();

    assert_eq!(handle.state(), SessionState::Closed);
    assert_eq!(*cb.finals.lock(), vec!["done".to_owned()]);

    // The keep-alive ping is invisible; the rest arrive in order.
    let kinds: Vec<&str> = handle.snapshot().iter().map(|e| e.event.kind()).collect();
    assert_eq!(kinds, vec!["log_line", "status_change", "complete"]);
}

#[tokio::test]
async fn socket_cancel_mid_stream_is_clean_and_idempotent() {
    let url = ws_server(
        vec![
            "{\"event\":\"log_line\",\"line\":\"one\"}".into(),
            "{\"event\":\"log_line\",\"line\":\"two\"}".into(),
        ],
        true,
    )
    .await;
    let endpoint = StreamEndpoint::new(url, ResourceId::from("live-2"));
    let (handlers, cb) = collecting_handlers();

    let handle = StreamSession::spawn(
        TransportChannel::socket(endpoint),
        handlers,
        StreamConfig::default(),
    );
    wait_for_events(&handle, 2).await;

    handle.cancel();
    timeout(TIMEOUT, handle.completed()).await.unwrap();
    assert_eq!(handle.state(), SessionState::Closed);
    let count = handle.snapshot().len();

    // Second cancel is a no-op: same end state, no panic, nothing new.
    handle.cancel();
    assert_eq!(handle.state(), SessionState::Closed);
    assert_eq!(handle.snapshot().len(), count);
    assert!(cb.errors.lock().is_empty());
}

#[tokio::test]
async fn socket_deadline_expiry_takes_the_cancel_path() {
    let url = ws_server(vec!["{\"event\":\"log_line\",\"line\":\"tick\"}".into()], true).await;
    let endpoint = StreamEndpoint::new(url, ResourceId::from("live-3"));
    let (handlers, cb) = collecting_handlers();

    let config = StreamConfig {
        deadline_ms: Some(250),
        ..Default::default()
    };
    let handle = StreamSession::spawn(TransportChannel::socket(endpoint), handlers, config);
    timeout(TIMEOUT, handle.completed()).await.unwrap();

    // Deadline expiry is a clean close, not a failure.
    assert_eq!(handle.state(), SessionState::Closed);
    assert!(cb.errors.lock().is_empty());
}

#[tokio::test]
async fn socket_deadline_covers_the_connect_phase() {
    // A server that accepts TCP but never completes the handshake leaves
    // the session stuck in Connecting; the deadline must still fire.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(tokio::spawn(async move {
        if let Ok((stream, _)) = listener.accept().await {
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(stream);
        }
    }));

    let endpoint = StreamEndpoint::new(format!("ws://{addr}"), ResourceId::from("live-5"));
    let (handlers, cb) = collecting_handlers();
    let config = StreamConfig {
        deadline_ms: Some(250),
        ..Default::default()
    };
    let handle = StreamSession::spawn(TransportChannel::socket(endpoint), handlers, config);
    timeout(TIMEOUT, handle.completed()).await.unwrap();

    assert_eq!(handle.state(), SessionState::Closed);
    assert!(cb.errors.lock().is_empty());
}

#[tokio::test]
async fn http_transport_opens_repeatedly_with_one_client() {
    let body = "data: [DONE]\n\n";
    let (_server, endpoint) = sse_server("conv-6", body).await;

    let transport = pulse_stream::transport::HttpTransport::new(endpoint);
    assert!(transport.open(Duration::from_secs(5)).await.is_ok());
    assert!(transport.open(Duration::from_secs(5)).await.is_ok());
}

#[tokio::test]
async fn socket_connection_refused_fails_session() {
    // Bind then drop to get a port nothing listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let endpoint = StreamEndpoint::new(format!("ws://{addr}"), ResourceId::from("live-4"));
    let (handlers, cb) = collecting_handlers();

    let handle = StreamSession::spawn(
        TransportChannel::socket(endpoint),
        handlers,
        StreamConfig::default(),
    );
    timeout(TIMEOUT, handle.completed()).await.unwrap();

    assert_eq!(handle.state(), SessionState::Failed);
    assert_eq!(cb.errors.lock().len(), 1);
}
