//! End-to-end tests over a real WebSocket against a started server.

use std::sync::Arc;
use std::time::Duration;

use courier_core::records::RegistrationResult;
use courier_core::{Address, MockConnection, SessionId};
use courier_server::{start, HandlerState, ServerConfig, ServerHandle, SessionRegistry};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio_tungstenite::tungstenite::Message;

type Socket =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

async fn boot() -> (ServerHandle, Arc<SessionRegistry>) {
    let registry = Arc::new(SessionRegistry::new());

    let fast = MockConnection::new().with_registration(Ok(vec![
        RegistrationResult {
            query: "+15551234567".into(),
            address: Some(Address::new("15551234567", "s.whatsapp.net")),
            is_registered: true,
        },
        RegistrationResult {
            query: "+15559999999".into(),
            address: None,
            is_registered: false,
        },
    ]));
    registry.register(SessionId::from_raw("fast"), Arc::new(fast));

    let slow = MockConnection::new()
        .with_channels(Ok(vec![]))
        .with_delay(Duration::from_secs(5));
    registry.register(SessionId::from_raw("slow"), Arc::new(slow));

    let lookup = Arc::clone(&registry) as Arc<dyn courier_server::SessionLookup>;
    let state = Arc::new(HandlerState::new(lookup));
    let config = ServerConfig {
        host: "127.0.0.1".into(),
        port: 0,
        ..Default::default()
    };
    (start(config, state).await.unwrap(), registry)
}

async fn connect(port: u16) -> Socket {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://127.0.0.1:{port}/ws"))
        .await
        .unwrap();
    ws
}

async fn send(ws: &mut Socket, request: Value) {
    ws.send(Message::text(request.to_string())).await.unwrap();
}

/// Next text frame as JSON, skipping control frames.
async fn recv(ws: &mut Socket) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for response")
            .unwrap()
            .unwrap();
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

#[tokio::test]
async fn check_phones_round_trip() {
    let (handle, _registry) = boot().await;
    let mut ws = connect(handle.port).await;

    send(
        &mut ws,
        json!({
            "id": 1,
            "method": "contacts.checkPhones",
            "params": {"session": "fast", "phones": ["15551234567", "+15559999999"]},
        }),
    )
    .await;
    let resp = recv(&mut ws).await;

    assert_eq!(resp["id"], 1);
    assert_eq!(resp["success"], true);
    let infos = resp["result"]["infos"].as_array().unwrap();
    assert_eq!(infos.len(), 2);
    assert_eq!(infos[0]["phone"], "+15551234567");
    assert_eq!(infos[0]["registered"], true);
    assert_eq!(infos[1]["phone"], "+15559999999");
    assert_eq!(infos[1]["registered"], false);
}

#[tokio::test]
async fn malformed_envelope_is_parse_error() {
    let (handle, _registry) = boot().await;
    let mut ws = connect(handle.port).await;

    ws.send(Message::text("{not json")).await.unwrap();
    let resp = recv(&mut ws).await;
    assert_eq!(resp["success"], false);
    assert_eq!(resp["error"]["code"], "PARSE_ERROR");
}

#[tokio::test]
async fn envelope_without_method_is_invalid_request() {
    let (handle, _registry) = boot().await;
    let mut ws = connect(handle.port).await;

    send(&mut ws, json!({"id": 12, "params": {"session": "fast"}})).await;
    let resp = recv(&mut ws).await;
    assert_eq!(resp["id"], 12);
    assert_eq!(resp["success"], false);
    assert_eq!(resp["error"]["code"], "INVALID_REQUEST");

    handle.shutdown().await;
}

#[tokio::test]
async fn unknown_session_and_method() {
    let (handle, _registry) = boot().await;
    let mut ws = connect(handle.port).await;

    send(
        &mut ws,
        json!({"id": "a", "method": "newsletter.list", "params": {"session": "ghost"}}),
    )
    .await;
    let resp = recv(&mut ws).await;
    assert_eq!(resp["error"]["code"], "SESSION_NOT_FOUND");

    send(&mut ws, json!({"id": "b", "method": "newsletter.explode", "params": {}})).await;
    let resp = recv(&mut ws).await;
    assert_eq!(resp["error"]["code"], "METHOD_NOT_FOUND");
}

#[tokio::test]
async fn slow_request_does_not_block_fast_one() {
    let (handle, _registry) = boot().await;
    let mut ws = connect(handle.port).await;

    send(
        &mut ws,
        json!({"id": "slow", "method": "newsletter.list", "params": {"session": "slow"}}),
    )
    .await;
    send(&mut ws, json!({"id": "fast", "method": "system.ping"})).await;

    let first = recv(&mut ws).await;
    assert_eq!(first["id"], "fast");
    assert_eq!(first["result"]["sessions"], 2);
}

#[tokio::test]
async fn caller_deadline_yields_timeout() {
    let (handle, _registry) = boot().await;
    let mut ws = connect(handle.port).await;

    send(
        &mut ws,
        json!({
            "id": 9,
            "method": "newsletter.list",
            "params": {"sessionId": "slow", "timeoutMs": 50},
        }),
    )
    .await;
    let resp = recv(&mut ws).await;
    assert_eq!(resp["id"], 9);
    assert_eq!(resp["error"]["code"], "TIMEOUT");
}

#[tokio::test]
async fn deregistered_session_is_not_found() {
    let (handle, registry) = boot().await;
    let mut ws = connect(handle.port).await;

    registry.deregister(&SessionId::from_raw("fast"));
    send(
        &mut ws,
        json!({
            "id": 2,
            "method": "contacts.checkPhones",
            "params": {"session": "fast", "phones": ["1"]},
        }),
    )
    .await;
    let resp = recv(&mut ws).await;
    assert_eq!(resp["error"]["code"], "SESSION_NOT_FOUND");

    handle.shutdown().await;
}
