mod common;

use tokio_tungstenite::tungstenite::handshake::client::generate_key;
use tokio_tungstenite::tungstenite::http::Request;

async fn attempt_host_connect(
    url: &str,
    token: Option<&str>,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    let uri: tokio_tungstenite::tungstenite::http::Uri = url.parse().unwrap();
    let host = uri.host().unwrap_or("localhost").to_owned();
    let host_header = match uri.port_u16() {
        Some(p) => format!("{host}:{p}"),
        None => host,
    };
    let mut builder = Request::builder()
        .uri(url)
        .header("Host", host_header)
        .header("Upgrade", "websocket")
        .header("Connection", "Upgrade")
        .header("Sec-WebSocket-Version", "13")
        .header("Sec-WebSocket-Key", generate_key());
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    let request = builder.body(()).unwrap();
    tokio_tungstenite::connect_async(request).await.map(|_| ())
}

#[tokio::test]
async fn missing_token_is_rejected() {
    let server = common::spawn(common::test_config()).await;
    let url = server.ws_url("/ws/host?sessionId=sess-auth");
    let result = attempt_host_connect(&url, None).await;
    assert!(result.is_err(), "expected handshake to fail without a token");
}

#[tokio::test]
async fn token_for_a_different_session_id_is_rejected() {
    let server = common::spawn(common::test_config()).await;
    let token = common::token_for("sess-a", "tenant-a");
    let url = server.ws_url("/ws/host?sessionId=sess-b");
    let result = attempt_host_connect(&url, Some(&token)).await;
    assert!(result.is_err(), "expected handshake to fail on sessionId mismatch");
}

#[tokio::test]
async fn garbage_token_is_rejected() {
    let server = common::spawn(common::test_config()).await;
    let url = server.ws_url("/ws/host?sessionId=sess-auth");
    let result = attempt_host_connect(&url, Some("not-a-jwt")).await;
    assert!(result.is_err(), "expected handshake to fail on an invalid token");
}

#[tokio::test]
async fn valid_token_is_accepted() {
    let server = common::spawn(common::test_config()).await;
    let token = common::token_for("sess-auth", "tenant-a");
    let url = server.ws_url("/ws/host?sessionId=sess-auth");
    let result = attempt_host_connect(&url, Some(&token)).await;
    assert!(result.is_ok(), "expected handshake to succeed with a valid token: {result:?}");
}
