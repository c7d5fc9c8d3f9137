mod common;

use relay::Config;
use relay_test_support::TestClient;
use std::time::Duration;

/// The hub's watcher polls every 5s (see hub.rs::WATCH_INTERVAL), so this
/// waits past one full tick after the idle timeout elapses.
#[tokio::test]
async fn idle_session_closes_both_peers_after_timeout() {
    let config = Config { idle_timeout_seconds: 1, ..common::test_config() };
    let server = common::spawn(config).await;
    let session_id = "sess-idle";
    let token = common::token_for(session_id, "tenant-a");

    let mut client = TestClient::connect_with_token(
        &server.ws_url(&format!("/ws/client?sessionId={session_id}&token={token}")),
        &token,
    )
    .await
    .expect("client connects");
    let mut host = TestClient::connect_with_token(
        &server.ws_url(&format!("/ws/host?sessionId={session_id}&token={token}")),
        &token,
    )
    .await
    .expect("host connects");

    for peer in [&mut client, &mut host] {
        let frame = peer.recv_frame_timeout(Duration::from_secs(10)).await.expect("idle close frame");
        let control = frame.as_control().expect("control frame");
        match control {
            relay_protocol::ControlFrame::Err { message, sid } => {
                assert_eq!(message, "idle_timeout");
                assert_eq!(sid, session_id);
            }
            other => panic!("expected err frame, got {other:?}"),
        }
    }
}
