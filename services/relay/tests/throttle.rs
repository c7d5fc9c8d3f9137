mod common;

use relay::Config;
use relay_test_support::TestClient;
use std::time::Duration;

/// A tiny rate limit so a single binary frame overflows the bucket and
/// trips the throttle path instead of being forwarded.
#[tokio::test]
async fn oversized_binary_frame_is_throttled_not_forwarded() {
    let config = Config { rate_limit_bps: 10, ..common::test_config() };
    let server = common::spawn(config).await;
    let session_id = "sess-throttle";
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
    tokio::time::sleep(Duration::from_millis(50)).await;

    host.send_binary(vec![0u8; 100]).await.expect("send oversized binary");

    let frame = client.recv_frame_timeout(Duration::from_secs(2)).await.expect("throttle frame");
    let control = frame.as_control().expect("control frame");
    match control {
        relay_protocol::ControlFrame::Evt { kind, bps, sid, .. } => {
            assert_eq!(kind, "throttle");
            assert_eq!(bps, 10);
            assert_eq!(sid, session_id);
        }
        other => panic!("expected evt frame, got {other:?}"),
    }

    let no_binary = client.recv_frame_timeout(Duration::from_millis(300)).await;
    assert!(no_binary.is_err(), "expected no binary to have been forwarded, got {no_binary:?}");
}
