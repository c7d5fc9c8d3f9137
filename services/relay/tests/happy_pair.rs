mod common;

use relay_test_support::{Frame, TestClient};
use std::time::Duration;

#[tokio::test]
async fn host_json_then_binary_arrive_at_client_in_order() {
    let server = common::spawn(common::test_config()).await;
    let session_id = "sess-happy-pair";
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

    host.send_text(r#"{"hello":1}"#).await.expect("send json");
    host.send_binary(vec![0x61, 0x62]).await.expect("send binary");

    let first = client.recv_frame_timeout(Duration::from_secs(2)).await.expect("first frame");
    match first {
        Frame::Text(text) => {
            let v: serde_json::Value = serde_json::from_str(&text).unwrap();
            assert_eq!(v["hello"], 1);
            assert_eq!(v["seq"], 1);
        }
        other => panic!("expected text frame first, got {other:?}"),
    }

    let second = client.recv_frame_timeout(Duration::from_secs(2)).await.expect("second frame");
    assert_eq!(second, Frame::Binary(b"ab".to_vec()));
}

/// `classify()` only inspects the leading byte, so a WS Binary frame that
/// happens to start with `{` but is not valid UTF-8 still takes the "Json"
/// forwarding path. The write pump must not mangle it into an empty text
/// frame -- it should arrive at the client as Binary with its bytes intact.
#[tokio::test]
async fn json_classified_non_utf8_payload_arrives_as_binary_unmangled() {
    let server = common::spawn(common::test_config()).await;
    let session_id = "sess-non-utf8";
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

    let payload = vec![b'{', 0xFF, 0xFE, b'}'];
    host.send_binary(payload.clone()).await.expect("send non-utf8 binary");

    let frame = client.recv_frame_timeout(Duration::from_secs(2)).await.expect("frame");
    assert_eq!(frame, Frame::Binary(payload), "non-utf8 payload must survive unchanged as a binary frame");
}
