// Test harness shared by services/relay's integration tests. Generalized
// from the teacher's MockWsClient: unlike the teacher's receiver protocol,
// the relay forwards opaque frames, so this client sends/receives raw text
// and binary payloads rather than a single typed message enum.

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::MaybeTlsStream;
use tokio_tungstenite::tungstenite::http::Request;
use tokio_tungstenite::tungstenite::protocol::Message;

type WsStream = tokio_tungstenite::WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

pub struct TestClient {
    write: futures_util::stream::SplitSink<WsStream, Message>,
    read: futures_util::stream::SplitStream<WsStream>,
}

impl TestClient {
    pub async fn connect(url: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let (ws_stream, _response) = tokio_tungstenite::connect_async(url).await?;
        let (write, read) = ws_stream.split();
        Ok(Self { write, read })
    }

    pub async fn connect_with_token(
        url: &str,
        token: &str,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        use tokio_tungstenite::tungstenite::handshake::client::generate_key;
        let uri: tokio_tungstenite::tungstenite::http::Uri = url.parse()?;
        let host = uri.host().unwrap_or("localhost").to_owned();
        let host_header = match uri.port_u16() {
            Some(p) => format!("{host}:{p}"),
            None => host,
        };
        let request = Request::builder()
            .uri(url)
            .header("Host", host_header)
            .header("Authorization", format!("Bearer {token}"))
            .header("Upgrade", "websocket")
            .header("Connection", "Upgrade")
            .header("Sec-WebSocket-Version", "13")
            .header("Sec-WebSocket-Key", generate_key())
            .body(())?;
        let (ws_stream, _response) = tokio_tungstenite::connect_async(request).await?;
        let (write, read) = ws_stream.split();
        Ok(Self { write, read })
    }

    pub async fn send_text(&mut self, payload: &str) -> Result<(), Box<dyn std::error::Error>> {
        self.write.send(Message::Text(payload.to_owned().into())).await?;
        Ok(())
    }

    pub async fn send_binary(&mut self, payload: Vec<u8>) -> Result<(), Box<dyn std::error::Error>> {
        self.write.send(Message::Binary(payload.into())).await?;
        Ok(())
    }

    /// Receives the next data frame, skipping ping/pong. Returns `Err` on
    /// Close or stream end.
    pub async fn recv_frame(&mut self) -> Result<Frame, Box<dyn std::error::Error>> {
        loop {
            match self.read.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Frame::Text(text.to_string())),
                Some(Ok(Message::Binary(b))) => return Ok(Frame::Binary(b.to_vec())),
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                Some(Ok(Message::Close(frame))) => {
                    return Err(format!("connection closed by server: {frame:?}").into());
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
                None => return Err("connection stream ended".into()),
            }
        }
    }

    /// Receives the next frame with a timeout, useful for asserting absence
    /// of traffic (e.g. a throttled or idle-closed peer).
    pub async fn recv_frame_timeout(
        &mut self,
        dur: std::time::Duration,
    ) -> Result<Frame, Box<dyn std::error::Error>> {
        tokio::time::timeout(dur, self.recv_frame())
            .await
            .map_err(|_| "timed out waiting for frame".into())?
    }

    pub async fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.write.send(Message::Close(None)).await?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

impl Frame {
    pub fn as_control(&self) -> Option<relay_protocol::ControlFrame> {
        match self {
            Frame::Text(t) => serde_json::from_str(t).ok(),
            Frame::Binary(_) => None,
        }
    }
}
