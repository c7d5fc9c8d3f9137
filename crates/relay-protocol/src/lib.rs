// relay-protocol: wire types for the WebSocket switchboard relay.
//
// The relay is payload-agnostic: the control frames below are the ONLY JSON
// shapes the relay itself constructs. Everything else flowing through a
// session is opaque and is classified only by its leading byte.

use serde::{Deserialize, Serialize};

/// Reason strings used in `err` control frames. These are not a frozen code
/// table like a typical error-code enum -- the spec reuses `message` text for
/// both peer-surfaced protocol violations and lifecycle close reasons.
pub mod reasons {
    pub const IDLE_TIMEOUT: &str = "idle_timeout";
    pub const SHUTDOWN: &str = "shutdown";
    pub const OUT_OF_HISTORY: &str = "out_of_history";
    pub const BINARY_FROM_CLIENT: &str = "binary not expected from client";
    /// Not in spec.md's literal reason list (idle_timeout/shutdown/
    /// out_of_history) but the list is explicitly open-ended ("..."). Used
    /// when a session is closed for exceeding its hard TTL rather than idle
    /// timeout or process shutdown.
    pub const SESSION_EXPIRED: &str = "session_expired";
}

/// Control frames the relay emits to a peer.
///
/// Serializes with a `t` tag, matching the minimum JSON control vocabulary:
/// `{"t":"err",...}` for protocol/peer errors and close reasons, `{"t":"evt",
/// "kind":"throttle",...}` for rate-limit notices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ControlFrame {
    Err { message: String, sid: String },
    Evt { kind: String, bps: u64, sid: String, seq: u64 },
}

impl ControlFrame {
    pub fn err(sid: impl Into<String>, message: impl Into<String>) -> Self {
        ControlFrame::Err { message: message.into(), sid: sid.into() }
    }

    pub fn throttle(sid: impl Into<String>, bps: u64, seq: u64) -> Self {
        ControlFrame::Evt { kind: "throttle".to_owned(), bps, sid: sid.into(), seq }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("ControlFrame always serializes")
    }
}

/// Classifies a WebSocket payload by its leading byte only. A hot-path
/// shortcut, not JSON validation -- malformed `{...}` still classifies as
/// Json (the relay does not parse). An empty payload classifies as Binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Json,
    Binary,
}

pub fn classify(payload: &[u8]) -> FrameKind {
    match payload.first() {
        Some(b'{') => FrameKind::Json,
        _ => FrameKind::Binary,
    }
}

/// Best-effort injection of a `seq` field into an outgoing JSON payload that
/// lacks one, so clients can pass `resumeSeq` without relying on the
/// sender's cooperation. Malformed JSON or non-object payloads pass through
/// unmodified -- this is a one-shot attempt at forward time, not an upgrade
/// of the leading-byte classification into real parsing.
pub fn inject_seq(payload: &[u8], seq: u64) -> Vec<u8> {
    let Ok(mut value) = serde_json::from_slice::<serde_json::Value>(payload) else {
        return payload.to_vec();
    };
    let Some(obj) = value.as_object_mut() else {
        return payload.to_vec();
    };
    if obj.contains_key("seq") {
        return payload.to_vec();
    }
    obj.insert("seq".to_owned(), serde_json::Value::from(seq));
    serde_json::to_vec(&value).unwrap_or_else(|_| payload.to_vec())
}

/// Response body for the dev mint endpoint (`POST /api/session`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MintResponse {
    pub session_id: String,
    pub token: String,
    pub ws: MintWsUrls,
    pub expires_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MintWsUrls {
    pub host: String,
    pub client: String,
}

/// Frozen HTTP error envelope used by non-2xx JSON responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpErrorEnvelope {
    pub code: String,
    pub message: String,
}
