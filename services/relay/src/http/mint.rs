use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use relay_protocol::{HttpErrorEnvelope, MintResponse, MintWsUrls};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::AppState;
use crate::auth;

/// Dev-only session mint, gated by `RELAY_MINT`. Production tokens are
/// minted by the application backend; the relay only ever verifies those.
pub async fn mint_session(State(state): State<AppState>) -> impl IntoResponse {
    if !state.config.relay_mint {
        return (
            StatusCode::BAD_REQUEST,
            Json(HttpErrorEnvelope {
                code: "MINT_DISABLED".to_owned(),
                message: "dev session minting is disabled; request a token from the application backend".to_owned(),
            }),
        )
            .into_response();
    }

    let session_id = Uuid::new_v4().to_string();
    let tenant_id = Uuid::new_v4().to_string();
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64;
    let expires_at = now + state.config.session_ttl_seconds as i64;
    let token = auth::issue(&state.config.jwt_secret, &session_id, &tenant_id, expires_at);

    let body = MintResponse {
        session_id: session_id.clone(),
        token: token.clone(),
        ws: MintWsUrls {
            host: format!("/ws/host?sessionId={session_id}&token={token}"),
            client: format!("/ws/client?sessionId={session_id}&token={token}"),
        },
        expires_at,
    };
    (StatusCode::OK, Json(body)).into_response()
}
