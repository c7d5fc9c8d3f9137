use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;
use tracing::warn;

use crate::AppState;
use crate::auth;

#[derive(Debug, Deserialize)]
pub struct HostQuery {
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
    pub token: Option<String>,
}

pub async fn ws_host_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<HostQuery>,
) -> impl IntoResponse {
    let (Some(session_id), Some(token)) = (query.session_id, query.token) else {
        return (StatusCode::BAD_REQUEST, "missing sessionId or token").into_response();
    };

    let claims = match auth::verify(&state.config.jwt_secret, &token, &session_id) {
        Ok(claims) => claims,
        Err(e) => {
            warn!(session_id, error = %e, "host auth failed");
            return (StatusCode::UNAUTHORIZED, "authentication failed").into_response();
        }
    };

    ws.on_upgrade(move |socket| async move {
        let actor = state.hub.get_or_create(&session_id, &claims.tenant_id).await;
        actor.attach_host(socket).await;
    })
    .into_response()
}
