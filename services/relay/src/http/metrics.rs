use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use relay_protocol::HttpErrorEnvelope;

use crate::AppState;
use crate::auth::extract_bearer;

/// Gated by a separate admin bearer. 404 (not a bare 401) when no admin
/// token is configured at all, matching the frontend server's contract.
pub async fn get_metrics(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let Some(admin_token) = state.config.admin_token.as_deref() else {
        return (
            StatusCode::NOT_FOUND,
            Json(HttpErrorEnvelope {
                code: "NOT_FOUND".to_owned(),
                message: "metrics endpoint is not configured".to_owned(),
            }),
        )
            .into_response();
    };

    let provided = headers.get("authorization").and_then(|v| v.to_str().ok()).and_then(extract_bearer);
    match provided {
        Some(token) if token == admin_token => (StatusCode::OK, crate::metrics::render()).into_response(),
        Some(_) => (
            StatusCode::FORBIDDEN,
            Json(HttpErrorEnvelope { code: "FORBIDDEN".to_owned(), message: "invalid admin token".to_owned() }),
        )
            .into_response(),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(HttpErrorEnvelope {
                code: "UNAUTHORIZED".to_owned(),
                message: "missing Authorization header".to_owned(),
            }),
        )
            .into_response(),
    }
}
