use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// Required claims for a relay bearer token. `exp` is Unix seconds, per
/// `jsonwebtoken`'s convention (validated against the current time).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    #[serde(rename = "tenantId")]
    pub tenant_id: String,
    pub exp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing or malformed bearer token")]
    MissingToken,
    #[error("invalid signature or claims: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
    #[error("token sessionId does not match requested sessionId")]
    SessionIdMismatch,
}

/// Verifies a bearer token against `secret` and checks that its `sessionId`
/// claim matches the `sessionId` query parameter the caller connected with.
/// A mismatch is reported distinctly for logging but yields the same
/// authentication failure to the caller, per the auth verifier's contract.
pub fn verify(secret: &str, raw_token: &str, expected_session_id: &str) -> Result<TokenClaims, AuthError> {
    let validation = Validation::new(Algorithm::HS256);
    let data = decode::<TokenClaims>(
        raw_token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;
    if data.claims.session_id != expected_session_id {
        return Err(AuthError::SessionIdMismatch);
    }
    Ok(data.claims)
}

/// Issues a token for the dev mint endpoint. Not used in production --
/// production tokens are minted by the application backend and only ever
/// verified here.
pub fn issue(secret: &str, session_id: &str, tenant_id: &str, expires_at: i64) -> String {
    let claims = TokenClaims {
        session_id: session_id.to_owned(),
        tenant_id: tenant_id.to_owned(),
        exp: expires_at,
    };
    encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .expect("HS256 encoding never fails for well-formed claims")
}

pub fn extract_bearer(header_value: &str) -> Option<&str> {
    header_value.strip_prefix("Bearer ")
}
