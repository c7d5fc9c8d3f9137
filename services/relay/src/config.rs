use std::env;

/// Process configuration, assembled once at startup from the environment.
/// Mirrors the teacher's `env::var(...).unwrap_or_else(...)` / `.expect(...)`
/// idiom in `main.rs` -- missing/unparseable required values are a
/// Configuration-class fatal error and panic before the listener binds.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub jwt_secret: String,
    pub session_ttl_seconds: u64,
    pub idle_timeout_seconds: u64,
    pub ring_buffer_bytes: usize,
    pub rate_limit_bps: u64,
    pub cors_origins: Vec<String>,
    pub redis_url: Option<String>,
    pub relay_mint: bool,
    pub admin_token: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: parse_env("PORT", 8081),
            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            session_ttl_seconds: parse_env("SESSION_TTL_SECONDS", 86_400),
            idle_timeout_seconds: parse_env("IDLE_TIMEOUT_SECONDS", 1_800),
            ring_buffer_bytes: parse_env("RING_BUFFER_BYTES", 131_072),
            rate_limit_bps: parse_env("RATE_LIMIT_BPS", 65_536),
            cors_origins: env::var("CORS_ORIGINS")
                .ok()
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(ToOwned::to_owned)
                        .collect()
                })
                .unwrap_or_default(),
            redis_url: non_empty_env("REDIS_URL"),
            relay_mint: env::var("RELAY_MINT")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            admin_token: non_empty_env("ADMIN_TOKEN"),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("{key} must be a valid number, got {raw:?}")),
        Err(_) => default,
    }
}
