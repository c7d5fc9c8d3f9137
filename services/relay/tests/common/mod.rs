use std::sync::Arc;
use std::time::Duration;

use relay::store::NullStore;
use relay::{AppState, Config, Hub};

pub const TEST_SECRET: &str = "integration-test-secret";

#[allow(dead_code)]
pub struct TestServer {
    pub addr: std::net::SocketAddr,
}

impl TestServer {
    pub fn ws_url(&self, path: &str) -> String {
        format!("ws://{}{}", self.addr, path)
    }

    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Spawns a relay instance on an ephemeral port, mirroring the teacher's
/// `receiver_resume.rs` harness -- minus a database, since this relay has
/// none. Config is built directly (not via `Config::from_env`) so parallel
/// `#[tokio::test]`s never race over process environment.
#[allow(dead_code)]
pub async fn spawn(config: Config) -> TestServer {
    let hub = Hub::new(
        config.ring_buffer_bytes,
        config.rate_limit_bps,
        Duration::from_secs(config.session_ttl_seconds),
        Duration::from_secs(config.idle_timeout_seconds),
        Arc::new(NullStore),
    );
    let state = AppState { hub, config: Arc::new(config) };
    let router = relay::build_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("test server error");
    });

    TestServer { addr }
}

#[allow(dead_code)]
pub fn test_config() -> Config {
    Config {
        port: 0,
        jwt_secret: TEST_SECRET.to_owned(),
        session_ttl_seconds: 86_400,
        idle_timeout_seconds: 1_800,
        ring_buffer_bytes: 131_072,
        rate_limit_bps: 65_536,
        cors_origins: Vec::new(),
        redis_url: None,
        relay_mint: false,
        admin_token: None,
    }
}

#[allow(dead_code)]
pub fn token_for(session_id: &str, tenant_id: &str) -> String {
    let expires_at = i64::MAX / 2;
    relay::auth::issue(TEST_SECRET, session_id, tenant_id, expires_at)
}
