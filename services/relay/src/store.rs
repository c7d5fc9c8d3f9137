use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};

/// Resume metadata persisted for a session. Payloads are never stored here --
/// only bookkeeping to aid observability and future durable resume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeMetadata {
    #[serde(rename = "tenantId")]
    pub tenant_id: String,
    #[serde(rename = "lastSeq")]
    pub last_seq: u64,
    #[serde(rename = "expiresAt")]
    pub expires_at: i64,
}

fn key_for(session_id: &str) -> String {
    format!("relay:sess:{session_id}")
}

/// Optional pluggable KV with TTL. The relay runs with `NullStore` when no
/// `REDIS_URL` is configured -- persistence here is advisory, never load
/// bearing for correctness of replay.
#[async_trait]
pub trait SideStore: Send + Sync {
    async fn save(&self, session_id: &str, metadata: &ResumeMetadata, ttl_seconds: u64);
}

pub struct NullStore;

#[async_trait]
impl SideStore for NullStore {
    async fn save(&self, _session_id: &str, _metadata: &ResumeMetadata, _ttl_seconds: u64) {}
}

pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    pub async fn connect(redis_url: &str) -> redis::RedisResult<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl SideStore for RedisStore {
    async fn save(&self, session_id: &str, metadata: &ResumeMetadata, ttl_seconds: u64) {
        let Ok(json) = serde_json::to_string(metadata) else { return };
        let mut conn = self.conn.clone();
        let key = key_for(session_id);
        let result: redis::RedisResult<()> = conn.set_ex(key, json, ttl_seconds).await;
        if let Err(err) = result {
            tracing::warn!(session_id, error = %err, "side-store save failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_for_is_namespaced_by_session_id() {
        assert_eq!(key_for("abc"), "relay:sess:abc");
    }

    #[tokio::test]
    async fn null_store_save_is_a_no_op() {
        let store = NullStore;
        let meta = ResumeMetadata { tenant_id: "t".to_owned(), last_seq: 1, expires_at: 0 };
        store.save("sess-1", &meta, 30).await;
    }
}
