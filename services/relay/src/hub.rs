use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use relay_protocol::reasons;
use tokio::sync::RwLock;

use crate::metrics;
use crate::session::Actor;
use crate::store::SideStore;

const WATCH_INTERVAL: Duration = Duration::from_secs(5);
const PERSIST_EVERY_N_TICKS: u32 = 6; // ~30s, per spec.md's "at least once per 30s"

/// Session registry: `sessionId -> actor`. Keeps the `active_sessions`
/// metrics gauge consistent with the map under the hub's own lock.
pub struct Hub {
    sessions: RwLock<HashMap<String, Arc<Actor>>>,
    ring_bytes: usize,
    rate_bps: u64,
    session_ttl: Duration,
    idle_timeout: Duration,
    store: Arc<dyn SideStore>,
}

impl Hub {
    pub fn new(
        ring_bytes: usize,
        rate_bps: u64,
        session_ttl: Duration,
        idle_timeout: Duration,
        store: Arc<dyn SideStore>,
    ) -> Arc<Self> {
        Arc::new(Self {
            sessions: RwLock::new(HashMap::new()),
            ring_bytes,
            rate_bps,
            session_ttl,
            idle_timeout,
            store,
        })
    }

    pub async fn get_or_create(self: &Arc<Self>, session_id: &str, tenant_id: &str) -> Arc<Actor> {
        if let Some(actor) = self.sessions.read().await.get(session_id) {
            return actor.clone();
        }
        let mut sessions = self.sessions.write().await;
        if let Some(actor) = sessions.get(session_id) {
            return actor.clone();
        }
        let actor = Actor::new(
            session_id.to_owned(),
            tenant_id.to_owned(),
            self.ring_bytes,
            self.rate_bps,
            self.session_ttl,
            self.idle_timeout,
            self.store.clone(),
        );
        sessions.insert(session_id.to_owned(), actor.clone());
        metrics::ACTIVE_SESSIONS.set(sessions.len() as i64);
        drop(sessions);
        spawn_watcher(self.clone(), session_id.to_owned(), actor.clone());
        actor
    }

    pub async fn close(&self, session_id: &str, reason: &str) {
        let actor = self.sessions.write().await.remove(session_id);
        if let Some(actor) = actor {
            actor.close(reason).await;
        }
        let len = self.sessions.read().await.len();
        metrics::ACTIVE_SESSIONS.set(len as i64);
    }

    pub async fn close_all(&self, reason: &str) {
        let actors: Vec<Arc<Actor>> = self.sessions.write().await.drain().map(|(_, a)| a).collect();
        for actor in actors {
            actor.close(reason).await;
        }
        metrics::ACTIVE_SESSIONS.set(0);
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

fn spawn_watcher(hub: Arc<Hub>, session_id: String, actor: Arc<Actor>) {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(WATCH_INTERVAL);
        let mut ticks: u32 = 0;
        loop {
            tick.tick().await;
            if actor.is_closed() {
                break;
            }
            if actor.is_idle_expired() {
                hub.close(&session_id, reasons::IDLE_TIMEOUT).await;
                break;
            }
            if actor.is_ttl_expired() {
                hub.close(&session_id, reasons::SESSION_EXPIRED).await;
                break;
            }
            ticks += 1;
            if ticks % PERSIST_EVERY_N_TICKS == 0 {
                actor.persist_resume_metadata().await;
            }
        }
    });
}
