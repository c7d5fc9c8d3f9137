use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as SyncMutex};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use relay_protocol::{ControlFrame, FrameKind, classify, inject_seq, reasons};
use tokio::sync::{Mutex as AsyncMutex, Notify, mpsc};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::metrics;
use crate::rate_limit::RateLimiter;
use crate::ring::Ring;
use crate::store::{ResumeMetadata, SideStore};

const EGRESS_CAPACITY: usize = 256;
const JSON_ENQUEUE_TIMEOUT: Duration = Duration::from_millis(500);

type WsSink = SplitSink<WebSocket, WsMessage>;
type WsStream = SplitStream<WebSocket>;

/// The session actor's externally observable state. No HALF state is
/// observable -- a session is either some combination of attached slots, or
/// fully CLOSED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    HostOnly,
    ClientOnly,
    Paired,
    Closed,
}

enum Egress {
    Json(Vec<u8>),
    Binary(Vec<u8>),
}

struct PeerSlot {
    egress_tx: mpsc::Sender<Egress>,
    kill: Arc<Notify>,
    read_task: JoinHandle<()>,
    write_task: JoinHandle<()>,
}

impl PeerSlot {
    fn abort(self) {
        self.kill.notify_waiters();
        self.read_task.abort();
        self.write_task.abort();
    }
}

/// One actor per session. Holds the host and client slots, the replay ring,
/// the rate limiter, and the session-wide `seq` counter.
pub struct Actor {
    pub session_id: String,
    pub tenant_id: String,
    seq: AtomicU64,
    last_active: SyncMutex<Instant>,
    created_at: Instant,
    expires_at_unix: i64,
    session_ttl: Duration,
    idle_timeout: Duration,
    ring: Ring,
    limiter: RateLimiter,
    host: AsyncMutex<Option<PeerSlot>>,
    client: AsyncMutex<Option<PeerSlot>>,
    state: SyncMutex<SessionState>,
    closed: AtomicBool,
    store: Arc<dyn SideStore>,
}

impl Actor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session_id: String,
        tenant_id: String,
        ring_bytes: usize,
        rate_bps: u64,
        session_ttl: Duration,
        idle_timeout: Duration,
        store: Arc<dyn SideStore>,
    ) -> Arc<Self> {
        let now_unix = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64;
        Arc::new(Self {
            session_id,
            tenant_id,
            seq: AtomicU64::new(0),
            last_active: SyncMutex::new(Instant::now()),
            created_at: Instant::now(),
            expires_at_unix: now_unix + session_ttl.as_secs() as i64,
            session_ttl,
            idle_timeout,
            ring: Ring::new(ring_bytes),
            limiter: RateLimiter::new(rate_bps),
            host: AsyncMutex::new(None),
            client: AsyncMutex::new(None),
            state: SyncMutex::new(SessionState::Idle),
            closed: AtomicBool::new(false),
            store,
        })
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock().expect("state mutex poisoned")
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn is_idle_expired(&self) -> bool {
        self.last_active.lock().expect("last_active mutex poisoned").elapsed() > self.idle_timeout
    }

    pub fn is_ttl_expired(&self) -> bool {
        self.created_at.elapsed() > self.session_ttl
    }

    fn touch(&self) {
        *self.last_active.lock().expect("last_active mutex poisoned") = Instant::now();
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn set_state_for_slots(&self, host_present: bool, client_present: bool) {
        let mut state = self.state.lock().expect("state mutex poisoned");
        if self.closed.load(Ordering::SeqCst) {
            *state = SessionState::Closed;
            return;
        }
        *state = match (host_present, client_present) {
            (false, false) => SessionState::Idle,
            (true, false) => SessionState::HostOnly,
            (false, true) => SessionState::ClientOnly,
            (true, true) => SessionState::Paired,
        };
    }

    /// Installs `socket` as the host connection, closing any prior host
    /// socket first (last-write-wins). Starts a read pump (draining frames
    /// into `forward_from_host`) and a write pump (draining egress to the
    /// socket).
    pub async fn attach_host(self: &Arc<Self>, socket: WebSocket) {
        self.touch();
        metrics::CONNECTS_TOTAL.inc();
        let (sink, stream) = socket.split();
        let (egress_tx, egress_rx) = mpsc::channel(EGRESS_CAPACITY);
        let kill = Arc::new(Notify::new());

        let write_task = spawn_write_pump(sink, egress_rx, kill.clone());
        let read_task = {
            let actor = self.clone();
            let kill = kill.clone();
            tokio::spawn(async move { run_host_read_pump(actor, stream, kill).await })
        };

        let mut slot = self.host.lock().await;
        if let Some(prev) = slot.take() {
            prev.abort();
        }
        *slot = Some(PeerSlot { egress_tx, kill, read_task, write_task });
        drop(slot);

        let client_present = self.client.lock().await.is_some();
        self.set_state_for_slots(true, client_present);
        info!(session_id = %self.session_id, "host attached");
    }

    /// Installs `socket` as the client connection. When `resume_seq` is
    /// `Some(s)` with `s > 0`, replays ring entries with `seq > s` before any
    /// new traffic, or enqueues `out_of_history` if the requested position
    /// was already evicted.
    pub async fn attach_client(self: &Arc<Self>, socket: WebSocket, resume_seq: Option<u64>) {
        self.touch();
        metrics::CONNECTS_TOTAL.inc();
        let (sink, stream) = socket.split();

        let mut preload: Vec<Egress> = Vec::new();
        if let Some(resume_seq) = resume_seq.filter(|s| *s > 0) {
            let gap = matches!(self.ring.oldest_retained_seq(), Some(oldest) if resume_seq < oldest);
            if gap {
                let err = ControlFrame::err(&self.session_id, reasons::OUT_OF_HISTORY);
                preload.push(Egress::Json(err.to_json().into_bytes()));
            } else {
                let replayed = self.ring.replay_from(resume_seq);
                if !replayed.is_empty() {
                    metrics::FRAMES_JSON_RING_REPLAYED_TOTAL.inc();
                    preload.extend(replayed.into_iter().map(Egress::Json));
                }
            }
        }

        let capacity = EGRESS_CAPACITY.max(preload.len() + 16);
        let (egress_tx, egress_rx) = mpsc::channel(capacity);
        for item in preload {
            let _ = egress_tx.send(item).await;
        }

        let kill = Arc::new(Notify::new());
        let write_task = spawn_write_pump(sink, egress_rx, kill.clone());
        let read_task = {
            let actor = self.clone();
            let kill = kill.clone();
            tokio::spawn(async move { run_client_read_pump(actor, stream, kill).await })
        };

        let mut slot = self.client.lock().await;
        if let Some(prev) = slot.take() {
            prev.abort();
        }
        *slot = Some(PeerSlot { egress_tx, kill, read_task, write_task });
        drop(slot);

        let host_present = self.host.lock().await.is_some();
        self.set_state_for_slots(host_present, true);
        info!(session_id = %self.session_id, "client attached");
    }

    async fn detach_host(self: &Arc<Self>) {
        let mut slot = self.host.lock().await;
        if let Some(prev) = slot.take() {
            prev.abort();
        }
        drop(slot);
        let client_present = self.client.lock().await.is_some();
        self.set_state_for_slots(false, client_present);
        info!(session_id = %self.session_id, "host detached");
    }

    async fn detach_client(self: &Arc<Self>) {
        let mut slot = self.client.lock().await;
        if let Some(prev) = slot.take() {
            prev.abort();
        }
        drop(slot);
        let host_present = self.host.lock().await.is_some();
        self.set_state_for_slots(host_present, false);
        info!(session_id = %self.session_id, "client detached");
    }

    async fn forward_from_host(self: &Arc<Self>, payload: Vec<u8>) {
        self.touch();
        match classify(&payload) {
            FrameKind::Json => {
                let seq = self.next_seq();
                let payload = inject_seq(&payload, seq);
                self.ring.push(seq, &payload);
                self.enqueue_json(&self.client, payload).await;
            }
            FrameKind::Binary => {
                let len = payload.len() as u64;
                if self.limiter.allow(len) {
                    metrics::BYTES_HOST_TO_CLIENT_TOTAL.inc_by(len);
                    self.enqueue_binary(&self.client, payload).await;
                } else {
                    metrics::THROTTLE_EVENTS_TOTAL.inc();
                    let evt = ControlFrame::throttle(
                        &self.session_id,
                        self.limiter.capacity(),
                        self.seq.load(Ordering::SeqCst),
                    );
                    self.enqueue_json(&self.client, evt.to_json().into_bytes()).await;
                }
            }
        }
    }

    async fn forward_from_client(self: &Arc<Self>, payload: Vec<u8>) {
        self.touch();
        match classify(&payload) {
            FrameKind::Json => {
                let seq = self.next_seq();
                let payload = inject_seq(&payload, seq);
                self.ring.push(seq, &payload);
                self.enqueue_json(&self.host, payload).await;
            }
            FrameKind::Binary => {
                let err = ControlFrame::err(&self.session_id, reasons::BINARY_FROM_CLIENT);
                self.enqueue_json(&self.host, err.to_json().into_bytes()).await;
            }
        }
    }

    async fn enqueue_json(self: &Arc<Self>, slot: &AsyncMutex<Option<PeerSlot>>, payload: Vec<u8>) {
        let tx = { slot.lock().await.as_ref().map(|s| s.egress_tx.clone()) };
        let Some(tx) = tx else { return };
        match tokio::time::timeout(JSON_ENQUEUE_TIMEOUT, tx.send(Egress::Json(payload))).await {
            Ok(Ok(())) => {}
            _ => {
                warn!(session_id = %self.session_id, "json enqueue stalled, closing peer slot");
                if let Some(prev) = slot.lock().await.take() {
                    prev.abort();
                }
            }
        }
    }

    async fn enqueue_binary(self: &Arc<Self>, slot: &AsyncMutex<Option<PeerSlot>>, payload: Vec<u8>) {
        let tx = { slot.lock().await.as_ref().map(|s| s.egress_tx.clone()) };
        let Some(tx) = tx else { return };
        if tx.try_send(Egress::Binary(payload)).is_err() {
            metrics::BINARY_FRAMES_DROPPED_TOTAL.inc();
            warn!(session_id = %self.session_id, "binary egress full, dropping frame");
        }
    }

    async fn persist(&self) {
        self.store
            .save(
                &self.session_id,
                &ResumeMetadata {
                    tenant_id: self.tenant_id.clone(),
                    last_seq: self.seq.load(Ordering::SeqCst),
                    expires_at: self.expires_at_unix,
                },
                self.session_ttl.as_secs(),
            )
            .await;
    }

    pub async fn persist_resume_metadata(&self) {
        self.persist().await;
    }

    /// Orderly close. Idempotent: a second call is a no-op. Broadcasts an
    /// `err` frame with `reason` to any still-attached peer, tears down both
    /// slots, and persists resume metadata if a side-store is configured.
    pub async fn close(self: &Arc<Self>, reason: &str) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        *self.state.lock().expect("state mutex poisoned") = SessionState::Closed;

        let err = ControlFrame::err(&self.session_id, reason);
        let json = err.to_json().into_bytes();

        if let Some(slot) = self.host.lock().await.take() {
            let _ = slot.egress_tx.try_send(Egress::Json(json.clone()));
            slot.abort();
        }
        if let Some(slot) = self.client.lock().await.take() {
            let _ = slot.egress_tx.try_send(Egress::Json(json));
            slot.abort();
        }

        self.persist().await;
        info!(session_id = %self.session_id, reason, "session closed");
    }
}

fn spawn_write_pump(mut sink: WsSink, mut egress_rx: mpsc::Receiver<Egress>, kill: Arc<Notify>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                () = kill.notified() => break,
                item = egress_rx.recv() => {
                    match item {
                        None => break,
                        Some(Egress::Json(payload)) => {
                            // classify() only inspects the leading byte, so a
                            // `{`-prefixed frame that arrived as WS Binary can
                            // still contain non-UTF-8 bytes. WS Text frames
                            // must be valid UTF-8 -- fall back to Binary
                            // rather than mangling the payload into "".
                            let sent = match String::from_utf8(payload) {
                                Ok(text) => sink.send(WsMessage::Text(text.into())).await,
                                Err(e) => sink.send(WsMessage::Binary(e.into_bytes().into())).await,
                            };
                            if sent.is_err() { break; }
                        }
                        Some(Egress::Binary(payload)) => {
                            if sink.send(WsMessage::Binary(payload.into())).await.is_err() { break; }
                        }
                    }
                }
            }
        }
    })
}

async fn run_host_read_pump(actor: Arc<Actor>, mut stream: WsStream, kill: Arc<Notify>) {
    let natural_close = loop {
        tokio::select! {
            biased;
            () = kill.notified() => break false,
            msg = stream.next() => {
                match msg {
                    None => break true,
                    Some(Err(e)) => { warn!(session_id = %actor.session_id, error = %e, "host socket error"); break true; }
                    Some(Ok(WsMessage::Close(_))) => break true,
                    Some(Ok(WsMessage::Ping(_) | WsMessage::Pong(_))) => actor.touch(),
                    Some(Ok(WsMessage::Text(text))) => actor.forward_from_host(text.as_bytes().to_vec()).await,
                    Some(Ok(WsMessage::Binary(bin))) => actor.forward_from_host(bin.to_vec()).await,
                }
            }
        }
    };
    if natural_close {
        actor.detach_host().await;
    }
}

async fn run_client_read_pump(actor: Arc<Actor>, mut stream: WsStream, kill: Arc<Notify>) {
    let natural_close = loop {
        tokio::select! {
            biased;
            () = kill.notified() => break false,
            msg = stream.next() => {
                match msg {
                    None => break true,
                    Some(Err(e)) => { warn!(session_id = %actor.session_id, error = %e, "client socket error"); break true; }
                    Some(Ok(WsMessage::Close(_))) => break true,
                    Some(Ok(WsMessage::Ping(_) | WsMessage::Pong(_))) => actor.touch(),
                    Some(Ok(WsMessage::Text(text))) => actor.forward_from_client(text.as_bytes().to_vec()).await,
                    Some(Ok(WsMessage::Binary(bin))) => actor.forward_from_client(bin.to_vec()).await,
                }
            }
        }
    };
    if natural_close {
        actor.detach_client().await;
    }
}
