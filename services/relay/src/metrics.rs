use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntGauge, Opts, Registry, TextEncoder};

static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

pub static ACTIVE_SESSIONS: Lazy<IntGauge> = Lazy::new(|| {
    let g = IntGauge::new("active_sessions", "Live sessions in the hub").expect("active_sessions");
    REGISTRY.register(Box::new(g.clone())).ok();
    g
});

pub static CONNECTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let c = IntCounter::new("connects_total", "Peer attach events").expect("connects_total");
    REGISTRY.register(Box::new(c.clone())).ok();
    c
});

pub static BYTES_HOST_TO_CLIENT_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let c = IntCounter::with_opts(Opts::new(
        "bytes_host_to_client_total",
        "Binary bytes forwarded host to client",
    ))
    .expect("bytes_host_to_client_total");
    REGISTRY.register(Box::new(c.clone())).ok();
    c
});

pub static THROTTLE_EVENTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let c = IntCounter::new("throttle_events_total", "Rate-limit throttle notices emitted")
        .expect("throttle_events_total");
    REGISTRY.register(Box::new(c.clone())).ok();
    c
});

pub static FRAMES_JSON_RING_REPLAYED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let c = IntCounter::new(
        "frames_json_ring_replayed_total",
        "JSON frames replayed to a resuming client",
    )
    .expect("frames_json_ring_replayed_total");
    REGISTRY.register(Box::new(c.clone())).ok();
    c
});

pub static BINARY_FRAMES_DROPPED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let c = IntCounter::new(
        "binary_frames_dropped_total",
        "Binary frames dropped because a peer's egress channel was full",
    )
    .expect("binary_frames_dropped_total");
    REGISTRY.register(Box::new(c.clone())).ok();
    c
});

/// Renders the registry in Prometheus text-exposition format. Gated by the
/// admin bearer token at the HTTP layer -- this function itself has no
/// notion of authentication.
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let families = REGISTRY.gather();
    let mut buf = Vec::new();
    encoder.encode(&families, &mut buf).expect("prometheus exposition encoding never fails");
    String::from_utf8(buf).expect("prometheus exposition output is always UTF-8")
}
