use std::collections::VecDeque;
use std::sync::Mutex;

struct Entry {
    seq: u64,
    payload: Vec<u8>,
}

/// Bounded FIFO of `(seq, payload)` pairs, capped by total retained bytes
/// rather than entry count. Holds only JSON control frames -- binary data is
/// never replayable (see the session actor's forwarding rules).
pub struct Ring {
    capacity_bytes: usize,
    entries: Mutex<VecDeque<Entry>>,
}

impl Ring {
    pub fn new(capacity_bytes: usize) -> Self {
        Self { capacity_bytes, entries: Mutex::new(VecDeque::new()) }
    }

    /// Copies `payload`, appends `(seq, copy)`, then evicts from the head
    /// while total bytes exceed capacity. A single entry larger than
    /// capacity is permitted to sit in the ring transiently -- it is evicted
    /// on the following push.
    pub fn push(&self, seq: u64, payload: &[u8]) {
        let mut entries = self.entries.lock().expect("ring mutex poisoned");
        entries.push_back(Entry { seq, payload: payload.to_vec() });
        let mut total: usize = entries.iter().map(|e| e.payload.len()).sum();
        while total > self.capacity_bytes && entries.len() > 1 {
            if let Some(evicted) = entries.pop_front() {
                total -= evicted.payload.len();
            }
        }
    }

    /// Returns payload copies for every retained entry with `seq > after_seq`,
    /// ordered ascending by seq. Returns an empty vec both when nothing
    /// qualifies and when the whole ring has been evicted past `after_seq` --
    /// callers distinguish those cases with `oldest_retained_seq`.
    pub fn replay_from(&self, after_seq: u64) -> Vec<Vec<u8>> {
        let entries = self.entries.lock().expect("ring mutex poisoned");
        entries
            .iter()
            .filter(|e| e.seq > after_seq)
            .map(|e| e.payload.clone())
            .collect()
    }

    /// The smallest seq currently retained, or `None` if the ring is empty.
    pub fn oldest_retained_seq(&self) -> Option<u64> {
        self.entries.lock().expect("ring mutex poisoned").front().map(|e| e.seq)
    }

    pub fn total_bytes(&self) -> usize {
        self.entries.lock().expect("ring mutex poisoned").iter().map(|e| e.payload.len()).sum()
    }
}
