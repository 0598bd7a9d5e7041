//! Lightweight global metrics for the GSFA read path.
//!
//! Потокобезопасные атомарные счётчики:
//! - offsets index lookups
//! - linked-log batch reads
//! - range resolver calls
//! - cancellations

use std::sync::atomic::{AtomicU64, Ordering};

// ----- Offsets index -----
static LOOKUPS_TOTAL: AtomicU64 = AtomicU64::new(0);
static LOOKUPS_NOT_FOUND: AtomicU64 = AtomicU64::new(0);

// ----- Linked log -----
static BATCHES_READ: AtomicU64 = AtomicU64::new(0);
static BATCH_BYTES_READ: AtomicU64 = AtomicU64::new(0);

// ----- Reader -----
static LOCATIONS_RETURNED: AtomicU64 = AtomicU64::new(0);
static RESOLVER_CALLS: AtomicU64 = AtomicU64::new(0);
static WALKS_CANCELLED: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    pub lookups_total: u64,
    pub lookups_not_found: u64,

    pub batches_read: u64,
    pub batch_bytes_read: u64,

    pub locations_returned: u64,
    pub resolver_calls: u64,
    pub walks_cancelled: u64,
}

impl MetricsSnapshot {
    pub fn not_found_ratio(&self) -> f64 {
        if self.lookups_total == 0 {
            0.0
        } else {
            self.lookups_not_found as f64 / self.lookups_total as f64
        }
    }

    pub fn avg_batch_bytes(&self) -> f64 {
        if self.batches_read == 0 {
            0.0
        } else {
            self.batch_bytes_read as f64 / self.batches_read as f64
        }
    }
}

// ----- Recorders -----
pub fn record_lookup(found: bool) {
    LOOKUPS_TOTAL.fetch_add(1, Ordering::Relaxed);
    if !found {
        LOOKUPS_NOT_FOUND.fetch_add(1, Ordering::Relaxed);
    }
}

pub fn record_batch_read(frame_bytes: usize) {
    BATCHES_READ.fetch_add(1, Ordering::Relaxed);
    BATCH_BYTES_READ.fetch_add(frame_bytes as u64, Ordering::Relaxed);
}

pub fn record_locations_returned(n: usize) {
    LOCATIONS_RETURNED.fetch_add(n as u64, Ordering::Relaxed);
}

pub fn record_resolver_call() {
    RESOLVER_CALLS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_walk_cancelled() {
    WALKS_CANCELLED.fetch_add(1, Ordering::Relaxed);
}

// ----- Snapshot / Reset -----
pub fn snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        lookups_total: LOOKUPS_TOTAL.load(Ordering::Relaxed),
        lookups_not_found: LOOKUPS_NOT_FOUND.load(Ordering::Relaxed),

        batches_read: BATCHES_READ.load(Ordering::Relaxed),
        batch_bytes_read: BATCH_BYTES_READ.load(Ordering::Relaxed),

        locations_returned: LOCATIONS_RETURNED.load(Ordering::Relaxed),
        resolver_calls: RESOLVER_CALLS.load(Ordering::Relaxed),
        walks_cancelled: WALKS_CANCELLED.load(Ordering::Relaxed),
    }
}

pub fn reset() {
    LOOKUPS_TOTAL.store(0, Ordering::Relaxed);
    LOOKUPS_NOT_FOUND.store(0, Ordering::Relaxed);

    BATCHES_READ.store(0, Ordering::Relaxed);
    BATCH_BYTES_READ.store(0, Ordering::Relaxed);

    LOCATIONS_RETURNED.store(0, Ordering::Relaxed);
    RESOLVER_CALLS.store(0, Ordering::Relaxed);
    WALKS_CANCELLED.store(0, Ordering::Relaxed);
}
