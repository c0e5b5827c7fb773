//! Spill metrics
//!
//! Counters only, monotonic, relaxed atomics. One registry is typically
//! shared by every set a `SetFactory` produces.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters for spilling and reloading sorted sets
#[derive(Debug, Default)]
pub struct SpillMetrics {
    persists: AtomicU64,
    persist_failures: AtomicU64,
    verification_failures: AtomicU64,
    loads: AtomicU64,
    elements_spilled: AtomicU64,
    elements_loaded: AtomicU64,
    files_deleted: AtomicU64,
}

impl SpillMetrics {
    /// Create a registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful persist of `elements` elements
    pub fn record_persist(&self, elements: u64) {
        self.persists.fetch_add(1, Ordering::Relaxed);
        self.elements_spilled.fetch_add(elements, Ordering::Relaxed);
    }

    /// Record a failed persist
    pub fn record_persist_failure(&self, verification: bool) {
        self.persist_failures.fetch_add(1, Ordering::Relaxed);
        if verification {
            self.verification_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a successful load of `elements` elements
    pub fn record_load(&self, elements: u64) {
        self.loads.fetch_add(1, Ordering::Relaxed);
        self.elements_loaded.fetch_add(elements, Ordering::Relaxed);
    }

    /// Record a deleted backing file
    pub fn record_file_deleted(&self) {
        self.files_deleted.fetch_add(1, Ordering::Relaxed);
    }

    /// Get all counters as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            persists: self.persists.load(Ordering::Relaxed),
            persist_failures: self.persist_failures.load(Ordering::Relaxed),
            verification_failures: self.verification_failures.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
            elements_spilled: self.elements_spilled.load(Ordering::Relaxed),
            elements_loaded: self.elements_loaded.load(Ordering::Relaxed),
            files_deleted: self.files_deleted.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub persists: u64,
    pub persist_failures: u64,
    pub verification_failures: u64,
    pub loads: u64,
    pub elements_spilled: u64,
    pub elements_loaded: u64,
    pub files_deleted: u64,
}
