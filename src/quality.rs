//! Data-quality counters.
//!
//! Extraction drops candidates and the record store screens out invalid
//! entries without failing the request. Those exclusions are counted here so
//! a regression in scraped or persisted data shows up in `GET /health`
//! instead of only in debug logs.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct QualityCounters {
    ingestions: AtomicU64,
    candidates_dropped: AtomicU64,
    records_rejected: AtomicU64,
    records_added: AtomicU64,
}

/// Point-in-time copy of [`QualityCounters`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub struct QualitySnapshot {
    pub ingestions: u64,
    pub candidates_dropped: u64,
    pub records_rejected: u64,
    pub records_added: u64,
}

impl QualityCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_ingestion(&self, added: usize) {
        self.ingestions.fetch_add(1, Ordering::Relaxed);
        self.records_added.fetch_add(added as u64, Ordering::Relaxed);
    }

    pub fn record_dropped_candidates(&self, n: usize) {
        self.candidates_dropped.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn record_rejected_records(&self, n: usize) {
        self.records_rejected.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> QualitySnapshot {
        QualitySnapshot {
            ingestions: self.ingestions.load(Ordering::Relaxed),
            candidates_dropped: self.candidates_dropped.load(Ordering::Relaxed),
            records_rejected: self.records_rejected.load(Ordering::Relaxed),
            records_added: self.records_added.load(Ordering::Relaxed),
        }
    }
}
