//! Ingestion pipeline orchestration.
//!
//! Coordinates one upload: saved page → extraction → deduplication against
//! the current store snapshot → prepend and persist. Used by both
//! `POST /api/maps_upload` and the `dinemap import` command.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use thiserror::Error;

use crate::blob;
use crate::config::Config;
use crate::extract::{Extraction, Extractor};
use crate::models::RestaurantRecord;
use crate::quality::QualityCounters;
use crate::store::{RecordStore, StoreError};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("No HTML data provided.")]
    MissingHtml,

    #[error("No restaurants found in the uploaded page.")]
    NothingExtracted,

    #[error("No new restaurants found.")]
    NothingNew,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Counts from a successful ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub extracted: usize,
    pub dropped: usize,
    pub duplicates: usize,
    pub added: usize,
    /// Entries in the document after the write, including hidden ones.
    pub total: usize,
}

/// Candidates whose `mapsUrl` does not already appear in `existing`, in
/// their original order.
pub fn dedupe(
    existing: &[RestaurantRecord],
    candidates: Vec<RestaurantRecord>,
) -> Vec<RestaurantRecord> {
    let seen: HashSet<&str> = existing.iter().map(|r| r.maps_url.as_str()).collect();
    dedupe_against(&seen, candidates)
}

/// Candidates whose `mapsUrl` is not in `known`, in their original order.
pub fn dedupe_against(
    known: &HashSet<&str>,
    candidates: Vec<RestaurantRecord>,
) -> Vec<RestaurantRecord> {
    candidates
        .into_iter()
        .filter(|c| !known.contains(c.maps_url.as_str()))
        .collect()
}

pub struct Ingestor {
    store: RecordStore,
    extractor: Arc<Extractor>,
    quality: Arc<QualityCounters>,
}

impl Ingestor {
    pub fn new(store: RecordStore, extractor: Arc<Extractor>) -> Self {
        let quality = store.quality().clone();
        Self {
            store,
            extractor,
            quality,
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Runs the whole pipeline over one uploaded page.
    ///
    /// Empty extraction and an all-duplicate batch are distinct errors so
    /// callers can tell "nothing scraped" from "nothing new".
    pub async fn ingest_html(&self, html: &str) -> Result<IngestReport, IngestError> {
        if html.trim().is_empty() {
            return Err(IngestError::MissingHtml);
        }

        let Extraction { records, dropped } = self.extractor.extract(html);
        self.quality.record_dropped_candidates(dropped.len());
        if records.is_empty() {
            tracing::warn!(dropped = dropped.len(), "upload produced no restaurants");
            return Err(IngestError::NothingExtracted);
        }
        let extracted = records.len();

        // Stored entries that fail screening still count as known, so an
        // incomplete record is not appended again on every re-upload.
        let snapshot = self.store.read_screened().await?;
        let fresh = dedupe_against(&snapshot.known_urls(), records);
        if fresh.is_empty() {
            tracing::info!(extracted, "upload contained only known restaurants");
            return Err(IngestError::NothingNew);
        }

        self.store.prepend_to_snapshot(&snapshot, &fresh).await?;
        self.quality.record_ingestion(fresh.len());

        let incomplete = fresh.iter().filter(|r| !r.is_valid()).count();
        if incomplete > 0 {
            tracing::warn!(
                incomplete,
                "stored records that will be hidden until their missing fields are filled"
            );
        }

        Ok(IngestReport {
            extracted,
            dropped: dropped.len(),
            duplicates: extracted - fresh.len(),
            added: fresh.len(),
            total: snapshot.entries.len() + fresh.len(),
        })
    }
}

/// `dinemap import <file>`: ingest a saved page into the configured store.
pub async fn run_import(config: &Config, path: &Path) -> Result<()> {
    let html = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let store = RecordStore::new(blob::open(&config.store)?, config.store.key.clone());
    let extractor = Arc::new(Extractor::new(config.extraction.clone())?);
    let ingestor = Ingestor::new(store, extractor);

    let report = ingestor.ingest_html(&html).await?;

    println!("import {}", path.display());
    println!("  store: {}", ingestor.store().describe());
    println!("  extracted: {}", report.extracted);
    println!("  dropped candidates: {}", report.dropped);
    println!("  duplicates: {}", report.duplicates);
    println!("  added: {}", report.added);
    println!("  total: {}", report.total);
    println!("ok");

    Ok(())
}
