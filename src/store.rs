//! Record store.
//!
//! The full restaurant list lives in one JSON document inside a
//! [`BlobStore`], newest records first. Reading screens every entry against
//! the validity invariant and leaves out the ones that fail; writing
//! replaces the whole document and stamps it with the write time.
//!
//! Reads and writes are not coordinated: two ingestions that read the same
//! snapshot each write their own merge, and the later write wins.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use thiserror::Error;

use crate::blob::{self, Blob, BlobStore};
use crate::config::Config;
use crate::models::{DocumentMetadata, Rejection, RestaurantRecord, Screened};
use crate::quality::QualityCounters;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend error: {0:#}")]
    Backend(#[from] anyhow::Error),

    #[error("stored restaurant document is not a JSON array: {0}")]
    Corrupt(#[source] serde_json::Error),
}

#[derive(Clone)]
pub struct RecordStore {
    blobs: Arc<dyn BlobStore>,
    key: String,
    quality: Arc<QualityCounters>,
}

impl RecordStore {
    pub fn new(blobs: Arc<dyn BlobStore>, key: impl Into<String>) -> Self {
        Self {
            blobs,
            key: key.into(),
            quality: Arc::new(QualityCounters::new()),
        }
    }

    /// Shares a counter set with the rest of the process.
    pub fn with_quality(mut self, quality: Arc<QualityCounters>) -> Self {
        self.quality = quality;
        self
    }

    pub fn quality(&self) -> &Arc<QualityCounters> {
        &self.quality
    }

    pub fn describe(&self) -> String {
        format!("{} ({})", self.blobs.describe(), self.key)
    }

    /// Valid records in document order. A missing document reads as empty.
    pub async fn read_all(&self) -> Result<Vec<RestaurantRecord>, StoreError> {
        Ok(self.read_screened().await?.valid)
    }

    /// Like [`read_all`](Self::read_all) but also returns what was screened out.
    pub async fn read_screened(&self) -> Result<Screened, StoreError> {
        let Some(blob) = self.blobs.get(&self.key).await? else {
            return Ok(Screened::default());
        };
        if blob.body.trim().is_empty() {
            return Ok(Screened::default());
        }

        let entries: Vec<serde_json::Value> =
            serde_json::from_str(&blob.body).map_err(StoreError::Corrupt)?;
        let screened = screen(entries);

        if !screened.rejected.is_empty() {
            for r in &screened.rejected {
                tracing::debug!(index = r.index, reason = %r.reason, "stored record rejected");
            }
            tracing::warn!(
                rejected = screened.rejected.len(),
                valid = screened.valid.len(),
                "store contains invalid records"
            );
            self.quality.record_rejected_records(screened.rejected.len());
        }

        Ok(screened)
    }

    /// Writes `new_records` followed by `existing` as the whole document.
    pub async fn append_and_persist(
        &self,
        existing: &[RestaurantRecord],
        new_records: &[RestaurantRecord],
    ) -> Result<(), StoreError> {
        let existing = existing
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(anyhow::Error::from)?;
        self.write_document(new_records, &existing).await
    }

    /// Writes `new_records` ahead of every entry in `snapshot`, including
    /// the ones that failed screening, so a rewrite never silently erases
    /// stored data.
    pub async fn prepend_to_snapshot(
        &self,
        snapshot: &Screened,
        new_records: &[RestaurantRecord],
    ) -> Result<(), StoreError> {
        self.write_document(new_records, &snapshot.entries).await
    }

    async fn write_document(
        &self,
        new_records: &[RestaurantRecord],
        existing: &[serde_json::Value],
    ) -> Result<(), StoreError> {
        let mut document = Vec::with_capacity(new_records.len() + existing.len());
        for record in new_records {
            document.push(serde_json::to_value(record).map_err(anyhow::Error::from)?);
        }
        document.extend(existing.iter().cloned());
        let body = serde_json::to_string_pretty(&document).map_err(anyhow::Error::from)?;

        self.blobs
            .put(
                &self.key,
                Blob {
                    body,
                    metadata: DocumentMetadata {
                        updated_at: Some(Utc::now()),
                    },
                },
            )
            .await?;

        tracing::info!(
            added = new_records.len(),
            total = document.len(),
            store = %self.describe(),
            "restaurant document written"
        );
        Ok(())
    }

    /// Last-write timestamp of the document, if it exists.
    pub async fn metadata(&self) -> Result<Option<DocumentMetadata>, StoreError> {
        Ok(self.blobs.get(&self.key).await?.map(|b| b.metadata))
    }
}

/// `dinemap list`: print the stored records and how many were screened out.
pub async fn run_list(config: &Config) -> anyhow::Result<()> {
    let store = RecordStore::new(blob::open(&config.store)?, config.store.key.clone());
    let screened = store.read_screened().await?;
    let updated_at = store.metadata().await?.and_then(|m| m.updated_at);

    println!("list");
    println!("  store: {}", store.describe());
    match updated_at {
        Some(t) => println!("  updated: {}", t.to_rfc3339()),
        None => println!("  updated: never"),
    }
    println!("  records: {}", screened.valid.len());
    for r in &screened.valid {
        println!("    {} | {} | {} | {}", r.name, r.cuisine, r.rating, r.maps_url);
    }
    println!("  rejected: {}", screened.rejected.len());
    for r in &screened.rejected {
        println!("    #{}: {}", r.index, r.reason);
    }
    println!("ok");

    Ok(())
}

/// Splits raw document entries into valid records and rejections.
fn screen(entries: Vec<serde_json::Value>) -> Screened {
    let mut out = Screened::default();
    for (index, entry) in entries.iter().enumerate() {
        let reason = match RestaurantRecord::deserialize(entry) {
            Ok(record) => match record.check() {
                Ok(()) => {
                    out.valid.push(record);
                    continue;
                }
                Err(field) => field.to_string(),
            },
            Err(e) => format!("malformed entry: {}", e),
        };
        let maps_url = entry
            .get("mapsUrl")
            .and_then(serde_json::Value::as_str)
            .filter(|u| !u.trim().is_empty())
            .map(str::to_string);
        out.rejected.push(Rejection {
            index,
            reason,
            maps_url,
        });
    }
    out.entries = entries;
    out
}
