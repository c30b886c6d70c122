//! # Dinemap
//!
//! Backend for a restaurant-discovery map. Serves the restaurant list as
//! JSON, authenticates a single administrator, and ingests saved map-listing
//! pages into a blob-backed JSON document.
//!
//! ## Architecture
//!
//! ```text
//!   saved listing page
//!          │
//!          ▼
//! ┌──────────────┐   ┌─────────────┐   ┌──────────────┐
//! │  Extraction  │──▶│   Dedupe     │──▶│ Record store │
//! │ anchors/cards│   │  by mapsUrl  │   │  JSON blob   │
//! └──────────────┘   └─────────────┘   └──────┬───────┘
//!                                             │
//!                      ┌──────────────────────┤
//!                      ▼                      ▼
//!                 ┌──────────┐          ┌──────────┐
//!                 │   CLI    │          │   HTTP   │
//!                 │(dinemap) │          │  (axum)  │
//!                 └──────────┘          └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! dinemap extract saved-page.html          # dry run, prints records
//! dinemap import saved-page.html           # ingest into the store
//! dinemap list                             # show what is stored
//! ADMIN_USERNAME=admin ADMIN_PASSWORD=... JWT_SECRET=... dinemap serve
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and environment secrets |
//! | [`models`] | Restaurant record and validity screen |
//! | [`blob`] | Blob storage trait, filesystem and in-memory backends |
//! | [`blob_s3`] | S3 blob backend |
//! | [`store`] | Restaurant document read/write |
//! | [`auth`] | Credential check and session tokens |
//! | [`extract`] | HTML extraction strategies |
//! | [`ingest`] | Upload pipeline and deduplication |
//! | [`quality`] | Data-quality counters |
//! | [`server`] | HTTP server |
//! | `signing` | SHA-256 / HMAC helpers shared by tokens and S3 |

pub mod auth;
pub mod blob;
pub mod blob_s3;
pub mod config;
pub mod extract;
pub mod ingest;
pub mod models;
pub mod quality;
pub mod server;
mod signing;
pub mod store;
