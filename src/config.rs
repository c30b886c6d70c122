//! Configuration loading.
//!
//! Non-secret settings come from a TOML file; every section and field has a
//! default so an empty file is a valid configuration. Secrets (admin identity
//! and token-signing key) are read from the environment once at startup into
//! an immutable [`Secrets`] value.
//!
//! # Example
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0:8888"
//!
//! [store]
//! backend = "s3"
//! key = "restaurants_list.json"
//!
//! [store.s3]
//! bucket = "restaurant-data"
//! region = "us-east-1"
//!
//! [extraction]
//! strategy = "search_anchors"
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable holding the administrator username.
pub const ENV_ADMIN_USERNAME: &str = "ADMIN_USERNAME";
/// Environment variable holding the administrator password.
pub const ENV_ADMIN_PASSWORD: &str = "ADMIN_PASSWORD";
/// Environment variable holding the session-token signing secret.
pub const ENV_JWT_SECRET: &str = "JWT_SECRET";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8888".to_string()
}
fn default_max_upload_bytes() -> usize {
    16 * 1024 * 1024
}

/// Which blob backend holds the restaurant document.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Filesystem,
    S3,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Logical name of the document inside the blob store.
    #[serde(default = "default_store_key")]
    pub key: String,
    /// Root directory for the `filesystem` backend.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    #[serde(default)]
    pub s3: Option<S3StoreConfig>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            key: default_store_key(),
            path: default_store_path(),
            s3: None,
        }
    }
}

fn default_store_key() -> String {
    "restaurants_list.json".to_string()
}
fn default_store_path() -> PathBuf {
    PathBuf::from("./data")
}

#[derive(Debug, Deserialize, Clone)]
pub struct S3StoreConfig {
    pub bucket: String,
    #[serde(default)]
    pub prefix: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint for S3-compatible services (MinIO, LocalStack).
    #[serde(default)]
    pub endpoint_url: Option<String>,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_ttl_secs: default_token_ttl_secs(),
        }
    }
}

fn default_token_ttl_secs() -> i64 {
    2 * 60 * 60
}

/// Which markup shape the uploaded listing page is scraped as.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStrategy {
    /// Search-result anchors carrying `q=` and `ludocid=` in their links.
    #[default]
    SearchAnchors,
    /// Map-sidebar place cards (`div[role="article"]`).
    PlaceCards,
}

impl std::str::FromStr for ExtractionStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "search_anchors" => Ok(Self::SearchAnchors),
            "place_cards" => Ok(Self::PlaceCards),
            other => bail!(
                "Unknown extraction strategy: '{}'. Must be search_anchors or place_cards.",
                other
            ),
        }
    }
}

impl std::fmt::Display for ExtractionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::SearchAnchors => "search_anchors",
            Self::PlaceCards => "place_cards",
        })
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExtractionConfig {
    #[serde(default)]
    pub strategy: ExtractionStrategy,
    /// Path fragment identifying links to the provider's search endpoint.
    #[serde(default = "default_search_path")]
    pub search_path: String,
    #[serde(default = "default_image_cdn_prefix")]
    pub image_cdn_prefix: String,
    #[serde(default = "default_maps_url_base")]
    pub maps_url_base: String,
    #[serde(default = "default_placeholder_address")]
    pub placeholder_address: String,
    #[serde(default = "default_placeholder_lat")]
    pub placeholder_lat: f64,
    #[serde(default = "default_placeholder_lng")]
    pub placeholder_lng: f64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            strategy: ExtractionStrategy::default(),
            search_path: default_search_path(),
            image_cdn_prefix: default_image_cdn_prefix(),
            maps_url_base: default_maps_url_base(),
            placeholder_address: default_placeholder_address(),
            placeholder_lat: default_placeholder_lat(),
            placeholder_lng: default_placeholder_lng(),
        }
    }
}

fn default_search_path() -> String {
    "/search".to_string()
}
fn default_image_cdn_prefix() -> String {
    "https://lh3.googleusercontent.com/".to_string()
}
fn default_maps_url_base() -> String {
    "https://maps.google.com/".to_string()
}
fn default_placeholder_address() -> String {
    "Address unavailable".to_string()
}
fn default_placeholder_lat() -> f64 {
    40.7580
}
fn default_placeholder_lng() -> f64 {
    -73.9855
}

impl Config {
    /// All-defaults configuration, used when no config file is available.
    pub fn minimal() -> Self {
        Self::default()
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;

    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.server.max_upload_bytes == 0 {
        bail!("server.max_upload_bytes must be > 0");
    }

    if config.store.key.trim().is_empty() {
        bail!("store.key must not be empty");
    }

    if config.store.backend == StoreBackend::S3 {
        match &config.store.s3 {
            Some(s3) if !s3.bucket.is_empty() => {}
            _ => bail!("store.s3.bucket must be set when store.backend is 's3'"),
        }
    }

    if config.auth.token_ttl_secs <= 0 {
        bail!("auth.token_ttl_secs must be > 0");
    }

    let ex = &config.extraction;
    if ex.image_cdn_prefix.is_empty() {
        bail!("extraction.image_cdn_prefix must not be empty");
    }
    if ex.search_path.is_empty() {
        bail!("extraction.search_path must not be empty");
    }
    // Records with a zero coordinate fail the validity screen on read.
    if ex.placeholder_lat == 0.0 || ex.placeholder_lng == 0.0 {
        bail!("extraction.placeholder_lat and placeholder_lng must be non-zero");
    }
    if ex.placeholder_address.trim().is_empty() {
        bail!("extraction.placeholder_address must not be empty");
    }

    Ok(())
}

/// Secrets read from the environment at process start.
///
/// Absent values are kept as `None`; the operations that need them fail
/// with a configuration error at first use.
#[derive(Clone, Default)]
pub struct Secrets {
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    pub jwt_secret: Option<String>,
}

impl Secrets {
    pub fn from_env() -> Self {
        Self {
            admin_username: non_empty_var(ENV_ADMIN_USERNAME),
            admin_password: non_empty_var(ENV_ADMIN_PASSWORD),
            jwt_secret: non_empty_var(ENV_JWT_SECRET),
        }
    }

    /// Names of the required variables that are not set.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.admin_username.is_none() {
            missing.push(ENV_ADMIN_USERNAME);
        }
        if self.admin_password.is_none() {
            missing.push(ENV_ADMIN_PASSWORD);
        }
        if self.jwt_secret.is_none() {
            missing.push(ENV_JWT_SECRET);
        }
        missing
    }
}

// Keeps secret values out of logs.
impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("admin_username", &self.admin_username.is_some())
            .field("admin_password", &self.admin_password.is_some())
            .field("jwt_secret", &self.jwt_secret.is_some())
            .finish()
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
