//! S3-compatible blob backend.
//!
//! Reads and writes a single object per key using the S3 REST API with
//! AWS Signature V4 authentication. Signing is done with `hmac` + `sha2`
//! directly; no AWS SDK.
//!
//! # Configuration
//!
//! ```toml
//! [store]
//! backend = "s3"
//!
//! [store.s3]
//! bucket = "restaurant-data"
//! prefix = "prod/"
//! region = "us-east-1"
//! # endpoint_url = "http://localhost:9000"   # MinIO, path-style
//! ```
//!
//! Credentials: `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`, and optionally
//! `AWS_SESSION_TOKEN`.
//!
//! The document's last-write timestamp travels as the
//! `x-amz-meta-updated-at` object metadata header.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;

use crate::blob::{Blob, BlobStore};
use crate::config::S3StoreConfig;
use crate::models::DocumentMetadata;
use crate::signing::{hex_sha256, hmac_sha256, uri_encode};

const UPDATED_AT_HEADER: &str = "x-amz-meta-updated-at";

pub struct S3BlobStore {
    config: S3StoreConfig,
    creds: AwsCredentials,
    client: reqwest::Client,
}

impl S3BlobStore {
    pub fn from_env(config: S3StoreConfig) -> Result<Self> {
        Ok(Self {
            config,
            creds: AwsCredentials::from_env()?,
            client: reqwest::Client::new(),
        })
    }

    fn object_key(&self, key: &str) -> String {
        if self.config.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}/{}", self.config.prefix.trim_end_matches('/'), key)
        }
    }

    /// Returns `(url, host, canonical_uri)` for an object.
    ///
    /// Custom endpoints are addressed path-style (`/<bucket>/<key>`);
    /// AWS itself virtual-hosted-style.
    fn locate(&self, object_key: &str) -> (String, String, String) {
        let encoded_key = object_key
            .split('/')
            .map(uri_encode)
            .collect::<Vec<_>>()
            .join("/");

        match self.config.endpoint_url {
            Some(ref endpoint) => {
                let scheme = if endpoint.starts_with("http://") {
                    "http"
                } else {
                    "https"
                };
                let host = endpoint
                    .trim_start_matches("https://")
                    .trim_start_matches("http://")
                    .trim_end_matches('/')
                    .to_string();
                let uri = format!("/{}/{}", uri_encode(&self.config.bucket), encoded_key);
                (format!("{}://{}{}", scheme, host, uri), host, uri)
            }
            None => {
                let host = format!(
                    "{}.s3.{}.amazonaws.com",
                    self.config.bucket, self.config.region
                );
                let uri = format!("/{}", encoded_key);
                (format!("https://{}{}", host, uri), host, uri)
            }
        }
    }

    /// Builds a SigV4-signed request. `extra_headers` are signed too.
    fn signed_request(
        &self,
        method: reqwest::Method,
        object_key: &str,
        payload: &[u8],
        extra_headers: &[(&str, String)],
    ) -> reqwest::RequestBuilder {
        let (url, host, canonical_uri) = self.locate(object_key);

        let now = Utc::now();
        let date_stamp = now.format("%Y%m%d").to_string();
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let payload_hash = hex_sha256(payload);

        let mut headers = vec![
            ("host".to_string(), host),
            ("x-amz-content-sha256".to_string(), payload_hash.clone()),
            ("x-amz-date".to_string(), amz_date.clone()),
        ];
        if let Some(ref token) = self.creds.session_token {
            headers.push(("x-amz-security-token".to_string(), token.clone()));
        }
        for (name, value) in extra_headers {
            headers.push((name.to_ascii_lowercase(), value.trim().to_string()));
        }
        headers.sort_by(|a, b| a.0.cmp(&b.0));

        let signed_headers: String = headers
            .iter()
            .map(|(k, _)| k.as_str())
            .collect::<Vec<_>>()
            .join(";");

        let canonical_headers: String = headers
            .iter()
            .map(|(k, v)| format!("{}:{}\n", k, v))
            .collect();

        let canonical_request = format!(
            "{}\n{}\n\n{}\n{}\n{}",
            method.as_str(),
            canonical_uri,
            canonical_headers,
            signed_headers,
            payload_hash
        );

        let credential_scope = format!("{}/{}/s3/aws4_request", date_stamp, self.config.region);
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{}\n{}\n{}",
            amz_date,
            credential_scope,
            hex_sha256(canonical_request.as_bytes())
        );

        let signing_key = derive_signing_key(
            &self.creds.secret_access_key,
            &date_stamp,
            &self.config.region,
            "s3",
        );
        let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes()));

        let authorization = format!(
            "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
            self.creds.access_key_id, credential_scope, signed_headers, signature
        );

        let mut req = self
            .client
            .request(method, &url)
            .header("Authorization", authorization);
        // `host` is set by the client from the URL.
        for (name, value) in headers.into_iter().filter(|(k, _)| k != "host") {
            req = req.header(name, value);
        }
        req
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn get(&self, key: &str) -> Result<Option<Blob>> {
        let object_key = self.object_key(key);
        let resp = self
            .signed_request(reqwest::Method::GET, &object_key, b"", &[])
            .send()
            .await
            .with_context(|| {
                format!("Failed to get s3://{}/{}", self.config.bucket, object_key)
            })?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!(
                "S3 GetObject failed (HTTP {}) for key '{}': {}",
                status,
                object_key,
                body.chars().take(500).collect::<String>()
            );
        }

        let updated_at = resp
            .headers()
            .get(UPDATED_AT_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        let bytes = resp.bytes().await?;
        Ok(Some(Blob {
            body: String::from_utf8_lossy(&bytes).to_string(),
            metadata: DocumentMetadata { updated_at },
        }))
    }

    async fn put(&self, key: &str, blob: Blob) -> Result<()> {
        let object_key = self.object_key(key);
        let mut extra = vec![("content-type", "application/json".to_string())];
        if let Some(ts) = blob.metadata.updated_at {
            extra.push((UPDATED_AT_HEADER, ts.to_rfc3339()));
        }

        let payload = blob.body.into_bytes();
        let resp = self
            .signed_request(reqwest::Method::PUT, &object_key, &payload, &extra)
            .body(payload)
            .send()
            .await
            .with_context(|| {
                format!("Failed to put s3://{}/{}", self.config.bucket, object_key)
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!(
                "S3 PutObject failed (HTTP {}) for key '{}': {}",
                status,
                object_key,
                body.chars().take(500).collect::<String>()
            );
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("s3://{}/{}", self.config.bucket, self.config.prefix)
    }
}

// ============ AWS Credentials ============

struct AwsCredentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
}

impl AwsCredentials {
    fn from_env() -> Result<Self> {
        let required = |name: &str| {
            std::env::var(name)
                .ok()
                .filter(|v| !v.is_empty())
                .with_context(|| format!("{} is not set; the s3 store needs it", name))
        };
        Ok(Self {
            access_key_id: required("AWS_ACCESS_KEY_ID")?,
            secret_access_key: required("AWS_SECRET_ACCESS_KEY")?,
            session_token: std::env::var("AWS_SESSION_TOKEN")
                .ok()
                .filter(|v| !v.is_empty()),
        })
    }
}

/// SigV4 key derivation: the secret is chained through date, region,
/// service and the literal `aws4_request`.
fn derive_signing_key(secret_key: &str, date_stamp: &str, region: &str, service: &str) -> Vec<u8> {
    [region, service, "aws4_request"].iter().fold(
        hmac_sha256(format!("AWS4{}", secret_key).as_bytes(), date_stamp.as_bytes()),
        |key, part| hmac_sha256(&key, part.as_bytes()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(endpoint: Option<&str>, prefix: &str) -> S3BlobStore {
        S3BlobStore {
            config: S3StoreConfig {
                bucket: "eats".to_string(),
                prefix: prefix.to_string(),
                region: "us-east-1".to_string(),
                endpoint_url: endpoint.map(str::to_string),
            },
            creds: AwsCredentials {
                access_key_id: "AKIDEXAMPLE".to_string(),
                secret_access_key: "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".to_string(),
                session_token: None,
            },
            client: reqwest::Client::new(),
        }
    }

    #[test]
    fn signing_key_matches_aws_reference() {
        // From the AWS SigV4 documentation example.
        let key = derive_signing_key(
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            "20120215",
            "us-east-1",
            "iam",
        );
        assert_eq!(
            hex::encode(key),
            "f4780e2d9f65fa895f9c67b32ce1baf0b0d8a43505a000a1a9e090d414db404d"
        );
    }

    #[test]
    fn object_key_joins_prefix() {
        assert_eq!(store(None, "").object_key("k.json"), "k.json");
        assert_eq!(store(None, "prod/").object_key("k.json"), "prod/k.json");
    }

    #[test]
    fn aws_host_is_virtual_hosted() {
        let (url, host, uri) = store(None, "").locate("restaurants_list.json");
        assert_eq!(host, "eats.s3.us-east-1.amazonaws.com");
        assert_eq!(uri, "/restaurants_list.json");
        assert_eq!(
            url,
            "https://eats.s3.us-east-1.amazonaws.com/restaurants_list.json"
        );
    }

    #[test]
    fn custom_endpoint_is_path_style() {
        let (url, host, uri) = store(Some("http://localhost:9000/"), "prod").locate("prod/k.json");
        assert_eq!(host, "localhost:9000");
        assert_eq!(uri, "/eats/prod/k.json");
        assert_eq!(url, "http://localhost:9000/eats/prod/k.json");
    }
}
