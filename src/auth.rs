//! Administrator authentication and session tokens.
//!
//! There is exactly one account: the administrator identity configured
//! through [`Secrets`]. A successful login yields a signed, time-limited
//! session token (compact JWS, HS256) carrying `{ username, iat, exp }`.
//! Tokens are verified statelessly; nothing is persisted server-side.
//!
//! Credential comparison is constant-time with respect to the contents of
//! the supplied values: both sides are hashed to fixed-length digests and
//! compared with [`subtle::ConstantTimeEq`], and the username and password
//! results are combined without short-circuiting.

use anyhow::Context;
use axum::http::{header::AUTHORIZATION, HeaderMap};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use hmac::Mac;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::config::{Secrets, ENV_ADMIN_PASSWORD, ENV_ADMIN_USERNAME, ENV_JWT_SECRET};
use crate::signing::{hmac_sha256, new_mac, sha256};

const BEARER_PREFIX: &str = "Bearer ";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0} is not set in the environment")]
    NotConfigured(&'static str),

    #[error("invalid token: {0}")]
    InvalidToken(String),
}

/// Payload of a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub username: String,
    /// Issued-at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

/// A freshly issued token and the claims it carries.
#[derive(Debug, Clone)]
pub struct SessionToken {
    pub token: String,
    pub claims: Claims,
}

impl SessionToken {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.claims.exp, 0)
    }
}

#[derive(Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

pub struct AuthService {
    secrets: Secrets,
    token_ttl_secs: i64,
}

impl AuthService {
    pub fn new(secrets: Secrets, token_ttl_secs: i64) -> Self {
        let missing = secrets.missing();
        if !missing.is_empty() {
            tracing::warn!(
                missing = ?missing,
                "auth secrets not configured; login and uploads will fail"
            );
        }
        Self {
            secrets,
            token_ttl_secs,
        }
    }

    /// True iff both values match the configured administrator identity.
    ///
    /// Fails only when the identity itself is not configured.
    pub fn check_credentials(&self, username: &str, password: &str) -> Result<bool, AuthError> {
        let admin_username = self
            .secrets
            .admin_username
            .as_deref()
            .ok_or(AuthError::NotConfigured(ENV_ADMIN_USERNAME))?;
        let admin_password = self
            .secrets
            .admin_password
            .as_deref()
            .ok_or(AuthError::NotConfigured(ENV_ADMIN_PASSWORD))?;

        let user_ok = sha256(username.as_bytes()).ct_eq(&sha256(admin_username.as_bytes()));
        let pass_ok = sha256(password.as_bytes()).ct_eq(&sha256(admin_password.as_bytes()));
        Ok((user_ok & pass_ok).into())
    }

    pub fn issue_token(&self, username: &str) -> Result<SessionToken, AuthError> {
        self.issue_token_at(username, Utc::now())
    }

    pub fn issue_token_at(
        &self,
        username: &str,
        now: DateTime<Utc>,
    ) -> Result<SessionToken, AuthError> {
        let secret = self.signing_secret()?;
        let claims = Claims {
            username: username.to_string(),
            iat: now.timestamp(),
            exp: now.timestamp() + self.token_ttl_secs,
        };

        let header = Header {
            alg: "HS256".to_string(),
            typ: "JWT".to_string(),
        };
        let signing_input = format!(
            "{}.{}",
            encode_segment(&header).map_err(|e| AuthError::InvalidToken(e.to_string()))?,
            encode_segment(&claims).map_err(|e| AuthError::InvalidToken(e.to_string()))?
        );
        let signature = URL_SAFE_NO_PAD.encode(hmac_sha256(secret.as_bytes(), signing_input.as_bytes()));

        Ok(SessionToken {
            token: format!("{}.{}", signing_input, signature),
            claims,
        })
    }

    /// Verifies signature and expiry, returning the token's username.
    pub fn verify_token(&self, token: &str) -> Result<String, AuthError> {
        self.verify_token_at(token, Utc::now())
    }

    pub fn verify_token_at(&self, token: &str, now: DateTime<Utc>) -> Result<String, AuthError> {
        let secret = self.signing_secret()?;
        let invalid = |msg: &str| AuthError::InvalidToken(msg.to_string());

        let mut parts = token.split('.');
        let (Some(header_b64), Some(claims_b64), Some(sig_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid("expected three segments"));
        };

        let header: Header = decode_segment(header_b64).map_err(|_| invalid("bad header"))?;
        if header.alg != "HS256" {
            return Err(invalid("unsupported algorithm"));
        }

        let signature = URL_SAFE_NO_PAD
            .decode(sig_b64)
            .map_err(|_| invalid("bad signature encoding"))?;
        let mut mac = new_mac(secret.as_bytes());
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(claims_b64.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| invalid("signature mismatch"))?;

        let claims: Claims = decode_segment(claims_b64).map_err(|_| invalid("bad payload"))?;
        if now.timestamp() >= claims.exp {
            return Err(invalid("expired"));
        }
        if claims.username.is_empty() {
            return Err(invalid("payload has no username"));
        }

        Ok(claims.username)
    }

    fn signing_secret(&self) -> Result<&str, AuthError> {
        self.secrets
            .jwt_secret
            .as_deref()
            .ok_or(AuthError::NotConfigured(ENV_JWT_SECRET))
    }
}

/// The bearer token from the `Authorization` header.
///
/// Everything after the `Bearer ` prefix is the token, taken verbatim.
/// `None` when the header is absent, not valid text, lacks the prefix, or
/// carries nothing after it.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix(BEARER_PREFIX)
        .filter(|t| !t.is_empty())
}

fn encode_segment<T: Serialize>(value: &T) -> anyhow::Result<String> {
    let json = serde_json::to_vec(value).context("serialize token segment")?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

fn decode_segment<T: for<'de> Deserialize<'de>>(segment: &str) -> anyhow::Result<T> {
    let bytes = URL_SAFE_NO_PAD.decode(segment)?;
    Ok(serde_json::from_slice(&bytes)?)
}
