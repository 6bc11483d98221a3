//! API-key (HMAC) authentication provider.
//!
//! Signed requests carry these headers:
//! - `Date`: the RFC 1123 date that was signed
//! - `Authorization`: `On <access_key>:<signature>`
//! - `On-Nonce`: a fresh random value
//! - `Content-MD5` (only with a non-empty body): base64 MD5 of the body bytes

use std::sync::Arc;

use reqwest::Method;
use reqwest::header::{AUTHORIZATION, DATE, HeaderMap, HeaderName, HeaderValue};
use time::OffsetDateTime;

use crate::auth::canonical::{CanonicalRequest, QueryParams, http_date};
use crate::auth::credentials::{ApiKeyCredentials, mask_secret};
use crate::auth::nonce::{NonceProvider, RandomNonce};
use crate::auth::signature::{content_md5, sign};
use crate::error::OnshapeError;

/// Header carrying the per-request nonce.
pub const ON_NONCE: HeaderName = HeaderName::from_static("on-nonce");
/// Header carrying the body digest.
pub const CONTENT_MD5: HeaderName = HeaderName::from_static("content-md5");

/// Typical length of an Onshape access key.
pub const EXPECTED_ACCESS_KEY_LEN: usize = 24;
/// Typical length of an Onshape secret key.
pub const EXPECTED_SECRET_KEY_LEN: usize = 48;

/// Signs each request with the stored API-key pair.
///
/// Every call is self-contained: no state is mutated besides drawing a nonce.
#[derive(Clone)]
pub struct ApiKeyAuthProvider {
    credentials: ApiKeyCredentials,
    nonce_provider: Arc<dyn NonceProvider>,
}

impl ApiKeyAuthProvider {
    /// Create a provider, rejecting an empty access key or secret key.
    pub fn new(credentials: ApiKeyCredentials) -> Result<Self, OnshapeError> {
        if credentials.access_key.trim().is_empty() {
            return Err(OnshapeError::Configuration(
                "API access key is empty.".to_string(),
            ));
        }
        if credentials.expose_secret().is_empty() {
            return Err(OnshapeError::Configuration(
                "API secret key is empty.".to_string(),
            ));
        }

        Ok(Self {
            credentials,
            nonce_provider: Arc::new(RandomNonce::new()),
        })
    }

    /// Replace the nonce source.
    pub fn with_nonce_provider(mut self, provider: Arc<dyn NonceProvider>) -> Self {
        self.nonce_provider = provider;
        self
    }

    /// The public access key.
    pub fn access_key(&self) -> &str {
        &self.credentials.access_key
    }

    /// Build signed headers for a request sent now.
    pub fn auth_headers(
        &self,
        method: &Method,
        path: &str,
        query: &QueryParams,
        body: Option<&[u8]>,
    ) -> Result<HeaderMap, OnshapeError> {
        self.auth_headers_at(method, path, query, body, OffsetDateTime::now_utc())
    }

    /// Build signed headers using a fixed timestamp.
    pub fn auth_headers_at(
        &self,
        method: &Method,
        path: &str,
        query: &QueryParams,
        body: Option<&[u8]>,
        now: OffsetDateTime,
    ) -> Result<HeaderMap, OnshapeError> {
        let date = http_date(now)?;
        let canonical = CanonicalRequest::new(method, path, query, date.as_str());
        let signature = sign(self.credentials.expose_secret(), &canonical.canonical_string())?;
        let nonce = self.nonce_provider.next_nonce();

        let mut headers = HeaderMap::new();
        headers.insert(DATE, header_value(&date)?);
        headers.insert(
            AUTHORIZATION,
            header_value(&format!("On {}:{}", self.credentials.access_key, signature))?,
        );
        headers.insert(ON_NONCE, header_value(&nonce)?);
        if let Some(body) = body.filter(|b| !b.is_empty()) {
            headers.insert(CONTENT_MD5, header_value(&content_md5(body))?);
        }

        tracing::trace!(
            access_key = %mask_secret(&self.credentials.access_key),
            path = canonical.path(),
            "Signed API-key request"
        );
        Ok(headers)
    }

    /// Inspect the stored key pair for common mistakes.
    pub fn diagnostics(&self) -> ApiKeyDiagnostics {
        ApiKeyDiagnostics::inspect(&self.credentials)
    }
}

impl std::fmt::Debug for ApiKeyAuthProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyAuthProvider")
            .field("credentials", &self.credentials)
            .finish()
    }
}

fn header_value(value: &str) -> Result<HeaderValue, OnshapeError> {
    HeaderValue::from_str(value)
        .map_err(|e| OnshapeError::Signing(format!("Invalid header value: {e}")))
}

/// Facts about an API-key pair that are safe to report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiKeyDiagnostics {
    /// Masked form of the access key
    pub masked_access_key: String,
    /// Length of the access key in characters
    pub access_key_len: usize,
    /// Length of the secret key in characters
    pub secret_key_len: usize,
    /// Access key has leading, trailing, or embedded whitespace
    pub access_key_has_whitespace: bool,
    /// Secret key has leading, trailing, or embedded whitespace
    pub secret_key_has_whitespace: bool,
}

impl ApiKeyDiagnostics {
    /// Inspect a key pair.
    pub fn inspect(credentials: &ApiKeyCredentials) -> Self {
        let access = credentials.access_key.as_str();
        let secret = credentials.expose_secret();
        Self {
            masked_access_key: mask_secret(access),
            access_key_len: access.chars().count(),
            secret_key_len: secret.chars().count(),
            access_key_has_whitespace: access.chars().any(char::is_whitespace),
            secret_key_has_whitespace: secret.chars().any(char::is_whitespace),
        }
    }

    /// Human-readable hints for a rejected signature.
    pub fn hints(&self) -> Vec<String> {
        let mut hints = Vec::new();
        if self.access_key_len == 0 {
            hints.push("Access key is missing.".to_string());
        } else if self.access_key_len != EXPECTED_ACCESS_KEY_LEN {
            hints.push(format!(
                "Access key {} has {} characters, expected {EXPECTED_ACCESS_KEY_LEN}.",
                self.masked_access_key, self.access_key_len
            ));
        }
        if self.secret_key_len == 0 {
            hints.push("Secret key is missing.".to_string());
        } else if self.secret_key_len != EXPECTED_SECRET_KEY_LEN {
            hints.push(format!(
                "Secret key has {} characters, expected {EXPECTED_SECRET_KEY_LEN}.",
                self.secret_key_len
            ));
        }
        if self.access_key_has_whitespace {
            hints.push("Access key contains whitespace.".to_string());
        }
        if self.secret_key_has_whitespace {
            hints.push("Secret key contains whitespace.".to_string());
        }
        if hints.is_empty() {
            hints.push(
                "Key pair looks well-formed; check that it is active and that the system clock is accurate."
                    .to_string(),
            );
        }
        hints
    }
}
