//! OAuth bearer-token authentication provider.
//!
//! Requests carry `Authorization: Bearer <access_token>`. Expiry is normally
//! discovered reactively through a 401, after which the executor calls back
//! into [`OAuthAuthProvider::refresh_from`]. When the token store knows the
//! expiry instant, headers are only built after refreshing a token that is
//! about to lapse.
//!
//! Refreshes are serialized behind a single async mutex. A caller that was
//! waiting on the mutex checks the store generation once it gets in and skips
//! the exchange if somebody else already rotated the tokens. If the exchange
//! it waited on failed instead, it gets that same failure. Either way a burst
//! of 401s produces exactly one call to the token endpoint.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest_middleware::ClientWithMiddleware;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use time::{Duration, OffsetDateTime};
use tokio::sync::Mutex;

use crate::auth::credentials::OAuthCredentials;
use crate::auth::token_store::{OAuthTokenStore, TokenPair};
use crate::error::OnshapeError;
use crate::rest::endpoints::ONSHAPE_TOKEN_URL;
use crate::rest::http::{default_http_client, transport_error};

/// Default window before expiry in which tokens are refreshed ahead of time.
pub const DEFAULT_REFRESH_MARGIN: Duration = Duration::seconds(60);

/// Default upper bound on a single token exchange.
pub const DEFAULT_REFRESH_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Notified after every successful token rotation.
///
/// Implement this to persist the new refresh token; many OAuth servers
/// invalidate the previous one as soon as a new pair is issued.
pub trait TokenRefreshListener: Send + Sync {
    /// Called with the freshly issued pair, after it has been stored.
    fn on_tokens_refreshed(&self, tokens: &TokenPair);
}

/// Outcome of a failed exchange, replayed to callers that queued behind it.
struct FailedRefresh {
    attempt: u64,
    from_generation: u64,
    error: OnshapeError,
}

/// Produces bearer headers and owns the refresh exchange.
pub struct OAuthAuthProvider {
    store: Arc<OAuthTokenStore>,
    http_client: ClientWithMiddleware,
    token_url: String,
    refresh_guard: Mutex<Option<FailedRefresh>>,
    completed_attempts: AtomicU64,
    refresh_margin: Duration,
    refresh_timeout: std::time::Duration,
    listener: Option<Arc<dyn TokenRefreshListener>>,
}

impl OAuthAuthProvider {
    /// Create a provider from OAuth credentials.
    pub fn new(credentials: OAuthCredentials) -> Result<Self, OnshapeError> {
        Ok(Self {
            store: Arc::new(OAuthTokenStore::new(&credentials)?),
            http_client: default_http_client(None, None),
            token_url: ONSHAPE_TOKEN_URL.to_string(),
            refresh_guard: Mutex::new(None),
            completed_attempts: AtomicU64::new(0),
            refresh_margin: DEFAULT_REFRESH_MARGIN,
            refresh_timeout: DEFAULT_REFRESH_TIMEOUT,
            listener: None,
        })
    }

    /// Set the token endpoint (useful for testing with a mock server).
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Use a specific HTTP client for the token exchange.
    pub fn with_http_client(mut self, client: ClientWithMiddleware) -> Self {
        self.http_client = client;
        self
    }

    /// Set how long before expiry a token is refreshed ahead of time.
    pub fn with_refresh_margin(mut self, margin: Duration) -> Self {
        self.refresh_margin = margin;
        self
    }

    /// Bound the duration of a single token exchange.
    pub fn with_refresh_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    /// Register a listener for rotated tokens.
    pub fn with_listener(mut self, listener: Arc<dyn TokenRefreshListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Record when the initial access token expires.
    pub fn with_expires_at(self, at: OffsetDateTime) -> Self {
        self.store.set_expires_at(at);
        self
    }

    /// The token store backing this provider.
    pub fn store(&self) -> &OAuthTokenStore {
        &self.store
    }

    /// True if this provider can exchange its refresh token.
    pub fn has_refresh_capability(&self) -> bool {
        self.store.has_refresh_capability()
    }

    /// Build bearer headers for the current access token.
    pub async fn auth_headers(&self) -> Result<HeaderMap, OnshapeError> {
        self.bearer_headers().await.map(|(headers, _)| headers)
    }

    /// Build bearer headers and report which token generation they carry.
    pub(crate) async fn bearer_headers(&self) -> Result<(HeaderMap, u64), OnshapeError> {
        let mut state = self.store.snapshot();
        if self.store.has_refresh_capability()
            && state.expires_within(self.refresh_margin, OffsetDateTime::now_utc())
        {
            tracing::debug!("Access token is about to expire, refreshing ahead of time");
            self.refresh_from(state.generation).await?;
            state = self.store.snapshot();
        }

        let mut headers = HeaderMap::new();
        let mut bearer = HeaderValue::from_str(&format!(
            "Bearer {}",
            state.access_token.expose_secret()
        ))
        .map_err(|e| OnshapeError::Signing(format!("Invalid access token: {e}")))?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        Ok((headers, state.generation))
    }

    /// Exchange the refresh token for a new pair.
    ///
    /// Concurrent callers share a single exchange.
    pub async fn refresh(&self) -> Result<(), OnshapeError> {
        self.refresh_from(self.store.generation()).await.map(|_| ())
    }

    /// Refresh unless the store has already moved past `seen_generation`.
    ///
    /// Returns the generation now in the store. On failure the store is left
    /// untouched, and callers that were already waiting for that same exchange
    /// receive its error instead of starting another one. Callers arriving
    /// after a failure has been reported try again. Dropping the returned
    /// future releases the refresh guard.
    pub(crate) async fn refresh_from(&self, seen_generation: u64) -> Result<u64, OnshapeError> {
        let completed_on_arrival = self.completed_attempts.load(Ordering::Acquire);
        let mut last_failure = self.refresh_guard.lock().await;

        let current = self.store.generation();
        if current != seen_generation {
            tracing::debug!(generation = current, "Tokens already refreshed by another request");
            return Ok(current);
        }
        if let Some(failure) = last_failure.as_ref().filter(|f| {
            f.attempt > completed_on_arrival && f.from_generation == seen_generation
        }) {
            tracing::debug!(attempt = failure.attempt, "Token refresh already failed for this generation");
            return Err(replay_failure(&failure.error));
        }

        let outcome = tokio::time::timeout(self.refresh_timeout, self.exchange())
            .await
            .unwrap_or_else(|_| {
                tracing::warn!(timeout = ?self.refresh_timeout, "Token refresh timed out");
                Err(OnshapeError::Timeout)
            });
        let attempt = self.completed_attempts.fetch_add(1, Ordering::AcqRel) + 1;

        let pair = match outcome {
            Ok(pair) => pair,
            Err(error) => {
                *last_failure = Some(FailedRefresh {
                    attempt,
                    from_generation: seen_generation,
                    error: replay_failure(&error),
                });
                return Err(error);
            }
        };
        *last_failure = None;

        let generation = self.store.replace(pair.clone());
        tracing::info!(generation, "Refreshed OAuth access token");
        if let Some(listener) = &self.listener {
            listener.on_tokens_refreshed(&pair);
        }
        Ok(generation)
    }

    async fn exchange(&self) -> Result<TokenPair, OnshapeError> {
        let not_capable = || {
            OnshapeError::authentication(
                None,
                "Token refresh requires a refresh token, client id and client secret",
            )
        };
        let refresh_token = self.store.refresh_token().ok_or_else(not_capable)?;
        let client_id = self.store.client_id().ok_or_else(not_capable)?;
        let client_secret = self.store.client_secret().ok_or_else(not_capable)?;

        let form = serde_urlencoded::to_string([
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.expose_secret()),
            ("client_id", client_id),
            ("client_secret", client_secret.expose_secret()),
        ])
        .map_err(|e| OnshapeError::Signing(format!("Failed to encode refresh request: {e}")))?;

        let response = self
            .http_client
            .post(&self.token_url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(ACCEPT, "application/json")
            .body(form)
            .send()
            .await
            .map_err(|e| match transport_error(e) {
                OnshapeError::Timeout => OnshapeError::Timeout,
                other => OnshapeError::authentication(
                    None,
                    format!("Token refresh request failed: {other}"),
                ),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                OnshapeError::Timeout
            } else {
                OnshapeError::authentication(
                    Some(status.as_u16()),
                    format!("Failed to read token response: {e}"),
                )
            }
        })?;
        if !status.is_success() {
            let message = serde_json::from_str::<TokenErrorResponse>(&body)
                .ok()
                .map(|e| match e.error_description {
                    Some(description) => format!("{}: {description}", e.error),
                    None => e.error,
                })
                .unwrap_or_else(|| format!("token endpoint returned {status}"));
            tracing::warn!(status = status.as_u16(), "Token refresh rejected");
            return Err(OnshapeError::Authentication {
                status: Some(status.as_u16()),
                message,
                hints: vec![
                    "The refresh token may have expired or been revoked; re-run the OAuth authorization flow."
                        .to_string(),
                ],
            });
        }

        let parsed: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            OnshapeError::authentication(
                Some(status.as_u16()),
                format!("Malformed token response: {e}"),
            )
        })?;
        if parsed.access_token.is_empty() {
            return Err(OnshapeError::authentication(
                Some(status.as_u16()),
                "Token response did not contain an access token",
            ));
        }

        Ok(TokenPair {
            access_token: SecretString::from(parsed.access_token),
            refresh_token: parsed
                .refresh_token
                .filter(|t| !t.is_empty())
                .map(SecretString::from),
            expires_at: parsed.expires_in.and_then(|secs| {
                let expires_at = OffsetDateTime::now_utc().checked_add(Duration::seconds(secs));
                if expires_at.is_none() {
                    tracing::debug!(expires_in = secs, "Ignoring out-of-range token lifetime");
                }
                expires_at
            }),
        })
    }
}

/// Rebuild a refresh failure for another caller; transport errors are not `Clone`.
fn replay_failure(error: &OnshapeError) -> OnshapeError {
    match error {
        OnshapeError::Authentication {
            status,
            message,
            hints,
        } => OnshapeError::Authentication {
            status: *status,
            message: message.clone(),
            hints: hints.clone(),
        },
        OnshapeError::Timeout => OnshapeError::Timeout,
        OnshapeError::Configuration(message) => OnshapeError::Configuration(message.clone()),
        OnshapeError::Signing(message) => OnshapeError::Signing(message.clone()),
        other => OnshapeError::authentication(other.status(), other.to_string()),
    }
}

impl std::fmt::Debug for OAuthAuthProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthAuthProvider")
            .field("store", &self.store)
            .field("token_url", &self.token_url)
            .field("refresh_margin", &self.refresh_margin)
            .field("refresh_timeout", &self.refresh_timeout)
            .finish()
    }
}

/// Successful response from the token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Error response from the token endpoint.
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}
