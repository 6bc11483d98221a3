//! OAuth token storage.
//!
//! The store holds the current access/refresh pair. It is only ever updated
//! by replacing the whole pair, so readers never observe a half-rotated state.

use std::sync::{PoisonError, RwLock};

use secrecy::{ExposeSecret, SecretString};
use time::{Duration, OffsetDateTime};

use crate::auth::credentials::OAuthCredentials;
use crate::error::OnshapeError;

/// A freshly issued token pair.
#[derive(Clone)]
pub struct TokenPair {
    /// New access token
    pub access_token: SecretString,
    /// New refresh token; `None` keeps the current one
    pub refresh_token: Option<SecretString>,
    /// When the access token expires, if the server said so
    pub expires_at: Option<OffsetDateTime>,
}

impl TokenPair {
    /// Create a pair from plain strings.
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token: SecretString::from(access_token.into()),
            refresh_token: refresh_token.map(SecretString::from),
            expires_at: None,
        }
    }

    /// Set the expiry instant.
    pub fn expires_at(mut self, at: OffsetDateTime) -> Self {
        self.expires_at = Some(at);
        self
    }
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// The token pair currently in use.
#[derive(Clone)]
pub struct TokenState {
    /// Bearer token
    pub access_token: SecretString,
    /// Refresh token, if one was issued
    pub refresh_token: Option<SecretString>,
    /// Expiry of the access token, if known
    pub expires_at: Option<OffsetDateTime>,
    /// Incremented on every successful replace
    pub generation: u64,
}

impl TokenState {
    /// True if the access token expires within `margin` of `now`.
    pub fn expires_within(&self, margin: Duration, now: OffsetDateTime) -> bool {
        self.expires_at.is_some_and(|at| now + margin >= at)
    }
}

impl std::fmt::Debug for TokenState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenState")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_at", &self.expires_at)
            .field("generation", &self.generation)
            .finish()
    }
}

/// Holds the OAuth tokens and client credentials for one provider.
pub struct OAuthTokenStore {
    state: RwLock<TokenState>,
    client_id: Option<String>,
    client_secret: Option<SecretString>,
}

impl OAuthTokenStore {
    /// Create a store from OAuth credentials.
    ///
    /// An empty access token is a configuration error.
    pub fn new(credentials: &OAuthCredentials) -> Result<Self, OnshapeError> {
        if credentials.access_token().expose_secret().trim().is_empty() {
            return Err(OnshapeError::Configuration(
                "OAuth access token is empty.".to_string(),
            ));
        }

        Ok(Self {
            state: RwLock::new(TokenState {
                access_token: credentials.access_token().clone(),
                refresh_token: credentials
                    .refresh_token()
                    .filter(|t| !t.expose_secret().is_empty())
                    .cloned(),
                expires_at: None,
                generation: 0,
            }),
            client_id: credentials.client_id.clone().filter(|id| !id.is_empty()),
            client_secret: credentials
                .client_secret()
                .filter(|s| !s.expose_secret().is_empty())
                .cloned(),
        })
    }

    /// Set the expiry of the current access token.
    pub fn set_expires_at(&self, at: OffsetDateTime) {
        self.write_state(|state| state.expires_at = Some(at));
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> TokenState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The current access token.
    pub fn access_token(&self) -> SecretString {
        self.snapshot().access_token
    }

    /// The current refresh token.
    pub fn refresh_token(&self) -> Option<SecretString> {
        self.snapshot().refresh_token
    }

    /// Generation counter of the current pair.
    pub fn generation(&self) -> u64 {
        self.snapshot().generation
    }

    /// The OAuth application client id.
    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    pub(crate) fn client_secret(&self) -> Option<&SecretString> {
        self.client_secret.as_ref()
    }

    /// True only if a refresh token and both client credentials are present.
    pub fn has_refresh_capability(&self) -> bool {
        self.client_id.is_some()
            && self.client_secret.is_some()
            && self.snapshot().refresh_token.is_some()
    }

    /// Atomically swap in a new token pair and return the new generation.
    pub fn replace(&self, pair: TokenPair) -> u64 {
        self.write_state(|state| {
            state.access_token = pair.access_token;
            if let Some(refresh_token) = pair.refresh_token {
                state.refresh_token = Some(refresh_token);
            }
            state.expires_at = pair.expires_at;
            state.generation += 1;
            state.generation
        })
    }

    fn write_state<R>(&self, f: impl FnOnce(&mut TokenState) -> R) -> R {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

impl std::fmt::Debug for OAuthTokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthTokenStore")
            .field("state", &self.snapshot())
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}
