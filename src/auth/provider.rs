//! Authentication scheme selection.
//!
//! A client picks one [`AuthProvider`] at construction time and keeps it for
//! its whole lifetime. Callers only ever ask it for headers.

use reqwest::Method;
use reqwest::header::HeaderMap;
use secrecy::ExposeSecret;

use crate::auth::api_key::ApiKeyAuthProvider;
use crate::auth::canonical::QueryParams;
use crate::auth::credentials::{ApiKeyCredentials, Credentials, OAuthCredentials};
use crate::auth::oauth::OAuthAuthProvider;
use crate::config::{AuthType, ClientConfig};
use crate::error::OnshapeError;

/// The scheme an [`AuthProvider`] implements.
pub type AuthMethod = AuthType;

/// One of the supported authentication providers.
#[derive(Debug)]
pub enum AuthProvider {
    /// HMAC-signed API-key requests
    ApiKey(ApiKeyAuthProvider),
    /// OAuth bearer tokens with refresh
    OAuth(OAuthAuthProvider),
}

impl AuthProvider {
    /// Select and construct a provider from configuration.
    ///
    /// An explicit `auth_type` wins. Otherwise an API-key pair selects
    /// [`AuthMethod::ApiKey`] and an access token selects [`AuthMethod::OAuth`].
    pub fn from_config(config: &ClientConfig) -> Result<Self, OnshapeError> {
        let method = match config.auth_type {
            Some(method) => method,
            None => infer_method(config)?,
        };
        tracing::debug!(%method, "Selected authentication method");

        match method {
            AuthType::ApiKey => {
                let access_key = config.access_key.clone().ok_or_else(|| {
                    OnshapeError::Configuration(
                        "API-key authentication requires an access key".to_string(),
                    )
                })?;
                let secret_key = config.secret_key.as_ref().ok_or_else(|| {
                    OnshapeError::Configuration(
                        "API-key authentication requires a secret key".to_string(),
                    )
                })?;
                Self::from_credentials(
                    ApiKeyCredentials::new(access_key, secret_key.expose_secret()).into(),
                )
            }
            AuthType::OAuth => {
                let access_token = config.access_token.as_ref().ok_or_else(|| {
                    OnshapeError::Configuration(
                        "OAuth authentication requires an access token".to_string(),
                    )
                })?;
                let mut credentials = OAuthCredentials::new(access_token.expose_secret());
                if let Some(refresh_token) = &config.refresh_token {
                    credentials = credentials.with_refresh_token(refresh_token.expose_secret());
                }
                if let (Some(id), Some(secret)) = (&config.client_id, &config.client_secret) {
                    credentials = credentials.with_client(id.as_str(), secret.expose_secret());
                }

                let mut provider = OAuthAuthProvider::new(credentials)?;
                if let Some(token_url) = &config.token_url {
                    provider = provider.with_token_url(token_url.as_str());
                }
                Ok(Self::OAuth(provider))
            }
        }
    }

    /// Construct the provider matching a set of credentials.
    pub fn from_credentials(credentials: Credentials) -> Result<Self, OnshapeError> {
        match credentials {
            Credentials::ApiKey(credentials) => {
                Ok(Self::ApiKey(ApiKeyAuthProvider::new(credentials)?))
            }
            Credentials::OAuth(credentials) => {
                Ok(Self::OAuth(OAuthAuthProvider::new(credentials)?))
            }
        }
    }

    /// The scheme this provider implements.
    pub fn method(&self) -> AuthMethod {
        match self {
            Self::ApiKey(_) => AuthType::ApiKey,
            Self::OAuth(_) => AuthType::OAuth,
        }
    }

    /// Build authentication headers for a request.
    pub async fn auth_headers(
        &self,
        method: &Method,
        path: &str,
        query: &QueryParams,
        body: Option<&[u8]>,
    ) -> Result<HeaderMap, OnshapeError> {
        self.headers_with_generation(method, path, query, body)
            .await
            .map(|(headers, _)| headers)
    }

    /// Build headers and report the token generation they were built from.
    ///
    /// API-key headers do not depend on mutable state and report generation 0.
    pub(crate) async fn headers_with_generation(
        &self,
        method: &Method,
        path: &str,
        query: &QueryParams,
        body: Option<&[u8]>,
    ) -> Result<(HeaderMap, u64), OnshapeError> {
        match self {
            Self::ApiKey(provider) => provider
                .auth_headers(method, path, query, body)
                .map(|headers| (headers, 0)),
            Self::OAuth(provider) => provider.bearer_headers().await,
        }
    }

    /// The OAuth provider, if that scheme is active.
    pub fn as_oauth(&self) -> Option<&OAuthAuthProvider> {
        match self {
            Self::OAuth(provider) => Some(provider),
            Self::ApiKey(_) => None,
        }
    }

    /// The API-key provider, if that scheme is active.
    pub fn as_api_key(&self) -> Option<&ApiKeyAuthProvider> {
        match self {
            Self::ApiKey(provider) => Some(provider),
            Self::OAuth(_) => None,
        }
    }
}

impl From<ApiKeyAuthProvider> for AuthProvider {
    fn from(provider: ApiKeyAuthProvider) -> Self {
        Self::ApiKey(provider)
    }
}

impl From<OAuthAuthProvider> for AuthProvider {
    fn from(provider: OAuthAuthProvider) -> Self {
        Self::OAuth(provider)
    }
}

fn infer_method(config: &ClientConfig) -> Result<AuthType, OnshapeError> {
    let has_api_key = config.access_key.as_deref().is_some_and(|k| !k.is_empty())
        && config
            .secret_key
            .as_ref()
            .is_some_and(|s| !s.expose_secret().is_empty());
    let has_token = config
        .access_token
        .as_ref()
        .is_some_and(|t| !t.expose_secret().is_empty());

    if has_api_key {
        Ok(AuthType::ApiKey)
    } else if has_token {
        Ok(AuthType::OAuth)
    } else {
        Err(OnshapeError::Configuration(
            "No credentials configured: set ONSHAPE_ACCESS_KEY and ONSHAPE_SECRET_KEY, or ONSHAPE_OAUTH_TOKEN"
                .to_string(),
        ))
    }
}
