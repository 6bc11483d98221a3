//! Client configuration.
//!
//! Every field can be given explicitly or read from the process environment:
//!
//! | Field           | Variable                 |
//! |-----------------|--------------------------|
//! | `auth_type`     | `ONSHAPE_AUTH_TYPE`      |
//! | `access_key`    | `ONSHAPE_ACCESS_KEY`     |
//! | `secret_key`    | `ONSHAPE_SECRET_KEY`     |
//! | `access_token`  | `ONSHAPE_OAUTH_TOKEN`    |
//! | `refresh_token` | `ONSHAPE_REFRESH_TOKEN`  |
//! | `client_id`     | `ONSHAPE_CLIENT_ID`      |
//! | `client_secret` | `ONSHAPE_CLIENT_SECRET`  |
//! | `base_url`      | `ONSHAPE_BASE_URL`       |
//! | `token_url`     | `ONSHAPE_TOKEN_URL`      |
//!
//! Empty variables count as unset.

use std::str::FromStr;

use secrecy::SecretString;

use crate::error::OnshapeError;

/// Environment variable names.
pub mod env_vars {
    /// Selects the authentication scheme.
    pub const AUTH_TYPE: &str = "ONSHAPE_AUTH_TYPE";
    /// API access key.
    pub const ACCESS_KEY: &str = "ONSHAPE_ACCESS_KEY";
    /// API secret key.
    pub const SECRET_KEY: &str = "ONSHAPE_SECRET_KEY";
    /// OAuth access token.
    pub const OAUTH_TOKEN: &str = "ONSHAPE_OAUTH_TOKEN";
    /// OAuth refresh token.
    pub const REFRESH_TOKEN: &str = "ONSHAPE_REFRESH_TOKEN";
    /// OAuth application client id.
    pub const CLIENT_ID: &str = "ONSHAPE_CLIENT_ID";
    /// OAuth application client secret.
    pub const CLIENT_SECRET: &str = "ONSHAPE_CLIENT_SECRET";
    /// API base URL.
    pub const BASE_URL: &str = "ONSHAPE_BASE_URL";
    /// OAuth token endpoint.
    pub const TOKEN_URL: &str = "ONSHAPE_TOKEN_URL";
}

/// Authentication scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthType {
    /// HMAC-signed API-key requests
    ApiKey,
    /// OAuth bearer tokens
    OAuth,
}

impl AuthType {
    /// Configuration spelling of this scheme.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApiKey => "api_key",
            Self::OAuth => "oauth",
        }
    }
}

impl std::fmt::Display for AuthType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthType {
    type Err = OnshapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "api_key" | "apikey" | "api-key" => Ok(Self::ApiKey),
            "oauth" => Ok(Self::OAuth),
            other => Err(OnshapeError::Configuration(format!(
                "Unknown auth type `{other}`, expected `api_key` or `oauth`"
            ))),
        }
    }
}

/// Settings consumed when constructing a client.
#[derive(Clone, Default)]
pub struct ClientConfig {
    /// Explicit scheme; inferred from the populated credentials when unset
    pub auth_type: Option<AuthType>,
    /// API access key
    pub access_key: Option<String>,
    /// API secret key
    pub secret_key: Option<SecretString>,
    /// OAuth access token
    pub access_token: Option<SecretString>,
    /// OAuth refresh token
    pub refresh_token: Option<SecretString>,
    /// OAuth application client id
    pub client_id: Option<String>,
    /// OAuth application client secret
    pub client_secret: Option<SecretString>,
    /// API base URL
    pub base_url: Option<String>,
    /// OAuth token endpoint
    pub token_url: Option<String>,
}

impl ClientConfig {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every field from the process environment.
    pub fn from_env() -> Result<Self, OnshapeError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read every field through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, OnshapeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Ok(Self {
            auth_type: get(env_vars::AUTH_TYPE)
                .map(|v| v.parse::<AuthType>())
                .transpose()?,
            access_key: get(env_vars::ACCESS_KEY),
            secret_key: get(env_vars::SECRET_KEY).map(SecretString::from),
            access_token: get(env_vars::OAUTH_TOKEN).map(SecretString::from),
            refresh_token: get(env_vars::REFRESH_TOKEN).map(SecretString::from),
            client_id: get(env_vars::CLIENT_ID),
            client_secret: get(env_vars::CLIENT_SECRET).map(SecretString::from),
            base_url: get(env_vars::BASE_URL),
            token_url: get(env_vars::TOKEN_URL),
        })
    }

    /// Fill fields that were not set explicitly from the process environment.
    pub fn merge_env(self) -> Result<Self, OnshapeError> {
        Ok(self.merge(Self::from_env()?))
    }

    /// Fill fields that are unset in `self` from `fallback`.
    pub fn merge(self, fallback: Self) -> Self {
        Self {
            auth_type: self.auth_type.or(fallback.auth_type),
            access_key: self.access_key.or(fallback.access_key),
            secret_key: self.secret_key.or(fallback.secret_key),
            access_token: self.access_token.or(fallback.access_token),
            refresh_token: self.refresh_token.or(fallback.refresh_token),
            client_id: self.client_id.or(fallback.client_id),
            client_secret: self.client_secret.or(fallback.client_secret),
            base_url: self.base_url.or(fallback.base_url),
            token_url: self.token_url.or(fallback.token_url),
        }
    }

    /// Set the authentication scheme.
    pub fn auth_type(mut self, auth_type: AuthType) -> Self {
        self.auth_type = Some(auth_type);
        self
    }

    /// Set the API-key pair.
    pub fn api_key(mut self, access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        self.access_key = Some(access_key.into());
        self.secret_key = Some(SecretString::from(secret_key.into()));
        self
    }

    /// Set the OAuth access token.
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(SecretString::from(token.into()));
        self
    }

    /// Set the OAuth refresh token.
    pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
        self.refresh_token = Some(SecretString::from(token.into()));
        self
    }

    /// Set the OAuth application client credentials.
    pub fn oauth_client(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.client_id = Some(client_id.into());
        self.client_secret = Some(SecretString::from(client_secret.into()));
        self
    }

    /// Set the API base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the OAuth token endpoint.
    pub fn token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = Some(url.into());
        self
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redacted = |set: bool| if set { Some("[REDACTED]") } else { None };
        f.debug_struct("ClientConfig")
            .field("auth_type", &self.auth_type)
            .field("access_key", &self.access_key)
            .field("secret_key", &redacted(self.secret_key.is_some()))
            .field("access_token", &redacted(self.access_token.is_some()))
            .field("refresh_token", &redacted(self.refresh_token.is_some()))
            .field("client_id", &self.client_id)
            .field("client_secret", &redacted(self.client_secret.is_some()))
            .field("base_url", &self.base_url)
            .field("token_url", &self.token_url)
            .finish()
    }
}
