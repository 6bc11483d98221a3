//! Credential types for Onshape API authentication.

use secrecy::{ExposeSecret, SecretString};

/// API-key credentials used for HMAC request signing.
#[derive(Clone)]
pub struct ApiKeyCredentials {
    /// The access key (public identifier)
    pub access_key: String,
    /// The secret key (private, used for signing)
    secret_key: SecretString,
}

impl ApiKeyCredentials {
    /// Create new credentials from an access key and secret key.
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: SecretString::from(secret_key.into()),
        }
    }

    /// Get the secret key for signing.
    ///
    /// This method exposes the secret - use carefully.
    pub fn expose_secret(&self) -> &str {
        self.secret_key.expose_secret()
    }
}

impl std::fmt::Debug for ApiKeyCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyCredentials")
            .field("access_key", &mask_secret(&self.access_key))
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

/// OAuth credentials: a bearer token plus what is needed to refresh it.
#[derive(Clone)]
pub struct OAuthCredentials {
    access_token: SecretString,
    refresh_token: Option<SecretString>,
    /// OAuth application client id
    pub client_id: Option<String>,
    client_secret: Option<SecretString>,
}

impl OAuthCredentials {
    /// Create credentials holding only an access token.
    ///
    /// Such credentials cannot be refreshed.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: SecretString::from(access_token.into()),
            refresh_token: None,
            client_id: None,
            client_secret: None,
        }
    }

    /// Attach a refresh token.
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(SecretString::from(refresh_token.into()));
        self
    }

    /// Attach the OAuth application's client id and secret.
    pub fn with_client(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.client_id = Some(client_id.into());
        self.client_secret = Some(SecretString::from(client_secret.into()));
        self
    }

    pub(crate) fn access_token(&self) -> &SecretString {
        &self.access_token
    }

    pub(crate) fn refresh_token(&self) -> Option<&SecretString> {
        self.refresh_token.as_ref()
    }

    pub(crate) fn client_secret(&self) -> Option<&SecretString> {
        self.client_secret.as_ref()
    }
}

impl std::fmt::Debug for OAuthCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthCredentials")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Credentials for one of the two supported authentication schemes.
#[derive(Clone, Debug)]
pub enum Credentials {
    /// HMAC-signed API-key requests
    ApiKey(ApiKeyCredentials),
    /// OAuth bearer-token requests
    OAuth(OAuthCredentials),
}

impl From<ApiKeyCredentials> for Credentials {
    fn from(credentials: ApiKeyCredentials) -> Self {
        Self::ApiKey(credentials)
    }
}

impl From<OAuthCredentials> for Credentials {
    fn from(credentials: OAuthCredentials) -> Self {
        Self::OAuth(credentials)
    }
}

/// Mask a secret for diagnostics, keeping only a short prefix and suffix.
///
/// Values of 8 characters or fewer are masked entirely.
pub fn mask_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 8 {
        return "***".to_string();
    }
    let prefix: String = chars[..4].iter().collect();
    let suffix: String = chars[chars.len() - 4..].iter().collect();
    format!("{prefix}***{suffix}")
}
