//! Onshape REST API client implementation.

use std::sync::Arc;
use std::time::Duration;

use reqwest_middleware::ClientWithMiddleware;

use crate::auth::{AuthMethod, AuthProvider, Credentials, QueryParams, TokenRefreshListener};
use crate::config::ClientConfig;
use crate::error::OnshapeError;
use crate::rest::endpoints::ONSHAPE_BASE_URL;
use crate::rest::endpoints::users::SESSION_INFO;
use crate::rest::executor::{ApiRequest, SignedRequestExecutor};
use crate::rest::http::default_http_client;

/// The Onshape REST API client.
///
/// Every request is authenticated by the provider chosen when the client was
/// built. Switching between API keys and OAuth requires a new client.
///
/// # Example
///
/// ```rust,no_run
/// use onshape_client::rest::OnshapeClient;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     // Reads ONSHAPE_ACCESS_KEY / ONSHAPE_SECRET_KEY or ONSHAPE_OAUTH_TOKEN.
///     let client = OnshapeClient::from_env()?;
///
///     let documents = client.list_documents(&Default::default()).await?;
///     for document in &documents.items {
///         println!("{}: {}", document.id, document.name);
///     }
///
///     Ok(())
/// }
/// ```
///
/// With explicit API keys:
///
/// ```rust,no_run
/// use onshape_client::auth::ApiKeyCredentials;
/// use onshape_client::rest::OnshapeClient;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = OnshapeClient::builder()
///     .credentials(ApiKeyCredentials::new("access_key", "secret_key").into())
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct OnshapeClient {
    executor: SignedRequestExecutor,
}

impl OnshapeClient {
    /// Create a client configured entirely from the environment.
    pub fn from_env() -> Result<Self, OnshapeError> {
        Self::builder().config(ClientConfig::from_env()?).build()
    }

    /// Create a new client builder.
    pub fn builder() -> OnshapeClientBuilder {
        OnshapeClientBuilder::new()
    }

    /// The scheme used to authenticate requests.
    pub fn auth_method(&self) -> AuthMethod {
        self.executor.provider().method()
    }

    /// The active authentication provider.
    pub fn auth_provider(&self) -> &AuthProvider {
        self.executor.provider()
    }

    /// The request executor.
    pub fn executor(&self) -> &SignedRequestExecutor {
        &self.executor
    }

    /// Send a request and return the raw successful response.
    pub async fn execute(&self, request: &ApiRequest) -> Result<reqwest::Response, OnshapeError> {
        self.executor.execute(request).await
    }

    /// Make an authenticated GET request and decode the JSON response.
    pub async fn get_json<T>(&self, path: &str, query: &QueryParams) -> Result<T, OnshapeError>
    where
        T: serde::de::DeserializeOwned,
    {
        let request = ApiRequest::get(path).query(query.clone());
        let response = self.executor.execute(&request).await?;
        Self::parse_response(response).await
    }

    /// Make an authenticated POST request with a JSON body and decode the response.
    pub async fn post_json<T, B>(
        &self,
        path: &str,
        query: &QueryParams,
        body: &B,
    ) -> Result<T, OnshapeError>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        let request = ApiRequest::post(path).query(query.clone()).json(body)?;
        let response = self.executor.execute(&request).await?;
        Self::parse_response(response).await
    }

    /// Make an authenticated DELETE request, discarding the response body.
    pub async fn delete(&self, path: &str, query: &QueryParams) -> Result<(), OnshapeError> {
        let request = ApiRequest::delete(path).query(query.clone());
        self.executor.execute(&request).await?;
        Ok(())
    }

    /// Information about the authenticated user and session.
    ///
    /// A cheap call for checking that credentials are accepted.
    pub async fn session_info(&self) -> Result<serde_json::Value, OnshapeError> {
        self.get_json(SESSION_INFO, &QueryParams::new()).await
    }

    /// Parse a successful response from the Onshape API.
    async fn parse_response<T>(response: reqwest::Response) -> Result<T, OnshapeError>
    where
        T: serde::de::DeserializeOwned,
    {
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            OnshapeError::InvalidResponse(format!("Failed to parse response: {}. Body: {}", e, body))
        })
    }
}

/// Builder for [`OnshapeClient`].
#[derive(Default)]
pub struct OnshapeClientBuilder {
    base_url: Option<String>,
    config: Option<ClientConfig>,
    credentials: Option<Credentials>,
    provider: Option<AuthProvider>,
    http_client: Option<ClientWithMiddleware>,
    listener: Option<Arc<dyn TokenRefreshListener>>,
    user_agent: Option<String>,
    timeout: Option<Duration>,
}

impl OnshapeClientBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL (useful for testing with a mock server).
    ///
    /// Takes precedence over the configured base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Select the provider from a configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use these credentials directly.
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Use a fully configured provider.
    pub fn provider(mut self, provider: impl Into<AuthProvider>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Use a specific HTTP client for API calls.
    pub fn http_client(mut self, client: ClientWithMiddleware) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Be notified whenever OAuth tokens are rotated.
    ///
    /// Ignored for API-key clients.
    pub fn token_refresh_listener(mut self, listener: Arc<dyn TokenRefreshListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Set a custom user agent.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Bound every HTTP request; an elapsed timeout surfaces as [`OnshapeError::Timeout`].
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the client.
    ///
    /// The provider is taken from, in order: [`Self::provider`],
    /// [`Self::credentials`], [`Self::config`].
    pub fn build(self) -> Result<OnshapeClient, OnshapeError> {
        let provider = match (self.provider, self.credentials, &self.config) {
            (Some(provider), _, _) => provider,
            (None, Some(credentials), _) => AuthProvider::from_credentials(credentials)?,
            (None, None, Some(config)) => AuthProvider::from_config(config)?,
            (None, None, None) => {
                return Err(OnshapeError::Configuration(
                    "No credentials, configuration or provider supplied".to_string(),
                ));
            }
        };
        let provider = match (provider, self.listener) {
            (AuthProvider::OAuth(oauth), Some(listener)) => {
                AuthProvider::OAuth(oauth.with_listener(listener))
            }
            (provider, _) => provider,
        };

        let base_url = self
            .base_url
            .or_else(|| self.config.as_ref().and_then(|c| c.base_url.clone()))
            .unwrap_or_else(|| ONSHAPE_BASE_URL.to_string());
        url::Url::parse(&base_url)?;

        let http_client = self
            .http_client
            .unwrap_or_else(|| default_http_client(self.user_agent.as_deref(), self.timeout));

        Ok(OnshapeClient {
            executor: SignedRequestExecutor::new(http_client, base_url, Arc::new(provider)),
        })
    }
}
