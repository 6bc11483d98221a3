//! Signed request execution with a single refresh-and-retry on OAuth 401s.
//!
//! ```text
//! Building -> Sending -> Succeeded
//!                     -> AuthFailed -> Refreshing -> Retrying -> Succeeded | Failed
//! ```
//!
//! Only an OAuth provider that can refresh enters `Refreshing`, and it does so
//! at most once per request. API-key 401s are surfaced immediately with
//! diagnostics about the key pair.

use std::sync::Arc;

use reqwest::header::{
    ACCEPT, AUTHORIZATION, CONTENT_TYPE, DATE, HeaderMap, HeaderName, HeaderValue,
};
use reqwest::{Method, Response, StatusCode};
use reqwest_middleware::ClientWithMiddleware;

use crate::auth::{AuthProvider, CONTENT_MD5, CanonicalRequest, ON_NONCE, QueryParams};
use crate::error::OnshapeError;
use crate::rest::http::transport_error;

/// Headers that only the auth provider may set.
const AUTH_HEADERS: [HeaderName; 4] = [AUTHORIZATION, DATE, ON_NONCE, CONTENT_MD5];

/// A request to be signed and sent.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: QueryParams,
    body: Option<Vec<u8>>,
    headers: HeaderMap,
}

impl ApiRequest {
    /// Create a request without query or body.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: QueryParams::new(),
            body: None,
            headers: HeaderMap::new(),
        }
    }

    /// Create a GET request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// Create a POST request.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Create a DELETE request.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Set the query parameters.
    pub fn query(mut self, query: QueryParams) -> Self {
        self.query = query;
        self
    }

    /// Set a raw body.
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `value` as the JSON body.
    pub fn json<T: serde::Serialize + ?Sized>(mut self, value: &T) -> Result<Self, OnshapeError> {
        self.body = Some(serde_json::to_vec(value)?);
        Ok(self)
    }

    /// Add a header, e.g. to override `Accept`.
    ///
    /// Authentication headers set here are ignored.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// The HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The request path.
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Sends requests with headers from the client's [`AuthProvider`].
#[derive(Clone)]
pub struct SignedRequestExecutor {
    http_client: ClientWithMiddleware,
    base_url: String,
    provider: Arc<AuthProvider>,
}

impl SignedRequestExecutor {
    /// Create an executor.
    pub fn new(
        http_client: ClientWithMiddleware,
        base_url: impl Into<String>,
        provider: Arc<AuthProvider>,
    ) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            provider,
        }
    }

    /// The active provider.
    pub fn provider(&self) -> &AuthProvider {
        &self.provider
    }

    /// The API base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send `request`, refreshing and retrying once on an OAuth 401.
    ///
    /// Returns the response only if it has a success status.
    pub async fn execute(&self, request: &ApiRequest) -> Result<Response, OnshapeError> {
        let (response, generation) = self.send(request).await?;
        if response.status().is_success() {
            return Ok(response);
        }

        if response.status() == StatusCode::UNAUTHORIZED {
            if let Some(oauth) = self
                .provider
                .as_oauth()
                .filter(|p| p.has_refresh_capability())
            {
                tracing::debug!(
                    path = request.path(),
                    generation,
                    "Access token rejected, refreshing and retrying once"
                );
                oauth.refresh_from(generation).await?;

                let (retried, _) = self.send(request).await?;
                if retried.status().is_success() {
                    return Ok(retried);
                }
                return Err(self.failure(request, retried, true).await);
            }
        }

        Err(self.failure(request, response, false).await)
    }

    async fn send(&self, request: &ApiRequest) -> Result<(Response, u64), OnshapeError> {
        let (auth_headers, generation) = self
            .provider
            .headers_with_generation(
                &request.method,
                &request.path,
                &request.query,
                request.body.as_deref(),
            )
            .await?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.extend(auth_headers);
        for (name, value) in &request.headers {
            if !AUTH_HEADERS.contains(name) {
                headers.insert(name.clone(), value.clone());
            }
        }

        let url = format!(
            "{}{}",
            self.base_url,
            CanonicalRequest::new(&request.method, &request.path, &request.query, "")
                .path_and_query()
        );
        tracing::debug!(method = %request.method, url = %url, "Sending request");

        let mut builder = self
            .http_client
            .request(request.method.clone(), &url)
            .headers(headers);
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(transport_error)?;
        tracing::debug!(status = response.status().as_u16(), "Received response");
        Ok((response, generation))
    }

    async fn failure(&self, request: &ApiRequest, response: Response, retried: bool) -> OnshapeError {
        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!(status = status.as_u16(), error = %e, "Failed to read error response body");
                return if e.is_timeout() {
                    OnshapeError::Timeout
                } else {
                    OnshapeError::Transport(e)
                };
            }
        };
        let message = error_message(status, &body);

        if status != StatusCode::UNAUTHORIZED && status != StatusCode::FORBIDDEN {
            return OnshapeError::Api {
                status: status.as_u16(),
                message,
            };
        }

        let hints = match self.provider.as_ref() {
            AuthProvider::ApiKey(provider) => provider.diagnostics().hints(),
            AuthProvider::OAuth(_) if retried => vec![
                "The access token was rejected again after a successful refresh; check the OAuth application's scopes."
                    .to_string(),
            ],
            AuthProvider::OAuth(provider) if !provider.has_refresh_capability() => vec![
                "The access token was rejected and cannot be refreshed; configure a refresh token, client id and client secret."
                    .to_string(),
            ],
            AuthProvider::OAuth(_) => vec![
                "The access token lacks permission for this resource.".to_string(),
            ],
        };
        tracing::warn!(
            method = %request.method,
            path = request.path(),
            status = status.as_u16(),
            auth_method = %self.provider.method(),
            "Request was not authorized"
        );

        OnshapeError::Authentication {
            status: Some(status.as_u16()),
            message,
            hints,
        }
    }
}

impl std::fmt::Debug for SignedRequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignedRequestExecutor")
            .field("base_url", &self.base_url)
            .field("auth_method", &self.provider.method())
            .finish()
    }
}

/// Pull a readable message out of an error body.
fn error_message(status: StatusCode, body: &str) -> String {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        message: Option<String>,
    }

    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .or_else(|| (!body.trim().is_empty()).then(|| body.trim().to_string()))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown error").to_string())
}
