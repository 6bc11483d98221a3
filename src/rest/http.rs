//! Shared HTTP client construction.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_tracing::TracingMiddleware;

use crate::error::OnshapeError;

/// Build the middleware-wrapped HTTP client used for API and token calls.
///
/// No retry middleware is installed: a re-sent API-key request would reuse
/// its nonce and be rejected as a replay.
pub(crate) fn default_http_client(
    user_agent: Option<&str>,
    timeout: Option<Duration>,
) -> ClientWithMiddleware {
    let mut headers = HeaderMap::new();
    let user_agent = user_agent
        .map(str::to_string)
        .unwrap_or_else(|| format!("onshape-client/{}", env!("CARGO_PKG_VERSION")));
    let header_value = HeaderValue::from_str(&user_agent)
        .unwrap_or_else(|_| HeaderValue::from_static("onshape-client"));
    headers.insert(USER_AGENT, header_value);

    let mut builder = reqwest::Client::builder().default_headers(headers);
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    let reqwest_client = builder.build().unwrap_or_else(|_| reqwest::Client::new());

    ClientBuilder::new(reqwest_client)
        .with(TracingMiddleware::default())
        .build()
}

/// Classify a failed send, surfacing timeouts separately.
pub(crate) fn transport_error(error: reqwest_middleware::Error) -> OnshapeError {
    match error {
        reqwest_middleware::Error::Reqwest(e) if e.is_timeout() => OnshapeError::Timeout,
        reqwest_middleware::Error::Reqwest(e) => OnshapeError::Transport(e),
        other => OnshapeError::TransportMiddleware(other),
    }
}
