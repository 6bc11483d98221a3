//! Example: Building authentication headers without sending a request.
//!
//! Run with: cargo run --example auth_headers
//!
//! Reads ONSHAPE_ACCESS_KEY / ONSHAPE_SECRET_KEY (or ONSHAPE_OAUTH_TOKEN) from
//! the environment or a `.env` file. Falls back to dummy API keys.

use onshape_client::auth::{AuthProvider, QueryParams, mask_secret};
use onshape_client::config::ClientConfig;
use reqwest::Method;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenv::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut config = ClientConfig::from_env()?;
    if config.access_key.is_none() && config.access_token.is_none() {
        config = config.api_key(
            "AbCdEfGhIjKlMnOpQrStUvWx",
            "S3cr3tK3yForOnshapeSigningTestsOnly0123456789abc",
        );
    }
    let provider = AuthProvider::from_config(&config)?;
    println!("Authentication method: {}", provider.method());

    let query = QueryParams::new().with("q", "bracket").with("limit", 20);
    let headers = provider
        .auth_headers(&Method::GET, "/api/documents", &query, None)
        .await?;

    for (name, value) in &headers {
        let value = value.to_str().unwrap_or("<binary>");
        if name == reqwest::header::AUTHORIZATION {
            println!("{name}: {}", mask_secret(value));
        } else {
            println!("{name}: {value}");
        }
    }

    if let Some(api_key) = provider.as_api_key() {
        for hint in api_key.diagnostics().hints() {
            println!("hint: {hint}");
        }
    }

    Ok(())
}
