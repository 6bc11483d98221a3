//! Example: Working with OnshapeError.
//!
//! Run with: cargo run --example error_handling

use onshape_client::auth::ApiKeyCredentials;
use onshape_client::rest::OnshapeClient;
use onshape_client::OnshapeError;

#[tokio::main]
async fn main() {
    // Missing secrets are rejected before any request is made.
    match OnshapeClient::builder()
        .credentials(ApiKeyCredentials::new("AbCdEfGhIjKlMnOpQrStUvWx", "").into())
        .build()
    {
        Err(err) if err.is_configuration() => println!("Configuration error: {err}"),
        Err(err) => println!("Unexpected error: {err}"),
        Ok(_) => println!("Unexpectedly built a client"),
    }

    // Nothing listens on this port, so the request fails in transport.
    let client = match OnshapeClient::builder()
        .base_url("http://127.0.0.1:9")
        .credentials(
            ApiKeyCredentials::new(
                "AbCdEfGhIjKlMnOpQrStUvWx",
                "S3cr3tK3yForOnshapeSigningTestsOnly0123456789abc",
            )
            .into(),
        )
        .build()
    {
        Ok(client) => client,
        Err(err) => {
            println!("Failed to build client: {err}");
            return;
        }
    };

    match client.session_info().await {
        Ok(info) => println!("Session: {info}"),
        Err(OnshapeError::Authentication {
            status, message, hints,
        }) => {
            println!("Not authorized ({status:?}): {message}");
            for hint in hints {
                println!("  hint: {hint}");
            }
        }
        Err(OnshapeError::Api { status, message }) => {
            println!("API error {status}: {message}");
        }
        Err(err) if err.is_transport() => println!("Transport error: {err}"),
        Err(err) => println!("Other error: {err}"),
    }
}
