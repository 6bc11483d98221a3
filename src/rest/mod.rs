//! Onshape REST API client.
//!
//! Every request goes through [`SignedRequestExecutor`], which asks the
//! client's [`crate::auth::AuthProvider`] for headers and applies the
//! refresh-and-retry policy for OAuth.
//!
//! ```rust,no_run
//! use onshape_client::auth::QueryParams;
//! use onshape_client::config::ClientConfig;
//! use onshape_client::rest::OnshapeClient;
//!
//! # async fn run() -> Result<(), onshape_client::OnshapeError> {
//! let client = OnshapeClient::builder()
//!     .config(ClientConfig::new().merge_env()?)
//!     .build()?;
//! let info: serde_json::Value = client
//!     .get_json("/api/users/sessioninfo", &QueryParams::new())
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod client;
pub mod documents;
pub mod endpoints;
mod executor;
pub(crate) mod http;

pub use client::{OnshapeClient, OnshapeClientBuilder};
pub use executor::{ApiRequest, SignedRequestExecutor};
