//! # Onshape Client
//!
//! An async Rust client library for the Onshape REST API.
//!
//! ## Features
//!
//! - API-key authentication with HMAC-SHA256 request signing and random nonces
//! - OAuth bearer tokens with a single, de-duplicated refresh on expiry
//! - Configuration from explicit options or `ONSHAPE_*` environment variables
//! - Secrets held in [`secrecy`] types and masked in every diagnostic
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use onshape_client::rest::OnshapeClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = OnshapeClient::from_env()?;
//!     let document = client.get_document("e60c4803eaf2ac8be492c18e").await?;
//!     println!("Document: {}", document.name);
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod rest;

// Re-export commonly used types at crate root
pub use auth::{AuthMethod, AuthProvider, Credentials, QueryParams};
pub use config::{AuthType, ClientConfig};
pub use error::OnshapeError;
pub use rest::{ApiRequest, OnshapeClient};

/// Result type alias using OnshapeError
pub type Result<T> = std::result::Result<T, OnshapeError>;
