//! Authentication module for the Onshape API.
//!
//! This module provides:
//! - Credential types with secure secret storage
//! - Canonical request construction and HMAC-SHA256 signing for API keys
//! - Random nonce generation for replay protection
//! - OAuth bearer tokens with de-duplicated refresh
//! - Provider selection from configuration

mod api_key;
mod canonical;
mod credentials;
mod nonce;
mod oauth;
mod provider;
mod signature;
mod token_store;

pub use api_key::{
    ApiKeyAuthProvider, ApiKeyDiagnostics, CONTENT_MD5, EXPECTED_ACCESS_KEY_LEN,
    EXPECTED_SECRET_KEY_LEN, ON_NONCE,
};
pub use canonical::{CanonicalRequest, QueryParams, build_canonical_string, http_date};
pub use credentials::{ApiKeyCredentials, Credentials, OAuthCredentials, mask_secret};
pub use nonce::{MIN_NONCE_BYTES, NonceProvider, RandomNonce};
pub use oauth::{
    DEFAULT_REFRESH_MARGIN, DEFAULT_REFRESH_TIMEOUT, OAuthAuthProvider, TokenRefreshListener,
};
pub use provider::{AuthMethod, AuthProvider};
pub use signature::{content_md5, sign};
pub use token_store::{OAuthTokenStore, TokenPair, TokenState};
