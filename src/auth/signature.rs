//! HMAC-SHA256 signature generation for Onshape API-key authentication.
//!
//! The signature is computed as:
//! ```text
//! base64(HMAC-SHA256(secret_key, canonical_string))
//! ```
//!
//! and sent as `Authorization: On <access_key>:<signature>`.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use hmac::{Hmac, Mac};
use md5::{Digest, Md5};
use sha2::Sha256;

use crate::error::OnshapeError;

type HmacSha256 = Hmac<Sha256>;

/// Sign a canonical request string with the API secret key.
///
/// # Arguments
///
/// * `secret` - The raw secret key, used as the HMAC key as-is
/// * `canonical` - The canonical request string (see [`crate::auth::CanonicalRequest`])
///
/// # Returns
///
/// Base64-encoded HMAC-SHA256 signature.
///
/// # Example
///
/// ```rust
/// use onshape_client::auth::sign;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let signature = sign(
///     "my_secret_key",
///     "get\n/api/documents\nmon, 14 jan 2019 21:35:06 gmt",
/// )?;
/// assert_eq!(signature.len(), 44);
/// # Ok(())
/// # }
/// ```
pub fn sign(secret: &str, canonical: &str) -> Result<String, OnshapeError> {
    if secret.is_empty() {
        return Err(OnshapeError::Configuration(
            "API secret key is empty.".to_string(),
        ));
    }

    let mut hmac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| OnshapeError::Signing(format!("Invalid HMAC key: {e}")))?;
    hmac.update(canonical.as_bytes());
    let hmac_result = hmac.finalize().into_bytes();

    Ok(BASE64.encode(hmac_result))
}

/// Base64-encoded MD5 digest of a request body, for the `Content-MD5` header.
pub fn content_md5(body: &[u8]) -> String {
    BASE64.encode(Md5::digest(body))
}
