//! Nonce generation for Onshape API-key authentication.
//!
//! Every signed request carries an `On-Nonce` header holding a fresh random
//! value so a captured signature cannot be replayed.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use rand::RngCore;
use rand::rngs::OsRng;

/// Minimum number of random bytes in a nonce.
pub const MIN_NONCE_BYTES: usize = 16;

/// Trait for providing nonces for signed requests.
///
/// Each returned value must be unique; a repeated nonce lets the server
/// reject the request as a replay.
pub trait NonceProvider: Send + Sync {
    /// Generate the next nonce value.
    fn next_nonce(&self) -> String;
}

/// A nonce provider backed by the operating system's CSPRNG.
///
/// Produces the base64 encoding of `len` random bytes.
#[derive(Debug, Clone, Copy)]
pub struct RandomNonce {
    len: usize,
}

impl RandomNonce {
    /// Create a provider producing 24-byte nonces.
    pub fn new() -> Self {
        Self { len: 24 }
    }

    /// Create a provider producing nonces of `len` random bytes.
    ///
    /// Lengths below [`MIN_NONCE_BYTES`] are raised to the minimum.
    pub fn with_len(len: usize) -> Self {
        Self {
            len: len.max(MIN_NONCE_BYTES),
        }
    }
}

impl Default for RandomNonce {
    fn default() -> Self {
        Self::new()
    }
}

impl NonceProvider for RandomNonce {
    fn next_nonce(&self) -> String {
        let mut bytes = vec![0u8; self.len];
        OsRng.fill_bytes(&mut bytes);
        BASE64.encode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    #[test]
    fn test_consecutive_nonces_differ() {
        let provider = RandomNonce::new();
        let mut collisions = 0;
        for _ in 0..1000 {
            if provider.next_nonce() == provider.next_nonce() {
                collisions += 1;
            }
        }
        assert!(collisions <= 1);
    }

    #[test]
    fn test_nonce_decodes_to_requested_length() {
        let nonce = RandomNonce::with_len(32).next_nonce();
        assert_eq!(BASE64.decode(nonce).unwrap().len(), 32);
    }

    #[test]
    fn test_nonce_length_has_floor() {
        let nonce = RandomNonce::with_len(4).next_nonce();
        assert_eq!(BASE64.decode(nonce).unwrap().len(), MIN_NONCE_BYTES);
    }

    #[test]
    fn test_nonce_unique_across_threads() {
        let provider = std::sync::Arc::new(RandomNonce::new());
        let mut handles = vec![];

        for _ in 0..4 {
            let p = provider.clone();
            handles.push(thread::spawn(move || {
                (0..500).map(|_| p.next_nonce()).collect::<Vec<_>>()
            }));
        }

        let mut all_nonces = HashSet::new();
        for handle in handles {
            for nonce in handle.join().unwrap() {
                assert!(all_nonces.insert(nonce), "Nonce must be unique across threads");
            }
        }
    }
}
