//! Request-identity cache key generation.

use sha2::{Digest, Sha256};

use crate::Request;

/// Compute the cache key for a method and URL.
///
/// The URL must already have its fragment removed.
pub fn compute_cache_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

/// Cache key for an intercepted request.
pub fn request_key(request: &Request) -> String {
    compute_cache_key(request.method.as_str(), &request.cache_url())
}
