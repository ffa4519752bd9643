//! URL resolution against the site origin.

use swcache_core::Error;
use url::Url;

/// Error type for URL resolution failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<UrlError> for Error {
    fn from(err: UrlError) -> Self {
        Error::InvalidUrl(err.to_string())
    }
}

/// Resolve a request URL for interception.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Resolve site-relative input (`/about`) against `origin`
/// 3. Lowercase the host and collapse dot segments (via the URL parser)
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
pub fn resolve(origin: &Url, input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = if trimmed.contains("://") {
        Url::parse(trimmed)
    } else {
        origin.join(trimmed)
    }
    .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Normalize a site path the same way request URLs are normalized.
///
/// Used to key the precache manifest so lookups compare like with like.
pub fn normalize_path(origin: &Url, path: &str) -> Result<String, UrlError> {
    Ok(resolve(origin, path)?.path().to_string())
}

/// Whether `url` shares scheme, host and port with `origin`.
pub fn same_origin(origin: &Url, url: &Url) -> bool {
    origin.origin() == url.origin()
}
