//! Resource classification.
//!
//! Pure function of the request and the policy; no I/O. Rules are evaluated
//! in order and the first match wins:
//!
//! 1. non-GET or cross-origin: not intercepted
//! 2. path in the precache manifest: [`ResourceClass::Precached`]
//! 3. path under the build asset prefix: [`ResourceClass::BuildAsset`]
//! 4. destination `image`: [`ResourceClass::Image`]
//! 5. mode `navigate`: [`ResourceClass::Navigation`]
//! 6. anything else: [`ResourceClass::Other`]

use serde::Serialize;
use std::fmt;
use swcache_core::{Destination, Method, Request, RequestMode};

use crate::fetch::same_origin;
use crate::policy::CachePolicy;

/// The caching class of an intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceClass {
    /// Listed in the precache manifest.
    Precached,
    /// Emitted by the build tool under its static prefix.
    BuildAsset,
    Image,
    /// Top-level page load.
    Navigation,
    Other,
}

impl fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResourceClass::Precached => "precached",
            ResourceClass::BuildAsset => "build_asset",
            ResourceClass::Image => "image",
            ResourceClass::Navigation => "navigation",
            ResourceClass::Other => "other",
        })
    }
}

/// Why a request was left to the network untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BypassReason {
    NonGet,
    CrossOrigin,
    /// The worker is not the active controller yet.
    Inactive,
}

/// Outcome of classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Bypass(BypassReason),
    Intercept(ResourceClass),
}

/// Classify a request under `policy`.
pub fn classify(policy: &CachePolicy, request: &Request) -> Disposition {
    if request.method != Method::Get {
        return Disposition::Bypass(BypassReason::NonGet);
    }
    if !same_origin(policy.origin(), &request.url) {
        return Disposition::Bypass(BypassReason::CrossOrigin);
    }

    let path = request.url.path();
    let class = if policy.is_precached_path(path) {
        ResourceClass::Precached
    } else if path.starts_with(policy.build_asset_prefix()) {
        ResourceClass::BuildAsset
    } else if request.destination == Destination::Image {
        ResourceClass::Image
    } else if request.mode == RequestMode::Navigate {
        ResourceClass::Navigation
    } else {
        ResourceClass::Other
    };

    Disposition::Intercept(class)
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn policy() -> CachePolicy {
        CachePolicy::new("https://folio.dev").unwrap()
    }

    fn url(path: &str) -> Url {
        Url::parse("https://folio.dev").unwrap().join(path).unwrap()
    }

    #[test]
    fn test_non_get_bypasses() {
        let request = Request::get(url("/api/contact")).with_method(Method::Post);
        assert_eq!(classify(&policy(), &request), Disposition::Bypass(BypassReason::NonGet));
    }

    #[test]
    fn test_non_get_manifest_path_still_bypasses() {
        let request = Request::get(url("/")).with_method(Method::Head);
        assert_eq!(classify(&policy(), &request), Disposition::Bypass(BypassReason::NonGet));
    }

    #[test]
    fn test_cross_origin_bypasses() {
        let request = Request::image(Url::parse("https://images.unsplash.com/photo.jpg").unwrap());
        assert_eq!(classify(&policy(), &request), Disposition::Bypass(BypassReason::CrossOrigin));
    }

    #[test]
    fn test_manifest_paths_are_precached() {
        for path in ["/", "/favicon.ico", "/favicon.svg", "/og-image.jpg", "/manifest.json"] {
            let request = Request::get(url(path));
            assert_eq!(classify(&policy(), &request), Disposition::Intercept(ResourceClass::Precached), "{path}");
        }
    }

    #[test]
    fn test_manifest_wins_over_navigation_and_image() {
        assert_eq!(
            classify(&policy(), &Request::navigate(url("/"))),
            Disposition::Intercept(ResourceClass::Precached)
        );
        assert_eq!(
            classify(&policy(), &Request::image(url("/og-image.jpg"))),
            Disposition::Intercept(ResourceClass::Precached)
        );
    }

    #[test]
    fn test_manifest_wins_over_build_prefix() {
        let policy = policy().with_manifest(["/", "/_next/static/css/app.css"]).unwrap();
        let request = Request::get(url("/_next/static/css/app.css"));
        assert_eq!(classify(&policy, &request), Disposition::Intercept(ResourceClass::Precached));
    }

    #[test]
    fn test_query_does_not_affect_manifest_match() {
        let request = Request::get(url("/favicon.ico?v=2"));
        assert_eq!(classify(&policy(), &request), Disposition::Intercept(ResourceClass::Precached));
    }

    #[test]
    fn test_build_assets() {
        let request = Request::get(url("/_next/static/chunks/chunk123.js"));
        assert_eq!(classify(&policy(), &request), Disposition::Intercept(ResourceClass::BuildAsset));

        let image = Request::image(url("/_next/image?url=%2Fme.png&w=640"));
        assert_eq!(classify(&policy(), &image), Disposition::Intercept(ResourceClass::BuildAsset));
    }

    #[test]
    fn test_images() {
        let request = Request::image(url("/projects/cover.webp"));
        assert_eq!(classify(&policy(), &request), Disposition::Intercept(ResourceClass::Image));
    }

    #[test]
    fn test_navigation() {
        let request = Request::navigate(url("/projects"));
        assert_eq!(classify(&policy(), &request), Disposition::Intercept(ResourceClass::Navigation));
    }

    #[test]
    fn test_other() {
        let request = Request::get(url("/robots.txt"));
        assert_eq!(classify(&policy(), &request), Disposition::Intercept(ResourceClass::Other));
    }
}
