//! Synthetic responses served when the network is unreachable.

use swcache_core::Response;

const PLACEHOLDER_SVG: &str = concat!(
    r#"<svg xmlns="http://www.w3.org/2000/svg" width="200" height="200" viewBox="0 0 200 200">"#,
    r##"<rect width="200" height="200" fill="#f3f4f6"/>"##,
    r##"<text x="50%" y="50%" text-anchor="middle" dy=".3em" fill="#9ca3af">Image unavailable</text>"##,
    "</svg>"
);

/// 200x200 light-gray SVG labelled "Image unavailable".
pub fn image_placeholder() -> Response {
    Response::with_content_type(200, "image/svg+xml", PLACEHOLDER_SVG)
}

/// Minimal 503 page for navigations with nothing cached to fall back on.
pub fn offline_response() -> Response {
    Response::with_content_type(503, "text/plain;charset=UTF-8", "Offline")
}
