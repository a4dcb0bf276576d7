//! Fixed permissive cross-origin headers for the chat route.

use axum::http::header::{
    HeaderName, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN,
};

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_HEADERS: &str = "Content-Type,Authorization";
pub const ALLOW_METHODS: &str = "OPTIONS,POST";

/// Header carried by every non-preflight response.
pub fn allow_origin() -> [(HeaderName, &'static str); 1] {
    [(ACCESS_CONTROL_ALLOW_ORIGIN, ALLOW_ORIGIN)]
}

/// Headers answered to a preflight request.
pub fn preflight() -> [(HeaderName, &'static str); 3] {
    [
        (ACCESS_CONTROL_ALLOW_ORIGIN, ALLOW_ORIGIN),
        (ACCESS_CONTROL_ALLOW_HEADERS, ALLOW_HEADERS),
        (ACCESS_CONTROL_ALLOW_METHODS, ALLOW_METHODS),
    ]
}
