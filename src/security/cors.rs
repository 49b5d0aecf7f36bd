//! Cross-origin policy.

use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::CorsConfig;

/// Build the CORS layer. Entries that do not parse are logged and skipped.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins = if config.allow_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(config.allow_origins.iter().filter_map(|origin| {
            HeaderValue::from_str(origin)
                .map_err(|_| tracing::warn!(origin = %origin, "Ignoring invalid CORS origin"))
                .ok()
        }))
    };

    let methods: Vec<Method> = config
        .allow_methods
        .iter()
        .filter_map(|method| {
            method
                .parse()
                .map_err(|_| tracing::warn!(method = %method, "Ignoring invalid CORS method"))
                .ok()
        })
        .collect();

    let headers: Vec<HeaderName> = config
        .allow_headers
        .iter()
        .filter_map(|name| {
            name.parse()
                .map_err(|_| tracing::warn!(header = %name, "Ignoring invalid CORS header"))
                .ok()
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers(headers)
}
