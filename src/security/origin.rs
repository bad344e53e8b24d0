//! Origin check for browser callers.

use std::time::Duration;

use axum::http::{header, HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::CorsConfig;

const CSRF_TOKEN: HeaderName = HeaderName::from_static("x-csrf-token");

/// Build the CORS layer from the configured origin allow-list.
///
/// # Errors
/// Returns the first origin that is not a valid header value.
pub fn cors_layer(config: &CorsConfig) -> Result<CorsLayer, String> {
    let origins = config
        .allowed_origins
        .iter()
        .map(|origin| HeaderValue::from_str(origin).map_err(|_| origin.clone()))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
            Method::PATCH,
        ])
        .allow_headers([
            header::ACCEPT,
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            CSRF_TOKEN,
        ])
        .allow_credentials(true)
        .max_age(Duration::from_secs(config.max_age_secs)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_origin_is_reported() {
        let config = CorsConfig {
            allowed_origins: vec!["http://ok.example".into(), "bad\norigin".into()],
            max_age_secs: 300,
        };
        assert_eq!(cors_layer(&config).unwrap_err(), "bad\norigin");
    }
}
