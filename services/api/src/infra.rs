use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use counsel::config::{ConfigError, CorsConfig};
use counsel::error::AppError;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Browser clients call every surface cross-origin, so the layer covers the
/// whole router. Permissive config (`*`) cannot carry credentials; explicit
/// origins can.
pub(crate) fn build_cors_layer(config: &CorsConfig) -> Result<CorsLayer, AppError> {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];
    let headers = [AUTHORIZATION, CONTENT_TYPE];

    if config.is_permissive() {
        return Ok(CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(headers));
    }

    let mut origins = Vec::with_capacity(config.allowed_origins.len());
    for origin in &config.allowed_origins {
        let value = HeaderValue::from_str(origin).map_err(|_| {
            AppError::Config(ConfigError::InvalidCorsOrigin {
                value: origin.clone(),
            })
        })?;
        origins.push(value);
    }

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(methods)
        .allow_headers(headers)
        .allow_credentials(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permissive_config_builds() {
        let config = CorsConfig {
            allowed_origins: vec!["*".to_string()],
        };
        assert!(build_cors_layer(&config).is_ok());
    }

    #[test]
    fn explicit_origins_build() {
        let config = CorsConfig {
            allowed_origins: vec![
                "http://localhost:5173".to_string(),
                "https://guidance.example.edu".to_string(),
            ],
        };
        assert!(build_cors_layer(&config).is_ok());
    }

    #[test]
    fn malformed_origin_is_rejected() {
        let config = CorsConfig {
            allowed_origins: vec!["http://bad\norigin".to_string()],
        };
        assert!(build_cors_layer(&config).is_err());
    }
}
