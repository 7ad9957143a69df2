//! HTTP route handlers.
//!
//! Every response is marked `Cache-Control: no-store` since health data must
//! always be fresh. Request tracing is enabled via middleware that generates a
//! unique request ID for each incoming request, allowing correlation of all logs
//! (including probe outcomes) within a request.

pub mod checks;
pub mod health;

use axum::{http::Uri, middleware, response::Response, routing::get, Extension, Router};
use http::header::{HeaderValue, CACHE_CONTROL};
use http::Method;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::{CorsConfig, CACHE_CONTROL_NO_STORE};
use crate::error::AppError;
use crate::middleware::{request_id_layer, RequestId};
use crate::state::AppState;

/// Build the CORS layer from configuration.
///
/// `*` allows any origin. Otherwise only the listed origins are allowed;
/// entries that are not valid header values are skipped with a warning.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any);

    if config.allows_any() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}

/// JSON 404 for unknown paths.
async fn not_found(Extension(request_id): Extension<RequestId>, uri: Uri) -> Response {
    AppError::NotFound(uri.path().to_string()).with_request_id(&request_id)
}

/// Creates the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors);

    Router::new()
        .route("/", get(health::liveness))
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/db-check", get(checks::db_check))
        .route("/cache-check", get(checks::cache_check))
        .fallback(not_found)
        .with_state(state)
        .layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static(CACHE_CONTROL_NO_STORE),
        ))
        .layer(cors)
        // Request ID middleware - creates root span with request_id for correlation
        .layer(middleware::from_fn(request_id_layer))
}
