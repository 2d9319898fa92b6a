use std::time::Duration;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::Method,
    middleware,
    routing::{get, post},
};
use tower_http::cors::{AllowHeaders, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::AppState;
use crate::gate;
use crate::handlers;

/// Build the complete router: routing table, admission gate, CORS and
/// tracing.
///
/// Layer order (outermost first): trace, CORS, admission gate, body
/// limit. The CORS layer answers every `OPTIONS` request itself, so
/// preflights succeed regardless of approval state, and it stamps
/// `Access-Control-Allow-Origin: *` on every response including gate
/// rejections and fallback 404s.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(AllowHeaders::mirror_request())
        .max_age(Duration::from_secs(86400));

    Router::new()
        // UI shell
        .route("/", get(handlers::index))
        // Listing API
        .route("/api/list", get(handlers::list_directory))
        // Mutation APIs
        .route("/api/delete", post(handlers::delete_entry))
        .route("/api/rename", post(handlers::rename_entry))
        .route("/api/mkdir", post(handlers::make_directory))
        .route("/api/upload", post(handlers::upload))
        // Raw file download
        .route("/files/{*path}", get(handlers::download))
        .fallback(handlers::not_found)
        .method_not_allowed_fallback(handlers::method_not_allowed)
        .layer(DefaultBodyLimit::max(state.config.max_upload_size as usize))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            gate::admission_middleware,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
