//! fetchd HTTP server: REST + SSE surface over the orchestration core.

pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

use std::sync::Arc;

use axum::http::{header, Method};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Assemble the full application: API routes, artifact serving, CORS, and
/// request tracing.
///
/// CORS is wide open by contract: any origin, `GET, POST, OPTIONS`, and the
/// `Content-Type`/`Authorization` request headers. Preflight requests are
/// answered by the layer without touching handlers.
pub fn create_app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .merge(routes::api_routes())
        .nest_service("/downloads", ServeDir::new(&state.download_dir))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
