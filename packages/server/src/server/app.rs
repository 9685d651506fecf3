//! Application setup and server configuration.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::Extension,
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::domains::workflow::Orchestrator;
use crate::kernel::ServerDeps;
use crate::server::routes::{
    ask_handler, delete_conversation_handler, get_conversation_handler, health_handler,
    ingestion_handler,
};

/// Shared application state
#[derive(Clone)]
pub struct AxumAppState {
    pub orchestrator: Arc<Orchestrator>,
    pub server_deps: Arc<ServerDeps>,
}

impl AxumAppState {
    pub fn new(orchestrator: Orchestrator, server_deps: ServerDeps) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            server_deps: Arc::new(server_deps),
        }
    }
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([CONTENT_TYPE]);

    if allowed_origins.is_empty() {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    cors.allow_origin(origins)
}

/// Build the Axum application router.
///
/// `request_timeout` bounds a whole request; it should exceed the model
/// timeout times the number of model calls a turn can make.
pub fn build_app(
    state: AxumAppState,
    allowed_origins: &[String],
    request_timeout: Duration,
) -> Router {
    Router::new()
        .route("/api/ask", post(ask_handler))
        .route(
            "/api/conversations/:id",
            get(get_conversation_handler).delete(delete_conversation_handler),
        )
        .route("/api/ingestion", post(ingestion_handler))
        .route("/health", get(health_handler))
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(Extension(state))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_origins_are_skipped() {
        // Builds without panicking even with a header-invalid origin.
        let _ = cors_layer(&["https://ok.example".into(), "bad\norigin".into()]);
        let _ = cors_layer(&[]);
    }
}
