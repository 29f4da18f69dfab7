//! Router wiring.

use std::time::Duration;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{
    create_checkout_session, healthz, stripe_portal, user_status, webhook, AppState,
};

/// API routes that consume JSON bodies.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/create-checkout-session", post(create_checkout_session))
        .route("/stripe-portal", post(stripe_portal))
        .route("/user/:user_id/status", get(user_status))
        .route("/healthz", get(healthz))
}

/// The webhook route is kept separate: its handler extracts the raw body
/// bytes, and no JSON layer may touch the request before verification.
pub fn webhook_routes() -> Router<AppState> {
    Router::new().route("/webhook", post(webhook))
}

/// Build the complete application router.
pub fn router(state: AppState, cors: CorsLayer, request_timeout: Duration) -> Router {
    Router::new()
        .merge(api_routes())
        .merge(webhook_routes())
        .layer(cors)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS layer from the configured origin list; an empty list means any
/// origin, matching the original wide-open deployment.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}
