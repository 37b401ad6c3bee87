use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints any visitor may call. Pages here still show the caller's
/// session state (navbar, review form) when a session exists.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(handlers::health))
        // GET /api-docs/openapi.json
        .route("/api-docs/openapi.json", get(handlers::openapi_json))
        .route("/", get(handlers::root))
        // GET /listings
        .route("/listings", get(handlers::index))
        // GET /listings/{id}
        // Unknown ids redirect to the index with an error notice.
        .route("/listings/{id}", get(handlers::show))
        // GET|POST /login
        // POST is the development sign-in and answers 403 in production.
        .route("/login", get(handlers::login_form).merge(post(handlers::login)))
        // GET /logout
        .route("/logout", get(handlers::logout))
}
