use axum::{
    Router,
    extract::{FromRef, Query, Request},
    http::{HeaderName, Method},
    middleware::{self, Next},
    response::Response,
};
use serde::Deserialize;
use utoipa::OpenApi;

use tower::{ServiceBuilder, util::MapRequest};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod context;
pub mod error;
pub mod flash;
pub mod guards;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod templates;
pub mod validation;

// Module for routing segregation (Public, Authenticated).
pub mod routes;
use auth::AuthUser;
use routes::{authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::AppError;
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};

/// ApiDoc
///
/// OpenAPI description of the route table, generated from the
/// `#[utoipa::path]` annotations and served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::index, handlers::new_form, handlers::show, handlers::create,
        handlers::edit_form, handlers::update, handlers::delete,
        handlers::create_review, handlers::delete_review,
        handlers::login_form, handlers::login, handlers::logout
    ),
    components(
        schemas(
            models::Listing, models::Review, models::User, models::ListingDetail,
            models::ReviewDetail, validation::ListingForm, validation::ReviewForm,
            handlers::LoginForm,
        )
    ),
    tags(
        (name = "stayhub", description = "StayHub listings marketplace")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// Shared, immutable container for the store handle and the configuration.
/// Extractors pull the piece they need through the `FromRef` impls below.
#[derive(Clone)]
pub struct AppState {
    /// Store behind the `Repository` trait (Postgres or in-memory).
    pub repo: RepositoryState,
    /// The loaded, immutable environment configuration.
    pub config: AppConfig,
}

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Session check for `authenticated_routes`. Extracting `AuthUser` either
/// succeeds or short-circuits with the login redirect, so the handler never
/// runs anonymously.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the route table, the session layer and the observability
/// layers, and registers the application state.
pub fn create_router(state: AppState) -> Router {
    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .fallback(handlers::fallback)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            error::with_page_frame,
        ))
        .with_state(state);

    base_router.layer(
        ServiceBuilder::new()
            // Generates a UUID for every incoming request.
            .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(trace_span_logger)
                    .on_response(
                        DefaultOnResponse::new()
                            .level(Level::INFO)
                            .latency_unit(tower_http::LatencyUnit::Millis),
                    ),
            )
            // Echoes x-request-id back to the client.
            .layer(PropagateRequestIdLayer::new(x_request_id)),
    )
}

/// trace_span_logger
///
/// Span for `TraceLayer`: method, URI and the request id, so every log line
/// of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}

#[derive(Deserialize)]
struct MethodOverride {
    #[serde(rename = "_method")]
    method: Option<String>,
}

/// method_override
///
/// HTML forms only send GET and POST. A POST carrying `?_method=PUT`,
/// `PATCH` or `DELETE` is rewritten to that method before routing.
pub fn method_override(mut request: Request) -> Request {
    if request.method() != Method::POST {
        return request;
    }

    let requested = Query::<MethodOverride>::try_from_uri(request.uri())
        .ok()
        .and_then(|Query(q)| q.method);

    let method = match requested.as_deref().map(str::to_ascii_uppercase).as_deref() {
        Some("PUT") => Method::PUT,
        Some("PATCH") => Method::PATCH,
        Some("DELETE") => Method::DELETE,
        _ => return request,
    };

    tracing::debug!(%method, uri = %request.uri(), "method override");
    *request.method_mut() = method;
    request
}

/// The served application: the router behind the method override, which
/// has to run before routing picks a method.
pub type App = MapRequest<Router, fn(Request) -> Request>;

pub fn create_app(state: AppState) -> App {
    MapRequest::new(create_router(state), method_override as fn(Request) -> Request)
}
