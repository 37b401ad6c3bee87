use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, post, put},
};

/// Authenticated Router Module
///
/// Listing and review mutations. The router is wrapped in the session
/// check, and every handler also takes `AuthUser` (directly or through a
/// guard) so the caller's id is always explicit.
///
/// Paths shared with the public router (`/listings`, `/listings/{id}`) are
/// merged per method, so only the mutating methods land here.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /listings/new
        .route("/listings/new", get(handlers::new_form))
        // POST /listings
        // Owner is taken from the session.
        .route("/listings", post(handlers::create))
        // GET /listings/{id}/edit
        .route("/listings/{id}/edit", get(handlers::edit_form))
        // PUT|DELETE /listings/{id}
        // Owner only (OwnedListing guard).
        .route(
            "/listings/{id}",
            put(handlers::update).delete(handlers::delete),
        )
        // POST /listings/{id}/reviews
        .route("/listings/{id}/reviews", post(handlers::create_review))
        // DELETE /listings/{id}/reviews/{review_id}
        // Author only (ReviewAuthor guard).
        .route(
            "/listings/{id}/reviews/{review_id}",
            delete(handlers::delete_review),
        )
}
