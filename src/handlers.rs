use crate::{
    ApiDoc, AppState,
    auth::{self, AuthUser, RETURN_TO_COOKIE},
    config::Env,
    context::PageContext,
    error::AppError,
    flash::{self, FlashMessage},
    guards::{LISTING_MISSING, OwnedListing, REVIEW_MISSING, ReviewAuthor},
    templates,
    validation::{CreateListing, ListingForm, ReviewForm, UpdateListing, Valid},
};
use axum::{
    Form, Json,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Deserialize;
use utoipa::OpenApi;
use uuid::Uuid;

/// Redirect used whenever an id no longer resolves to a listing.
fn listing_missing() -> Response {
    flash::redirect(
        CookieJar::new(),
        FlashMessage::error(LISTING_MISSING),
        "/listings",
    )
}

// --- Listings ---

/// index
///
/// [Public Route] Renders every listing as a card grid.
#[utoipa::path(
    get,
    path = "/listings",
    responses(
        (status = 200, description = "Listing index page"),
        (status = 500, description = "Store failure")
    )
)]
pub async fn index(ctx: PageContext, State(state): State<AppState>) -> Result<Response, AppError> {
    let listings = state.repo.find_listings().await?;
    let page = templates::listings::index(&ctx.frame(), &listings);
    Ok(ctx.render(page))
}

/// new_form
///
/// [Authenticated Route] Renders the creation form.
#[utoipa::path(
    get,
    path = "/listings/new",
    responses(
        (status = 200, description = "Creation form"),
        (status = 303, description = "Not logged in, redirected to /login")
    )
)]
pub async fn new_form(_user: AuthUser, ctx: PageContext) -> Response {
    let page = templates::listings::new_form(&ctx.frame());
    ctx.render(page)
}

/// show
///
/// [Public Route] Renders a listing with its owner and reviews populated.
/// An unknown id redirects to the index with an error notice and nothing
/// else is rendered.
#[utoipa::path(
    get,
    path = "/listings/{id}",
    params(("id" = Uuid, Path, description = "Listing id")),
    responses(
        (status = 200, description = "Listing detail page"),
        (status = 303, description = "Listing does not exist, redirected to /listings")
    )
)]
pub async fn show(
    ctx: PageContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let Some(detail) = state.repo.find_listing_detail(id).await? else {
        return Ok(listing_missing());
    };

    let page = templates::listings::show(&ctx.frame(), &detail);
    Ok(ctx.render(page))
}

/// create
///
/// [Authenticated Route] Persists a new listing owned by the caller. The
/// owner always comes from the session, never from the form.
#[utoipa::path(
    post,
    path = "/listings",
    request_body(content = ListingForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Created, redirected to /listings"),
        (status = 400, description = "Validation failed")
    )
)]
pub async fn create(
    user: AuthUser,
    State(state): State<AppState>,
    Valid(new_listing): Valid<CreateListing>,
) -> Result<Response, AppError> {
    let listing = state.repo.insert_listing(new_listing, user.id).await?;
    tracing::info!(listing_id = %listing.id, owner_id = %user.id, "listing created");

    Ok(flash::redirect(
        CookieJar::new(),
        FlashMessage::success("New Listing Created!"),
        "/listings",
    ))
}

/// edit_form
///
/// [Owner Route] Renders the edit form pre-filled with the listing.
#[utoipa::path(
    get,
    path = "/listings/{id}/edit",
    params(("id" = Uuid, Path, description = "Listing id")),
    responses(
        (status = 200, description = "Edit form"),
        (status = 303, description = "Not logged in, not the owner, or listing missing")
    )
)]
pub async fn edit_form(OwnedListing { listing, .. }: OwnedListing, ctx: PageContext) -> Response {
    let page = templates::listings::edit_form(&ctx.frame(), &listing);
    ctx.render(page)
}

/// update
///
/// [Owner Route] Merges the submitted fields into the listing. Fields left
/// out of the form keep their stored value.
#[utoipa::path(
    put,
    path = "/listings/{id}",
    params(("id" = Uuid, Path, description = "Listing id")),
    request_body(content = ListingForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Updated, redirected to the listing"),
        (status = 400, description = "Validation failed")
    )
)]
pub async fn update(
    OwnedListing { listing, user }: OwnedListing,
    State(state): State<AppState>,
    Valid(patch): Valid<UpdateListing>,
) -> Result<Response, AppError> {
    let Some(updated) = state.repo.update_listing(listing.id, patch).await? else {
        return Ok(listing_missing());
    };
    tracing::info!(listing_id = %updated.id, user_id = %user.id, "listing updated");

    Ok(flash::redirect(
        CookieJar::new(),
        FlashMessage::success("Listing Updated!"),
        &format!("/listings/{}", updated.id),
    ))
}

/// delete
///
/// [Owner Route] Removes the listing together with its reviews.
#[utoipa::path(
    delete,
    path = "/listings/{id}",
    params(("id" = Uuid, Path, description = "Listing id")),
    responses((status = 303, description = "Deleted, redirected to /listings"))
)]
pub async fn delete(
    OwnedListing { listing, user }: OwnedListing,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    if state.repo.delete_listing(listing.id).await?.is_none() {
        return Ok(listing_missing());
    }
    tracing::info!(listing_id = %listing.id, user_id = %user.id, "listing deleted");

    Ok(flash::redirect(
        CookieJar::new(),
        FlashMessage::success("Listing Deleted!"),
        "/listings",
    ))
}

// --- Reviews ---

/// create_review
///
/// [Authenticated Route] Attaches a review by the caller to a listing.
#[utoipa::path(
    post,
    path = "/listings/{id}/reviews",
    params(("id" = Uuid, Path, description = "Listing id")),
    request_body(content = ReviewForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Created, redirected to the listing"),
        (status = 400, description = "Validation failed")
    )
)]
pub async fn create_review(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Valid(new_review): Valid<ReviewForm>,
) -> Result<Response, AppError> {
    if state.repo.find_listing(id).await?.is_none() {
        return Ok(listing_missing());
    }

    let review = state.repo.insert_review(id, user.id, new_review).await?;
    tracing::info!(review_id = %review.id, listing_id = %id, "review created");

    Ok(flash::redirect(
        CookieJar::new(),
        FlashMessage::success("New Review Created!"),
        &format!("/listings/{id}"),
    ))
}

/// delete_review
///
/// [Author Route] Removes one of the caller's reviews.
#[utoipa::path(
    delete,
    path = "/listings/{id}/reviews/{review_id}",
    params(
        ("id" = Uuid, Path, description = "Listing id"),
        ("review_id" = Uuid, Path, description = "Review id")
    ),
    responses((status = 303, description = "Deleted, redirected to the listing"))
)]
pub async fn delete_review(
    ReviewAuthor { review, .. }: ReviewAuthor,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let listing_url = format!("/listings/{}", review.listing_id);
    if !state.repo.delete_review(review.listing_id, review.id).await? {
        return Ok(flash::redirect(
            CookieJar::new(),
            FlashMessage::error(REVIEW_MISSING),
            &listing_url,
        ));
    }
    tracing::info!(review_id = %review.id, listing_id = %review.listing_id, "review deleted");

    Ok(flash::redirect(
        CookieJar::new(),
        FlashMessage::success("Review Deleted!"),
        &listing_url,
    ))
}

// --- Session ---

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LoginForm {
    pub username: String,
}

/// login_form
///
/// [Public Route] Renders the sign-in page.
#[utoipa::path(
    get,
    path = "/login",
    responses((status = 200, description = "Sign-in page"))
)]
pub async fn login_form(ctx: PageContext, State(state): State<AppState>) -> Response {
    let page = templates::session::login_form(&ctx.frame(), state.config.env == Env::Local);
    ctx.render(page)
}

/// Only same-site paths are honoured as a post-login destination. Browsers
/// read both `//host` and `/\host` as another origin.
fn is_local_path(path: &str) -> bool {
    let mut chars = path.chars();
    chars.next() == Some('/') && !matches!(chars.next(), Some('/' | '\\'))
}

fn return_destination(jar: &CookieJar) -> String {
    jar.get(RETURN_TO_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|path| is_local_path(path))
        .unwrap_or_else(|| "/listings".to_string())
}

/// login
///
/// [Public Route] Development sign-in by username (Local only). The first
/// sign-in creates the account. Issues the session cookie and returns the
/// caller to the page that asked them to log in.
#[utoipa::path(
    post,
    path = "/login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Signed in, redirected"),
        (status = 400, description = "Blank username"),
        (status = 403, description = "Production: sign-in is handled by the identity provider")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    if state.config.env != Env::Local {
        return Err(AppError::Forbidden(
            "Sign-in is handled by the identity provider".to_string(),
        ));
    }

    let username = form.username.trim();
    if username.is_empty() {
        return Err(AppError::Validation(
            "\"username\" is not allowed to be empty".to_string(),
        ));
    }

    let user = state
        .repo
        .find_or_create_user(username, &format!("{username}@stayhub.local"))
        .await?;

    let token = auth::issue_session_token(user.id, &state.config)?;
    let destination = return_destination(&jar);
    let jar = jar
        .remove(Cookie::build(RETURN_TO_COOKIE).path("/"))
        .add(auth::session_cookie(token, &state.config));

    tracing::info!(user_id = %user.id, username = %user.username, "user signed in");
    Ok(flash::redirect(
        jar,
        FlashMessage::success("Welcome back!"),
        &destination,
    ))
}

/// logout
///
/// [Public Route] Ends the session.
#[utoipa::path(
    get,
    path = "/logout",
    responses((status = 303, description = "Signed out, redirected to /listings"))
)]
pub async fn logout(jar: CookieJar) -> Response {
    flash::redirect(
        auth::clear_session(jar),
        FlashMessage::success("You are logged out!"),
        "/listings",
    )
}

// --- Misc ---

pub async fn root() -> Redirect {
    Redirect::to("/listings")
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

/// Catch-all for unknown paths.
pub async fn fallback() -> AppError {
    AppError::NotFound("Page Not Found!".to_string())
}

#[cfg(test)]
mod tests {
    use super::is_local_path;

    #[test]
    fn only_same_origin_paths_are_local() {
        assert!(is_local_path("/listings/new"));
        assert!(is_local_path("/"));
        assert!(!is_local_path("//evil.example"));
        assert!(!is_local_path("/\\evil.example"));
        assert!(!is_local_path("https://evil.example"));
        assert!(!is_local_path(""));
    }
}
