//! Authorization guards for routes that act on an existing record.
//!
//! Each guard is an extractor that first requires a session (through
//! [`AuthUser`]) and then loads the target record and checks that the caller
//! may act on it. Handlers that take a guard never run for anyone else.

use axum::{
    extract::{FromRef, FromRequestParts, Path, rejection::PathRejection},
    http::request::Parts,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use uuid::Uuid;

use crate::{
    auth::{AuthUser, LoginRequired},
    config::AppConfig,
    error::AppError,
    flash::{self, FlashMessage},
    models::{Listing, Review},
    repository::{RepoError, RepositoryState},
};

pub const LISTING_MISSING: &str = "Listing you requested for does not exist!";
pub const REVIEW_MISSING: &str = "Review you requested for does not exist!";
pub const NOT_OWNER: &str = "You are not the owner of this listing";
pub const NOT_AUTHOR: &str = "You are not the author of this review";

/// GuardRejection
///
/// Short-circuit response of a guard. Denials are user-facing: they queue an
/// error notice and redirect instead of rendering an error page.
#[derive(Debug)]
pub enum GuardRejection {
    Login(LoginRequired),
    Malformed(PathRejection),
    Denied { message: &'static str, to: String },
    Failed(AppError),
}

impl GuardRejection {
    fn denied(message: &'static str, to: impl Into<String>) -> Self {
        Self::Denied {
            message,
            to: to.into(),
        }
    }
}

impl From<LoginRequired> for GuardRejection {
    fn from(rejection: LoginRequired) -> Self {
        Self::Login(rejection)
    }
}

impl From<PathRejection> for GuardRejection {
    fn from(rejection: PathRejection) -> Self {
        Self::Malformed(rejection)
    }
}

impl From<RepoError> for GuardRejection {
    fn from(err: RepoError) -> Self {
        Self::Failed(err.into())
    }
}

impl IntoResponse for GuardRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Login(rejection) => rejection.into_response(),
            Self::Malformed(rejection) => AppError::Validation(rejection.body_text()).into_response(),
            Self::Denied { message, to } => {
                tracing::debug!(%message, %to, "guard denied request");
                flash::redirect(CookieJar::new(), FlashMessage::error(message), &to)
            }
            Self::Failed(err) => err.into_response(),
        }
    }
}

/// OwnedListing
///
/// The listing addressed by `/listings/{id}`, loaded for its owner. Anyone
/// else is sent back to the listing with an error notice; an unknown id
/// sends the caller to the index.
pub struct OwnedListing {
    pub user: AuthUser,
    pub listing: Listing,
}

impl<S> FromRequestParts<S> for OwnedListing
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = GuardRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = <AuthUser as FromRequestParts<S>>::from_request_parts(parts, state).await?;
        let Path(id) = <Path<Uuid> as FromRequestParts<S>>::from_request_parts(parts, state).await?;

        let repo = RepositoryState::from_ref(state);
        let Some(listing) = repo.find_listing(id).await? else {
            return Err(GuardRejection::denied(LISTING_MISSING, "/listings"));
        };

        if !listing.is_owned_by(user.id) {
            return Err(GuardRejection::denied(NOT_OWNER, format!("/listings/{id}")));
        }

        Ok(Self { user, listing })
    }
}

/// ReviewAuthor
///
/// The review addressed by `/listings/{id}/reviews/{review_id}`, loaded for
/// its author. The review must belong to that listing.
pub struct ReviewAuthor {
    pub user: AuthUser,
    pub review: Review,
}

impl<S> FromRequestParts<S> for ReviewAuthor
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = GuardRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = <AuthUser as FromRequestParts<S>>::from_request_parts(parts, state).await?;
        let Path((listing_id, review_id)) =
            <Path<(Uuid, Uuid)> as FromRequestParts<S>>::from_request_parts(parts, state).await?;

        let repo = RepositoryState::from_ref(state);
        let review = repo
            .find_review(review_id)
            .await?
            .filter(|review| review.listing_id == listing_id);
        let Some(review) = review else {
            return Err(GuardRejection::denied(
                REVIEW_MISSING,
                format!("/listings/{listing_id}"),
            ));
        };

        if review.author_id != user.id {
            return Err(GuardRejection::denied(
                NOT_AUTHOR,
                format!("/listings/{listing_id}"),
            ));
        }

        Ok(Self { user, review })
    }
}
