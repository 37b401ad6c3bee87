use axum::{
    body::Body,
    extract::{Request, State},
    http::{self, StatusCode, header},
    middleware::Next,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

use crate::{
    AppState, auth,
    repository::RepoError,
    templates::{self, Frame},
};

/// AppError
///
/// The single error boundary for handlers and extractors. Every variant
/// renders the HTML error page with a matching status; server-side failures
/// are logged and shown to the user only as a generic message.
#[derive(Debug, Error)]
pub enum AppError {
    /// Unknown route or record (404).
    #[error("{0}")]
    NotFound(String),

    /// Payload rejected before reaching the store (400).
    #[error("{0}")]
    Validation(String),

    /// Action not available to this caller (403).
    #[error("{0}")]
    Forbidden(String),

    /// Store failure (500).
    #[error(transparent)]
    Repository(#[from] RepoError),

    /// Anything else that went wrong on our side (500).
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Repository(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "Something went wrong!".to_string()
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
            self.to_string()
        };

        let page = templates::error::error_page(&Frame::default(), status, &message);
        let mut response = (status, Html(page.into_string())).into_response();
        response
            .extensions_mut()
            .insert(ErrorPage { status, message });
        response
    }
}

/// Marks a response rendered from an [`AppError`], so [`with_page_frame`]
/// can render it again with the caller's navbar.
#[derive(Clone, Debug)]
struct ErrorPage {
    status: StatusCode,
    message: String,
}

/// with_page_frame
///
/// Error pages are built inside `IntoResponse`, which has no access to the
/// request. This layer re-renders them with the signed-in user in the navbar.
/// The caller is only resolved for error responses.
pub async fn with_page_frame(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let headers = request.headers().clone();
    let mut response = next.run(request).await;

    let Some(ErrorPage { status, message }) = response.extensions_mut().remove::<ErrorPage>()
    else {
        return response;
    };

    let (mut parts, ()) = http::Request::new(()).into_parts();
    parts.headers = headers;
    let current_user = match auth::resolve_user(&mut parts, &state).await {
        Ok(user) => user,
        Err(err) => {
            tracing::debug!(error = %err, "caller unavailable for error page");
            None
        }
    };
    if current_user.is_none() {
        return response;
    }

    let frame = Frame {
        current_user: current_user.as_ref(),
        flash: None,
    };
    let page = templates::error::error_page(&frame, status, &message);
    response.headers_mut().remove(header::CONTENT_LENGTH);
    *response.body_mut() = Body::from(page.into_string());
    response
}
