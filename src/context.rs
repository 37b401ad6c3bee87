use axum::{
    extract::{FromRef, FromRequestParts, OptionalFromRequestParts},
    http::request::Parts,
    response::{Html, IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use maud::Markup;

use crate::{
    auth::AuthUser,
    config::AppConfig,
    error::AppError,
    flash::{self, FlashMessage},
    repository::RepositoryState,
    templates::Frame,
};

/// PageContext
///
/// Everything a rendered page needs besides its own data: the caller (if
/// signed in) and the pending flash message. Rendering through
/// [`PageContext::render`] clears the flash cookie, so a notice is shown on
/// exactly one page.
pub struct PageContext {
    pub current_user: Option<AuthUser>,
    pub flash: Option<FlashMessage>,
    jar: CookieJar,
}

impl PageContext {
    pub fn frame(&self) -> Frame<'_> {
        Frame {
            current_user: self.current_user.as_ref(),
            flash: self.flash.as_ref(),
        }
    }

    pub fn render(self, page: Markup) -> Response {
        let jar = if self.jar.get(flash::FLASH_COOKIE).is_some() {
            flash::consume(self.jar)
        } else {
            self.jar
        };
        (jar, Html(page.into_string())).into_response()
    }
}

impl<S> FromRequestParts<S> for PageContext
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let current_user =
            <AuthUser as OptionalFromRequestParts<S>>::from_request_parts(parts, state).await?;
        let jar = CookieJar::from_headers(&parts.headers);
        let flash = FlashMessage::from_jar(&jar);

        Ok(Self {
            current_user,
            flash,
            jar,
        })
    }
}
