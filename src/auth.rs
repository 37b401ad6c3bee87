use axum::{
    extract::{FromRef, FromRequestParts, OptionalFromRequestParts},
    http::{Method, header, request::Parts},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::AppError,
    flash::{self, FlashMessage},
    models::User,
    repository::RepositoryState,
};

pub const SESSION_COOKIE: &str = "session";
pub const RETURN_TO_COOKIE: &str = "return_to";

/// Claims
///
/// Payload of a session token. The token is signed with the configured
/// session secret and validated on every request that needs an identity.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user's id.
    pub sub: Uuid,
    /// Expiration time (seconds since the epoch).
    pub exp: usize,
    /// Issued at (seconds since the epoch).
    pub iat: usize,
}

/// AuthUser
///
/// The resolved identity of the caller. Handlers receive it explicitly as an
/// extractor argument; there is no ambient "current user".
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
}

impl From<User> for AuthUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
        }
    }
}

/// Signs a session token for `user_id`, valid for the configured TTL.
pub fn issue_session_token(user_id: Uuid, config: &AppConfig) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id,
        iat: now.timestamp() as usize,
        exp: (now + Duration::hours(config.session_ttl_hours)).timestamp() as usize,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.session_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("failed to sign session token: {e}")))
}

/// Builds the `session` cookie carrying `token`.
pub fn session_cookie(token: String, config: &AppConfig) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.env == Env::Production)
        .max_age(time::Duration::hours(config.session_ttl_hours))
        .build()
}

pub fn clear_session(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}

fn decode_session_token(token: &str, config: &AppConfig) -> Option<Uuid> {
    let key = DecodingKey::from_secret(config.session_secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    match decode::<Claims>(token, &key, &validation) {
        Ok(data) => Some(data.claims.sub),
        Err(e) => {
            tracing::debug!(error = %e, "rejected session token");
            None
        }
    }
}

/// Finds the session token: `Authorization: Bearer` first, then the cookie.
fn session_token(parts: &Parts) -> Option<String> {
    let bearer = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string);

    bearer.or_else(|| {
        CookieJar::from_headers(&parts.headers)
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_string())
    })
}

/// Per-request cache so guards and the page context resolve the caller once.
#[derive(Clone)]
struct ResolvedUser(Option<AuthUser>);

/// resolve_user
///
/// Determines who is calling:
/// 1. Local only: a known user id in the `x-user-id` header.
/// 2. A valid, unexpired session token (bearer header or `session` cookie).
/// 3. The token's subject must still exist in the store.
///
/// Anything that fails along the way means "anonymous"; only store errors
/// are reported as errors.
pub async fn resolve_user<S>(parts: &mut Parts, state: &S) -> Result<Option<AuthUser>, AppError>
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    if let Some(ResolvedUser(cached)) = parts.extensions.get::<ResolvedUser>() {
        return Ok(cached.clone());
    }

    let repo = RepositoryState::from_ref(state);
    let config = AppConfig::from_ref(state);

    let mut user_id = None;

    if config.env == Env::Local {
        user_id = parts
            .headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value).ok());
    }

    if user_id.is_none() {
        user_id = session_token(parts).and_then(|token| decode_session_token(&token, &config));
    }

    let user = match user_id {
        Some(id) => repo.get_user(id).await?.map(AuthUser::from),
        None => None,
    };

    parts.extensions.insert(ResolvedUser(user.clone()));
    Ok(user)
}

/// LoginRequired
///
/// Rejection for guarded routes reached without a session: queue an error
/// notice, remember where the visitor was headed (GET only), and send them to
/// the sign-in page.
#[derive(Debug)]
pub enum LoginRequired {
    Redirect { return_to: Option<String> },
    Failed(AppError),
}

impl IntoResponse for LoginRequired {
    fn into_response(self) -> Response {
        match self {
            LoginRequired::Redirect { return_to } => {
                let mut jar = CookieJar::new();
                if let Some(path) = return_to {
                    jar = jar.add(
                        Cookie::build((RETURN_TO_COOKIE, path))
                            .path("/")
                            .http_only(true)
                            .same_site(SameSite::Lax)
                            .build(),
                    );
                }
                flash::redirect(
                    jar,
                    FlashMessage::error("You must be logged in first!"),
                    "/login",
                )
            }
            LoginRequired::Failed(err) => err.into_response(),
        }
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = LoginRequired;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match resolve_user(parts, state).await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => {
                let return_to = (parts.method == Method::GET).then(|| {
                    parts
                        .uri
                        .path_and_query()
                        .map(|pq| pq.as_str().to_string())
                        .unwrap_or_else(|| parts.uri.path().to_string())
                });
                Err(LoginRequired::Redirect { return_to })
            }
            Err(err) => Err(LoginRequired::Failed(err)),
        }
    }
}

impl<S> OptionalFromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        resolve_user(parts, state).await
    }
}
