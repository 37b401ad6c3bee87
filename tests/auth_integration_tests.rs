use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::{Method, Request, header, request::Parts},
};
use jsonwebtoken::{EncodingKey, Header, encode};
use stayhub::{
    AppState,
    auth::{AuthUser, Claims, LoginRequired, issue_session_token},
    config::{AppConfig, Env},
    models::User,
    repository::{InMemoryRepository, Repository},
};
use std::sync::Arc;
use uuid::Uuid;

// --- Helpers ---

async fn state_with_user(env: Env) -> (AppState, User) {
    let repo = Arc::new(InMemoryRepository::new());
    let user = repo.create_user("ana", "ana@example.com").await.unwrap();
    let config = AppConfig {
        env,
        ..AppConfig::default()
    };
    (AppState { repo, config }, user)
}

fn parts(method: Method, uri: &str, headers: &[(header::HeaderName, String)]) -> Parts {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(name, value);
    }
    builder.body(()).unwrap().into_parts().0
}

fn session_cookie(token: &str) -> (header::HeaderName, String) {
    (header::COOKIE, format!("session={token}"))
}

fn token_with(sub: Uuid, exp_offset_secs: i64, secret: &str) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub,
        iat: now as usize,
        exp: (now + exp_offset_secs) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

async fn optional_user(parts: &mut Parts, state: &AppState) -> Option<AuthUser> {
    <AuthUser as OptionalFromRequestParts<AppState>>::from_request_parts(parts, state)
        .await
        .unwrap()
}

// --- Tests ---

#[tokio::test]
async fn test_valid_session_cookie_resolves_user() {
    let (state, user) = state_with_user(Env::Local).await;
    let token = issue_session_token(user.id, &state.config).unwrap();
    let mut parts = parts(Method::GET, "/listings", &[session_cookie(&token)]);

    let resolved = optional_user(&mut parts, &state).await.unwrap();
    assert_eq!(resolved.id, user.id);
    assert_eq!(resolved.username, "ana");
}

#[tokio::test]
async fn test_bearer_header_resolves_user() {
    let (state, user) = state_with_user(Env::Production).await;
    let token = issue_session_token(user.id, &state.config).unwrap();
    let mut parts = parts(
        Method::GET,
        "/listings",
        &[(header::AUTHORIZATION, format!("Bearer {token}"))],
    );

    let resolved = optional_user(&mut parts, &state).await.unwrap();
    assert_eq!(resolved.id, user.id);
}

#[tokio::test]
async fn test_expired_token_is_anonymous() {
    let (state, user) = state_with_user(Env::Local).await;
    let token = token_with(user.id, -3600, &state.config.session_secret);
    let mut parts = parts(Method::GET, "/listings", &[session_cookie(&token)]);

    assert_eq!(optional_user(&mut parts, &state).await, None);
}

#[tokio::test]
async fn test_forged_token_is_anonymous() {
    let (state, user) = state_with_user(Env::Local).await;
    let token = token_with(user.id, 3600, "not-the-server-secret");
    let mut parts = parts(Method::GET, "/listings", &[session_cookie(&token)]);

    assert_eq!(optional_user(&mut parts, &state).await, None);
}

#[tokio::test]
async fn test_token_for_unknown_user_is_anonymous() {
    let (state, _) = state_with_user(Env::Local).await;
    let token = issue_session_token(Uuid::new_v4(), &state.config).unwrap();
    let mut parts = parts(Method::GET, "/listings", &[session_cookie(&token)]);

    assert_eq!(optional_user(&mut parts, &state).await, None);
}

#[tokio::test]
async fn test_user_id_header_bypass_is_local_only() {
    let (local, user) = state_with_user(Env::Local).await;
    let header = (header::HeaderName::from_static("x-user-id"), user.id.to_string());

    let mut local_parts = parts(Method::GET, "/listings", &[header.clone()]);
    let resolved = optional_user(&mut local_parts, &local).await.unwrap();
    assert_eq!(resolved.id, user.id);

    let production = AppState {
        config: AppConfig {
            env: Env::Production,
            ..local.config.clone()
        },
        ..local
    };
    let mut production_parts = parts(Method::GET, "/listings", &[header]);
    assert_eq!(optional_user(&mut production_parts, &production).await, None);
}

#[tokio::test]
async fn test_required_user_remembers_get_destination_only() {
    let (state, _) = state_with_user(Env::Local).await;

    let mut get = parts(Method::GET, "/listings/new?from=nav", &[]);
    let rejection = <AuthUser as FromRequestParts<AppState>>::from_request_parts(&mut get, &state)
        .await
        .unwrap_err();
    assert!(matches!(
        rejection,
        LoginRequired::Redirect { return_to: Some(ref path) } if path == "/listings/new?from=nav"
    ));

    let mut post = parts(Method::POST, "/listings", &[]);
    let rejection = <AuthUser as FromRequestParts<AppState>>::from_request_parts(&mut post, &state)
        .await
        .unwrap_err();
    assert!(matches!(
        rejection,
        LoginRequired::Redirect { return_to: None }
    ));
}
