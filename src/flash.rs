//! One-shot user notices carried across a redirect.
//!
//! A handler that redirects stores a [`FlashMessage`] in the `flash` cookie;
//! the next rendered page reads it through `PageContext` and removes the
//! cookie in the same response, so each message is displayed exactly once.

use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};

pub const FLASH_COOKIE: &str = "flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Error,
}

impl FlashLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            FlashLevel::Success => "success",
            FlashLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: FlashLevel,
    pub message: String,
}

impl FlashMessage {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Error,
            message: message.into(),
        }
    }

    /// Cookie values may not hold spaces or quotes, so the JSON form is
    /// base64url encoded.
    fn encode(&self) -> String {
        // Serializing a plain struct of strings cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    fn decode(raw: &str) -> Option<Self> {
        let bytes = URL_SAFE_NO_PAD.decode(raw).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    pub fn into_cookie(self) -> Cookie<'static> {
        Cookie::build((FLASH_COOKIE, self.encode()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .build()
    }

    /// Reads the pending message, ignoring anything that fails to decode.
    pub fn from_jar(jar: &CookieJar) -> Option<Self> {
        jar.get(FLASH_COOKIE).and_then(|c| Self::decode(c.value()))
    }
}

/// Drops the flash cookie from the client.
pub fn consume(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(FLASH_COOKIE).path("/"))
}

/// Redirects to `to` with `flash` queued for the next page.
pub fn redirect(jar: CookieJar, flash: FlashMessage, to: &str) -> Response {
    (jar.add(flash.into_cookie()), Redirect::to(to)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_value_survives_spaces_and_punctuation() {
        let flash = FlashMessage::error("Listing you requested for does not exist!");
        let cookie = flash.clone().into_cookie();

        assert!(!cookie.value().contains(' '));
        assert_eq!(FlashMessage::decode(cookie.value()), Some(flash));
    }

    #[test]
    fn garbage_cookie_is_ignored() {
        let jar = CookieJar::new().add(Cookie::new(FLASH_COOKIE, "not-base64-json!"));
        assert_eq!(FlashMessage::from_jar(&jar), None);
    }
}
