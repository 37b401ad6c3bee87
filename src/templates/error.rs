use axum::http::StatusCode;
use maud::{Markup, html};

use super::{Frame, page};

/// Error page shown for every failed request.
pub fn error_page(frame: &Frame<'_>, status: StatusCode, message: &str) -> Markup {
    let title = status.canonical_reason().unwrap_or("Error");

    page(
        title,
        frame,
        html! {
            div class="flash error" role="alert" {
                h2 { (status.as_u16()) " " (title) }
                p { (message) }
            }
            a class="button" href="/listings" { "Back to listings" }
        },
    )
}
