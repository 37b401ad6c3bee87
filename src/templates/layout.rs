use maud::{DOCTYPE, Markup, PreEscaped, html};

use super::Frame;

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 0; color: #222; }
header { display: flex; align-items: center; justify-content: space-between; padding: 0.75rem 1.5rem; box-shadow: 0 1px 4px rgba(0,0,0,.1); }
header nav a, header .account a { margin-left: 1rem; color: #222; text-decoration: none; }
header .brand { font-weight: 700; color: #fe424d; text-decoration: none; font-size: 1.2rem; }
main { max-width: 960px; margin: 1.5rem auto; padding: 0 1rem; }
.flash { padding: 0.75rem 1rem; border-radius: 6px; margin-bottom: 1rem; }
.flash.success { background: #e6f6ea; color: #1e6b34; }
.flash.error { background: #fdecea; color: #8a1c12; }
.cards { display: grid; grid-template-columns: repeat(auto-fill, minmax(260px, 1fr)); gap: 1.25rem; }
.card { display: block; color: inherit; text-decoration: none; }
.card img, .detail img { width: 100%; height: 18rem; object-fit: cover; border-radius: 12px; background: #eee; }
.card img { height: 14rem; }
form.stacked label { display: block; margin-top: 0.75rem; font-weight: 600; }
form.stacked input, form.stacked textarea, form.stacked select { width: 100%; padding: 0.5rem; box-sizing: border-box; }
.actions { display: flex; gap: 0.75rem; margin: 1rem 0; }
button, .button { background: #fe424d; color: #fff; border: 0; padding: 0.5rem 1rem; border-radius: 6px; text-decoration: none; cursor: pointer; }
.button.secondary, button.secondary { background: #222; }
.reviews { display: grid; grid-template-columns: repeat(auto-fill, minmax(260px, 1fr)); gap: 1rem; }
.review { border: 1px solid #ddd; border-radius: 8px; padding: 0.75rem; }
"#;

fn navbar(frame: &Frame<'_>) -> Markup {
    html! {
        header {
            a class="brand" href="/listings" { "StayHub" }
            nav {
                a href="/listings" { "Explore" }
                a href="/listings/new" { "Add your place" }
            }
            div class="account" {
                @if let Some(user) = frame.current_user {
                    span { "Signed in as " strong { (user.username) } }
                    a href="/logout" { "Log out" }
                } @else {
                    a href="/login" { "Log in" }
                }
            }
        }
    }
}

fn flash_banner(frame: &Frame<'_>) -> Markup {
    html! {
        @if let Some(flash) = frame.flash {
            div class={ "flash " (flash.level.as_str()) } role="alert" { (flash.message) }
        }
    }
}

/// Wraps `content` in the site chrome.
pub fn page(title: &str, frame: &Frame<'_>, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) " | StayHub" }
                style { (PreEscaped(STYLE)) }
            }
            body {
                (navbar(frame))
                main {
                    (flash_banner(frame))
                    (content)
                }
            }
        }
    }
}
