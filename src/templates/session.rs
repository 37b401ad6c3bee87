use maud::{Markup, html};

use super::{Frame, page};

pub fn login_form(frame: &Frame<'_>, dev_sign_in: bool) -> Markup {
    page(
        "Log in",
        frame,
        html! {
            h2 { "Log in" }
            @if dev_sign_in {
                p { "Development sign-in: pick any username. New names get an account on first use." }
                form class="stacked" method="post" action="/login" {
                    label for="username" { "Username" }
                    input id="username" name="username" autocomplete="username" required;
                    div class="actions" { button { "Log in" } }
                }
            } @else {
                p { "Sign in through your identity provider to continue." }
            }
        },
    )
}
