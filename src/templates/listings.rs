use maud::{Markup, html};

use super::{Frame, format_price, page};
use crate::models::{Listing, ListingDetail};

const PLACEHOLDER_IMAGE: &str =
    "https://images.unsplash.com/photo-1505691938895-1758d7feb511?auto=format&fit=crop&w=800&q=60";

fn image_src(listing: &Listing) -> &str {
    listing.image_url.as_deref().unwrap_or(PLACEHOLDER_IMAGE)
}

pub fn index(frame: &Frame<'_>, listings: &[Listing]) -> Markup {
    page(
        "All listings",
        frame,
        html! {
            h2 { "All listings" }
            @if listings.is_empty() {
                p { "No places listed yet." }
            }
            div class="cards" {
                @for listing in listings {
                    a class="card" href=(format!("/listings/{}", listing.id)) {
                        img src=(image_src(listing)) alt=(listing.title);
                        p {
                            strong { (listing.title) }
                            br;
                            "$" (format_price(listing.price)) " / night"
                        }
                    }
                }
            }
        },
    )
}

pub fn show(frame: &Frame<'_>, detail: &ListingDetail) -> Markup {
    let listing = &detail.listing;
    let is_owner = frame
        .current_user
        .is_some_and(|user| listing.is_owned_by(user.id));

    page(
        &listing.title,
        frame,
        html! {
            article class="detail" {
                h2 { (listing.title) }
                img src=(image_src(listing)) alt=(listing.title);
                p { "Owned by " i { (detail.owner.username) } }
                p { (listing.description) }
                p { "$" (format_price(listing.price)) " / night" }
                p { (listing.location) ", " (listing.country) }
            }

            @if is_owner {
                div class="actions" {
                    a class="button" href=(format!("/listings/{}/edit", listing.id)) { "Edit" }
                    form method="post" action=(format!("/listings/{}?_method=DELETE", listing.id)) {
                        button class="secondary" { "Delete" }
                    }
                }
            }

            @if frame.current_user.is_some() {
                hr;
                h3 { "Leave a review" }
                form class="stacked" method="post" action=(format!("/listings/{}/reviews", listing.id)) {
                    label for="rating" { "Rating" }
                    select id="rating" name="review[rating]" {
                        @for stars in 1..=5 {
                            option value=(stars) selected[stars == 5] { (stars) " / 5" }
                        }
                    }
                    label for="comment" { "Comment" }
                    textarea id="comment" name="review[comment]" rows="4" required {}
                    div class="actions" { button { "Submit" } }
                }
            }

            @if !detail.reviews.is_empty() {
                hr;
                h3 { "All reviews" }
                div class="reviews" {
                    @for entry in &detail.reviews {
                        div class="review" {
                            p { strong { "@" (entry.author.username) } }
                            p { (entry.review.rating) " / 5" }
                            p { (entry.review.comment) }
                            @if frame.current_user.is_some_and(|user| user.id == entry.author.id) {
                                form method="post" action=(format!("/listings/{}/reviews/{}?_method=DELETE", listing.id, entry.review.id)) {
                                    button class="secondary" { "Delete" }
                                }
                            }
                        }
                    }
                }
            }
        },
    )
}

fn field<'a>(listing: Option<&'a Listing>, pick: impl Fn(&'a Listing) -> &'a str) -> &'a str {
    listing.map(pick).unwrap_or_default()
}

fn listing_fields(listing: Option<&Listing>) -> Markup {
    let price = listing.map(|l| l.price.to_string()).unwrap_or_default();
    let image = listing
        .and_then(|l| l.image_url.clone())
        .unwrap_or_default();

    html! {
        label for="title" { "Title" }
        input id="title" name="listing[title]" value=(field(listing, |l| &l.title)) required;
        label for="description" { "Description" }
        textarea id="description" name="listing[description]" rows="4" required {
            (field(listing, |l| &l.description))
        }
        label for="image" { "Image URL" }
        input id="image" name="listing[image]" type="url" value=(image);
        label for="price" { "Price per night" }
        input id="price" name="listing[price]" type="number" min="0" value=(price) required;
        label for="country" { "Country" }
        input id="country" name="listing[country]" value=(field(listing, |l| &l.country)) required;
        label for="location" { "Location" }
        input id="location" name="listing[location]" value=(field(listing, |l| &l.location)) required;
    }
}

pub fn new_form(frame: &Frame<'_>) -> Markup {
    page(
        "New listing",
        frame,
        html! {
            h2 { "Create a new listing" }
            form class="stacked" method="post" action="/listings" {
                (listing_fields(None))
                div class="actions" { button { "Add" } }
            }
        },
    )
}

pub fn edit_form(frame: &Frame<'_>, listing: &Listing) -> Markup {
    page(
        "Edit listing",
        frame,
        html! {
            h2 { "Edit your listing" }
            form class="stacked" method="post" action=(format!("/listings/{}?_method=PUT", listing.id)) {
                (listing_fields(Some(listing)))
                div class="actions" { button { "Save" } }
            }
        },
    )
}
