use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// A marketplace member as stored in the `users` table. Listings and reviews
/// reference users by `id`; the username is what pages display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, FromRow, Default)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

/// Listing
///
/// A rentable property record from the `listings` table.
/// `owner_id` is set from the authenticated user at creation time and is never
/// taken from a request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, FromRow, Default)]
pub struct Listing {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    // Whole currency units.
    pub price: i64,
    pub location: String,
    pub country: String,
    // FK to users.id (Owner).
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Listing {
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id
    }
}

/// Review
///
/// A rating and comment left on a listing. Rows are removed together with
/// their listing (`ON DELETE CASCADE`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, FromRow, Default)]
pub struct Review {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub author_id: Uuid,
    pub rating: i16,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

// --- Populated Views ---

/// ReviewDetail
///
/// A review with its author resolved.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ReviewDetail {
    pub review: Review,
    pub author: User,
}

/// ListingDetail
///
/// The fully populated listing used by the detail page: owner plus every
/// review with its author, oldest review first.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ListingDetail {
    pub listing: Listing,
    pub owner: User,
    pub reviews: Vec<ReviewDetail>,
}

// --- Write Payloads (validated) ---

/// NewListing
///
/// A validated creation payload. It has no owner field; the
/// repository receives the owner separately.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewListing {
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub price: i64,
    pub location: String,
    pub country: String,
}

/// ListingPatch
///
/// Partial update for an existing listing (PUT /listings/{id}).
/// `None` leaves the stored value untouched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListingPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub price: Option<i64>,
    pub location: Option<String>,
    pub country: Option<String>,
}

impl ListingPatch {
    pub fn is_empty(&self) -> bool {
        *self == ListingPatch::default()
    }

    /// Merges the present fields into `listing`, bumping `updated_at`.
    pub fn apply_to(self, listing: &mut Listing) {
        if let Some(title) = self.title {
            listing.title = title;
        }
        if let Some(description) = self.description {
            listing.description = description;
        }
        if let Some(image_url) = self.image_url {
            listing.image_url = Some(image_url);
        }
        if let Some(price) = self.price {
            listing.price = price;
        }
        if let Some(location) = self.location {
            listing.location = location;
        }
        if let Some(country) = self.country {
            listing.country = country;
        }
        listing.updated_at = Utc::now();
    }
}

/// NewReview
///
/// Validated review payload; the author comes from the session.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewReview {
    pub rating: i16,
    pub comment: String,
}
