use crate::models::{
    Listing, ListingDetail, ListingPatch, NewListing, NewReview, Review, ReviewDetail, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

/// RepoError
///
/// Failures surfaced by a store. Handlers never inspect these; they travel
/// through `AppError` to the generic error page.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A row referenced by another row is gone (e.g. a listing whose owner
    /// was deleted out from under it).
    #[error("dangling reference: {0}")]
    Dangling(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository Trait
///
/// The document-store contract the listing router is written against.
/// Lookups return `Ok(None)` for a missing record; `Err` is reserved for the
/// store itself failing.
///
/// **Send + Sync + async_trait** keep `Arc<dyn Repository>` usable across
/// Axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Listings ---
    /// All listings, oldest first.
    async fn find_listings(&self) -> RepoResult<Vec<Listing>>;
    async fn find_listing(&self, id: Uuid) -> RepoResult<Option<Listing>>;
    /// Listing with owner, reviews and review authors populated.
    async fn find_listing_detail(&self, id: Uuid) -> RepoResult<Option<ListingDetail>>;
    async fn insert_listing(&self, listing: NewListing, owner_id: Uuid) -> RepoResult<Listing>;
    /// Merges `patch` into the stored listing. Returns the updated record.
    async fn update_listing(&self, id: Uuid, patch: ListingPatch) -> RepoResult<Option<Listing>>;
    /// Removes the listing and its reviews. Returns the removed record.
    async fn delete_listing(&self, id: Uuid) -> RepoResult<Option<Listing>>;

    // --- Reviews ---
    async fn find_review(&self, id: Uuid) -> RepoResult<Option<Review>>;
    async fn insert_review(
        &self,
        listing_id: Uuid,
        author_id: Uuid,
        review: NewReview,
    ) -> RepoResult<Review>;
    async fn delete_review(&self, listing_id: Uuid, review_id: Uuid) -> RepoResult<bool>;

    // --- Users ---
    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>>;
    async fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>>;
    async fn create_user(&self, username: &str, email: &str) -> RepoResult<User>;
    /// Returns the user called `username`, registering it with `email` first
    /// if it does not exist yet. Concurrent calls for one name yield one user.
    async fn find_or_create_user(&self, username: &str, email: &str) -> RepoResult<User>;
}

/// RepositoryState
///
/// The concrete type used to share the store across the application state.
pub type RepositoryState = Arc<dyn Repository>;

// --- Postgres ---

/// PostgresRepository
///
/// The production store, backed by PostgreSQL through an sqlx pool.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded migrations under `./migrations`.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

const LISTING_COLUMNS: &str = "id, title, description, image_url, price, location, country, \
                               owner_id, created_at, updated_at";

/// Review joined with its author in a single row.
#[derive(FromRow)]
struct ReviewRow {
    id: Uuid,
    listing_id: Uuid,
    author_id: Uuid,
    rating: i16,
    comment: String,
    created_at: DateTime<Utc>,
    author_username: String,
    author_email: String,
}

impl From<ReviewRow> for ReviewDetail {
    fn from(row: ReviewRow) -> Self {
        ReviewDetail {
            author: User {
                id: row.author_id,
                username: row.author_username,
                email: row.author_email,
            },
            review: Review {
                id: row.id,
                listing_id: row.listing_id,
                author_id: row.author_id,
                rating: row.rating,
                comment: row.comment,
                created_at: row.created_at,
            },
        }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn find_listings(&self) -> RepoResult<Vec<Listing>> {
        let query = format!("SELECT {LISTING_COLUMNS} FROM listings ORDER BY created_at ASC");
        let listings = sqlx::query_as::<_, Listing>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(listings)
    }

    async fn find_listing(&self, id: Uuid) -> RepoResult<Option<Listing>> {
        let query = format!("SELECT {LISTING_COLUMNS} FROM listings WHERE id = $1");
        let listing = sqlx::query_as::<_, Listing>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(listing)
    }

    /// find_listing_detail
    ///
    /// Populates the owner and the reviews (each joined with its author) in
    /// two follow-up queries once the listing is known to exist.
    async fn find_listing_detail(&self, id: Uuid) -> RepoResult<Option<ListingDetail>> {
        let Some(listing) = self.find_listing(id).await? else {
            return Ok(None);
        };

        let owner = self.get_user(listing.owner_id).await?.ok_or_else(|| {
            RepoError::Dangling(format!("owner {} of listing {}", listing.owner_id, listing.id))
        })?;

        let reviews = sqlx::query_as::<_, ReviewRow>(
            r#"
            SELECT r.id, r.listing_id, r.author_id, r.rating, r.comment, r.created_at,
                   u.username AS author_username, u.email AS author_email
            FROM reviews r
            JOIN users u ON r.author_id = u.id
            WHERE r.listing_id = $1
            ORDER BY r.created_at ASC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(ReviewDetail::from)
        .collect();

        Ok(Some(ListingDetail {
            listing,
            owner,
            reviews,
        }))
    }

    async fn insert_listing(&self, listing: NewListing, owner_id: Uuid) -> RepoResult<Listing> {
        let query = format!(
            "INSERT INTO listings (id, title, description, image_url, price, location, country, \
             owner_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW(), NOW()) \
             RETURNING {LISTING_COLUMNS}"
        );
        let created = sqlx::query_as::<_, Listing>(&query)
            .bind(Uuid::new_v4())
            .bind(listing.title)
            .bind(listing.description)
            .bind(listing.image_url)
            .bind(listing.price)
            .bind(listing.location)
            .bind(listing.country)
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    /// update_listing
    ///
    /// `COALESCE` keeps every column whose patch field is `None`.
    async fn update_listing(&self, id: Uuid, patch: ListingPatch) -> RepoResult<Option<Listing>> {
        let query = format!(
            "UPDATE listings \
             SET title = COALESCE($2, title), \
                 description = COALESCE($3, description), \
                 image_url = COALESCE($4, image_url), \
                 price = COALESCE($5, price), \
                 location = COALESCE($6, location), \
                 country = COALESCE($7, country), \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {LISTING_COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Listing>(&query)
            .bind(id)
            .bind(patch.title)
            .bind(patch.description)
            .bind(patch.image_url)
            .bind(patch.price)
            .bind(patch.location)
            .bind(patch.country)
            .fetch_optional(&self.pool)
            .await?;
        Ok(updated)
    }

    async fn delete_listing(&self, id: Uuid) -> RepoResult<Option<Listing>> {
        // Reviews follow through the ON DELETE CASCADE foreign key.
        let query = format!("DELETE FROM listings WHERE id = $1 RETURNING {LISTING_COLUMNS}");
        let deleted = sqlx::query_as::<_, Listing>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(deleted)
    }

    async fn find_review(&self, id: Uuid) -> RepoResult<Option<Review>> {
        let review = sqlx::query_as::<_, Review>(
            "SELECT id, listing_id, author_id, rating, comment, created_at FROM reviews WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(review)
    }

    async fn insert_review(
        &self,
        listing_id: Uuid,
        author_id: Uuid,
        review: NewReview,
    ) -> RepoResult<Review> {
        let created = sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (id, listing_id, author_id, rating, comment, created_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            RETURNING id, listing_id, author_id, rating, comment, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(listing_id)
        .bind(author_id)
        .bind(review.rating)
        .bind(review.comment)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn delete_review(&self, listing_id: Uuid, review_id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1 AND listing_id = $2")
            .bind(review_id)
            .bind(listing_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT id, username, email FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let user =
            sqlx::query_as::<_, User>("SELECT id, username, email FROM users WHERE username = $1")
                .bind(username)
                .fetch_optional(&self.pool)
                .await?;
        Ok(user)
    }

    async fn create_user(&self, username: &str, email: &str) -> RepoResult<User> {
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (id, username, email) VALUES ($1, $2, $3) RETURNING id, username, email",
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    /// The no-op `DO UPDATE` makes `RETURNING` yield the existing row when
    /// the `UNIQUE (username)` constraint fires.
    async fn find_or_create_user(&self, username: &str, email: &str) -> RepoResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, email) VALUES ($1, $2, $3)
            ON CONFLICT (username) DO UPDATE SET username = EXCLUDED.username
            RETURNING id, username, email
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }
}

// --- In-Memory ---

#[derive(Default)]
struct MemoryData {
    users: Vec<User>,
    listings: Vec<Listing>,
    reviews: Vec<Review>,
}

/// InMemoryRepository
///
/// A process-local store with the same observable semantics as the Postgres
/// one (insertion order, merge updates, cascading review removal). Used by
/// the test suite and by local runs without `DATABASE_URL`.
#[derive(Default)]
pub struct InMemoryRepository {
    data: RwLock<MemoryData>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn find_listings(&self) -> RepoResult<Vec<Listing>> {
        Ok(self.data.read().await.listings.clone())
    }

    async fn find_listing(&self, id: Uuid) -> RepoResult<Option<Listing>> {
        let data = self.data.read().await;
        Ok(data.listings.iter().find(|l| l.id == id).cloned())
    }

    async fn find_listing_detail(&self, id: Uuid) -> RepoResult<Option<ListingDetail>> {
        let data = self.data.read().await;
        let Some(listing) = data.listings.iter().find(|l| l.id == id).cloned() else {
            return Ok(None);
        };

        let user = |user_id: Uuid| {
            data.users
                .iter()
                .find(|u| u.id == user_id)
                .cloned()
                .ok_or_else(|| RepoError::Dangling(format!("user {user_id}")))
        };

        let owner = user(listing.owner_id)?;
        let reviews = data
            .reviews
            .iter()
            .filter(|r| r.listing_id == id)
            .map(|r| -> RepoResult<ReviewDetail> {
                Ok(ReviewDetail {
                    author: user(r.author_id)?,
                    review: r.clone(),
                })
            })
            .collect::<RepoResult<Vec<_>>>()?;

        Ok(Some(ListingDetail {
            listing,
            owner,
            reviews,
        }))
    }

    async fn insert_listing(&self, listing: NewListing, owner_id: Uuid) -> RepoResult<Listing> {
        let now = Utc::now();
        let created = Listing {
            id: Uuid::new_v4(),
            title: listing.title,
            description: listing.description,
            image_url: listing.image_url,
            price: listing.price,
            location: listing.location,
            country: listing.country,
            owner_id,
            created_at: now,
            updated_at: now,
        };
        self.data.write().await.listings.push(created.clone());
        Ok(created)
    }

    async fn update_listing(&self, id: Uuid, patch: ListingPatch) -> RepoResult<Option<Listing>> {
        let mut data = self.data.write().await;
        Ok(data.listings.iter_mut().find(|l| l.id == id).map(|listing| {
            patch.apply_to(listing);
            listing.clone()
        }))
    }

    async fn delete_listing(&self, id: Uuid) -> RepoResult<Option<Listing>> {
        let mut data = self.data.write().await;
        let Some(pos) = data.listings.iter().position(|l| l.id == id) else {
            return Ok(None);
        };
        let removed = data.listings.remove(pos);
        data.reviews.retain(|r| r.listing_id != id);
        Ok(Some(removed))
    }

    async fn find_review(&self, id: Uuid) -> RepoResult<Option<Review>> {
        let data = self.data.read().await;
        Ok(data.reviews.iter().find(|r| r.id == id).cloned())
    }

    async fn insert_review(
        &self,
        listing_id: Uuid,
        author_id: Uuid,
        review: NewReview,
    ) -> RepoResult<Review> {
        let mut data = self.data.write().await;
        if !data.listings.iter().any(|l| l.id == listing_id) {
            return Err(RepoError::Dangling(format!("listing {listing_id}")));
        }
        let created = Review {
            id: Uuid::new_v4(),
            listing_id,
            author_id,
            rating: review.rating,
            comment: review.comment,
            created_at: Utc::now(),
        };
        data.reviews.push(created.clone());
        Ok(created)
    }

    async fn delete_review(&self, listing_id: Uuid, review_id: Uuid) -> RepoResult<bool> {
        let mut data = self.data.write().await;
        let before = data.reviews.len();
        data.reviews
            .retain(|r| !(r.id == review_id && r.listing_id == listing_id));
        Ok(data.reviews.len() < before)
    }

    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        let data = self.data.read().await;
        Ok(data.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let data = self.data.read().await;
        Ok(data.users.iter().find(|u| u.username == username).cloned())
    }

    async fn create_user(&self, username: &str, email: &str) -> RepoResult<User> {
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
        };
        self.data.write().await.users.push(user.clone());
        Ok(user)
    }

    async fn find_or_create_user(&self, username: &str, email: &str) -> RepoResult<User> {
        let mut data = self.data.write().await;
        if let Some(existing) = data.users.iter().find(|u| u.username == username) {
            return Ok(existing.clone());
        }
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
        };
        data.users.push(user.clone());
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cabin() -> NewListing {
        NewListing {
            title: "Cabin".to_string(),
            description: "d".to_string(),
            image_url: None,
            price: 100,
            location: "L".to_string(),
            country: "C".to_string(),
        }
    }

    #[tokio::test]
    async fn update_merges_only_present_fields() {
        let repo = InMemoryRepository::new();
        let owner = repo.create_user("ana", "ana@example.com").await.unwrap();
        let listing = repo.insert_listing(cabin(), owner.id).await.unwrap();

        let patch = ListingPatch {
            price: Some(250),
            ..ListingPatch::default()
        };
        let updated = repo.update_listing(listing.id, patch).await.unwrap().unwrap();

        assert_eq!(updated.price, 250);
        assert_eq!(updated.title, "Cabin");
        assert_eq!(updated.description, "d");
        assert_eq!(updated.owner_id, owner.id);
    }

    #[tokio::test]
    async fn concurrent_first_sign_ins_share_one_user() {
        let repo = Arc::new(InMemoryRepository::new());

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let repo = repo.clone();
                tokio::spawn(async move {
                    repo.find_or_create_user("ana", "ana@stayhub.local")
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut ids = Vec::new();
        for task in tasks {
            ids.push(task.await.unwrap().id);
        }
        ids.dedup();

        assert_eq!(ids.len(), 1);
        assert_eq!(repo.data.read().await.users.len(), 1);
        assert_eq!(
            repo.find_user_by_username("ana").await.unwrap().map(|u| u.id),
            Some(ids[0])
        );
    }

    #[tokio::test]
    async fn delete_cascades_to_reviews() {
        let repo = InMemoryRepository::new();
        let owner = repo.create_user("ana", "ana@example.com").await.unwrap();
        let guest = repo.create_user("ben", "ben@example.com").await.unwrap();
        let listing = repo.insert_listing(cabin(), owner.id).await.unwrap();
        let review = repo
            .insert_review(
                listing.id,
                guest.id,
                NewReview {
                    rating: 4,
                    comment: "Cosy".to_string(),
                },
            )
            .await
            .unwrap();

        assert!(repo.delete_listing(listing.id).await.unwrap().is_some());
        assert!(repo.find_review(review.id).await.unwrap().is_none());
        assert!(repo.find_listing_detail(listing.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn detail_populates_owner_and_review_authors() {
        let repo = InMemoryRepository::new();
        let owner = repo.create_user("ana", "ana@example.com").await.unwrap();
        let guest = repo.create_user("ben", "ben@example.com").await.unwrap();
        let listing = repo.insert_listing(cabin(), owner.id).await.unwrap();
        repo.insert_review(
            listing.id,
            guest.id,
            NewReview {
                rating: 5,
                comment: "Great".to_string(),
            },
        )
        .await
        .unwrap();

        let detail = repo.find_listing_detail(listing.id).await.unwrap().unwrap();
        assert_eq!(detail.owner, owner);
        assert_eq!(detail.reviews.len(), 1);
        assert_eq!(detail.reviews[0].author, guest);
    }
}
