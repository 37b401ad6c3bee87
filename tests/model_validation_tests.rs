use chrono::{Duration, Utc};
use stayhub::{
    models::{Listing, ListingPatch},
    validation::{ListingForm, ReviewForm, UpdateListing, Validate},
};
use uuid::Uuid;

fn stored_cabin(owner_id: Uuid) -> Listing {
    let created = Utc::now() - Duration::days(1);
    Listing {
        id: Uuid::new_v4(),
        title: "Cabin".to_string(),
        description: "d".to_string(),
        image_url: Some("https://example.com/cabin.jpg".to_string()),
        price: 100,
        location: "L".to_string(),
        country: "C".to_string(),
        owner_id,
        created_at: created,
        updated_at: created,
    }
}

#[test]
fn test_patch_keeps_absent_fields_and_bumps_updated_at() {
    let owner = Uuid::new_v4();
    let mut listing = stored_cabin(owner);
    let before = listing.clone();

    ListingPatch {
        title: Some("Lake cabin".to_string()),
        ..ListingPatch::default()
    }
    .apply_to(&mut listing);

    assert_eq!(listing.title, "Lake cabin");
    assert_eq!(listing.description, before.description);
    assert_eq!(listing.image_url, before.image_url);
    assert_eq!(listing.price, before.price);
    assert_eq!(listing.owner_id, owner);
    assert_eq!(listing.created_at, before.created_at);
    assert!(listing.updated_at > before.updated_at);
}

#[test]
fn test_blank_image_on_update_keeps_stored_image() {
    let mut listing = stored_cabin(Uuid::new_v4());
    let form = ListingForm {
        image: Some("".to_string()),
        price: Some("80".to_string()),
        ..ListingForm::default()
    };

    UpdateListing(form).validate().unwrap().apply_to(&mut listing);

    assert_eq!(listing.price, 80);
    assert_eq!(
        listing.image_url.as_deref(),
        Some("https://example.com/cabin.jpg")
    );
}

#[test]
fn test_update_with_only_blank_image_is_rejected() {
    let form = ListingForm {
        image: Some("  ".to_string()),
        ..ListingForm::default()
    };
    let err = UpdateListing(form).validate().unwrap_err();
    assert_eq!(err.to_string(), "\"listing\" is required");
}

#[test]
fn test_ownership_is_by_id() {
    let owner = Uuid::new_v4();
    let listing = stored_cabin(owner);

    assert!(listing.is_owned_by(owner));
    assert!(!listing.is_owned_by(Uuid::new_v4()));
}

#[test]
fn test_review_requires_both_fields() {
    let err = ReviewForm {
        rating: Some("4".to_string()),
        comment: None,
    }
    .validate()
    .unwrap_err();
    assert_eq!(err.to_string(), "\"review.comment\" is required");

    let err = ReviewForm::default().validate().unwrap_err();
    assert_eq!(err.to_string(), "\"review\" is required");
}
