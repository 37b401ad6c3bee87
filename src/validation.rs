//! Payload validation for the HTML forms.
//!
//! Forms post nested field names (`listing[title]`, `review[rating]`) as
//! `application/x-www-form-urlencoded`. The [`Valid`] extractor decodes the
//! form, runs its [`Validate`] rules and rejects the request with a 400 page
//! before the handler runs.

use axum::{
    Form,
    extract::{FromRequest, Request},
};
use serde::{Deserialize, de::DeserializeOwned};
use thiserror::Error;
use utoipa::ToSchema;

use crate::{
    error::AppError,
    models::{ListingPatch, NewListing, NewReview},
};

/// Every rule a payload broke, in field order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", .0.join(", "))]
pub struct ValidationError(pub Vec<String>);

pub trait Validate {
    type Output;

    fn validate(self) -> Result<Self::Output, ValidationError>;
}

/// Valid
///
/// Extractor yielding the validated output of form `T`.
pub struct Valid<T: Validate>(pub T::Output);

impl<S, T> FromRequest<S> for Valid<T>
where
    S: Send + Sync,
    T: Validate + DeserializeOwned + Send,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Form(form) = Form::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::Validation(rejection.body_text()))?;

        form.validate()
            .map(Valid)
            .map_err(|e| AppError::Validation(e.to_string()))
    }
}

// --- Field rules ---

struct Checker {
    errors: Vec<String>,
}

impl Checker {
    fn new() -> Self {
        Self { errors: Vec::new() }
    }

    fn fail(&mut self, field: &str, rule: &str) {
        self.errors.push(format!("\"{field}\" {rule}"));
    }

    /// Present text must not be blank. Leading and trailing whitespace is dropped.
    fn text(&mut self, field: &str, value: Option<String>) -> Option<String> {
        let value = value?.trim().to_string();
        if value.is_empty() {
            self.fail(field, "is not allowed to be empty");
            return None;
        }
        Some(value)
    }

    fn required_text(&mut self, field: &str, value: Option<String>) -> Option<String> {
        if value.is_none() {
            self.fail(field, "is required");
            return None;
        }
        self.text(field, value)
    }

    fn integer(&mut self, field: &str, value: Option<String>, min: i64, max: i64) -> Option<i64> {
        let raw = self.text(field, value)?;
        let Ok(number) = raw.parse::<i64>() else {
            self.fail(field, "must be a whole number");
            return None;
        };
        if number < min {
            self.fail(field, &format!("must be greater than or equal to {min}"));
            return None;
        }
        if number > max {
            self.fail(field, &format!("must be less than or equal to {max}"));
            return None;
        }
        Some(number)
    }

    fn required_integer(
        &mut self,
        field: &str,
        value: Option<String>,
        min: i64,
        max: i64,
    ) -> Option<i64> {
        if value.is_none() {
            self.fail(field, "is required");
            return None;
        }
        self.integer(field, value, min, max)
    }

    fn finish<T>(self, output: impl FnOnce() -> Option<T>) -> Result<T, ValidationError> {
        if !self.errors.is_empty() {
            return Err(ValidationError(self.errors));
        }
        output().ok_or_else(|| ValidationError(vec!["payload is incomplete".to_string()]))
    }
}

/// A blank image field means "no image".
fn image(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// --- Listing forms ---

/// ListingForm
///
/// Raw listing fields as posted by the new and edit forms.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ListingForm {
    #[serde(rename = "listing[title]")]
    pub title: Option<String>,
    #[serde(rename = "listing[description]")]
    pub description: Option<String>,
    #[serde(rename = "listing[image]")]
    pub image: Option<String>,
    #[serde(rename = "listing[price]")]
    pub price: Option<String>,
    #[serde(rename = "listing[location]")]
    pub location: Option<String>,
    #[serde(rename = "listing[country]")]
    pub country: Option<String>,
}

impl ListingForm {
    fn is_absent(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.image.is_none()
            && self.price.is_none()
            && self.location.is_none()
            && self.country.is_none()
    }
}

fn listing_missing() -> ValidationError {
    ValidationError(vec!["\"listing\" is required".to_string()])
}

/// Creation rules: every field but the image is required.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct CreateListing(pub ListingForm);

impl Validate for CreateListing {
    type Output = NewListing;

    fn validate(self) -> Result<NewListing, ValidationError> {
        let form = self.0;
        if form.is_absent() {
            return Err(listing_missing());
        }

        let mut check = Checker::new();
        let title = check.required_text("listing.title", form.title);
        let description = check.required_text("listing.description", form.description);
        let price = check.required_integer("listing.price", form.price, 0, i64::MAX);
        let location = check.required_text("listing.location", form.location);
        let country = check.required_text("listing.country", form.country);
        let image_url = image(form.image);

        check.finish(|| {
            Some(NewListing {
                title: title?,
                description: description?,
                image_url,
                price: price?,
                location: location?,
                country: country?,
            })
        })
    }
}

/// Update rules: any subset of fields, each checked like on creation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct UpdateListing(pub ListingForm);

impl Validate for UpdateListing {
    type Output = ListingPatch;

    fn validate(self) -> Result<ListingPatch, ValidationError> {
        let form = self.0;
        if form.is_absent() {
            return Err(listing_missing());
        }

        let mut check = Checker::new();
        let patch = ListingPatch {
            title: check.text("listing.title", form.title),
            description: check.text("listing.description", form.description),
            image_url: image(form.image),
            price: check.integer("listing.price", form.price, 0, i64::MAX),
            location: check.text("listing.location", form.location),
            country: check.text("listing.country", form.country),
        };

        let patch = check.finish(|| Some(patch))?;
        if patch.is_empty() {
            return Err(listing_missing());
        }
        Ok(patch)
    }
}

// --- Review form ---

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ReviewForm {
    #[serde(rename = "review[rating]")]
    pub rating: Option<String>,
    #[serde(rename = "review[comment]")]
    pub comment: Option<String>,
}

impl Validate for ReviewForm {
    type Output = NewReview;

    fn validate(self) -> Result<NewReview, ValidationError> {
        if self.rating.is_none() && self.comment.is_none() {
            return Err(ValidationError(vec!["\"review\" is required".to_string()]));
        }

        let mut check = Checker::new();
        let rating = check.required_integer("review.rating", self.rating, 1, 5);
        let comment = check.required_text("review.comment", self.comment);

        check.finish(|| {
            Some(NewReview {
                // Bounded to 1..=5 above.
                rating: rating? as i16,
                comment: comment?,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cabin_form() -> ListingForm {
        ListingForm {
            title: Some("Cabin".into()),
            description: Some("d".into()),
            image: Some("".into()),
            price: Some("100".into()),
            location: Some("L".into()),
            country: Some("C".into()),
        }
    }

    #[test]
    fn complete_listing_passes() {
        let listing = CreateListing(cabin_form()).validate().unwrap();
        assert_eq!(listing.title, "Cabin");
        assert_eq!(listing.price, 100);
        assert_eq!(listing.image_url, None);
    }

    #[test]
    fn missing_and_blank_fields_are_all_reported() {
        let form = ListingForm {
            title: None,
            location: Some("   ".into()),
            ..cabin_form()
        };
        let err = CreateListing(form).validate().unwrap_err();
        assert_eq!(
            err.0,
            vec![
                "\"listing.title\" is required".to_string(),
                "\"listing.location\" is not allowed to be empty".to_string(),
            ]
        );
    }

    #[test]
    fn error_message_joins_every_failed_rule() {
        let form = ListingForm {
            title: None,
            price: Some("cheap".into()),
            ..cabin_form()
        };
        let err = CreateListing(form).validate().unwrap_err();

        let as_error: &dyn std::error::Error = &err;
        assert_eq!(
            as_error.to_string(),
            "\"listing.title\" is required, \"listing.price\" must be a whole number"
        );
    }

    #[test]
    fn negative_or_non_numeric_price_is_rejected() {
        let negative = ListingForm {
            price: Some("-5".into()),
            ..cabin_form()
        };
        let words = ListingForm {
            price: Some("cheap".into()),
            ..cabin_form()
        };

        assert_eq!(
            CreateListing(negative).validate().unwrap_err().to_string(),
            "\"listing.price\" must be greater than or equal to 0"
        );
        assert_eq!(
            CreateListing(words).validate().unwrap_err().to_string(),
            "\"listing.price\" must be a whole number"
        );
    }

    #[test]
    fn empty_body_reports_missing_listing() {
        let err = CreateListing(ListingForm::default()).validate().unwrap_err();
        assert_eq!(err.to_string(), "\"listing\" is required");

        let err = UpdateListing(ListingForm::default()).validate().unwrap_err();
        assert_eq!(err.to_string(), "\"listing\" is required");
    }

    #[test]
    fn update_keeps_absent_fields_unset() {
        let form = ListingForm {
            price: Some("250".into()),
            ..ListingForm::default()
        };
        let patch = UpdateListing(form).validate().unwrap();
        assert_eq!(
            patch,
            ListingPatch {
                price: Some(250),
                ..ListingPatch::default()
            }
        );
    }

    #[test]
    fn review_rating_must_be_between_one_and_five() {
        let form = ReviewForm {
            rating: Some("6".into()),
            comment: Some("Lovely".into()),
        };
        assert_eq!(
            form.validate().unwrap_err().to_string(),
            "\"review.rating\" must be less than or equal to 5"
        );
    }
}
