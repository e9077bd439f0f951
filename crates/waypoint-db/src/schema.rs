//! Write-time validation of place documents.
//!
//! Mirrors a document-store schema validator: a place needs a name, a url and
//! a review list; every review needs title, text, month and year. Reviews
//! missing those never reach the table.

use crate::error::{DatabaseError, Result};
use waypoint_core::Place;

/// Reject a document that violates the stored schema.
pub fn validate_place(place: &Place) -> Result<()> {
    let violation = |reason: String| DatabaseError::SchemaViolation {
        key: place.url.clone(),
        reason,
    };

    if place.url.trim().is_empty() {
        return Err(violation("url is empty".to_string()));
    }
    if place.name.trim().is_empty() {
        return Err(violation("name is empty".to_string()));
    }

    for (idx, review) in place.reviews.iter().enumerate() {
        let meta = &review.metadata;
        let missing: Vec<&str> = [
            ("title", meta.title.is_none()),
            ("text", meta.text.is_none()),
            ("month", meta.month.is_none()),
            ("year", meta.year.is_none()),
        ]
        .into_iter()
        .filter_map(|(field, absent)| absent.then_some(field))
        .collect();

        if !missing.is_empty() {
            return Err(violation(format!(
                "review {idx} missing required {}",
                missing.join(", ")
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use waypoint_core::{Mode, Month, Review, ReviewMetadata};

    fn review(title: Option<&str>, year: Option<i32>) -> Review {
        Review {
            metadata: ReviewMetadata {
                rating: Some(40),
                title: title.map(str::to_string),
                text: Some("Lovely view".into()),
                day: None,
                month: Some(Month::Name("March".into())),
                year,
            },
            images: vec![],
        }
    }

    fn place(reviews: Vec<Review>) -> Place {
        Place {
            name: "Tiger Hill".into(),
            url: "https://example.com/tiger-hill".into(),
            page: 1,
            mode: Mode::Todo,
            place_id: None,
            coordinates: None,
            reviews,
        }
    }

    #[test]
    fn test_valid_place() {
        assert!(validate_place(&place(vec![review(Some("Sunrise"), Some(2023))])).is_ok());
        // an empty review list is structurally valid
        assert!(validate_place(&place(vec![])).is_ok());
    }

    #[test]
    fn test_missing_review_fields() {
        let err = validate_place(&place(vec![review(None, None)])).unwrap_err();
        match err {
            DatabaseError::SchemaViolation { key, reason } => {
                assert_eq!(key, "https://example.com/tiger-hill");
                assert_eq!(reason, "review 0 missing required title, year");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut p = place(vec![]);
        p.name = "  ".into();
        assert!(matches!(
            validate_place(&p),
            Err(DatabaseError::SchemaViolation { .. })
        ));
    }
}
