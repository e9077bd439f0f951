//! Shared types used across the waypoint workspace.
//!
//! This module defines the place/review document model that flows from the
//! scraper through the store into the export, plus the search query that
//! drives a run.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Site layout variant of a place detail page.
///
/// The two layouts are structurally different and are scraped by different
/// review extractors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Generic place (hotel, restaurant, landmark) layout
    #[default]
    Place,
    /// "Things to do" attraction layout
    Todo,
}

impl Mode {
    /// Wire name of the mode, as stored and exported.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Place => "place",
            Self::Todo => "todo",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Geodetic coordinates in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude, -90..=90
    pub lat: f64,
    /// Longitude, -180..=180
    pub lng: f64,
}

impl Coordinates {
    /// Create validated coordinates.
    ///
    /// # Errors
    /// Returns error if either component is not finite or out of range.
    pub fn new(lat: f64, lng: f64) -> Result<Self, CoreError> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(CoreError::Validation(format!(
                "latitude must be within -90..=90, got {lat}"
            )));
        }
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(CoreError::Validation(format!(
                "longitude must be within -180..=180, got {lng}"
            )));
        }
        Ok(Self { lat, lng })
    }
}

/// Month of a review date.
///
/// One layout prints month names ("March"), the other prints numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Month {
    /// Numeric month, 1-12
    Number(u32),
    /// Month name as printed on the page
    Name(String),
}

impl Month {
    /// Interpret a scraped token as a month.
    ///
    /// Numeric tokens become `Month::Number`; anything else is kept verbatim.
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        if token.is_empty() {
            return None;
        }
        match token.parse::<u32>() {
            Ok(n) if (1..=12).contains(&n) => Some(Self::Number(n)),
            Ok(_) => None,
            Err(_) => Some(Self::Name(token.to_string())),
        }
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

/// Text and date fields extracted from a single review.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewMetadata {
    /// Rating scaled by ten (45 = 4.5 bubbles)
    pub rating: Option<u32>,
    /// Review headline
    pub title: Option<String>,
    /// Review body with newlines collapsed
    pub text: Option<String>,
    /// Day of month, only printed by the place layout
    pub day: Option<u32>,
    /// Month of the visit or of writing
    pub month: Option<Month>,
    /// Four digit year
    pub year: Option<i32>,
}

impl ReviewMetadata {
    /// A review is clean when title, text, month and year are all present.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.title.is_some() && self.text.is_some() && self.month.is_some() && self.year.is_some()
    }
}

/// A scraped review with its image URLs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Review {
    /// Extracted text fields
    pub metadata: ReviewMetadata,
    /// Image URLs, upgraded to the high-resolution variant
    #[serde(default)]
    pub images: Vec<String>,
}

impl Review {
    /// See [`ReviewMetadata::is_clean`].
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.metadata.is_clean()
    }
}

/// One card of the search result listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingEntry {
    /// Display name of the place
    pub name: String,
    /// Absolute detail page URL
    pub url: String,
    /// 1-based listing page the card was found on
    pub page: u32,
}

/// A place with its reviews, the unit of caching and persistence.
///
/// Identity is the `url`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    /// Display name of the place
    pub name: String,
    /// Detail page URL, unique key
    pub url: String,
    /// Listing page the place was found on
    pub page: u32,
    /// Detected detail page layout
    #[serde(default)]
    pub mode: Mode,
    /// Stable identifier from the geocoding service
    #[serde(default)]
    pub place_id: Option<String>,
    /// Resolved coordinates
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    /// Reviews scraped from the detail page
    #[serde(default)]
    pub reviews: Vec<Review>,
}

impl Place {
    /// Start a place from a listing card, before any enrichment.
    #[must_use]
    pub fn from_listing(entry: ListingEntry) -> Self {
        Self {
            name: entry.name,
            url: entry.url,
            page: entry.page,
            mode: Mode::default(),
            place_id: None,
            coordinates: None,
            reviews: Vec::new(),
        }
    }

    /// Number of reviews passing [`Review::is_clean`].
    #[must_use]
    pub fn clean_review_count(&self) -> usize {
        self.reviews.iter().filter(|r| r.is_clean()).count()
    }
}

/// The geographic query driving a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Free-text term typed into the site search box
    pub term: String,
    /// Center of the area of interest
    pub center: Coordinates,
    /// Radius of the area of interest in meters
    pub radius_m: f64,
}

impl SearchQuery {
    /// Create a validated query.
    ///
    /// # Errors
    /// Returns error if the term is blank or the radius is not positive.
    pub fn new(
        term: impl Into<String>,
        center: Coordinates,
        radius_m: f64,
    ) -> Result<Self, CoreError> {
        let term = term.into();
        if term.trim().is_empty() {
            return Err(CoreError::Validation("search term must not be empty".to_string()));
        }
        if !radius_m.is_finite() || radius_m <= 0.0 {
            return Err(CoreError::Validation(format!(
                "radius must be a positive number of meters, got {radius_m}"
            )));
        }
        Ok(Self {
            term,
            center,
            radius_m,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(title: Option<&str>, month: Option<Month>) -> Review {
        Review {
            metadata: ReviewMetadata {
                rating: Some(50),
                title: title.map(str::to_string),
                text: Some("Lovely walk".to_string()),
                day: None,
                month,
                year: Some(2023),
            },
            images: vec![],
        }
    }

    #[test]
    fn test_clean_review_requires_all_fields() {
        assert!(review(Some("Great"), Some(Month::Name("March".into()))).is_clean());
        assert!(!review(None, Some(Month::Number(3))).is_clean());
        assert!(!review(Some("Great"), None).is_clean());
    }

    #[test]
    fn test_month_parse() {
        assert_eq!(Month::parse("3"), Some(Month::Number(3)));
        assert_eq!(Month::parse(" March "), Some(Month::Name("March".into())));
        assert_eq!(Month::parse("13"), None);
        assert_eq!(Month::parse(""), None);
    }

    #[test]
    fn test_month_serializes_untagged() {
        let json = serde_json::to_string(&vec![Month::Number(4), Month::Name("May".into())])
            .expect("serialize months");
        assert_eq!(json, r#"[4,"May"]"#);
    }

    #[test]
    fn test_place_uses_camel_case_keys() {
        let mut place = Place::from_listing(ListingEntry {
            name: "Tea Garden".into(),
            url: "https://example.com/a".into(),
            page: 1,
        });
        place.place_id = Some("abc".into());
        let value = serde_json::to_value(&place).expect("serialize place");
        assert_eq!(value["placeId"], "abc");
        assert_eq!(value["mode"], "place");
    }

    #[test]
    fn test_coordinates_validation() {
        assert!(Coordinates::new(27.04, 88.26).is_ok());
        assert!(Coordinates::new(91.0, 0.0).is_err());
        assert!(Coordinates::new(0.0, f64::NAN).is_err());
    }

    #[test]
    fn test_search_query_validation() {
        let center = Coordinates::new(0.0, 0.0).expect("valid coordinates");
        assert!(SearchQuery::new("Darjeeling", center, 5000.0).is_ok());
        assert!(SearchQuery::new("  ", center, 5000.0).is_err());
        assert!(SearchQuery::new("Darjeeling", center, 0.0).is_err());
    }

    #[test]
    fn test_clean_review_count() {
        let mut place = Place::from_listing(ListingEntry {
            name: "Toy Train".into(),
            url: "https://example.com/b".into(),
            page: 2,
        });
        place.reviews = vec![
            review(Some("A"), Some(Month::Number(1))),
            review(None, Some(Month::Number(1))),
        ];
        assert_eq!(place.clean_review_count(), 1);
    }
}
