#![allow(clippy::must_use_candidate)]

use waypoint_core::{geo, Place, SearchQuery};

/// Where a place in the working set came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceSource {
    /// Reused verbatim from the place cache
    Cached,
    /// Scraped and geocoded during this run
    Fresh,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScrapedPlace {
    pub place: Place,
    pub source: PlaceSource,
}

impl ScrapedPlace {
    pub fn cached(place: Place) -> Self {
        Self {
            place,
            source: PlaceSource::Cached,
        }
    }

    pub fn fresh(place: Place) -> Self {
        Self {
            place,
            source: PlaceSource::Fresh,
        }
    }
}

/// Whether a freshly geocoded place lies inside the search circle.
///
/// Places without coordinates cannot be placed and are rejected. Cached places
/// were filtered when they were first scraped and always pass.
pub fn within_search_area(scraped: &ScrapedPlace, query: &SearchQuery) -> bool {
    match scraped.source {
        PlaceSource::Cached => true,
        PlaceSource::Fresh => scraped
            .place
            .coordinates
            .is_some_and(|c| geo::within_radius(query.center, c, query.radius_m)),
    }
}

/// Reduce the working set to exportable places.
///
/// Drops places outside the search area, strips reviews missing title, text,
/// month or year, then drops places left without reviews or without a name or
/// url.
pub fn clean_places(scraped: Vec<ScrapedPlace>, query: &SearchQuery) -> Vec<Place> {
    scraped
        .into_iter()
        .filter(|s| {
            let keep = within_search_area(s, query);
            if !keep {
                tracing::debug!(name = %s.place.name, "outside search area, dropping");
            }
            keep
        })
        .map(|s| {
            let mut place = s.place;
            place.reviews.retain(waypoint_core::Review::is_clean);
            place
        })
        .filter(|p| !p.reviews.is_empty() && !p.name.is_empty() && !p.url.is_empty())
        .collect()
}
