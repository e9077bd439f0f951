//! Place cache operations.
//!
//! Places are keyed by listing URL. Writes are best-effort per record: a
//! duplicate key is counted and skipped, any other failure is collected and
//! reported after the remaining records were attempted.

use crate::error::{DatabaseError, Result};
use crate::schema::validate_place;
use chrono::Utc;
use sqlx::{Pool, Sqlite};
use waypoint_core::Place;

/// Outcome of a successful upsert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertReport {
    /// Records newly stored
    pub inserted: usize,
    /// Records skipped because their url was already stored
    pub duplicates: usize,
}

/// Columns a point lookup may filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupField {
    /// Listing URL, the unique key
    Url,
    /// Geocoder place id
    PlaceId,
    /// Display name
    Name,
}

impl LookupField {
    fn column(self) -> &'static str {
        match self {
            Self::Url => "url",
            Self::PlaceId => "place_id",
            Self::Name => "name",
        }
    }
}

async fn insert_place(pool: &Pool<Sqlite>, place: &Place) -> Result<()> {
    validate_place(place)?;

    let document = serde_json::to_string(place)
        .map_err(|e| DatabaseError::SerializationError(e.to_string()))?;

    sqlx::query(
        "INSERT INTO places (url, name, page, mode, place_id, lat, lng, document, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&place.url)
    .bind(&place.name)
    .bind(i64::from(place.page))
    .bind(place.mode.as_str())
    .bind(place.place_id.as_deref())
    .bind(place.coordinates.map(|c| c.lat))
    .bind(place.coordinates.map(|c| c.lng))
    .bind(&document)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Store places that are not cached yet.
///
/// Duplicates are never an error. If any record fails for another reason,
/// returns [`DatabaseError::PartialBulkFailure`] listing the failed keys;
/// the other records stay committed.
pub async fn upsert(pool: &Pool<Sqlite>, places: &[Place]) -> Result<UpsertReport> {
    let mut report = UpsertReport::default();
    let mut failed_keys = Vec::new();

    for place in places {
        match insert_place(pool, place).await {
            Ok(()) => report.inserted += 1,
            Err(e) if e.is_duplicate() => report.duplicates += 1,
            Err(e) => {
                tracing::warn!("Failed to store place {}: {}", place.url, e);
                failed_keys.push(place.url.clone());
            }
        }
    }

    if !failed_keys.is_empty() {
        tracing::error!(
            failed = failed_keys.len(),
            inserted = report.inserted,
            duplicates = report.duplicates,
            "Bulk write partially failed"
        );
        return Err(DatabaseError::PartialBulkFailure {
            inserted: report.inserted,
            duplicates: report.duplicates,
            failed_keys,
        });
    }

    if report.duplicates > 0 {
        tracing::info!(
            "{} duplicates found, successfully inserted {} places",
            report.duplicates,
            report.inserted
        );
    }
    Ok(report)
}

fn decode(document: &str) -> Result<Place> {
    serde_json::from_str(document).map_err(|e| DatabaseError::Decode(e.to_string()))
}

async fn try_find_one(pool: &Pool<Sqlite>, field: LookupField, value: &str) -> Result<Option<Place>> {
    // column names come from a closed enum, never from input
    let sql = format!(
        "SELECT document FROM places WHERE {} = ? ORDER BY rowid LIMIT 1",
        field.column()
    );
    let document: Option<String> = sqlx::query_scalar(&sql)
        .bind(value)
        .fetch_optional(pool)
        .await?;

    document.as_deref().map(decode).transpose()
}

/// First place whose `field` equals `value`.
///
/// Storage and decode errors read as a cache miss.
pub async fn find_one(pool: &Pool<Sqlite>, field: LookupField, value: &str) -> Option<Place> {
    match try_find_one(pool, field, value).await {
        Ok(found) => found,
        Err(e) => {
            tracing::warn!("Lookup by {} failed, treating as miss: {}", field.column(), e);
            None
        }
    }
}

/// Cached place for a listing URL.
pub async fn lookup(pool: &Pool<Sqlite>, url: &str) -> Option<Place> {
    find_one(pool, LookupField::Url, url).await
}

/// Number of cached places.
pub async fn count(pool: &Pool<Sqlite>) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM places")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Every cached place in insertion order.
pub async fn all(pool: &Pool<Sqlite>) -> Result<Vec<Place>> {
    let documents: Vec<String> = sqlx::query_scalar("SELECT document FROM places ORDER BY rowid")
        .fetch_all(pool)
        .await?;

    documents.iter().map(String::as_str).map(decode).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Store;
    use waypoint_core::{Coordinates, Mode, Month, Review, ReviewMetadata};

    async fn setup_test_db() -> Store {
        let store = Store::open(":memory:").await.expect("create store");
        store.run_migrations().await.expect("run migrations");
        store
    }

    fn clean_review(title: &str) -> Review {
        Review {
            metadata: ReviewMetadata {
                rating: Some(50),
                title: Some(title.into()),
                text: Some("Worth the climb".into()),
                day: Some(12),
                month: Some(Month::Number(3)),
                year: Some(2023),
            },
            images: vec!["https://img.example.com/a.jpg?w=2400".into()],
        }
    }

    fn place(slug: &str) -> Place {
        Place {
            name: format!("Place {slug}"),
            url: format!("https://example.com/{slug}"),
            page: 1,
            mode: Mode::Place,
            place_id: Some(format!("pid-{slug}")),
            coordinates: Some(Coordinates { lat: 27.04, lng: 88.26 }),
            reviews: vec![clean_review("Great")],
        }
    }

    #[tokio::test]
    async fn test_upsert_and_lookup() {
        let store = setup_test_db().await;

        let report = store.upsert(&[place("a"), place("b")]).await.expect("upsert");
        assert_eq!(report, UpsertReport { inserted: 2, duplicates: 0 });

        let found = store.lookup("https://example.com/a").await.expect("cached");
        assert_eq!(found, place("a"));
        assert!(store.lookup("https://example.com/missing").await.is_none());
    }

    #[tokio::test]
    async fn test_upsert_twice_is_idempotent() {
        let store = setup_test_db().await;
        let places = vec![place("a"), place("b"), place("c")];

        store.upsert(&places).await.expect("first upsert");
        let before = store.count().await.expect("count");

        let report = store.upsert(&places).await.expect("second upsert");
        assert_eq!(report, UpsertReport { inserted: 0, duplicates: 3 });
        assert_eq!(store.count().await.expect("count"), before);
    }

    #[tokio::test]
    async fn test_single_record_duplicate_is_not_error() {
        let store = setup_test_db().await;
        store.upsert(&[place("a")]).await.expect("insert");

        let report = store.upsert(&[place("a")]).await.expect("duplicate tolerated");
        assert_eq!(report.duplicates, 1);
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_good_records() {
        let store = setup_test_db().await;

        let mut bad = place("bad");
        bad.reviews[0].metadata.title = None;

        let err = store
            .upsert(&[place("a"), bad, place("b")])
            .await
            .expect_err("schema violation reported");

        match err {
            DatabaseError::PartialBulkFailure {
                inserted,
                duplicates,
                failed_keys,
            } => {
                assert_eq!(inserted, 2);
                assert_eq!(duplicates, 0);
                assert_eq!(failed_keys, vec!["https://example.com/bad".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(store.count().await.expect("count"), 2);
    }

    #[tokio::test]
    async fn test_find_one_by_other_fields() {
        let store = setup_test_db().await;
        store.upsert(&[place("a"), place("b")]).await.expect("upsert");

        let by_pid = store
            .find_one(LookupField::PlaceId, "pid-b")
            .await
            .expect("found by place id");
        assert_eq!(by_pid.url, "https://example.com/b");

        let by_name = store
            .find_one(LookupField::Name, "Place a")
            .await
            .expect("found by name");
        assert_eq!(by_name.url, "https://example.com/a");
    }

    #[tokio::test]
    async fn test_lookup_errors_degrade_to_miss() {
        // no migrations: the table does not exist
        let store = Store::open(":memory:").await.expect("create store");
        assert!(store.lookup("https://example.com/a").await.is_none());
    }

    #[tokio::test]
    async fn test_all_preserves_insertion_order() {
        let store = setup_test_db().await;
        store
            .upsert(&[place("z"), place("a"), place("m")])
            .await
            .expect("upsert");

        let urls: Vec<String> = store
            .all()
            .await
            .expect("all")
            .into_iter()
            .map(|p| p.url)
            .collect();
        assert_eq!(
            urls,
            vec![
                "https://example.com/z",
                "https://example.com/a",
                "https://example.com/m"
            ]
        );
    }
}
