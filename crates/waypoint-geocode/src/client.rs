//! Find-place-from-text geocoding client.

use crate::error::{GeocodeError, Result};
use crate::usage::{BillingPolicy, UsageSnapshot, UsageState};
use async_trait::async_trait;
use chrono::{Datelike, Local, NaiveDate};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Mutex;
use std::time::Duration;
use waypoint_core::{Coordinates, GeocodeConfig};

/// Result of one resolve attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeOutcome {
    /// Location of the best candidate
    pub coordinates: Option<Coordinates>,
    /// Provider id of the best candidate
    pub place_id: Option<String>,
    /// Whether an HTTP call was attempted (and counted)
    pub billed: bool,
    /// Usage after this call
    pub usage: UsageSnapshot,
}

/// Resolves a place name to coordinates near a search area.
///
/// Failures never propagate: no match, a non-OK status and transport errors
/// all yield an outcome without coordinates.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Look up `name`, biased toward the circle around `center`.
    async fn resolve(&self, name: &str, center: Coordinates, radius_m: f64) -> GeocodeOutcome;

    /// Current counter, for persisting between runs.
    fn usage_state(&self) -> UsageState;
}

#[derive(Debug, Deserialize)]
struct FindPlaceResponse {
    status: String,
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    geometry: Option<Geometry>,
    place_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

fn today_local() -> NaiveDate {
    Local::now().date_naive()
}

/// HTTP geocoder for a find-place-from-text style endpoint.
pub struct PlacesGeocoder {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    billing: BillingPolicy,
    usage: Mutex<UsageState>,
    today: fn() -> NaiveDate,
}

impl PlacesGeocoder {
    /// Create a geocoder that continues counting from `usage`.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(config: &GeocodeConfig, usage: UsageState) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GeocodeError::Internal(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            billing: BillingPolicy::from_config(config),
            usage: Mutex::new(usage),
            today: today_local,
        })
    }

    /// Replace the calendar used for monthly resets.
    #[must_use]
    pub fn with_clock(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Usage so far, with its estimated cost.
    #[must_use]
    pub fn usage(&self) -> UsageSnapshot {
        self.billing.snapshot(self.usage_state().monthly_usage_count)
    }

    fn record_call(&self) -> UsageSnapshot {
        let month = (self.today)().month();
        let count = match self.usage.lock() {
            Ok(mut usage) => usage.record_call(month),
            Err(poisoned) => poisoned.into_inner().record_call(month),
        };
        let snapshot = self.billing.snapshot(count);
        if snapshot.over_allowance {
            tracing::warn!(
                count,
                estimated_cost = snapshot.estimated_cost,
                "Geocoding allowance exceeded"
            );
        }
        snapshot
    }

    async fn request(
        &self,
        api_key: &str,
        name: &str,
        center: Coordinates,
        radius_m: f64,
    ) -> Result<Option<(Coordinates, Option<String>)>> {
        let location_bias = format!("circle:{radius_m}@{},{}", center.lat, center.lng);
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("input", name),
                ("inputtype", "textquery"),
                ("fields", "geometry,place_id"),
                ("locationbias", location_bias.as_str()),
                ("key", api_key),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GeocodeError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body: FindPlaceResponse = response
            .json()
            .await
            .map_err(|e| GeocodeError::ParseError(e.to_string()))?;

        if body.status != "OK" {
            tracing::debug!("No geocode result for {}: {}", name, body.status);
            return Ok(None);
        }

        let Some(candidate) = body.candidates.into_iter().next() else {
            return Ok(None);
        };
        let coordinates = candidate
            .geometry
            .and_then(|g| Coordinates::new(g.location.lat, g.location.lng).ok());

        Ok(coordinates.map(|c| (c, candidate.place_id)))
    }
}

#[async_trait]
impl Geocoder for PlacesGeocoder {
    async fn resolve(&self, name: &str, center: Coordinates, radius_m: f64) -> GeocodeOutcome {
        let Some(api_key) = self.api_key.as_deref() else {
            tracing::warn!("Skipping geocode for {}: {}", name, GeocodeError::MissingApiKey);
            return GeocodeOutcome {
                coordinates: None,
                place_id: None,
                billed: false,
                usage: self.usage(),
            };
        };

        // every attempted call is billed, whatever its outcome
        let usage = self.record_call();

        let (coordinates, place_id) = match self.request(api_key, name, center, radius_m).await {
            Ok(Some((coordinates, place_id))) => {
                tracing::info!("Fetched coordinates for {}", name);
                (Some(coordinates), place_id)
            }
            Ok(None) => (None, None),
            Err(e) => {
                tracing::warn!("Error fetching location info for {}: {}", name, e);
                (None, None)
            }
        };

        GeocodeOutcome {
            coordinates,
            place_id,
            billed: true,
            usage,
        }
    }

    fn usage_state(&self) -> UsageState {
        match self.usage.lock() {
            Ok(usage) => *usage,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn april() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 10).expect("valid date")
    }

    fn config(endpoint: String) -> GeocodeConfig {
        GeocodeConfig {
            endpoint,
            api_key: Some("test-key".to_string()),
            timeout_secs: 5,
            ..Default::default()
        }
    }

    fn center() -> Coordinates {
        Coordinates {
            lat: 27.041,
            lng: 88.266,
        }
    }

    #[tokio::test]
    async fn test_resolve_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/findplacefromtext/json"))
            .and(query_param("input", "Tiger Hill"))
            .and(query_param("inputtype", "textquery"))
            .and(query_param("fields", "geometry,place_id"))
            .and(query_param("locationbias", "circle:5000@27.041,88.266"))
            .and(query_param("key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "OK",
                "candidates": [{
                    "geometry": {"location": {"lat": 26.9969, "lng": 88.2772}},
                    "place_id": "ChIJ-tiger"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let geocoder = PlacesGeocoder::new(
            &config(format!("{}/findplacefromtext/json", server.uri())),
            UsageState::new(4),
        )
        .expect("client")
        .with_clock(april);

        let outcome = geocoder.resolve("Tiger Hill", center(), 5000.0).await;
        assert!(outcome.billed);
        assert_eq!(outcome.place_id.as_deref(), Some("ChIJ-tiger"));
        assert_eq!(
            outcome.coordinates,
            Some(Coordinates {
                lat: 26.9969,
                lng: 88.2772
            })
        );
        assert_eq!(outcome.usage.count, 1);
    }

    #[tokio::test]
    async fn test_non_ok_status_is_no_result_but_billed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ZERO_RESULTS",
                "candidates": []
            })))
            .mount(&server)
            .await;

        let geocoder = PlacesGeocoder::new(&config(server.uri()), UsageState::new(4))
            .expect("client")
            .with_clock(april);

        let outcome = geocoder.resolve("Nowhere", center(), 1000.0).await;
        assert!(outcome.billed);
        assert_eq!(outcome.coordinates, None);
        assert_eq!(outcome.place_id, None);
        assert_eq!(geocoder.usage_state().monthly_usage_count, 1);
    }

    #[tokio::test]
    async fn test_http_error_counts_usage() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let geocoder = PlacesGeocoder::new(&config(server.uri()), UsageState::new(4))
            .expect("client")
            .with_clock(april);

        let first = geocoder.resolve("A", center(), 1000.0).await;
        let second = geocoder.resolve("B", center(), 1000.0).await;
        assert!(first.billed && second.billed);
        assert_eq!(second.usage.count, 2);
        assert_eq!(second.coordinates, None);
    }

    #[tokio::test]
    async fn test_transport_error_counts_usage() {
        // nothing listens on the discard port
        let geocoder = PlacesGeocoder::new(
            &config("http://127.0.0.1:9/findplacefromtext/json".to_string()),
            UsageState::new(4),
        )
        .expect("client")
        .with_clock(april);

        let outcome = geocoder.resolve("A", center(), 1000.0).await;
        assert!(outcome.billed);
        assert_eq!(outcome.usage.count, 1);
        assert_eq!(outcome.coordinates, None);
    }

    #[tokio::test]
    async fn test_first_call_in_new_month_resets() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ZERO_RESULTS"})))
            .mount(&server)
            .await;

        let stored = UsageState {
            monthly_usage_count: 50,
            last_reset_month: 3,
        };
        let geocoder = PlacesGeocoder::new(&config(server.uri()), stored)
            .expect("client")
            .with_clock(april);

        let outcome = geocoder.resolve("A", center(), 1000.0).await;
        assert_eq!(outcome.usage.count, 1);
        assert_eq!(
            geocoder.usage_state(),
            UsageState {
                monthly_usage_count: 1,
                last_reset_month: 4,
            }
        );
    }

    #[tokio::test]
    async fn test_over_allowance_is_flagged_not_blocked() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "OK",
                "candidates": [{"geometry": {"location": {"lat": 1.0, "lng": 2.0}}, "place_id": "p"}]
            })))
            .mount(&server)
            .await;

        let stored = UsageState {
            monthly_usage_count: 20_000,
            last_reset_month: 4,
        };
        let geocoder = PlacesGeocoder::new(&config(server.uri()), stored)
            .expect("client")
            .with_clock(april);

        let outcome = geocoder.resolve("A", center(), 1000.0).await;
        assert!(outcome.usage.over_allowance);
        assert!(outcome.coordinates.is_some());
    }

    #[tokio::test]
    async fn test_missing_key_makes_no_call() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut cfg = config(server.uri());
        cfg.api_key = None;
        let geocoder = PlacesGeocoder::new(&cfg, UsageState::new(4))
            .expect("client")
            .with_clock(april);

        let outcome = geocoder.resolve("A", center(), 1000.0).await;
        assert!(!outcome.billed);
        assert_eq!(outcome.usage.count, 0);
    }
}
