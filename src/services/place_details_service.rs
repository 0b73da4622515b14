//! Google Places Details client and refresh decision logic.
//!
//! Listings that have a resolved `place_id` carry a cached enrichment
//! blob (hours/rating/reviews/photos). The refresh job asks this module
//! two questions per row: does anything need refreshing, and if so, the
//! whole blob or just the opening hours?

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::AppError;
use crate::models::place_details::{OpeningHours, PlaceDetails, Review, details_fresh};

const PLACES_DETAILS_URL: &str = "https://maps.googleapis.com/maps/api/place/details/json";

/// What the refresh job should do for one listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshKind {
    /// Full blob is stale (or missing): fetch everything.
    Full,
    /// Blob is current but the hours sub-field has aged out.
    HoursOnly,
    /// Nothing to do.
    Fresh,
}

/// Decide how to refresh a listing's place details.
///
/// The full blob has a 7-day window keyed on the column-level
/// timestamp; the hours sub-field a 48-hour window keyed inside the
/// blob. A hours-only refresh never invalidates the rest.
pub fn refresh_kind(
    details: Option<&PlaceDetails>,
    details_updated_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> RefreshKind {
    if !details_fresh(details_updated_at, now) {
        return RefreshKind::Full;
    }

    match details {
        Some(d) if d.hours_fresh(now) => RefreshKind::Fresh,
        _ => RefreshKind::HoursOnly,
    }
}

/// Wire shape of the Places Details endpoint (the fields we request).
#[derive(Debug, Deserialize)]
struct PlacesDetailsResponse {
    status: String,
    result: Option<PlaceResult>,
}

#[derive(Debug, Deserialize)]
struct PlaceResult {
    opening_hours: Option<WireOpeningHours>,
    rating: Option<f64>,
    user_ratings_total: Option<i64>,
    #[serde(default)]
    reviews: Vec<WireReview>,
    #[serde(default)]
    photos: Vec<WirePhoto>,
}

#[derive(Debug, Deserialize)]
struct WireOpeningHours {
    open_now: Option<bool>,
    #[serde(default)]
    weekday_text: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct WireReview {
    author_name: Option<String>,
    rating: Option<f64>,
    text: Option<String>,
    relative_time_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WirePhoto {
    photo_reference: String,
}

impl From<WireOpeningHours> for OpeningHours {
    fn from(wire: WireOpeningHours) -> Self {
        Self {
            open_now: wire.open_now,
            weekday_text: wire.weekday_text,
        }
    }
}

/// Service for fetching place details from the Google Places API
pub struct PlaceDetailsService {
    client: reqwest::Client,
    api_key: String,
}

impl PlaceDetailsService {
    pub fn new(api_key: String) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::ExternalService(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client, api_key })
    }

    /// Fetch the full details blob for a place.
    ///
    /// Returns `Ok(None)` when the API answers with a non-OK status
    /// (unknown place, quota, etc.); the caller skips the row.
    pub async fn fetch_details(&self, place_id: &str) -> Result<Option<PlaceDetails>, AppError> {
        let fields = "opening_hours,rating,user_ratings_total,reviews,photos";
        let result = self.request(place_id, fields).await?;

        Ok(result.map(|r| PlaceDetails {
            opening_hours: r.opening_hours.map(Into::into),
            hours_updated_at: Some(Utc::now()),
            rating: r.rating,
            user_ratings_total: r.user_ratings_total,
            reviews: r
                .reviews
                .into_iter()
                .map(|w| Review {
                    author_name: w.author_name,
                    rating: w.rating,
                    text: w.text,
                    relative_time_description: w.relative_time_description,
                })
                .collect(),
            photos: r.photos.into_iter().map(|p| p.photo_reference).collect(),
        }))
    }

    /// Fetch only the opening hours for a place.
    pub async fn fetch_opening_hours(
        &self,
        place_id: &str,
    ) -> Result<Option<OpeningHours>, AppError> {
        let result = self.request(place_id, "opening_hours").await?;
        Ok(result.and_then(|r| r.opening_hours).map(Into::into))
    }

    async fn request(&self, place_id: &str, fields: &str) -> Result<Option<PlaceResult>, AppError> {
        let url = format!(
            "{}?place_id={}&fields={}&key={}",
            PLACES_DETAILS_URL,
            urlencoding::encode(place_id),
            fields,
            self.api_key
        );

        let response = self.client.get(&url).send().await.map_err(|e| {
            tracing::error!("Places request failed: {:?}", e);
            AppError::ExternalService(format!("Places request failed: {e}"))
        })?;

        if !response.status().is_success() {
            tracing::warn!("Places API returned status: {}", response.status());
            return Ok(None);
        }

        let body: PlacesDetailsResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse Places response: {:?}", e);
            AppError::ExternalService(format!("Failed to parse Places response: {e}"))
        })?;

        if body.status != "OK" {
            tracing::warn!("Places API status for {}: {}", place_id, body.status);
            return Ok(None);
        }

        Ok(body.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn missing_blob_forces_full_refresh() {
        let now = Utc::now();
        assert_eq!(refresh_kind(None, None, now), RefreshKind::Full);
    }

    #[test]
    fn aged_out_blob_forces_full_refresh() {
        let now = Utc::now();
        let details = PlaceDetails {
            hours_updated_at: Some(now),
            ..Default::default()
        };
        assert_eq!(
            refresh_kind(Some(&details), Some(now - Duration::days(8)), now),
            RefreshKind::Full
        );
    }

    #[test]
    fn fresh_blob_with_stale_hours_refreshes_hours_only() {
        let now = Utc::now();
        let details = PlaceDetails {
            hours_updated_at: Some(now - Duration::hours(50)),
            ..Default::default()
        };
        assert_eq!(
            refresh_kind(Some(&details), Some(now - Duration::days(2)), now),
            RefreshKind::HoursOnly
        );
    }

    #[test]
    fn fully_fresh_blob_needs_nothing() {
        let now = Utc::now();
        let details = PlaceDetails {
            hours_updated_at: Some(now - Duration::hours(1)),
            ..Default::default()
        };
        assert_eq!(
            refresh_kind(Some(&details), Some(now - Duration::days(1)), now),
            RefreshKind::Fresh
        );
    }

    #[test]
    fn parses_places_details_response() {
        let body = r#"{
            "status": "OK",
            "result": {
                "rating": 4.6,
                "user_ratings_total": 312,
                "opening_hours": {
                    "open_now": true,
                    "weekday_text": ["Monday: 9:00 AM – 5:00 PM"]
                },
                "photos": [{"photo_reference": "ref-1", "height": 100, "width": 100}],
                "reviews": [{"author_name": "A. Parent", "rating": 5, "text": "fun", "relative_time_description": "a week ago"}]
            }
        }"#;

        let parsed: PlacesDetailsResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.status, "OK");
        let result = parsed.result.unwrap();
        assert_eq!(result.rating, Some(4.6));
        assert_eq!(result.photos[0].photo_reference, "ref-1");
        assert_eq!(result.opening_hours.unwrap().weekday_text.len(), 1);
    }

    #[test]
    fn non_ok_status_has_no_result() {
        let body = r#"{"status": "NOT_FOUND"}"#;
        let parsed: PlacesDetailsResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.status, "NOT_FOUND");
        assert!(parsed.result.is_none());
    }
}
