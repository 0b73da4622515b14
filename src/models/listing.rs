//! Listing data models and API request/response types.
//!
//! This module defines:
//! - `Listing`: Database entity representing an event, activity, or camp
//! - `ListingType`: The three listing classifications
//! - `ListingQuery`: Query parameters accepted by the listing endpoints
//! - `ListingResponse`: Response body returned to clients

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::Coordinates;

/// Classification of a listing.
///
/// Stored in the database as text (`'Event'`, `'Activity'`, `'Camp'`,
/// enforced by a CHECK constraint) and used verbatim in API query
/// parameters and JSON responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListingType {
    Event,
    Activity,
    Camp,
}

impl ListingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingType::Event => "Event",
            ListingType::Activity => "Activity",
            ListingType::Camp => "Camp",
        }
    }
}

/// Error for listing-type strings that are none of the three variants.
#[derive(Debug, thiserror::Error)]
#[error("invalid listing type: {0}")]
pub struct ParseListingTypeError(String);

impl TryFrom<String> for ListingType {
    type Error = ParseListingTypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "Event" => Ok(ListingType::Event),
            "Activity" => Ok(ListingType::Activity),
            "Camp" => Ok(ListingType::Camp),
            _ => Err(ParseListingTypeError(value)),
        }
    }
}

/// Represents a listing record from the database.
///
/// # Database Table
///
/// Maps to the `listings` table. Each listing:
/// - Carries a stable provider identifier (`external_id`) alongside the
///   internal UUID
/// - May or may not have coordinates (geocoding is a maintenance job)
/// - May or may not be date-bound (`start_date` is absent for standing
///   activities)
/// - Can be soft-deleted via the `hidden` flag
///
/// # Transient Distance
///
/// `distance` (miles from a caller-supplied point) is computed per
/// request and never persisted, so it is skipped when decoding rows.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Listing {
    /// Internal unique identifier
    pub id: Uuid,

    /// Stable identifier from the provider that sourced this listing
    pub external_id: String,

    /// Event, Activity, or Camp
    #[sqlx(try_from = "String")]
    pub listing_type: ListingType,

    /// Free-text place category, e.g. "Museum", "Park"
    pub place_type: Option<String>,

    pub title: String,
    pub description: Option<String>,

    /// Image URL (filled by the image backfill job when providers
    /// supply none)
    pub image: Option<String>,

    pub organizer: Option<String>,
    pub website: Option<String>,

    /// Editorial flag surfaced as a query filter
    pub recommended: bool,

    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub location_name: Option<String>,

    /// WGS84 degrees; both present or the listing is excluded from any
    /// distance-based view
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,

    /// Absent means the listing is not date-bound
    pub start_date: Option<DateTime<Utc>>,

    /// Soft-delete flag set by maintenance jobs for past events
    pub hidden: bool,

    /// Google Places identifier, once resolved
    pub place_id: Option<String>,

    /// Cached enrichment blob (photos/hours/rating/reviews); see
    /// `models::place_details` for the typed shape and freshness rules
    pub google_place_details: Option<serde_json::Value>,

    /// When the full enrichment blob was last refreshed
    pub place_details_updated_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Miles from the caller-supplied point; per-request only
    #[sqlx(skip)]
    pub distance: Option<f64>,
}

impl Listing {
    /// Both coordinates, or nothing.
    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)),
            _ => None,
        }
    }

    /// The listing's start date as a local calendar day.
    ///
    /// Day-level comparisons (is this event still current?) are done on
    /// this value so same-day events remain visible regardless of their
    /// time-of-day.
    pub fn start_day(&self) -> Option<NaiveDate> {
        self.start_date
            .map(|d| d.with_timezone(&Local).date_naive())
    }

    /// True when the listing is date-bound and its day has passed.
    ///
    /// Listings without a `start_date` are never past (standing
    /// activities stay visible).
    pub fn is_past(&self, today: NaiveDate) -> bool {
        matches!(self.start_day(), Some(day) if day < today)
    }

    /// Compute and attach the transient distance from an origin point.
    ///
    /// No-op when either side lacks coordinates.
    pub fn attach_distance(&mut self, origin: Option<Coordinates>) {
        self.distance = match (origin, self.coordinates()) {
            (Some(from), Some(to)) => Some(crate::geo::distance_miles(from, to)),
            _ => None,
        };
    }

    /// Assemble a postal address for geocoding, from the most specific
    /// fields available. Falls back to the location name; `None` when
    /// there is nothing to geocode from.
    pub fn postal_address(&self) -> Option<String> {
        let parts: Vec<&str> = [
            self.street.as_deref(),
            self.city.as_deref(),
            self.state.as_deref(),
            self.zip.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect();

        if !parts.is_empty() {
            return Some(parts.join(", "));
        }

        self.location_name.clone()
    }
}

/// Query parameters for `GET /api/v1/listings`.
///
/// # Example
///
/// `/api/v1/listings?type=Event&city=Oakland&lat=37.8&lng=-122.27&limit=20`
#[derive(Debug, Clone, Deserialize)]
pub struct ListingQuery {
    /// Filter by listing classification
    #[serde(rename = "type")]
    pub listing_type: Option<ListingType>,

    /// Filter by place category (case-insensitive)
    pub place_type: Option<String>,

    /// Filter by city (case-insensitive)
    pub city: Option<String>,

    /// Only recommended listings
    pub recommended: Option<bool>,

    /// Pagination offset, defaults to 0
    pub offset: Option<i64>,

    /// Page size, defaults to 20, capped at 100
    pub limit: Option<i64>,

    /// Caller latitude; with `lng`, attaches `distance` to each row
    pub lat: Option<f64>,

    /// Caller longitude
    pub lng: Option<f64>,
}

impl ListingQuery {
    /// The caller's point, when both halves were supplied.
    pub fn origin(&self) -> Option<Coordinates> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)),
            _ => None,
        }
    }
}

/// Response body for listing endpoints.
///
/// Strips internal fields (`hidden`, `place_id`, bookkeeping
/// timestamps) and carries the per-request `distance`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingResponse {
    pub id: Uuid,
    pub external_id: String,
    #[serde(rename = "type")]
    pub listing_type: ListingType,
    pub place_type: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub organizer: Option<String>,
    pub website: Option<String>,
    pub recommended: bool,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub location_name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub start_date: Option<DateTime<Utc>>,
    pub distance: Option<f64>,
    pub google_place_details: Option<serde_json::Value>,
}

impl From<Listing> for ListingResponse {
    fn from(listing: Listing) -> Self {
        Self {
            id: listing.id,
            external_id: listing.external_id,
            listing_type: listing.listing_type,
            place_type: listing.place_type,
            title: listing.title,
            description: listing.description,
            image: listing.image,
            organizer: listing.organizer,
            website: listing.website,
            recommended: listing.recommended,
            street: listing.street,
            city: listing.city,
            state: listing.state,
            zip: listing.zip,
            location_name: listing.location_name,
            latitude: listing.latitude,
            longitude: listing.longitude,
            start_date: listing.start_date,
            distance: listing.distance,
            google_place_details: listing.google_place_details,
        }
    }
}

/// A minimal listing for field-level tests.
#[cfg(test)]
pub(crate) fn test_listing() -> Listing {
    Listing {
        id: Uuid::new_v4(),
        external_id: "ext-1".to_string(),
        listing_type: ListingType::Activity,
        place_type: None,
        title: "Test listing".to_string(),
        description: None,
        image: None,
        organizer: None,
        website: None,
        recommended: false,
        street: None,
        city: None,
        state: None,
        zip: None,
        location_name: None,
        latitude: None,
        longitude: None,
        start_date: None,
        hidden: false,
        place_id: None,
        google_place_details: None,
        place_details_updated_at: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
        distance: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_type_round_trips_through_text() {
        assert_eq!(
            ListingType::try_from("Event".to_string()).unwrap(),
            ListingType::Event
        );
        assert_eq!(ListingType::Camp.as_str(), "Camp");
        assert!(ListingType::try_from("Concert".to_string()).is_err());
    }

    #[test]
    fn postal_address_prefers_street_fields() {
        let listing = Listing {
            street: Some("123 Main St".to_string()),
            city: Some("Oakland".to_string()),
            state: Some("CA".to_string()),
            zip: None,
            location_name: Some("Some Hall".to_string()),
            ..test_listing()
        };
        assert_eq!(
            listing.postal_address().as_deref(),
            Some("123 Main St, Oakland, CA")
        );

        let bare = Listing {
            location_name: Some("Chabot Space Center".to_string()),
            ..test_listing()
        };
        assert_eq!(
            bare.postal_address().as_deref(),
            Some("Chabot Space Center")
        );

        assert_eq!(test_listing().postal_address(), None);
    }
}
