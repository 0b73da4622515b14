//! Typed shape of the cached Google Places enrichment blob.
//!
//! The blob is persisted as jsonb in `listings.google_place_details`.
//! Freshness is governed by two independent windows:
//!
//! - **Opening hours**: stale after 48 hours. A hours-only refresh
//!   rewrites `opening_hours` and the blob-internal `hours_updated_at`
//!   without touching anything else.
//! - **Full details** (photos, rating, reviews, hours): stale after
//!   7 days, tracked by the `place_details_updated_at` column.
//!
//! Both checks take `now` as a parameter so tests control the clock.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Opening hours are considered stale after this many hours.
pub const HOURS_TTL_HOURS: i64 = 48;

/// The full details blob is considered stale after this many days.
pub const DETAILS_TTL_DAYS: i64 = 7;

/// Cached place enrichment, as stored in `listings.google_place_details`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlaceDetails {
    pub opening_hours: Option<OpeningHours>,

    /// When `opening_hours` was last refreshed. Lives inside the blob
    /// so a hours-only refresh does not touch the column-level
    /// `place_details_updated_at`.
    pub hours_updated_at: Option<DateTime<Utc>>,

    pub rating: Option<f64>,
    pub user_ratings_total: Option<i64>,

    #[serde(default)]
    pub reviews: Vec<Review>,

    /// Google photo references, resolved to URLs by the front end
    #[serde(default)]
    pub photos: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpeningHours {
    pub open_now: Option<bool>,

    /// Human-readable lines, e.g. "Monday: 9:00 AM – 5:00 PM"
    #[serde(default)]
    pub weekday_text: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub author_name: Option<String>,
    pub rating: Option<f64>,
    pub text: Option<String>,
    pub relative_time_description: Option<String>,
}

impl PlaceDetails {
    /// Whether the opening-hours sub-field is still within its 48h window.
    pub fn hours_fresh(&self, now: DateTime<Utc>) -> bool {
        match self.hours_updated_at {
            Some(at) => now - at < Duration::hours(HOURS_TTL_HOURS),
            None => false,
        }
    }
}

/// Whether the full blob is still within its 7-day window, given the
/// column-level `place_details_updated_at`.
pub fn details_fresh(updated_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match updated_at {
        Some(at) => now - at < Duration::days(DETAILS_TTL_DAYS),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hours_freshness_window_is_48_hours() {
        let now = Utc::now();
        let details = PlaceDetails {
            hours_updated_at: Some(now - Duration::hours(47)),
            ..Default::default()
        };
        assert!(details.hours_fresh(now));

        let stale = PlaceDetails {
            hours_updated_at: Some(now - Duration::hours(49)),
            ..Default::default()
        };
        assert!(!stale.hours_fresh(now));

        assert!(!PlaceDetails::default().hours_fresh(now));
    }

    #[test]
    fn details_freshness_window_is_7_days() {
        let now = Utc::now();
        assert!(details_fresh(Some(now - Duration::days(6)), now));
        assert!(!details_fresh(Some(now - Duration::days(8)), now));
        assert!(!details_fresh(None, now));
    }

    #[test]
    fn hours_refresh_leaves_rest_of_blob_alone() {
        let now = Utc::now();
        let mut details = PlaceDetails {
            rating: Some(4.5),
            user_ratings_total: Some(212),
            photos: vec!["photo-ref-1".to_string()],
            hours_updated_at: Some(now - Duration::hours(72)),
            ..Default::default()
        };

        // Simulate what the maintenance job does for a hours-only refresh.
        details.opening_hours = Some(OpeningHours {
            open_now: Some(true),
            weekday_text: vec!["Monday: 9:00 AM – 5:00 PM".to_string()],
        });
        details.hours_updated_at = Some(now);

        assert!(details.hours_fresh(now));
        assert_eq!(details.rating, Some(4.5));
        assert_eq!(details.photos, vec!["photo-ref-1".to_string()]);
    }

    #[test]
    fn blob_round_trips_through_json() {
        let details = PlaceDetails {
            rating: Some(4.2),
            reviews: vec![Review {
                author_name: Some("A. Parent".to_string()),
                rating: Some(5.0),
                text: Some("Great with kids".to_string()),
                relative_time_description: Some("a month ago".to_string()),
            }],
            ..Default::default()
        };

        let value = serde_json::to_value(&details).unwrap();
        let back: PlaceDetails = serde_json::from_value(value).unwrap();
        assert_eq!(back.rating, Some(4.2));
        assert_eq!(back.reviews.len(), 1);
    }
}
