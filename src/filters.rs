//! Pure filters over an in-memory listing collection.
//!
//! These back the homepage tabs: upcoming events near the caller,
//! listings of one place category, and per-category counts. Callers
//! load the whole candidate set (low thousands of rows), attach
//! per-request distances, and hand it here; a linear scan with simple
//! predicates is the whole design.
//!
//! Two conventions hold throughout:
//!
//! - "Today" is an explicit [`NaiveDate`] parameter. Nothing in this
//!   module reads a clock, so tests pass a fixed date.
//! - A listing whose transient `distance` was never computed (the
//!   caller supplied no point) sorts as distance 0 and passes every
//!   radius check. One policy, applied everywhere.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::listing::{Listing, ListingType};

/// Default radius for event filtering, in miles.
pub const DEFAULT_MAX_DISTANCE_MILES: f64 = 50.0;

/// The single "distance unknown" policy: treat as 0 miles.
fn distance_or_zero(listing: &Listing) -> f64 {
    listing.distance.unwrap_or(0.0)
}

/// The shared inclusion predicate of [`filter_events`] and
/// [`event_count`]: a current, locatable event within range.
///
/// Day-level comparison keeps same-day events visible regardless of
/// their time-of-day.
fn is_current_event(listing: &Listing, max_distance_miles: f64, today: NaiveDate) -> bool {
    listing.listing_type == ListingType::Event
        && listing.coordinates().is_some()
        && matches!(listing.start_day(), Some(day) if day >= today)
        && distance_or_zero(listing) <= max_distance_miles
}

/// Upcoming events near the caller.
///
/// Keeps `type = Event` listings with coordinates, a start day of
/// `today` or later, and a distance within `max_distance_miles`.
/// Sorted ascending by start date; ties broken by ascending distance.
pub fn filter_events(
    listings: &[Listing],
    max_distance_miles: f64,
    today: NaiveDate,
) -> Vec<Listing> {
    let mut events: Vec<Listing> = listings
        .iter()
        .filter(|l| is_current_event(l, max_distance_miles, today))
        .cloned()
        .collect();

    events.sort_by(|a, b| {
        a.start_date
            .cmp(&b.start_date)
            .then(distance_or_zero(a).total_cmp(&distance_or_zero(b)))
    });

    events
}

/// Count of listings matching the [`filter_events`] predicate, without
/// materializing the sorted result.
pub fn event_count(listings: &[Listing], max_distance_miles: f64, today: NaiveDate) -> usize {
    listings
        .iter()
        .filter(|l| is_current_event(l, max_distance_miles, today))
        .count()
}

/// Listings of one place category, nearest first.
///
/// Keeps listings with coordinates whose `place_type` matches
/// case-insensitively and which are not past-dated. Listings without a
/// `start_date` (standing activities) are always kept.
pub fn filter_by_place_type(
    listings: &[Listing],
    place_type: &str,
    today: NaiveDate,
) -> Vec<Listing> {
    let mut matches: Vec<Listing> = listings
        .iter()
        .filter(|l| {
            l.coordinates().is_some()
                && l.place_type
                    .as_deref()
                    .is_some_and(|t| t.eq_ignore_ascii_case(place_type))
                && !l.is_past(today)
        })
        .cloned()
        .collect();

    matches.sort_by(|a, b| distance_or_zero(a).total_cmp(&distance_or_zero(b)));

    matches
}

/// One place category and how many current listings it has.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceTypeCount {
    pub place_type: String,
    pub count: usize,
}

/// Per-category counts over the current, locatable listings.
///
/// Counts every listing with coordinates and a `place_type` that is not
/// past-dated. Ordered by descending count; ties are broken by
/// ascending type name so the output is deterministic.
pub fn place_type_counts(listings: &[Listing], today: NaiveDate) -> Vec<PlaceTypeCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();

    for listing in listings {
        if listing.coordinates().is_none() || listing.is_past(today) {
            continue;
        }
        if let Some(place_type) = listing.place_type.as_deref() {
            *counts.entry(place_type).or_insert(0) += 1;
        }
    }

    let mut out: Vec<PlaceTypeCount> = counts
        .into_iter()
        .map(|(place_type, count)| PlaceTypeCount {
            place_type: place_type.to_string(),
            count,
        })
        .collect();

    out.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.place_type.cmp(&b.place_type))
    });

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::listing::test_listing;
    use chrono::{DateTime, Local, NaiveTime, TimeZone, Utc};

    /// A fixed "today" for every test in this module.
    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    /// A timestamp that falls on the given local calendar day.
    ///
    /// Built through the local zone so `Listing::start_day` round-trips
    /// exactly on any machine.
    fn local_day(date: NaiveDate, hour: u32) -> DateTime<Utc> {
        let naive = date.and_time(NaiveTime::from_hms_opt(hour, 0, 0).unwrap());
        Local
            .from_local_datetime(&naive)
            .single()
            .unwrap()
            .with_timezone(&Utc)
    }

    fn event(start: DateTime<Utc>, distance: f64) -> Listing {
        Listing {
            listing_type: ListingType::Event,
            latitude: Some(37.77),
            longitude: Some(-122.4),
            start_date: Some(start),
            distance: Some(distance),
            ..test_listing()
        }
    }

    fn place(place_type: &str, distance: f64) -> Listing {
        Listing {
            place_type: Some(place_type.to_string()),
            latitude: Some(37.77),
            longitude: Some(-122.4),
            distance: Some(distance),
            ..test_listing()
        }
    }

    #[test]
    fn same_day_events_stay_visible_all_day() {
        // An event earlier today (by time-of-day) is still current.
        let listings = vec![event(local_day(today(), 0), 1.0)];
        assert_eq!(filter_events(&listings, 50.0, today()).len(), 1);
    }

    #[test]
    fn yesterdays_events_are_excluded() {
        let yesterday = today().pred_opt().unwrap();
        let listings = vec![
            event(local_day(today(), 14), 1.0),
            event(local_day(yesterday, 23), 1.0),
        ];
        let current = filter_events(&listings, 50.0, today());
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].start_day(), Some(today()));
    }

    #[test]
    fn events_need_coordinates_and_a_start_date() {
        let mut no_coords = event(local_day(today(), 10), 1.0);
        no_coords.latitude = None;

        let mut no_date = event(local_day(today(), 10), 1.0);
        no_date.start_date = None;

        assert!(filter_events(&[no_coords, no_date], 50.0, today()).is_empty());
    }

    #[test]
    fn events_beyond_the_radius_are_excluded() {
        let listings = vec![
            event(local_day(today(), 10), 49.9),
            event(local_day(today(), 10), 50.1),
        ];
        let current = filter_events(&listings, 50.0, today());
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].distance, Some(49.9));
    }

    #[test]
    fn unknown_distance_counts_as_zero() {
        let mut unknown = event(local_day(today(), 10), 0.0);
        unknown.distance = None;
        let listings = vec![unknown, event(local_day(today(), 10), 3.0)];

        let current = filter_events(&listings, 50.0, today());
        assert_eq!(current.len(), 2);
        // Distance 0 sorts ahead of 3.0 on the same day.
        assert_eq!(current[0].distance, None);
    }

    #[test]
    fn events_sort_by_start_date_then_distance() {
        let tomorrow = today().succ_opt().unwrap();
        let listings = vec![
            event(local_day(tomorrow, 9), 2.0),
            event(local_day(today(), 18), 7.0),
            event(local_day(today(), 18), 1.5),
        ];

        let current = filter_events(&listings, 50.0, today());
        let keys: Vec<(Option<NaiveDate>, Option<f64>)> = current
            .iter()
            .map(|l| (l.start_day(), l.distance))
            .collect();
        assert_eq!(
            keys,
            vec![
                (Some(today()), Some(1.5)),
                (Some(today()), Some(7.0)),
                (Some(tomorrow), Some(2.0)),
            ]
        );
    }

    #[test]
    fn event_count_matches_filter_events() {
        let yesterday = today().pred_opt().unwrap();
        let listings = vec![
            event(local_day(today(), 10), 1.0),
            event(local_day(yesterday, 10), 1.0),
            event(local_day(today(), 10), 80.0),
            place("Museum", 1.0),
        ];
        assert_eq!(
            event_count(&listings, 50.0, today()),
            filter_events(&listings, 50.0, today()).len()
        );
    }

    #[test]
    fn place_type_matches_case_insensitively() {
        let listings = vec![place("Museum", 4.0), place("museum", 2.0), place("Park", 1.0)];
        let museums = filter_by_place_type(&listings, "MUSEUM", today());
        assert_eq!(museums.len(), 2);
        // Nearest first.
        assert_eq!(museums[0].distance, Some(2.0));
    }

    #[test]
    fn place_type_filter_never_includes_coordinate_less_rows() {
        let mut missing = place("Park", 0.0);
        missing.longitude = None;
        assert!(filter_by_place_type(&[missing], "Park", today()).is_empty());
    }

    #[test]
    fn place_type_filter_keeps_undated_listings_and_drops_past_ones() {
        let yesterday = today().pred_opt().unwrap();

        let standing = place("Park", 1.0);
        let mut past = place("Park", 1.0);
        past.start_date = Some(local_day(yesterday, 10));

        let kept = filter_by_place_type(&[standing, past], "Park", today());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].start_date, None);
    }

    #[test]
    fn counts_sum_to_the_inclusion_predicate() {
        let yesterday = today().pred_opt().unwrap();

        let mut no_coords = place("Museum", 0.0);
        no_coords.latitude = None;
        let mut past = place("Park", 1.0);
        past.start_date = Some(local_day(yesterday, 10));
        let untyped = Listing {
            latitude: Some(37.77),
            longitude: Some(-122.4),
            ..test_listing()
        };

        let listings = vec![
            place("Museum", 1.0),
            place("Museum", 2.0),
            place("Park", 3.0),
            no_coords,
            past,
            untyped,
        ];

        let counts = place_type_counts(&listings, today());
        let total: usize = counts.iter().map(|c| c.count).sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn counts_order_descending_with_name_tiebreak() {
        let listings = vec![
            place("Park", 1.0),
            place("Museum", 1.0),
            place("Museum", 2.0),
            place("Aquarium", 3.0),
        ];

        let counts = place_type_counts(&listings, today());
        assert_eq!(
            counts,
            vec![
                PlaceTypeCount {
                    place_type: "Museum".to_string(),
                    count: 2
                },
                PlaceTypeCount {
                    place_type: "Aquarium".to_string(),
                    count: 1
                },
                PlaceTypeCount {
                    place_type: "Park".to_string(),
                    count: 1
                },
            ]
        );
    }
}
