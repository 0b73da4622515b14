//! Homepage tab handlers.
//!
//! The homepage works off one in-memory candidate set (every visible
//! listing with coordinates) run through the pure filters:
//! - GET /api/v1/home/events - upcoming events near the caller
//! - GET /api/v1/home/nearby - one place category, nearest first
//! - GET /api/v1/home/place-types - tab counts
//!
//! "Today" is resolved here, once per request, and passed into the
//! filters; the filters themselves never read a clock.

use crate::{
    cache::cache_key,
    db::DbPool,
    error::AppError,
    filters::{
        self, DEFAULT_MAX_DISTANCE_MILES, PlaceTypeCount, event_count, filter_by_place_type,
        filter_events,
    },
    geo::Coordinates,
    models::listing::{Listing, ListingResponse},
    services::listing_service,
    state::AppState,
};
use axum::{
    Json,
    extract::{Query, State},
};
use chrono::Local;
use serde::{Deserialize, Serialize};

/// Query parameters shared by the homepage endpoints.
#[derive(Debug, Deserialize)]
pub struct HomeQuery {
    pub lat: Option<f64>,
    pub lng: Option<f64>,

    /// Event radius in miles, defaults to 50
    pub max_distance_miles: Option<f64>,

    /// Place category for `/home/nearby`
    pub place_type: Option<String>,
}

impl HomeQuery {
    fn origin(&self) -> Option<Coordinates> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)),
            _ => None,
        }
    }

    fn max_distance(&self) -> f64 {
        self.max_distance_miles.unwrap_or(DEFAULT_MAX_DISTANCE_MILES)
    }

    fn cache_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(lat) = self.lat {
            params.push(("lat", lat.to_string()));
        }
        if let Some(lng) = self.lng {
            params.push(("lng", lng.to_string()));
        }
        if let Some(max) = self.max_distance_miles {
            params.push(("max_distance_miles", max.to_string()));
        }
        if let Some(ref place_type) = self.place_type {
            params.push(("place_type", place_type.clone()));
        }
        params
    }
}

/// Load the candidate set and attach per-request distances.
async fn candidates(pool: &DbPool, origin: Option<Coordinates>) -> Result<Vec<Listing>, AppError> {
    let mut listings = listing_service::candidate_listings(pool).await?;
    for listing in &mut listings {
        listing.attach_distance(origin);
    }
    Ok(listings)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EventsResponse {
    pub data: Vec<ListingResponse>,
    pub count: usize,
}

/// Upcoming events near the caller, soonest first.
///
/// # Endpoint
///
/// `GET /api/v1/home/events?lat=37.77&lng=-122.4&max_distance_miles=50`
pub async fn upcoming_events(
    State(state): State<AppState>,
    Query(query): Query<HomeQuery>,
) -> Result<Json<EventsResponse>, AppError> {
    let key = cache_key("home-events", &query.cache_params());
    let pool = state.pool.clone();
    let origin = query.origin();
    let max_distance = query.max_distance();

    let response = state
        .cache
        .get_cached(&key, state.cache_ttl(), move || async move {
            let today = Local::now().date_naive();
            let listings = candidates(&pool, origin).await?;
            let events = filter_events(&listings, max_distance, today);

            let data: Vec<ListingResponse> =
                events.into_iter().map(ListingResponse::from).collect();
            let count = data.len();
            Ok::<_, AppError>(EventsResponse { data, count })
        })
        .await?;

    Ok(Json(response))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NearbyResponse {
    pub place_type: String,
    pub data: Vec<ListingResponse>,
}

/// Current listings of one place category, nearest first.
///
/// # Endpoint
///
/// `GET /api/v1/home/nearby?place_type=Museum&lat=37.77&lng=-122.4`
pub async fn nearby_by_place_type(
    State(state): State<AppState>,
    Query(query): Query<HomeQuery>,
) -> Result<Json<NearbyResponse>, AppError> {
    let Some(place_type) = query.place_type.clone() else {
        return Err(AppError::InvalidRequest(
            "place_type is required".to_string(),
        ));
    };

    let key = cache_key("home-nearby", &query.cache_params());
    let pool = state.pool.clone();
    let origin = query.origin();

    let response = state
        .cache
        .get_cached(&key, state.cache_ttl(), move || async move {
            let today = Local::now().date_naive();
            let listings = candidates(&pool, origin).await?;
            let matches = filter_by_place_type(&listings, &place_type, today);

            Ok::<_, AppError>(NearbyResponse {
                place_type,
                data: matches.into_iter().map(ListingResponse::from).collect(),
            })
        })
        .await?;

    Ok(Json(response))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PlaceTypesResponse {
    /// Count for the "Events" tab (same predicate as `/home/events`,
    /// without materializing the list)
    pub event_count: usize,

    /// Per-category counts for the remaining tabs, largest first
    pub place_types: Vec<PlaceTypeCount>,
}

/// Tab counts for the homepage.
///
/// # Endpoint
///
/// `GET /api/v1/home/place-types?lat=37.77&lng=-122.4`
pub async fn place_types(
    State(state): State<AppState>,
    Query(query): Query<HomeQuery>,
) -> Result<Json<PlaceTypesResponse>, AppError> {
    let key = cache_key("home-place-types", &query.cache_params());
    let pool = state.pool.clone();
    let origin = query.origin();
    let max_distance = query.max_distance();

    let response = state
        .cache
        .get_cached(&key, state.cache_ttl(), move || async move {
            let today = Local::now().date_naive();
            let listings = candidates(&pool, origin).await?;

            Ok::<_, AppError>(PlaceTypesResponse {
                event_count: event_count(&listings, max_distance, today),
                place_types: filters::place_type_counts(&listings, today),
            })
        })
        .await?;

    Ok(Json(response))
}
