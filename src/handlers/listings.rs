//! Listing HTTP handlers.
//!
//! This module implements the listing-related API endpoints:
//! - GET /api/v1/listings - Paginated, filterable listing index
//! - GET /api/v1/listings/:id - Single listing by ID
//! - GET /api/v1/search - Title/description search
//!
//! The index and search go through the read-through cache; the cache
//! key encodes every query parameter (sorted), so logically-identical
//! requests share an entry regardless of parameter order.

use crate::{
    cache::cache_key,
    error::AppError,
    models::listing::{ListingQuery, ListingResponse},
    services::listing_service::{self, ListingPage},
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use uuid::Uuid;

/// Collect the present query parameters as (name, value) pairs for the
/// cache key. Absent parameters are omitted entirely, so "no filter"
/// and "filter absent" key identically.
fn listing_cache_params(query: &ListingQuery) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    if let Some(t) = query.listing_type {
        params.push(("type", t.as_str().to_string()));
    }
    if let Some(ref place_type) = query.place_type {
        params.push(("place_type", place_type.clone()));
    }
    if let Some(ref city) = query.city {
        params.push(("city", city.clone()));
    }
    if let Some(recommended) = query.recommended {
        params.push(("recommended", recommended.to_string()));
    }
    if let Some(offset) = query.offset {
        params.push(("offset", offset.to_string()));
    }
    if let Some(limit) = query.limit {
        params.push(("limit", limit.to_string()));
    }
    if let Some(lat) = query.lat {
        params.push(("lat", lat.to_string()));
    }
    if let Some(lng) = query.lng {
        params.push(("lng", lng.to_string()));
    }
    params
}

/// List visible listings.
///
/// # Endpoint
///
/// `GET /api/v1/listings`
///
/// # Query Parameters
///
/// - `type` - Event | Activity | Camp
/// - `place_type` - place category, case-insensitive
/// - `city` - case-insensitive
/// - `recommended` - editorial flag
/// - `offset`, `limit` - pagination (default 0 / 20, limit capped at 100)
/// - `lat`, `lng` - caller point; attaches `distance` to each row
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "data": [ { "id": "...", "title": "...", "distance": 2.4, ... } ],
///   "count": 57,
///   "has_more": true
/// }
/// ```
pub async fn list_listings(
    State(state): State<AppState>,
    Query(query): Query<ListingQuery>,
) -> Result<Json<ListingPage>, AppError> {
    let key = cache_key("listings", &listing_cache_params(&query));

    let page = state
        .cache
        .get_cached(&key, state.cache_ttl(), || {
            listing_service::list_listings(&state.pool, &query)
        })
        .await?;

    Ok(Json(page))
}

/// Get a specific listing by ID.
///
/// # Endpoint
///
/// `GET /api/v1/listings/{id}`
///
/// # Response
///
/// - **Success (200 OK)**: The listing, including any cached place
///   details for the detail page
/// - **Error (404)**: Listing doesn't exist or is hidden
pub async fn get_listing(
    State(state): State<AppState>,
    Path(listing_id): Path<Uuid>,
) -> Result<Json<ListingResponse>, AppError> {
    let listing = listing_service::get_listing(&state.pool, listing_id).await?;

    Ok(Json(listing.into()))
}

/// Query parameters for `GET /api/v1/search`.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// Search term, matched against title and description
    pub q: String,

    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

/// Search listings by title or description.
///
/// # Endpoint
///
/// `GET /api/v1/search?q=aquarium`
///
/// Same response shape and caching behavior as the index, under the
/// `search:` namespace.
pub async fn search_listings(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ListingPage>, AppError> {
    let term = query.q.trim();
    if term.is_empty() {
        return Err(AppError::InvalidRequest(
            "Search term must not be empty".to_string(),
        ));
    }

    let mut params = vec![("q", term.to_string())];
    if let Some(lat) = query.lat {
        params.push(("lat", lat.to_string()));
    }
    if let Some(lng) = query.lng {
        params.push(("lng", lng.to_string()));
    }
    if let Some(offset) = query.offset {
        params.push(("offset", offset.to_string()));
    }
    if let Some(limit) = query.limit {
        params.push(("limit", limit.to_string()));
    }
    let key = cache_key("search", &params);

    let origin = match (query.lat, query.lng) {
        (Some(lat), Some(lng)) => Some(crate::geo::Coordinates::new(lat, lng)),
        _ => None,
    };

    let page = state
        .cache
        .get_cached(&key, state.cache_ttl(), || {
            listing_service::search_listings(&state.pool, term, origin, query.offset, query.limit)
        })
        .await?;

    Ok(Json(page))
}
