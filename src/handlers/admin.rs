//! Admin/maintenance HTTP handlers.
//!
//! This module implements the authenticated maintenance endpoints:
//! - POST /api/v1/admin/geocode - backfill missing coordinates
//! - POST /api/v1/admin/hide-past-events - soft-delete finished events
//! - POST /api/v1/admin/refresh-place-details - refresh stale enrichment
//! - POST /api/v1/admin/backfill-images - fill missing images
//! - POST /api/v1/admin/cache/invalidate - bulk-delete cache entries
//!
//! Each job runs inline in the request and returns a small JSON report.
//! Jobs that mutate listings invalidate the listing caches afterwards
//! so clients don't wait out the TTL to see the fix.

use crate::{
    error::AppError,
    middleware::auth::AuthContext,
    services::{
        geocoding_service::GeocodingService,
        image_service::ImageService,
        maintenance_service::{
            self, GeocodeReport, ImageReport, PlaceDetailsReport,
        },
        place_details_service::PlaceDetailsService,
    },
    state::AppState,
};
use axum::{Extension, Json, extract::State};
use chrono::Local;
use serde::{Deserialize, Serialize};

/// Default batch size for the enrichment jobs.
const DEFAULT_BATCH_LIMIT: i64 = 25;

/// Request body shared by the batch jobs.
#[derive(Debug, Default, Deserialize)]
pub struct BatchRequest {
    /// Max rows to process this run, defaults to 25
    pub limit: Option<i64>,
}

impl BatchRequest {
    fn limit(&self) -> Result<i64, AppError> {
        let limit = self.limit.unwrap_or(DEFAULT_BATCH_LIMIT);
        if limit < 1 {
            return Err(AppError::InvalidRequest(
                "limit must be positive".to_string(),
            ));
        }
        Ok(limit)
    }
}

/// Drop every cached listing-derived response.
///
/// Called after any job that mutates listings; failures inside are
/// logged, not surfaced.
async fn invalidate_listing_caches(state: &AppState) {
    for pattern in ["listings:*", "search:*", "home-*"] {
        state.cache.invalidate(pattern).await;
    }
}

/// Geocode listings missing coordinates.
///
/// # Endpoint
///
/// `POST /api/v1/admin/geocode`
///
/// # Request Body
///
/// ```json
/// { "limit": 25 }
/// ```
///
/// # Response (200 OK)
///
/// ```json
/// { "processed": 25, "geocoded": 19 }
/// ```
///
/// Runs at Nominatim's one-request-per-second pace, so large batches
/// take a while; keep `limit` modest.
pub async fn geocode(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<BatchRequest>,
) -> Result<Json<GeocodeReport>, AppError> {
    let limit = request.limit()?;
    tracing::info!(admin = %auth.label, limit, "starting geocode job");

    let geocoder = GeocodingService::new(&state.config.nominatim_base_url)?;
    let report = maintenance_service::geocode_missing(&state.pool, &geocoder, limit).await?;

    if report.geocoded > 0 {
        invalidate_listing_caches(&state).await;
    }

    Ok(Json(report))
}

#[derive(Debug, Serialize)]
pub struct HidePastEventsResponse {
    pub hidden: u64,
}

/// Hide events whose day has passed.
///
/// # Endpoint
///
/// `POST /api/v1/admin/hide-past-events`
///
/// # Response (200 OK)
///
/// ```json
/// { "hidden": 12 }
/// ```
pub async fn hide_past_events(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<HidePastEventsResponse>, AppError> {
    let today = Local::now().date_naive();
    tracing::info!(admin = %auth.label, %today, "starting hide-past-events job");

    let hidden = maintenance_service::hide_past_events(&state.pool, today).await?;

    if hidden > 0 {
        invalidate_listing_caches(&state).await;
    }

    Ok(Json(HidePastEventsResponse { hidden }))
}

/// Refresh stale Google Place details.
///
/// # Endpoint
///
/// `POST /api/v1/admin/refresh-place-details`
///
/// # Response (200 OK)
///
/// ```json
/// { "processed": 25, "refreshed_full": 3, "refreshed_hours": 9 }
/// ```
///
/// # Errors
///
/// - **502**: `GOOGLE_PLACES_API_KEY` is not configured
pub async fn refresh_place_details(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<BatchRequest>,
) -> Result<Json<PlaceDetailsReport>, AppError> {
    let limit = request.limit()?;
    let api_key = state.config.google_places_api_key.clone().ok_or_else(|| {
        AppError::ExternalService("GOOGLE_PLACES_API_KEY is not configured".to_string())
    })?;

    tracing::info!(admin = %auth.label, limit, "starting place-details refresh job");

    let places = PlaceDetailsService::new(api_key)?;
    let report = maintenance_service::refresh_place_details(&state.pool, &places, limit).await?;

    // Detail blobs feed the detail page, which is served uncached by
    // id; no invalidation needed here.
    Ok(Json(report))
}

/// Backfill missing listing images from Unsplash.
///
/// # Endpoint
///
/// `POST /api/v1/admin/backfill-images`
///
/// # Response (200 OK)
///
/// ```json
/// { "processed": 25, "updated": 21 }
/// ```
///
/// # Errors
///
/// - **502**: `UNSPLASH_ACCESS_KEY` is not configured
pub async fn backfill_images(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<BatchRequest>,
) -> Result<Json<ImageReport>, AppError> {
    let limit = request.limit()?;
    let access_key = state.config.unsplash_access_key.clone().ok_or_else(|| {
        AppError::ExternalService("UNSPLASH_ACCESS_KEY is not configured".to_string())
    })?;

    tracing::info!(admin = %auth.label, limit, "starting image backfill job");

    let images = ImageService::new(access_key)?;
    let report = maintenance_service::backfill_images(&state.pool, &images, limit).await?;

    if report.updated > 0 {
        invalidate_listing_caches(&state).await;
    }

    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct InvalidateCacheRequest {
    /// Glob pattern, e.g. `listings:*`
    pub pattern: String,
}

#[derive(Debug, Serialize)]
pub struct InvalidateCacheResponse {
    pub pattern: String,
}

/// Bulk-delete cache entries matching a pattern.
///
/// # Endpoint
///
/// `POST /api/v1/admin/cache/invalidate`
///
/// # Request Body
///
/// ```json
/// { "pattern": "listings:*" }
/// ```
///
/// Used when underlying data changed outside the normal TTL window.
/// Backend failures during invalidation are logged and ignored (stale
/// entries then simply expire via TTL), so this endpoint only fails on
/// a bad request.
pub async fn invalidate_cache(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<InvalidateCacheRequest>,
) -> Result<Json<InvalidateCacheResponse>, AppError> {
    if request.pattern.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "pattern must not be empty".to_string(),
        ));
    }

    tracing::info!(admin = %auth.label, pattern = %request.pattern, "invalidating cache");
    state.cache.invalidate(&request.pattern).await;

    Ok(Json(InvalidateCacheResponse {
        pattern: request.pattern,
    }))
}
