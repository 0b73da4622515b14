//! Maintenance jobs run via the admin endpoints.
//!
//! Each job walks a bounded batch of rows and applies one fix:
//! geocoding missing coordinates, hiding past events, refreshing place
//! details, or backfilling images. A failure on one row is logged and
//! the job moves on; only a failure to run at all (bad config, dead
//! database) surfaces as an error.

use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use std::time::Duration;

use crate::db::DbPool;
use crate::error::AppError;
use crate::models::listing::Listing;
use crate::models::place_details::PlaceDetails;
use crate::services::geocoding_service::GeocodingService;
use crate::services::image_service::ImageService;
use crate::services::place_details_service::{PlaceDetailsService, RefreshKind, refresh_kind};

/// Nominatim usage policy: at most one request per second.
const GEOCODE_DELAY: Duration = Duration::from_secs(1);

/// Spacing between Google Places / Unsplash requests.
const ENRICHMENT_DELAY: Duration = Duration::from_millis(200);

/// Outcome of a geocoding batch.
#[derive(Debug, Serialize)]
pub struct GeocodeReport {
    pub processed: usize,
    pub geocoded: usize,
}

/// Geocode listings that have no coordinates yet.
///
/// Walks up to `limit` visible rows missing a coordinate, builds a
/// postal-address query per row, and writes back whatever Nominatim
/// resolves. Rows without any address material, without a match, or
/// hitting an upstream error are skipped.
pub async fn geocode_missing(
    pool: &DbPool,
    geocoder: &GeocodingService,
    limit: i64,
) -> Result<GeocodeReport, AppError> {
    let rows = sqlx::query_as::<_, Listing>(
        r#"
        SELECT * FROM listings
        WHERE NOT hidden
          AND (latitude IS NULL OR longitude IS NULL)
        ORDER BY created_at DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    let processed = rows.len();
    let mut geocoded = 0;

    for listing in &rows {
        let Some(address) = listing.postal_address() else {
            tracing::debug!(listing = %listing.id, "no address material to geocode from");
            continue;
        };

        match geocoder.geocode(&address).await {
            Ok(Some(result)) => {
                if let Some(coords) = result.coordinates() {
                    sqlx::query(
                        "UPDATE listings SET latitude = $1, longitude = $2, updated_at = NOW() WHERE id = $3",
                    )
                    .bind(coords.latitude)
                    .bind(coords.longitude)
                    .bind(listing.id)
                    .execute(pool)
                    .await?;

                    tracing::info!(listing = %listing.id, %address, "geocoded");
                    geocoded += 1;
                }
            }
            Ok(None) => {
                tracing::info!(listing = %listing.id, %address, "no geocoding match");
            }
            Err(e) => {
                // Skip the row; the next run will retry it.
                tracing::error!(listing = %listing.id, error = %e, "geocoding failed");
            }
        }

        tokio::time::sleep(GEOCODE_DELAY).await;
    }

    Ok(GeocodeReport {
        processed,
        geocoded,
    })
}

/// The caller's local midnight, as a UTC instant.
///
/// Events strictly before this are "past" at day granularity. Falls
/// back to UTC midnight if the local zone has no midnight that day.
fn local_midnight(today: NaiveDate) -> DateTime<Utc> {
    let naive = today.and_time(NaiveTime::MIN);
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}

/// Soft-delete events whose day has passed.
///
/// Same-day events are untouched: only rows with a `start_date` before
/// today's local midnight are hidden.
pub async fn hide_past_events(pool: &DbPool, today: NaiveDate) -> Result<u64, AppError> {
    let cutoff = local_midnight(today);

    let hidden = sqlx::query(
        r#"
        UPDATE listings
        SET hidden = TRUE, updated_at = NOW()
        WHERE listing_type = 'Event'
          AND NOT hidden
          AND start_date IS NOT NULL
          AND start_date < $1
        "#,
    )
    .bind(cutoff)
    .execute(pool)
    .await?
    .rows_affected();

    tracing::info!(hidden, %cutoff, "hid past events");

    Ok(hidden)
}

/// Outcome of a place-details refresh batch.
#[derive(Debug, Serialize)]
pub struct PlaceDetailsReport {
    pub processed: usize,
    pub refreshed_full: usize,
    pub refreshed_hours: usize,
}

/// Refresh stale Google Place details.
///
/// Stalest rows first. Per row, [`refresh_kind`] decides between a full
/// refetch (updates the blob and the column timestamp), a hours-only
/// patch (rewrites `opening_hours` inside the blob, leaves the column
/// timestamp alone), or nothing.
pub async fn refresh_place_details(
    pool: &DbPool,
    places: &PlaceDetailsService,
    limit: i64,
) -> Result<PlaceDetailsReport, AppError> {
    let rows = sqlx::query_as::<_, Listing>(
        r#"
        SELECT * FROM listings
        WHERE NOT hidden
          AND place_id IS NOT NULL
        ORDER BY place_details_updated_at ASC NULLS FIRST
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    let processed = rows.len();
    let mut refreshed_full = 0;
    let mut refreshed_hours = 0;

    for listing in &rows {
        let Some(place_id) = listing.place_id.as_deref() else {
            continue;
        };

        // Undecodable blobs (shape drift from an older deploy) count as
        // missing and get fully refetched.
        let details: Option<PlaceDetails> = listing
            .google_place_details
            .clone()
            .and_then(|v| serde_json::from_value(v).ok());

        let now = Utc::now();
        match refresh_kind(details.as_ref(), listing.place_details_updated_at, now) {
            RefreshKind::Fresh => continue,
            RefreshKind::Full => match places.fetch_details(place_id).await {
                Ok(Some(fresh)) => {
                    let blob = serde_json::to_value(&fresh).map_err(|e| {
                        AppError::ExternalService(format!("Failed to serialize details: {e}"))
                    })?;
                    sqlx::query(
                        r#"
                        UPDATE listings
                        SET google_place_details = $1,
                            place_details_updated_at = NOW(),
                            updated_at = NOW()
                        WHERE id = $2
                        "#,
                    )
                    .bind(blob)
                    .bind(listing.id)
                    .execute(pool)
                    .await?;
                    refreshed_full += 1;
                }
                Ok(None) => {
                    tracing::info!(listing = %listing.id, place_id, "no place details returned");
                }
                Err(e) => {
                    tracing::error!(listing = %listing.id, error = %e, "place details fetch failed");
                }
            },
            RefreshKind::HoursOnly => match places.fetch_opening_hours(place_id).await {
                Ok(hours) => {
                    let mut patched = details.unwrap_or_default();
                    patched.opening_hours = hours;
                    patched.hours_updated_at = Some(now);

                    let blob = serde_json::to_value(&patched).map_err(|e| {
                        AppError::ExternalService(format!("Failed to serialize details: {e}"))
                    })?;
                    // Deliberately not touching place_details_updated_at:
                    // a hours-only refresh doesn't reset the 7-day window.
                    sqlx::query(
                        "UPDATE listings SET google_place_details = $1, updated_at = NOW() WHERE id = $2",
                    )
                    .bind(blob)
                    .bind(listing.id)
                    .execute(pool)
                    .await?;
                    refreshed_hours += 1;
                }
                Err(e) => {
                    tracing::error!(listing = %listing.id, error = %e, "opening hours fetch failed");
                }
            },
        }

        tokio::time::sleep(ENRICHMENT_DELAY).await;
    }

    Ok(PlaceDetailsReport {
        processed,
        refreshed_full,
        refreshed_hours,
    })
}

/// Outcome of an image backfill batch.
#[derive(Debug, Serialize)]
pub struct ImageReport {
    pub processed: usize,
    pub updated: usize,
}

/// Fill missing listing images with Unsplash stock photos.
///
/// The search query is the listing's place category when it has one,
/// otherwise its title.
pub async fn backfill_images(
    pool: &DbPool,
    images: &ImageService,
    limit: i64,
) -> Result<ImageReport, AppError> {
    let rows = sqlx::query_as::<_, Listing>(
        r#"
        SELECT * FROM listings
        WHERE NOT hidden
          AND image IS NULL
        ORDER BY created_at DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    let processed = rows.len();
    let mut updated = 0;

    for listing in &rows {
        let query = listing.place_type.as_deref().unwrap_or(&listing.title);

        match images.search_photo(query).await {
            Ok(Some(url)) => {
                sqlx::query("UPDATE listings SET image = $1, updated_at = NOW() WHERE id = $2")
                    .bind(&url)
                    .bind(listing.id)
                    .execute(pool)
                    .await?;
                updated += 1;
            }
            Ok(None) => {
                tracing::info!(listing = %listing.id, query, "no stock photo found");
            }
            Err(e) => {
                tracing::error!(listing = %listing.id, error = %e, "image search failed");
            }
        }

        tokio::time::sleep(ENRICHMENT_DELAY).await;
    }

    Ok(ImageReport { processed, updated })
}
