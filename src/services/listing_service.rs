//! Listing queries - the database side of the listing endpoints.
//!
//! These are plain pool-taking functions, like everything else in the
//! services layer. The paginated queries return a [`ListingPage`] that
//! is JSON-serializable in both directions, because pages are what the
//! read-through cache stores.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::AppError;
use crate::geo::Coordinates;
use crate::models::listing::{Listing, ListingQuery, ListingResponse};

/// Page size when the caller doesn't specify one.
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Hard cap on page size.
pub const MAX_PAGE_SIZE: i64 = 100;

/// One page of listings plus pagination bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingPage {
    pub data: Vec<ListingResponse>,
    pub count: i64,
    pub has_more: bool,
}

fn page_bounds(offset: Option<i64>, limit: Option<i64>) -> (i64, i64) {
    let offset = offset.unwrap_or(0).max(0);
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    (offset, limit)
}

fn to_page(rows: Vec<Listing>, count: i64, offset: i64, origin: Option<Coordinates>) -> ListingPage {
    let data: Vec<ListingResponse> = rows
        .into_iter()
        .map(|mut listing| {
            listing.attach_distance(origin);
            ListingResponse::from(listing)
        })
        .collect();

    let has_more = offset + (data.len() as i64) < count;

    ListingPage {
        data,
        count,
        has_more,
    }
}

/// List visible listings with optional filters and pagination.
///
/// Every filter is optional; absent filters collapse to `TRUE` in SQL
/// via the `($n IS NULL OR ...)` pattern, so one static query covers
/// all parameter combinations. Hidden rows never appear.
///
/// When the caller supplied coordinates, `distance` is attached to
/// every returned row.
pub async fn list_listings(pool: &DbPool, query: &ListingQuery) -> Result<ListingPage, AppError> {
    let (offset, limit) = page_bounds(query.offset, query.limit);
    let listing_type = query.listing_type.map(|t| t.as_str());

    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM listings
        WHERE NOT hidden
          AND ($1::text IS NULL OR listing_type = $1)
          AND ($2::text IS NULL OR lower(place_type) = lower($2))
          AND ($3::text IS NULL OR city ILIKE $3)
          AND ($4::boolean IS NULL OR recommended = $4)
        "#,
    )
    .bind(listing_type)
    .bind(&query.place_type)
    .bind(&query.city)
    .bind(query.recommended)
    .fetch_one(pool)
    .await?;

    let rows = sqlx::query_as::<_, Listing>(
        r#"
        SELECT * FROM listings
        WHERE NOT hidden
          AND ($1::text IS NULL OR listing_type = $1)
          AND ($2::text IS NULL OR lower(place_type) = lower($2))
          AND ($3::text IS NULL OR city ILIKE $3)
          AND ($4::boolean IS NULL OR recommended = $4)
        ORDER BY start_date ASC NULLS LAST, created_at DESC
        LIMIT $5 OFFSET $6
        "#,
    )
    .bind(listing_type)
    .bind(&query.place_type)
    .bind(&query.city)
    .bind(query.recommended)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(to_page(rows, count, offset, query.origin()))
}

/// Full-text-ish search over title and description.
pub async fn search_listings(
    pool: &DbPool,
    term: &str,
    origin: Option<Coordinates>,
    offset: Option<i64>,
    limit: Option<i64>,
) -> Result<ListingPage, AppError> {
    let (offset, limit) = page_bounds(offset, limit);
    let pattern = format!("%{}%", term);

    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM listings
        WHERE NOT hidden
          AND (title ILIKE $1 OR description ILIKE $1)
        "#,
    )
    .bind(&pattern)
    .fetch_one(pool)
    .await?;

    let rows = sqlx::query_as::<_, Listing>(
        r#"
        SELECT * FROM listings
        WHERE NOT hidden
          AND (title ILIKE $1 OR description ILIKE $1)
        ORDER BY start_date ASC NULLS LAST, created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(&pattern)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(to_page(rows, count, offset, origin))
}

/// Get a single visible listing by internal ID.
pub async fn get_listing(pool: &DbPool, id: Uuid) -> Result<Listing, AppError> {
    sqlx::query_as::<_, Listing>("SELECT * FROM listings WHERE id = $1 AND NOT hidden")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::ListingNotFound)
}

/// The candidate set for the in-memory homepage filters: every visible
/// listing that has coordinates.
///
/// Expected cardinality is low thousands; the filters are a linear scan
/// over this vec.
pub async fn candidate_listings(pool: &DbPool) -> Result<Vec<Listing>, AppError> {
    let rows = sqlx::query_as::<_, Listing>(
        r#"
        SELECT * FROM listings
        WHERE NOT hidden
          AND latitude IS NOT NULL
          AND longitude IS NOT NULL
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
