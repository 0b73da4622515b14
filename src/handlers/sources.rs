//! Source carousel handler.
//!
//! - GET /api/v1/sources - every source, featured first

use crate::{
    error::AppError,
    models::source::{Source, SourceResponse},
    state::AppState,
};
use axum::{Json, extract::State};

/// List sources for the front-page carousel.
///
/// # Endpoint
///
/// `GET /api/v1/sources`
///
/// # Ordering
///
/// Featured sources first, then alphabetical. The set is small and
/// changes rarely, so this endpoint is not cached.
pub async fn list_sources(
    State(state): State<AppState>,
) -> Result<Json<Vec<SourceResponse>>, AppError> {
    let sources = sqlx::query_as::<_, Source>(
        r#"
        SELECT id, name, logo, url, featured_source, created_at
        FROM sources
        ORDER BY featured_source DESC, name ASC
        "#,
    )
    .fetch_all(&state.pool)
    .await?;

    let responses: Vec<SourceResponse> = sources.into_iter().map(Into::into).collect();

    Ok(Json(responses))
}
