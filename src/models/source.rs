//! Source (venue/organizer) model.
//!
//! Sources are read-only from the application's perspective: rows are
//! maintained by the ingestion side, and the API only lists them for
//! the front-page carousel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a source record from the database.
///
/// Maps to the `sources` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Source {
    pub id: Uuid,
    pub name: String,
    pub logo: Option<String>,
    pub url: Option<String>,

    /// Featured sources are shown first in the carousel
    pub featured_source: bool,

    pub created_at: DateTime<Utc>,
}

/// Response body for `GET /api/v1/sources`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceResponse {
    pub id: Uuid,
    pub name: String,
    pub logo: Option<String>,
    pub url: Option<String>,
    pub featured_source: bool,
}

impl From<Source> for SourceResponse {
    fn from(source: Source) -> Self {
        Self {
            id: source.id,
            name: source.name,
            logo: source.logo,
            url: source.url,
            featured_source: source.featured_source,
        }
    }
}
