//! Nominatim geocoding client for the coordinate backfill job.
//!
//! Listings arrive from providers with postal addresses but often no
//! coordinates; this service resolves them so the distance-based views
//! can include the row. Usage policy: callers space requests at least
//! one second apart.

use serde::Deserialize;

use crate::error::AppError;
use crate::geo::Coordinates;

/// Nominatim API response structure
#[derive(Debug, Deserialize)]
pub struct NominatimResponse {
    #[allow(dead_code)]
    pub place_id: i64,
    pub lat: String,
    pub lon: String,
    pub display_name: String,
}

impl NominatimResponse {
    /// Parse the string-typed coordinate pair Nominatim returns.
    ///
    /// `None` when either half fails to parse; an unparseable result is
    /// treated the same as no result.
    pub fn coordinates(&self) -> Option<Coordinates> {
        let lat = self.lat.parse().ok()?;
        let lon = self.lon.parse().ok()?;
        Some(Coordinates::new(lat, lon))
    }
}

/// Service for geocoding listing addresses using Nominatim
pub struct GeocodingService {
    client: reqwest::Client,
    base_url: String,
}

impl GeocodingService {
    pub fn new(base_url: &str) -> Result<Self, AppError> {
        // Fail fast on a misconfigured endpoint instead of per request.
        url::Url::parse(base_url)
            .map_err(|e| AppError::ExternalService(format!("Invalid Nominatim base URL: {e}")))?;

        let client = reqwest::Client::builder()
            .user_agent("outta-server/0.1 (family-activity-discovery)")
            .build()
            .map_err(|e| AppError::ExternalService(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Geocode a free-form address query.
    ///
    /// Returns `Ok(None)` when Nominatim has no match or answers with a
    /// non-success status; the caller skips the row either way.
    pub async fn geocode(&self, query: &str) -> Result<Option<NominatimResponse>, AppError> {
        let url = format!(
            "{}/search?q={}&format=json&limit=1",
            self.base_url,
            urlencoding::encode(query)
        );

        tracing::debug!("Geocoding: {} -> {}", query, url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            tracing::error!("Nominatim request failed: {:?}", e);
            AppError::ExternalService(format!("Nominatim request failed: {e}"))
        })?;

        if !response.status().is_success() {
            tracing::warn!("Nominatim returned status: {}", response.status());
            return Ok(None);
        }

        let results: Vec<NominatimResponse> = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse Nominatim response: {:?}", e);
            AppError::ExternalService(format!("Failed to parse Nominatim response: {e}"))
        })?;

        Ok(results.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nominatim_search_results() {
        let body = r#"[
            {
                "place_id": 12345,
                "lat": "37.8044",
                "lon": "-122.2712",
                "display_name": "Oakland, Alameda County, California, USA"
            }
        ]"#;

        let results: Vec<NominatimResponse> = serde_json::from_str(body).unwrap();
        let first = &results[0];
        assert_eq!(first.display_name, "Oakland, Alameda County, California, USA");

        let coords = first.coordinates().unwrap();
        assert_eq!(coords.latitude, 37.8044);
        assert_eq!(coords.longitude, -122.2712);
    }

    #[test]
    fn unparseable_coordinates_become_none() {
        let response = NominatimResponse {
            place_id: 1,
            lat: "not-a-number".to_string(),
            lon: "-122.0".to_string(),
            display_name: "nowhere".to_string(),
        };
        assert!(response.coordinates().is_none());
    }
}
