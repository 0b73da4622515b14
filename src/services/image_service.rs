//! Unsplash search client for the stock-photo backfill job.
//!
//! Providers frequently ship listings without an image; the backfill
//! job queries Unsplash with the listing's place category (or title)
//! and stores the first landscape result.

use serde::Deserialize;

use crate::error::AppError;

const UNSPLASH_SEARCH_URL: &str = "https://api.unsplash.com/search/photos";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    urls: PhotoUrls,
}

#[derive(Debug, Deserialize)]
struct PhotoUrls {
    regular: String,
}

/// Service for finding stock photos on Unsplash
pub struct ImageService {
    client: reqwest::Client,
    access_key: String,
}

impl ImageService {
    pub fn new(access_key: String) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::ExternalService(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client, access_key })
    }

    /// Search for one landscape photo matching `query`.
    ///
    /// Returns `Ok(None)` when nothing matches or the API answers with
    /// a non-success status; the caller leaves the listing imageless.
    pub async fn search_photo(&self, query: &str) -> Result<Option<String>, AppError> {
        let url = format!(
            "{}?query={}&per_page=1&orientation=landscape",
            UNSPLASH_SEARCH_URL,
            urlencoding::encode(query)
        );

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Client-ID {}", self.access_key))
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Unsplash request failed: {:?}", e);
                AppError::ExternalService(format!("Unsplash request failed: {e}"))
            })?;

        if !response.status().is_success() {
            tracing::warn!("Unsplash returned status: {}", response.status());
            return Ok(None);
        }

        let body: SearchResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse Unsplash response: {:?}", e);
            AppError::ExternalService(format!("Failed to parse Unsplash response: {e}"))
        })?;

        Ok(body.results.into_iter().next().map(|r| r.urls.regular))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_search_results() {
        let body = r#"{
            "total": 1,
            "results": [
                {"id": "abc", "urls": {"regular": "https://images.unsplash.com/photo-1", "small": "https://images.unsplash.com/photo-1-small"}}
            ]
        }"#;

        let parsed: SearchResponse = serde_json::from_str(body).unwrap();
        assert_eq!(
            parsed.results[0].urls.regular,
            "https://images.unsplash.com/photo-1"
        );
    }

    #[test]
    fn empty_results_are_fine() {
        let parsed: SearchResponse = serde_json::from_str(r#"{"total": 0, "results": []}"#).unwrap();
        assert!(parsed.results.is_empty());
    }
}
