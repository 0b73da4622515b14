//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `CACHE_ENABLED` (optional): read-through cache switch, defaults to true.
///   Disabling it degrades every cached endpoint to "always query the
///   database"; the cache is an optimization, never a correctness dependency.
/// - `CACHE_TTL_SECONDS` (optional): TTL for cached listing/search queries,
///   defaults to 300
/// - `NOMINATIM_BASE_URL` (optional): geocoder endpoint, defaults to the
///   public Nominatim instance
/// - `GOOGLE_PLACES_API_KEY` (optional): enables the place-details
///   maintenance job
/// - `UNSPLASH_ACCESS_KEY` (optional): enables the image backfill
///   maintenance job
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_cache_enabled")]
    pub cache_enabled: bool,

    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_seconds: u64,

    #[serde(default = "default_nominatim_base_url")]
    pub nominatim_base_url: String,

    pub google_places_api_key: Option<String>,

    pub unsplash_access_key: Option<String>,
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

fn default_cache_enabled() -> bool {
    true
}

/// Default TTL for cached listing queries (seconds).
fn default_cache_ttl() -> u64 {
    300
}

fn default_nominatim_base_url() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., DATABASE_URL)
    /// - Environment variable values cannot be parsed into expected types
    pub fn from_env() -> Result<Self, envy::Error> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        // Parse environment variables into Config struct
        // Field names are automatically converted: database_url -> DATABASE_URL
        envy::from_env::<Config>()
    }
}
