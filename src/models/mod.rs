//! Data models representing database entities.
//!
//! This module contains all data structures that map to database tables.

/// API key authentication model
pub mod api_key;
/// Listing entity plus listing request/response types
pub mod listing;
/// Typed Google Places enrichment blob
pub mod place_details;
/// Venue/organizer carousel model
pub mod source;
