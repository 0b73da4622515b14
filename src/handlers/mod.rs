//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (query params, JSON body, URL params)
//! 2. Performs business logic (database queries, filters, cache)
//! 3. Returns HTTP response (JSON, status code)

/// Admin/maintenance endpoints
pub mod admin;
/// Health check endpoint
pub mod health;
/// Homepage tab endpoints (filters over the candidate set)
pub mod home;
/// Listing index, detail, and search endpoints
pub mod listings;
/// Source carousel endpoint
pub mod sources;
