//! HTTP middleware components.
//!
//! Middleware are functions that run before route handlers. Here that
//! is just API-key authentication for the admin/maintenance group; the
//! public listing endpoints are unauthenticated.

/// API key authentication middleware
pub mod auth;
