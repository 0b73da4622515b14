//! Outta - Main Application Entry Point
//!
//! This is the API server behind the Outta family-activity discovery site. It serves listing, search, and homepage endpoints backed by PostgreSQL with a read-through cache, plus authenticated maintenance endpoints (geocoding, hiding past events, place-detail and image enrichment).
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries)
//! - **Cache**: read-through cache over a Postgres key-value table
//! - **Authentication**: API key with SHA-256 hashing (admin routes only)
//! - **Format**: JSON requests/responses
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Build HTTP router with routes and middleware
//! 5. Start server on configured port

mod cache;
mod config;
mod db;
mod error;
mod filters;
mod geo;
mod handlers;
mod middleware;
mod models;
mod services;
mod state;

use tracing_subscriber::EnvFilter;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Load configuration
    let config = config::Config::from_env()?;
    tracing::info!("Configuration loaded");

    // Create database pool
    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    // Run migrations
    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    let port = config.server_port;
    let state = AppState::new(pool, config);

    // Admin routes (maintenance jobs, API-key protected)
    let admin_routes = Router::new()
        .route("/api/v1/admin/geocode", post(handlers::admin::geocode))
        .route(
            "/api/v1/admin/hide-past-events",
            post(handlers::admin::hide_past_events),
        )
        .route(
            "/api/v1/admin/refresh-place-details",
            post(handlers::admin::refresh_place_details),
        )
        .route(
            "/api/v1/admin/backfill-images",
            post(handlers::admin::backfill_images),
        )
        .route(
            "/api/v1/admin/cache/invalidate",
            post(handlers::admin::invalidate_cache),
        )
        // Apply authentication middleware to all routes in this group
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    // Combine public routes with the admin group
    let app = Router::new()
        // Public routes (no authentication required)
        .route("/health", get(handlers::health::health_check))
        .route("/api/v1/listings", get(handlers::listings::list_listings))
        .route(
            "/api/v1/listings/{id}",
            get(handlers::listings::get_listing),
        )
        .route("/api/v1/search", get(handlers::listings::search_listings))
        .route("/api/v1/sources", get(handlers::sources::list_sources))
        .route("/api/v1/home/events", get(handlers::home::upcoming_events))
        .route(
            "/api/v1/home/nearby",
            get(handlers::home::nearby_by_place_type),
        )
        .route("/api/v1/home/place-types", get(handlers::home::place_types))
        // Merge admin routes
        .merge(admin_routes)
        // The site front end calls this API from the browser
        .layer(CorsLayer::permissive())
        // Add distributed tracing middleware for observability
        .layer(TraceLayer::new_for_http())
        // Share state (pool, cache, config) with all handlers
        .with_state(state);

    // Bind to network address and start server
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Start serving HTTP requests
    // This blocks forever, handling requests concurrently with tokio
    axum::serve(listener, app).await?;

    Ok(())
}
