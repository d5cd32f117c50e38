//! Route definitions for the Sitebook platform API

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Auth routes (public)
        .nest("/auth", auth_routes())
        // Stripe webhook (public, signature-verified)
        .route("/webhooks/stripe", post(handlers::stripe_webhook))
        // Public barcode lookup and comparison (no account needed)
        .route("/barcodes/compare", get(handlers::compare_medicines))
        .route("/barcodes/:barcode", get(handlers::lookup_medicine))
        // Public marketplace browsing
        .route("/market", get(handlers::search_listings))
        .route("/market/:listing_id", get(handlers::get_listing))
        // Protected routes - organisation management
        .nest("/org", organization_routes())
        // Protected routes - logbook entries
        .nest("/entries", entry_routes())
        // Protected routes - offline sync
        .nest("/sync", sync_routes())
        // Protected routes - medicine catalogue maintenance
        .nest("/medicines", medicine_routes())
        // Protected routes - marketplace listing management
        .nest("/listings", listing_routes())
        // Protected routes - billing
        .nest("/billing", billing_routes())
        // Protected routes - voice transcription
        .route(
            "/transcribe",
            post(handlers::transcribe).route_layer(middleware::from_fn(auth_middleware)),
        )
}

/// Authentication routes (public)
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/refresh", post(handlers::refresh))
}

/// Organisation management routes (protected)
fn organization_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::get_organization))
        .route(
            "/members",
            get(handlers::list_members).post(handlers::add_member),
        )
        .route(
            "/members/:member_id",
            get(handlers::get_member).put(handlers::update_member),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Logbook entry routes (protected)
fn entry_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_entries).post(handlers::create_entry),
        )
        .route(
            "/:entry_id",
            get(handlers::get_entry)
                .put(handlers::update_entry)
                .delete(handlers::delete_entry),
        )
        .route("/summary/:apprentice_id", get(handlers::weekly_summary))
        .route("/export/:apprentice_id", get(handlers::export_entries_csv))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Offline sync routes (protected)
fn sync_routes() -> Router<AppState> {
    Router::new()
        .route("/push", post(handlers::push_entries))
        .route("/pull", post(handlers::pull_changes))
        .route("/state", get(handlers::get_sync_state))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Medicine catalogue routes (protected)
fn medicine_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_medicines).post(handlers::create_medicine),
        )
        .route(
            "/:medicine_id",
            get(handlers::get_medicine)
                .put(handlers::update_medicine)
                .delete(handlers::delete_medicine),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Marketplace listing routes (protected)
fn listing_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_listing))
        .route("/mine", get(handlers::my_listings))
        .route(
            "/:listing_id",
            put(handlers::update_listing).delete(handlers::delete_listing),
        )
        .route("/:listing_id/status", post(handlers::change_listing_status))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Billing routes (protected)
fn billing_routes() -> Router<AppState> {
    Router::new()
        .route("/checkout", post(handlers::create_checkout))
        .route("/subscription", get(handlers::get_subscription))
        .route("/metrics", get(handlers::revenue_metrics))
        .route("/ledger", get(handlers::export_ledger))
        .route_layer(middleware::from_fn(auth_middleware))
}
