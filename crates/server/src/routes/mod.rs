//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                  - Liveness check
//! GET  /health/ready            - Readiness check (database connectivity)
//!
//! # Public tracking
//! GET  /track                   - Tracking lookup by waybill, order id,
//!                                 short code, or phone; ?carrier= forces a
//!                                 direct carrier lookup
//!
//! # Seller (bearer token)
//! GET    /orders                - List store orders; ?live=false skips
//!                                 carrier enrichment
//! PATCH  /orders/{id}           - Partial status/tracking update
//! POST   /orders/{id}/ship      - Send to carrier (once)
//! POST   /orders/{id}/pickup    - Schedule a carrier pickup
//! DELETE /orders/{id}/pickup    - Cancel the pickup
//! GET    /orders/{id}/pickup    - Live pickup status from the carrier
//! ```

pub mod orders;
pub mod tracking;

use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::state::AppState;

/// Create the public tracking router.
pub fn tracking_routes() -> Router<AppState> {
    Router::new().route("/track", get(tracking::track))
}

/// Create the seller-facing order router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(orders::list))
        .route("/orders/{id}", patch(orders::update))
        .route("/orders/{id}/ship", post(orders::ship))
        .route(
            "/orders/{id}/pickup",
            post(orders::schedule_pickup)
                .delete(orders::cancel_pickup)
                .get(orders::pickup_status),
        )
}

/// All application routes.
pub fn routes() -> Router<AppState> {
    Router::new().merge(tracking_routes()).merge(order_routes())
}
