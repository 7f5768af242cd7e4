//! Seller-facing order management.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use shipline_core::{OrderId, OrderStatus};

use crate::carrier::{PickupOutcome, PickupRequest};
use crate::dispatch::{self, OrderPatch};
use crate::error::Result;
use crate::middleware::RequireSeller;
use crate::models::{Order, Pickup};
use crate::reconcile::{self, BULK_CALL_TIMEOUT, TrackedOrder};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    /// Set to `false` to skip carrier enrichment entirely.
    live: Option<bool>,
}

/// GET /orders
pub async fn list(
    State(state): State<AppState>,
    RequireSeller(store_id): RequireSeller,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<TrackedOrder>>> {
    let orders = state.store().list_for_store(store_id).await?;

    let live = params.live.unwrap_or(true);
    let views = match state.carrier() {
        Some(carrier) if live => {
            reconcile::enrich_orders(carrier, orders, BULK_CALL_TIMEOUT).await
        }
        _ => orders.iter().map(TrackedOrder::from_order).collect(),
    };
    Ok(Json(views))
}

#[derive(Debug, Serialize)]
pub struct UpdateResponse {
    pub order: Order,
    /// The status announced to the customer; `null` for tracking-only
    /// updates.
    pub status_for_notification: Option<OrderStatus>,
}

/// PATCH /orders/{id}
pub async fn update(
    State(state): State<AppState>,
    RequireSeller(store_id): RequireSeller,
    Path(id): Path<OrderId>,
    Json(patch): Json<OrderPatch>,
) -> Result<Json<UpdateResponse>> {
    let outcome =
        dispatch::update_order(state.store(), state.notifier(), store_id, id, patch).await?;
    Ok(Json(UpdateResponse {
        order: outcome.order,
        status_for_notification: outcome.status_for_notification,
    }))
}

/// POST /orders/{id}/ship
pub async fn ship(
    State(state): State<AppState>,
    RequireSeller(store_id): RequireSeller,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    let carrier = state.require_carrier()?;
    let order =
        dispatch::send_to_carrier(state.store(), carrier, state.notifier(), store_id, id).await?;
    Ok(Json(order))
}

#[derive(Debug, Deserialize)]
pub struct PickupBody {
    pub date: NaiveDate,
    /// Pickup window start (HH:MM).
    pub time: String,
    pub package_count: u32,
}

/// POST /orders/{id}/pickup
pub async fn schedule_pickup(
    State(state): State<AppState>,
    RequireSeller(store_id): RequireSeller,
    Path(id): Path<OrderId>,
    Json(body): Json<PickupBody>,
) -> Result<Json<Pickup>> {
    let carrier = state.require_carrier()?;
    let location = state
        .config()
        .carrier
        .as_ref()
        .map_or_else(|| "primary".to_string(), |c| c.pickup_location.clone());

    let req = PickupRequest {
        location,
        date: body.date,
        time: body.time,
        package_count: body.package_count,
    };
    let pickup = dispatch::schedule_pickup(state.store(), carrier, store_id, id, req).await?;
    Ok(Json(pickup))
}

/// DELETE /orders/{id}/pickup
pub async fn cancel_pickup(
    State(state): State<AppState>,
    RequireSeller(store_id): RequireSeller,
    Path(id): Path<OrderId>,
) -> Result<Json<PickupOutcome>> {
    let carrier = state.require_carrier()?;
    let outcome = dispatch::cancel_pickup(state.store(), carrier, store_id, id).await?;
    Ok(Json(outcome))
}

/// GET /orders/{id}/pickup
pub async fn pickup_status(
    State(state): State<AppState>,
    RequireSeller(store_id): RequireSeller,
    Path(id): Path<OrderId>,
) -> Result<Json<PickupOutcome>> {
    let carrier = state.require_carrier()?;
    let outcome = dispatch::pickup_status(state.store(), carrier, store_id, id).await?;
    Ok(Json(outcome))
}
