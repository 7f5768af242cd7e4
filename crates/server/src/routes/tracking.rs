//! Public tracking lookup.

use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::reconcile;
use crate::state::AppState;

/// Cache directive for non-terminal orders: short-lived with a
/// revalidation window, so intermediary caches absorb repeat lookups
/// without serving stale state for long.
const CACHE_ACTIVE: &str = "public, max-age=120, stale-while-revalidate=60";

/// Terminal orders cannot change; cache them for a day.
const CACHE_TERMINAL: &str = "public, max-age=86400";

#[derive(Debug, Deserialize)]
pub struct TrackParams {
    /// Waybill, internal order id, or short code.
    query: Option<String>,
    /// Phone fallback hint.
    phone: Option<String>,
    /// Non-empty value forces a direct carrier lookup, skipping local
    /// resolution entirely.
    carrier: Option<String>,
}

/// GET /track
pub async fn track(
    State(state): State<AppState>,
    Query(params): Query<TrackParams>,
) -> Result<Response> {
    let query = params.query.unwrap_or_default();
    let phone = params.phone.as_deref().filter(|p| !p.trim().is_empty());
    let forced = params.carrier.as_deref().is_some_and(|c| !c.trim().is_empty());

    if query.trim().is_empty() && phone.is_none() {
        return Err(AppError::Validation(
            "supply a tracking query or a phone number".to_string(),
        ));
    }

    let view = reconcile::track(state.store(), state.carrier(), &query, phone, forced).await?;

    let cache = if view.is_terminal() {
        CACHE_TERMINAL
    } else {
        CACHE_ACTIVE
    };
    let mut response = Json(view).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static(cache));
    Ok(response)
}
