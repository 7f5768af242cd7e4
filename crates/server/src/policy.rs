//! Refetch policy: decides whether an order warrants a live carrier call.
//!
//! Pure function of the stored order. The orchestrator consults it before
//! every enrichment; callers can bypass it for forced refreshes.

use crate::models::Order;

/// Whether a live carrier fetch is warranted for `order`.
///
/// Terminal orders are settled and never refetched, whatever their other
/// fields look like. Orders without a waybill have nothing to ask the
/// carrier about. Otherwise we refetch when the stored tracking link is
/// missing (the order has never been enriched) or when the recorded courier
/// matches the configured adapter. A foreign courier with an intact
/// tracking link is somebody else's shipment; we serve the stored snapshot.
#[must_use]
pub fn should_refetch(order: &Order, adapter_name: &str) -> bool {
    if order.status.is_terminal() {
        return false;
    }
    if order.waybill().is_none() {
        return false;
    }
    if order.tracking_url.is_none() {
        return true;
    }
    match order.courier.as_deref() {
        None => true,
        Some(courier) => courier.to_lowercase().contains(&adapter_name.to_lowercase()),
    }
}
