//! Reconciliation orchestrator.
//!
//! Ties the resolver, refetch policy, and carrier adapter together for the
//! single-order tracking path and the seller bulk order list. Fresh carrier
//! data is merged into the outgoing view without being written back; live
//! enrichment is best-effort and never fails an otherwise-valid response.

use std::time::Duration;

use futures::stream::{self, StreamExt};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use shipline_core::{OrderId, OrderStatus};

use crate::carrier::{CarrierAdapter, CarrierError, NormalizedTracking};
use crate::db::{OrderStore, RepositoryError};
use crate::models::{LineItem, Order};
use crate::policy::should_refetch;
use crate::resolver::{self, Resolution};

/// Concurrent carrier calls in flight during bulk enrichment.
const BULK_CONCURRENCY: usize = 8;

/// Per-call carrier timeout on the bulk path. A slow response skips that
/// order's enrichment instead of stalling the whole list.
pub const BULK_CALL_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum TrackError {
    /// No local order matched and no carrier fallback succeeded.
    #[error("order not found")]
    NotFound,

    /// Carrier failure on a path that surfaces it (forced direct lookup).
    #[error(transparent)]
    Carrier(#[from] CarrierError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// The order-shaped tracking view returned to callers.
///
/// Built from a stored order, or synthesized purely from a carrier response
/// when no local order exists. The two paths share one merge step.
#[derive(Debug, Clone, Serialize)]
pub struct TrackedOrder {
    /// Internal id; absent on carrier-only (synthetic) records.
    pub id: Option<OrderId>,
    pub short_code: Option<u32>,
    /// Stored status; absent on synthetic records, whose only status is the
    /// carrier's verbatim label inside `tracking`.
    pub status: Option<OrderStatus>,
    pub tracking_id: Option<String>,
    pub courier: Option<String>,
    pub tracking_url: Option<String>,
    pub line_items: Vec<LineItem>,
    pub total: Decimal,
    /// Live carrier state, when a fetch ran and succeeded.
    pub tracking: Option<NormalizedTracking>,
}

impl TrackedOrder {
    #[must_use]
    pub fn from_order(order: &Order) -> Self {
        Self {
            id: Some(order.id),
            short_code: order.short_code,
            status: Some(order.status),
            tracking_id: order.tracking_id.clone(),
            courier: order.courier.clone(),
            tracking_url: order.tracking_url.clone(),
            line_items: order.line_items.clone(),
            total: order.total,
            tracking: None,
        }
    }

    /// A record built solely from a carrier response, for shipments with no
    /// local order. Empty line items, zero total.
    #[must_use]
    pub fn synthetic(tracking: NormalizedTracking) -> Self {
        let mut view = Self {
            id: None,
            short_code: None,
            status: None,
            tracking_id: None,
            courier: None,
            tracking_url: None,
            line_items: vec![],
            total: Decimal::ZERO,
            tracking: None,
        };
        view.merge_tracking(tracking);
        view
    }

    /// Merge a fresh carrier fetch into the view.
    ///
    /// Non-destructive: `tracking_id`, `courier`, and `tracking_url` are
    /// filled only when empty, never replaced where the seller already set
    /// them. The full normalized record is attached alongside.
    pub fn merge_tracking(&mut self, fresh: NormalizedTracking) {
        if is_blank(self.tracking_id.as_deref()) {
            self.tracking_id = Some(fresh.tracking_id.clone());
        }
        if is_blank(self.courier.as_deref()) {
            self.courier = Some(fresh.courier.clone());
        }
        if is_blank(self.tracking_url.as_deref()) {
            self.tracking_url.clone_from(&fresh.tracking_url);
        }
        self.tracking = Some(fresh);
    }

    /// Whether the underlying order can no longer change. Synthetic records
    /// have no stored status and count as non-terminal.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_some_and(OrderStatus::is_terminal)
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

/// Single-order tracking lookup.
///
/// With `forced` set the carrier is asked directly and its errors surface
/// verbatim. Otherwise the query is resolved locally first; a stored order
/// is enriched when the refetch policy allows, and a query that matched
/// nothing but looks like a waybill gets one direct carrier attempt before
/// the lookup fails.
pub async fn track(
    store: &dyn OrderStore,
    carrier: Option<&dyn CarrierAdapter>,
    query: &str,
    phone_hint: Option<&str>,
    forced: bool,
) -> Result<TrackedOrder, TrackError> {
    if forced {
        let carrier = carrier.ok_or_else(unconfigured)?;
        let tracking = carrier.fetch_tracking(query.trim()).await?;
        return Ok(TrackedOrder::synthetic(tracking));
    }

    match resolver::resolve(store, query, phone_hint).await? {
        Resolution::Found(mut order) => {
            backfill_short_code(store, &mut order).await;
            let mut view = TrackedOrder::from_order(&order);
            if let Some(carrier) = carrier {
                if should_refetch(&order, carrier.name()) {
                    if let Some(waybill) = order.waybill() {
                        // Enrichment is best-effort; the stored order is
                        // still a valid answer.
                        match carrier.fetch_tracking(waybill).await {
                            Ok(tracking) => view.merge_tracking(tracking),
                            Err(err) => {
                                warn!(order_id = %order.id, error = %err, "carrier enrichment failed");
                            }
                        }
                    }
                }
            }
            Ok(view)
        }
        Resolution::CarrierCandidate => {
            let Some(carrier) = carrier else {
                return Err(TrackError::NotFound);
            };
            match carrier.fetch_tracking(query.trim()).await {
                Ok(tracking) => Ok(TrackedOrder::synthetic(tracking)),
                Err(err) => {
                    warn!(query, error = %err, "carrier fallback lookup failed");
                    Err(TrackError::NotFound)
                }
            }
        }
        Resolution::NotFound => Err(TrackError::NotFound),
    }
}

/// Enrich a batch of orders for the seller list view.
///
/// Each order is evaluated against the refetch policy independently; due
/// orders get a carrier call, bounded by `per_call_timeout` and running at
/// most [`BULK_CONCURRENCY`] at a time. A timeout or carrier failure leaves
/// that order's stored fields untouched. Input order is preserved.
pub async fn enrich_orders(
    carrier: &dyn CarrierAdapter,
    orders: Vec<Order>,
    per_call_timeout: Duration,
) -> Vec<TrackedOrder> {
    stream::iter(orders)
        .map(|order| async move {
            let mut view = TrackedOrder::from_order(&order);
            if !should_refetch(&order, carrier.name()) {
                return view;
            }
            let Some(waybill) = order.waybill() else {
                return view;
            };
            match tokio::time::timeout(per_call_timeout, carrier.fetch_tracking(waybill)).await {
                Ok(Ok(tracking)) => view.merge_tracking(tracking),
                Ok(Err(err)) => {
                    warn!(order_id = %order.id, error = %err, "carrier enrichment failed");
                }
                Err(_) => {
                    warn!(order_id = %order.id, "carrier call timed out");
                }
            }
            view
        })
        .buffered(BULK_CONCURRENCY)
        .collect()
        .await
}

/// Backfill the human-facing short code from the id, first use wins.
///
/// A persistence failure here only delays the backfill to the next lookup.
async fn backfill_short_code(store: &dyn OrderStore, order: &mut Order) {
    if order.short_code.is_some() {
        return;
    }
    let code = order.id.short_code();
    if let Err(err) = store.set_short_code(order.id, code).await {
        warn!(order_id = %order.id, error = %err, "failed to persist short code");
    }
    order.short_code = Some(code);
}

fn unconfigured() -> TrackError {
    TrackError::Carrier(CarrierError::Configuration(
        "no carrier adapter configured".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::Utc;

    use shipline_core::StoreId;

    use crate::carrier::{PickupOutcome, PickupRequest};
    use crate::db::MemoryOrderStore;
    use crate::models::{Address, OrderContact};

    use super::*;

    struct FixedCarrier;

    impl FixedCarrier {
        fn tracking(waybill: &str) -> NormalizedTracking {
            NormalizedTracking {
                courier: "Delhivery".to_string(),
                tracking_id: waybill.to_string(),
                tracking_url: Some(format!("https://www.delhivery.com/track/package/{waybill}")),
                current_status: "In Transit".to_string(),
                current_status_time: None,
                current_status_location: None,
                expected_delivery_date: None,
                origin: None,
                destination: None,
                events: vec![],
            }
        }
    }

    #[async_trait]
    impl CarrierAdapter for FixedCarrier {
        fn name(&self) -> &str {
            "Delhivery"
        }

        fn tracking_url(&self, waybill: &str) -> String {
            format!("https://www.delhivery.com/track/package/{waybill}")
        }

        async fn fetch_tracking(&self, waybill: &str) -> Result<NormalizedTracking, CarrierError> {
            Ok(Self::tracking(waybill))
        }

        async fn register_shipment(&self, _order: &Order) -> Result<String, CarrierError> {
            Ok("WBNEW".to_string())
        }

        async fn schedule_pickup(
            &self,
            _req: &PickupRequest,
        ) -> Result<PickupOutcome, CarrierError> {
            Ok(PickupOutcome::rejected("not under test"))
        }

        async fn cancel_pickup(&self, _pickup_id: &str) -> Result<PickupOutcome, CarrierError> {
            Ok(PickupOutcome::rejected("not under test"))
        }

        async fn pickup_status(&self, _pickup_id: &str) -> Result<PickupOutcome, CarrierError> {
            Ok(PickupOutcome::rejected("not under test"))
        }
    }

    fn order() -> Order {
        Order {
            id: OrderId::generate(),
            short_code: None,
            store_id: StoreId::generate(),
            contact: OrderContact::Guest {
                name: "Meera".into(),
                email: None,
                phone: Some("9876543210".into()),
            },
            status: OrderStatus::PendingAssignment,
            tracking_id: Some("WB123".into()),
            courier: None,
            tracking_url: None,
            shipping_address: Address::default(),
            line_items: vec![],
            total: Decimal::ZERO,
            pickup: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_enrichment_fills_missing_fields_only() {
        let store = MemoryOrderStore::new();
        store.insert(order()).await;

        let view = track(&store, Some(&FixedCarrier), "WB123", None, false)
            .await
            .unwrap();

        assert_eq!(view.tracking_id.as_deref(), Some("WB123"));
        assert_eq!(view.courier.as_deref(), Some("Delhivery"));
        assert_eq!(
            view.tracking_url.as_deref(),
            Some("https://www.delhivery.com/track/package/WB123")
        );
        assert_eq!(view.status, Some(OrderStatus::PendingAssignment));
    }

    #[tokio::test]
    async fn test_merge_never_replaces_seller_supplied_fields() {
        let store = MemoryOrderStore::new();
        let mut o = order();
        o.courier = Some("BlueDart".into());
        // No tracking_url, so the refetch policy still fires.
        store.insert(o).await;

        // Foreign courier with no URL is still enriched, but the stored
        // courier string wins over the adapter's canonical name.
        let view = track(&store, Some(&FixedCarrier), "WB123", None, false)
            .await
            .unwrap();
        assert_eq!(view.courier.as_deref(), Some("BlueDart"));
        assert!(view.tracking_url.is_some());
    }

    #[tokio::test]
    async fn test_short_code_backfill_persists() {
        let store = MemoryOrderStore::new();
        let o = order();
        let id = o.id;
        store.insert(o).await;

        let view = track(&store, Some(&FixedCarrier), "WB123", None, false)
            .await
            .unwrap();
        assert_eq!(view.short_code, Some(id.short_code()));

        let stored = store.get(id).await.unwrap();
        assert_eq!(stored.short_code, Some(id.short_code()));
    }

    #[tokio::test]
    async fn test_forced_lookup_builds_synthetic_record() {
        let store = MemoryOrderStore::new();
        let view = track(&store, Some(&FixedCarrier), "WB999", None, true)
            .await
            .unwrap();
        assert!(view.id.is_none());
        assert!(view.status.is_none());
        assert!(view.line_items.is_empty());
        assert_eq!(view.total, Decimal::ZERO);
        assert_eq!(view.tracking_id.as_deref(), Some("WB999"));
    }

    #[tokio::test]
    async fn test_unknown_query_without_carrier_shape_is_not_found() {
        let store = MemoryOrderStore::new();
        let err = track(&store, Some(&FixedCarrier), "1234", None, false)
            .await
            .unwrap_err();
        assert!(matches!(err, TrackError::NotFound));
    }

    #[tokio::test]
    async fn test_forced_lookup_without_adapter_is_a_configuration_error() {
        let store = MemoryOrderStore::new();
        let err = track(&store, None, "WB123", None, true).await.unwrap_err();
        assert!(matches!(
            err,
            TrackError::Carrier(CarrierError::Configuration(_))
        ));
    }
}
