//! Status transitions and notification dispatch.
//!
//! Seller-initiated order mutations live here: partial status/tracking
//! updates, the one-shot send-to-carrier transition, and pickup management.
//! Every operation verifies store ownership before touching the order, and
//! persistence always completes before notifications are attempted.

use chrono::Utc;
use serde::Deserialize;
use thiserror::Error;

use shipline_core::{OrderId, OrderStatus, StoreId};

use crate::carrier::{CarrierAdapter, CarrierError, PickupOutcome, PickupRequest};
use crate::db::{OrderStore, RepositoryError, ShipmentPatch};
use crate::models::{Order, Pickup};
use crate::notify::Notifier;

#[derive(Debug, Error)]
pub enum DispatchError {
    /// Unknown order, or an order owned by a different store. The two are
    /// indistinguishable on purpose.
    #[error("order not found")]
    NotFound,

    /// Second send-to-carrier attempt. Carries the waybill the first
    /// attempt produced.
    #[error("order already sent to carrier with waybill {tracking_id}")]
    AlreadySent { tracking_id: String },

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Carrier(#[from] CarrierError),

    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for DispatchError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound,
            other => Self::Repository(other),
        }
    }
}

/// A partial order update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderPatch {
    pub status: Option<OrderStatus>,
    pub tracking_id: Option<String>,
    pub tracking_url: Option<String>,
    pub courier: Option<String>,
}

impl OrderPatch {
    fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.tracking_id.is_none()
            && self.tracking_url.is_none()
            && self.courier.is_none()
    }
}

impl From<OrderPatch> for ShipmentPatch {
    fn from(patch: OrderPatch) -> Self {
        Self {
            status: patch.status,
            tracking_id: patch.tracking_id,
            tracking_url: patch.tracking_url,
            courier: patch.courier,
        }
    }
}

/// Result of a partial update.
#[derive(Debug)]
pub struct UpdateOutcome {
    pub order: Order,
    /// The status to announce in notifications. `None` means the caller sent
    /// a tracking-only update and templates must not claim a status change.
    pub status_for_notification: Option<OrderStatus>,
}

/// Apply a partial update to an order the store owns, then notify.
///
/// The persisted write is the unit of atomicity; notification delivery is
/// fire-and-forget and never rolls it back.
pub async fn update_order(
    store: &dyn OrderStore,
    notifier: &Notifier,
    store_id: StoreId,
    order_id: OrderId,
    patch: OrderPatch,
) -> Result<UpdateOutcome, DispatchError> {
    load_owned(store, store_id, order_id).await?;

    if patch.is_empty() {
        return Err(DispatchError::Validation(
            "no updatable fields supplied".to_string(),
        ));
    }

    let status_for_notification = patch.status;
    let order = store
        .update_shipment(order_id, &ShipmentPatch::from(patch))
        .await?;

    notifier.dispatch_order_update(&order, status_for_notification);

    Ok(UpdateOutcome {
        order,
        status_for_notification,
    })
}

/// Hand an order to the carrier for the first time.
///
/// Registers a manifest, records the assigned waybill, and moves the order
/// to `PENDING_ASSIGNMENT`. Allowed exactly once per order; requires a
/// shippable address. No state changes on failure.
pub async fn send_to_carrier(
    store: &dyn OrderStore,
    carrier: &dyn CarrierAdapter,
    notifier: &Notifier,
    store_id: StoreId,
    order_id: OrderId,
) -> Result<Order, DispatchError> {
    let order = load_owned(store, store_id, order_id).await?;

    if let Some(waybill) = order.waybill() {
        return Err(DispatchError::AlreadySent {
            tracking_id: waybill.to_string(),
        });
    }
    if !order.shipping_address.is_shippable() {
        return Err(DispatchError::Validation(
            "shipping address is incomplete, street and city are required".to_string(),
        ));
    }

    let waybill = carrier.register_shipment(&order).await?;

    let patch = ShipmentPatch {
        status: Some(OrderStatus::PendingAssignment),
        tracking_id: Some(waybill.clone()),
        tracking_url: Some(carrier.tracking_url(&waybill)),
        courier: Some(carrier.name().to_string()),
    };
    let order = store.update_shipment(order_id, &patch).await?;

    notifier.dispatch_order_update(&order, Some(OrderStatus::PendingAssignment));

    Ok(order)
}

/// Request a carrier pickup for an order and persist the outcome.
///
/// A carrier-side rejection is persisted with `scheduled = false` and the
/// carrier's message; it is not an error.
pub async fn schedule_pickup(
    store: &dyn OrderStore,
    carrier: &dyn CarrierAdapter,
    store_id: StoreId,
    order_id: OrderId,
    req: PickupRequest,
) -> Result<Pickup, DispatchError> {
    load_owned(store, store_id, order_id).await?;

    let outcome = carrier.schedule_pickup(&req).await?;
    let pickup = Pickup {
        scheduled: outcome.scheduled,
        pickup_id: outcome.pickup_id,
        requested_at: Utc::now(),
        message: outcome.message,
    };
    store.record_pickup(order_id, &pickup).await?;
    Ok(pickup)
}

/// Cancel an order's pickup with the carrier and persist the result.
pub async fn cancel_pickup(
    store: &dyn OrderStore,
    carrier: &dyn CarrierAdapter,
    store_id: StoreId,
    order_id: OrderId,
) -> Result<PickupOutcome, DispatchError> {
    let order = load_owned(store, store_id, order_id).await?;
    let pickup = order
        .pickup
        .ok_or_else(|| DispatchError::Validation("no pickup on this order".to_string()))?;
    let Some(pickup_id) = pickup.pickup_id.clone() else {
        return Err(DispatchError::Validation(
            "pickup was never accepted by the carrier".to_string(),
        ));
    };

    let outcome = carrier.cancel_pickup(&pickup_id).await?;
    let updated = Pickup {
        scheduled: false,
        pickup_id: Some(pickup_id),
        requested_at: pickup.requested_at,
        message: outcome.message.clone(),
    };
    store.record_pickup(order_id, &updated).await?;
    Ok(outcome)
}

/// Ask the carrier for the live state of an order's pickup. Read-only.
pub async fn pickup_status(
    store: &dyn OrderStore,
    carrier: &dyn CarrierAdapter,
    store_id: StoreId,
    order_id: OrderId,
) -> Result<PickupOutcome, DispatchError> {
    let order = load_owned(store, store_id, order_id).await?;
    let pickup_id = order
        .pickup
        .and_then(|p| p.pickup_id)
        .ok_or_else(|| DispatchError::Validation("no pickup on this order".to_string()))?;
    Ok(carrier.pickup_status(&pickup_id).await?)
}

/// Load an order and verify store ownership.
///
/// An ownership mismatch reads as not-found so a caller can never probe
/// whether an order exists under another store.
async fn load_owned(
    store: &dyn OrderStore,
    store_id: StoreId,
    order_id: OrderId,
) -> Result<Order, DispatchError> {
    let order = store
        .find_by_id(order_id)
        .await?
        .ok_or(DispatchError::NotFound)?;
    if order.store_id != store_id {
        return Err(DispatchError::NotFound);
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use rust_decimal::Decimal;

    use crate::carrier::NormalizedTracking;
    use crate::db::MemoryOrderStore;
    use crate::models::{Address, OrderContact};

    use super::*;

    struct ManifestCarrier;

    #[async_trait]
    impl CarrierAdapter for ManifestCarrier {
        fn name(&self) -> &str {
            "Delhivery"
        }

        fn tracking_url(&self, waybill: &str) -> String {
            format!("https://www.delhivery.com/track/package/{waybill}")
        }

        async fn fetch_tracking(&self, waybill: &str) -> Result<NormalizedTracking, CarrierError> {
            Err(CarrierError::NotFound(waybill.to_string()))
        }

        async fn register_shipment(&self, _order: &Order) -> Result<String, CarrierError> {
            Ok("WB777".to_string())
        }

        async fn schedule_pickup(
            &self,
            _req: &PickupRequest,
        ) -> Result<PickupOutcome, CarrierError> {
            Ok(PickupOutcome {
                scheduled: true,
                pickup_id: Some("pk-1".to_string()),
                message: "pickup request accepted".to_string(),
            })
        }

        async fn cancel_pickup(&self, _pickup_id: &str) -> Result<PickupOutcome, CarrierError> {
            Ok(PickupOutcome::rejected("cancelled"))
        }

        async fn pickup_status(&self, pickup_id: &str) -> Result<PickupOutcome, CarrierError> {
            Ok(PickupOutcome {
                scheduled: true,
                pickup_id: Some(pickup_id.to_string()),
                message: "Scheduled".to_string(),
            })
        }
    }

    fn order(store_id: StoreId) -> Order {
        Order {
            id: OrderId::generate(),
            short_code: None,
            store_id,
            contact: OrderContact::Guest {
                name: "Meera".into(),
                email: Some("meera@example.com".into()),
                phone: Some("9876543210".into()),
            },
            status: OrderStatus::OrderPlaced,
            tracking_id: None,
            courier: None,
            tracking_url: None,
            shipping_address: Address {
                street: "14 MG Road".into(),
                city: "Bengaluru".into(),
                state: "KA".into(),
                pincode: "560001".into(),
            },
            line_items: vec![],
            total: Decimal::ZERO,
            pickup: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_tracking_only_update_has_no_notification_status() {
        let store = MemoryOrderStore::new();
        let notifier = Notifier::disabled();
        let store_id = StoreId::generate();
        let o = order(store_id);
        let id = o.id;
        store.insert(o).await;

        let patch = OrderPatch {
            tracking_id: Some("WB42".into()),
            ..OrderPatch::default()
        };
        let outcome = update_order(&store, &notifier, store_id, id, patch)
            .await
            .unwrap();
        assert_eq!(outcome.status_for_notification, None);
        assert_eq!(outcome.order.tracking_id.as_deref(), Some("WB42"));
        assert_eq!(outcome.order.status, OrderStatus::OrderPlaced);
    }

    #[tokio::test]
    async fn test_status_update_announces_the_new_status() {
        let store = MemoryOrderStore::new();
        let notifier = Notifier::disabled();
        let store_id = StoreId::generate();
        let o = order(store_id);
        let id = o.id;
        store.insert(o).await;

        let patch = OrderPatch {
            status: Some(OrderStatus::Shipped),
            ..OrderPatch::default()
        };
        let outcome = update_order(&store, &notifier, store_id, id, patch)
            .await
            .unwrap();
        assert_eq!(outcome.status_for_notification, Some(OrderStatus::Shipped));
        assert_eq!(outcome.order.status, OrderStatus::Shipped);
    }

    #[tokio::test]
    async fn test_empty_patch_is_rejected() {
        let store = MemoryOrderStore::new();
        let notifier = Notifier::disabled();
        let store_id = StoreId::generate();
        let o = order(store_id);
        let id = o.id;
        store.insert(o).await;

        let err = update_order(&store, &notifier, store_id, id, OrderPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Validation(_)));
    }

    #[tokio::test]
    async fn test_foreign_store_reads_as_not_found() {
        let store = MemoryOrderStore::new();
        let notifier = Notifier::disabled();
        let o = order(StoreId::generate());
        let id = o.id;
        store.insert(o).await;

        let patch = OrderPatch {
            status: Some(OrderStatus::Shipped),
            ..OrderPatch::default()
        };
        let err = update_order(&store, &notifier, StoreId::generate(), id, patch)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::NotFound));
    }

    #[tokio::test]
    async fn test_second_send_to_carrier_conflicts_with_first_waybill() {
        let store = MemoryOrderStore::new();
        let notifier = Notifier::disabled();
        let store_id = StoreId::generate();
        let o = order(store_id);
        let id = o.id;
        store.insert(o).await;

        let sent = send_to_carrier(&store, &ManifestCarrier, &notifier, store_id, id)
            .await
            .unwrap();
        assert_eq!(sent.status, OrderStatus::PendingAssignment);
        assert_eq!(sent.tracking_id.as_deref(), Some("WB777"));
        assert_eq!(sent.courier.as_deref(), Some("Delhivery"));

        let err = send_to_carrier(&store, &ManifestCarrier, &notifier, store_id, id)
            .await
            .unwrap_err();
        match err {
            DispatchError::AlreadySent { tracking_id } => assert_eq!(tracking_id, "WB777"),
            other => panic!("expected AlreadySent, got {other:?}"),
        }

        // Status unchanged by the failed second attempt.
        let stored = store.get(id).await.unwrap();
        assert_eq!(stored.status, OrderStatus::PendingAssignment);
    }

    #[tokio::test]
    async fn test_send_to_carrier_requires_a_shippable_address() {
        let store = MemoryOrderStore::new();
        let notifier = Notifier::disabled();
        let store_id = StoreId::generate();
        let mut o = order(store_id);
        o.shipping_address = Address::default();
        let id = o.id;
        store.insert(o).await;

        let err = send_to_carrier(&store, &ManifestCarrier, &notifier, store_id, id)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Validation(_)));

        let stored = store.get(id).await.unwrap();
        assert_eq!(stored.status, OrderStatus::OrderPlaced);
        assert!(stored.tracking_id.is_none());
    }

    #[tokio::test]
    async fn test_pickup_lifecycle_is_persisted() {
        let store = MemoryOrderStore::new();
        let store_id = StoreId::generate();
        let o = order(store_id);
        let id = o.id;
        store.insert(o).await;

        let req = PickupRequest {
            location: "primary".into(),
            date: chrono::NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            time: "11:00".into(),
            package_count: 2,
        };
        let pickup = schedule_pickup(&store, &ManifestCarrier, store_id, id, req)
            .await
            .unwrap();
        assert!(pickup.scheduled);
        assert_eq!(pickup.pickup_id.as_deref(), Some("pk-1"));

        let status = pickup_status(&store, &ManifestCarrier, store_id, id)
            .await
            .unwrap();
        assert!(status.scheduled);

        let outcome = cancel_pickup(&store, &ManifestCarrier, store_id, id)
            .await
            .unwrap();
        assert!(!outcome.scheduled);

        let stored = store.get(id).await.unwrap();
        let stored_pickup = stored.pickup.unwrap();
        assert!(!stored_pickup.scheduled);
        assert_eq!(stored_pickup.pickup_id.as_deref(), Some("pk-1"));
    }
}
