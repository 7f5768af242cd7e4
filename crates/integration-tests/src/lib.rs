//! Test support for Shipline integration tests.
//!
//! Provides a configurable stub carrier and order builders so the
//! reconciliation flows can be exercised end to end against the in-memory
//! order store, with no network or database.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;

use shipline_core::{OrderId, OrderStatus, StoreId};
use shipline_server::carrier::{
    CarrierAdapter, CarrierError, NormalizedTracking, PickupOutcome, PickupRequest,
};
use shipline_server::models::{Address, LineItem, Order, OrderContact};

/// A canonical normalized tracking record for a waybill, as the stub
/// carrier would hand it back.
#[must_use]
pub fn stub_tracking(waybill: &str, status: &str) -> NormalizedTracking {
    NormalizedTracking {
        courier: "Delhivery".to_string(),
        tracking_id: waybill.to_string(),
        tracking_url: Some(format!("https://www.delhivery.com/track/package/{waybill}")),
        current_status: status.to_string(),
        current_status_time: None,
        current_status_location: Some("Bengaluru Hub".to_string()),
        expected_delivery_date: None,
        origin: Some("Bengaluru".to_string()),
        destination: Some("Mumbai".to_string()),
        events: vec![],
    }
}

/// A guest order with a complete shipping address and no shipment fields.
#[must_use]
pub fn guest_order(store_id: StoreId) -> Order {
    Order {
        id: OrderId::generate(),
        short_code: None,
        store_id,
        contact: OrderContact::Guest {
            name: "Asha".to_string(),
            email: Some("asha@example.com".to_string()),
            phone: Some("9876543210".to_string()),
        },
        status: OrderStatus::OrderPlaced,
        tracking_id: None,
        courier: None,
        tracking_url: None,
        shipping_address: Address {
            street: "14 MG Road".to_string(),
            city: "Bengaluru".to_string(),
            state: "KA".to_string(),
            pincode: "560001".to_string(),
        },
        line_items: vec![LineItem {
            sku: "TEE-BLK-M".to_string(),
            title: "Black tee, medium".to_string(),
            quantity: 1,
            unit_price: Decimal::new(49_900, 2),
        }],
        total: Decimal::new(49_900, 2),
        pickup: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// A guest order already dispatched with the given waybill.
#[must_use]
pub fn shipped_order(store_id: StoreId, waybill: &str) -> Order {
    let mut order = guest_order(store_id);
    order.status = OrderStatus::PendingAssignment;
    order.tracking_id = Some(waybill.to_string());
    order
}

/// A stub carrier with canned responses, optional per-waybill delays, and a
/// fetch counter for asserting how often the engine called out.
#[derive(Default)]
pub struct StubCarrier {
    responses: Mutex<HashMap<String, NormalizedTracking>>,
    delays: Mutex<HashMap<String, Duration>>,
    fetches: AtomicUsize,
    manifests: AtomicUsize,
}

impl StubCarrier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Respond to lookups of `waybill` with `tracking`.
    #[must_use]
    pub fn with_tracking(self, waybill: &str, tracking: NormalizedTracking) -> Self {
        if let Ok(mut responses) = self.responses.lock() {
            responses.insert(waybill.to_string(), tracking);
        }
        self
    }

    /// Delay lookups of `waybill`, to drive the bulk timeout path.
    #[must_use]
    pub fn with_delay(self, waybill: &str, delay: Duration) -> Self {
        if let Ok(mut delays) = self.delays.lock() {
            delays.insert(waybill.to_string(), delay);
        }
        self
    }

    /// How many tracking fetches the engine issued.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CarrierAdapter for StubCarrier {
    fn name(&self) -> &str {
        "Delhivery"
    }

    fn tracking_url(&self, waybill: &str) -> String {
        format!("https://www.delhivery.com/track/package/{waybill}")
    }

    async fn fetch_tracking(&self, waybill: &str) -> Result<NormalizedTracking, CarrierError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        let delay = self
            .delays
            .lock()
            .ok()
            .and_then(|delays| delays.get(waybill).copied());
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let response = self
            .responses
            .lock()
            .ok()
            .and_then(|responses| responses.get(waybill).cloned());
        response.ok_or_else(|| CarrierError::NotFound(waybill.to_string()))
    }

    async fn register_shipment(&self, _order: &Order) -> Result<String, CarrierError> {
        let n = self.manifests.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("WBSTUB{n}"))
    }

    async fn schedule_pickup(&self, req: &PickupRequest) -> Result<PickupOutcome, CarrierError> {
        Ok(PickupOutcome {
            scheduled: true,
            pickup_id: Some(format!("pk-{}", req.date)),
            message: "pickup request accepted".to_string(),
        })
    }

    async fn cancel_pickup(&self, pickup_id: &str) -> Result<PickupOutcome, CarrierError> {
        Ok(PickupOutcome {
            scheduled: false,
            pickup_id: Some(pickup_id.to_string()),
            message: "pickup cancelled".to_string(),
        })
    }

    async fn pickup_status(&self, pickup_id: &str) -> Result<PickupOutcome, CarrierError> {
        Ok(PickupOutcome {
            scheduled: true,
            pickup_id: Some(pickup_id.to_string()),
            message: "Scheduled".to_string(),
        })
    }
}
