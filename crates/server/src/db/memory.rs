//! In-memory order store for tests and local development.

use std::collections::HashMap;

use tokio::sync::RwLock;

use async_trait::async_trait;

use shipline_core::{OrderId, StoreId, normalize_phone};

use super::{OrderStore, RepositoryError, ShipmentPatch};
use crate::models::{Order, Pickup};

/// An order store backed by a `HashMap`.
///
/// Implements the same contract as the Postgres backend; lookups mirror its
/// semantics (normalized phone matching, newest-first ordering).
#[derive(Default)]
pub struct MemoryOrderStore {
    orders: RwLock<HashMap<OrderId, Order>>,
}

impl MemoryOrderStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an order. Test-harness counterpart of the external checkout flow.
    pub async fn insert(&self, order: Order) {
        self.orders.write().await.insert(order.id, order);
    }

    /// Snapshot an order by id.
    pub async fn get(&self, id: OrderId) -> Option<Order> {
        self.orders.read().await.get(&id).cloned()
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn find_by_tracking_id(
        &self,
        tracking_id: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        let orders = self.orders.read().await;
        Ok(orders
            .values()
            .find(|o| o.tracking_id.as_deref() == Some(tracking_id))
            .cloned())
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn find_by_short_code(&self, code: u32) -> Result<Option<Order>, RepositoryError> {
        let orders = self.orders.read().await;
        Ok(orders
            .values()
            .filter(|o| o.short_code == Some(code))
            .max_by_key(|o| o.created_at)
            .cloned())
    }

    async fn find_latest_by_phone(&self, phone: &str) -> Result<Option<Order>, RepositoryError> {
        let normalized = normalize_phone(phone);
        if normalized.is_empty() {
            return Ok(None);
        }
        let orders = self.orders.read().await;
        Ok(orders
            .values()
            .filter(|o| {
                o.contact
                    .phone()
                    .is_some_and(|p| normalize_phone(p) == normalized)
            })
            .max_by_key(|o| o.created_at)
            .cloned())
    }

    async fn list_for_store(&self, store_id: StoreId) -> Result<Vec<Order>, RepositoryError> {
        let orders = self.orders.read().await;
        let mut matching: Vec<Order> = orders
            .values()
            .filter(|o| o.store_id == store_id)
            .cloned()
            .collect();
        matching.sort_by_key(|o| std::cmp::Reverse(o.created_at));
        Ok(matching)
    }

    async fn update_shipment(
        &self,
        id: OrderId,
        patch: &ShipmentPatch,
    ) -> Result<Order, RepositoryError> {
        let mut orders = self.orders.write().await;
        let order = orders.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        if let Some(status) = patch.status {
            order.status = status;
        }
        if let Some(tracking_id) = &patch.tracking_id {
            order.tracking_id = Some(tracking_id.clone());
        }
        if let Some(tracking_url) = &patch.tracking_url {
            order.tracking_url = Some(tracking_url.clone());
        }
        if let Some(courier) = &patch.courier {
            order.courier = Some(courier.clone());
        }
        order.updated_at = chrono::Utc::now();
        Ok(order.clone())
    }

    async fn set_short_code(&self, id: OrderId, code: u32) -> Result<(), RepositoryError> {
        let mut orders = self.orders.write().await;
        let order = orders.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        order.short_code = Some(code);
        Ok(())
    }

    async fn record_pickup(&self, id: OrderId, pickup: &Pickup) -> Result<(), RepositoryError> {
        let mut orders = self.orders.write().await;
        let order = orders.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        order.pickup = Some(pickup.clone());
        order.updated_at = chrono::Utc::now();
        Ok(())
    }
}
