//! Order store: the trait the engine consumes plus its backends.
//!
//! The engine treats persistence as an external collaborator offering
//! query-by-field and atomic update operations. [`OrderStore`] is that
//! contract; [`PgOrderStore`] is the production Postgres backend and
//! [`MemoryOrderStore`] backs tests and local development.

pub mod memory;
pub mod orders;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use memory::MemoryOrderStore;
pub use orders::PgOrderStore;

use shipline_core::{OrderId, OrderStatus, StoreId};

use crate::models::{Order, Pickup};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,
}

/// A partial update of an order's shipment fields.
///
/// Only fields that are `Some` are written; everything else is left
/// untouched. This is the unit of atomicity for order mutations.
#[derive(Debug, Clone, Default)]
pub struct ShipmentPatch {
    pub status: Option<OrderStatus>,
    pub tracking_id: Option<String>,
    pub tracking_url: Option<String>,
    pub courier: Option<String>,
}

impl ShipmentPatch {
    /// Whether the patch carries anything to write.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.tracking_id.is_none()
            && self.tracking_url.is_none()
            && self.courier.is_none()
    }
}

/// The persistence contract the reconciliation engine consumes.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Exact match on the carrier-assigned waybill.
    async fn find_by_tracking_id(&self, tracking_id: &str)
    -> Result<Option<Order>, RepositoryError>;

    /// Lookup by internal id.
    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Lookup by the human-facing short numeric code.
    async fn find_by_short_code(&self, code: u32) -> Result<Option<Order>, RepositoryError>;

    /// Most recent order whose shipping contact phone matches (normalized).
    async fn find_latest_by_phone(&self, phone: &str) -> Result<Option<Order>, RepositoryError>;

    /// All orders belonging to a store, newest first.
    async fn list_for_store(&self, store_id: StoreId) -> Result<Vec<Order>, RepositoryError>;

    /// Atomically apply a shipment patch, returning the updated order.
    async fn update_shipment(
        &self,
        id: OrderId,
        patch: &ShipmentPatch,
    ) -> Result<Order, RepositoryError>;

    /// Backfill the derived short code.
    async fn set_short_code(&self, id: OrderId, code: u32) -> Result<(), RepositoryError>;

    /// Attach a pickup record to an order.
    async fn record_pickup(&self, id: OrderId, pickup: &Pickup) -> Result<(), RepositoryError>;

    /// Backend connectivity probe for readiness checks.
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
