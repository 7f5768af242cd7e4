//! Postgres order store.
//!
//! The engine never creates or deletes orders; checkout and administrative
//! deletion live outside this subsystem. This backend only reads orders and
//! applies atomic shipment patches.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use async_trait::async_trait;

use shipline_core::{CustomerId, OrderId, StoreId, normalize_phone};

use super::{OrderStore, RepositoryError, ShipmentPatch};
use crate::models::{Address, LineItem, Order, OrderContact, Pickup};

const ORDER_COLUMNS: &str = "id, short_code, store_id, status, \
     tracking_id, courier, tracking_url, \
     customer_id, customer_email, guest_name, guest_email, contact_phone, \
     ship_street, ship_city, ship_state, ship_pincode, \
     line_items, total, pickup, created_at, updated_at";

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for `PostgreSQL` order queries.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    short_code: Option<i64>,
    store_id: Uuid,
    status: String,
    tracking_id: Option<String>,
    courier: Option<String>,
    tracking_url: Option<String>,
    customer_id: Option<Uuid>,
    customer_email: Option<String>,
    guest_name: Option<String>,
    guest_email: Option<String>,
    contact_phone: Option<String>,
    ship_street: String,
    ship_city: String,
    ship_state: String,
    ship_pincode: String,
    line_items: Json<Vec<LineItem>>,
    total: Decimal,
    pickup: Option<Json<Pickup>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status = row.status.parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid status in database: {e}"))
        })?;

        // Exactly one of {customer, guest} must be populated.
        let contact = match (row.customer_id, row.guest_name) {
            (Some(customer_id), None) => OrderContact::Customer {
                id: CustomerId::new(customer_id),
                email: row.customer_email.ok_or_else(|| {
                    RepositoryError::DataCorruption(format!(
                        "customer order {} has no email",
                        row.id
                    ))
                })?,
                phone: row.contact_phone,
            },
            (None, Some(name)) => OrderContact::Guest {
                name,
                email: row.guest_email,
                phone: row.contact_phone,
            },
            _ => {
                return Err(RepositoryError::DataCorruption(format!(
                    "order {} violates the single-identity invariant",
                    row.id
                )));
            }
        };

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let short_code = row.short_code.map(|c| c as u32);

        Ok(Self {
            id: OrderId::new(row.id),
            short_code,
            store_id: StoreId::new(row.store_id),
            contact,
            status,
            tracking_id: row.tracking_id,
            courier: row.courier,
            tracking_url: row.tracking_url,
            shipping_address: Address {
                street: row.ship_street,
                city: row.ship_city,
                state: row.ship_state,
                pincode: row.ship_pincode,
            },
            line_items: row.line_items.0,
            total: row.total,
            pickup: row.pickup.map(|p| p.0),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Postgres-backed order store.
#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    /// Create a new Postgres order store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn find_by_tracking_id(
        &self,
        tracking_id: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE tracking_id = $1 LIMIT 1");
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(tracking_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn find_by_short_code(&self, code: u32) -> Result<Option<Order>, RepositoryError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE short_code = $1 ORDER BY created_at DESC LIMIT 1"
        );
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(i64::from(code))
            .fetch_optional(&self.pool)
            .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn find_latest_by_phone(&self, phone: &str) -> Result<Option<Order>, RepositoryError> {
        let normalized = normalize_phone(phone);
        if normalized.is_empty() {
            return Ok(None);
        }
        // Match on normalized trailing digits so stored formatting does not matter.
        let sql = format!(
            r"SELECT {ORDER_COLUMNS} FROM orders
              WHERE contact_phone IS NOT NULL
                AND right(regexp_replace(contact_phone, '\D', '', 'g'), 10) = right($1, 10)
              ORDER BY created_at DESC LIMIT 1"
        );
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(normalized)
            .fetch_optional(&self.pool)
            .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn list_for_store(&self, store_id: StoreId) -> Result<Vec<Order>, RepositoryError> {
        let sql =
            format!("SELECT {ORDER_COLUMNS} FROM orders WHERE store_id = $1 ORDER BY created_at DESC");
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(store_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn update_shipment(
        &self,
        id: OrderId,
        patch: &ShipmentPatch,
    ) -> Result<Order, RepositoryError> {
        let sql = format!(
            r"UPDATE orders
              SET status = coalesce($2, status),
                  tracking_id = coalesce($3, tracking_id),
                  tracking_url = coalesce($4, tracking_url),
                  courier = coalesce($5, courier),
                  updated_at = now()
              WHERE id = $1
              RETURNING {ORDER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id.as_uuid())
            .bind(patch.status.map(|s| s.to_string()))
            .bind(patch.tracking_id.clone())
            .bind(patch.tracking_url.clone())
            .bind(patch.courier.clone())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        row.try_into()
    }

    async fn set_short_code(&self, id: OrderId, code: u32) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE orders SET short_code = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(i64::from(code))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn record_pickup(&self, id: OrderId, pickup: &Pickup) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE orders SET pickup = $2, updated_at = now() WHERE id = $1")
            .bind(id.as_uuid())
            .bind(Json(pickup))
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}
