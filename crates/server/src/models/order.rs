//! The order entity and its sub-resources.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shipline_core::{CustomerId, OrderId, OrderStatus, StoreId};

/// An order as held in the order store.
///
/// The reconciliation engine reads orders, merges fresh carrier data into
/// the response view, and mutates shipment fields through the dispatcher; it
/// never deletes orders.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    /// Internal unique id.
    pub id: OrderId,
    /// Human-facing short numeric code, backfilled lazily from the id.
    pub short_code: Option<u32>,
    /// Owning store (seller).
    pub store_id: StoreId,
    /// Registered customer or guest checkout identity. Exactly one of the
    /// two, enforced by the enum.
    pub contact: OrderContact,
    /// Current shipment status.
    pub status: OrderStatus,
    /// Carrier-assigned waybill, absent until dispatched.
    pub tracking_id: Option<String>,
    /// Free-text carrier name.
    pub courier: Option<String>,
    /// Public tracking link, absent until known.
    pub tracking_url: Option<String>,
    /// Shipping destination.
    pub shipping_address: Address,
    /// Purchased items.
    pub line_items: Vec<LineItem>,
    /// Order total.
    pub total: Decimal,
    /// Carrier pickup request, if one was ever scheduled.
    pub pickup: Option<Pickup>,
    /// Creation time (checkout).
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
}

/// Who placed the order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OrderContact {
    /// A registered customer account.
    Customer {
        id: CustomerId,
        email: String,
        phone: Option<String>,
    },
    /// A guest identity captured at checkout.
    Guest {
        name: String,
        email: Option<String>,
        phone: Option<String>,
    },
}

impl OrderContact {
    /// Email address to notify, if any.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        match self {
            Self::Customer { email, .. } => Some(email),
            Self::Guest { email, .. } => email.as_deref(),
        }
    }

    /// Shipping contact phone, if any.
    #[must_use]
    pub fn phone(&self) -> Option<&str> {
        match self {
            Self::Customer { phone, .. } | Self::Guest { phone, .. } => phone.as_deref(),
        }
    }

    /// Display name for notification templates.
    #[must_use]
    pub fn display_name(&self) -> &str {
        match self {
            Self::Customer { .. } => "there",
            Self::Guest { name, .. } => name,
        }
    }
}

/// A shipping address.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
}

impl Address {
    /// Whether the address is complete enough to hand to a carrier.
    ///
    /// Street and city are the minimum the carrier manifest call accepts.
    #[must_use]
    pub fn is_shippable(&self) -> bool {
        !self.street.trim().is_empty() && !self.city.trim().is_empty()
    }
}

/// A purchased item on an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub sku: String,
    pub title: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

/// A carrier pickup request attached to an order.
///
/// Created only by the schedule-pickup operation and never mutated
/// elsewhere. A rejected pickup is recorded with `scheduled = false` and the
/// carrier's message; rejection is not a system fault.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pickup {
    pub scheduled: bool,
    pub pickup_id: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub message: String,
}

impl Order {
    /// The waybill to track with, if the order carries one.
    #[must_use]
    pub fn waybill(&self) -> Option<&str> {
        self.tracking_id.as_deref().filter(|w| !w.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_shippable() {
        let complete = Address {
            street: "14 MG Road".into(),
            city: "Bengaluru".into(),
            state: "KA".into(),
            pincode: "560001".into(),
        };
        assert!(complete.is_shippable());

        let missing_city = Address {
            street: "14 MG Road".into(),
            city: "  ".into(),
            ..Address::default()
        };
        assert!(!missing_city.is_shippable());
        assert!(!Address::default().is_shippable());
    }

    #[test]
    fn test_contact_channels() {
        let guest = OrderContact::Guest {
            name: "Asha".into(),
            email: None,
            phone: Some("9876543210".into()),
        };
        assert_eq!(guest.email(), None);
        assert_eq!(guest.phone(), Some("9876543210"));
        assert_eq!(guest.display_name(), "Asha");

        let customer = OrderContact::Customer {
            id: shipline_core::CustomerId::generate(),
            email: "asha@example.com".into(),
            phone: None,
        };
        assert_eq!(customer.email(), Some("asha@example.com"));
        assert_eq!(customer.phone(), None);
    }
}
