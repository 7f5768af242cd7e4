//! Order shipment status state machine.

use serde::{Deserialize, Serialize};

/// Shipment lifecycle status of an order.
///
/// Orders are created as `ORDER_PLACED`, move to `PENDING_ASSIGNMENT` when
/// handed to the carrier, and pass through carrier-reported transit states
/// until one of the terminal states. Carrier scan labels that have no local
/// counterpart are surfaced verbatim through the tracking payload, never
/// written into this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Created at checkout, not yet handed to a carrier.
    #[default]
    OrderPlaced,
    /// Sent to the carrier, waiting for the first scan.
    PendingAssignment,
    /// Dispatched from the origin facility.
    Shipped,
    /// Moving through the carrier network.
    InTransit,
    /// Out with the delivery agent.
    OutForDelivery,
    /// Delivered to the recipient. Terminal.
    Delivered,
    /// Returned to origin. Terminal.
    Returned,
    /// Cancelled before dispatch.
    Cancelled,
}

impl OrderStatus {
    /// Whether this status is terminal.
    ///
    /// Terminal orders can no longer change at the carrier, so the
    /// reconciliation engine never refetches them. This is the key
    /// cost-control invariant of the refetch policy.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Returned)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::OrderPlaced => "ORDER_PLACED",
            Self::PendingAssignment => "PENDING_ASSIGNMENT",
            Self::Shipped => "SHIPPED",
            Self::InTransit => "IN_TRANSIT",
            Self::OutForDelivery => "OUT_FOR_DELIVERY",
            Self::Delivered => "DELIVERED",
            Self::Returned => "RETURNED",
            Self::Cancelled => "CANCELLED",
        };
        write!(f, "{label}")
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ORDER_PLACED" => Ok(Self::OrderPlaced),
            "PENDING_ASSIGNMENT" => Ok(Self::PendingAssignment),
            "SHIPPED" => Ok(Self::Shipped),
            "IN_TRANSIT" => Ok(Self::InTransit),
            "OUT_FOR_DELIVERY" => Ok(Self::OutForDelivery),
            "DELIVERED" => Ok(Self::Delivered),
            "RETURNED" => Ok(Self::Returned),
            "CANCELLED" => Ok(Self::Cancelled),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}
