//! Carrier integration: the adapter contract and the Delhivery client.
//!
//! # Architecture
//!
//! - [`CarrierAdapter`] is the contract a carrier integration must satisfy:
//!   tracking lookup, shipment registration, and pickup management.
//! - [`DelhiveryClient`] is the production implementation, a REST JSON
//!   client authenticated with a static API token injected at construction.
//! - The engine only ever sees [`types::NormalizedTracking`]; every
//!   carrier-shape idiosyncrasy stays inside the adapter.

pub mod delhivery;
pub mod types;

pub use delhivery::DelhiveryClient;
pub use types::{NormalizedTracking, PickupOutcome, PickupRequest, ScanEvent};

use async_trait::async_trait;
use thiserror::Error;

use crate::models::Order;

/// Errors that can occur when talking to a carrier.
#[derive(Debug, Error)]
pub enum CarrierError {
    /// No carrier credential is configured. A deployment error, never a
    /// transient one; surfaced as a 500, never retried.
    #[error("carrier not configured: {0}")]
    Configuration(String),

    /// Network failure or carrier-side 5xx. Recoverable; swallowed at the
    /// enrichment boundary, surfaced only on the forced direct-lookup path.
    #[error("carrier unavailable: {0}")]
    Unavailable(String),

    /// The carrier has no record of this waybill.
    #[error("no shipment found for waybill {0}")]
    NotFound(String),

    /// The carrier rejected the request as invalid (manifest refused, bad
    /// payload). A caller error, not an outage.
    #[error("carrier rejected request: {0}")]
    Rejected(String),

    /// The carrier responded with a shape we cannot interpret.
    #[error("carrier response parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for CarrierError {
    fn from(err: reqwest::Error) -> Self {
        Self::Unavailable(err.to_string())
    }
}

/// The contract a carrier integration must satisfy.
#[async_trait]
pub trait CarrierAdapter: Send + Sync {
    /// Canonical carrier name, as written into `courier` fields.
    fn name(&self) -> &str;

    /// Public tracking link for a waybill.
    fn tracking_url(&self, waybill: &str) -> String;

    /// Fetch and normalize live tracking state for a waybill.
    async fn fetch_tracking(&self, waybill: &str) -> Result<NormalizedTracking, CarrierError>;

    /// Register a shipment (manifest) with the carrier, returning the
    /// assigned waybill. Backs the send-to-carrier transition.
    async fn register_shipment(&self, order: &Order) -> Result<String, CarrierError>;

    /// Request a pickup. Carrier-side rejection comes back as a
    /// `PickupOutcome` with `scheduled = false`, never as an `Err`.
    async fn schedule_pickup(&self, req: &PickupRequest) -> Result<PickupOutcome, CarrierError>;

    /// Cancel a previously scheduled pickup. Same outcome shape as
    /// [`Self::schedule_pickup`].
    async fn cancel_pickup(&self, pickup_id: &str) -> Result<PickupOutcome, CarrierError>;

    /// Query the state of a pickup request. Same outcome shape as
    /// [`Self::schedule_pickup`].
    async fn pickup_status(&self, pickup_id: &str) -> Result<PickupOutcome, CarrierError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_carrier_error_display() {
        let err = CarrierError::NotFound("WB123".to_string());
        assert_eq!(err.to_string(), "no shipment found for waybill WB123");

        let err = CarrierError::Configuration("DELHIVERY_API_TOKEN unset".to_string());
        assert_eq!(
            err.to_string(),
            "carrier not configured: DELHIVERY_API_TOKEN unset"
        );
    }

    #[test]
    fn test_pickup_rejection_is_a_value() {
        let outcome = PickupOutcome::rejected("pickup slot full");
        assert!(!outcome.scheduled);
        assert!(outcome.pickup_id.is_none());
        assert_eq!(outcome.message, "pickup slot full");
    }
}
