//! Canonical, carrier-agnostic tracking types.
//!
//! These are ephemeral: the engine builds them from a live carrier response
//! and merges them into the outgoing payload, but never persists them unless
//! an explicit write-back operation does so.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A normalized tracking record for one shipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedTracking {
    /// Canonical carrier name.
    pub courier: String,
    /// Waybill/AWB code. Always non-empty if the record exists.
    pub tracking_id: String,
    /// Public tracking link derived from the waybill. Never an empty or
    /// dangling link: absent when no waybill is known.
    pub tracking_url: Option<String>,
    /// Latest carrier status label, verbatim.
    pub current_status: String,
    /// Time of the latest status, carrier-local.
    pub current_status_time: Option<NaiveDateTime>,
    /// Location of the latest status.
    pub current_status_location: Option<String>,
    /// Promised delivery date, if the carrier reports one.
    pub expected_delivery_date: Option<NaiveDate>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    /// Scan events sorted newest-first. The ordering is a hard contract;
    /// consumers display "latest first" without re-sorting.
    pub events: Vec<ScanEvent>,
}

/// One scan event on a shipment's journey.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanEvent {
    /// Scan time, carrier-local.
    pub time: Option<NaiveDateTime>,
    /// Status label, verbatim.
    pub status: String,
    pub location: Option<String>,
    /// Free-text carrier remark.
    pub remark: Option<String>,
}

/// A pickup request handed to the carrier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickupRequest {
    /// Registered pickup location name at the carrier.
    pub location: String,
    /// Requested pickup date (YYYY-MM-DD).
    pub date: NaiveDate,
    /// Requested pickup time window start (HH:MM).
    pub time: String,
    /// Number of packages to collect.
    pub package_count: u32,
}

/// Result of a pickup call.
///
/// Carrier-side rejection is a value, not an error: callers persist the
/// failure message without treating it as a system fault.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickupOutcome {
    pub scheduled: bool,
    pub pickup_id: Option<String>,
    pub message: String,
}

impl PickupOutcome {
    /// A rejected pickup carrying the carrier's message.
    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            scheduled: false,
            pickup_id: None,
            message: message.into(),
        }
    }
}
