//! Delhivery REST API client.
//!
//! Tracking lookups, shipment manifest creation, and pickup management
//! against Delhivery's JSON API, authenticated with a static API token.
//!
//! # Envelope handling
//!
//! Delhivery nests the real shipment payload at variable depth: the tracking
//! endpoint wraps it as `{"ShipmentData":[{"Shipment":{...}}]}`, while some
//! deployments hand the engine an already-unwrapped shipment object. The
//! parse step is an explicit two-shape union rather than optional chaining,
//! so both shapes are an accepted, tested contract.

use chrono::{NaiveDate, NaiveDateTime};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::instrument;

use async_trait::async_trait;

use super::types::{NormalizedTracking, PickupOutcome, PickupRequest, ScanEvent};
use super::{CarrierAdapter, CarrierError};
use crate::config::CarrierConfig;
use crate::models::Order;

/// Canonical carrier name written into `courier` fields.
const CARRIER_NAME: &str = "Delhivery";

/// Public tracking page; the API host is configurable, this is not.
const PUBLIC_TRACK_URL: &str = "https://www.delhivery.com/track/package";

/// Delhivery API client.
///
/// The API token is injected at construction; a missing credential is a
/// construction-time configuration error, never discovered mid-request.
#[derive(Clone)]
pub struct DelhiveryClient {
    client: reqwest::Client,
    base_url: String,
    api_token: SecretString,
    pickup_location: String,
}

impl DelhiveryClient {
    /// Create a new Delhivery client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `CarrierError::Configuration` if the API token is empty, and
    /// `CarrierError::Unavailable` if the HTTP client cannot be built.
    pub fn new(config: &CarrierConfig) -> Result<Self, CarrierError> {
        if config.api_token.expose_secret().trim().is_empty() {
            return Err(CarrierError::Configuration(
                "DELHIVERY_API_TOKEN is empty".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
            pickup_location: config.pickup_location.clone(),
        })
    }

    fn auth_header(&self) -> String {
        format!("Token {}", self.api_token.expose_secret())
    }

    /// Map non-success statuses to the carrier error taxonomy.
    fn check_status(status: reqwest::StatusCode, waybill: &str) -> Result<(), CarrierError> {
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(CarrierError::Configuration(format!(
                "carrier rejected credential ({status})"
            )));
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(CarrierError::NotFound(waybill.to_string()));
        }
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(CarrierError::Unavailable(format!(
                "carrier returned {status}"
            )));
        }
        if !status.is_success() {
            return Err(CarrierError::Rejected(format!("carrier returned {status}")));
        }
        Ok(())
    }
}

#[async_trait]
impl CarrierAdapter for DelhiveryClient {
    fn name(&self) -> &str {
        CARRIER_NAME
    }

    fn tracking_url(&self, waybill: &str) -> String {
        format!("{PUBLIC_TRACK_URL}/{waybill}")
    }

    #[instrument(skip(self), fields(waybill = %waybill))]
    async fn fetch_tracking(&self, waybill: &str) -> Result<NormalizedTracking, CarrierError> {
        let url = format!("{}/api/v1/packages/json/", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("waybill", waybill)])
            .header("Authorization", self.auth_header())
            .send()
            .await?;

        Self::check_status(response.status(), waybill)?;

        let body = response.text().await?;
        let shipment = parse_track_payload(&body)?.ok_or_else(|| {
            CarrierError::NotFound(waybill.to_string())
        })?;

        Ok(normalize(shipment, waybill, |wb| self.tracking_url(wb)))
    }

    #[instrument(skip(self, order), fields(order_id = %order.id))]
    async fn register_shipment(&self, order: &Order) -> Result<String, CarrierError> {
        let data = serde_json::json!({
            "pickup_location": { "name": self.pickup_location },
            "shipments": [{
                "order": order.id.to_string(),
                "name": order.contact.display_name(),
                "add": order.shipping_address.street,
                "city": order.shipping_address.city,
                "state": order.shipping_address.state,
                "pin": order.shipping_address.pincode,
                "phone": order.contact.phone().unwrap_or_default(),
                "payment_mode": "Prepaid",
            }]
        });

        let url = format!("{}/api/cmu/create.json", self.base_url);
        // The manifest endpoint takes form-encoded `format` and `data` keys,
        // the `data` value itself being a JSON document.
        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth_header())
            .form(&[("format", "json"), ("data", &data.to_string())])
            .send()
            .await?;

        Self::check_status(response.status(), "")?;

        let body: ManifestResponse = response
            .json()
            .await
            .map_err(|e| CarrierError::Parse(e.to_string()))?;

        let package = body
            .packages
            .into_iter()
            .next()
            .ok_or_else(|| CarrierError::Rejected("manifest returned no packages".to_string()))?;

        match package.waybill.filter(|w| !w.is_empty()) {
            Some(waybill) => Ok(waybill),
            None => Err(CarrierError::Rejected(
                package
                    .remarks
                    .unwrap_or_else(|| "carrier assigned no waybill".to_string()),
            )),
        }
    }

    #[instrument(skip(self, req), fields(date = %req.date))]
    async fn schedule_pickup(&self, req: &PickupRequest) -> Result<PickupOutcome, CarrierError> {
        let url = format!("{}/fm/request/new/", self.base_url);
        let body = serde_json::json!({
            "pickup_location": req.location,
            "pickup_date": req.date.to_string(),
            "pickup_time": req.time,
            "expected_package_count": req.package_count,
        });
        self.pickup_call(&url, &body).await
    }

    #[instrument(skip(self))]
    async fn cancel_pickup(&self, pickup_id: &str) -> Result<PickupOutcome, CarrierError> {
        let url = format!("{}/fm/request/cancel/", self.base_url);
        let body = serde_json::json!({ "pickup_id": pickup_id });
        self.pickup_call(&url, &body).await
    }

    #[instrument(skip(self))]
    async fn pickup_status(&self, pickup_id: &str) -> Result<PickupOutcome, CarrierError> {
        let url = format!("{}/fm/request/status/", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("pickup_id", pickup_id)])
            .header("Authorization", self.auth_header())
            .send()
            .await?;
        Self::parse_pickup_response(response).await
    }
}

impl DelhiveryClient {
    async fn pickup_call(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<PickupOutcome, CarrierError> {
        let response = self
            .client
            .post(url)
            .header("Authorization", self.auth_header())
            .json(body)
            .send()
            .await?;
        Self::parse_pickup_response(response).await
    }

    /// Turn a pickup endpoint response into an outcome.
    ///
    /// 4xx responses with a readable message become rejected outcomes, not
    /// errors: the caller persists the failure message. Only credential and
    /// availability problems escape as `Err`.
    async fn parse_pickup_response(
        response: reqwest::Response,
    ) -> Result<PickupOutcome, CarrierError> {
        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(CarrierError::Configuration(format!(
                "carrier rejected credential ({status})"
            )));
        }
        if status.is_server_error() {
            return Err(CarrierError::Unavailable(format!(
                "carrier returned {status}"
            )));
        }

        let body = response.text().await?;
        let parsed: PickupResponse =
            serde_json::from_str(&body).map_err(|e| CarrierError::Parse(e.to_string()))?;

        if status.is_success() && parsed.error.is_none() {
            Ok(PickupOutcome {
                scheduled: true,
                pickup_id: parsed.pickup_id.map(pickup_id_string),
                message: parsed
                    .message
                    .unwrap_or_else(|| "pickup request accepted".to_string()),
            })
        } else {
            Ok(PickupOutcome::rejected(
                parsed
                    .error
                    .or(parsed.message)
                    .unwrap_or_else(|| format!("carrier returned {status}")),
            ))
        }
    }
}

// =============================================================================
// Wire Types
// =============================================================================

/// The two accepted shapes of a tracking response.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TrackPayload {
    /// Full envelope as the tracking endpoint returns it.
    Envelope {
        #[serde(rename = "ShipmentData")]
        shipment_data: Vec<ShipmentWrapper>,
    },
    /// An already-unwrapped shipment object.
    Shipment(Box<RawShipment>),
}

#[derive(Debug, Deserialize)]
struct ShipmentWrapper {
    #[serde(rename = "Shipment")]
    shipment: RawShipment,
}

#[derive(Debug, Default, Deserialize)]
struct RawShipment {
    #[serde(rename = "Waybill")]
    waybill: Option<String>,
    #[serde(rename = "Status")]
    status: Option<RawStatus>,
    #[serde(rename = "Scans", default)]
    scans: Vec<RawScanWrapper>,
    #[serde(rename = "ExpectedDeliveryDate")]
    expected_delivery_date: Option<String>,
    #[serde(rename = "Origin")]
    origin: Option<String>,
    #[serde(rename = "Destination")]
    destination: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawStatus {
    #[serde(rename = "Status")]
    status: Option<String>,
    #[serde(rename = "StatusDateTime")]
    status_date_time: Option<String>,
    #[serde(rename = "StatusLocation")]
    status_location: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawScanWrapper {
    #[serde(rename = "ScanDetail")]
    scan_detail: RawScan,
}

#[derive(Debug, Default, Deserialize)]
struct RawScan {
    #[serde(rename = "ScanDateTime")]
    scan_date_time: Option<String>,
    #[serde(rename = "Scan")]
    scan: Option<String>,
    #[serde(rename = "ScannedLocation")]
    scanned_location: Option<String>,
    #[serde(rename = "Instructions")]
    instructions: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ManifestResponse {
    #[serde(default)]
    packages: Vec<ManifestPackage>,
}

#[derive(Debug, Deserialize)]
struct ManifestPackage {
    waybill: Option<String>,
    remarks: Option<String>,
}

/// Pickup endpoints disagree on the id key's casing across API versions.
#[derive(Debug, Deserialize)]
struct PickupResponse {
    #[serde(alias = "PickupId", alias = "pickup_request_id")]
    pickup_id: Option<serde_json::Value>,
    message: Option<String>,
    error: Option<String>,
}

// =============================================================================
// Normalization
// =============================================================================

/// Pickup ids arrive as either a JSON number or a string.
fn pickup_id_string(id: serde_json::Value) -> String {
    match id {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Parse a tracking response body, accepting either envelope shape.
///
/// Returns `Ok(None)` when the body parsed but contained no shipment.
fn parse_track_payload(body: &str) -> Result<Option<RawShipment>, CarrierError> {
    let payload: TrackPayload =
        serde_json::from_str(body).map_err(|e| CarrierError::Parse(e.to_string()))?;

    Ok(match payload {
        TrackPayload::Envelope { shipment_data } => {
            shipment_data.into_iter().next().map(|w| w.shipment)
        }
        TrackPayload::Shipment(shipment) => Some(*shipment),
    })
}

/// Build a canonical tracking record from a raw shipment.
///
/// Guarantees of this step:
/// - the waybill falls back to the caller-supplied one when omitted;
/// - scan events come out sorted newest-first (stable, so unchanged carrier
///   state reproduces identical orderings);
/// - a tracking URL is synthesized only when a waybill exists.
fn normalize(
    raw: RawShipment,
    fallback_waybill: &str,
    make_url: impl Fn(&str) -> String,
) -> NormalizedTracking {
    let tracking_id = raw
        .waybill
        .filter(|w| !w.trim().is_empty())
        .unwrap_or_else(|| fallback_waybill.to_string());

    let mut events: Vec<ScanEvent> = raw
        .scans
        .into_iter()
        .map(|w| ScanEvent {
            time: w.scan_detail.scan_date_time.as_deref().and_then(parse_datetime),
            status: w.scan_detail.scan.unwrap_or_default(),
            location: w.scan_detail.scanned_location,
            remark: w.scan_detail.instructions,
        })
        .collect();
    // Newest first; events without a parsable time sink to the end.
    events.sort_by(|a, b| b.time.cmp(&a.time));

    let status = raw.status.unwrap_or_default();

    let tracking_url = if tracking_id.trim().is_empty() {
        None
    } else {
        Some(make_url(&tracking_id))
    };

    NormalizedTracking {
        courier: CARRIER_NAME.to_string(),
        tracking_id,
        tracking_url,
        current_status: status.status.unwrap_or_default(),
        current_status_time: status.status_date_time.as_deref().and_then(parse_datetime),
        current_status_location: status.status_location,
        expected_delivery_date: raw
            .expected_delivery_date
            .as_deref()
            .and_then(parse_date),
        origin: raw.origin,
        destination: raw.destination,
        events,
    }
}

/// Parse the datetime shapes the carrier emits, carrier-local time.
fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_datetime(s).map(|dt| dt.date()))
}
