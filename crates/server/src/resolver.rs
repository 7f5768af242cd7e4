//! Identifier resolution for free-form tracking queries.
//!
//! Callers hand us whatever the customer typed: a waybill, an order id, a
//! short numeric code, sometimes just a phone number. Strategies run in a
//! fixed precedence order and stop at the first match.

use uuid::Uuid;

use shipline_core::OrderId;

use crate::db::{OrderStore, RepositoryError};
use crate::models::Order;

/// Minimum length of an alphanumeric query before it looks like a waybill.
///
/// Short codes top out at six digits, so anything this long that is not an
/// internal id is worth asking the carrier about directly.
const CARRIER_SHAPED_MIN_LEN: usize = 9;

/// Outcome of a resolution attempt.
#[derive(Debug)]
pub enum Resolution {
    /// A stored order matched one of the strategies.
    Found(Order),
    /// No stored order, but the query is shaped like a waybill; the caller
    /// may take it straight to the carrier. Covers shipments that were never
    /// registered locally.
    CarrierCandidate,
    /// No match and nothing worth forwarding.
    NotFound,
}

/// Resolve `query` against the order store, in precedence order:
///
/// 1. exact `tracking_id` match
/// 2. internal order id, when the query parses as one
/// 3. short numeric code, when the query is purely numeric
/// 4. most recent order matching the phone hint
///
/// The ordering is a contract. A waybill that happens to collide with some
/// order's short code must resolve to the waybill match, and the phone hint
/// is strictly a fallback since it can match many orders.
pub async fn resolve(
    store: &dyn OrderStore,
    query: &str,
    phone_hint: Option<&str>,
) -> Result<Resolution, RepositoryError> {
    let query = query.trim();

    if !query.is_empty() {
        if let Some(order) = store.find_by_tracking_id(query).await? {
            return Ok(Resolution::Found(order));
        }

        if let Ok(uuid) = query.parse::<Uuid>() {
            if let Some(order) = store.find_by_id(OrderId::new(uuid)).await? {
                return Ok(Resolution::Found(order));
            }
        } else {
            if let Ok(code) = query.parse::<u32>() {
                if let Some(order) = store.find_by_short_code(code).await? {
                    return Ok(Resolution::Found(order));
                }
            }

            if let Some(phone) = phone_hint {
                if let Some(order) = store.find_latest_by_phone(phone).await? {
                    return Ok(Resolution::Found(order));
                }
            }

            if is_carrier_shaped(query) {
                return Ok(Resolution::CarrierCandidate);
            }
            return Ok(Resolution::NotFound);
        }
    }

    if let Some(phone) = phone_hint {
        if let Some(order) = store.find_latest_by_phone(phone).await? {
            return Ok(Resolution::Found(order));
        }
    }

    Ok(Resolution::NotFound)
}

/// Whether a query that matched nothing locally still looks like a waybill.
fn is_carrier_shaped(query: &str) -> bool {
    query.len() >= CARRIER_SHAPED_MIN_LEN && query.chars().all(|c| c.is_ascii_alphanumeric())
}
