//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers return `Result<T, AppError>`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::carrier::CarrierError;
use crate::db::RepositoryError;
use crate::dispatch::DispatchError;
use crate::reconcile::TrackError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(RepositoryError),

    /// Carrier API operation failed.
    #[error("Carrier error: {0}")]
    Carrier(CarrierError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or invalid credentials, or a store-ownership mismatch.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Order was already sent to the carrier.
    #[error("Order already sent to carrier with waybill {tracking_id}")]
    AlreadySent { tracking_id: String },

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound("order not found".to_string()),
            other => Self::Database(other),
        }
    }
}

impl From<CarrierError> for AppError {
    fn from(err: CarrierError) -> Self {
        match err {
            CarrierError::NotFound(waybill) => {
                Self::NotFound(format!("no shipment found for {waybill}"))
            }
            CarrierError::Rejected(msg) => Self::Validation(msg),
            other => Self::Carrier(other),
        }
    }
}

impl From<TrackError> for AppError {
    fn from(err: TrackError) -> Self {
        match err {
            TrackError::NotFound => Self::NotFound("order not found".to_string()),
            TrackError::Carrier(err) => err.into(),
            TrackError::Repository(err) => err.into(),
        }
    }
}

impl From<DispatchError> for AppError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::NotFound => Self::NotFound("order not found".to_string()),
            DispatchError::AlreadySent { tracking_id } => Self::AlreadySent { tracking_id },
            DispatchError::Validation(msg) => Self::Validation(msg),
            DispatchError::Carrier(err) => err.into(),
            DispatchError::Repository(err) => err.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(
            self,
            Self::Database(_)
                | Self::Internal(_)
                | Self::Carrier(CarrierError::Configuration(_) | CarrierError::Unavailable(_))
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Carrier(err) => match err {
                // A missing credential is a deployment fault on our side,
                // not a carrier outage.
                CarrierError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
                CarrierError::Unavailable(_) | CarrierError::Parse(_) => StatusCode::BAD_GATEWAY,
                CarrierError::NotFound(_) => StatusCode::NOT_FOUND,
                CarrierError::Rejected(_) => StatusCode::BAD_REQUEST,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::AlreadySent { .. } => StatusCode::CONFLICT,
        };

        // Don't expose internal error details to clients
        let body = match &self {
            Self::Database(_) | Self::Internal(_) => json!({ "error": "Internal server error" }),
            Self::Carrier(err) => match err {
                CarrierError::Configuration(_) => json!({ "error": "Carrier not configured" }),
                CarrierError::Unavailable(_) | CarrierError::Parse(_) => {
                    json!({ "error": "Carrier unavailable" })
                }
                _ => json!({ "error": err.to_string() }),
            },
            Self::AlreadySent { tracking_id } => json!({
                "error": "order already sent to carrier",
                "tracking_id": tracking_id,
            }),
            _ => json!({ "error": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (
                AppError::Carrier(CarrierError::Configuration("no token".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                AppError::Carrier(CarrierError::Unavailable("503".into())),
                StatusCode::BAD_GATEWAY,
            ),
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (
                AppError::AlreadySent {
                    tracking_id: "WB1".into(),
                },
                StatusCode::CONFLICT,
            ),
            (
                AppError::Unauthorized("x".into()),
                StatusCode::UNAUTHORIZED,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn test_internal_details_are_redacted() {
        let err = AppError::Database(RepositoryError::DataCorruption(
            "contact_phone column broken".into(),
        ));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
