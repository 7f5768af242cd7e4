//! SMS gateway client for order update texts.
//!
//! A thin JSON client over a generic transactional SMS gateway. Messages
//! are short status lines; the gateway handles carrier routing.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

use crate::config::SmsConfig;

/// Errors that can occur when sending an SMS.
#[derive(Debug, Error)]
pub enum SmsError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Gateway returned an error response.
    #[error("SMS gateway error: {status} - {message}")]
    Gateway { status: u16, message: String },

    /// Unauthorized (invalid API key).
    #[error("Unauthorized: invalid SMS API key")]
    Unauthorized,
}

#[derive(Debug, Deserialize)]
struct GatewayErrorBody {
    #[serde(alias = "error")]
    message: Option<String>,
}

/// SMS gateway client.
#[derive(Clone)]
pub struct SmsClient {
    client: reqwest::Client,
    gateway_url: String,
    api_key: SecretString,
    sender_id: String,
}

impl SmsClient {
    /// Create a new SMS client from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &SmsConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            gateway_url: config.gateway_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            sender_id: config.sender_id.clone(),
        })
    }

    /// Send a text message to a phone number.
    ///
    /// # Errors
    ///
    /// Returns error if the gateway rejects the message or is unreachable.
    pub async fn send(&self, phone: &str, message: &str) -> Result<(), SmsError> {
        let body = serde_json::json!({
            "to": phone,
            "message": message,
            "sender_id": self.sender_id,
        });

        let response = self
            .client
            .post(format!("{}/messages", self.gateway_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(SmsError::Unauthorized);
        }
        if !status.is_success() {
            let message = response
                .json::<GatewayErrorBody>()
                .await
                .ok()
                .and_then(|b| b.message)
                .unwrap_or_else(|| "unreadable error body".to_string());
            return Err(SmsError::Gateway {
                status: status.as_u16(),
                message,
            });
        }

        tracing::info!(to = %phone, "SMS sent successfully");
        Ok(())
    }
}
