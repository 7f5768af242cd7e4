//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SHIPLINE_DATABASE_URL` - `PostgreSQL` connection string
//! - `SHIPLINE_AUTH_SIGNING_KEY` - Seller bearer-token signing key (min 32 chars)
//!
//! ## Optional
//! - `SHIPLINE_HOST` - Bind address (default: 127.0.0.1)
//! - `SHIPLINE_PORT` - Listen port (default: 3000)
//! - `DELHIVERY_API_TOKEN` - Carrier API token; without it, carrier calls
//!   surface a configuration error but the rest of the API still works
//! - `DELHIVERY_BASE_URL` - Carrier API host (default: production)
//! - `DELHIVERY_PICKUP_LOCATION` - Registered pickup location name
//! - `SMTP_HOST` / `SMTP_PORT` / `SMTP_USERNAME` / `SMTP_PASSWORD` /
//!   `SMTP_FROM_ADDRESS` - Email notifications (all-or-nothing)
//! - `SMS_GATEWAY_URL` / `SMS_API_KEY` / `SMS_SENDER_ID` - SMS notifications
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag

use std::net::{IpAddr, SocketAddr};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_SIGNING_KEY_LENGTH: usize = 32;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Server application configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Seller bearer-token signing key
    pub auth_signing_key: SecretString,
    /// Carrier API configuration; absence is a deployment state, not a crash
    pub carrier: Option<CarrierConfig>,
    /// SMTP email notification configuration
    pub email: Option<EmailConfig>,
    /// SMS gateway notification configuration
    pub sms: Option<SmsConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
}

/// Carrier API configuration.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct CarrierConfig {
    /// Static API token, injected into the adapter at construction
    pub api_token: SecretString,
    /// Carrier API host
    pub base_url: String,
    /// Registered pickup location name used for manifests and pickups
    pub pickup_location: String,
}

impl std::fmt::Debug for CarrierConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CarrierConfig")
            .field("api_token", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("pickup_location", &self.pickup_location)
            .finish()
    }
}

/// SMTP email configuration.
#[derive(Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: SecretString,
    pub from_address: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

/// SMS gateway configuration.
#[derive(Clone)]
pub struct SmsConfig {
    pub gateway_url: String,
    pub api_key: SecretString,
    pub sender_id: String,
}

impl std::fmt::Debug for SmsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmsConfig")
            .field("gateway_url", &self.gateway_url)
            .field("api_key", &"[REDACTED]")
            .field("sender_id", &self.sender_id)
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid,
    /// or if the signing key fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("SHIPLINE_DATABASE_URL")?;
        let host = get_env_or_default("SHIPLINE_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("SHIPLINE_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("SHIPLINE_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("SHIPLINE_PORT".to_string(), e.to_string()))?;

        let auth_signing_key = get_required_secret("SHIPLINE_AUTH_SIGNING_KEY")?;
        validate_signing_key(&auth_signing_key, "SHIPLINE_AUTH_SIGNING_KEY")?;

        Ok(Self {
            database_url,
            host,
            port,
            auth_signing_key,
            carrier: CarrierConfig::from_env(),
            email: EmailConfig::from_env()?,
            sms: SmsConfig::from_env(),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl CarrierConfig {
    /// Load carrier configuration; `None` when no token is set.
    fn from_env() -> Option<Self> {
        let api_token = get_optional_env("DELHIVERY_API_TOKEN")?;
        Some(Self {
            api_token: SecretString::from(api_token),
            base_url: get_env_or_default("DELHIVERY_BASE_URL", "https://track.delhivery.com"),
            pickup_location: get_env_or_default("DELHIVERY_PICKUP_LOCATION", "primary"),
        })
    }
}

impl EmailConfig {
    /// Load email configuration; `None` when no SMTP host is set.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(smtp_host) = get_optional_env("SMTP_HOST") else {
            return Ok(None);
        };
        let smtp_port = get_env_or_default("SMTP_PORT", "587")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("SMTP_PORT".to_string(), e.to_string()))?;

        Ok(Some(Self {
            smtp_host,
            smtp_port,
            smtp_username: get_required_env("SMTP_USERNAME")?,
            smtp_password: get_required_secret("SMTP_PASSWORD")?,
            from_address: get_required_env("SMTP_FROM_ADDRESS")?,
        }))
    }
}

impl SmsConfig {
    /// Load SMS configuration; `None` when no gateway is set.
    fn from_env() -> Option<Self> {
        let gateway_url = get_optional_env("SMS_GATEWAY_URL")?;
        let api_key = get_optional_env("SMS_API_KEY")?;
        Some(Self {
            gateway_url,
            api_key: SecretString::from(api_key),
            sender_id: get_env_or_default("SMS_SENDER_ID", "SHPLNE"),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Validate that the signing key meets minimum length requirements.
fn validate_signing_key(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SIGNING_KEY_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SIGNING_KEY_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}
