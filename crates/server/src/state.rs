//! Application state shared across handlers.

use std::sync::Arc;

use crate::carrier::{CarrierAdapter, CarrierError, DelhiveryClient};
use crate::config::ServerConfig;
use crate::db::OrderStore;
use crate::error::AppError;
use crate::notify::Notifier;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Holds the order store, the optional carrier
/// adapter, and the notifier behind their trait seams so tests can swap in
/// in-memory and stub implementations.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    store: Arc<dyn OrderStore>,
    carrier: Option<Arc<dyn CarrierAdapter>>,
    notifier: Notifier,
}

impl AppState {
    /// Create application state, constructing the carrier adapter from
    /// configuration when a credential is present.
    ///
    /// # Errors
    ///
    /// Returns an error if carrier configuration is present but invalid.
    pub fn new(
        config: ServerConfig,
        store: Arc<dyn OrderStore>,
        notifier: Notifier,
    ) -> Result<Self, CarrierError> {
        let carrier: Option<Arc<dyn CarrierAdapter>> = match &config.carrier {
            Some(carrier_config) => Some(Arc::new(DelhiveryClient::new(carrier_config)?)),
            None => None,
        };

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                carrier,
                notifier,
            }),
        })
    }

    /// State with explicit collaborators, for tests.
    #[must_use]
    pub fn with_parts(
        config: ServerConfig,
        store: Arc<dyn OrderStore>,
        carrier: Option<Arc<dyn CarrierAdapter>>,
        notifier: Notifier,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                carrier,
                notifier,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn store(&self) -> &dyn OrderStore {
        self.inner.store.as_ref()
    }

    /// The carrier adapter, when one is configured.
    #[must_use]
    pub fn carrier(&self) -> Option<&dyn CarrierAdapter> {
        self.inner.carrier.as_deref()
    }

    /// The carrier adapter, or a configuration error for operations that
    /// cannot proceed without one.
    pub fn require_carrier(&self) -> Result<&dyn CarrierAdapter, AppError> {
        self.inner.carrier.as_deref().ok_or_else(|| {
            AppError::Carrier(CarrierError::Configuration(
                "no carrier credential configured".to_string(),
            ))
        })
    }

    #[must_use]
    pub fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }
}
