//! Application state shared across handlers.

use std::sync::Arc;

use lettre::transport::smtp::Error as SmtpError;
use sqlx::PgPool;
use tokio::sync::broadcast;

use crate::config::StorefrontConfig;
use crate::models::OrderNotification;
use crate::services::catalog::CatalogService;
use crate::services::email::EmailService;

/// Buffered new-order events per slow dashboard before it starts lagging.
const NOTIFICATION_CAPACITY: usize = 64;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    accounts: PgPool,
    catalog: CatalogService,
    email: Option<EmailService>,
    notifications: broadcast::Sender<OrderNotification>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `accounts` - Accounts database pool
    /// * `catalog` - Catalog database pool
    ///
    /// # Errors
    ///
    /// Returns an error if SMTP is configured but the relay cannot be set up.
    pub fn new(
        config: StorefrontConfig,
        accounts: PgPool,
        catalog: PgPool,
    ) -> Result<Self, SmtpError> {
        let email = config.email.as_ref().map(EmailService::new).transpose()?;
        if email.is_none() {
            tracing::warn!("SMTP not configured; registration codes and order alerts will not be emailed");
        }

        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                accounts,
                catalog: CatalogService::new(catalog),
                email,
                notifications,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the accounts database pool.
    #[must_use]
    pub fn accounts(&self) -> &PgPool {
        &self.inner.accounts
    }

    /// Get a reference to the catalog service.
    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }

    /// Get the email service, if SMTP is configured.
    #[must_use]
    pub fn email(&self) -> Option<&EmailService> {
        self.inner.email.as_ref()
    }

    /// Publish a new-order event to connected dashboards.
    ///
    /// Returns how many subscribers received it.
    pub fn notify_admins(&self, notification: OrderNotification) -> usize {
        self.inner.notifications.send(notification).unwrap_or(0)
    }

    /// Subscribe to new-order events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<OrderNotification> {
        self.inner.notifications.subscribe()
    }
}
