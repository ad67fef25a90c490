//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::DashboardConfig;
use crate::services::identity::{IdentityAdminClient, IdentityClient, IdentityError};

/// Application state shared across all handlers.
///
/// Cheap to clone; everything lives behind one `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: DashboardConfig,
    pool: PgPool,
    identity: IdentityClient,
    identity_admin: Option<IdentityAdminClient>,
    http: reqwest::Client,
}

impl AppState {
    /// Build state from configuration and a connected pool.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError` if an identity client cannot be built.
    pub fn new(config: DashboardConfig, pool: PgPool) -> Result<Self, IdentityError> {
        let identity = IdentityClient::new(&config.identity)?;
        let identity_admin = IdentityAdminClient::from_config(&config.identity)?;
        if identity_admin.is_none() {
            tracing::warn!(
                "SUPABASE_SERVICE_ROLE_KEY not set; user management and notification fan-out are disabled"
            );
        }
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                identity,
                identity_admin,
                http,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &DashboardConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Public identity client.
    #[must_use]
    pub fn identity(&self) -> &IdentityClient {
        &self.inner.identity
    }

    /// Privileged identity client; `None` without a service role key.
    #[must_use]
    pub fn identity_admin(&self) -> Option<&IdentityAdminClient> {
        self.inner.identity_admin.as_ref()
    }

    /// Outbound client for the QR image service.
    #[must_use]
    pub fn http(&self) -> &reqwest::Client {
        &self.inner.http
    }
}
