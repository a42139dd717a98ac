//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ServerConfig;
use crate::error::AppError;
use crate::services::email::EmailService;
use crate::services::mpesa::MpesaClient;
use crate::services::uploads::UploadStore;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: PgPool,
    email: EmailService,
    mpesa: Option<MpesaClient>,
    uploads: UploadStore,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP transport cannot be configured.
    pub fn new(
        config: ServerConfig,
        pool: PgPool,
    ) -> Result<Self, lettre::transport::smtp::Error> {
        let email = EmailService::new(config.email.as_ref())?;
        let mpesa = config.mpesa.as_ref().map(MpesaClient::new);
        if mpesa.is_none() {
            tracing::warn!("MPESA_CONSUMER_KEY not set; payment endpoints will answer 503");
        }
        let uploads = UploadStore::new(&config.upload_dir, config.max_upload_bytes);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                email,
                mpesa,
                uploads,
            }),
        })
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn email(&self) -> &EmailService {
        &self.inner.email
    }

    #[must_use]
    pub fn uploads(&self) -> &UploadStore {
        &self.inner.uploads
    }

    /// The M-Pesa client, or 503 when payments aren't configured.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ServiceUnavailable` if M-Pesa is not configured.
    pub fn mpesa(&self) -> Result<&MpesaClient, AppError> {
        self.inner.mpesa.as_ref().ok_or_else(|| {
            AppError::ServiceUnavailable("M-Pesa payments are not configured".to_string())
        })
    }
}
