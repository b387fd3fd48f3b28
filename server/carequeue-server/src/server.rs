use anyhow::{Context, Result};
use booking_engine::BookingPolicy;
use chrono::NaiveDate;
use std::sync::Arc;

use crate::auth::{JwtService, PasswordService};
use crate::config::AppConfig;
use crate::notifications::{LogMailer, Mailer, SmtpMailer};
use crate::store::{ClinicStore, MemoryStore, PgStore};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct CareQueueServer {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn ClinicStore>,
    pub jwt: JwtService,
    pub passwords: PasswordService,
    pub mailer: Arc<dyn Mailer>,
}

impl CareQueueServer {
    /// Connect storage and email from configuration
    ///
    /// Without `database.url` the server keeps everything in memory.
    pub async fn new(config: AppConfig) -> Result<Self> {
        let store: Arc<dyn ClinicStore> = match config.database.url.as_deref() {
            Some(url) => {
                let store = PgStore::connect(url, &config.database)
                    .await
                    .context("Failed to connect to PostgreSQL")?;
                tracing::info!(max_connections = config.database.max_connections, "connected to PostgreSQL");
                Arc::new(store)
            }
            None => {
                tracing::warn!("No database.url configured, using the in-memory store; data is lost on restart");
                Arc::new(MemoryStore::new())
            }
        };

        let mailer: Arc<dyn Mailer> = if config.email.enabled {
            tracing::info!(host = %config.email.smtp_host, port = config.email.smtp_port, "SMTP email enabled");
            Arc::new(SmtpMailer::new(config.email.clone()))
        } else {
            tracing::info!("Email disabled, temporary passwords are returned in API responses");
            Arc::new(LogMailer)
        };

        Self::with_store(config, store, mailer)
    }

    /// Build state around an existing store and mailer
    pub fn with_store(config: AppConfig, store: Arc<dyn ClinicStore>, mailer: Arc<dyn Mailer>) -> Result<Self> {
        let jwt = JwtService::new(&config.auth);
        let passwords = PasswordService::new(&config.auth).context("Invalid password hashing parameters")?;

        Ok(Self {
            config: Arc::new(config),
            store,
            jwt,
            passwords,
            mailer,
        })
    }

    pub fn policy(&self) -> &BookingPolicy {
        &self.config.booking
    }

    /// The clinic's calendar date, in the server's local time zone
    pub fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}
