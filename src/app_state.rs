use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::models::notification::Notifier;
use crate::services::{
    backend::{BackendClient, BackendError},
    dispatcher::ConfirmationDispatcher,
    permissions::{CredentialSource, JwtAuthenticator},
    poller::StatusPoller,
    sessions::SessionRegistry,
    submitter::BatchSubmitter,
    table_state::{MemoryTableStateStore, RedisTableStateStore, StoreError, TableStateStore},
    workflow::NavigationPolicy,
};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<BackendClient>,
    pub poller: Arc<StatusPoller>,
    pub submitter: Arc<BatchSubmitter>,
    pub dispatcher: Arc<ConfirmationDispatcher>,
    pub table_store: Arc<dyn TableStateStore>,
    pub credentials: Arc<dyn CredentialSource>,
    pub sessions: Arc<SessionRegistry>,
    pub notifier: Notifier,
}

impl AppState {
    pub fn new(
        backend: BackendClient,
        table_store: Arc<dyn TableStateStore>,
        credentials: Arc<dyn CredentialSource>,
        notifier: Notifier,
        max_batch_bytes: u64,
        policy: NavigationPolicy,
        session_idle: Duration,
    ) -> Self {
        let backend = Arc::new(backend);
        Self {
            poller: Arc::new(StatusPoller::new(Arc::clone(&backend))),
            submitter: Arc::new(BatchSubmitter::new(Arc::clone(&backend), max_batch_bytes)),
            dispatcher: Arc::new(ConfirmationDispatcher::new(Arc::clone(&backend), notifier)),
            backend,
            table_store,
            credentials,
            sessions: Arc::new(SessionRegistry::new(policy, session_idle)),
            notifier,
        }
    }

    /// Wire every service from configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, StartupError> {
        let backend = BackendClient::new(
            &config.backend_base_url,
            config.backend_token.clone(),
            Duration::from_secs(config.backend_timeout_secs),
        )?;

        let table_store: Arc<dyn TableStateStore> = match config.redis_url {
            Some(ref url) => {
                tracing::info!("Using Redis table state store");
                Arc::new(RedisTableStateStore::new(url)?)
            }
            None => {
                tracing::warn!("REDIS_URL not set, table state is kept in memory");
                Arc::new(MemoryTableStateStore::new())
            }
        };

        Ok(Self::new(
            backend,
            table_store,
            Arc::new(JwtAuthenticator::new(&config.jwt_secret)),
            Notifier::new(config.message_lifetime_ms),
            config.max_batch_bytes,
            config.step_navigation,
            Duration::from_secs(config.session_idle_secs),
        ))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Backend client: {0}")]
    Backend(#[from] BackendError),

    #[error("Table state store: {0}")]
    Store(#[from] StoreError),
}
