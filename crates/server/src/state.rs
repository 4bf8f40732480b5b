//! Application State
//!
//! Shared state across all handlers.

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

use receptionist_agent::{create_notifier, Receptionist};
use receptionist_config::{load_settings, Settings, StorageBackend, TenantRegistry};
use receptionist_llm::create_text_generator;
use receptionist_persistence::PersistenceLayer;
use receptionist_text_processing::SlotExtractor;

use crate::ServerError;

/// Application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration, reloadable at runtime
    pub config: Arc<RwLock<Settings>>,
    pub receptionist: Arc<Receptionist>,
    pub persistence: PersistenceLayer,
    /// Environment name for config reload
    env: Option<String>,
}

impl AppState {
    pub fn new(config: Settings, receptionist: Arc<Receptionist>, persistence: PersistenceLayer) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            receptionist,
            persistence,
            env: None,
        }
    }

    pub fn with_env(mut self, env: Option<String>) -> Self {
        self.env = env;
        self
    }

    /// Wire the tenant directory, row store, language model and staff
    /// notifier from settings.
    ///
    /// An unreachable ScyllaDB cluster falls back to the in-memory store
    /// outside production.
    pub async fn build(config: Settings) -> Result<Self, ServerError> {
        let tenants = Arc::new(TenantRegistry::from_file(
            &config.tenants_path,
            Duration::from_secs(config.conversation.tenant_refresh_secs),
        )?);

        let persistence = match receptionist_persistence::init(&config.persistence).await {
            Ok(layer) => layer,
            Err(e) if config.persistence.backend == StorageBackend::Scylla && !config.environment.is_production() => {
                tracing::error!(error = %e, "Failed to initialize ScyllaDB, falling back to in-memory store");
                PersistenceLayer::in_memory(config.persistence.scan_limit)
            },
            Err(e) => return Err(e.into()),
        };

        let mut receptionist = Receptionist::new(tenants, persistence.repository.clone(), &config.conversation)
            .with_notifier(create_notifier(&config.notifications)?);

        if let Some(generator) = create_text_generator(&config.llm)? {
            let deadline = Duration::from_millis(config.llm.deadline_ms);
            receptionist = receptionist.with_extractor(SlotExtractor::with_fallback(generator.clone(), deadline));
            if config.llm.polish_replies {
                tracing::info!("Reply polishing enabled");
                receptionist = receptionist.with_polisher(generator, deadline);
            }
        }

        Ok(Self::new(config, Arc::new(receptionist), persistence))
    }

    /// Reload configuration from files.
    ///
    /// Only settings read per request (timeouts) take effect; collaborators
    /// are wired once at startup.
    pub fn reload_config(&self) -> Result<(), ServerError> {
        let new_config = load_settings(self.env.as_deref())?;
        new_config.validate()?;
        *self.config.write() = new_config;
        tracing::info!("Configuration reloaded successfully");
        Ok(())
    }

    /// Get a read guard to the current configuration
    pub fn get_config(&self) -> parking_lot::RwLockReadGuard<'_, Settings> {
        self.config.read()
    }

    pub fn turn_timeout(&self) -> Duration {
        Duration::from_millis(self.config.read().server.turn_timeout_ms)
    }
}
