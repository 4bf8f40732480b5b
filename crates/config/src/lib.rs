//! Configuration management for the SMS receptionist
//!
//! Supports loading configuration from:
//! - YAML files (`config/default.yaml`, `config/{env}.yaml`)
//! - Environment variables (`RECEPTIONIST__` prefix)
//! - A tenant directory file (business hours, catalog, timezone per tenant)

pub mod settings;
pub mod tenants;

pub use settings::{
    load_settings, load_settings_from, ConversationConfig, LlmProvider, LlmSettings,
    NotificationConfig, ObservabilityConfig, PersistenceConfig, RuntimeEnvironment, ServerConfig,
    Settings, StorageBackend,
};
pub use tenants::{TenantDirectory, TenantRegistry};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<receptionist_core::Error> for ConfigError {
    fn from(err: receptionist_core::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
