//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    /// Development mode - relaxed validation
    #[default]
    Development,
    Staging,
    /// Production mode - all validations enforced
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    pub fn is_strict(&self) -> bool {
        matches!(self, Self::Production | Self::Staging)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub persistence: PersistenceConfig,

    #[serde(default)]
    pub llm: LlmSettings,

    #[serde(default)]
    pub conversation: ConversationConfig,

    #[serde(default)]
    pub notifications: NotificationConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// YAML file holding the tenant directory
    #[serde(default = "default_tenants_path")]
    pub tenants_path: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            environment: RuntimeEnvironment::default(),
            server: ServerConfig::default(),
            persistence: PersistenceConfig::default(),
            llm: LlmSettings::default(),
            conversation: ConversationConfig::default(),
            notifications: NotificationConfig::default(),
            observability: ObservabilityConfig::default(),
            tenants_path: default_tenants_path(),
        }
    }
}

fn default_tenants_path() -> String {
    "config/tenants.yaml".to_string()
}

fn default_true() -> bool {
    true
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout for non-webhook routes, in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Hard bound on one SMS turn. The gateway gives up at 15s, so the
    /// fallback reply has to be out before that.
    #[serde(default = "default_turn_timeout_ms")]
    pub turn_timeout_ms: u64,

    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_timeout() -> u64 {
    30
}
fn default_turn_timeout_ms() -> u64 {
    10_000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_seconds: default_timeout(),
            turn_timeout_ms: default_turn_timeout_ms(),
            cors_enabled: default_true(),
            cors_origins: Vec::new(),
        }
    }
}

/// Row-store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local, lost on restart
    #[default]
    Memory,
    Scylla,
}

/// Persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    #[serde(default = "default_scylla_hosts")]
    pub scylla_hosts: Vec<String>,

    #[serde(default = "default_scylla_keyspace")]
    pub keyspace: String,

    #[serde(default = "default_replication_factor")]
    pub replication_factor: u8,

    /// Upper bound on rows read by a single backward scan
    #[serde(default = "default_scan_limit")]
    pub scan_limit: usize,
}

fn default_scylla_hosts() -> Vec<String> {
    vec!["127.0.0.1:9042".to_string()]
}
fn default_scylla_keyspace() -> String {
    "receptionist".to_string()
}
fn default_replication_factor() -> u8 {
    1
}
fn default_scan_limit() -> usize {
    500
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            scylla_hosts: default_scylla_hosts(),
            keyspace: default_scylla_keyspace(),
            replication_factor: default_replication_factor(),
            scan_limit: default_scan_limit(),
        }
    }
}

/// Language-model provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Ollama,
    OpenAi,
}

/// Language-model collaborator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// Disabled means extraction is purely deterministic
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub provider: LlmProvider,

    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Tried once after the primary fails or runs out of time
    #[serde(default)]
    pub secondary_model: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,

    /// Hard deadline per model attempt
    #[serde(default = "default_deadline_ms")]
    pub deadline_ms: u64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Rewrite idle greetings with the model
    #[serde(default)]
    pub polish_replies: bool,
}

fn default_llm_endpoint() -> String {
    "http://localhost:11434".to_string()
}
fn default_llm_model() -> String {
    "qwen2.5:3b-instruct".to_string()
}
fn default_deadline_ms() -> u64 {
    2_500
}
fn default_max_tokens() -> usize {
    200
}
fn default_temperature() -> f32 {
    0.1
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: LlmProvider::default(),
            endpoint: default_llm_endpoint(),
            model: default_llm_model(),
            secondary_model: None,
            api_key: None,
            deadline_ms: default_deadline_ms(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            polish_replies: false,
        }
    }
}

/// Conversation limits and TTLs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    #[serde(default = "default_history_max_turns")]
    pub history_max_turns: usize,

    #[serde(default = "default_history_max_age_hours")]
    pub history_max_age_hours: i64,

    /// Inactivity before a non-idle session resets
    #[serde(default = "default_ttl_hours")]
    pub session_ttl_hours: i64,

    /// Age after which a proposal can no longer be confirmed
    #[serde(default = "default_ttl_hours")]
    pub proposal_ttl_hours: i64,

    /// In-process session cache entry lifetime
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Tenant directory reload interval
    #[serde(default = "default_tenant_refresh_secs")]
    pub tenant_refresh_secs: u64,
}

fn default_history_max_turns() -> usize {
    16
}
fn default_history_max_age_hours() -> i64 {
    72
}
fn default_ttl_hours() -> i64 {
    24
}
fn default_cache_ttl_secs() -> u64 {
    30
}
fn default_tenant_refresh_secs() -> u64 {
    300
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            history_max_turns: default_history_max_turns(),
            history_max_age_hours: default_history_max_age_hours(),
            session_ttl_hours: default_ttl_hours(),
            proposal_ttl_hours: default_ttl_hours(),
            cache_ttl_secs: default_cache_ttl_secs(),
            tenant_refresh_secs: default_tenant_refresh_secs(),
        }
    }
}

/// Staff notification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Chat webhook receiving `{"text": ...}`; unset disables notifications
    #[serde(default)]
    pub staff_webhook_url: Option<String>,

    #[serde(default = "default_notify_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_notify_timeout_ms() -> u64 {
    3_000
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            staff_webhook_url: None,
            timeout_ms: default_notify_timeout_ms(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_json: bool,

    #[serde(default = "default_true")]
    pub tracing_enabled: bool,

    /// OTLP endpoint for traces (telemetry feature)
    #[serde(default)]
    pub otlp_endpoint: Option<String>,

    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            tracing_enabled: true,
            otlp_endpoint: None,
            metrics_enabled: true,
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_persistence()?;
        self.validate_llm()?;
        self.validate_conversation()?;
        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        let server = &self.server;

        if server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                message: "Port cannot be 0".to_string(),
            });
        }

        if server.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.timeout_seconds".to_string(),
                message: "Timeout must be at least 1 second".to_string(),
            });
        }

        if !(500..=14_000).contains(&server.turn_timeout_ms) {
            return Err(ConfigError::InvalidValue {
                field: "server.turn_timeout_ms".to_string(),
                message: format!(
                    "Must be between 500 and 14000 so the gateway gets a reply, got {}",
                    server.turn_timeout_ms
                ),
            });
        }

        if self.environment.is_production() && !server.cors_enabled {
            return Err(ConfigError::InvalidValue {
                field: "server.cors_enabled".to_string(),
                message: "CORS cannot be disabled in production".to_string(),
            });
        }

        Ok(())
    }

    fn validate_persistence(&self) -> Result<(), ConfigError> {
        let persistence = &self.persistence;

        if persistence.backend == StorageBackend::Scylla && persistence.scylla_hosts.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "persistence.scylla_hosts".to_string(),
                message: "At least one host is required for the scylla backend".to_string(),
            });
        }

        if persistence.scan_limit < 10 {
            return Err(ConfigError::InvalidValue {
                field: "persistence.scan_limit".to_string(),
                message: format!("Must be at least 10, got {}", persistence.scan_limit),
            });
        }

        if self.environment.is_production() && persistence.backend == StorageBackend::Memory {
            tracing::warn!("In-memory persistence in production: bookings are lost on restart");
        }

        Ok(())
    }

    fn validate_llm(&self) -> Result<(), ConfigError> {
        let llm = &self.llm;
        if !llm.enabled {
            return Ok(());
        }

        if llm.endpoint.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "llm.endpoint".to_string(),
                message: "Endpoint must be set when the LLM is enabled".to_string(),
            });
        }

        if !(100..=10_000).contains(&llm.deadline_ms) {
            return Err(ConfigError::InvalidValue {
                field: "llm.deadline_ms".to_string(),
                message: format!("Must be between 100 and 10000, got {}", llm.deadline_ms),
            });
        }

        if !(0.0..=2.0).contains(&llm.temperature) {
            return Err(ConfigError::InvalidValue {
                field: "llm.temperature".to_string(),
                message: format!("Must be between 0.0 and 2.0, got {}", llm.temperature),
            });
        }

        if self.environment.is_strict() && llm.provider == LlmProvider::OpenAi && llm.api_key.is_none() {
            return Err(ConfigError::InvalidValue {
                field: "llm.api_key".to_string(),
                message: "API key must be set for the openai provider outside development".to_string(),
            });
        }

        Ok(())
    }

    fn validate_conversation(&self) -> Result<(), ConfigError> {
        let conv = &self.conversation;

        if conv.history_max_turns == 0 || conv.history_max_turns > 100 {
            return Err(ConfigError::InvalidValue {
                field: "conversation.history_max_turns".to_string(),
                message: format!("Must be between 1 and 100, got {}", conv.history_max_turns),
            });
        }

        if conv.history_max_age_hours < 1 {
            return Err(ConfigError::InvalidValue {
                field: "conversation.history_max_age_hours".to_string(),
                message: "Must be at least 1 hour".to_string(),
            });
        }

        if conv.session_ttl_hours < 1 || conv.proposal_ttl_hours < 1 {
            return Err(ConfigError::InvalidValue {
                field: "conversation.session_ttl_hours".to_string(),
                message: "Session and proposal TTLs must be at least 1 hour".to_string(),
            });
        }

        Ok(())
    }
}

/// Load settings from files and environment
///
/// Priority: env vars > config/{env}.yaml > config/default.yaml > defaults.
/// Environment variables use the `RECEPTIONIST__` prefix with `__` between
/// sections, e.g. `RECEPTIONIST__LLM__ENABLED=true`.
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    load_settings_from("config", env)
}

/// Same as [`load_settings`] with an explicit config directory.
pub fn load_settings_from(dir: &str, env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name(&format!("{}/default", dir)).required(false));

    if let Some(env_name) = env {
        builder = builder.add_source(File::with_name(&format!("{}/{}", dir, env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("RECEPTIONIST")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}
