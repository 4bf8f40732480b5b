//! Receptionist Server
//!
//! Provides the SMS webhook, delivery-status callback, booking intake and
//! operational HTTP endpoints.

pub mod http;
pub mod metrics;
pub mod state;
pub mod twiml;

pub use http::create_router;
pub use metrics::{init_metrics, metrics_handler};
pub use state::AppState;
pub use twiml::render_reply;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(#[from] receptionist_config::ConfigError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] receptionist_persistence::PersistenceError),

    #[error("LLM error: {0}")]
    Llm(#[from] receptionist_llm::LlmError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<receptionist_agent::AgentError> for ServerError {
    fn from(err: receptionist_agent::AgentError) -> Self {
        match err {
            receptionist_agent::AgentError::InvalidInput(msg) => ServerError::InvalidRequest(msg),
            receptionist_agent::AgentError::Persistence(e) => ServerError::Persistence(e),
            other => ServerError::Internal(other.to_string()),
        }
    }
}

impl From<&ServerError> for StatusCode {
    fn from(err: &ServerError) -> Self {
        match err {
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Persistence(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Config(_) | ServerError::Llm(_) | ServerError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            },
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = StatusCode::from(&self);
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        (status, Json(serde_json::json!({ "ok": false, "error": self.to_string() }))).into_response()
    }
}
