//! LLM integration for the receptionist
//!
//! Features:
//! - Ollama and OpenAI-compatible backends (non-streaming, retrying)
//! - Primary/secondary generator with a hard per-attempt deadline
//! - Factory from [`receptionist_config::LlmSettings`]

pub mod backend;
pub mod factory;
pub mod generator;
pub mod prompt;

pub use backend::{FinishReason, GenerationResult, LlmBackend, LlmConfig, OllamaBackend, OpenAIBackend};
pub use factory::{create_backend, create_text_generator};
pub use generator::LlmTextGenerator;
pub use prompt::{build_messages, Message, Role};

use thiserror::Error;

/// LLM errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<LlmError> for receptionist_core::Error {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Timeout => receptionist_core::Error::Timeout("LLM deadline exceeded".to_string()),
            other => receptionist_core::Error::Llm(other.to_string()),
        }
    }
}
