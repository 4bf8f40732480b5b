//! Builds the text generator from settings
//!
//! ```ignore
//! let settings = load_settings("production")?;
//! if let Some(generator) = create_text_generator(&settings.llm)? {
//!     let extractor = SlotExtractor::with_fallback(generator, deadline);
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use receptionist_config::{LlmProvider, LlmSettings};
use receptionist_core::TextGenerator;

use crate::backend::{LlmBackend, LlmConfig, OllamaBackend, OpenAIBackend};
use crate::generator::LlmTextGenerator;
use crate::LlmError;

/// HTTP timeout is a little above the attempt deadline so the deadline fires first.
fn http_timeout(settings: &LlmSettings) -> Duration {
    Duration::from_millis(settings.deadline_ms + 500)
}

/// Backend for one model of the configured provider.
pub fn create_backend(settings: &LlmSettings, model: &str) -> Result<Arc<dyn LlmBackend>, LlmError> {
    let config = LlmConfig {
        model: model.to_string(),
        endpoint: settings.endpoint.clone(),
        api_key: settings.api_key.clone(),
        max_tokens: settings.max_tokens,
        temperature: settings.temperature,
        timeout: http_timeout(settings),
        // a retry inside the deadline is pointless
        max_retries: 0,
        ..Default::default()
    };
    Ok(match settings.provider {
        LlmProvider::Ollama => Arc::new(OllamaBackend::new(config)?),
        LlmProvider::OpenAi => Arc::new(OpenAIBackend::new(config)?),
    })
}

/// `None` when the LLM collaborator is disabled.
pub fn create_text_generator(settings: &LlmSettings) -> Result<Option<Arc<dyn TextGenerator>>, LlmError> {
    if !settings.enabled {
        tracing::info!("LLM collaborator disabled, extraction is rule-based only");
        return Ok(None);
    }

    let deadline = Duration::from_millis(settings.deadline_ms);
    let mut generator = LlmTextGenerator::new(create_backend(settings, &settings.model)?, deadline);
    if let Some(secondary) = settings.secondary_model.as_deref().filter(|m| !m.trim().is_empty()) {
        generator = generator.with_secondary(create_backend(settings, secondary)?);
    }

    tracing::info!(
        provider = ?settings.provider,
        model = %settings.model,
        secondary = ?settings.secondary_model,
        deadline_ms = settings.deadline_ms,
        "LLM collaborator enabled"
    );
    Ok(Some(Arc::new(generator)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> LlmSettings {
        serde_json::from_str(r#"{"enabled": true, "model": "small", "secondary_model": "big"}"#).unwrap()
    }

    #[test]
    fn test_disabled_yields_none() {
        let mut settings = settings();
        settings.enabled = false;
        assert!(create_text_generator(&settings).unwrap().is_none());
    }

    #[test]
    fn test_enabled_ollama() {
        let generator = create_text_generator(&settings()).unwrap().unwrap();
        assert_eq!(generator.name(), "small");
    }

    #[test]
    fn test_remote_openai_requires_key() {
        let mut settings = settings();
        settings.provider = LlmProvider::OpenAi;
        settings.endpoint = "https://api.openai.com/v1".to_string();
        assert!(create_text_generator(&settings).is_err());

        settings.api_key = Some("sk-test".to_string());
        assert!(create_text_generator(&settings).is_ok());
    }
}
