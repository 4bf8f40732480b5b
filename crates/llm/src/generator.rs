//! Primary/secondary text generator with per-attempt deadlines

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use receptionist_core::{ConversationTurn, TextGenerator};

use crate::backend::LlmBackend;
use crate::prompt::build_messages;
use crate::LlmError;

/// Most recent prior turns forwarded to the model
const MAX_PRIOR_TURNS: usize = 12;

/// [`TextGenerator`] over one or two LLM backends.
///
/// The primary model gets one attempt under `deadline`. If it errors, times
/// out or answers with nothing, the secondary gets one attempt under the
/// same deadline. When both fail the caller sees an error and carries on
/// without the model.
pub struct LlmTextGenerator {
    primary: Arc<dyn LlmBackend>,
    secondary: Option<Arc<dyn LlmBackend>>,
    deadline: Duration,
}

impl LlmTextGenerator {
    pub fn new(primary: Arc<dyn LlmBackend>, deadline: Duration) -> Self {
        Self {
            primary,
            secondary: None,
            deadline,
        }
    }

    pub fn with_secondary(mut self, secondary: Arc<dyn LlmBackend>) -> Self {
        self.secondary = Some(secondary);
        self
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    async fn attempt(
        &self,
        backend: &dyn LlmBackend,
        tier: &'static str,
        messages: &[crate::prompt::Message],
    ) -> Result<String, LlmError> {
        metrics::counter!("receptionist_llm_calls_total", "tier" => tier).increment(1);

        let result = match tokio::time::timeout(self.deadline, backend.generate(messages)).await {
            Ok(Ok(result)) if result.text.trim().is_empty() => {
                Err(LlmError::InvalidResponse("empty completion".to_string()))
            },
            Ok(Ok(result)) => {
                tracing::debug!(
                    model = backend.model_name(),
                    tier,
                    tokens = result.tokens,
                    elapsed_ms = result.total_time_ms,
                    finish = ?result.finish_reason,
                    "LLM generation complete"
                );
                Ok(result.text)
            },
            Ok(Err(e)) => Err(e),
            Err(_) => Err(LlmError::Timeout),
        };

        if let Err(ref e) = result {
            metrics::counter!("receptionist_llm_failures_total", "tier" => tier).increment(1);
            tracing::warn!(model = backend.model_name(), tier, error = %e, "LLM attempt failed");
        }
        result
    }
}

#[async_trait]
impl TextGenerator for LlmTextGenerator {
    async fn generate(
        &self,
        system_instructions: &str,
        prior_turns: &[ConversationTurn],
        user_text: &str,
    ) -> receptionist_core::Result<String> {
        let messages = build_messages(system_instructions, prior_turns, user_text, MAX_PRIOR_TURNS);

        let primary_error = match self.attempt(self.primary.as_ref(), "primary", &messages).await {
            Ok(text) => return Ok(text),
            Err(e) => e,
        };

        match &self.secondary {
            Some(secondary) => Ok(self.attempt(secondary.as_ref(), "secondary", &messages).await?),
            None => Err(primary_error.into()),
        }
    }

    fn name(&self) -> &str {
        self.primary.model_name()
    }
}
