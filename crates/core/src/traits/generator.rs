//! Text generation collaborator

use async_trait::async_trait;

use crate::conversation::ConversationTurn;
use crate::error::Result;

/// Language-model text generation
///
/// Used both for the slot-extraction fallback (expects a small JSON object
/// back) and for reply polishing (expects natural language). Callers must
/// tolerate empty or malformed output.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        system_instructions: &str,
        prior_turns: &[ConversationTurn],
        user_text: &str,
    ) -> Result<String>;

    /// Name used in logs
    fn name(&self) -> &str {
        "text-generator"
    }
}
