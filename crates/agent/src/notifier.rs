//! Staff notifications for booking events

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use receptionist_config::NotificationConfig;

use crate::AgentError;

#[async_trait]
pub trait StaffNotifier: Send + Sync {
    async fn notify(&self, text: &str) -> Result<(), AgentError>;
}

/// Used when no webhook is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

#[async_trait]
impl StaffNotifier for NoopNotifier {
    async fn notify(&self, _text: &str) -> Result<(), AgentError> {
        Ok(())
    }
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    text: &'a str,
}

/// Posts `{"text": ...}` to a chat webhook
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, AgentError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AgentError::Notification(e.to_string()))?;
        Ok(Self { client, url: url.into() })
    }
}

#[async_trait]
impl StaffNotifier for WebhookNotifier {
    async fn notify(&self, text: &str) -> Result<(), AgentError> {
        let response = self
            .client
            .post(&self.url)
            .json(&WebhookPayload { text })
            .send()
            .await
            .map_err(|e| AgentError::Notification(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AgentError::Notification(format!("webhook returned {}", response.status())));
        }
        Ok(())
    }
}

/// Webhook notifier when a URL is configured, otherwise a no-op.
pub fn create_notifier(config: &NotificationConfig) -> Result<Arc<dyn StaffNotifier>, AgentError> {
    match config.staff_webhook_url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => {
            tracing::info!("Staff notifications enabled");
            Ok(Arc::new(WebhookNotifier::new(
                url,
                Duration::from_millis(config.timeout_ms),
            )?))
        },
        _ => Ok(Arc::new(NoopNotifier)),
    }
}
