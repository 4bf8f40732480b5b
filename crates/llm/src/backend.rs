//! Chat completion backends
//!
//! Non-streaming chat completion against Ollama or any OpenAI-compatible
//! endpoint, both driven by one [`LlmConfig`]. Transient failures are
//! retried with exponential backoff; callers bound the total time with
//! their own deadline.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::{Duration, Instant};

use crate::prompt::Message;
use crate::LlmError;

/// Settings for one model on one endpoint
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub model: String,
    /// Base URL: the Ollama host, or an OpenAI-style `/v1` root
    pub endpoint: String,
    /// Bearer token; Ollama and local servers run without one
    pub api_key: Option<String>,
    /// Completion budget. Extraction answers are a few dozen tokens.
    pub max_tokens: usize,
    pub temperature: f32,
    pub top_p: f32,
    /// HTTP request timeout
    pub timeout: Duration,
    pub max_retries: u32,
    /// Doubled after every retry
    pub initial_backoff: Duration,
    /// Ollama keep_alive, e.g. "5m"
    pub keep_alive: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "qwen2.5:3b-instruct".to_string(),
            endpoint: "http://localhost:11434".to_string(),
            api_key: None,
            max_tokens: 200,
            temperature: 0.1,
            top_p: 0.9,
            timeout: Duration::from_secs(10),
            max_retries: 1,
            initial_backoff: Duration::from_millis(100),
            keep_alive: "5m".to_string(),
        }
    }
}

impl LlmConfig {
    fn base_url(&self) -> &str {
        self.endpoint.trim_end_matches('/')
    }

    fn is_local(&self) -> bool {
        let url = self.base_url();
        url.starts_with("http://localhost") || url.starts_with("http://127.0.0.1")
    }
}

/// One completion
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub text: String,
    /// Completion tokens, when the provider reports them
    pub tokens: usize,
    pub total_time_ms: u64,
    pub finish_reason: FinishReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    /// Cut off by `max_tokens`; a JSON answer is probably truncated
    Length,
}

#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn generate(&self, messages: &[Message]) -> Result<GenerationResult, LlmError>;

    fn model_name(&self) -> &str;
}

fn is_retryable(error: &LlmError) -> bool {
    matches!(error, LlmError::Network(_) | LlmError::Timeout)
}

/// Run `attempt` until it succeeds, fails permanently or retries run out.
async fn with_retries<T, F, Fut>(max_retries: u32, initial_backoff: Duration, mut attempt: F) -> Result<T, LlmError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let mut backoff = initial_backoff;
    let mut last_error = None;

    for n in 0..=max_retries {
        if n > 0 {
            tracing::warn!(?backoff, attempt = n, max_retries, "Retrying LLM request");
            tokio::time::sleep(backoff).await;
            backoff *= 2;
        }

        match attempt().await {
            Ok(value) => return Ok(value),
            Err(e) if is_retryable(&e) => last_error = Some(e),
            Err(e) => return Err(e),
        }
    }

    Err(last_error.unwrap_or_else(|| LlmError::Network("retries exhausted".to_string())))
}

fn http_client(config: &LlmConfig) -> Result<Client, LlmError> {
    Client::builder()
        .timeout(config.timeout)
        .build()
        .map_err(|e| LlmError::Configuration(format!("HTTP client: {}", e)))
}

fn map_send_error(err: reqwest::Error) -> LlmError {
    if err.is_timeout() {
        LlmError::Timeout
    } else {
        LlmError::Network(err.to_string())
    }
}

/// Decode a successful body. 5xx and 429 come back as retryable
/// network errors, other statuses are permanent.
async fn read_json<T: DeserializeOwned>(response: Response, model: &str) -> Result<T, LlmError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(match status {
            StatusCode::NOT_FOUND => LlmError::ModelNotFound(model.to_string()),
            s if s.is_server_error() || s == StatusCode::TOO_MANY_REQUESTS => {
                LlmError::Network(format!("HTTP {}: {}", s, body))
            },
            s => LlmError::Api(format!("HTTP {}: {}", s, body)),
        });
    }
    response
        .json()
        .await
        .map_err(|e| LlmError::InvalidResponse(e.to_string()))
}

/// Wire format shared by both providers
#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    content: String,
}

impl From<&Message> for WireMessage {
    fn from(msg: &Message) -> Self {
        Self {
            role: msg.role.to_string(),
            content: msg.content.clone(),
        }
    }
}

// =============================================================================
// Ollama
// =============================================================================

#[derive(Clone)]
pub struct OllamaBackend {
    client: Client,
    config: LlmConfig,
}

impl OllamaBackend {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        Ok(Self {
            client: http_client(&config)?,
            config,
        })
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.config.base_url())
    }

    fn build_request(&self, messages: &[Message]) -> OllamaChatRequest {
        OllamaChatRequest {
            model: self.config.model.clone(),
            messages: messages.iter().map(WireMessage::from).collect(),
            stream: false,
            options: OllamaOptions {
                temperature: self.config.temperature,
                top_p: self.config.top_p,
                num_predict: self.config.max_tokens,
            },
            keep_alive: self.config.keep_alive.clone(),
            think: false,
        }
    }

    async fn send_chat(&self, request: &OllamaChatRequest) -> Result<OllamaChatResponse, LlmError> {
        let response = self
            .client
            .post(self.chat_url())
            .json(request)
            .send()
            .await
            .map_err(map_send_error)?;
        read_json(response, &self.config.model).await
    }
}

#[async_trait]
impl LlmBackend for OllamaBackend {
    async fn generate(&self, messages: &[Message]) -> Result<GenerationResult, LlmError> {
        let start = Instant::now();
        let request = self.build_request(messages);

        let response = with_retries(self.config.max_retries, self.config.initial_backoff, || {
            self.send_chat(&request)
        })
        .await?;

        Ok(GenerationResult {
            text: response.message.content,
            tokens: response.eval_count.unwrap_or(0) as usize,
            total_time_ms: start.elapsed().as_millis() as u64,
            finish_reason: match response.done_reason.as_deref() {
                Some("length") => FinishReason::Length,
                _ => FinishReason::Stop,
            },
        })
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    stream: bool,
    options: OllamaOptions,
    keep_alive: String,
    /// Reasoning models would otherwise think before answering
    think: bool,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    top_p: f32,
    num_predict: usize,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: WireMessage,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    eval_count: Option<u64>,
}

// =============================================================================
// OpenAI-compatible
// =============================================================================

/// OpenAI chat completions, or any server speaking the same API
/// (vLLM, llama.cpp, LiteLLM)
pub struct OpenAIBackend {
    client: Client,
    config: LlmConfig,
}

impl OpenAIBackend {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let has_key = config.api_key.as_deref().map_or(false, |k| !k.trim().is_empty());
        if !has_key && !config.is_local() {
            return Err(LlmError::Configuration("API key required for remote endpoints".to_string()));
        }
        Ok(Self {
            client: http_client(&config)?,
            config,
        })
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url())
    }

    fn build_request(&self, messages: &[Message]) -> OpenAIChatRequest {
        OpenAIChatRequest {
            model: self.config.model.clone(),
            messages: messages.iter().map(WireMessage::from).collect(),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            top_p: self.config.top_p,
        }
    }

    async fn send_chat(&self, request: &OpenAIChatRequest) -> Result<OpenAIChatResponse, LlmError> {
        let mut builder = self.client.post(self.chat_url()).json(request);
        if let Some(key) = self.config.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await.map_err(map_send_error)?;
        read_json(response, &self.config.model).await
    }
}

#[async_trait]
impl LlmBackend for OpenAIBackend {
    async fn generate(&self, messages: &[Message]) -> Result<GenerationResult, LlmError> {
        let start = Instant::now();
        let request = self.build_request(messages);

        let response = with_retries(self.config.max_retries, self.config.initial_backoff, || {
            self.send_chat(&request)
        })
        .await?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("no choices".to_string()))?;

        Ok(GenerationResult {
            text: choice.message.content,
            tokens: response.usage.map_or(0, |u| u.completion_tokens),
            total_time_ms: start.elapsed().as_millis() as u64,
            finish_reason: match choice.finish_reason.as_deref() {
                Some("length") => FinishReason::Length,
                _ => FinishReason::Stop,
            },
        })
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[derive(Debug, Serialize)]
struct OpenAIChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    max_tokens: usize,
    temperature: f32,
    top_p: f32,
}

#[derive(Debug, Deserialize)]
struct OpenAIChatResponse {
    choices: Vec<OpenAIChoice>,
    #[serde(default)]
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: WireMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    completion_tokens: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::Role;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn config(endpoint: &str, api_key: Option<&str>) -> LlmConfig {
        LlmConfig {
            endpoint: endpoint.to_string(),
            model: "tiny".to_string(),
            api_key: api_key.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_ollama_request_body() {
        let backend = OllamaBackend::new(config("http://localhost:11434/", None)).unwrap();
        assert_eq!(backend.chat_url(), "http://localhost:11434/api/chat");

        let request = backend.build_request(&[Message::new(Role::System, "x"), Message::new(Role::User, "hi")]);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["stream"], false);
        assert_eq!(json["think"], false);
        assert_eq!(json["keep_alive"], "5m");
        assert_eq!(json["options"]["num_predict"], 200);
        assert_eq!(json["messages"][1]["role"], "user");
    }

    #[test]
    fn test_ollama_length_finish() {
        let response: OllamaChatResponse = serde_json::from_str(
            r#"{"message": {"role": "assistant", "content": "{\"serv"}, "done": true, "done_reason": "length"}"#,
        )
        .unwrap();
        assert_eq!(response.done_reason.as_deref(), Some("length"));
        assert_eq!(response.eval_count, None);
    }

    #[test]
    fn test_openai_key_required_for_remote_endpoints() {
        assert!(OpenAIBackend::new(config("https://api.openai.com/v1", None)).is_err());
        assert!(OpenAIBackend::new(config("https://api.openai.com/v1", Some("  "))).is_err());

        let backend = OpenAIBackend::new(config("http://127.0.0.1:8000/v1/", None)).unwrap();
        assert_eq!(backend.chat_url(), "http://127.0.0.1:8000/v1/chat/completions");

        let backend = OpenAIBackend::new(config("https://api.openai.com/v1", Some("sk-test"))).unwrap();
        assert_eq!(backend.chat_url(), "https://api.openai.com/v1/chat/completions");
        let json = serde_json::to_value(backend.build_request(&[Message::new(Role::User, "hi")])).unwrap();
        assert_eq!(json["max_tokens"], 200);
    }

    #[tokio::test]
    async fn test_retries_only_transient_errors() {
        let transient = AtomicU32::new(0);
        let calls = &transient;
        let result: Result<(), _> = with_retries(2, Duration::from_millis(1), || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(LlmError::Network("reset".to_string()))
        })
        .await;
        assert!(matches!(result, Err(LlmError::Network(_))));
        assert_eq!(transient.load(Ordering::SeqCst), 3);

        let permanent = AtomicU32::new(0);
        let calls = &permanent;
        let result: Result<(), _> = with_retries(2, Duration::from_millis(1), || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(LlmError::Api("bad request".to_string()))
        })
        .await;
        assert!(matches!(result, Err(LlmError::Api(_))));
        assert_eq!(permanent.load(Ordering::SeqCst), 1);
    }
}
