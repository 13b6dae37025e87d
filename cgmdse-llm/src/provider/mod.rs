//! # LLM Provider Interface
//!
//! A trait-based abstraction for talking to chat-completion APIs.
//!
//! ## Design
//! - `LlmProvider` trait defines the core interface
//! - Implementations for OpenAI-compatible endpoints (OpenAI, Groq) and Anthropic
//! - HTTP failures are mapped onto `cgmdse_error::ErrorKind` in one place
//! - Usage tracking

pub mod anthropic;
pub mod openai;

pub use anthropic::AnthropicProvider;
pub use openai::OpenAIProvider;

use cgmdse_error::{Error, ErrorKind, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

// ============================================================================
// Core Types
// ============================================================================

/// A chat message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// Request parameters for a completion
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<usize>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn with_max_tokens(mut self, max: usize) -> Self {
        self.max_tokens = Some(max);
        self
    }
}

/// Response from a completion request
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub id: String,
    pub model: String,
    pub content: Option<String>,
    pub finish_reason: FinishReason,
    pub usage: Usage,
}

impl CompletionResponse {
    /// The reply text, or an `InferenceFailed` error when the model sent none
    pub fn into_text(self) -> Result<String> {
        match self.content {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(Error::inference_failed("no content in response")
                .with_context("model", self.model)
                .with_context("finish_reason", format!("{:?}", self.finish_reason))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    Unknown,
}

/// Token usage information
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

// ============================================================================
// Provider Trait
// ============================================================================

/// The main LLM provider trait
#[allow(async_fn_in_trait)]
pub trait LlmProvider: Send + Sync {
    /// Get the provider name (e.g., "openai", "anthropic")
    fn name(&self) -> &str;

    /// Get the model used when a request does not name one
    fn default_model(&self) -> &str;

    /// Send a completion request and get a full response
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;
}

/// Map a non-success HTTP status and body onto the error taxonomy.
pub(crate) fn status_error(
    operation: &'static str,
    status: u16,
    body: String,
    retry_after: Option<String>,
) -> Error {
    let kind = match status {
        401 | 403 => ErrorKind::AuthenticationFailed,
        429 => ErrorKind::RateLimited,
        500..=599 => ErrorKind::ProviderUnavailable,
        _ => ErrorKind::InferenceFailed,
    };

    let mut err = Error::new(kind, body)
        .with_operation(operation)
        .with_context("status", status.to_string());
    if let Some(secs) = retry_after {
        err = err.with_context("retry_after", secs);
    }
    // A rejected request body will be rejected again.
    if (400..500).contains(&status) && status != 429 {
        err = err.permanent();
    }
    err
}

/// Wrap a transport-level failure from reqwest.
pub(crate) fn transport_error(operation: &'static str, err: reqwest::Error) -> Error {
    let reason = if err.is_timeout() {
        "request timed out"
    } else if err.is_connect() {
        "could not connect"
    } else {
        "request failed"
    };
    Error::network_failed(reason)
        .with_operation(operation)
        .set_source(err)
}

// ============================================================================
// Provider Configuration
// ============================================================================

/// Configuration for creating providers
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub provider_type: ProviderType,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub default_model: Option<String>,
    pub headers: HashMap<String, String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    OpenAI,
    Groq,
    Anthropic,
}

impl ProviderType {
    /// Environment variable holding the credential for this backend
    pub fn api_key_var(&self) -> &'static str {
        match self {
            ProviderType::OpenAI => "OPENAI_API_KEY",
            ProviderType::Groq => "GROQ_API_KEY",
            ProviderType::Anthropic => "ANTHROPIC_API_KEY",
        }
    }
}

impl ProviderConfig {
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self {
            provider_type: ProviderType::OpenAI,
            api_key: Some(api_key.into()),
            base_url: Some("https://api.openai.com/v1".into()),
            default_model: Some("gpt-4o".into()),
            headers: HashMap::new(),
            timeout_secs: Some(120),
        }
    }

    /// Groq's OpenAI-compatible endpoint
    pub fn groq(api_key: impl Into<String>) -> Self {
        Self {
            provider_type: ProviderType::Groq,
            api_key: Some(api_key.into()),
            base_url: Some("https://api.groq.com/openai/v1".into()),
            default_model: Some("llama-3.3-70b-versatile".into()),
            headers: HashMap::new(),
            timeout_secs: Some(120),
        }
    }

    pub fn anthropic(api_key: impl Into<String>) -> Self {
        let mut headers = HashMap::new();
        headers.insert("anthropic-version".into(), "2023-06-01".into());

        Self {
            provider_type: ProviderType::Anthropic,
            api_key: Some(api_key.into()),
            base_url: Some("https://api.anthropic.com/v1".into()),
            default_model: Some("claude-sonnet-4-20250514".into()),
            headers,
            timeout_secs: Some(120),
        }
    }

    /// Build the default configuration for `provider_type`, reading the
    /// credential from its environment variable.
    pub fn from_env(provider_type: ProviderType) -> Result<Self> {
        let var = provider_type.api_key_var();
        let api_key = std::env::var(var)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                Error::config_invalid("api_key", format!("{} not found in environment", var))
                    .with_context("env", var)
            })?;

        Ok(match provider_type {
            ProviderType::OpenAI => Self::openai(api_key),
            ProviderType::Groq => Self::groq(api_key),
            ProviderType::Anthropic => Self::anthropic(api_key),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub(crate) fn http_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs.unwrap_or(120)))
            .build()
            .map_err(|e| {
                Error::new(ErrorKind::Unexpected, "failed to create HTTP client")
                    .with_operation("provider::http_client")
                    .set_source(e)
            })
    }
}

// ============================================================================
// Usage Tracking
// ============================================================================

/// Tracks token usage across multiple calls
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageTracker {
    pub total_calls: usize,
    pub total_prompt_tokens: usize,
    pub total_completion_tokens: usize,
    /// Keyed by model name, sorted so serialized output is stable
    pub by_model: BTreeMap<String, Usage>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&mut self, model: &str, usage: &Usage) {
        self.total_calls += 1;
        self.total_prompt_tokens += usage.prompt_tokens;
        self.total_completion_tokens += usage.completion_tokens;

        let entry = self.by_model.entry(model.to_string()).or_default();
        entry.prompt_tokens += usage.prompt_tokens;
        entry.completion_tokens += usage.completion_tokens;
        entry.total_tokens += usage.total_tokens;
    }

    pub fn total_tokens(&self) -> usize {
        self.total_prompt_tokens + self.total_completion_tokens
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_message_constructors() {
        let sys = ChatMessage::system("Always respond with valid JSON only.");
        assert_eq!(sys.role, Role::System);
        assert_eq!(sys.content, "Always respond with valid JSON only.");

        assert_eq!(ChatMessage::user("Hello").role, Role::User);
    }

    #[test]
    fn test_completion_request_builder() {
        let request = CompletionRequest::new(vec![ChatMessage::user("Hello")])
            .with_model("llama-3.3-70b-versatile")
            .with_temperature(0.2)
            .with_max_tokens(4096);

        assert_eq!(request.model.as_deref(), Some("llama-3.3-70b-versatile"));
        assert_eq!(request.temperature, Some(0.2));
        assert_eq!(request.max_tokens, Some(4096));
    }

    #[test]
    fn test_provider_config() {
        let config = ProviderConfig::groq("gsk-test");
        assert_eq!(config.provider_type, ProviderType::Groq);
        assert_eq!(config.default_model.as_deref(), Some("llama-3.3-70b-versatile"));
        assert_eq!(config.base_url.as_deref(), Some("https://api.groq.com/openai/v1"));

        let config = ProviderConfig::anthropic("sk-ant-test").with_timeout(30);
        assert_eq!(config.provider_type, ProviderType::Anthropic);
        assert!(config.headers.contains_key("anthropic-version"));
        assert_eq!(config.timeout_secs, Some(30));
    }

    #[test]
    fn test_api_key_vars() {
        assert_eq!(ProviderType::Groq.api_key_var(), "GROQ_API_KEY");
        assert_eq!(ProviderType::OpenAI.api_key_var(), "OPENAI_API_KEY");
        assert_eq!(ProviderType::Anthropic.api_key_var(), "ANTHROPIC_API_KEY");
    }

    #[test]
    fn test_status_error_mapping() {
        let err = status_error("openai::complete", 429, "slow down".into(), Some("7".into()));
        assert_eq!(err.kind(), ErrorKind::RateLimited);
        assert!(err.is_retryable());
        assert!(err.context().contains(&("retry_after", "7".to_string())));

        let err = status_error("openai::complete", 401, "bad key".into(), None);
        assert_eq!(err.kind(), ErrorKind::AuthenticationFailed);
        assert!(!err.is_retryable());

        let err = status_error("openai::complete", 503, "overloaded".into(), None);
        assert_eq!(err.kind(), ErrorKind::ProviderUnavailable);
        assert!(err.is_retryable());

        let err = status_error("openai::complete", 400, "bad request".into(), None);
        assert_eq!(err.kind(), ErrorKind::InferenceFailed);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_into_text_rejects_empty_reply() {
        let response = CompletionResponse {
            id: "r1".into(),
            model: "m".into(),
            content: Some("   ".into()),
            finish_reason: FinishReason::Length,
            usage: Usage::default(),
        };
        let err = response.into_text().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InferenceFailed);
    }

    #[test]
    fn test_usage_tracker() {
        let mut tracker = UsageTracker::new();

        tracker.track("llama-3.3-70b-versatile", &Usage {
            prompt_tokens: 100,
            completion_tokens: 50,
            total_tokens: 150,
        });

        tracker.track("llama-3.3-70b-versatile", &Usage {
            prompt_tokens: 200,
            completion_tokens: 100,
            total_tokens: 300,
        });

        assert_eq!(tracker.total_calls, 2);
        assert_eq!(tracker.total_prompt_tokens, 300);
        assert_eq!(tracker.total_completion_tokens, 150);
        assert_eq!(tracker.total_tokens(), 450);
        assert_eq!(tracker.by_model["llama-3.3-70b-versatile"].total_tokens, 450);
    }

    #[test]
    fn test_usage_tracker_serializes_models_in_order() {
        let mut tracker = UsageTracker::new();
        let usage = Usage {
            prompt_tokens: 1,
            completion_tokens: 1,
            total_tokens: 2,
        };
        for model in ["llama-3.3-70b-versatile", "gpt-4o", "claude-sonnet-4-20250514"] {
            tracker.track(model, &usage);
        }

        let json = serde_json::to_string(&tracker).unwrap();
        let claude = json.find("claude-sonnet").unwrap();
        let gpt = json.find("gpt-4o").unwrap();
        let llama = json.find("llama-3.3").unwrap();
        assert!(claude < gpt && gpt < llama);
        assert_eq!(serde_json::to_string(&tracker).unwrap(), json);
    }
}
