//! OpenAI-compatible provider implementation
//!
//! Works with OpenAI, Groq, vLLM, Ollama and other servers that speak the
//! `/chat/completions` format.

use super::*;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// OpenAI-compatible provider
pub struct OpenAIProvider {
    client: Client,
    config: ProviderConfig,
}

impl OpenAIProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let client = config.http_client()?;
        Ok(Self { client, config })
    }

    fn base_url(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or("https://api.openai.com/v1")
    }

    fn build_request(&self, request: CompletionRequest) -> OpenAIRequest {
        let model = request
            .model
            .unwrap_or_else(|| self.default_model().to_string());

        OpenAIRequest {
            model,
            messages: request.messages.into_iter().map(OpenAIMessage::from).collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: false,
        }
    }
}

impl LlmProvider for OpenAIProvider {
    fn name(&self) -> &str {
        match self.config.provider_type {
            ProviderType::Groq => "groq",
            _ => "openai",
        }
    }

    fn default_model(&self) -> &str {
        self.config.default_model.as_deref().unwrap_or("gpt-4o")
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let api_request = self.build_request(request);
        debug!(
            provider = self.name(),
            model = %api_request.model,
            messages = api_request.messages.len(),
            "sending chat completion"
        );

        let mut req = self
            .client
            .post(format!("{}/chat/completions", self.base_url()))
            .json(&api_request);

        if let Some(api_key) = &self.config.api_key {
            if !api_key.is_empty() {
                req = req.bearer_auth(api_key);
            }
        }

        for (key, value) in &self.config.headers {
            req = req.header(key, value);
        }

        let response = req
            .send()
            .await
            .map_err(|e| transport_error("openai::complete", e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let text = response.text().await.unwrap_or_default();
            return Err(status_error("openai::complete", status.as_u16(), text, retry_after)
                .with_context("model", api_request.model));
        }

        let api_response: OpenAIResponse = response.json().await.map_err(|e| {
            Error::parse_failed("malformed chat completion body")
                .with_operation("openai::complete")
                .set_source(e)
        })?;

        into_completion(api_response)
    }
}

fn into_completion(api_response: OpenAIResponse) -> Result<CompletionResponse> {
    let choice = api_response.choices.into_iter().next().ok_or_else(|| {
        Error::inference_failed("no choices in response")
            .with_operation("openai::complete")
            .with_context("model", api_response.model.clone())
    })?;

    let finish_reason = match choice.finish_reason.as_deref() {
        Some("stop") => FinishReason::Stop,
        Some("length") => FinishReason::Length,
        Some("content_filter") => FinishReason::ContentFilter,
        _ => FinishReason::Unknown,
    };

    let usage = api_response
        .usage
        .map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        })
        .unwrap_or_default();

    Ok(CompletionResponse {
        id: api_response.id,
        model: api_response.model,
        content: choice.message.content,
        finish_reason,
        usage,
    })
}

// ============================================================================
// OpenAI API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

impl From<ChatMessage> for OpenAIMessage {
    fn from(msg: ChatMessage) -> Self {
        Self {
            role: msg.role.as_str().into(),
            content: Some(msg.content),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    model: String,
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
    total_tokens: usize,
}
