//! Anthropic Messages API provider implementation

use super::*;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Anthropic Claude provider
pub struct AnthropicProvider {
    client: Client,
    config: ProviderConfig,
}

impl AnthropicProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let client = config.http_client()?;
        Ok(Self { client, config })
    }

    fn base_url(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or("https://api.anthropic.com/v1")
    }

    fn build_request(&self, request: CompletionRequest) -> AnthropicRequest {
        let model = request
            .model
            .unwrap_or_else(|| self.default_model().to_string());

        // The Messages API takes the system prompt as a top-level field.
        let mut system: Option<String> = None;
        let mut messages = Vec::new();
        for msg in request.messages {
            if msg.role == Role::System {
                system = Some(match system {
                    Some(prev) => format!("{}\n\n{}", prev, msg.content),
                    None => msg.content,
                });
            } else {
                messages.push(AnthropicMessage::from(msg));
            }
        }

        AnthropicRequest {
            model,
            messages,
            system,
            max_tokens: request.max_tokens.unwrap_or(4096),
            temperature: request.temperature,
        }
    }
}

impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn default_model(&self) -> &str {
        self.config.default_model.as_deref().unwrap_or("claude-sonnet-4-20250514")
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let api_key = self.config.api_key.as_deref().ok_or_else(|| {
            Error::config_invalid("api_key", "anthropic provider needs an API key")
                .with_operation("anthropic::complete")
        })?;

        let api_request = self.build_request(request);
        debug!(
            model = %api_request.model,
            messages = api_request.messages.len(),
            "sending messages request"
        );

        let mut req = self
            .client
            .post(format!("{}/messages", self.base_url()))
            .header("x-api-key", api_key)
            .json(&api_request);

        for (key, value) in &self.config.headers {
            req = req.header(key, value);
        }

        let response = req
            .send()
            .await
            .map_err(|e| transport_error("anthropic::complete", e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let text = response.text().await.unwrap_or_default();
            return Err(status_error("anthropic::complete", status.as_u16(), text, retry_after)
                .with_context("model", api_request.model));
        }

        let api_response: AnthropicResponse = response.json().await.map_err(|e| {
            Error::parse_failed("malformed messages body")
                .with_operation("anthropic::complete")
                .set_source(e)
        })?;

        Ok(into_completion(api_response))
    }
}

fn into_completion(api_response: AnthropicResponse) -> CompletionResponse {
    let content: String = api_response
        .content
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text.as_str()),
            ContentBlock::Other => None,
        })
        .collect();

    let finish_reason = match api_response.stop_reason.as_deref() {
        Some("end_turn") | Some("stop_sequence") => FinishReason::Stop,
        Some("max_tokens") => FinishReason::Length,
        Some("refusal") => FinishReason::ContentFilter,
        _ => FinishReason::Unknown,
    };

    let usage = Usage {
        prompt_tokens: api_response.usage.input_tokens,
        completion_tokens: api_response.usage.output_tokens,
        total_tokens: api_response.usage.input_tokens + api_response.usage.output_tokens,
    };

    CompletionResponse {
        id: api_response.id,
        model: api_response.model,
        content: if content.is_empty() { None } else { Some(content) },
        finish_reason,
        usage,
    }
}

// ============================================================================
// Anthropic API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: String,
}

impl From<ChatMessage> for AnthropicMessage {
    fn from(msg: ChatMessage) -> Self {
        let role = match msg.role {
            Role::Assistant => "assistant",
            Role::User | Role::System => "user",
        };
        Self {
            role,
            content: msg.content,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    id: String,
    model: String,
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: usize,
    output_tokens: usize,
}
