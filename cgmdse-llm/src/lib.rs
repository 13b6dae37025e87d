//! # cgmdse-llm
//!
//! Chat-completion plumbing for the design-space exploration agent.
//!
//! ## Core Concepts
//! - **LlmProvider**: trait-based access to a chat-completion backend
//! - **ProviderConfig**: endpoint, model, credential and timeout for one backend
//! - **UsageTracker**: token accounting across the calls of a run

pub mod provider;

pub use cgmdse_error::{Error, ErrorKind, ErrorStatus, Result};
pub use provider::{
    AnthropicProvider, ChatMessage, CompletionRequest, CompletionResponse, FinishReason,
    LlmProvider, OpenAIProvider, ProviderConfig, ProviderType, Role, Usage, UsageTracker,
};
