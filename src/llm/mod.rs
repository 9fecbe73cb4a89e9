//! Chat-completion adapter.
//!
//! Sends cleaned conversation history to an OpenAI-compatible chat-completions
//! provider and turns the answer into something the agent can consume:
//! either plain text, or a batch of tool calls rendered as a short
//! `final_answer`-terminated script.
//!
//! Two entry points exist on [`ChatModel`]:
//! - [`ChatModel::complete`] returns the decoded [`Completion`] or an [`LlmError`].
//! - [`ChatModel::generate`] never fails; errors come back as response content.

mod clean;
mod client;
mod error;
mod script;

pub use clean::{
    clamp_max_tokens, clean_messages, estimate_tokens, truncate_content, CONTEXT_WINDOW_TOKENS,
    DEFAULT_GREETING, MAX_CONTENT_CHARS, MAX_TOKENS_CEILING, TRUNCATION_MARKER,
};
pub use client::{decode_completion, CompletionClient, PlaceholderModel, ProviderConfig};
pub use error::{classify_http_status, LlmError, LlmErrorKind};
pub use script::{python_literal, result_variable, GeneratedScript};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Content returned when the provider answers with an empty `choices` array.
pub const NO_RESPONSE: &str = "No response generated";

/// Role in a chat conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Map a free-form role name onto a known role.
    ///
    /// Returns `None` for an empty name; anything unrecognised becomes `User`.
    pub fn normalize(raw: &str) -> Option<Role> {
        match raw.trim().to_lowercase().as_str() {
            "" => None,
            "system" => Some(Role::System),
            "assistant" => Some(Role::Assistant),
            _ => Some(Role::User),
        }
    }
}

/// Content part for structured message content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text {
        text: String,
    },
    /// Images and anything else the provider cannot receive as text.
    #[serde(other)]
    Other,
}

/// Message content as handed over by an agent: plain text or a list of parts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Flatten to text, joining text parts with newlines.
    pub fn to_text(&self) -> String {
        match self {
            MessageContent::Text(s) => s.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::Other => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// A message as received from the agent, before cleaning.
///
/// The role is free-form; [`clean_messages`] turns these into [`ChatMessage`]s.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawMessage {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: Option<MessageContent>,
}

impl RawMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: Some(MessageContent::Text(content.into())),
        }
    }
}

/// A cleaned message, ready to be sent to the provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

impl From<&ChatMessage> for RawMessage {
    fn from(msg: &ChatMessage) -> Self {
        let role = match msg.role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        RawMessage::new(role, msg.content.clone())
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub function_name: String,
    /// Decoded keyword arguments. Empty when the model sent malformed JSON.
    pub arguments: Map<String, Value>,
}

/// Tool definition sent to the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDefinition,
}

/// Function definition with schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Decoded outcome of a chat completion.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// The model answered in prose (or only reasoned).
    Text(String),
    /// The model asked for one or more tool invocations, in order.
    ToolCalls(Vec<ToolCall>),
    /// The provider returned no choices at all.
    NoChoices,
}

impl Completion {
    /// Render as the textual content the executing agent expects.
    pub fn into_content(self) -> String {
        match self {
            Completion::Text(text) => text,
            Completion::ToolCalls(calls) => match GeneratedScript::from_tool_calls(&calls) {
                Some(script) => script.render(),
                None => String::new(),
            },
            Completion::NoChoices => NO_RESPONSE.to_string(),
        }
    }
}

/// Response handed back to the agent framework.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelResponse {
    pub content: String,
}

impl ModelResponse {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// Optional generation parameters. Unset fields fall back to the provider defaults.
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    /// Sampling temperature.
    pub temperature: Option<f64>,
    /// Maximum output tokens; clamped to [`MAX_TOKENS_CEILING`].
    pub max_tokens: Option<u32>,
    /// Sequences at which the provider stops generating.
    pub stop: Option<Vec<String>>,
}

/// Convert a failed completion into the content string an agent can append to history.
pub fn describe_failure(error: &LlmError) -> String {
    if error.is_before_request() {
        format!("Error generating response: {}", error)
    } else {
        format!("Error in API request: {}", error)
    }
}

/// A chat model the assistant can talk to.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Identifier of the underlying model.
    fn model_id(&self) -> &str;

    /// Run a completion and decode the answer.
    async fn complete(
        &self,
        messages: &[RawMessage],
        options: ChatOptions,
        tools: Option<&[ToolDefinition]>,
    ) -> Result<Completion, LlmError>;

    /// Fail-soft completion: every failure is reported as content.
    async fn generate(&self, messages: &[RawMessage], options: ChatOptions) -> ModelResponse {
        match self.complete(messages, options, None).await {
            Ok(completion) => ModelResponse::new(completion.into_content()),
            Err(e) => {
                if e.is_transient() {
                    tracing::warn!(
                        "Completion with {} failed, caller may re-send: {}",
                        self.model_id(),
                        e
                    );
                } else {
                    tracing::error!("Completion with {} failed: {}", self.model_id(), e);
                }
                ModelResponse::new(describe_failure(&e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_normalization() {
        assert_eq!(Role::normalize("system"), Some(Role::System));
        assert_eq!(Role::normalize(" Assistant "), Some(Role::Assistant));
        assert_eq!(Role::normalize("system2"), Some(Role::User));
        assert_eq!(Role::normalize("tool-response"), Some(Role::User));
        assert_eq!(Role::normalize(""), None);
    }

    #[test]
    fn test_parts_flatten_to_text() {
        let content: MessageContent = serde_json::from_value(serde_json::json!([
            {"type": "text", "text": "first"},
            {"type": "image_url", "image_url": {"url": "http://x/y.png"}},
            {"type": "text", "text": "second"}
        ]))
        .unwrap();
        assert_eq!(content.to_text(), "first\nsecond");
    }

    #[test]
    fn test_no_choices_content() {
        assert_eq!(Completion::NoChoices.into_content(), "No response generated");
    }

    #[test]
    fn test_failure_prefixes() {
        let before = LlmError::request_error("bad url".to_string());
        assert!(describe_failure(&before).starts_with("Error generating response:"));
        let transport = LlmError::network_error("refused".to_string());
        assert!(describe_failure(&transport).starts_with("Error in API request:"));
    }
}
