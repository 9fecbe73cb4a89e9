//! OpenAI-compatible chat-completions client.
//!
//! One client type serves every provider preset; GLM drives tool calling and
//! DeepSeek the plain conversation. Requests are issued once - there is no
//! automatic retry.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

use super::clean::{clamp_max_tokens, clean_messages, warn_if_over_context};
use super::error::LlmError;
use super::{
    ChatMessage, ChatModel, ChatOptions, Completion, RawMessage, ToolCall, ToolDefinition,
};
use crate::config::ConfigError;

const GLM_API_URL: &str = "https://open.bigmodel.cn/api/paas/v4/chat/completions";
const DEEPSEEK_API_URL: &str = "https://api.deepseek.com/v1/chat/completions";

/// Default per-request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Provider endpoint, model and defaults.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub name: String,
    pub endpoint: String,
    pub model: String,
    /// Environment variable holding the bearer token.
    pub api_key_env: String,
    pub max_tokens: u32,
    pub temperature: f64,
}

impl ProviderConfig {
    /// GLM preset, used for tool calling.
    pub fn glm() -> Self {
        Self {
            name: "GLM".to_string(),
            endpoint: GLM_API_URL.to_string(),
            model: "glm-4.5".to_string(),
            api_key_env: "GLM_API_KEY".to_string(),
            max_tokens: 2096,
            temperature: 0.5,
        }
    }

    /// DeepSeek preset, used for conversation.
    pub fn deepseek() -> Self {
        Self {
            name: "DeepSeek".to_string(),
            endpoint: DEEPSEEK_API_URL.to_string(),
            model: "deepseek-reasoner".to_string(),
            api_key_env: "DEEPSEEK_API_KEY".to_string(),
            max_tokens: 2096,
            temperature: 0.5,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

/// Chat-completions client for one provider.
pub struct CompletionClient {
    client: Client,
    provider: ProviderConfig,
    api_key: String,
    timeout: Duration,
}

impl CompletionClient {
    pub fn new(provider: ProviderConfig, api_key: String) -> Self {
        Self {
            client: Client::new(),
            provider,
            api_key,
            timeout: REQUEST_TIMEOUT,
        }
    }

    /// Override the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Create a client whose key is read from the provider's environment variable.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if the variable is unset or empty.
    pub fn from_env(provider: ProviderConfig) -> Result<Self, ConfigError> {
        let api_key = std::env::var(&provider.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(provider.api_key_env.clone()))?;
        Ok(Self::new(provider, api_key))
    }

    pub fn provider(&self) -> &ProviderConfig {
        &self.provider
    }

    /// Build the request body: cleaned history, clamped token budget.
    fn build_request<'a>(
        &'a self,
        messages: &[RawMessage],
        options: &ChatOptions,
        tools: Option<&'a [ToolDefinition]>,
    ) -> CompletionRequest<'a> {
        let messages = clean_messages(messages);
        warn_if_over_context(&self.provider.model, &messages);

        CompletionRequest {
            model: &self.provider.model,
            messages,
            max_tokens: clamp_max_tokens(options.max_tokens.unwrap_or(self.provider.max_tokens)),
            temperature: options.temperature.unwrap_or(self.provider.temperature),
            stream: false,
            stop: options.stop.clone().filter(|s| !s.is_empty()),
            tools: tools.filter(|t| !t.is_empty()),
            tool_choice: tools.filter(|t| !t.is_empty()).map(|_| "auto"),
        }
    }

    /// Execute a single request and return the raw response body.
    async fn execute_request(&self, request: &CompletionRequest<'_>) -> Result<String, LlmError> {
        let response = match self
            .client
            .post(&self.provider.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                if e.is_builder() {
                    return Err(LlmError::request_error(e.to_string()));
                } else if e.is_timeout() {
                    return Err(LlmError::timeout(e.to_string(), self.timeout));
                } else {
                    return Err(LlmError::network_error(e.to_string()));
                }
            }
        };

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::timeout(e.to_string(), self.timeout)
            } else {
                LlmError::network_error(format!("Failed to read response body: {}", e))
            }
        })?;

        if !status.is_success() {
            tracing::error!(
                "{} returned HTTP {}: {}",
                self.provider.name,
                status.as_u16(),
                body
            );
            return Err(LlmError::http_error(status.as_u16(), body));
        }

        Ok(body)
    }
}

#[async_trait]
impl ChatModel for CompletionClient {
    fn model_id(&self) -> &str {
        &self.provider.model
    }

    async fn complete(
        &self,
        messages: &[RawMessage],
        options: ChatOptions,
        tools: Option<&[ToolDefinition]>,
    ) -> Result<Completion, LlmError> {
        let request = self.build_request(messages, &options, tools);

        tracing::debug!(
            "Sending request to {}: model={}, messages={}, max_tokens={}",
            self.provider.name,
            request.model,
            request.messages.len(),
            request.max_tokens
        );

        let body = self.execute_request(&request).await?;
        let completion = decode_completion(&body)?;

        if let Completion::ToolCalls(ref calls) = completion {
            tracing::info!(
                "{} requested {} tool call(s): {}",
                self.provider.name,
                calls.len(),
                calls
                    .iter()
                    .map(|c| c.function_name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
        Ok(completion)
    }
}

/// Decode a chat-completions response body.
///
/// Tool calls in the first choice win over text; text falls back from
/// `content` to `reasoning_content` to the empty string.
pub fn decode_completion(body: &str) -> Result<Completion, LlmError> {
    let parsed: CompletionResponse = serde_json::from_str(body).map_err(|e| {
        LlmError::parse_error(format!("Failed to parse response: {}, body: {}", e, body))
    })?;

    let Some(choice) = parsed.choices.into_iter().next() else {
        tracing::warn!("Provider returned no choices");
        return Ok(Completion::NoChoices);
    };
    let message = choice.message;

    let tool_calls: Vec<ToolCall> = message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(WireToolCall::into_tool_call)
        .collect();
    if !tool_calls.is_empty() {
        return Ok(Completion::ToolCalls(tool_calls));
    }

    let text = message
        .content
        .filter(|c| !c.is_empty())
        .or(message.reasoning_content)
        .unwrap_or_default();
    Ok(Completion::Text(text))
}

/// Stand-in for the conversational model when no API key is configured.
pub struct PlaceholderModel {
    reply: String,
}

impl PlaceholderModel {
    pub fn missing_key(provider: &ProviderConfig) -> Self {
        Self {
            reply: format!(
                "Authentication error: No {} API key provided. Please set {} to use this feature.",
                provider.name, provider.api_key_env
            ),
        }
    }
}

#[async_trait]
impl ChatModel for PlaceholderModel {
    fn model_id(&self) -> &str {
        "placeholder"
    }

    async fn complete(
        &self,
        _messages: &[RawMessage],
        _options: ChatOptions,
        _tools: Option<&[ToolDefinition]>,
    ) -> Result<Completion, LlmError> {
        Ok(Completion::Text(self.reply.clone()))
    }
}

/// Chat-completions request body.
#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f64,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [ToolDefinition]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
}

/// Chat-completions response body.
#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<WireChoice>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireMessage,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    #[serde(default)]
    content: Option<String>,
    /// Reasoning models (deepseek-reasoner) may leave `content` empty.
    #[serde(default)]
    reasoning_content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    #[serde(default)]
    id: String,
    function: WireFunction,
}

#[derive(Debug, Deserialize)]
struct WireFunction {
    name: String,
    /// Usually a JSON-encoded string; some providers send an object.
    #[serde(default)]
    arguments: Value,
}

impl WireToolCall {
    fn into_tool_call(self) -> ToolCall {
        let arguments = match self.function.arguments {
            Value::Object(map) => map,
            Value::String(raw) if raw.trim().is_empty() => Map::new(),
            Value::String(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(Value::Object(map)) => map,
                Ok(other) => {
                    tracing::warn!(
                        "Arguments for {} are not an object ({}); calling without arguments",
                        self.function.name,
                        other
                    );
                    Map::new()
                }
                Err(e) => {
                    tracing::warn!(
                        "Malformed arguments for {}: {}; calling without arguments",
                        self.function.name,
                        e
                    );
                    Map::new()
                }
            },
            _ => Map::new(),
        };
        ToolCall {
            id: self.id,
            function_name: self.function.name,
            arguments,
        }
    }
}
