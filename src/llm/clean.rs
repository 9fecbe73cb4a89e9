//! Request preparation: message cleaning, truncation and token clamping.

use super::{ChatMessage, RawMessage, Role};

/// Longest message content, in characters, that is forwarded as-is.
pub const MAX_CONTENT_CHARS: usize = 50_000;

/// Appended to content clipped at [`MAX_CONTENT_CHARS`].
pub const TRUNCATION_MARKER: &str = "... [truncated]";

/// Provider ceiling for `max_tokens`.
pub const MAX_TOKENS_CEILING: u32 = 8000;

/// Advisory context window. Exceeding it only logs a warning.
pub const CONTEXT_WINDOW_TOKENS: usize = 128_000;

/// Sent when nothing survives cleaning.
pub const DEFAULT_GREETING: &str = "Hello";

/// Normalize an agent's message list into something the provider accepts.
///
/// - roles are mapped onto system/user/assistant, unknown roles become user
/// - messages with an empty role or empty content are dropped
/// - oversized content is truncated
/// - an empty result is replaced by a single user greeting
pub fn clean_messages(raw: &[RawMessage]) -> Vec<ChatMessage> {
    let mut cleaned: Vec<ChatMessage> = raw
        .iter()
        .filter_map(|msg| {
            let role = Role::normalize(&msg.role)?;
            let content = msg.content.as_ref()?.to_text();
            if content.trim().is_empty() {
                return None;
            }
            Some(ChatMessage::new(role, truncate_content(&content)))
        })
        .collect();

    if cleaned.len() < raw.len() {
        tracing::debug!(
            "Dropped {} message(s) with empty role or content",
            raw.len() - cleaned.len()
        );
    }

    if cleaned.is_empty() {
        cleaned.push(ChatMessage::user(DEFAULT_GREETING));
    }
    cleaned
}

/// Clip content longer than [`MAX_CONTENT_CHARS`] characters and mark it.
pub fn truncate_content(content: &str) -> String {
    match content.char_indices().nth(MAX_CONTENT_CHARS) {
        Some((cut, _)) => {
            tracing::warn!(
                "Truncating message content of {} characters to {}",
                content.chars().count(),
                MAX_CONTENT_CHARS
            );
            format!("{}{}", &content[..cut], TRUNCATION_MARKER)
        }
        None => content.to_string(),
    }
}

/// Clamp a requested output budget to the provider ceiling.
pub fn clamp_max_tokens(requested: u32) -> u32 {
    if requested > MAX_TOKENS_CEILING {
        tracing::debug!(
            "Clamping max_tokens from {} to {}",
            requested,
            MAX_TOKENS_CEILING
        );
    }
    requested.min(MAX_TOKENS_CEILING)
}

/// Rough prompt size estimate (four characters per token).
pub fn estimate_tokens(messages: &[ChatMessage]) -> usize {
    let chars: usize = messages.iter().map(|m| m.content.chars().count()).sum();
    chars / 4
}

/// Log a warning when the prompt probably does not fit the context window.
pub(crate) fn warn_if_over_context(model: &str, messages: &[ChatMessage]) {
    let estimated = estimate_tokens(messages);
    if estimated > CONTEXT_WINDOW_TOKENS {
        tracing::warn!(
            "Prompt for {} is ~{} tokens, above the {} token context window; sending anyway",
            model,
            estimated,
            CONTEXT_WINDOW_TOKENS
        );
    }
}
