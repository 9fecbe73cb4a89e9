//! API request and response types.

use serde::{Deserialize, Serialize};

/// Request to send one chat message.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    /// The user's message
    pub message: String,
}

/// Assistant reply to a chat message.
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

/// Result of an interrupt request.
#[derive(Debug, Clone, Serialize)]
pub struct InterruptResponse {
    /// `aborted`, `not_in_progress` or `failed`
    pub outcome: String,

    /// Human-readable description
    pub message: String,
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,

    /// Model used for tool-calling turns
    pub tool_model: String,

    /// Model used for conversational turns, or `placeholder` when no key is set
    pub chat_model: String,
}
