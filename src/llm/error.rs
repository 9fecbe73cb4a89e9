//! Completion-provider error types.
//!
//! Distinguishes failures that happen before a request leaves the process
//! (request construction) from transport, HTTP and decoding failures, so the
//! adapter can describe each one to the calling agent.

use std::time::Duration;

/// Error from a chat-completion call.
#[derive(Debug)]
pub struct LlmError {
    /// The kind of error
    pub kind: LlmErrorKind,
    /// HTTP status code, if applicable
    pub status_code: Option<u16>,
    /// Error message (for HTTP errors, the response body)
    pub message: String,
}

impl LlmError {
    /// The request could not be built (bad URL, unserializable body).
    pub fn request_error(message: String) -> Self {
        Self {
            kind: LlmErrorKind::RequestError,
            status_code: None,
            message,
        }
    }

    /// The provider did not answer within the request timeout.
    pub fn timeout(message: String, after: Duration) -> Self {
        Self {
            kind: LlmErrorKind::Timeout,
            status_code: None,
            message: format!("no response after {:?}: {}", after, message),
        }
    }

    /// The connection could not be established or was dropped.
    pub fn network_error(message: String) -> Self {
        Self {
            kind: LlmErrorKind::NetworkError,
            status_code: None,
            message,
        }
    }

    /// The provider answered with a non-2xx status.
    pub fn http_error(status_code: u16, body: String) -> Self {
        Self {
            kind: classify_http_status(status_code),
            status_code: Some(status_code),
            message: body,
        }
    }

    /// The response body was not the expected JSON shape.
    pub fn parse_error(message: String) -> Self {
        Self {
            kind: LlmErrorKind::ParseError,
            status_code: None,
            message,
        }
    }

    /// Check if this error is transient, i.e. re-issuing the same request may succeed.
    ///
    /// The adapter never retries on its own; callers use this to decide.
    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }

    /// Whether the failure happened before anything was sent to the provider.
    pub fn is_before_request(&self) -> bool {
        self.kind == LlmErrorKind::RequestError
    }
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "{} (HTTP {}): {}", self.kind, code, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for LlmError {}

/// Classification of completion errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorKind {
    /// Request could not be constructed - nothing was sent
    RequestError,
    /// Request timed out - transient
    Timeout,
    /// Connection failed - transient
    NetworkError,
    /// Rate limited (429) - transient
    RateLimited,
    /// Server error (5xx) - transient
    ServerError,
    /// Client error (400, 401, 403, 404) - permanent
    ClientError,
    /// Response parsing error - usually permanent
    ParseError,
}

impl LlmErrorKind {
    /// Check if this error kind is transient.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LlmErrorKind::Timeout
                | LlmErrorKind::NetworkError
                | LlmErrorKind::RateLimited
                | LlmErrorKind::ServerError
        )
    }
}

impl std::fmt::Display for LlmErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmErrorKind::RequestError => write!(f, "Invalid request"),
            LlmErrorKind::Timeout => write!(f, "Request timeout"),
            LlmErrorKind::NetworkError => write!(f, "Connection failed"),
            LlmErrorKind::RateLimited => write!(f, "Rate limited"),
            LlmErrorKind::ServerError => write!(f, "Server error"),
            LlmErrorKind::ClientError => write!(f, "Client error"),
            LlmErrorKind::ParseError => write!(f, "Parse error"),
        }
    }
}

/// Parse HTTP status code into error kind.
pub fn classify_http_status(status: u16) -> LlmErrorKind {
    match status {
        429 => LlmErrorKind::RateLimited,
        500..=599 => LlmErrorKind::ServerError,
        400..=499 => LlmErrorKind::ClientError,
        _ => LlmErrorKind::ServerError,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(LlmErrorKind::Timeout.is_transient());
        assert!(LlmErrorKind::NetworkError.is_transient());
        assert!(LlmErrorKind::RateLimited.is_transient());
        assert!(LlmErrorKind::ServerError.is_transient());
        assert!(!LlmErrorKind::ClientError.is_transient());
        assert!(!LlmErrorKind::ParseError.is_transient());
        assert!(!LlmErrorKind::RequestError.is_transient());
    }

    #[test]
    fn test_http_status_classification() {
        assert_eq!(classify_http_status(429), LlmErrorKind::RateLimited);
        assert_eq!(classify_http_status(500), LlmErrorKind::ServerError);
        assert_eq!(classify_http_status(503), LlmErrorKind::ServerError);
        assert_eq!(classify_http_status(400), LlmErrorKind::ClientError);
        assert_eq!(classify_http_status(401), LlmErrorKind::ClientError);
    }

    #[test]
    fn test_http_error_keeps_body() {
        let err = LlmError::http_error(401, "{\"error\":\"bad key\"}".to_string());
        assert_eq!(err.status_code, Some(401));
        assert_eq!(
            err.to_string(),
            "Client error (HTTP 401): {\"error\":\"bad key\"}"
        );
        assert!(!err.is_before_request());
    }
}
