//! Error taxonomy and HTTP status classification for workflow API calls.

use reqwest::StatusCode;

use crate::retry::RetryPolicy;

/// Closed set of failure categories for a workflow invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Authentication or authorization failed (HTTP 401/403).
    Auth,
    /// Workflow missing or rejected (HTTP 404).
    Workflow,
    /// Rate limit exceeded (HTTP 429).
    RateLimit,
    /// Server-side failure (HTTP 5xx).
    Server,
    /// No response received (DNS, connect, timeout).
    Network,
    /// 2xx response whose body could not be parsed as JSON.
    ResponseParse,
    /// Any other non-2xx response.
    Unknown,
}

impl ErrorKind {
    /// Short category label used to prefix user-facing messages.
    pub fn category(&self) -> &'static str {
        match self {
            ErrorKind::Auth => "authentication",
            ErrorKind::Workflow => "workflow",
            ErrorKind::RateLimit => "rate limit",
            ErrorKind::Server => "api",
            ErrorKind::Network => "network",
            ErrorKind::ResponseParse => "api",
            ErrorKind::Unknown => "unknown",
        }
    }
}

/// A classified, terminal failure of a workflow invocation.
///
/// The client returns this as a value for every expected failure mode; it
/// never panics or propagates transport errors past the classification step.
#[derive(Debug, Clone)]
pub struct InvokeError {
    pub kind: ErrorKind,
    pub message: String,
    pub http_status: Option<u16>,
    pub raw_body: Option<String>,
}

impl InvokeError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            http_status: None,
            raw_body: None,
        }
    }

    /// Classifies a non-2xx response into an error.
    ///
    /// The body is probed for the `code`/`msg` (or `error`) fields the API
    /// uses for richer error text; a non-JSON body falls back to the HTTP
    /// status line.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let detail = error_detail(status, body);
        let kind = match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ErrorKind::Auth,
            StatusCode::NOT_FOUND => ErrorKind::Workflow,
            StatusCode::TOO_MANY_REQUESTS => ErrorKind::RateLimit,
            s if s.is_server_error() => ErrorKind::Server,
            _ => ErrorKind::Unknown,
        };

        let message = match kind {
            ErrorKind::Auth => format!("Authentication failed: {}", detail),
            ErrorKind::Workflow => format!("Workflow not found: {}", detail),
            ErrorKind::RateLimit => format!("Rate limit exceeded: {}", detail),
            ErrorKind::Server => format!("Server error: {}", detail),
            _ => format!("API error {}: {}", status.as_u16(), detail),
        };

        Self {
            kind,
            message,
            http_status: Some(status.as_u16()),
            raw_body: (!body.is_empty()).then(|| body.to_string()),
        }
    }

    /// Classifies a transport-level failure (no response received).
    pub fn from_transport(error: &reqwest::Error) -> Self {
        let message = if error.is_timeout() {
            format!("Network error: request timed out ({})", error)
        } else {
            format!("Network error: {}", error)
        };
        Self::new(ErrorKind::Network, message)
    }

    /// Whether this failure is transient under the given policy.
    pub fn is_retryable(&self, policy: &RetryPolicy) -> bool {
        match self.kind {
            ErrorKind::Network => policy.retry_on_network_error,
            ErrorKind::Server => policy.retry_on_server_error,
            ErrorKind::RateLimit => policy.retry_on_rate_limit,
            _ => false,
        }
    }
}

impl std::fmt::Display for InvokeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for InvokeError {}

/// Extracts the most useful error text from a failure response body.
fn error_detail(status: StatusCode, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(body) {
        let msg = parsed
            .get("msg")
            .or_else(|| parsed.get("error"))
            .and_then(|v| v.as_str());
        if let Some(msg) = msg {
            let code = parsed.get("code").and_then(|v| v.as_i64());
            return match code {
                Some(code) => format!("{} (code {})", msg, code),
                None => msg.to_string(),
            };
        }
    }

    format!(
        "HTTP {} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("")
    )
    .trim_end()
    .to_string()
}
