//! CLI command handlers.
//!
//! Every handler resolves to a structured [`HandlerOutput`]: expected
//! failures (bad credentials, unreachable API, rejected workflow) are
//! reported as `success: false` results, never as panics or raw errors.

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::api::InvokeError;

pub mod auth;
pub mod config;
pub mod oauth;
pub mod ping;
pub mod run;

pub use config::Config;

/// Structured result of a command invocation, rendered as JSON on stdout.
#[derive(Debug, Serialize)]
pub struct HandlerOutput {
    pub message: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    pub timestamp: String,
}

impl HandlerOutput {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: true,
            error_type: None,
            details: None,
            timestamp: timestamp(),
        }
    }

    pub fn failure(message: impl Into<String>, error_type: &'static str) -> Self {
        Self {
            message: message.into(),
            success: false,
            error_type: Some(error_type),
            details: None,
            timestamp: timestamp(),
        }
    }

    /// Maps a classified invocation failure into a category-prefixed result.
    pub fn from_invoke_error(err: &InvokeError) -> Self {
        Self::failure(err.message.clone(), err.kind.category())
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Renders the output as pretty JSON for stdout.
    pub fn render(&self) -> String {
        serde_json::to_string_pretty(self)
            .unwrap_or_else(|_| format!(r#"{{"message": {:?}, "success": false}}"#, self.message))
    }
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}
