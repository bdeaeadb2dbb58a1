//! Shared construction of settings and the workflow client for commands.

use anyhow::Result;

use crate::api::WorkflowClient;
use crate::config::{Settings, validate_base_url, validate_token};
use crate::runtime::Runtime;

/// Per-invocation wiring: the runtime plus resolved settings with CLI
/// overrides applied.
pub struct Config<R: Runtime> {
    pub runtime: R,
    pub settings: Settings,
}

impl<R: Runtime> Config<R> {
    /// Loads settings through the runtime and applies CLI-level overrides
    /// (flag beats env beats file).
    pub fn new(runtime: R, token: Option<String>, base_url: Option<String>) -> Result<Self> {
        let mut settings = Settings::load(&runtime)?;
        if let Some(token) = token {
            settings.access_token = Some(token);
        }
        if let Some(base_url) = base_url {
            settings.base_url = base_url.trim_end_matches('/').to_string();
        }
        Ok(Self { runtime, settings })
    }

    /// Validates the boundary contract and builds the client.
    pub fn workflow_client(&self) -> Result<WorkflowClient> {
        let token = self.settings.access_token.as_deref().unwrap_or_default();
        validate_token(token)?;
        validate_base_url(&self.settings.base_url)?;

        WorkflowClient::with_policies(
            token,
            Some(self.settings.base_url.clone()),
            self.settings.timeout_policy(),
            self.settings.retry_policy(),
            std::sync::Arc::new(crate::logging::CrateLogger),
        )
    }
}
