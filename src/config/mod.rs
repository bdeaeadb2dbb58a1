//! Settings loading and boundary validation.
//!
//! Settings come from three layers: built-in defaults, an optional JSON
//! config file, and `COZE_*` environment variables. Later layers win.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::api::{DEFAULT_BASE_URL, TimeoutPolicy};
use crate::retry::RetryPolicy;
use crate::runtime::Runtime;

/// Name of the config file under the platform config directory.
const CONFIG_FILE: &str = "cozectl/config.json";

/// Resolved client settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub access_token: Option<String>,
    pub base_url: String,
    pub workflow_timeout: Duration,
    pub probe_timeout: Duration,
    pub default_timeout: Duration,
    pub max_retries: u32,
    pub backoff_factor: f64,
    pub retry_on_rate_limit: bool,
}

impl Default for Settings {
    fn default() -> Self {
        let timeouts = TimeoutPolicy::default();
        let retry = RetryPolicy::default();
        Self {
            access_token: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            workflow_timeout: timeouts.workflow_run,
            probe_timeout: timeouts.probe,
            default_timeout: timeouts.default,
            max_retries: retry.max_retries,
            backoff_factor: retry.backoff_factor,
            retry_on_rate_limit: retry.retry_on_rate_limit,
        }
    }
}

/// On-disk shape of the config file. Every field is optional; absent fields
/// keep their defaults.
#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    access_token: Option<String>,
    base_url: Option<String>,
    workflow_timeout_secs: Option<u64>,
    probe_timeout_secs: Option<u64>,
    default_timeout_secs: Option<u64>,
    max_retries: Option<u32>,
    backoff_factor: Option<f64>,
    retry_on_rate_limit: Option<bool>,
}

impl Settings {
    /// Loads settings: defaults, then the config file, then `COZE_*` env vars.
    #[tracing::instrument(skip(runtime))]
    pub fn load<R: Runtime>(runtime: &R) -> Result<Self> {
        let mut settings = Self::default();

        if let Some(path) = config_file_path(runtime) {
            if runtime.exists(&path) {
                let raw = runtime.read_to_string(&path)?;
                let file: ConfigFile = serde_json::from_str(&raw)
                    .with_context(|| format!("Invalid config file {}", path.display()))?;
                settings.apply_file(file);
            }
        }

        settings.apply_env(runtime);
        Ok(settings)
    }

    fn apply_file(&mut self, file: ConfigFile) {
        if let Some(token) = file.access_token {
            self.access_token = Some(token);
        }
        if let Some(base_url) = file.base_url {
            self.base_url = base_url;
        }
        if let Some(secs) = file.workflow_timeout_secs {
            self.workflow_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = file.probe_timeout_secs {
            self.probe_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = file.default_timeout_secs {
            self.default_timeout = Duration::from_secs(secs);
        }
        if let Some(max_retries) = file.max_retries {
            self.max_retries = max_retries;
        }
        if let Some(factor) = file.backoff_factor {
            self.backoff_factor = factor;
        }
        if let Some(flag) = file.retry_on_rate_limit {
            self.retry_on_rate_limit = flag;
        }
    }

    fn apply_env<R: Runtime>(&mut self, runtime: &R) {
        if let Ok(token) = runtime.env_var("COZE_API_TOKEN") {
            self.access_token = Some(token);
        }
        if let Ok(base_url) = runtime.env_var("COZE_BASE_URL") {
            self.base_url = base_url;
        }
        if let Some(max_retries) = env_parse(runtime, "COZE_MAX_RETRIES") {
            self.max_retries = max_retries;
        }
        if let Some(factor) = env_parse(runtime, "COZE_BACKOFF_FACTOR") {
            self.backoff_factor = factor;
        }
        if let Some(secs) = env_parse(runtime, "COZE_TIMEOUT") {
            self.default_timeout = Duration::from_secs(secs);
        }
    }

    pub fn timeout_policy(&self) -> TimeoutPolicy {
        TimeoutPolicy {
            workflow_run: self.workflow_timeout,
            probe: self.probe_timeout,
            default: self.default_timeout,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            backoff_factor: self.backoff_factor,
            retry_on_rate_limit: self.retry_on_rate_limit,
            ..RetryPolicy::default()
        }
    }
}

fn config_file_path<R: Runtime>(runtime: &R) -> Option<PathBuf> {
    runtime.config_dir().map(|dir| dir.join(CONFIG_FILE))
}

/// Parses an env var, ignoring unset or malformed values.
fn env_parse<R: Runtime, T: std::str::FromStr>(runtime: &R, key: &str) -> Option<T> {
    runtime.env_var(key).ok()?.parse().ok()
}

/// Personal access tokens are issued with a `pat_` prefix.
pub fn validate_token(token: &str) -> Result<()> {
    if token.is_empty() {
        bail!("Access token is not configured; set COZE_API_TOKEN or pass --token");
    }
    if !token.starts_with("pat_") {
        bail!("Access token format is invalid: expected a personal access token starting with pat_");
    }
    Ok(())
}

/// Workflow IDs are numeric strings on the platform.
pub fn validate_workflow_id(workflow_id: &str) -> Result<()> {
    if workflow_id.is_empty() {
        bail!("Workflow ID must not be empty");
    }
    if !workflow_id.bytes().all(|b| b.is_ascii_digit()) {
        bail!("Workflow ID must be numeric, got {:?}", workflow_id);
    }
    Ok(())
}

/// Base URLs must be absolute http(s) URLs.
pub fn validate_base_url(base_url: &str) -> Result<()> {
    let url = reqwest::Url::parse(base_url)
        .with_context(|| format!("Base URL is not a valid URL: {:?}", base_url))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        bail!("Base URL must use http or https, got {}", url.scheme());
    }
    Ok(())
}
