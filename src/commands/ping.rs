//! `ping` command: probe API connectivity.

use std::time::Duration;

use super::{Config, HandlerOutput};
use crate::probe::Prober;
use crate::runtime::Runtime;

#[tracing::instrument(skip(runtime, base_url))]
pub async fn ping<R: Runtime>(
    runtime: R,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
) -> HandlerOutput {
    let config = match Config::new(runtime, None, base_url) {
        Ok(config) => config,
        Err(e) => return HandlerOutput::failure(format!("Configuration error: {}", e), "config"),
    };

    let timeout = timeout_secs
        .map(Duration::from_secs)
        .unwrap_or(config.settings.probe_timeout);

    let prober = match Prober::new(&config.settings.base_url, timeout) {
        Ok(prober) => prober,
        Err(e) => return HandlerOutput::failure(format!("Configuration error: {}", e), "config"),
    };

    let report = prober.probe_all().await;
    let details = serde_json::to_value(&report).unwrap_or_default();

    if report.service_reachable() {
        HandlerOutput::success(report.summary()).with_details(details)
    } else {
        HandlerOutput::failure(report.summary(), "network").with_details(details)
    }
}
