//! Connectivity probing against the platform's known endpoints.
//!
//! A probe answers one question: is the API reachable from here at all?
//! Auth failures count as reachable; only transport failures and bans do not.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::Serialize;

/// Endpoint paths probed against the base URL, most specific first.
pub const PROBE_PATHS: &[&str] = &["/v1/workflow/run", "/v1/chat", "/v1/user/profile"];

/// What a single endpoint probe concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeOutcome {
    /// 200: endpoint answered.
    Ok,
    /// 401: endpoint answered and wants credentials; the service is up.
    AuthRequired,
    /// 403: answered but refused; possibly blocked.
    Forbidden,
    /// 404: answered; the path is not served here.
    NotFound,
    /// 5xx: reachable but unhealthy.
    ServerError,
    /// No response at all (DNS, connect, timeout).
    Unreachable,
    /// Any other status.
    Other,
}

impl ProbeOutcome {
    fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::OK => ProbeOutcome::Ok,
            StatusCode::UNAUTHORIZED => ProbeOutcome::AuthRequired,
            StatusCode::FORBIDDEN => ProbeOutcome::Forbidden,
            StatusCode::NOT_FOUND => ProbeOutcome::NotFound,
            s if s.is_server_error() => ProbeOutcome::ServerError,
            _ => ProbeOutcome::Other,
        }
    }

    /// Whether this outcome proves the service is reachable.
    /// 200/401/404 all mean a server answered on the other end.
    pub fn reachable(&self) -> bool {
        matches!(
            self,
            ProbeOutcome::Ok | ProbeOutcome::AuthRequired | ProbeOutcome::NotFound
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProbeResult {
    pub url: String,
    pub outcome: ProbeOutcome,
    pub status: Option<u16>,
    pub elapsed_ms: u64,
}

/// Aggregated result of probing all endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub results: Vec<ProbeResult>,
    pub reachable_count: usize,
    pub total_count: usize,
}

impl ProbeReport {
    /// The service counts as reachable when at least half the endpoints are.
    pub fn service_reachable(&self) -> bool {
        self.total_count > 0 && self.reachable_count * 2 >= self.total_count
    }

    pub fn summary(&self) -> String {
        if self.service_reachable() {
            format!(
                "API reachable ({}/{} endpoints answered)",
                self.reachable_count, self.total_count
            )
        } else {
            format!(
                "API unreachable ({}/{} endpoints answered); check network or proxy settings",
                self.reachable_count, self.total_count
            )
        }
    }
}

pub struct Prober {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl Prober {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent("cozectl")
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    /// Probes every known endpoint and aggregates the outcomes.
    #[tracing::instrument(skip(self))]
    pub async fn probe_all(&self) -> ProbeReport {
        let mut results = Vec::with_capacity(PROBE_PATHS.len());
        for path in PROBE_PATHS {
            results.push(self.probe_one(path).await);
        }

        let reachable_count = results.iter().filter(|r| r.outcome.reachable()).count();
        let total_count = results.len();
        ProbeReport {
            results,
            reachable_count,
            total_count,
        }
    }

    async fn probe_one(&self, path: &str) -> ProbeResult {
        let url = format!("{}{}", self.base_url, path);
        let started = std::time::Instant::now();

        match self.client.get(&url).timeout(self.timeout).send().await {
            Ok(response) => {
                let status = response.status();
                ProbeResult {
                    url,
                    outcome: ProbeOutcome::from_status(status),
                    status: Some(status.as_u16()),
                    elapsed_ms: started.elapsed().as_millis() as u64,
                }
            }
            Err(_) => ProbeResult {
                url,
                outcome: ProbeOutcome::Unreachable,
                status: None,
                elapsed_ms: started.elapsed().as_millis() as u64,
            },
        }
    }
}
