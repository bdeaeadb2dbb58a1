//! Workflow invocation client: authenticated requests with bounded retry,
//! exponential backoff, and failure classification.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::{
    Client,
    header::{AUTHORIZATION, HeaderMap, HeaderValue},
};
use serde::Serialize;
use serde_json::Value;

use super::error::{ErrorKind, InvokeError};
use super::types::{WorkflowRequest, WorkflowRun, extract_output};
use crate::logging::{CrateLogger, Logger, log_error, log_info};
use crate::retry::RetryPolicy;

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.coze.com";

/// Per-request timeout tiers. Workflow execution gets a longer timeout than a
/// lightweight connectivity probe.
#[derive(Debug, Clone)]
pub struct TimeoutPolicy {
    pub workflow_run: Duration,
    pub probe: Duration,
    pub default: Duration,
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self {
            workflow_run: Duration::from_secs(60),
            probe: Duration::from_secs(5),
            default: Duration::from_secs(30),
        }
    }
}

/// What a request is for, used to select its timeout tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    WorkflowRun,
    Probe,
    Default,
}

impl TimeoutPolicy {
    pub fn for_kind(&self, kind: RequestKind) -> Duration {
        match kind {
            RequestKind::WorkflowRun => self.workflow_run,
            RequestKind::Probe => self.probe,
            RequestKind::Default => self.default,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WorkflowApi: Send + Sync {
    async fn run_workflow(&self, request: &WorkflowRequest) -> Result<WorkflowRun, InvokeError>;
    async fn check_token(&self) -> Result<Value, InvokeError>;
}

pub struct WorkflowClient {
    client: Client,
    base_url: String,
    timeouts: TimeoutPolicy,
    retry: RetryPolicy,
    logger: Arc<dyn Logger>,
}

impl std::fmt::Debug for WorkflowClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowClient")
            .field("client", &self.client)
            .field("base_url", &self.base_url)
            .field("timeouts", &self.timeouts)
            .field("retry", &self.retry)
            .field("logger", &"<dyn Logger>")
            .finish()
    }
}

impl WorkflowClient {
    /// Creates a client with default timeout and retry policies.
    ///
    /// Fails if the token is empty or cannot form a valid header.
    pub fn new(access_token: &str, base_url: Option<String>) -> Result<Self> {
        Self::with_policies(
            access_token,
            base_url,
            TimeoutPolicy::default(),
            RetryPolicy::default(),
            Arc::new(CrateLogger),
        )
    }

    #[tracing::instrument(skip(access_token, base_url, timeouts, retry, logger))]
    pub fn with_policies(
        access_token: &str,
        base_url: Option<String>,
        timeouts: TimeoutPolicy,
        retry: RetryPolicy,
        logger: Arc<dyn Logger>,
    ) -> Result<Self> {
        let token = access_token.trim();
        if token.is_empty() {
            bail!("access token must not be empty");
        }

        let base_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = base_url.trim_end_matches('/').to_string();

        let mut headers = HeaderMap::new();
        let mut auth_value = HeaderValue::from_str(&format!("Bearer {}", token))
            .context("Access token contains characters not allowed in a header")?;
        auth_value.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_value);

        let client = Client::builder()
            .user_agent("cozectl")
            .default_headers(headers)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url,
            timeouts,
            retry,
            logger,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Single POST attempt: transport failures and non-2xx statuses come back
    /// as classified errors, a 2xx body is parsed as JSON.
    async fn post_json<B: Serialize + Sync + ?Sized>(
        &self,
        url: &str,
        body: &B,
        timeout: Duration,
    ) -> Result<Value, InvokeError> {
        let response = self
            .client
            .post(url)
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| InvokeError::from_transport(&e))?;

        Self::read_json(response).await
    }

    async fn get_json(&self, url: &str, timeout: Duration) -> Result<Value, InvokeError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| InvokeError::from_transport(&e))?;

        Self::read_json(response).await
    }

    async fn read_json(response: reqwest::Response) -> Result<Value, InvokeError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InvokeError::from_response(status, &body));
        }

        let text = response.text().await.map_err(|e| {
            InvokeError::new(
                ErrorKind::ResponseParse,
                format!("Failed to read response body: {}", e),
            )
        })?;

        serde_json::from_str(&text).map_err(|e| InvokeError {
            kind: ErrorKind::ResponseParse,
            message: format!("Response parse error: {}", e),
            http_status: Some(status.as_u16()),
            raw_body: Some(text),
        })
    }

    /// The attempt loop: retryable failures sleep `backoff_factor^attempt`
    /// units and try again, up to `max_retries` retries; everything else is
    /// terminal immediately.
    async fn post_with_retry<B: Serialize + Sync + ?Sized>(
        &self,
        operation: &str,
        url: &str,
        body: &B,
        timeout: Duration,
    ) -> Result<Value, InvokeError> {
        let mut attempt: u32 = 0;

        loop {
            match self.post_json(url, body, timeout).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if err.is_retryable(&self.retry) && attempt < self.retry.max_retries {
                        let delay = self.retry.backoff_delay(attempt);
                        log_error(
                            &self.logger,
                            &format!(
                                "{}: attempt {}/{} failed ({}), retrying in {:.1}s...",
                                operation,
                                attempt + 1,
                                self.retry.max_retries + 1,
                                err,
                                delay.as_secs_f64()
                            ),
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }

                    log_error(&self.logger, &format!("{}: {}", operation, err));
                    return Err(err);
                }
            }
        }
    }
}

#[async_trait]
impl WorkflowApi for WorkflowClient {
    #[tracing::instrument(skip(self, request))]
    async fn run_workflow(&self, request: &WorkflowRequest) -> Result<WorkflowRun, InvokeError> {
        let url = format!("{}/v1/workflow/run", self.base_url);
        let body = request.to_body();
        let timeout = self.timeouts.for_kind(RequestKind::WorkflowRun);

        log_info(
            &self.logger,
            &format!("Running workflow {}...", request.workflow_id),
        );

        let response = self
            .post_with_retry("Workflow run", &url, &body, timeout)
            .await?;

        let output = extract_output(&response);
        log_info(
            &self.logger,
            &format!(
                "Workflow {} finished, output length {}",
                request.workflow_id,
                output.len()
            ),
        );

        Ok(WorkflowRun { output, response })
    }

    /// Validates the access token against the user-profile endpoint.
    /// A single attempt; token problems are never transient.
    #[tracing::instrument(skip(self))]
    async fn check_token(&self) -> Result<Value, InvokeError> {
        let url = format!("{}/v1/user/profile", self.base_url);
        let timeout = self.timeouts.for_kind(RequestKind::Default);
        self.get_json(&url, timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::tests::{CountingLogger, PanickingLogger};
    use mockito::Matcher;
    use serde_json::json;

    /// Client against a mockito server with millisecond backoff.
    fn test_client(url: &str, retry: RetryPolicy) -> WorkflowClient {
        WorkflowClient::with_policies(
            "pat_test_token",
            Some(url.to_string()),
            TimeoutPolicy::default(),
            RetryPolicy {
                backoff_unit: Duration::from_millis(1),
                ..retry
            },
            Arc::new(crate::logging::NoopLogger),
        )
        .unwrap()
    }

    #[test]
    fn test_new_rejects_empty_token() {
        assert!(WorkflowClient::new("", None).is_err());
        assert!(WorkflowClient::new("   ", None).is_err());
    }

    #[test]
    fn test_new_trims_trailing_slash() {
        let client =
            WorkflowClient::new("pat_token", Some("https://api.example.com/".to_string())).unwrap();
        assert_eq!(client.base_url(), "https://api.example.com");
    }

    #[test]
    fn test_new_defaults_base_url() {
        let client = WorkflowClient::new("pat_token", None).unwrap();
        assert_eq!(client.base_url(), DEFAULT_BASE_URL);
    }

    #[test]
    fn test_timeout_policy_tiers() {
        let timeouts = TimeoutPolicy::default();
        assert_eq!(
            timeouts.for_kind(RequestKind::WorkflowRun),
            Duration::from_secs(60)
        );
        assert_eq!(timeouts.for_kind(RequestKind::Probe), Duration::from_secs(5));
        assert_eq!(
            timeouts.for_kind(RequestKind::Default),
            Duration::from_secs(30)
        );
        assert!(timeouts.workflow_run > timeouts.probe);
    }

    #[tokio::test]
    async fn test_run_workflow_success_extracts_output() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("POST", "/v1/workflow/run")
            .match_header("Authorization", "Bearer pat_test_token")
            .match_body(Matcher::Json(json!({
                "workflow_id": "123",
                "parameters": {"user_input": "hi"}
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"code": 0, "data": {"output": "hello"}}"#)
            .create_async()
            .await;

        let client = test_client(&server.url(), RetryPolicy::default());
        let run = client
            .run_workflow(&WorkflowRequest::new("123", "hi"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(run.output, "hello");
        assert_eq!(run.response["code"], 0);
    }

    #[tokio::test]
    async fn test_run_workflow_retries_server_errors_until_bound() {
        let mut server = mockito::Server::new_async().await;

        // max_retries=3 means exactly 4 attempts against a persistent 503.
        let mock = server
            .mock("POST", "/v1/workflow/run")
            .with_status(503)
            .expect(4)
            .create_async()
            .await;

        let retry = RetryPolicy {
            max_retries: 3,
            ..RetryPolicy::default()
        };
        let client = test_client(&server.url(), retry);
        let err = client
            .run_workflow(&WorkflowRequest::new("123", "hi"))
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert_eq!(err.kind, ErrorKind::Server);
        assert_eq!(err.http_status, Some(503));
    }

    #[tokio::test]
    async fn test_run_workflow_does_not_retry_auth_errors() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("POST", "/v1/workflow/run")
            .with_status(401)
            .with_body(r#"{"code": 4100, "msg": "token expired"}"#)
            .expect(1)
            .create_async()
            .await;

        let retry = RetryPolicy {
            max_retries: 5,
            ..RetryPolicy::default()
        };
        let client = test_client(&server.url(), retry);
        let err = client
            .run_workflow(&WorkflowRequest::new("123", "hi"))
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert_eq!(err.kind, ErrorKind::Auth);
        assert!(err.message.contains("token expired"));
    }

    #[tokio::test]
    async fn test_run_workflow_404_is_terminal_workflow_error() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("POST", "/v1/workflow/run")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;

        let client = test_client(&server.url(), RetryPolicy::default());
        let err = client
            .run_workflow(&WorkflowRequest::new("123", "hi"))
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert_eq!(err.kind, ErrorKind::Workflow);
    }

    #[tokio::test]
    async fn test_run_workflow_429_terminal_by_default() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("POST", "/v1/workflow/run")
            .with_status(429)
            .expect(1)
            .create_async()
            .await;

        let client = test_client(&server.url(), RetryPolicy::default());
        let err = client
            .run_workflow(&WorkflowRequest::new("123", "hi"))
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert_eq!(err.kind, ErrorKind::RateLimit);
    }

    #[tokio::test]
    async fn test_run_workflow_429_retried_when_opted_in() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("POST", "/v1/workflow/run")
            .with_status(429)
            .expect(2)
            .create_async()
            .await;

        let retry = RetryPolicy {
            max_retries: 1,
            retry_on_rate_limit: true,
            ..RetryPolicy::default()
        };
        let client = test_client(&server.url(), retry);
        let err = client
            .run_workflow(&WorkflowRequest::new("123", "hi"))
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert_eq!(err.kind, ErrorKind::RateLimit);
    }

    #[tokio::test]
    async fn test_run_workflow_unparseable_success_body_is_terminal() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("POST", "/v1/workflow/run")
            .with_status(200)
            .with_body("definitely not json")
            .expect(1)
            .create_async()
            .await;

        let client = test_client(&server.url(), RetryPolicy::default());
        let err = client
            .run_workflow(&WorkflowRequest::new("123", "hi"))
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert_eq!(err.kind, ErrorKind::ResponseParse);
        assert_eq!(err.raw_body.as_deref(), Some("definitely not json"));
    }

    #[tokio::test]
    async fn test_run_workflow_other_client_error_is_unknown() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("POST", "/v1/workflow/run")
            .with_status(400)
            .with_body(r#"{"code": 4000, "msg": "bad parameters"}"#)
            .expect(1)
            .create_async()
            .await;

        let client = test_client(&server.url(), RetryPolicy::default());
        let err = client
            .run_workflow(&WorkflowRequest::new("123", "hi"))
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert_eq!(err.kind, ErrorKind::Unknown);
        assert_eq!(err.http_status, Some(400));
        assert!(err.message.contains("bad parameters"));
    }

    #[tokio::test]
    async fn test_run_workflow_network_error_classified() {
        // Nothing listens on this port.
        let client = test_client("http://127.0.0.1:9", RetryPolicy::none());
        let err = client
            .run_workflow(&WorkflowRequest::new("123", "hi"))
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::Network);
        assert_eq!(err.http_status, None);
    }

    #[tokio::test]
    async fn test_run_workflow_result_unaffected_by_panicking_logger() {
        let mut server = mockito::Server::new_async().await;

        let _mock_err = server
            .mock("POST", "/v1/workflow/run")
            .with_status(401)
            .create_async()
            .await;

        let client = WorkflowClient::with_policies(
            "pat_test_token",
            Some(server.url()),
            TimeoutPolicy::default(),
            RetryPolicy::none(),
            Arc::new(PanickingLogger),
        )
        .unwrap();

        let err = client
            .run_workflow(&WorkflowRequest::new("123", "hi"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Auth);
    }

    #[tokio::test]
    async fn test_run_workflow_success_with_panicking_logger() {
        let mut server = mockito::Server::new_async().await;

        let _mock = server
            .mock("POST", "/v1/workflow/run")
            .with_status(200)
            .with_body(r#"{"data": "plain"}"#)
            .create_async()
            .await;

        let client = WorkflowClient::with_policies(
            "pat_test_token",
            Some(server.url()),
            TimeoutPolicy::default(),
            RetryPolicy::none(),
            Arc::new(PanickingLogger),
        )
        .unwrap();

        let run = client
            .run_workflow(&WorkflowRequest::new("123", "hi"))
            .await
            .unwrap();
        assert_eq!(run.output, "plain");
    }

    #[test_log::test(tokio::test)]
    async fn test_retry_emits_log_lines() {
        let mut server = mockito::Server::new_async().await;

        let _mock = server
            .mock("POST", "/v1/workflow/run")
            .with_status(500)
            .expect(2)
            .create_async()
            .await;

        let counting = Arc::new(CountingLogger::new());
        let client = WorkflowClient::with_policies(
            "pat_test_token",
            Some(server.url()),
            TimeoutPolicy::default(),
            RetryPolicy {
                max_retries: 1,
                backoff_unit: Duration::from_millis(1),
                ..RetryPolicy::default()
            },
            counting.clone(),
        )
        .unwrap();

        let _ = client.run_workflow(&WorkflowRequest::new("123", "hi")).await;

        // One retry line plus one terminal line.
        assert_eq!(
            counting.errors.load(std::sync::atomic::Ordering::SeqCst),
            2
        );
    }

    #[tokio::test]
    async fn test_check_token_success() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("GET", "/v1/user/profile")
            .match_header("Authorization", "Bearer pat_test_token")
            .with_status(200)
            .with_body(r#"{"user_id": "u-1", "user_name": "tester"}"#)
            .create_async()
            .await;

        let client = test_client(&server.url(), RetryPolicy::default());
        let profile = client.check_token().await.unwrap();

        mock.assert_async().await;
        assert_eq!(profile["user_name"], "tester");
    }

    #[tokio::test]
    async fn test_check_token_invalid() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("GET", "/v1/user/profile")
            .with_status(401)
            .expect(1)
            .create_async()
            .await;

        let client = test_client(&server.url(), RetryPolicy::default());
        let err = client.check_token().await.unwrap_err();

        mock.assert_async().await;
        assert_eq!(err.kind, ErrorKind::Auth);
    }
}
