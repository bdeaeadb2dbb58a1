//! `auth check` command: validate the configured personal access token.

use super::{Config, HandlerOutput};
use crate::api::WorkflowApi;
use crate::runtime::Runtime;

#[tracing::instrument(skip(runtime, token, base_url))]
pub async fn check<R: Runtime>(
    runtime: R,
    token: Option<String>,
    base_url: Option<String>,
) -> HandlerOutput {
    let config = match Config::new(runtime, token, base_url) {
        Ok(config) => config,
        Err(e) => return HandlerOutput::failure(format!("Configuration error: {}", e), "config"),
    };

    let client = match config.workflow_client() {
        Ok(client) => client,
        Err(e) => return HandlerOutput::failure(format!("Configuration error: {}", e), "config"),
    };

    verify(&client).await
}

/// Runs the token probe through any API implementation.
pub async fn verify<A: WorkflowApi>(api: &A) -> HandlerOutput {
    match api.check_token().await {
        Ok(profile) => {
            let who = profile
                .get("user_name")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown user");
            HandlerOutput::success(format!("Token is valid (authenticated as {})", who))
                .with_details(profile)
        }
        Err(err) => HandlerOutput::from_invoke_error(&err),
    }
}
