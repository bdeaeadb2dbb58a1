//! `run` command: invoke a workflow and report its output.

use anyhow::{Result, bail};
use serde_json::{Map, Value, json};

use super::{Config, HandlerOutput};
use crate::api::{WorkflowApi, WorkflowRequest};
use crate::config::validate_workflow_id;
use crate::runtime::Runtime;

/// Inputs gathered from the CLI for one workflow run.
#[derive(Debug, Default)]
pub struct RunArgs {
    pub workflow_id: String,
    pub user_input: String,
    pub bot_id: Option<String>,
    pub app_id: Option<String>,
    pub conversation_id: Option<String>,
    pub system_prompt: Option<String>,
    pub params: Vec<(String, Value)>,
}

/// Parses a `key=value` CLI parameter. The value is taken as JSON when it
/// parses as such, else as a plain string.
pub fn parse_param(raw: &str) -> Result<(String, Value)> {
    let Some((key, value)) = raw.split_once('=') else {
        bail!("Invalid parameter {:?}: expected key=value", raw);
    };
    if key.is_empty() {
        bail!("Invalid parameter {:?}: empty key", raw);
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::from(value));
    Ok((key.to_string(), value))
}

#[tracing::instrument(skip(runtime, args, token, base_url))]
pub async fn run<R: Runtime>(
    runtime: R,
    args: RunArgs,
    token: Option<String>,
    base_url: Option<String>,
) -> HandlerOutput {
    let config = match Config::new(runtime, token, base_url) {
        Ok(config) => config,
        Err(e) => return HandlerOutput::failure(format!("Configuration error: {}", e), "config"),
    };

    if let Err(e) = validate_workflow_id(&args.workflow_id) {
        return HandlerOutput::failure(format!("Configuration error: {}", e), "config");
    }

    let client = match config.workflow_client() {
        Ok(client) => client,
        Err(e) => return HandlerOutput::failure(format!("Configuration error: {}", e), "config"),
    };

    execute(&client, args).await
}

/// Invokes the workflow through any API implementation and maps the result.
pub async fn execute<A: WorkflowApi>(api: &A, args: RunArgs) -> HandlerOutput {
    let mut request = WorkflowRequest::new(args.workflow_id, args.user_input);
    request.bot_id = args.bot_id;
    request.app_id = args.app_id;
    request.conversation_id = args.conversation_id;
    request.system_prompt = args.system_prompt;
    request.parameters = args.params.into_iter().collect::<Map<String, Value>>();

    match api.run_workflow(&request).await {
        Ok(result) => {
            HandlerOutput::success(result.output).with_details(json!({
                "response": result.response,
            }))
        }
        Err(err) => HandlerOutput::from_invoke_error(&err),
    }
}
