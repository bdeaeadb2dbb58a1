//! Request/response types for the workflow-run endpoint.

use serde::Serialize;
use serde_json::{Map, Value};

/// Input for a single workflow invocation.
///
/// Only `workflow_id` and `user_input` are required; optional fields are
/// omitted from the wire payload entirely when not set.
#[derive(Debug, Clone, Default)]
pub struct WorkflowRequest {
    pub workflow_id: String,
    pub user_input: String,
    pub bot_id: Option<String>,
    pub app_id: Option<String>,
    pub conversation_id: Option<String>,
    pub system_prompt: Option<String>,
    /// Extra workflow parameters merged into the `parameters` object.
    pub parameters: Map<String, Value>,
}

impl WorkflowRequest {
    pub fn new(workflow_id: impl Into<String>, user_input: impl Into<String>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            user_input: user_input.into(),
            ..Self::default()
        }
    }

    /// Serializes the request into the `POST /v1/workflow/run` body.
    pub fn to_body(&self) -> RunWorkflowBody<'_> {
        let mut parameters = Map::new();
        parameters.insert("user_input".to_string(), Value::from(self.user_input.clone()));
        if let Some(system_prompt) = &self.system_prompt {
            parameters.insert("system_prompt".to_string(), Value::from(system_prompt.clone()));
        }
        for (key, value) in &self.parameters {
            parameters.insert(key.clone(), value.clone());
        }

        RunWorkflowBody {
            workflow_id: &self.workflow_id,
            parameters,
            bot_id: self.bot_id.as_deref(),
            app_id: self.app_id.as_deref(),
            conversation_id: self.conversation_id.as_deref(),
        }
    }
}

/// Wire payload for the workflow-run endpoint. Optional keys are absent, not
/// null, when the corresponding field is unset.
#[derive(Debug, Serialize)]
pub struct RunWorkflowBody<'a> {
    pub workflow_id: &'a str,
    pub parameters: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bot_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<&'a str>,
}

/// A successful workflow invocation: the extracted output plus the full
/// response envelope.
#[derive(Debug, Clone)]
pub struct WorkflowRun {
    pub output: String,
    pub response: Value,
}

/// Extracts the workflow's textual output from the response envelope.
///
/// Prefers a nested `data.output` field; falls back to `data` itself when it
/// is a string, then to the canonical JSON of `data`, then to the canonical
/// JSON of the whole body when no `data` key exists.
pub fn extract_output(body: &Value) -> String {
    match body.get("data") {
        Some(data) => {
            if let Some(output) = data.get("output") {
                match output.as_str() {
                    Some(s) => s.to_string(),
                    None => output.to_string(),
                }
            } else if let Some(s) = data.as_str() {
                s.to_string()
            } else {
                data.to_string()
            }
        }
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_minimal_body_has_no_optional_keys() {
        let request = WorkflowRequest::new("123", "hi");
        let body = serde_json::to_value(request.to_body()).unwrap();

        assert_eq!(body["workflow_id"], "123");
        assert_eq!(body["parameters"]["user_input"], "hi");

        let object = body.as_object().unwrap();
        assert!(!object.contains_key("bot_id"));
        assert!(!object.contains_key("app_id"));
        assert!(!object.contains_key("conversation_id"));
        assert_eq!(object.len(), 2);
        assert_eq!(body["parameters"].as_object().unwrap().len(), 1);
    }

    #[test]
    fn test_optional_fields_are_serialized_when_set() {
        let mut request = WorkflowRequest::new("123", "hi");
        request.bot_id = Some("bot-1".to_string());
        request.app_id = Some("app-1".to_string());
        request.conversation_id = Some("conv-1".to_string());

        let body = serde_json::to_value(request.to_body()).unwrap();
        assert_eq!(body["bot_id"], "bot-1");
        assert_eq!(body["app_id"], "app-1");
        assert_eq!(body["conversation_id"], "conv-1");
    }

    #[test]
    fn test_system_prompt_lands_in_parameters() {
        let mut request = WorkflowRequest::new("123", "hi");
        request.system_prompt = Some("be brief".to_string());

        let body = serde_json::to_value(request.to_body()).unwrap();
        assert_eq!(body["parameters"]["system_prompt"], "be brief");
        assert!(!body.as_object().unwrap().contains_key("system_prompt"));
    }

    #[test]
    fn test_extra_parameters_are_merged() {
        let mut request = WorkflowRequest::new("123", "hi");
        request
            .parameters
            .insert("style".to_string(), Value::from("haiku"));
        request.parameters.insert("count".to_string(), Value::from(3));

        let body = serde_json::to_value(request.to_body()).unwrap();
        assert_eq!(body["parameters"]["user_input"], "hi");
        assert_eq!(body["parameters"]["style"], "haiku");
        assert_eq!(body["parameters"]["count"], 3);
    }

    #[test]
    fn test_extract_output_nested_output_field() {
        let body = json!({"data": {"output": "hello"}});
        assert_eq!(extract_output(&body), "hello");
    }

    #[test]
    fn test_extract_output_plain_string_data() {
        let body = json!({"data": "plain"});
        assert_eq!(extract_output(&body), "plain");
    }

    #[test]
    fn test_extract_output_object_data_is_serialized() {
        let body = json!({"data": {"x": 1}});
        assert_eq!(extract_output(&body), r#"{"x":1}"#);
    }

    #[test]
    fn test_extract_output_missing_data_serializes_whole_body() {
        let body = json!({"code": 0, "msg": "ok"});
        assert_eq!(extract_output(&body), r#"{"code":0,"msg":"ok"}"#);
    }

    #[test]
    fn test_extract_output_non_string_output_is_serialized() {
        let body = json!({"data": {"output": {"answer": 42}}});
        assert_eq!(extract_output(&body), r#"{"answer":42}"#);
    }
}
