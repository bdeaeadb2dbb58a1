//! Client for the workflow HTTP API.

mod client;
mod error;
mod types;

pub use client::{
    DEFAULT_BASE_URL, RequestKind, TimeoutPolicy, WorkflowApi, WorkflowClient,
};
pub use error::{ErrorKind, InvokeError};
pub use types::{RunWorkflowBody, WorkflowRequest, WorkflowRun, extract_output};

#[cfg(test)]
pub use client::MockWorkflowApi;
