//! Executes model-issued tool invocation requests against the registry.
//!
//! Every failure (unknown tool, invalid arguments, tool error, timeout) is
//! turned into an error-flagged tool result so the model can react to it.
//! Nothing raised by a single tool escapes this module.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, info, warn};

use super::arguments::ToolArguments;
use super::registry::ToolRegistry;
use super::tool::ToolExecutionContext;
use super::validation::validate_arguments;
use crate::error::{ToolFailure, ToolFailureKind};
use crate::types::{Message, ToolInvocationRequest, ToolResult};
use crate::util::timeout::with_optional_timeout;

/// Runs tool invocation requests and wraps the outcome as tool results.
#[derive(Debug, Clone)]
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    timeout: Option<Duration>,
    parallel: bool,
}

impl ToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            timeout: None,
            parallel: false,
        }
    }

    /// Deadline applied to each tool execution.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run the requests of one batch concurrently.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Execute one request. Never fails; failures are carried in the result.
    pub async fn execute(&self, request: &ToolInvocationRequest) -> ToolResult {
        match self.try_execute(request).await {
            Ok(content) => ToolResult {
                tool_call_id: request.id.clone(),
                content,
                is_error: false,
            },
            Err(failure) => {
                warn!(
                    tool = %request.name,
                    call_id = %request.id,
                    kind = %failure.kind,
                    error = %failure.message,
                    "tool call failed"
                );
                ToolResult {
                    tool_call_id: request.id.clone(),
                    content: failure.to_value(),
                    is_error: true,
                }
            }
        }
    }

    /// Execute a batch of requests, returning tool result messages in request order.
    pub async fn execute_all(&self, requests: &[ToolInvocationRequest]) -> Vec<Message> {
        self.execute_all_observed(requests, |_| {}, |_, _| {}).await
    }

    /// Like [`execute_all`](Self::execute_all), calling `on_start` before and
    /// `on_done` after each individual execution.
    pub async fn execute_all_observed<S, D>(
        &self,
        requests: &[ToolInvocationRequest],
        on_start: S,
        on_done: D,
    ) -> Vec<Message>
    where
        S: Fn(&ToolInvocationRequest) + Sync,
        D: Fn(&ToolInvocationRequest, &ToolResult) + Sync,
    {
        let results = if self.parallel && requests.len() > 1 {
            join_all(
                requests
                    .iter()
                    .map(|request| self.execute_observed(request, &on_start, &on_done)),
            )
            .await
        } else {
            let mut results = Vec::with_capacity(requests.len());
            for request in requests {
                results.push(self.execute_observed(request, &on_start, &on_done).await);
            }
            results
        };
        results.into_iter().map(Message::ToolResult).collect()
    }

    async fn execute_observed<S, D>(
        &self,
        request: &ToolInvocationRequest,
        on_start: &S,
        on_done: &D,
    ) -> ToolResult
    where
        S: Fn(&ToolInvocationRequest) + Sync,
        D: Fn(&ToolInvocationRequest, &ToolResult) + Sync,
    {
        on_start(request);
        let result = self.execute(request).await;
        on_done(request, &result);
        result
    }

    async fn try_execute(
        &self,
        request: &ToolInvocationRequest,
    ) -> Result<serde_json::Value, ToolFailure> {
        let tool = self.registry.lookup(&request.name).map_err(|e| {
            ToolFailure::new(ToolFailureKind::UnknownTool, &request.name, e.to_string())
        })?;

        let invalid = |message: String| {
            ToolFailure::new(ToolFailureKind::InvalidArguments, &request.name, message)
        };
        let arguments = ToolArguments::new(request.arguments.clone())
            .normalized()
            .map_err(|e| invalid(e.to_string()))?;
        validate_arguments(&arguments, &tool.parameters().schema)
            .map_err(|violation| invalid(violation.to_string()))?;

        info!(tool = %request.name, call_id = %request.id, "Using tool");

        let args = ToolArguments::new(arguments);
        let ctx = ToolExecutionContext::for_call(request.id.clone());
        match with_optional_timeout(self.timeout, tool.execute(&args, &ctx)).await {
            Ok(value) => {
                debug!(tool = %request.name, call_id = %request.id, "tool call succeeded");
                Ok(value)
            }
            Err(e) => Err(ToolFailure::from_error(&request.name, &e)),
        }
    }
}
