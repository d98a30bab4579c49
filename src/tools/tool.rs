//! Tool trait and closure-based tool wrapper.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use super::types::{AgentToolParameters, ToolContext, ToolInfo, ToolResponse};
use crate::types::ToolCall;

/// Failure raised by a tool instead of a response.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    /// The permission layer refused the call. Stops the whole dispatch round.
    #[error("permission denied")]
    PermissionDenied,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Execution(String),

    #[error("execution canceled")]
    Cancelled,
}

/// Core tool trait — implement to create custom tools.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name, description and parameter schema advertised to the model.
    fn info(&self) -> ToolInfo;

    /// Execute one call. `call.input` is the raw JSON text from the model.
    async fn run(&self, call: &ToolCall, ctx: &ToolContext) -> Result<ToolResponse, ToolError>;
}

/// Type alias for the tool handler function.
type ToolHandler = dyn Fn(
        serde_json::Value,
        ToolContext,
    ) -> Pin<Box<dyn Future<Output = Result<ToolResponse, ToolError>> + Send>>
    + Send
    + Sync;

/// Closure-based tool. Input is parsed and checked against the parameter
/// schema before the handler runs.
pub struct AgentTool {
    name: String,
    description: String,
    parameters: AgentToolParameters,
    handler: Arc<ToolHandler>,
}

impl AgentTool {
    /// Create a tool from a closure.
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: AgentToolParameters,
        handler: F,
    ) -> Self
    where
        F: Fn(serde_json::Value, ToolContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolResponse, ToolError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            handler: Arc::new(move |args, ctx| Box::pin(handler(args, ctx))),
        }
    }

    fn parse_input(&self, input: &str) -> Result<serde_json::Value, ToolError> {
        let args = if input.trim().is_empty() {
            serde_json::Value::Object(serde_json::Map::new())
        } else {
            serde_json::from_str(input).map_err(|e| ToolError::InvalidInput(e.to_string()))?
        };
        check_arguments(&args, &self.parameters.schema).map_err(ToolError::InvalidInput)?;
        Ok(args)
    }
}

#[async_trait]
impl Tool for AgentTool {
    fn info(&self) -> ToolInfo {
        ToolInfo {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.parameters.clone(),
        }
    }

    async fn run(&self, call: &ToolCall, ctx: &ToolContext) -> Result<ToolResponse, ToolError> {
        let args = self.parse_input(&call.input)?;
        (self.handler)(args, ctx.clone()).await
    }
}

impl std::fmt::Debug for AgentTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}

/// Top-level schema check: object shape, required fields, primitive property types.
fn check_arguments(args: &serde_json::Value, schema: &serde_json::Value) -> Result<(), String> {
    let Some(obj) = args.as_object() else {
        return Err("expected a JSON object".to_string());
    };

    let required = schema
        .get("required")
        .and_then(|v| v.as_array())
        .into_iter()
        .flatten()
        .filter_map(|v| v.as_str());
    for name in required {
        if !obj.contains_key(name) {
            return Err(format!("missing required field '{name}'"));
        }
    }

    let Some(properties) = schema.get("properties").and_then(|v| v.as_object()) else {
        return Ok(());
    };
    for (key, value) in obj {
        let expected = properties
            .get(key)
            .and_then(|p| p.get("type"))
            .and_then(|t| t.as_str());
        let ok = match expected {
            Some("string") => value.is_string(),
            Some("integer") => value.is_i64() || value.is_u64(),
            Some("number") => value.is_number(),
            Some("boolean") => value.is_boolean(),
            Some("array") => value.is_array(),
            Some("object") => value.is_object(),
            _ => true,
        };
        if !ok {
            return Err(format!("field '{key}' is not of type {}", expected.unwrap_or("?")));
        }
    }
    Ok(())
}
