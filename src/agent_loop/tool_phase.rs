use std::panic::AssertUnwindSafe;

use futures::FutureExt;

use super::RunContext;
use crate::error::{EngineError, Result};
use crate::store::CreateMessageParams;
use crate::tools::{ToolContext, ToolError};
use crate::types::{ContentPart, FinishReason, Message, Role, ToolCall, ToolResult};

const CANCELED_CONTENT: &str = "execution canceled";

pub(super) struct ToolPhaseOutcome {
    /// Tool-role message holding one result per call; `None` when the turn had no calls.
    pub(super) results: Option<Message>,
    pub(super) canceled: bool,
}

fn canceled_tool_result(call: &ToolCall) -> ToolResult {
    ToolResult::error(call, CANCELED_CONTENT)
}

/// Execute the assistant turn's tool calls strictly in order.
///
/// Cancellation (before or during a call) gives that call and every later
/// one a canceled result. A permission denial does the same for later calls
/// and finishes the assistant message as `PermissionDenied`. Any other
/// failure is folded into that call's result and dispatch continues.
pub(super) async fn run_tool_phase(
    ctx: &RunContext,
    assistant: &mut Message,
) -> Result<ToolPhaseOutcome> {
    let calls = assistant.tool_calls();
    if calls.is_empty() {
        return Ok(ToolPhaseOutcome {
            results: None,
            canceled: false,
        });
    }

    let mut results = Vec::with_capacity(calls.len());
    let mut canceled = false;
    let mut denied = false;

    for (idx, call) in calls.iter().enumerate() {
        if ctx.cancel.is_cancelled() {
            canceled = true;
            results.extend(calls[idx..].iter().map(canceled_tool_result));
            break;
        }

        let Some(tool) = ctx.tool(&call.name) else {
            tracing::warn!(session_id = %ctx.session_id, tool = %call.name, "tool not found");
            let err = EngineError::ToolNotFound(call.name.clone());
            results.push(ToolResult::error(call, err.to_string()));
            continue;
        };

        let tool_ctx = ToolContext {
            session_id: ctx.session_id.clone(),
            message_id: assistant.id.clone(),
            cancel: ctx.cancel.child_token(),
        };
        tracing::debug!(session_id = %ctx.session_id, tool = %call.name, call_id = %call.id, "executing tool");

        let execution = AssertUnwindSafe(tool.run(call, &tool_ctx)).catch_unwind();
        let outcome = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => None,
            outcome = execution => Some(outcome),
        };

        match outcome {
            None => {
                canceled = true;
                results.extend(calls[idx..].iter().map(canceled_tool_result));
                break;
            }
            Some(Err(_panic)) => {
                tracing::error!(session_id = %ctx.session_id, tool = %call.name, "tool panicked");
                results.push(ToolResult::error(call, "tool crashed"));
            }
            Some(Ok(Err(ToolError::PermissionDenied))) => {
                tracing::info!(session_id = %ctx.session_id, tool = %call.name, "tool permission denied");
                denied = true;
                results.push(ToolResult::error(call, EngineError::PermissionDenied.to_string()));
                results.extend(calls[idx + 1..].iter().map(canceled_tool_result));
                break;
            }
            Some(Ok(Err(err))) => {
                tracing::debug!(session_id = %ctx.session_id, tool = %call.name, error = %err, "tool failed");
                results.push(ToolResult::error(call, err.to_string()));
            }
            Some(Ok(Ok(response))) => results.push(ToolResult {
                tool_call_id: call.id.clone(),
                name: call.name.clone(),
                content: response.content,
                metadata: response.metadata,
                is_error: response.is_error,
            }),
        }
    }

    if denied {
        ctx.finish_message(assistant, FinishReason::PermissionDenied).await?;
    } else if canceled {
        ctx.finish_message(assistant, FinishReason::Cancelled).await?;
    }

    let message = ctx
        .messages
        .create_message(
            &ctx.session_id,
            CreateMessageParams {
                role: Role::Tool,
                parts: results.into_iter().map(ContentPart::ToolResult).collect(),
                model: None,
            },
        )
        .await?;

    Ok(ToolPhaseOutcome {
        results: Some(message),
        canceled,
    })
}
