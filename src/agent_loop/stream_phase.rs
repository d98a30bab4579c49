use futures::StreamExt;

use super::accounting::track_usage;
use super::RunContext;
use crate::error::{EngineError, Result};
use crate::provider::ProviderEvent;
use crate::store::CreateMessageParams;
use crate::types::{FinishReason, Message, Role};

/// Stream one assistant turn into a freshly created message.
///
/// The message is persisted after every applied event. On cancellation it
/// is finished as `Cancelled` and `RequestCancelled` is returned; on a
/// backend error it is finished as `Error`. A stream that ends without a
/// completion event leaves the message finished as `Unknown`.
pub(super) async fn run_stream_phase(ctx: &RunContext, history: Vec<Message>) -> Result<Message> {
    let model = ctx.provider.model().clone();
    let mut message = ctx
        .messages
        .create_message(
            &ctx.session_id,
            CreateMessageParams {
                role: Role::Assistant,
                parts: Vec::new(),
                model: Some(model.id.clone()),
            },
        )
        .await?;

    let tools = ctx.tools.iter().map(|t| t.info()).collect();
    let mut stream = ctx
        .provider
        .stream_response(history, tools, ctx.cancel.child_token());

    loop {
        let event = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => {
                ctx.finish_message_quietly(&mut message, FinishReason::Cancelled).await;
                return Err(EngineError::RequestCancelled);
            }
            event = stream.next() => event,
        };

        let Some(event) = event else {
            tracing::warn!(
                session_id = %ctx.session_id,
                message_id = %message.id,
                "provider stream ended without a completion event"
            );
            ctx.finish_message(&mut message, FinishReason::Unknown).await?;
            return Ok(message);
        };

        match event {
            ProviderEvent::ContentDelta(delta) => message.append_content(&delta),
            ProviderEvent::ThinkingDelta(delta) => message.append_reasoning(&delta),
            ProviderEvent::ToolUseStart(call) => {
                tracing::debug!(session_id = %ctx.session_id, tool = %call.name, call_id = %call.id, "tool use started");
                message.add_tool_call(call);
            }
            ProviderEvent::ToolUseStop(id) => {
                if !message.finish_tool_call(&id) {
                    tracing::debug!(session_id = %ctx.session_id, call_id = %id, "stop for unknown tool call");
                }
            }
            ProviderEvent::Error(err) if err.is_cancellation() => {
                ctx.finish_message_quietly(&mut message, FinishReason::Cancelled).await;
                return Err(EngineError::RequestCancelled);
            }
            ProviderEvent::Error(err) => {
                tracing::error!(session_id = %ctx.session_id, message_id = %message.id, error = %err, "provider stream error");
                ctx.finish_message_quietly(&mut message, FinishReason::Error).await;
                return Err(EngineError::Stream(err.to_string()));
            }
            ProviderEvent::Complete(response) => {
                if !response.tool_calls.is_empty() {
                    message.set_tool_calls(response.tool_calls);
                }
                ctx.finish_message(&mut message, response.finish_reason).await?;
                track_usage(ctx.sessions.as_ref(), &ctx.session_id, &model, &response.usage).await?;
                return Ok(message);
            }
        }

        ctx.messages.update_message(&message).await?;
    }
}
