use super::stream_phase::run_stream_phase;
use super::tool_phase::run_tool_phase;
use super::RunContext;
use crate::agent::title::spawn_title_generation;
use crate::augment::{augment_within, AugmentRequest};
use crate::error::{EngineError, Result};
use crate::store::CreateMessageParams;
use crate::types::{Attachment, ContentPart, FinishReason, Message, Role};

/// Drive one run to completion and return the final assistant message.
pub(crate) async fn process_generation(
    ctx: &RunContext,
    content: String,
    attachments: Vec<Attachment>,
) -> Result<Message> {
    let mut history = ctx
        .messages
        .list_messages(&ctx.session_id)
        .await
        .map_err(|e| EngineError::from(e).context("failed to list messages"))?;

    if history.is_empty() {
        if let Some(ref provider) = ctx.title_provider {
            spawn_title_generation(
                provider.clone(),
                ctx.sessions.clone(),
                ctx.session_id.clone(),
                content.clone(),
            );
        }
    }

    let session = ctx
        .sessions
        .get_session(&ctx.session_id)
        .await
        .map_err(|e| EngineError::from(e).context("failed to get session"))?;
    if let Some(ref summary_id) = session.summary_message_id {
        truncate_to_summary(&mut history, summary_id);
    }

    let mut parts = vec![ContentPart::Text {
        text: content.clone(),
    }];
    parts.extend(attachments.into_iter().map(ContentPart::Binary));
    let user_message = ctx
        .messages
        .create_message(
            &ctx.session_id,
            CreateMessageParams {
                role: Role::User,
                parts,
                model: None,
            },
        )
        .await
        .map_err(|e| EngineError::from(e).context("failed to create user message"))?;
    history.push(user_message);

    if let Some((ref augmenter, budget)) = ctx.augmentation {
        let request = AugmentRequest {
            session_id: ctx.session_id.clone(),
            content: content.clone(),
            history: history.clone(),
        };
        let augmentation = augment_within(augmenter.as_ref(), request, budget).await;
        if let Some(turn) = history.last_mut() {
            graft_directive(turn, &augmentation.directive);
        }
    }

    let mut iteration = 0usize;
    loop {
        // Messages from earlier rounds are already finished; leave them be.
        if ctx.cancel.is_cancelled() {
            return Err(EngineError::RequestCancelled);
        }
        if iteration >= ctx.max_iterations {
            return Err(EngineError::InvalidState(format!(
                "run exceeded {} model turns",
                ctx.max_iterations
            )));
        }

        let mut assistant = run_stream_phase(ctx, history.clone())
            .await
            .map_err(process_error)?;

        if assistant.finish_reason() == Some(FinishReason::Unknown) {
            return Ok(assistant);
        }

        let outcome = run_tool_phase(ctx, &mut assistant)
            .await
            .map_err(process_error)?;
        if outcome.canceled {
            return Err(EngineError::RequestCancelled);
        }

        match outcome.results {
            Some(results) if assistant.finish_reason() == Some(FinishReason::ToolUse) => {
                tracing::debug!(
                    session_id = %ctx.session_id,
                    iteration,
                    tool_results = results.tool_results().len(),
                    "continuing after tool results"
                );
                history.push(assistant);
                history.push(results);
            }
            _ => return Ok(assistant),
        }
        iteration += 1;
    }
}

fn process_error(err: EngineError) -> EngineError {
    if err.is_cancellation() {
        err
    } else {
        err.context("failed to process events")
    }
}

/// Drop everything before the summary message and present the summary as
/// the user's opening turn. An unknown marker leaves history untouched.
fn truncate_to_summary(history: &mut Vec<Message>, summary_id: &str) {
    if let Some(idx) = history.iter().position(|m| m.id == summary_id) {
        history.drain(..idx);
        history[0].role = Role::User;
    }
}

/// Append the directive to the in-memory copy of the user's turn. The stored
/// message keeps the original text.
fn graft_directive(turn: &mut Message, directive: &str) {
    if directive.trim().is_empty() {
        return;
    }
    let original = turn.content();
    let grafted = format!("{original}\n\n{directive}");
    let mut replaced = false;
    turn.parts.retain_mut(|part| match part {
        ContentPart::Text { text } if !replaced => {
            *text = grafted.clone();
            replaced = true;
            true
        }
        ContentPart::Text { .. } => false,
        _ => true,
    });
    if !replaced {
        turn.parts.insert(0, ContentPart::Text { text: grafted });
    }
}
