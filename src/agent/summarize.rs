//! History compaction: ask the summarizer for a summary, store it as an
//! assistant message and point the session's summary marker at it.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::AgentEvent;
use crate::error::{EngineError, Result};
use crate::provider::ModelProvider;
use crate::pubsub::Broker;
use crate::store::{CreateMessageParams, MessageStore, SessionStore};
use crate::types::{ContentPart, Finish, FinishReason, Message, Role};

pub(crate) const SUMMARY_PROMPT: &str = "Provide a detailed but concise summary of our conversation above. Focus on information that would be helpful for continuing the conversation, including what we did, what we're doing, which files we're working on, and what we're going to do next.";

pub(crate) struct SummarizeContext {
    pub(crate) session_id: String,
    pub(crate) provider: Arc<dyn ModelProvider>,
    pub(crate) messages: Arc<dyn MessageStore>,
    pub(crate) sessions: Arc<dyn SessionStore>,
    pub(crate) broker: Arc<Broker<AgentEvent>>,
    pub(crate) cancel: CancellationToken,
}

impl SummarizeContext {
    fn progress(&self, text: &str) {
        self.broker
            .publish(AgentEvent::summarize_progress(&self.session_id, text));
    }
}

/// Run every step, publishing progress. Returns the summary message id.
/// The caller publishes the single terminal event for failures.
pub(crate) async fn summarize_session(ctx: &SummarizeContext) -> Result<String> {
    ctx.progress("Starting summarization...");

    let mut history = ctx
        .messages
        .list_messages(&ctx.session_id)
        .await
        .map_err(|e| EngineError::from(e).context("failed to list messages"))?;
    if history.is_empty() {
        return Err(EngineError::NoMessagesToSummarize);
    }

    ctx.progress("Analyzing conversation...");
    history.push(Message::new(
        &ctx.session_id,
        Role::User,
        vec![ContentPart::Text {
            text: SUMMARY_PROMPT.to_string(),
        }],
    ));

    ctx.progress("Generating summary...");
    let response = tokio::select! {
        biased;
        _ = ctx.cancel.cancelled() => return Err(EngineError::RequestCancelled),
        response = ctx.provider.send_messages(history, Vec::new(), ctx.cancel.child_token()) => response,
    };
    let response = response.map_err(|e| {
        if e.is_cancellation() {
            e
        } else {
            e.context("failed to summarize")
        }
    })?;

    let summary = response.content.trim();
    if summary.is_empty() {
        return Err(EngineError::EmptySummary);
    }

    ctx.progress("Creating new session...");
    let mut session = ctx
        .sessions
        .get_session(&ctx.session_id)
        .await
        .map_err(|e| EngineError::from(e).context("failed to get session"))?;

    let model = ctx.provider.model();
    let summary_message = ctx
        .messages
        .create_message(
            &ctx.session_id,
            CreateMessageParams {
                role: Role::Assistant,
                parts: vec![
                    ContentPart::Text {
                        text: summary.to_string(),
                    },
                    ContentPart::Finish(Finish {
                        reason: FinishReason::EndTurn,
                        time: chrono::Utc::now(),
                    }),
                ],
                model: Some(model.id.clone()),
            },
        )
        .await
        .map_err(|e| EngineError::from(e).context("failed to create summary message"))?;

    session.summary_message_id = Some(summary_message.id.clone());
    session.prompt_tokens = 0;
    session.completion_tokens = response.usage.output_tokens;
    session.cost += model.pricing.cost(&response.usage);
    ctx.sessions
        .save_session(&session)
        .await
        .map_err(|e| EngineError::from(e).context("failed to save session"))?;

    Ok(summary_message.id)
}
