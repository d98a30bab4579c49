//! The conversation loop that drives one run: stream a model turn, dispatch
//! the tools it asked for, repeat until the model stops asking.

pub mod accounting;
pub(crate) mod conversation;
mod stream_phase;
mod tool_phase;

pub use accounting::track_usage;

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::augment::PromptAugmenter;
use crate::error::Result;
use crate::provider::ModelProvider;
use crate::store::{MessageStore, SessionStore};
use crate::tools::Tool;
use crate::types::{FinishReason, Message};

/// Everything one run needs, captured when the run is admitted.
pub(crate) struct RunContext {
    pub(crate) session_id: String,
    pub(crate) provider: Arc<dyn ModelProvider>,
    pub(crate) title_provider: Option<Arc<dyn ModelProvider>>,
    pub(crate) tools: Arc<[Arc<dyn Tool>]>,
    pub(crate) messages: Arc<dyn MessageStore>,
    pub(crate) sessions: Arc<dyn SessionStore>,
    /// Augmenter and its time budget, when augmentation is enabled.
    pub(crate) augmentation: Option<(Arc<dyn PromptAugmenter>, Duration)>,
    pub(crate) max_iterations: usize,
    pub(crate) cancel: CancellationToken,
}

impl RunContext {
    pub(crate) fn tool(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.info().name == name)
    }

    /// Set the finish marker and persist the message.
    pub(crate) async fn finish_message(
        &self,
        message: &mut Message,
        reason: FinishReason,
    ) -> Result<()> {
        message.add_finish(reason);
        self.messages.update_message(message).await?;
        Ok(())
    }

    /// Like [`finish_message`](Self::finish_message), for paths already
    /// returning another error: a failed write is only logged.
    pub(crate) async fn finish_message_quietly(&self, message: &mut Message, reason: FinishReason) {
        if let Err(err) = self.finish_message(message, reason).await {
            tracing::warn!(
                session_id = %self.session_id,
                message_id = %message.id,
                error = %err,
                "failed to persist finish marker"
            );
        }
    }
}
