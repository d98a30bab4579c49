//! Model provider contract consumed by the engine.
//!
//! Network clients live outside this crate. The engine only sees a provider
//! as a source of [`ProviderEvent`]s (streaming) or a single
//! [`ProviderResponse`] (one-shot).

pub mod factory;

pub use factory::ProviderFactory;

use async_trait::async_trait;
use futures::stream::BoxStream;
use tokio_util::sync::CancellationToken;

use crate::error::{EngineError, Result};
use crate::models::Model;
use crate::tools::ToolInfo;
use crate::types::{FinishReason, Message, TokenUsage, ToolCall};

/// Final result of one backend call.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub usage: TokenUsage,
    pub finish_reason: FinishReason,
}

impl ProviderResponse {
    /// A plain text completion that ended the turn.
    pub fn text(content: impl Into<String>, usage: TokenUsage) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
            usage,
            finish_reason: FinishReason::EndTurn,
        }
    }
}

/// One event of a streaming backend response.
#[derive(Debug)]
pub enum ProviderEvent {
    ContentDelta(String),
    ThinkingDelta(String),
    ToolUseStart(ToolCall),
    ToolUseStop(String),
    /// A failure reported by the backend. `EngineError::RequestCancelled`
    /// signals that the stream stopped because its token fired.
    Error(EngineError),
    Complete(ProviderResponse),
}

/// Core trait implemented by model backends.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// The model this provider instance serves.
    fn model(&self) -> &Model;

    /// Stream a response. Implementations must stop promptly once `cancel` fires.
    fn stream_response(
        &self,
        messages: Vec<Message>,
        tools: Vec<ToolInfo>,
        cancel: CancellationToken,
    ) -> BoxStream<'static, ProviderEvent>;

    /// Send a request and wait for the whole response.
    async fn send_messages(
        &self,
        messages: Vec<Message>,
        tools: Vec<ToolInfo>,
        cancel: CancellationToken,
    ) -> Result<ProviderResponse>;
}
