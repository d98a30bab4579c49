//! Convenience re-exports for common use.

pub use crate::agent::{Agent, AgentEvent, AgentEventKind};
pub use crate::augment::{HeuristicAugmenter, PromptAugmenter};
pub use crate::config::{AgentSettings, EngineConfig};
pub use crate::error::{EngineError, Result};
pub use crate::models::{AgentRole, Model, ModelCatalog};
pub use crate::provider::{ModelProvider, ProviderEvent, ProviderFactory, ProviderResponse};
pub use crate::store::{InMemoryStore, MessageStore, SessionStore};
pub use crate::tools::{AgentTool, AgentToolParameters, Tool, ToolContext, ToolError, ToolResponse};
pub use crate::types::{
    Attachment, ContentPart, FinishReason, Message, Role, Session, TokenUsage, ToolCall, ToolResult,
};
pub use futures::StreamExt;
