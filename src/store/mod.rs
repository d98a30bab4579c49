//! Persistence contracts for transcripts and sessions.

pub mod memory;

pub use memory::InMemoryStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{ContentPart, Message, Role, Session};

/// Storage failures.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("backend error: {0}")]
    Backend(String),
}

/// Fields of a message about to be created.
#[derive(Debug, Clone)]
pub struct CreateMessageParams {
    pub role: Role,
    pub parts: Vec<ContentPart>,
    pub model: Option<String>,
}

/// Transcript storage. Messages of one session are listed in creation order.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn create_message(
        &self,
        session_id: &str,
        params: CreateMessageParams,
    ) -> Result<Message, StoreError>;

    /// Overwrite a message by id. Called repeatedly while a message streams.
    async fn update_message(&self, message: &Message) -> Result<(), StoreError>;

    async fn get_message(&self, id: &str) -> Result<Message, StoreError>;

    async fn list_messages(&self, session_id: &str) -> Result<Vec<Message>, StoreError>;
}

/// Session storage.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(&self, title: &str) -> Result<Session, StoreError>;

    async fn get_session(&self, id: &str) -> Result<Session, StoreError>;

    /// Persist a session and return the stored copy.
    async fn save_session(&self, session: &Session) -> Result<Session, StoreError>;

    async fn list_sessions(&self) -> Result<Vec<Session>, StoreError>;
}
