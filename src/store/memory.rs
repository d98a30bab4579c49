use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use super::{CreateMessageParams, MessageStore, SessionStore, StoreError};
use crate::types::{Message, Session};

/// In-process store backed by sharded maps.
///
/// Writes to one key are serialized by the map's shard lock; different
/// sessions proceed independently.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    messages: DashMap<String, Message>,
    /// Message ids per session, in creation order.
    order: DashMap<String, Vec<String>>,
    sessions: DashMap<String, Session>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageStore for InMemoryStore {
    async fn create_message(
        &self,
        session_id: &str,
        params: CreateMessageParams,
    ) -> Result<Message, StoreError> {
        let mut message = Message::new(session_id, params.role, params.parts);
        message.model = params.model;
        // Visible by id before it is listed.
        self.messages.insert(message.id.clone(), message.clone());
        self.order
            .entry(session_id.to_string())
            .or_default()
            .push(message.id.clone());
        Ok(message)
    }

    async fn update_message(&self, message: &Message) -> Result<(), StoreError> {
        let mut stored = self
            .messages
            .get_mut(&message.id)
            .ok_or_else(|| StoreError::NotFound(format!("message {}", message.id)))?;
        let mut updated = message.clone();
        updated.updated_at = Utc::now();
        *stored = updated;
        Ok(())
    }

    async fn get_message(&self, id: &str) -> Result<Message, StoreError> {
        self.messages
            .get(id)
            .map(|m| m.clone())
            .ok_or_else(|| StoreError::NotFound(format!("message {id}")))
    }

    async fn list_messages(&self, session_id: &str) -> Result<Vec<Message>, StoreError> {
        let ids = self
            .order
            .get(session_id)
            .map(|ids| ids.clone())
            .unwrap_or_default();
        Ok(ids
            .iter()
            .filter_map(|id| self.messages.get(id).map(|m| m.clone()))
            .collect())
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn create_session(&self, title: &str) -> Result<Session, StoreError> {
        let session = Session::new(uuid::Uuid::new_v4().to_string(), title);
        self.sessions.insert(session.id.clone(), session.clone());
        Ok(session)
    }

    async fn get_session(&self, id: &str) -> Result<Session, StoreError> {
        self.sessions
            .get(id)
            .map(|s| s.clone())
            .ok_or_else(|| StoreError::NotFound(format!("session {id}")))
    }

    async fn save_session(&self, session: &Session) -> Result<Session, StoreError> {
        let mut stored = self
            .sessions
            .get_mut(&session.id)
            .ok_or_else(|| StoreError::NotFound(format!("session {}", session.id)))?;
        let mut updated = session.clone();
        updated.updated_at = Utc::now();
        *stored = updated.clone();
        Ok(updated)
    }

    async fn list_sessions(&self) -> Result<Vec<Session>, StoreError> {
        let mut sessions: Vec<Session> = self.sessions.iter().map(|s| s.clone()).collect();
        sessions.sort_by_key(|s| s.created_at);
        Ok(sessions)
    }
}
