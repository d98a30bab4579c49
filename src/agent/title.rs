//! Fire-and-forget session titling from the first user message.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::provider::ModelProvider;
use crate::store::SessionStore;
use crate::types::{ContentPart, Message, Role};

/// Spawn title generation. Runs on its own token; its outcome is only logged.
pub(crate) fn spawn_title_generation(
    provider: Arc<dyn ModelProvider>,
    sessions: Arc<dyn SessionStore>,
    session_id: String,
    content: String,
) {
    if content.trim().is_empty() {
        return;
    }
    tokio::spawn(async move {
        let outcome = AssertUnwindSafe(generate_title(
            provider.as_ref(),
            sessions.as_ref(),
            &session_id,
            &content,
        ))
        .catch_unwind()
        .await;
        match outcome {
            Ok(Ok(Some(title))) => tracing::debug!(session_id = %session_id, title = %title, "session titled"),
            Ok(Ok(None)) => tracing::debug!(session_id = %session_id, "title backend returned nothing"),
            Ok(Err(err)) => tracing::warn!(session_id = %session_id, error = %err, "failed to generate title"),
            Err(_) => tracing::error!(session_id = %session_id, "panic while generating title"),
        }
    });
}

async fn generate_title(
    provider: &dyn ModelProvider,
    sessions: &dyn SessionStore,
    session_id: &str,
    content: &str,
) -> Result<Option<String>> {
    let prompt = Message::new(
        session_id,
        Role::User,
        vec![ContentPart::Text {
            text: content.to_string(),
        }],
    );
    let response = provider
        .send_messages(vec![prompt], Vec::new(), CancellationToken::new())
        .await?;

    let title = response.content.replace('\n', " ").trim().to_string();
    if title.is_empty() {
        return Ok(None);
    }

    let mut session = sessions.get_session(session_id).await?;
    session.title = title.clone();
    sessions.save_session(&session).await?;
    Ok(Some(title))
}
