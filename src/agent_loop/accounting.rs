//! Usage/cost accounting applied once per completed stream.

use crate::error::Result;
use crate::models::Model;
use crate::store::SessionStore;
use crate::types::{Session, TokenUsage};

/// Charge `usage` at `model`'s prices to the session and persist it.
///
/// Cost accumulates. Token counters are overwritten with the latest call's
/// prompt (input + cache write) and completion (output + cache read) totals.
pub async fn track_usage(
    sessions: &dyn SessionStore,
    session_id: &str,
    model: &Model,
    usage: &TokenUsage,
) -> Result<Session> {
    let mut session = sessions.get_session(session_id).await?;
    let delta = model.pricing.cost(usage);
    session.cost += delta;
    session.prompt_tokens = usage.prompt_tokens();
    session.completion_tokens = usage.completion_tokens();
    tracing::debug!(
        session_id,
        model = %model.id,
        cost_delta = delta,
        prompt_tokens = session.prompt_tokens,
        completion_tokens = session.completion_tokens,
        "usage tracked"
    );
    Ok(sessions.save_session(&session).await?)
}
