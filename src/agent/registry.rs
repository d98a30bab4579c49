//! Active-request registry: the sole admission signal for "is this session busy".

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Key under which a session's summarization is registered.
pub(crate) fn summarize_key(session_id: &str) -> String {
    format!("{session_id}-summarize")
}

#[derive(Debug, Clone)]
struct ActiveRequest {
    id: Uuid,
    token: CancellationToken,
}

#[derive(Debug, Default)]
pub(crate) struct ActiveRequests {
    entries: DashMap<String, ActiveRequest>,
}

impl ActiveRequests {
    /// Insert-if-absent. Returns the id that owns the entry, or `None` when
    /// the key is already taken.
    pub(crate) fn try_register(&self, key: &str, token: CancellationToken) -> Option<Uuid> {
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                let id = Uuid::new_v4();
                slot.insert(ActiveRequest { id, token });
                Some(id)
            }
        }
    }

    /// Remove the entry only if `id` still owns it.
    pub(crate) fn release(&self, key: &str, id: Uuid) -> bool {
        self.entries.remove_if(key, |_, entry| entry.id == id).is_some()
    }

    /// Remove unconditionally, handing back the cancellation handle.
    pub(crate) fn take(&self, key: &str) -> Option<CancellationToken> {
        self.entries.remove(key).map(|(_, entry)| entry.token)
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
