//! Per-conversation session registry.
//!
//! Sessions are keyed by `ConversationId`. Each lives behind its own async
//! mutex so events of one conversation are handled strictly in arrival order
//! while distinct conversations proceed in parallel.

use std::sync::Arc;

use dashmap::DashMap;
use proposer_types::session::{ConversationId, ProposalSession};
use tokio::sync::Mutex;
use tracing::debug;

use super::new_proposal_session;

/// Shared handle to one conversation's session.
pub type SessionHandle = Arc<Mutex<ProposalSession>>;

#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<ConversationId, SessionHandle>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session for `id`, creating a fresh one on first contact.
    pub fn get_or_create(&self, id: &ConversationId) -> SessionHandle {
        self.sessions
            .entry(id.clone())
            .or_insert_with(|| {
                debug!(conversation_id = %id, "creating proposal session");
                Arc::new(Mutex::new(new_proposal_session(id.clone())))
            })
            .clone()
    }

    /// Session for `id` if the conversation is live. Never creates one.
    pub fn get(&self, id: &ConversationId) -> Option<SessionHandle> {
        self.sessions.get(id).map(|entry| entry.value().clone())
    }

    /// Install `session` under its conversation id, replacing any existing one.
    pub fn insert(&self, session: ProposalSession) -> SessionHandle {
        let id = session.conversation_id.clone();
        let handle = Arc::new(Mutex::new(session));
        self.sessions.insert(id, handle.clone());
        handle
    }

    /// Drop the session for `id`. Returns `true` if one existed.
    pub fn remove(&self, id: &ConversationId) -> bool {
        let removed = self.sessions.remove(id).is_some();
        if removed {
            debug!(conversation_id = %id, "discarded proposal session");
        }
        removed
    }

    pub fn contains(&self, id: &ConversationId) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proposer_types::catalog::CatalogKind;

    use crate::session::ProposalSessionExt;

    #[tokio::test]
    async fn test_get_or_create_returns_same_session() {
        let registry = SessionRegistry::new();
        let id = ConversationId::new("42");

        let first = registry.get_or_create(&id);
        first.lock().await.initialize(CatalogKind::AddInfo);

        let second = registry.get_or_create(&id);
        assert_eq!(
            second.lock().await.active_kind,
            Some(CatalogKind::AddInfo)
        );
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated_per_conversation() {
        let registry = SessionRegistry::new();
        let a = registry.get_or_create(&ConversationId::new("a"));
        let b = registry.get_or_create(&ConversationId::new("b"));

        a.lock().await.initialize(CatalogKind::CreateProposal);

        assert!(b.lock().await.active_kind.is_none());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_remove() {
        let registry = SessionRegistry::new();
        let id = ConversationId::new("gone");
        registry.get_or_create(&id);

        assert!(registry.remove(&id));
        assert!(!registry.remove(&id));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_get_does_not_create() {
        let registry = SessionRegistry::new();
        let id = ConversationId::new("lookup");

        assert!(registry.get(&id).is_none());
        assert!(registry.is_empty());

        registry.get_or_create(&id).lock().await.initialize(CatalogKind::AddInfo);
        let handle = registry.get(&id).unwrap();
        assert_eq!(handle.lock().await.active_kind, Some(CatalogKind::AddInfo));

        registry.remove(&id);
        assert!(registry.get(&id).is_none());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_insert_replaces() {
        let registry = SessionRegistry::new();
        let id = ConversationId::new("r");
        registry.get_or_create(&id);

        let mut restored = new_proposal_session(id.clone());
        restored.initialize(CatalogKind::AddNewEngineer);
        registry.insert(restored);

        let handle = registry.get_or_create(&id);
        assert_eq!(
            handle.lock().await.active_kind,
            Some(CatalogKind::AddNewEngineer)
        );
        assert!(registry.contains(&id));
    }
}
