//! Proposal draft persistence trait.
//!
//! A draft is a JSON snapshot of a whole `ProposalSession`, written when a
//! catalog configured with the `save_draft` completion finishes. Drafts let
//! an interrupted interview be resumed from the terminal.

use std::future::Future;

use chrono::{DateTime, Utc};

use proposer_types::error::RepositoryError;
use proposer_types::session::{ConversationId, ConversationState, ProposalSession};

/// Current shape of `ProposalSession` snapshots.
pub const DRAFT_SCHEMA_VERSION: u32 = 1;

/// A saved session snapshot.
#[derive(Debug, Clone)]
pub struct ProposalDraft {
    pub conversation_id: ConversationId,
    /// Serialized `ProposalSession` as JSON.
    pub state_json: String,
    /// Schema version for forward-compatible deserialization.
    pub schema_version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProposalDraft {
    /// Snapshot `session` at the current schema version.
    pub fn from_session(session: &ProposalSession) -> Result<Self, serde_json::Error> {
        Ok(Self {
            conversation_id: session.conversation_id.clone(),
            state_json: serde_json::to_string(session)?,
            schema_version: DRAFT_SCHEMA_VERSION,
            created_at: session.started_at,
            updated_at: Utc::now(),
        })
    }

    /// Restore the session held by this draft.
    pub fn to_session(&self) -> Result<ProposalSession, serde_json::Error> {
        serde_json::from_str(&self.state_json)
    }
}

/// Lightweight summary of a draft for listing.
#[derive(Debug, Clone)]
pub struct ProposalDraftSummary {
    pub conversation_id: ConversationId,
    /// Proposal title, when one was entered.
    pub title: Option<String>,
    pub state: ConversationState,
    pub updated_at: DateTime<Utc>,
}

/// Persistence interface for proposal drafts.
pub trait ProposalDraftStore: Send + Sync {
    /// Save or update a draft (upsert on conversation id).
    fn save_draft(
        &self,
        draft: ProposalDraft,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Load the draft of a conversation. `None` if none was saved.
    fn load_draft(
        &self,
        conversation_id: &ConversationId,
    ) -> impl Future<Output = Result<Option<ProposalDraft>, RepositoryError>> + Send;

    /// All drafts, most recently updated first.
    fn list_drafts(
        &self,
    ) -> impl Future<Output = Result<Vec<ProposalDraftSummary>, RepositoryError>> + Send;

    /// Delete the draft of a conversation. No-op if none exists.
    fn delete_draft(
        &self,
        conversation_id: &ConversationId,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}
