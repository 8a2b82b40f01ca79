//! SQLite implementation of `ProposalDraftStore`.
//!
//! Persists session snapshots in the `proposal_drafts` table using INSERT OR
//! REPLACE for upsert semantics. Listing pulls the proposal title and state
//! out of `state_json` without deserializing the whole session.

use proposer_core::repository::draft::{ProposalDraft, ProposalDraftStore, ProposalDraftSummary};
use proposer_types::error::RepositoryError;
use proposer_types::session::{ConversationId, ConversationState};
use sqlx::Row;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime};

/// SQLite-backed proposal draft persistence.
pub struct SqliteProposalDraftStore {
    pool: DatabasePool,
}

impl SqliteProposalDraftStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn query_error(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Query(e.to_string())
}

/// Proposal title and conversation state from a serialized session.
fn summarize(state_json: &str) -> (Option<String>, ConversationState) {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(state_json) else {
        return (None, ConversationState::default());
    };

    let title = value
        .pointer("/catalogs/create_proposal/entries")
        .and_then(|entries| entries.as_array())
        .and_then(|entries| {
            entries
                .iter()
                .find(|e| e.get("id").and_then(|id| id.as_str()) == Some("title"))
        })
        .and_then(|e| e.get("content"))
        .and_then(|c| c.as_str())
        .map(str::to_string);

    let state = value
        .get("state")
        .cloned()
        .and_then(|s| serde_json::from_value(s).ok())
        .unwrap_or_default();

    (title, state)
}

impl ProposalDraftStore for SqliteProposalDraftStore {
    async fn save_draft(&self, draft: ProposalDraft) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT OR REPLACE INTO proposal_drafts (conversation_id, state_json, schema_version, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(draft.conversation_id.as_str())
        .bind(&draft.state_json)
        .bind(draft.schema_version as i64)
        .bind(format_datetime(&draft.created_at))
        .bind(format_datetime(&draft.updated_at))
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        Ok(())
    }

    async fn load_draft(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Option<ProposalDraft>, RepositoryError> {
        let row = sqlx::query(
            "SELECT conversation_id, state_json, schema_version, created_at, updated_at FROM proposal_drafts WHERE conversation_id = ?",
        )
        .bind(conversation_id.as_str())
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(query_error)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let id: String = row.try_get("conversation_id").map_err(query_error)?;
        let state_json: String = row.try_get("state_json").map_err(query_error)?;
        let schema_version: i64 = row.try_get("schema_version").map_err(query_error)?;
        let created_at: String = row.try_get("created_at").map_err(query_error)?;
        let updated_at: String = row.try_get("updated_at").map_err(query_error)?;

        Ok(Some(ProposalDraft {
            conversation_id: ConversationId::new(id),
            state_json,
            schema_version: schema_version as u32,
            created_at: parse_datetime(&created_at)?,
            updated_at: parse_datetime(&updated_at)?,
        }))
    }

    async fn list_drafts(&self) -> Result<Vec<ProposalDraftSummary>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT conversation_id, state_json, updated_at FROM proposal_drafts ORDER BY updated_at DESC",
        )
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_error)?;

        let mut summaries = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: String = row.try_get("conversation_id").map_err(query_error)?;
            let state_json: String = row.try_get("state_json").map_err(query_error)?;
            let updated_at: String = row.try_get("updated_at").map_err(query_error)?;
            let (title, state) = summarize(&state_json);

            summaries.push(ProposalDraftSummary {
                conversation_id: ConversationId::new(id),
                title,
                state,
                updated_at: parse_datetime(&updated_at)?,
            });
        }

        Ok(summaries)
    }

    async fn delete_draft(&self, conversation_id: &ConversationId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM proposal_drafts WHERE conversation_id = ?")
            .bind(conversation_id.as_str())
            .execute(&self.pool.writer)
            .await
            .map_err(query_error)?;

        Ok(())
    }
}
