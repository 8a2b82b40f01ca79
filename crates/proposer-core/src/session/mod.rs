//! ProposalSession primitives.
//!
//! The `ProposalSession` struct lives in `proposer-types`; this module
//! provides an extension trait (`ProposalSessionExt`) with the interview
//! primitives: binding catalogs, walking a full pass, storing content, and
//! targeting single-field edits. The extension trait pattern is used because
//! Rust does not allow inherent impls for types defined in another crate.

pub mod registry;

use std::collections::BTreeMap;

use chrono::Utc;
use proposer_types::catalog::{CatalogKind, FieldId};
use proposer_types::error::SessionError;
use proposer_types::session::{
    ConversationId, ConversationState, Cursor, ProposalSession, StoreOutcome,
};

use crate::catalog::template_for;

/// Create a fresh session for a conversation, with every catalog unfilled.
pub fn new_proposal_session(conversation_id: ConversationId) -> ProposalSession {
    let catalogs = CatalogKind::ALL
        .into_iter()
        .map(|kind| (kind, template_for(kind)))
        .collect::<BTreeMap<_, _>>();
    let now = Utc::now();

    ProposalSession {
        conversation_id,
        state: ConversationState::SelectingAction,
        active_kind: None,
        catalogs,
        cursor: Cursor::Exhausted,
        pass_position: None,
        edit_all: true,
        add_rate: false,
        linked_engineers: Vec::new(),
        started_at: now,
        updated_at: now,
    }
}

/// Extension trait for `ProposalSession` interview primitives.
pub trait ProposalSessionExt {
    /// Bind `kind` as the active catalog and start a full pass at its first
    /// field (`Exhausted` immediately when the catalog is empty).
    fn initialize(&mut self, kind: CatalogKind) -> &Cursor;

    /// Bind `kind` as the active catalog without touching the cursor or pass.
    fn bind(&mut self, kind: CatalogKind);

    /// Advance the full pass to the next field in catalog order. Keeps
    /// returning `Exhausted` once the pass is over.
    fn next_field(&mut self) -> &Cursor;

    /// Store `value` in the field at the cursor.
    ///
    /// During a full pass this advances the cursor. During a single-field
    /// edit it clears the cursor, re-arms `edit_all`, and reports `Edited`
    /// so the caller routes back instead of advancing.
    fn store_content(&mut self, value: String) -> Result<StoreOutcome, SessionError>;

    /// Point the cursor at `id` for a single-field edit.
    ///
    /// Rejects ids absent from the active catalog without changing anything.
    fn set_edit_target(&mut self, id: &FieldId) -> Result<(), SessionError>;

    /// Re-open the interrupted full pass at the field it was waiting on.
    fn resume_pass(&mut self) -> &Cursor;

    /// Whether the active catalog has a full pass still in progress.
    fn pass_in_progress(&self) -> bool;

    /// Clear all content of the active catalog and rewind its pass.
    fn reset(&mut self);
}

impl ProposalSessionExt for ProposalSession {
    fn initialize(&mut self, kind: CatalogKind) -> &Cursor {
        self.bind(kind);
        self.edit_all = true;

        let has_fields = self.active_catalog().is_some_and(|c| !c.is_empty());
        self.pass_position = has_fields.then_some(0);
        self.cursor = cursor_at(self, self.pass_position);
        &self.cursor
    }

    fn bind(&mut self, kind: CatalogKind) {
        self.catalogs.entry(kind).or_insert_with(|| template_for(kind));
        self.active_kind = Some(kind);
        self.updated_at = Utc::now();
    }

    fn next_field(&mut self) -> &Cursor {
        let len = self.active_catalog().map_or(0, |c| c.len());
        self.pass_position = match self.pass_position {
            Some(i) if i + 1 < len => Some(i + 1),
            _ => None,
        };
        self.cursor = cursor_at(self, self.pass_position);
        &self.cursor
    }

    fn store_content(&mut self, value: String) -> Result<StoreOutcome, SessionError> {
        let field = self.cursor.field().cloned().ok_or(SessionError::NoPendingField)?;
        let catalog = self
            .active_catalog_mut()
            .ok_or(SessionError::NoActiveCatalog)?;
        let entry = catalog
            .get_mut(&field)
            .ok_or_else(|| SessionError::UnknownField(field.clone()))?;
        entry.content = Some(value);
        self.updated_at = Utc::now();

        if self.edit_all {
            return Ok(match self.next_field() {
                Cursor::Field(next) => StoreOutcome::Next(next.clone()),
                Cursor::Exhausted => StoreOutcome::Exhausted,
            });
        }

        self.cursor = Cursor::Exhausted;
        self.edit_all = true;
        Ok(StoreOutcome::Edited)
    }

    fn set_edit_target(&mut self, id: &FieldId) -> Result<(), SessionError> {
        let catalog = self.active_catalog().ok_or(SessionError::NoActiveCatalog)?;
        if !catalog.contains(id) {
            return Err(SessionError::UnknownField(id.clone()));
        }
        self.cursor = Cursor::Field(id.clone());
        self.edit_all = false;
        Ok(())
    }

    fn resume_pass(&mut self) -> &Cursor {
        self.edit_all = true;
        self.cursor = cursor_at(self, self.pass_position);
        &self.cursor
    }

    fn pass_in_progress(&self) -> bool {
        self.pass_position.is_some()
    }

    fn reset(&mut self) {
        if let Some(kind) = self.active_kind {
            let catalog = if kind.is_dynamic() {
                let mut catalog = self.catalogs.remove(&kind).unwrap_or_default();
                catalog.clear_content();
                catalog
            } else {
                template_for(kind)
            };
            self.catalogs.insert(kind, catalog);
        }
        self.pass_position = None;
        self.cursor = Cursor::Exhausted;
        self.edit_all = true;
        self.updated_at = Utc::now();
    }
}

fn cursor_at(session: &ProposalSession, position: Option<usize>) -> Cursor {
    position
        .and_then(|i| session.active_catalog()?.at(i))
        .map(|entry| Cursor::Field(entry.id.clone()))
        .unwrap_or(Cursor::Exhausted)
}
