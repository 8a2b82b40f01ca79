//! Per-conversation proposal session state.
//!
//! `ProposalSession` is plain data; the primitives that mutate it (field
//! iteration, content storage, edit targeting) live in
//! `proposer_core::session::ProposalSessionExt`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;

use crate::catalog::{Catalog, CatalogKind, FieldId};
use crate::engineer::EngineerId;

/// Transport-provided identity of one conversation (a chat id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where the conversation state machine currently is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    #[default]
    SelectingAction,
    AwaitingFieldInput,
    Overview,
    ChoosingFieldToEdit,
    ChoosingRecord,
    Completed,
}

impl fmt::Display for ConversationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversationState::SelectingAction => write!(f, "selecting_action"),
            ConversationState::AwaitingFieldInput => write!(f, "awaiting_field_input"),
            ConversationState::Overview => write!(f, "overview"),
            ConversationState::ChoosingFieldToEdit => write!(f, "choosing_field_to_edit"),
            ConversationState::ChoosingRecord => write!(f, "choosing_record"),
            ConversationState::Completed => write!(f, "completed"),
        }
    }
}

/// The field currently awaiting input, or `Exhausted` when none is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cursor", content = "field", rename_all = "snake_case")]
pub enum Cursor {
    Field(FieldId),
    #[default]
    Exhausted,
}

impl Cursor {
    pub fn field(&self) -> Option<&FieldId> {
        match self {
            Cursor::Field(id) => Some(id),
            Cursor::Exhausted => None,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, Cursor::Exhausted)
    }
}

/// Result of storing a value at the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOutcome {
    /// Full pass continues with this field.
    Next(FieldId),
    /// Full pass finished; the catalog's completion action is due.
    Exhausted,
    /// A single-field edit was stored; no further field is pending.
    Edited,
}

/// All mutable interview state for one conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalSession {
    pub conversation_id: ConversationId,
    pub state: ConversationState,
    /// Kind of the catalog currently bound as active.
    pub active_kind: Option<CatalogKind>,
    /// One catalog per kind; content survives switching between kinds.
    pub catalogs: BTreeMap<CatalogKind, Catalog>,
    pub cursor: Cursor,
    /// Index of the field an open full pass is waiting on; `None` when no
    /// pass is open.
    pub pass_position: Option<usize>,
    /// True during a full forward pass, false while editing a single field.
    pub edit_all: bool,
    /// When set, the pending edit returns to engineer selection instead of the overview.
    pub add_rate: bool,
    /// Engineers linked into this proposal, in link order. Never repeats.
    pub linked_engineers: Vec<EngineerId>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProposalSession {
    /// The catalog bound as active, if any.
    pub fn active_catalog(&self) -> Option<&Catalog> {
        self.active_kind.and_then(|kind| self.catalogs.get(&kind))
    }

    pub fn active_catalog_mut(&mut self) -> Option<&mut Catalog> {
        let kind = self.active_kind?;
        self.catalogs.get_mut(&kind)
    }

    pub fn catalog(&self, kind: CatalogKind) -> Option<&Catalog> {
        self.catalogs.get(&kind)
    }

    pub fn is_linked(&self, engineer: &EngineerId) -> bool {
        self.linked_engineers.contains(engineer)
    }
}
