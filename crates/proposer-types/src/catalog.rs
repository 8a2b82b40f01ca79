use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// The four field catalogs a proposal interview can run through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogKind {
    CreateProposal,
    AddInfo,
    AddNewEngineer,
    AddEngineerRate,
}

impl CatalogKind {
    /// Every catalog kind, in the order an interview normally visits them.
    pub const ALL: [CatalogKind; 4] = [
        CatalogKind::CreateProposal,
        CatalogKind::AddInfo,
        CatalogKind::AddNewEngineer,
        CatalogKind::AddEngineerRate,
    ];

    /// What happens when a full pass over this catalog is exhausted, unless
    /// overridden in `config.toml`.
    pub fn default_completion(&self) -> CompletionAction {
        match self {
            CatalogKind::CreateProposal => CompletionAction::Overview,
            CatalogKind::AddInfo => CompletionAction::SaveDraft,
            CatalogKind::AddNewEngineer => CompletionAction::PersistRecord,
            CatalogKind::AddEngineerRate => CompletionAction::Overview,
        }
    }

    /// Whether this catalog is grown at runtime instead of loaded from a template.
    pub fn is_dynamic(&self) -> bool {
        matches!(self, CatalogKind::AddEngineerRate)
    }
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogKind::CreateProposal => write!(f, "create_proposal"),
            CatalogKind::AddInfo => write!(f, "add_info"),
            CatalogKind::AddNewEngineer => write!(f, "add_new_engineer"),
            CatalogKind::AddEngineerRate => write!(f, "add_engineer_rate"),
        }
    }
}

impl FromStr for CatalogKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "create_proposal" => Ok(CatalogKind::CreateProposal),
            "add_info" => Ok(CatalogKind::AddInfo),
            "add_new_engineer" => Ok(CatalogKind::AddNewEngineer),
            "add_engineer_rate" => Ok(CatalogKind::AddEngineerRate),
            other => Err(format!("invalid catalog kind: '{other}'")),
        }
    }
}

/// Side effect run when a catalog's full pass is exhausted.
///
/// - Overview: show the collected values, nothing else
/// - PersistRecord: store the collected values as a new engineer, then reset the catalog
/// - SaveDraft: snapshot the whole session into the draft store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionAction {
    Overview,
    PersistRecord,
    SaveDraft,
}

impl fmt::Display for CompletionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompletionAction::Overview => write!(f, "overview"),
            CompletionAction::PersistRecord => write!(f, "persist_record"),
            CompletionAction::SaveDraft => write!(f, "save_draft"),
        }
    }
}

/// Identifier of a field, unique within its catalog.
///
/// Field ids travel inside action tokens, so they never contain `:`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldId(String);

impl FieldId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FieldId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A single prompt/answer unit within a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldEntry {
    pub id: FieldId,
    /// Human-readable prompt shown to the user.
    pub label: String,
    /// Collected answer; `None` until the field is filled.
    pub content: Option<String>,
}

impl FieldEntry {
    /// An unfilled field.
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: FieldId::new(id),
            label: label.into(),
            content: None,
        }
    }
}

/// Ordered mapping of field id to field entry. Insertion order is fill order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    entries: Vec<FieldEntry>,
}

impl Catalog {
    pub fn new(entries: Vec<FieldEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &FieldId) -> bool {
        self.entries.iter().any(|e| &e.id == id)
    }

    pub fn get(&self, id: &FieldId) -> Option<&FieldEntry> {
        self.entries.iter().find(|e| &e.id == id)
    }

    pub fn get_mut(&mut self, id: &FieldId) -> Option<&mut FieldEntry> {
        self.entries.iter_mut().find(|e| &e.id == id)
    }

    /// Field at position `index` in fill order.
    pub fn at(&self, index: usize) -> Option<&FieldEntry> {
        self.entries.get(index)
    }

    pub fn entries(&self) -> &[FieldEntry] {
        &self.entries
    }

    pub fn field_ids(&self) -> impl Iterator<Item = &FieldId> {
        self.entries.iter().map(|e| &e.id)
    }

    /// Insert a new entry at the end, or replace the label of an existing one
    /// in place (keeping its position and content).
    pub fn merge(&mut self, entry: FieldEntry) {
        match self.get_mut(&entry.id) {
            Some(existing) => existing.label = entry.label,
            None => self.entries.push(entry),
        }
    }

    /// Clear every field's content, keeping the fields themselves.
    pub fn clear_content(&mut self) {
        for entry in &mut self.entries {
            entry.content = None;
        }
    }

    /// `(id, content)` pairs for every filled field, in catalog order.
    pub fn filled(&self) -> impl Iterator<Item = (&FieldId, &str)> {
        self.entries
            .iter()
            .filter_map(|e| e.content.as_deref().map(|c| (&e.id, c)))
    }
}
