//! Field catalog templates.
//!
//! Pure data: each static catalog kind resolves to a fixed, ordered field
//! list. The engineer-rate catalog starts empty and is grown by
//! [`crate::linkage`].

use proposer_types::catalog::{Catalog, CatalogKind, FieldEntry};
use proposer_types::engineer::NAME_FIELD;

/// Field of the new-engineer catalog that expects a photo.
pub const PHOTO_FIELD: &str = "photo";

/// Build a fresh (unfilled) catalog for `kind`.
pub fn template_for(kind: CatalogKind) -> Catalog {
    let entries = match kind {
        CatalogKind::CreateProposal => vec![
            FieldEntry::new("title", "Title"),
            FieldEntry::new("client", "Client"),
            FieldEntry::new("summary", "Summary"),
            FieldEntry::new("scope", "Scope of work"),
            FieldEntry::new("timeline", "Timeline"),
        ],
        CatalogKind::AddInfo => vec![
            FieldEntry::new("budget", "Budget"),
            FieldEntry::new("contact", "Contact person"),
            FieldEntry::new("notes", "Additional notes"),
        ],
        CatalogKind::AddNewEngineer => vec![
            FieldEntry::new(NAME_FIELD, "Name"),
            FieldEntry::new("position", "Position"),
            FieldEntry::new("experience", "Experience"),
            FieldEntry::new(PHOTO_FIELD, "Photo"),
        ],
        CatalogKind::AddEngineerRate => Vec::new(),
    };
    Catalog::new(entries)
}

/// Label of the rate field synthesized for a linked engineer.
pub fn rate_label(engineer_name: &str) -> String {
    format!("Current rate for {engineer_name}")
}
