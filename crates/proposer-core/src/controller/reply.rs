//! Outbound message builders for each conversation state.

use proposer_types::action::Action;
use proposer_types::catalog::{CatalogKind, FieldEntry};
use proposer_types::engineer::Engineer;
use proposer_types::message::{Button, Outbound};
use proposer_types::session::ProposalSession;

use crate::catalog::PHOTO_FIELD;
use crate::session::ProposalSessionExt;

pub const GREETING: &str = "Hi, I'll help you to complete the proposal.";
pub const START_MENU: &str = "What do you want to do?";
pub const OVERVIEW_HEADER: &str = "Info you've provided:";
pub const OVERVIEW_MENU: &str = "All good?";
pub const EDIT_MENU: &str = "Which field do you want to change?";
pub const RECORD_MENU: &str = "Choose engineers:";
pub const DUPLICATE_ENGINEER: &str = "This engineer is already in the registry.";
pub const STALE_EVENT: &str = "That option is not available right now.";
pub const USE_BUTTONS: &str = "Please use the buttons above.";
pub const PHOTO_FAILED: &str = "Could not download the photo, please send it again.";
pub const PHOTO_REJECTED: &str = "That photo cannot be used, please send another one.";
pub const EXPECTS_PHOTO: &str = "Please send a photo.";
pub const EXPECTS_TEXT: &str = "Please answer with text.";
pub const DOCUMENT_FAILED: &str = "Could not build the document, please try again.";
pub const UNKNOWN_FIELD: &str = "That field does not exist anymore.";
pub const DISCARDED: &str = "Proposal discarded.";
pub const RATES_PENDING: &str = "Every chosen engineer needs a rate first.";
pub const FINISHED: &str = "This proposal is complete. Start a new conversation to create another one.";
const EMPTY_CONTENT: &str = "(not provided)";

/// Greeting plus the start menu.
pub fn start() -> Vec<Outbound> {
    vec![
        Outbound::text(GREETING),
        Outbound::Keyboard {
            text: START_MENU.to_string(),
            rows: vec![
                vec![Button::new(
                    "Create new proposal",
                    &Action::InitCatalog(CatalogKind::CreateProposal),
                )],
                vec![Button::new("Sample document", &Action::Sample)],
            ],
        },
    ]
}

/// Prompt for a single field.
pub fn prompt(entry: &FieldEntry) -> Outbound {
    Outbound::Prompt {
        label: entry.label.clone(),
        attachment: entry.id.as_str() == PHOTO_FIELD,
    }
}

/// Every field of the active catalog followed by the next-step buttons.
pub fn overview(session: &ProposalSession) -> Vec<Outbound> {
    let Some(kind) = session.active_kind else {
        return vec![Outbound::notice(STALE_EVENT)];
    };

    let mut replies = vec![Outbound::text(OVERVIEW_HEADER)];
    if let Some(catalog) = session.active_catalog() {
        replies.extend(catalog.entries().iter().map(|e| Outbound::Field {
            label: e.label.clone(),
            content: e.content.clone().unwrap_or_else(|| EMPTY_CONTENT.to_string()),
        }));
    }

    let mut rows = Vec::new();
    if session.pass_in_progress() {
        rows.push(vec![Button::new("Continue filling", &Action::Resume)]);
    }
    let next = match kind {
        CatalogKind::CreateProposal => {
            Button::new("Add info", &Action::InitCatalog(CatalogKind::AddInfo))
        }
        _ => Button::new("Choose engineers", &Action::ChooseEngineers),
    };
    let mut row = vec![next];
    // A persisted engineer is reset right after its overview; nothing left to edit.
    if kind != CatalogKind::AddNewEngineer {
        row.push(Button::new("Edit", &Action::Edit));
    }
    rows.push(row);

    replies.push(Outbound::Keyboard {
        text: OVERVIEW_MENU.to_string(),
        rows,
    });
    replies
}

/// One button per field of the active catalog, plus a way back.
pub fn edit_menu(session: &ProposalSession) -> Outbound {
    let mut rows: Vec<Vec<Button>> = session
        .active_catalog()
        .map(|catalog| {
            catalog
                .entries()
                .iter()
                .map(|e| vec![Button::new(e.label.clone(), &Action::EditField(e.id.clone()))])
                .collect()
        })
        .unwrap_or_default();
    rows.push(vec![Button::new("<< Go back", &Action::Overview)]);

    Outbound::Keyboard {
        text: EDIT_MENU.to_string(),
        rows,
    }
}

/// Engineers still available for linking, then "add new" and "continue".
pub fn record_menu(engineers: &[Engineer]) -> Outbound {
    let mut rows: Vec<Vec<Button>> = engineers
        .iter()
        .map(|e| vec![Button::new(e.name.clone(), &Action::PickEngineer(e.id))])
        .collect();
    rows.push(vec![
        Button::new(
            "Add new engineer",
            &Action::InitCatalog(CatalogKind::AddNewEngineer),
        ),
        Button::new("Continue", &Action::Continue),
    ]);

    Outbound::Keyboard {
        text: RECORD_MENU.to_string(),
        rows,
    }
}
