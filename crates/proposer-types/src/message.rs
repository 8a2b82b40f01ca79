//! Transport-neutral inbound events and outbound replies.
//!
//! Transports (terminal, HTTP) translate their own wire formats into
//! `Inbound` and render `Outbound` back to the user.

use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::document::RenderedDocument;

/// An event from the user, already attributed to a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inbound {
    /// Start (or restart) the conversation.
    Start,
    /// Free text typed by the user.
    Text { text: String },
    /// A photo; `reference` is a transport file reference (URL or local path).
    Photo { reference: String },
    /// A button press carrying an encoded action token.
    Action { token: String },
    /// Abandon the conversation and discard its session.
    Cancel,
}

/// A button offered to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub text: String,
    /// Encoded `Action` token sent back when pressed.
    pub token: String,
}

impl Button {
    pub fn new(text: impl Into<String>, action: &Action) -> Self {
        Self {
            text: text.into(),
            token: action.to_token(),
        }
    }
}

/// A reply for the transport to deliver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    /// Plain text.
    Text { text: String },
    /// Ask for a field's value; `label` is shown emphasized. `attachment`
    /// is set when the field expects a photo instead of text.
    Prompt {
        label: String,
        #[serde(default)]
        attachment: bool,
    },
    /// One collected value in an overview.
    Field { label: String, content: String },
    /// A short non-fatal notice (duplicate record, failed download...).
    Notice { text: String },
    /// Text with rows of buttons beneath it.
    Keyboard { text: String, rows: Vec<Vec<Button>> },
    /// A rendered proposal document.
    Document { document: RenderedDocument },
}

impl Outbound {
    pub fn text(text: impl Into<String>) -> Self {
        Outbound::Text { text: text.into() }
    }

    pub fn notice(text: impl Into<String>) -> Self {
        Outbound::Notice { text: text.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogKind;

    #[test]
    fn test_button_carries_token() {
        let button = Button::new("Add info", &Action::InitCatalog(CatalogKind::AddInfo));
        assert_eq!(button.token, "add_info:init");
    }

    #[test]
    fn test_inbound_deserialize() {
        let inbound: Inbound =
            serde_json::from_str(r#"{"type":"text","text":"Acme Corp"}"#).unwrap();
        assert_eq!(
            inbound,
            Inbound::Text {
                text: "Acme Corp".to_string()
            }
        );

        let inbound: Inbound = serde_json::from_str(r#"{"type":"start"}"#).unwrap();
        assert_eq!(inbound, Inbound::Start);
    }

    #[test]
    fn test_outbound_serialize_tagged() {
        let json = serde_json::to_string(&Outbound::notice("hi")).unwrap();
        assert!(json.contains("\"type\":\"notice\""));
        assert!(json.contains("\"text\":\"hi\""));
    }
}
