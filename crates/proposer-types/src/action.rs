//! Action tokens carried on selection buttons.
//!
//! A token is `"<subject>:<tag>"` or a bare `"<tag>"`. Decoding splits at the
//! first `:` so the subject is everything before it and the tag everything
//! after. Subjects are catalog kinds, field ids, or engineer ids, none of
//! which contain `:`.

use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

use crate::catalog::{CatalogKind, FieldId};
use crate::engineer::EngineerId;
use crate::error::TokenError;

const SEPARATOR: char = ':';

/// A user choice, decoded from a button token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "subject", rename_all = "snake_case")]
pub enum Action {
    /// Start a full pass over a catalog.
    InitCatalog(CatalogKind),
    /// Edit a single field of the active catalog.
    EditField(FieldId),
    /// Link an engineer and ask for their rate.
    PickEngineer(EngineerId),
    /// Open engineer selection.
    ChooseEngineers,
    /// List fields of the active catalog for editing.
    Edit,
    /// Back to the overview of the active catalog.
    Overview,
    /// Finish engineer selection and assemble the document.
    Continue,
    /// Return to the field an interrupted full pass was waiting on.
    Resume,
    /// Render a document from built-in sample values.
    Sample,
}

impl Action {
    fn tag(&self) -> &'static str {
        match self {
            Action::InitCatalog(_) => "init",
            Action::EditField(_) => "edit_field",
            Action::PickEngineer(_) => "pick",
            Action::ChooseEngineers => "choose",
            Action::Edit => "edit",
            Action::Overview => "overview",
            Action::Continue => "continue",
            Action::Resume => "resume",
            Action::Sample => "sample",
        }
    }

    /// Encode as a button token.
    pub fn to_token(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = self.tag();
        match self {
            Action::InitCatalog(kind) => write!(f, "{kind}{SEPARATOR}{tag}"),
            Action::EditField(id) => write!(f, "{id}{SEPARATOR}{tag}"),
            Action::PickEngineer(id) => write!(f, "{id}{SEPARATOR}{tag}"),
            _ => f.write_str(tag),
        }
    }
}

impl FromStr for Action {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(TokenError::Empty);
        }

        let (subject, tag) = match s.split_once(SEPARATOR) {
            Some((subject, tag)) => (Some(subject), tag),
            None => (None, s),
        };

        let require = |tag: &str| -> Result<&str, TokenError> {
            subject
                .filter(|sub| !sub.is_empty())
                .ok_or_else(|| TokenError::MissingSubject(tag.to_string()))
        };

        match tag {
            "init" => {
                let kind = require(tag)?.parse::<CatalogKind>().map_err(|reason| {
                    TokenError::InvalidSubject {
                        tag: tag.to_string(),
                        reason,
                    }
                })?;
                Ok(Action::InitCatalog(kind))
            }
            "edit_field" => Ok(Action::EditField(FieldId::new(require(tag)?))),
            "pick" => {
                let id = require(tag)?.parse::<EngineerId>().map_err(|e| {
                    TokenError::InvalidSubject {
                        tag: tag.to_string(),
                        reason: e.to_string(),
                    }
                })?;
                Ok(Action::PickEngineer(id))
            }
            "choose" => Ok(Action::ChooseEngineers),
            "edit" => Ok(Action::Edit),
            "overview" => Ok(Action::Overview),
            "continue" => Ok(Action::Continue),
            "resume" => Ok(Action::Resume),
            "sample" => Ok(Action::Sample),
            other => Err(TokenError::UnknownTag(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_roundtrip_all_actions() {
        let actions = vec![
            Action::InitCatalog(CatalogKind::CreateProposal),
            Action::InitCatalog(CatalogKind::AddNewEngineer),
            Action::EditField(FieldId::new("title")),
            Action::PickEngineer(EngineerId::new()),
            Action::ChooseEngineers,
            Action::Edit,
            Action::Overview,
            Action::Continue,
            Action::Resume,
            Action::Sample,
        ];

        for action in actions {
            let token = action.to_token();
            let parsed: Action = token.parse().unwrap();
            assert_eq!(action, parsed, "token {token} did not round-trip");
        }
    }

    #[test]
    fn test_token_format() {
        assert_eq!(
            Action::InitCatalog(CatalogKind::AddInfo).to_token(),
            "add_info:init"
        );
        assert_eq!(Action::EditField(FieldId::new("title")).to_token(), "title:edit_field");
        assert_eq!(Action::Continue.to_token(), "continue");
    }

    #[test]
    fn test_rate_field_id_roundtrips_through_edit_token() {
        let engineer = EngineerId::new();
        let action = Action::EditField(FieldId::new(engineer.to_string()));
        let parsed: Action = action.to_token().parse().unwrap();
        assert_eq!(parsed, action);
    }

    #[test]
    fn test_unknown_tag() {
        assert_eq!(
            "title:explode".parse::<Action>(),
            Err(TokenError::UnknownTag("explode".to_string()))
        );
    }

    #[test]
    fn test_missing_subject() {
        assert_eq!(
            "init".parse::<Action>(),
            Err(TokenError::MissingSubject("init".to_string()))
        );
        assert_eq!(
            ":edit_field".parse::<Action>(),
            Err(TokenError::MissingSubject("edit_field".to_string()))
        );
    }

    #[test]
    fn test_invalid_subjects() {
        assert!(matches!(
            "nope:init".parse::<Action>(),
            Err(TokenError::InvalidSubject { .. })
        ));
        assert!(matches!(
            "42:pick".parse::<Action>(),
            Err(TokenError::InvalidSubject { .. })
        ));
    }

    #[test]
    fn test_empty_token() {
        assert_eq!("  ".parse::<Action>(), Err(TokenError::Empty));
    }
}
