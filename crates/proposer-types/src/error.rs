use thiserror::Error;

use crate::catalog::FieldId;
use crate::engineer::EngineerId;

/// Errors from repository operations (used by trait definitions in proposer-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Contract violations on the proposal session primitives.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("unknown field '{0}' in the active catalog")]
    UnknownField(FieldId),

    #[error("no field is awaiting input")]
    NoPendingField,

    #[error("no catalog has been initialized")]
    NoActiveCatalog,
}

/// Errors linking an engineer into the current proposal.
#[derive(Debug, Error)]
pub enum LinkageError {
    #[error("engineer {0} is already linked to this proposal")]
    AlreadyLinked(EngineerId),

    #[error("engineer {0} not found in the registry")]
    UnknownEngineer(EngineerId),

    #[error("registry error: {0}")]
    Registry(#[from] RepositoryError),
}

/// Errors fetching or storing an inbound attachment.
#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("download failed: {0}")]
    Download(String),

    #[error("attachment rejected: {0}")]
    Rejected(String),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Errors from the document rendering pipeline.
#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("template error: {0}")]
    Template(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors decoding an action token.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("empty action token")]
    Empty,

    #[error("unknown action tag '{0}'")]
    UnknownTag(String),

    #[error("action '{0}' requires a subject")]
    MissingSubject(String),

    #[error("invalid subject for '{tag}': {reason}")]
    InvalidSubject { tag: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_error_display() {
        let err = SessionError::UnknownField(FieldId::new("budget"));
        assert_eq!(err.to_string(), "unknown field 'budget' in the active catalog");
    }

    #[test]
    fn test_linkage_error_from_repository() {
        let err: LinkageError = RepositoryError::Connection.into();
        assert!(matches!(err, LinkageError::Registry(RepositoryError::Connection)));
    }

    #[test]
    fn test_repository_error_display() {
        let err = RepositoryError::Query("syntax error".to_string());
        assert_eq!(err.to_string(), "query error: syntax error");
    }

    #[test]
    fn test_token_error_display() {
        let err = TokenError::InvalidSubject {
            tag: "pick".to_string(),
            reason: "not a uuid".to_string(),
        };
        assert!(err.to_string().contains("pick"));
        assert!(err.to_string().contains("not a uuid"));
    }
}
