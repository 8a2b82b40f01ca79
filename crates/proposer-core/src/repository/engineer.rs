//! Engineer registry trait definition.

use std::collections::BTreeMap;
use std::future::Future;

use proposer_types::engineer::{Engineer, EngineerId};
use proposer_types::error::RepositoryError;

/// Shared registry of engineers, visible to every conversation.
///
/// Implementations live in proposer-infra (e.g., SqliteEngineerRegistry).
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait EngineerRegistry: Send + Sync {
    /// Every engineer, ordered by name.
    fn list(&self) -> impl Future<Output = Result<Vec<Engineer>, RepositoryError>> + Send;

    /// Get an engineer by id.
    fn get(
        &self,
        id: &EngineerId,
    ) -> impl Future<Output = Result<Option<Engineer>, RepositoryError>> + Send;

    /// Read a single field of an engineer. `None` when either the engineer
    /// or the field is missing.
    fn get_field(
        &self,
        id: &EngineerId,
        field: &str,
    ) -> impl Future<Output = Result<Option<String>, RepositoryError>> + Send;

    /// Store a new engineer from collected fields.
    ///
    /// The `name` field is required and unique; a duplicate name yields
    /// `RepositoryError::Conflict` and stores nothing.
    fn store_new(
        &self,
        fields: BTreeMap<String, String>,
    ) -> impl Future<Output = Result<Engineer, RepositoryError>> + Send;
}
