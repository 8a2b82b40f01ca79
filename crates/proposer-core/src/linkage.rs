//! Linking registry engineers into a proposal.
//!
//! Every linked engineer owns exactly one field in the session's rate
//! catalog, keyed by the engineer id and labelled with their name. Rates are
//! scoped to the session; the shared registry is only read here.

use proposer_types::catalog::{CatalogKind, FieldEntry, FieldId};
use proposer_types::engineer::{Engineer, EngineerId, NAME_FIELD};
use proposer_types::error::{LinkageError, RepositoryError};
use proposer_types::session::ProposalSession;
use tracing::debug;

use crate::catalog::{rate_label, template_for};
use crate::repository::engineer::EngineerRegistry;

/// Rate field id for a linked engineer.
pub fn rate_field_id(engineer: &EngineerId) -> FieldId {
    FieldId::new(engineer.to_string())
}

/// Engineers that may still be offered for linking, in registry order.
pub async fn available_engineers<R: EngineerRegistry>(
    session: &ProposalSession,
    registry: &R,
) -> Result<Vec<Engineer>, RepositoryError> {
    let engineers = registry.list().await?;
    Ok(engineers
        .into_iter()
        .filter(|e| !session.is_linked(&e.id))
        .collect())
}

/// Link `engineer` into the session and return the id of their rate field.
///
/// On success the engineer is recorded as linked, a rate field labelled with
/// their name is merged into the rate catalog, and `add_rate` is set so the
/// pending rate edit routes back to engineer selection. Any error leaves the
/// session untouched.
pub async fn link_engineer<R: EngineerRegistry>(
    session: &mut ProposalSession,
    registry: &R,
    engineer: EngineerId,
) -> Result<FieldId, LinkageError> {
    if session.is_linked(&engineer) {
        return Err(LinkageError::AlreadyLinked(engineer));
    }

    let name = registry
        .get_field(&engineer, NAME_FIELD)
        .await?
        .ok_or(LinkageError::UnknownEngineer(engineer))?;

    let field_id = rate_field_id(&engineer);
    session.linked_engineers.push(engineer);
    session
        .catalogs
        .entry(CatalogKind::AddEngineerRate)
        .or_insert_with(|| template_for(CatalogKind::AddEngineerRate))
        .merge(FieldEntry::new(field_id.as_str(), rate_label(&name)));
    session.add_rate = true;

    debug!(
        conversation_id = %session.conversation_id,
        engineer_id = %engineer,
        "linked engineer"
    );
    Ok(field_id)
}

/// Rate fields of linked engineers that are still empty, in link order.
pub fn pending_rates(session: &ProposalSession) -> Vec<FieldId> {
    let Some(catalog) = session.catalog(CatalogKind::AddEngineerRate) else {
        return Vec::new();
    };
    session
        .linked_engineers
        .iter()
        .map(rate_field_id)
        .filter(|id| catalog.get(id).is_some_and(|e| e.content.is_none()))
        .collect()
}
