//! Document assembly port and proposal collection.

use std::collections::BTreeMap;
use std::future::Future;

use proposer_types::catalog::CatalogKind;
use proposer_types::document::{CollectedProposal, ProposalEngineer, RenderedDocument};
use proposer_types::engineer::EngineerId;
use proposer_types::error::{AssemblyError, RepositoryError};
use proposer_types::session::ProposalSession;
use tracing::warn;

use crate::linkage::rate_field_id;
use crate::repository::engineer::EngineerRegistry;

/// Renders collected proposal data into a document.
pub trait DocumentAssembler: Send + Sync {
    fn render(
        &self,
        proposal: &CollectedProposal,
    ) -> impl Future<Output = Result<RenderedDocument, AssemblyError>> + Send;
}

/// Gather everything the session collected into one flat proposal.
///
/// Proposal and info fields map id -> content; every linked engineer
/// contributes a rate entry keyed by their id plus a [`ProposalEngineer`]
/// with their registry details. Engineers that vanished from the registry
/// are skipped with a warning.
pub async fn collect_proposal<R: EngineerRegistry>(
    session: &ProposalSession,
    registry: &R,
) -> Result<CollectedProposal, RepositoryError> {
    let mut fields = BTreeMap::new();
    for kind in [CatalogKind::CreateProposal, CatalogKind::AddInfo] {
        if let Some(catalog) = session.catalog(kind) {
            for (id, content) in catalog.filled() {
                fields.insert(id.to_string(), content.to_string());
            }
        }
    }

    let rates = session.catalog(CatalogKind::AddEngineerRate);
    let mut engineers = Vec::with_capacity(session.linked_engineers.len());
    for id in &session.linked_engineers {
        let Some(engineer) = registry.get(id).await? else {
            warn!(
                conversation_id = %session.conversation_id,
                engineer_id = %id,
                "linked engineer missing from registry"
            );
            continue;
        };
        let rate = rates
            .and_then(|c| c.get(&rate_field_id(id)))
            .and_then(|e| e.content.clone());
        if let Some(rate) = &rate {
            fields.insert(id.to_string(), rate.clone());
        }
        engineers.push(ProposalEngineer {
            id: *id,
            name: engineer.name,
            details: engineer.fields,
            rate,
        });
    }

    Ok(CollectedProposal { fields, engineers })
}

/// Built-in values for the sample document.
pub fn sample_proposal() -> CollectedProposal {
    let fields = [
        ("title", "Customer portal rebuild"),
        ("client", "Northwind Traders"),
        ("summary", "Replace the legacy order portal with a responsive web app."),
        ("scope", "Discovery, UI design, backend API, migration of order history"),
        ("timeline", "12 weeks"),
        ("budget", "USD 48,000"),
        ("contact", "Jane Doe, jane@northwind.example"),
        ("notes", "Fixed price for discovery, time and materials afterwards."),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    let engineer = |name: &str, position: &str, experience: &str, rate: &str| ProposalEngineer {
        id: EngineerId::new(),
        name: name.to_string(),
        details: BTreeMap::from([
            ("position".to_string(), position.to_string()),
            ("experience".to_string(), experience.to_string()),
        ]),
        rate: Some(rate.to_string()),
    };

    CollectedProposal {
        fields,
        engineers: vec![
            engineer("Alex Morgan", "Tech lead", "9 years", "USD 60/h"),
            engineer("Sam Lee", "Frontend developer", "4 years", "USD 45/h"),
        ],
    }
}
