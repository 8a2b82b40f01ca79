//! Application state wiring all services together.
//!
//! The conversation controller is generic over its ports; AppState pins it
//! to the concrete infra implementations.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use proposer_core::controller::ConversationController;
use proposer_infra::config::load_global_config;
use proposer_infra::document::HtmlDocumentAssembler;
use proposer_infra::filesystem::{
    AttachmentFetcher, LocalAttachmentStore, ReferencePolicy, content_dir, resolve_data_dir,
};
use proposer_infra::sqlite::draft::SqliteProposalDraftStore;
use proposer_infra::sqlite::engineer::SqliteEngineerRegistry;
use proposer_infra::sqlite::pool::{DatabasePool, default_database_url};

/// Controller pinned to the SQLite, filesystem and handlebars adapters.
pub type ConcreteController = ConversationController<
    SqliteEngineerRegistry,
    SqliteProposalDraftStore,
    HtmlDocumentAssembler,
    AttachmentFetcher,
    LocalAttachmentStore,
>;

/// Shared application state, used by both CLI commands and REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<ConcreteController>,
    pub data_dir: PathBuf,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Initialize the application state: connect to DB, load config, wire
    /// the controller. `policy` says which attachment references the calling
    /// transport may submit.
    pub async fn init(policy: ReferencePolicy) -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("Failed to create data dir {}", data_dir.display()))?;

        let db_pool = DatabasePool::new(&default_database_url())
            .await
            .context("Failed to open database")?;

        let config = load_global_config(&data_dir).await;
        let assembler = HtmlDocumentAssembler::with_override(config.document.template.as_deref())
            .context("Failed to load proposal template")?;
        let fetcher = AttachmentFetcher::new(
            policy,
            Duration::from_secs(config.attachment_timeout_secs),
            config.attachment_max_bytes,
        )
        .context("Failed to build attachment fetcher")?;

        let controller = ConversationController::new(
            SqliteEngineerRegistry::new(db_pool.clone()),
            SqliteProposalDraftStore::new(db_pool.clone()),
            assembler,
            fetcher,
            LocalAttachmentStore::new(content_dir(&data_dir)),
            config,
        );

        tracing::debug!(data_dir = %data_dir.display(), ?policy, "application state ready");

        Ok(Self {
            controller: Arc::new(controller),
            data_dir,
            db_pool,
        })
    }
}
