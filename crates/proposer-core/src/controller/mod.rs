//! Conversation controller: routes inbound events through the proposal
//! interview state machine.
//!
//! The controller is transport-neutral. Each call to [`ConversationController::handle`]
//! locks the conversation's session, applies one event, and returns the
//! replies the transport should deliver. Recoverable failures (duplicate
//! engineer, failed download, stale button) become notices; they never end
//! the conversation.

pub mod reply;

use std::collections::BTreeMap;

use proposer_types::action::Action;
use proposer_types::catalog::{CatalogKind, CompletionAction, FieldId};
use proposer_types::config::GlobalConfig;
use proposer_types::engineer::EngineerId;
use proposer_types::error::{AttachmentError, LinkageError, RepositoryError};
use proposer_types::message::{Inbound, Outbound};
use proposer_types::session::{
    ConversationId, ConversationState, Cursor, ProposalSession, StoreOutcome,
};
use tracing::{debug, error, info, warn};

use crate::attachment::{AttachmentStore, FileFetcher, save_photo};
use crate::catalog::PHOTO_FIELD;
use crate::document::{DocumentAssembler, collect_proposal, sample_proposal};
use crate::linkage::{available_engineers, link_engineer, pending_rates};
use crate::repository::draft::{ProposalDraft, ProposalDraftStore};
use crate::repository::engineer::EngineerRegistry;
use crate::session::registry::SessionRegistry;
use crate::session::{ProposalSessionExt, new_proposal_session};

/// Drives proposal interviews for any number of conversations.
pub struct ConversationController<R, D, A, F, S> {
    sessions: SessionRegistry,
    registry: R,
    drafts: D,
    assembler: A,
    fetcher: F,
    attachments: S,
    config: GlobalConfig,
}

impl<R, D, A, F, S> ConversationController<R, D, A, F, S>
where
    R: EngineerRegistry,
    D: ProposalDraftStore,
    A: DocumentAssembler,
    F: FileFetcher,
    S: AttachmentStore,
{
    pub fn new(
        registry: R,
        drafts: D,
        assembler: A,
        fetcher: F,
        attachments: S,
        config: GlobalConfig,
    ) -> Self {
        Self {
            sessions: SessionRegistry::new(),
            registry,
            drafts,
            assembler,
            fetcher,
            attachments,
            config,
        }
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn drafts(&self) -> &D {
        &self.drafts
    }

    /// Apply one inbound event to a conversation and return the replies.
    pub async fn handle(&self, id: &ConversationId, event: Inbound) -> Vec<Outbound> {
        let event = match event {
            Inbound::Start => {
                info!(conversation_id = %id, "starting proposal conversation");
                self.sessions.insert(new_proposal_session(id.clone()));
                return reply::start();
            }
            Inbound::Cancel => {
                self.sessions.remove(id);
                info!(conversation_id = %id, "proposal conversation cancelled");
                return vec![Outbound::text(reply::DISCARDED)];
            }
            other => other,
        };

        let handle = self.sessions.get_or_create(id);
        let mut session = handle.lock().await;
        let before = session.state;

        let replies = match event {
            Inbound::Text { text } => self.on_text(&mut session, text).await,
            Inbound::Photo { reference } => self.on_photo(&mut session, &reference).await,
            Inbound::Action { token } => match token.parse::<Action>() {
                Ok(action) => self.on_action(&mut session, action).await,
                Err(e) => {
                    warn!(conversation_id = %id, token = %token, error = %e, "undecodable action token");
                    vec![Outbound::notice(reply::STALE_EVENT)]
                }
            },
            Inbound::Start | Inbound::Cancel => Vec::new(),
        };

        if session.state != before {
            debug!(
                conversation_id = %id,
                from = %before,
                to = %session.state,
                "conversation state changed"
            );
        }
        replies
    }

    /// Restore a saved draft as the live session of its conversation and
    /// return the replies that re-render its current state.
    pub async fn resume(&self, draft: &ProposalDraft) -> Result<Vec<Outbound>, serde_json::Error> {
        let session = draft.to_session()?;
        info!(
            conversation_id = %session.conversation_id,
            state = %session.state,
            "resuming proposal draft"
        );
        let handle = self.sessions.insert(session);
        let session = handle.lock().await;
        Ok(self.render_state(&session).await)
    }

    async fn on_text(&self, session: &mut ProposalSession, text: String) -> Vec<Outbound> {
        if session.state != ConversationState::AwaitingFieldInput {
            return vec![Outbound::notice(reply::USE_BUTTONS)];
        }
        if expects_photo(session) {
            return self.reprompt(session, reply::EXPECTS_PHOTO);
        }
        self.store(session, text).await
    }

    async fn on_photo(&self, session: &mut ProposalSession, reference: &str) -> Vec<Outbound> {
        if session.state != ConversationState::AwaitingFieldInput {
            return vec![Outbound::notice(reply::USE_BUTTONS)];
        }
        if !expects_photo(session) {
            return self.reprompt(session, reply::EXPECTS_TEXT);
        }

        match save_photo(
            &self.fetcher,
            &self.attachments,
            reference,
            self.config.attachment_retries,
        )
        .await
        {
            Ok(path) => {
                debug!(conversation_id = %session.conversation_id, path = %path, "stored photo");
                self.store(session, path).await
            }
            Err(e) => {
                warn!(
                    conversation_id = %session.conversation_id,
                    error = %e,
                    "photo download failed"
                );
                let notice = match e {
                    AttachmentError::Rejected(_) => reply::PHOTO_REJECTED,
                    _ => reply::PHOTO_FAILED,
                };
                self.reprompt(session, notice)
            }
        }
    }

    async fn on_action(&self, session: &mut ProposalSession, action: Action) -> Vec<Outbound> {
        use ConversationState::*;

        match (session.state, action) {
            (Completed, action) => {
                debug!(
                    conversation_id = %session.conversation_id,
                    action = %action,
                    "action after completion"
                );
                vec![Outbound::notice(reply::FINISHED)]
            }
            (SelectingAction, Action::InitCatalog(kind @ CatalogKind::CreateProposal))
            | (Overview, Action::InitCatalog(kind @ CatalogKind::AddInfo))
            | (ChoosingRecord, Action::InitCatalog(kind @ CatalogKind::AddNewEngineer)) => {
                self.start_pass(session, kind).await
            }
            (SelectingAction, Action::Sample) => self.render_sample(session).await,
            (Overview, Action::Edit) => {
                session.state = ChoosingFieldToEdit;
                vec![reply::edit_menu(session)]
            }
            (Overview, Action::Resume) if session.pass_in_progress() => {
                session.resume_pass();
                self.await_input(session)
            }
            (Overview, Action::ChooseEngineers) => {
                session.initialize(CatalogKind::AddEngineerRate);
                session.state = ChoosingRecord;
                vec![self.record_menu(session).await]
            }
            (ChoosingFieldToEdit, Action::EditField(field)) => {
                match session.set_edit_target(&field) {
                    Ok(()) => self.await_input(session),
                    Err(e) => {
                        error!(
                            conversation_id = %session.conversation_id,
                            field = %field,
                            error = %e,
                            "edit target rejected"
                        );
                        let mut replies = vec![Outbound::notice(reply::UNKNOWN_FIELD)];
                        replies.extend(self.show_overview(session));
                        replies
                    }
                }
            }
            (ChoosingRecord, Action::PickEngineer(engineer)) => {
                self.pick_engineer(session, engineer).await
            }
            (ChoosingRecord, Action::Continue) => match pending_rates(session).first() {
                Some(field) => {
                    let field = field.clone();
                    let mut replies = vec![Outbound::notice(reply::RATES_PENDING)];
                    replies.extend(self.prompt_rate(session, &field));
                    replies
                }
                None => {
                    session.add_rate = false;
                    self.assemble(session).await
                }
            },
            (_, Action::Overview) if session.active_kind.is_some() => {
                // Leaving a rate prompt drops its return to engineer selection.
                session.add_rate = false;
                session.edit_all = true;
                self.show_overview(session)
            }
            (state, action) => {
                debug!(
                    conversation_id = %session.conversation_id,
                    %state,
                    action = %action,
                    "ignoring action not valid in this state"
                );
                vec![Outbound::notice(reply::STALE_EVENT)]
            }
        }
    }

    async fn start_pass(&self, session: &mut ProposalSession, kind: CatalogKind) -> Vec<Outbound> {
        debug!(conversation_id = %session.conversation_id, %kind, "starting catalog pass");
        match session.initialize(kind) {
            Cursor::Field(_) => self.await_input(session),
            Cursor::Exhausted => self.complete_pass(session).await,
        }
    }

    /// Store a value at the cursor and route by the outcome.
    async fn store(&self, session: &mut ProposalSession, value: String) -> Vec<Outbound> {
        match session.store_content(value) {
            Ok(StoreOutcome::Next(_)) => self.await_input(session),
            Ok(StoreOutcome::Exhausted) => self.complete_pass(session).await,
            Ok(StoreOutcome::Edited) if session.add_rate => {
                session.add_rate = false;
                session.state = ConversationState::ChoosingRecord;
                vec![self.record_menu(session).await]
            }
            Ok(StoreOutcome::Edited) => self.show_overview(session),
            Err(e) => {
                error!(
                    conversation_id = %session.conversation_id,
                    error = %e,
                    "field input without a pending field"
                );
                vec![Outbound::notice(reply::STALE_EVENT)]
            }
        }
    }

    /// Run the completion action of the active catalog, then route to the
    /// overview or back to engineer selection.
    async fn complete_pass(&self, session: &mut ProposalSession) -> Vec<Outbound> {
        let Some(kind) = session.active_kind else {
            return vec![Outbound::notice(reply::STALE_EVENT)];
        };
        let completion = self.config.completion_for(kind);
        info!(
            conversation_id = %session.conversation_id,
            %kind,
            %completion,
            "catalog pass complete"
        );

        // Built before any reset so the user sees what was collected.
        let overview = reply::overview(session);
        let mut replies = Vec::new();

        match completion {
            CompletionAction::Overview => {}
            CompletionAction::PersistRecord => {
                replies.push(self.persist_record(session).await);
                session.reset();
            }
            CompletionAction::SaveDraft => self.save_draft(session).await,
        }

        if session.add_rate {
            session.add_rate = false;
            session.state = ConversationState::ChoosingRecord;
            replies.push(self.record_menu(session).await);
        } else {
            session.state = ConversationState::Overview;
            replies.extend(overview);
        }
        replies
    }

    async fn persist_record(&self, session: &ProposalSession) -> Outbound {
        let fields: BTreeMap<String, String> = session
            .active_catalog()
            .map(|c| {
                c.filled()
                    .map(|(id, content)| (id.to_string(), content.to_string()))
                    .collect()
            })
            .unwrap_or_default();

        match self.registry.store_new(fields).await {
            Ok(engineer) => {
                info!(
                    conversation_id = %session.conversation_id,
                    engineer_id = %engineer.id,
                    "engineer added to registry"
                );
                Outbound::notice(format!("{} was added to the registry.", engineer.name))
            }
            Err(RepositoryError::Conflict(reason)) => {
                info!(conversation_id = %session.conversation_id, reason = %reason, "duplicate engineer");
                Outbound::notice(reply::DUPLICATE_ENGINEER)
            }
            Err(e) => {
                error!(
                    conversation_id = %session.conversation_id,
                    error = %e,
                    "failed to store engineer"
                );
                Outbound::notice("Could not save the engineer, please try again later.")
            }
        }
    }

    async fn save_draft(&self, session: &ProposalSession) {
        let draft = match ProposalDraft::from_session(session) {
            Ok(draft) => draft,
            Err(e) => {
                warn!(conversation_id = %session.conversation_id, error = %e, "failed to serialize draft");
                return;
            }
        };
        match self.drafts.save_draft(draft).await {
            Ok(()) => debug!(conversation_id = %session.conversation_id, "saved proposal draft"),
            Err(e) => {
                warn!(conversation_id = %session.conversation_id, error = %e, "failed to save draft")
            }
        }
    }

    async fn pick_engineer(
        &self,
        session: &mut ProposalSession,
        engineer: EngineerId,
    ) -> Vec<Outbound> {
        let field = match link_engineer(session, &self.registry, engineer).await {
            Ok(field) => field,
            Err(LinkageError::AlreadyLinked(_)) => {
                debug!(
                    conversation_id = %session.conversation_id,
                    engineer_id = %engineer,
                    "engineer already linked"
                );
                return vec![self.record_menu(session).await];
            }
            Err(LinkageError::UnknownEngineer(_)) => {
                return vec![
                    Outbound::notice("That engineer is no longer in the registry."),
                    self.record_menu(session).await,
                ];
            }
            Err(e @ LinkageError::Registry(_)) => {
                error!(conversation_id = %session.conversation_id, error = %e, "linkage failed");
                return vec![
                    Outbound::notice("Could not load the engineer, please try again."),
                    self.record_menu(session).await,
                ];
            }
        };

        self.prompt_rate(session, &field)
    }

    /// Ask for one engineer's rate, then come back to engineer selection.
    fn prompt_rate(&self, session: &mut ProposalSession, field: &FieldId) -> Vec<Outbound> {
        session.bind(CatalogKind::AddEngineerRate);
        if let Err(e) = session.set_edit_target(field) {
            error!(conversation_id = %session.conversation_id, error = %e, "rate field missing");
            session.add_rate = false;
            return self.show_overview(session);
        }
        session.add_rate = true;
        self.await_input(session)
    }

    async fn assemble(&self, session: &mut ProposalSession) -> Vec<Outbound> {
        let proposal = match collect_proposal(session, &self.registry).await {
            Ok(proposal) => proposal,
            Err(e) => {
                error!(conversation_id = %session.conversation_id, error = %e, "failed to collect proposal");
                return vec![Outbound::notice(reply::DOCUMENT_FAILED)];
            }
        };

        match self.assembler.render(&proposal).await {
            Ok(document) => {
                info!(
                    conversation_id = %session.conversation_id,
                    engineers = proposal.engineers.len(),
                    filename = %document.filename,
                    "proposal document assembled"
                );
                session.state = ConversationState::Completed;
                vec![Outbound::Document { document }]
            }
            Err(e) => {
                error!(conversation_id = %session.conversation_id, error = %e, "document rendering failed");
                vec![Outbound::notice(reply::DOCUMENT_FAILED)]
            }
        }
    }

    async fn render_sample(&self, session: &mut ProposalSession) -> Vec<Outbound> {
        match self.assembler.render(&sample_proposal()).await {
            Ok(document) => {
                session.state = ConversationState::Completed;
                vec![Outbound::Document { document }]
            }
            Err(e) => {
                error!(conversation_id = %session.conversation_id, error = %e, "sample rendering failed");
                vec![Outbound::notice(reply::DOCUMENT_FAILED)]
            }
        }
    }

    fn await_input(&self, session: &mut ProposalSession) -> Vec<Outbound> {
        let entry = session
            .cursor
            .field()
            .and_then(|id| session.active_catalog()?.get(id));
        match entry {
            Some(entry) => {
                let prompt = reply::prompt(entry);
                session.state = ConversationState::AwaitingFieldInput;
                vec![prompt]
            }
            None => self.show_overview(session),
        }
    }

    fn reprompt(&self, session: &mut ProposalSession, notice: &str) -> Vec<Outbound> {
        let mut replies = vec![Outbound::notice(notice)];
        replies.extend(self.await_input(session));
        replies
    }

    fn show_overview(&self, session: &mut ProposalSession) -> Vec<Outbound> {
        session.state = ConversationState::Overview;
        reply::overview(session)
    }

    async fn record_menu(&self, session: &ProposalSession) -> Outbound {
        match available_engineers(session, &self.registry).await {
            Ok(engineers) => reply::record_menu(&engineers),
            Err(e) => {
                error!(conversation_id = %session.conversation_id, error = %e, "failed to list engineers");
                reply::record_menu(&[])
            }
        }
    }

    /// Replies describing the session's current state, without changing it.
    async fn render_state(&self, session: &ProposalSession) -> Vec<Outbound> {
        match session.state {
            ConversationState::SelectingAction => reply::start(),
            ConversationState::AwaitingFieldInput => session
                .cursor
                .field()
                .and_then(|id| session.active_catalog()?.get(id))
                .map(|entry| vec![reply::prompt(entry)])
                .unwrap_or_else(|| reply::overview(session)),
            ConversationState::Overview => reply::overview(session),
            ConversationState::Completed => vec![Outbound::notice(reply::FINISHED)],
            ConversationState::ChoosingFieldToEdit => vec![reply::edit_menu(session)],
            ConversationState::ChoosingRecord => vec![self.record_menu(session).await],
        }
    }
}

fn expects_photo(session: &ProposalSession) -> bool {
    session.active_kind == Some(CatalogKind::AddNewEngineer)
        && session.cursor.field().is_some_and(|id| id.as_str() == PHOTO_FIELD)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::Ordering;

    use proposer_types::document::CollectedProposal;

    use super::*;
    use crate::attachment::tests::{FlakyFetcher, MemoryStore, RejectingFetcher};
    use crate::document::tests::RecordingAssembler;
    use crate::linkage::rate_field_id;
    use crate::linkage::tests::MemoryRegistry;
    use crate::repository::draft::ProposalDraftSummary;

    #[derive(Default)]
    struct MemoryDrafts {
        saved: Mutex<Vec<ProposalDraft>>,
    }

    impl ProposalDraftStore for MemoryDrafts {
        async fn save_draft(&self, draft: ProposalDraft) -> Result<(), RepositoryError> {
            let mut saved = self.saved.lock().unwrap();
            saved.retain(|d| d.conversation_id != draft.conversation_id);
            saved.push(draft);
            Ok(())
        }

        async fn load_draft(
            &self,
            conversation_id: &ConversationId,
        ) -> Result<Option<ProposalDraft>, RepositoryError> {
            Ok(self
                .saved
                .lock()
                .unwrap()
                .iter()
                .find(|d| &d.conversation_id == conversation_id)
                .cloned())
        }

        async fn list_drafts(&self) -> Result<Vec<ProposalDraftSummary>, RepositoryError> {
            Ok(Vec::new())
        }

        async fn delete_draft(&self, conversation_id: &ConversationId) -> Result<(), RepositoryError> {
            self.saved
                .lock()
                .unwrap()
                .retain(|d| &d.conversation_id != conversation_id);
            Ok(())
        }
    }

    type TestController =
        ConversationController<MemoryRegistry, MemoryDrafts, RecordingAssembler, FlakyFetcher, MemoryStore>;

    fn controller_with(registry: MemoryRegistry, fetcher: FlakyFetcher) -> TestController {
        ConversationController::new(
            registry,
            MemoryDrafts::default(),
            RecordingAssembler::default(),
            fetcher,
            MemoryStore::default(),
            GlobalConfig::default(),
        )
    }

    fn controller() -> TestController {
        controller_with(MemoryRegistry::default(), FlakyFetcher::failing(0))
    }

    fn chat() -> ConversationId {
        ConversationId::new("chat-1")
    }

    async fn text(c: &TestController, value: &str) -> Vec<Outbound> {
        c.handle(&chat(), Inbound::Text { text: value.to_string() }).await
    }

    async fn press(c: &TestController, action: Action) -> Vec<Outbound> {
        c.handle(&chat(), Inbound::Action { token: action.to_token() }).await
    }

    async fn state(c: &TestController) -> ConversationState {
        c.sessions().get_or_create(&chat()).lock().await.state
    }

    fn is_overview(replies: &[Outbound]) -> bool {
        replies.contains(&Outbound::text(reply::OVERVIEW_HEADER))
    }

    fn has_notice(replies: &[Outbound], text: &str) -> bool {
        replies.contains(&Outbound::notice(text))
    }

    async fn fill_proposal(c: &TestController) {
        c.handle(&chat(), Inbound::Start).await;
        press(c, Action::InitCatalog(CatalogKind::CreateProposal)).await;
        for value in ["Portal", "Northwind", "Rebuild", "Everything", "12 weeks"] {
            text(c, value).await;
        }
    }

    async fn add_engineer(c: &TestController, name: &str) -> Vec<Outbound> {
        press(c, Action::InitCatalog(CatalogKind::AddNewEngineer)).await;
        text(c, name).await;
        text(c, "Developer").await;
        text(c, "5 years").await;
        c.handle(&chat(), Inbound::Photo { reference: "file-1".to_string() }).await
    }

    #[tokio::test]
    async fn test_start_sends_greeting_and_menu() {
        let c = controller();
        let replies = c.handle(&chat(), Inbound::Start).await;

        assert_eq!(replies, reply::start());
        assert_eq!(state(&c).await, ConversationState::SelectingAction);
    }

    #[tokio::test]
    async fn test_full_pass_reaches_overview_exactly_once() {
        let c = controller();
        c.handle(&chat(), Inbound::Start).await;
        let first = press(&c, Action::InitCatalog(CatalogKind::CreateProposal)).await;
        assert!(matches!(&first[0], Outbound::Prompt { label, .. } if label == "Title"));

        let mut overviews = 0;
        for value in ["Portal", "Northwind", "Rebuild", "Everything", "12 weeks"] {
            assert_eq!(state(&c).await, ConversationState::AwaitingFieldInput);
            if is_overview(&text(&c, value).await) {
                overviews += 1;
            }
        }
        assert_eq!(overviews, 1);
        assert_eq!(state(&c).await, ConversationState::Overview);

        // Further text does not re-enter the overview
        let replies = text(&c, "extra").await;
        assert!(!is_overview(&replies));
        assert!(has_notice(&replies, reply::USE_BUTTONS));
    }

    #[tokio::test]
    async fn test_edit_changes_only_the_chosen_field() {
        let c = controller();
        fill_proposal(&c).await;

        press(&c, Action::Edit).await;
        assert_eq!(state(&c).await, ConversationState::ChoosingFieldToEdit);
        let replies = press(&c, Action::EditField(FieldId::new("title"))).await;
        assert!(matches!(&replies[0], Outbound::Prompt { label, .. } if label == "Title"));

        let replies = text(&c, "Portal v2").await;
        assert!(is_overview(&replies));
        assert_eq!(state(&c).await, ConversationState::Overview);

        let handle = c.sessions().get_or_create(&chat());
        let session = handle.lock().await;
        let catalog = session.catalog(CatalogKind::CreateProposal).unwrap();
        let values: Vec<&str> = catalog.filled().map(|(_, v)| v).collect();
        assert_eq!(values, vec!["Portal v2", "Northwind", "Rebuild", "Everything", "12 weeks"]);
    }

    #[tokio::test]
    async fn test_unknown_edit_field_returns_to_overview() {
        let c = controller();
        fill_proposal(&c).await;
        press(&c, Action::Edit).await;

        let replies = press(&c, Action::EditField(FieldId::new("budget"))).await;

        assert!(has_notice(&replies, reply::UNKNOWN_FIELD));
        assert!(is_overview(&replies));
        assert_eq!(state(&c).await, ConversationState::Overview);
    }

    #[tokio::test]
    async fn test_stale_action_leaves_state() {
        let c = controller();
        fill_proposal(&c).await;

        let replies = press(&c, Action::Continue).await;

        assert!(has_notice(&replies, reply::STALE_EVENT));
        assert_eq!(state(&c).await, ConversationState::Overview);
    }

    #[tokio::test]
    async fn test_undecodable_token_is_a_notice() {
        let c = controller();
        c.handle(&chat(), Inbound::Start).await;
        let replies = c
            .handle(&chat(), Inbound::Action { token: "x:explode".to_string() })
            .await;
        assert!(has_notice(&replies, reply::STALE_EVENT));
        assert_eq!(state(&c).await, ConversationState::SelectingAction);
    }

    #[tokio::test]
    async fn test_add_info_completion_saves_draft() {
        let c = controller();
        fill_proposal(&c).await;
        press(&c, Action::InitCatalog(CatalogKind::AddInfo)).await;
        for value in ["USD 10k", "Jane", "None"] {
            text(&c, value).await;
        }

        assert_eq!(state(&c).await, ConversationState::Overview);
        let draft = c.drafts().load_draft(&chat()).await.unwrap().unwrap();
        let restored = draft.to_session().unwrap();
        assert_eq!(
            restored.catalog(CatalogKind::AddInfo).unwrap().filled().count(),
            3
        );
    }

    #[tokio::test]
    async fn test_rate_loop_assembles_once_with_all_rates() {
        let registry = MemoryRegistry::with_names(&["Ada", "Grace"]);
        let ada = registry.id_of("Ada");
        let grace = registry.id_of("Grace");
        let c = controller_with(registry, FlakyFetcher::failing(0));
        fill_proposal(&c).await;

        press(&c, Action::ChooseEngineers).await;
        assert_eq!(state(&c).await, ConversationState::ChoosingRecord);

        let replies = press(&c, Action::PickEngineer(ada)).await;
        assert!(matches!(&replies[0], Outbound::Prompt { label, .. } if label == "Current rate for Ada"));
        let replies = text(&c, "USD 50/h").await;
        assert_eq!(state(&c).await, ConversationState::ChoosingRecord);
        // Ada is no longer offered
        let Outbound::Keyboard { rows, .. } = &replies[0] else {
            panic!("expected record menu");
        };
        assert!(!rows.iter().flatten().any(|b| b.text == "Ada"));

        press(&c, Action::PickEngineer(grace)).await;
        text(&c, "USD 60/h").await;

        let replies = press(&c, Action::Continue).await;
        assert!(matches!(&replies[0], Outbound::Document { .. }));
        assert_eq!(state(&c).await, ConversationState::Completed);

        let rendered = c.assembler.rendered.lock().unwrap();
        assert_eq!(rendered.len(), 1);
        let proposal: &CollectedProposal = &rendered[0];
        assert_eq!(proposal.fields.get(&ada.to_string()).map(String::as_str), Some("USD 50/h"));
        assert_eq!(proposal.fields.get(&grace.to_string()).map(String::as_str), Some("USD 60/h"));
        assert_eq!(proposal.fields.get("title").map(String::as_str), Some("Portal"));
        assert_eq!(proposal.engineers.len(), 2);
    }

    #[tokio::test]
    async fn test_continue_asks_for_abandoned_rate_before_assembling() {
        let registry = MemoryRegistry::with_names(&["Ada"]);
        let ada = registry.id_of("Ada");
        let c = controller_with(registry, FlakyFetcher::failing(0));
        fill_proposal(&c).await;

        press(&c, Action::ChooseEngineers).await;
        press(&c, Action::PickEngineer(ada)).await;
        press(&c, Action::Overview).await;
        let replies = press(&c, Action::ChooseEngineers).await;
        let Outbound::Keyboard { rows, .. } = &replies[0] else {
            panic!("expected record menu");
        };
        assert!(!rows.iter().flatten().any(|b| b.text == "Ada"));

        let replies = press(&c, Action::Continue).await;

        assert!(has_notice(&replies, reply::RATES_PENDING));
        assert!(matches!(&replies[1], Outbound::Prompt { label, .. } if label == "Current rate for Ada"));
        assert_eq!(state(&c).await, ConversationState::AwaitingFieldInput);
        assert!(c.assembler.rendered.lock().unwrap().is_empty());

        let replies = text(&c, "USD 50/h").await;
        assert!(matches!(&replies[0], Outbound::Keyboard { text, .. } if text == reply::RECORD_MENU));
        assert_eq!(state(&c).await, ConversationState::ChoosingRecord);

        let replies = press(&c, Action::Continue).await;
        assert!(matches!(&replies[0], Outbound::Document { .. }));
        let rendered = c.assembler.rendered.lock().unwrap();
        assert_eq!(rendered.len(), 1);
        assert_eq!(rendered[0].engineers[0].rate.as_deref(), Some("USD 50/h"));
    }

    #[tokio::test]
    async fn test_completed_conversation_rejects_actions() {
        let c = controller();
        fill_proposal(&c).await;
        press(&c, Action::ChooseEngineers).await;
        press(&c, Action::Continue).await;
        assert_eq!(state(&c).await, ConversationState::Completed);

        for action in [Action::Overview, Action::ChooseEngineers, Action::Continue, Action::Edit] {
            let replies = press(&c, action).await;
            assert_eq!(replies, vec![Outbound::notice(reply::FINISHED)]);
            assert_eq!(state(&c).await, ConversationState::Completed);
        }
        assert_eq!(c.assembler.rendered.lock().unwrap().len(), 1);

        // A new conversation starts over
        let replies = c.handle(&chat(), Inbound::Start).await;
        assert_eq!(replies, reply::start());
        assert_eq!(state(&c).await, ConversationState::SelectingAction);
    }

    #[tokio::test]
    async fn test_same_engineer_is_never_linked_twice() {
        let registry = MemoryRegistry::with_names(&["Ada"]);
        let ada = registry.id_of("Ada");
        let c = controller_with(registry, FlakyFetcher::failing(0));
        fill_proposal(&c).await;
        press(&c, Action::ChooseEngineers).await;
        press(&c, Action::PickEngineer(ada)).await;
        text(&c, "USD 50/h").await;

        // Stale button for an already linked engineer
        let replies = press(&c, Action::PickEngineer(ada)).await;

        assert!(matches!(&replies[0], Outbound::Keyboard { text, .. } if text == reply::RECORD_MENU));
        assert_eq!(state(&c).await, ConversationState::ChoosingRecord);
        let handle = c.sessions().get_or_create(&chat());
        let session = handle.lock().await;
        assert_eq!(session.linked_engineers, vec![ada]);
        let rates = session.catalog(CatalogKind::AddEngineerRate).unwrap();
        assert_eq!(rates.len(), 1);
        assert_eq!(
            rates.get(&rate_field_id(&ada)).unwrap().content.as_deref(),
            Some("USD 50/h")
        );
    }

    #[tokio::test]
    async fn test_new_engineer_is_persisted_with_photo_path() {
        let c = controller();
        fill_proposal(&c).await;
        press(&c, Action::ChooseEngineers).await;

        let replies = add_engineer(&c, "Ada").await;

        assert!(has_notice(&replies, "Ada was added to the registry."));
        assert!(is_overview(&replies));
        assert_eq!(state(&c).await, ConversationState::Overview);
        let engineers = c.registry().engineers.lock().unwrap();
        assert_eq!(engineers.len(), 1);
        let photo = engineers[0].fields.get(PHOTO_FIELD).unwrap();
        assert!(photo.starts_with("engineers_photo/"));
    }

    #[tokio::test]
    async fn test_duplicate_engineer_is_a_notice() {
        let c = controller_with(MemoryRegistry::with_names(&["Ada"]), FlakyFetcher::failing(0));
        fill_proposal(&c).await;
        press(&c, Action::ChooseEngineers).await;

        let replies = add_engineer(&c, "Ada").await;

        assert!(has_notice(&replies, reply::DUPLICATE_ENGINEER));
        assert!(is_overview(&replies));
        assert_eq!(state(&c).await, ConversationState::Overview);
        assert_eq!(c.registry().engineers.lock().unwrap().len(), 1);

        // The conversation goes on
        let replies = press(&c, Action::ChooseEngineers).await;
        assert!(matches!(&replies[0], Outbound::Keyboard { text, .. } if text == reply::RECORD_MENU));
    }

    #[tokio::test]
    async fn test_failed_photo_reprompts_same_field() {
        let c = controller_with(MemoryRegistry::default(), FlakyFetcher::failing(10));
        fill_proposal(&c).await;
        press(&c, Action::ChooseEngineers).await;

        let replies = add_engineer(&c, "Ada").await;

        assert!(has_notice(&replies, reply::PHOTO_FAILED));
        assert!(matches!(&replies[1], Outbound::Prompt { attachment: true, .. }));
        assert_eq!(state(&c).await, ConversationState::AwaitingFieldInput);
        // One attempt plus the default single retry
        assert_eq!(c.fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_timed_out_photo_is_asked_again_then_accepted() {
        // Both attempts of the first upload time out
        let c = controller_with(MemoryRegistry::default(), FlakyFetcher::failing(2));
        fill_proposal(&c).await;
        press(&c, Action::ChooseEngineers).await;

        let replies = add_engineer(&c, "Ada").await;

        assert_eq!(
            replies,
            vec![
                Outbound::notice(reply::PHOTO_FAILED),
                Outbound::Prompt { label: "Photo".to_string(), attachment: true },
            ]
        );
        assert!(c.registry().engineers.lock().unwrap().is_empty());

        let replies = c
            .handle(&chat(), Inbound::Photo { reference: "file-2".to_string() })
            .await;

        assert!(has_notice(&replies, "Ada was added to the registry."));
        assert_eq!(c.registry().engineers.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_photo_has_its_own_notice() {
        let c = ConversationController::new(
            MemoryRegistry::default(),
            MemoryDrafts::default(),
            RecordingAssembler::default(),
            RejectingFetcher::default(),
            MemoryStore::default(),
            GlobalConfig::default(),
        );
        let id = chat();
        c.handle(&id, Inbound::Start).await;
        c.handle(&id, Inbound::Action { token: Action::InitCatalog(CatalogKind::CreateProposal).to_token() }).await;
        for value in ["Portal", "Northwind", "Rebuild", "Everything", "12 weeks"] {
            c.handle(&id, Inbound::Text { text: value.to_string() }).await;
        }
        c.handle(&id, Inbound::Action { token: Action::ChooseEngineers.to_token() }).await;
        c.handle(&id, Inbound::Action { token: Action::InitCatalog(CatalogKind::AddNewEngineer).to_token() }).await;
        for value in ["Ada", "Developer", "5 years"] {
            c.handle(&id, Inbound::Text { text: value.to_string() }).await;
        }

        let replies = c
            .handle(&id, Inbound::Photo { reference: "/etc/passwd".to_string() })
            .await;

        assert!(has_notice(&replies, reply::PHOTO_REJECTED));
        assert!(matches!(&replies[1], Outbound::Prompt { attachment: true, .. }));
        // Rejections are not retried
        assert_eq!(c.fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_text_for_photo_field_reprompts() {
        let c = controller();
        fill_proposal(&c).await;
        press(&c, Action::ChooseEngineers).await;
        press(&c, Action::InitCatalog(CatalogKind::AddNewEngineer)).await;
        for value in ["Ada", "Developer", "5 years"] {
            text(&c, value).await;
        }

        let replies = text(&c, "no photo").await;

        assert!(has_notice(&replies, reply::EXPECTS_PHOTO));
        assert_eq!(state(&c).await, ConversationState::AwaitingFieldInput);
    }

    #[tokio::test]
    async fn test_back_to_overview_then_resume_pass() {
        let c = controller();
        c.handle(&chat(), Inbound::Start).await;
        press(&c, Action::InitCatalog(CatalogKind::CreateProposal)).await;
        text(&c, "Portal").await;

        let replies = press(&c, Action::Overview).await;
        assert!(is_overview(&replies));

        let replies = press(&c, Action::Resume).await;
        assert!(matches!(&replies[0], Outbound::Prompt { label, .. } if label == "Client"));
        assert_eq!(state(&c).await, ConversationState::AwaitingFieldInput);
    }

    #[tokio::test]
    async fn test_sample_document() {
        let c = controller();
        c.handle(&chat(), Inbound::Start).await;

        let replies = press(&c, Action::Sample).await;

        assert!(matches!(&replies[0], Outbound::Document { .. }));
        assert_eq!(state(&c).await, ConversationState::Completed);
        assert_eq!(c.assembler.rendered.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_render_failure_keeps_record_selection() {
        let c = ConversationController::new(
            MemoryRegistry::default(),
            MemoryDrafts::default(),
            RecordingAssembler { fail: true, ..Default::default() },
            FlakyFetcher::failing(0),
            MemoryStore::default(),
            GlobalConfig::default(),
        );
        c.handle(&chat(), Inbound::Start).await;
        press(&c, Action::InitCatalog(CatalogKind::CreateProposal)).await;
        for value in ["a", "b", "c", "d", "e"] {
            c.handle(&chat(), Inbound::Text { text: value.to_string() }).await;
        }
        press(&c, Action::ChooseEngineers).await;

        let replies = press(&c, Action::Continue).await;

        assert!(replies.contains(&Outbound::notice(reply::DOCUMENT_FAILED)));
        assert_eq!(
            c.sessions().get_or_create(&chat()).lock().await.state,
            ConversationState::ChoosingRecord
        );
    }

    #[tokio::test]
    async fn test_cancel_discards_session() {
        let c = controller();
        fill_proposal(&c).await;

        c.handle(&chat(), Inbound::Cancel).await;

        assert!(!c.sessions().contains(&chat()));
        // Reading the state after a cancel must not bring the session back
        assert!(c.sessions().get(&chat()).is_none());
        assert!(c.sessions().is_empty());
    }

    #[tokio::test]
    async fn test_resume_restores_draft() {
        let c = controller();
        fill_proposal(&c).await;
        let snapshot = {
            let handle = c.sessions().get_or_create(&chat());
            let session = handle.lock().await;
            ProposalDraft::from_session(&session).unwrap()
        };
        c.handle(&chat(), Inbound::Cancel).await;

        let replies = c.resume(&snapshot).await.unwrap();

        assert!(is_overview(&replies));
        assert_eq!(state(&c).await, ConversationState::Overview);
    }
}
