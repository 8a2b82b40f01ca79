//! Terminal transport for the proposal interview (`proposer chat`).
//!
//! Renders controller replies with `console` styling and collects the next
//! event with dialoguer: keyboards become a Select, field prompts an Input.
//! Esc on a menu, or `/quit` at a prompt, saves the session as a draft and
//! exits; `/cancel` discards it.

use std::path::Path;

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Input, Select};
use proposer_core::repository::draft::{ProposalDraft, ProposalDraftStore};
use proposer_infra::filesystem::documents_dir;
use proposer_types::document::RenderedDocument;
use proposer_types::message::{Button, Inbound, Outbound};
use proposer_types::session::ConversationId;

use crate::state::AppState;

const QUIT_COMMAND: &str = "/quit";
const CANCEL_COMMAND: &str = "/cancel";
const SAVE_AND_QUIT: &str = "Save and quit";

/// What the interview is waiting for after a batch of replies.
#[derive(Debug, Clone, PartialEq)]
enum Pending {
    Choice(Vec<Button>),
    Answer { attachment: bool },
    Done,
}

/// What the user asked for at the terminal.
enum Step {
    Send(Inbound),
    Quit,
}

/// Run an interview until a document is delivered or the user leaves.
pub async fn run_chat(state: &AppState, resume: Option<String>) -> Result<()> {
    let controller = &state.controller;
    let documents = documents_dir(&state.data_dir);

    let (id, mut replies) = match resume {
        Some(raw) => {
            let id = ConversationId::new(raw);
            let draft = controller
                .drafts()
                .load_draft(&id)
                .await?
                .with_context(|| format!("No saved draft for conversation '{id}'"))?;
            let replies = controller
                .resume(&draft)
                .await
                .context("Saved draft is unreadable")?;
            (id, replies)
        }
        None => {
            let id = ConversationId::new(format!("cli-{}", uuid::Uuid::now_v7()));
            let replies = controller.handle(&id, Inbound::Start).await;
            (id, replies)
        }
    };
    tracing::debug!(conversation_id = %id, "terminal interview started");

    let mut pending = None;
    loop {
        for reply in &replies {
            show(reply, &documents).await?;
        }
        if let Some(next) = next_pending(&replies) {
            pending = Some(next);
        }

        let step = match &pending {
            None | Some(Pending::Done) => break,
            Some(Pending::Choice(buttons)) => choose(buttons)?,
            Some(Pending::Answer { attachment }) => answer(*attachment)?,
        };

        let event = match step {
            Step::Quit => {
                save_and_quit(state, &id).await?;
                return Ok(());
            }
            Step::Send(event) => event,
        };
        let cancelled = matches!(event, Inbound::Cancel);
        replies = controller.handle(&id, event).await;
        if cancelled {
            for reply in &replies {
                show(reply, &documents).await?;
            }
            controller.drafts().delete_draft(&id).await?;
            return Ok(());
        }
    }

    if matches!(pending, Some(Pending::Done)) {
        controller.drafts().delete_draft(&id).await?;
    }
    Ok(())
}

/// The last interaction the replies ask for, if any.
fn next_pending(replies: &[Outbound]) -> Option<Pending> {
    replies.iter().rev().find_map(|reply| match reply {
        Outbound::Keyboard { rows, .. } => {
            Some(Pending::Choice(rows.iter().flatten().cloned().collect()))
        }
        Outbound::Prompt { attachment, .. } => Some(Pending::Answer {
            attachment: *attachment,
        }),
        Outbound::Document { .. } => Some(Pending::Done),
        _ => None,
    })
}

/// Map user input at a field prompt to the next step.
fn parse_answer(input: &str, attachment: bool) -> Step {
    let trimmed = input.trim();
    match trimmed {
        QUIT_COMMAND => Step::Quit,
        CANCEL_COMMAND => Step::Send(Inbound::Cancel),
        _ if attachment => Step::Send(Inbound::Photo {
            reference: trimmed.to_string(),
        }),
        _ => Step::Send(Inbound::Text {
            text: input.to_string(),
        }),
    }
}

async fn show(reply: &Outbound, documents: &Path) -> Result<()> {
    match reply {
        Outbound::Text { text } => println!("\n{}", style(text).bold()),
        Outbound::Prompt { label, attachment } => {
            println!("\n{}", style(label).cyan().bold());
            if *attachment {
                println!("{}", style("(path or URL of a photo)").dim());
            }
        }
        Outbound::Field { label, content } => {
            println!("  {} {}", style(format!("{label}:")).bold(), content);
        }
        Outbound::Notice { text } => println!("\n{}", style(text).yellow()),
        Outbound::Keyboard { text, .. } => println!("\n{}", style(text).bold()),
        Outbound::Document { document } => {
            let path = write_document(documents, document).await?;
            println!();
            println!(
                "  {} Proposal saved to {}",
                style("✓").green().bold(),
                style(path.display()).cyan()
            );
            println!();
        }
    }
    Ok(())
}

async fn write_document(dir: &Path, document: &RenderedDocument) -> Result<std::path::PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(&document.filename);
    tokio::fs::write(&path, &document.bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

fn choose(buttons: &[Button]) -> Result<Step> {
    let mut items: Vec<&str> = buttons.iter().map(|b| b.text.as_str()).collect();
    items.push(SAVE_AND_QUIT);

    let selection = Select::new().items(&items).default(0).interact_opt()?;
    Ok(match selection.and_then(|i| buttons.get(i)) {
        Some(button) => Step::Send(Inbound::Action {
            token: button.token.clone(),
        }),
        None => Step::Quit,
    })
}

fn answer(attachment: bool) -> Result<Step> {
    let input: String = Input::new().with_prompt(">").interact_text()?;
    Ok(parse_answer(&input, attachment))
}

async fn save_and_quit(state: &AppState, id: &ConversationId) -> Result<()> {
    let handle = state
        .controller
        .sessions()
        .get(id)
        .with_context(|| format!("Conversation '{id}' is no longer live"))?;
    let draft = {
        let session = handle.lock().await;
        ProposalDraft::from_session(&session)?
    };
    state.controller.drafts().save_draft(draft).await?;

    println!();
    println!(
        "  {} Progress saved. Resume with: {}",
        style("*").cyan().bold(),
        style(format!("proposer chat --resume {id}")).yellow()
    );
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proposer_types::action::Action;

    fn document() -> RenderedDocument {
        RenderedDocument {
            filename: "proposal.html".to_string(),
            mime_type: "text/html".to_string(),
            bytes: b"<html></html>".to_vec(),
        }
    }

    #[test]
    fn test_last_interaction_wins() {
        let replies = vec![
            Outbound::text("Info you've provided:"),
            Outbound::Prompt {
                label: "Title".to_string(),
                attachment: false,
            },
            Outbound::Keyboard {
                text: "All good?".to_string(),
                rows: vec![vec![Button::new("Edit", &Action::Edit)]],
            },
        ];

        match next_pending(&replies) {
            Some(Pending::Choice(buttons)) => assert_eq!(buttons[0].token, "edit"),
            other => panic!("expected choice, got {other:?}"),
        }
    }

    #[test]
    fn test_notice_only_keeps_previous_interaction() {
        assert_eq!(next_pending(&[Outbound::notice("Please use the buttons above.")]), None);
    }

    #[test]
    fn test_document_ends_interview() {
        let replies = vec![Outbound::Document {
            document: document(),
        }];
        assert_eq!(next_pending(&replies), Some(Pending::Done));
    }

    #[test]
    fn test_answer_commands() {
        assert!(matches!(parse_answer(" /quit ", false), Step::Quit));
        assert!(matches!(
            parse_answer("/cancel", true),
            Step::Send(Inbound::Cancel)
        ));
    }

    #[test]
    fn test_answer_routes_photo_references() {
        match parse_answer(" /tmp/ada.jpg ", true) {
            Step::Send(Inbound::Photo { reference }) => assert_eq!(reference, "/tmp/ada.jpg"),
            _ => panic!("expected photo"),
        }
        match parse_answer("Acme Corp", false) {
            Step::Send(Inbound::Text { text }) => assert_eq!(text, "Acme Corp"),
            _ => panic!("expected text"),
        }
    }

    #[tokio::test]
    async fn test_write_document_creates_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("documents");

        let path = write_document(&dir, &document()).await.unwrap();

        assert_eq!(path, dir.join("proposal.html"));
        assert_eq!(std::fs::read(&path).unwrap(), b"<html></html>");
    }
}
