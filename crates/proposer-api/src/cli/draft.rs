//! `proposer drafts`: list saved proposal drafts.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use proposer_core::repository::draft::{ProposalDraftStore, ProposalDraftSummary};

use crate::cli::format_relative_time;
use crate::state::AppState;

pub async fn list_drafts(state: &AppState, json: bool) -> Result<()> {
    let drafts = state.controller.drafts().list_drafts().await?;

    if json {
        let items: Vec<serde_json::Value> = drafts.iter().map(summary_json).collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if drafts.is_empty() {
        println!();
        println!("  {} No saved drafts.", style("i").blue().bold());
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Conversation").fg(Color::White),
        Cell::new("Title").fg(Color::White),
        Cell::new("State").fg(Color::White),
        Cell::new("Updated").fg(Color::White),
    ]);

    for draft in &drafts {
        table.add_row(vec![
            Cell::new(draft.conversation_id.as_str()).fg(Color::Cyan),
            Cell::new(draft.title.as_deref().unwrap_or("(untitled)")),
            Cell::new(draft.state.to_string()),
            Cell::new(format_relative_time(&draft.updated_at)).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  Resume with: {}",
        style("proposer chat --resume <conversation>").yellow()
    );
    println!();

    Ok(())
}

/// JSON shape of a draft listing entry, shared with the REST handler.
pub fn summary_json(draft: &ProposalDraftSummary) -> serde_json::Value {
    serde_json::json!({
        "conversation_id": draft.conversation_id.as_str(),
        "title": draft.title,
        "state": draft.state,
        "updated_at": draft.updated_at.to_rfc3339(),
    })
}
