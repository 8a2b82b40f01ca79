//! `proposer engineers`: list the shared engineer registry.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use proposer_core::repository::engineer::EngineerRegistry;

use crate::cli::format_relative_time;
use crate::state::AppState;

/// Registry fields shown as columns, after the name.
const COLUMNS: [(&str, &str); 3] = [
    ("position", "Position"),
    ("experience", "Experience"),
    ("photo", "Photo"),
];

pub async fn list_engineers(state: &AppState, json: bool) -> Result<()> {
    let engineers = state.controller.registry().list().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&engineers)?);
        return Ok(());
    }

    if engineers.is_empty() {
        println!();
        println!(
            "  {} No engineers yet. Add one during an interview: {}",
            style("i").blue().bold(),
            style("proposer chat").yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    let mut header = vec![Cell::new("Name").fg(Color::White)];
    header.extend(COLUMNS.iter().map(|(_, title)| Cell::new(title).fg(Color::White)));
    header.push(Cell::new("Added").fg(Color::White));
    table.set_header(header);

    for engineer in &engineers {
        let mut row = vec![Cell::new(&engineer.name).fg(Color::Cyan)];
        row.extend(
            COLUMNS
                .iter()
                .map(|(field, _)| Cell::new(engineer.field(field).unwrap_or("-"))),
        );
        row.push(Cell::new(format_relative_time(&engineer.created_at)).fg(Color::DarkGrey));
        table.add_row(row);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} engineer{}",
        style(engineers.len()).bold(),
        if engineers.len() == 1 { "" } else { "s" }
    );
    println!();

    Ok(())
}
