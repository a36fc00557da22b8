//! The `lingualab list` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use lingualab_core::traits::WordBank;

use super::Workspace;

pub async fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let workspace = Workspace::open(config_path.as_deref())?;
    let dictionaries = workspace.store.list_dictionaries().await?;

    if dictionaries.is_empty() {
        println!("No dictionaries yet. Run `lingualab import --file <csv> --as-user <id>`.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Words", "Created"]);
    for dictionary in &dictionaries {
        table.add_row(vec![
            Cell::new(dictionary.id),
            Cell::new(&dictionary.name),
            Cell::new(dictionary.word_count),
            Cell::new(dictionary.created_at.format("%Y-%m-%d %H:%M")),
        ]);
    }
    println!("{table}");

    Ok(())
}
