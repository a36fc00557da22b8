//! The `lingualab stats` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use lingualab_core::model::DictionaryId;
use lingualab_core::traits::UserDirectory;

use super::Workspace;

pub async fn execute(user: i64, dictionary: i64, config_path: Option<PathBuf>) -> Result<()> {
    let workspace = Workspace::open(config_path.as_deref())?;
    let learner = workspace.store.get_or_create(user).await?;
    let progress = workspace
        .engine()
        .progress(learner.id, DictionaryId(dictionary))
        .await?;

    let mut table = Table::new();
    table.set_header(vec!["Level", "Words"]);
    for (level, count) in [
        ("Untested", progress.untested),
        ("Last incorrect", progress.last_incorrect),
        ("Learning", progress.learning),
        ("Mastered", progress.mastered),
    ] {
        table.add_row(vec![Cell::new(level), Cell::new(count)]);
    }

    println!("Dictionary {dictionary}: {} words", progress.total_words);
    println!("{table}");
    println!(
        "Answers: {} ({} correct, {:.1}% accuracy)",
        progress.answers,
        progress.correct_answers,
        progress.accuracy * 100.0
    );

    Ok(())
}
