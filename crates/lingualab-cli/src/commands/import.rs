//! The `lingualab import` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use lingualab_core::model::DictionaryId;

use super::Workspace;

pub async fn execute(
    file: PathBuf,
    name: Option<String>,
    replace: Option<i64>,
    as_user: i64,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let workspace = Workspace::open(config_path.as_deref())?;
    let content = std::fs::read_to_string(&file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let ingestor = workspace.ingestor();

    match replace {
        Some(id) => {
            let dictionary = ingestor
                .replace(as_user, DictionaryId(id), &content)
                .await?;
            println!(
                "Replaced dictionary {} \"{}\": {} words",
                dictionary.id, dictionary.name, dictionary.word_count
            );
        }
        None => {
            let file_name = file.file_name().map(|n| n.to_string_lossy());
            let name = name.as_deref().or(file_name.as_deref());
            let dictionary = ingestor.create(as_user, name, &content).await?;
            println!(
                "Created dictionary {} \"{}\": {} words",
                dictionary.id, dictionary.name, dictionary.word_count
            );
        }
    }

    Ok(())
}
