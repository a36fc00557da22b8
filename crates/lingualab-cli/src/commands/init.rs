//! The `lingualab init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    write_if_missing("lingualab.toml", SAMPLE_CONFIG)?;
    write_if_missing("words.csv", SAMPLE_WORDS)?;

    println!("\nNext steps:");
    println!("  1. Add your chat id to `moderators` in lingualab.toml (or leave it empty)");
    println!("  2. Run: lingualab import --file words.csv --as-user <id>");
    println!("  3. Run: lingualab train --user <id> --dictionary 1");

    Ok(())
}

fn write_if_missing(path: &str, content: &str) -> Result<()> {
    if Path::new(path).exists() {
        println!("{path} already exists, skipping.");
    } else {
        std::fs::write(path, content)?;
        println!("Created {path}");
    }
    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# lingualab configuration

# External ids allowed to import dictionaries. Empty means everyone.
moderators = []

max_upload_bytes = 10485760
data_file = "./lingualab-data.json"

[training]
option_count = 4
recent_window = 3
# seed = 42
"#;

const SAMPLE_WORDS: &str = "cat,кіт
dog,пес
car,автомобіль
phone,телефон
city,місто
well,криниця
";
