//! CLI integration tests using assert_cmd.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn lingualab(dir: &Path) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("lingualab").unwrap();
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env_remove("LINGUALAB_MODERATORS")
        .env_remove("LINGUALAB_DATA_FILE")
        .env_remove("RUST_LOG");
    cmd
}

/// A workspace with the starter config and word list imported as dictionary 1.
fn imported() -> TempDir {
    let dir = TempDir::new().unwrap();
    lingualab(dir.path()).arg("init").assert().success();
    lingualab(dir.path())
        .args(["import", "--file", "words.csv", "--as-user", "1"])
        .assert()
        .success();
    dir
}

#[test]
fn init_creates_files() {
    let dir = TempDir::new().unwrap();

    lingualab(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created lingualab.toml"))
        .stdout(predicate::str::contains("Created words.csv"));

    assert!(dir.path().join("lingualab.toml").exists());
    assert!(dir.path().join("words.csv").exists());
}

#[test]
fn init_skips_existing_files() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("words.csv"), "sun,сонце\n").unwrap();

    lingualab(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("words.csv already exists, skipping."));

    let words = std::fs::read_to_string(dir.path().join("words.csv")).unwrap();
    assert_eq!(words, "sun,сонце\n");
}

#[test]
fn list_without_dictionaries() {
    let dir = TempDir::new().unwrap();
    lingualab(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No dictionaries yet"));
}

#[test]
fn import_then_list() {
    let dir = TempDir::new().unwrap();
    lingualab(dir.path()).arg("init").assert().success();

    lingualab(dir.path())
        .args(["import", "--file", "words.csv", "--as-user", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Created dictionary 1 \"words.csv\": 6 words",
        ));

    lingualab(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("words.csv"))
        .stdout(predicate::str::contains("6"));

    assert!(dir.path().join("lingualab-data.json").exists());
}

#[test]
fn import_with_name() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("a.csv"), "cat,кіт\ndog,пес\n").unwrap();

    lingualab(dir.path())
        .args(["import", "--file", "a.csv", "--name", "Animals", "--as-user", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"Animals\": 2 words"));
}

#[test]
fn import_replaces_dictionary() {
    let dir = imported();
    std::fs::write(dir.path().join("more.csv"), "sun,сонце\nmoon,місяць\n").unwrap();

    lingualab(dir.path())
        .args([
            "import", "--file", "more.csv", "--replace", "1", "--as-user", "1",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Replaced dictionary 1 \"words.csv\": 2 words",
        ));
}

#[test]
fn import_rejects_non_moderators() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("lingualab.toml"), "moderators = [5]\n").unwrap();
    std::fs::write(dir.path().join("a.csv"), "cat,кіт\n").unwrap();

    lingualab(dir.path())
        .args(["import", "--file", "a.csv", "--as-user", "7"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"))
        .stderr(predicate::str::contains("not allowed"));

    lingualab(dir.path())
        .args(["import", "--file", "a.csv", "--as-user", "5"])
        .assert()
        .success();
}

#[test]
fn moderators_from_environment() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("a.csv"), "cat,кіт\n").unwrap();

    lingualab(dir.path())
        .env("LINGUALAB_MODERATORS", "5, 6")
        .args(["import", "--file", "a.csv", "--as-user", "7"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not allowed"));
}

#[test]
fn import_rejects_empty_word_list() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("a.csv"), "no commas here\n").unwrap();

    lingualab(dir.path())
        .args(["import", "--file", "a.csv", "--as-user", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no word pairs"));
}

#[test]
fn import_missing_file() {
    let dir = TempDir::new().unwrap();
    lingualab(dir.path())
        .args(["import", "--file", "nonexistent.csv", "--as-user", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read"));
}

#[test]
fn train_answers_and_quits() {
    let dir = imported();

    lingualab(dir.path())
        .args(["train", "--user", "100", "--dictionary", "1"])
        .write_stdin("1\nq\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Translate:"))
        .stdout(predicate::str::contains("  4) "))
        .stdout(predicate::str::contains("Correct!").or(predicate::str::contains("Wrong.")))
        .stdout(predicate::str::contains("Session closed:"))
        .stdout(predicate::str::contains("of 1 correct."));

    lingualab(dir.path())
        .args(["stats", "--user", "100", "--dictionary", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dictionary 1: 6 words"))
        .stdout(predicate::str::contains("Answers: 1"));
}

#[test]
fn train_rejects_bad_input() {
    let dir = imported();

    lingualab(dir.path())
        .args(["train", "--user", "100", "--dictionary", "1"])
        .write_stdin("abc\n9\nq\n")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Type an option number from 1 to 4, or q to stop.",
        ))
        .stdout(predicate::str::contains("Session closed: 0 of 0 correct."));
}

#[test]
fn train_resumes_after_end_of_input() {
    let dir = imported();

    lingualab(dir.path())
        .args(["train", "--user", "100", "--dictionary", "1"])
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::contains("Session paused"));

    lingualab(dir.path())
        .args(["train", "--user", "100", "--dictionary", "1"])
        .write_stdin("q\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Resuming your open session."));
}

#[test]
fn train_unknown_dictionary() {
    let dir = imported();

    lingualab(dir.path())
        .args(["train", "--user", "100", "--dictionary", "9"])
        .write_stdin("q\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("dictionary 9 not found"));
}

#[test]
fn train_needs_enough_distinct_translations() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("a.csv"), "cat,кіт\ndog,пес\n").unwrap();
    lingualab(dir.path())
        .args(["import", "--file", "a.csv", "--as-user", "1"])
        .assert()
        .success();

    lingualab(dir.path())
        .args(["train", "--user", "100", "--dictionary", "1"])
        .write_stdin("q\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not enough distinct translations"));
}

#[test]
fn invalid_config_is_reported() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("lingualab.toml"),
        "[training]\noption_count = 1\n",
    )
    .unwrap();

    lingualab(dir.path())
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("option_count must be at least 2"));
}
