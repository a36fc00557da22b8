//! The `lingualab train` command: a console transport for the engine.
//!
//! Every question is printed with numbered options; the learner types a
//! number per line. `q` closes the session. End of input leaves the session
//! open so the next `train` run resumes it.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use lingualab_core::model::{DictionaryId, Question};
use lingualab_core::traits::UserDirectory;

use super::Workspace;

pub async fn execute(user: i64, dictionary: i64, config_path: Option<PathBuf>) -> Result<()> {
    let workspace = Workspace::open(config_path.as_deref())?;
    let engine = workspace.engine();
    let learner = workspace.store.get_or_create(user).await?;

    let outcome = engine
        .start(learner.id, DictionaryId(dictionary))
        .await
        .with_context(|| format!("cannot train on dictionary {dictionary}"))?;
    let session_id = outcome.session_id;
    if outcome.resumed {
        println!("Resuming your open session.");
    }

    let mut question = outcome.question;
    print_question(&question);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut quit = false;
    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("q") {
            quit = true;
            break;
        }

        let Some(chosen) = input
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|index| question.option_id(index))
        else {
            println!(
                "Type an option number from 1 to {}, or q to stop.",
                question.options.len()
            );
            continue;
        };

        let result = engine
            .submit_answer(session_id, chosen, question.presented_word_pair_id)
            .await?;
        if result.correct {
            println!("Correct!");
        } else {
            println!(
                "Wrong. {} = {}",
                question.prompt_word, result.correct_translation
            );
        }

        match result.next_question {
            Some(next) => {
                question = next;
                print_question(&question);
            }
            None => {
                println!("This dictionary has no words left.");
                quit = true;
                break;
            }
        }
    }

    let summary = engine.summary(session_id).await?;
    if quit {
        engine.close(session_id).await?;
        println!(
            "Session closed: {} of {} correct.",
            summary.correct, summary.answered
        );
    } else {
        println!(
            "Session paused after {} answers. Run train again to continue.",
            summary.answered
        );
    }

    Ok(())
}

fn print_question(question: &Question) {
    println!("\nTranslate: {}", question.prompt_word);
    for (i, option) in question.options.iter().enumerate() {
        println!("  {}) {option}", i + 1);
    }
}
