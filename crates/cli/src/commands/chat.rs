//! `chatmate chat` — interactive conversation on stdin.

use chatmate_agent::AgentError;
use std::io::Write;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run(config_path: Option<&Path>, stream: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let mut session = super::new_session(&config)?;

    println!();
    println!(
        "  Chat-Mate — {} / {}",
        config.default_provider,
        session.controller().engine().model()
    );
    println!("  Tools: {}", session.controller().tools().names().join(", "));
    println!("  Type 'exit', 'quit' or Ctrl+D to leave. Ctrl+C cancels the current answer.");
    println!();
    if let Some(greeting) = session.transcript().last() {
        println!("  Assistant > {}", greeting.content());
        println!();
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if is_exit(question) {
            break;
        }

        let display = stream.then(|| super::live::spawn(session.events()));
        let cancel = super::ask::cancel_on_ctrl_c();
        let result = session.ask_with_cancel(question, &cancel).await;
        cancel.cancel();
        if let Some(display) = display {
            let _ = display.await;
        }

        match result {
            Ok(outcome) => {
                println!();
                for line in super::format_answer(&outcome).lines() {
                    println!("  Assistant > {line}");
                }
                println!();
            }
            Err(AgentError::Cancelled) => {
                eprintln!("  [Cancelled]");
                println!();
            }
            Err(e) => {
                eprintln!("  [Error] {e}");
                println!();
            }
        }
    }

    println!();
    println!("  Goodbye!");
    Ok(())
}

fn is_exit(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_words() {
        assert!(is_exit("exit"));
        assert!(is_exit("QUIT"));
        assert!(!is_exit("exit strategy for startups"));
    }
}
