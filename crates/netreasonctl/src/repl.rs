//! REPL - interactive chat loop
//!
//! Queries run against the session and race Ctrl-C; an interrupted query
//! leaves the conversation untouched.

use crate::display;
use crate::spinner::SpinnerSink;
use anyhow::Result;
use netreason_common::Session;
use owo_colors::OwoColorize;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Quit,
    Clear,
    Explain,
    System(String),
    Empty,
    Query(String),
}

const SYSTEM_PREFIX: &str = "system ";

/// Classify one input line. Commands are case-insensitive.
pub fn parse_command(line: &str) -> ReplCommand {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ReplCommand::Empty;
    }

    match trimmed.to_lowercase().as_str() {
        "quit" | "exit" => return ReplCommand::Quit,
        "clear" => return ReplCommand::Clear,
        "explain" => return ReplCommand::Explain,
        _ => {}
    }

    if let Some(head) = trimmed.get(..SYSTEM_PREFIX.len()) {
        if head.eq_ignore_ascii_case(SYSTEM_PREFIX) {
            return ReplCommand::System(trimmed[SYSTEM_PREFIX.len()..].trim().to_string());
        }
    }

    ReplCommand::Query(trimmed.to_string())
}

fn prompt() {
    print!("\n{} ", "You:".bright_cyan().bold());
    let _ = std::io::stdout().flush();
}

/// Run the chat loop until quit, EOF or Ctrl-C at the prompt
pub async fn run(session: &mut Session, spinner: Arc<SpinnerSink>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        prompt();
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            println!();
            break;
        };

        match parse_command(&line) {
            ReplCommand::Empty => continue,
            ReplCommand::Quit => break,
            ReplCommand::Clear => match session.clear() {
                Ok(()) => display::print_notice("Conversation history cleared."),
                Err(e) => display::print_error(&e.to_string()),
            },
            ReplCommand::Explain => display::print_explain(session.last_reasoning()),
            ReplCommand::System(system_prompt) => match session.set_system_prompt(&system_prompt) {
                Ok(()) => display::print_notice("System prompt updated."),
                Err(e) => display::print_error(&e.to_string()),
            },
            ReplCommand::Query(text) => ask(session, &spinner, &text).await,
        }
    }

    println!("{}", "Goodbye!".dimmed());
    Ok(())
}

async fn ask(session: &mut Session, spinner: &SpinnerSink, text: &str) {
    spinner.start();
    let result = tokio::select! {
        result = session.query(text) => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };
    spinner.finish();

    match result {
        None => {
            debug!("Query interrupted");
            display::print_notice("Query cancelled.");
        }
        Some(Err(e)) => display::print_error(&e.to_string()),
        Some(Ok(outcome)) => {
            display::print_answer(&outcome.answer);
            if let Err(e) = session.record(text, &outcome) {
                display::print_error(&format!("Exchange not kept in memory: {}", e));
            }
            display::print_explain_hint();
        }
    }
}
