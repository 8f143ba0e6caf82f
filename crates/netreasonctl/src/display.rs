//! Terminal output for answers, reasoning chains and errors.

use netreason_common::{QueryOutcome, ReasoningChain};
use owo_colors::OwoColorize;

const RULE_WIDTH: usize = 50;
const STEP_RULE_WIDTH: usize = 30;

/// Plain-text view of a chain: stage in uppercase, confidence, a rule, then
/// the content
pub fn render_explain(chain: &ReasoningChain) -> String {
    let mut out = String::new();
    out.push_str("Reasoning Chain:\n");
    out.push_str(&"=".repeat(RULE_WIDTH));
    out.push('\n');
    for step in chain.steps() {
        out.push_str(&format!(
            "\n{}:\nConfidence: {:.2}\n{}\n{}\n",
            step.stage.as_str().to_uppercase(),
            step.confidence,
            "-".repeat(STEP_RULE_WIDTH),
            step.content
        ));
    }
    out.push('\n');
    out.push_str(&"=".repeat(RULE_WIDTH));
    out
}

pub fn print_banner(model: &str) {
    println!();
    println!("{}", "NetReason".bright_cyan().bold());
    println!("{}", format!("Web-augmented reasoning on {}", model).dimmed());
    println!(
        "{}",
        "Commands: explain, clear, system <prompt>, quit".dimmed()
    );
}

pub fn print_answer(answer: &str) {
    println!();
    println!("{} {}", "Assistant:".bright_green().bold(), answer);
}

pub fn print_explain_hint() {
    println!("{}", "Type 'explain' to see the reasoning process".dimmed());
}

pub fn print_explain(chain: Option<&ReasoningChain>) {
    match chain {
        Some(chain) => println!("\n{}", render_explain(chain)),
        None => println!("{}", "No reasoning yet. Ask something first.".yellow()),
    }
}

pub fn print_notice(message: &str) {
    println!("{}", message.bright_blue());
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".bright_red(), message);
}

/// JSON document for `ask --json`
pub fn outcome_json(outcome: &QueryOutcome) -> serde_json::Value {
    serde_json::json!({
        "answer": outcome.answer,
        "branch": outcome.branch,
        "reasoning": outcome.chain.steps(),
    })
}
