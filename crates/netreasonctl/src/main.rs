//! NetReason Control - shell for the NetReason reasoning engine
//!
//! `netreasonctl` (or `netreasonctl chat`) starts the REPL,
//! `netreasonctl ask ...` answers once, `netreasonctl config` prints TOML.

use anyhow::{Context, Result};
use clap::Parser;
use netreason_common::{NetReasonConfig, OllamaClient, Session};
use netreasonctl::cli::{Cli, Commands};
use netreasonctl::display;
use netreasonctl::repl;
use netreasonctl::spinner::SpinnerSink;
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("NETREASON_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = cli.load_config().context("Failed to load configuration")?;

    match cli.command() {
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
        Commands::Ask {
            query,
            explain,
            json,
        } => ask_once(&config, &query.join(" "), explain, json).await,
        Commands::Chat => chat(&config).await,
    }
}

async fn chat(config: &NetReasonConfig) -> Result<()> {
    if !OllamaClient::new(&config.model).is_available().await {
        warn!("Ollama not reachable at {}", config.model.base_url);
        display::print_error(&format!(
            "Ollama is not reachable at {}; answers will report generation errors",
            config.model.base_url
        ));
    }

    let spinner = Arc::new(SpinnerSink::new());
    let mut session = Session::from_config(config).context("System prompt does not fit the context budget")?;
    session.engine_mut().set_events(spinner.clone());

    display::print_banner(&config.model.name);
    repl::run(&mut session, spinner).await
}

async fn ask_once(config: &NetReasonConfig, query: &str, explain: bool, json: bool) -> Result<()> {
    let spinner = Arc::new(SpinnerSink::new());
    let mut session = Session::from_config(config).context("System prompt does not fit the context budget")?;
    if !json {
        session.engine_mut().set_events(spinner.clone());
        spinner.start();
    }

    let result = session.query(query).await;
    spinner.finish();
    let outcome = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&display::outcome_json(&outcome))?);
        return Ok(());
    }

    println!("{}", outcome.answer);
    if explain {
        println!("\n{}", display::render_explain(&outcome.chain));
    }
    Ok(())
}
