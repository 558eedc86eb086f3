//! Prompter - rate-budgeted LLM dispatcher
//!
//! CLI entry point: loads config, wires the JSONL store and Anthropic runner
//! into a Prompter, and runs it to completion.

use std::fs;
use std::sync::Arc;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::{debug, info, warn};

use prompter::cli::{Cli, Command, OutputFormat, get_log_path};
use prompter::config::Config;
use prompter::{AnthropicRunner, JsonlStore, ModelBudget, Prompter};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level).map(|s| s.to_uppercase()) {
        None => tracing::Level::INFO,
        Some(s) => match s.as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    cli.command.apply_overrides(&mut config);
    debug!(?config, "main: configuration resolved");

    match cli.command {
        Command::Run { .. } => cmd_run(&config).await,
        Command::Budget { format, .. } => cmd_budget(&config.model, format),
    }
}

async fn cmd_run(config: &Config) -> Result<()> {
    let store = JsonlStore::open(&config.store.input, config.store.output.clone())
        .await
        .context(format!("Failed to open input {}", config.store.input.display()))?;
    let runner = AnthropicRunner::from_config(&config.llm, &config.model).context("Failed to create runner")?;

    println!(
        "{} {} prompts at {} rpm with {}",
        "Dispatching".cyan(),
        store.len(),
        config.model.rpm,
        config.model.name.yellow()
    );

    let prompter = Prompter::new(
        config.model.clone(),
        config.scheduler.clone(),
        Arc::new(store),
        Arc::new(runner),
    )?;
    let mut completion = prompter.start().await?;

    let success = tokio::select! {
        success = &mut completion => success,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, aborting run");
            prompter.abort("interrupted").await;
            completion.await
        }
    };

    let stats = prompter.stats().await;
    println!(
        "  sent {} | ok {} | retried {} | dropped {} | exhausted {} | saved {}",
        stats.dispatched, stats.succeeded, stats.retried, stats.dropped, stats.exhausted, stats.saved
    );

    if success {
        println!("{} All prompts dispatched", "✓".green());
        Ok(())
    } else {
        Err(eyre::eyre!("Run aborted; see {} for details", get_log_path().display()))
    }
}

fn cmd_budget(budget: &ModelBudget, format: OutputFormat) -> Result<()> {
    budget.validate()?;
    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "model": budget.name,
                "rpm": budget.rpm,
                "tick_ms": budget.tick_duration().as_millis() as u64,
                "capacity": budget.capacity(),
                "load_batch_size": budget.load_batch_size(),
                "load_threshold": budget.load_threshold(),
                "load_period_ms": budget.load_period().as_millis() as u64,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            println!("{} {}", "Model:".green(), budget.name);
            println!("  rpm:             {}", budget.rpm);
            println!("  tick:            {:?}", budget.tick_duration());
            println!("  capacity:        {} slots", budget.capacity());
            println!("  load batch:      {}", budget.load_batch_size());
            println!("  load threshold:  {}", budget.load_threshold());
            println!("  load period:     {:?}", budget.load_period());
        }
    }
    Ok(())
}
