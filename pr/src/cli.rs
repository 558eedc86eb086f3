//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

use crate::config::Config;

/// Prompter - rate-budgeted LLM dispatcher
#[derive(Parser)]
#[command(
    name = "pr",
    about = "Dispatch prompts to an LLM within a requests-per-minute budget",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Dispatch every prompt in the input file, then exit
    Run {
        /// JSONL file of prompts
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// JSONL file results are appended to
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Requests per minute
        #[arg(short, long)]
        rpm: Option<u32>,

        /// Do not write results
        #[arg(long)]
        no_save: bool,
    },

    /// Show the pacing constants derived from the budget
    Budget {
        /// Requests per minute
        #[arg(short, long)]
        rpm: Option<u32>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

impl Command {
    /// Fold command-line overrides into the loaded config
    pub fn apply_overrides(&self, config: &mut Config) {
        debug!(command = ?self, "Command::apply_overrides: called");
        match self {
            Command::Run {
                input,
                output,
                rpm,
                no_save,
            } => {
                if let Some(input) = input {
                    config.store.input = input.clone();
                }
                if let Some(output) = output {
                    config.store.output = output.clone();
                }
                if let Some(rpm) = rpm {
                    config.model.rpm = *rpm;
                }
                if *no_save {
                    config.scheduler.persist_results = false;
                }
            }
            Command::Budget { rpm, .. } => {
                if let Some(rpm) = rpm {
                    config.model.rpm = *rpm;
                }
            }
        }
    }
}

/// Output format for informational commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

/// Log file location
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("prompter")
        .join("logs")
        .join("prompter.log")
}
