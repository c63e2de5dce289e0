//! Sleuth CLI: run research pipelines from the terminal.

mod commands;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Sleuth: multi-source research with verification and citations
#[derive(Parser, Debug)]
#[command(name = "sleuth", version, about, long_about = None)]
pub(crate) struct Cli {
    /// Topic to research
    pub(crate) topic: Option<String>,

    /// Maximum number of sources to analyze
    #[arg(long)]
    pub(crate) max_sources: Option<usize>,

    /// Minimum source quality in [0, 1]
    #[arg(long)]
    pub(crate) threshold: Option<f64>,

    /// Skip claim verification
    #[arg(long)]
    pub(crate) no_verify: bool,

    /// Report format: summary, detailed, bibliography
    #[arg(short, long)]
    pub(crate) format: Option<String>,

    /// Citation style: apa, mla, chicago, ieee
    #[arg(long)]
    pub(crate) style: Option<String>,

    /// Persona the synthesis is written for
    #[arg(long)]
    pub(crate) persona: Option<String>,

    /// Tone of the synthesis
    #[arg(long)]
    pub(crate) tone: Option<String>,

    /// Analysis depth: quick, detailed, comprehensive
    #[arg(long)]
    pub(crate) depth: Option<String>,

    /// Print the full research result as JSON
    #[arg(long)]
    pub(crate) json: bool,

    /// Workspace directory
    #[arg(short, long, default_value = ".")]
    pub(crate) workspace: PathBuf,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub(crate) verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub(crate) quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    pub(crate) command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
pub(crate) enum Commands {
    /// List persisted research results, newest first
    History {
        /// Show at most this many entries
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Manage the result cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
pub(crate) enum CacheAction {
    /// Remove every cached result
    Clear,
}

#[derive(clap::Subcommand, Debug)]
pub(crate) enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(EnvFilter::new(filter));

    // JSON file layer for structured logging
    let log_dir = sleuth_core::config::data_dir().join("logs");
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "sleuth.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let config = sleuth_core::load_config(Some(&workspace), None)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    if let Some(command) = cli.command {
        return commands::handle_command(command, config).await;
    }

    let Some(topic) = cli.topic.as_deref() else {
        anyhow::bail!("No topic given. Run `sleuth --help` for usage.");
    };
    commands::run_research(topic, &cli, config).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_topic_and_flags() {
        let cli = Cli::try_parse_from([
            "sleuth",
            "solar storage",
            "--max-sources",
            "5",
            "--threshold",
            "0.4",
            "--no-verify",
            "--format",
            "summary",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.topic.as_deref(), Some("solar storage"));
        assert_eq!(cli.max_sources, Some(5));
        assert_eq!(cli.threshold, Some(0.4));
        assert!(cli.no_verify);
        assert_eq!(cli.format.as_deref(), Some("summary"));
        assert_eq!(cli.verbose, 2);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_parse_subcommands() {
        let cli = Cli::try_parse_from(["sleuth", "cache", "clear"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Cache {
                action: CacheAction::Clear
            })
        ));

        let cli = Cli::try_parse_from(["sleuth", "history", "--limit", "3"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::History { limit: 3 })));

        let cli = Cli::try_parse_from(["sleuth", "config", "show"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Config {
                action: ConfigAction::Show
            })
        ));
    }
}
