//! Command handlers for the CLI.

use crate::{CacheAction, Cli, Commands, ConfigAction};
use sleuth_core::{
    CitationStyle, ReportFormat, ResearchContext, ResearchDepth, ResearchEngine,
    ResearchObserver, ResearchOptions, ResearchStage, ResultCache, SleuthConfig,
};
use std::sync::Arc;

pub(crate) async fn handle_command(command: Commands, config: SleuthConfig) -> anyhow::Result<()> {
    match command {
        Commands::History { limit } => show_history(&config, limit),
        Commands::Cache {
            action: CacheAction::Clear,
        } => clear_cache(&config),
        Commands::Config {
            action: ConfigAction::Show,
        } => {
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

/// Prints stage progress to stderr.
struct ProgressObserver;

impl ResearchObserver for ProgressObserver {
    fn on_stage(&self, topic: &str, stage: ResearchStage) {
        eprintln!("  [{stage}] {topic}");
    }

    fn on_cache_hit(&self, _topic: &str, _key: &str) {
        eprintln!("  (served from cache)");
    }

    fn on_failure(&self, _topic: &str, error: &str) {
        eprintln!("  Research failed: {error}");
    }
}

pub(crate) async fn run_research(topic: &str, cli: &Cli, config: SleuthConfig) -> anyhow::Result<()> {
    let llm_config = config.llm.clone();
    let mut engine = ResearchEngine::from_config(config)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    match sleuth_core::create_provider(&llm_config) {
        Ok(provider) => engine = engine.with_llm(Arc::new(provider)),
        Err(e) => {
            tracing::warn!(error = %e, "No LLM provider available; the analysis will be degraded");
        }
    }
    if !cli.quiet {
        engine = engine.with_observer(Arc::new(ProgressObserver));
    }

    let options = apply_overrides(engine.default_options(), cli)?;
    let ctx = engine.research(topic, &options).await?;
    print_result(&ctx, cli.json)
}

fn print_result(ctx: &ResearchContext, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(ctx)?);
    } else {
        println!("{}", ctx.report.content);
        if ctx.report.degraded {
            eprintln!("\n  Note: synthesis was unavailable; the report lists sources only.");
        }
    }
    Ok(())
}

/// Layer command-line flags over the configured defaults.
pub(crate) fn apply_overrides(
    mut options: ResearchOptions,
    cli: &Cli,
) -> anyhow::Result<ResearchOptions> {
    if let Some(max) = cli.max_sources {
        options.max_sources = max;
    }
    if let Some(threshold) = cli.threshold {
        options.quality_threshold = threshold;
    }
    if cli.no_verify {
        options.verification_enabled = false;
    }
    if let Some(format) = &cli.format {
        options.format = parse_format(format)?;
    }
    if let Some(style) = &cli.style {
        options.citation_style = parse_style(style)?;
    }
    if let Some(depth) = &cli.depth {
        options.depth = parse_depth(depth)?;
    }
    if let Some(persona) = &cli.persona {
        options.persona = persona.clone();
    }
    if let Some(tone) = &cli.tone {
        options.tone = tone.clone();
    }
    Ok(options)
}

fn parse_format(value: &str) -> anyhow::Result<ReportFormat> {
    match value.to_lowercase().as_str() {
        "summary" => Ok(ReportFormat::Summary),
        "detailed" => Ok(ReportFormat::Detailed),
        "bibliography" => Ok(ReportFormat::Bibliography),
        other => anyhow::bail!("Unknown format: '{}'. Use summary, detailed or bibliography.", other),
    }
}

fn parse_style(value: &str) -> anyhow::Result<CitationStyle> {
    match value.to_lowercase().as_str() {
        "apa" => Ok(CitationStyle::Apa),
        "mla" => Ok(CitationStyle::Mla),
        "chicago" => Ok(CitationStyle::Chicago),
        "ieee" => Ok(CitationStyle::Ieee),
        other => anyhow::bail!("Unknown citation style: '{}'. Use apa, mla, chicago or ieee.", other),
    }
}

fn parse_depth(value: &str) -> anyhow::Result<ResearchDepth> {
    match value.to_lowercase().as_str() {
        "quick" => Ok(ResearchDepth::Quick),
        "detailed" => Ok(ResearchDepth::Detailed),
        "comprehensive" => Ok(ResearchDepth::Comprehensive),
        other => anyhow::bail!("Unknown depth: '{}'. Use quick, detailed or comprehensive.", other),
    }
}

fn show_history(config: &SleuthConfig, limit: usize) -> anyhow::Result<()> {
    let dir = config.storage.results_dir();
    let results = sleuth_core::research::list_results(&dir)?;
    if results.is_empty() {
        println!("No research results in {}", dir.display());
        return Ok(());
    }
    for summary in results.iter().take(limit) {
        let confidence = summary
            .confidence
            .map(|c| format!("{:.0}%", c * 100.0))
            .unwrap_or_else(|| "n/a".to_string());
        let marker = if summary.degraded { " (degraded)" } else { "" };
        println!(
            "{}  {}  sources={} confidence={}{}",
            summary.created_at.format("%Y-%m-%d %H:%M"),
            summary.topic,
            summary.source_count,
            confidence,
            marker
        );
    }
    Ok(())
}

fn clear_cache(config: &SleuthConfig) -> anyhow::Result<()> {
    let cache: ResultCache<ResearchContext> =
        ResultCache::with_durable_dir(config.storage.cache_dir(), config.storage.cache_ttl);
    let removed = cache.clear()?;
    println!("Removed {} cached result(s)", removed);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_apply_overrides() {
        let cli = Cli::try_parse_from([
            "sleuth",
            "topic",
            "--style",
            "IEEE",
            "--depth",
            "quick",
            "--persona",
            "an engineer",
            "--no-verify",
        ])
        .unwrap();
        let options = apply_overrides(ResearchOptions::default(), &cli).unwrap();
        assert_eq!(options.citation_style, CitationStyle::Ieee);
        assert_eq!(options.depth, ResearchDepth::Quick);
        assert_eq!(options.persona, "an engineer");
        assert!(!options.verification_enabled);
        assert_eq!(options.max_sources, ResearchOptions::default().max_sources);
    }

    #[test]
    fn test_unknown_format_rejected() {
        let cli = Cli::try_parse_from(["sleuth", "topic", "--format", "poem"]).unwrap();
        assert!(apply_overrides(ResearchOptions::default(), &cli).is_err());
    }

    #[test]
    fn test_clear_cache_on_empty_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = SleuthConfig::default();
        config.storage.cache_dir = Some(dir.path().join("cache"));
        clear_cache(&config).unwrap();
    }

    #[test]
    fn test_history_on_missing_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = SleuthConfig::default();
        config.storage.results_dir = Some(dir.path().join("results"));
        show_history(&config, 10).unwrap();
    }
}
