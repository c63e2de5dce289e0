//! Research engine: orchestrates the pipeline for a single research call.
//!
//! search -> extract + analyze -> verify (optional) -> synthesize -> cite/report
//! -> cache + persist. Only input validation can fail a call; every later
//! stage degrades to a documented fallback instead.

use super::context::{
    AnalysisScores, AnalyzedResult, Citation, ResearchContext, Synthesis, Verification,
};
use super::history;
use super::options::ResearchOptions;
use super::output::ReportGenerator;
use super::session::{ResearchObserver, ResearchStage};
use super::sources::{self, Source};
use super::synthesis::{self, PromptBuilder};
use crate::cache::{self, ResultCache};
use crate::capabilities::{AnalysisCapability, CapabilityRegistry};
use crate::config::SleuthConfig;
use crate::error::{ConfigError, InputError, LlmError, Result, SleuthError};
use crate::llm::{GenerationParams, LlmProvider};
use chrono::Utc;
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Longest accepted topic, in characters.
pub const MAX_TOPIC_CHARS: usize = 1000;

/// Trim `topic` and reject empty or oversized input.
pub fn validate_topic(topic: &str) -> std::result::Result<&str, InputError> {
    let trimmed = topic.trim();
    if trimmed.is_empty() {
        return Err(InputError::EmptyTopic);
    }
    let len = trimmed.chars().count();
    if len > MAX_TOPIC_CHARS {
        return Err(InputError::TopicTooLong {
            len,
            max: MAX_TOPIC_CHARS,
        });
    }
    Ok(trimmed)
}

/// The research pipeline orchestrator.
///
/// Safe to share across tasks: concurrent calls only share the registry and the cache.
pub struct ResearchEngine {
    config: SleuthConfig,
    registry: Arc<CapabilityRegistry>,
    cache: Option<Arc<ResultCache<ResearchContext>>>,
    llm: Option<Arc<dyn LlmProvider>>,
    observers: Vec<Arc<dyn ResearchObserver>>,
    results_dir: Option<PathBuf>,
    session_id: Uuid,
}

impl ResearchEngine {
    /// Engine with a registry built from `config`, no cache, no persistence and
    /// no synthesis provider.
    pub fn new(config: SleuthConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            registry: Arc::new(CapabilityRegistry::from_config(&config)),
            config,
            cache: None,
            llm: None,
            observers: Vec::new(),
            results_dir: None,
            session_id: Uuid::new_v4(),
        })
    }

    /// Engine with cache and result persistence wired up from `config.storage`.
    pub fn from_config(config: SleuthConfig) -> std::result::Result<Self, ConfigError> {
        let storage = config.storage.clone();
        let mut engine = Self::new(config)?;
        if storage.cache_enabled {
            engine.cache = Some(Arc::new(ResultCache::with_durable_dir(
                storage.cache_dir(),
                storage.cache_ttl,
            )));
        }
        if storage.persist_results {
            engine.results_dir = Some(storage.results_dir());
        }
        Ok(engine)
    }

    pub fn with_registry(mut self, registry: Arc<CapabilityRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_cache(mut self, cache: Option<Arc<ResultCache<ResearchContext>>>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_llm(mut self, llm: Arc<dyn LlmProvider>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ResearchObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn with_results_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.results_dir = dir;
        self
    }

    pub fn config(&self) -> &SleuthConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<CapabilityRegistry> {
        &self.registry
    }

    pub fn cache(&self) -> Option<&Arc<ResultCache<ResearchContext>>> {
        self.cache.as_ref()
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Options taken from the `research.*` configuration.
    pub fn default_options(&self) -> ResearchOptions {
        ResearchOptions::from_config(&self.config.research)
    }

    /// Run one research call.
    ///
    /// Fails only on invalid input. Once the input is accepted the caller
    /// always receives a complete context, possibly with fallback fields.
    pub async fn research(&self, topic: &str, options: &ResearchOptions) -> Result<ResearchContext> {
        let result = match validate_topic(topic).and_then(|t| options.validate().map(|()| t)) {
            Ok(topic) => self.run(topic, options.normalized()).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = &result {
            self.notify_failure(topic.trim(), e);
        }
        result
    }

    async fn run(&self, topic: &str, options: ResearchOptions) -> Result<ResearchContext> {
        let mut stage = ResearchStage::Started;
        self.notify_stage(topic, stage);

        let key = match &self.cache {
            Some(_) => Some(cache::cache_key(topic, &options)?),
            None => None,
        };
        if let (Some(cache), Some(key)) = (&self.cache, &key)
            && let Some(ctx) = cache_lookup(cache, key).await
        {
            info!(topic = %topic, key = %key, "Returning cached research result");
            for observer in &self.observers {
                observer.on_cache_hit(topic, key);
            }
            self.advance(topic, &mut stage, ResearchStage::Completed);
            return Ok(ctx);
        }

        info!(topic = %topic, session = %self.session_id, "Starting research");
        let mut ctx = ResearchContext::new(topic, options.clone());

        ctx.sources = sources::prepare(self.search(topic, &options).await, options.quality_threshold);
        debug!(topic = %topic, retained = ctx.sources.len(), "Sources prepared");
        self.advance(topic, &mut stage, ResearchStage::Searched);

        ctx.results = self.extract_and_analyze(topic, &ctx.sources, options.max_sources).await;
        self.advance(topic, &mut stage, ResearchStage::Analyzed);

        if options.verification_enabled {
            ctx.verification = Some(self.verify(&ctx).await);
            self.advance(topic, &mut stage, ResearchStage::Verified);
        }

        let prompt = PromptBuilder::new(topic, &options, &ctx.results)
            .with_verification(ctx.verification.as_ref())
            .build();
        ctx.analysis = self.synthesize(topic, &prompt, &ctx.results).await;
        self.advance(topic, &mut stage, ResearchStage::Synthesized);

        let citations = self.cite(&ctx).await;
        ctx.report = ReportGenerator::generate(&ctx, citations);
        ctx.completed_at = Some(Utc::now());

        self.store(&ctx, key).await;
        self.advance(topic, &mut stage, ResearchStage::Persisted);

        info!(
            topic = %topic,
            sources = ctx.sources.len(),
            results = ctx.results.len(),
            confidence = ?ctx.confidence(),
            degraded = ctx.analysis.degraded,
            "Research completed"
        );
        self.advance(topic, &mut stage, ResearchStage::Completed);
        Ok(ctx)
    }

    fn capability_timeout(&self) -> Duration {
        Duration::from_secs(self.config.research.capability_timeout_secs)
    }

    /// Raw search results. A missing capability yields the stub source; a
    /// failing one contributes nothing.
    async fn search(&self, topic: &str, options: &ResearchOptions) -> Vec<Source> {
        let Some(search) = self.registry.search() else {
            info!(topic = %topic, "No search capability; using stub source");
            return vec![Source::stub(topic)];
        };
        match timeout(self.capability_timeout(), search.search(topic, options)).await {
            Ok(Ok(found)) => {
                debug!(topic = %topic, count = found.len(), "Search returned");
                found
            }
            Ok(Err(e)) => {
                warn!(topic = %topic, error = %e, "Search failed; continuing with no sources");
                Vec::new()
            }
            Err(_) => {
                warn!(
                    topic = %topic,
                    timeout_secs = self.config.research.capability_timeout_secs,
                    "Search timed out; continuing with no sources"
                );
                Vec::new()
            }
        }
    }

    /// Extract and analyze the first `max_sources` sources, keeping rank order.
    async fn extract_and_analyze(
        &self,
        topic: &str,
        ranked: &[Source],
        max_sources: usize,
    ) -> Vec<AnalyzedResult> {
        let analysis = self.registry.analysis();
        if analysis.is_none() {
            info!(topic = %topic, "No analysis capability; assigning neutral scores");
        }
        let width = self.config.research.parallelism.max(1);

        futures::stream::iter(ranked.iter().take(max_sources).cloned().map(|source| {
            let analysis = analysis.clone();
            async move { self.analyze_source(topic, source, analysis).await }
        }))
        .buffered(width)
        .filter_map(|result| async move { result })
        .collect()
        .await
    }

    async fn analyze_source(
        &self,
        topic: &str,
        source: Source,
        analysis: Option<Arc<dyn AnalysisCapability>>,
    ) -> Option<AnalyzedResult> {
        let Some(content) = sources::extract_content(&source) else {
            debug!(source = %source.id, "No extractable content; skipping source");
            for observer in &self.observers {
                observer.on_source_skipped(&source.id, "no extractable content");
            }
            return None;
        };

        let scores = match analysis {
            None => AnalysisScores::neutral(),
            Some(capability) => {
                match timeout(self.capability_timeout(), capability.analyze(&content, topic)).await
                {
                    Ok(Ok(scores)) => scores,
                    Ok(Err(e)) => {
                        warn!(source = %source.id, error = %e, "Analysis failed; using neutral scores");
                        AnalysisScores::neutral()
                    }
                    Err(_) => {
                        warn!(source = %source.id, "Analysis timed out; using neutral scores");
                        AnalysisScores::neutral()
                    }
                }
            }
        };

        Some(AnalyzedResult {
            source,
            extracted_content: content,
            analysis: scores,
        })
    }

    async fn verify(&self, ctx: &ResearchContext) -> Verification {
        let Some(verification) = self.registry.verification() else {
            info!(topic = %ctx.topic, "No verification capability; marking result not verified");
            return Verification::not_verified("No verification capability available.");
        };
        match timeout(self.capability_timeout(), verification.verify(ctx)).await {
            Ok(Ok(v)) => v,
            Ok(Err(e)) => {
                warn!(topic = %ctx.topic, error = %e, "Verification failed");
                Verification::not_verified(format!("Verification failed: {e}"))
            }
            Err(_) => {
                warn!(topic = %ctx.topic, "Verification timed out");
                Verification::not_verified("Verification timed out.")
            }
        }
    }

    async fn synthesize(&self, topic: &str, prompt: &str, results: &[AnalyzedResult]) -> Synthesis {
        let Some(llm) = &self.llm else {
            warn!(topic = %topic, "No synthesis provider configured; degrading");
            return synthesis::degraded(topic, results, "no synthesis provider configured");
        };
        let params = GenerationParams::from_config(&self.config.llm);
        let limit = self.config.llm.timeout_secs;
        let outcome = match timeout(Duration::from_secs(limit), llm.generate(prompt, &params)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(LlmError::Timeout {
                timeout_secs: limit,
            }),
        };
        match outcome {
            Ok(text) => Synthesis {
                text,
                model: Some(llm.model_name().to_string()),
                degraded: false,
                error: None,
            },
            Err(e) => {
                warn!(topic = %topic, error = %e, "Synthesis failed; degrading");
                synthesis::degraded(topic, results, &e.to_string())
            }
        }
    }

    async fn cite(&self, ctx: &ResearchContext) -> Vec<Citation> {
        let Some(citation) = self.registry.citation() else {
            return Vec::new();
        };
        match timeout(
            self.capability_timeout(),
            citation.cite(&ctx.results, ctx.options.citation_style),
        )
        .await
        {
            Ok(Ok(citations)) => citations,
            Ok(Err(e)) => {
                warn!(topic = %ctx.topic, error = %e, "Citation failed");
                Vec::new()
            }
            Err(_) => {
                warn!(topic = %ctx.topic, "Citation timed out");
                Vec::new()
            }
        }
    }

    /// Best-effort cache write and result persistence, run on the blocking pool.
    async fn store(&self, ctx: &ResearchContext, key: Option<String>) {
        let cache = self.cache.clone().zip(key);
        let results_dir = self.results_dir.clone();
        if cache.is_none() && results_dir.is_none() {
            return;
        }
        let ttl = self.config.storage.cache_ttl;
        let session_id = self.session_id;
        let ctx = ctx.clone();

        let task = tokio::task::spawn_blocking(move || {
            if let Some(dir) = &results_dir {
                match history::persist_result(dir, &session_id, &ctx) {
                    Ok(path) => debug!(path = %path.display(), "Research result persisted"),
                    Err(e) => warn!(dir = %dir.display(), error = %e, "Failed to persist research result"),
                }
            }
            if let Some((cache, key)) = cache
                && let Err(e) = cache.put(&key, ctx, ttl)
            {
                warn!(key = %key, error = %e, "Cache write failed");
            }
        });
        if let Err(e) = task.await {
            warn!(error = %e, "Storage task did not complete");
        }
    }

    fn advance(&self, topic: &str, current: &mut ResearchStage, next: ResearchStage) {
        debug_assert!(current.can_advance_to(next), "{current} -> {next}");
        *current = next;
        self.notify_stage(topic, next);
    }

    fn notify_stage(&self, topic: &str, stage: ResearchStage) {
        debug!(topic = %topic, stage = %stage, "Research stage");
        for observer in &self.observers {
            observer.on_stage(topic, stage);
        }
    }

    fn notify_failure(&self, topic: &str, error: &SleuthError) {
        warn!(topic = %topic, error = %error, "Research failed");
        let message = error.to_string();
        for observer in &self.observers {
            observer.on_stage(topic, ResearchStage::Failed);
            observer.on_failure(topic, &message);
        }
    }
}

/// Cache lookup on the blocking pool, since the durable tier reads files.
async fn cache_lookup(
    cache: &Arc<ResultCache<ResearchContext>>,
    key: &str,
) -> Option<ResearchContext> {
    let cache = Arc::clone(cache);
    let key = key.to_string();
    match tokio::task::spawn_blocking(move || cache.get(&key)).await {
        Ok(found) => found,
        Err(e) => {
            warn!(error = %e, "Cache lookup did not complete; treating as a miss");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::research::session::RecordingObserver;

    fn engine() -> ResearchEngine {
        ResearchEngine::new(SleuthConfig::default()).unwrap()
    }

    #[test]
    fn test_validate_topic() {
        assert_eq!(validate_topic("  rust  ").unwrap(), "rust");
        assert!(matches!(validate_topic("   "), Err(InputError::EmptyTopic)));
        let long = "a".repeat(MAX_TOPIC_CHARS + 1);
        assert!(matches!(
            validate_topic(&long),
            Err(InputError::TopicTooLong { len, .. }) if len == MAX_TOPIC_CHARS + 1
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = SleuthConfig::default();
        config.llm.temperature = 3.0;
        assert!(ResearchEngine::new(config).is_err());
    }

    #[tokio::test]
    async fn test_stub_fallback_without_search() {
        let observer = Arc::new(RecordingObserver::new());
        let engine = engine().with_observer(observer.clone());
        let ctx = engine
            .research("quantum error correction", &ResearchOptions::default())
            .await
            .unwrap();

        assert_eq!(ctx.sources.len(), 1);
        assert_eq!(ctx.sources[0].origin_engine, "stub");
        assert_eq!(ctx.results.len(), 1);
        assert!(ctx.analysis.degraded);
        assert!(ctx.report.degraded);
        assert_eq!(
            observer.stages(),
            vec![
                ResearchStage::Started,
                ResearchStage::Searched,
                ResearchStage::Analyzed,
                ResearchStage::Verified,
                ResearchStage::Synthesized,
                ResearchStage::Persisted,
                ResearchStage::Completed,
            ]
        );
    }

    #[tokio::test]
    async fn test_verification_disabled_skips_stage() {
        let observer = Arc::new(RecordingObserver::new());
        let engine = engine().with_observer(observer.clone());
        let options = ResearchOptions {
            verification_enabled: false,
            ..Default::default()
        };
        let ctx = engine.research("topic", &options).await.unwrap();
        assert!(ctx.verification.is_none());
        assert!(!observer.stages().contains(&ResearchStage::Verified));
    }

    #[tokio::test]
    async fn test_invalid_threshold_fails_before_start() {
        let observer = Arc::new(RecordingObserver::new());
        let engine = engine().with_observer(observer.clone());
        let options = ResearchOptions {
            quality_threshold: 2.0,
            ..Default::default()
        };
        let err = engine.research("topic", &options).await.unwrap_err();
        assert!(matches!(err, SleuthError::Input(InputError::InvalidOption { .. })));
        assert_eq!(observer.stages(), vec![ResearchStage::Failed]);
        assert_eq!(observer.failures().len(), 1);
    }
}
