//! # Sleuth Core
//!
//! Core library for the Sleuth research pipeline.
//! Provides the pipeline orchestrator, the capability registry, the two-tier
//! result cache, cross-source verification, heuristic analysis, synthesis
//! providers and configuration.

pub mod cache;
pub mod capabilities;
pub mod config;
pub mod error;
pub mod llm;
pub mod persistence;
pub mod research;

// Re-export commonly used types at the crate root.
pub use cache::{CacheMetrics, ResultCache, cache_key};
pub use capabilities::{
    AnalysisCapability, Capability, CapabilityKind, CapabilityRegistry, CitationCapability,
    SearchCapability, VerificationCapability,
};
pub use config::{CitationStyle, ReportFormat, ResearchDepth, SleuthConfig, load_config};
pub use error::{
    CacheError, CapabilityError, ConfigError, InputError, LlmError, Result, SleuthError,
};
pub use llm::{GenerationParams, LlmProvider, MockLlmProvider, create_provider};
pub use research::{
    AnalysisScores, AnalyzedResult, ResearchContext, ResearchEngine, ResearchObserver,
    ResearchOptions, ResearchStage, Source, Verification,
};
