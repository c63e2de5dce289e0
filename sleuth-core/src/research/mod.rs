//! Research pipeline.
//!
//! A call to [`ResearchEngine::research`] runs these stages in order:
//! 1. **Search**: collect candidate sources, then deduplicate, filter and rank them
//! 2. **Extract + analyze**: pull text from the top sources and score it
//! 3. **Verify**: cross-reference claims and estimate credibility (optional)
//! 4. **Synthesize**: generate the analysis text through an LLM provider
//! 5. **Report**: cite sources and render the report, then cache and persist the result

pub mod analysis;
pub mod citation;
pub mod context;
pub mod contradiction;
pub mod engine;
pub mod history;
pub mod options;
pub mod output;
pub mod session;
pub mod sources;
pub mod synthesis;
mod text;
pub mod verification;

pub use context::{
    AnalysisScores, AnalyzedResult, BiasLevel, Citation, Contradiction, ContradictionType,
    CredibilityScore, CrossReference, FactCheck, FactCheckStatus, Report, ResearchContext,
    Sentiment, Synthesis, Verification, VerificationStatus,
};
pub use engine::{MAX_TOPIC_CHARS, ResearchEngine, validate_topic};
pub use history::{ResultSummary, list_results, load_result};
pub use options::ResearchOptions;
pub use output::ReportGenerator;
pub use session::{NoOpObserver, RecordingObserver, ResearchObserver, ResearchStage};
pub use sources::Source;
pub use verification::VerificationEngine;
