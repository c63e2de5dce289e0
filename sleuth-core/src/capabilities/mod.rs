//! Pluggable pipeline capabilities.
//!
//! Each pipeline stage that can be swapped out is described by one trait.
//! A [`Capability`] is a tagged handle to one implementation; the
//! [`CapabilityRegistry`] resolves them by name.

pub mod builtin;
pub mod manifest;
pub mod registry;

use crate::config::CitationStyle;
use crate::error::CapabilityError;
use crate::research::context::{
    AnalysisScores, AnalyzedResult, Citation, ResearchContext, Verification,
};
use crate::research::options::ResearchOptions;
use crate::research::sources::Source;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use builtin::{
    CrossReferenceVerification, HeuristicAnalysis, HttpJsonSearch, JsonFileSearch,
    TemplateCitation,
};
pub use manifest::PluginManifest;
pub use registry::CapabilityRegistry;

/// Finds candidate sources for a topic.
#[async_trait]
pub trait SearchCapability: Send + Sync {
    async fn search(
        &self,
        topic: &str,
        options: &ResearchOptions,
    ) -> Result<Vec<Source>, CapabilityError>;
}

/// Scores one piece of extracted content.
#[async_trait]
pub trait AnalysisCapability: Send + Sync {
    async fn analyze(&self, content: &str, topic: &str) -> Result<AnalysisScores, CapabilityError>;
}

/// Cross-checks the analyzed results of a research call.
#[async_trait]
pub trait VerificationCapability: Send + Sync {
    async fn verify(&self, ctx: &ResearchContext) -> Result<Verification, CapabilityError>;
}

/// Formats references to analyzed sources.
#[async_trait]
pub trait CitationCapability: Send + Sync {
    async fn cite(
        &self,
        results: &[AnalyzedResult],
        style: CitationStyle,
    ) -> Result<Vec<Citation>, CapabilityError>;
}

/// The four capability contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityKind {
    Search,
    Analysis,
    Verification,
    Citation,
}

impl CapabilityKind {
    pub const ALL: [CapabilityKind; 4] = [
        CapabilityKind::Search,
        CapabilityKind::Analysis,
        CapabilityKind::Verification,
        CapabilityKind::Citation,
    ];

    /// The well-known name the pipeline resolves for this kind.
    pub fn default_name(self) -> &'static str {
        match self {
            CapabilityKind::Search => "search",
            CapabilityKind::Analysis => "analysis",
            CapabilityKind::Verification => "verification",
            CapabilityKind::Citation => "citation",
        }
    }
}

impl std::fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.default_name())
    }
}

/// A resolved capability implementation.
#[derive(Clone)]
pub enum Capability {
    Search(Arc<dyn SearchCapability>),
    Analysis(Arc<dyn AnalysisCapability>),
    Verification(Arc<dyn VerificationCapability>),
    Citation(Arc<dyn CitationCapability>),
}

impl Capability {
    pub fn kind(&self) -> CapabilityKind {
        match self {
            Capability::Search(_) => CapabilityKind::Search,
            Capability::Analysis(_) => CapabilityKind::Analysis,
            Capability::Verification(_) => CapabilityKind::Verification,
            Capability::Citation(_) => CapabilityKind::Citation,
        }
    }

    pub fn search(capability: impl SearchCapability + 'static) -> Self {
        Capability::Search(Arc::new(capability))
    }

    pub fn analysis(capability: impl AnalysisCapability + 'static) -> Self {
        Capability::Analysis(Arc::new(capability))
    }

    pub fn verification(capability: impl VerificationCapability + 'static) -> Self {
        Capability::Verification(Arc::new(capability))
    }

    pub fn citation(capability: impl CitationCapability + 'static) -> Self {
        Capability::Citation(Arc::new(capability))
    }
}

impl std::fmt::Debug for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Capability::{:?}", self.kind())
    }
}
