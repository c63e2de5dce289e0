//! Built-in capability implementations.

use super::{
    AnalysisCapability, Capability, CitationCapability, SearchCapability, VerificationCapability,
};
use crate::config::CitationStyle;
use crate::error::CapabilityError;
use crate::research::analysis::HeuristicAnalyzer;
use crate::research::citation;
use crate::research::context::{
    AnalysisScores, AnalyzedResult, Citation, ResearchContext, Verification,
};
use crate::research::options::ResearchOptions;
use crate::research::sources::Source;
use crate::research::verification::VerificationEngine;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Built-in implementation registered under a well-known name, if any.
///
/// There is no built-in `search`; the pipeline substitutes a stub source instead.
pub fn builtin(name: &str) -> Option<Capability> {
    match name {
        "analysis" => Some(Capability::analysis(HeuristicAnalysis::default())),
        "verification" => Some(Capability::verification(CrossReferenceVerification::default())),
        "citation" => Some(Capability::citation(TemplateCitation::default())),
        _ => None,
    }
}

/// Lexical heuristic scoring.
#[derive(Debug, Clone, Default)]
pub struct HeuristicAnalysis {
    analyzer: HeuristicAnalyzer,
}

#[async_trait]
impl AnalysisCapability for HeuristicAnalysis {
    async fn analyze(&self, content: &str, topic: &str) -> Result<AnalysisScores, CapabilityError> {
        Ok(self.analyzer.analyze(content, topic))
    }
}

/// Claim cross-referencing and credibility scoring.
#[derive(Debug, Clone, Default)]
pub struct CrossReferenceVerification {
    engine: VerificationEngine,
}

#[async_trait]
impl VerificationCapability for CrossReferenceVerification {
    async fn verify(&self, ctx: &ResearchContext) -> Result<Verification, CapabilityError> {
        Ok(self.engine.verify(&ctx.results))
    }
}

/// String-template citations. A fixed style overrides the per-call style.
#[derive(Debug, Clone, Default)]
pub struct TemplateCitation {
    fixed_style: Option<CitationStyle>,
}

impl TemplateCitation {
    pub fn with_style(style: CitationStyle) -> Self {
        Self {
            fixed_style: Some(style),
        }
    }
}

#[async_trait]
impl CitationCapability for TemplateCitation {
    async fn cite(
        &self,
        results: &[AnalyzedResult],
        style: CitationStyle,
    ) -> Result<Vec<Citation>, CapabilityError> {
        Ok(citation::cite_all(results, self.fixed_style.unwrap_or(style)))
    }
}

/// Search backed by a JSON file of pre-ranked sources.
///
/// The file is re-read on every search so it can be edited between runs.
#[derive(Debug, Clone)]
pub struct JsonFileSearch {
    name: String,
    path: PathBuf,
}

impl JsonFileSearch {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

#[async_trait]
impl SearchCapability for JsonFileSearch {
    async fn search(
        &self,
        topic: &str,
        _options: &ResearchOptions,
    ) -> Result<Vec<Source>, CapabilityError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| CapabilityError::Execution {
                name: self.name.clone(),
                message: format!("cannot read {}: {e}", self.path.display()),
            })?;
        let value: Value =
            serde_json::from_slice(&bytes).map_err(|e| CapabilityError::Execution {
                name: self.name.clone(),
                message: format!("invalid JSON in {}: {e}", self.path.display()),
            })?;
        let sources = parse_sources(&self.name, value)?;
        debug!(topic = %topic, count = sources.len(), path = %self.path.display(), "Loaded sources from file");
        Ok(sources)
    }
}

/// Search against an HTTP endpoint returning JSON sources.
///
/// Sends `GET <endpoint>?q=<topic>&limit=<max_sources>` and accepts either a
/// JSON array of sources or an object with a `results` array.
pub struct HttpJsonSearch {
    name: String,
    endpoint: String,
    client: Client,
    timeout_secs: u64,
}

impl HttpJsonSearch {
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, CapabilityError> {
        let name = name.into();
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| CapabilityError::Execution {
                name: name.clone(),
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            name,
            endpoint: endpoint.into(),
            client,
            timeout_secs,
        })
    }
}

#[async_trait]
impl SearchCapability for HttpJsonSearch {
    async fn search(
        &self,
        topic: &str,
        options: &ResearchOptions,
    ) -> Result<Vec<Source>, CapabilityError> {
        debug!(endpoint = %self.endpoint, topic = %topic, "Sending search request");
        let limit = options.max_sources.to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", topic), ("limit", limit.as_str())])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CapabilityError::Timeout {
                        name: self.name.clone(),
                        timeout_secs: self.timeout_secs,
                    }
                } else {
                    CapabilityError::Execution {
                        name: self.name.clone(),
                        message: format!("request failed: {e}"),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CapabilityError::Execution {
                name: self.name.clone(),
                message: format!("HTTP {status}"),
            });
        }
        let value: Value = response
            .json()
            .await
            .map_err(|e| CapabilityError::Execution {
                name: self.name.clone(),
                message: format!("invalid response body: {e}"),
            })?;
        parse_sources(&self.name, value)
    }
}

/// Accept `[...]` or `{"results": [...]}`; fill in the origin engine when absent.
fn parse_sources(name: &str, value: Value) -> Result<Vec<Source>, CapabilityError> {
    let items = match value {
        Value::Object(mut map) => map.remove("results").unwrap_or(Value::Null),
        other => other,
    };
    let mut sources: Vec<Source> =
        serde_json::from_value(items).map_err(|e| CapabilityError::Execution {
            name: name.to_string(),
            message: format!("unexpected source shape: {e}"),
        })?;
    for source in &mut sources {
        if source.origin_engine.is_empty() {
            source.origin_engine = name.to_string();
        }
    }
    Ok(sources)
}
