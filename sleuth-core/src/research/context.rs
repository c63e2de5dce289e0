//! Data model of a single research call.
//!
//! A [`ResearchContext`] is built up stage by stage by the engine and handed
//! back to the caller once complete. It is also the payload stored in the
//! result cache and written to the results directory.

use super::options::ResearchOptions;
use super::sources::Source;
use crate::config::{CitationStyle, ReportFormat};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Perceived bias of a text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiasLevel {
    #[default]
    Low,
    Medium,
    High,
}

/// Overall polarity of a text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    #[default]
    Neutral,
    Negative,
}

/// Heuristic scores for one extracted source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisScores {
    /// Topical relevance (0.0-1.0).
    pub relevance: f64,
    /// Content quality (0.0-1.0).
    pub quality: f64,
    pub bias: BiasLevel,
    /// Flesch reading ease, clamped to 0-100.
    pub readability: f64,
    pub sentiment: Sentiment,
    pub entities: Vec<String>,
    pub topics: Vec<String>,
}

impl AnalysisScores {
    /// Scores assigned when no analysis capability is available.
    pub fn neutral() -> Self {
        Self {
            relevance: 0.8,
            quality: 0.7,
            bias: BiasLevel::Low,
            readability: 50.0,
            sentiment: Sentiment::Neutral,
            entities: Vec::new(),
            topics: Vec::new(),
        }
    }
}

/// A retained source together with its extracted text and scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedResult {
    pub source: Source,
    pub extracted_content: String,
    pub analysis: AnalysisScores,
}

/// A normalized claim corroborated by two or more sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossReference {
    /// Claim text as first seen.
    pub claim: String,
    /// Lowercased, punctuation-free key used for grouping.
    pub normalized_claim: String,
    /// Source ids in first-seen order.
    pub supporting_sources: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactCheckStatus {
    #[default]
    Unchecked,
}

/// A statement surfaced as worth fact-checking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactCheck {
    pub claim: String,
    /// Id of the source the statement came from.
    pub source: String,
    pub confidence: f64,
    pub status: FactCheckStatus,
}

/// Heuristic trust estimate for one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredibilityScore {
    pub source: String,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContradictionType {
    /// One claim negates the other.
    DirectNegation,
    /// Same subject, conflicting numbers.
    NumericDisagreement,
}

/// Two claims from different sources that appear to disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contradiction {
    pub claim_a: String,
    pub source_a: String,
    pub claim_b: String,
    pub source_b: String,
    pub contradiction_type: ContradictionType,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Verified,
    NotVerified,
}

/// Outcome of cross-source verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verification {
    pub status: VerificationStatus,
    pub cross_references: Vec<CrossReference>,
    pub fact_checks: Vec<FactCheck>,
    pub credibility_scores: Vec<CredibilityScore>,
    #[serde(default)]
    pub contradictions: Vec<Contradiction>,
    /// Aggregate trust estimate (0.0-1.0).
    pub confidence: f64,
    pub summary_text: String,
}

impl Verification {
    /// Placeholder used when no verification capability ran successfully.
    pub fn not_verified(reason: impl Into<String>) -> Self {
        Self {
            status: VerificationStatus::NotVerified,
            cross_references: Vec::new(),
            fact_checks: Vec::new(),
            credibility_scores: Vec::new(),
            contradictions: Vec::new(),
            confidence: 0.5,
            summary_text: reason.into(),
        }
    }
}

/// Generated analysis text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Synthesis {
    pub text: String,
    /// Model that produced the text, if any did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// True when the text is a placeholder produced after a synthesis failure.
    pub degraded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A formatted reference to one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub source_id: String,
    pub style: CitationStyle,
    pub text: String,
}

/// The rendered research report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub title: String,
    pub format: ReportFormat,
    pub content: String,
    pub citations: Vec<Citation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub degraded: bool,
}

/// Full state of one research call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchContext {
    pub id: Uuid,
    pub topic: String,
    pub options: ResearchOptions,
    /// Deduplicated, filtered, ranked search results.
    pub sources: Vec<Source>,
    /// One entry per retained source that yielded content, in rank order.
    pub results: Vec<AnalyzedResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification: Option<Verification>,
    pub analysis: Synthesis,
    pub report: Report,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl ResearchContext {
    /// Start an empty context for `topic`.
    pub fn new(topic: impl Into<String>, options: ResearchOptions) -> Self {
        Self {
            id: Uuid::new_v4(),
            topic: topic.into(),
            options,
            sources: Vec::new(),
            results: Vec::new(),
            verification: None,
            analysis: Synthesis::default(),
            report: Report::default(),
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Confidence of the verification outcome, if verification ran.
    pub fn confidence(&self) -> Option<f64> {
        self.verification.as_ref().map(|v| v.confidence)
    }
}
