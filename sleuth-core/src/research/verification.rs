//! Cross-source verification.
//!
//! Produces a confidence signal from independently retrieved sources without
//! any ground truth:
//! 1. **Claims**: sentence-like segments of each source's text (>= 10 chars)
//! 2. **Cross-references**: claims whose normalized form appears in >= 2 sources
//! 3. **Fact-check candidates**: segments with numbers or assertion verbs
//! 4. **Credibility**: per-source heuristic from domain, quality, bias, readability
//! 5. **Confidence**: `0.6 * min(1, 0.3 * cross_refs) + 0.4 * mean(credibility)`
//!
//! Normalization only folds case, whitespace and punctuation. Paraphrased
//! claims are not unified, and the confidence weights are calibrated for that.

use super::contradiction::ContradictionDetector;
use super::context::{
    AnalyzedResult, BiasLevel, CredibilityScore, CrossReference, FactCheck, FactCheckStatus,
    Verification, VerificationStatus,
};
use super::sources;
use super::text;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Segments shorter than this are not treated as claims.
pub const MIN_CLAIM_CHARS: usize = 10;

/// Readability band (Flesch ease) considered comfortable for general readers.
///
/// Readable prose is rewarded: inside the band adds 0.1 credibility, outside subtracts 0.1.
pub const READABILITY_BAND: (f64, f64) = (30.0, 70.0);

const ASSERTION_VERBS: &[&str] = &[
    "shows", "showed", "found", "finds", "reveals", "revealed", "demonstrates", "demonstrated",
    "proves", "proved", "confirms", "confirmed", "indicates", "suggests", "reports", "reported",
    "estimates", "concludes",
];

static NUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:1[5-9]|20)\d{2}\b|\d+(?:[.,]\d+)?").unwrap());

/// A claim-like segment attributed to one source.
#[derive(Debug, Clone, PartialEq)]
pub struct Claim {
    pub source_id: String,
    pub text: String,
    pub normalized: String,
}

/// Stateless verification engine.
#[derive(Debug, Clone, Default)]
pub struct VerificationEngine {
    contradiction_detector: ContradictionDetector,
}

impl VerificationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Verify a set of analyzed results. Never fails; an empty set yields a
    /// low-confidence verification.
    ///
    /// Results sharing a source id are still counted as distinct sources;
    /// repeats are reported as `<id>#2`, `<id>#3`, ...
    pub fn verify(&self, results: &[AnalyzedResult]) -> Verification {
        let ids = sources::unique_ids(results.iter().map(|r| r.source.id.as_str()));
        let claims: Vec<Claim> = results
            .iter()
            .zip(&ids)
            .flat_map(|(result, id)| claims_attributed_to(result, id))
            .collect();

        let cross_references = cross_reference(&claims);
        let fact_checks = flag_fact_checks(&claims);
        let credibility_scores: Vec<CredibilityScore> = results
            .iter()
            .zip(ids)
            .map(|(r, source)| CredibilityScore {
                source,
                score: credibility(r),
            })
            .collect();
        let contradictions = self.contradiction_detector.detect(&claims);
        let scores: Vec<f64> = credibility_scores.iter().map(|c| c.score).collect();
        let confidence = overall_confidence(cross_references.len(), &scores);

        let summary_text = format!(
            "Cross-referenced {} claim(s) across {} source(s); {} statement(s) flagged for fact-checking; \
             {} possible contradiction(s). Overall confidence: {:.0}%.",
            cross_references.len(),
            results.len(),
            fact_checks.len(),
            contradictions.len(),
            confidence * 100.0,
        );

        Verification {
            status: VerificationStatus::Verified,
            cross_references,
            fact_checks,
            credibility_scores,
            contradictions,
            confidence,
            summary_text,
        }
    }
}

/// Split a result's text into claims, discarding short segments.
pub fn extract_claims(result: &AnalyzedResult) -> Vec<Claim> {
    claims_attributed_to(result, &result.source.id)
}

fn claims_attributed_to(result: &AnalyzedResult, source_id: &str) -> Vec<Claim> {
    text::sentences(&result.extracted_content)
        .into_iter()
        .filter(|segment| segment.chars().count() >= MIN_CLAIM_CHARS)
        .filter_map(|segment| {
            let normalized = normalize_claim(segment);
            (!normalized.is_empty()).then(|| Claim {
                source_id: source_id.to_string(),
                text: segment.to_string(),
                normalized,
            })
        })
        .collect()
}

/// Lowercase, strip punctuation, collapse whitespace.
pub fn normalize_claim(segment: &str) -> String {
    segment
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Group claims by normalized key and keep those backed by >= 2 distinct sources.
///
/// Sorted by supporting-source count, descending; ties keep first-seen order.
pub fn cross_reference(claims: &[Claim]) -> Vec<CrossReference> {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, (&str, Vec<String>)> = HashMap::new();

    for claim in claims {
        let entry = groups.entry(claim.normalized.as_str()).or_insert_with(|| {
            order.push(claim.normalized.as_str());
            (claim.text.as_str(), Vec::new())
        });
        if !entry.1.contains(&claim.source_id) {
            entry.1.push(claim.source_id.clone());
        }
    }

    let mut refs: Vec<CrossReference> = order
        .into_iter()
        .filter_map(|key| {
            let (text, sources) = groups.remove(key)?;
            (sources.len() >= 2).then(|| CrossReference {
                claim: text.to_string(),
                normalized_claim: key.to_string(),
                count: sources.len(),
                supporting_sources: sources,
            })
        })
        .collect();
    refs.sort_by(|a, b| b.count.cmp(&a.count));
    refs
}

/// Whether a segment looks like a checkable factual statement.
pub fn is_fact_checkable(segment: &str) -> bool {
    if NUMERIC.is_match(segment) {
        return true;
    }
    text::words(segment)
        .iter()
        .any(|w| ASSERTION_VERBS.contains(&w.as_str()))
}

fn flag_fact_checks(claims: &[Claim]) -> Vec<FactCheck> {
    claims
        .iter()
        .filter(|c| is_fact_checkable(&c.text))
        .map(|c| FactCheck {
            claim: c.text.clone(),
            source: c.source_id.clone(),
            confidence: 0.5,
            status: FactCheckStatus::Unchecked,
        })
        .collect()
}

/// Heuristic trust estimate for one analyzed source, clamped to [0, 1].
pub fn credibility(result: &AnalyzedResult) -> f64 {
    let mut score = 0.5 + domain_bonus(&result.source.url);

    if let Some(quality) = result.source.quality_score {
        score = (score + quality) / 2.0;
    }

    score -= match result.analysis.bias {
        BiasLevel::High => 0.2,
        BiasLevel::Medium => 0.1,
        BiasLevel::Low => 0.0,
    };

    let (low, high) = READABILITY_BAND;
    if (low..=high).contains(&result.analysis.readability) {
        score += 0.1;
    } else {
        score -= 0.1;
    }

    if score.is_nan() {
        return 0.0;
    }
    score.clamp(0.0, 1.0)
}

fn domain_bonus(raw_url: &str) -> f64 {
    let tld = url::Url::parse(raw_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
        .and_then(|host| host.rsplit('.').next().map(str::to_string));
    match tld.as_deref() {
        Some("edu" | "org" | "gov") => 0.2,
        Some("com") => 0.1,
        _ => 0.0,
    }
}

/// `0.6 * min(1, cross_refs * 0.3) + 0.4 * mean(credibility)`.
///
/// An empty credibility list counts as a mean of 0.5.
pub fn overall_confidence(cross_reference_count: usize, credibility_scores: &[f64]) -> f64 {
    let corroboration = (cross_reference_count as f64 * 0.3).min(1.0);
    let mean_credibility = if credibility_scores.is_empty() {
        0.5
    } else {
        credibility_scores.iter().sum::<f64>() / credibility_scores.len() as f64
    };
    (0.6 * corroboration + 0.4 * mean_credibility).clamp(0.0, 1.0)
}
