//! Contradiction detection across claims from different sources.
//!
//! Finds conflicting claims using keyword overlap analysis and negation
//! detection. Results are informational and do not affect confidence.

use super::context::{Contradiction, ContradictionType};
use super::text;
use super::verification::Claim;
use std::collections::HashSet;

const NEGATION_WORDS: &[&str] = &[
    "not", "no", "never", "neither", "without", "lack", "doesn't", "don't", "isn't", "aren't",
    "wasn't", "weren't", "won't", "cannot", "can't",
];

/// Upper bound on reported contradictions per verification run.
const MAX_CONTRADICTIONS: usize = 20;

/// Detects contradictions between claims.
#[derive(Debug, Clone)]
pub struct ContradictionDetector {
    /// Minimum keyword overlap to consider claims as potentially contradictory.
    min_overlap: f64,
    /// Overlap required before a negation mismatch counts.
    negation_overlap: f64,
}

impl ContradictionDetector {
    pub fn new() -> Self {
        Self {
            min_overlap: 0.3,
            negation_overlap: 0.4,
        }
    }

    /// Detect contradictions across all claims. Claims from the same source
    /// are never compared with each other.
    pub fn detect(&self, claims: &[Claim]) -> Vec<Contradiction> {
        let prepared: Vec<(&Claim, HashSet<String>)> = claims
            .iter()
            .map(|c| (c, text::keywords(&c.text).into_iter().collect()))
            .collect();

        let mut contradictions = Vec::new();
        for i in 0..prepared.len() {
            for j in (i + 1)..prepared.len() {
                let (a, words_a) = &prepared[i];
                let (b, words_b) = &prepared[j];
                if a.source_id == b.source_id || a.normalized == b.normalized {
                    continue;
                }
                if let Some(contradiction) = self.check_pair(a, words_a, b, words_b) {
                    contradictions.push(contradiction);
                    if contradictions.len() >= MAX_CONTRADICTIONS {
                        return contradictions;
                    }
                }
            }
        }
        contradictions
    }

    fn check_pair(
        &self,
        a: &Claim,
        words_a: &HashSet<String>,
        b: &Claim,
        words_b: &HashSet<String>,
    ) -> Option<Contradiction> {
        let overlap = jaccard(words_a, words_b);
        if overlap < self.min_overlap {
            return None;
        }

        if has_negation(&a.text) != has_negation(&b.text) && overlap >= self.negation_overlap {
            return Some(contradiction(a, b, ContradictionType::DirectNegation, overlap * 0.8));
        }

        let nums_a = extract_numbers(&a.text);
        let nums_b = extract_numbers(&b.text);
        if !nums_a.is_empty() && !nums_b.is_empty() {
            let mismatch = nums_a.iter().any(|na| {
                nums_b
                    .iter()
                    .all(|nb| (na - nb).abs() / na.abs().max(1.0) > 0.1)
            });
            if mismatch {
                return Some(contradiction(
                    a,
                    b,
                    ContradictionType::NumericDisagreement,
                    overlap * 0.6,
                ));
            }
        }

        None
    }
}

impl Default for ContradictionDetector {
    fn default() -> Self {
        Self::new()
    }
}

fn contradiction(a: &Claim, b: &Claim, kind: ContradictionType, confidence: f64) -> Contradiction {
    Contradiction {
        claim_a: a.text.clone(),
        source_a: a.source_id.clone(),
        claim_b: b.text.clone(),
        source_b: b.source_id.clone(),
        contradiction_type: kind,
        confidence: confidence.clamp(0.0, 1.0),
    }
}

fn has_negation(claim: &str) -> bool {
    text::words(claim)
        .iter()
        .any(|w| NEGATION_WORDS.contains(&w.as_str()))
}

fn extract_numbers(claim: &str) -> Vec<f64> {
    claim
        .split(|c: char| !c.is_ascii_digit() && c != '.')
        .map(|s| s.trim_matches('.'))
        .filter_map(|s| s.parse::<f64>().ok())
        .collect()
}

/// Jaccard similarity of two keyword sets.
fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f64 / union as f64
}
