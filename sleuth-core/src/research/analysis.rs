//! Heuristic per-source scoring.
//!
//! None of these scores involve language understanding: they are cheap
//! lexical signals (keyword overlap, sentence shape, word lists) that give
//! the ranking and credibility steps something to work with.

use super::context::{AnalysisScores, BiasLevel, Sentiment};
use super::text;
use std::collections::{HashMap, HashSet};

const LOADED_TERMS: &[&str] = &[
    "always", "never", "obviously", "clearly", "undeniably", "outrageous", "shocking",
    "disaster", "disastrous", "best", "worst", "amazing", "terrible", "ridiculous", "absolutely",
    "totally", "incredible", "unbelievable", "radical", "insane", "horrible", "perfect",
    "everyone", "nobody", "destroy", "scandal",
];

const POSITIVE_TERMS: &[&str] = &[
    "good", "great", "benefit", "benefits", "improve", "improves", "improved", "improvement",
    "success", "successful", "effective", "efficient", "positive", "advantage", "gain",
    "growth", "reliable", "robust", "strong", "progress", "helpful", "safe",
];

const NEGATIVE_TERMS: &[&str] = &[
    "bad", "poor", "risk", "risks", "harm", "harmful", "fail", "fails", "failure", "problem",
    "problems", "decline", "loss", "negative", "weak", "danger", "dangerous", "worse",
    "concern", "concerns", "issue", "issues", "unsafe",
];

const MAX_ENTITIES: usize = 10;
const MAX_TOPICS: usize = 5;

/// Scores extracted text against a research topic.
#[derive(Debug, Clone, Default)]
pub struct HeuristicAnalyzer;

impl HeuristicAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, content: &str, topic: &str) -> AnalysisScores {
        let words = text::words(content);
        let keywords = text::keywords(content);
        let sentences = text::sentences(content);

        AnalysisScores {
            relevance: relevance(&keywords, topic),
            quality: quality(&words, sentences.len()),
            bias: bias(&words),
            readability: readability(&words, sentences.len()),
            sentiment: sentiment(&words),
            entities: entities(&sentences),
            topics: topics(&keywords),
        }
    }
}

fn relevance(content_keywords: &[String], topic: &str) -> f64 {
    let topic_terms: HashSet<String> = text::keywords(topic).into_iter().collect();
    if topic_terms.is_empty() || content_keywords.is_empty() {
        return if topic_terms.is_empty() { 0.5 } else { 0.0 };
    }
    let present: HashSet<&String> = content_keywords
        .iter()
        .filter(|k| topic_terms.contains(*k))
        .collect();
    let coverage = present.len() as f64 / topic_terms.len() as f64;
    let hits = content_keywords
        .iter()
        .filter(|k| topic_terms.contains(*k))
        .count();
    let density = (hits as f64 / content_keywords.len() as f64 * 10.0).min(1.0);
    (0.7 * coverage + 0.3 * density).clamp(0.0, 1.0)
}

fn quality(words: &[String], sentence_count: usize) -> f64 {
    if words.is_empty() {
        return 0.0;
    }
    let length = (words.len() as f64 / 150.0).min(1.0);
    let avg_sentence = words.len() as f64 / sentence_count.max(1) as f64;
    let shape = if (8.0..=30.0).contains(&avg_sentence) {
        1.0
    } else {
        0.5
    };
    let unique: HashSet<&String> = words.iter().collect();
    let diversity = unique.len() as f64 / words.len() as f64;
    (0.4 * length + 0.3 * shape + 0.3 * diversity).clamp(0.0, 1.0)
}

fn bias(words: &[String]) -> BiasLevel {
    if words.is_empty() {
        return BiasLevel::Low;
    }
    let loaded = words
        .iter()
        .filter(|w| LOADED_TERMS.contains(&w.as_str()))
        .count();
    let per_hundred = loaded as f64 * 100.0 / words.len() as f64;
    if per_hundred < 1.0 {
        BiasLevel::Low
    } else if per_hundred < 3.0 {
        BiasLevel::Medium
    } else {
        BiasLevel::High
    }
}

/// Flesch reading ease, clamped to 0-100.
fn readability(words: &[String], sentence_count: usize) -> f64 {
    if words.is_empty() {
        return 0.0;
    }
    let syllables: usize = words.iter().map(|w| text::syllables(w)).sum();
    let words_per_sentence = words.len() as f64 / sentence_count.max(1) as f64;
    let syllables_per_word = syllables as f64 / words.len() as f64;
    (206.835 - 1.015 * words_per_sentence - 84.6 * syllables_per_word).clamp(0.0, 100.0)
}

fn sentiment(words: &[String]) -> Sentiment {
    let positive = words
        .iter()
        .filter(|w| POSITIVE_TERMS.contains(&w.as_str()))
        .count();
    let negative = words
        .iter()
        .filter(|w| NEGATIVE_TERMS.contains(&w.as_str()))
        .count();
    match positive.cmp(&negative) {
        std::cmp::Ordering::Greater => Sentiment::Positive,
        std::cmp::Ordering::Less => Sentiment::Negative,
        std::cmp::Ordering::Equal => Sentiment::Neutral,
    }
}

/// Runs of capitalized words that do not open a sentence.
fn entities(sentences: &[&str]) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for sentence in sentences {
        let mut run: Vec<&str> = Vec::new();
        for (i, token) in sentence.split_whitespace().enumerate() {
            let word = token.trim_matches(|c: char| !c.is_alphanumeric());
            let capitalized = word.chars().next().is_some_and(char::is_uppercase);
            if i > 0 && capitalized && !text::is_stop_word(&word.to_lowercase()) {
                run.push(word);
                continue;
            }
            push_entity(&mut found, &mut run);
        }
        push_entity(&mut found, &mut run);
        if found.len() >= MAX_ENTITIES {
            break;
        }
    }
    found.truncate(MAX_ENTITIES);
    found
}

fn push_entity(found: &mut Vec<String>, run: &mut Vec<&str>) {
    if !run.is_empty() {
        let entity = run.join(" ");
        if !found.contains(&entity) {
            found.push(entity);
        }
        run.clear();
    }
}

/// Most frequent keywords, ties broken by first appearance.
fn topics(keywords: &[String]) -> Vec<String> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (pos, keyword) in keywords.iter().enumerate() {
        counts.entry(keyword.as_str()).or_insert((0, pos)).0 += 1;
    }
    let mut ranked: Vec<(&str, usize, usize)> = counts
        .into_iter()
        .map(|(k, (count, first))| (k, count, first))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
    ranked
        .into_iter()
        .take(MAX_TOPICS)
        .map(|(k, _, _)| k.to_string())
        .collect()
}
