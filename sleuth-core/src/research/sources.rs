//! Search results: deduplication, quality filtering, ranking and content extraction.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;

/// Score assumed for a source whose adapter reported no quality/relevance.
pub const DEFAULT_SOURCE_SCORE: f64 = 0.5;

/// Ranking weights: `0.6 * relevance + 0.4 * quality`.
const RELEVANCE_WEIGHT: f64 = 0.6;
const QUALITY_WEIGHT: f64 = 0.4;

static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b.*?</script>|<style\b.*?</style>|<[^>]+>").unwrap()
});

/// A source returned by a search capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub snippet: String,
    /// Full page text, when the adapter already fetched it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Search engine or adapter the source came from.
    #[serde(default)]
    pub origin_engine: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f64>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Source {
    /// Create a source with the minimum required fields.
    pub fn new(id: impl Into<String>, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            url: url.into(),
            snippet: String::new(),
            content: None,
            origin_engine: String::new(),
            quality_score: None,
            relevance_score: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = snippet.into();
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_scores(mut self, relevance: f64, quality: f64) -> Self {
        self.relevance_score = Some(relevance);
        self.quality_score = Some(quality);
        self
    }

    pub fn with_origin(mut self, engine: impl Into<String>) -> Self {
        self.origin_engine = engine.into();
        self
    }

    /// Placeholder result used when no search capability is available.
    pub fn stub(topic: &str) -> Self {
        Self::new(
            "stub-0",
            format!("{topic}: overview"),
            format!("https://duckduckgo.com/?q={}", urlencoding::encode(topic)),
        )
        .with_snippet(format!(
            "No search capability is configured. This placeholder stands in for search results about {topic}."
        ))
        .with_origin("stub")
    }

    pub fn effective_quality(&self) -> f64 {
        self.quality_score.unwrap_or(DEFAULT_SOURCE_SCORE)
    }

    pub fn effective_relevance(&self) -> f64 {
        self.relevance_score.unwrap_or(DEFAULT_SOURCE_SCORE)
    }

    /// Combined ranking score.
    pub fn rank_score(&self) -> f64 {
        RELEVANCE_WEIGHT * self.effective_relevance() + QUALITY_WEIGHT * self.effective_quality()
    }
}

/// Drop sources whose URL or title was already seen. First occurrence wins.
pub fn deduplicate(sources: Vec<Source>) -> Vec<Source> {
    let mut seen_urls = HashSet::new();
    let mut seen_titles = HashSet::new();
    let mut unique = Vec::with_capacity(sources.len());

    for source in sources {
        let url = source.url.trim().to_string();
        let title = source.title.trim().to_string();
        let url_seen = !url.is_empty() && seen_urls.contains(&url);
        let title_seen = !title.is_empty() && seen_titles.contains(&title);
        if url_seen || title_seen {
            continue;
        }
        if !url.is_empty() {
            seen_urls.insert(url);
        }
        if !title.is_empty() {
            seen_titles.insert(title);
        }
        unique.push(source);
    }
    unique
}

/// Keep sources whose quality is at least `threshold`.
pub fn filter_by_quality(sources: Vec<Source>, threshold: f64) -> Vec<Source> {
    sources
        .into_iter()
        .filter(|s| s.effective_quality() >= threshold)
        .collect()
}

/// Stable sort, descending by [`Source::rank_score`]. Ties keep discovery order.
pub fn rank(mut sources: Vec<Source>) -> Vec<Source> {
    sources.sort_by(|a, b| b.rank_score().total_cmp(&a.rank_score()));
    sources
}

/// Deduplicate, filter and rank raw search output. Ids of the survivors are made unique.
pub fn prepare(sources: Vec<Source>, quality_threshold: f64) -> Vec<Source> {
    rank(filter_by_quality(
        assign_unique_ids(deduplicate(sources)),
        quality_threshold,
    ))
}

/// Disambiguate repeated ids in order. The first occurrence keeps its id;
/// later ones become `<id>#2`, `<id>#3`, ... skipping any id already in use.
/// Blank ids are treated as `source`.
pub fn unique_ids<'a>(ids: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let ids: Vec<&str> = ids
        .into_iter()
        .map(|id| if id.trim().is_empty() { "source" } else { id })
        .collect();
    let originals: HashSet<&str> = ids.iter().copied().collect();
    let mut claimed: HashSet<String> = HashSet::with_capacity(ids.len());

    ids.into_iter()
        .map(|id| {
            if claimed.insert(id.to_string()) {
                return id.to_string();
            }
            let mut n = 2;
            loop {
                let candidate = format!("{id}#{n}");
                if !originals.contains(candidate.as_str()) && claimed.insert(candidate.clone()) {
                    return candidate;
                }
                n += 1;
            }
        })
        .collect()
}

/// Rewrite source ids so no two sources share one. See [`unique_ids`].
pub fn assign_unique_ids(mut sources: Vec<Source>) -> Vec<Source> {
    let ids = unique_ids(sources.iter().map(|s| s.id.as_str()));
    for (source, id) in sources.iter_mut().zip(ids) {
        source.id = id;
    }
    sources
}

/// Pull readable text out of a source. Returns `None` when nothing is left.
pub fn extract_content(source: &Source) -> Option<String> {
    let raw = source
        .content
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .unwrap_or(&source.snippet);
    let text = clean_text(raw);
    if text.is_empty() { None } else { Some(text) }
}

fn clean_text(raw: &str) -> String {
    let stripped = HTML_TAG.replace_all(raw, " ");
    let decoded = stripped
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}
