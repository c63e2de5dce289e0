//! Template citations.

use super::context::{AnalyzedResult, Citation};
use super::sources::Source;
use crate::config::CitationStyle;

/// Format one citation per result, in result order.
pub fn cite_all(results: &[AnalyzedResult], style: CitationStyle) -> Vec<Citation> {
    results
        .iter()
        .enumerate()
        .map(|(i, r)| Citation {
            source_id: r.source.id.clone(),
            style,
            text: format_citation(&r.source, style, i + 1),
        })
        .collect()
}

/// Render a citation for `source`. `index` is the 1-based position used by IEEE.
pub fn format_citation(source: &Source, style: CitationStyle, index: usize) -> String {
    let publisher = publisher(source);
    let date = source.timestamp;
    match style {
        CitationStyle::Apa => format!(
            "{publisher}. ({}). {}. Retrieved {}, from {}",
            date.format("%Y, %B %-d"),
            source.title,
            date.format("%B %-d, %Y"),
            source.url
        ),
        CitationStyle::Mla => format!(
            "\"{}.\" {publisher}, {}, {}.",
            source.title,
            date.format("%-d %b. %Y"),
            source.url
        ),
        CitationStyle::Chicago => format!(
            "{publisher}. \"{}.\" Accessed {}. {}.",
            source.title,
            date.format("%B %-d, %Y"),
            source.url
        ),
        CitationStyle::Ieee => format!(
            "[{index}] {publisher}, \"{},\" [Online]. Available: {}. [Accessed: {}].",
            source.title,
            source.url,
            date.format("%b. %-d, %Y")
        ),
    }
}

/// Host name of the source URL, falling back to the origin engine.
fn publisher(source: &Source) -> String {
    url::Url::parse(&source.url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| {
            if source.origin_engine.is_empty() {
                "Unknown".to_string()
            } else {
                source.origin_engine.clone()
            }
        })
}
