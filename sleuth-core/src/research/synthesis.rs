//! Synthesis prompt construction and the degraded fallback.
//!
//! The engine hands the prompt built here to an [`LlmProvider`](crate::llm::LlmProvider).
//! When generation fails the pipeline keeps going with [`degraded`] instead.

use super::context::{AnalyzedResult, Synthesis, Verification};
use super::options::ResearchOptions;
use crate::config::{ReportFormat, ResearchDepth};

/// Per-source content is cut to this many characters inside the prompt.
pub const MAX_SOURCE_CHARS: usize = 1500;

/// Builds the structured synthesis prompt.
pub struct PromptBuilder<'a> {
    topic: &'a str,
    options: &'a ResearchOptions,
    results: &'a [AnalyzedResult],
    verification: Option<&'a Verification>,
}

impl<'a> PromptBuilder<'a> {
    pub fn new(topic: &'a str, options: &'a ResearchOptions, results: &'a [AnalyzedResult]) -> Self {
        Self {
            topic,
            options,
            results,
            verification: None,
        }
    }

    pub fn with_verification(mut self, verification: Option<&'a Verification>) -> Self {
        self.verification = verification;
        self
    }

    pub fn build(&self) -> String {
        let opts = self.options;
        let mut out = format!(
            "You are a {}. Write in a {} tone.\n\n# Topic\n{}\n\n# Task\n{}\n{}\n",
            opts.persona,
            opts.tone,
            self.topic,
            depth_instruction(opts.depth),
            format_instruction(opts.format),
        );

        out.push_str("\n# Sources\n");
        if self.results.is_empty() {
            out.push_str("No source content could be extracted. Say so explicitly.\n");
        }
        for (i, result) in self.results.iter().enumerate() {
            let a = &result.analysis;
            out.push_str(&format!(
                "\n## [{}] {}\nURL: {}\nScores: relevance {:.2}, quality {:.2}, bias {:?}, readability {:.0}, sentiment {:?}\n",
                i + 1,
                result.source.title,
                result.source.url,
                a.relevance,
                a.quality,
                a.bias,
                a.readability,
                a.sentiment,
            ));
            if !a.topics.is_empty() {
                out.push_str(&format!("Topics: {}\n", a.topics.join(", ")));
            }
            out.push_str(&truncate_chars(&result.extracted_content, MAX_SOURCE_CHARS));
            out.push('\n');
        }

        if let Some(v) = self.verification {
            out.push_str("\n# Verification\n");
            out.push_str(&v.summary_text);
            out.push('\n');
            for cr in v.cross_references.iter().take(5) {
                out.push_str(&format!(
                    "- Corroborated by {} sources: {}\n",
                    cr.count, cr.claim
                ));
            }
            if !v.contradictions.is_empty() {
                out.push_str("Address these disagreements between sources:\n");
                for c in v.contradictions.iter().take(5) {
                    out.push_str(&format!("- \"{}\" vs \"{}\"\n", c.claim_a, c.claim_b));
                }
            }
        }

        out.push_str("\nCite sources by their bracketed number.\n");
        out
    }
}

fn depth_instruction(depth: ResearchDepth) -> &'static str {
    match depth {
        ResearchDepth::Quick => "Give a brief overview in one or two paragraphs.",
        ResearchDepth::Detailed => "Cover the main findings and how well the sources support them.",
        ResearchDepth::Comprehensive => {
            "Cover every finding in depth, including caveats, disagreements and open questions."
        }
    }
}

fn format_instruction(format: ReportFormat) -> &'static str {
    match format {
        ReportFormat::Summary => "Output: a concise summary.",
        ReportFormat::Detailed => "Output: a structured report with sections.",
        ReportFormat::Bibliography => "Output: a short annotation for each source.",
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Placeholder synthesis used after a generation failure.
pub fn degraded(topic: &str, results: &[AnalyzedResult], error: &str) -> Synthesis {
    let mut text = format!(
        "Automated synthesis for \"{topic}\" is unavailable. The {} retained source(s) are listed below without analysis.",
        results.len()
    );
    for result in results {
        text.push_str(&format!("\n- {} ({})", result.source.title, result.source.url));
    }
    Synthesis {
        text,
        model: None,
        degraded: true,
        error: Some(error.to_string()),
    }
}
