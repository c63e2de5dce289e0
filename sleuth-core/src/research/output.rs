//! Research report generation in multiple output formats.

use super::context::{Citation, Report, ResearchContext, Verification};
use crate::config::ReportFormat;

/// Generates the final report from a context whose synthesis is complete.
pub struct ReportGenerator;

impl ReportGenerator {
    /// Render `ctx` in its requested format.
    pub fn generate(ctx: &ResearchContext, citations: Vec<Citation>) -> Report {
        let format = ctx.options.format;
        let content = match format {
            ReportFormat::Summary => Self::generate_summary(ctx),
            ReportFormat::Detailed => Self::generate_detailed(ctx, &citations),
            ReportFormat::Bibliography => Self::generate_bibliography(ctx, &citations),
        };

        Report {
            title: format!("Research: {}", ctx.topic),
            format,
            content,
            citations,
            confidence: ctx.confidence(),
            degraded: ctx.analysis.degraded,
        }
    }

    fn generate_summary(ctx: &ResearchContext) -> String {
        let mut out = format!("# Research Summary: {}\n\n", ctx.topic);
        if ctx.analysis.degraded {
            out.push_str("> Synthesis unavailable; showing a placeholder.\n\n");
        }
        out.push_str(&ctx.analysis.text);
        out.push_str(&format!(
            "\n\n**Confidence:** {} | **Sources:** {}\n",
            confidence_label(ctx.verification.as_ref()),
            ctx.results.len(),
        ));
        out
    }

    fn generate_detailed(ctx: &ResearchContext, citations: &[Citation]) -> String {
        let mut out = format!("# Research Report: {}\n\n", ctx.topic);
        if ctx.analysis.degraded {
            out.push_str("> Synthesis unavailable; showing a placeholder.\n\n");
        }

        out.push_str("## Analysis\n\n");
        out.push_str(&ctx.analysis.text);
        out.push('\n');

        if let Some(v) = &ctx.verification {
            if !v.cross_references.is_empty() {
                out.push_str("\n## Corroborated Claims\n\n");
                for (i, cr) in v.cross_references.iter().enumerate() {
                    out.push_str(&format!(
                        "{}. {} ({} sources)\n",
                        i + 1,
                        cr.claim,
                        cr.count
                    ));
                }
            }

            if !v.fact_checks.is_empty() {
                out.push_str("\n## Statements to Fact-Check\n\n");
                for fc in &v.fact_checks {
                    out.push_str(&format!("- {} [{}]\n", fc.claim, fc.source));
                }
            }

            if !v.contradictions.is_empty() {
                out.push_str("\n## Contradictions\n\n");
                for c in &v.contradictions {
                    out.push_str(&format!("- **Claim A** [{}]: {}\n", c.source_a, c.claim_a));
                    out.push_str(&format!("  **Claim B** [{}]: {}\n", c.source_b, c.claim_b));
                    out.push_str(&format!("  **Type:** {:?}\n\n", c.contradiction_type));
                }
            }
        }

        out.push_str("\n## Sources\n\n");
        for result in &ctx.results {
            let credibility = ctx
                .verification
                .as_ref()
                .and_then(|v| v.credibility_scores.iter().find(|c| c.source == result.source.id))
                .map(|c| format!(", credibility: {:.0}%", c.score * 100.0))
                .unwrap_or_default();
            out.push_str(&format!(
                "- **{}** (relevance: {:.0}%, quality: {:.0}%{})\n  {}\n",
                result.source.title,
                result.analysis.relevance * 100.0,
                result.analysis.quality * 100.0,
                credibility,
                result.source.url,
            ));
        }

        if !citations.is_empty() {
            out.push_str("\n## References\n\n");
            for citation in citations {
                out.push_str(&format!("- {}\n", citation.text));
            }
        }

        out.push_str(&format!(
            "\n---\n**Overall Confidence:** {}\n",
            confidence_label(ctx.verification.as_ref())
        ));
        out
    }

    fn generate_bibliography(ctx: &ResearchContext, citations: &[Citation]) -> String {
        let mut out = format!("# Annotated Bibliography: {}\n\n", ctx.topic);

        for result in &ctx.results {
            let source = &result.source;
            match citations.iter().find(|c| c.source_id == source.id) {
                Some(citation) => out.push_str(&format!("## {}\n", citation.text)),
                None => out.push_str(&format!("## {}\n**URL:** {}\n", source.title, source.url)),
            }
            out.push_str(&format!(
                "**Relevance:** {:.0}% | **Quality:** {:.0}% | **Bias:** {:?}\n",
                result.analysis.relevance * 100.0,
                result.analysis.quality * 100.0,
                result.analysis.bias,
            ));
            if !result.analysis.topics.is_empty() {
                out.push_str(&format!("**Topics:** {}\n", result.analysis.topics.join(", ")));
            }
            if !source.snippet.is_empty() {
                out.push_str(&format!("**Summary:** {}\n", source.snippet));
            }
            out.push('\n');
        }

        out
    }
}

fn confidence_label(verification: Option<&Verification>) -> String {
    match verification {
        Some(v) => format!("{:.0}%", v.confidence * 100.0),
        None => "n/a (verification disabled)".to_string(),
    }
}
