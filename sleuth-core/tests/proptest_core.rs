//! Property-based tests for core components using proptest.

use proptest::prelude::*;
use std::collections::HashSet;

use sleuth_core::cache::{cache_key, cache_key_from_value};
use sleuth_core::research::sources::{deduplicate, filter_by_quality, prepare, rank};
use sleuth_core::research::verification::{
    Claim, VerificationEngine, credibility, cross_reference, normalize_claim, overall_confidence,
};
use sleuth_core::research::{AnalysisScores, AnalyzedResult, BiasLevel, ResearchOptions, Source};

fn arb_source() -> impl Strategy<Value = (u8, u8, f64, f64)> {
    (0u8..6, 0u8..6, 0.0f64..=1.0, 0.0f64..=1.0)
}

fn build_sources(specs: &[(u8, u8, f64, f64)]) -> Vec<Source> {
    specs
        .iter()
        .enumerate()
        .map(|(i, (url, title, rel, qual))| {
            Source::new(
                format!("s{i}"),
                format!("Title {title}"),
                format!("https://site{url}.org/page"),
            )
            .with_scores(*rel, *qual)
        })
        .collect()
}

// --- Source preparation properties ---

proptest! {
    #[test]
    fn dedupe_never_keeps_shared_url_or_title(specs in prop::collection::vec(arb_source(), 0..30)) {
        let unique = deduplicate(build_sources(&specs));
        let urls: HashSet<&str> = unique.iter().map(|s| s.url.as_str()).collect();
        let titles: HashSet<&str> = unique.iter().map(|s| s.title.as_str()).collect();
        prop_assert_eq!(urls.len(), unique.len());
        prop_assert_eq!(titles.len(), unique.len());
    }

    #[test]
    fn dedupe_keeps_first_occurrence(specs in prop::collection::vec(arb_source(), 1..30)) {
        let unique = deduplicate(build_sources(&specs));
        prop_assert_eq!(unique[0].id.as_str(), "s0");
    }

    #[test]
    fn filter_drops_everything_below_threshold(
        specs in prop::collection::vec(arb_source(), 0..30),
        threshold in 0.0f64..=1.0,
    ) {
        let sources = build_sources(&specs);
        let expected = sources.iter().filter(|s| s.effective_quality() >= threshold).count();
        let kept = filter_by_quality(sources, threshold);
        prop_assert_eq!(kept.len(), expected);
        prop_assert!(kept.iter().all(|s| s.effective_quality() >= threshold));
    }

    #[test]
    fn rank_is_descending_and_stable(specs in prop::collection::vec(arb_source(), 0..30)) {
        let ranked = rank(build_sources(&specs));
        for pair in ranked.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            prop_assert!(a.rank_score() >= b.rank_score());
            if a.rank_score() == b.rank_score() {
                let ia: usize = a.id[1..].parse().unwrap();
                let ib: usize = b.id[1..].parse().unwrap();
                prop_assert!(ia < ib);
            }
        }
    }

    #[test]
    fn prepare_leaves_no_shared_ids(ids in prop::collection::vec(0u8..3, 0..20)) {
        let sources: Vec<Source> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| Source::new(id.to_string(), format!("Title {i}"), format!("https://site{i}.org")))
            .collect();
        let prepared = prepare(sources, 0.0);
        let distinct: HashSet<&str> = prepared.iter().map(|s| s.id.as_str()).collect();
        prop_assert_eq!(prepared.len(), ids.len());
        prop_assert_eq!(distinct.len(), prepared.len());
    }

    #[test]
    fn prepare_never_grows_input(
        specs in prop::collection::vec(arb_source(), 0..30),
        threshold in 0.0f64..=1.0,
    ) {
        let prepared = prepare(build_sources(&specs), threshold);
        prop_assert!(prepared.len() <= specs.len());
    }
}

// --- Credibility properties ---

proptest! {
    #[test]
    fn credibility_is_bounded(
        host in "[a-z]{1,10}",
        tld in prop::sample::select(vec!["edu", "org", "gov", "com", "net", "io"]),
        quality in prop::option::of(-1.0f64..2.0),
        bias in 0u8..3,
        readability in -50.0f64..150.0,
    ) {
        let mut source = Source::new("s", "T", format!("https://{host}.{tld}/x"));
        source.quality_score = quality;
        let mut analysis = AnalysisScores::neutral();
        analysis.bias = match bias {
            0 => BiasLevel::Low,
            1 => BiasLevel::Medium,
            _ => BiasLevel::High,
        };
        analysis.readability = readability;
        let result = AnalyzedResult {
            source,
            extracted_content: String::new(),
            analysis,
        };
        let score = credibility(&result);
        prop_assert!((0.0..=1.0).contains(&score));
    }

    #[test]
    fn credibility_handles_unparseable_urls(url in "\\PC{0,40}") {
        let result = AnalyzedResult {
            source: Source::new("s", "T", url),
            extracted_content: String::new(),
            analysis: AnalysisScores::neutral(),
        };
        let score = credibility(&result);
        prop_assert!((0.0..=1.0).contains(&score));
    }

    #[test]
    fn overall_confidence_is_bounded(
        refs in 0usize..20,
        scores in prop::collection::vec(0.0f64..=1.0, 0..10),
    ) {
        let c = overall_confidence(refs, &scores);
        prop_assert!((0.0..=1.0).contains(&c));
    }
}

#[test]
fn overall_confidence_worked_example() {
    let c = overall_confidence(3, &[0.8, 0.9]);
    assert!((c - 0.86).abs() < 1e-9);
}

// --- Cross-reference properties ---

proptest! {
    #[test]
    fn cross_reference_counts_distinct_sources(
        pairs in prop::collection::vec((0u8..4, 0u8..5), 0..40),
    ) {
        let claims: Vec<Claim> = pairs
            .iter()
            .map(|(claim, source)| {
                let text = format!("Claim number {claim} holds");
                Claim {
                    source_id: format!("src{source}"),
                    normalized: normalize_claim(&text),
                    text,
                }
            })
            .collect();

        let refs = cross_reference(&claims);
        for r in &refs {
            let distinct: HashSet<&str> = claims
                .iter()
                .filter(|c| c.normalized == r.normalized_claim)
                .map(|c| c.source_id.as_str())
                .collect();
            prop_assert_eq!(r.count, distinct.len());
            prop_assert_eq!(r.supporting_sources.len(), r.count);
            prop_assert!(r.count >= 2);
        }
        for pair in refs.windows(2) {
            prop_assert!(pair[0].count >= pair[1].count);
        }
    }

    #[test]
    fn shared_claim_counts_every_result_despite_id_collisions(
        ids in prop::collection::vec(0u8..3, 2..12),
    ) {
        let results: Vec<AnalyzedResult> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| AnalyzedResult {
                source: Source::new(id.to_string(), format!("Title {i}"), format!("https://site{i}.org")),
                extracted_content: "Grid storage capacity doubled last year.".to_string(),
                analysis: AnalysisScores::neutral(),
            })
            .collect();
        let verification = VerificationEngine::new().verify(&results);
        prop_assert_eq!(verification.cross_references.len(), 1);
        prop_assert_eq!(verification.cross_references[0].count, results.len());
        let labels: HashSet<&str> = verification
            .credibility_scores
            .iter()
            .map(|c| c.source.as_str())
            .collect();
        prop_assert_eq!(labels.len(), results.len());
    }

    #[test]
    fn normalize_claim_is_idempotent(text in "[A-Za-z ,.!?]{0,60}") {
        let once = normalize_claim(&text);
        prop_assert_eq!(normalize_claim(&once), once);
    }
}

// --- Cache key properties ---

proptest! {
    #[test]
    fn cache_key_ignores_field_order(a in 0i64..100, b in "[a-z]{0,8}", c in any::<bool>()) {
        let forward: serde_json::Value =
            serde_json::from_str(&format!(r#"{{"a":{a},"b":"{b}","c":{c}}}"#)).unwrap();
        let backward: serde_json::Value =
            serde_json::from_str(&format!(r#"{{"c":{c},"b":"{b}","a":{a}}}"#)).unwrap();
        prop_assert_eq!(
            cache_key_from_value("topic", &forward),
            cache_key_from_value("topic", &backward)
        );
    }

    #[test]
    fn cache_key_ignores_topic_whitespace_and_case(words in prop::collection::vec("[a-zA-Z]{1,8}", 1..6)) {
        let options = ResearchOptions::default();
        let compact = words.join(" ");
        let padded = format!("  {}  ", words.join("   \t"));
        prop_assert_eq!(
            cache_key(&compact, &options).unwrap(),
            cache_key(&padded.to_uppercase(), &options).unwrap()
        );
    }

    #[test]
    fn cache_key_separates_sources_limits(x in 1usize..50, y in 1usize..50) {
        prop_assume!(x != y);
        let a = ResearchOptions { max_sources: x, ..ResearchOptions::default() };
        let b = ResearchOptions { max_sources: y, ..ResearchOptions::default() };
        prop_assert_ne!(cache_key("t", &a).unwrap(), cache_key("t", &b).unwrap());
    }
}
