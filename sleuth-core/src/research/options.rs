//! Per-call research options.

use crate::config::{CitationStyle, ReportFormat, ResearchConfig, ResearchDepth};
use crate::error::InputError;
use serde::{Deserialize, Serialize};

/// Options controlling one research call. Part of the cache key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchOptions {
    pub max_sources: usize,
    pub verification_enabled: bool,
    pub quality_threshold: f64,
    pub persona: String,
    pub tone: String,
    pub depth: ResearchDepth,
    pub format: ReportFormat,
    pub citation_style: CitationStyle,
}

impl Default for ResearchOptions {
    fn default() -> Self {
        Self::from_config(&ResearchConfig::default())
    }
}

impl ResearchOptions {
    /// Options taken from the `research.*` configuration section.
    pub fn from_config(config: &ResearchConfig) -> Self {
        Self {
            max_sources: config.max_sources,
            verification_enabled: config.verification_enabled,
            quality_threshold: config.result_quality_threshold,
            persona: config.persona.clone(),
            tone: config.tone.clone(),
            depth: config.depth,
            format: config.default_format,
            citation_style: config.citation_style,
        }
    }

    /// Canonical form: free-text fields trimmed, lowercased and whitespace-collapsed,
    /// and a `-0.0` threshold folded to `0.0`.
    pub fn normalized(&self) -> Self {
        let quality_threshold = if self.quality_threshold == 0.0 {
            0.0
        } else {
            self.quality_threshold
        };
        Self {
            persona: normalize_label(&self.persona),
            tone: normalize_label(&self.tone),
            quality_threshold,
            ..self.clone()
        }
    }

    pub fn validate(&self) -> Result<(), InputError> {
        if !self.quality_threshold.is_finite() || !(0.0..=1.0).contains(&self.quality_threshold)
        {
            return Err(InputError::InvalidOption {
                field: "quality_threshold".into(),
                reason: format!("{} is outside [0, 1]", self.quality_threshold),
            });
        }
        Ok(())
    }
}

fn normalize_label(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config() {
        let config = ResearchConfig {
            max_sources: 3,
            verification_enabled: false,
            result_quality_threshold: 0.4,
            ..Default::default()
        };
        let opts = ResearchOptions::from_config(&config);
        assert_eq!(opts.max_sources, 3);
        assert!(!opts.verification_enabled);
        assert!((opts.quality_threshold - 0.4).abs() < f64::EPSILON);
    }

    #[test]
    fn test_normalized_folds_labels() {
        let opts = ResearchOptions {
            persona: "  Research   Analyst ".into(),
            tone: "NEUTRAL".into(),
            ..Default::default()
        };
        let norm = opts.normalized();
        assert_eq!(norm.persona, "research analyst");
        assert_eq!(norm.tone, "neutral");
        assert_eq!(norm, ResearchOptions::default().normalized());
    }

    #[test]
    fn test_negative_zero_threshold_shares_cache_key() {
        let negative = ResearchOptions {
            quality_threshold: -0.0,
            ..Default::default()
        };
        let positive = ResearchOptions {
            quality_threshold: 0.0,
            ..Default::default()
        };
        assert!(negative.validate().is_ok());
        assert!(negative.normalized().quality_threshold.is_sign_positive());
        assert_eq!(
            crate::cache::cache_key("topic", &negative.normalized()).unwrap(),
            crate::cache::cache_key("topic", &positive.normalized()).unwrap()
        );
    }

    #[test]
    fn test_validate_threshold() {
        let mut opts = ResearchOptions::default();
        assert!(opts.validate().is_ok());
        opts.quality_threshold = 1.5;
        assert!(matches!(
            opts.validate(),
            Err(InputError::InvalidOption { .. })
        ));
        opts.quality_threshold = f64::NAN;
        assert!(opts.validate().is_err());
    }
}
