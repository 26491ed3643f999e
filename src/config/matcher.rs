//! Problem matcher tuning

use serde::{Deserialize, Serialize};

/// Thresholds and limits used by the problem matcher
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MatcherConfig {
    /// A candidate is accepted only when its score is strictly above this
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f64,

    /// Minimum (exclusive) score for an entry to be listed as similar
    #[serde(default = "default_similar_threshold")]
    pub similar_threshold: f64,

    /// Maximum number of similar problems returned with a match
    #[serde(default = "default_similar_limit")]
    pub similar_limit: usize,

    /// Tokens of this length or shorter are discarded
    #[serde(default = "default_min_token_len")]
    pub min_token_len: usize,

    /// Confidence reported for an unmatched problem
    #[serde(default = "default_fallback_confidence")]
    pub fallback_confidence: f64,
}

fn default_match_threshold() -> f64 {
    0.3
}

fn default_similar_threshold() -> f64 {
    0.2
}

fn default_similar_limit() -> usize {
    3
}

fn default_min_token_len() -> usize {
    3
}

fn default_fallback_confidence() -> f64 {
    0.25
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            match_threshold: default_match_threshold(),
            similar_threshold: default_similar_threshold(),
            similar_limit: default_similar_limit(),
            min_token_len: default_min_token_len(),
            fallback_confidence: default_fallback_confidence(),
        }
    }
}

impl MatcherConfig {
    /// Merge another config into this one (non-default values win)
    pub fn merge(&mut self, other: Self) {
        if other.match_threshold != default_match_threshold() {
            self.match_threshold = other.match_threshold;
        }
        if other.similar_threshold != default_similar_threshold() {
            self.similar_threshold = other.similar_threshold;
        }
        if other.similar_limit != default_similar_limit() {
            self.similar_limit = other.similar_limit;
        }
        if other.min_token_len != default_min_token_len() {
            self.min_token_len = other.min_token_len;
        }
        if other.fallback_confidence != default_fallback_confidence() {
            self.fallback_confidence = other.fallback_confidence;
        }
    }

    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for (name, value) in [
            ("matcher.match_threshold", self.match_threshold),
            ("matcher.similar_threshold", self.similar_threshold),
            ("matcher.fallback_confidence", self.fallback_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                errors.push(format!("{} must be within [0, 1], got {}", name, value));
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_threshold() {
        let config = MatcherConfig {
            match_threshold: 1.5,
            ..Default::default()
        };
        let errors = config.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("match_threshold"));
    }

    #[test]
    fn test_merge_keeps_base_when_other_is_default() {
        let mut base = MatcherConfig {
            similar_limit: 10,
            ..Default::default()
        };
        base.merge(MatcherConfig::default());
        assert_eq!(base.similar_limit, 10);
    }
}
