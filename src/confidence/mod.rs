//! The Confidence Engine — pure scoring functions.
//!
//! None of these functions perform I/O or hold state; they take explicit
//! inputs and return a value, the same shape the teacher keeps its own
//! deterministic score-combination logic in
//! (`wg_bastion::input::ensemble::EnsembleStrategy::combine`). Threshold
//! resolution lives here too since it is a pure lookup over
//! [`crate::config::GuardrailConfig`].
//!
//! ## Open Question decisions
//!
//! `hybrid()` is specified two equivalent ways across the source material:
//! Go's `internal/ai/confidence.go` computes
//! `weighted = regex*0.45 + ai*0.55` and then returns whichever of
//! `{ai, regex, weighted}` is largest; `SPEC_FULL.md` phrases it as
//! `max(weighted, regex, ai)`. Both produce identical results for every
//! input (the conditional return order in the Go source never special-cases
//! a value the `max` wouldn't already pick), so this module implements the
//! `max` form and documents the equivalence rather than branching.

use crate::config::GuardrailConfig;
use crate::model::ConfidenceExplanation;

/// Where a detection's score came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Confirmed or scored by the AI oracle.
    Ai,
    /// Confirmed against a [`crate::model::FormatValidator`] schema.
    Schema,
    /// Matched by a compiled regex pattern alone.
    Regex,
    /// None of the above.
    Other,
}

impl Source {
    fn weight(self) -> f64 {
        match self {
            Self::Ai => 0.4,
            Self::Schema => 0.3,
            Self::Regex => 0.2,
            Self::Other => 0.1,
        }
    }
}

fn category_weight(category: &str) -> f64 {
    match category {
        "SECRET" => 0.35,
        "PII" => 0.25,
        "INJECTION" => 0.3,
        _ => 0.1,
    }
}

/// Inputs to [`compute`], mirroring Go's `guardrails.ConfidenceContext`.
#[derive(Debug, Clone)]
pub struct ConfidenceContext {
    /// Open category label.
    pub category: String,
    /// Whether the governing pattern is currently active.
    pub pattern_active: bool,
    /// Whether the literal value is on the allow-list.
    pub allowlist_hit: bool,
    /// Whether the literal value is on the deny-list.
    pub blacklist_hit: bool,
    /// Where this detection's score is coming from.
    pub source: Source,
}

/// Compute a base confidence score for a single detection context.
///
/// Deny-list hits always win at `1.0`; allow-list hits (when not also
/// denied) drop to `0.1` regardless of other inputs. Otherwise the score
/// accumulates a source weight, a category weight, and an active-pattern
/// bonus (an extra `0.05` when the source is `REGEX`), or a `0.2` penalty
/// when the pattern is inactive. The result is clamped to `[0.0, 1.0]`.
#[must_use]
pub fn compute(ctx: &ConfidenceContext) -> f64 {
    if ctx.blacklist_hit {
        return 1.0;
    }
    if ctx.allowlist_hit {
        return 0.1;
    }

    let mut score = ctx.source.weight() + category_weight(&ctx.category);

    if ctx.pattern_active {
        score += 0.1;
        if matches!(ctx.source, Source::Regex) {
            score += 0.05;
        }
    } else {
        score -= 0.2;
    }

    score.clamp(0.0, 1.0)
}

/// Fuse a regex-only score and an AI-oracle-only score into one confidence.
///
/// `weighted = regex * 0.45 + ai * 0.55`; the result is
/// `max(weighted, regex, ai)`. See the module-level Open Question note for
/// why this differs textually but not numerically from the Go source.
#[must_use]
pub fn hybrid(regex_score: f64, ai_score: f64) -> f64 {
    let weighted = regex_score * 0.45 + ai_score * 0.55;
    weighted.max(regex_score).max(ai_score)
}

/// Scale a base score up by how many independent pattern hits contributed to
/// it, then clamp to `1.0` — the clamp happens only after scaling, never
/// before, so `apply_hit_weight(0.9, 3)` clamps to `1.0` rather than scaling
/// an already-clamped `0.9`.
#[must_use]
pub fn apply_hit_weight(base: f64, hits: u32) -> f64 {
    let multiplier = match hits {
        0 | 1 => 1.0,
        2 => 1.10,
        3 => 1.20,
        _ => 1.30,
    };
    (base * multiplier).min(1.0)
}

/// Where a resolved threshold came from, for audit purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdSource {
    /// A pattern-level override took precedence over everything else.
    PatternOverride,
    /// A `CONFIDENCE_{CATEGORY}_THRESHOLD` environment override.
    CategoryOverride,
    /// The global `CONFIDENCE_BLOCK_THRESHOLD` (or compiled default).
    Global,
}

/// Resolve the effective block threshold for a category, honoring (in
/// order): an explicit per-pattern override, then the category-level
/// environment override, then the global/default threshold.
#[must_use]
pub fn resolve_block_threshold(
    config: &GuardrailConfig,
    category: &str,
    pattern_override: Option<f64>,
) -> (f64, ThresholdSource) {
    if let Some(value) = pattern_override {
        return (value, ThresholdSource::PatternOverride);
    }
    if config.category_thresholds.contains_key(category) {
        return (
            config.block_threshold_for(category),
            ThresholdSource::CategoryOverride,
        );
    }
    (config.confidence_block_threshold, ThresholdSource::Global)
}

/// Build the audit-facing [`ConfidenceExplanation`] for one detection.
#[must_use]
#[allow(clippy::too_many_arguments)]
pub fn explain(
    source: &str,
    category: &str,
    regex_score: Option<f64>,
    ai_score: Option<f64>,
    regex_hit_count: Option<i64>,
    pattern_active: bool,
    block_threshold: f64,
    allow_threshold: f64,
    threshold_source: ThresholdSource,
    hybrid_applied: bool,
    final_score: f64,
) -> ConfidenceExplanation {
    ConfidenceExplanation {
        source: Some(source.to_string()),
        category: Some(category.to_string()),
        regex_score: regex_score.map(crate::model::Confidence::new),
        ai_score: ai_score.map(crate::model::Confidence::new),
        regex_hit_count,
        pattern_active: Some(pattern_active),
        block_threshold: Some(block_threshold),
        allow_threshold: Some(allow_threshold),
        threshold_source: Some(
            match threshold_source {
                ThresholdSource::PatternOverride => "PATTERN",
                ThresholdSource::CategoryOverride => "ENV",
                ThresholdSource::Global => "DEFAULT",
            }
            .to_string(),
        ),
        hybrid_applied,
        final_score: crate::model::Confidence::new(final_score),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blacklist_hit_always_wins() {
        let ctx = ConfidenceContext {
            category: "PII".to_string(),
            pattern_active: false,
            allowlist_hit: true,
            blacklist_hit: true,
            source: Source::Other,
        };
        assert_eq!(compute(&ctx), 1.0);
    }

    #[test]
    fn allowlist_hit_drops_to_point_one() {
        let ctx = ConfidenceContext {
            category: "SECRET".to_string(),
            pattern_active: true,
            allowlist_hit: true,
            blacklist_hit: false,
            source: Source::Regex,
        };
        assert_eq!(compute(&ctx), 0.1);
    }

    #[test]
    fn active_regex_secret_pattern_scores_high() {
        let ctx = ConfidenceContext {
            category: "SECRET".to_string(),
            pattern_active: true,
            allowlist_hit: false,
            blacklist_hit: false,
            source: Source::Regex,
        };
        // 0.2 (regex) + 0.35 (secret) + 0.1 (active) + 0.05 (active regex) = 0.70
        assert!((compute(&ctx) - 0.70).abs() < 1e-9);
    }

    #[test]
    fn inactive_pattern_is_penalized() {
        let ctx = ConfidenceContext {
            category: "PII".to_string(),
            pattern_active: false,
            allowlist_hit: false,
            blacklist_hit: false,
            source: Source::Ai,
        };
        // 0.4 (ai) + 0.25 (pii) - 0.2 (inactive) = 0.45
        assert!((compute(&ctx) - 0.45).abs() < 1e-9);
    }

    #[test]
    fn hybrid_matches_the_three_worked_examples() {
        assert!((hybrid(0.9, 0.2) - 0.9).abs() < 1e-9);
        assert!((hybrid(0.4, 0.8) - 0.8).abs() < 1e-9);
        assert!((hybrid(0.5, 0.5) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn hit_weight_scales_then_clamps() {
        assert!((apply_hit_weight(0.5, 1) - 0.5).abs() < 1e-9);
        assert!((apply_hit_weight(0.5, 2) - 0.55).abs() < 1e-9);
        assert!((apply_hit_weight(0.5, 3) - 0.60).abs() < 1e-9);
        assert_eq!(apply_hit_weight(0.9, 4), 1.0);
    }

    #[test]
    fn threshold_resolution_order() {
        let mut config = GuardrailConfig::default();
        config
            .category_thresholds
            .insert("SECRET".to_string(), 0.6);

        assert_eq!(
            resolve_block_threshold(&config, "SECRET", Some(0.99)),
            (0.99, ThresholdSource::PatternOverride)
        );
        assert_eq!(
            resolve_block_threshold(&config, "SECRET", None),
            (0.6, ThresholdSource::CategoryOverride)
        );
        assert_eq!(
            resolve_block_threshold(&config, "PII", None),
            (config.confidence_block_threshold, ThresholdSource::Global)
        );
    }
}
