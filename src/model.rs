//! Wire and persisted-state types shared by every component.
//!
//! These mirror the data model in `SPEC_FULL.md` §3 one-to-one. The only
//! type with custom wire behavior is [`Confidence`], whose `Serialize` impl
//! emits a quoted two-decimal string — internal arithmetic stays full
//! `f64` precision; rounding happens only at this boundary.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Deref;

/// A confidence value in `[0.0, 1.0]`.
///
/// Serializes as a quoted string with exactly two decimal digits (e.g.
/// `"0.85"`), matching the persisted-state and wire contract. Internal
/// computation should use the `f64` accessor ([`Confidence::value`]) and
/// only wrap into `Confidence` when a value is about to cross the wire.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Confidence(f64);

impl Confidence {
    /// Construct a confidence value, clamping to `[0.0, 1.0]`.
    #[must_use]
    pub fn new(value: f64) -> Self {
        Self(value.clamp(0.0, 1.0))
    }

    /// The underlying `f64` value.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl Deref for Confidence {
    type Target = f64;
    fn deref(&self) -> &f64 {
        &self.0
    }
}

impl From<f64> for Confidence {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl Serialize for Confidence {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&format!("{:.2}", self.0))
    }
}

impl<'de> Deserialize<'de> for Confidence {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse::<f64>()
            .map(Confidence::new)
            .map_err(serde::de::Error::custom)
    }
}

/// A content pattern maintained by the Rule Store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pattern {
    /// Unique, human-assigned name.
    pub name: String,
    /// The regular expression body (no delimiters).
    pub regex: String,
    /// Open category label (`PII`, `SECRET`, `INJECTION`, `TOXIC_LANGUAGE`, …).
    pub category: String,
    /// Whether this pattern currently participates in detection.
    pub is_active: bool,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Optional per-pattern block threshold, overriding any environment
    /// threshold when present (§4.C threshold resolution order).
    #[serde(default)]
    pub block_threshold: Option<f64>,
}

/// An allow-listed literal value that suppresses matches against it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllowItem {
    /// The literal value to allow.
    pub value: String,
}

/// A deny-listed literal value that always triggers a block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenyItem {
    /// The literal value to deny.
    pub value: String,
}

/// The kind of post-match confirmation a [`FormatValidator`] performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidatorKind {
    /// Luhn checksum (credit card numbers).
    Luhn,
    /// RFC 4122 UUID syntax.
    Uuid,
    /// Email address syntax plus a (stubbed, no-network) domain-shape check.
    EmailDns,
    /// A secondary regular expression applied to the matched span.
    Regex,
}

/// A named format validator that confirms a candidate match is a true
/// positive before it is reported.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatValidator {
    /// Validator name, referenced from a [`Pattern`] by convention
    /// (`{pattern_name}_validator`) or applied by category.
    pub name: String,
    /// Which kind of check this validator performs.
    pub kind: ValidatorKind,
    /// For [`ValidatorKind::Regex`], the secondary pattern to apply.
    #[serde(default)]
    pub rule: Option<String>,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
}

/// A single pattern hit, reported as part of a [`DetectionResponse`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    /// The pattern or rule that matched.
    pub pattern: String,
    /// Open category label.
    pub category: String,
    /// Final confidence assigned to this detection.
    pub confidence: Confidence,
    /// The threshold it was compared against.
    pub threshold: f64,
    /// Whether this detection caused the overall response to block.
    pub blocked: bool,
    /// `"BLOCK"` or `"MASK"` — whether this detection halted the request or
    /// only redacted its span in `redacted_text`.
    pub action: String,
    /// Full scoring breakdown for audit.
    pub explanation: ConfidenceExplanation,
}

/// The full response returned by [`crate::detector::Detector::detect`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionResponse {
    /// Whether any detection triggered a block.
    pub blocked: bool,
    /// Human-readable summary message.
    pub message: String,
    /// Text with blocked/redacted spans replaced by placeholders. Empty
    /// when `blocked` is `true` — a blocked request's original text never
    /// crosses back out.
    pub redacted_text: String,
    /// Every individual detection considered, in match order.
    pub detections: Vec<Detection>,
    /// Detection count per category.
    pub breakdown: HashMap<String, i64>,
}

impl DetectionResponse {
    /// An allow-everything response for empty or fully benign input.
    #[must_use]
    pub fn allow(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            blocked: false,
            message: String::new(),
            redacted_text: text,
            detections: Vec::new(),
            breakdown: HashMap::new(),
        }
    }
}

/// The full scoring breakdown behind a single [`Detection`], mirroring the
/// persisted-state `ConfidenceExplanation` shape bit-for-bit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfidenceExplanation {
    /// Detection source (`REGEX`, `AI`, `SCHEMA`, …).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Open category label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Raw regex-only score, prior to hybrid fusion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regex_score: Option<Confidence>,
    /// Raw AI-oracle-only score, prior to hybrid fusion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_score: Option<Confidence>,
    /// Number of regex hits that contributed to the base score.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regex_hit_count: Option<i64>,
    /// Whether the owning pattern was active at evaluation time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern_active: Option<bool>,
    /// The block threshold in force for this category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_threshold: Option<f64>,
    /// The allow threshold in force for this category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_threshold: Option<f64>,
    /// Where the threshold came from (`PATTERN`, `ENV`, `DEFAULT`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold_source: Option<String>,
    /// Whether hybrid (regex + AI) fusion was applied to produce `final_score`.
    pub hybrid_applied: bool,
    /// The final, post-fusion confidence used for the block/allow decision.
    pub final_score: Confidence,
}

/// A published security event, matching the bit-exact SIEM webhook payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityEvent {
    /// The decision this event reports (`BLOCK`, `MASK`, or `ALLOW`).
    #[serde(rename = "type")]
    pub event_type: String,
    /// Open category label.
    pub category: String,
    /// The pattern or rule name that fired.
    pub pattern: String,
    /// The confidence score that triggered this event.
    pub confidence_score: f64,
    /// The threshold compared against.
    pub threshold: f64,
    /// What action was taken (`block`, `redact`, `allow`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// Correlation id for the originating request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Unix timestamp (seconds) at publish time.
    pub timestamp: i64,
}

/// A guardrail template import payload (admin CRUD is out of scope; the
/// shape is kept here since the Rule Store's refresh contract is triggered
/// by it).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardrailTemplate {
    /// Template name.
    pub name: String,
    /// Patterns to upsert by name.
    pub patterns: Vec<Pattern>,
    /// Validators to upsert by name.
    pub validators: Vec<FormatValidator>,
}

/// Metadata about a detected/guarded item keyed by arbitrary string tags,
/// used by the gateway layer to carry request-scoped context without
/// widening every function signature.
pub type Tags = HashMap<String, String>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_serializes_as_quoted_two_decimals() {
        let c = Confidence::new(0.8);
        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(json, "\"0.80\"");
    }

    #[test]
    fn confidence_rounds_at_the_boundary_only() {
        let c = Confidence::new(0.854_999);
        assert_eq!(serde_json::to_string(&c).unwrap(), "\"0.85\"");
        assert!((c.value() - 0.854_999).abs() < 1e-9);
    }

    #[test]
    fn confidence_clamps_out_of_range_values() {
        assert_eq!(Confidence::new(1.5).value(), 1.0);
        assert_eq!(Confidence::new(-0.2).value(), 0.0);
    }

    #[test]
    fn confidence_round_trips_through_json() {
        let c = Confidence::new(0.42);
        let json = serde_json::to_string(&c).unwrap();
        let back: Confidence = serde_json::from_str(&json).unwrap();
        assert_eq!(back.value(), 0.42);
    }

    #[test]
    fn explanation_omits_unset_optional_fields() {
        let explanation = ConfidenceExplanation {
            hybrid_applied: false,
            final_score: Confidence::new(0.1),
            ..Default::default()
        };
        let json = serde_json::to_string(&explanation).unwrap();
        assert!(!json.contains("source"));
        assert!(json.contains("hybrid_applied"));
        assert!(json.contains("final_score"));
    }

    #[test]
    fn detection_response_allow_has_empty_breakdown() {
        let resp = DetectionResponse::allow("hello");
        assert!(!resp.blocked);
        assert!(resp.detections.is_empty());
        assert!(resp.breakdown.is_empty());
        assert_eq!(resp.redacted_text, "hello");
    }
}
