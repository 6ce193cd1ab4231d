//! Resolution of the component-level environment variables that drive the
//! Rule Store, AI Oracle Client, Confidence Engine and Streaming Guardrail.
//!
//! Every variable here follows the same pattern as
//! [`super::PolicyBuilder`]: read once at startup, validated eagerly, and an
//! invalid value produces a [`super::ConfigError::EnvParse`] rather than a
//! silent default — except where the external contract explicitly calls for
//! "log and fall back to default" (see [`GuardrailConfig::from_env`]).

use super::ConfigError;
use std::collections::HashMap;
use std::time::Duration;

/// Behavior when the Rule Store's durable backend is unreachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleStoreOnFail {
    /// Proceed with whatever is cached, or an empty catalog if nothing is —
    /// the request is still inspected, just against fewer rules.
    Open,
    /// Treat the outage as fatal: [`crate::rules::RuleStore::is_available`]
    /// reports `false` and the Detector blocks the request outright rather
    /// than inspecting it against an empty catalog (spec.md §6
    /// `RuleStoreUnavailable`).
    Closed,
}

impl Default for RuleStoreOnFail {
    fn default() -> Self {
        Self::Closed
    }
}

/// Streaming guardrail execution mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMode {
    /// Re-run the detector against every accumulated delta and rewrite the
    /// stream in place before forwarding it to the client.
    Sync,
    /// Forward the stream byte-for-byte and validate the full response in a
    /// background task purely for audit purposes.
    AsyncValidate,
}

impl Default for StreamMode {
    fn default() -> Self {
        Self::Sync
    }
}

/// What to do when an upstream SSE event cannot be parsed as JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFailMode {
    /// Stop the stream and emit the bit-exact blocked-stream error event.
    Strict,
    /// Forward the malformed line as-is and keep streaming.
    Lenient,
}

impl Default for StreamFailMode {
    fn default() -> Self {
        Self::Lenient
    }
}

/// What to do when the Streaming Guardrail blocks an in-flight response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnFail {
    /// Terminate the stream immediately.
    Halt,
    /// Allow the partial response to finish without further checks.
    Continue,
}

impl Default for OnFail {
    fn default() -> Self {
        Self::Halt
    }
}

/// Resolved configuration for the detection and streaming components.
///
/// Built once at process startup via [`GuardrailConfig::from_env`] and
/// shared as an `Arc` across request tasks — see `SPEC_FULL.md` §5.
#[derive(Debug, Clone)]
pub struct GuardrailConfig {
    /// Behavior when the rule store's durable backend is unreachable.
    pub rulestore_on_fail: RuleStoreOnFail,
    /// Global block threshold, used when no per-category override applies.
    pub confidence_block_threshold: f64,
    /// Global allow threshold.
    pub confidence_allow_threshold: f64,
    /// Per-category block threshold overrides (`CONFIDENCE_{CATEGORY}_THRESHOLD`).
    pub category_thresholds: HashMap<String, f64>,
    /// Categories for which AI confirmation is requested (`AI_CONFIRM_{CATEGORY}=true`).
    pub ai_confirm_categories: Vec<String>,
    /// SIEM webhook endpoint; `None` disables event publishing entirely.
    pub siem_webhook_url: Option<String>,
    /// Streaming guardrail mode.
    pub stream_mode: StreamMode,
    /// Streaming malformed-event behavior.
    pub stream_fail_mode: StreamFailMode,
    /// Action taken when the streaming guardrail blocks content mid-stream.
    pub stream_on_fail: OnFail,
    /// Maximum bytes retained in the raw/validated stream buffers; `0`
    /// means unbounded (`STREAM_MAX_BUFFER_BYTES` default per the external
    /// interface contract).
    pub stream_max_buffer_bytes: usize,
    /// Timeout applied to the event publisher's webhook POST.
    pub event_publish_timeout: Duration,
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            rulestore_on_fail: RuleStoreOnFail::default(),
            confidence_block_threshold: 0.85,
            confidence_allow_threshold: 0.30,
            category_thresholds: HashMap::new(),
            ai_confirm_categories: Vec::new(),
            siem_webhook_url: None,
            stream_mode: StreamMode::default(),
            stream_fail_mode: StreamFailMode::default(),
            stream_on_fail: OnFail::default(),
            stream_max_buffer_bytes: 0,
            event_publish_timeout: Duration::from_secs(2),
        }
    }
}

impl GuardrailConfig {
    /// Resolve configuration from the process environment.
    ///
    /// `AI_CONFIRM_{CATEGORY}` and `CONFIDENCE_{CATEGORY}_THRESHOLD` are
    /// discovered by scanning `known_categories` rather than the whole
    /// environment, since category names are admin-defined and not
    /// enumerable from `std::env::vars()` alone without a prefix scan; the
    /// rule store supplies the active category list at call time.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EnvParse`] if a numeric or boolean variable is
    /// set but cannot be parsed. Unset variables fall back to defaults
    /// silently, matching the "use default" branch of the external
    /// interface's threshold-resolution contract.
    pub fn from_env(known_categories: &[String]) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("RULESTORE_ONFAIL") {
            cfg.rulestore_on_fail = match v.to_lowercase().as_str() {
                "open" => RuleStoreOnFail::Open,
                "closed" => RuleStoreOnFail::Closed,
                _ => {
                    return Err(ConfigError::EnvParse {
                        key: "RULESTORE_ONFAIL".to_string(),
                        message: "must be 'open' or 'closed'".to_string(),
                    });
                }
            };
        }

        if let Ok(v) = std::env::var("CONFIDENCE_BLOCK_THRESHOLD") {
            if let Some(value) = parse_f64_or_warn("CONFIDENCE_BLOCK_THRESHOLD", &v) {
                cfg.confidence_block_threshold = value;
            }
        }
        if let Ok(v) = std::env::var("CONFIDENCE_ALLOW_THRESHOLD") {
            if let Some(value) = parse_f64_or_warn("CONFIDENCE_ALLOW_THRESHOLD", &v) {
                cfg.confidence_allow_threshold = value;
            }
        }

        for category in known_categories {
            let key = format!("CONFIDENCE_{}_THRESHOLD", category.to_uppercase());
            if let Ok(v) = std::env::var(&key) {
                if let Some(value) = parse_f64_or_warn(&key, &v) {
                    cfg.category_thresholds.insert(category.clone(), value);
                }
            }

            let confirm_key = format!("AI_CONFIRM_{}", category.to_uppercase());
            if let Ok(v) = std::env::var(&confirm_key) {
                if parse_bool(&confirm_key, &v)? {
                    cfg.ai_confirm_categories.push(category.clone());
                }
            }
        }

        if let Ok(v) = std::env::var("SIEM_WEBHOOK_URL") {
            if !v.is_empty() {
                cfg.siem_webhook_url = Some(v);
            }
        }

        if let Ok(v) = std::env::var("STREAM_MODE") {
            cfg.stream_mode = match v.to_uppercase().as_str() {
                "STREAM_SYNC" | "SYNC" => StreamMode::Sync,
                "STREAM_ASYNC_VALIDATE" | "ASYNC_VALIDATE" => StreamMode::AsyncValidate,
                _ => {
                    return Err(ConfigError::EnvParse {
                        key: "STREAM_MODE".to_string(),
                        message: "must be 'STREAM_SYNC' or 'STREAM_ASYNC_VALIDATE'".to_string(),
                    });
                }
            };
        }

        if let Ok(v) = std::env::var("STREAM_FAIL_MODE") {
            cfg.stream_fail_mode = match v.to_uppercase().as_str() {
                "STRICT" => StreamFailMode::Strict,
                "LENIENT" => StreamFailMode::Lenient,
                _ => {
                    return Err(ConfigError::EnvParse {
                        key: "STREAM_FAIL_MODE".to_string(),
                        message: "must be 'STRICT' or 'LENIENT'".to_string(),
                    });
                }
            };
        }

        if let Ok(v) = std::env::var("STREAM_ON_FAIL") {
            cfg.stream_on_fail = match v.to_lowercase().as_str() {
                "halt" => OnFail::Halt,
                "continue" => OnFail::Continue,
                _ => {
                    return Err(ConfigError::EnvParse {
                        key: "STREAM_ON_FAIL".to_string(),
                        message: "must be 'halt' or 'continue'".to_string(),
                    });
                }
            };
        }

        if let Ok(v) = std::env::var("STREAM_MAX_BUFFER_BYTES") {
            cfg.stream_max_buffer_bytes = v.parse().map_err(|_| ConfigError::EnvParse {
                key: "STREAM_MAX_BUFFER_BYTES".to_string(),
                message: "must be a positive integer".to_string(),
            })?;
        }

        Ok(cfg)
    }

    /// Resolve the block threshold for a category, honoring the override
    /// order required by the external interface contract: per-category env
    /// var, then the global block threshold, then the compiled default.
    #[must_use]
    pub fn block_threshold_for(&self, category: &str) -> f64 {
        self.category_thresholds
            .get(category)
            .copied()
            .unwrap_or(self.confidence_block_threshold)
    }

    /// Returns `true` if AI confirmation was requested for `category`.
    #[must_use]
    pub fn ai_confirm(&self, category: &str) -> bool {
        self.ai_confirm_categories.iter().any(|c| c == category)
    }
}

/// Parse a threshold env var, warning and falling back to the compiled
/// default on a non-numeric value rather than failing `from_env` — spec.md
/// §7's `ConfigInvalid` contract for threshold variables specifically.
fn parse_f64_or_warn(key: &str, raw: &str) -> Option<f64> {
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = raw, "invalid threshold value, keeping default");
            None
        }
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ConfigError::EnvParse {
            key: key.to_string(),
            message: "must be 'true' or 'false'".to_string(),
        }),
    }
}
