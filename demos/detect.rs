//! Minimal detect-and-print demo, ported from `go-detect/main.go`.
//!
//! Unlike the Go original, there is no network client: the library is its
//! own SDK, so this binary wires a [`Detector`] in-process against a small
//! seed catalog and calls it directly.

use std::sync::Arc;

use tsz_guard::cache::InMemoryCache;
use tsz_guard::config::GuardrailConfig;
use tsz_guard::config::guardrail::RuleStoreOnFail;
use tsz_guard::detector::{DetectRequest, Detector};
use tsz_guard::events::NullEventPublisher;
use tsz_guard::model::Pattern;
use tsz_guard::oracle::NullOracleClient;
use tsz_guard::rules::{CachedRuleStore, InMemoryRuleSource};

fn seed_patterns() -> Vec<Pattern> {
    vec![Pattern {
        name: "profanity_basic".to_string(),
        regex: r"(?i)\b(idiot|stupid|moron)\b".to_string(),
        category: "TOXIC_LANGUAGE".to_string(),
        is_active: true,
        description: "Demo-only coarse profanity match".to_string(),
        block_threshold: None,
    }]
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let source = InMemoryRuleSource::new(seed_patterns(), vec![], vec![], vec![]);
    let rules = Arc::new(CachedRuleStore::new(
        source,
        Arc::new(InMemoryCache::new()),
        RuleStoreOnFail::Open,
    ));
    let detector = Detector::new(
        rules,
        Arc::new(NullOracleClient),
        Arc::new(NullEventPublisher),
        GuardrailConfig::default(),
    );

    let request = DetectRequest::new("Contact me at john@example.com")
        .with_categories(vec!["TOXIC_LANGUAGE".to_string()])
        .with_request_id("RID-EXAMPLE-DETECT-001");

    let response = detector.detect(request).await;

    if response.blocked {
        println!("Request blocked by tsz-guard: {}", response.message);
        return;
    }

    println!("Redacted text: {}", response.redacted_text);
    println!("Detections: {:?}", response.detections);
    println!("Breakdown by category: {:?}", response.breakdown);
}
