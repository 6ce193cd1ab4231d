//! The Rule Store — cache-then-durable-store read-through for patterns,
//! allow/deny literals, and format validators.
//!
//! Regexes are compiled once when a catalog is loaded, the same idiom the
//! teacher uses in `wg_bastion::input::injection::HeuristicDetector::new`
//! (compile-once, reuse-per-call, never recompile per request). A pattern
//! whose regex fails to compile is logged and dropped rather than failing
//! the whole catalog load.

pub mod validators;

use crate::cache::{Cache, keys};
use crate::config::guardrail::RuleStoreOnFail;
use crate::model::{AllowItem, DenyItem, FormatValidator, Pattern};
use async_trait::async_trait;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub use validators::{ValidationOutcome, run_validator};

/// Errors surfaced by a [`RuleStore`] implementation.
#[derive(Debug, Error)]
pub enum RuleStoreError {
    /// The durable backend could not be reached and `RULESTORE_ONFAIL` is
    /// `closed`.
    #[error("durable rule source unavailable: {0}")]
    BackendUnavailable(String),
}

/// A compiled, active pattern ready for matching.
#[derive(Clone)]
pub struct CompiledPattern {
    /// The underlying catalog record.
    pub pattern: Pattern,
    /// The compiled regular expression.
    pub regex: Regex,
}

/// Durable storage for patterns, allow/deny literals, and validators —
/// implemented against whatever database backend a deployment chooses
/// (`storage-redis`/`storage-sqlite` and friends); CRUD over this store is
/// explicitly out of scope here, only reads are required.
#[async_trait]
pub trait DurableRuleSource: Send + Sync {
    /// Load every pattern, active or not — the caller filters by
    /// `is_active` and by compile success.
    async fn load_patterns(&self) -> Result<Vec<Pattern>, RuleStoreError>;
    /// Load the allow-list.
    async fn load_allowlist(&self) -> Result<Vec<AllowItem>, RuleStoreError>;
    /// Load the deny-list.
    async fn load_denylist(&self) -> Result<Vec<DenyItem>, RuleStoreError>;
    /// Load format validators.
    async fn load_validators(&self) -> Result<Vec<FormatValidator>, RuleStoreError>;
}

/// An in-memory [`DurableRuleSource`] — the default backend for tests and
/// single-process deployments that seed their catalog at startup rather
/// than from an external database.
#[derive(Default)]
pub struct InMemoryRuleSource {
    patterns: Vec<Pattern>,
    allowlist: Vec<AllowItem>,
    denylist: Vec<DenyItem>,
    validators: Vec<FormatValidator>,
}

impl InMemoryRuleSource {
    /// Construct a source from explicit catalogs.
    #[must_use]
    pub fn new(
        patterns: Vec<Pattern>,
        allowlist: Vec<AllowItem>,
        denylist: Vec<DenyItem>,
        validators: Vec<FormatValidator>,
    ) -> Self {
        Self {
            patterns,
            allowlist,
            denylist,
            validators,
        }
    }
}

#[async_trait]
impl DurableRuleSource for InMemoryRuleSource {
    async fn load_patterns(&self) -> Result<Vec<Pattern>, RuleStoreError> {
        Ok(self.patterns.clone())
    }
    async fn load_allowlist(&self) -> Result<Vec<AllowItem>, RuleStoreError> {
        Ok(self.allowlist.clone())
    }
    async fn load_denylist(&self) -> Result<Vec<DenyItem>, RuleStoreError> {
        Ok(self.denylist.clone())
    }
    async fn load_validators(&self) -> Result<Vec<FormatValidator>, RuleStoreError> {
        Ok(self.validators.clone())
    }
}

/// The read surface the Detector depends on.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Every active, successfully-compiled pattern.
    async fn get_active_patterns(&self) -> Vec<Arc<CompiledPattern>>;
    /// The allow-list literal set.
    async fn get_allow_set(&self) -> Arc<HashSet<String>>;
    /// The deny-list literal set.
    async fn get_deny_set(&self) -> Arc<HashSet<String>>;
    /// A named format validator, if one exists.
    async fn get_validator(&self, name: &str) -> Option<Arc<FormatValidator>>;
    /// Force a reload of the pattern catalog, bypassing the cache.
    async fn refresh_patterns(&self);
    /// `false` once the cache has nothing cached and the durable backend
    /// could not be reached — the Detector consults this under
    /// `RULESTORE_ONFAIL=CLOSED` to fail the request instead of silently
    /// serving an empty catalog (spec.md §4.A / §6 `RuleStoreUnavailable`).
    async fn is_available(&self) -> bool;
}

struct Catalog {
    patterns: Vec<Arc<CompiledPattern>>,
    allow: Arc<HashSet<String>>,
    deny: Arc<HashSet<String>>,
    validators: HashMap<String, Arc<FormatValidator>>,
    unavailable: bool,
}

/// A [`RuleStore`] that reads through an in-process cache in front of a
/// [`DurableRuleSource`], with a 1-hour TTL on every cached catalog
/// (matching the persisted-state contract).
pub struct CachedRuleStore<D: DurableRuleSource> {
    source: D,
    cache: Arc<dyn Cache>,
    on_fail: RuleStoreOnFail,
    ttl: Duration,
}

const DEFAULT_TTL: Duration = Duration::from_secs(3600);

impl<D: DurableRuleSource> CachedRuleStore<D> {
    /// Construct a cached rule store.
    #[must_use]
    pub fn new(source: D, cache: Arc<dyn Cache>, on_fail: RuleStoreOnFail) -> Self {
        Self {
            source,
            cache,
            on_fail,
            ttl: DEFAULT_TTL,
        }
    }

    async fn load_catalog(&self) -> Catalog {
        if let Some(raw) = self.cache.get(keys::PATTERNS).await {
            if let Ok(patterns) = serde_json::from_str::<Vec<Pattern>>(&raw) {
                return self.compile_catalog(patterns).await;
            }
        }

        match self.source.load_patterns().await {
            Ok(patterns) => {
                if let Ok(raw) = serde_json::to_string(&patterns) {
                    self.cache.set(keys::PATTERNS, raw, self.ttl).await;
                }
                self.compile_catalog(patterns).await
            }
            Err(err) => {
                tracing::warn!(error = %err, "rule store durable backend unavailable");
                let mut catalog = self.compile_catalog(Vec::new()).await;
                catalog.unavailable = true;
                catalog
            }
        }
    }

    async fn compile_catalog(&self, patterns: Vec<Pattern>) -> Catalog {
        let mut compiled = Vec::with_capacity(patterns.len());
        for pattern in patterns.into_iter().filter(|p| p.is_active) {
            match Regex::new(&pattern.regex) {
                Ok(regex) => {
                    compiled.push(Arc::new(CompiledPattern { pattern, regex }));
                }
                Err(err) => {
                    tracing::warn!(
                        pattern = %pattern.name,
                        error = %err,
                        "dropping pattern with invalid regex"
                    );
                }
            }
        }

        let allow = match self.cached_or_loaded_set(keys::ALLOWLIST, true).await {
            Some(set) => set,
            None => Arc::new(HashSet::new()),
        };
        let deny = match self.cached_or_loaded_set(keys::BLOCKLIST, false).await {
            Some(set) => set,
            None => Arc::new(HashSet::new()),
        };

        let validators = match self.source.load_validators().await {
            Ok(validators) => validators
                .into_iter()
                .map(|v| (v.name.clone(), Arc::new(v)))
                .collect(),
            Err(err) => {
                tracing::warn!(error = %err, "failed to load format validators");
                HashMap::new()
            }
        };

        Catalog {
            patterns: compiled,
            allow,
            deny,
            validators,
        }
    }

    async fn cached_or_loaded_set(
        &self,
        key: &str,
        is_allow: bool,
    ) -> Option<Arc<HashSet<String>>> {
        if let Some(raw) = self.cache.get(key).await {
            if let Ok(values) = serde_json::from_str::<Vec<String>>(&raw) {
                return Some(Arc::new(values.into_iter().collect()));
            }
        }

        let loaded = if is_allow {
            self.source.load_allowlist().await.map(|items| {
                items.into_iter().map(|i| i.value).collect::<Vec<_>>()
            })
        } else {
            self.source.load_denylist().await.map(|items| {
                items.into_iter().map(|i| i.value).collect::<Vec<_>>()
            })
        };

        match loaded {
            Ok(values) => {
                if let Ok(raw) = serde_json::to_string(&values) {
                    self.cache.set(key, raw, self.ttl).await;
                }
                Some(Arc::new(values.into_iter().collect()))
            }
            Err(err) => {
                tracing::warn!(error = %err, key, "failed to load literal set");
                None
            }
        }
    }
}

#[async_trait]
impl<D: DurableRuleSource> RuleStore for CachedRuleStore<D> {
    async fn get_active_patterns(&self) -> Vec<Arc<CompiledPattern>> {
        self.load_catalog().await.patterns
    }

    async fn get_allow_set(&self) -> Arc<HashSet<String>> {
        self.load_catalog().await.allow
    }

    async fn get_deny_set(&self) -> Arc<HashSet<String>> {
        self.load_catalog().await.deny
    }

    async fn get_validator(&self, name: &str) -> Option<Arc<FormatValidator>> {
        self.load_catalog().await.validators.get(name).cloned()
    }

    async fn refresh_patterns(&self) {
        self.cache.clear(keys::PATTERNS).await;
        self.cache.clear(keys::ALLOWLIST).await;
        self.cache.clear(keys::BLOCKLIST).await;
    }

    async fn is_available(&self) -> bool {
        let catalog = self.load_catalog().await;
        !catalog.unavailable || self.on_fail == RuleStoreOnFail::Open
    }
}

/// A [`DurableRuleSource`] that always fails, for exercising
/// `RULESTORE_ONFAIL` behavior without a real backend.
#[cfg(test)]
#[derive(Default)]
struct FailingSource;

#[cfg(test)]
#[async_trait]
impl DurableRuleSource for FailingSource {
    async fn load_patterns(&self) -> Result<Vec<Pattern>, RuleStoreError> {
        Err(RuleStoreError::BackendUnavailable("down".to_string()))
    }
    async fn load_allowlist(&self) -> Result<Vec<AllowItem>, RuleStoreError> {
        Err(RuleStoreError::BackendUnavailable("down".to_string()))
    }
    async fn load_denylist(&self) -> Result<Vec<DenyItem>, RuleStoreError> {
        Err(RuleStoreError::BackendUnavailable("down".to_string()))
    }
    async fn load_validators(&self) -> Result<Vec<FormatValidator>, RuleStoreError> {
        Err(RuleStoreError::BackendUnavailable("down".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCache;
    use crate::model::ValidatorKind;

    fn pattern(name: &str, regex: &str, category: &str, active: bool) -> Pattern {
        Pattern {
            name: name.to_string(),
            regex: regex.to_string(),
            category: category.to_string(),
            is_active: active,
            description: String::new(),
            block_threshold: None,
        }
    }

    #[tokio::test]
    async fn active_patterns_are_compiled_and_returned() {
        let source = InMemoryRuleSource::new(
            vec![pattern("ssn", r"\d{3}-\d{2}-\d{4}", "PII", true)],
            vec![],
            vec![],
            vec![],
        );
        let store = CachedRuleStore::new(source, Arc::new(InMemoryCache::new()), RuleStoreOnFail::Open);
        let patterns = store.get_active_patterns().await;
        assert_eq!(patterns.len(), 1);
        assert!(patterns[0].regex.is_match("123-45-6789"));
    }

    #[tokio::test]
    async fn inactive_patterns_are_excluded() {
        let source = InMemoryRuleSource::new(
            vec![pattern("ssn", r"\d{3}-\d{2}-\d{4}", "PII", false)],
            vec![],
            vec![],
            vec![],
        );
        let store = CachedRuleStore::new(source, Arc::new(InMemoryCache::new()), RuleStoreOnFail::Open);
        assert!(store.get_active_patterns().await.is_empty());
    }

    #[tokio::test]
    async fn invalid_regex_is_dropped_not_fatal() {
        let source = InMemoryRuleSource::new(
            vec![
                pattern("bad", r"(unclosed", "PII", true),
                pattern("good", r"ok", "PII", true),
            ],
            vec![],
            vec![],
            vec![],
        );
        let store = CachedRuleStore::new(source, Arc::new(InMemoryCache::new()), RuleStoreOnFail::Open);
        let patterns = store.get_active_patterns().await;
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].pattern.name, "good");
    }

    #[tokio::test]
    async fn second_read_hits_the_cache() {
        let source = InMemoryRuleSource::new(
            vec![pattern("p", "x", "PII", true)],
            vec![],
            vec![],
            vec![],
        );
        let cache = Arc::new(InMemoryCache::new());
        let store = CachedRuleStore::new(source, cache.clone(), RuleStoreOnFail::Open);
        store.get_active_patterns().await;
        assert!(cache.get(keys::PATTERNS).await.is_some());
    }

    #[tokio::test]
    async fn refresh_clears_cached_catalog() {
        let source = InMemoryRuleSource::new(
            vec![pattern("p", "x", "PII", true)],
            vec![],
            vec![],
            vec![],
        );
        let cache = Arc::new(InMemoryCache::new());
        let store = CachedRuleStore::new(source, cache.clone(), RuleStoreOnFail::Open);
        store.get_active_patterns().await;
        store.refresh_patterns().await;
        assert!(cache.get(keys::PATTERNS).await.is_none());
    }

    #[tokio::test]
    async fn validator_lookup_by_name() {
        let source = InMemoryRuleSource::new(
            vec![],
            vec![],
            vec![],
            vec![FormatValidator {
                name: "card_luhn".to_string(),
                kind: ValidatorKind::Luhn,
                rule: None,
                description: String::new(),
            }],
        );
        let store = CachedRuleStore::new(source, Arc::new(InMemoryCache::new()), RuleStoreOnFail::Open);
        assert!(store.get_validator("card_luhn").await.is_some());
        assert!(store.get_validator("missing").await.is_none());
    }

    #[tokio::test]
    async fn closed_on_fail_reports_unavailable_on_backend_failure() {
        let store = CachedRuleStore::new(
            FailingSource,
            Arc::new(InMemoryCache::new()),
            RuleStoreOnFail::Closed,
        );
        assert!(!store.is_available().await);
    }

    #[tokio::test]
    async fn open_on_fail_reports_available_despite_backend_failure() {
        let store = CachedRuleStore::new(
            FailingSource,
            Arc::new(InMemoryCache::new()),
            RuleStoreOnFail::Open,
        );
        assert!(store.is_available().await);
        assert!(store.get_active_patterns().await.is_empty());
    }

    #[tokio::test]
    async fn healthy_backend_is_always_available() {
        let source = InMemoryRuleSource::new(vec![], vec![], vec![], vec![]);
        let store = CachedRuleStore::new(source, Arc::new(InMemoryCache::new()), RuleStoreOnFail::Closed);
        assert!(store.is_available().await);
    }
}
