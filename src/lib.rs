//! ```text
//! GuardrailConfig ─┬─► RuleStore ──► CompiledPattern / AllowSet / DenySet / Validators
//!                  │
//!                  ├─► OracleClient ──► check() / confidence()  (24h cache)
//!                  │
//!                  ├─► Confidence Engine ──► compute() / hybrid() / apply_hit_weight()
//!                  │
//!                  ├─► Detector ──► DetectionResponse (breakdown, redacted_text)
//!                  │      │
//!                  │      └─► Event Publisher ──► SIEM webhook (fire-and-forget)
//!                  │
//!                  ├─► Streaming Guardrail ──► SSE pass-through + in-flight inspection
//!                  │
//!                  └─► Gateway Glue ──► pre/post-call Detector gating, chat pass-through
//! ```
//!
//! # tsz-guard
//!
//! **Policy-driven content inspection and streaming guardrail gateway for
//! LLM traffic.**
//!
//! `tsz-guard` sits between a client and an upstream LLM service, inspecting
//! prompts before they are forwarded and assistant responses — streamed or
//! not — before they reach the client. It addresses the OWASP LLM Top 10
//! categories that depend on content inspection: sensitive-information
//! disclosure, prompt injection, and insecure output handling.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use tsz_guard::prelude::*;
//!
//! let config = GuardrailConfig::from_env(&["PII".into(), "SECRET".into()])?;
//! let detector = Detector::new(rule_store, oracle_client, event_publisher, config);
//!
//! let response = detector.detect(DetectRequest::new(prompt_text)).await;
//! if response.blocked {
//!     // reject before contacting the upstream model
//! }
//! ```
//!
//! ## Modules
//!
//! - [`config`] – Pipeline policy and component environment configuration
//! - [`model`] – Shared wire/persisted-state types (`Pattern`, `Detection`, …)
//! - [`cache`] – Abstract TTL key-value cache backing the Rule Store and Oracle Client
//! - [`rules`] – Rule Store: cache-then-durable read-through, format validators
//! - [`oracle`] – AI Oracle Client: confirmation and confidence scoring calls
//! - [`confidence`] – Confidence Engine: pure scoring and threshold-resolution functions
//! - [`detector`] – The Detector: the core seven-step inspection algorithm
//! - [`events`] – Event Publisher: fire-and-forget SIEM webhook delivery
//! - [`stream`] – Streaming Guardrail: SSE pass-through with in-flight inspection
//! - [`gateway`] – Gateway Glue: chat-request pass-through and pre/post-call gating
//! - [`pipeline`] – Generic staged-pipeline framework, used to compose the
//!   Detector into ordered pre/post-call stages at the gateway boundary

#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod cache;
pub mod config;
pub mod confidence;
pub mod detector;
pub mod events;
pub mod gateway;
pub mod model;
pub mod oracle;
pub mod pipeline;
pub mod rules;
pub mod stream;

/// Re-exports for convenient access to core types
pub mod prelude {
    pub use crate::config::{FailMode, GuardrailConfig, PolicyBuilder, SecurityPolicy};
    pub use crate::detector::{DetectRequest, Detector};
    pub use crate::events::EventPublisher;
    pub use crate::gateway::{Gateway, GatewayDecision, GatewayHeaders};
    pub use crate::model::{
        Confidence, ConfidenceExplanation, Detection, DetectionResponse, SecurityEvent,
    };
    pub use crate::oracle::OracleClient;
    pub use crate::rules::RuleStore;
    pub use crate::stream::{CancelToken, StreamGuardrailConfig};

    pub use crate::pipeline::{SecurityPipeline, SecurityStage};
    pub use crate::pipeline::content::{Content, Message, RetrievedChunk};
    pub use crate::pipeline::executor::{ExecutorBuilder, PipelineExecutor, PipelineResult};
    pub use crate::pipeline::outcome::{Severity, StageError, StageOutcome};
    pub use crate::pipeline::stage::{GuardrailStage, SecurityContext};
    pub use crate::pipeline::compat::LegacyAdapter;
}
