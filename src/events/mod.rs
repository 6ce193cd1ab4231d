//! The Event Publisher — fire-and-forget SIEM webhook delivery.
//!
//! Grounded directly on Go's `internal/guardrails/siem.go`: a 2-second HTTP
//! timeout, and every error (connection, timeout, non-2xx) is logged and
//! swallowed rather than propagated — publishing a security event must
//! never be allowed to affect the detection result it describes.

use crate::model::SecurityEvent;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// The Event Publisher contract. `publish` never returns an error — by
/// design, failures are logged internally and otherwise invisible to the
/// caller (see `SPEC_FULL.md` §4.E).
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a security event, best-effort, at-most-once.
    async fn publish(&self, event: SecurityEvent);
}

/// Publishes events to a configured SIEM webhook URL over HTTP, dispatched
/// on a detached task so the caller never waits on network I/O.
#[derive(Clone)]
pub struct HttpEventPublisher {
    http: reqwest::Client,
    webhook_url: Option<String>,
    timeout: Duration,
}

impl HttpEventPublisher {
    /// Construct a publisher. `webhook_url` of `None` makes every publish a
    /// no-op, matching the "`SIEM_WEBHOOK_URL` unset or empty" behavior.
    #[must_use]
    pub fn new(webhook_url: Option<String>, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            webhook_url,
            timeout,
        }
    }
}

#[async_trait]
impl EventPublisher for HttpEventPublisher {
    async fn publish(&self, event: SecurityEvent) {
        let Some(url) = self.webhook_url.clone() else {
            return;
        };

        let http = self.http.clone();
        let timeout = self.timeout;

        tokio::spawn(async move {
            let result = http
                .post(&url)
                .timeout(timeout)
                .json(&event)
                .send()
                .await;

            match result {
                Ok(response) if !response.status().is_success() => {
                    tracing::warn!(
                        status = %response.status(),
                        "SIEM webhook returned a non-success status"
                    );
                }
                Err(err) => {
                    tracing::warn!(error = %err, "SIEM webhook delivery failed");
                }
                Ok(_) => {}
            }
        });
    }
}

/// A publisher that never sends anything — used when no webhook is
/// configured.
#[derive(Default)]
pub struct NullEventPublisher;

#[async_trait]
impl EventPublisher for NullEventPublisher {
    async fn publish(&self, _event: SecurityEvent) {}
}

/// An in-memory publisher for tests — records every event for assertions.
#[derive(Default, Clone)]
pub struct ChannelEventPublisher {
    events: Arc<Mutex<Vec<SecurityEvent>>>,
}

impl ChannelEventPublisher {
    /// Construct an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot every event published so far.
    #[must_use]
    pub fn events(&self) -> Vec<SecurityEvent> {
        self.events.lock().expect("mutex poisoned").clone()
    }
}

#[async_trait]
impl EventPublisher for ChannelEventPublisher {
    async fn publish(&self, event: SecurityEvent) {
        self.events.lock().expect("mutex poisoned").push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> SecurityEvent {
        SecurityEvent {
            event_type: "BLOCK".to_string(),
            category: "SECRET".to_string(),
            pattern: "aws_key".to_string(),
            confidence_score: 0.92,
            threshold: 0.85,
            action: Some("block".to_string()),
            request_id: Some("req-1".to_string()),
            timestamp: 0,
        }
    }

    #[tokio::test]
    async fn null_publisher_accepts_without_panicking() {
        NullEventPublisher.publish(event()).await;
    }

    #[tokio::test]
    async fn channel_publisher_records_events() {
        let publisher = ChannelEventPublisher::new();
        publisher.publish(event()).await;
        assert_eq!(publisher.events().len(), 1);
    }

    #[tokio::test]
    async fn publisher_with_no_url_is_a_no_op() {
        let publisher = HttpEventPublisher::new(None, Duration::from_secs(2));
        publisher.publish(event()).await;
        // No panic, no pending task leak expected — nothing to assert on
        // beyond successful return.
    }
}
