//! External interfaces: the per-run log line sink and the summary notifier
//!
//! Both are narrow trait seams so embedders can route output wherever they
//! like (console, message push, test capture). Neither is allowed to fail the
//! business logic: sinks return nothing, and notifier delivery errors are
//! logged and swallowed.

use crate::config::NotificationConfig;
use async_trait::async_trait;
use std::sync::Mutex;

/// Sink for the user-visible, one-line-per-event run log
///
/// The engine emits a single formatted line per notable event (success,
/// failure, skip, progress). Implementations must never block the business
/// logic on failure.
pub trait LogSink: Send + Sync {
    /// Accept one formatted line
    fn log(&self, line: &str);
}

/// Default sink that forwards lines to `tracing` at info level
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, line: &str) {
        tracing::info!(target: "promo_runner::run", "{line}");
    }
}

/// Sink that captures lines in memory
///
/// Useful for embedders that render their own console output, and for tests
/// asserting on emitted lines.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the captured lines, in emission order
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

impl LogSink for MemorySink {
    fn log(&self, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line.to_string());
        }
    }
}

/// Outbound channel for finalized run summaries
///
/// Delivery failure does not affect the run's reported outcome.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one rendered summary
    async fn notify(&self, summary: &str);
}

/// Notifier that discards summaries
///
/// For embedders that collect [`RunSummary`](crate::types::RunSummary) values
/// from the runner directly.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, _summary: &str) {}
}

/// Notifier that POSTs the rendered summary to configured webhooks
///
/// Each webhook gets a JSON payload with the summary text and a timestamp.
/// Failures and timeouts are logged per webhook and otherwise ignored.
#[derive(Clone, Debug)]
pub struct WebhookNotifier {
    config: NotificationConfig,
    client: reqwest::Client,
}

impl WebhookNotifier {
    /// Build a notifier from the notification configuration
    pub fn new(config: NotificationConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, summary: &str) {
        let payload = serde_json::json!({
            "text": summary,
            "timestamp": chrono::Utc::now().timestamp(),
        });

        for webhook in &self.config.webhooks {
            let mut request = self
                .client
                .post(&webhook.url)
                .json(&payload)
                .timeout(webhook.timeout);
            if let Some(auth) = &webhook.auth_header {
                request = request.header("Authorization", auth);
            }

            match tokio::time::timeout(webhook.timeout, request.send()).await {
                Ok(Ok(response)) => {
                    if !response.status().is_success() {
                        tracing::warn!(
                            url = %webhook.url,
                            status = %response.status(),
                            "summary webhook failed"
                        );
                    } else {
                        tracing::debug!(url = %webhook.url, "summary webhook sent");
                    }
                }
                Ok(Err(e)) => {
                    tracing::warn!(url = %webhook.url, error = %e, "summary webhook failed");
                }
                Err(_) => {
                    tracing::warn!(
                        url = %webhook.url,
                        timeout = ?webhook.timeout,
                        "summary webhook timed out"
                    );
                }
            }
        }
    }
}
