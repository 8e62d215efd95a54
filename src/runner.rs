//! Per-account orchestration across the enabled activities
//!
//! A [`PromoRunner`] owns the configuration plus the log sink and notifier
//! seams. One account's activities run strictly sequentially; independent
//! accounts run concurrently as fully isolated executions - each owns its own
//! session and report, so no locking is involved.

use crate::config::Config;
use crate::error::Result;
use crate::notify::{LogSink, Notifier, TracingSink, WebhookNotifier};
use crate::types::{Credential, RunSummary};
use crate::{factory, raffle};
use futures::future::join_all;
use std::sync::Arc;

/// Batch runner for the promotional activities
#[derive(Clone)]
pub struct PromoRunner {
    config: Arc<Config>,
    sink: Arc<dyn LogSink>,
    notifier: Arc<dyn Notifier>,
}

impl PromoRunner {
    /// Create a runner with the default sink (tracing) and the webhook
    /// notifier built from the configuration
    pub fn new(config: Config) -> Self {
        let notifier = WebhookNotifier::new(config.notifications.clone());
        Self {
            config: Arc::new(config),
            sink: Arc::new(TracingSink),
            notifier: Arc::new(notifier),
        }
    }

    /// Replace the log sink
    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Replace the notifier
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Run every enabled activity for one account, in order
    ///
    /// Each finalized summary is rendered and handed to the notifier before
    /// the next activity starts. An aborted activity yields its error in the
    /// result list; the remaining activities still run.
    pub async fn run_account(&self, credential: &Credential) -> Vec<Result<RunSummary>> {
        let mut results = Vec::new();
        if self.config.raffle.enabled {
            let result = raffle::run(&self.config, credential, self.sink.as_ref()).await;
            self.deliver(&result).await;
            results.push(result);
        }
        if self.config.factory.enabled {
            let result = factory::run(&self.config, credential, self.sink.as_ref()).await;
            self.deliver(&result).await;
            results.push(result);
        }
        results
    }

    /// Run a batch of accounts concurrently
    ///
    /// Accounts are fully isolated from each other; one account's failures
    /// never affect another's run. Results are returned in credential order.
    pub async fn run_accounts(&self, credentials: &[Credential]) -> Vec<Vec<Result<RunSummary>>> {
        join_all(
            credentials
                .iter()
                .map(|credential| self.run_account(credential)),
        )
        .await
    }

    async fn deliver(&self, result: &Result<RunSummary>) {
        if let Ok(summary) = result {
            self.notifier.notify(&summary.render()).await;
        }
    }
}
