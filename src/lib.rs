//! # promo-runner
//!
//! Batch automation engine for two promotional mini-games run inside a
//! consumer shopping application: a lucky-draw raffle and a collaborative
//! point factory.
//!
//! ## Design Philosophy
//!
//! promo-runner is designed to be:
//! - **Per-account** - one credential in, one authorized run, one summary out
//! - **Failure-tolerant** - a single item's failure never aborts the batch
//! - **Library-first** - no CLI or UI, purely a Rust crate for embedding
//! - **Sequential by design** - backend state settles between dependent calls
//!
//! Scheduling across many accounts, credential storage and the delivery
//! channel for summaries stay outside the crate; they plug in through the
//! [`notify::LogSink`] and [`notify::Notifier`] seams.
//!
//! ## Quick Start
//!
//! ```no_run
//! use promo_runner::{Config, Credential, PromoRunner};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let runner = PromoRunner::new(config);
//!
//!     let credential = Credential::new("account-id", "session-secret");
//!     for result in runner.run_account(&credential).await {
//!         match result {
//!             Ok(summary) => println!("{}", summary.render()),
//!             Err(e) => eprintln!("run aborted: {e}"),
//!         }
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// The collaborative factory pipeline
pub mod factory;
/// Backend gateways and envelope decoding
pub mod gateway;
/// Log sink and notifier seams
pub mod notify;
/// Settle delays and the two-phase action helper
pub mod pacing;
/// The lucky-draw raffle pipeline
pub mod raffle;
/// Result aggregation and summary reporting
pub mod report;
/// Per-account orchestration
pub mod runner;
/// Session factory
pub mod session;
/// Core types
pub mod types;

// Re-export commonly used types
pub use config::{Config, EndpointConfig, FactoryConfig, PacingConfig, RaffleConfig};
pub use error::{AuthError, Error, GatewayError, Result};
pub use notify::{LogSink, MemorySink, NoopNotifier, Notifier, TracingSink, WebhookNotifier};
pub use report::RunReport;
pub use runner::PromoRunner;
pub use types::{
    ActionResult, Credential, DrawItem, Outcome, RedemptionProgress, RunSummary, TaskItem,
    TaskKind, TaskStatus,
};
