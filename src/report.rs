//! Result aggregation and summary reporting
//!
//! A [`RunReport`] is the run-scoped aggregate the pipeline threads through
//! explicitly - there is no ambient state, which keeps concurrent multi-account
//! execution trivially safe. `finalize` always produces a summary, even when
//! zero items were processed or every item failed.

use crate::types::{ActionResult, Outcome, RedemptionProgress, RunSummary};
use chrono::Utc;

/// Accumulates per-item results into the totals of one activity run
#[derive(Clone, Debug)]
pub struct RunReport {
    activity: String,
    account: String,
    nickname: Option<String>,
    processed: u32,
    currency_spent: u32,
    points_earned: i64,
    rewards: Vec<String>,
    redemption: Option<RedemptionProgress>,
    hint: Option<String>,
}

impl RunReport {
    /// Start an empty report for one account's run of one activity
    pub fn new(activity: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            activity: activity.into(),
            account: account.into(),
            nickname: None,
            processed: 0,
            currency_spent: 0,
            points_earned: 0,
            rewards: Vec::new(),
            redemption: None,
            hint: None,
        }
    }

    /// Record one action result into the running totals
    ///
    /// Succeeded and skipped items count as processed; failed attempts only
    /// contribute their (normally zero) reward deltas. Recording the same
    /// result twice double-counts - the aggregator does not deduplicate.
    pub fn record(&mut self, result: &ActionResult) {
        if result.outcome != Outcome::Failed {
            self.processed += 1;
        }
        self.currency_spent += result.currency_spent;
        self.points_earned += result.points_earned;
    }

    /// Add a confirmed reward title
    pub fn add_reward(&mut self, title: impl Into<String>) {
        self.rewards.push(title.into());
    }

    /// Set the display name reported by the activity login
    pub fn set_nickname(&mut self, nickname: impl Into<String>) {
        self.nickname = Some(nickname.into());
    }

    /// Attach the factory redemption progress
    pub fn set_redemption(&mut self, redemption: RedemptionProgress) {
        self.redemption = Some(redemption);
    }

    /// Attach the free-text hint appended to the rendered summary
    pub fn set_hint(&mut self, hint: impl Into<String>) {
        self.hint = Some(hint.into());
    }

    /// Items processed so far
    pub fn processed(&self) -> u32 {
        self.processed
    }

    /// Currency spent so far
    pub fn currency_spent(&self) -> u32 {
        self.currency_spent
    }

    /// Finalize the report into an immutable summary
    ///
    /// Never fails: missing fields stay at their zero or placeholder values.
    pub fn finalize(self) -> RunSummary {
        RunSummary {
            activity: self.activity,
            account: self.account,
            nickname: self.nickname,
            processed: self.processed,
            currency_spent: self.currency_spent,
            points_earned: self.points_earned,
            rewards: self.rewards,
            redemption: self.redemption,
            hint: self.hint,
            finished_at: Utc::now(),
        }
    }
}
