//! Core types for promo-runner

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An opaque account credential pair
///
/// The identifier is the (possibly percent-encoded) account name the backend
/// issued; the secret is the session cookie value that goes with it. The pair
/// is immutable for the lifetime of a run and owned by the session factory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Account identifier, as issued (may be percent-encoded)
    pub id: String,
    /// Session secret paired with the identifier
    pub secret: String,
}

impl Credential {
    /// Create a new credential pair
    pub fn new(id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            secret: secret.into(),
        }
    }

    /// The percent-decoded account identifier, for display and log lines
    pub fn account(&self) -> String {
        urlencoding::decode(&self.id)
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| self.id.clone())
    }

    /// Render the pair as the credential cookie the backends expect
    pub(crate) fn cookie(&self) -> String {
        format!("pin={}; skey={}", self.id, self.secret)
    }
}

/// Terminal state of one action attempt on one catalog item
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// The action completed and the backend confirmed it
    Succeeded,
    /// The action was attempted and the backend (or transport) rejected it
    Failed,
    /// The item was ineligible or already done; no action was attempted
    Skipped,
}

/// The recorded result of one action attempt on one catalog item
///
/// Produced once per item per attempt and immutable once recorded. Appending
/// the same value twice double-counts in the aggregate; the reporter does not
/// deduplicate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    /// Human-readable label of the item this result refers to
    pub label: String,
    /// Terminal state of the attempt
    pub outcome: Outcome,
    /// Virtual currency spent by this attempt
    pub currency_spent: u32,
    /// Points earned by this attempt (factory charge, etc.)
    pub points_earned: i64,
    /// Backend message attached to the attempt, if any
    pub message: Option<String>,
}

impl ActionResult {
    /// A successful attempt with no reward delta
    pub fn succeeded(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            outcome: Outcome::Succeeded,
            currency_spent: 0,
            points_earned: 0,
            message: None,
        }
    }

    /// A failed attempt
    pub fn failed(label: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            outcome: Outcome::Failed,
            currency_spent: 0,
            points_earned: 0,
            message: Some(message.into()),
        }
    }

    /// A skipped item (ineligible or already completed)
    pub fn skipped(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            outcome: Outcome::Skipped,
            currency_spent: 0,
            points_earned: 0,
            message: None,
        }
    }

    /// Attach a currency delta to this result
    pub fn with_currency(mut self, spent: u32) -> Self {
        self.currency_spent = spent;
        self
    }

    /// Attach a points delta to this result
    pub fn with_points(mut self, earned: i64) -> Self {
        self.points_earned = earned;
        self
    }
}

/// One draw in the raffle catalog
///
/// The joined flag derives from the backend's participation marker; the engine
/// never fabricates or mutates it, only reacts to it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DrawItem {
    /// Backend identifier of the draw
    pub id: String,
    /// Display title of the draw
    pub title: String,
    /// Whether this account already joined the draw
    pub joined: bool,
}

/// Completion status of a typed factory task, as reported by the backend
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskStatus {
    /// Available and not yet completed
    Pending,
    /// Already completed
    Done,
    /// No longer completable
    Expired,
}

impl TaskStatus {
    /// Convert the backend status code to a [`TaskStatus`]
    ///
    /// The backend reports 1 for pending and 2 for done; anything else is
    /// treated as expired.
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => TaskStatus::Pending,
            2 => TaskStatus::Done,
            _ => TaskStatus::Expired,
        }
    }
}

/// A collectable sub-task token within a typed task
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubTask {
    /// Collect token for this sub-task
    pub token: String,
    /// Display title, where the backend provides one
    pub title: Option<String>,
}

/// A sub-task gated by a backend-computed availability flag
///
/// Used by the patrol slots (time windows) and the venue visits. The gate is
/// delivered as a status flag, never computed locally.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GatedSubTask {
    /// Collect token for this sub-task
    pub token: String,
    /// Display title, where the backend provides one
    pub title: Option<String>,
    /// Backend status flag: 1 = open, 0 = window closed, 2 = already done
    pub status: i32,
}

/// One entry of the event-calendar task
///
/// Credit requires the paired enter/complete collects with an interstitial
/// wait the backend may dictate via `wait_secs`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CalendarEntry {
    /// Collect token shared by the enter and complete actions
    pub token: String,
    /// Display title of the entry
    pub title: String,
    /// Backend status flag: 2 = already completed
    pub status: i32,
    /// Backend-specified wait between enter and complete, in seconds
    pub wait_secs: Option<u64>,
}

/// The typed payload of one factory task, keyed by the backend discriminant
///
/// Every discriminant the engine understands is a variant carrying its own
/// payload shape; the dispatcher is a single exhaustive match with
/// [`TaskKind::Unknown`] as the explicit default arm.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskKind {
    /// Discriminant 1: follow a list of shops
    FollowShops(Vec<SubTask>),
    /// Discriminant 3: visit promotional venues
    VisitVenues(Vec<GatedSubTask>),
    /// Discriminant 9: event calendar (two-phase enter/complete per entry)
    EventCalendar(Vec<CalendarEntry>),
    /// Discriminant 10: multi-slot patrol with time-window gates
    Patrol(Vec<GatedSubTask>),
    /// Discriminant 13: daily check-in (single collect)
    DailyCheckIn {
        /// Collect token for the check-in
        token: String,
    },
    /// Discriminant 14: the account's own friend-assist task
    FriendAssist {
        /// The assist code peers use to credit this account
        token: String,
        /// Assists received so far
        times: i64,
        /// Assist cap
        max_times: i64,
    },
    /// Discriminant 15: browse/purchase items until the progress cap
    BrowseItems(Vec<SubTask>),
    /// Discriminant 19: checkout task, intentionally not automated
    PlaceOrder,
    /// Discriminant 21: membership enrollment, intentionally not automated
    Membership,
    /// Discriminant 23: featured-page browse then collect
    FeaturedPage {
        /// Collect token claimed after the browse interaction
        token: String,
    },
    /// Any discriminant outside the fixed handler table; logged, no action
    Unknown(i32),
}

/// One actionable unit of the factory catalog
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskItem {
    /// Display name of the task
    pub name: String,
    /// Completion status reported by the backend
    pub status: TaskStatus,
    /// Typed payload selected by the backend discriminant
    pub kind: TaskKind,
}

/// Redemption progress of the factory product, for the closing summary
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedemptionProgress {
    /// Name of the product being produced
    pub product: String,
    /// Units still redeemable
    pub remaining_stock: i64,
    /// Points already invested into the product
    pub invested: i64,
    /// Points required to redeem
    pub required: i64,
    /// Points earned but not yet invested
    pub uncollected: i64,
}

/// The finalized outcome of one account's run of one activity
///
/// Built incrementally by [`RunReport`](crate::report::RunReport) and
/// finalized exactly once. Missing fields default to zero or a placeholder;
/// summary generation never fails on partial data.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    /// Display name of the activity
    pub activity: String,
    /// Decoded account identifier
    pub account: String,
    /// Display name returned by the activity login, when available
    pub nickname: Option<String>,
    /// Catalog items processed (including skipped-as-joined items)
    pub processed: u32,
    /// Virtual currency spent across the run
    pub currency_spent: u32,
    /// Points earned across the run
    pub points_earned: i64,
    /// Titles of confirmed rewards
    pub rewards: Vec<String>,
    /// Redemption progress, for the factory activity
    pub redemption: Option<RedemptionProgress>,
    /// Free-text hint appended to the rendered summary
    pub hint: Option<String>,
    /// When the run finished
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    /// Render the summary as the free-text block handed to the notifier
    ///
    /// Zero items and zero rewards render explicitly ("none") rather than as
    /// empty fields.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("[Activity] {}\n", self.activity));
        out.push_str(&format!("[Account] {}\n", self.account));
        if let Some(nickname) = &self.nickname {
            out.push_str(&format!("[Nickname] {}\n", nickname));
        }
        out.push_str(&format!("[Items Processed] {}\n", self.processed));
        if self.currency_spent > 0 {
            out.push_str(&format!("[Currency Spent] {}\n", self.currency_spent));
        }
        if self.points_earned != 0 {
            out.push_str(&format!("[Points Earned] {}\n", self.points_earned));
        }
        let rewards = if self.rewards.is_empty() {
            "none".to_string()
        } else {
            self.rewards.join(", ")
        };
        out.push_str(&format!("[Rewards] {}\n", rewards));
        if let Some(r) = &self.redemption {
            out.push_str(&format!("[Product] {}\n", r.product));
            out.push_str(&format!("[Remaining Stock] {}\n", r.remaining_stock));
            out.push_str(&format!("[Invested/Required] {}/{}\n", r.invested, r.required));
            out.push_str(&format!("[Uncollected Points] {}\n", r.uncollected));
        }
        if let Some(hint) = &self.hint {
            out.push_str(&format!("[Hint] {}\n", hint));
        }
        out
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn credential_account_decodes_percent_encoding() {
        let cred = Credential::new("user%40example", "secret");
        assert_eq!(cred.account(), "user@example");
    }

    #[test]
    fn credential_account_falls_back_to_raw_id() {
        let cred = Credential::new("plain_user", "secret");
        assert_eq!(cred.account(), "plain_user");
    }

    #[test]
    fn task_status_from_code_maps_known_codes() {
        assert_eq!(TaskStatus::from_code(1), TaskStatus::Pending);
        assert_eq!(TaskStatus::from_code(2), TaskStatus::Done);
        assert_eq!(TaskStatus::from_code(0), TaskStatus::Expired);
        assert_eq!(TaskStatus::from_code(7), TaskStatus::Expired);
    }

    #[test]
    fn summary_renders_none_for_empty_rewards() {
        let summary = RunSummary {
            activity: "Lucky Draw".to_string(),
            account: "alice".to_string(),
            nickname: None,
            processed: 0,
            currency_spent: 0,
            points_earned: 0,
            rewards: Vec::new(),
            redemption: None,
            hint: None,
            finished_at: Utc::now(),
        };
        let text = summary.render();
        assert!(text.contains("[Rewards] none"));
        assert!(text.contains("[Items Processed] 0"));
    }
}
