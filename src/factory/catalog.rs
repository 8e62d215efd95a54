//! Typed task catalog of the factory activity
//!
//! The task list arrives in one shot; each entry carries a numeric
//! discriminant selecting its payload shape. The account's own friend-assist
//! code travels inside the list as a pseudo-task - it is side-channel data,
//! not an actionable item, so enumeration extracts it and returns it
//! separately from the catalog.

use crate::notify::LogSink;
use crate::session::MallSession;
use crate::types::{CalendarEntry, GatedSubTask, SubTask, TaskItem, TaskKind, TaskStatus};
use serde::Deserialize;
use serde_json::json;

/// Discriminant: follow a list of shops
pub(crate) const KIND_FOLLOW_SHOPS: i32 = 1;
/// Discriminant: visit promotional venues
pub(crate) const KIND_VISIT_VENUES: i32 = 3;
/// Discriminant: event calendar
pub(crate) const KIND_EVENT_CALENDAR: i32 = 9;
/// Discriminant: multi-slot patrol
pub(crate) const KIND_PATROL: i32 = 10;
/// Discriminant: daily check-in
pub(crate) const KIND_DAILY_CHECK_IN: i32 = 13;
/// Discriminant: friend assist
pub(crate) const KIND_FRIEND_ASSIST: i32 = 14;
/// Discriminant: browse/purchase items
pub(crate) const KIND_BROWSE_ITEMS: i32 = 15;
/// Discriminant: checkout task (not automated)
pub(crate) const KIND_PLACE_ORDER: i32 = 19;
/// Discriminant: membership enrollment (not automated)
pub(crate) const KIND_MEMBERSHIP: i32 = 21;
/// Discriminant: featured-page browse
pub(crate) const KIND_FEATURED_PAGE: i32 = 23;

#[derive(Debug, Deserialize)]
struct RawTokenInfo {
    #[serde(rename = "taskToken")]
    token: String,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawGated {
    #[serde(rename = "taskToken")]
    token: String,
    #[serde(default)]
    title: Option<String>,
    status: i32,
}

#[derive(Debug, Deserialize)]
struct RawActivity {
    #[serde(rename = "taskToken")]
    token: String,
    #[serde(default)]
    title: Option<String>,
    status: i32,
    #[serde(rename = "waitDuration", default)]
    wait_duration: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawTask {
    #[serde(rename = "taskType")]
    task_type: i32,
    #[serde(rename = "taskName")]
    name: String,
    status: i32,
    #[serde(default)]
    times: Option<i64>,
    #[serde(rename = "maxTimes", default)]
    max_times: Option<i64>,
    #[serde(rename = "recordInfo", default)]
    record_info: Option<RawTokenInfo>,
    #[serde(rename = "patrolInfos", default)]
    patrol_infos: Option<Vec<RawGated>>,
    /// Shared by the venue and calendar discriminants
    #[serde(rename = "activityInfos", default)]
    activity_infos: Option<Vec<RawActivity>>,
    #[serde(rename = "browseInfos", default)]
    browse_infos: Option<Vec<RawTokenInfo>>,
    #[serde(rename = "shopInfos", default)]
    shop_infos: Option<Vec<RawTokenInfo>>,
    #[serde(rename = "assistInfo", default)]
    assist_info: Option<RawTokenInfo>,
}

impl RawTask {
    fn into_item(self) -> TaskItem {
        let status = TaskStatus::from_code(self.status);
        let kind = self.kind();
        TaskItem {
            name: self.name,
            status,
            kind,
        }
    }

    fn kind(&self) -> TaskKind {
        let kind = match self.task_type {
            KIND_FOLLOW_SHOPS => self.shop_infos.as_ref().map(|shops| {
                TaskKind::FollowShops(shops.iter().map(RawTokenInfo::to_sub_task).collect())
            }),
            KIND_VISIT_VENUES => self.activity_infos.as_ref().map(|venues| {
                TaskKind::VisitVenues(
                    venues
                        .iter()
                        .map(|v| GatedSubTask {
                            token: v.token.clone(),
                            title: v.title.clone(),
                            status: v.status,
                        })
                        .collect(),
                )
            }),
            KIND_EVENT_CALENDAR => self.activity_infos.as_ref().map(|entries| {
                TaskKind::EventCalendar(
                    entries
                        .iter()
                        .map(|e| CalendarEntry {
                            token: e.token.clone(),
                            title: e.title.clone().unwrap_or_default(),
                            status: e.status,
                            wait_secs: e.wait_duration,
                        })
                        .collect(),
                )
            }),
            KIND_PATROL => self.patrol_infos.as_ref().map(|slots| {
                TaskKind::Patrol(
                    slots
                        .iter()
                        .map(|s| GatedSubTask {
                            token: s.token.clone(),
                            title: s.title.clone(),
                            status: s.status,
                        })
                        .collect(),
                )
            }),
            KIND_DAILY_CHECK_IN => self.record_info.as_ref().map(|info| TaskKind::DailyCheckIn {
                token: info.token.clone(),
            }),
            KIND_FRIEND_ASSIST => self.assist_info.as_ref().map(|info| TaskKind::FriendAssist {
                token: info.token.clone(),
                times: self.times.unwrap_or(0),
                max_times: self.max_times.unwrap_or(0),
            }),
            KIND_BROWSE_ITEMS => self.browse_infos.as_ref().map(|items| {
                TaskKind::BrowseItems(items.iter().map(RawTokenInfo::to_sub_task).collect())
            }),
            KIND_PLACE_ORDER => Some(TaskKind::PlaceOrder),
            KIND_MEMBERSHIP => Some(TaskKind::Membership),
            KIND_FEATURED_PAGE => self.record_info.as_ref().map(|info| TaskKind::FeaturedPage {
                token: info.token.clone(),
            }),
            other => return TaskKind::Unknown(other),
        };
        match kind {
            Some(kind) => kind,
            None => {
                tracing::debug!(
                    task_type = self.task_type,
                    name = %self.name,
                    "expected payload missing, treating task as unrecognized"
                );
                TaskKind::Unknown(self.task_type)
            }
        }
    }
}

impl RawTokenInfo {
    fn to_sub_task(&self) -> SubTask {
        SubTask {
            token: self.token.clone(),
            title: self.title.clone(),
        }
    }
}

/// Fetch the task catalog and extract the account's own assist code
///
/// A listing failure returns an empty catalog rather than raising; the run
/// proceeds to reporting with whatever it has.
pub(crate) async fn fetch(
    session: &MallSession,
    sink: &dyn LogSink,
) -> (Vec<TaskItem>, Option<String>) {
    let reply = match session
        .gateway()
        .invoke("factory_getTaskDetail", &json!({}))
        .await
    {
        Ok(reply) => reply,
        Err(e) => {
            tracing::warn!(account = %session.account, error = %e, "task listing failed");
            sink.log(&format!("{}, cannot fetch task list: {e}", session.account));
            return (Vec::new(), None);
        }
    };

    let raw: Vec<RawTask> = match reply.result.get("tasks") {
        Some(tasks) => serde_json::from_value(tasks.clone()).unwrap_or_default(),
        None => Vec::new(),
    };

    let mut items: Vec<TaskItem> = raw.into_iter().map(RawTask::into_item).collect();
    let mut own_code = None;
    if let Some(position) = items
        .iter()
        .position(|item| matches!(item.kind, TaskKind::FriendAssist { .. }))
    {
        let item = items.remove(position);
        if let TaskKind::FriendAssist { token, .. } = item.kind {
            own_code = Some(token);
        }
    }
    (items, own_code)
}
