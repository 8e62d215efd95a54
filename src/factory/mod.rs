//! The collaborative factory pipeline
//!
//! One run: open the cookie-authorized mall session, bootstrap the home data
//! (selecting a product if none is chosen yet), collect the battery charge,
//! credit the configured peer assist codes, then dispatch every pending task
//! to its discriminant handler. The closing summary re-reads the home data
//! for the redemption progress. One task's failure never stops the batch.

mod catalog;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use crate::config::Config;
use crate::error::{Error, GatewayError, Result};
use crate::gateway::MallReply;
use crate::notify::LogSink;
use crate::pacing::{pause, settle, two_phase};
use crate::report::RunReport;
use crate::session::MallSession;
use crate::types::{
    ActionResult, CalendarEntry, Credential, GatedSubTask, RedemptionProgress, RunSummary,
    SubTask, TaskItem, TaskKind, TaskStatus,
};
use serde_json::{Value, json};
use std::time::Duration;

/// Display name of the activity
const ACTIVITY: &str = "Point Factory";

/// Home flag meaning no product has been selected yet
const NO_PRODUCT_SELECTED: i64 = 2;

/// Component queried by the featured-page browse interaction
const FEATURED_COMPONENT_ID: &str = "b7e2d1f0a4c94f8e9d3b5a6c7e8f9012";

/// Activity identifier the featured-page interaction reports against
const FEATURED_ACTIVITY_ID: &str = "9aKwQdNpXrTzYvBs";

/// Run the factory activity for one account
///
/// Returns the finalized summary. The run aborts early only when the session
/// cannot be built or the home bootstrap fails - without home data there is
/// no usable session state to act on.
pub async fn run(
    config: &Config,
    credential: &Credential,
    sink: &dyn LogSink,
) -> Result<RunSummary> {
    let session = MallSession::open(config, credential)?;
    let account = session.account.clone();
    let mut report = RunReport::new(ACTIVITY, account.clone());

    let home = match home_data(&session).await {
        Ok(home) => home,
        Err(e) => {
            sink.log(&format!("{account}, cannot fetch activity data, aborting: {e}"));
            return Err(Error::Gateway(e));
        }
    };
    if home.int_field("haveProduct") == Some(NO_PRODUCT_SELECTED) {
        sink.log(&format!(
            "{account}, no product selected yet, picking one from stock"
        ));
        choose_product(&session, sink).await;
    }

    collect_charge(&session, &mut report, sink).await;

    let (tasks, own_code) = catalog::fetch(&session, sink).await;
    if let Some(code) = &own_code {
        sink.log(&format!("{account}, own assist code: {code}"));
    }
    assist_peers(
        &session,
        &config.factory.assist_codes,
        own_code.as_deref(),
        &mut report,
        sink,
    )
    .await;

    for task in &tasks {
        dispatch(&session, config, task, &mut report, sink).await;
        settle(&config.pacing).await;
    }

    match home_data(&session).await {
        Ok(home) => {
            if let Some(redemption) = redemption_progress(&home) {
                report.set_redemption(redemption);
            }
        }
        Err(e) => {
            sink.log(&format!("{account}, cannot fetch closing data: {e}"));
        }
    }
    Ok(report.finalize())
}

/// Route one catalog item to its handler
///
/// Non-pending items are skipped without invoking a handler. Exactly one
/// handler runs per eligible item; a handler failure is recorded here and
/// iteration over the remaining catalog continues.
async fn dispatch(
    session: &MallSession,
    config: &Config,
    task: &TaskItem,
    report: &mut RunReport,
    sink: &dyn LogSink,
) {
    let account = &session.account;
    if task.status != TaskStatus::Pending {
        sink.log(&format!(
            "{account}, task {}: already done, skipping",
            task.name
        ));
        report.record(&ActionResult::skipped(&task.name));
        return;
    }

    let outcome = match &task.kind {
        TaskKind::DailyCheckIn { token } => {
            daily_check_in(session, task, token, report, sink).await
        }
        TaskKind::Patrol(slots) => patrol(session, task, slots, report, sink).await,
        TaskKind::FeaturedPage { token } => {
            featured_page(session, config, task, token, report, sink).await
        }
        TaskKind::EventCalendar(entries) => {
            event_calendar(session, config, task, entries, report, sink).await
        }
        TaskKind::BrowseItems(items) => browse_items(session, task, items, report, sink).await,
        TaskKind::VisitVenues(venues) => visit_venues(session, task, venues, report, sink).await,
        TaskKind::FollowShops(shops) => follow_shops(session, task, shops, report, sink).await,
        TaskKind::FriendAssist {
            times, max_times, ..
        } => {
            sink.log(&format!(
                "{account}, task {}: assist progress {times}/{max_times}",
                task.name
            ));
            report.record(&ActionResult::skipped(&task.name));
            Ok(())
        }
        TaskKind::PlaceOrder | TaskKind::Membership => {
            sink.log(&format!(
                "{account}, task {}: not automated, skipping",
                task.name
            ));
            report.record(&ActionResult::skipped(&task.name));
            Ok(())
        }
        TaskKind::Unknown(code) => {
            sink.log(&format!(
                "{account}, task {}: unrecognized type {code}, skipping",
                task.name
            ));
            report.record(&ActionResult::skipped(&task.name));
            Ok(())
        }
    };

    if let Err(e) = outcome {
        sink.log(&format!("{account}, task {}: failed: {e}", task.name));
        report.record(&ActionResult::failed(&task.name, e.to_string()));
    }
}

async fn daily_check_in(
    session: &MallSession,
    task: &TaskItem,
    token: &str,
    report: &mut RunReport,
    sink: &dyn LogSink,
) -> std::result::Result<(), GatewayError> {
    sink.log(&format!(
        "{}, working on task: {}",
        session.account, task.name
    ));
    let reply = collect(session, token, None).await?;
    let score = reply.int_field("score").unwrap_or(0);
    sink.log(&format!(
        "{}, completed task {}: {}",
        session.account, task.name, reply.message
    ));
    report.record(&ActionResult::succeeded(&task.name).with_points(score));
    Ok(())
}

/// Collect the currently open patrol slot
///
/// The first slot is the active window; the backend delivers its gate as a
/// status flag, never computed locally. A closed window is a skip, not a
/// failure.
async fn patrol(
    session: &MallSession,
    task: &TaskItem,
    slots: &[GatedSubTask],
    report: &mut RunReport,
    sink: &dyn LogSink,
) -> std::result::Result<(), GatewayError> {
    let account = &session.account;
    let Some(slot) = slots.first() else {
        return Ok(());
    };
    if slot.status == 0 {
        sink.log(&format!(
            "{account}, task {}: current window already closed",
            task.name
        ));
        report.record(&ActionResult::skipped(&task.name));
        return Ok(());
    }
    let reply = collect(session, &slot.token, None).await?;
    let score = reply.int_field("score").unwrap_or(0);
    sink.log(&format!(
        "{account}, completed task {}: earned {score} charge",
        task.name
    ));
    report.record(&ActionResult::succeeded(&task.name).with_points(score));
    Ok(())
}

/// Browse the featured page, then collect
///
/// The collect is skipped when the browse interaction fails; that failure is
/// recorded against the item rather than propagated.
async fn featured_page(
    session: &MallSession,
    config: &Config,
    task: &TaskItem,
    token: &str,
    report: &mut RunReport,
    sink: &dyn LogSink,
) -> std::result::Result<(), GatewayError> {
    let account = &session.account;
    sink.log(&format!("{account}, working on task: {}", task.name));
    if let Err(e) = session
        .gateway()
        .view_component(FEATURED_COMPONENT_ID, FEATURED_ACTIVITY_ID)
        .await
    {
        sink.log(&format!(
            "{account}, task {}: browse interaction failed: {e}",
            task.name
        ));
        report.record(&ActionResult::failed(&task.name, e.to_string()));
        return Ok(());
    }
    pause(config.pacing.browse_wait, Duration::ZERO).await;
    let reply = collect(session, token, None).await?;
    let score = reply.int_field("score").unwrap_or(0);
    sink.log(&format!(
        "{account}, completed task {}: earned {score} charge",
        task.name
    ));
    report.record(&ActionResult::succeeded(&task.name).with_points(score));
    Ok(())
}

/// Work through the calendar entries
///
/// Each entry needs the paired enter/complete collects with the backend's
/// wait between them (or the configured default); both are required for
/// credit.
async fn event_calendar(
    session: &MallSession,
    config: &Config,
    task: &TaskItem,
    entries: &[CalendarEntry],
    report: &mut RunReport,
    sink: &dyn LogSink,
) -> std::result::Result<(), GatewayError> {
    let account = &session.account;
    for entry in entries {
        if entry.status == 2 {
            sink.log(&format!("{account}, entry {} already completed", entry.title));
            report.record(&ActionResult::skipped(&entry.title));
            continue;
        }
        let wait = entry
            .wait_secs
            .map(Duration::from_secs)
            .unwrap_or(config.pacing.calendar_wait);
        sink.log(&format!(
            "{account}, working on entry {}, waiting {}s",
            entry.title,
            wait.as_secs()
        ));
        let outcome = two_phase(
            collect(session, &entry.token, Some("1")),
            wait,
            || collect(session, &entry.token, Some("2")),
        )
        .await;
        match outcome {
            Err(e) => {
                sink.log(&format!("{account}, cannot start entry {}: {e}", entry.title));
                report.record(&ActionResult::failed(&entry.title, e.to_string()));
            }
            Ok((_, Err(e))) => {
                sink.log(&format!(
                    "{account}, cannot complete entry {}: {e}",
                    entry.title
                ));
                report.record(&ActionResult::failed(&entry.title, e.to_string()));
            }
            Ok((_, Ok(reply))) => {
                let score = reply.int_field("score").unwrap_or(0);
                sink.log(&format!(
                    "{account}, completed entry {}: earned {score} charge, progress {}/{}",
                    entry.title,
                    reply.int_field("times").unwrap_or(0),
                    reply.int_field("maxTimes").unwrap_or(0)
                ));
                report.record(&ActionResult::succeeded(&entry.title).with_points(score));
            }
        }
    }
    Ok(())
}

/// Collect the browse items, stopping once the backend-reported progress
/// counter reaches its cap
async fn browse_items(
    session: &MallSession,
    task: &TaskItem,
    items: &[SubTask],
    report: &mut RunReport,
    sink: &dyn LogSink,
) -> std::result::Result<(), GatewayError> {
    let account = &session.account;
    for (index, item) in items.iter().enumerate() {
        let attempt = index + 1;
        match collect(session, &item.token, None).await {
            Err(e) => {
                sink.log(&format!(
                    "{account}, task {}: attempt {attempt} failed: {e}",
                    task.name
                ));
                report.record(&ActionResult::failed(&task.name, e.to_string()));
            }
            Ok(reply) => {
                let score = reply.int_field("score").unwrap_or(0);
                let times = reply.int_field("times");
                let max_times = reply.int_field("maxTimes");
                sink.log(&format!(
                    "{account}, task {}: attempt {attempt} done, earned {score} charge, progress {}/{}",
                    task.name,
                    times.unwrap_or(0),
                    max_times.unwrap_or(0)
                ));
                report.record(&ActionResult::succeeded(&task.name).with_points(score));
                if let (Some(times), Some(max_times)) = (times, max_times)
                    && times >= max_times
                {
                    break;
                }
            }
        }
    }
    Ok(())
}

/// Collect every venue whose gate is open
async fn visit_venues(
    session: &MallSession,
    task: &TaskItem,
    venues: &[GatedSubTask],
    report: &mut RunReport,
    sink: &dyn LogSink,
) -> std::result::Result<(), GatewayError> {
    let account = &session.account;
    for venue in venues.iter().filter(|v| v.status == 1) {
        match collect(session, &venue.token, None).await {
            Err(e) => {
                sink.log(&format!("{account}, task {}: failed: {e}", task.name));
                report.record(&ActionResult::failed(&task.name, e.to_string()));
            }
            Ok(reply) => {
                let score = reply.int_field("score").unwrap_or(0);
                sink.log(&format!(
                    "{account}, task {}: earned {score} charge, progress {}/{}",
                    task.name,
                    reply.int_field("times").unwrap_or(0),
                    reply.int_field("maxTimes").unwrap_or(0)
                ));
                report.record(&ActionResult::succeeded(&task.name).with_points(score));
            }
        }
    }
    Ok(())
}

/// Follow every listed shop
async fn follow_shops(
    session: &MallSession,
    task: &TaskItem,
    shops: &[SubTask],
    report: &mut RunReport,
    sink: &dyn LogSink,
) -> std::result::Result<(), GatewayError> {
    let account = &session.account;
    for shop in shops {
        match collect(session, &shop.token, None).await {
            Err(e) => {
                sink.log(&format!("{account}, task {}: failed: {e}", task.name));
                report.record(&ActionResult::failed(&task.name, e.to_string()));
            }
            Ok(reply) => {
                let score = reply.int_field("score").unwrap_or(0);
                sink.log(&format!(
                    "{account}, task {}: earned {score} charge",
                    task.name
                ));
                report.record(&ActionResult::succeeded(&task.name).with_points(score));
            }
        }
    }
    Ok(())
}

/// Credit the configured peer assist codes, skipping the account's own code
async fn assist_peers(
    session: &MallSession,
    codes: &[String],
    own_code: Option<&str>,
    report: &mut RunReport,
    sink: &dyn LogSink,
) {
    let account = &session.account;
    for code in codes {
        if Some(code.as_str()) == own_code {
            continue;
        }
        match collect(session, code, None).await {
            Ok(reply) => {
                sink.log(&format!(
                    "{account}, assisted friend {code}: {}",
                    reply.message
                ));
                report.record(&ActionResult::succeeded(format!("assist {code}")));
            }
            Err(e) => {
                sink.log(&format!("{account}, cannot assist friend {code}: {e}"));
                report.record(&ActionResult::failed(format!("assist {code}"), e.to_string()));
            }
        }
    }
}

/// Collect the daily battery charge into the account
async fn collect_charge(session: &MallSession, report: &mut RunReport, sink: &dyn LogSink) {
    let account = &session.account;
    match session
        .gateway()
        .invoke("factory_collectElectricity", &json!({}))
        .await
    {
        Ok(reply) => {
            let collected = reply.int_field("collected").unwrap_or(0);
            let battery = reply.int_field("battery").unwrap_or(0);
            sink.log(&format!(
                "{account}, collected {collected} charge, battery now holds {battery}"
            ));
            report.record(&ActionResult::succeeded("battery collect").with_points(collected));
        }
        Err(e) => {
            sink.log(&format!("{account}, charge collection failed: {e}"));
            report.record(&ActionResult::failed("battery collect", e.to_string()));
        }
    }
}

/// Select a product to produce when the account has none
///
/// Prefers in-stock products with the most remaining coupons; picks the first
/// eligible one.
async fn choose_product(session: &MallSession, sink: &dyn LogSink) {
    let account = &session.account;
    let reply = match session
        .gateway()
        .invoke("factory_getProductList", &json!({}))
        .await
    {
        Ok(reply) => reply,
        Err(e) => {
            sink.log(&format!("{account}, cannot fetch product list: {e}"));
            return;
        }
    };
    let Some(products) = reply.result.get("products").and_then(Value::as_array) else {
        return;
    };
    let mut candidates: Vec<&Value> = products.iter().collect();
    candidates.sort_by_key(|p| {
        std::cmp::Reverse(p.get("couponCount").and_then(Value::as_i64).unwrap_or(0))
    });

    for product in candidates {
        let coupon_count = product.get("couponCount").and_then(Value::as_i64).unwrap_or(0);
        let sold_out = product.get("sellOut").and_then(Value::as_i64).unwrap_or(0);
        if coupon_count == 0 || sold_out != 0 {
            continue;
        }
        let name = product.get("name").and_then(Value::as_str).unwrap_or("?");
        let Some(sku) = product.get("skuId") else {
            continue;
        };
        match session
            .gateway()
            .invoke("factory_makeProduct", &json!({ "skuId": sku }))
            .await
        {
            Ok(_) => sink.log(&format!("{account}, selected product: {name}")),
            Err(e) => sink.log(&format!("{account}, cannot select product {name}: {e}")),
        }
        break;
    }
}

async fn home_data(session: &MallSession) -> std::result::Result<MallReply, GatewayError> {
    session
        .gateway()
        .invoke("factory_getHomeData", &json!({}))
        .await
}

fn redemption_progress(home: &MallReply) -> Option<RedemptionProgress> {
    let info = home.result.get("factoryInfo")?;
    Some(RedemptionProgress {
        product: info
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        remaining_stock: info.get("couponCount").and_then(Value::as_i64).unwrap_or(0),
        invested: info.get("useScore").and_then(Value::as_i64).unwrap_or(0),
        required: info.get("totalScore").and_then(Value::as_i64).unwrap_or(0),
        uncollected: info.get("remainScore").and_then(Value::as_i64).unwrap_or(0),
    })
}

async fn collect(
    session: &MallSession,
    token: &str,
    action_type: Option<&str>,
) -> std::result::Result<MallReply, GatewayError> {
    let mut params = json!({ "taskToken": token });
    if let Some(action) = action_type {
        params["actionType"] = json!(action);
    }
    session
        .gateway()
        .invoke("factory_collectScore", &params)
        .await
}
