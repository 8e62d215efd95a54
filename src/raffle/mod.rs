//! The lucky-draw raffle pipeline
//!
//! One run: acquire the arena session, enumerate the open draws page by page,
//! join and share each draw not yet joined, then confirm won prizes against
//! the progress endpoint and finalize the summary. Per-item failures are
//! recorded and never abort the batch; only a failed session handshake ends
//! the run early.

mod catalog;

use crate::config::Config;
use crate::error::{GatewayError, Result};
use crate::notify::LogSink;
use crate::pacing::{settle, two_phase};
use crate::report::RunReport;
use crate::session::ArenaSession;
use crate::types::{ActionResult, Credential, DrawItem, RunSummary};
use serde_json::{Value, json};

/// Display name of the activity
const ACTIVITY: &str = "Lucky Draw";

/// Business code the backend returns when the currency balance cannot cover a join
const CODE_INSUFFICIENT_BALANCE: i64 = 2002;

/// Progress status marking a draw this account did not win
const STATUS_NOT_JOINED: &str = "noJoined";

/// Run the raffle activity for one account
///
/// Returns the finalized summary, or the authentication error that prevented
/// the run from starting. No summary exists for an aborted run.
pub async fn run(
    config: &Config,
    credential: &Credential,
    sink: &dyn LogSink,
) -> Result<RunSummary> {
    let session = match ArenaSession::acquire(config, credential, sink).await {
        Ok(session) => session,
        Err(e) => {
            sink.log(&format!(
                "{}, cannot authorize raffle session, aborting: {e}",
                credential.account()
            ));
            return Err(e);
        }
    };

    let mut report = RunReport::new(ACTIVITY, session.account.clone());
    report.set_nickname(session.nickname.clone());

    let draws = catalog::fetch_all(&session, config.raffle.page_size, sink).await;
    for item in &draws {
        process_item(&session, config, item, &mut report, sink).await;
    }

    collect_rewards(&session, config, &mut report, sink).await;
    report.set_hint(
        "rewards are credited automatically; physical prizes must be claimed \
         from the activity page in the app",
    );
    Ok(report.finalize())
}

/// Join one draw and complete its share sub-task
///
/// Already-joined draws are skipped without a join call but still count as
/// processed. A failed join short-circuits the share; a failed share after a
/// successful join leaves the item processed with its currency spent and is
/// recorded separately as a share failure.
async fn process_item(
    session: &ArenaSession,
    config: &Config,
    item: &DrawItem,
    report: &mut RunReport,
    sink: &dyn LogSink,
) {
    let account = &session.account;
    if item.joined {
        sink.log(&format!(
            "{account}, draw {}: already joined, skipping",
            item.title
        ));
        report.record(&ActionResult::skipped(&item.title));
        return;
    }

    let outcome = two_phase(
        join(session, &item.id),
        config.pacing.settle,
        || share(session, &item.id),
    )
    .await;

    match outcome {
        Err(e) => {
            if e.business_code() == Some(CODE_INSUFFICIENT_BALANCE) {
                sink.log(&format!(
                    "{account}, draw {}: balance too low to join",
                    item.title
                ));
            } else {
                sink.log(&format!("{account}, draw {}: join failed: {e}", item.title));
            }
            report.record(&ActionResult::failed(&item.title, e.to_string()));
        }
        Ok((_, share_result)) => {
            sink.log(&format!("{account}, draw {}: joined", item.title));
            report.record(&ActionResult::succeeded(&item.title).with_currency(1));
            match share_result {
                Ok(_) => {
                    sink.log(&format!(
                        "{account}, draw {}: share task completed",
                        item.title
                    ));
                }
                Err(e) => {
                    sink.log(&format!(
                        "{account}, draw {}: share task failed: {e}",
                        item.title
                    ));
                    report.record(&ActionResult::failed(
                        format!("{} (share)", item.title),
                        e.to_string(),
                    ));
                }
            }
        }
    }
    settle(&config.pacing).await;
}

async fn join(session: &ArenaSession, draw_id: &str) -> std::result::Result<Value, GatewayError> {
    let mut params = session.auth_params();
    params["activeid"] = json!(draw_id);
    session.gateway().call_checked("/draw/join", &params).await
}

async fn share(session: &ArenaSession, draw_id: &str) -> std::result::Result<Value, GatewayError> {
    let mut params = session.auth_params();
    params["activeid"] = json!(draw_id);
    params["type"] = json!("share");
    session
        .gateway()
        .call_checked("/draw/finishTask", &params)
        .await
}

/// Confirm won prizes against the progress endpoint
///
/// Distinct from the join call: each previously-joined draw is re-queried and
/// added to the reward list if the progress status does not deny a win. Query
/// failures leave the reward list as-is; the summary is produced regardless.
async fn collect_rewards(
    session: &ArenaSession,
    config: &Config,
    report: &mut RunReport,
    sink: &dyn LogSink,
) {
    let mut params = session.auth_params();
    params["page"] = json!(1);
    params["pageSize"] = json!(10);
    let result = match session
        .gateway()
        .call_checked("/draw/progressList", &params)
        .await
    {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!(account = %session.account, error = %e, "progress listing failed");
            sink.log(&format!(
                "{}, cannot query joined draws for rewards: {e}",
                session.account
            ));
            return;
        }
    };

    let Some(list) = result.get("list").and_then(Value::as_array) else {
        return;
    };
    for entry in list {
        let (Some(id), Some(title)) = (
            entry.get("_id").and_then(Value::as_str),
            entry.get("title").and_then(Value::as_str),
        ) else {
            continue;
        };
        settle(&config.pacing).await;
        if won(session, id).await {
            sink.log(&format!("{}, draw {title}: prize won", session.account));
            report.add_reward(title);
        }
    }
}

/// Whether the progress status of one draw counts as a win
///
/// Win detection is a narrow heuristic: the backend's full status vocabulary
/// is not known, and `noJoined` is the only confirmed non-win signal. Any
/// query failure counts as not won.
async fn won(session: &ArenaSession, draw_id: &str) -> bool {
    let mut params = session.auth_params();
    params["activeid"] = json!(draw_id);
    match session
        .gateway()
        .call_checked("/draw/progressList", &params)
        .await
    {
        Ok(result) => result.get("status").and_then(Value::as_str) != Some(STATUS_NOT_JOINED),
        Err(_) => false,
    }
}
